use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{normalize_token, ParseEnumError};

pub const MIN_MODEL_YEAR: i64 = 1900;
pub const MAX_MODEL_YEAR: i64 = 2100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fuel {
    Gasoline,
    Diesel,
    Lpg,
    Hybrid,
    Electric,
}

impl Fuel {
    pub fn as_str(self) -> &'static str {
        match self {
            Fuel::Gasoline => "gasoline",
            Fuel::Diesel => "diesel",
            Fuel::Lpg => "lpg",
            Fuel::Hybrid => "hybrid",
            Fuel::Electric => "electric",
        }
    }
}

impl FromStr for Fuel {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "gasoline" | "petrol" | "benzin" => Ok(Fuel::Gasoline),
            "diesel" | "dizel" => Ok(Fuel::Diesel),
            "lpg" | "gasoline_lpg" => Ok(Fuel::Lpg),
            "hybrid" | "hibrit" => Ok(Fuel::Hybrid),
            "electric" | "ev" | "elektrik" => Ok(Fuel::Electric),
            _ => Err(ParseEnumError {
                kind: "fuel",
                value: value.to_string(),
                expected: &["gasoline", "diesel", "lpg", "hybrid", "electric"],
            }),
        }
    }
}

string_enum_impls!(Fuel);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gearbox {
    Manual,
    Automatic,
    SemiAutomatic,
}

impl Gearbox {
    pub fn as_str(self) -> &'static str {
        match self {
            Gearbox::Manual => "manual",
            Gearbox::Automatic => "automatic",
            Gearbox::SemiAutomatic => "semi_automatic",
        }
    }
}

impl FromStr for Gearbox {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "manual" | "manuel" => Ok(Gearbox::Manual),
            "automatic" | "auto" | "otomatik" => Ok(Gearbox::Automatic),
            "semi_automatic" | "semiautomatic" | "yari_otomatik" => Ok(Gearbox::SemiAutomatic),
            _ => Err(ParseEnumError {
                kind: "gearbox",
                value: value.to_string(),
                expected: &["manual", "automatic", "semi_automatic"],
            }),
        }
    }
}

string_enum_impls!(Gearbox);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DamageKind {
    Original,
    Painted,
    LocalPaint,
    Replaced,
}

impl DamageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DamageKind::Original => "original",
            DamageKind::Painted => "painted",
            DamageKind::LocalPaint => "local_paint",
            DamageKind::Replaced => "replaced",
        }
    }
}

impl FromStr for DamageKind {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "original" | "orijinal" => Ok(DamageKind::Original),
            "painted" | "boyali" => Ok(DamageKind::Painted),
            "local_paint" | "lokal_boyali" => Ok(DamageKind::LocalPaint),
            "replaced" | "degisen" => Ok(DamageKind::Replaced),
            _ => Err(ParseEnumError {
                kind: "damage kind",
                value: value.to_string(),
                expected: &["original", "painted", "local_paint", "replaced"],
            }),
        }
    }
}

string_enum_impls!(DamageKind);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub year: Option<i64>,
    pub km: Option<i64>,
    pub fuel: Option<Fuel>,
    pub gearbox: Option<Gearbox>,
    pub body_type: Option<String>,
    pub color: Option<String>,
    pub engine_cc: Option<i64>,
    pub horsepower: Option<i64>,
}

impl VehicleSpec {
    pub fn is_empty(&self) -> bool {
        self == &VehicleSpec::default()
    }

    /// Returns the first field that is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(year) = self.year {
            if !(MIN_MODEL_YEAR..=MAX_MODEL_YEAR).contains(&year) {
                return Err(format!(
                    "year must be between {MIN_MODEL_YEAR} and {MAX_MODEL_YEAR}"
                ));
            }
        }
        for (name, value) in [
            ("km", self.km),
            ("engine_cc", self.engine_cc),
            ("horsepower", self.horsepower),
        ] {
            if value.is_some_and(|value| value < 0) {
                return Err(format!("{name} cannot be negative"));
            }
        }
        Ok(())
    }

    /// Overlay the fields set in `patch`.
    pub fn merge(&mut self, patch: VehicleSpec) {
        if patch.year.is_some() {
            self.year = patch.year;
        }
        if patch.km.is_some() {
            self.km = patch.km;
        }
        if patch.fuel.is_some() {
            self.fuel = patch.fuel;
        }
        if patch.gearbox.is_some() {
            self.gearbox = patch.gearbox;
        }
        if patch.body_type.is_some() {
            self.body_type = patch.body_type.as_deref().and_then(normalize_attribute);
        }
        if patch.color.is_some() {
            self.color = patch.color.as_deref().and_then(normalize_attribute);
        }
        if patch.engine_cc.is_some() {
            self.engine_cc = patch.engine_cc;
        }
        if patch.horsepower.is_some() {
            self.horsepower = patch.horsepower;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEntry {
    pub part: String,
    pub kind: DamageKind,
}

/// Parses `part=kind`, e.g. `hood=painted`.
pub fn parse_damage_entry(raw: &str) -> Result<DamageEntry, String> {
    let (part, kind) = raw
        .split_once('=')
        .ok_or_else(|| format!("damage entry '{raw}' must look like part=kind"))?;
    let part = normalize_attribute(part).ok_or_else(|| "damage part cannot be empty".to_string())?;
    let kind = DamageKind::from_str(kind).map_err(|err| err.to_string())?;
    Ok(DamageEntry { part, kind })
}

/// Free-text vehicle attributes (color, body type, equipment) are stored
/// lowercased with single spaces.
pub fn normalize_attribute(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_damage_entry, DamageKind, Fuel, Gearbox, VehicleSpec};
    use std::str::FromStr;

    #[test]
    fn parses_localized_enum_names() {
        assert_eq!(Fuel::from_str("Benzin").unwrap(), Fuel::Gasoline);
        assert_eq!(Gearbox::from_str("semi-automatic").unwrap(), Gearbox::SemiAutomatic);
        assert_eq!(DamageKind::from_str("degisen").unwrap(), DamageKind::Replaced);
    }

    #[test]
    fn validates_ranges() {
        let spec = VehicleSpec {
            year: Some(1850),
            ..VehicleSpec::default()
        };
        assert!(spec.validate().is_err());

        let spec = VehicleSpec {
            km: Some(-5),
            ..VehicleSpec::default()
        };
        assert_eq!(spec.validate().unwrap_err(), "km cannot be negative");
    }

    #[test]
    fn merge_only_overwrites_present_fields() {
        let mut spec = VehicleSpec {
            year: Some(2018),
            km: Some(90_000),
            color: Some("white".to_string()),
            ..VehicleSpec::default()
        };
        spec.merge(VehicleSpec {
            km: Some(95_500),
            color: Some("  Dark   Grey ".to_string()),
            ..VehicleSpec::default()
        });
        assert_eq!(spec.year, Some(2018));
        assert_eq!(spec.km, Some(95_500));
        assert_eq!(spec.color.as_deref(), Some("dark grey"));
    }

    #[test]
    fn parses_damage_entries() {
        let entry = parse_damage_entry("Left Door=painted").unwrap();
        assert_eq!(entry.part, "left door");
        assert_eq!(entry.kind, DamageKind::Painted);
        assert!(parse_damage_entry("hood").is_err());
        assert!(parse_damage_entry("=painted").is_err());
    }
}
