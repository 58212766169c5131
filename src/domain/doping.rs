use std::error::Error;
use std::fmt;
use std::str::FromStr;

use time::OffsetDateTime;

use super::{normalize_token, ParseEnumError};

/// Paid visibility boost. Variant order is ranking precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DopingTier {
    Urgent,
    Premium,
    Gold,
}

const TIER_NAMES: &[&str] = &["urgent", "premium", "gold"];

impl DopingTier {
    pub const ALL: [DopingTier; 3] = [DopingTier::Urgent, DopingTier::Premium, DopingTier::Gold];

    pub fn as_str(self) -> &'static str {
        match self {
            DopingTier::Urgent => "urgent",
            DopingTier::Premium => "premium",
            DopingTier::Gold => "gold",
        }
    }

    /// Ranking weight used in ORDER BY; 0 means no active boost.
    pub fn rank(self) -> i64 {
        match self {
            DopingTier::Urgent => 1,
            DopingTier::Premium => 2,
            DopingTier::Gold => 3,
        }
    }

    pub fn from_rank(rank: i64) -> Option<DopingTier> {
        DopingTier::ALL.into_iter().find(|tier| tier.rank() == rank)
    }

    pub fn in_showcase(self) -> bool {
        self == DopingTier::Gold
    }
}

impl FromStr for DopingTier {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "urgent" | "acil" => Ok(DopingTier::Urgent),
            "premium" => Ok(DopingTier::Premium),
            "gold" | "showcase" | "vitrin" => Ok(DopingTier::Gold),
            _ => Err(ParseEnumError {
                kind: "doping tier",
                value: value.to_string(),
                expected: TIER_NAMES,
            }),
        }
    }
}

string_enum_impls!(DopingTier);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DopingStatus {
    Pending,
    Active,
    Rejected,
    Expired,
    Cancelled,
}

const DOPING_STATUS_NAMES: &[&str] = &["pending", "active", "rejected", "expired", "cancelled"];

impl DopingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DopingStatus::Pending => "pending",
            DopingStatus::Active => "active",
            DopingStatus::Rejected => "rejected",
            DopingStatus::Expired => "expired",
            DopingStatus::Cancelled => "cancelled",
        }
    }

    pub fn validate_transition(self, next: DopingStatus) -> Result<(), InvalidDopingTransition> {
        let allowed = matches!(
            (self, next),
            (DopingStatus::Pending, DopingStatus::Active)
                | (DopingStatus::Pending, DopingStatus::Rejected)
                | (DopingStatus::Pending, DopingStatus::Cancelled)
                | (DopingStatus::Active, DopingStatus::Expired)
        );
        if allowed {
            return Ok(());
        }
        Err(InvalidDopingTransition {
            from: self,
            to: next,
        })
    }
}

impl FromStr for DopingStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "pending" => Ok(DopingStatus::Pending),
            "active" => Ok(DopingStatus::Active),
            "rejected" => Ok(DopingStatus::Rejected),
            "expired" => Ok(DopingStatus::Expired),
            "cancelled" | "canceled" => Ok(DopingStatus::Cancelled),
            _ => Err(ParseEnumError {
                kind: "doping status",
                value: value.to_string(),
                expected: DOPING_STATUS_NAMES,
            }),
        }
    }
}

string_enum_impls!(DopingStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidDopingTransition {
    pub from: DopingStatus,
    pub to: DopingStatus,
}

impl fmt::Display for InvalidDopingTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid doping transition: {} -> {}", self.from, self.to)
    }
}

impl Error for InvalidDopingTransition {}

/// Start/end window of an approved doping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DopingWindow {
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
}

impl DopingWindow {
    pub fn starting(now: OffsetDateTime, days: u32) -> Self {
        Self {
            starts_at: now,
            ends_at: now + time::Duration::days(i64::from(days)),
        }
    }

    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.starts_at <= instant && instant < self.ends_at
    }
}

/// Highest tier among the windows that cover `now`.
pub fn effective_tier<I>(active: I, now: OffsetDateTime) -> Option<DopingTier>
where
    I: IntoIterator<Item = (DopingTier, DopingWindow)>,
{
    active
        .into_iter()
        .filter(|(_, window)| window.contains(now))
        .map(|(tier, _)| tier)
        .max()
}
