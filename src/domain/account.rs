use std::error::Error;
use std::fmt;
use std::str::FromStr;

use super::{normalize_token, ParseEnumError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "member" | "user" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseEnumError {
                kind: "role",
                value: value.to_string(),
                expected: &["member", "admin"],
            }),
        }
    }
}

string_enum_impls!(Role);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AccountKind {
    #[default]
    Individual,
    /// Dealer or gallery; must be verified before publishing.
    Corporate,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountKind::Individual => "individual",
            AccountKind::Corporate => "corporate",
        }
    }

    pub fn initial_verification(self) -> Verification {
        match self {
            AccountKind::Individual => Verification::Unverified,
            AccountKind::Corporate => Verification::Pending,
        }
    }
}

impl FromStr for AccountKind {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "individual" | "personal" => Ok(AccountKind::Individual),
            "corporate" | "dealer" | "gallery" => Ok(AccountKind::Corporate),
            _ => Err(ParseEnumError {
                kind: "account kind",
                value: value.to_string(),
                expected: &["individual", "corporate"],
            }),
        }
    }
}

string_enum_impls!(AccountKind);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Verification {
    #[default]
    Unverified,
    Pending,
    Verified,
    Rejected,
}

impl Verification {
    pub fn as_str(self) -> &'static str {
        match self {
            Verification::Unverified => "unverified",
            Verification::Pending => "pending",
            Verification::Verified => "verified",
            Verification::Rejected => "rejected",
        }
    }

    pub fn validate_transition(self, next: Verification) -> Result<(), InvalidVerificationStep> {
        let allowed = matches!(
            (self, next),
            (Verification::Unverified, Verification::Pending)
                | (Verification::Rejected, Verification::Pending)
                | (Verification::Pending, Verification::Verified)
                | (Verification::Pending, Verification::Rejected)
        );
        if allowed {
            Ok(())
        } else {
            Err(InvalidVerificationStep {
                from: self,
                to: next,
            })
        }
    }
}

impl FromStr for Verification {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "unverified" | "none" => Ok(Verification::Unverified),
            "pending" => Ok(Verification::Pending),
            "verified" | "approved" => Ok(Verification::Verified),
            "rejected" => Ok(Verification::Rejected),
            _ => Err(ParseEnumError {
                kind: "verification status",
                value: value.to_string(),
                expected: &["unverified", "pending", "verified", "rejected"],
            }),
        }
    }
}

string_enum_impls!(Verification);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidVerificationStep {
    pub from: Verification,
    pub to: Verification,
}

impl fmt::Display for InvalidVerificationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid verification transition: {} -> {}",
            self.from, self.to
        )
    }
}

impl Error for InvalidVerificationStep {}

pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_ascii_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return None;
    }
    if email.chars().any(char::is_whitespace) {
        return None;
    }
    Some(email)
}
