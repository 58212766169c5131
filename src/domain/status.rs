use std::error::Error;
use std::fmt;
use std::str::FromStr;

use super::{normalize_token, ParseEnumError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingStatus {
    Pending,
    Active,
    Rejected,
    Sold,
    Expired,
    Deleted,
}

const STATUS_NAMES: &[&str] = &["pending", "active", "rejected", "sold", "expired", "deleted"];

impl ListingStatus {
    pub const ALL: [ListingStatus; 6] = [
        ListingStatus::Pending,
        ListingStatus::Active,
        ListingStatus::Rejected,
        ListingStatus::Sold,
        ListingStatus::Expired,
        ListingStatus::Deleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Active => "active",
            ListingStatus::Rejected => "rejected",
            ListingStatus::Sold => "sold",
            ListingStatus::Expired => "expired",
            ListingStatus::Deleted => "deleted",
        }
    }

    pub fn is_public(self) -> bool {
        self == ListingStatus::Active
    }

    /// Dopings can be requested while the listing is still alive.
    pub fn accepts_doping(self) -> bool {
        matches!(
            self,
            ListingStatus::Pending | ListingStatus::Active | ListingStatus::Expired
        )
    }

    pub fn can_transition_to(self, next: ListingStatus) -> bool {
        if self == next {
            return true;
        }

        if next == ListingStatus::Deleted {
            return true;
        }

        matches!(
            (self, next),
            (ListingStatus::Pending, ListingStatus::Active)
                | (ListingStatus::Pending, ListingStatus::Rejected)
                | (ListingStatus::Active, ListingStatus::Rejected)
                | (ListingStatus::Active, ListingStatus::Sold)
                | (ListingStatus::Active, ListingStatus::Expired)
                | (ListingStatus::Active, ListingStatus::Pending)
                | (ListingStatus::Rejected, ListingStatus::Pending)
                | (ListingStatus::Expired, ListingStatus::Pending)
        )
    }

    pub fn validate_transition(self, next: ListingStatus) -> Result<(), InvalidStatusTransition> {
        if self.can_transition_to(next) {
            return Ok(());
        }

        Err(InvalidStatusTransition {
            from: self,
            to: next,
        })
    }

    /// Status a soft-deleted listing returns to on restore.
    pub fn restore_target(previous: Option<ListingStatus>) -> ListingStatus {
        match previous {
            Some(ListingStatus::Deleted) | None => ListingStatus::Pending,
            Some(status) => status,
        }
    }
}

impl FromStr for ListingStatus {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let status = match normalize_token(value).as_str() {
            "pending" | "waiting" => ListingStatus::Pending,
            "active" | "published" | "approved" => ListingStatus::Active,
            "rejected" => ListingStatus::Rejected,
            "sold" => ListingStatus::Sold,
            "expired" => ListingStatus::Expired,
            "deleted" | "removed" => ListingStatus::Deleted,
            _ => {
                return Err(ParseEnumError {
                    kind: "listing status",
                    value: value.to_string(),
                    expected: STATUS_NAMES,
                });
            }
        };
        Ok(status)
    }
}

string_enum_impls!(ListingStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidStatusTransition {
    pub from: ListingStatus,
    pub to: ListingStatus,
}

impl fmt::Display for InvalidStatusTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid listing transition: {} -> {}", self.from, self.to)
    }
}

impl Error for InvalidStatusTransition {}
