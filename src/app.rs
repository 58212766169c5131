use std::error::Error;
use std::fmt;

use rusqlite::Connection;
use serde::Serialize;
use time::OffsetDateTime;

use crate::clock::{format_ts, now_utc};
use crate::config::{Config, ConfigError};
use crate::db::{self, ModerationLogRecord, UserRecord};
use crate::domain::account::{normalize_email, InvalidVerificationStep, Role};
use crate::domain::doping::InvalidDopingTransition;
use crate::domain::status::InvalidStatusTransition;
use crate::domain::ParseEnumError;
use crate::ids::new_id;

mod accounts;
mod catalog;
mod chat;
mod dopings;
mod favorites;
mod listings;
mod moderation;
mod saved;

pub use accounts::{NewAccount, ProfilePatch, UserView};
pub use chat::{ConversationView, InboxEntry};
pub use listings::{ListingPatch, NewListing};
pub use moderation::{ModerationEntry, ModerationQueue, ModerationStats};
pub use saved::SavedFilterView;

pub struct App {
    conn: Connection,
    config: Config,
    actor: Option<String>,
    fixed_now: Option<OffsetDateTime>,
}

impl App {
    pub fn open(db_path: &str, config: Config) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let conn = db::open_connection(db_path)?;
        Ok(Self {
            conn,
            config,
            actor: None,
            fixed_now: None,
        })
    }

    /// Names the acting user by email for the following calls.
    pub fn act_as(&mut self, email: Option<&str>) {
        self.actor = email.map(|raw| raw.trim().to_ascii_lowercase());
    }

    /// Pins the clock; `None` returns to wall time.
    #[cfg(test)]
    pub fn set_clock(&mut self, at: Option<OffsetDateTime>) {
        self.fixed_now = at;
    }

    fn now(&self) -> OffsetDateTime {
        self.fixed_now.unwrap_or_else(now_utc)
    }

    fn now_ts(&self) -> String {
        format_ts(self.now())
    }

    /// Session user, if `--as` named one.
    fn session(&self) -> Result<Option<UserRecord>, AppError> {
        let Some(actor) = self.actor.as_deref() else {
            return Ok(None);
        };
        let email = normalize_email(actor).ok_or_else(|| {
            AppError::InvalidArgument(format!("'{actor}' is not a valid email address"))
        })?;
        let user = db::get_user_by_email(&self.conn, &email)?.ok_or_else(|| AppError::NotFound {
            kind: "user",
            key: email.clone(),
        })?;
        Ok(Some(user))
    }

    fn require_session(&self) -> Result<UserRecord, AppError> {
        self.session()?.ok_or_else(|| {
            AppError::Forbidden("this command needs a session; pass --as <email>".to_string())
        })
    }

    /// Session allowed to mutate state.
    fn require_writer(&self) -> Result<UserRecord, AppError> {
        let user = self.require_session()?;
        if user.banned {
            return Err(AppError::Forbidden(format!(
                "account {} is banned",
                user.email
            )));
        }
        Ok(user)
    }

    fn require_admin(&self) -> Result<UserRecord, AppError> {
        let user = self.require_writer()?;
        if user.role != Role::Admin {
            return Err(AppError::Forbidden("admin role required".to_string()));
        }
        Ok(user)
    }

    fn user_by_email(&self, raw: &str) -> Result<UserRecord, AppError> {
        let email = normalize_email(raw)
            .ok_or_else(|| AppError::InvalidArgument(format!("'{raw}' is not a valid email address")))?;
        db::get_user_by_email(&self.conn, &email)?.ok_or(AppError::NotFound {
            kind: "user",
            key: email,
        })
    }

    fn log_moderation(
        &self,
        conn: &Connection,
        actor: &UserRecord,
        target: ModerationTarget<'_>,
        action: &str,
        note: Option<&str>,
    ) -> Result<(), AppError> {
        let (target_kind, target_id) = target.parts();
        db::insert_moderation_log(
            conn,
            &ModerationLogRecord {
                id: new_id("G"),
                actor_id: actor.id.clone(),
                target_kind: target_kind.to_string(),
                target_id: target_id.to_string(),
                action: action.to_string(),
                note: note.map(str::to_string),
                occurred_at: self.now_ts(),
            },
        )?;
        tracing::info!(
            actor = %actor.email,
            target_kind,
            target_id,
            action,
            "moderation action recorded"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum ModerationTarget<'a> {
    Listing(&'a str),
    Doping(&'a str),
    User(&'a str),
}

impl<'a> ModerationTarget<'a> {
    fn parts(self) -> (&'static str, &'a str) {
        match self {
            ModerationTarget::Listing(id) => ("listing", id),
            ModerationTarget::Doping(id) => ("doping", id),
            ModerationTarget::User(id) => ("user", id),
        }
    }
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn required_text(raw: &str, what: &str) -> Result<String, AppError> {
    non_empty(raw).ok_or_else(|| AppError::InvalidArgument(format!("{what} cannot be empty")))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Removed {
    pub id: String,
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Json(serde_json::Error),
    Config(ConfigError),
    Parse(ParseEnumError),
    InvalidTransition(InvalidStatusTransition),
    InvalidDopingTransition(InvalidDopingTransition),
    InvalidVerification(InvalidVerificationStep),
    InvalidArgument(String),
    NotFound { kind: &'static str, key: String },
    Forbidden(String),
    Conflict(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Db(err) => write!(f, "database error: {}", err),
            AppError::Json(err) => write!(f, "json error: {}", err),
            AppError::Config(err) => write!(f, "config error: {}", err),
            AppError::Parse(err) => write!(f, "{}", err),
            AppError::InvalidTransition(err) => write!(f, "{}", err),
            AppError::InvalidDopingTransition(err) => write!(f, "{}", err),
            AppError::InvalidVerification(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
            AppError::NotFound { kind, key } => write!(f, "{} '{}' not found", kind, key),
            AppError::Forbidden(message) => write!(f, "forbidden: {}", message),
            AppError::Conflict(message) => write!(f, "conflict: {}", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Json(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Parse(err) => Some(err),
            AppError::InvalidTransition(err) => Some(err),
            AppError::InvalidDopingTransition(err) => Some(err),
            AppError::InvalidVerification(err) => Some(err),
            AppError::InvalidArgument(_)
            | AppError::NotFound { .. }
            | AppError::Forbidden(_)
            | AppError::Conflict(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::Json(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<ParseEnumError> for AppError {
    fn from(value: ParseEnumError) -> Self {
        AppError::Parse(value)
    }
}

impl From<InvalidStatusTransition> for AppError {
    fn from(value: InvalidStatusTransition) -> Self {
        AppError::InvalidTransition(value)
    }
}

impl From<InvalidDopingTransition> for AppError {
    fn from(value: InvalidDopingTransition) -> Self {
        AppError::InvalidDopingTransition(value)
    }
}

impl From<InvalidVerificationStep> for AppError {
    fn from(value: InvalidVerificationStep) -> Self {
        AppError::InvalidVerification(value)
    }
}

#[cfg(test)]
mod tests;
#[cfg(test)]
mod tests_listings;
#[cfg(test)]
mod tests_members;
