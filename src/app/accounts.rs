use serde::Serialize;

use super::{non_empty, required_text, App, AppError, ModerationTarget};
use crate::db::{self, UserRecord};
use crate::domain::account::{normalize_email, AccountKind, Role, Verification};
use crate::ids::new_id;

#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub display_name: String,
    pub kind: AccountKind,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
}

impl ProfilePatch {
    fn has_changes(&self) -> bool {
        self.display_name.is_some()
            || self.phone.is_some()
            || self.city.is_some()
            || self.company_name.is_some()
            || self.tax_number.is_some()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub role: Role,
    pub account_kind: AccountKind,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
    pub verification: Verification,
    pub verification_note: Option<String>,
    pub banned: bool,
    pub created_at: String,
}

impl From<UserRecord> for UserView {
    fn from(value: UserRecord) -> Self {
        Self {
            id: value.id,
            email: value.email,
            display_name: value.display_name,
            phone: value.phone,
            city: value.city,
            role: value.role,
            account_kind: value.account_kind,
            company_name: value.company_name,
            tax_number: value.tax_number,
            verification: value.verification,
            verification_note: value.verification_note,
            banned: value.banned,
            created_at: value.created_at,
        }
    }
}

impl App {
    pub fn register(&self, account: NewAccount) -> Result<UserView, AppError> {
        let email = normalize_email(&account.email).ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "'{}' is not a valid email address",
                account.email
            ))
        })?;
        let display_name = required_text(&account.display_name, "display name")?;
        if db::get_user_by_email(&self.conn, &email)?.is_some() {
            return Err(AppError::Conflict(format!(
                "an account for {email} already exists"
            )));
        }

        let company_name = account.company_name.as_deref().and_then(non_empty);
        let tax_number = account.tax_number.as_deref().and_then(non_empty);
        match account.kind {
            AccountKind::Corporate if company_name.is_none() || tax_number.is_none() => {
                return Err(AppError::InvalidArgument(
                    "corporate accounts need a company name and tax number".to_string(),
                ));
            }
            AccountKind::Individual if company_name.is_some() || tax_number.is_some() => {
                return Err(AppError::InvalidArgument(
                    "company fields are only accepted for corporate accounts".to_string(),
                ));
            }
            _ => {}
        }

        let now = self.now_ts();
        let user = UserRecord {
            id: new_id("U"),
            email,
            display_name,
            phone: account.phone.as_deref().and_then(non_empty),
            city: account.city.as_deref().and_then(non_empty),
            role: Role::Member,
            account_kind: account.kind,
            company_name,
            tax_number,
            verification: account.kind.initial_verification(),
            verification_note: None,
            banned: false,
            created_at: now.clone(),
            updated_at: now,
        };
        db::insert_user(&self.conn, &user)?;
        tracing::info!(user = %user.id, kind = %user.account_kind, "account registered");
        Ok(UserView::from(user))
    }

    pub fn whoami(&self) -> Result<UserView, AppError> {
        Ok(UserView::from(self.require_session()?))
    }

    pub fn update_profile(&self, patch: ProfilePatch) -> Result<UserView, AppError> {
        let mut user = self.require_writer()?;
        if !patch.has_changes() {
            return Err(AppError::InvalidArgument(
                "profile update requires at least one field".to_string(),
            ));
        }
        let touches_company = patch.company_name.is_some() || patch.tax_number.is_some();
        if touches_company && user.account_kind != AccountKind::Corporate {
            return Err(AppError::InvalidArgument(
                "company fields are only accepted for corporate accounts".to_string(),
            ));
        }

        if let Some(name) = patch.display_name.as_deref() {
            user.display_name = required_text(name, "display name")?;
        }
        // Blank clears the optional contact fields.
        if let Some(phone) = patch.phone.as_deref() {
            user.phone = non_empty(phone);
        }
        if let Some(city) = patch.city.as_deref() {
            user.city = non_empty(city);
        }
        let mut identity_changed = false;
        if let Some(company) = patch.company_name.as_deref() {
            let company = required_text(company, "company name")?;
            identity_changed |= user.company_name.as_deref() != Some(company.as_str());
            user.company_name = Some(company);
        }
        if let Some(tax) = patch.tax_number.as_deref() {
            let tax = required_text(tax, "tax number")?;
            identity_changed |= user.tax_number.as_deref() != Some(tax.as_str());
            user.tax_number = Some(tax);
        }
        // A verified dealer whose legal identity changes goes back to review.
        if identity_changed && user.verification == Verification::Verified {
            user.verification = Verification::Pending;
            user.verification_note = None;
        }

        user.updated_at = self.now_ts();
        db::update_user(&self.conn, &user)?;
        tracing::info!(user = %user.id, "profile updated");
        Ok(UserView::from(user))
    }

    pub fn request_verification(&self, note: Option<&str>) -> Result<UserView, AppError> {
        let mut user = self.require_writer()?;
        user.verification.validate_transition(Verification::Pending)?;
        user.verification = Verification::Pending;
        user.verification_note = note.and_then(non_empty);
        user.updated_at = self.now_ts();
        db::update_user(&self.conn, &user)?;
        tracing::info!(user = %user.id, "verification requested");
        Ok(UserView::from(user))
    }

    pub fn approve_verification(&self, email: &str) -> Result<UserView, AppError> {
        self.decide_verification(email, Verification::Verified, None)
    }

    pub fn reject_verification(&self, email: &str, note: &str) -> Result<UserView, AppError> {
        let note = required_text(note, "rejection note")?;
        self.decide_verification(email, Verification::Rejected, Some(note))
    }

    fn decide_verification(
        &self,
        email: &str,
        next: Verification,
        note: Option<String>,
    ) -> Result<UserView, AppError> {
        let admin = self.require_admin()?;
        let mut user = self.user_by_email(email)?;
        user.verification.validate_transition(next)?;
        user.verification = next;
        user.verification_note = note;
        user.updated_at = self.now_ts();

        let tx = self.conn.unchecked_transaction()?;
        db::update_user(&tx, &user)?;
        let action = match next {
            Verification::Verified => "approve_verification",
            _ => "reject_verification",
        };
        self.log_moderation(
            &tx,
            &admin,
            ModerationTarget::User(&user.id),
            action,
            user.verification_note.as_deref(),
        )?;
        tx.commit()?;
        Ok(UserView::from(user))
    }

    /// Admin only, except that the first admin may be bootstrapped by any
    /// session while no admin exists.
    pub fn promote(&self, email: &str) -> Result<UserView, AppError> {
        let actor = self.require_writer()?;
        let bootstrap = db::count_admins(&self.conn)? == 0;
        if !bootstrap && actor.role != Role::Admin {
            return Err(AppError::Forbidden("admin role required".to_string()));
        }
        let mut user = self.user_by_email(email)?;
        if user.role == Role::Admin {
            return Ok(UserView::from(user));
        }
        if user.banned {
            return Err(AppError::Conflict(format!(
                "{} is banned and cannot be promoted",
                user.email
            )));
        }
        user.role = Role::Admin;
        user.updated_at = self.now_ts();

        let tx = self.conn.unchecked_transaction()?;
        db::update_user(&tx, &user)?;
        let note = bootstrap.then_some("bootstrap");
        self.log_moderation(&tx, &actor, ModerationTarget::User(&user.id), "promote", note)?;
        tx.commit()?;
        Ok(UserView::from(user))
    }

    pub fn ban(&self, email: &str, reason: Option<&str>) -> Result<UserView, AppError> {
        self.set_banned(email, true, reason)
    }

    pub fn unban(&self, email: &str) -> Result<UserView, AppError> {
        self.set_banned(email, false, None)
    }

    fn set_banned(
        &self,
        email: &str,
        banned: bool,
        reason: Option<&str>,
    ) -> Result<UserView, AppError> {
        let admin = self.require_admin()?;
        let mut user = self.user_by_email(email)?;
        if user.id == admin.id {
            return Err(AppError::Conflict("admins cannot ban themselves".to_string()));
        }
        if user.banned == banned {
            return Ok(UserView::from(user));
        }
        user.banned = banned;
        user.updated_at = self.now_ts();

        let tx = self.conn.unchecked_transaction()?;
        db::update_user(&tx, &user)?;
        let action = if banned { "ban" } else { "unban" };
        let reason = reason.and_then(non_empty);
        self.log_moderation(
            &tx,
            &admin,
            ModerationTarget::User(&user.id),
            action,
            reason.as_deref(),
        )?;
        tx.commit()?;
        Ok(UserView::from(user))
    }
}
