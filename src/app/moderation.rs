use std::collections::BTreeMap;

use serde::Serialize;

use super::{required_text, App, AppError, ModerationTarget, UserView};
use crate::cards::{DopingView, ListingView};
use crate::clock::format_ts;
use crate::db::{self, ModerationLogRecord};
use crate::domain::account::Verification;
use crate::domain::doping::DopingStatus;
use crate::domain::status::ListingStatus;

use super::listings::close_dopings;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModerationQueue {
    pub listings: Vec<ListingView>,
    pub dopings: Vec<DopingView>,
    pub verifications: Vec<UserView>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModerationStats {
    pub listings_by_status: BTreeMap<String, i64>,
    pub users: i64,
    pub corporate_users: i64,
    pub pending_listings: i64,
    pub pending_dopings: usize,
    pub pending_verifications: usize,
    pub schema_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModerationEntry {
    pub id: String,
    pub actor_id: String,
    pub target_kind: String,
    pub target_id: String,
    pub action: String,
    pub note: Option<String>,
    pub occurred_at: String,
}

impl From<ModerationLogRecord> for ModerationEntry {
    fn from(value: ModerationLogRecord) -> Self {
        Self {
            id: value.id,
            actor_id: value.actor_id,
            target_kind: value.target_kind,
            target_id: value.target_id,
            action: value.action,
            note: value.note,
            occurred_at: value.occurred_at,
        }
    }
}

impl App {
    pub fn approve_listing(&self, reference: &str) -> Result<ListingView, AppError> {
        let admin = self.require_admin()?;
        let mut listing = self.find_listing(reference)?;
        if listing.status != ListingStatus::Pending {
            return Err(AppError::Conflict(format!(
                "listing {} is {}, not pending",
                listing.number, listing.status
            )));
        }
        self.apply_transition(&mut listing, ListingStatus::Active, self.now())?;

        let tx = self.conn.unchecked_transaction()?;
        db::update_listing(&tx, &listing)?;
        self.log_moderation(
            &tx,
            &admin,
            ModerationTarget::Listing(&listing.id),
            "approve",
            None,
        )?;
        tx.commit()?;
        Ok(ListingView::from(listing))
    }

    /// Reject a pending listing or take down an active one.
    pub fn reject_listing(&self, reference: &str, reason: &str) -> Result<ListingView, AppError> {
        let admin = self.require_admin()?;
        let reason = required_text(reason, "rejection reason")?;
        let mut listing = self.find_listing(reference)?;
        let now = self.now();
        self.apply_transition(&mut listing, ListingStatus::Rejected, now)?;
        listing.rejection_reason = Some(reason.clone());

        let tx = self.conn.unchecked_transaction()?;
        db::update_listing(&tx, &listing)?;
        close_dopings(&tx, &listing.id, &format_ts(now), true)?;
        self.log_moderation(
            &tx,
            &admin,
            ModerationTarget::Listing(&listing.id),
            "reject",
            Some(&reason),
        )?;
        tx.commit()?;
        Ok(ListingView::from(listing))
    }

    /// Undo a soft delete, back to the status the listing had before.
    pub fn restore_listing(&self, reference: &str) -> Result<ListingView, AppError> {
        let admin = self.require_admin()?;
        let mut listing = self.find_listing(reference)?;
        if listing.status != ListingStatus::Deleted {
            return Err(AppError::Conflict(format!(
                "listing {} is {}, not deleted",
                listing.number, listing.status
            )));
        }
        let target = ListingStatus::restore_target(listing.status_before_delete);
        listing.status = target;
        listing.status_before_delete = None;
        listing.updated_at = self.now_ts();

        let tx = self.conn.unchecked_transaction()?;
        db::update_listing(&tx, &listing)?;
        self.log_moderation(
            &tx,
            &admin,
            ModerationTarget::Listing(&listing.id),
            "restore",
            Some(target.as_str()),
        )?;
        tx.commit()?;
        tracing::info!(listing = %listing.id, to = %target, "listing restored");
        Ok(ListingView::from(listing))
    }

    pub fn moderation_queue(&self) -> Result<ModerationQueue, AppError> {
        self.require_admin()?;
        let listings = db::list_listings_with_status(&self.conn, ListingStatus::Pending)?
            .into_iter()
            .map(ListingView::from)
            .collect();
        let dopings = db::list_dopings_with_status(&self.conn, DopingStatus::Pending)?
            .into_iter()
            .map(|doping| {
                let currency = self.find_listing(&doping.listing_id)?.currency;
                Ok(DopingView::new(doping, &currency))
            })
            .collect::<Result<Vec<_>, AppError>>()?;
        let verifications = db::list_users_with_verification(&self.conn, Verification::Pending)?
            .into_iter()
            .map(UserView::from)
            .collect();
        Ok(ModerationQueue {
            listings,
            dopings,
            verifications,
        })
    }

    pub fn moderation_stats(&self) -> Result<ModerationStats, AppError> {
        self.require_admin()?;
        let mut listings_by_status = ListingStatus::ALL
            .iter()
            .map(|status| (status.to_string(), 0))
            .collect::<BTreeMap<_, _>>();
        for (status, count) in db::count_listings_by_status(&self.conn)? {
            listings_by_status.insert(status.to_string(), count);
        }
        let (users, corporate_users) = db::count_users(&self.conn)?;
        Ok(ModerationStats {
            pending_listings: listings_by_status
                .get(ListingStatus::Pending.as_str())
                .copied()
                .unwrap_or(0),
            listings_by_status,
            users,
            corporate_users,
            pending_dopings: db::list_dopings_with_status(&self.conn, DopingStatus::Pending)?.len(),
            pending_verifications: db::list_users_with_verification(
                &self.conn,
                Verification::Pending,
            )?
            .len(),
            schema_version: db::get_meta(&self.conn, "schema_version")?,
        })
    }

    pub fn moderation_log(&self, limit: u32) -> Result<Vec<ModerationEntry>, AppError> {
        self.require_admin()?;
        Ok(db::list_moderation_log(&self.conn, limit.max(1))?
            .into_iter()
            .map(ModerationEntry::from)
            .collect())
    }
}
