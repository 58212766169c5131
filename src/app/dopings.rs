use super::{non_empty, required_text, App, AppError, ModerationTarget};
use crate::cards::DopingView;
use crate::clock::format_ts;
use crate::db::{self, DopingRecord};
use crate::domain::account::Role;
use crate::domain::doping::{DopingStatus, DopingTier, DopingWindow};
use crate::domain::status::ListingStatus;
use crate::ids::new_id;

impl App {
    pub fn request_doping(&self, reference: &str, tier: DopingTier) -> Result<DopingView, AppError> {
        let (_, listing) = self.managed_listing(reference)?;
        if !listing.status.accepts_doping() {
            return Err(AppError::Conflict(format!(
                "listing {} is {} and cannot be boosted",
                listing.number, listing.status
            )));
        }
        if db::open_doping_exists(&self.conn, &listing.id, tier)? {
            return Err(AppError::Conflict(format!(
                "listing {} already has an open {tier} doping",
                listing.number
            )));
        }

        let package = self.config.doping.package(tier);
        let doping = DopingRecord {
            id: new_id("D"),
            listing_id: listing.id.clone(),
            tier,
            status: DopingStatus::Pending,
            days: i64::from(package.days),
            price: package.price,
            requested_at: self.now_ts(),
            starts_at: None,
            ends_at: None,
            decided_by: None,
            note: None,
        };
        db::insert_doping(&self.conn, &doping)?;
        tracing::info!(doping = %doping.id, listing = %listing.id, %tier, "doping requested");
        Ok(DopingView::new(doping, &listing.currency))
    }

    /// Payment confirmed: the window starts now.
    pub fn approve_doping(&self, doping_id: &str) -> Result<DopingView, AppError> {
        let admin = self.require_admin()?;
        let mut doping = self.find_doping(doping_id)?;
        let listing = self.find_listing(&doping.listing_id)?;
        if listing.status != ListingStatus::Active {
            return Err(AppError::Conflict(format!(
                "listing {} is {}; only active listings can start a doping",
                listing.number, listing.status
            )));
        }
        doping.status.validate_transition(DopingStatus::Active)?;
        let days = u32::try_from(doping.days).map_err(|_| {
            AppError::InvalidArgument(format!("doping {} has an invalid duration", doping.id))
        })?;
        let window = DopingWindow::starting(self.now(), days);
        doping.status = DopingStatus::Active;
        doping.starts_at = Some(format_ts(window.starts_at));
        doping.ends_at = Some(format_ts(window.ends_at));
        doping.decided_by = Some(admin.id.clone());

        let tx = self.conn.unchecked_transaction()?;
        db::update_doping(&tx, &doping)?;
        self.log_moderation(
            &tx,
            &admin,
            ModerationTarget::Doping(&doping.id),
            "approve_doping",
            None,
        )?;
        tx.commit()?;
        Ok(DopingView::new(doping, &listing.currency))
    }

    pub fn reject_doping(&self, doping_id: &str, note: &str) -> Result<DopingView, AppError> {
        let admin = self.require_admin()?;
        let note = required_text(note, "rejection note")?;
        let mut doping = self.find_doping(doping_id)?;
        doping.status.validate_transition(DopingStatus::Rejected)?;
        doping.status = DopingStatus::Rejected;
        doping.decided_by = Some(admin.id.clone());
        doping.note = Some(note.clone());

        let tx = self.conn.unchecked_transaction()?;
        db::update_doping(&tx, &doping)?;
        self.log_moderation(
            &tx,
            &admin,
            ModerationTarget::Doping(&doping.id),
            "reject_doping",
            Some(&note),
        )?;
        tx.commit()?;
        let currency = self.find_listing(&doping.listing_id)?.currency;
        Ok(DopingView::new(doping, &currency))
    }

    /// Owner withdraws a request that has not been decided yet.
    pub fn cancel_doping(&self, doping_id: &str, note: Option<&str>) -> Result<DopingView, AppError> {
        let mut doping = self.find_doping(doping_id)?;
        let (user, listing) = self.managed_listing(&doping.listing_id)?;
        doping.status.validate_transition(DopingStatus::Cancelled)?;
        doping.status = DopingStatus::Cancelled;
        doping.decided_by = Some(user.id.clone());
        doping.note = note.and_then(non_empty);
        db::update_doping(&self.conn, &doping)?;
        tracing::info!(doping = %doping.id, listing = %listing.id, "doping cancelled");
        Ok(DopingView::new(doping, &listing.currency))
    }

    pub fn list_dopings(&self, reference: &str) -> Result<Vec<DopingView>, AppError> {
        let user = self.require_session()?;
        let listing = self.visible_listing(reference, Some(&user))?;
        if listing.owner_id != user.id && user.role != Role::Admin {
            return Err(AppError::Forbidden(format!(
                "dopings of listing {} are visible to its owner only",
                listing.number
            )));
        }
        Ok(db::list_dopings_for_listing(&self.conn, &listing.id)?
            .into_iter()
            .map(|doping| DopingView::new(doping, &listing.currency))
            .collect())
    }

    fn find_doping(&self, doping_id: &str) -> Result<DopingRecord, AppError> {
        db::get_doping(&self.conn, doping_id.trim())?.ok_or_else(|| AppError::NotFound {
            kind: "doping",
            key: doping_id.trim().to_string(),
        })
    }
}
