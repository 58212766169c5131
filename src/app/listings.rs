use std::collections::BTreeSet;

use rusqlite::Connection;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use super::{non_empty, required_text, App, AppError, ModerationTarget};
use crate::cards::{CardFormat, CardPage, DetailView, DopingView, ImageView, ListingView, SellerSummary};
use crate::clock::{format_ts, parse_ts};
use crate::db::{self, DopingRecord, ImageRecord, ListingRecord, UserRecord};
use crate::domain::account::{AccountKind, Role, Verification};
use crate::domain::doping::{effective_tier, DopingStatus, DopingTier, DopingWindow};
use crate::domain::status::ListingStatus;
use crate::domain::vehicle::{normalize_attribute, DamageEntry, VehicleSpec};
use crate::ids::{generate_listing_number, new_id};
use crate::listing_query::{self, ListingFilter, ListingHit, PageRequest, QueryScope, SearchPage};

#[derive(Debug, Clone, Default)]
pub struct NewListing {
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub price: i64,
    pub currency: Option<String>,
    pub city: Option<String>,
    pub vehicle: VehicleSpec,
    pub equipment: Vec<String>,
    pub damage: Vec<DamageEntry>,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ListingPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub city: Option<String>,
    pub category: Option<String>,
    pub vehicle: VehicleSpec,
    pub equipment: Option<Vec<String>>,
    pub damage: Option<Vec<DamageEntry>>,
}

impl ListingPatch {
    fn has_changes(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.price.is_some()
            || self.city.is_some()
            || self.category.is_some()
            || !self.vehicle.is_empty()
            || self.equipment.is_some()
            || self.damage.is_some()
    }

    /// Fields a moderator has to look at again when the owner changes them.
    fn touches_material_fields(&self) -> bool {
        self.title.is_some()
            || self.description.is_some()
            || self.category.is_some()
            || !self.vehicle.is_empty()
            || self.equipment.is_some()
            || self.damage.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SweepSummary {
    pub at: String,
    pub expired_dopings: usize,
    pub expired_listings: usize,
}

impl App {
    pub(super) fn find_listing(&self, reference: &str) -> Result<ListingRecord, AppError> {
        let reference = reference.trim();
        let found = if reference.starts_with("L-") {
            db::get_listing(&self.conn, reference)?
        } else {
            db::get_listing_by_number(&self.conn, reference)?
        };
        found.ok_or_else(|| AppError::NotFound {
            kind: "listing",
            key: reference.to_string(),
        })
    }

    /// Listing the viewer may see; hidden listings read as missing.
    pub(super) fn visible_listing(
        &self,
        reference: &str,
        viewer: Option<&UserRecord>,
    ) -> Result<ListingRecord, AppError> {
        let listing = self.find_listing(reference)?;
        if listing_visible_to(&listing, viewer) {
            Ok(listing)
        } else {
            Err(AppError::NotFound {
                kind: "listing",
                key: reference.trim().to_string(),
            })
        }
    }

    /// Listing the session may change: its owner or an admin.
    pub(super) fn managed_listing(
        &self,
        reference: &str,
    ) -> Result<(UserRecord, ListingRecord), AppError> {
        let user = self.require_writer()?;
        let listing = self.visible_listing(reference, Some(&user))?;
        if listing.owner_id != user.id && user.role != Role::Admin {
            return Err(AppError::Forbidden(format!(
                "listing {} belongs to another member",
                listing.number
            )));
        }
        Ok((user, listing))
    }

    pub fn create_listing(&self, input: NewListing) -> Result<DetailView, AppError> {
        let owner = self.require_writer()?;
        if owner.account_kind == AccountKind::Corporate
            && owner.verification != Verification::Verified
        {
            return Err(AppError::Forbidden(
                "corporate accounts must be verified before publishing".to_string(),
            ));
        }

        let title = self.checked_title(&input.title)?;
        check_price(input.price)?;
        let currency = self.checked_currency(input.currency.as_deref())?;
        let category_id = self.resolve_category_id(&input.category)?;
        let vehicle = normalized_vehicle(input.vehicle)?;
        let equipment = normalized_equipment(&input.equipment);
        let images = checked_urls(&input.images)?;
        if images.len() > self.config.listing.max_images as usize {
            return Err(AppError::InvalidArgument(format!(
                "a listing holds at most {} images",
                self.config.listing.max_images
            )));
        }

        let now = self.now();
        let number = generate_listing_number(|candidate| {
            db::listing_number_exists(&self.conn, candidate)
        })?
        .ok_or_else(|| AppError::Conflict("no free listing number left".to_string()))?;
        let mut listing = ListingRecord {
            id: new_id("L"),
            number,
            owner_id: owner.id.clone(),
            category_id,
            title,
            description: input.description.as_deref().and_then(non_empty),
            price: input.price,
            currency,
            city: input.city.as_deref().and_then(non_empty),
            status: ListingStatus::Pending,
            rejection_reason: None,
            status_before_delete: None,
            created_at: format_ts(now),
            updated_at: format_ts(now),
            published_at: None,
            expires_at: None,
        };
        if !self.config.listing.require_approval {
            self.apply_transition(&mut listing, ListingStatus::Active, now)?;
        }

        let tx = self.conn.unchecked_transaction()?;
        db::insert_listing(&tx, &listing)?;
        if !vehicle.is_empty() {
            db::upsert_vehicle(&tx, &listing.id, &vehicle)?;
        }
        db::replace_equipment(&tx, &listing.id, &equipment)?;
        db::replace_damage(&tx, &listing.id, &input.damage)?;
        let images = images
            .into_iter()
            .map(|url| ImageRecord {
                id: new_id("I"),
                listing_id: listing.id.clone(),
                url,
                position: 0,
            })
            .collect::<Vec<_>>();
        db::replace_images(&tx, &listing.id, &images)?;
        tx.commit()?;

        tracing::info!(
            listing = %listing.id,
            number = %listing.number,
            status = %listing.status,
            "listing created"
        );
        self.detail_view(listing, Some(&owner))
    }

    pub fn edit_listing(&self, reference: &str, patch: ListingPatch) -> Result<DetailView, AppError> {
        let (user, mut listing) = self.managed_listing(reference)?;
        if !patch.has_changes() {
            return Err(AppError::InvalidArgument(
                "listing edit requires at least one field".to_string(),
            ));
        }
        if matches!(listing.status, ListingStatus::Deleted | ListingStatus::Sold) {
            return Err(AppError::Conflict(format!(
                "listing {} is {} and can no longer be edited",
                listing.number, listing.status
            )));
        }

        if let Some(title) = patch.title.as_deref() {
            listing.title = self.checked_title(title)?;
        }
        if let Some(description) = patch.description.as_deref() {
            listing.description = non_empty(description);
        }
        if let Some(price) = patch.price {
            check_price(price)?;
            listing.price = price;
        }
        if let Some(city) = patch.city.as_deref() {
            listing.city = non_empty(city);
        }
        if let Some(category) = patch.category.as_deref() {
            listing.category_id = self.resolve_category_id(category)?;
        }
        let vehicle = if patch.vehicle.is_empty() {
            None
        } else {
            let mut merged = db::get_vehicle(&self.conn, &listing.id)?.unwrap_or_default();
            merged.merge(patch.vehicle.clone());
            merged.validate().map_err(AppError::InvalidArgument)?;
            Some(merged)
        };
        let equipment = patch.equipment.as_deref().map(normalized_equipment);

        let now = self.now();
        let by_owner = listing.owner_id == user.id;
        if by_owner && patch.touches_material_fields() {
            match listing.status {
                ListingStatus::Active if self.config.listing.require_approval => {
                    self.apply_transition(&mut listing, ListingStatus::Pending, now)?;
                }
                ListingStatus::Rejected => self.resubmit(&mut listing, now)?,
                _ => {}
            }
        }
        listing.updated_at = format_ts(now);

        let tx = self.conn.unchecked_transaction()?;
        db::update_listing(&tx, &listing)?;
        if let Some(vehicle) = vehicle.as_ref() {
            db::upsert_vehicle(&tx, &listing.id, vehicle)?;
        }
        if let Some(equipment) = equipment.as_ref() {
            db::replace_equipment(&tx, &listing.id, equipment)?;
        }
        if let Some(damage) = patch.damage.as_ref() {
            db::replace_damage(&tx, &listing.id, damage)?;
        }
        tx.commit()?;

        tracing::info!(listing = %listing.id, status = %listing.status, "listing edited");
        self.detail_view(listing, Some(&user))
    }

    pub fn show_listing(&self, reference: &str) -> Result<DetailView, AppError> {
        let viewer = self.session()?;
        let listing = self.visible_listing(reference, viewer.as_ref())?;
        self.detail_view(listing, viewer.as_ref())
    }

    pub fn search(
        &self,
        filter: &ListingFilter,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<SearchPage<ListingHit>, AppError> {
        filter.validate().map_err(AppError::InvalidArgument)?;
        let filter = filter.normalized();
        let scope = self.query_scope(&filter)?;
        let request = PageRequest::new(page, self.config.clamp_page_size(per_page));
        Ok(listing_query::search(&self.conn, &filter, &scope, request)?)
    }

    pub fn search_cards(
        &self,
        filter: &ListingFilter,
        format: CardFormat,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<CardPage, AppError> {
        let page = if format == CardFormat::Showcase {
            // Paginate over showcase listings only, so every page is full.
            let showcase = ListingFilter {
                featured: Some(DopingTier::Gold),
                ..filter.clone()
            };
            self.search(&showcase, page, per_page)?
        } else {
            self.search(filter, page, per_page)?
        };
        Ok(CardPage::build(format, &page))
    }

    fn query_scope(&self, filter: &ListingFilter) -> Result<QueryScope, AppError> {
        let viewer = self.session()?;
        let mut scope = QueryScope {
            category_root: None,
            statuses: vec![ListingStatus::Active],
            owner_id: None,
            now: self.now_ts(),
            featured_first: self.config.search.featured_first,
        };

        if filter.mine {
            let user = viewer.ok_or_else(|| {
                AppError::Forbidden("--mine needs a session; pass --as <email>".to_string())
            })?;
            scope.owner_id = Some(user.id);
            scope.statuses = match filter.status {
                Some(status) => vec![status],
                None => ListingStatus::ALL
                    .into_iter()
                    .filter(|status| *status != ListingStatus::Deleted)
                    .collect(),
            };
        } else if let Some(status) = filter.status {
            if !viewer.is_some_and(|user| user.role == Role::Admin) {
                return Err(AppError::Forbidden(
                    "only admins can search by listing status".to_string(),
                ));
            }
            scope.statuses = vec![status];
        }

        scope.category_root = match (filter.category.as_deref(), filter.brand.as_deref()) {
            (category, Some(brand)) => {
                let base = category.map(|path| self.show_category(path)).transpose()?;
                Some(self.vehicle_lookup_id(
                    base.as_ref().map(|view| view.path.as_str()),
                    brand,
                    filter.model.as_deref(),
                    filter.submodel.as_deref(),
                )?)
            }
            (Some(category), None) => Some(self.resolve_category_id(category)?),
            (None, None) => None,
        };
        Ok(scope)
    }

    pub fn listing_images(&self, reference: &str) -> Result<Vec<ImageView>, AppError> {
        let viewer = self.session()?;
        let listing = self.visible_listing(reference, viewer.as_ref())?;
        Ok(db::list_images(&self.conn, &listing.id)?
            .into_iter()
            .map(ImageView::from)
            .collect())
    }

    pub fn add_images(&self, reference: &str, urls: &[String]) -> Result<Vec<ImageView>, AppError> {
        let (_, listing) = self.managed_writable_listing(reference)?;
        let urls = checked_urls(urls)?;
        if urls.is_empty() {
            return Err(AppError::InvalidArgument("no image urls given".to_string()));
        }
        let mut images = db::list_images(&self.conn, &listing.id)?;
        let limit = self.config.listing.max_images as usize;
        if images.len() + urls.len() > limit {
            return Err(AppError::InvalidArgument(format!(
                "a listing holds at most {limit} images ({} already attached)",
                images.len()
            )));
        }
        images.extend(urls.into_iter().map(|url| ImageRecord {
            id: new_id("I"),
            listing_id: listing.id.clone(),
            url,
            position: 0,
        }));
        self.store_images(&listing, &images)
    }

    pub fn remove_image(&self, reference: &str, image_id: &str) -> Result<Vec<ImageView>, AppError> {
        let (_, listing) = self.managed_writable_listing(reference)?;
        let mut images = db::list_images(&self.conn, &listing.id)?;
        let index = image_index(&images, image_id)?;
        images.remove(index);
        self.store_images(&listing, &images)
    }

    /// Position 0 is the cover image.
    pub fn move_image(
        &self,
        reference: &str,
        image_id: &str,
        position: usize,
    ) -> Result<Vec<ImageView>, AppError> {
        let (_, listing) = self.managed_writable_listing(reference)?;
        let mut images = db::list_images(&self.conn, &listing.id)?;
        let index = image_index(&images, image_id)?;
        let image = images.remove(index);
        let position = position.min(images.len());
        images.insert(position, image);
        self.store_images(&listing, &images)
    }

    fn managed_writable_listing(
        &self,
        reference: &str,
    ) -> Result<(UserRecord, ListingRecord), AppError> {
        let (user, listing) = self.managed_listing(reference)?;
        if matches!(listing.status, ListingStatus::Deleted | ListingStatus::Sold) {
            return Err(AppError::Conflict(format!(
                "listing {} is {} and can no longer be edited",
                listing.number, listing.status
            )));
        }
        Ok((user, listing))
    }

    fn store_images(
        &self,
        listing: &ListingRecord,
        images: &[ImageRecord],
    ) -> Result<Vec<ImageView>, AppError> {
        let tx = self.conn.unchecked_transaction()?;
        db::replace_images(&tx, &listing.id, images)?;
        tx.execute(
            "UPDATE listings SET updated_at = ?2 WHERE id = ?1",
            rusqlite::params![listing.id, self.now_ts()],
        )?;
        tx.commit()?;
        tracing::info!(listing = %listing.id, images = images.len(), "listing images updated");
        Ok(db::list_images(&self.conn, &listing.id)?
            .into_iter()
            .map(ImageView::from)
            .collect())
    }

    pub fn mark_sold(&self, reference: &str) -> Result<ListingView, AppError> {
        let (_, mut listing) = self.managed_listing(reference)?;
        let now = self.now();
        self.apply_transition(&mut listing, ListingStatus::Sold, now)?;
        let tx = self.conn.unchecked_transaction()?;
        db::update_listing(&tx, &listing)?;
        close_dopings(&tx, &listing.id, &format_ts(now), true)?;
        tx.commit()?;
        Ok(ListingView::from(listing))
    }

    pub fn renew_listing(&self, reference: &str) -> Result<ListingView, AppError> {
        let (_, mut listing) = self.managed_listing(reference)?;
        if listing.status != ListingStatus::Expired {
            return Err(AppError::Conflict(format!(
                "only expired listings can be renewed; {} is {}",
                listing.number, listing.status
            )));
        }
        self.resubmit(&mut listing, self.now())?;
        db::update_listing(&self.conn, &listing)?;
        Ok(ListingView::from(listing))
    }

    /// Soft delete by the owner or an admin; the previous status is kept for restore.
    pub fn delete_listing(
        &self,
        reference: &str,
        reason: Option<&str>,
    ) -> Result<ListingView, AppError> {
        let (user, mut listing) = self.managed_listing(reference)?;
        if listing.status == ListingStatus::Deleted {
            return Err(AppError::Conflict(format!(
                "listing {} is already deleted",
                listing.number
            )));
        }
        let now = self.now();
        self.apply_transition(&mut listing, ListingStatus::Deleted, now)?;
        let reason = reason.and_then(non_empty);

        let tx = self.conn.unchecked_transaction()?;
        db::update_listing(&tx, &listing)?;
        close_dopings(&tx, &listing.id, &format_ts(now), true)?;
        self.log_moderation(
            &tx,
            &user,
            ModerationTarget::Listing(&listing.id),
            "delete",
            reason.as_deref(),
        )?;
        tx.commit()?;
        Ok(ListingView::from(listing))
    }

    /// Expires dopings and listings whose end has passed at `at` (default: now).
    pub fn sweep(&self, at: Option<OffsetDateTime>) -> Result<SweepSummary, AppError> {
        let now = at.unwrap_or_else(|| self.now());
        let cutoff = format_ts(now);
        let mut summary = SweepSummary {
            at: cutoff.clone(),
            ..SweepSummary::default()
        };

        let tx = self.conn.unchecked_transaction()?;
        for mut doping in db::list_dopings_to_expire(&tx, &cutoff)? {
            doping.status.validate_transition(DopingStatus::Expired)?;
            doping.status = DopingStatus::Expired;
            db::update_doping(&tx, &doping)?;
            summary.expired_dopings += 1;
        }
        for mut listing in db::list_listings_expiring_before(&tx, &cutoff)? {
            self.apply_transition(&mut listing, ListingStatus::Expired, now)?;
            db::update_listing(&tx, &listing)?;
            summary.expired_dopings += close_dopings(&tx, &listing.id, &cutoff, false)?;
            summary.expired_listings += 1;
        }
        tx.commit()?;

        tracing::info!(
            at = %summary.at,
            dopings = summary.expired_dopings,
            listings = summary.expired_listings,
            "sweep finished"
        );
        Ok(summary)
    }

    /// Validated status change stamped at `at`.
    pub(super) fn apply_transition(
        &self,
        listing: &mut ListingRecord,
        next: ListingStatus,
        at: OffsetDateTime,
    ) -> Result<(), AppError> {
        let from = listing.status;
        from.validate_transition(next)?;
        if from == next {
            return Ok(());
        }
        match next {
            ListingStatus::Active => {
                let expiry = at + Duration::days(i64::from(self.config.listing.expiry_days));
                listing.published_at = Some(format_ts(at));
                listing.expires_at = Some(format_ts(expiry));
                listing.rejection_reason = None;
            }
            ListingStatus::Deleted => listing.status_before_delete = Some(from),
            _ => {}
        }
        listing.status = next;
        listing.updated_at = format_ts(at);
        tracing::info!(listing = %listing.id, %from, to = %next, "listing status changed");
        Ok(())
    }

    /// Back into review, straight to active when approval is switched off.
    fn resubmit(&self, listing: &mut ListingRecord, at: OffsetDateTime) -> Result<(), AppError> {
        self.apply_transition(listing, ListingStatus::Pending, at)?;
        if !self.config.listing.require_approval {
            self.apply_transition(listing, ListingStatus::Active, at)?;
        }
        Ok(())
    }

    pub(super) fn detail_view(
        &self,
        listing: ListingRecord,
        viewer: Option<&UserRecord>,
    ) -> Result<DetailView, AppError> {
        let index = self.category_index()?;
        let seller = db::get_user(&self.conn, &listing.owner_id)?.ok_or_else(|| {
            AppError::NotFound {
                kind: "user",
                key: listing.owner_id.clone(),
            }
        })?;
        let tier = self.current_tier(&listing.id)?;
        let may_manage = viewer.is_some_and(|user| user.id == listing.owner_id || user.role == Role::Admin);
        let dopings = if may_manage {
            db::list_dopings_for_listing(&self.conn, &listing.id)?
                .into_iter()
                .map(|doping| DopingView::new(doping, &listing.currency))
                .collect()
        } else {
            Vec::new()
        };

        Ok(DetailView {
            breadcrumb: index.breadcrumb(&listing.category_id),
            vehicle: db::get_vehicle(&self.conn, &listing.id)?,
            equipment: db::list_equipment(&self.conn, &listing.id)?,
            damage: db::list_damage(&self.conn, &listing.id)?,
            images: db::list_images(&self.conn, &listing.id)?
                .into_iter()
                .map(ImageView::from)
                .collect(),
            badges: DetailView::badges_for(tier, &seller),
            seller: SellerSummary::from(&seller),
            tier,
            dopings,
            listing: ListingView::from(listing),
        })
    }

    /// Search-shaped row for a single listing, for lists built outside the query builder.
    pub(super) fn hit_for(&self, listing: ListingRecord) -> Result<ListingHit, AppError> {
        let vehicle = db::get_vehicle(&self.conn, &listing.id)?.unwrap_or_default();
        let seller = db::get_user(&self.conn, &listing.owner_id)?.ok_or_else(|| {
            AppError::NotFound {
                kind: "user",
                key: listing.owner_id.clone(),
            }
        })?;
        let tier = self.current_tier(&listing.id)?;
        Ok(ListingHit {
            tier,
            year: vehicle.year,
            km: vehicle.km,
            color: vehicle.color,
            fuel: vehicle.fuel,
            gearbox: vehicle.gearbox,
            seller_kind: seller.account_kind,
            seller_verification: seller.verification,
            cover_image: db::cover_image(&self.conn, &listing.id)?,
            listing,
        })
    }

    /// Highest active doping covering the current clock, if any.
    fn current_tier(&self, listing_id: &str) -> Result<Option<DopingTier>, AppError> {
        let windows = db::list_active_dopings_for_listing(&self.conn, listing_id)?
            .into_iter()
            .filter_map(|doping| {
                let starts_at = doping.starts_at.as_deref().and_then(parse_ts)?;
                let ends_at = doping.ends_at.as_deref().and_then(parse_ts)?;
                Some((doping.tier, DopingWindow { starts_at, ends_at }))
            })
            .collect::<Vec<_>>();
        Ok(effective_tier(windows, self.now()))
    }

    fn checked_title(&self, raw: &str) -> Result<String, AppError> {
        let title = required_text(raw, "title")?;
        let limit = self.config.listing.max_title_len as usize;
        if title.chars().count() > limit {
            return Err(AppError::InvalidArgument(format!(
                "title is longer than {limit} characters"
            )));
        }
        Ok(title)
    }

    fn checked_currency(&self, raw: Option<&str>) -> Result<String, AppError> {
        let currency = raw
            .and_then(non_empty)
            .unwrap_or_else(|| self.config.listing.currency.clone())
            .to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(AppError::InvalidArgument(format!(
                "currency '{currency}' must be a three-letter code"
            )));
        }
        Ok(currency)
    }
}

pub(super) fn listing_visible_to(listing: &ListingRecord, viewer: Option<&UserRecord>) -> bool {
    listing.status.is_public()
        || viewer.is_some_and(|user| user.id == listing.owner_id || user.role == Role::Admin)
}

/// Closes the open dopings of a listing leaving the active state. Returns
/// how many active dopings expired.
pub(super) fn close_dopings(
    conn: &Connection,
    listing_id: &str,
    at: &str,
    cancel_pending: bool,
) -> Result<usize, AppError> {
    let mut expired = 0;
    for mut doping in db::list_dopings_for_listing(conn, listing_id)? {
        let next = match doping.status {
            DopingStatus::Active => DopingStatus::Expired,
            DopingStatus::Pending if cancel_pending => DopingStatus::Cancelled,
            _ => continue,
        };
        doping.status.validate_transition(next)?;
        if next == DopingStatus::Expired {
            doping.ends_at = Some(clamp_end(&doping, at));
            expired += 1;
        }
        doping.status = next;
        db::update_doping(conn, &doping)?;
    }
    Ok(expired)
}

fn clamp_end(doping: &DopingRecord, at: &str) -> String {
    match doping.ends_at.as_deref() {
        Some(end) if end < at => end.to_string(),
        _ => at.to_string(),
    }
}

fn check_price(price: i64) -> Result<(), AppError> {
    if price < 0 {
        return Err(AppError::InvalidArgument(
            "price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn normalized_vehicle(input: VehicleSpec) -> Result<VehicleSpec, AppError> {
    let mut vehicle = VehicleSpec::default();
    vehicle.merge(input);
    vehicle.validate().map_err(AppError::InvalidArgument)?;
    Ok(vehicle)
}

fn normalized_equipment(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter_map(|name| normalize_attribute(name))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn checked_urls(raw: &[String]) -> Result<Vec<String>, AppError> {
    raw.iter()
        .map(|url| {
            let url = url.trim();
            if url.is_empty() || url.chars().any(char::is_whitespace) {
                Err(AppError::InvalidArgument(format!(
                    "image url '{url}' is not usable"
                )))
            } else {
                Ok(url.to_string())
            }
        })
        .collect()
}

fn image_index(images: &[ImageRecord], image_id: &str) -> Result<usize, AppError> {
    images
        .iter()
        .position(|image| image.id == image_id.trim())
        .ok_or_else(|| AppError::NotFound {
            kind: "image",
            key: image_id.trim().to_string(),
        })
}
