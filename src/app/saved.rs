use serde::Serialize;

use super::{non_empty, App, AppError, Removed};
use crate::db::{self, SavedFilterRecord};
use crate::ids::new_id;
use crate::listing_query::{ListingFilter, ListingHit, SearchPage};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SavedFilterView {
    pub id: String,
    pub name: String,
    pub filter: ListingFilter,
    pub summary: Option<String>,
    pub created_at: String,
    /// False when an identical filter was already saved.
    pub created: bool,
}

impl SavedFilterView {
    fn from_record(record: SavedFilterRecord, created: bool) -> Result<Self, AppError> {
        let filter: ListingFilter = serde_json::from_str(&record.filter_json)?;
        Ok(Self {
            summary: filter.summary(),
            id: record.id,
            name: record.name,
            filter,
            created_at: record.created_at,
            created,
        })
    }
}

impl App {
    pub fn save_filter(
        &self,
        name: Option<&str>,
        filter: &ListingFilter,
    ) -> Result<SavedFilterView, AppError> {
        let user = self.require_writer()?;
        filter.validate().map_err(AppError::InvalidArgument)?;
        let filter = filter.normalized();
        let fingerprint = filter.fingerprint();
        if let Some(existing) =
            db::find_saved_filter_by_fingerprint(&self.conn, &user.id, &fingerprint)?
        {
            return SavedFilterView::from_record(existing, false);
        }

        let name = name
            .and_then(non_empty)
            .or_else(|| filter.summary())
            .unwrap_or_else(|| "all listings".to_string());
        let record = SavedFilterRecord {
            id: new_id("S"),
            user_id: user.id.clone(),
            name,
            filter_json: serde_json::to_string(&filter)?,
            fingerprint,
            created_at: self.now_ts(),
        };
        db::insert_saved_filter(&self.conn, &record)?;
        tracing::info!(user = %user.id, filter = %record.id, "filter saved");
        SavedFilterView::from_record(record, true)
    }

    pub fn list_saved_filters(&self) -> Result<Vec<SavedFilterView>, AppError> {
        let user = self.require_session()?;
        db::list_saved_filters(&self.conn, &user.id)?
            .into_iter()
            .map(|record| SavedFilterView::from_record(record, false))
            .collect()
    }

    pub fn delete_saved_filter(&self, id: &str) -> Result<Removed, AppError> {
        let user = self.require_writer()?;
        let record = self.owned_saved_filter(&user.id, id)?;
        db::delete_saved_filter(&self.conn, &record.id)?;
        tracing::info!(user = %user.id, filter = %record.id, "saved filter deleted");
        Ok(Removed { id: record.id })
    }

    pub fn run_saved_filter(
        &self,
        id: &str,
        page: Option<u32>,
        per_page: Option<u32>,
    ) -> Result<SearchPage<ListingHit>, AppError> {
        let user = self.require_session()?;
        let record = self.owned_saved_filter(&user.id, id)?;
        let filter: ListingFilter = serde_json::from_str(&record.filter_json)?;
        self.search(&filter, page, per_page)
    }

    fn owned_saved_filter(&self, user_id: &str, id: &str) -> Result<SavedFilterRecord, AppError> {
        let record = db::get_saved_filter(&self.conn, id.trim())?.ok_or_else(|| {
            AppError::NotFound {
                kind: "saved filter",
                key: id.trim().to_string(),
            }
        })?;
        if record.user_id != user_id {
            return Err(AppError::Forbidden(
                "saved filters belong to the member who saved them".to_string(),
            ));
        }
        Ok(record)
    }
}
