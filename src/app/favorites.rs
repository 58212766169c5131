use serde::Serialize;

use super::listings::listing_visible_to;
use super::{App, AppError};
use crate::cards::{CardFormat, CardList};
use crate::db;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FavoriteToggle {
    pub listing_id: String,
    pub number: String,
    pub favorited: bool,
}

impl App {
    /// Removing a favorite works even once the listing is hidden; adding one
    /// needs a listing the user can see.
    pub fn toggle_favorite(&self, reference: &str) -> Result<FavoriteToggle, AppError> {
        let user = self.require_writer()?;
        let listing = self.find_listing(reference)?;
        let favorited = if db::favorite_exists(&self.conn, &user.id, &listing.id)? {
            db::delete_favorite(&self.conn, &user.id, &listing.id)?;
            false
        } else {
            if !listing_visible_to(&listing, Some(&user)) {
                return Err(AppError::NotFound {
                    kind: "listing",
                    key: reference.trim().to_string(),
                });
            }
            db::insert_favorite(&self.conn, &user.id, &listing.id, &self.now_ts())?;
            true
        };
        tracing::info!(user = %user.id, listing = %listing.id, favorited, "favorite toggled");
        Ok(FavoriteToggle {
            listing_id: listing.id,
            number: listing.number,
            favorited,
        })
    }

    pub fn list_favorites(&self, format: CardFormat) -> Result<CardList, AppError> {
        let user = self.require_session()?;
        let hits = db::list_favorite_listings(&self.conn, &user.id)?
            .into_iter()
            .filter(|listing| listing_visible_to(listing, Some(&user)))
            .map(|listing| self.hit_for(listing))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CardList::build(format, &hits))
    }
}
