use std::str::FromStr;

use serde::Serialize;

use crate::catalog::BreadcrumbEntry;
use crate::clock::date_part;
use crate::db::{DopingRecord, ImageRecord, ListingRecord, UserRecord};
use crate::domain::account::{AccountKind, Verification};
use crate::domain::doping::DopingTier;
use crate::domain::vehicle::{DamageEntry, VehicleSpec};
use crate::domain::{normalize_token, string_enum_impls, ParseEnumError};
use crate::listing_query::{ListingHit, SearchPage};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CardFormat {
    #[default]
    Grid,
    Row,
    Showcase,
}

impl CardFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            CardFormat::Grid => "grid",
            CardFormat::Row => "row",
            CardFormat::Showcase => "showcase",
        }
    }
}

impl FromStr for CardFormat {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "grid" | "card" => Ok(CardFormat::Grid),
            "row" | "list" | "table" => Ok(CardFormat::Row),
            "showcase" | "vitrin" => Ok(CardFormat::Showcase),
            _ => Err(ParseEnumError {
                kind: "card format",
                value: value.to_string(),
                expected: &["grid", "row", "showcase"],
            }),
        }
    }
}

string_enum_impls!(CardFormat);

/// `1250000, "TRY"` becomes `1.250.000 TRY`.
pub fn price_label(price: i64, currency: &str) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if price < 0 {
        grouped.push('-');
    }
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let currency = currency.trim();
    if currency.is_empty() {
        grouped
    } else {
        format!("{grouped} {currency}")
    }
}

fn badges(tier: Option<DopingTier>, kind: AccountKind, verification: Verification) -> Vec<String> {
    let mut badges = Vec::new();
    if let Some(tier) = tier {
        badges.push(tier.as_str().to_string());
    }
    if kind == AccountKind::Corporate && verification == Verification::Verified {
        badges.push("dealer".to_string());
    }
    badges
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GridCard {
    pub id: String,
    pub number: String,
    pub title: String,
    pub price_label: String,
    pub city: Option<String>,
    pub cover_image: Option<String>,
    pub year: Option<i64>,
    pub km: Option<i64>,
    pub badges: Vec<String>,
}

impl From<&ListingHit> for GridCard {
    fn from(hit: &ListingHit) -> Self {
        Self {
            id: hit.listing.id.clone(),
            number: hit.listing.number.clone(),
            title: hit.listing.title.clone(),
            price_label: price_label(hit.listing.price, &hit.listing.currency),
            city: hit.listing.city.clone(),
            cover_image: hit.cover_image.clone(),
            year: hit.year,
            km: hit.km,
            badges: badges(hit.tier, hit.seller_kind, hit.seller_verification),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RowCard {
    pub number: String,
    pub title: String,
    pub year: Option<i64>,
    pub km: Option<i64>,
    pub color: Option<String>,
    pub price_label: String,
    pub city: Option<String>,
    pub date: String,
}

impl From<&ListingHit> for RowCard {
    fn from(hit: &ListingHit) -> Self {
        let listed = hit
            .listing
            .published_at
            .as_deref()
            .unwrap_or(&hit.listing.created_at);
        Self {
            number: hit.listing.number.clone(),
            title: hit.listing.title.clone(),
            year: hit.year,
            km: hit.km,
            color: hit.color.clone(),
            price_label: price_label(hit.listing.price, &hit.listing.currency),
            city: hit.listing.city.clone(),
            date: date_part(listed).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShowcaseCard {
    pub id: String,
    pub number: String,
    pub title: String,
    pub price_label: String,
    pub cover_image: Option<String>,
}

impl ShowcaseCard {
    /// Only listings currently boosted into the showcase qualify.
    pub fn from_hit(hit: &ListingHit) -> Option<Self> {
        if !hit.tier.is_some_and(DopingTier::in_showcase) {
            return None;
        }
        Some(Self {
            id: hit.listing.id.clone(),
            number: hit.listing.number.clone(),
            title: hit.listing.title.clone(),
            price_label: price_label(hit.listing.price, &hit.listing.currency),
            cover_image: hit.cover_image.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CardList {
    Grid(Vec<GridCard>),
    Row(Vec<RowCard>),
    Showcase(Vec<ShowcaseCard>),
}

impl CardList {
    pub fn build(format: CardFormat, hits: &[ListingHit]) -> Self {
        match format {
            CardFormat::Grid => CardList::Grid(hits.iter().map(GridCard::from).collect()),
            CardFormat::Row => CardList::Row(hits.iter().map(RowCard::from).collect()),
            CardFormat::Showcase => {
                CardList::Showcase(hits.iter().filter_map(ShowcaseCard::from_hit).collect())
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            CardList::Grid(cards) => cards.len(),
            CardList::Row(cards) => cards.len(),
            CardList::Showcase(cards) => cards.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CardPage {
    pub format: CardFormat,
    pub cards: CardList,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: i64,
}

impl CardPage {
    pub fn build(format: CardFormat, page: &SearchPage<ListingHit>) -> Self {
        Self {
            format,
            cards: CardList::build(format, &page.items),
            total: page.total,
            page: page.page,
            per_page: page.per_page,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ListingView {
    pub id: String,
    pub number: String,
    pub owner_id: String,
    pub category_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: i64,
    pub currency: String,
    pub price_label: String,
    pub city: Option<String>,
    pub status: String,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub published_at: Option<String>,
    pub expires_at: Option<String>,
}

impl From<ListingRecord> for ListingView {
    fn from(value: ListingRecord) -> Self {
        Self {
            price_label: price_label(value.price, &value.currency),
            id: value.id,
            number: value.number,
            owner_id: value.owner_id,
            category_id: value.category_id,
            title: value.title,
            description: value.description,
            price: value.price,
            currency: value.currency,
            city: value.city,
            status: value.status.to_string(),
            rejection_reason: value.rejection_reason,
            created_at: value.created_at,
            updated_at: value.updated_at,
            published_at: value.published_at,
            expires_at: value.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SellerSummary {
    pub id: String,
    pub display_name: String,
    pub kind: AccountKind,
    pub company_name: Option<String>,
    pub city: Option<String>,
    pub verified: bool,
    pub member_since: String,
}

impl From<&UserRecord> for SellerSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            kind: user.account_kind,
            company_name: user.company_name.clone(),
            city: user.city.clone(),
            verified: user.verification == Verification::Verified,
            member_since: date_part(&user.created_at).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageView {
    pub id: String,
    pub url: String,
    pub position: i64,
}

impl From<ImageRecord> for ImageView {
    fn from(value: ImageRecord) -> Self {
        Self {
            id: value.id,
            url: value.url,
            position: value.position,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DopingView {
    pub id: String,
    pub listing_id: String,
    pub tier: DopingTier,
    pub status: String,
    pub days: i64,
    pub price: i64,
    pub price_label: String,
    pub requested_at: String,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub note: Option<String>,
}

impl DopingView {
    pub fn new(value: DopingRecord, currency: &str) -> Self {
        Self {
            price_label: price_label(value.price, currency),
            id: value.id,
            listing_id: value.listing_id,
            tier: value.tier,
            status: value.status.to_string(),
            days: value.days,
            price: value.price,
            requested_at: value.requested_at,
            starts_at: value.starts_at,
            ends_at: value.ends_at,
            note: value.note,
        }
    }
}

/// Everything shown on a single listing page.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DetailView {
    pub listing: ListingView,
    pub breadcrumb: Vec<BreadcrumbEntry>,
    pub vehicle: Option<VehicleSpec>,
    pub equipment: Vec<String>,
    pub damage: Vec<DamageEntry>,
    pub images: Vec<ImageView>,
    pub seller: SellerSummary,
    pub tier: Option<DopingTier>,
    pub dopings: Vec<DopingView>,
    pub badges: Vec<String>,
}

impl DetailView {
    pub fn badges_for(tier: Option<DopingTier>, seller: &UserRecord) -> Vec<String> {
        badges(tier, seller.account_kind, seller.verification)
    }
}
