use std::str::FromStr;

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};

use crate::db::{self, ListingRecord, LISTING_COLUMNS, LISTING_COLUMN_COUNT};
use crate::domain::account::{AccountKind, Verification};
use crate::domain::doping::DopingTier;
use crate::domain::status::ListingStatus;
use crate::domain::vehicle::{normalize_attribute, Fuel, Gearbox};
use crate::domain::{normalize_token, string_enum_impls, ParseEnumError};
use crate::ids::sha256_hex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    KmAsc,
    YearDesc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Oldest => "oldest",
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::KmAsc => "km_asc",
            SortOrder::YearDesc => "year_desc",
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            SortOrder::Newest => "l.created_at DESC, l.rowid DESC",
            SortOrder::Oldest => "l.created_at ASC, l.rowid ASC",
            SortOrder::PriceAsc => "l.price ASC, l.created_at DESC, l.rowid DESC",
            SortOrder::PriceDesc => "l.price DESC, l.created_at DESC, l.rowid DESC",
            SortOrder::KmAsc => "v.km IS NULL, v.km ASC, l.created_at DESC, l.rowid DESC",
            SortOrder::YearDesc => "v.year IS NULL, v.year DESC, l.created_at DESC, l.rowid DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ParseEnumError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "newest" | "" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "price_asc" | "cheapest" => Ok(SortOrder::PriceAsc),
            "price_desc" => Ok(SortOrder::PriceDesc),
            "km_asc" => Ok(SortOrder::KmAsc),
            "year_desc" => Ok(SortOrder::YearDesc),
            _ => Err(ParseEnumError {
                kind: "sort order",
                value: value.to_string(),
                expected: &[
                    "newest",
                    "oldest",
                    "price_asc",
                    "price_desc",
                    "km_asc",
                    "year_desc",
                ],
            }),
        }
    }
}

string_enum_impls!(SortOrder);

/// User-facing search criteria. Also the stored shape of saved filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submodel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub km_min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub km_max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel: Option<Fuel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gearbox: Option<Gearbox>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_kind: Option<AccountKind>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub with_images: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured: Option<DopingTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ListingStatus>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub mine: bool,
    pub sort: SortOrder,
}

impl ListingFilter {
    pub fn validate(&self) -> Result<(), String> {
        for (name, min, max) in [
            ("price", self.price_min, self.price_max),
            ("year", self.year_min, self.year_max),
            ("km", self.km_min, self.km_max),
        ] {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(format!("{name} range is empty: min {min} > max {max}"));
                }
            }
            if min.is_some_and(|value| value < 0) || max.is_some_and(|value| value < 0) {
                return Err(format!("{name} bounds cannot be negative"));
            }
        }
        if self.model.is_some() && self.brand.is_none() {
            return Err("model filter requires a brand".to_string());
        }
        if self.submodel.is_some() && self.model.is_none() {
            return Err("submodel filter requires a model".to_string());
        }
        Ok(())
    }

    /// Trimmed copy; blank strings become absent.
    pub fn normalized(&self) -> ListingFilter {
        let mut filter = self.clone();
        for field in [
            &mut filter.category,
            &mut filter.brand,
            &mut filter.model,
            &mut filter.submodel,
            &mut filter.city,
            &mut filter.query,
        ] {
            *field = field.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_string);
        }
        filter.body_type = filter.body_type.as_deref().and_then(normalize_attribute);
        filter.color = filter.color.as_deref().and_then(normalize_attribute);
        filter
    }

    /// Identity of a saved search for per-user deduplication.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(&self.normalized()).unwrap_or_default();
        sha256_hex(&canonical)
    }

    pub fn summary(&self) -> Option<String> {
        let filter = self.normalized();
        let mut parts = Vec::new();
        let text = [
            ("category", filter.category.as_deref()),
            ("brand", filter.brand.as_deref()),
            ("model", filter.model.as_deref()),
            ("submodel", filter.submodel.as_deref()),
            ("city", filter.city.as_deref()),
            ("body", filter.body_type.as_deref()),
            ("color", filter.color.as_deref()),
            ("query", filter.query.as_deref()),
        ];
        for (name, value) in text {
            if let Some(value) = value {
                parts.push(format!("{name}={value}"));
            }
        }
        for (name, min, max) in [
            ("price", filter.price_min, filter.price_max),
            ("year", filter.year_min, filter.year_max),
            ("km", filter.km_min, filter.km_max),
        ] {
            match (min, max) {
                (None, None) => {}
                (min, max) => parts.push(format!(
                    "{name}={}..{}",
                    min.map(|v| v.to_string()).unwrap_or_default(),
                    max.map(|v| v.to_string()).unwrap_or_default()
                )),
            }
        }
        if let Some(fuel) = filter.fuel {
            parts.push(format!("fuel={fuel}"));
        }
        if let Some(gearbox) = filter.gearbox {
            parts.push(format!("gearbox={gearbox}"));
        }
        if let Some(kind) = filter.seller_kind {
            parts.push(format!("seller={kind}"));
        }
        if let Some(tier) = filter.featured {
            parts.push(format!("featured={tier}"));
        }
        if let Some(status) = filter.status {
            parts.push(format!("status={status}"));
        }
        if filter.with_images {
            parts.push("images=true".to_string());
        }
        if filter.mine {
            parts.push("mine=true".to_string());
        }
        if filter.sort != SortOrder::Newest {
            parts.push(format!("sort={}", filter.sort));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Who is asking, resolved by the application layer from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryScope {
    /// Root of the category subtree to search, already resolved.
    pub category_root: Option<String>,
    /// Empty means any status.
    pub statuses: Vec<ListingStatus>,
    pub owner_id: Option<String>,
    pub now: String,
    pub featured_first: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchPage<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: i64,
}

/// One search row with the joined columns the card adapters need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingHit {
    pub listing: ListingRecord,
    pub tier: Option<DopingTier>,
    pub year: Option<i64>,
    pub km: Option<i64>,
    pub color: Option<String>,
    pub fuel: Option<Fuel>,
    pub gearbox: Option<Gearbox>,
    pub seller_kind: AccountKind,
    pub seller_verification: Verification,
    pub cover_image: Option<String>,
}

/// Numbered-parameter WHERE builder. Values are only ever bound.
#[derive(Debug, Default)]
struct SqlBuilder {
    with_clause: Option<String>,
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl SqlBuilder {
    fn bind(&mut self, value: impl Into<Value>) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }

    fn push(&mut self, clause: String) {
        self.clauses.push(clause);
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    fn with_sql(&self) -> &str {
        self.with_clause.as_deref().unwrap_or("")
    }
}

const FROM_SQL: &str = " FROM listings l \
     LEFT JOIN vehicle_data v ON v.listing_id = l.id \
     JOIN users u ON u.id = l.owner_id";

fn build_where(filter: &ListingFilter, scope: &QueryScope) -> SqlBuilder {
    let mut sql = SqlBuilder::default();

    if let Some(root) = scope.category_root.as_deref() {
        let root = sql.bind(root.to_string());
        sql.with_clause = Some(db::subtree_cte(&root));
        sql.push("l.category_id IN (SELECT id FROM subtree)".to_string());
    }

    match scope.statuses.as_slice() {
        [] => {}
        [single] => {
            let param = sql.bind(single.as_str().to_string());
            sql.push(format!("l.status = {param}"));
        }
        many => {
            let params = many
                .iter()
                .map(|status| sql.bind(status.as_str().to_string()))
                .collect::<Vec<_>>();
            sql.push(format!("l.status IN ({})", params.join(", ")));
        }
    }

    if let Some(owner) = scope.owner_id.as_deref() {
        let param = sql.bind(owner.to_string());
        sql.push(format!("l.owner_id = {param}"));
    }

    push_range(&mut sql, "l.price", filter.price_min, filter.price_max);
    push_range(&mut sql, "v.year", filter.year_min, filter.year_max);
    push_range(&mut sql, "v.km", filter.km_min, filter.km_max);

    if let Some(fuel) = filter.fuel {
        let param = sql.bind(fuel.as_str().to_string());
        sql.push(format!("v.fuel = {param}"));
    }
    if let Some(gearbox) = filter.gearbox {
        let param = sql.bind(gearbox.as_str().to_string());
        sql.push(format!("v.gearbox = {param}"));
    }
    if let Some(body) = filter.body_type.as_deref() {
        let param = sql.bind(body.to_string());
        sql.push(format!("v.body_type = {param}"));
    }
    if let Some(color) = filter.color.as_deref() {
        let param = sql.bind(color.to_string());
        sql.push(format!("v.color = {param}"));
    }
    if let Some(city) = filter.city.as_deref() {
        let param = sql.bind(city.to_string());
        sql.push(format!("l.city = {param} COLLATE NOCASE"));
    }
    if let Some(kind) = filter.seller_kind {
        let param = sql.bind(kind.as_str().to_string());
        sql.push(format!("u.account_kind = {param}"));
    }
    if filter.with_images {
        sql.push(
            "EXISTS (SELECT 1 FROM listing_images i WHERE i.listing_id = l.id)".to_string(),
        );
    }
    if let Some(floor) = filter.featured {
        let now = sql.bind(scope.now.clone());
        let floor = sql.bind(floor.rank());
        sql.push(format!("{} >= {floor}", db::tier_rank_sql(&now)));
    }
    if let Some(query) = filter.query.as_deref() {
        for term in query.split_whitespace() {
            let pattern = sql.bind(format!("%{}%", escape_like(term)));
            sql.push(format!(
                "(l.title LIKE {pattern} ESCAPE '\\' \
                 OR COALESCE(l.description, '') LIKE {pattern} ESCAPE '\\' \
                 OR l.number LIKE {pattern} ESCAPE '\\')"
            ));
        }
    }

    sql
}

fn push_range(sql: &mut SqlBuilder, column: &str, min: Option<i64>, max: Option<i64>) {
    if let Some(min) = min {
        let param = sql.bind(min);
        sql.push(format!("{column} >= {param}"));
    }
    if let Some(max) = max {
        let param = sql.bind(max);
        sql.push(format!("{column} <= {param}"));
    }
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

pub fn search(
    conn: &Connection,
    filter: &ListingFilter,
    scope: &QueryScope,
    page: PageRequest,
) -> rusqlite::Result<SearchPage<ListingHit>> {
    let filter = filter.normalized();
    let mut sql = build_where(&filter, scope);
    let where_sql = sql.where_sql();

    let count_sql = format!("{}SELECT COUNT(*){FROM_SQL}{where_sql}", sql.with_sql());
    let total: i64 = conn.query_row(&count_sql, params_from_iter(sql.params.iter()), |row| {
        row.get(0)
    })?;

    let now = sql.bind(scope.now.clone());
    let rank = db::tier_rank_sql(&now);
    let limit = sql.bind(i64::from(page.per_page));
    let offset = sql.bind(page.offset());
    let order = if scope.featured_first {
        format!("tier_rank DESC, {}", filter.sort.order_by())
    } else {
        filter.sort.order_by().to_string()
    };
    let select_sql = format!(
        "{}SELECT {LISTING_COLUMNS}, {rank} AS tier_rank, v.year, v.km, v.color, v.fuel, v.gearbox, \
         u.account_kind, u.verification, \
         (SELECT i.url FROM listing_images i WHERE i.listing_id = l.id ORDER BY i.position ASC, i.id ASC LIMIT 1)\
         {FROM_SQL}{where_sql} ORDER BY {order} LIMIT {limit} OFFSET {offset}",
        sql.with_sql()
    );
    tracing::debug!(
        clauses = sql.clauses.len(),
        params = sql.params.len(),
        sort = filter.sort.as_str(),
        "listing search"
    );

    let mut stmt = conn.prepare(&select_sql)?;
    let rows = stmt.query_map(params_from_iter(sql.params.iter()), |row| {
        let base = LISTING_COLUMN_COUNT;
        let rank: i64 = row.get(base)?;
        Ok(ListingHit {
            listing: db::listing_from_row(row)?,
            tier: DopingTier::from_rank(rank),
            year: row.get(base + 1)?,
            km: row.get(base + 2)?,
            color: row.get(base + 3)?,
            fuel: row.get(base + 4)?,
            gearbox: row.get(base + 5)?,
            seller_kind: row.get(base + 6)?,
            seller_verification: row.get(base + 7)?,
            cover_image: row.get(base + 8)?,
        })
    })?;
    let items = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    let per_page = i64::from(page.per_page);
    Ok(SearchPage {
        items,
        total,
        page: page.page,
        per_page: page.per_page,
        total_pages: (total + per_page - 1) / per_page,
    })
}
