use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result, Row};

use crate::clock::{format_ts, now_utc};
use crate::domain::account::{AccountKind, Role, Verification};
use crate::domain::doping::{DopingStatus, DopingTier};
use crate::domain::status::ListingStatus;
use crate::domain::vehicle::{DamageEntry, DamageKind, Fuel, Gearbox, VehicleSpec};

pub const CURRENT_SCHEMA_VERSION: i64 = 3;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 3] = [
    Migration {
        version: 1,
        name: "baseline_marketplace_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    display_name TEXT NOT NULL,
    phone TEXT,
    city TEXT,
    role TEXT NOT NULL DEFAULT 'member',
    account_kind TEXT NOT NULL DEFAULT 'individual',
    company_name TEXT,
    tax_number TEXT,
    verification TEXT NOT NULL DEFAULT 'unverified',
    verification_note TEXT,
    banned INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    parent_id TEXT REFERENCES categories(id),
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    position INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_parent_slug
    ON categories(COALESCE(parent_id, ''), slug);

CREATE TABLE IF NOT EXISTS listings (
    id TEXT PRIMARY KEY,
    number TEXT NOT NULL UNIQUE,
    owner_id TEXT NOT NULL REFERENCES users(id),
    category_id TEXT NOT NULL REFERENCES categories(id),
    title TEXT NOT NULL,
    description TEXT,
    price INTEGER NOT NULL,
    currency TEXT NOT NULL,
    city TEXT,
    status TEXT NOT NULL,
    rejection_reason TEXT,
    status_before_delete TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    published_at TEXT,
    expires_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_listings_status_created ON listings(status, created_at);
CREATE INDEX IF NOT EXISTS idx_listings_category ON listings(category_id);
CREATE INDEX IF NOT EXISTS idx_listings_owner ON listings(owner_id);

CREATE TABLE IF NOT EXISTS vehicle_data (
    listing_id TEXT PRIMARY KEY REFERENCES listings(id),
    year INTEGER,
    km INTEGER,
    fuel TEXT,
    gearbox TEXT,
    body_type TEXT,
    color TEXT,
    engine_cc INTEGER,
    horsepower INTEGER
);

CREATE TABLE IF NOT EXISTS equipment (
    listing_id TEXT NOT NULL REFERENCES listings(id),
    name TEXT NOT NULL,
    PRIMARY KEY (listing_id, name)
);

CREATE TABLE IF NOT EXISTS damage_reports (
    listing_id TEXT NOT NULL REFERENCES listings(id),
    part TEXT NOT NULL,
    kind TEXT NOT NULL,
    PRIMARY KEY (listing_id, part)
);

CREATE TABLE IF NOT EXISTS listing_images (
    id TEXT PRIMARY KEY,
    listing_id TEXT NOT NULL REFERENCES listings(id),
    url TEXT NOT NULL,
    position INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_listing_images_listing ON listing_images(listing_id, position);
"#,
    },
    Migration {
        version: 2,
        name: "dopings_and_moderation_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS dopings (
    id TEXT PRIMARY KEY,
    listing_id TEXT NOT NULL REFERENCES listings(id),
    tier TEXT NOT NULL,
    status TEXT NOT NULL,
    days INTEGER NOT NULL,
    price INTEGER NOT NULL,
    requested_at TEXT NOT NULL,
    starts_at TEXT,
    ends_at TEXT,
    decided_by TEXT,
    note TEXT
);

CREATE INDEX IF NOT EXISTS idx_dopings_listing_status ON dopings(listing_id, status);

CREATE TABLE IF NOT EXISTS moderation_log (
    id TEXT PRIMARY KEY,
    actor_id TEXT NOT NULL,
    target_kind TEXT NOT NULL,
    target_id TEXT NOT NULL,
    action TEXT NOT NULL,
    note TEXT,
    occurred_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_moderation_log_occurred ON moderation_log(occurred_at);
"#,
    },
    Migration {
        version: 3,
        name: "member_actions_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS favorites (
    user_id TEXT NOT NULL REFERENCES users(id),
    listing_id TEXT NOT NULL REFERENCES listings(id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, listing_id)
);

CREATE TABLE IF NOT EXISTS saved_filters (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    name TEXT NOT NULL,
    filter_json TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, fingerprint)
);

CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    listing_id TEXT NOT NULL REFERENCES listings(id),
    buyer_id TEXT NOT NULL REFERENCES users(id),
    seller_id TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (listing_id, buyer_id)
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    conversation_id TEXT NOT NULL REFERENCES conversations(id),
    sender_id TEXT NOT NULL REFERENCES users(id),
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    read_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, created_at);
"#,
    },
];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_for_speed(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_for_speed(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tracing::debug!(version = migration.version, name = migration.name, "applying migration");
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, format_ts(now_utc())],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

macro_rules! sql_text_enum {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse::<$ty>()
                        .map_err(|err| FromSqlError::Other(Box::new(err)))
                }
            }
        )+
    };
}

sql_text_enum!(
    ListingStatus,
    DopingTier,
    DopingStatus,
    Role,
    AccountKind,
    Verification,
    Fuel,
    Gearbox,
    DamageKind,
);

// ---------------------------------------------------------------- users

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
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
    pub updated_at: String,
}

const USER_COLUMNS: &str = "id, email, display_name, phone, city, role, account_kind, \
     company_name, tax_number, verification, verification_note, banned, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        phone: row.get(3)?,
        city: row.get(4)?,
        role: row.get(5)?,
        account_kind: row.get(6)?,
        company_name: row.get(7)?,
        tax_number: row.get(8)?,
        verification: row.get(9)?,
        verification_note: row.get(10)?,
        banned: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

pub fn insert_user(conn: &Connection, user: &UserRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO users (
    id, email, display_name, phone, city, role, account_kind, company_name,
    tax_number, verification, verification_note, banned, created_at, updated_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
"#,
        params![
            user.id,
            user.email,
            user.display_name,
            user.phone,
            user.city,
            user.role,
            user.account_kind,
            user.company_name,
            user.tax_number,
            user.verification,
            user.verification_note,
            user.banned,
            user.created_at,
            user.updated_at
        ],
    )?;
    Ok(())
}

/// Writes every mutable column; `id`, `email` and `created_at` are fixed.
pub fn update_user(conn: &Connection, user: &UserRecord) -> Result<()> {
    conn.execute(
        r#"
UPDATE users SET
    display_name = ?2,
    phone = ?3,
    city = ?4,
    role = ?5,
    account_kind = ?6,
    company_name = ?7,
    tax_number = ?8,
    verification = ?9,
    verification_note = ?10,
    banned = ?11,
    updated_at = ?12
WHERE id = ?1
"#,
        params![
            user.id,
            user.display_name,
            user.phone,
            user.city,
            user.role,
            user.account_kind,
            user.company_name,
            user.tax_number,
            user.verification,
            user.verification_note,
            user.banned,
            user.updated_at
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> Result<Option<UserRecord>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRecord>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        params![email],
        user_from_row,
    )
    .optional()
}

pub fn list_users_with_verification(
    conn: &Connection,
    verification: Verification,
) -> Result<Vec<UserRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE verification = ?1 ORDER BY updated_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![verification], user_from_row)?;
    rows.collect()
}

pub fn count_admins(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = 'admin'",
        [],
        |row| row.get(0),
    )
}

// ----------------------------------------------------------- categories

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub slug: String,
    pub position: i64,
    pub created_at: String,
}

fn category_from_row(row: &Row<'_>) -> Result<CategoryRecord> {
    Ok(CategoryRecord {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        name: row.get(2)?,
        slug: row.get(3)?,
        position: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_category(conn: &Connection, category: &CategoryRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO categories (id, parent_id, name, slug, position, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#,
        params![
            category.id,
            category.parent_id,
            category.name,
            category.slug,
            category.position,
            category.created_at
        ],
    )?;
    Ok(())
}

pub fn update_category(conn: &Connection, category: &CategoryRecord) -> Result<()> {
    conn.execute(
        "UPDATE categories SET parent_id = ?2, name = ?3, slug = ?4, position = ?5 WHERE id = ?1",
        params![
            category.id,
            category.parent_id,
            category.name,
            category.slug,
            category.position
        ],
    )?;
    Ok(())
}

pub fn delete_category(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
    Ok(())
}

pub fn get_category(conn: &Connection, id: &str) -> Result<Option<CategoryRecord>> {
    conn.query_row(
        "SELECT id, parent_id, name, slug, position, created_at FROM categories WHERE id = ?1",
        params![id],
        category_from_row,
    )
    .optional()
}

pub fn child_by_slug(
    conn: &Connection,
    parent_id: Option<&str>,
    slug: &str,
) -> Result<Option<CategoryRecord>> {
    conn.query_row(
        r#"
SELECT id, parent_id, name, slug, position, created_at
FROM categories
WHERE COALESCE(parent_id, '') = COALESCE(?1, '') AND slug = ?2
"#,
        params![parent_id, slug],
        category_from_row,
    )
    .optional()
}

pub fn list_children(conn: &Connection, parent_id: Option<&str>) -> Result<Vec<CategoryRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, parent_id, name, slug, position, created_at
FROM categories
WHERE COALESCE(parent_id, '') = COALESCE(?1, '')
ORDER BY position ASC, name ASC
"#,
    )?;
    let rows = stmt.query_map(params![parent_id], category_from_row)?;
    rows.collect()
}

pub fn list_categories(conn: &Connection) -> Result<Vec<CategoryRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, parent_id, name, slug, position, created_at
FROM categories
ORDER BY position ASC, name ASC
"#,
    )?;
    let rows = stmt.query_map([], category_from_row)?;
    rows.collect()
}

pub fn next_category_position(conn: &Connection, parent_id: Option<&str>) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM categories WHERE COALESCE(parent_id, '') = COALESCE(?1, '')",
        params![parent_id],
        |row| row.get(0),
    )
}

/// The category and everything below it, depth-limited against corrupt cycles.
pub fn subtree_ids(conn: &Connection, root_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("{}SELECT id FROM subtree", subtree_cte("?1")))?;
    let rows = stmt.query_map(params![root_id], |row| row.get(0))?;
    rows.collect()
}

/// `subtree(id, depth)` rooted at the category bound to `root`; the depth
/// limit stops the walk on corrupt cycles.
pub(crate) fn subtree_cte(root: &str) -> String {
    format!(
        "WITH RECURSIVE subtree(id, depth) AS (\
         SELECT id, 0 FROM categories WHERE id = {root} \
         UNION SELECT c.id, s.depth + 1 FROM categories c JOIN subtree s ON c.parent_id = s.id \
         WHERE s.depth < 64) "
    )
}

pub fn count_listings_in_category(conn: &Connection, category_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM listings WHERE category_id = ?1",
        params![category_id],
        |row| row.get(0),
    )
}

/// Active listings in each direct child's subtree, zero-count children included.
pub fn child_facet_counts(
    conn: &Connection,
    parent_id: Option<&str>,
) -> Result<Vec<(CategoryRecord, i64)>> {
    let mut children = Vec::new();
    for child in list_children(conn, parent_id)? {
        let count: i64 = conn.query_row(
            &format!(
                "{}SELECT COUNT(*) FROM listings \
                 WHERE status = 'active' AND category_id IN (SELECT id FROM subtree)",
                subtree_cte("?1")
            ),
            params![child.id],
            |row| row.get(0),
        )?;
        children.push((child, count));
    }
    Ok(children)
}

// ------------------------------------------------------------- listings

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub id: String,
    pub number: String,
    pub owner_id: String,
    pub category_id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: i64,
    pub currency: String,
    pub city: Option<String>,
    pub status: ListingStatus,
    pub rejection_reason: Option<String>,
    pub status_before_delete: Option<ListingStatus>,
    pub created_at: String,
    pub updated_at: String,
    pub published_at: Option<String>,
    pub expires_at: Option<String>,
}

pub(crate) const LISTING_COLUMNS: &str = "l.id, l.number, l.owner_id, l.category_id, l.title, \
     l.description, l.price, l.currency, l.city, l.status, l.rejection_reason, \
     l.status_before_delete, l.created_at, l.updated_at, l.published_at, l.expires_at";

pub(crate) const LISTING_COLUMN_COUNT: usize = 16;

pub(crate) fn listing_from_row(row: &Row<'_>) -> Result<ListingRecord> {
    Ok(ListingRecord {
        id: row.get(0)?,
        number: row.get(1)?,
        owner_id: row.get(2)?,
        category_id: row.get(3)?,
        title: row.get(4)?,
        description: row.get(5)?,
        price: row.get(6)?,
        currency: row.get(7)?,
        city: row.get(8)?,
        status: row.get(9)?,
        rejection_reason: row.get(10)?,
        status_before_delete: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        published_at: row.get(14)?,
        expires_at: row.get(15)?,
    })
}

pub fn insert_listing(conn: &Connection, listing: &ListingRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO listings (
    id, number, owner_id, category_id, title, description, price, currency, city,
    status, rejection_reason, status_before_delete, created_at, updated_at,
    published_at, expires_at
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
"#,
        params![
            listing.id,
            listing.number,
            listing.owner_id,
            listing.category_id,
            listing.title,
            listing.description,
            listing.price,
            listing.currency,
            listing.city,
            listing.status,
            listing.rejection_reason,
            listing.status_before_delete,
            listing.created_at,
            listing.updated_at,
            listing.published_at,
            listing.expires_at
        ],
    )?;
    Ok(())
}

pub fn update_listing(conn: &Connection, listing: &ListingRecord) -> Result<()> {
    conn.execute(
        r#"
UPDATE listings SET
    category_id = ?2,
    title = ?3,
    description = ?4,
    price = ?5,
    currency = ?6,
    city = ?7,
    status = ?8,
    rejection_reason = ?9,
    status_before_delete = ?10,
    updated_at = ?11,
    published_at = ?12,
    expires_at = ?13
WHERE id = ?1
"#,
        params![
            listing.id,
            listing.category_id,
            listing.title,
            listing.description,
            listing.price,
            listing.currency,
            listing.city,
            listing.status,
            listing.rejection_reason,
            listing.status_before_delete,
            listing.updated_at,
            listing.published_at,
            listing.expires_at
        ],
    )?;
    Ok(())
}

pub fn get_listing(conn: &Connection, id: &str) -> Result<Option<ListingRecord>> {
    conn.query_row(
        &format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE l.id = ?1"),
        params![id],
        listing_from_row,
    )
    .optional()
}

pub fn get_listing_by_number(conn: &Connection, number: &str) -> Result<Option<ListingRecord>> {
    conn.query_row(
        &format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE l.number = ?1"),
        params![number],
        listing_from_row,
    )
    .optional()
}

pub fn listing_number_exists(conn: &Connection, number: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM listings WHERE number = ?1)",
        params![number],
        |row| row.get(0),
    )
}

pub fn list_listings_with_status(
    conn: &Connection,
    status: ListingStatus,
) -> Result<Vec<ListingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LISTING_COLUMNS} FROM listings l WHERE l.status = ?1 ORDER BY l.created_at ASC, l.id ASC"
    ))?;
    let rows = stmt.query_map(params![status], listing_from_row)?;
    rows.collect()
}

pub fn list_listings_expiring_before(
    conn: &Connection,
    cutoff: &str,
) -> Result<Vec<ListingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LISTING_COLUMNS} FROM listings l \
         WHERE l.status = 'active' AND l.expires_at IS NOT NULL AND l.expires_at <= ?1 \
         ORDER BY l.expires_at ASC"
    ))?;
    let rows = stmt.query_map(params![cutoff], listing_from_row)?;
    rows.collect()
}

pub fn count_listings_by_status(conn: &Connection) -> Result<Vec<(ListingStatus, i64)>> {
    let mut stmt =
        conn.prepare("SELECT status, COUNT(*) FROM listings GROUP BY status ORDER BY status")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

pub fn count_users(conn: &Connection) -> Result<(i64, i64)> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(account_kind = 'corporate'), 0) FROM users",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
}

// ------------------------------------------------ vehicle attributes

pub fn get_vehicle(conn: &Connection, listing_id: &str) -> Result<Option<VehicleSpec>> {
    conn.query_row(
        r#"
SELECT year, km, fuel, gearbox, body_type, color, engine_cc, horsepower
FROM vehicle_data
WHERE listing_id = ?1
"#,
        params![listing_id],
        |row| {
            Ok(VehicleSpec {
                year: row.get(0)?,
                km: row.get(1)?,
                fuel: row.get(2)?,
                gearbox: row.get(3)?,
                body_type: row.get(4)?,
                color: row.get(5)?,
                engine_cc: row.get(6)?,
                horsepower: row.get(7)?,
            })
        },
    )
    .optional()
}

pub fn upsert_vehicle(conn: &Connection, listing_id: &str, spec: &VehicleSpec) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO vehicle_data (
    listing_id, year, km, fuel, gearbox, body_type, color, engine_cc, horsepower
)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
ON CONFLICT(listing_id) DO UPDATE SET
    year = excluded.year,
    km = excluded.km,
    fuel = excluded.fuel,
    gearbox = excluded.gearbox,
    body_type = excluded.body_type,
    color = excluded.color,
    engine_cc = excluded.engine_cc,
    horsepower = excluded.horsepower
"#,
        params![
            listing_id,
            spec.year,
            spec.km,
            spec.fuel,
            spec.gearbox,
            spec.body_type,
            spec.color,
            spec.engine_cc,
            spec.horsepower
        ],
    )?;
    Ok(())
}

pub fn list_equipment(conn: &Connection, listing_id: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT name FROM equipment WHERE listing_id = ?1 ORDER BY name ASC")?;
    let rows = stmt.query_map(params![listing_id], |row| row.get(0))?;
    rows.collect()
}

pub fn replace_equipment(conn: &Connection, listing_id: &str, names: &[String]) -> Result<()> {
    conn.execute(
        "DELETE FROM equipment WHERE listing_id = ?1",
        params![listing_id],
    )?;
    for name in names {
        conn.execute(
            "INSERT OR IGNORE INTO equipment (listing_id, name) VALUES (?1, ?2)",
            params![listing_id, name],
        )?;
    }
    Ok(())
}

pub fn list_damage(conn: &Connection, listing_id: &str) -> Result<Vec<DamageEntry>> {
    let mut stmt = conn
        .prepare("SELECT part, kind FROM damage_reports WHERE listing_id = ?1 ORDER BY part ASC")?;
    let rows = stmt.query_map(params![listing_id], |row| {
        Ok(DamageEntry {
            part: row.get(0)?,
            kind: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn replace_damage(conn: &Connection, listing_id: &str, entries: &[DamageEntry]) -> Result<()> {
    conn.execute(
        "DELETE FROM damage_reports WHERE listing_id = ?1",
        params![listing_id],
    )?;
    for entry in entries {
        conn.execute(
            r#"
INSERT INTO damage_reports (listing_id, part, kind) VALUES (?1, ?2, ?3)
ON CONFLICT(listing_id, part) DO UPDATE SET kind = excluded.kind
"#,
            params![listing_id, entry.part, entry.kind],
        )?;
    }
    Ok(())
}

// --------------------------------------------------------------- images

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: String,
    pub listing_id: String,
    pub url: String,
    pub position: i64,
}

pub fn list_images(conn: &Connection, listing_id: &str) -> Result<Vec<ImageRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, listing_id, url, position FROM listing_images WHERE listing_id = ?1 ORDER BY position ASC, id ASC",
    )?;
    let rows = stmt.query_map(params![listing_id], |row| {
        Ok(ImageRecord {
            id: row.get(0)?,
            listing_id: row.get(1)?,
            url: row.get(2)?,
            position: row.get(3)?,
        })
    })?;
    rows.collect()
}

pub fn cover_image(conn: &Connection, listing_id: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT url FROM listing_images WHERE listing_id = ?1 ORDER BY position ASC, id ASC LIMIT 1",
        params![listing_id],
        |row| row.get(0),
    )
    .optional()
}

/// Rewrites the listing's images so positions are exactly `0..n` in slice order.
pub fn replace_images(conn: &Connection, listing_id: &str, images: &[ImageRecord]) -> Result<()> {
    conn.execute(
        "DELETE FROM listing_images WHERE listing_id = ?1",
        params![listing_id],
    )?;
    for (position, image) in images.iter().enumerate() {
        conn.execute(
            "INSERT INTO listing_images (id, listing_id, url, position) VALUES (?1, ?2, ?3, ?4)",
            params![image.id, listing_id, image.url, position as i64],
        )?;
    }
    Ok(())
}

// -------------------------------------------------------------- dopings

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DopingRecord {
    pub id: String,
    pub listing_id: String,
    pub tier: DopingTier,
    pub status: DopingStatus,
    pub days: i64,
    pub price: i64,
    pub requested_at: String,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub decided_by: Option<String>,
    pub note: Option<String>,
}

const DOPING_COLUMNS: &str =
    "id, listing_id, tier, status, days, price, requested_at, starts_at, ends_at, decided_by, note";

fn doping_from_row(row: &Row<'_>) -> Result<DopingRecord> {
    Ok(DopingRecord {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        tier: row.get(2)?,
        status: row.get(3)?,
        days: row.get(4)?,
        price: row.get(5)?,
        requested_at: row.get(6)?,
        starts_at: row.get(7)?,
        ends_at: row.get(8)?,
        decided_by: row.get(9)?,
        note: row.get(10)?,
    })
}

pub fn insert_doping(conn: &Connection, doping: &DopingRecord) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO dopings ({DOPING_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            doping.id,
            doping.listing_id,
            doping.tier,
            doping.status,
            doping.days,
            doping.price,
            doping.requested_at,
            doping.starts_at,
            doping.ends_at,
            doping.decided_by,
            doping.note
        ],
    )?;
    Ok(())
}

pub fn update_doping(conn: &Connection, doping: &DopingRecord) -> Result<()> {
    conn.execute(
        r#"
UPDATE dopings SET
    status = ?2,
    starts_at = ?3,
    ends_at = ?4,
    decided_by = ?5,
    note = ?6
WHERE id = ?1
"#,
        params![
            doping.id,
            doping.status,
            doping.starts_at,
            doping.ends_at,
            doping.decided_by,
            doping.note
        ],
    )?;
    Ok(())
}

pub fn get_doping(conn: &Connection, id: &str) -> Result<Option<DopingRecord>> {
    conn.query_row(
        &format!("SELECT {DOPING_COLUMNS} FROM dopings WHERE id = ?1"),
        params![id],
        doping_from_row,
    )
    .optional()
}

pub fn list_dopings_for_listing(conn: &Connection, listing_id: &str) -> Result<Vec<DopingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOPING_COLUMNS} FROM dopings WHERE listing_id = ?1 ORDER BY requested_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![listing_id], doping_from_row)?;
    rows.collect()
}

pub fn list_dopings_with_status(
    conn: &Connection,
    status: DopingStatus,
) -> Result<Vec<DopingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOPING_COLUMNS} FROM dopings WHERE status = ?1 ORDER BY requested_at ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![status], doping_from_row)?;
    rows.collect()
}

pub fn open_doping_exists(conn: &Connection, listing_id: &str, tier: DopingTier) -> Result<bool> {
    conn.query_row(
        r#"
SELECT EXISTS(
    SELECT 1 FROM dopings
    WHERE listing_id = ?1 AND tier = ?2 AND status IN ('pending', 'active')
)
"#,
        params![listing_id, tier],
        |row| row.get(0),
    )
}

/// Active dopings whose window has closed at `cutoff`.
pub fn list_dopings_to_expire(conn: &Connection, cutoff: &str) -> Result<Vec<DopingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOPING_COLUMNS} FROM dopings \
         WHERE status = 'active' AND ends_at IS NOT NULL AND ends_at <= ?1 \
         ORDER BY ends_at ASC"
    ))?;
    let rows = stmt.query_map(params![cutoff], doping_from_row)?;
    rows.collect()
}

pub fn list_active_dopings_for_listing(
    conn: &Connection,
    listing_id: &str,
) -> Result<Vec<DopingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOPING_COLUMNS} FROM dopings WHERE listing_id = ?1 AND status = 'active'"
    ))?;
    let rows = stmt.query_map(params![listing_id], doping_from_row)?;
    rows.collect()
}

/// SQL expression yielding the effective tier rank of `l` at parameter `?now`.
pub(crate) fn tier_rank_sql(now_param: &str) -> String {
    format!(
        "COALESCE((SELECT MAX(CASE d.tier WHEN 'gold' THEN 3 WHEN 'premium' THEN 2 WHEN 'urgent' THEN 1 ELSE 0 END) \
         FROM dopings d WHERE d.listing_id = l.id AND d.status = 'active' \
         AND d.starts_at <= {now_param} AND d.ends_at > {now_param}), 0)"
    )
}

// ------------------------------------------------------------ favorites

pub fn favorite_exists(conn: &Connection, user_id: &str, listing_id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = ?1 AND listing_id = ?2)",
        params![user_id, listing_id],
        |row| row.get(0),
    )
}

pub fn insert_favorite(conn: &Connection, user_id: &str, listing_id: &str, at: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO favorites (user_id, listing_id, created_at) VALUES (?1, ?2, ?3)",
        params![user_id, listing_id, at],
    )?;
    Ok(())
}

pub fn delete_favorite(conn: &Connection, user_id: &str, listing_id: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM favorites WHERE user_id = ?1 AND listing_id = ?2",
        params![user_id, listing_id],
    )?;
    Ok(())
}

pub fn list_favorite_listings(conn: &Connection, user_id: &str) -> Result<Vec<ListingRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LISTING_COLUMNS} FROM favorites f JOIN listings l ON l.id = f.listing_id \
         WHERE f.user_id = ?1 AND l.status <> 'deleted' \
         ORDER BY f.created_at DESC, l.id ASC"
    ))?;
    let rows = stmt.query_map(params![user_id], listing_from_row)?;
    rows.collect()
}

// -------------------------------------------------------- saved filters

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFilterRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub filter_json: String,
    pub fingerprint: String,
    pub created_at: String,
}

fn saved_filter_from_row(row: &Row<'_>) -> Result<SavedFilterRecord> {
    Ok(SavedFilterRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        filter_json: row.get(3)?,
        fingerprint: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub fn insert_saved_filter(conn: &Connection, saved: &SavedFilterRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO saved_filters (id, user_id, name, filter_json, fingerprint, created_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#,
        params![
            saved.id,
            saved.user_id,
            saved.name,
            saved.filter_json,
            saved.fingerprint,
            saved.created_at
        ],
    )?;
    Ok(())
}

pub fn find_saved_filter_by_fingerprint(
    conn: &Connection,
    user_id: &str,
    fingerprint: &str,
) -> Result<Option<SavedFilterRecord>> {
    conn.query_row(
        r#"
SELECT id, user_id, name, filter_json, fingerprint, created_at
FROM saved_filters WHERE user_id = ?1 AND fingerprint = ?2
"#,
        params![user_id, fingerprint],
        saved_filter_from_row,
    )
    .optional()
}

pub fn get_saved_filter(conn: &Connection, id: &str) -> Result<Option<SavedFilterRecord>> {
    conn.query_row(
        r#"
SELECT id, user_id, name, filter_json, fingerprint, created_at
FROM saved_filters WHERE id = ?1
"#,
        params![id],
        saved_filter_from_row,
    )
    .optional()
}

pub fn list_saved_filters(conn: &Connection, user_id: &str) -> Result<Vec<SavedFilterRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, user_id, name, filter_json, fingerprint, created_at
FROM saved_filters WHERE user_id = ?1
ORDER BY created_at DESC, id ASC
"#,
    )?;
    let rows = stmt.query_map(params![user_id], saved_filter_from_row)?;
    rows.collect()
}

pub fn delete_saved_filter(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM saved_filters WHERE id = ?1", params![id])?;
    Ok(())
}

// ----------------------------------------------------------------- chat

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    pub id: String,
    pub listing_id: String,
    pub buyer_id: String,
    pub seller_id: String,
    pub created_at: String,
    pub updated_at: String,
}

fn conversation_from_row(row: &Row<'_>) -> Result<ConversationRecord> {
    Ok(ConversationRecord {
        id: row.get(0)?,
        listing_id: row.get(1)?,
        buyer_id: row.get(2)?,
        seller_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn find_conversation(
    conn: &Connection,
    listing_id: &str,
    buyer_id: &str,
) -> Result<Option<ConversationRecord>> {
    conn.query_row(
        r#"
SELECT id, listing_id, buyer_id, seller_id, created_at, updated_at
FROM conversations WHERE listing_id = ?1 AND buyer_id = ?2
"#,
        params![listing_id, buyer_id],
        conversation_from_row,
    )
    .optional()
}

pub fn get_conversation(conn: &Connection, id: &str) -> Result<Option<ConversationRecord>> {
    conn.query_row(
        r#"
SELECT id, listing_id, buyer_id, seller_id, created_at, updated_at
FROM conversations WHERE id = ?1
"#,
        params![id],
        conversation_from_row,
    )
    .optional()
}

pub fn insert_conversation(conn: &Connection, conversation: &ConversationRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO conversations (id, listing_id, buyer_id, seller_id, created_at, updated_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#,
        params![
            conversation.id,
            conversation.listing_id,
            conversation.buyer_id,
            conversation.seller_id,
            conversation.created_at,
            conversation.updated_at
        ],
    )?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub created_at: String,
    pub read_at: Option<String>,
}

pub fn insert_message(conn: &Connection, message: &MessageRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO messages (id, conversation_id, sender_id, body, created_at, read_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
"#,
        params![
            message.id,
            message.conversation_id,
            message.sender_id,
            message.body,
            message.created_at,
            message.read_at
        ],
    )?;
    conn.execute(
        "UPDATE conversations SET updated_at = ?2 WHERE id = ?1",
        params![message.conversation_id, message.created_at],
    )?;
    Ok(())
}

pub fn list_messages(conn: &Connection, conversation_id: &str) -> Result<Vec<MessageRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, conversation_id, sender_id, body, created_at, read_at
FROM messages WHERE conversation_id = ?1
ORDER BY created_at ASC, rowid ASC
"#,
    )?;
    let rows = stmt.query_map(params![conversation_id], |row| {
        Ok(MessageRecord {
            id: row.get(0)?,
            conversation_id: row.get(1)?,
            sender_id: row.get(2)?,
            body: row.get(3)?,
            created_at: row.get(4)?,
            read_at: row.get(5)?,
        })
    })?;
    rows.collect()
}

pub fn mark_messages_read(
    conn: &Connection,
    conversation_id: &str,
    reader_id: &str,
    at: &str,
) -> Result<usize> {
    conn.execute(
        r#"
UPDATE messages SET read_at = ?3
WHERE conversation_id = ?1 AND sender_id <> ?2 AND read_at IS NULL
"#,
        params![conversation_id, reader_id, at],
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxRow {
    pub conversation: ConversationRecord,
    pub listing_title: String,
    pub listing_number: String,
    pub last_message: Option<String>,
    pub unread: i64,
}

pub fn list_inbox(conn: &Connection, user_id: &str) -> Result<Vec<InboxRow>> {
    let mut stmt = conn.prepare(
        r#"
SELECT c.id, c.listing_id, c.buyer_id, c.seller_id, c.created_at, c.updated_at,
       l.title, l.number,
       (SELECT m.body FROM messages m WHERE m.conversation_id = c.id
        ORDER BY m.created_at DESC, m.rowid DESC LIMIT 1),
       (SELECT COUNT(*) FROM messages m WHERE m.conversation_id = c.id
        AND m.sender_id <> ?1 AND m.read_at IS NULL)
FROM conversations c
JOIN listings l ON l.id = c.listing_id
WHERE c.buyer_id = ?1 OR c.seller_id = ?1
ORDER BY c.updated_at DESC, c.id ASC
"#,
    )?;
    let rows = stmt.query_map(params![user_id], |row| {
        Ok(InboxRow {
            conversation: conversation_from_row(row)?,
            listing_title: row.get(6)?,
            listing_number: row.get(7)?,
            last_message: row.get(8)?,
            unread: row.get(9)?,
        })
    })?;
    rows.collect()
}

// ------------------------------------------------------- moderation log

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationLogRecord {
    pub id: String,
    pub actor_id: String,
    pub target_kind: String,
    pub target_id: String,
    pub action: String,
    pub note: Option<String>,
    pub occurred_at: String,
}

pub fn insert_moderation_log(conn: &Connection, entry: &ModerationLogRecord) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO moderation_log (id, actor_id, target_kind, target_id, action, note, occurred_at)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
"#,
        params![
            entry.id,
            entry.actor_id,
            entry.target_kind,
            entry.target_id,
            entry.action,
            entry.note,
            entry.occurred_at
        ],
    )?;
    Ok(())
}

pub fn list_moderation_log(conn: &Connection, limit: u32) -> Result<Vec<ModerationLogRecord>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, actor_id, target_kind, target_id, action, note, occurred_at
FROM moderation_log
ORDER BY occurred_at DESC, rowid DESC
LIMIT ?1
"#,
    )?;
    let rows = stmt.query_map(params![i64::from(limit)], |row| {
        Ok(ModerationLogRecord {
            id: row.get(0)?,
            actor_id: row.get(1)?,
            target_kind: row.get(2)?,
            target_id: row.get(3)?,
            action: row.get(4)?,
            note: row.get(5)?,
            occurred_at: row.get(6)?,
        })
    })?;
    rows.collect()
}
