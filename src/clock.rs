use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

pub fn now_utc() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

/// Fixed-width UTC timestamp so stored values sort lexicographically.
pub fn format_ts(instant: OffsetDateTime) -> String {
    let stored = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z"
    );
    instant
        .to_offset(time::UtcOffset::UTC)
        .format(stored)
        .expect("fixed UTC timestamp formatting should never fail")
}

pub fn parse_ts(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw.trim(), &Rfc3339).ok()
}

/// `YYYY-MM-DD` part of a stored timestamp, for compact card output.
pub fn date_part(raw: &str) -> &str {
    raw.split_once('T').map_or(raw, |(date, _)| date)
}
