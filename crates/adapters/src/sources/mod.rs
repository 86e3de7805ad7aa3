//! Upstream news sources

mod arknights;
mod honkai3;

pub use arknights::{ArknightsConfig, ArknightsSource};
pub use honkai3::{Honkai3Config, Honkai3Source};

use onion_reader_domain::SourceError;
use time::macros::{format_description, offset};
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Publication times on the bundled sources are printed in China Standard Time
pub const SOURCE_OFFSET: UtcOffset = offset!(+8);

/// Parse a `YYYY-MM-DD` date as midnight at `offset`, normalized to UTC
pub(crate) fn parse_day(value: &str, offset: UtcOffset) -> Result<OffsetDateTime, SourceError> {
    let date = Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|e| SourceError::Format(format!("invalid date {:?}: {}", value, e)))?;
    Ok(date
        .midnight()
        .assume_offset(offset)
        .to_offset(UtcOffset::UTC))
}

/// Parse a `YYYY-MM-DD HH:MM:SS` timestamp at `offset`, normalized to UTC
pub(crate) fn parse_timestamp(
    value: &str,
    offset: UtcOffset,
) -> Result<OffsetDateTime, SourceError> {
    let timestamp = PrimitiveDateTime::parse(
        value.trim(),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .map_err(|e| SourceError::Format(format!("invalid timestamp {:?}: {}", value, e)))?;
    Ok(timestamp.assume_offset(offset).to_offset(UtcOffset::UTC))
}

fn default_true() -> bool {
    true
}

fn default_games_category() -> String {
    onion_reader_domain::GAMES_CATEGORY.to_string()
}

fn default_priority() -> i8 {
    onion_reader_domain::PRIORITY_MAIN_STREAM
}
