//! The resolved output records, one per country.

use serde::Serialize;

use crate::input::CountryCode;
use crate::instant::Instant;

/// One zone of a resolved country, in the input's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneOutputRecord {
    pub zone_id: String,
    pub shown_in_picker: bool,
    /// After this instant the zone can be substituted by `replacement`
    /// without user-visible effect. Absent while the zone stays in use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_used_after: Option<Instant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    /// Old ids linked to this one, sorted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternative_ids: Vec<String>,
}

/// The resolved record for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryOutputRecord {
    pub iso_code: CountryCode,
    pub default_zone_id: String,
    pub default_time_zone_boost: bool,
    pub ever_uses_utc: bool,
    pub zones: Vec<ZoneOutputRecord>,
}

/// Everything the build emits, pinned to the IANA version it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TzLookupDocument {
    pub iana_version: String,
    pub countries: Vec<CountryOutputRecord>,
}
