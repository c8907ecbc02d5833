//! Per-country zone usage records derived from a zone tree.

use hashbrown::HashMap;

use crate::input::CountryCode;
use crate::instant::Instant;

/// Whether and when a zone stops being needed.
///
/// A zone is "replaced" after an instant when, from then on, its behavior is
/// identical to that of another zone with equal or higher priority; a device
/// can substitute the replacement id without any user-visible effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneUsageRecord {
    not_used_after: Option<Instant>,
    replacement: Option<String>,
}

impl ZoneUsageRecord {
    /// The zone remains in use through the whole calculation range.
    pub fn still_in_use() -> Self {
        Self {
            not_used_after: None,
            replacement: None,
        }
    }

    /// The zone's behavior merges into `replacement` at `not_used_after`.
    pub fn replaced(not_used_after: Instant, replacement: &str) -> Self {
        Self {
            not_used_after: Some(not_used_after),
            replacement: Some(replacement.to_owned()),
        }
    }

    pub fn is_still_in_use(&self) -> bool {
        self.not_used_after.is_none()
    }

    pub fn not_used_after(&self) -> Option<Instant> {
        self.not_used_after
    }

    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }
}

/// The usage records for every zone of one country.
#[derive(Debug)]
pub struct CountryZoneUsage {
    country: CountryCode,
    entries: HashMap<String, ZoneUsageRecord>,
}

impl CountryZoneUsage {
    pub(crate) fn new(country: CountryCode) -> Self {
        Self {
            country,
            entries: HashMap::new(),
        }
    }

    pub fn country(&self) -> CountryCode {
        self.country
    }

    /// Records an entry unless one exists; earlier entries always win
    /// because the tree walk visits longer-lived spans first.
    pub(crate) fn add_entry_if_missing(&mut self, zone_id: &str, record: ZoneUsageRecord) {
        if !self.entries.contains_key(zone_id) {
            self.entries.insert(zone_id.to_owned(), record);
        }
    }

    pub fn has_entry(&self, zone_id: &str) -> bool {
        self.entries.contains_key(zone_id)
    }

    pub fn entry(&self, zone_id: &str) -> Option<&ZoneUsageRecord> {
        self.entries.get(zone_id)
    }
}
