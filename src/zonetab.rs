//! The IANA `zone.tab` file.
//!
//! Tab-separated lines of `ISO_UPPER<TAB>coordinates<TAB>zoneId`, with
//! `#` comment lines and blank lines ignored. This is the authority for
//! which zones IANA says a country has.

use hashbrown::HashMap;

use crate::error::{TzLookupError, TzLookupResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneTabEntry {
    /// Upper-case ISO 3166 code, as the file spells it.
    pub country: String,
    pub zone_id: String,
}

#[derive(Debug, Default)]
pub struct ZoneTab {
    entries: Vec<ZoneTabEntry>,
}

impl ZoneTab {
    pub fn parse(src: &str) -> TzLookupResult<ZoneTab> {
        let mut entries = Vec::new();
        for (index, line) in src.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t').filter(|f| !f.is_empty());
            let country = fields.next();
            let _coordinates = fields.next();
            let zone_id = fields.next();
            match (country, zone_id) {
                (Some(country), Some(zone_id)) => entries.push(ZoneTabEntry {
                    country: country.to_owned(),
                    zone_id: zone_id.to_owned(),
                }),
                _ => {
                    return Err(TzLookupError::Parse {
                        file: "zone.tab",
                        line: index as u32 + 1,
                        message: format!("expected ISO<TAB>coords<TAB>zoneId, got {line:?}"),
                    });
                }
            }
        }
        Ok(ZoneTab { entries })
    }

    pub fn entries(&self) -> &[ZoneTabEntry] {
        &self.entries
    }

    /// Groups zone ids by upper-case country code, preserving file order
    /// within each country.
    pub fn country_to_zone_ids(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for entry in &self.entries {
            map.entry(entry.country.clone())
                .or_default()
                .push(entry.zone_id.clone());
        }
        map
    }
}
