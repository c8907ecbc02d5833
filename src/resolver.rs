//! Per-country validation and resolution.
//!
//! Takes one parsed country record, checks it against the rule data, the
//! IANA country table and the alias links, and produces the country's
//! output record. Problems go through [`Diagnostics`]; a country that fails
//! yields no record but never stops its siblings from being processed.

use hashbrown::{HashMap, HashSet};

use crate::backward::BackwardFile;
use crate::diagnostics::Diagnostics;
use crate::history::ZoneHistory;
use crate::input::CountryInput;
use crate::instant::{Instant, MS_PER_MINUTE};
use crate::output::{CountryOutputRecord, ZoneOutputRecord};
use crate::period::OffsetPeriod;
use crate::rules::ZoneRules;
use crate::usage::CountryZoneUsage;
use crate::utils::{
    all_unique, iana_version_year, offset_sample_instant, parse_utc_offset, to_utc_offset_string,
    year_start_instant,
};
use crate::zonetree::ZoneTree;

/// The start (inclusive) of all zone usage calculations:
/// 1970-01-01T00:00:00Z, the point from which the tzdb country data is
/// supposed to be correct.
pub const ZONE_USAGE_CALCS_START: Instant = Instant::EPOCH;

/// The cutoff (exclusive) for reporting "not used after" instants:
/// 2038-01-19T03:14:07Z. Ends at or beyond this are treated as "in use
/// forever" and omitted from the output. A nice round number with
/// historical significance for people who deal with computer time; any
/// future time past the last moment the data will reasonably be consulted
/// would do.
pub const ZONE_USAGE_NOT_AFTER_CUTOFF: Instant = Instant::from_epoch_seconds(i32::MAX as i64);

/// The end (exclusive) of period generation. Needs to clear the cutoff by
/// more than one DST cycle so the final periods are complete; two years is
/// comfortably enough.
pub const ZONE_USAGE_CALCS_END: Instant =
    ZONE_USAGE_NOT_AFTER_CUTOFF.saturating_add_millis(2 * 365 * 24 * 60 * 60 * 1_000);

/// Offsets are expected to fall on quarter-hour boundaries.
const OFFSET_GRANULARITY_MS: i64 = 15 * MS_PER_MINUTE;

/// Resolves countries against one fixed set of rule data and aliases.
///
/// Holds only shared references, so independent countries can be resolved
/// from worker threads concurrently.
pub struct CountryResolver<'a> {
    rules: &'a (dyn ZoneRules + Sync),
    backward: &'a BackwardFile,
    /// Collapsed old-id to current-id links.
    aliases: HashMap<String, String>,
    /// When offsets are sampled: mid-year, one year after the data year.
    sample_instant: Instant,
    /// Where the "ever uses UTC" search begins. Historical use of UTC (e.g.
    /// parts of Europe before WW2) is not interesting.
    utc_search_start: Instant,
}

impl<'a> CountryResolver<'a> {
    /// Fails when the IANA version string carries no usable year, or when
    /// the backward data cannot be collapsed.
    pub fn new(
        rules: &'a (dyn ZoneRules + Sync),
        backward: &'a BackwardFile,
        diags: &mut Diagnostics,
    ) -> Option<CountryResolver<'a>> {
        let version = rules.data_version();
        let Some(year) = iana_version_year(version) else {
            diags.fatal(format!("IANA version {version:?} has no parseable year"));
            return None;
        };
        let aliases = match backward.direct_links() {
            Ok(aliases) => aliases,
            Err(err) => {
                diags.fatal(err.to_string());
                return None;
            }
        };
        Some(CountryResolver {
            rules,
            backward,
            aliases,
            sample_instant: offset_sample_instant(year),
            utc_search_start: year_start_instant(year),
        })
    }

    /// Validates and resolves one country. `iana_zone_ids` is the country's
    /// zone list according to `zone.tab`.
    pub fn resolve(
        &self,
        country: &CountryInput,
        iana_zone_ids: &[String],
        diags: &mut Diagnostics,
    ) -> Option<CountryOutputRecord> {
        diags.scoped(format!("country={}", country.iso_code), |diags| {
            self.resolve_inner(country, iana_zone_ids, diags)
        })
    }

    fn resolve_inner(
        &self,
        country: &CountryInput,
        iana_zone_ids: &[String],
        diags: &mut Diagnostics,
    ) -> Option<CountryOutputRecord> {
        if country.zones.is_empty() {
            diags.error("No time zones");
            return None;
        }

        let zone_ids: Vec<&str> = country.zones.iter().map(|z| z.zone_id.as_str()).collect();
        if !all_unique(zone_ids.iter().copied()) {
            diags.error(format!(
                "country's zones={zone_ids:?} contains duplicates"
            ));
            return None;
        }

        let default_zone_id = self.determine_default_zone(country, diags)?;
        let default_time_zone_boost = determine_boost(country, diags);

        if !zone_ids.contains(&default_zone_id) {
            diags.error(format!(
                "defaultTimeZoneId={default_zone_id} is not one of the country's zones={zone_ids:?}"
            ));
            return None;
        }

        let unresolvable: Vec<&str> = zone_ids
            .iter()
            .copied()
            .filter(|id| !self.rules.is_resolvable(id))
            .collect();
        if !unresolvable.is_empty() {
            for id in unresolvable {
                diags.error(format!("zone id {id} is not a valid zone"));
            }
            return None;
        }

        let ever_uses_utc = self.any_zone_uses_utc(&zone_ids);

        let iana_ok = diags.scoped("zone.tab comparison", |diags| {
            self.reconcile_with_iana(country, iana_zone_ids, diags)
        });
        if !iana_ok {
            return None;
        }

        let usage = self.calculate_zone_usage(country, diags)?;

        let mut zones = Vec::with_capacity(country.zones.len());
        for mapping in &country.zones {
            let complete = diags.scoped(
                format!(
                    "id={}, offset={}, shownInPicker={}",
                    mapping.zone_id, mapping.utc_offset, mapping.shown_in_picker
                ),
                |diags| {
                    self.validate_non_dst_offset(&mapping.zone_id, &mapping.utc_offset, diags);
                    if !usage.has_entry(&mapping.zone_id) {
                        // Implies a bug in the tree walk rather than bad data.
                        diags.error(format!("no usage entry for {}", mapping.zone_id));
                        return false;
                    }
                    true
                },
            );
            if !complete {
                return None;
            }
            let record = usage
                .entry(&mapping.zone_id)
                .expect("presence checked above");
            zones.push(ZoneOutputRecord {
                zone_id: mapping.zone_id.clone(),
                shown_in_picker: mapping.shown_in_picker,
                not_used_after: record.not_used_after(),
                replacement: record.replacement().map(str::to_owned),
                alternative_ids: self
                    .backward
                    .all_alternative_ids(&mapping.zone_id)
                    .into_iter()
                    .collect(),
            });
        }

        Some(CountryOutputRecord {
            iso_code: country.iso_code,
            default_zone_id: default_zone_id.to_owned(),
            default_time_zone_boost,
            ever_uses_utc,
            zones,
        })
    }

    fn determine_default_zone<'c>(
        &self,
        country: &'c CountryInput,
        diags: &mut Diagnostics,
    ) -> Option<&'c str> {
        match &country.default_zone_id {
            Some(explicit) => {
                if !self.rules.is_resolvable(explicit) {
                    diags.error(format!("default time zone ID {explicit} is not valid"));
                    return None;
                }
                Some(explicit)
            }
            None => {
                if country.zones.len() > 1 {
                    diags.error("to pick a default time zone there must be a single zone");
                    return None;
                }
                Some(&country.zones[0].zone_id)
            }
        }
    }

    /// Checks the countryzones ids against IANA's list for the country.
    ///
    /// A mapping carrying an alias must agree with the backward data, and
    /// is represented in IANA's list by its modern id; everything else must
    /// appear verbatim.
    fn reconcile_with_iana(
        &self,
        country: &CountryInput,
        iana_zone_ids: &[String],
        diags: &mut Diagnostics,
    ) -> bool {
        if !all_unique(iana_zone_ids.iter()) {
            diags.error(format!("duplicate IANA zone ids: {iana_zone_ids:?}"));
            return false;
        }

        let mut expected: Vec<&str> = Vec::with_capacity(country.zones.len());
        for mapping in &country.zones {
            match &mapping.alias_id {
                Some(alias) => {
                    if self.aliases.get(&mapping.zone_id) != Some(alias) {
                        diags.error(format!("{} does not link to {alias}", mapping.zone_id));
                        return false;
                    }
                    expected.push(alias);
                }
                None => expected.push(&mapping.zone_id),
            }
        }

        let expected_set: HashSet<&str> = expected.iter().copied().collect();
        let iana_set: HashSet<&str> = iana_zone_ids.iter().map(String::as_str).collect();
        if expected_set != iana_set {
            diags.error(format!(
                "IANA lists {} as having zones: {iana_zone_ids:?}, but countryzones has {expected:?}",
                country.iso_code
            ));
            return false;
        }
        true
    }

    /// Whether any of the country's zones ever runs at a zero total offset
    /// from the search start onward.
    fn any_zone_uses_utc(&self, zone_ids: &[&str]) -> bool {
        for id in zone_ids {
            let mut cursor = self.utc_search_start;
            while cursor.is_before(ZONE_USAGE_CALCS_END) {
                let Some(period) =
                    OffsetPeriod::generate(self.rules, id, cursor, ZONE_USAGE_CALCS_END)
                else {
                    break;
                };
                if period.raw_offset_ms() + period.dst_offset_ms() == 0 {
                    return true;
                }
                cursor = period.end();
            }
        }
        false
    }

    fn validate_non_dst_offset(&self, zone_id: &str, utc_offset: &str, diags: &mut Diagnostics) {
        let Some(expected_ms) = parse_utc_offset(utc_offset) else {
            diags.error(format!("bad offset string: {utc_offset}"));
            return;
        };
        if expected_ms % OFFSET_GRANULARITY_MS != 0 {
            diags.warn(format!(
                "unexpected granularity: not a multiple of 15 minutes: {utc_offset}"
            ));
        }
        let Some(offsets) = self.rules.offsets_at(zone_id, self.sample_instant) else {
            diags.error(format!("time zone ID={zone_id} is not valid"));
            return;
        };
        if i64::from(offsets.raw_offset_ms) != expected_ms {
            diags.error(format!(
                "offset mismatch: raw offset for {zone_id} is {} and not {} at {}",
                to_utc_offset_string(i64::from(offsets.raw_offset_ms)),
                to_utc_offset_string(expected_ms),
                self.sample_instant,
            ));
        }
    }

    fn calculate_zone_usage(
        &self,
        country: &CountryInput,
        diags: &mut Diagnostics,
    ) -> Option<CountryZoneUsage> {
        diags.scoped("building zone tree", |diags| {
            let mut histories = Vec::with_capacity(country.zones.len());
            for mapping in &country.zones {
                match ZoneHistory::build(
                    self.rules,
                    &mapping.zone_id,
                    mapping.priority,
                    ZONE_USAGE_CALCS_START,
                    ZONE_USAGE_CALCS_END,
                ) {
                    Ok(history) => histories.push(history),
                    Err(err) => {
                        diags.error(err.to_string());
                        return None;
                    }
                }
            }
            let tree = match ZoneTree::build(
                country.iso_code,
                histories,
                ZONE_USAGE_CALCS_START,
                ZONE_USAGE_CALCS_END,
            ) {
                Ok(tree) => tree,
                Err(err) => {
                    diags.error(err.to_string());
                    return None;
                }
            };
            let issues = tree.validate();
            if !issues.is_empty() {
                diags.error("issues validating zone tree, adjust priorities:");
                for issue in issues {
                    diags.error(issue);
                }
                return None;
            }
            match tree.compute_usage(ZONE_USAGE_NOT_AFTER_CUTOFF) {
                Ok(usage) => Some(usage),
                Err(err) => {
                    diags.error(err.to_string());
                    None
                }
            }
        })
    }
}

fn determine_boost(country: &CountryInput, diags: &mut Diagnostics) -> bool {
    if country.default_time_zone_boost && country.default_zone_id.is_none() {
        diags.error("defaultTimeZoneBoost is specified but defaultTimeZoneId is not explicit");
    }
    country.default_time_zone_boost
}
