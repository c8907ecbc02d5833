//! Per-zone offset histories.

use core::ops::Range;

use crate::error::{TzLookupError, TzLookupResult};
use crate::instant::Instant;
use crate::period::OffsetPeriod;
use crate::rules::ZoneRules;

pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// The offset timeline of one tzdb zone over a fixed range, together with
/// the priority used to arbitrate between otherwise identical zones.
#[derive(Debug, Clone)]
pub struct ZoneHistory {
    zone_id: String,
    priority: u8,
    /// Ascending, contiguous periods covering the build range exactly.
    periods: Vec<OffsetPeriod>,
}

impl ZoneHistory {
    /// Walks the zone's rule data to produce the contiguous period sequence
    /// for `[start, end_exclusive)`.
    pub fn build(
        rules: &dyn ZoneRules,
        zone_id: &str,
        priority: u8,
        start: Instant,
        end_exclusive: Instant,
    ) -> TzLookupResult<ZoneHistory> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(TzLookupError::InvalidPriority(priority));
        }
        let mut periods = Vec::new();
        let mut cursor = start;
        while cursor.is_before(end_exclusive) {
            let period = OffsetPeriod::generate(rules, zone_id, cursor, end_exclusive)
                .ok_or_else(|| TzLookupError::UnknownZone(zone_id.to_owned()))?;
            cursor = period.end();
            periods.push(period);
        }
        Ok(ZoneHistory {
            zone_id: zone_id.to_owned(),
            priority,
            periods,
        })
    }

    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn period(&self, index: usize) -> &OffsetPeriod {
        &self.periods[index]
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    /// A hashable key over `periods[range]`.
    ///
    /// Two histories produce equal keys over a range exactly when their
    /// contained periods compare equal field by field, making the key usable
    /// for bucketing zones that were indistinguishable over the range.
    pub fn key_over_range(&self, range: Range<usize>) -> PeriodsKey<'_> {
        PeriodsKey(&self.periods[range])
    }
}

/// A borrowed, hash-by-value view of a period range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodsKey<'a>(&'a [OffsetPeriod]);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Transition, TransitionZoneRules, ZoneOffsets};

    fn rules() -> TransitionZoneRules {
        let mut rules = TransitionZoneRules::new("2021a");
        let summer = ZoneOffsets::new(0, 3_600_000, "Western European Summer Time");
        let winter = ZoneOffsets::new(0, 0, "Western European Standard Time");
        rules.insert_zone(
            "Europe/Lisbon",
            winter.clone(),
            vec![
                Transition {
                    at: 100,
                    offsets: summer.clone(),
                },
                Transition {
                    at: 200,
                    offsets: winter.clone(),
                },
                Transition {
                    at: 300,
                    offsets: summer,
                },
            ],
        );
        rules.insert_zone("Atlantic/Madeira", winter, vec![]);
        rules
    }

    #[test]
    fn periods_tile_the_range() {
        let rules = rules();
        let history = ZoneHistory::build(
            &rules,
            "Europe/Lisbon",
            1,
            Instant::EPOCH,
            Instant::from_epoch_millis(250),
        )
        .unwrap();
        assert_eq!(history.period_count(), 3);
        assert_eq!(history.period(0).start(), Instant::EPOCH);
        for i in 1..history.period_count() {
            assert_eq!(history.period(i - 1).end(), history.period(i).start());
        }
        assert_eq!(history.period(2).end(), Instant::from_epoch_millis(250));
    }

    #[test]
    fn priority_range_is_enforced() {
        let rules = rules();
        for priority in [0, 11] {
            let result = ZoneHistory::build(
                &rules,
                "Europe/Lisbon",
                priority,
                Instant::EPOCH,
                Instant::from_epoch_millis(10),
            );
            assert!(matches!(result, Err(TzLookupError::InvalidPriority(p)) if p == priority));
        }
    }

    #[test]
    fn equal_period_ranges_hash_equal() {
        use core::hash::{Hash, Hasher};

        let rules = rules();
        let end = Instant::from_epoch_millis(50);
        let a = ZoneHistory::build(&rules, "Europe/Lisbon", 1, Instant::EPOCH, end).unwrap();
        let b = ZoneHistory::build(&rules, "Atlantic/Madeira", 5, Instant::EPOCH, end).unwrap();
        assert_eq!(a.key_over_range(0..1), b.key_over_range(0..1));

        let hash = |key: &PeriodsKey<'_>| {
            let mut hasher = std::hash::DefaultHasher::new();
            key.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a.key_over_range(0..1)), hash(&b.key_over_range(0..1)));
    }
}
