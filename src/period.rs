//! Offset periods.

use crate::instant::Instant;
use crate::rules::{ZoneOffsets, ZoneRules};

/// A span of time during which every offset-related property of a zone
/// remained the same.
///
/// Two periods compare equal only when all five fields match; the tree uses
/// this to decide whether two zones were interchangeable over a span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OffsetPeriod {
    /// Start of the period (inclusive).
    start: Instant,
    /// End of the period (exclusive).
    end: Instant,
    /// Offset from UTC in milliseconds.
    raw_offset_ms: i32,
    /// Additional offset in effect due to DST, in milliseconds.
    dst_offset_ms: i32,
    /// Long display name for the period.
    display_name: String,
}

impl OffsetPeriod {
    /// Produces the period beginning at `start` within `[start, end_exclusive)`.
    ///
    /// The period runs until the zone's next rule transition, or until
    /// `end_exclusive`, whichever comes first. Returns `None` when the id has
    /// no rule data.
    pub(crate) fn generate(
        rules: &dyn ZoneRules,
        zone_id: &str,
        start: Instant,
        end_exclusive: Instant,
    ) -> Option<OffsetPeriod> {
        debug_assert!(start.is_before(end_exclusive));
        let ZoneOffsets {
            raw_offset_ms,
            dst_offset_ms,
            name,
        } = rules.offsets_at(zone_id, start)?;
        let end = match rules.next_transition(zone_id, start) {
            Some(transition) => transition.min(end_exclusive),
            None => end_exclusive,
        };
        Some(OffsetPeriod {
            start,
            end,
            raw_offset_ms,
            dst_offset_ms,
            display_name: name,
        })
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    pub fn raw_offset_ms(&self) -> i32 {
        self.raw_offset_ms
    }

    pub fn dst_offset_ms(&self) -> i32 {
        self.dst_offset_ms
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}
