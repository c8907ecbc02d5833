//! The tz rule collaborator.
//!
//! Interpreting raw tzdb rule lines is somebody else's job. The tree and
//! resolver code only ever ask two questions of a zone: what offsets and
//! name are in effect at an instant, and when is the next transition. The
//! [`ZoneRules`] trait captures exactly that, and
//! [`TransitionZoneRules`] answers it from a pre-computed transition table
//! (the shape a tz compiler or an ICU dump produces).

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::instant::Instant;

/// The offset information in effect for a zone at some instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneOffsets {
    /// Offset from UTC in milliseconds, excluding any DST saving.
    pub raw_offset_ms: i32,
    /// Additional offset applied while DST is in effect, in milliseconds.
    pub dst_offset_ms: i32,
    /// Long display name for the period, e.g. `"British Summer Time"`.
    pub name: String,
}

impl ZoneOffsets {
    pub fn new(raw_offset_ms: i32, dst_offset_ms: i32, name: &str) -> Self {
        Self {
            raw_offset_ms,
            dst_offset_ms,
            name: name.to_owned(),
        }
    }

    /// The total offset from UTC, raw plus DST saving.
    pub fn total_offset_ms(&self) -> i32 {
        self.raw_offset_ms + self.dst_offset_ms
    }
}

/// Read access to compiled tz rule data.
pub trait ZoneRules {
    /// The offsets and name in effect at `at`, or `None` for an unknown id.
    fn offsets_at(&self, zone_id: &str, at: Instant) -> Option<ZoneOffsets>;

    /// The first offset transition strictly after `after`, if any.
    fn next_transition(&self, zone_id: &str, after: Instant) -> Option<Instant>;

    /// The IANA version of the data backing this source, e.g. `"2021a"`.
    fn data_version(&self) -> &str;

    /// Whether the id resolves to rule data at all.
    fn is_resolvable(&self, zone_id: &str) -> bool {
        self.offsets_at(zone_id, Instant::EPOCH).is_some()
    }
}

/// One entry in a zone's transition table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Epoch milliseconds at which the new offsets take effect.
    pub at: i64,
    #[serde(flatten)]
    pub offsets: ZoneOffsets,
}

/// The full offset timeline of a single zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTimeline {
    /// The offsets in effect before the first transition.
    pub initial: ZoneOffsets,
    /// Transitions in ascending `at` order.
    pub transitions: Vec<Transition>,
}

impl ZoneTimeline {
    fn offsets_at(&self, at: Instant) -> &ZoneOffsets {
        let ms = at.as_epoch_millis();
        match self.transitions.partition_point(|t| t.at <= ms) {
            0 => &self.initial,
            n => &self.transitions[n - 1].offsets,
        }
    }

    fn next_transition(&self, after: Instant) -> Option<Instant> {
        let ms = after.as_epoch_millis();
        let idx = self.transitions.partition_point(|t| t.at <= ms);
        self.transitions
            .get(idx)
            .map(|t| Instant::from_epoch_millis(t.at))
    }
}

/// A [`ZoneRules`] source backed by in-memory transition tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransitionZoneRules {
    pub version: String,
    pub zones: HashMap<String, ZoneTimeline>,
}

impl TransitionZoneRules {
    pub fn new(version: &str) -> Self {
        Self {
            version: version.to_owned(),
            zones: HashMap::new(),
        }
    }

    /// Adds a zone timeline, keeping its transitions sorted.
    pub fn insert_zone(
        &mut self,
        zone_id: &str,
        initial: ZoneOffsets,
        mut transitions: Vec<Transition>,
    ) {
        transitions.sort_by_key(|t| t.at);
        self.zones.insert(
            zone_id.to_owned(),
            ZoneTimeline {
                initial,
                transitions,
            },
        );
    }

    /// Loads a transition dump from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl ZoneRules for TransitionZoneRules {
    fn offsets_at(&self, zone_id: &str, at: Instant) -> Option<ZoneOffsets> {
        self.zones.get(zone_id).map(|tl| tl.offsets_at(at).clone())
    }

    fn next_transition(&self, zone_id: &str, after: Instant) -> Option<Instant> {
        self.zones.get(zone_id)?.next_transition(after)
    }

    fn data_version(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn london() -> TransitionZoneRules {
        let mut rules = TransitionZoneRules::new("2021a");
        rules.insert_zone(
            "Europe/London",
            ZoneOffsets::new(0, 0, "Greenwich Mean Time"),
            vec![
                Transition {
                    at: 1_000,
                    offsets: ZoneOffsets::new(0, 3_600_000, "British Summer Time"),
                },
                Transition {
                    at: 2_000,
                    offsets: ZoneOffsets::new(0, 0, "Greenwich Mean Time"),
                },
            ],
        );
        rules
    }

    #[test]
    fn offsets_follow_the_timeline() {
        let rules = london();
        let at = |ms| rules.offsets_at("Europe/London", Instant::from_epoch_millis(ms));
        assert_eq!(at(0).unwrap().dst_offset_ms, 0);
        assert_eq!(at(999).unwrap().dst_offset_ms, 0);
        assert_eq!(at(1_000).unwrap().dst_offset_ms, 3_600_000);
        assert_eq!(at(2_500).unwrap().dst_offset_ms, 0);
        assert!(rules
            .offsets_at("Europe/Nowhere", Instant::EPOCH)
            .is_none());
    }

    #[test]
    fn next_transition_is_strictly_after() {
        let rules = london();
        let next = |ms| rules.next_transition("Europe/London", Instant::from_epoch_millis(ms));
        assert_eq!(next(0), Some(Instant::from_epoch_millis(1_000)));
        assert_eq!(next(1_000), Some(Instant::from_epoch_millis(2_000)));
        assert_eq!(next(2_000), None);
    }

    #[test]
    fn resolvable_only_for_known_ids() {
        let rules = london();
        assert!(rules.is_resolvable("Europe/London"));
        assert!(!rules.is_resolvable("Mars/Olympus"));
    }
}
