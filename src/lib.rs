//! Country time-zone consolidation for an on-device lookup artifact.
//!
//! This crate turns raw tz inputs (per-country zone lists, the IANA
//! `zone.tab` country table and the `backward` alias links) into the
//! compact per-country records a device consults to map a country to its
//! zones: a default zone, a ranked zone list, and "not used after"
//! timestamps marking where one zone's history merged into another's.
//!
//! The interesting machinery is the [`zonetree::ZoneTree`]: a compressed
//! tree over each country's offset histories that records when its zones
//! agreed and when they diverged, grown from the present into the past.
//! [`resolver::CountryResolver`] validates each country against the rule
//! data and derives its output record from the tree;
//! [`generator::generate`] runs the whole pipeline and
//! [`xml::write_document`] renders the artifact.
//!
//! Rule interpretation itself is deliberately outside this crate: all rule
//! access goes through the [`rules::ZoneRules`] trait, with
//! [`rules::TransitionZoneRules`] consuming pre-compiled transition
//! tables.
//!
//! This library favors clarity over speed: it runs at build time over a
//! bounded dataset, never on device.

#![cfg_attr(not(test), forbid(clippy::unwrap_used))]
#![allow(clippy::module_name_repetitions)]

pub mod backward;
pub mod diagnostics;
pub mod error;
pub mod generator;
pub mod history;
pub mod input;
pub mod instant;
pub mod output;
pub mod period;
pub mod resolver;
pub mod rules;
pub mod usage;
pub mod xml;
pub mod zonetab;
pub mod zonetree;

pub(crate) mod utils;

pub use backward::BackwardFile;
pub use diagnostics::Diagnostics;
pub use error::{TzLookupError, TzLookupResult};
pub use generator::{generate, GeneratorError};
pub use input::{CountryCode, CountryInput, CountryZonesInput, ZoneMappingInput};
pub use instant::Instant;
pub use output::{CountryOutputRecord, TzLookupDocument, ZoneOutputRecord};
pub use resolver::CountryResolver;
pub use rules::{TransitionZoneRules, ZoneRules};
pub use zonetab::ZoneTab;
