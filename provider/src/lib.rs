//! An offline location-time-zone provider.
//!
//! A long-lived background service is handed coarse location fixes and
//! must keep its host's notion of "which time zones could we be in" up to
//! date, without draining the battery. The pieces:
//!
//! - [`budget::ListeningBudget`] meters the expensive kind of location
//!   listening, earning credit from cheap passive listening.
//! - [`fsm::LocationTimeZoneProvider`] is the state machine that plans
//!   listening windows, resolves fixes to zone ids, and delivers
//!   [`environment::ProviderResult`]s, each at most once.
//! - [`environment::Environment`] abstracts the platform (clock, location
//!   subscriptions, timeouts, geo data, result delivery) so the whole
//!   machine runs under test with a scripted fake.
//!
//! Zone ids delivered here are the same vocabulary the build-time
//! consolidation produces for the device's lookup artifact.

pub mod budget;
pub mod environment;
pub mod fsm;

pub use budget::{ListenPlan, ListeningBudget, LocationKind, LocationOutcome};
pub use environment::{
    Cancellable, Environment, GeoZoneFinder, ListenMode, LocationToken, ProviderResult,
};
pub use fsm::{LocationTimeZoneProvider, ModeKind};
