//! The provider's view of the outside world.
//!
//! Everything platform-shaped (clocks, location subscriptions, timeouts,
//! the geo lookup data, result delivery) sits behind [`Environment`] so
//! the state machine can be driven entirely from tests. Each asynchronous
//! request hands back a [`Cancellable`]; a callback arriving after its
//! handle was cancelled must be ignored by the receiver.

use std::io;

/// A handle for revoking a scheduled callback or subscription.
/// Cancellation must be idempotent.
pub trait Cancellable: Send {
    fn cancel(&mut self);
}

/// How aggressively to listen for location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenMode {
    /// Power-expensive listening that actively requests a fix.
    Active,
    /// Cheap listening that only observes fixes other consumers produce.
    Passive,
}

/// An opaque identifier for the geo cell containing a coordinate.
///
/// Tokens compare equal exactly when two coordinates fall in the same cell,
/// which is what makes them usable for suppressing repeat lookups; nothing
/// else about the value is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocationToken(u64);

impl LocationToken {
    pub fn from_cell_id(cell_id: u64) -> Self {
        LocationToken(cell_id)
    }
}

/// Read access to the on-disk geolocation index.
///
/// Implementations hold open files; the provider opens a finder per lookup
/// and drops it on every exit path.
pub trait GeoZoneFinder {
    /// The token for the cell containing the coordinate.
    fn location_token(&mut self, latitude: f64, longitude: f64) -> io::Result<LocationToken>;

    /// Ordered zone ids for a token; may be empty for oceans.
    fn zones_for_token(&mut self, token: LocationToken) -> io::Result<Vec<String>>;
}

/// What the provider tells its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResult {
    /// The current time zones are known with certainty.
    Suggestion {
        zone_ids: Vec<String>,
        elapsed_realtime_ms: u64,
    },
    /// The provider cannot currently say what the time zone is.
    Uncertain,
    /// The provider is broken and will not recover without a restart.
    PermanentFailure { cause: String },
}

/// Platform services the provider runs against.
///
/// All callbacks resulting from these requests must be posted back to the
/// provider's own thread; implementations never invoke provider entry
/// points inline.
pub trait Environment {
    /// A monotonic millisecond clock unaffected by wall-clock jumps.
    fn elapsed_realtime_ms(&self) -> u64;

    /// Requests a one-shot callback carrying `token` after `delay_ms`.
    fn schedule_timeout(&self, token: &str, delay_ms: u64) -> Box<dyn Cancellable>;

    /// Starts actively requesting location fixes for at most `duration_ms`.
    fn listen_active(&self, duration_ms: u64) -> Box<dyn Cancellable>;

    /// Starts passively observing location fixes for at most `duration_ms`.
    fn listen_passive(&self, duration_ms: u64) -> Box<dyn Cancellable>;

    /// Opens the geo lookup data.
    fn open_geo_finder(&self) -> io::Result<Box<dyn GeoZoneFinder>>;

    /// Delivers a result to the host.
    fn report(&self, result: ProviderResult);

    /// Keeps the device awake while a planning section runs. Optional; a
    /// no-op implementation is fine.
    fn acquire_wake_lock(&self) {}
    fn release_wake_lock(&self) {}
}

/// Holds the environment wake lock for a lexical scope, releasing it on
/// every exit path including unwinds.
pub(crate) struct WakeLockGuard<'a, E: Environment + ?Sized> {
    env: &'a E,
}

impl<'a, E: Environment + ?Sized> WakeLockGuard<'a, E> {
    pub(crate) fn acquire(env: &'a E) -> Self {
        env.acquire_wake_lock();
        WakeLockGuard { env }
    }
}

impl<E: Environment + ?Sized> Drop for WakeLockGuard<'_, E> {
    fn drop(&mut self) {
        self.env.release_wake_lock();
    }
}
