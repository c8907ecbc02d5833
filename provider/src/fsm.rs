//! The provider state machine.
//!
//! Balances power use against responsiveness: listen actively (expensive)
//! only when the budget allows and nothing fresh is known, listen passively
//! (cheap) otherwise, and tell the host only things it has not already been
//! told.
//!
//! ```text
//! The initial mode is Stopped.
//!
//! Stopped
//!   -> Started(Active|Passive)   on start; the first window is active so
//!                                the host's initialization timeout can be
//!                                beaten with a real answer.
//! Started(m)
//!   -> Started(m')               every completed window replans against
//!                                the budget and the freshness of the last
//!                                outcome.
//!   -> Stopped                   on stop; location-derived state is
//!                                dropped, the budget survives.
//! any state
//!   -> Destroyed (terminal)      on destroy.
//! Started(m)
//!   -> Failed (terminal)         when the geo data cannot be read.
//! ```
//!
//! All state lives behind one mutex; callbacks arriving from platform
//! threads serialize through it. A callback that outlived its cancellation
//! is recognized (wrong mode, or wrong timeout token) and dropped.

use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::sync::Mutex;

use log::{debug, warn};

use crate::budget::{ListeningBudget, LocationKind, LocationOutcome};
use crate::environment::{
    Cancellable, Environment, ListenMode, LocationToken, ProviderResult, WakeLockGuard,
};

const MODE_HISTORY_LIMIT: usize = 10;

/// The provider's coarse state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Stopped,
    Started(ListenMode),
    Failed,
    Destroyed,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeKind::Stopped => f.write_str("stopped"),
            ModeKind::Started(ListenMode::Active) => f.write_str("started(active)"),
            ModeKind::Started(ListenMode::Passive) => f.write_str("started(passive)"),
            ModeKind::Failed => f.write_str("failed"),
            ModeKind::Destroyed => f.write_str("destroyed"),
        }
    }
}

/// The kind of the last result handed to the host, for duplicate
/// suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveredKind {
    Suggestion,
    Uncertain,
    Failure,
}

struct ActiveWindow {
    started_at_ms: u64,
    planned_ms: u64,
}

struct ProviderState {
    mode: ModeKind,
    /// Cancels the current listening subscription, when one is live.
    listening: Option<Box<dyn Cancellable>>,
    /// The one-shot startup deadline: handle plus the token that
    /// identifies its callback as current.
    init_timeout: Option<(Box<dyn Cancellable>, String)>,
    budget: ListeningBudget,
    /// The last completed listening outcome, for planning.
    last_outcome: Option<LocationOutcome>,
    /// Duplicate suppression: what was last delivered, and for which cell.
    last_delivered: Option<DeliveredKind>,
    last_token: Option<LocationToken>,
    /// The live active window, for refunding unused time.
    active_window: Option<ActiveWindow>,
    /// Recent transitions, newest first, for debugging.
    history: VecDeque<String>,
}

impl ProviderState {
    fn new() -> Self {
        ProviderState {
            mode: ModeKind::Stopped,
            listening: None,
            init_timeout: None,
            budget: ListeningBudget::new(),
            last_outcome: None,
            last_delivered: None,
            last_token: None,
            active_window: None,
            history: VecDeque::new(),
        }
    }

    fn cancel_listening(&mut self) {
        if let Some(mut handle) = self.listening.take() {
            handle.cancel();
        }
        self.active_window = None;
    }

    fn cancel_init_timeout(&mut self) {
        if let Some((mut handle, _)) = self.init_timeout.take() {
            handle.cancel();
        }
    }

    fn set_mode(&mut self, mode: ModeKind, cause: &str, now_ms: u64) {
        debug!("mode {} -> {mode}, cause={cause}", self.mode);
        self.history
            .push_front(format!("{mode} at={now_ms}ms cause={cause}"));
        self.history.truncate(MODE_HISTORY_LIMIT);
        self.mode = mode;
    }

    /// Forgets everything derived from location. Called on stop, where the
    /// user (and therefore the region) may change before the next start.
    fn clear_location_state(&mut self) {
        self.last_outcome = None;
        self.last_delivered = None;
        self.last_token = None;
    }
}

/// The offline location-time-zone provider.
///
/// The host drives it with [`on_start`](Self::on_start) /
/// [`on_stop`](Self::on_stop) / [`on_destroy`](Self::on_destroy); the
/// environment posts location and timeout callbacks to the remaining entry
/// points. Results flow out through [`Environment::report`].
pub struct LocationTimeZoneProvider<E: Environment> {
    env: E,
    state: Mutex<ProviderState>,
}

impl<E: Environment> LocationTimeZoneProvider<E> {
    pub fn new(env: E) -> Self {
        LocationTimeZoneProvider {
            env,
            state: Mutex::new(ProviderState::new()),
        }
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.lock().mode
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ProviderState> {
        self.state.lock().expect("provider state lock poisoned")
    }

    pub fn on_bind(&self) {
        let state = self.lock();
        if state.mode != ModeKind::Stopped {
            self.unexpected(format!("bind while {}", state.mode));
        }
    }

    pub fn on_start(&self, init_timeout_ms: u64) {
        let mut state = self.lock();
        match state.mode {
            ModeKind::Stopped => {
                let now = self.env.elapsed_realtime_ms();
                let token = format!("init:{init_timeout_ms}@{now}");
                let handle = self.env.schedule_timeout(&token, init_timeout_ms);
                state.init_timeout = Some((handle, token));
                self.enter_listening(&mut state, "start");
            }
            ModeKind::Started(_) => {
                warn!("start received while already {}", state.mode);
            }
            ModeKind::Failed | ModeKind::Destroyed => {
                self.unexpected(format!("start while {}", state.mode));
            }
        }
    }

    pub fn on_stop(&self) {
        let mut state = self.lock();
        match state.mode {
            ModeKind::Started(_) => {
                state.cancel_listening();
                state.cancel_init_timeout();
                state.clear_location_state();
                let now = self.env.elapsed_realtime_ms();
                state.set_mode(ModeKind::Stopped, "stop", now);
            }
            ModeKind::Stopped => {
                warn!("stop received while already stopped");
            }
            ModeKind::Failed | ModeKind::Destroyed => {
                self.unexpected(format!("stop while {}", state.mode));
            }
        }
    }

    pub fn on_destroy(&self) {
        let mut state = self.lock();
        state.cancel_listening();
        state.cancel_init_timeout();
        if matches!(state.mode, ModeKind::Started(_)) {
            self.deliver_uncertain_if_needed(&mut state);
        }
        let now = self.env.elapsed_realtime_ms();
        state.set_mode(ModeKind::Destroyed, "destroy", now);
    }

    /// A location fix arrived from the current listening window.
    pub fn on_location_known(&self, latitude: f64, longitude: f64) {
        let mut state = self.lock();
        let ModeKind::Started(listen_mode) = state.mode else {
            debug!("dropping location fix while {}", state.mode);
            return;
        };
        let now = self.env.elapsed_realtime_ms();

        if listen_mode == ListenMode::Active {
            // The active request returned early; refund what it left
            // unspent. Passive windows reserve nothing, so there is
            // nothing to give back.
            if let Some(window) = state.active_window.take() {
                let used = now.saturating_sub(window.started_at_ms);
                state.budget.deposit(window.planned_ms.saturating_sub(used));
            }
        }

        match self.lookup_and_deliver(&mut state, latitude, longitude, now) {
            Ok(()) => {
                state.last_outcome = Some(LocationOutcome {
                    kind: LocationKind::Known,
                    at_elapsed_ms: now,
                });
                state.cancel_init_timeout();
                self.enter_listening(&mut state, "location fix");
            }
            Err(err) => {
                self.enter_failed(&mut state, format!("geo lookup failed: {err}"));
            }
        }
    }

    /// The current window closed without producing a fix.
    pub fn on_location_not_known(&self) {
        let mut state = self.lock();
        if !matches!(state.mode, ModeKind::Started(_)) {
            debug!("dropping no-fix signal while {}", state.mode);
            return;
        }
        let now = self.env.elapsed_realtime_ms();
        state.active_window = None;

        // During startup the host grants a full initialization window
        // before expecting any answer; while that deadline is pending and
        // nothing has been delivered, one empty window is not yet news.
        let stay_silent = state.last_delivered.is_none() && state.init_timeout.is_some();
        if !stay_silent {
            self.deliver_uncertain_if_needed(&mut state);
        }

        state.last_outcome = Some(LocationOutcome {
            kind: LocationKind::NotKnown,
            at_elapsed_ms: now,
        });
        self.enter_listening(&mut state, "window closed without fix");
    }

    /// A passive window ran to completion after `actual_duration_ms`.
    pub fn on_passive_ended(&self, actual_duration_ms: u64) {
        let mut state = self.lock();
        if state.mode != ModeKind::Started(ListenMode::Passive) {
            debug!("dropping passive-end signal while {}", state.mode);
            return;
        }
        state.budget.accrue(actual_duration_ms);
        self.enter_listening(&mut state, "passive window ended");
    }

    /// The startup deadline fired. `token` identifies the scheduled
    /// callback; anything but the current token is a cancelled straggler.
    pub fn on_timeout(&self, token: &str) {
        let mut state = self.lock();
        match &state.init_timeout {
            Some((_, expected)) if expected == token => {}
            _ => {
                debug!("dropping timeout for token {token:?}");
                return;
            }
        }
        state.init_timeout = None;
        if state.last_delivered.is_none() {
            self.deliver_uncertain_if_needed(&mut state);
        }
    }

    /// Renders current state and recent transitions for bug reports.
    pub fn dump(&self) -> String {
        use core::fmt::Write as _;

        let state = self.lock();
        let mut out = String::new();
        let _ = writeln!(out, "mode={}", state.mode);
        let _ = writeln!(out, "budget={}ms", state.budget.balance_ms());
        let _ = writeln!(out, "last_token={:?}", state.last_token);
        let _ = writeln!(out, "history:");
        for line in &state.history {
            let _ = writeln!(out, "  {line}");
        }
        out
    }

    /// Picks the next window from the budget and subscribes accordingly.
    fn enter_listening(&self, state: &mut ProviderState, cause: &str) {
        let _wake = WakeLockGuard::acquire(&self.env);
        let now = self.env.elapsed_realtime_ms();
        let plan = state.budget.plan(now, state.last_outcome.as_ref());
        state.cancel_listening();
        let listening = match plan.mode {
            ListenMode::Active => {
                state.active_window = Some(ActiveWindow {
                    started_at_ms: now,
                    planned_ms: plan.duration_ms,
                });
                self.env.listen_active(plan.duration_ms)
            }
            ListenMode::Passive => self.env.listen_passive(plan.duration_ms),
        };
        state.listening = Some(listening);
        state.set_mode(ModeKind::Started(plan.mode), cause, now);
    }

    /// Resolves the fix to zone ids and reports them, unless the fix landed
    /// in the same geo cell as the previous report. The geo data is opened
    /// for just this call.
    fn lookup_and_deliver(
        &self,
        state: &mut ProviderState,
        latitude: f64,
        longitude: f64,
        now_ms: u64,
    ) -> io::Result<()> {
        let mut finder = self.env.open_geo_finder()?;
        let token = finder.location_token(latitude, longitude)?;
        if state.last_token == Some(token) {
            debug!("location token unchanged, not re-reporting");
            return Ok(());
        }
        let zone_ids = finder.zones_for_token(token)?;
        debug!("zones for ({latitude}, {longitude}): {zone_ids:?}");
        state.last_token = Some(token);
        state.last_delivered = Some(DeliveredKind::Suggestion);
        self.env.report(ProviderResult::Suggestion {
            zone_ids,
            elapsed_realtime_ms: now_ms,
        });
        Ok(())
    }

    fn deliver_uncertain_if_needed(&self, state: &mut ProviderState) {
        if state.last_delivered == Some(DeliveredKind::Uncertain) {
            debug!("already uncertain, not re-reporting");
            return;
        }
        state.last_delivered = Some(DeliveredKind::Uncertain);
        state.last_token = None;
        self.env.report(ProviderResult::Uncertain);
    }

    fn enter_failed(&self, state: &mut ProviderState, cause: String) {
        warn!("provider failed: {cause}");
        state.cancel_listening();
        state.cancel_init_timeout();
        state.last_delivered = Some(DeliveredKind::Failure);
        state.last_token = None;
        self.env.report(ProviderResult::PermanentFailure { cause });
        let now = self.env.elapsed_realtime_ms();
        state.set_mode(ModeKind::Failed, "lookup failure", now);
    }

    /// A host-protocol violation: loud in debug builds, logged in release.
    fn unexpected(&self, message: String) {
        warn!("{message}");
        debug_assert!(false, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{
        MAXIMUM_ACTIVE_LISTENING_DURATION_MS, MINIMUM_ACTIVE_LISTENING_DURATION_MS,
        MINIMUM_PASSIVE_LISTENING_DURATION_MS,
    };
    use crate::environment::GeoZoneFinder;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct FakeInner {
        now_ms: u64,
        listening: Option<(ListenMode, u64)>,
        timeouts: Vec<FakeTimeout>,
        reported: Vec<ProviderResult>,
        zones_by_cell: HashMap<u64, Vec<String>>,
        fail_geo_open: bool,
        wake_acquired: u32,
        wake_released: u32,
    }

    struct FakeTimeout {
        token: String,
        delay_ms: u64,
        cancelled: bool,
    }

    #[derive(Clone, Default)]
    struct FakeEnv {
        inner: Arc<Mutex<FakeInner>>,
    }

    impl FakeEnv {
        fn advance(&self, ms: u64) {
            self.inner.lock().unwrap().now_ms += ms;
        }

        fn set_zones(&self, latitude: f64, longitude: f64, zones: &[&str]) {
            self.inner.lock().unwrap().zones_by_cell.insert(
                cell_for(latitude, longitude),
                zones.iter().map(|z| (*z).to_owned()).collect(),
            );
        }

        fn listening(&self) -> Option<(ListenMode, u64)> {
            self.inner.lock().unwrap().listening
        }

        fn reported(&self) -> Vec<ProviderResult> {
            self.inner.lock().unwrap().reported.clone()
        }

        fn init_token(&self) -> String {
            self.inner.lock().unwrap().timeouts[0].token.clone()
        }
    }

    fn cell_for(latitude: f64, longitude: f64) -> u64 {
        ((latitude * 10.0) as i64 as u64) << 32 | ((longitude * 10.0) as i64 as u64)
    }

    struct CancelListening {
        inner: Arc<Mutex<FakeInner>>,
    }

    impl Cancellable for CancelListening {
        fn cancel(&mut self) {
            self.inner.lock().unwrap().listening = None;
        }
    }

    struct CancelTimeout {
        inner: Arc<Mutex<FakeInner>>,
        index: usize,
    }

    impl Cancellable for CancelTimeout {
        fn cancel(&mut self) {
            self.inner.lock().unwrap().timeouts[self.index].cancelled = true;
        }
    }

    struct FakeFinder {
        inner: Arc<Mutex<FakeInner>>,
    }

    impl GeoZoneFinder for FakeFinder {
        fn location_token(&mut self, latitude: f64, longitude: f64) -> io::Result<LocationToken> {
            Ok(LocationToken::from_cell_id(cell_for(latitude, longitude)))
        }

        fn zones_for_token(&mut self, token: LocationToken) -> io::Result<Vec<String>> {
            let inner = self.inner.lock().unwrap();
            for (&cell, zones) in &inner.zones_by_cell {
                if LocationToken::from_cell_id(cell) == token {
                    return Ok(zones.clone());
                }
            }
            Ok(Vec::new())
        }
    }

    impl Environment for FakeEnv {
        fn elapsed_realtime_ms(&self) -> u64 {
            self.inner.lock().unwrap().now_ms
        }

        fn schedule_timeout(&self, token: &str, delay_ms: u64) -> Box<dyn Cancellable> {
            let mut inner = self.inner.lock().unwrap();
            inner.timeouts.push(FakeTimeout {
                token: token.to_owned(),
                delay_ms,
                cancelled: false,
            });
            Box::new(CancelTimeout {
                inner: Arc::clone(&self.inner),
                index: inner.timeouts.len() - 1,
            })
        }

        fn listen_active(&self, duration_ms: u64) -> Box<dyn Cancellable> {
            self.inner.lock().unwrap().listening = Some((ListenMode::Active, duration_ms));
            Box::new(CancelListening {
                inner: Arc::clone(&self.inner),
            })
        }

        fn listen_passive(&self, duration_ms: u64) -> Box<dyn Cancellable> {
            self.inner.lock().unwrap().listening = Some((ListenMode::Passive, duration_ms));
            Box::new(CancelListening {
                inner: Arc::clone(&self.inner),
            })
        }

        fn open_geo_finder(&self) -> io::Result<Box<dyn GeoZoneFinder>> {
            if self.inner.lock().unwrap().fail_geo_open {
                return Err(io::Error::other("geo data unreadable"));
            }
            Ok(Box::new(FakeFinder {
                inner: Arc::clone(&self.inner),
            }))
        }

        fn report(&self, result: ProviderResult) {
            self.inner.lock().unwrap().reported.push(result);
        }

        fn acquire_wake_lock(&self) {
            self.inner.lock().unwrap().wake_acquired += 1;
        }

        fn release_wake_lock(&self) {
            self.inner.lock().unwrap().wake_released += 1;
        }
    }

    fn provider() -> (LocationTimeZoneProvider<FakeEnv>, FakeEnv) {
        let env = FakeEnv::default();
        (LocationTimeZoneProvider::new(env.clone()), env)
    }

    #[test]
    fn location_found_immediately() {
        let (provider, env) = provider();
        env.set_zones(1.0, 1.0, &["Europe/London"]);

        assert_eq!(provider.mode_kind(), ModeKind::Stopped);
        provider.on_bind();
        assert_eq!(env.listening(), None);

        provider.on_start(20_000);
        assert_eq!(
            env.listening(),
            Some((ListenMode::Active, MINIMUM_ACTIVE_LISTENING_DURATION_MS)),
            "startup credit buys exactly one minimum active window"
        );
        {
            let inner = env.inner.lock().unwrap();
            assert_eq!(inner.timeouts.len(), 1);
            assert_eq!(inner.timeouts[0].delay_ms, 20_000);
        }

        provider.on_location_known(1.0, 1.0);
        assert_eq!(
            env.reported(),
            vec![ProviderResult::Suggestion {
                zone_ids: vec!["Europe/London".to_owned()],
                elapsed_realtime_ms: 0,
            }]
        );
        assert_eq!(provider.mode_kind(), ModeKind::Started(ListenMode::Passive));
        assert_eq!(
            env.listening(),
            Some((ListenMode::Passive, MINIMUM_PASSIVE_LISTENING_DURATION_MS))
        );
        assert!(
            env.inner.lock().unwrap().timeouts[0].cancelled,
            "the startup deadline is cancelled once an answer is out"
        );
    }

    #[test]
    fn initialization_timeout_reports_uncertain_once() {
        let (provider, env) = provider();
        provider.on_start(1_000);
        let token = env.init_token();

        env.advance(1_000);
        provider.on_timeout(&token);
        assert_eq!(env.reported(), vec![ProviderResult::Uncertain]);

        // The active window closing afterwards must not repeat it.
        provider.on_location_not_known();
        assert_eq!(env.reported(), vec![ProviderResult::Uncertain]);
        assert!(
            matches!(provider.mode_kind(), ModeKind::Started(_)),
            "the provider keeps listening after reporting uncertain"
        );
    }

    #[test]
    fn empty_window_stays_silent_while_the_deadline_is_pending() {
        let (provider, env) = provider();
        provider.on_start(20_000);
        provider.on_location_not_known();
        assert_eq!(env.reported(), vec![], "one empty window is not yet news");
        assert_eq!(
            env.listening(),
            Some((ListenMode::Passive, MINIMUM_PASSIVE_LISTENING_DURATION_MS)),
            "a fresh not-known outcome replans passively"
        );
    }

    #[test]
    fn stale_timeout_tokens_are_ignored() {
        let (provider, env) = provider();
        provider.on_start(1_000);
        provider.on_timeout("init:1000@99999");
        assert_eq!(env.reported(), vec![]);
    }

    #[test]
    fn one_suggestion_per_location_token() {
        let (provider, env) = provider();
        env.set_zones(1.0, 1.0, &["Europe/London"]);
        env.set_zones(2.0, 2.0, &["Europe/Paris"]);

        provider.on_start(20_000);
        provider.on_location_known(1.0, 1.0);
        provider.on_location_known(1.0, 1.0);
        assert_eq!(env.reported().len(), 1, "same cell reported once");

        provider.on_location_known(2.0, 2.0);
        let reported = env.reported();
        assert_eq!(reported.len(), 2);
        assert!(matches!(
            &reported[1],
            ProviderResult::Suggestion { zone_ids, .. }
                if zone_ids == &["Europe/Paris".to_owned()]
        ));
    }

    #[test]
    fn nothing_is_delivered_after_stop() {
        let (provider, env) = provider();
        env.set_zones(1.0, 1.0, &["Europe/London"]);
        provider.on_start(20_000);
        let token = env.init_token();
        provider.on_stop();

        assert_eq!(provider.mode_kind(), ModeKind::Stopped);
        assert_eq!(env.listening(), None, "stop cancels the subscription");
        assert!(env.inner.lock().unwrap().timeouts[0].cancelled);

        provider.on_location_known(1.0, 1.0);
        provider.on_location_not_known();
        provider.on_timeout(&token);
        assert_eq!(env.reported(), vec![]);
    }

    #[test]
    fn restarting_forgets_the_previous_runs_tokens() {
        let (provider, env) = provider();
        env.set_zones(1.0, 1.0, &["Europe/London"]);

        provider.on_start(20_000);
        provider.on_location_known(1.0, 1.0);
        provider.on_stop();

        provider.on_start(20_000);
        provider.on_location_known(1.0, 1.0);
        assert_eq!(
            env.reported().len(),
            2,
            "token suppression is per run, not per lifetime"
        );
    }

    #[test]
    fn destroy_while_started_reports_uncertain() {
        let (provider, env) = provider();
        provider.on_start(20_000);
        provider.on_destroy();
        assert_eq!(provider.mode_kind(), ModeKind::Destroyed);
        assert_eq!(env.reported(), vec![ProviderResult::Uncertain]);
        assert_eq!(env.listening(), None);

        // Terminal: later callbacks are dropped.
        provider.on_location_known(1.0, 1.0);
        assert_eq!(env.reported(), vec![ProviderResult::Uncertain]);
    }

    #[test]
    fn destroy_while_stopped_reports_nothing() {
        let (provider, env) = provider();
        provider.on_destroy();
        assert_eq!(provider.mode_kind(), ModeKind::Destroyed);
        assert_eq!(env.reported(), vec![]);
    }

    #[test]
    fn unreadable_geo_data_is_terminal() {
        let (provider, env) = provider();
        env.inner.lock().unwrap().fail_geo_open = true;

        provider.on_start(20_000);
        provider.on_location_known(1.0, 1.0);

        assert_eq!(provider.mode_kind(), ModeKind::Failed);
        let reported = env.reported();
        assert_eq!(reported.len(), 1);
        assert!(matches!(
            &reported[0],
            ProviderResult::PermanentFailure { cause } if cause.contains("geo")
        ));
        assert_eq!(env.listening(), None);

        // Stragglers after the failure are dropped silently.
        provider.on_location_not_known();
        provider.on_passive_ended(1_000);
        assert_eq!(env.reported().len(), 1);
    }

    #[test]
    fn early_fix_refunds_unused_active_time() {
        let (provider, env) = provider();
        env.set_zones(1.0, 1.0, &["Europe/London"]);

        provider.on_start(20_000);
        env.advance(1_000);
        // The 5s window returns after 1s; 4s goes back into the budget.
        provider.on_location_known(1.0, 1.0);
        assert_eq!(provider.mode_kind(), ModeKind::Started(ListenMode::Passive));

        // Once the known fix goes stale, the next plan spends the refund
        // plus the passive accrual: 4000 + 120000/90 = 5333.
        env.advance(16 * 60 * 1_000);
        provider.on_passive_ended(MINIMUM_PASSIVE_LISTENING_DURATION_MS);
        assert_eq!(env.listening(), Some((ListenMode::Active, 5_333)));
    }

    #[test]
    fn active_windows_never_exceed_the_maximum() {
        let (provider, env) = provider();
        provider.on_start(20_000);
        // Accrue far more credit than one window may spend.
        for _ in 0..40 {
            provider.on_location_not_known();
            env.advance(2 * 60 * 1_000);
            provider.on_passive_ended(MINIMUM_PASSIVE_LISTENING_DURATION_MS);
        }
        if let Some((ListenMode::Active, duration)) = env.listening() {
            assert!(duration <= MAXIMUM_ACTIVE_LISTENING_DURATION_MS);
        }
    }

    #[test]
    fn wake_lock_is_balanced() {
        let (provider, env) = provider();
        env.set_zones(1.0, 1.0, &["Europe/London"]);
        provider.on_start(20_000);
        provider.on_location_known(1.0, 1.0);
        provider.on_location_not_known();
        provider.on_stop();
        let inner = env.inner.lock().unwrap();
        assert_eq!(inner.wake_acquired, inner.wake_released);
        assert!(inner.wake_acquired > 0);
    }

    #[test]
    fn dump_shows_mode_and_history() {
        let (provider, _env) = provider();
        provider.on_start(20_000);
        let dump = provider.dump();
        assert!(dump.contains("mode=started(active)"), "{dump}");
        assert!(dump.contains("history:"), "{dump}");
    }
}
