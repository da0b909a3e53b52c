/// Lifecycle phase of a paged audit view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No load in flight; rows reflect the last completed query.
    #[default]
    Idle,
    /// A query is in flight.
    Loading,
    /// The last query or delete failed; the message field says why.
    Error,
}

/// The Idle/Loading/Error machine plus the coalescing flag for reloads
/// requested while another is in flight.
///
/// Invariant: at most one load runs at a time. Reload triggers that arrive
/// during a load are merged into a single pending follow-up, however many
/// there were.
#[derive(Debug, Default)]
pub(crate) struct LoadState {
    phase: Phase,
    reload_pending: bool,
}

impl LoadState {
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    /// Request a load. Returns `true` when the caller should run it now;
    /// `false` when one is already in flight and the request was recorded
    /// for a single follow-up.
    pub(crate) fn begin(&mut self) -> bool {
        if self.phase == Phase::Loading {
            self.reload_pending = true;
            return false;
        }
        self.phase = Phase::Loading;
        self.reload_pending = false;
        true
    }

    /// Complete a successful load. Returns `true` when a coalesced
    /// follow-up must run immediately; the machine then stays in `Loading`.
    pub(crate) fn finish_success(&mut self) -> bool {
        if self.reload_pending {
            self.reload_pending = false;
            return true;
        }
        self.phase = Phase::Idle;
        false
    }

    /// Record a failure. Any pending follow-up is dropped: retries are
    /// user-initiated, never automatic.
    pub(crate) fn fail(&mut self) {
        self.phase = Phase::Error;
        self.reload_pending = false;
    }

    /// Complete a cancelled load. The screen is being abandoned, so any
    /// pending follow-up is dropped too.
    pub(crate) fn finish_cancelled(&mut self) {
        self.phase = Phase::Idle;
        self.reload_pending = false;
    }

    /// Return to the initial idle state.
    pub(crate) fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.reload_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::{LoadState, Phase};

    #[test]
    fn begin_from_idle_starts() {
        let mut state = LoadState::default();
        assert!(state.begin());
        assert_eq!(state.phase(), Phase::Loading);
    }

    #[test]
    fn begin_while_loading_defers() {
        let mut state = LoadState::default();
        assert!(state.begin());
        assert!(!state.begin());
        assert!(!state.begin());
        // Any number of deferred requests collapse into one follow-up.
        assert!(state.finish_success());
        assert_eq!(state.phase(), Phase::Loading);
        assert!(!state.finish_success());
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn success_without_pending_goes_idle() {
        let mut state = LoadState::default();
        assert!(state.begin());
        assert!(!state.finish_success());
        assert_eq!(state.phase(), Phase::Idle);
    }

    #[test]
    fn failure_drops_pending() {
        let mut state = LoadState::default();
        assert!(state.begin());
        assert!(!state.begin());
        state.fail();
        assert_eq!(state.phase(), Phase::Error);
        // The dropped follow-up must not resurface on the next cycle.
        assert!(state.begin());
        assert!(!state.finish_success());
    }

    #[test]
    fn cancellation_drops_pending_and_goes_idle() {
        let mut state = LoadState::default();
        assert!(state.begin());
        assert!(!state.begin());
        state.finish_cancelled();
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.begin());
        assert!(!state.finish_success());
    }

    #[test]
    fn begin_from_error_starts() {
        let mut state = LoadState::default();
        assert!(state.begin());
        state.fail();
        assert!(state.begin());
        assert_eq!(state.phase(), Phase::Loading);
    }
}
