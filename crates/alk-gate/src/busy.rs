//! Reentrancy guard for lock operations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use alk_types::{Clock, SystemClock};
use tracing::warn;

/// Whether a lock operation is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusyState {
    Idle,
    Busy { since: Instant },
}

/// Guards against overlapping lock operations.
///
/// The gate is global, not per path: while one request or release is in
/// flight every lock action is disabled. A gate left busy for longer than
/// the timeout is force-cleared the next time anyone asks, so an operation
/// that never reports back cannot disable locking for good.
///
/// [`is_busy`](Self::is_busy) may transition the gate, so all calls must
/// come from the same owner.
pub struct BusyGate {
    clock: Arc<dyn Clock>,
    timeout: Duration,
    state: BusyState,
    forced_clears: u64,
}

impl BusyGate {
    pub fn new(timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timeout,
            state: BusyState::Idle,
            forced_clears: 0,
        }
    }

    pub fn with_system_clock(timeout: Duration) -> Self {
        Self::new(timeout, Arc::new(SystemClock))
    }

    /// Enter the busy state. Does nothing if already busy; in particular the
    /// start time is not refreshed. Returns `true` if the gate transitioned.
    pub fn begin(&mut self) -> bool {
        if let BusyState::Busy { .. } = self.state {
            return false;
        }
        self.state = BusyState::Busy {
            since: self.clock.now(),
        };
        true
    }

    /// Return to idle, whatever the current state.
    pub fn end(&mut self) {
        self.state = BusyState::Idle;
    }

    /// Whether an operation is in flight. Clears the gate, with a warning,
    /// once it has been busy for longer than the timeout.
    pub fn is_busy(&mut self) -> bool {
        let BusyState::Busy { since } = self.state else {
            return false;
        };
        let elapsed = self.clock.now().saturating_duration_since(since);
        if elapsed > self.timeout {
            warn!(
                ?elapsed,
                timeout = ?self.timeout,
                "lock operation has been busy for too long, clearing the busy flag"
            );
            self.state = BusyState::Idle;
            self.forced_clears += 1;
            return false;
        }
        true
    }

    /// Current state without running the watchdog.
    pub fn state(&self) -> BusyState {
        self.state
    }

    pub fn busy_since(&self) -> Option<Instant> {
        match self.state {
            BusyState::Busy { since } => Some(since),
            BusyState::Idle => None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// How many times the watchdog has cleared the gate.
    pub fn forced_clears(&self) -> u64 {
        self.forced_clears
    }
}

impl std::fmt::Debug for BusyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusyGate")
            .field("timeout", &self.timeout)
            .field("state", &self.state)
            .field("forced_clears", &self.forced_clears)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alk_types::ManualClock;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn gate() -> (BusyGate, ManualClock) {
        let clock = ManualClock::new();
        (BusyGate::new(TIMEOUT, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn starts_idle() {
        let (mut gate, _) = gate();
        assert!(!gate.is_busy());
        assert_eq!(gate.state(), BusyState::Idle);
        assert_eq!(gate.busy_since(), None);
    }

    #[test]
    fn begin_then_end() {
        let (mut gate, _) = gate();
        assert!(gate.begin());
        assert!(gate.is_busy());
        gate.end();
        assert!(!gate.is_busy());
    }

    #[test]
    fn begin_does_not_stack_or_refresh() {
        let (mut gate, clock) = gate();
        gate.begin();
        let first = gate.busy_since();
        clock.advance(Duration::from_secs(3));
        assert!(!gate.begin());
        assert_eq!(gate.busy_since(), first);

        // A single end() clears it despite two begin() calls.
        gate.end();
        assert!(!gate.is_busy());
    }

    #[test]
    fn end_when_idle_is_harmless() {
        let (mut gate, _) = gate();
        gate.end();
        assert_eq!(gate.state(), BusyState::Idle);
    }

    #[test]
    fn stays_busy_up_to_the_timeout() {
        let (mut gate, clock) = gate();
        gate.begin();
        clock.advance(TIMEOUT);
        assert!(gate.is_busy());
        assert_eq!(gate.forced_clears(), 0);
    }

    #[test]
    fn auto_clears_after_timeout() {
        let (mut gate, clock) = gate();
        gate.begin();
        clock.advance(TIMEOUT + Duration::from_millis(1));
        assert!(!gate.is_busy());
        assert_eq!(gate.state(), BusyState::Idle);
        assert_eq!(gate.forced_clears(), 1);

        // Usable again afterwards.
        assert!(gate.begin());
        assert!(gate.is_busy());
    }

    #[test]
    fn state_does_not_run_watchdog() {
        let (mut gate, clock) = gate();
        gate.begin();
        clock.advance(TIMEOUT * 2);
        assert!(matches!(gate.state(), BusyState::Busy { .. }));
        assert!(!gate.is_busy());
    }
}
