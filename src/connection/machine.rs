//! Pure connection state machine.
//!
//! The machine consumes [`Signal`]s (what happened to the socket or the retry
//! timer) and answers with [`Action`]s (what the driver must do). It owns no
//! socket and no timer, so every transition can be exercised with synthetic
//! signals.
//!
//! Invariant: at most one retry timer is armed at any time. `ArmRetry` is only
//! emitted when the machine believes no timer is armed, and every successful
//! open or dispose emits `CancelRetry` for an armed timer.

use super::ConnectionState;

/// Input to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Initial connect request (or an explicit reopen by the owner).
    Connect,
    /// The handshake completed.
    Opened,
    /// The socket closed, or a dial attempt failed.
    Closed,
    /// The socket reported an error; treated as a forced close.
    Errored,
    /// The retry timer fired.
    RetryTick,
    /// Tear everything down.
    Dispose,
}

/// Output of the machine, executed by the driver in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start a new dial, abandoning any dial still in flight.
    Dial,
    /// Drop the current socket, if any.
    CloseSocket,
    /// Start the fixed-period retry timer.
    ArmRetry,
    /// Stop the retry timer.
    CancelRetry,
    /// Publish a new indicator state.
    Indicate(ConnectionState),
    /// Stop the driver.
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ConnectionMachine {
    state: ConnectionState,
    retry_armed: bool,
    disposed: bool,
}

impl Default for ConnectionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionMachine {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Connecting,
            retry_armed: false,
            disposed: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry_armed(&self) -> bool {
        self.retry_armed
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Apply one signal and return the actions it requires.
    pub fn handle(&mut self, signal: Signal) -> Vec<Action> {
        if self.disposed {
            return Vec::new();
        }

        match signal {
            Signal::Connect => {
                if self.state == ConnectionState::Open {
                    return Vec::new();
                }
                let mut actions = vec![Action::Dial];
                actions.extend(self.enter(ConnectionState::Connecting));
                actions
            }
            Signal::RetryTick => {
                if !self.retry_armed || self.state == ConnectionState::Open {
                    return Vec::new();
                }
                let mut actions = vec![Action::Dial];
                actions.extend(self.enter(ConnectionState::Connecting));
                actions
            }
            Signal::Opened => {
                let mut actions = Vec::new();
                if self.retry_armed {
                    self.retry_armed = false;
                    actions.push(Action::CancelRetry);
                }
                actions.extend(self.enter(ConnectionState::Open));
                actions
            }
            Signal::Errored => {
                let mut actions = vec![Action::CloseSocket];
                actions.extend(self.on_closed());
                actions
            }
            Signal::Closed => self.on_closed(),
            Signal::Dispose => {
                self.disposed = true;
                let mut actions = Vec::new();
                if self.retry_armed {
                    self.retry_armed = false;
                    actions.push(Action::CancelRetry);
                }
                actions.push(Action::CloseSocket);
                actions.push(Action::Shutdown);
                actions
            }
        }
    }

    fn on_closed(&mut self) -> Vec<Action> {
        let mut actions: Vec<Action> = self.enter(ConnectionState::ClosedRetrying).into_iter().collect();
        if !self.retry_armed {
            self.retry_armed = true;
            actions.push(Action::ArmRetry);
        }
        actions
    }

    fn enter(&mut self, next: ConnectionState) -> Option<Action> {
        if self.state == next {
            return None;
        }
        self.state = next;
        Some(Action::Indicate(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(actions: &[Action], wanted: Action) -> usize {
        actions.iter().filter(|a| **a == wanted).count()
    }

    #[test]
    fn connect_dials() {
        let mut m = ConnectionMachine::new();
        assert_eq!(m.handle(Signal::Connect), vec![Action::Dial]);
        assert_eq!(m.state(), ConnectionState::Connecting);
    }

    #[test]
    fn open_indicates_connected() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        assert_eq!(
            m.handle(Signal::Opened),
            vec![Action::Indicate(ConnectionState::Open)]
        );
    }

    #[test]
    fn close_arms_single_retry() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        m.handle(Signal::Opened);
        let a = m.handle(Signal::Closed);
        assert_eq!(
            a,
            vec![
                Action::Indicate(ConnectionState::ClosedRetrying),
                Action::ArmRetry
            ]
        );
        assert!(m.retry_armed());
        // A second close while armed must not arm another timer.
        assert_eq!(count(&m.handle(Signal::Closed), Action::ArmRetry), 0);
    }

    #[test]
    fn error_forces_close_then_retries() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        m.handle(Signal::Opened);
        let a = m.handle(Signal::Errored);
        assert_eq!(a[0], Action::CloseSocket);
        assert_eq!(count(&a, Action::ArmRetry), 1);
        // The socket's own close event follows the error; no second timer.
        assert_eq!(count(&m.handle(Signal::Closed), Action::ArmRetry), 0);
    }

    #[test]
    fn failed_first_dial_indicates_retrying_and_arms_timer() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        assert_eq!(
            m.handle(Signal::Closed),
            vec![
                Action::Indicate(ConnectionState::ClosedRetrying),
                Action::ArmRetry
            ]
        );
        assert_eq!(m.state(), ConnectionState::ClosedRetrying);
        assert!(m.retry_armed());
    }

    #[test]
    fn retry_tick_dials_while_armed() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        m.handle(Signal::Closed);
        let a = m.handle(Signal::RetryTick);
        assert_eq!(a, vec![Action::Dial, Action::Indicate(ConnectionState::Connecting)]);
        assert!(m.retry_armed(), "timer keeps running until an open");
    }

    #[test]
    fn failed_retry_keeps_single_timer() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        let mut arms = count(&m.handle(Signal::Closed), Action::ArmRetry);
        for _ in 0..10 {
            arms += count(&m.handle(Signal::RetryTick), Action::ArmRetry);
            arms += count(&m.handle(Signal::Closed), Action::ArmRetry);
        }
        assert_eq!(arms, 1);
    }

    #[test]
    fn open_cancels_retry() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        m.handle(Signal::Opened);
        m.handle(Signal::Closed);
        m.handle(Signal::RetryTick);
        let a = m.handle(Signal::Opened);
        assert_eq!(
            a,
            vec![Action::CancelRetry, Action::Indicate(ConnectionState::Open)]
        );
        assert!(!m.retry_armed());
    }

    #[test]
    fn stray_tick_after_open_is_ignored() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        m.handle(Signal::Closed);
        m.handle(Signal::RetryTick);
        m.handle(Signal::Opened);
        assert!(m.handle(Signal::RetryTick).is_empty());
        assert_eq!(m.state(), ConnectionState::Open);
    }

    #[test]
    fn connect_while_open_is_noop() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        m.handle(Signal::Opened);
        assert!(m.handle(Signal::Connect).is_empty());
    }

    #[test]
    fn dispose_cancels_timer_and_silences_machine() {
        let mut m = ConnectionMachine::new();
        m.handle(Signal::Connect);
        m.handle(Signal::Closed);
        let a = m.handle(Signal::Dispose);
        assert_eq!(
            a,
            vec![Action::CancelRetry, Action::CloseSocket, Action::Shutdown]
        );
        assert!(m.is_disposed());
        assert!(m.handle(Signal::Closed).is_empty());
        assert!(m.handle(Signal::RetryTick).is_empty());
        assert!(m.handle(Signal::Connect).is_empty());
    }
}
