//! Debounce gate for the query scheduler.
//!
//! Each trigger arms the gate and receives a ticket; a waiter holding the
//! latest ticket survives the quiet period, everyone else is cancelled the
//! moment a newer trigger arms the gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Notify;

/// Default quiet period before an armed trigger fires.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Upper bound on the configurable quiet period.
pub const MAX_DEBOUNCE_MS: u64 = 2000;

/// Debounce gate: arm, wait, cancel.
#[derive(Debug)]
pub struct DebounceGate {
    delay: Duration,
    ticket: AtomicU64,
    cancelled: Notify,
}

impl DebounceGate {
    /// Creates a gate with the given quiet period. A zero delay fires
    /// immediately (still subject to cancellation between arm and wait).
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay: delay.min(Duration::from_millis(MAX_DEBOUNCE_MS)),
            ticket: AtomicU64::new(0),
            cancelled: Notify::new(),
        }
    }

    /// Creates a gate with the default quiet period.
    #[must_use]
    pub fn with_default_delay() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }

    /// Arms the gate: cancels pending waiters and returns a new ticket.
    pub fn arm(&self) -> u64 {
        let ticket = self.ticket.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancelled.notify_waiters();
        ticket
    }

    /// Waits out the quiet period. Returns true when `ticket` is still the
    /// latest one, false when a newer arm superseded it.
    pub async fn wait(&self, ticket: u64) -> bool {
        if !self.delay.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(self.delay) => {}
                () = self.cancelled.notified() => return false,
            }
        }
        self.is_current(ticket)
    }

    /// Invalidates every outstanding ticket.
    pub fn cancel(&self) {
        self.ticket.fetch_add(1, Ordering::SeqCst);
        self.cancelled.notify_waiters();
    }

    /// Returns whether `ticket` is still the latest.
    #[must_use]
    pub fn is_current(&self, ticket: u64) -> bool {
        self.ticket.load(Ordering::SeqCst) == ticket
    }

    /// Returns the quiet period.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for DebounceGate {
    fn default() -> Self {
        Self::with_default_delay()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_arm_increments_ticket() {
        let gate = DebounceGate::new(Duration::from_millis(50));
        assert_eq!(gate.arm(), 1);
        assert_eq!(gate.arm(), 2);
        assert_eq!(gate.arm(), 3);
    }

    #[test]
    fn test_newer_arm_invalidates_older_ticket() {
        let gate = DebounceGate::new(Duration::from_millis(50));
        let first = gate.arm();
        assert!(gate.is_current(first));

        let second = gate.arm();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
    }

    #[test]
    fn test_cancel_invalidates_ticket() {
        let gate = DebounceGate::new(Duration::from_millis(50));
        let ticket = gate.arm();
        gate.cancel();
        assert!(!gate.is_current(ticket));
    }

    #[test]
    fn test_delay_clamped_to_max() {
        let gate = DebounceGate::new(Duration::from_secs(60));
        assert_eq!(gate.delay().as_millis(), u128::from(MAX_DEBOUNCE_MS));
    }

    #[tokio::test]
    async fn test_wait_fires_for_latest_ticket() {
        let gate = DebounceGate::new(Duration::from_millis(10));
        let ticket = gate.arm();
        assert!(gate.wait(ticket).await);
    }

    #[tokio::test]
    async fn test_wait_cancelled_by_newer_arm() {
        let gate = Arc::new(DebounceGate::new(Duration::from_millis(100)));
        let ticket = gate.arm();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.wait(ticket).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        gate.arm();

        assert!(!waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_zero_delay_fires_immediately() {
        let gate = DebounceGate::new(Duration::ZERO);
        let ticket = gate.arm();
        assert!(gate.wait(ticket).await);
    }
}
