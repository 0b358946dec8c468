//! Cancellable deferred actions on the audio clock
//!
//! A timer is a plain value: an action plus the audio-clock deadline at which
//! it becomes due. It never fires by itself; the owner polls it from its tick
//! and cancels it before any transition that should preempt it.

#[derive(Debug, Clone, PartialEq)]
struct Deadline<A> {
    action: A,
    due: f64,
}

/// Holds at most one pending action
#[derive(Debug, Clone, PartialEq)]
pub struct TimerSlot<A> {
    pending: Option<Deadline<A>>,
}

impl<A> Default for TimerSlot<A> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<A> TimerSlot<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `action` to become due at `due`, replacing anything pending
    pub fn arm(&mut self, action: A, due: f64) {
        self.pending = Some(Deadline { action, due });
    }

    /// Disarm and return the pending action, if any
    pub fn cancel(&mut self) -> Option<A> {
        self.pending.take().map(|d| d.action)
    }

    /// Take the action if it is due at `now`
    pub fn poll(&mut self, now: f64) -> Option<A> {
        let is_due = self.pending.as_ref().is_some_and(|d| now >= d.due);
        if is_due {
            self.cancel()
        } else {
            None
        }
    }

    pub fn pending(&self) -> Option<&A> {
        self.pending.as_ref().map(|d| &d.action)
    }

    pub fn due(&self) -> Option<f64> {
        self.pending.as_ref().map(|d| d.due)
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_when_due() {
        let mut timer = TimerSlot::new();
        timer.arm("advance", 5.0);

        assert_eq!(timer.poll(4.99), None);
        assert!(timer.is_armed());
        assert_eq!(timer.poll(5.0), Some("advance"));
        assert_eq!(timer.poll(6.0), None);
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut timer = TimerSlot::new();
        timer.arm(1, 2.0);
        assert_eq!(timer.cancel(), Some(1));
        assert_eq!(timer.poll(10.0), None);
        assert_eq!(timer.cancel(), None);
    }

    #[test]
    fn test_rearm_replaces() {
        let mut timer = TimerSlot::new();
        timer.arm(1, 2.0);
        timer.arm(2, 3.0);
        assert_eq!(timer.pending(), Some(&2));
        assert_eq!(timer.due(), Some(3.0));
        assert_eq!(timer.poll(2.5), None);
        assert_eq!(timer.poll(3.0), Some(2));
    }
}
