// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-key signal rate limiting with a trailing edge.
//
// The first call for a key opens a window and is let through immediately.
// Further calls inside the window are swallowed, but the arguments of the
// most recent one are kept and delivered once when the window closes.  That
// trailing delivery opens a fresh window, so a key never emits more than
// once per window.
//
// The limiter owns no timer.  Its owner asks for `next_deadline` and calls
// `take_due` when that instant passes, which keeps trailing fires on the
// owner's processing context and in order with ordinary events.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::debug;

/// Throttling state for a single key.
#[derive(Debug, Clone)]
struct Slot<A> {
    /// When the current window opened.
    opened_at: Instant,
    /// Arguments of the latest suppressed call, if any.
    pending: Option<A>,
    /// Number of calls swallowed in the current window.
    suppressed: u32,
}

/// Leading + trailing edge rate limiter keyed by `K`, carrying arguments `A`.
pub struct RateLimiter<K, A> {
    window: Duration,
    slots: HashMap<K, Slot<A>>,
}

impl<K, A> RateLimiter<K, A>
where
    K: Eq + Hash + Clone + Debug,
{
    /// A zero `window` disables throttling: every call emits immediately.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slots: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_throttling(&self) -> bool {
        !self.window.is_zero()
    }

    /// Register a call for `key`.
    ///
    /// Returns `true` if the caller should emit now (leading edge).  Returns
    /// `false` if the call was absorbed; `args` then replaces whatever was
    /// pending and will come back out of [`take_due`](Self::take_due).
    ///
    /// Owners are expected to call `take_due` before this once a deadline has
    /// passed.  If they have not, a trailing fire still owed for `key` absorbs
    /// the call and stays due, so it is never lost.
    pub fn should_emit_now(&mut self, key: &K, args: A, now: Instant) -> bool {
        if !self.is_throttling() {
            return true;
        }

        match self.slots.get_mut(key) {
            Some(slot) if now < slot.opened_at + self.window || slot.pending.is_some() => {
                slot.pending = Some(args);
                slot.suppressed += 1;
                debug!(key = ?key, suppressed = slot.suppressed, "signal suppressed");
                false
            }
            _ => {
                self.slots.insert(
                    key.clone(),
                    Slot {
                        opened_at: now,
                        pending: None,
                        suppressed: 0,
                    },
                );
                true
            }
        }
    }

    /// Earliest instant at which a trailing fire is owed.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.slots
            .values()
            .filter(|slot| slot.pending.is_some())
            .map(|slot| slot.opened_at + self.window)
            .min()
    }

    /// Collect every trailing fire whose window has closed by `now`, oldest
    /// deadline first, and forget keys whose window closed quietly.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, A)> {
        let window = self.window;
        let mut due: Vec<(Instant, K, A)> = Vec::new();

        self.slots.retain(|key, slot| {
            let deadline = slot.opened_at + window;
            if now < deadline {
                return true;
            }
            match slot.pending.take() {
                Some(args) => {
                    due.push((deadline, key.clone(), args));
                    slot.opened_at = now;
                    slot.suppressed = 0;
                    true
                }
                None => false,
            }
        });

        due.sort_by_key(|(deadline, _, _)| *deadline);
        due.into_iter().map(|(_, key, args)| (key, args)).collect()
    }

    /// Drop the window (and any owed trailing fire) for one key.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.slots.remove(key).is_some()
    }

    /// Drop every window.  Nothing armed before this call will fire.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Number of keys with a trailing fire owed.
    pub fn pending_count(&self) -> usize {
        self.slots.values().filter(|s| s.pending.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    fn limiter() -> RateLimiter<String, u32> {
        RateLimiter::new(WINDOW)
    }

    #[test]
    fn single_call_fires_once() {
        let mut rl = limiter();
        let t0 = Instant::now();
        assert!(rl.should_emit_now(&"p1".into(), 1, t0));
        assert_eq!(rl.next_deadline(), None);
        assert!(rl.take_due(t0 + WINDOW).is_empty());
        assert_eq!(rl.pending_count(), 0);
    }

    #[test]
    fn burst_yields_leading_and_latest_trailing() {
        let mut rl = limiter();
        let key = "p1".to_string();
        let t0 = Instant::now();

        let mut emitted = 0;
        for i in 0..5u32 {
            if rl.should_emit_now(&key, i, t0 + Duration::from_millis(u64::from(i) * 10)) {
                emitted += 1;
            }
        }
        assert_eq!(emitted, 1);
        assert_eq!(rl.next_deadline(), Some(t0 + WINDOW));

        // Not yet.
        assert!(rl.take_due(t0 + Duration::from_millis(499)).is_empty());

        let fired = rl.take_due(t0 + WINDOW);
        assert_eq!(fired, vec![(key.clone(), 4)]);

        // Window closes quietly after the trailing fire.
        assert!(rl.take_due(t0 + WINDOW * 2).is_empty());
        assert_eq!(rl.next_deadline(), None);
    }

    #[test]
    fn keys_are_independent() {
        let mut rl = limiter();
        let t0 = Instant::now();
        assert!(rl.should_emit_now(&"p1".into(), 1, t0));
        assert!(rl.should_emit_now(&"p2".into(), 1, t0));
        assert!(!rl.should_emit_now(&"p1".into(), 2, t0));

        let fired = rl.take_due(t0 + WINDOW);
        assert_eq!(fired, vec![("p1".to_string(), 2)]);
    }

    #[test]
    fn trailing_fire_opens_new_window() {
        let mut rl = limiter();
        let key = "p1".to_string();
        let t0 = Instant::now();
        assert!(rl.should_emit_now(&key, 1, t0));
        assert!(!rl.should_emit_now(&key, 2, t0));
        assert_eq!(rl.take_due(t0 + WINDOW).len(), 1);

        // Right after the trailing fire we are inside a new window.
        assert!(!rl.should_emit_now(&key, 3, t0 + WINDOW + Duration::from_millis(1)));
        assert_eq!(rl.take_due(t0 + WINDOW * 2), vec![(key, 3)]);
    }

    #[test]
    fn uncollected_trailing_fire_survives_late_call() {
        let mut rl = limiter();
        let key = "p1".to_string();
        let t0 = Instant::now();
        assert!(rl.should_emit_now(&key, 1, t0));
        assert!(!rl.should_emit_now(&key, 2, t0));

        // Deadline passed but nobody collected the trailing fire yet.
        assert!(!rl.should_emit_now(&key, 3, t0 + WINDOW * 3));
        assert_eq!(rl.take_due(t0 + WINDOW * 3), vec![(key.clone(), 3)]);
        assert!(rl.take_due(t0 + WINDOW * 5).is_empty());
        assert!(rl.should_emit_now(&key, 4, t0 + WINDOW * 5));
    }

    #[test]
    fn zero_window_never_throttles() {
        let mut rl: RateLimiter<String, u32> = RateLimiter::new(Duration::ZERO);
        let t0 = Instant::now();
        for i in 0..3 {
            assert!(rl.should_emit_now(&"p1".into(), i, t0));
        }
        assert_eq!(rl.next_deadline(), None);
    }

    #[test]
    fn clear_discards_owed_fires() {
        let mut rl = limiter();
        let t0 = Instant::now();
        rl.should_emit_now(&"p1".into(), 1, t0);
        rl.should_emit_now(&"p1".into(), 2, t0);
        assert_eq!(rl.pending_count(), 1);

        rl.clear();
        assert!(rl.take_due(t0 + WINDOW).is_empty());
    }

    #[test]
    fn cancel_one_key() {
        let mut rl = limiter();
        let t0 = Instant::now();
        rl.should_emit_now(&"p1".into(), 1, t0);
        rl.should_emit_now(&"p1".into(), 2, t0);
        rl.should_emit_now(&"p2".into(), 1, t0);
        rl.should_emit_now(&"p2".into(), 2, t0);

        assert!(rl.cancel(&"p1".into()));
        assert_eq!(rl.take_due(t0 + WINDOW), vec![("p2".to_string(), 2)]);
    }
}
