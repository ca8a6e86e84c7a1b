//! Per-key state for a dual-role key

use std::time::{Duration, Instant};

/// Tracks whether one dual-role key is physically held and when it went down.
///
/// A session runs from the down event to the matching up event; repeats in
/// between keep it open. Keyboards never send two downs for the same key
/// without an up in between, so sessions never overlap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    down_or_held: bool,
    last_press: Option<Instant>,
}

impl ModifierState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key went down: open a session and remember when.
    pub fn on_down(&mut self, now: Instant) {
        self.down_or_held = true;
        self.last_press = Some(now);
    }

    /// Autorepeat: the key is still held. The press time is left alone.
    pub fn on_repeat(&mut self) {
        self.down_or_held = true;
    }

    /// Key went up: close the session and return how long it was held.
    ///
    /// If no down was ever seen (the key was already held when the device was
    /// grabbed) the duration is `Duration::MAX`, so the release always counts
    /// as a hold.
    pub fn on_up(&mut self, now: Instant) -> Duration {
        self.down_or_held = false;
        match self.last_press {
            Some(pressed) => now.saturating_duration_since(pressed),
            None => Duration::MAX,
        }
    }

    pub fn is_active(&self) -> bool {
        self.down_or_held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_inactive() {
        assert!(!ModifierState::new().is_active());
    }

    #[test]
    fn test_down_then_up_reports_held_duration() {
        let start = Instant::now();
        let mut state = ModifierState::new();

        state.on_down(start);
        assert!(state.is_active());

        let held = state.on_up(start + Duration::from_millis(120));
        assert_eq!(held, Duration::from_millis(120));
        assert!(!state.is_active());
    }

    #[test]
    fn test_repeat_keeps_original_press_time() {
        let start = Instant::now();
        let mut state = ModifierState::new();

        state.on_down(start);
        state.on_repeat();
        state.on_repeat();
        assert!(state.is_active());

        let held = state.on_up(start + Duration::from_millis(600));
        assert_eq!(held, Duration::from_millis(600));
    }

    #[test]
    fn test_repeat_without_down_marks_active() {
        let mut state = ModifierState::new();
        state.on_repeat();
        assert!(state.is_active());
        assert_eq!(state.on_up(Instant::now()), Duration::MAX);
    }

    #[test]
    fn test_up_before_press_time_saturates() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut state = ModifierState::new();
        state.on_down(start);
        assert_eq!(state.on_up(start - Duration::from_millis(5)), Duration::ZERO);
    }
}
