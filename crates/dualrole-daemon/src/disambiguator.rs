//! Tap/hold disambiguation for two dual-role keys
//!
//! Each dual-role key (`mod1`, `mod2`) sends itself when tapped and its
//! secondary function (e.g. `LeftCtrl`) when held while another key is pressed.
//! Nothing is emitted when a dual-role key goes down: the decision is deferred
//! until either another key arrives while it is held, or it is released.
//!
//! ## Other keys
//!
//! | transition    | dual-role key held?   | output                               | combination flag |
//! |---------------|-----------------------|--------------------------------------|------------------|
//! | down / repeat | yes (mod1 checked first) | `secondary` at same state, then key | set              |
//! | down / repeat | no                    | key                                  | cleared          |
//! | up            | either                | key                                  | unchanged        |
//!
//! ## Releasing a dual-role key `M` (the opposite key is `O`)
//!
//! Evaluated in this order, `elapsed` is the time since `M` went down:
//!
//! 1. `O` held, `elapsed < max_delay`: `M` was tapped under `O`. Emit
//!    `O.secondary` down, `M` down, `M` up, `O.secondary` up; set the flag.
//! 2. `O` held, `elapsed >= max_delay`: emit `M.secondary` up.
//! 3. Flag set: a combination fired while `M` was held. Emit `M.secondary` up.
//! 4. `elapsed < max_delay`: standalone tap. Emit `M` down, `M` up.
//! 5. Otherwise: held alone past the threshold. Emit `M.secondary` up.
//!
//! The closing `M.secondary` ups in 2 and 5 are sent even when no matching down
//! was emitted; an extra up is a no-op for the output device.
//!
//! Every event that produces output ends with exactly one synchronize. A
//! dual-role press or repeat produces no output and no synchronize.

use std::io;
use std::time::Duration;

use dualrole_config::{key_name, DualRoleConfig, DualRoleKey};
use evdev::{InputEvent, Key};

use crate::clock::{Clock, MonotonicClock};
use crate::modifier::ModifierState;

/// Key event values as reported by evdev.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Up,
    Down,
    Repeat,
}

impl KeyState {
    pub fn value(self) -> i32 {
        match self {
            KeyState::Up => 0,
            KeyState::Down => 1,
            KeyState::Repeat => 2,
        }
    }
}

impl TryFrom<i32> for KeyState {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyState::Up),
            1 => Ok(KeyState::Down),
            2 => Ok(KeyState::Repeat),
            other => Err(other),
        }
    }
}

/// Destination for synthesized events.
///
/// Events are buffered until [`EventSink::synchronize`], which delivers the
/// batch to downstream consumers as one atomic report.
pub trait EventSink {
    /// Queue a key transition.
    fn emit(&mut self, key: Key, state: KeyState) -> io::Result<()>;

    /// Queue an event that is passed through untouched.
    fn forward(&mut self, event: InputEvent) -> io::Result<()>;

    /// Deliver everything queued since the last synchronize.
    fn synchronize(&mut self) -> io::Result<()>;
}

/// Which of the two dual-role keys an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Mod1,
    Mod2,
}

impl Slot {
    fn opposite(self) -> Self {
        match self {
            Slot::Mod1 => Slot::Mod2,
            Slot::Mod2 => Slot::Mod1,
        }
    }
}

/// Outcome of releasing a dual-role key, see the module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Quick tap while the opposite key is held
    TapUnderOpposite,
    /// Long hold that overlapped the opposite key
    OverlapHold,
    /// A combination already fired during this hold
    CloseCombination,
    /// Quick tap with nothing else going on
    Tap,
    /// Held alone past the threshold
    HoldAlone,
}

impl Release {
    /// Pick the release case. First match wins.
    pub fn classify(
        opposite_held: bool,
        combination: bool,
        elapsed: Duration,
        max_delay: Duration,
    ) -> Self {
        let quick = elapsed < max_delay;
        match (opposite_held, combination, quick) {
            (true, _, true) => Release::TapUnderOpposite,
            (true, _, false) => Release::OverlapHold,
            (false, true, _) => Release::CloseCombination,
            (false, false, true) => Release::Tap,
            (false, false, false) => Release::HoldAlone,
        }
    }
}

/// Consumes raw key events and decides tap versus hold for both dual-role keys.
///
/// All state lives here and is only touched from [`Disambiguator::handle`].
pub struct Disambiguator<C = MonotonicClock> {
    config: DualRoleConfig,
    mod1: ModifierState,
    mod2: ModifierState,
    /// Whether the latest output came from a held-key combination
    combination: bool,
    clock: C,
}

impl Disambiguator<MonotonicClock> {
    pub fn new(config: DualRoleConfig) -> Self {
        Self::with_clock(config, MonotonicClock)
    }
}

impl<C: Clock> Disambiguator<C> {
    pub fn with_clock(config: DualRoleConfig, clock: C) -> Self {
        Self {
            config,
            mod1: ModifierState::new(),
            mod2: ModifierState::new(),
            combination: false,
            clock,
        }
    }

    #[cfg(test)]
    pub fn last_emission_was_combination(&self) -> bool {
        self.combination
    }

    /// Whether `key` is one of the two configured dual-role keys.
    pub fn is_dual_role(&self, key: Key) -> bool {
        self.slot_of(key).is_some()
    }

    #[cfg(test)]
    pub fn is_active(&self, slot: Slot) -> bool {
        self.state(slot).is_active()
    }

    /// Process one raw key transition.
    ///
    /// Any output is followed by a synchronize before this returns.
    pub fn handle<S: EventSink>(
        &mut self,
        key: Key,
        state: KeyState,
        sink: &mut S,
    ) -> io::Result<()> {
        match self.slot_of(key) {
            Some(slot) => self.handle_dual_role(slot, state, sink),
            None => self.handle_other(key, state, sink),
        }
    }

    fn slot_of(&self, key: Key) -> Option<Slot> {
        if key == self.config.mod1.key {
            Some(Slot::Mod1)
        } else if key == self.config.mod2.key {
            Some(Slot::Mod2)
        } else {
            None
        }
    }

    fn binding(&self, slot: Slot) -> DualRoleKey {
        match slot {
            Slot::Mod1 => self.config.mod1,
            Slot::Mod2 => self.config.mod2,
        }
    }

    fn state(&self, slot: Slot) -> &ModifierState {
        match slot {
            Slot::Mod1 => &self.mod1,
            Slot::Mod2 => &self.mod2,
        }
    }

    fn state_mut(&mut self, slot: Slot) -> &mut ModifierState {
        match slot {
            Slot::Mod1 => &mut self.mod1,
            Slot::Mod2 => &mut self.mod2,
        }
    }

    /// The held dual-role key that turns another key into a combination.
    ///
    /// mod1 wins when both are held; chords of both plus a third key are not
    /// supported.
    pub fn active_modifier(&self) -> Option<Slot> {
        if self.mod1.is_active() {
            Some(Slot::Mod1)
        } else if self.mod2.is_active() {
            Some(Slot::Mod2)
        } else {
            None
        }
    }

    fn handle_dual_role<S: EventSink>(
        &mut self,
        slot: Slot,
        state: KeyState,
        sink: &mut S,
    ) -> io::Result<()> {
        match state {
            KeyState::Down => {
                let now = self.clock.now();
                self.state_mut(slot).on_down(now);
                self.combination = false;
                tracing::trace!(?slot, "dual-role key down, deferring");
                Ok(())
            }
            KeyState::Repeat => {
                self.state_mut(slot).on_repeat();
                self.combination = false;
                Ok(())
            }
            KeyState::Up => self.release(slot, sink),
        }
    }

    fn release<S: EventSink>(&mut self, slot: Slot, sink: &mut S) -> io::Result<()> {
        let now = self.clock.now();
        let elapsed = self.state_mut(slot).on_up(now);
        let opposite = slot.opposite();
        let case = Release::classify(
            self.state(opposite).is_active(),
            self.combination,
            elapsed,
            self.config.max_delay,
        );

        let own = self.binding(slot);
        tracing::debug!(
            ?slot,
            ?case,
            ?elapsed,
            "released {}",
            key_name(own.key)
        );

        match case {
            Release::TapUnderOpposite => {
                let shift = self.binding(opposite).secondary;
                sink.emit(shift, KeyState::Down)?;
                sink.emit(own.key, KeyState::Down)?;
                sink.emit(own.key, KeyState::Up)?;
                sink.emit(shift, KeyState::Up)?;
                self.combination = true;
            }
            Release::OverlapHold | Release::CloseCombination | Release::HoldAlone => {
                sink.emit(own.secondary, KeyState::Up)?;
            }
            Release::Tap => {
                sink.emit(own.key, KeyState::Down)?;
                sink.emit(own.key, KeyState::Up)?;
            }
        }
        sink.synchronize()
    }

    fn handle_other<S: EventSink>(
        &mut self,
        key: Key,
        state: KeyState,
        sink: &mut S,
    ) -> io::Result<()> {
        if state != KeyState::Up {
            match self.active_modifier() {
                Some(slot) => {
                    let secondary = self.binding(slot).secondary;
                    tracing::trace!(
                        ?slot,
                        "combination {}+{}",
                        key_name(secondary),
                        key_name(key)
                    );
                    sink.emit(secondary, state)?;
                    self.combination = true;
                }
                None => {
                    self.combination = false;
                }
            }
        }
        sink.emit(key, state)?;
        sink.synchronize()
    }
}
