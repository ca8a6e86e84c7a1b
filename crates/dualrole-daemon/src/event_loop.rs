//! The blocking read/dispatch loop
//!
//! Reads raw events one at a time from an exclusively grabbed device and hands
//! key events to the [`Disambiguator`]. All output for event N is written and
//! synchronized before event N+1 is read. The only suspension point is the
//! read itself, which is also where shutdown can interrupt the loop.

use std::future::Future;
use std::io;

use evdev::{InputEvent, InputEventKind};
use futures::{Stream, StreamExt};

use crate::clock::Clock;
use crate::disambiguator::{Disambiguator, EventSink, KeyState};

/// An ordered stream of raw events from the grabbed device.
pub trait EventSource: Stream<Item = io::Result<InputEvent>> + Unpin {}

impl<T> EventSource for T where T: Stream<Item = io::Result<InputEvent>> + Unpin {}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The source ended or its device went away
    StreamClosed,
    /// A shutdown was requested
    Shutdown,
}

/// Errno for a device that disappeared (unplugged) while being read.
const ENODEV: i32 = nix::errno::Errno::ENODEV as i32;

/// Run until the source closes or `shutdown` resolves.
///
/// Sink write failures are returned as errors; a vanished device ends the loop
/// normally with [`LoopExit::StreamClosed`].
pub async fn run<S, K, C, F>(
    source: &mut S,
    disambiguator: &mut Disambiguator<C>,
    sink: &mut K,
    shutdown: F,
) -> io::Result<LoopExit>
where
    S: EventSource,
    K: EventSink,
    C: Clock,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut dispatcher = Dispatcher::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = &mut shutdown => {
                tracing::info!("Shutdown requested, leaving event loop");
                return Ok(LoopExit::Shutdown);
            }
            next = source.next() => next,
        };

        match next {
            Some(Ok(event)) => dispatcher.dispatch(event, disambiguator, sink)?,
            Some(Err(e)) if e.raw_os_error() == Some(ENODEV) => {
                tracing::warn!("Input device disappeared: {}", e);
                return Ok(LoopExit::StreamClosed);
            }
            Some(Err(e)) => return Err(e),
            None => {
                tracing::info!("Input stream closed");
                return Ok(LoopExit::StreamClosed);
            }
        }
    }
}

/// Routes a single raw event, remembering whether forwarded non-key events
/// are waiting for a synchronize.
#[derive(Debug, Default)]
struct Dispatcher {
    forwarded_pending: bool,
}

impl Dispatcher {
    fn dispatch<K: EventSink, C: Clock>(
        &mut self,
        event: InputEvent,
        disambiguator: &mut Disambiguator<C>,
        sink: &mut K,
    ) -> io::Result<()> {
        match event.kind() {
            InputEventKind::Key(key) => match KeyState::try_from(event.value()) {
                Ok(state) => {
                    disambiguator.handle(key, state, sink)?;
                    // Anything forwarded earlier went out with that batch,
                    // unless the key was a deferred dual-role press.
                    if state == KeyState::Up || !disambiguator.is_dual_role(key) {
                        self.forwarded_pending = false;
                    }
                }
                Err(value) => {
                    tracing::warn!("Forwarding key event with unknown value {}", value);
                    sink.forward(event)?;
                    sink.synchronize()?;
                    self.forwarded_pending = false;
                }
            },
            // Output batches carry their own SYN_REPORT; the source's report
            // only matters for flushing passed-through events.
            InputEventKind::Synchronization(_) => {
                if self.forwarded_pending {
                    sink.synchronize()?;
                    self.forwarded_pending = false;
                }
            }
            // Scan codes describe the physical key, not what is emitted
            InputEventKind::Misc(_) => {}
            _ => {
                sink.forward(event)?;
                self.forwarded_pending = true;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ManualClock, Output, RecordingSink};
    use dualrole_config::{DualRoleConfig, DualRoleKey};
    use evdev::{EventType, Key, RelativeAxisType};
    use std::time::Duration;

    fn config() -> DualRoleConfig {
        DualRoleConfig {
            mod1: DualRoleKey {
                key: Key::KEY_CAPSLOCK,
                secondary: Key::KEY_LEFTCTRL,
            },
            mod2: DualRoleKey {
                key: Key::KEY_SPACE,
                secondary: Key::KEY_LEFTALT,
            },
            max_delay: Duration::from_millis(200),
        }
    }

    fn key_event(key: Key, value: i32) -> io::Result<InputEvent> {
        Ok(InputEvent::new(EventType::KEY, key.code(), value))
    }

    fn syn() -> io::Result<InputEvent> {
        Ok(InputEvent::new(EventType::SYNCHRONIZATION, 0, 0))
    }

    fn scan(code: i32) -> io::Result<InputEvent> {
        Ok(InputEvent::new(EventType::MISC, 4, code))
    }

    fn rel_x(delta: i32) -> io::Result<InputEvent> {
        Ok(InputEvent::new(
            EventType::RELATIVE,
            RelativeAxisType::REL_X.0,
            delta,
        ))
    }

    async fn run_events(
        events: Vec<io::Result<InputEvent>>,
        clock: ManualClock,
        step: Duration,
    ) -> (io::Result<LoopExit>, Vec<Output>) {
        let mut disambiguator = Disambiguator::with_clock(config(), clock.clone());
        let mut sink = RecordingSink::default();
        // Each event arrives `step` after the previous one
        let mut source = futures::stream::iter(events).inspect(move |_| clock.advance(step));

        let exit = run(
            &mut source,
            &mut disambiguator,
            &mut sink,
            futures::future::pending(),
        )
        .await;
        (exit, sink.outputs)
    }

    #[tokio::test]
    async fn test_hold_and_combine_scenario() {
        // Hold CapsLock, tap A, release CapsLock
        let events = vec![
            scan(0x3a),
            key_event(Key::KEY_CAPSLOCK, 1),
            syn(),
            scan(0x1e),
            key_event(Key::KEY_A, 1),
            syn(),
            key_event(Key::KEY_A, 0),
            syn(),
            key_event(Key::KEY_CAPSLOCK, 0),
            syn(),
        ];

        let (exit, outputs) =
            run_events(events, ManualClock::new(), Duration::from_millis(10)).await;

        assert_eq!(exit.unwrap(), LoopExit::StreamClosed);
        assert_eq!(
            outputs,
            vec![
                Output::Key(Key::KEY_LEFTCTRL, KeyState::Down),
                Output::Key(Key::KEY_A, KeyState::Down),
                Output::Sync,
                Output::Key(Key::KEY_A, KeyState::Up),
                Output::Sync,
                Output::Key(Key::KEY_LEFTCTRL, KeyState::Up),
                Output::Sync,
            ]
        );
    }

    #[tokio::test]
    async fn test_tap_scenario() {
        let events = vec![
            key_event(Key::KEY_CAPSLOCK, 1),
            syn(),
            key_event(Key::KEY_CAPSLOCK, 0),
            syn(),
        ];

        let (_, outputs) =
            run_events(events, ManualClock::new(), Duration::from_millis(20)).await;

        assert_eq!(
            outputs,
            vec![
                Output::Key(Key::KEY_CAPSLOCK, KeyState::Down),
                Output::Key(Key::KEY_CAPSLOCK, KeyState::Up),
                Output::Sync,
            ]
        );
    }

    #[tokio::test]
    async fn test_slow_release_scenario() {
        let events = vec![
            key_event(Key::KEY_SPACE, 1),
            key_event(Key::KEY_SPACE, 2),
            key_event(Key::KEY_SPACE, 0),
        ];

        let (_, outputs) =
            run_events(events, ManualClock::new(), Duration::from_millis(150)).await;

        assert_eq!(
            outputs,
            vec![Output::Key(Key::KEY_LEFTALT, KeyState::Up), Output::Sync]
        );
    }

    #[tokio::test]
    async fn test_relative_motion_is_forwarded_on_source_sync() {
        let events = vec![rel_x(5), rel_x(-2), syn(), syn()];

        let (_, outputs) = run_events(events, ManualClock::new(), Duration::ZERO).await;

        let rel = |value| Output::Forwarded {
            kind: EventType::RELATIVE,
            code: RelativeAxisType::REL_X.0,
            value,
        };
        assert_eq!(outputs, vec![rel(5), rel(-2), Output::Sync]);
    }

    #[tokio::test]
    async fn test_source_sync_alone_emits_nothing() {
        let events = vec![syn(), scan(0x1e), syn()];
        let (_, outputs) = run_events(events, ManualClock::new(), Duration::ZERO).await;
        assert!(outputs.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_key_value_forwarded() {
        let events = vec![key_event(Key::KEY_B, 7)];
        let (_, outputs) = run_events(events, ManualClock::new(), Duration::ZERO).await;
        assert_eq!(
            outputs,
            vec![
                Output::Forwarded {
                    kind: EventType::KEY,
                    code: Key::KEY_B.code(),
                    value: 7,
                },
                Output::Sync,
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_device_closes_stream() {
        let events = vec![
            key_event(Key::KEY_B, 1),
            Err(io::Error::from_raw_os_error(ENODEV)),
            key_event(Key::KEY_B, 0),
        ];
        let (exit, outputs) = run_events(events, ManualClock::new(), Duration::ZERO).await;

        assert_eq!(exit.unwrap(), LoopExit::StreamClosed);
        assert_eq!(
            outputs,
            vec![Output::Key(Key::KEY_B, KeyState::Down), Output::Sync]
        );
    }

    #[tokio::test]
    async fn test_other_read_errors_propagate() {
        let events = vec![Err(io::Error::new(io::ErrorKind::Other, "boom"))];
        let (exit, _) = run_events(events, ManualClock::new(), Duration::ZERO).await;
        assert_eq!(exit.unwrap_err().kind(), io::ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_sink_failure_stops_loop() {
        let mut disambiguator = Disambiguator::with_clock(config(), ManualClock::new());
        let mut sink = RecordingSink {
            fail_on_sync: Some(io::ErrorKind::BrokenPipe),
            ..Default::default()
        };
        let mut source = futures::stream::iter(vec![key_event(Key::KEY_B, 1)]);

        let exit = run(
            &mut source,
            &mut disambiguator,
            &mut sink,
            futures::future::pending(),
        )
        .await;
        assert_eq!(exit.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_pending_read() {
        let mut disambiguator = Disambiguator::with_clock(config(), ManualClock::new());
        let mut sink = RecordingSink::default();
        let mut source = futures::stream::pending::<io::Result<InputEvent>>();

        let exit = run(
            &mut source,
            &mut disambiguator,
            &mut sink,
            futures::future::ready(()),
        )
        .await;
        assert_eq!(exit.unwrap(), LoopExit::Shutdown);
        assert!(sink.outputs.is_empty());
    }
}
