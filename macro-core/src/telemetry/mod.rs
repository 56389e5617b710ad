//! Telemetry event catalog and recorder shared by firmware and host targets.
//!
//! Every fresh sequencer transition can be captured as a [`TelemetryRecord`]
//! in a fixed-size ring. Event kinds encode to compact `u16` codes so they can
//! be logged over `defmt` or written into transcripts without formatting.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::runner::Poll;
use crate::script::{Action, ScriptKind};
use crate::sequencer::Transition;

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    Primed,
    ScriptStarted(ScriptKind),
    CommandAdvanced(ScriptKind),
    ScriptCompleted(ScriptKind),
    Drained,
    ShutdownRequested,
    Custom(u16),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::Primed => f.write_str("primed"),
            TelemetryEventKind::ScriptStarted(kind) => write!(f, "script-started {kind}"),
            TelemetryEventKind::CommandAdvanced(kind) => write!(f, "command-advanced {kind}"),
            TelemetryEventKind::ScriptCompleted(kind) => write!(f, "script-completed {kind}"),
            TelemetryEventKind::Drained => f.write_str("drained"),
            TelemetryEventKind::ShutdownRequested => f.write_str("shutdown-requested"),
            TelemetryEventKind::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

impl TelemetryEventKind {
    const PRIMED_CODE: u16 = 0x0001;
    const DRAINED_CODE: u16 = 0x0002;
    const SHUTDOWN_REQUESTED_CODE: u16 = 0x0003;
    const SCRIPT_STARTED_BASE: u16 = 0x0010;
    const COMMAND_ADVANCED_BASE: u16 = 0x0014;
    const SCRIPT_COMPLETED_BASE: u16 = 0x0018;
    const KIND_SLOTS: u16 = 4;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::Primed => Self::PRIMED_CODE,
            TelemetryEventKind::Drained => Self::DRAINED_CODE,
            TelemetryEventKind::ShutdownRequested => Self::SHUTDOWN_REQUESTED_CODE,
            TelemetryEventKind::ScriptStarted(kind) => Self::SCRIPT_STARTED_BASE + kind.as_index(),
            TelemetryEventKind::CommandAdvanced(kind) => {
                Self::COMMAND_ADVANCED_BASE + kind.as_index()
            }
            TelemetryEventKind::ScriptCompleted(kind) => {
                Self::SCRIPT_COMPLETED_BASE + kind.as_index()
            }
            TelemetryEventKind::Custom(code) => code,
        }
    }

    /// Decodes a raw discriminant, falling back to [`TelemetryEventKind::Custom`].
    #[must_use]
    pub fn from_raw(code: u16) -> Self {
        let scripted = |base: u16, build: fn(ScriptKind) -> Self| {
            ScriptKind::from_index(code - base).map_or(TelemetryEventKind::Custom(code), build)
        };

        match code {
            Self::PRIMED_CODE => TelemetryEventKind::Primed,
            Self::DRAINED_CODE => TelemetryEventKind::Drained,
            Self::SHUTDOWN_REQUESTED_CODE => TelemetryEventKind::ShutdownRequested,
            value if (Self::SCRIPT_STARTED_BASE..Self::COMMAND_ADVANCED_BASE).contains(&value) => {
                scripted(Self::SCRIPT_STARTED_BASE, TelemetryEventKind::ScriptStarted)
            }
            value
                if (Self::COMMAND_ADVANCED_BASE..Self::SCRIPT_COMPLETED_BASE).contains(&value) =>
            {
                scripted(Self::COMMAND_ADVANCED_BASE, TelemetryEventKind::CommandAdvanced)
            }
            value
                if (Self::SCRIPT_COMPLETED_BASE..Self::SCRIPT_COMPLETED_BASE + Self::KIND_SLOTS)
                    .contains(&value) =>
            {
                scripted(Self::SCRIPT_COMPLETED_BASE, TelemetryEventKind::ScriptCompleted)
            }
            other => TelemetryEventKind::Custom(other),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Command that finished its hold.
    Command(CommandTelemetry),
    /// Summary of a completed script pass.
    Pass(PassTelemetry),
}

impl TelemetryPayload {
    #[must_use]
    pub const fn none() -> Self {
        TelemetryPayload::None
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommandTelemetry {
    pub index: u16,
    pub action: Action,
}

impl CommandTelemetry {
    #[must_use]
    pub const fn new(index: u16, action: Action) -> Self {
        Self { index, action }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PassTelemetry {
    /// Main-script pass number; `0` for the setup script.
    pub number: u32,
    /// Time since the matching `ScriptStarted` event, when one was recorded.
    pub elapsed: Option<Duration>,
}

impl PassTelemetry {
    #[must_use]
    pub const fn new(number: u32, elapsed: Option<Duration>) -> Self {
        Self { number, elapsed }
    }
}

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 128;

/// Trait implemented by monotonic instant wrappers used for telemetry tracking.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    script_started_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            script_started_at: None,
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    #[must_use]
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    #[must_use]
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Total events recorded, including ones that fell out of the ring.
    #[must_use]
    pub fn total_recorded(&self) -> EventId {
        self.next_event_id
    }

    /// Records whatever a runner poll changed. Echoed frames record nothing.
    ///
    /// Returns the id of the last event written.
    pub fn record_poll(&mut self, poll: &Poll, timestamp: TInstant) -> Option<EventId> {
        let mut last = poll
            .frame
            .transition
            .map(|transition| self.record_transition(poll, transition, timestamp));

        if poll.shutdown_requested {
            last = Some(self.record(
                TelemetryEventKind::ShutdownRequested,
                TelemetryPayload::none(),
                timestamp,
            ));
        }

        last
    }

    fn record_transition(
        &mut self,
        poll: &Poll,
        transition: Transition,
        timestamp: TInstant,
    ) -> EventId {
        let kind = poll.script;
        match transition {
            Transition::Primed => {
                self.record(TelemetryEventKind::Primed, TelemetryPayload::none(), timestamp)
            }
            Transition::ScriptStarted => {
                self.script_started_at = Some(timestamp);
                self.record(
                    TelemetryEventKind::ScriptStarted(kind),
                    TelemetryPayload::none(),
                    timestamp,
                )
            }
            Transition::CommandAdvanced { index, action } => self.record(
                TelemetryEventKind::CommandAdvanced(kind),
                TelemetryPayload::Command(CommandTelemetry::new(truncate_index(index), action)),
                timestamp,
            ),
            Transition::ScriptCompleted => {
                let elapsed = self
                    .script_started_at
                    .take()
                    .map(|start| timestamp.saturating_duration_since(start));
                let number = poll.completed_pass.unwrap_or(0);
                self.record(
                    TelemetryEventKind::ScriptCompleted(kind),
                    TelemetryPayload::Pass(PassTelemetry::new(number, elapsed)),
                    timestamp,
                )
            }
            Transition::Drained => {
                self.record(TelemetryEventKind::Drained, TelemetryPayload::none(), timestamp)
            }
        }
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        payload: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details: payload,
        });

        id
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: Copy + TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_index(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ControllerReport;
    use crate::sequencer::Frame;

    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
    struct MicrosInstant(u64);

    impl TelemetryInstant for MicrosInstant {
        fn saturating_duration_since(&self, earlier: Self) -> Duration {
            Duration::from_micros(self.0.saturating_sub(earlier.0))
        }
    }

    fn poll(script: ScriptKind, transition: Option<Transition>) -> Poll {
        Poll {
            script,
            frame: Frame {
                report: ControllerReport::neutral(),
                done: matches!(transition, Some(Transition::ScriptCompleted)),
                transition,
                echoed: transition.is_none(),
            },
            completed_pass: None,
            shutdown_requested: false,
        }
    }

    #[test]
    fn event_codes_round_trip() {
        let fixtures = [
            (TelemetryEventKind::Primed, 0x0001),
            (TelemetryEventKind::Drained, 0x0002),
            (TelemetryEventKind::ShutdownRequested, 0x0003),
            (TelemetryEventKind::ScriptStarted(ScriptKind::Setup), 0x0010),
            (TelemetryEventKind::ScriptStarted(ScriptKind::Main), 0x0011),
            (TelemetryEventKind::CommandAdvanced(ScriptKind::Main), 0x0015),
            (TelemetryEventKind::ScriptCompleted(ScriptKind::Setup), 0x0018),
        ];

        for (event, code) in fixtures {
            assert_eq!(event.to_raw(), code);
            assert_eq!(TelemetryEventKind::from_raw(code), event);
        }

        assert_eq!(
            TelemetryEventKind::from_raw(0x0013),
            TelemetryEventKind::Custom(0x0013)
        );
        assert_eq!(
            TelemetryEventKind::from_raw(0x0400),
            TelemetryEventKind::Custom(0x0400)
        );
    }

    #[test]
    fn echoed_polls_record_nothing() {
        let mut recorder = TelemetryRecorder::<MicrosInstant>::new();
        assert_eq!(
            recorder.record_poll(&poll(ScriptKind::Setup, None), MicrosInstant(5)),
            None
        );
        assert!(recorder.is_empty());
    }

    #[test]
    fn completion_reports_elapsed_since_start() {
        let mut recorder = TelemetryRecorder::<MicrosInstant>::new();

        recorder.record_poll(
            &poll(ScriptKind::Main, Some(Transition::ScriptStarted)),
            MicrosInstant(1_000),
        );
        recorder.record_poll(
            &poll(
                ScriptKind::Main,
                Some(Transition::CommandAdvanced {
                    index: 70_000,
                    action: Action::Throw,
                }),
            ),
            MicrosInstant(2_000),
        );

        let advanced = recorder.latest().copied().expect("advance recorded");
        assert_eq!(
            advanced.details,
            TelemetryPayload::Command(CommandTelemetry::new(u16::MAX, Action::Throw))
        );

        let mut completed = poll(ScriptKind::Main, Some(Transition::ScriptCompleted));
        completed.completed_pass = Some(3);
        let id = recorder.record_poll(&completed, MicrosInstant(4_500));
        assert_eq!(id, Some(2));

        let record = recorder.latest().copied().expect("completion recorded");
        assert_eq!(
            record.event,
            TelemetryEventKind::ScriptCompleted(ScriptKind::Main)
        );
        match record.details {
            TelemetryPayload::Pass(details) => {
                assert_eq!(details.number, 3);
                let elapsed = details.elapsed.expect("missing elapsed");
                assert_eq!(elapsed.as_micros(), 3_500);
            }
            other => panic!("expected pass payload, got {other:?}"),
        }
    }

    #[test]
    fn shutdown_request_follows_completion() {
        let mut recorder = TelemetryRecorder::<MicrosInstant>::new();
        let mut completed = poll(ScriptKind::Main, Some(Transition::ScriptCompleted));
        completed.completed_pass = Some(1);
        completed.shutdown_requested = true;

        assert_eq!(recorder.record_poll(&completed, MicrosInstant(10)), Some(1));

        let events: heapless::Vec<TelemetryEventKind, 4> =
            recorder.oldest_first().map(|record| record.event).collect();
        assert_eq!(
            events.as_slice(),
            &[
                TelemetryEventKind::ScriptCompleted(ScriptKind::Main),
                TelemetryEventKind::ShutdownRequested,
            ]
        );

        let first = recorder.oldest_first().next().expect("completion stored");
        match first.details {
            TelemetryPayload::Pass(details) => assert!(details.elapsed.is_none()),
            other => panic!("expected pass payload, got {other:?}"),
        }
    }

    #[test]
    fn ring_keeps_most_recent_entries() {
        let mut recorder = TelemetryRecorder::<MicrosInstant, 4>::new();
        for step in 0..6u16 {
            recorder.record(
                TelemetryEventKind::Custom(step),
                TelemetryPayload::none(),
                MicrosInstant(u64::from(step)),
            );
        }

        assert_eq!(recorder.len(), 4);
        assert_eq!(recorder.total_recorded(), 6);
        let oldest = recorder.oldest_first().next().expect("ring not empty");
        assert_eq!(oldest.event, TelemetryEventKind::Custom(2));
        assert_eq!(oldest.id, 2);
    }
}
