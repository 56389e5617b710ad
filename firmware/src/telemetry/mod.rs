//! Telemetry ring and logging helpers for the firmware target.
//!
//! Wraps the shared recorder with an `embassy-time` backed instant and mirrors
//! each recorded event to defmt (or stdout on host builds) so an RTT session
//! shows the macro progressing without extra tooling.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use embassy_time::Instant;
use macro_core::runner::Poll;
use macro_core::telemetry::{
    EventId, TelemetryInstant, TelemetryPayload, TelemetryRecord, TelemetryRecorder,
};

/// Monotonic timestamp used for firmware telemetry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub const fn from_micros(micros: u64) -> Self {
        Self(Instant::from_micros(micros))
    }

    pub fn as_micros(self) -> u64 {
        self.0.as_micros()
    }
}

impl TelemetryInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> core::time::Duration {
        let micros = self.0.as_micros().saturating_sub(earlier.0.as_micros());
        core::time::Duration::from_micros(micros)
    }
}

/// Recorder type owned by the HID task.
pub type FirmwareTelemetry = TelemetryRecorder<FirmwareInstant>;

/// Records the telemetry for one runner poll and logs what was written.
pub fn record_poll(
    recorder: &mut FirmwareTelemetry,
    poll: &Poll,
    timestamp: FirmwareInstant,
) -> Option<EventId> {
    let before = recorder.total_recorded();
    let last = recorder.record_poll(poll, timestamp)?;

    // At most two events are written per poll; log them oldest first.
    let written = last.wrapping_sub(before).wrapping_add(1);
    let skip = recorder
        .len()
        .saturating_sub(usize::try_from(written).unwrap_or(usize::MAX));
    for record in recorder.oldest_first().skip(skip) {
        log_record(record);
    }

    Some(last)
}

fn log_record(record: &TelemetryRecord<FirmwareInstant>) {
    let timestamp_us = record.timestamp.as_micros();
    match record.details {
        TelemetryPayload::None => emit_log(record, timestamp_us, None),
        TelemetryPayload::Command(command) => {
            emit_log(record, timestamp_us, Some((u32::from(command.index), None)));
        }
        TelemetryPayload::Pass(pass) => {
            let elapsed_ms = pass
                .elapsed
                .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
            emit_log(record, timestamp_us, Some((pass.number, elapsed_ms)));
        }
    }
}

#[cfg(target_os = "none")]
fn emit_log(
    record: &TelemetryRecord<FirmwareInstant>,
    timestamp_us: u64,
    detail: Option<(u32, Option<u64>)>,
) {
    let event = defmt::Display2Format(&record.event);
    match detail {
        Some((value, Some(elapsed_ms))) => defmt::info!(
            "telemetry:macro #{} {} n={} t={}us Δ={}ms",
            record.id,
            event,
            value,
            timestamp_us,
            elapsed_ms
        ),
        Some((value, None)) => defmt::info!(
            "telemetry:macro #{} {} n={} t={}us",
            record.id,
            event,
            value,
            timestamp_us
        ),
        None => defmt::info!("telemetry:macro #{} {} t={}us", record.id, event, timestamp_us),
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(
    record: &TelemetryRecord<FirmwareInstant>,
    timestamp_us: u64,
    detail: Option<(u32, Option<u64>)>,
) {
    match detail {
        Some((value, Some(elapsed_ms))) => println!(
            "telemetry:macro #{} {} n={} t={}us Δ={}ms",
            record.id, record.event, value, timestamp_us, elapsed_ms
        ),
        Some((value, None)) => println!(
            "telemetry:macro #{} {} n={} t={}us",
            record.id, record.event, value, timestamp_us
        ),
        None => println!(
            "telemetry:macro #{} {} t={}us",
            record.id, record.event, timestamp_us
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macro_core::runner::{MacroConfig, MacroRunner};
    use macro_core::script::{Action, Command, Script, ScriptKind, setup_script};
    use macro_core::sequencer::SequencerConfig;
    use macro_core::telemetry::TelemetryEventKind;

    #[test]
    fn elapsed_uses_embassy_ticks() {
        let start = FirmwareInstant::from_micros(1_000);
        let end = FirmwareInstant::from_micros(4_500);

        assert_eq!(end.saturating_duration_since(start).as_micros(), 3_500);
        assert_eq!(start.saturating_duration_since(end).as_micros(), 0);
    }

    #[test]
    fn records_setup_completion_from_runner() {
        const MAIN: [Command; 2] = [Command::new(Action::A, 0), Command::end()];
        let config = MacroConfig::new(SequencerConfig::new(0), None);
        let mut runner = MacroRunner::new(setup_script(), Script::new(&MAIN), config);
        let mut recorder = FirmwareTelemetry::new();

        let mut micros = 0;
        while !runner.selector().setup_complete() {
            let poll = runner.poll();
            record_poll(&mut recorder, &poll, FirmwareInstant::from_micros(micros));
            micros += 1_000;
        }

        let latest = recorder.latest().expect("events recorded");
        assert_eq!(
            latest.event,
            TelemetryEventKind::ScriptCompleted(ScriptKind::Setup)
        );
        match latest.details {
            TelemetryPayload::Pass(pass) => {
                assert_eq!(pass.number, 0);
                assert!(pass.elapsed.is_some());
            }
            other => panic!("expected pass payload, got {other:?}"),
        }
    }
}
