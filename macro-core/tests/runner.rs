use macro_core::report::Buttons;
use macro_core::runner::{MacroConfig, MacroRunner};
use macro_core::script::{Script, ScriptKind, parse_script, setup_script};
use macro_core::sequencer::SequencerConfig;
use macro_core::telemetry::{TelemetryEventKind, TelemetryInstant, TelemetryRecorder};

use core::time::Duration;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct PollTick(u64);

impl TelemetryInstant for PollTick {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

const MAIN: &str = "\
# throw and recover
throw, 3
idle 2
b 1
end
";

#[test]
fn main_script_runs_after_setup_and_stops_at_limit() {
    let main = parse_script::<16>(MAIN).expect("main script parses");
    let config = MacroConfig::new(SequencerConfig::default(), Some(2));
    let mut runner = MacroRunner::new(setup_script(), Script::new(&main), config);
    let mut telemetry = TelemetryRecorder::<PollTick, 256>::new();

    let mut saw_main_b = false;
    let mut tick = 0u64;
    while !runner.is_finished() && tick < 20_000 {
        let poll = runner.poll();
        telemetry.record_poll(&poll, PollTick(tick));
        if poll.script == ScriptKind::Main && poll.frame.report.buttons == Buttons::B {
            saw_main_b = true;
        }
        tick += 1;
    }

    assert!(runner.is_finished());
    assert!(saw_main_b);
    assert_eq!(runner.passes(), 2);

    let completions: heapless::Vec<TelemetryEventKind, 4> = telemetry
        .oldest_first()
        .map(|record| record.event)
        .filter(|event| matches!(event, TelemetryEventKind::ScriptCompleted(_)))
        .collect();
    assert_eq!(
        completions.as_slice(),
        &[
            TelemetryEventKind::ScriptCompleted(ScriptKind::Setup),
            TelemetryEventKind::ScriptCompleted(ScriptKind::Main),
            TelemetryEventKind::ScriptCompleted(ScriptKind::Main),
        ]
    );

    let tail: heapless::Vec<TelemetryEventKind, 2> = telemetry
        .oldest_first()
        .map(|record| record.event)
        .skip(telemetry.len() - 2)
        .collect();
    assert_eq!(
        tail.as_slice(),
        &[
            TelemetryEventKind::ShutdownRequested,
            TelemetryEventKind::Drained
        ]
    );
}

#[test]
fn runner_without_limit_keeps_looping() {
    let main = parse_script::<4>("a 0").expect("main script parses");
    let config = MacroConfig::new(SequencerConfig::new(0), None);
    let mut runner = MacroRunner::new(setup_script(), Script::new(&main), config);

    for _ in 0..5_000 {
        runner.poll();
    }

    assert!(!runner.is_finished());
    assert!(runner.passes() > 100);
}
