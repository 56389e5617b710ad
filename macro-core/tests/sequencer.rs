use macro_core::report::{Buttons, ControllerReport};
use macro_core::script::{Action, Command, Script, setup_script};
use macro_core::sequencer::{Phase, Sequencer, SequencerConfig, Transition};

/// Calls until the first `done`, counting from 1.
fn calls_until_done(sequencer: &mut Sequencer, script: Script<'_>, limit: u32) -> Option<u32> {
    (1..=limit).find(|_| sequencer.next(script).done)
}

#[test]
fn sentinel_at_index_k_holds_k_actions() {
    let commands = [
        Command::new(Action::Up, 2),
        Command::new(Action::A, 0),
        Command::new(Action::Right, 4),
        Command::end(),
        Command::new(Action::B, 9),
    ];
    let script = Script::new(&commands);
    let mut sequencer = Sequencer::with_config(SequencerConfig::new(0));

    sequencer.next(script);
    sequencer.next(script);

    let mut holds: heapless::Vec<(ControllerReport, u32), 8> = heapless::Vec::new();
    loop {
        let frame = sequencer.next(script);
        if frame.done {
            break;
        }
        match holds.last_mut() {
            Some((report, count)) if *report == frame.report => *count += 1,
            _ => holds.push((frame.report, 1)).expect("capacity"),
        }
    }

    assert_eq!(
        holds.as_slice(),
        &[
            (ControllerReport::for_action(Action::Up), 3),
            (ControllerReport::for_action(Action::A), 1),
            (ControllerReport::for_action(Action::Right), 5),
        ]
    );
}

#[test]
fn every_fresh_report_repeats_for_echo_budget() {
    let commands = [
        Command::new(Action::Left, 1),
        Command::new(Action::Throw, 2),
        Command::end(),
    ];
    let script = Script::new(&commands);

    for echoes in [0u8, 1, 2, 5] {
        let mut sequencer = Sequencer::with_config(SequencerConfig::new(echoes));
        let mut pending = 0u8;
        let mut last = None;

        for _ in 0..120 {
            let frame = sequencer.next(script);
            if pending > 0 {
                assert!(frame.echoed, "echoes={echoes}");
                assert_eq!(Some(frame.report), last);
                pending -= 1;
            } else {
                assert!(!frame.echoed, "echoes={echoes}");
                last = Some(frame.report);
                pending = echoes;
            }
        }
    }
}

#[test]
fn setup_script_completes_after_expected_calls() {
    let script = setup_script();
    let config = SequencerConfig::default();
    let mut sequencer = Sequencer::with_config(config);

    // priming + settling + every hold tick, then the terminating call
    let fresh_calls = 2 + script.pass_ticks() + 1;
    let expected = (fresh_calls - 1) * config.calls_per_tick() + 1;

    assert_eq!(script.pass_ticks(), 822);
    assert_eq!(calls_until_done(&mut sequencer, script, 10_000), Some(expected));
    assert_eq!(sequencer.phase(), Phase::Settling);
}

#[test]
fn pairing_presses_reach_the_wire() {
    let script = setup_script();
    let mut sequencer = Sequencer::with_config(SequencerConfig::new(0));

    let mut pairing = 0;
    let mut confirm = 0;
    loop {
        let frame = sequencer.next(script);
        if frame.done {
            break;
        }
        if frame.report.buttons == Buttons::L | Buttons::R {
            pairing += 1;
        }
        if frame.report.buttons == Buttons::A {
            confirm += 1;
        }
    }

    assert_eq!(pairing, 12);
    assert_eq!(confirm, 6);
}

#[test]
fn transitions_trace_full_lifecycle() {
    let commands = [Command::new(Action::X, 0), Command::end()];
    let script = Script::new(&commands);
    let mut sequencer = Sequencer::with_config(SequencerConfig::new(0));

    let mut trace: heapless::Vec<Transition, 8> = heapless::Vec::new();
    for call in 0..6 {
        if call == 4 {
            sequencer.request_shutdown();
        }
        if let Some(transition) = sequencer.next(script).transition {
            trace.push(transition).expect("capacity");
        }
    }

    assert_eq!(
        trace.as_slice(),
        &[
            Transition::Primed,
            Transition::ScriptStarted,
            Transition::CommandAdvanced {
                index: 0,
                action: Action::X
            },
            Transition::ScriptCompleted,
            Transition::Drained,
        ]
    );
    assert!(sequencer.phase().is_terminal());
}

#[test]
fn completion_follows_last_advance_by_one_fresh_call() {
    let commands = [Command::new(Action::Triggers, 5), Command::end()];
    let script = Script::new(&commands);
    let mut sequencer = Sequencer::new();

    let mut holds: heapless::Vec<u16, 8> = heapless::Vec::new();
    let mut advanced_at = None;
    let mut done_at = None;
    for call in 1..=30u32 {
        let frame = sequencer.next(script);
        if !frame.echoed && sequencer.phase() == Phase::Running && advanced_at.is_none() {
            holds.push(sequencer.hold_counter()).expect("capacity");
        }
        if matches!(frame.transition, Some(Transition::CommandAdvanced { .. })) {
            advanced_at = Some(call);
        }
        if frame.done {
            assert!(frame.report.is_neutral());
            done_at = Some(call);
            break;
        }
    }

    // Call 4 enters Running; presses are fresh on calls 7, 10, .., 22.
    assert_eq!(holds.as_slice(), &[0, 1, 2, 3, 4, 5, 0]);
    assert_eq!(advanced_at, Some(22));
    assert_eq!(done_at, Some(25));
}
