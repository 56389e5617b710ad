//! Report sequencer state machine.
//!
//! The sequencer turns a [`Script`] into one [`ControllerReport`] per transport
//! opportunity. Each freshly computed report is replayed for a configurable
//! number of follow-up calls so that one tick of a script spans several host
//! polls. The sequencer does not know which script it is fed; callers switch
//! scripts only when a frame reports `done`.

use core::fmt;

use crate::report::ControllerReport;
use crate::script::{Action, Script};

/// Number of times a fresh report is replayed before the next one is built.
pub const DEFAULT_ECHOES: u8 = 2;

/// Lifecycle phases of the sequencer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// One-time startup pass.
    Priming,
    /// Pause between scripts.
    Settling,
    /// Executing the command under the cursor.
    Running,
    /// Draining after a shutdown request.
    Finishing,
    /// Terminal; the last report is replayed forever.
    Idle,
}

impl Phase {
    /// Returns `true` once the sequencer has been asked to stop.
    #[must_use]
    pub const fn is_shutting_down(self) -> bool {
        matches!(self, Phase::Finishing | Phase::Idle)
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Phase::Idle)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Priming => "priming",
            Phase::Settling => "settling",
            Phase::Running => "running",
            Phase::Finishing => "finishing",
            Phase::Idle => "idle",
        };
        f.write_str(label)
    }
}

/// Tunables for [`Sequencer`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SequencerConfig {
    /// Calls that replay each fresh report unchanged.
    pub echoes: u8,
}

impl SequencerConfig {
    #[must_use]
    pub const fn new(echoes: u8) -> Self {
        Self { echoes }
    }

    /// Number of transport calls one tick occupies.
    #[must_use]
    pub fn calls_per_tick(&self) -> u32 {
        u32::from(self.echoes) + 1
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ECHOES)
    }
}

/// State change made by a single [`Sequencer::next`] call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    /// Startup pass finished.
    Primed,
    /// Cursor 0 of a script is about to run.
    ScriptStarted,
    /// The command at `index` finished its hold and the cursor moved on.
    CommandAdvanced { index: usize, action: Action },
    /// The script ended (sentinel or overrun); counters were reset.
    ScriptCompleted,
    /// Shutdown drain finished and the sequencer is now idle.
    Drained,
}

/// Output of one [`Sequencer::next`] call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    pub report: ControllerReport,
    pub done: bool,
    pub transition: Option<Transition>,
    /// `true` when the report was replayed from the cache.
    pub echoed: bool,
}

impl Frame {
    const fn echo(report: ControllerReport) -> Self {
        Self {
            report,
            done: false,
            transition: None,
            echoed: true,
        }
    }

    const fn fresh(report: ControllerReport, done: bool, transition: Option<Transition>) -> Self {
        Self {
            report,
            done,
            transition,
            echoed: false,
        }
    }
}

/// Deterministic script player. Exactly one instance drives a transport.
#[derive(Clone, Debug)]
pub struct Sequencer {
    phase: Phase,
    cached: ControllerReport,
    repeat_budget: u8,
    cursor: usize,
    hold_counter: u16,
    config: SequencerConfig,
}

impl Sequencer {
    /// Creates a sequencer in [`Phase::Priming`] with the default config.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_config(SequencerConfig::new(DEFAULT_ECHOES))
    }

    #[must_use]
    pub const fn with_config(config: SequencerConfig) -> Self {
        Self {
            phase: Phase::Priming,
            cached: ControllerReport::NEUTRAL,
            repeat_budget: 0,
            cursor: 0,
            hold_counter: 0,
            config,
        }
    }

    /// Produces the report for the current transport opportunity.
    ///
    /// While the repeat budget is non-zero the cached report is returned and
    /// nothing else changes. Otherwise the phase is advanced at most once and
    /// the new report is cached for the following echoes.
    pub fn next(&mut self, script: Script<'_>) -> Frame {
        if self.repeat_budget > 0 {
            self.repeat_budget -= 1;
            return Frame::echo(self.cached);
        }

        let transition = match self.phase {
            Phase::Priming => {
                self.phase = Phase::Settling;
                Transition::Primed
            }
            Phase::Settling => {
                self.phase = Phase::Running;
                Transition::ScriptStarted
            }
            Phase::Running => return self.run(script),
            Phase::Finishing => {
                self.phase = Phase::Idle;
                Transition::Drained
            }
            Phase::Idle => return Frame::echo(self.cached),
        };

        let report = ControllerReport::neutral();
        self.commit(report);
        Frame::fresh(report, false, Some(transition))
    }

    fn run(&mut self, script: Script<'_>) -> Frame {
        let command = match script.get(self.cursor) {
            Some(command) if !command.is_end() => *command,
            _ => {
                self.reset_position();
                self.phase = Phase::Settling;
                let report = ControllerReport::neutral();
                self.commit(report);
                return Frame::fresh(report, true, Some(Transition::ScriptCompleted));
            }
        };

        let report = ControllerReport::for_action(command.action);
        self.hold_counter = self.hold_counter.saturating_add(1);

        let mut transition = None;
        if i32::from(self.hold_counter) > i32::from(command.duration) {
            transition = Some(Transition::CommandAdvanced {
                index: self.cursor,
                action: command.action,
            });
            self.cursor += 1;
            self.hold_counter = 0;
        }

        self.commit(report);
        Frame::fresh(report, false, transition)
    }

    fn commit(&mut self, report: ControllerReport) {
        self.cached = report;
        self.repeat_budget = self.config.echoes;
    }

    fn reset_position(&mut self) {
        self.cursor = 0;
        self.hold_counter = 0;
    }

    /// Abandons the current script and starts over from [`Phase::Settling`].
    /// Has no effect once a shutdown is in progress.
    pub fn reset(&mut self) {
        if self.phase.is_shutting_down() {
            return;
        }
        self.reset_position();
        if self.phase == Phase::Running {
            self.phase = Phase::Settling;
        }
    }

    /// Asks the sequencer to wind down. The next fresh call produces a
    /// neutral report and parks the sequencer in [`Phase::Idle`].
    ///
    /// Returns `false` if a shutdown was already underway.
    pub fn request_shutdown(&mut self) -> bool {
        if self.phase.is_shutting_down() {
            return false;
        }
        self.phase = Phase::Finishing;
        true
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub const fn hold_counter(&self) -> u16 {
        self.hold_counter
    }

    #[must_use]
    pub const fn repeat_budget(&self) -> u8 {
        self.repeat_budget
    }

    /// Last freshly computed report.
    #[must_use]
    pub const fn cached(&self) -> ControllerReport {
        self.cached
    }

    #[must_use]
    pub const fn config(&self) -> SequencerConfig {
        self.config
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
