//! Caller-side script selection wrapped around a [`Sequencer`].
//!
//! The firmware HID task and the host emulator both drive the sequencer the
//! same way: feed the setup script until it completes once, then feed the main
//! script forever (or until a pass limit triggers a graceful shutdown).

use crate::script::{Script, ScriptKind};
use crate::sequencer::{Frame, Phase, Sequencer, SequencerConfig};

/// Picks the script handed to the sequencer on each call.
#[derive(Copy, Clone, Debug)]
pub struct ScriptSelector<'a> {
    setup: Script<'a>,
    main: Script<'a>,
    setup_complete: bool,
}

impl<'a> ScriptSelector<'a> {
    #[must_use]
    pub const fn new(setup: Script<'a>, main: Script<'a>) -> Self {
        Self {
            setup,
            main,
            setup_complete: false,
        }
    }

    /// Script that should be passed to the next sequencer call.
    #[must_use]
    pub const fn current(&self) -> (ScriptKind, Script<'a>) {
        if self.setup_complete {
            (ScriptKind::Main, self.main)
        } else {
            (ScriptKind::Setup, self.setup)
        }
    }

    /// Feeds back the frame produced for `kind`. The selector only moves on
    /// from the setup script when that script itself reported completion.
    pub fn observe(&mut self, kind: ScriptKind, frame: &Frame) {
        if frame.done && kind == ScriptKind::Setup {
            self.setup_complete = true;
        }
    }

    #[must_use]
    pub const fn setup_complete(&self) -> bool {
        self.setup_complete
    }
}

/// Runner configuration.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MacroConfig {
    pub sequencer: SequencerConfig,
    /// Completed main passes after which a graceful shutdown is requested.
    /// `None` loops forever.
    pub pass_limit: Option<u32>,
}

impl MacroConfig {
    #[must_use]
    pub const fn new(sequencer: SequencerConfig, pass_limit: Option<u32>) -> Self {
        Self {
            sequencer,
            pass_limit,
        }
    }
}

/// Result of one [`MacroRunner::poll`] call.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Poll {
    /// Script that was handed to the sequencer for this call.
    pub script: ScriptKind,
    pub frame: Frame,
    /// Pass number when this call completed a main pass.
    pub completed_pass: Option<u32>,
    /// `true` when this call hit the pass limit and requested shutdown.
    pub shutdown_requested: bool,
}

/// Owns the sequencer and selector for one transport.
#[derive(Clone, Debug)]
pub struct MacroRunner<'a> {
    sequencer: Sequencer,
    selector: ScriptSelector<'a>,
    config: MacroConfig,
    passes: u32,
}

impl<'a> MacroRunner<'a> {
    #[must_use]
    pub const fn new(setup: Script<'a>, main: Script<'a>, config: MacroConfig) -> Self {
        Self {
            sequencer: Sequencer::with_config(config.sequencer),
            selector: ScriptSelector::new(setup, main),
            config,
            passes: 0,
        }
    }

    /// Produces the report for one transport opportunity.
    pub fn poll(&mut self) -> Poll {
        let (kind, script) = self.selector.current();
        let frame = self.sequencer.next(script);
        self.selector.observe(kind, &frame);

        let mut completed_pass = None;
        let mut shutdown_requested = false;
        if frame.done && kind == ScriptKind::Main {
            self.passes = self.passes.saturating_add(1);
            completed_pass = Some(self.passes);

            if self
                .config
                .pass_limit
                .is_some_and(|limit| self.passes >= limit)
            {
                shutdown_requested = self.sequencer.request_shutdown();
            }
        }

        Poll {
            script: kind,
            frame,
            completed_pass,
            shutdown_requested,
        }
    }

    /// Requests a graceful shutdown regardless of the pass limit.
    pub fn request_shutdown(&mut self) -> bool {
        self.sequencer.request_shutdown()
    }

    /// Completed main-script passes.
    #[must_use]
    pub const fn passes(&self) -> u32 {
        self.passes
    }

    /// Returns `true` once the sequencer parked in [`Phase::Idle`].
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.sequencer.phase() == Phase::Idle
    }

    #[must_use]
    pub const fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    #[must_use]
    pub const fn selector(&self) -> &ScriptSelector<'a> {
        &self.selector
    }
}
