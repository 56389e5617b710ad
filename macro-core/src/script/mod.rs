//! Command script data shared by firmware and host targets.
//!
//! A script is an ordered, read-only list of [`Command`]s terminated by the
//! [`END_OF_SCRIPT`] sentinel. The built-in setup script lives here; the main
//! script is external data parsed by [`grammar`].

use core::fmt;

pub mod grammar;

pub use grammar::{ScriptError, ScriptErrorKind, parse_script};
#[cfg(feature = "alloc")]
pub use grammar::parse_script_vec;

/// Duration value marking the end of a script.
pub const END_OF_SCRIPT: i16 = -1;

/// Capacity the firmware reserves for the bundled main script.
pub const MAX_SCRIPT_COMMANDS: usize = 512;

/// Symbolic controller action a command holds.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    X,
    Y,
    A,
    B,
    L,
    R,
    Throw,
    Idle,
    Triggers,
}

impl Action {
    /// Every action in declaration order.
    pub const ALL: [Action; 13] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::X,
        Action::Y,
        Action::A,
        Action::B,
        Action::L,
        Action::R,
        Action::Throw,
        Action::Idle,
        Action::Triggers,
    ];

    /// Canonical script keyword for the action.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Action::Up => "up",
            Action::Down => "down",
            Action::Left => "left",
            Action::Right => "right",
            Action::X => "x",
            Action::Y => "y",
            Action::A => "a",
            Action::B => "b",
            Action::L => "l",
            Action::R => "r",
            Action::Throw => "throw",
            Action::Idle => "idle",
            Action::Triggers => "triggers",
        }
    }

    /// Resolves a script keyword (case-insensitive), including the `nothing`
    /// and `sync-triggers` aliases.
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("nothing") {
            return Some(Action::Idle);
        }
        if keyword.eq_ignore_ascii_case("sync-triggers") {
            return Some(Action::Triggers);
        }

        Self::ALL
            .into_iter()
            .find(|action| action.keyword().eq_ignore_ascii_case(keyword))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One scripted step: hold `action` for `duration` ticks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Command {
    pub action: Action,
    pub duration: i16,
}

impl Command {
    #[must_use]
    pub const fn new(action: Action, duration: i16) -> Self {
        Self { action, duration }
    }

    /// Sentinel entry terminating a script.
    #[must_use]
    pub const fn end() -> Self {
        Self {
            action: Action::Idle,
            duration: END_OF_SCRIPT,
        }
    }

    /// Returns `true` for the end-of-script sentinel.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.duration == END_OF_SCRIPT
    }

    /// Number of fresh reports the command occupies before the cursor moves on.
    #[must_use]
    pub fn hold_ticks(&self) -> u32 {
        if self.duration < 0 {
            0
        } else {
            u32::from(self.duration.unsigned_abs()) + 1
        }
    }
}

/// Length-aware, read-only view over a command list.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Script<'a> {
    commands: &'a [Command],
}

impl<'a> Script<'a> {
    #[must_use]
    pub const fn new(commands: &'a [Command]) -> Self {
        Self { commands }
    }

    /// Returns the command at `index`, or `None` past the end of the list.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a Command> {
        self.commands.get(index)
    }

    /// Number of entries, sentinel included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Index of the first sentinel, if the script carries one.
    #[must_use]
    pub fn end_index(&self) -> Option<usize> {
        self.commands.iter().position(Command::is_end)
    }

    /// Commands executed before the script ends.
    #[must_use]
    pub fn actions(&self) -> &'a [Command] {
        let end = self.end_index().unwrap_or(self.commands.len());
        &self.commands[..end]
    }

    /// Fresh reports one full pass of the script takes in the running phase,
    /// excluding the final terminating call.
    #[must_use]
    pub fn pass_ticks(&self) -> u32 {
        self.actions()
            .iter()
            .fold(0u32, |total, command| total.saturating_add(command.hold_ticks()))
    }
}

/// Which of the two system scripts a command stream came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScriptKind {
    Setup,
    Main,
}

impl ScriptKind {
    #[must_use]
    pub const fn as_index(self) -> u16 {
        match self {
            ScriptKind::Setup => 0,
            ScriptKind::Main => 1,
        }
    }

    #[must_use]
    pub const fn from_index(index: u16) -> Option<Self> {
        match index {
            0 => Some(ScriptKind::Setup),
            1 => Some(ScriptKind::Main),
            _ => None,
        }
    }
}

impl fmt::Display for ScriptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptKind::Setup => f.write_str("setup"),
            ScriptKind::Main => f.write_str("main"),
        }
    }
}

/// Idle interval before and after the controller pairing presses.
pub const SETUP_SETTLE_TICKS: i16 = 250;
/// Idle interval between pairing presses.
pub const SETUP_GAP_TICKS: i16 = 150;
/// Hold time for each pairing press.
pub const SETUP_PRESS_TICKS: i16 = 5;

/// Pairing sequence run once at startup: L+R twice to register the pad, then
/// A to close the grip menu.
pub const SETUP_COMMANDS: [Command; 8] = [
    Command::new(Action::Idle, SETUP_SETTLE_TICKS),
    Command::new(Action::Triggers, SETUP_PRESS_TICKS),
    Command::new(Action::Idle, SETUP_GAP_TICKS),
    Command::new(Action::Triggers, SETUP_PRESS_TICKS),
    Command::new(Action::Idle, SETUP_GAP_TICKS),
    Command::new(Action::A, SETUP_PRESS_TICKS),
    Command::new(Action::Idle, SETUP_SETTLE_TICKS),
    Command::end(),
];

/// Built-in setup script.
pub const SETUP_SCRIPT: Script<'static> = Script::new(&SETUP_COMMANDS);

/// Returns the built-in setup script.
#[must_use]
pub const fn setup_script() -> Script<'static> {
    SETUP_SCRIPT
}
