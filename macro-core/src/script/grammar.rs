//! Parser for the text form of a command script.
//!
//! Scripts are line oriented: each non-blank line names an action and the
//! number of ticks to hold it (`throw, 20`), or the `end` sentinel. `#` starts
//! a comment. The parser composes `winnow` combinators per line and feeds the
//! results into either a bounded `heapless` buffer (firmware) or a growable
//! vector when the `alloc` feature is enabled (host tooling).

use core::fmt;

use heapless::Vec as HeaplessVec;
use winnow::ascii::{dec_int, space0, till_line_ending};
use winnow::combinator::{eof, opt, preceded};
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::take_while;

use super::{Action, Command, END_OF_SCRIPT, MAX_SCRIPT_COMMANDS};

/// Keyword spelling of the sentinel.
pub const END_KEYWORD: &str = "end";

/// Bounded command buffer filled by [`parse_script`].
pub type ScriptBuffer<const N: usize = MAX_SCRIPT_COMMANDS> = HeaplessVec<Command, N>;

/// Failure categories reported by the script parser.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ScriptErrorKind {
    /// Line does not start with an identifier.
    ExpectedAction,
    /// Identifier is not a known action keyword.
    UnknownAction,
    /// Action is not followed by a tick count.
    MissingDuration,
    /// Tick count is not an integer in `0..=32767` (or `-1`).
    InvalidDuration,
    /// Extra input after a complete command.
    TrailingInput,
    /// A command follows the end-of-script sentinel.
    CommandAfterEnd,
    /// Script does not fit in the destination buffer.
    CapacityExceeded,
}

impl fmt::Display for ScriptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ScriptErrorKind::ExpectedAction => "expected an action keyword",
            ScriptErrorKind::UnknownAction => "unknown action",
            ScriptErrorKind::MissingDuration => "missing tick count",
            ScriptErrorKind::InvalidDuration => "invalid tick count",
            ScriptErrorKind::TrailingInput => "unexpected input after command",
            ScriptErrorKind::CommandAfterEnd => "command after `end`",
            ScriptErrorKind::CapacityExceeded => "script exceeds buffer capacity",
        };
        f.write_str(message)
    }
}

/// Parse failure with the 1-based line it occurred on.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScriptError {
    pub line: usize,
    pub kind: ScriptErrorKind,
}

impl ScriptError {
    const fn new(line: usize, kind: ScriptErrorKind) -> Self {
        Self { line, kind }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Entry {
    Command(Command),
    End,
}

/// Parses `text` into a bounded buffer of capacity `N`.
///
/// The result always ends with the sentinel; one is appended when the text
/// does not spell it out.
pub fn parse_script<const N: usize>(text: &str) -> Result<ScriptBuffer<N>, ScriptError> {
    let mut buffer = ScriptBuffer::<N>::new();
    parse_into(text, |command| buffer.push(command).is_ok())?;
    Ok(buffer)
}

/// Parses `text` into a growable vector.
#[cfg(feature = "alloc")]
pub fn parse_script_vec(text: &str) -> Result<alloc::vec::Vec<Command>, ScriptError> {
    let mut commands = alloc::vec::Vec::new();
    parse_into(text, |command| {
        commands.push(command);
        true
    })?;
    Ok(commands)
}

fn parse_into<F>(text: &str, mut push: F) -> Result<(), ScriptError>
where
    F: FnMut(Command) -> bool,
{
    let mut terminated = false;
    let mut last_line = 0;

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        last_line = number;

        let Some(entry) = parse_line(line).map_err(|kind| ScriptError::new(number, kind))? else {
            continue;
        };

        if terminated {
            return Err(ScriptError::new(number, ScriptErrorKind::CommandAfterEnd));
        }

        let command = match entry {
            Entry::Command(command) => command,
            Entry::End => {
                terminated = true;
                Command::end()
            }
        };

        if !push(command) {
            return Err(ScriptError::new(number, ScriptErrorKind::CapacityExceeded));
        }
    }

    if !terminated && !push(Command::end()) {
        return Err(ScriptError::new(
            last_line.max(1),
            ScriptErrorKind::CapacityExceeded,
        ));
    }

    Ok(())
}

fn parse_line(line: &str) -> Result<Option<Entry>, ScriptErrorKind> {
    let mut input = line;

    if line_end.parse_next(&mut input).is_ok() {
        return Ok(None);
    }

    let word = keyword
        .parse_next(&mut input)
        .map_err(|_| ScriptErrorKind::ExpectedAction)?;

    let entry = if word.eq_ignore_ascii_case(END_KEYWORD) {
        Entry::End
    } else {
        let action = Action::from_keyword(word).ok_or(ScriptErrorKind::UnknownAction)?;

        separator.parse_next(&mut input).map_err(|_| ScriptErrorKind::TrailingInput)?;
        let mut lookahead = input;
        if line_end.parse_next(&mut lookahead).is_ok() {
            return Err(ScriptErrorKind::MissingDuration);
        }

        let ticks = ticks
            .parse_next(&mut input)
            .map_err(|_| ScriptErrorKind::InvalidDuration)?;
        duration_entry(action, ticks)?
    };

    line_end
        .parse_next(&mut input)
        .map_err(|_| ScriptErrorKind::TrailingInput)?;

    Ok(Some(entry))
}

fn duration_entry(action: Action, ticks: i32) -> Result<Entry, ScriptErrorKind> {
    if ticks == i32::from(END_OF_SCRIPT) {
        return Ok(Entry::End);
    }

    match i16::try_from(ticks) {
        Ok(duration) if duration >= 0 => Ok(Entry::Command(Command::new(action, duration))),
        _ => Err(ScriptErrorKind::InvalidDuration),
    }
}

fn keyword<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., ('a'..='z', 'A'..='Z', '0'..='9', '-', '_')).parse_next(input)
}

fn separator(input: &mut &str) -> ModalResult<()> {
    (space0, opt(','), space0).void().parse_next(input)
}

fn ticks(input: &mut &str) -> ModalResult<i32> {
    dec_int.parse_next(input)
}

/// Optional whitespace, an optional comment, then the end of the line.
fn line_end(input: &mut &str) -> ModalResult<()> {
    (space0, opt(preceded('#', till_line_ending)), eof)
        .void()
        .parse_next(input)
}
