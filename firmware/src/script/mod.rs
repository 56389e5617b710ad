#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Main script bundled into the image and the runner configuration built
//! around it.
//!
//! `scripts/main.script` is compiled in with `include_str!` and parsed once at
//! startup into a fixed-capacity buffer, so swapping the macro only needs a
//! rebuild of the firmware, not a change to the sequencer.

use macro_core::runner::MacroConfig;
use macro_core::script::grammar::ScriptBuffer;
use macro_core::script::{MAX_SCRIPT_COMMANDS, ScriptError, parse_script};
use macro_core::sequencer::SequencerConfig;

/// Text of the bundled main script.
pub const MAIN_SCRIPT_SOURCE: &str = include_str!("../../scripts/main.script");

/// Buffer holding the parsed main script.
pub type MainScript = ScriptBuffer<MAX_SCRIPT_COMMANDS>;

/// Completed passes before the alert build parks the sequencer.
#[cfg(feature = "alert-when-done")]
pub const PASS_LIMIT: Option<u32> = Some(1);
#[cfg(not(feature = "alert-when-done"))]
pub const PASS_LIMIT: Option<u32> = None;

/// Parses the bundled main script.
pub fn parse_main_script() -> Result<MainScript, ScriptError> {
    parse_script(MAIN_SCRIPT_SOURCE)
}

/// Runner configuration for this build.
pub const fn macro_config() -> MacroConfig {
    MacroConfig::new(
        SequencerConfig::new(macro_core::sequencer::DEFAULT_ECHOES),
        PASS_LIMIT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use macro_core::script::Script;

    #[test]
    fn bundled_script_parses_and_terminates() {
        let commands = parse_main_script().expect("bundled script parses");
        let script = Script::new(&commands);

        assert_eq!(script.end_index(), Some(commands.len() - 1));
        assert!(!script.actions().is_empty());
        assert!(script.pass_ticks() > 0);
    }

    #[test]
    fn config_matches_feature_set() {
        let config = macro_config();
        assert_eq!(config.sequencer.echoes, 2);
        assert_eq!(config.pass_limit, PASS_LIMIT);
    }
}
