use std::io;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, SessionOptions, write_summary};

/// Main script bundled into the firmware image.
const FIRMWARE_MAIN_SCRIPT: &str = include_str!("../../../firmware/scripts/main.script");

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TranscriptProfile {
    /// Pairing sequence followed by an empty main script.
    Pairing,
    /// Pairing sequence followed by one pass of the bundled main script.
    FirmwareMain,
}

impl TranscriptProfile {
    fn label(self) -> &'static str {
        match self {
            TranscriptProfile::Pairing => "pairing",
            TranscriptProfile::FirmwareMain => "firmware/scripts/main.script",
        }
    }

    fn source(self) -> &'static str {
        match self {
            TranscriptProfile::Pairing => "end\n",
            TranscriptProfile::FirmwareMain => FIRMWARE_MAIN_SCRIPT,
        }
    }

    fn log_path(self) -> PathBuf {
        let name = match self {
            TranscriptProfile::Pairing => "pairing.log",
            TranscriptProfile::FirmwareMain => "firmware-main.log",
        };
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("transcripts")
            .join(name)
    }
}

fn main() -> io::Result<()> {
    record_profile(TranscriptProfile::Pairing)?;
    record_profile(TranscriptProfile::FirmwareMain)?;
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let path = profile.log_path();
    let options = SessionOptions {
        pass_limit: Some(1),
        transcript: Some(path.clone()),
        quiet: true,
        ..SessionOptions::default()
    };

    let mut session = Session::from_source(profile.label(), profile.source(), options)?;
    let summary = session.run(&mut io::sink())?;

    println!("{} -> {}", profile.label(), path.display());
    write_summary(&mut io::stdout().lock(), &summary)
}
