use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::style::Stylize;
use macro_core::report::ControllerReport;
use macro_core::runner::{MacroConfig, MacroRunner, Poll};
use macro_core::script::{Command, Script, ScriptKind, parse_script_vec, setup_script};
use macro_core::sequencer::{DEFAULT_ECHOES, SequencerConfig, Transition};
use macro_core::telemetry::{
    TelemetryEventKind, TelemetryInstant, TelemetryPayload, TelemetryRecorder,
};

/// Events kept for the end-of-run summary.
const SUMMARY_CAPACITY: usize = 256;

/// Simulated host poll clock, in microseconds since the session started.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct PollTick(u64);

impl PollTick {
    pub fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    pub fn elapsed(self) -> Duration {
        Duration::from_micros(self.0)
    }
}

impl TelemetryInstant for PollTick {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

/// Options controlling a replay run.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub echoes: u8,
    /// Main passes before a graceful shutdown; `None` loops until `max_polls`.
    pub pass_limit: Option<u32>,
    pub max_polls: Option<u64>,
    pub poll_interval: Duration,
    pub transcript: Option<PathBuf>,
    pub quiet: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            echoes: DEFAULT_ECHOES,
            pass_limit: Some(1),
            max_polls: None,
            poll_interval: Duration::from_millis(1),
            transcript: None,
            quiet: false,
        }
    }
}

impl SessionOptions {
    fn macro_config(&self) -> MacroConfig {
        MacroConfig::new(SequencerConfig::new(self.echoes), self.pass_limit)
    }
}

/// Outcome of [`Session::run`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    pub polls: u64,
    pub fresh_reports: u64,
    pub passes: u32,
    pub finished: bool,
    pub elapsed: Duration,
    pub events_recorded: u32,
    /// Main passes with their duration, oldest first.
    pub pass_durations: Vec<(u32, Option<Duration>)>,
}

/// Replays a main script through the shared runner on a simulated poll clock.
pub struct Session {
    label: String,
    commands: Vec<Command>,
    options: SessionOptions,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    /// Reads and parses the script at `path`.
    pub fn load(path: &Path, options: SessionOptions) -> io::Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_source(&path.display().to_string(), &source, options)
    }

    /// Parses `source`; `label` names it in errors and transcripts.
    pub fn from_source(label: &str, source: &str, options: SessionOptions) -> io::Result<Self> {
        let commands = parse_script_vec(source).map_err(|err| {
            io::Error::new(io::ErrorKind::InvalidData, format!("{label}: {err}"))
        })?;

        let transcript = match &options.transcript {
            Some(path) => Some(TranscriptLogger::new(path, label)?),
            None => None,
        };

        Ok(Self {
            label: label.to_string(),
            commands,
            options,
            transcript,
        })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Runs until the runner idles or the poll cap is hit, printing one line
    /// per fresh report to `out` unless the session is quiet.
    pub fn run<W: Write>(&mut self, out: &mut W) -> io::Result<RunSummary> {
        let main = Script::new(&self.commands);
        let mut runner = MacroRunner::new(setup_script(), main, self.options.macro_config());
        let mut telemetry = TelemetryRecorder::<PollTick, SUMMARY_CAPACITY>::new();
        let step = u64::try_from(self.options.poll_interval.as_micros()).unwrap_or(u64::MAX);

        if let Some(transcript) = self.transcript.as_mut() {
            let line = format!(
                "run {} commands={} ticks/pass={} echoes={} passes={}",
                self.label,
                main.actions().len(),
                main.pass_ticks(),
                self.options.echoes,
                describe_limit(self.options.pass_limit),
            );
            transcript.append_line(Duration::ZERO, TranscriptRole::Host, &line)?;
        }

        let mut summary = RunSummary::default();
        let mut now = PollTick::default();

        while self
            .options
            .max_polls
            .is_none_or(|limit| summary.polls < limit)
        {
            now = PollTick::from_micros(summary.polls.saturating_mul(step));
            let poll = runner.poll();
            summary.polls += 1;
            telemetry.record_poll(&poll, now);

            if !poll.frame.echoed {
                summary.fresh_reports += 1;
                let line = describe_poll(&poll, summary.polls);
                if let Some(transcript) = self.transcript.as_mut() {
                    transcript.append_line(now.elapsed(), TranscriptRole::Emulator, &line)?;
                }
                if !self.options.quiet {
                    write_styled(out, now.elapsed(), &poll, &line)?;
                }
            }

            if runner.is_finished() {
                summary.finished = true;
                break;
            }
        }

        summary.passes = runner.passes();
        summary.elapsed = now.elapsed();
        summary.events_recorded = telemetry.total_recorded();
        summary.pass_durations = telemetry
            .oldest_first()
            .filter(|record| {
                record.event == TelemetryEventKind::ScriptCompleted(ScriptKind::Main)
            })
            .filter_map(|record| match record.details {
                TelemetryPayload::Pass(pass) => Some((pass.number, pass.elapsed)),
                _ => None,
            })
            .collect();

        if let Some(transcript) = self.transcript.as_mut() {
            let line = format!(
                "summary polls={} fresh={} passes={} finished={}",
                summary.polls, summary.fresh_reports, summary.passes, summary.finished
            );
            transcript.append_line(summary.elapsed, TranscriptRole::Emulator, &line)?;
        }

        Ok(summary)
    }
}

/// Prints the end-of-run summary.
pub fn write_summary<W: Write>(out: &mut W, summary: &RunSummary) -> io::Result<()> {
    let status = if summary.finished {
        "idle".green()
    } else {
        "stopped".yellow()
    };
    writeln!(
        out,
        "{} after {} polls ({} fresh) in {}",
        status,
        summary.polls,
        summary.fresh_reports,
        format_duration_short(summary.elapsed)
    )?;
    writeln!(
        out,
        "passes={} telemetry-events={}",
        summary.passes, summary.events_recorded
    )?;
    for (number, elapsed) in &summary.pass_durations {
        let elapsed = elapsed.map_or_else(|| "?".to_string(), format_duration_short);
        writeln!(out, "  pass {number}: {elapsed}")?;
    }
    Ok(())
}

fn write_styled<W: Write>(
    out: &mut W,
    elapsed: Duration,
    poll: &Poll,
    line: &str,
) -> io::Result<()> {
    let stamp = format!("[+{:>6} ms]", elapsed.as_millis()).dark_grey();
    if poll.frame.done {
        writeln!(out, "{stamp} {}", line.green())
    } else if matches!(poll.frame.transition, Some(Transition::Drained)) {
        writeln!(out, "{stamp} {}", line.yellow())
    } else if poll.frame.report.is_neutral() {
        writeln!(out, "{stamp} {}", line.dark_grey())
    } else {
        writeln!(out, "{stamp} {line}")
    }
}

fn describe_poll(poll: &Poll, index: u64) -> String {
    let mut line = format!(
        "#{index:06} {:<5} {}",
        poll.script.to_string(),
        describe_report(&poll.frame.report)
    );
    if let Some(transition) = poll.frame.transition {
        line.push_str("  ");
        line.push_str(&describe_transition(transition));
    }
    if poll.frame.done {
        line.push_str(" done");
    }
    if let Some(pass) = poll.completed_pass {
        line.push_str(&format!(" pass={pass}"));
    }
    if poll.shutdown_requested {
        line.push_str(" shutdown");
    }
    line
}

fn describe_report(report: &ControllerReport) -> String {
    let bytes = report.to_bytes();
    let hex: Vec<String> = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
    format!("{} [{}]", report, hex.join(" "))
}

fn describe_transition(transition: Transition) -> String {
    match transition {
        Transition::Primed => "primed".to_string(),
        Transition::ScriptStarted => "started".to_string(),
        Transition::CommandAdvanced { index, action } => format!("advanced {index}:{action}"),
        Transition::ScriptCompleted => "completed".to_string(),
        Transition::Drained => "drained".to_string(),
    }
}

fn describe_limit(limit: Option<u32>) -> String {
    limit.map_or_else(|| "unlimited".to_string(), |value| value.to_string())
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, label: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(label)?;
        Ok(logger)
    }

    fn write_header(&mut self, label: &str) -> io::Result<()> {
        writeln!(self.writer, "# Macro emulator transcript for {label}")?;
        writeln!(
            self.writer,
            "# Timestamps are simulated milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

fn format_duration_short(duration: Duration) -> String {
    if duration.as_secs() == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.3}s", duration.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet(pass_limit: Option<u32>) -> SessionOptions {
        SessionOptions {
            pass_limit,
            quiet: true,
            ..SessionOptions::default()
        }
    }

    #[test]
    fn runs_to_idle_after_pass_limit() {
        let mut session =
            Session::from_source("inline", "a 2\nb 1\n", quiet(Some(2))).expect("parses");
        let mut out = Vec::new();
        let summary = session.run(&mut out).expect("run succeeds");

        assert!(summary.finished);
        assert_eq!(summary.passes, 2);
        assert_eq!(summary.pass_durations.len(), 2);
        assert!(out.is_empty());

        // Every third poll is fresh with the default echo count.
        assert_eq!(summary.fresh_reports, summary.polls.div_ceil(3));
    }

    #[test]
    fn poll_cap_stops_unbounded_run() {
        let mut options = quiet(None);
        options.max_polls = Some(300);
        let mut session = Session::from_source("inline", "up 1", options).expect("parses");
        let summary = session.run(&mut io::sink()).expect("run succeeds");

        assert!(!summary.finished);
        assert_eq!(summary.polls, 300);
        assert_eq!(summary.elapsed, Duration::from_millis(299));
    }

    #[test]
    fn parse_errors_name_the_source() {
        let err = match Session::from_source("bad.script", "a 1\nhop 2\n", quiet(None)) {
            Ok(_) => panic!("script should be rejected"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(err.to_string(), "bad.script: line 2: unknown action");
    }

    #[test]
    fn prints_fresh_reports_only() {
        let options = SessionOptions {
            echoes: 0,
            pass_limit: Some(1),
            ..SessionOptions::default()
        };
        let mut session = Session::from_source("inline", "x 0", options).expect("parses");
        let mut out = Vec::new();
        let summary = session.run(&mut out).expect("run succeeds");

        let printed = String::from_utf8(out).expect("utf8 output");
        assert_eq!(printed.lines().count() as u64, summary.fresh_reports);
        assert!(printed.contains("advanced 0:x"));
        assert!(printed.contains("pass=1"));
    }

    #[test]
    fn describes_report_bytes() {
        let line = describe_report(&ControllerReport::neutral());
        assert!(line.ends_with("[00 00 08 80 80 80 80 00]"));
    }
}
