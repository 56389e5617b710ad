mod session;

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use session::{Session, SessionOptions, write_summary};

const USAGE: &str = "Usage: macro-emulator <script> [--echoes N] [--passes N] [--polls N] \
[--poll-ms N] [--transcript PATH] [--quiet]";

fn main() -> io::Result<()> {
    let (script, options) = parse_args(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdout = io::stdout();
    let mut writer = stdout.lock();

    let mut session = Session::load(&script, options)?;
    writeln!(
        writer,
        "Macro emulator: {} ({} commands)",
        script.display(),
        session.commands().len()
    )?;

    let summary = session.run(&mut writer)?;
    write_summary(&mut writer, &summary)?;
    writer.flush()
}

fn parse_args<I>(args: I) -> Result<(PathBuf, SessionOptions), String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut script = None;
    let mut options = SessionOptions::default();

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg, None),
        };

        match flag.as_str() {
            "--quiet" => options.quiet = true,
            "--echoes" => options.echoes = parse_number(&flag, inline, &mut args)?,
            "--passes" => {
                let passes: u32 = parse_number(&flag, inline, &mut args)?;
                options.pass_limit = (passes > 0).then_some(passes);
            }
            "--polls" => options.max_polls = Some(parse_number(&flag, inline, &mut args)?),
            "--poll-ms" => {
                let millis: u64 = parse_number(&flag, inline, &mut args)?;
                options.poll_interval = Duration::from_millis(millis);
            }
            "--transcript" => {
                options.transcript = Some(PathBuf::from(value_for(&flag, inline, &mut args)?));
            }
            other if other.starts_with("--") => return Err(format!("Unknown option `{other}`")),
            _ if script.is_none() => script = Some(PathBuf::from(flag)),
            _ => return Err(format!("Unexpected argument `{flag}`")),
        }
    }

    let script = script.ok_or_else(|| "Expected a script path".to_string())?;
    if options.pass_limit.is_none() && options.max_polls.is_none() {
        return Err("`--passes 0` needs `--polls` to bound the run".to_string());
    }
    Ok((script, options))
}

fn value_for<I>(flag: &str, inline: Option<String>, args: &mut I) -> Result<String, String>
where
    I: Iterator<Item = String>,
{
    inline
        .or_else(|| args.next())
        .ok_or_else(|| format!("Expected value after {flag}"))
}

fn parse_number<T, I>(flag: &str, inline: Option<String>, args: &mut I) -> Result<T, String>
where
    T: std::str::FromStr,
    I: Iterator<Item = String>,
{
    let value = value_for(flag, inline, args)?;
    value
        .parse()
        .map_err(|_| format!("Invalid number `{value}` for {flag}"))
}
