//! Command-line argument resolution.
//!
//! Flags use single-dash long names (`-maxTokens 200`, `-c`), and parsing stops at the first
//! positional argument.  The positional arguments, joined with spaces, are the message; a lone
//! `-` reads the message from standard input instead.

use std::fmt;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::str::FromStr;

use getopts::{Matches, Options, ParsingStyle};

/// Default maximum tokens per response.
pub const DEFAULT_MAX_TOKENS: u32 = 500;

/// Message argument that means "read the prompt from stdin".
const STDIN_MESSAGE: &str = "-";

/// Resolved command-line parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
    /// System message to include with the prompt.
    pub system_msg: Option<String>,
    /// File whose contents are sent as a second user message.
    pub include_file: Option<PathBuf>,
    /// Sampling temperature; the server default applies when unset.
    pub temperature: Option<f32>,
    /// Continue the last session.
    pub continue_session: bool,
    /// The prompt.
    pub msg: String,
}

impl Params {
    /// Parameters with default flags and the given message.
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            system_msg: None,
            include_file: None,
            temperature: None,
            continue_session: false,
            msg: msg.into(),
        }
    }
}

/// Why argument resolution did not produce [`Params`].
#[derive(Debug)]
pub enum ArgsError {
    /// `-h` or `-help` was given.
    Help,
    /// No message was supplied.
    MissingMessage,
    /// A flag or flag value could not be parsed.
    Invalid(String),
    /// The message could not be read from standard input.
    Stdin(io::Error),
}

impl ArgsError {
    /// The process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            ArgsError::Help => 0,
            ArgsError::Invalid(_) => 2,
            ArgsError::MissingMessage | ArgsError::Stdin(_) => 1,
        }
    }

    /// Whether usage text should accompany this error.
    pub fn wants_usage(&self) -> bool {
        !matches!(self, ArgsError::Stdin(_))
    }
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::Help => write!(f, "help requested"),
            ArgsError::MissingMessage => write!(f, "no message given"),
            ArgsError::Invalid(message) => write!(f, "{message}"),
            ArgsError::Stdin(err) => write!(f, "failed to read message from stdin: {err}"),
        }
    }
}

impl std::error::Error for ArgsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArgsError::Stdin(err) => Some(err),
            _ => None,
        }
    }
}

// Every flag may be repeated; the last value wins.
fn options() -> Options {
    let mut opts = Options::new();
    opts.long_only(true)
        .parsing_style(ParsingStyle::StopAtFirstFree)
        .optmulti(
            "",
            "maxTokens",
            "Maximum number of tokens to generate (default 500, 0 for no limit)",
            "INT",
        )
        .optmulti(
            "",
            "systemMsg",
            "System message to include with the prompt",
            "STRING",
        )
        .optmulti("", "includeFile", "File to include with the prompt", "PATH")
        .optmulti("", "temperature", "Sampling temperature", "FLOAT")
        .optflagmulti("c", "", "Continue last session (ignores other flags)")
        .optflagmulti("h", "help", "Print this help");
    opts
}

/// Usage text for `program`.
pub fn usage(program: &str) -> String {
    let brief = format!("Usage: {program} [options] message");
    options().usage(&brief)
}

/// Resolve `args` (without the program name) into [`Params`].
///
/// `stdin` is read only when the message is exactly `-`.
pub fn parse_args<R: BufRead>(args: &[String], stdin: R) -> Result<Params, ArgsError> {
    let matches = options()
        .parse(args)
        .map_err(|err| ArgsError::Invalid(err.to_string()))?;
    if matches.opt_present("h") {
        return Err(ArgsError::Help);
    }

    let max_tokens = parse_last(&matches, "maxTokens")?.unwrap_or(DEFAULT_MAX_TOKENS);
    let temperature = parse_last::<f32>(&matches, "temperature")?;
    let system_msg = last(&matches, "systemMsg").filter(|msg| !msg.is_empty());
    let include_file = last(&matches, "includeFile")
        .filter(|path| !path.is_empty())
        .map(PathBuf::from);

    let mut msg = matches.free.join(" ").trim().to_string();
    if msg.is_empty() {
        return Err(ArgsError::MissingMessage);
    }
    if msg == STDIN_MESSAGE {
        msg = read_message(stdin).map_err(ArgsError::Stdin)?;
    }

    Ok(Params {
        max_tokens,
        system_msg,
        include_file,
        temperature,
        continue_session: matches.opt_present("c"),
        msg,
    })
}

fn last(matches: &Matches, flag: &str) -> Option<String> {
    matches.opt_strs(flag).pop()
}

fn parse_last<T>(matches: &Matches, flag: &str) -> Result<Option<T>, ArgsError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    last(matches, flag)
        .map(|value| {
            value.parse::<T>().map_err(|err| {
                ArgsError::Invalid(format!("invalid value {value:?} for flag -{flag}: {err}"))
            })
        })
        .transpose()
}

fn read_message<R: BufRead>(stdin: R) -> io::Result<String> {
    let mut msg = String::new();
    for line in stdin.lines() {
        msg.push_str(&line?);
        msg.push('\n');
    }
    Ok(msg)
}
