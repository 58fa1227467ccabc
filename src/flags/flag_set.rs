//! The option registry the barrier parses, backed by clap.

use crate::core::config::FlagSetConfig;
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use parking_lot::{Mutex, RwLock};
use std::ffi::OsString;
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Id of the hidden argument that soaks up positional tokens.
const POSITIONAL: &str = "__positional";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FlagError {
    #[error("flag redefined: {name}")]
    Redefined { name: String },
    #[error("invalid flag name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },
    #[error("help requested")]
    Help { usage: String },
    #[error("{message}")]
    Invalid { kind: ErrorKind, message: String },
}

impl FlagError {
    fn from_clap(err: clap::Error) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::DisplayHelp {
            return Self::Help {
                usage: err.to_string(),
            };
        }
        let rendered = err.to_string();
        let message = rendered
            .lines()
            .next()
            .unwrap_or_default()
            .trim_start_matches("error: ")
            .to_string();
        Self::Invalid { kind, message }
    }
}

/// Handle to one flag's value.
///
/// Holds the default until the owning [`FlagSet`] parses successfully, then
/// whatever the arguments said.
pub struct Flag<T> {
    name: Arc<str>,
    value: Arc<RwLock<T>>,
}

impl<T> Flag<T> {
    fn new(name: &str, default: T) -> Self {
        Self {
            name: Arc::from(name),
            value: Arc::new(RwLock::new(default)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Clone> Flag<T> {
    pub fn get(&self) -> T {
        self.value.read().clone()
    }
}

impl<T> Clone for Flag<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T: Debug> Debug for Flag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.name)
            .field("value", &*self.value.read())
            .finish()
    }
}

type Apply = Box<dyn Fn(&ArgMatches) + Send + Sync>;

struct FlagSpec {
    name: String,
    arg: Arg,
    apply: Apply,
}

struct FlagSetInner {
    config: FlagSetConfig,
    specs: Vec<FlagSpec>,
    definition_errors: Vec<FlagError>,
    parsed: bool,
    positional: Vec<String>,
}

impl FlagSetInner {
    fn check_name(&self, name: &str) -> Result<(), FlagError> {
        let invalid = |reason| FlagError::InvalidName {
            name: name.to_string(),
            reason,
        };
        if name.is_empty() {
            return Err(invalid("empty"));
        }
        if name.starts_with('-') {
            return Err(invalid("starts with '-'"));
        }
        if name.contains('=') {
            return Err(invalid("contains '='"));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }
        if name.starts_with("__") {
            return Err(invalid("names starting with '__' are reserved"));
        }
        let taken_by_help = name == "help" && !self.config.disable_help_flag;
        if taken_by_help || self.specs.iter().any(|spec| spec.name == name) {
            return Err(FlagError::Redefined {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn command(&self) -> Command {
        let positional = Arg::new(POSITIONAL)
            .num_args(0..)
            .action(ArgAction::Append)
            .trailing_var_arg(true)
            .value_parser(clap::value_parser!(String))
            .hide(true);

        let mut command = Command::new(self.config.name.clone())
            .no_binary_name(true)
            .args_override_self(true)
            .disable_version_flag(true)
            .disable_help_flag(self.config.disable_help_flag)
            .args(self.specs.iter().map(|spec| spec.arg.clone()))
            .arg(positional);
        if let Some(about) = &self.config.about {
            command = command.about(about.clone());
        }
        command
    }
}

/// A set of named flags that is parsed at most once.
///
/// Cloning gives another handle to the same set.
#[derive(Clone)]
pub struct FlagSet {
    inner: Arc<Mutex<FlagSetInner>>,
}

impl Default for FlagSet {
    fn default() -> Self {
        Self::new(FlagSetConfig::default())
    }
}

impl FlagSet {
    pub fn new(config: FlagSetConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FlagSetInner {
                config,
                specs: Vec::new(),
                definition_errors: Vec::new(),
                parsed: false,
                positional: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.lock().config.name.clone()
    }

    /// Define a flag of any type that parses from a string.
    pub fn value<T>(&self, name: &str, default: T, usage: &str) -> Flag<T>
    where
        T: FromStr + Clone + Debug + Send + Sync + 'static,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let arg = Arg::new(name.to_string())
            .long(name.to_string())
            .value_name("VALUE")
            .help(describe(usage, &default))
            .action(ArgAction::Set)
            .allow_negative_numbers(true)
            .value_parser(|raw: &str| raw.parse::<T>());
        self.define(name, default, arg)
    }

    /// Define a boolean flag. `--name` sets it, `--name=false` clears it.
    pub fn bool(&self, name: &str, default: bool, usage: &str) -> Flag<bool> {
        let arg = Arg::new(name.to_string())
            .long(name.to_string())
            .help(describe(usage, &default))
            .action(ArgAction::Set)
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_parser(clap::value_parser!(bool));
        self.define(name, default, arg)
    }

    pub fn string(&self, name: &str, default: impl Into<String>, usage: &str) -> Flag<String> {
        self.value(name, default.into(), usage)
    }

    pub fn int(&self, name: &str, default: i64, usage: &str) -> Flag<i64> {
        self.value(name, default, usage)
    }

    pub fn uint(&self, name: &str, default: u64, usage: &str) -> Flag<u64> {
        self.value(name, default, usage)
    }

    pub fn float(&self, name: &str, default: f64, usage: &str) -> Flag<f64> {
        self.value(name, default, usage)
    }

    fn define<T>(&self, name: &str, default: T, arg: Arg) -> Flag<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let flag = Flag::new(name, default);
        let mut inner = self.inner.lock();
        if let Err(err) = inner.check_name(name) {
            // Reported by the next parse so constructors stay infallible.
            warn!(flag = name, "{}", err);
            inner.definition_errors.push(err);
            return flag;
        }

        let id = name.to_string();
        let value = flag.value.clone();
        let apply: Apply = Box::new(move |matches: &ArgMatches| {
            if matches.value_source(&id) != Some(ValueSource::CommandLine) {
                return;
            }
            if let Some(parsed) = matches.get_one::<T>(&id) {
                *value.write() = parsed.clone();
            }
        });
        debug!(flag = name, "defined flag");
        inner.specs.push(FlagSpec {
            name: name.to_string(),
            arg,
            apply,
        });
        flag
    }

    /// Names of every defined flag, in definition order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .lock()
            .specs
            .iter()
            .map(|spec| spec.name.clone())
            .collect()
    }

    /// Parse `args` (without the program name) into the defined flags.
    ///
    /// The set counts as parsed from the moment this is called, even when
    /// parsing fails.
    pub fn parse<I, S>(&self, args: I) -> Result<(), FlagError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString> + Clone,
    {
        let mut inner = self.inner.lock();
        inner.parsed = true;
        if let Some(err) = inner.definition_errors.first() {
            return Err(err.clone());
        }

        let matches = inner
            .command()
            .try_get_matches_from(args)
            .map_err(FlagError::from_clap)?;
        for spec in &inner.specs {
            (spec.apply)(&matches);
        }
        inner.positional = matches
            .get_many::<String>(POSITIONAL)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        debug!(
            flags = inner.specs.len(),
            positional = inner.positional.len(),
            "parsed flags"
        );
        Ok(())
    }

    pub fn is_parsed(&self) -> bool {
        self.inner.lock().parsed
    }

    /// Tokens left over after the flags, e.g. everything after `--`.
    pub fn args(&self) -> Vec<String> {
        self.inner.lock().positional.clone()
    }

    /// Rendered help text for the current set of flags.
    pub fn usage(&self) -> String {
        self.inner.lock().command().render_help().to_string()
    }
}

impl Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("FlagSet")
            .field("name", &inner.config.name)
            .field("flags", &inner.specs.len())
            .field("parsed", &inner.parsed)
            .finish()
    }
}

fn describe<T: Debug>(usage: &str, default: &T) -> String {
    format!("{} (default {:?})", usage, default)
}

/// The raw tokens the barrier parses.
///
/// Kept as [`OsString`]s; tokens that are not valid UTF-8 are rejected by the
/// parse, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments(Vec<OsString>);

impl Arguments {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self(args.into_iter().map(Into::into).collect())
    }

    /// Process arguments without the program name.
    pub fn from_env() -> Self {
        Self(std::env::args_os().skip(1).collect())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OsString> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[OsString] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for Arguments {
    fn from(args: Vec<String>) -> Self {
        Self::new(args)
    }
}

impl From<Vec<OsString>> for Arguments {
    fn from(args: Vec<OsString>) -> Self {
        Self(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flag_set() -> FlagSet {
        FlagSet::new(FlagSetConfig::new("test"))
    }

    #[test]
    fn test_defaults_hold_without_arguments() {
        let fs = flag_set();
        let level = fs.string("level", "info", "log level");
        let port = fs.uint("port", 8080, "listen port");
        fs.parse(Vec::<String>::new()).unwrap();
        assert_eq!(level.get(), "info");
        assert_eq!(port.get(), 8080);
    }

    #[test]
    fn test_equals_and_separate_value_forms() {
        let fs = flag_set();
        let level = fs.string("level", "info", "log level");
        let retries = fs.int("retries", 3, "retry count");
        let port = fs.uint("port", 80, "listen port");
        fs.parse(["--level=debug", "--retries=-1", "--port", "8080"]).unwrap();
        assert_eq!(level.get(), "debug");
        assert_eq!(retries.get(), -1);
        assert_eq!(port.get(), 8080);
    }

    #[test]
    fn test_bool_flags() {
        let fs = flag_set();
        let verbose = fs.bool("verbose", false, "chatty output");
        let color = fs.bool("color", true, "colored output");
        fs.parse(["--verbose", "--color=false"]).unwrap();
        assert!(verbose.get());
        assert!(!color.get());
    }

    #[test]
    fn test_last_occurrence_wins() {
        let fs = flag_set();
        let level = fs.string("level", "info", "log level");
        fs.parse(["--level=warn", "--level=error"]).unwrap();
        assert_eq!(level.get(), "error");
    }

    #[test]
    fn test_unknown_flag_rejected() {
        let fs = flag_set();
        let _ = fs.string("level", "info", "log level");
        let err = fs.parse(["--nope"]).unwrap_err();
        match err {
            FlagError::Invalid { kind, .. } => assert_eq!(kind, ErrorKind::UnknownArgument),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(fs.is_parsed());
    }

    #[test]
    fn test_malformed_value_rejected() {
        let fs = flag_set();
        let port = fs.uint("port", 8080, "listen port");
        assert!(fs.parse(["--port=eighty"]).is_err());
        assert_eq!(port.get(), 8080);
    }

    #[test]
    fn test_positional_arguments_kept() {
        let fs = flag_set();
        let level = fs.string("level", "info", "log level");
        fs.parse(["--level=debug", "--", "serve", "--level=ignored"]).unwrap();
        assert_eq!(level.get(), "debug");
        assert_eq!(fs.args(), vec!["serve", "--level=ignored"]);
    }

    #[test]
    fn test_redefinition_reported_at_parse() {
        let fs = flag_set();
        let _ = fs.string("level", "info", "log level");
        let _ = fs.string("level", "warn", "log level again");
        assert_eq!(
            fs.parse(Vec::<String>::new()).unwrap_err(),
            FlagError::Redefined {
                name: "level".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_names_rejected() {
        let fs = flag_set();
        let _ = fs.string("a=b", "", "bad");
        assert!(matches!(
            fs.parse(Vec::<String>::new()),
            Err(FlagError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_help_flag() {
        let fs = flag_set();
        let _ = fs.string("level", "info", "log level");
        match fs.parse(["--help"]).unwrap_err() {
            FlagError::Help { usage } => assert!(usage.contains("--level")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_usage_lists_flags_and_defaults() {
        let fs = FlagSet::new(FlagSetConfig::new("test").with_about("does things"));
        let _ = fs.string("level", "info", "log level");
        let usage = fs.usage();
        assert!(usage.contains("does things"));
        assert!(usage.contains("--level"));
        assert!(usage.contains("(default \"info\")"));
    }

    #[test]
    fn test_custom_value_type() {
        let fs = flag_set();
        let path = fs.value("config", std::path::PathBuf::from("app.yaml"), "config file");
        fs.parse(["--config", "/etc/app.yaml"]).unwrap();
        assert_eq!(path.get(), std::path::PathBuf::from("/etc/app.yaml"));
        assert_eq!(fs.names(), vec!["config"]);
    }

    #[cfg(unix)]
    fn invalid_utf8(prefix: &str) -> OsString {
        use std::os::unix::ffi::OsStringExt;
        let mut bytes = prefix.as_bytes().to_vec();
        bytes.push(0xff);
        OsString::from_vec(bytes)
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_tokens_are_parse_errors() {
        let fs = flag_set();
        let level = fs.string("level", "info", "log level");
        let err = fs.parse([invalid_utf8("--level=")]).unwrap_err();
        assert!(matches!(err, FlagError::Invalid { .. }), "got {err:?}");
        assert_eq!(level.get(), "info");

        let fs = flag_set();
        let err = fs.parse([invalid_utf8("")]).unwrap_err();
        assert!(matches!(err, FlagError::Invalid { .. }), "got {err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_arguments_keep_raw_tokens() {
        let args = Arguments::new([OsString::from("--level=debug"), invalid_utf8("x")]);
        assert_eq!(args.len(), 2);
        assert_eq!(args.as_slice()[1], invalid_utf8("x"));
        assert_eq!(
            Arguments::from(vec!["--a".to_string()]),
            Arguments::new(["--a"])
        );
    }
}
