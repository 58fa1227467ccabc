//! Two components defining their own flags, wired through one container.
//!
//! ```text
//! cargo run --example hello -- --log-level=DEBUG
//! cargo run --example hello -- --version
//! ```

use anyhow::Result;
use flagdag::{flags, Container, Flag, FlagDagError, FlagError, FlagSet, FlagSetConfig};
use tracing::info;

#[derive(Clone, Debug)]
struct LogFlags {
    level: Flag<String>,
}

#[derive(Clone, Debug, PartialEq)]
struct LogLevel(String);

#[derive(Clone, Debug)]
struct VersionFlags {
    show: Flag<bool>,
}

#[derive(Clone, Debug)]
struct Version(&'static str);

fn log_flags(fs: FlagSet) -> LogFlags {
    LogFlags {
        level: fs.string("log-level", "INFO", "log level"),
    }
}

fn version_flags(fs: FlagSet) -> VersionFlags {
    VersionFlags {
        show: fs.bool("version", false, "print the version and exit"),
    }
}

fn build() -> Result<Container> {
    let mut container = Container::new();
    flags::install(
        &mut container,
        FlagSetConfig::new("hello").with_about("flagdag demo"),
    )?;
    flags::provide(&mut container, log_flags)?;
    flags::provide(&mut container, version_flags)?;
    container
        .supply(Version("unknown"))?
        .provide(|log: LogFlags| LogLevel(log.level.get().to_lowercase()))?;
    // Release builds would stamp the real version here.
    container.replace(Version("v0.1.0"));
    container.validate()?;
    Ok(container)
}

fn run(container: &mut Container) -> flagdag::Result<()> {
    let version: VersionFlags = container.resolve()?;
    if version.show.get() {
        let v: Version = container.resolve()?;
        println!("hello {}", v.0);
        return Ok(());
    }

    let level: LogLevel = container.resolve()?;
    info!(level = %level.0, "hello started");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut container = build()?;
    match run(&mut container) {
        Ok(()) => Ok(()),
        Err(FlagDagError::Parse {
            source: Some(FlagError::Help { usage }),
            ..
        }) => {
            println!("{usage}");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
