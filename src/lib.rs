//! Deferred command-line flag parsing for a type-keyed dependency container.
//!
//! Components define their own flags in ordinary constructors. The crate
//! rewrites each such constructor so that whatever it returns reaches the
//! rest of the graph only after the flags have been parsed, exactly once.
//!
//! ```
//! use flagdag::{flags, Container, Flag, FlagSet, FlagSetConfig};
//!
//! #[derive(Clone)]
//! struct LogFlags {
//!     level: Flag<String>,
//! }
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct LogLevel(String);
//!
//! let mut container = Container::new();
//! flags::install(&mut container, FlagSetConfig::new("hello")).unwrap();
//! flags::override_arguments(&mut container, ["--log-level=DEBUG"]);
//! flags::provide(&mut container, |fs: FlagSet| LogFlags {
//!     level: fs.string("log-level", "info", "log level"),
//! })
//! .unwrap();
//! container
//!     .provide(|log: LogFlags| LogLevel(log.level.get().to_lowercase()))
//!     .unwrap();
//!
//! let level: LogLevel = container.resolve().unwrap();
//! assert_eq!(level, LogLevel("debug".to_string()));
//! ```
//!
//! Anything that is not a constructor is rejected where it is registered:
//!
//! ```compile_fail
//! use flagdag::{flags, Container};
//!
//! let mut container = Container::new();
//! flags::provide(&mut container, 42).unwrap();
//! ```

pub mod any;
pub mod container;
pub mod core;
pub mod flags;

// Re-exports for convenience
pub use crate::core::config::FlagSetConfig;
pub use crate::core::errors::{FlagDagError, Result};
pub use container::{
    Constructor, Container, Dependency, ErasedConstructor, Group, Grouped, Key, Many, Outputs,
    TryConstructor,
};
pub use flags::{Arguments, EntryId, EntryRef, Flag, FlagError, FlagSet, NodePair, Parsed};
