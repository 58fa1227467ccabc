//! Deferred flag parsing on top of the container
//!
//! Constructors registered through [`provide`] are split in two: a capture
//! node that only records their inputs, and a release node that hands out
//! their outputs once the barrier has run every constructor and parsed the
//! flags exactly once.

pub mod barrier;
pub mod entry;
pub mod flag_set;
pub mod module;
pub mod splitter;

pub use barrier::{parse_entries, BARRIER};
pub use entry::{Entry, EntryId, EntryRef, Parsed};
pub use flag_set::{Arguments, Flag, FlagError, FlagSet};
pub use module::{
    install, override_arguments, override_flag_set, provide, register, register_all, try_provide,
    NodePair,
};
pub use splitter::{split, Split};
