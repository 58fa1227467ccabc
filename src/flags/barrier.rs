use crate::container::{ErasedConstructor, Group, TryConstructor};
use crate::core::errors::{FlagDagError, Result};
use crate::flags::entry::{EntryRef, Parsed};
use crate::flags::flag_set::{Arguments, FlagSet};
use std::collections::HashMap;
use tracing::{debug, error, info};

/// Provider name of the barrier node.
pub const BARRIER: &str = "flagdag::parse";

pub(crate) fn barrier() -> ErasedConstructor {
    TryConstructor::into_erased(parse_entries).with_name(BARRIER)
}

/// Run every deferred constructor, then parse the flags they defined.
///
/// Constructors run first so that all of their flags exist before parsing.
/// When `flag_set` was already parsed elsewhere, parsing is skipped but the
/// constructors still run so their outputs are available. A parse error
/// fails the whole barrier: no [`Parsed`] is produced.
pub fn parse_entries(
    flag_set: FlagSet,
    arguments: Arguments,
    entries: Group<EntryRef>,
) -> Result<Parsed> {
    info!(entries = entries.len(), flag_set = %flag_set.name(), "running flag barrier");

    let mut outputs = HashMap::with_capacity(entries.len());
    for entry in entries {
        debug!(entry = %entry.id(), constructor = entry.name(), "invoking deferred constructor");
        let values = entry.invoke()?;
        outputs.insert(entry.id(), values);
    }

    if flag_set.is_parsed() {
        info!("flag set already parsed, skipping parse");
    } else {
        flag_set.parse(arguments.iter()).map_err(|err| {
            error!(%err, "flag parsing failed");
            FlagDagError::parse(err)
        })?;
    }

    Ok(Parsed::new(outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Constructor;
    use crate::core::config::FlagSetConfig;
    use crate::flags::entry::Entry;

    fn entry_defining(name: &'static str) -> EntryRef {
        Entry::new(Constructor::into_erased(move |fs: FlagSet| {
            fs.string(name, "default", "test flag")
        }))
    }

    #[test]
    fn test_barrier_runs_constructors_then_parses() {
        let fs = FlagSet::new(FlagSetConfig::new("test"));
        let entry = entry_defining("x");
        entry.capture(vec![crate::any::boxed(fs.clone())]).unwrap();

        let parsed = parse_entries(
            fs.clone(),
            Arguments::new(["--x=bar"]),
            Group::new(vec![entry.clone()]),
        )
        .unwrap();

        assert_eq!(parsed.len(), 1);
        assert!(entry.is_invoked());
        assert!(fs.is_parsed());
    }

    #[test]
    fn test_barrier_skips_parse_when_already_parsed() {
        let fs = FlagSet::new(FlagSetConfig::new("test"));
        fs.parse(Vec::<String>::new()).unwrap();
        let entry = entry_defining("x");
        entry.capture(vec![crate::any::boxed(fs.clone())]).unwrap();

        // Would be an unknown flag if parsing ran again.
        let parsed = parse_entries(
            fs,
            Arguments::new(["--unknown"]),
            Group::new(vec![entry.clone()]),
        )
        .unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(entry.is_invoked());
    }

    #[test]
    fn test_barrier_fails_on_bad_arguments() {
        let fs = FlagSet::new(FlagSetConfig::new("test"));
        let err = parse_entries(fs, Arguments::new(["--unknown"]), Group::new(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, FlagDagError::Parse { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_barrier_fails_on_non_utf8_arguments() {
        use std::os::unix::ffi::OsStringExt;
        let fs = FlagSet::new(FlagSetConfig::new("test"));
        let entry = entry_defining("x");
        entry.capture(vec![crate::any::boxed(fs.clone())]).unwrap();

        let raw = std::ffi::OsString::from_vec(b"--x=\xff".to_vec());
        let err = parse_entries(fs, Arguments::new([raw]), Group::new(vec![entry.clone()]))
            .unwrap_err();
        assert!(matches!(err, FlagDagError::Parse { .. }));
        assert!(entry.is_invoked());
    }

    #[test]
    fn test_barrier_signature() {
        let node = barrier();
        assert_eq!(node.name(), BARRIER);
        assert_eq!(node.outputs(), &[crate::container::Key::value::<Parsed>()]);
        assert_eq!(node.inputs().len(), 3);
    }
}
