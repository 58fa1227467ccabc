//! Splits one constructor into a capture node and a release node.
//!
//! ```text
//!   constructor: fn(deps..) -> outs..
//!
//!   capture:     fn(deps..)  -> Grouped<EntryRef>   records deps, runs nothing
//!   barrier:     fn(FlagSet, Arguments, Group<EntryRef>) -> Parsed
//!   release:     fn(Parsed)  -> outs..              hands back what the barrier computed
//! ```
//!
//! The container only sees ordinary dependencies, yet every release node
//! now waits for the barrier.

use crate::any::{boxed, downcast, DynAny};
use crate::container::{ErasedConstructor, Key};
use crate::core::errors::{FlagDagError, Result};
use crate::flags::entry::{Entry, EntryRef, Parsed};

/// The two synthesized nodes plus the entry that links them.
#[derive(Debug)]
pub struct Split {
    pub capture: ErasedConstructor,
    pub release: ErasedConstructor,
    pub entry: EntryRef,
}

pub fn split(constructor: ErasedConstructor) -> Result<Split> {
    check_signature(&constructor)?;

    let name = constructor.name().to_string();
    let inputs = constructor.inputs().to_vec();
    let outputs = constructor.outputs().to_vec();
    let entry = Entry::new(constructor);

    let capture = {
        let entry = entry.clone();
        ErasedConstructor::new(
            format!("capture({})", name),
            inputs,
            vec![Key::group::<EntryRef>()],
            move |args| {
                entry.capture(args)?;
                Ok(vec![boxed(entry)])
            },
        )
    };

    let release = {
        let entry = entry.clone();
        ErasedConstructor::new(
            format!("release({})", name),
            vec![Key::value::<Parsed>()],
            outputs,
            move |args| Ok(release(&entry, args)),
        )
    };

    Ok(Split {
        capture,
        release,
        entry,
    })
}

fn check_signature(constructor: &ErasedConstructor) -> Result<()> {
    if constructor.outputs().is_empty() {
        return Err(FlagDagError::configuration_field(
            format!(
                "{} produces no values; flag constructors must return at least one",
                constructor.name()
            ),
            "outputs",
        ));
    }

    let internal = [Key::value::<Parsed>(), Key::group::<EntryRef>()];
    if let Some(key) = constructor.outputs().iter().find(|key| internal.contains(key)) {
        return Err(FlagDagError::configuration_field(
            format!("{} must not produce {}", constructor.name(), key),
            "outputs",
        ));
    }
    if let Some(key) = constructor.inputs().iter().find(|key| internal.contains(key)) {
        return Err(FlagDagError::configuration_field(
            format!(
                "{} cannot depend on {}, it only exists after the barrier",
                constructor.name(),
                key
            ),
            "inputs",
        ));
    }
    Ok(())
}

/// Body of a release node.
///
/// # Panics
///
/// When handed anything but a single [`Parsed`], or when `Parsed` has no
/// outputs for `entry`. Both mean the capture/barrier/release wiring is
/// broken, which no caller can recover from.
fn release(entry: &Entry, args: Vec<DynAny>) -> Vec<DynAny> {
    let mut args = args.into_iter();
    let parsed = match (args.next().map(downcast::<Parsed>), args.next()) {
        (Some(Ok(parsed)), None) => parsed,
        _ => panic!(
            "flagdag: release({}) expects exactly one Parsed argument",
            entry.name()
        ),
    };
    match parsed.outputs(entry.id()) {
        Some(values) => values.to_vec(),
        None => panic!(
            "flagdag: barrier recorded no outputs for {} ({})",
            entry.name(),
            entry.id()
        ),
    }
}
