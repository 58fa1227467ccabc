use crate::container::{Constructor, Container, ErasedConstructor, Key, TryConstructor};
use crate::core::config::FlagSetConfig;
use crate::core::errors::{FlagDagError, Result};
use crate::flags::barrier::barrier;
use crate::flags::entry::{EntryId, Parsed};
use crate::flags::flag_set::{Arguments, FlagSet};
use crate::flags::splitter::{split, Split};
use std::ffi::OsString;
use tracing::debug;

/// The two providers a flag constructor was turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePair {
    pub entry: EntryId,
    pub capture: String,
    pub release: String,
}

/// Add the barrier and default inputs to `container`.
///
/// Defaults are a fresh [`FlagSet`] built from `config` and the process
/// arguments; override either with [`override_flag_set`] and
/// [`override_arguments`].
pub fn install(container: &mut Container, config: FlagSetConfig) -> Result<()> {
    config.validate()?;
    container.provide_all(vec![
        Constructor::into_erased(move || FlagSet::new(config))
            .with_name("flagdag::default_flag_set"),
        Constructor::into_erased(Arguments::from_env).with_name("flagdag::default_arguments"),
        barrier(),
    ])?;
    Ok(())
}

/// Register a constructor whose outputs must not be seen before flags are parsed.
///
/// The constructor usually takes a [`FlagSet`] and defines flags on it. It
/// runs inside the barrier; everything that depends on its outputs gets them
/// only after parsing succeeded.
///
/// ```
/// use flagdag::{flags, Container, Flag, FlagSet, FlagSetConfig};
///
/// #[derive(Clone)]
/// struct Verbosity {
///     verbose: Flag<bool>,
/// }
///
/// let mut container = Container::new();
/// flags::install(&mut container, FlagSetConfig::new("demo")).unwrap();
/// flags::override_arguments(&mut container, ["--verbose"]);
/// flags::provide(&mut container, |fs: FlagSet| Verbosity {
///     verbose: fs.bool("verbose", false, "say more"),
/// })
/// .unwrap();
///
/// let v: Verbosity = container.resolve().unwrap();
/// assert!(v.verbose.get());
/// ```
pub fn provide<Args, C: Constructor<Args>>(
    container: &mut Container,
    constructor: C,
) -> Result<NodePair> {
    register(container, constructor.into_erased())
}

/// Like [`provide`] for constructors returning `Result`.
pub fn try_provide<Args, C: TryConstructor<Args>>(
    container: &mut Container,
    constructor: C,
) -> Result<NodePair> {
    register(container, constructor.into_erased())
}

/// Split `constructor` and add both halves. Nothing is added on error.
pub fn register(container: &mut Container, constructor: ErasedConstructor) -> Result<NodePair> {
    let mut pairs = register_all(container, vec![constructor])?;
    pairs
        .pop()
        .ok_or_else(|| FlagDagError::internal("registration produced no node pair"))
}

/// Register several flag constructors at once. Either all of them are added or none.
///
/// Fails once the barrier has run: a constructor added then would never be
/// invoked.
pub fn register_all(
    container: &mut Container,
    constructors: Vec<ErasedConstructor>,
) -> Result<Vec<NodePair>> {
    if container.is_resolved(Key::value::<Parsed>()) {
        return Err(FlagDagError::configuration_field(
            "flag constructors cannot be registered after flags were parsed",
            "constructor",
        ));
    }

    let splits = constructors
        .into_iter()
        .map(split)
        .collect::<Result<Vec<Split>>>()?;

    let mut pairs = Vec::with_capacity(splits.len());
    let mut nodes = Vec::with_capacity(splits.len() * 2);
    for Split {
        capture,
        release,
        entry,
    } in splits
    {
        pairs.push(NodePair {
            entry: entry.id(),
            capture: capture.name().to_string(),
            release: release.name().to_string(),
        });
        nodes.push(capture);
        nodes.push(release);
    }
    container.provide_all(nodes)?;
    for pair in &pairs {
        debug!(entry = %pair.entry, release = %pair.release, "registered flag constructor");
    }
    Ok(pairs)
}

pub fn override_flag_set(container: &mut Container, flag_set: FlagSet) -> &mut Container {
    container.replace(flag_set)
}

pub fn override_arguments<I, S>(container: &mut Container, args: I) -> &mut Container
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    container.replace(Arguments::new(args))
}
