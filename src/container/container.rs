use crate::any::{boxed, DynAny};
use crate::container::constructor::{Constructor, Dependency, TryConstructor};
use crate::container::key::Key;
use crate::container::provider::{ErasedConstructor, GroupMembers};
use crate::core::errors::{FlagDagError, Result};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::any::type_name;
use std::collections::HashMap;
use tracing::{debug, error};

/// Lifecycle of one registered provider within a resolution pass.
enum ProviderState {
    Pending(ErasedConstructor),
    Running,
    Done,
    Failed(String),
}

struct ProviderSlot {
    name: String,
    inputs: Vec<Key>,
    outputs: Vec<Key>,
    state: ProviderState,
}

/// A type-keyed dependency container.
///
/// Providers are registered up front and run lazily, at most once each, the
/// first time something needs one of their outputs. Inputs are always
/// resolved before the provider that needs them, so the container respects
/// dependency order without any other ordering knowledge.
///
/// A container is one resolution pass: failures are remembered and reported
/// again instead of being retried.
#[derive(Default)]
pub struct Container {
    providers: Vec<ProviderSlot>,
    value_providers: HashMap<Key, usize>,
    group_providers: HashMap<Key, Vec<usize>>,
    overrides: HashMap<Key, DynAny>,
    values: HashMap<Key, DynAny>,
    groups: HashMap<Key, Vec<DynAny>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an infallible constructor.
    pub fn provide<Args, C: Constructor<Args>>(&mut self, constructor: C) -> Result<&mut Self> {
        self.provide_erased(constructor.into_erased())
    }

    /// Register a constructor returning `Result`.
    pub fn try_provide<Args, C: TryConstructor<Args>>(
        &mut self,
        constructor: C,
    ) -> Result<&mut Self> {
        self.provide_erased(constructor.into_erased())
    }

    pub fn provide_erased(&mut self, constructor: ErasedConstructor) -> Result<&mut Self> {
        self.provide_all(vec![constructor])
    }

    /// Register several constructors at once. Either all of them are added or none.
    pub fn provide_all(&mut self, constructors: Vec<ErasedConstructor>) -> Result<&mut Self> {
        let mut claimed: HashMap<Key, &str> = HashMap::new();
        for constructor in &constructors {
            for key in constructor.outputs().iter().filter(|k| !k.is_group()) {
                if let Some(&existing) = self.value_providers.get(key) {
                    return Err(FlagDagError::duplicate_provider(
                        key.to_string(),
                        self.providers[existing].name.clone(),
                        constructor.name(),
                    ));
                }
                if let Some(existing) = claimed.insert(*key, constructor.name()) {
                    return Err(FlagDagError::duplicate_provider(
                        key.to_string(),
                        existing,
                        constructor.name(),
                    ));
                }
            }
        }

        for constructor in constructors {
            let idx = self.providers.len();
            for key in constructor.outputs() {
                if key.is_group() {
                    self.group_providers.entry(*key).or_default().push(idx);
                } else {
                    self.value_providers.insert(*key, idx);
                }
            }
            debug!(provider = constructor.name(), "registered provider");
            self.providers.push(ProviderSlot {
                name: constructor.name().to_string(),
                inputs: constructor.inputs().to_vec(),
                outputs: constructor.outputs().to_vec(),
                state: ProviderState::Pending(constructor),
            });
        }
        Ok(self)
    }

    /// Provide an already-built value.
    pub fn supply<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Result<&mut Self> {
        let name = format!("supply({})", type_name::<T>());
        self.provide_erased(ErasedConstructor::new(
            name,
            Vec::new(),
            vec![Key::value::<T>()],
            move |_| Ok(vec![boxed(value)]),
        ))
    }

    /// Override the value for `T`. The override wins over any provider of `T`,
    /// whether that provider was registered before or after this call.
    pub fn replace<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        debug!(key = type_name::<T>(), "replacing value");
        self.overrides.insert(Key::value::<T>(), boxed(value));
        self
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Whether something can produce `T`.
    pub fn contains<T: Dependency>(&self) -> bool {
        let key = T::key();
        match key {
            Key::Value(_) => {
                self.overrides.contains_key(&key) || self.value_providers.contains_key(&key)
            }
            Key::Group(_) => true,
        }
    }

    /// Whether the provider of value `key` has already run, successfully or not.
    pub fn is_resolved(&self, key: Key) -> bool {
        if self.values.contains_key(&key) {
            return true;
        }
        self.value_providers
            .get(&key)
            .map_or(false, |&idx| {
                !matches!(self.providers[idx].state, ProviderState::Pending(_))
            })
    }

    /// Check every registered provider for missing inputs and cycles.
    pub fn validate(&self) -> Result<()> {
        let roots: Vec<Key> = self
            .providers
            .iter()
            .flat_map(|slot| slot.outputs.iter().copied())
            .collect();
        self.plan(&roots, "validate")
    }

    /// Build (or fetch) the value for `T`, running whatever it depends on first.
    pub fn resolve<T: Dependency>(&mut self) -> Result<T> {
        let key = T::key();
        let requester = format!("resolve({})", type_name::<T>());
        self.plan(&[key], &requester)?;
        let value = self.resolve_key(key, &requester)?;
        T::from_value(value)
            .ok_or_else(|| FlagDagError::internal(format!("value stored for {} has the wrong type", key)))
    }

    /// Resolve the inputs of `function` and run it for its side effects.
    pub fn invoke<Args, C: Constructor<Args>>(&mut self, function: C) -> Result<()> {
        self.run_detached(function.into_erased())
    }

    pub fn try_invoke<Args, C: TryConstructor<Args>>(&mut self, function: C) -> Result<()> {
        self.run_detached(function.into_erased())
    }

    fn run_detached(&mut self, function: ErasedConstructor) -> Result<()> {
        let name = function.name().to_string();
        self.plan(function.inputs(), &name)?;
        let args = function
            .inputs()
            .to_vec()
            .into_iter()
            .map(|key| self.resolve_key(key, &name))
            .collect::<Result<Vec<_>>>()?;
        debug!(function = %name, "invoking");
        function.call(args).map(|_| ())
    }

    /// Walk everything `roots` transitively needs and make sure it is
    /// resolvable: every value key has a provider or override, and the
    /// providers involved form a DAG.
    fn plan(&self, roots: &[Key], requester: &str) -> Result<()> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let mut nodes: HashMap<usize, NodeIndex> = HashMap::new();
        let mut pending: Vec<(Option<NodeIndex>, Key, String)> = roots
            .iter()
            .map(|key| (None, *key, requester.to_string()))
            .collect();

        while let Some((consumer, key, needed_by)) = pending.pop() {
            for producer in self.producers_of(&key, &needed_by)? {
                let (node, fresh) = match nodes.get(&producer) {
                    Some(&node) => (node, false),
                    None => {
                        let node = graph.add_node(producer);
                        nodes.insert(producer, node);
                        (node, true)
                    }
                };
                if let Some(consumer) = consumer {
                    graph.update_edge(node, consumer, ());
                }
                if fresh {
                    let slot = &self.providers[producer];
                    for input in &slot.inputs {
                        pending.push((Some(node), *input, slot.name.clone()));
                    }
                }
            }
        }

        toposort(&graph, None).map_err(|cycle| {
            FlagDagError::cycle(self.providers[graph[cycle.node_id()]].name.clone())
        })?;
        Ok(())
    }

    fn producers_of(&self, key: &Key, needed_by: &str) -> Result<Vec<usize>> {
        match key {
            Key::Value(_) if self.overrides.contains_key(key) => Ok(Vec::new()),
            Key::Value(_) => self
                .value_providers
                .get(key)
                .map(|&idx| vec![idx])
                .ok_or_else(|| FlagDagError::missing_provider(key.to_string(), needed_by)),
            Key::Group(_) => Ok(self.group_providers.get(key).cloned().unwrap_or_default()),
        }
    }

    fn resolve_key(&mut self, key: Key, needed_by: &str) -> Result<DynAny> {
        match key {
            Key::Value(_) => {
                if let Some(value) = self.overrides.get(&key) {
                    return Ok(value.clone());
                }
                if let Some(value) = self.values.get(&key) {
                    return Ok(value.clone());
                }
                let idx = *self
                    .value_providers
                    .get(&key)
                    .ok_or_else(|| FlagDagError::missing_provider(key.to_string(), needed_by))?;
                self.run_provider(idx)?;
                self.values.get(&key).cloned().ok_or_else(|| {
                    FlagDagError::internal(format!(
                        "{} finished without producing {}",
                        self.providers[idx].name, key
                    ))
                })
            }
            Key::Group(_) => {
                let producers = self.group_providers.get(&key).cloned().unwrap_or_default();
                for idx in producers {
                    self.run_provider(idx)?;
                }
                let members = self.groups.get(&key).cloned().unwrap_or_default();
                Ok(boxed(GroupMembers(members)))
            }
        }
    }

    fn run_provider(&mut self, idx: usize) -> Result<()> {
        let slot = &mut self.providers[idx];
        let constructor = match std::mem::replace(&mut slot.state, ProviderState::Running) {
            ProviderState::Pending(constructor) => constructor,
            ProviderState::Done => {
                slot.state = ProviderState::Done;
                return Ok(());
            }
            ProviderState::Running => return Err(FlagDagError::cycle(slot.name.clone())),
            ProviderState::Failed(message) => {
                let err = FlagDagError::provider_failed(slot.name.clone(), message.clone());
                slot.state = ProviderState::Failed(message);
                return Err(err);
            }
        };

        let name = slot.name.clone();
        let inputs = slot.inputs.clone();
        let result = inputs
            .into_iter()
            .map(|key| self.resolve_key(key, &name))
            .collect::<Result<Vec<_>>>()
            .and_then(|args| {
                debug!(provider = %name, "invoking provider");
                constructor.call(args)
            });

        match result {
            Ok(values) => {
                let outputs = self.providers[idx].outputs.clone();
                for (key, value) in outputs.into_iter().zip(values) {
                    if key.is_group() {
                        self.groups.entry(key).or_default().push(value);
                    } else {
                        self.values.insert(key, value);
                    }
                }
                self.providers[idx].state = ProviderState::Done;
                Ok(())
            }
            Err(err) => {
                error!(provider = %name, category = err.category(), "provider failed: {}", err);
                self.providers[idx].state = ProviderState::Failed(err.to_string());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Group, Grouped, Many};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Debug, PartialEq)]
    struct Config {
        name: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Greeter {
        greeting: String,
    }

    #[derive(Clone, Debug, PartialEq)]
    struct Plugin(&'static str);

    #[test]
    fn test_resolves_in_dependency_order() {
        let mut container = Container::new();
        container
            .provide(|config: Config| Greeter {
                greeting: format!("hello {}", config.name),
            })
            .unwrap()
            .provide(|| Config {
                name: "world".to_string(),
            })
            .unwrap();

        let greeter: Greeter = container.resolve().unwrap();
        assert_eq!(greeter.greeting, "hello world");
    }

    #[test]
    fn test_provider_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut container = Container::new();
        container
            .provide(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Config {
                    name: "once".to_string(),
                }
            })
            .unwrap();

        let _: Config = container.resolve().unwrap();
        let _: Config = container.resolve().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_duplicate_provider_rejected_immediately() {
        let mut container = Container::new();
        container.supply(Config { name: "a".into() }).unwrap();
        let err = container
            .provide(|| Config { name: "b".into() })
            .err()
            .unwrap();
        assert!(matches!(err, FlagDagError::DuplicateProvider { .. }));
        assert_eq!(container.len(), 1);
    }

    #[test]
    fn test_provide_all_is_atomic() {
        let mut container = Container::new();
        let err = container
            .provide_all(vec![
                Constructor::into_erased(|| Plugin("a")),
                Constructor::into_erased(|| Many((Config { name: "x".into() }, Plugin("b")))),
            ])
            .err()
            .unwrap();
        assert!(matches!(err, FlagDagError::DuplicateProvider { .. }));
        assert!(container.is_empty());
    }

    #[test]
    fn test_missing_provider_reported_before_running_anything() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut container = Container::new();
        container
            .provide(move |config: Config| {
                counter.fetch_add(1, Ordering::SeqCst);
                Greeter {
                    greeting: config.name,
                }
            })
            .unwrap();

        let err = container.resolve::<Greeter>().unwrap_err();
        assert!(matches!(err, FlagDagError::MissingProvider { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cycle_detected() {
        let mut container = Container::new();
        container
            .provide(|greeter: Greeter| Config {
                name: greeter.greeting,
            })
            .unwrap()
            .provide(|config: Config| Greeter {
                greeting: config.name,
            })
            .unwrap();

        assert!(matches!(
            container.validate(),
            Err(FlagDagError::Cycle { .. })
        ));
        assert!(matches!(
            container.resolve::<Greeter>(),
            Err(FlagDagError::Cycle { .. })
        ));
    }

    #[test]
    fn test_groups_collect_every_producer() {
        let mut container = Container::new();
        container
            .provide(|| Grouped(Plugin("a")))
            .unwrap()
            .provide(|| Grouped(Plugin("b")))
            .unwrap()
            .provide(|plugins: Group<Plugin>| {
                let mut names: Vec<&'static str> = plugins.iter().map(|p| p.0).collect();
                names.sort();
                names.join(",")
            })
            .unwrap();

        let names: String = container.resolve().unwrap();
        assert_eq!(names, "a,b");
    }

    #[test]
    fn test_empty_group_is_fine() {
        let mut container = Container::new();
        let plugins: Group<Plugin> = container.resolve().unwrap();
        assert!(plugins.is_empty());
    }

    #[test]
    fn test_replace_wins_regardless_of_order() {
        let mut container = Container::new();
        container.replace(Config {
            name: "override".into(),
        });
        container
            .provide(|| Config {
                name: "default".into(),
            })
            .unwrap();

        let config: Config = container.resolve().unwrap();
        assert_eq!(config.name, "override");
    }

    #[test]
    fn test_is_resolved_tracks_provider_runs() {
        let mut container = Container::new();
        container
            .provide(|| Config {
                name: "x".into(),
            })
            .unwrap()
            .try_provide(|| -> anyhow::Result<Plugin> { Err(anyhow::anyhow!("nope")) })
            .unwrap();
        assert!(!container.is_resolved(Key::value::<Config>()));
        assert!(!container.is_resolved(Key::value::<Greeter>()));

        let _: Config = container.resolve().unwrap();
        assert!(container.is_resolved(Key::value::<Config>()));

        assert!(container.resolve::<Plugin>().is_err());
        assert!(container.is_resolved(Key::value::<Plugin>()));
    }

    #[test]
    fn test_failures_are_memoized() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut container = Container::new();
        container
            .try_provide(move || -> anyhow::Result<Config> {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(anyhow::anyhow!("boom"))
            })
            .unwrap()
            .provide(|config: Config| Greeter {
                greeting: config.name,
            })
            .unwrap();

        assert!(matches!(
            container.resolve::<Config>(),
            Err(FlagDagError::Constructor { .. })
        ));
        assert!(matches!(
            container.resolve::<Greeter>(),
            Err(FlagDagError::ProviderFailed { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invoke_runs_with_dependencies() {
        let seen = Arc::new(parking_lot::Mutex::new(String::new()));
        let sink = seen.clone();
        let mut container = Container::new();
        container.supply(Config { name: "x".into() }).unwrap();
        container
            .invoke(move |config: Config| {
                *sink.lock() = config.name;
            })
            .unwrap();
        assert_eq!(*seen.lock(), "x");
    }
}
