//! Type-keyed dependency container
//!
//! Values are identified by their Rust type. Constructors declare what they
//! need through their parameter types and what they produce through their
//! return type; the container runs them lazily in dependency order.

pub mod constructor;
#[allow(clippy::module_inception)]
pub mod container;
pub mod key;
pub mod provider;

pub use constructor::{Constructor, Dependency, Many, Outputs, TryConstructor};
pub use container::Container;
pub use key::{Group, Grouped, Key};
pub use provider::{ConstructorFn, ErasedConstructor};
