//! Type-erased constructors: the only shape the container actually runs.

use crate::any::DynAny;
use crate::container::key::Key;
use crate::core::errors::{FlagDagError, Result};
use std::fmt;

/// Boxed body of an erased constructor. Runs at most once.
pub type ConstructorFn = Box<dyn FnOnce(Vec<DynAny>) -> Result<Vec<DynAny>> + Send>;

/// A constructor with its signature spelled out as ordered input and output keys.
///
/// The typed entry points ([`Constructor`](super::Constructor),
/// [`TryConstructor`](super::TryConstructor)) produce these; code that
/// rewrites constructors (see [`crate::flags::split`]) builds them directly.
pub struct ErasedConstructor {
    name: String,
    inputs: Vec<Key>,
    outputs: Vec<Key>,
    call: ConstructorFn,
}

impl ErasedConstructor {
    pub fn new<F>(name: impl Into<String>, inputs: Vec<Key>, outputs: Vec<Key>, call: F) -> Self
    where
        F: FnOnce(Vec<DynAny>) -> Result<Vec<DynAny>> + Send + 'static,
    {
        Self {
            name: name.into(),
            inputs,
            outputs,
            call: Box::new(call),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[Key] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Key] {
        &self.outputs
    }

    /// Run the constructor, checking argument and result arity against the signature.
    pub fn call(self, args: Vec<DynAny>) -> Result<Vec<DynAny>> {
        if args.len() != self.inputs.len() {
            return Err(FlagDagError::internal(format!(
                "{} expects {} arguments, got {}",
                self.name,
                self.inputs.len(),
                args.len()
            )));
        }
        let expected = self.outputs.len();
        let name = self.name;
        let values = (self.call)(args)?;
        if values.len() != expected {
            return Err(FlagDagError::internal(format!(
                "{} declared {} outputs but returned {}",
                name,
                expected,
                values.len()
            )));
        }
        Ok(values)
    }
}

impl fmt::Debug for ErasedConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedConstructor")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// Every member collected for one group key, handed to a `Group<T>` input.
#[derive(Clone, Debug)]
pub(crate) struct GroupMembers(pub(crate) Vec<DynAny>);
