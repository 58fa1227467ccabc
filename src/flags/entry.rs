//! Entries link the two halves of a split constructor, and `Parsed` carries
//! their outputs from the barrier to the release nodes.

use crate::any::DynAny;
use crate::container::ErasedConstructor;
use crate::core::errors::{FlagDagError, Result};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Uuid);

impl EntryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A deferred constructor and the inputs captured for it.
pub struct Entry {
    id: EntryId,
    name: String,
    constructor: Mutex<Option<ErasedConstructor>>,
    captured: OnceCell<Vec<DynAny>>,
}

/// Shared handle to an [`Entry`]; this is what travels through the entry group.
pub type EntryRef = Arc<Entry>;

impl Entry {
    pub(crate) fn new(constructor: ErasedConstructor) -> EntryRef {
        Arc::new(Self {
            id: EntryId::new(),
            name: constructor.name().to_string(),
            constructor: Mutex::new(Some(constructor)),
            captured: OnceCell::new(),
        })
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Name of the original constructor.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_captured(&self) -> bool {
        self.captured.get().is_some()
    }

    /// Whether the original constructor has already run.
    pub fn is_invoked(&self) -> bool {
        self.constructor.lock().is_none()
    }

    pub(crate) fn capture(&self, args: Vec<DynAny>) -> Result<()> {
        self.captured.set(args).map_err(|_| {
            FlagDagError::internal(format!("inputs for {} captured twice", self.name))
        })
    }

    /// Run the original constructor against the captured inputs. Only the
    /// barrier calls this, once per entry.
    pub(crate) fn invoke(&self) -> Result<Vec<DynAny>> {
        let args = self.captured.get().cloned().ok_or_else(|| {
            FlagDagError::internal(format!("{} invoked before its inputs were captured", self.name))
        })?;
        let constructor = self.constructor.lock().take().ok_or_else(|| {
            FlagDagError::internal(format!("{} invoked more than once", self.name))
        })?;
        constructor.call(args)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("captured", &self.is_captured())
            .field("invoked", &self.is_invoked())
            .finish()
    }
}

/// Outputs of every entry, produced once by the barrier.
///
/// Only release nodes can read it.
#[derive(Clone)]
pub struct Parsed {
    outputs: Arc<HashMap<EntryId, Vec<DynAny>>>,
}

impl Parsed {
    pub(crate) fn new(outputs: HashMap<EntryId, Vec<DynAny>>) -> Self {
        Self {
            outputs: Arc::new(outputs),
        }
    }

    pub(crate) fn outputs(&self, id: EntryId) -> Option<&[DynAny]> {
        self.outputs.get(&id).map(Vec::as_slice)
    }

    /// Number of entries the barrier ran.
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl fmt::Debug for Parsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.outputs.iter().map(|(id, values)| (id.to_string(), values)))
            .finish()
    }
}
