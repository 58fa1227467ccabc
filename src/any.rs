use dyn_clone::DynClone;
use std::{
    any::{type_name, Any, TypeId},
    fmt::{self, Debug},
    hash::Hash,
};

/// Conversion to [`Any`] to workaround [#65991](https://github.com/rust-lang/rust/issues/65991).
/// Implemented for anything that's `'static` and [`Clone`].
pub trait IntoAny: DynClone + Any + Send + Sync {
    /// The conversion.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;
    fn as_any(&self) -> &dyn Any;
    /// Name of the concrete type behind the trait object.
    fn type_name(&self) -> &'static str;
}

dyn_clone::clone_trait_object!(IntoAny);

impl<T: 'static + Clone + Send + Sync> IntoAny for T {
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        Box::new(*self)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

impl Debug for dyn IntoAny + Send + Sync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let any = self.as_any();
        if let Some(v) = any.downcast_ref::<String>() {
            return write!(f, "{:?}", v);
        } else if let Some(v) = any.downcast_ref::<bool>() {
            return write!(f, "{:?}", v);
        } else if let Some(v) = any.downcast_ref::<i64>() {
            return write!(f, "{:?}", v);
        } else if let Some(v) = any.downcast_ref::<u64>() {
            return write!(f, "{:?}", v);
        } else if let Some(v) = any.downcast_ref::<f64>() {
            return write!(f, "{:?}", v);
        } else if let Some(v) = any.downcast_ref::<&str>() {
            return write!(f, "{:?}", v);
        }

        write!(f, "dyn IntoAny<{}>", self.type_name())
    }
}

/// A [`Box`]ed [`IntoAny`]. Every value flowing through the container is one of these.
pub type DynAny = Box<dyn IntoAny + Send + Sync>;

/// Boxes a value into a [`DynAny`].
pub fn boxed<T: 'static + Clone + Send + Sync>(value: T) -> DynAny {
    Box::new(value)
}

pub fn downcast<T: 'static>(value: DynAny) -> Result<T, DynAny> {
    if (*value).as_any().type_id() != TypeId::of::<T>() {
        return Err(value);
    }
    let value = value.into_any();
    // We've checked the type id.
    match value.downcast::<T>() {
        Ok(v) => Ok(*v),
        Err(_) => unreachable!("type id checked above"),
    }
}

/// A [`TypeId`] and the type's name.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    /// Gets the [`TypeId`].
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the [`TypeInfo`] of the type this generic function has been
    /// instantiated with.
    pub fn of<T: 'static>() -> Self {
        TypeInfo {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl Hash for TypeInfo {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &TypeInfo) -> bool {
        self.id.eq(&other.id)
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &TypeInfo) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
