//! Typed constructors.
//!
//! Closures and fn items of up to eight inputs are turned into
//! [`ErasedConstructor`]s by reading their input and output types off the
//! signature, one generic impl per arity.

use crate::any::{boxed, downcast, DynAny};
use crate::container::key::{Group, Grouped, Key};
use crate::container::provider::{ErasedConstructor, GroupMembers};
use crate::core::errors::{FlagDagError, Result};
use std::any::type_name;

/// A value a constructor can ask the container for.
pub trait Dependency: Sized + 'static {
    fn key() -> Key;
    fn from_value(value: DynAny) -> Option<Self>;
}

impl<T: Clone + Send + Sync + 'static> Dependency for T {
    fn key() -> Key {
        Key::value::<T>()
    }

    fn from_value(value: DynAny) -> Option<Self> {
        downcast::<T>(value).ok()
    }
}

impl<T: Clone + Send + Sync + 'static> Dependency for Group<T> {
    fn key() -> Key {
        Key::group::<T>()
    }

    fn from_value(value: DynAny) -> Option<Self> {
        let members = downcast::<GroupMembers>(value).ok()?;
        members
            .0
            .into_iter()
            .map(|member| downcast::<T>(member).ok())
            .collect::<Option<Vec<T>>>()
            .map(Group::new)
    }
}

/// What a constructor hands back to the container.
pub trait Outputs: 'static {
    fn keys() -> Vec<Key>;
    fn into_values(self) -> Vec<DynAny>;
}

impl<T: Clone + Send + Sync + 'static> Outputs for T {
    fn keys() -> Vec<Key> {
        vec![Key::value::<T>()]
    }

    fn into_values(self) -> Vec<DynAny> {
        vec![boxed(self)]
    }
}

impl<T: Clone + Send + Sync + 'static> Outputs for Grouped<T> {
    fn keys() -> Vec<Key> {
        vec![Key::group::<T>()]
    }

    fn into_values(self) -> Vec<DynAny> {
        vec![boxed(self.0)]
    }
}

/// Several outputs from one constructor, e.g. `Many((config, client))`.
///
/// `Many(())` declares no outputs at all.
#[derive(Debug)]
pub struct Many<T>(pub T);

impl Outputs for Many<()> {
    fn keys() -> Vec<Key> {
        Vec::new()
    }

    fn into_values(self) -> Vec<DynAny> {
        Vec::new()
    }
}

macro_rules! impl_many {
    ($($out:ident),+) => {
        impl<$($out),+> Outputs for Many<($($out,)+)>
        where
            $($out: Clone + Send + Sync + 'static,)+
        {
            fn keys() -> Vec<Key> {
                vec![$(Key::value::<$out>()),+]
            }

            #[allow(non_snake_case)]
            fn into_values(self) -> Vec<DynAny> {
                let ($($out,)+) = self.0;
                vec![$(boxed($out)),+]
            }
        }
    };
}

impl_many!(O1);
impl_many!(O1, O2);
impl_many!(O1, O2, O3);
impl_many!(O1, O2, O3, O4);

/// An infallible constructor: `Fn(deps..) -> outputs`.
///
/// ```compile_fail
/// use flagdag::Container;
///
/// let mut container = Container::new();
/// // An integer is not a constructor.
/// container.provide(42).unwrap();
/// ```
pub trait Constructor<Args>: Send + 'static {
    fn into_erased(self) -> ErasedConstructor;
}

/// A fallible constructor: `Fn(deps..) -> Result<outputs, E>`.
pub trait TryConstructor<Args>: Send + 'static {
    fn into_erased(self) -> ErasedConstructor;
}

fn take_arg<T: Dependency>(args: &mut std::vec::IntoIter<DynAny>, provider: &str) -> Result<T> {
    let value = args.next().ok_or_else(|| {
        FlagDagError::internal(format!("{} received too few arguments", provider))
    })?;
    T::from_value(value).ok_or_else(|| {
        FlagDagError::internal(format!(
            "{} received a value of the wrong type for {}",
            provider,
            T::key()
        ))
    })
}

macro_rules! impl_constructor {
    ($($arg:ident),*) => {
        impl<F, R, $($arg,)*> Constructor<($($arg,)*)> for F
        where
            F: FnOnce($($arg),*) -> R + Send + 'static,
            R: Outputs,
            $($arg: Dependency,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_erased(self) -> ErasedConstructor {
                let name = type_name::<F>();
                ErasedConstructor::new(
                    name,
                    vec![$(<$arg as Dependency>::key()),*],
                    R::keys(),
                    move |args: Vec<DynAny>| {
                        let mut args = args.into_iter();
                        $(let $arg = take_arg::<$arg>(&mut args, name)?;)*
                        Ok((self)($($arg),*).into_values())
                    },
                )
            }
        }

        impl<F, R, E, $($arg,)*> TryConstructor<($($arg,)*)> for F
        where
            F: FnOnce($($arg),*) -> std::result::Result<R, E> + Send + 'static,
            R: Outputs,
            E: Into<FlagDagError>,
            $($arg: Dependency,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_erased(self) -> ErasedConstructor {
                let name = type_name::<F>();
                ErasedConstructor::new(
                    name,
                    vec![$(<$arg as Dependency>::key()),*],
                    R::keys(),
                    move |args: Vec<DynAny>| {
                        let mut args = args.into_iter();
                        $(let $arg = take_arg::<$arg>(&mut args, name)?;)*
                        let outputs = (self)($($arg),*).map_err(Into::into)?;
                        Ok(outputs.into_values())
                    },
                )
            }
        }
    };
}

impl_constructor!();
impl_constructor!(A1);
impl_constructor!(A1, A2);
impl_constructor!(A1, A2, A3);
impl_constructor!(A1, A2, A3, A4);
impl_constructor!(A1, A2, A3, A4, A5);
impl_constructor!(A1, A2, A3, A4, A5, A6);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8);
