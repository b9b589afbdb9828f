//! Type-erased registry entries for feature slices.
//!
//! A slice builds its state once at startup; the kernel's `ApiState` keeps it
//! keyed by `TypeId` and handlers downcast it back by type.

use std::any::{Any, TypeId, type_name};
use std::fmt::Debug;

/// State of one feature slice, shared by every request.
pub trait FeatureSlice: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// A slice ready to be registered.
#[derive(Debug)]
pub struct InitializedSlice {
    pub id: TypeId,
    /// Type name, for startup logs and diagnostics.
    pub name: &'static str,
    pub state: Box<dyn FeatureSlice>,
}

impl InitializedSlice {
    pub fn new<T: FeatureSlice>(state: T) -> Self {
        Self { id: TypeId::of::<T>(), name: type_name::<T>(), state: Box::new(state) }
    }

    /// The slice state as `T`, if this entry holds one.
    #[must_use]
    pub fn downcast<T: FeatureSlice>(&self) -> Option<&T> {
        self.state.as_any().downcast_ref::<T>()
    }
}
