//! Type-safe capability references
//!
//! This module provides [`Cap<T>`], a typed handle naming the slot that holds
//! a capability to an object of class `T`. The type parameter uses the sealed
//! [`CapObjectType`] trait, so only kernel-defined object classes exist.
//!
//! # Design
//!
//! A `Cap<T>` is the class tag plus the owning slot; it holds no object
//! state. Every operation that takes a handle looks the slot up in the
//! kernel's object table and checks that the object found there is of class
//! `T`, so a handle built with [`Cap::from_cptr`] for the wrong slot is
//! rejected at use rather than causing type confusion.

use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

use crate::cptr::CPtr;
use crate::object_type::ObjectType;
use crate::objects::CapObjectType;

/// A type-safe capability reference.
///
/// # Usage
///
/// ```ignore
/// use hatch_cap::{Cap, objects::TCB};
///
/// fn describe(tcb: Cap<TCB>) {
///     // Compiler ensures we have a TCB capability
///     log::debug!("{} lives in slot {}", tcb.type_name(), tcb.cptr());
/// }
/// ```
pub struct Cap<T: CapObjectType> {
    /// Slot holding the capability.
    cptr: CPtr,
    /// Type marker.
    _type: PhantomData<T>,
}

impl<T: CapObjectType> Cap<T> {
    /// Create a handle for the capability in `cptr`.
    ///
    /// The class is checked by the object table when the handle is used.
    #[inline]
    #[must_use]
    pub const fn from_cptr(cptr: CPtr) -> Self {
        Self {
            cptr,
            _type: PhantomData,
        }
    }

    /// Get the slot holding the capability.
    #[inline]
    #[must_use]
    pub const fn cptr(&self) -> CPtr {
        self.cptr
    }

    /// Get the object type (class tag).
    #[inline]
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        T::OBJECT_TYPE
    }

    /// Get the type name for debugging.
    #[inline]
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        T::NAME
    }

    /// Check if this handle names the null slot.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.cptr.is_null()
    }

}

impl<T: CapObjectType> Clone for Cap<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: CapObjectType> Copy for Cap<T> {}

impl<T: CapObjectType> PartialEq for Cap<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cptr == other.cptr
    }
}

impl<T: CapObjectType> Eq for Cap<T> {}

impl<T: CapObjectType> Hash for Cap<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cptr.hash(state);
    }
}

impl<T: CapObjectType> fmt::Debug for Cap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cap<{}>({:?})", T::NAME, self.cptr)
    }
}

impl<T: CapObjectType> fmt::Display for Cap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", T::NAME, self.cptr)
    }
}
