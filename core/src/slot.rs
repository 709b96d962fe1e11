//! Shared value cells used as flag and operand destinations.
//!
//! A [`Slot`] is the memory a flag or operand writes into. The caller keeps
//! one handle and hands clones to the router; every clone points at the same
//! value, so a recursive flag registered on many commands still writes to a
//! single place.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// A caller-owned, shared, mutable value.
///
/// # Examples
///
/// ```
/// use command_router_core::Slot;
///
/// let name = Slot::new(String::from("default"));
/// let alias = name.clone();
/// alias.set("changed".to_string());
/// assert_eq!(name.get(), "changed");
/// ```
pub struct Slot<T: ?Sized>(pub(crate) Rc<RefCell<T>>);

impl<T> Slot<T> {
    /// Creates a slot holding `value`.
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Replaces the held value.
    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    /// Returns a clone of the held value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().clone()
    }

    /// Borrows the held value.
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutates the held value in place.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.0.borrow_mut());
    }
}

impl<T: ?Sized> Slot<T> {
    /// Returns `true` when both handles point at the same value.
    pub fn same_slot(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: ?Sized> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Default> Default for Slot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&*self.0.borrow()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_value() {
        let count = Slot::new(1_u32);
        let other = count.clone();
        other.update(|n| *n += 41);

        assert_eq!(count.get(), 42);
        assert!(count.same_slot(&other));
        assert!(!count.same_slot(&Slot::new(42)));
    }
}
