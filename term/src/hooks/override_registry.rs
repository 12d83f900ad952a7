// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Override slots and the registry that owns them.
//!
//! A slot is a push-down stack of implementations for one capability. Each
//! module that wraps a lower layer installs itself, records the previous
//! implementation and calls it when it chooses not to handle. Installation
//! happens only at session init/load; the stack is single-threaded by
//! construction (`Rc`).
//!
//! At shutdown each installer must be uninstalled in reverse order, and the
//! slot verifies that the implementation being removed is the one currently
//! on top. A mismatch means some module re-overrode the slot and was never
//! unwound; that is the stacking violation, and it is fatal - the chain can
//! no longer be restored to a sane state.

use crate::{TermError, TermOps, TermResult, TtyIo};
use std::{cell::RefCell, rc::Rc};

/// Shared single-threaded handle to a capability implementation.
pub type SharedImpl<T> = Rc<RefCell<T>>;

/// A named push-down stack of implementations.
#[allow(missing_debug_implementations)]
pub struct OverrideSlot<T: ?Sized> {
    name: &'static str,
    stack: Vec<SharedImpl<T>>,
}

impl<T: ?Sized> OverrideSlot<T> {
    #[must_use]
    pub fn new(name: &'static str, base: SharedImpl<T>) -> Self {
        Self {
            name,
            stack: vec![base],
        }
    }

    /// The currently effective implementation.
    ///
    /// # Panics
    ///
    /// Never panics; the stack always holds at least the base.
    #[must_use]
    pub fn current(&self) -> SharedImpl<T> {
        self.stack.last().expect("slot base").clone()
    }

    /// Install a new implementation; returns the previous one so the
    /// installer can call down the chain.
    pub fn install(&mut self, new_impl: SharedImpl<T>) -> SharedImpl<T> {
        let prev = self.current();
        self.stack.push(new_impl);
        tracing::debug!(slot = self.name, depth = self.stack.len(), "override installed");
        prev
    }

    /// Remove `expected` from the top of the stack.
    ///
    /// # Errors
    ///
    /// [`TermError::StackingViolation`] when `expected` is not the current
    /// top - the unload order does not mirror the load order.
    pub fn uninstall(&mut self, expected: &SharedImpl<T>) -> TermResult<()> {
        let top = self.current();
        if !Rc::ptr_eq(&top, expected) || self.stack.len() < 2 {
            return Err(TermError::StackingViolation { slot: self.name });
        }
        self.stack.pop();
        tracing::debug!(slot = self.name, depth = self.stack.len(), "override removed");
        Ok(())
    }

    /// Number of installed implementations, including the base.
    #[must_use]
    pub fn depth(&self) -> usize { self.stack.len() }

    /// Shutdown consistency check: the slot must be back down to exactly the
    /// base implementation.
    ///
    /// # Errors
    ///
    /// [`TermError::StackingViolation`] when overrides are still installed
    /// or the base was replaced.
    pub fn verify_unwound(&self, base: &SharedImpl<T>) -> TermResult<()> {
        if self.stack.len() != 1 || !Rc::ptr_eq(&self.current(), base) {
            return Err(TermError::StackingViolation { slot: self.name });
        }
        Ok(())
    }
}

/// The process-wide (per session) table of override slots.
#[allow(missing_debug_implementations)]
pub struct OverrideRegistry {
    pub term_ops: OverrideSlot<dyn TermOps>,
    pub tty_io: OverrideSlot<dyn TtyIo>,
}

impl OverrideRegistry {
    #[must_use]
    pub fn new(term_ops_base: SharedImpl<dyn TermOps>, tty_io_base: SharedImpl<dyn TtyIo>) -> Self {
        Self {
            term_ops: OverrideSlot::new("term_ops", term_ops_base),
            tty_io: OverrideSlot::new("tty_io", tty_io_base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PassthroughTtyIo;

    fn slot() -> (OverrideSlot<dyn TtyIo>, SharedImpl<dyn TtyIo>) {
        let base: SharedImpl<dyn TtyIo> = Rc::new(RefCell::new(PassthroughTtyIo));
        (OverrideSlot::new("tty_io", base.clone()), base)
    }

    #[test]
    fn install_returns_previous() {
        let (mut slot, base) = slot();
        let filter: SharedImpl<dyn TtyIo> = Rc::new(RefCell::new(PassthroughTtyIo));
        let prev = slot.install(filter.clone());
        assert!(Rc::ptr_eq(&prev, &base));
        assert!(Rc::ptr_eq(&slot.current(), &filter));
        assert_eq!(slot.depth(), 2);
    }

    #[test]
    fn lifo_unwind_succeeds() {
        let (mut slot, base) = slot();
        let a: SharedImpl<dyn TtyIo> = Rc::new(RefCell::new(PassthroughTtyIo));
        let b: SharedImpl<dyn TtyIo> = Rc::new(RefCell::new(PassthroughTtyIo));
        slot.install(a.clone());
        slot.install(b.clone());
        slot.uninstall(&b).unwrap();
        slot.uninstall(&a).unwrap();
        slot.verify_unwound(&base).unwrap();
    }

    #[test]
    fn out_of_order_unwind_is_a_stacking_violation() {
        let (mut slot, _base) = slot();
        let a: SharedImpl<dyn TtyIo> = Rc::new(RefCell::new(PassthroughTtyIo));
        let b: SharedImpl<dyn TtyIo> = Rc::new(RefCell::new(PassthroughTtyIo));
        slot.install(a.clone());
        slot.install(b);
        let err = slot.uninstall(&a).unwrap_err();
        assert!(matches!(err, TermError::StackingViolation { slot: "tty_io" }));
    }

    #[test]
    fn leftover_override_fails_verification() {
        let (mut slot, base) = slot();
        slot.install(Rc::new(RefCell::new(PassthroughTtyIo)));
        assert!(slot.verify_unwound(&base).is_err());
    }
}
