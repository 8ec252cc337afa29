//! Frame scheduling and shared field slots
//!
//! Everything runs on one thread. Redraw requests are flags consumed once per
//! tick, and fields are published by swapping an `Rc` so a reader holds either
//! the old value or the new one.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Coalesces redraw requests: any number per tick yield one paint
#[derive(Debug, Default)]
pub struct RedrawScheduler {
    pending: bool,
    cancelled: bool,
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a paint on the next tick. Ignored after `cancel`.
    pub fn request(&mut self) {
        if !self.cancelled {
            self.pending = true;
        }
    }

    /// Consume the pending request, if any
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Drop any pending frame and refuse further requests
    pub fn cancel(&mut self) {
        self.pending = false;
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

struct SlotInner<T> {
    value: RefCell<Option<Rc<T>>>,
    generation: Cell<u64>,
}

/// Shared handle to the current value of a field.
///
/// The driver writes, layers read. Cloning the handle shares the slot.
pub struct Slot<T> {
    inner: Rc<SlotInner<T>>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Slot<T> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SlotInner {
                value: RefCell::new(None),
                generation: Cell::new(0),
            }),
        }
    }

    /// Publish a new value, replacing the old one in a single swap
    pub fn set(&self, value: T) {
        self.replace(Some(Rc::new(value)));
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    fn replace(&self, value: Option<Rc<T>>) {
        *self.inner.value.borrow_mut() = value;
        self.inner.generation.set(self.inner.generation.get() + 1);
    }

    /// Current value; the returned `Rc` stays valid across later swaps
    pub fn get(&self) -> Option<Rc<T>> {
        self.inner.value.borrow().clone()
    }

    /// Bumped on every set or clear
    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.value.borrow().is_none()
    }
}
