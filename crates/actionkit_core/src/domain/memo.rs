//! Generation-keyed memo cell for derived views.

use std::cell::RefCell;
use std::sync::Arc;

/// Holds one derived value tagged with the registry generation it was built
/// from. A read with a newer generation rebuilds the value.
#[derive(Debug)]
pub(crate) struct Memo<T> {
    slot: RefCell<Option<(u64, Arc<T>)>>,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }
}

impl<T> Memo<T> {
    pub(crate) fn get_or_build(&self, generation: u64, build: impl FnOnce() -> T) -> Arc<T> {
        if let Some(value) = self.get(generation) {
            return value;
        }
        self.set(generation, build())
    }

    /// Cached value when it matches `generation`.
    pub(crate) fn get(&self, generation: u64) -> Option<Arc<T>> {
        match &*self.slot.borrow() {
            Some((built_at, value)) if *built_at == generation => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Replaces the cached value, e.g. with externally supplied state.
    pub(crate) fn set(&self, generation: u64, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.slot.borrow_mut() = Some((generation, Arc::clone(&value)));
        value
    }

    pub(crate) fn invalidate(&self) {
        self.slot.borrow_mut().take();
    }
}
