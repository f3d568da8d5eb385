use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::foundation::error::AfterimageResult;

/// Cancellation handle returned by hook registration.
///
/// Cancelling is O(1) and may happen at any time, including from inside a running hook. It only
/// affects hooks that have not been invoked yet in the current iteration. Cancelling twice, or
/// after the owning list is gone, does nothing.
#[derive(Clone, Debug)]
pub struct HookHandle {
    live: Weak<Cell<bool>>,
}

impl HookHandle {
    /// Stop the hook from running again.
    pub fn cancel(&self) {
        if let Some(live) = self.live.upgrade() {
            live.set(false);
        }
    }

    /// Return `true` while the hook is registered and not cancelled.
    pub fn is_active(&self) -> bool {
        self.live.upgrade().is_some_and(|l| l.get())
    }
}

struct HookEntry<F: ?Sized> {
    live: Rc<Cell<bool>>,
    callback: Box<F>,
}

/// Ordered hook collection; the most recently registered hook runs first.
pub(crate) struct HookList<F: ?Sized> {
    // Registration order; iterated back to front.
    entries: Vec<HookEntry<F>>,
}

impl<F: ?Sized> Default for HookList<F> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<F: ?Sized> HookList<F> {
    pub(crate) fn register(&mut self, callback: Box<F>) -> HookHandle {
        let live = Rc::new(Cell::new(true));
        let handle = HookHandle {
            live: Rc::downgrade(&live),
        };
        self.entries.push(HookEntry { live, callback });
        handle
    }

    /// Invoke every live hook, newest first, stopping at the first failure.
    ///
    /// Cancelled entries are swept afterwards whether or not a hook failed.
    pub(crate) fn run(
        &mut self,
        mut call: impl FnMut(&mut F) -> AfterimageResult<()>,
    ) -> AfterimageResult<()> {
        let mut result = Ok(());
        for entry in self.entries.iter_mut().rev() {
            if !entry.live.get() {
                continue;
            }
            if let Err(e) = call(&mut entry.callback) {
                result = Err(e);
                break;
            }
        }
        self.entries.retain(|e| e.live.get());
        result
    }

    /// Live (not cancelled) hooks.
    pub(crate) fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.live.get()).count()
    }

    /// Drop every hook; outstanding handles become inert.
    pub(crate) fn clear(&mut self) {
        for e in &self.entries {
            e.live.set(false);
        }
        self.entries.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/hooks.rs"]
mod tests;
