//! Destruction notifications.
//!
//! Objects that other objects keep bookkeeping about (device memory, buffers)
//! own a [`Dependents`] registry. Interested parties register a weak reference
//! and are called synchronously from the destroyer before the object goes
//! away. The registry never keeps a listener alive.

use std::fmt;
use std::sync::{Mutex, Weak};

use ash::vk;

/// Type-tagged raw handle value, used wherever an object must be named without
/// holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub kind: vk::ObjectType,
    pub raw: u64,
}

impl ObjectId {
    pub fn of<H: vk::Handle>(handle: H) -> Self {
        Self {
            kind: H::TYPE,
            raw: handle.as_raw(),
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:#x})", self.kind, self.raw)
    }
}

pub trait DestructionListener: Send + Sync {
    fn on_destroyed(&self, object: ObjectId);
}

#[derive(Default)]
pub struct Dependents {
    listeners: Mutex<Vec<Weak<dyn DestructionListener>>>,
}

impl fmt::Debug for Dependents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependents").field("live", &self.len()).finish()
    }
}

impl Dependents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` unless it is already registered.
    pub fn register(&self, listener: Weak<dyn DestructionListener>) {
        let mut listeners = self.lock();
        listeners.retain(|l| l.strong_count() > 0);
        if !listeners.iter().any(|l| Weak::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
    }

    /// Calls every live listener once and empties the registry.
    pub fn notify(&self, object: ObjectId) {
        let listeners = std::mem::take(&mut *self.lock());
        for listener in listeners.iter().filter_map(Weak::upgrade) {
            listener.on_destroyed(object);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().iter().filter(|l| l.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Weak<dyn DestructionListener>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::sync::Arc;

    #[derive(Default)]
    struct Seen(Mutex<Vec<ObjectId>>);

    impl DestructionListener for Seen {
        fn on_destroyed(&self, object: ObjectId) {
            self.0.lock().unwrap().push(object);
        }
    }

    #[test]
    fn notifies_once_and_skips_dropped_listeners() {
        let deps = Dependents::new();
        let alive = Arc::new(Seen::default());
        let dropped = Arc::new(Seen::default());
        let alive_dyn: Arc<dyn DestructionListener> = alive.clone();
        let dropped_dyn: Arc<dyn DestructionListener> = dropped.clone();
        deps.register(Arc::downgrade(&alive_dyn));
        deps.register(Arc::downgrade(&alive_dyn));
        deps.register(Arc::downgrade(&dropped_dyn));
        drop(dropped_dyn);
        drop(dropped);
        assert_eq!(deps.len(), 1);

        let id = ObjectId::of(vk::Buffer::from_raw(7));
        deps.notify(id);
        deps.notify(id);
        assert_eq!(*alive.0.lock().unwrap(), vec![id]);
    }
}
