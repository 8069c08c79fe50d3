//! Opaque Vulkan handles to driver objects and back.
//!
//! Handles are plain counters handed out by a [`HandleAllocator`]; they are
//! never pointers. A [`HandleTable`] maps live handles to their objects, and
//! [`DeviceObject::handle`] is the inverse direction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use ash::vk;

use crate::error::{IcdError, Result};

pub trait DeviceObject: Send + Sync {
    type Handle: vk::Handle + Copy;

    fn handle(&self) -> Self::Handle;
}

#[derive(Debug)]
pub struct HandleAllocator {
    next: AtomicU64,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        // 0 is VK_NULL_HANDLE.
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl HandleAllocator {
    pub fn next<H: vk::Handle>(&self) -> H {
        H::from_raw(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
pub struct HandleTable<T: DeviceObject> {
    objects: RwLock<HashMap<u64, Arc<T>>>,
}

impl<T: DeviceObject> Default for HandleTable<T> {
    fn default() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: DeviceObject> HandleTable<T> {
    pub fn insert(&self, object: Arc<T>) -> Arc<T> {
        let raw = vk::Handle::as_raw(object.handle());
        self.write().insert(raw, object.clone());
        object
    }

    pub fn get(&self, handle: T::Handle) -> Option<Arc<T>> {
        self.read().get(&vk::Handle::as_raw(handle)).cloned()
    }

    pub fn get_raw(&self, raw: u64) -> Option<Arc<T>> {
        self.read().get(&raw).cloned()
    }

    pub fn resolve(&self, handle: T::Handle) -> Result<Arc<T>> {
        self.get(handle).ok_or(IcdError::InvalidHandle {
            kind: <T::Handle as vk::Handle>::TYPE,
            raw: vk::Handle::as_raw(handle),
        })
    }

    pub fn remove(&self, handle: T::Handle) -> Option<Arc<T>> {
        self.write().remove(&vk::Handle::as_raw(handle))
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<u64, Arc<T>>> {
        self.objects.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<u64, Arc<T>>> {
        self.objects.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing(vk::Buffer);

    impl DeviceObject for Thing {
        type Handle = vk::Buffer;

        fn handle(&self) -> vk::Buffer {
            self.0
        }
    }

    #[test]
    fn resolves_and_forgets() {
        let alloc = HandleAllocator::default();
        let table = HandleTable::<Thing>::default();
        let handle: vk::Buffer = alloc.next();
        assert_ne!(vk::Handle::as_raw(handle), 0);

        table.insert(Arc::new(Thing(handle)));
        assert_eq!(table.resolve(handle).unwrap().handle(), handle);

        table.remove(handle);
        let err = table.resolve(handle).err().unwrap();
        assert!(matches!(
            err,
            IcdError::InvalidHandle {
                kind: vk::ObjectType::BUFFER,
                ..
            }
        ));
    }
}
