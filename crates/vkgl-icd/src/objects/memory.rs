use std::sync::{Mutex, MutexGuard};

use ash::vk;

use crate::dependents::{Dependents, ObjectId};
use crate::error::{IcdError, Result};
use crate::handle::DeviceObject;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedRange {
    pub offset: u64,
    pub size: u64,
}

/// A `VkDeviceMemory` allocation.
///
/// Every allocation is backed by one GL buffer object; buffers bound to the
/// allocation alias it at their bind offset. Host-visible allocations also
/// keep a host shadow which is what the application reads and writes while
/// mapped. Recording inserts explicit upload/download commands to move data
/// between the shadow and the GL buffer; nothing is coherent implicitly.
#[derive(Debug)]
pub struct DeviceMemory {
    handle: vk::DeviceMemory,
    gl_buffer: u32,
    size: u64,
    host_visible: bool,
    shadow: Mutex<Vec<u8>>,
    mapped: Mutex<Option<MappedRange>>,
    dependents: Dependents,
}

impl DeviceObject for DeviceMemory {
    type Handle = vk::DeviceMemory;

    fn handle(&self) -> vk::DeviceMemory {
        self.handle
    }
}

impl DeviceMemory {
    pub fn new(handle: vk::DeviceMemory, gl_buffer: u32, size: u64, host_visible: bool) -> Self {
        let shadow = if host_visible {
            vec![0; size as usize]
        } else {
            Vec::new()
        };
        Self {
            handle,
            gl_buffer,
            size,
            host_visible,
            shadow: Mutex::new(shadow),
            mapped: Mutex::new(None),
            dependents: Dependents::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::of(self.handle)
    }

    pub fn gl_buffer(&self) -> u32 {
        self.gl_buffer
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_host_visible(&self) -> bool {
        self.host_visible
    }

    pub fn dependents(&self) -> &Dependents {
        &self.dependents
    }

    /// `vkMapMemory`. `size` of `vk::WHOLE_SIZE` maps to the end.
    pub fn map(&self, offset: u64, size: u64) -> Result<MappedRange> {
        if !self.host_visible {
            return Err(IcdError::MemoryMapFailed {
                raw: vk::Handle::as_raw(self.handle),
            });
        }
        let size = if size == vk::WHOLE_SIZE {
            self.size.saturating_sub(offset)
        } else {
            size
        };
        let range = MappedRange { offset, size };
        *lock(&self.mapped) = Some(range);
        Ok(range)
    }

    pub fn unmap(&self) {
        *lock(&self.mapped) = None;
    }

    pub fn is_mapped(&self) -> bool {
        lock(&self.mapped).is_some()
    }

    pub fn mapped_range(&self) -> Option<MappedRange> {
        *lock(&self.mapped)
    }

    /// Host write through the mapping.
    pub fn write(&self, offset: u64, data: &[u8]) {
        let mut shadow = lock(&self.shadow);
        let start = offset as usize;
        let end = (start + data.len()).min(shadow.len());
        if start < end {
            shadow[start..end].copy_from_slice(&data[..end - start]);
        }
    }

    /// Host read through the mapping.
    pub fn read(&self, offset: u64, len: usize) -> Vec<u8> {
        let shadow = lock(&self.shadow);
        let start = (offset as usize).min(shadow.len());
        let end = (start + len).min(shadow.len());
        shadow[start..end].to_vec()
    }

    pub fn shadow(&self) -> MutexGuard<'_, Vec<u8>> {
        lock(&self.shadow)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn device_local_memory_cannot_be_mapped() {
        let mem = DeviceMemory::new(vk::DeviceMemory::from_raw(3), 1, 64, false);
        assert!(matches!(mem.map(0, 16), Err(IcdError::MemoryMapFailed { raw: 3 })));
    }

    #[test]
    fn whole_size_maps_to_end() {
        let mem = DeviceMemory::new(vk::DeviceMemory::from_raw(3), 1, 64, true);
        let range = mem.map(16, vk::WHOLE_SIZE).unwrap();
        assert_eq!(range.size, 48);
        mem.write(60, &[1, 2, 3, 4, 5, 6]);
        assert_eq!(mem.read(60, 8), vec![1, 2, 3, 4]);
        mem.unmap();
        assert!(!mem.is_mapped());
    }
}
