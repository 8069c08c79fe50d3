use std::sync::{Arc, OnceLock};

use ash::vk;

use crate::dependents::{Dependents, ObjectId};
use crate::handle::DeviceObject;
use crate::objects::DeviceMemory;

#[derive(Debug, Clone)]
pub struct MemoryBinding {
    pub memory: Arc<DeviceMemory>,
    pub offset: u64,
}

#[derive(Debug)]
pub struct Buffer {
    handle: vk::Buffer,
    size: u64,
    usage: vk::BufferUsageFlags,
    binding: OnceLock<MemoryBinding>,
    dependents: Dependents,
}

impl DeviceObject for Buffer {
    type Handle = vk::Buffer;

    fn handle(&self) -> vk::Buffer {
        self.handle
    }
}

impl Buffer {
    pub fn new(handle: vk::Buffer, size: u64, usage: vk::BufferUsageFlags) -> Self {
        Self {
            handle,
            size,
            usage,
            binding: OnceLock::new(),
            dependents: Dependents::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::of(self.handle)
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    pub fn dependents(&self) -> &Dependents {
        &self.dependents
    }

    /// `vkBindBufferMemory`. Returns false if the buffer was already bound.
    pub fn bind_memory(&self, memory: Arc<DeviceMemory>, offset: u64) -> bool {
        self.binding.set(MemoryBinding { memory, offset }).is_ok()
    }

    pub fn binding(&self) -> Option<&MemoryBinding> {
        self.binding.get()
    }

    pub fn memory(&self) -> Option<&Arc<DeviceMemory>> {
        self.binding.get().map(|b| &b.memory)
    }

    /// GL buffer the contents live in; 0 while unbound.
    pub fn gl_name(&self) -> u32 {
        self.binding.get().map_or(0, |b| b.memory.gl_buffer())
    }

    /// Translates an offset into this buffer to an offset into its GL buffer.
    pub fn gl_offset(&self, offset: u64) -> u64 {
        self.binding.get().map_or(offset, |b| b.offset + offset)
    }

    /// Resolves `vk::WHOLE_SIZE` against the bytes remaining after `offset`.
    pub fn range(&self, offset: u64, size: u64) -> u64 {
        if size == vk::WHOLE_SIZE {
            self.size.saturating_sub(offset)
        } else {
            size
        }
    }

    pub fn is_mapped(&self) -> bool {
        self.memory().is_some_and(|m| m.is_mapped())
    }
}
