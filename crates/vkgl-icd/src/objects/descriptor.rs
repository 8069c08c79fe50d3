use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use ash::vk;

use crate::objects::{Buffer, DescriptorSetLayout, ImageView, Sampler};

#[derive(Debug, Clone)]
pub struct BufferRange {
    pub buffer: Arc<Buffer>,
    pub offset: u64,
    pub range: u64,
}

impl BufferRange {
    /// Size of the range with `vk::WHOLE_SIZE` resolved.
    pub fn size(&self) -> u64 {
        self.buffer.range(self.offset, self.range)
    }
}

/// One written array element of a descriptor set.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Sampler(Arc<Sampler>),
    CombinedImageSampler {
        view: Arc<ImageView>,
        sampler: Arc<Sampler>,
    },
    SampledImage(Arc<ImageView>),
    StorageImage(Arc<ImageView>),
    InputAttachment(Arc<ImageView>),
    UniformBuffer(BufferRange),
    StorageBuffer(BufferRange),
    UniformBufferDynamic(BufferRange),
    StorageBufferDynamic(BufferRange),
}

impl Descriptor {
    pub fn buffer_range(&self) -> Option<&BufferRange> {
        match self {
            Descriptor::UniformBuffer(r)
            | Descriptor::StorageBuffer(r)
            | Descriptor::UniformBufferDynamic(r)
            | Descriptor::StorageBufferDynamic(r) => Some(r),
            _ => None,
        }
    }

    /// Whether shaders can write through this descriptor.
    pub fn is_storage_buffer(&self) -> bool {
        matches!(self, Descriptor::StorageBuffer(_) | Descriptor::StorageBufferDynamic(_))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            Descriptor::UniformBufferDynamic(_) | Descriptor::StorageBufferDynamic(_)
        )
    }

    pub fn descriptor_type(&self) -> vk::DescriptorType {
        match self {
            Descriptor::Sampler(_) => vk::DescriptorType::SAMPLER,
            Descriptor::CombinedImageSampler { .. } => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            Descriptor::SampledImage(_) => vk::DescriptorType::SAMPLED_IMAGE,
            Descriptor::StorageImage(_) => vk::DescriptorType::STORAGE_IMAGE,
            Descriptor::InputAttachment(_) => vk::DescriptorType::INPUT_ATTACHMENT,
            Descriptor::UniformBuffer(_) => vk::DescriptorType::UNIFORM_BUFFER,
            Descriptor::StorageBuffer(_) => vk::DescriptorType::STORAGE_BUFFER,
            Descriptor::UniformBufferDynamic(_) => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
            Descriptor::StorageBufferDynamic(_) => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        }
    }
}

/// Descriptor types this driver can bind. Texel buffers and inline uniform
/// blocks have no GL counterpart here.
pub fn is_supported_descriptor_type(ty: vk::DescriptorType) -> bool {
    matches!(
        ty,
        vk::DescriptorType::SAMPLER
            | vk::DescriptorType::COMBINED_IMAGE_SAMPLER
            | vk::DescriptorType::SAMPLED_IMAGE
            | vk::DescriptorType::STORAGE_IMAGE
            | vk::DescriptorType::INPUT_ATTACHMENT
            | vk::DescriptorType::UNIFORM_BUFFER
            | vk::DescriptorType::STORAGE_BUFFER
            | vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
            | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
    )
}

#[derive(Debug)]
pub struct DescriptorSet {
    handle: vk::DescriptorSet,
    layout: Arc<DescriptorSetLayout>,
    descriptors: Mutex<BTreeMap<(u32, u32), Descriptor>>,
}

impl DescriptorSet {
    pub fn new(handle: vk::DescriptorSet, layout: Arc<DescriptorSetLayout>) -> Self {
        Self {
            handle,
            layout,
            descriptors: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn handle(&self) -> vk::DescriptorSet {
        self.handle
    }

    pub fn layout(&self) -> &Arc<DescriptorSetLayout> {
        &self.layout
    }

    /// Writes consecutive array elements starting at `array_element`.
    /// Returns false when the write does not match the layout.
    pub fn write(&self, binding: u32, array_element: u32, descriptors: Vec<Descriptor>) -> bool {
        let Some(slot) = self.layout.binding(binding) else {
            return false;
        };
        if descriptors.iter().any(|d| d.descriptor_type() != slot.descriptor_type)
            || array_element as usize + descriptors.len() > slot.count as usize
        {
            return false;
        }
        let mut map = self.lock();
        for (i, d) in descriptors.into_iter().enumerate() {
            map.insert((binding, array_element + i as u32), d);
        }
        true
    }

    pub fn get(&self, binding: u32, array_element: u32) -> Option<Descriptor> {
        self.lock().get(&(binding, array_element)).cloned()
    }

    /// Every written element in binding, then array element order.
    pub fn snapshot(&self) -> Vec<((u32, u32), Descriptor)> {
        self.lock().iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    /// Position of a dynamic descriptor among the set's dynamic offsets.
    pub fn dynamic_index(&self, binding: u32, array_element: u32) -> Option<usize> {
        let mut index = 0;
        for b in self.layout.bindings() {
            let dynamic = matches!(
                b.descriptor_type,
                vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
                    | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
            );
            if !dynamic {
                continue;
            }
            if b.binding == binding {
                return (array_element < b.count).then_some(index + array_element as usize);
            }
            index += b.count as usize;
        }
        None
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<(u32, u32), Descriptor>> {
        self.descriptors.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::DescriptorBinding;
    use ash::vk::Handle;

    fn dynamic_layout() -> Arc<DescriptorSetLayout> {
        let binding = |binding, descriptor_type, count| DescriptorBinding {
            binding,
            descriptor_type,
            count,
            stages: vk::ShaderStageFlags::VERTEX,
        };
        Arc::new(DescriptorSetLayout::new(
            vk::DescriptorSetLayout::from_raw(1),
            vec![
                binding(0, vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC, 2),
                binding(1, vk::DescriptorType::UNIFORM_BUFFER, 1),
                binding(2, vk::DescriptorType::STORAGE_BUFFER_DYNAMIC, 1),
            ],
        ))
    }

    #[test]
    fn dynamic_offsets_follow_binding_order() {
        let set = DescriptorSet::new(vk::DescriptorSet::from_raw(2), dynamic_layout());
        assert_eq!(set.dynamic_index(0, 1), Some(1));
        assert_eq!(set.dynamic_index(2, 0), Some(2));
        assert_eq!(set.dynamic_index(1, 0), None);
    }

    #[test]
    fn mismatched_write_is_rejected() {
        let set = DescriptorSet::new(vk::DescriptorSet::from_raw(2), dynamic_layout());
        let buffer = Arc::new(Buffer::new(
            vk::Buffer::from_raw(3),
            64,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
        ));
        let range = BufferRange {
            buffer,
            offset: 0,
            range: vk::WHOLE_SIZE,
        };
        assert!(!set.write(0, 0, vec![Descriptor::UniformBuffer(range.clone())]));
        assert!(set.write(1, 0, vec![Descriptor::UniformBuffer(range)]));
        assert_eq!(set.snapshot().len(), 1);
    }
}
