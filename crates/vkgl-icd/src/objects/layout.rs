use std::sync::Arc;

use ash::vk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
}

#[derive(Debug)]
pub struct DescriptorSetLayout {
    handle: vk::DescriptorSetLayout,
    bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayout {
    pub fn new(handle: vk::DescriptorSetLayout, mut bindings: Vec<DescriptorBinding>) -> Self {
        bindings.sort_by_key(|b| b.binding);
        Self { handle, bindings }
    }

    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.handle
    }

    pub fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    pub fn binding(&self, binding: u32) -> Option<&DescriptorBinding> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    /// Number of dynamic offsets a bind of a set with this layout consumes.
    pub fn dynamic_count(&self) -> usize {
        self.bindings
            .iter()
            .filter(|b| {
                matches!(
                    b.descriptor_type,
                    vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
                        | vk::DescriptorType::STORAGE_BUFFER_DYNAMIC
                )
            })
            .map(|b| b.count as usize)
            .sum()
    }

    /// Layouts are compatible when they are defined identically.
    pub fn is_compatible(&self, other: &DescriptorSetLayout) -> bool {
        self.bindings == other.bindings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantRange {
    pub stages: vk::ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

/// How far two pipeline layouts agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutCompatibility {
    /// Length of the longest prefix of identical set layouts.
    pub compatible_sets: usize,
    pub push_constants: bool,
}

impl LayoutCompatibility {
    /// First set index whose binding is disturbed when switching layouts.
    /// Incompatible push constants disturb every set.
    pub fn first_invalidated(&self) -> usize {
        if self.push_constants {
            self.compatible_sets
        } else {
            0
        }
    }
}

#[derive(Debug)]
pub struct PipelineLayout {
    handle: vk::PipelineLayout,
    set_layouts: Vec<Arc<DescriptorSetLayout>>,
    push_constant_ranges: Vec<PushConstantRange>,
}

impl PipelineLayout {
    pub fn new(
        handle: vk::PipelineLayout,
        set_layouts: Vec<Arc<DescriptorSetLayout>>,
        push_constant_ranges: Vec<PushConstantRange>,
    ) -> Self {
        Self {
            handle,
            set_layouts,
            push_constant_ranges,
        }
    }

    pub fn handle(&self) -> vk::PipelineLayout {
        self.handle
    }

    pub fn set_layouts(&self) -> &[Arc<DescriptorSetLayout>] {
        &self.set_layouts
    }

    pub fn set_layout(&self, set: u32) -> Option<&Arc<DescriptorSetLayout>> {
        self.set_layouts.get(set as usize)
    }

    pub fn push_constant_ranges(&self) -> &[PushConstantRange] {
        &self.push_constant_ranges
    }

    pub fn compatibility(&self, other: &PipelineLayout) -> LayoutCompatibility {
        let compatible_sets = self
            .set_layouts
            .iter()
            .zip(&other.set_layouts)
            .take_while(|(a, b)| Arc::ptr_eq(a, b) || a.is_compatible(b))
            .count();
        LayoutCompatibility {
            compatible_sets,
            push_constants: self.push_constant_ranges == other.push_constant_ranges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn set_layout(raw: u64, ty: vk::DescriptorType) -> Arc<DescriptorSetLayout> {
        Arc::new(DescriptorSetLayout::new(
            vk::DescriptorSetLayout::from_raw(raw),
            vec![DescriptorBinding {
                binding: 0,
                descriptor_type: ty,
                count: 1,
                stages: vk::ShaderStageFlags::ALL_GRAPHICS,
            }],
        ))
    }

    #[test]
    fn prefix_stops_at_first_difference() {
        let ubo = set_layout(1, vk::DescriptorType::UNIFORM_BUFFER);
        let tex = set_layout(2, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        let ubo_again = set_layout(3, vk::DescriptorType::UNIFORM_BUFFER);
        let a = PipelineLayout::new(
            vk::PipelineLayout::from_raw(10),
            vec![ubo.clone(), ubo.clone(), tex.clone()],
            vec![],
        );
        let b = PipelineLayout::new(
            vk::PipelineLayout::from_raw(11),
            vec![ubo_again, tex.clone(), tex],
            vec![],
        );

        let compat = a.compatibility(&b);
        assert_eq!(compat.compatible_sets, 1);
        assert_eq!(compat.first_invalidated(), 1);
    }

    #[test]
    fn push_constant_mismatch_invalidates_everything() {
        let ubo = set_layout(1, vk::DescriptorType::UNIFORM_BUFFER);
        let range = PushConstantRange {
            stages: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: 16,
        };
        let handle = vk::PipelineLayout::from_raw(10);
        let a = PipelineLayout::new(handle, vec![ubo.clone()], vec![range]);
        let b = PipelineLayout::new(vk::PipelineLayout::from_raw(11), vec![ubo], vec![]);
        assert_eq!(a.compatibility(&b).first_invalidated(), 0);
    }

    #[test]
    fn dynamic_count_sums_array_sizes() {
        let layout = DescriptorSetLayout::new(
            vk::DescriptorSetLayout::from_raw(1),
            vec![
                DescriptorBinding {
                    binding: 1,
                    descriptor_type: vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
                    count: 2,
                    stages: vk::ShaderStageFlags::COMPUTE,
                },
                DescriptorBinding {
                    binding: 0,
                    descriptor_type: vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
                    count: 1,
                    stages: vk::ShaderStageFlags::COMPUTE,
                },
            ],
        );
        assert_eq!(layout.dynamic_count(), 3);
        assert_eq!(layout.bindings()[0].binding, 0);
    }
}
