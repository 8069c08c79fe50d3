use std::sync::{Arc, OnceLock};

use ash::vk;
use vkgl_gl::consts as gl;
use vkgl_gl::TextureSubresource;

use crate::dependents::ObjectId;
use crate::format::FormatInfo;
use crate::handle::DeviceObject;
use crate::objects::MemoryBinding;

#[derive(Debug)]
pub struct Image {
    handle: vk::Image,
    gl_name: u32,
    target: u32,
    format: vk::Format,
    info: FormatInfo,
    extent: vk::Extent3D,
    mip_levels: u32,
    array_layers: u32,
    samples: u32,
    binding: OnceLock<MemoryBinding>,
}

impl DeviceObject for Image {
    type Handle = vk::Image;

    fn handle(&self) -> vk::Image {
        self.handle
    }
}

/// GL texture target for an image. Cube-compatible 2D arrays become cube
/// maps (or cube map arrays past six layers).
pub fn texture_target(
    image_type: vk::ImageType,
    array_layers: u32,
    samples: u32,
    cube_compatible: bool,
) -> u32 {
    match image_type {
        vk::ImageType::TYPE_1D if array_layers > 1 => gl::TEXTURE_1D_ARRAY,
        vk::ImageType::TYPE_1D => gl::TEXTURE_1D,
        vk::ImageType::TYPE_3D => gl::TEXTURE_3D,
        _ if cube_compatible && array_layers > 6 => gl::TEXTURE_CUBE_MAP_ARRAY,
        _ if cube_compatible && array_layers == 6 => gl::TEXTURE_CUBE_MAP,
        _ if samples > 1 && array_layers > 1 => gl::TEXTURE_2D_MULTISAMPLE_ARRAY,
        _ if samples > 1 => gl::TEXTURE_2D_MULTISAMPLE,
        _ if array_layers > 1 => gl::TEXTURE_2D_ARRAY,
        _ => gl::TEXTURE_2D,
    }
}

impl Image {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        handle: vk::Image,
        gl_name: u32,
        target: u32,
        format: vk::Format,
        info: FormatInfo,
        extent: vk::Extent3D,
        mip_levels: u32,
        array_layers: u32,
        samples: u32,
    ) -> Self {
        Self {
            handle,
            gl_name,
            target,
            format,
            info,
            extent,
            mip_levels,
            array_layers,
            samples,
            binding: OnceLock::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::of(self.handle)
    }

    pub fn gl_name(&self) -> u32 {
        self.gl_name
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn info(&self) -> &FormatInfo {
        &self.info
    }

    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    pub fn is_3d(&self) -> bool {
        self.target == gl::TEXTURE_3D
    }

    pub fn bind_memory(&self, binding: MemoryBinding) -> bool {
        self.binding.set(binding).is_ok()
    }

    pub fn binding(&self) -> Option<&MemoryBinding> {
        self.binding.get()
    }

    /// Host-visible backing memory, if the application can map this image.
    pub fn mappable_binding(&self) -> Option<&MemoryBinding> {
        self.binding.get().filter(|b| b.memory.is_host_visible())
    }

    pub fn level_extent(&self, level: u32) -> [u32; 3] {
        let shrink = |v: u32| (v >> level).max(1);
        [
            shrink(self.extent.width),
            shrink(self.extent.height),
            if self.is_3d() { shrink(self.extent.depth) } else { 1 },
        ]
    }

    /// Tightly packed size of one layer of `level`.
    pub fn layer_size(&self, level: u32) -> u64 {
        let [w, h, d] = self.level_extent(level);
        self.info.region_size(w, h, d)
    }

    pub fn subresource(&self, level: u32, layer: u32, color_slot: u32) -> TextureSubresource {
        TextureSubresource {
            texture: self.gl_name,
            target: self.target,
            level,
            layer,
            attachment: self.info.attachment_point(color_slot),
        }
    }

    /// Target for `glTexSubImage*` on a single layer. Non-array cube maps are
    /// uploaded one face at a time.
    pub fn upload_target(&self, layer: u32) -> u32 {
        if self.target == gl::TEXTURE_CUBE_MAP {
            gl::TEXTURE_CUBE_MAP_POSITIVE_X + layer
        } else {
            self.target
        }
    }
}

/// Image views share the GL texture of their image and address the viewed
/// subresource range explicitly.
#[derive(Debug)]
pub struct ImageView {
    handle: vk::ImageView,
    image: Arc<Image>,
    format: vk::Format,
    info: FormatInfo,
    base_level: u32,
    base_layer: u32,
    layer_count: u32,
}

impl ImageView {
    pub fn new(
        handle: vk::ImageView,
        image: Arc<Image>,
        format: vk::Format,
        info: FormatInfo,
        range: vk::ImageSubresourceRange,
    ) -> Self {
        let layer_count = if range.layer_count == vk::REMAINING_ARRAY_LAYERS {
            image.array_layers().saturating_sub(range.base_array_layer)
        } else {
            range.layer_count
        };
        Self {
            handle,
            image,
            format,
            info,
            base_level: range.base_mip_level,
            base_layer: range.base_array_layer,
            layer_count,
        }
    }

    pub fn handle(&self) -> vk::ImageView {
        self.handle
    }

    pub fn image(&self) -> &Arc<Image> {
        &self.image
    }

    pub fn gl_name(&self) -> u32 {
        self.image.gl_name()
    }

    pub fn target(&self) -> u32 {
        self.image.target()
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn info(&self) -> &FormatInfo {
        &self.info
    }

    pub fn base_level(&self) -> u32 {
        self.base_level
    }

    pub fn base_layer(&self) -> u32 {
        self.base_layer
    }

    pub fn layer_count(&self) -> u32 {
        self.layer_count
    }

    pub fn subresource(&self, color_slot: u32) -> TextureSubresource {
        self.image.subresource(self.base_level, self.base_layer, color_slot)
    }

    /// Two views name the same attachment when they alias the same texels.
    pub fn same_subresource(&self, other: &ImageView) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
            && self.base_level == other.base_level
            && self.base_layer == other.base_layer
    }
}

#[derive(Debug)]
pub struct Sampler {
    handle: vk::Sampler,
    gl_name: u32,
}

impl Sampler {
    pub fn new(handle: vk::Sampler, gl_name: u32) -> Self {
        Self { handle, gl_name }
    }

    pub fn handle(&self) -> vk::Sampler {
        self.handle
    }

    pub fn gl_name(&self) -> u32 {
        self.gl_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_targets() {
        assert_eq!(texture_target(vk::ImageType::TYPE_2D, 6, 1, true), gl::TEXTURE_CUBE_MAP);
        assert_eq!(texture_target(vk::ImageType::TYPE_2D, 12, 1, true), gl::TEXTURE_CUBE_MAP_ARRAY);
        assert_eq!(texture_target(vk::ImageType::TYPE_2D, 6, 1, false), gl::TEXTURE_2D_ARRAY);
        assert_eq!(texture_target(vk::ImageType::TYPE_2D, 1, 4, false), gl::TEXTURE_2D_MULTISAMPLE);
    }
}
