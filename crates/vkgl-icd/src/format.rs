use ash::vk;
use vkgl_gl::consts as gl;

/// How texel values are interpreted, which selects the clear entry point and
/// the vertex attribute path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericClass {
    Float,
    Sint,
    Uint,
}

/// GL description of a Vulkan format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    pub internal_format: u32,
    /// Pixel transfer format/type pair. Unused for compressed formats.
    pub format: u32,
    pub ty: u32,
    pub components: u32,
    pub normalized: bool,
    pub class: NumericClass,
    /// Bytes per texel, or per block for compressed formats.
    pub block_size: u32,
    pub block_extent: (u32, u32),
    pub srgb: bool,
    pub aspects: vk::ImageAspectFlags,
}

impl FormatInfo {
    const fn color(
        internal_format: u32,
        format: u32,
        ty: u32,
        components: u32,
        normalized: bool,
        class: NumericClass,
        block_size: u32,
    ) -> Self {
        Self {
            internal_format,
            format,
            ty,
            components,
            normalized,
            class,
            block_size,
            block_extent: (1, 1),
            srgb: false,
            aspects: vk::ImageAspectFlags::COLOR,
        }
    }

    const fn depth(
        internal_format: u32,
        format: u32,
        ty: u32,
        block_size: u32,
        aspects: vk::ImageAspectFlags,
    ) -> Self {
        Self {
            internal_format,
            format,
            ty,
            components: 1,
            normalized: false,
            class: NumericClass::Float,
            block_size,
            block_extent: (1, 1),
            srgb: false,
            aspects,
        }
    }

    const fn bc(internal_format: u32, block_size: u32) -> Self {
        Self {
            internal_format,
            format: gl::NONE,
            ty: gl::NONE,
            components: 4,
            normalized: true,
            class: NumericClass::Float,
            block_size,
            block_extent: (4, 4),
            srgb: false,
            aspects: vk::ImageAspectFlags::COLOR,
        }
    }

    const fn srgb(mut self) -> Self {
        self.srgb = true;
        self
    }

    pub fn is_compressed(&self) -> bool {
        self.block_extent != (1, 1)
    }

    /// Integer formats that are not normalized must use the `I` attribute path.
    pub fn is_integer(&self) -> bool {
        self.class != NumericClass::Float && !self.normalized
    }

    pub fn has_depth(&self) -> bool {
        self.aspects.contains(vk::ImageAspectFlags::DEPTH)
    }

    pub fn has_stencil(&self) -> bool {
        self.aspects.contains(vk::ImageAspectFlags::STENCIL)
    }

    /// `glCopyImageSubData` requires matching texel (or block) sizes and the
    /// same compressed-ness on both sides.
    pub fn copy_compatible(&self, other: &FormatInfo) -> bool {
        self.block_size == other.block_size
            && self.block_extent == other.block_extent
            && self.aspects == other.aspects
    }

    /// Tightly packed size of a `width`×`height`×`depth` region.
    pub fn region_size(&self, width: u32, height: u32, depth: u32) -> u64 {
        let (bw, bh) = self.block_extent;
        let blocks_x = u64::from(width.div_ceil(bw));
        let blocks_y = u64::from(height.div_ceil(bh));
        blocks_x * blocks_y * u64::from(depth) * u64::from(self.block_size)
    }

    /// `glBlitFramebuffer` mask covering this format's aspects.
    pub fn blit_mask(&self) -> u32 {
        let mut mask = 0;
        if self.aspects.contains(vk::ImageAspectFlags::COLOR) {
            mask |= gl::COLOR_BUFFER_BIT;
        }
        if self.has_depth() {
            mask |= gl::DEPTH_BUFFER_BIT;
        }
        if self.has_stencil() {
            mask |= gl::STENCIL_BUFFER_BIT;
        }
        mask
    }

    /// Framebuffer attachment point for a single-aspect view of this format.
    pub fn attachment_point(&self, color_slot: u32) -> u32 {
        match (self.has_depth(), self.has_stencil()) {
            (true, true) => gl::DEPTH_STENCIL_ATTACHMENT,
            (true, false) => gl::DEPTH_ATTACHMENT,
            (false, true) => gl::STENCIL_ATTACHMENT,
            (false, false) => gl::COLOR_ATTACHMENT0 + color_slot,
        }
    }
}

pub fn format_info(format: vk::Format) -> Option<FormatInfo> {
    use NumericClass::{Float, Sint, Uint};

    let info = match format {
        vk::Format::R8_UNORM => {
            FormatInfo::color(gl::R8, gl::RED, gl::UNSIGNED_BYTE, 1, true, Float, 1)
        }
        vk::Format::R8G8_UNORM => {
            FormatInfo::color(gl::RG8, gl::RG, gl::UNSIGNED_BYTE, 2, true, Float, 2)
        }
        vk::Format::R8G8B8A8_UNORM => {
            FormatInfo::color(gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE, 4, true, Float, 4)
        }
        vk::Format::R8G8B8A8_SNORM => {
            FormatInfo::color(gl::RGBA8_SNORM, gl::RGBA, gl::BYTE, 4, true, Sint, 4)
        }
        vk::Format::R8G8B8A8_SRGB => {
            FormatInfo::color(gl::SRGB8_ALPHA8, gl::RGBA, gl::UNSIGNED_BYTE, 4, true, Float, 4)
                .srgb()
        }
        vk::Format::B8G8R8A8_UNORM => {
            FormatInfo::color(gl::RGBA8, gl::BGRA, gl::UNSIGNED_BYTE, 4, true, Float, 4)
        }
        vk::Format::B8G8R8A8_SRGB => {
            FormatInfo::color(gl::SRGB8_ALPHA8, gl::BGRA, gl::UNSIGNED_BYTE, 4, true, Float, 4)
                .srgb()
        }
        vk::Format::R8G8B8A8_UINT => {
            FormatInfo::color(gl::RGBA8UI, gl::RGBA_INTEGER, gl::UNSIGNED_BYTE, 4, false, Uint, 4)
        }
        vk::Format::A2B10G10R10_UNORM_PACK32 => FormatInfo::color(
            gl::RGB10_A2,
            gl::RGBA,
            gl::UNSIGNED_INT_2_10_10_10_REV,
            4,
            true,
            Float,
            4,
        ),
        vk::Format::B10G11R11_UFLOAT_PACK32 => FormatInfo::color(
            gl::R11F_G11F_B10F,
            gl::RGB,
            gl::UNSIGNED_INT_10F_11F_11F_REV,
            3,
            false,
            Float,
            4,
        ),
        vk::Format::R5G6B5_UNORM_PACK16 => {
            FormatInfo::color(gl::RGB565, gl::RGB, gl::UNSIGNED_SHORT_5_6_5, 3, true, Float, 2)
        }
        vk::Format::R16_UINT => {
            FormatInfo::color(gl::R16UI, gl::RED_INTEGER, gl::UNSIGNED_SHORT, 1, false, Uint, 2)
        }
        vk::Format::R16_SFLOAT => {
            FormatInfo::color(gl::R16F, gl::RED, gl::HALF_FLOAT, 1, false, Float, 2)
        }
        vk::Format::R16G16_SFLOAT => {
            FormatInfo::color(gl::RG16F, gl::RG, gl::HALF_FLOAT, 2, false, Float, 4)
        }
        vk::Format::R16G16B16A16_SFLOAT => {
            FormatInfo::color(gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT, 4, false, Float, 8)
        }
        vk::Format::R32_SFLOAT => {
            FormatInfo::color(gl::R32F, gl::RED, gl::FLOAT, 1, false, Float, 4)
        }
        vk::Format::R32G32_SFLOAT => {
            FormatInfo::color(gl::RG32F, gl::RG, gl::FLOAT, 2, false, Float, 8)
        }
        vk::Format::R32G32B32_SFLOAT => {
            FormatInfo::color(gl::RGB32F, gl::RGB, gl::FLOAT, 3, false, Float, 12)
        }
        vk::Format::R32G32B32A32_SFLOAT => {
            FormatInfo::color(gl::RGBA32F, gl::RGBA, gl::FLOAT, 4, false, Float, 16)
        }
        vk::Format::R32_UINT => {
            FormatInfo::color(gl::R32UI, gl::RED_INTEGER, gl::UNSIGNED_INT, 1, false, Uint, 4)
        }
        vk::Format::R32_SINT => {
            FormatInfo::color(gl::R32I, gl::RED_INTEGER, gl::INT, 1, false, Sint, 4)
        }
        vk::Format::R32G32B32A32_UINT => {
            FormatInfo::color(gl::RGBA32UI, gl::RGBA_INTEGER, gl::UNSIGNED_INT, 4, false, Uint, 16)
        }
        vk::Format::D16_UNORM => FormatInfo::depth(
            gl::DEPTH_COMPONENT16,
            gl::DEPTH_COMPONENT,
            gl::UNSIGNED_SHORT,
            2,
            vk::ImageAspectFlags::DEPTH,
        ),
        vk::Format::X8_D24_UNORM_PACK32 => FormatInfo::depth(
            gl::DEPTH_COMPONENT24,
            gl::DEPTH_COMPONENT,
            gl::UNSIGNED_INT,
            4,
            vk::ImageAspectFlags::DEPTH,
        ),
        vk::Format::D32_SFLOAT => FormatInfo::depth(
            gl::DEPTH_COMPONENT32F,
            gl::DEPTH_COMPONENT,
            gl::FLOAT,
            4,
            vk::ImageAspectFlags::DEPTH,
        ),
        vk::Format::S8_UINT => FormatInfo::depth(
            gl::STENCIL_INDEX8,
            gl::STENCIL_INDEX,
            gl::UNSIGNED_BYTE,
            1,
            vk::ImageAspectFlags::STENCIL,
        ),
        vk::Format::D24_UNORM_S8_UINT => FormatInfo::depth(
            gl::DEPTH24_STENCIL8,
            gl::DEPTH_STENCIL,
            gl::UNSIGNED_INT_24_8,
            4,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        ),
        vk::Format::D32_SFLOAT_S8_UINT => FormatInfo::depth(
            gl::DEPTH32F_STENCIL8,
            gl::DEPTH_STENCIL,
            gl::FLOAT_32_UNSIGNED_INT_24_8_REV,
            8,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        ),
        vk::Format::BC1_RGBA_UNORM_BLOCK => FormatInfo::bc(gl::COMPRESSED_RGBA_S3TC_DXT1_EXT, 8),
        vk::Format::BC1_RGBA_SRGB_BLOCK => {
            FormatInfo::bc(gl::COMPRESSED_SRGB_ALPHA_S3TC_DXT1_EXT, 8).srgb()
        }
        vk::Format::BC3_UNORM_BLOCK => FormatInfo::bc(gl::COMPRESSED_RGBA_S3TC_DXT5_EXT, 16),
        vk::Format::BC7_UNORM_BLOCK => FormatInfo::bc(gl::COMPRESSED_RGBA_BPTC_UNORM, 16),
        _ => return None,
    };
    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_region_size_rounds_up_to_blocks() {
        let bc1 = format_info(vk::Format::BC1_RGBA_UNORM_BLOCK).unwrap();
        assert!(bc1.is_compressed());
        assert_eq!(bc1.region_size(5, 4, 1), 2 * 8);
        assert_eq!(bc1.region_size(4, 4, 6), 6 * 8);
    }

    #[test]
    fn bgra_and_rgba_are_copy_compatible() {
        let rgba = format_info(vk::Format::R8G8B8A8_UNORM).unwrap();
        let bgra = format_info(vk::Format::B8G8R8A8_SRGB).unwrap();
        let depth = format_info(vk::Format::D32_SFLOAT).unwrap();
        assert!(rgba.copy_compatible(&bgra));
        assert!(!rgba.copy_compatible(&depth));
        assert!(bgra.srgb);
    }

    #[test]
    fn depth_stencil_attachment_and_mask() {
        let ds = format_info(vk::Format::D24_UNORM_S8_UINT).unwrap();
        assert_eq!(ds.attachment_point(3), gl::DEPTH_STENCIL_ATTACHMENT);
        assert_eq!(ds.blit_mask(), gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT);
        let color = format_info(vk::Format::R8_UNORM).unwrap();
        assert_eq!(color.attachment_point(2), gl::COLOR_ATTACHMENT0 + 2);
    }

    #[test]
    fn integer_attribute_path() {
        assert!(format_info(vk::Format::R32_UINT).unwrap().is_integer());
        assert!(!format_info(vk::Format::R8G8B8A8_SNORM).unwrap().is_integer());
        assert!(!format_info(vk::Format::R32G32B32_SFLOAT).unwrap().is_integer());
    }
}
