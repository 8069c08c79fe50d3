//! Vulkan to GL enum translation.
//!
//! Unknown values fall back to the GL default for the slot rather than
//! failing; pipeline creation has already been validated by the loader.

use ash::vk;
use vkgl_gl::consts as gl;

use crate::objects::{
    ColorBlendDesc, DepthStencilDesc, GraphicsPipelineDesc, MultisampleDesc, RasterizationDesc,
};
use crate::state::{
    BlendAttachmentState, ColorBlendState, DepthBias, DepthStencilState, FixedFunctionState,
    InputAssemblyState, MultisampleState, RasterizationState, StencilFaceState, TessellationState,
};

pub fn compare_op(op: vk::CompareOp) -> u32 {
    match op {
        vk::CompareOp::NEVER => gl::NEVER,
        vk::CompareOp::LESS => gl::LESS,
        vk::CompareOp::EQUAL => gl::EQUAL,
        vk::CompareOp::LESS_OR_EQUAL => gl::LEQUAL,
        vk::CompareOp::GREATER => gl::GREATER,
        vk::CompareOp::NOT_EQUAL => gl::NOTEQUAL,
        vk::CompareOp::GREATER_OR_EQUAL => gl::GEQUAL,
        _ => gl::ALWAYS,
    }
}

pub fn stencil_op(op: vk::StencilOp) -> u32 {
    match op {
        vk::StencilOp::ZERO => gl::ZERO,
        vk::StencilOp::REPLACE => gl::REPLACE,
        vk::StencilOp::INCREMENT_AND_CLAMP => gl::INCR,
        vk::StencilOp::DECREMENT_AND_CLAMP => gl::DECR,
        vk::StencilOp::INVERT => gl::INVERT,
        vk::StencilOp::INCREMENT_AND_WRAP => gl::INCR_WRAP,
        vk::StencilOp::DECREMENT_AND_WRAP => gl::DECR_WRAP,
        _ => gl::KEEP,
    }
}

pub fn blend_factor(factor: vk::BlendFactor) -> u32 {
    match factor {
        vk::BlendFactor::ZERO => gl::ZERO,
        vk::BlendFactor::SRC_COLOR => gl::SRC_COLOR,
        vk::BlendFactor::ONE_MINUS_SRC_COLOR => gl::ONE_MINUS_SRC_COLOR,
        vk::BlendFactor::DST_COLOR => gl::DST_COLOR,
        vk::BlendFactor::ONE_MINUS_DST_COLOR => gl::ONE_MINUS_DST_COLOR,
        vk::BlendFactor::SRC_ALPHA => gl::SRC_ALPHA,
        vk::BlendFactor::ONE_MINUS_SRC_ALPHA => gl::ONE_MINUS_SRC_ALPHA,
        vk::BlendFactor::DST_ALPHA => gl::DST_ALPHA,
        vk::BlendFactor::ONE_MINUS_DST_ALPHA => gl::ONE_MINUS_DST_ALPHA,
        vk::BlendFactor::CONSTANT_COLOR => gl::CONSTANT_COLOR,
        vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR => gl::ONE_MINUS_CONSTANT_COLOR,
        vk::BlendFactor::CONSTANT_ALPHA => gl::CONSTANT_ALPHA,
        vk::BlendFactor::ONE_MINUS_CONSTANT_ALPHA => gl::ONE_MINUS_CONSTANT_ALPHA,
        vk::BlendFactor::SRC_ALPHA_SATURATE => gl::SRC_ALPHA_SATURATE,
        vk::BlendFactor::SRC1_COLOR => gl::SRC1_COLOR,
        vk::BlendFactor::ONE_MINUS_SRC1_COLOR => gl::ONE_MINUS_SRC1_COLOR,
        vk::BlendFactor::SRC1_ALPHA => gl::SRC1_ALPHA,
        vk::BlendFactor::ONE_MINUS_SRC1_ALPHA => gl::ONE_MINUS_SRC1_ALPHA,
        _ => gl::ONE,
    }
}

pub fn blend_op(op: vk::BlendOp) -> u32 {
    match op {
        vk::BlendOp::SUBTRACT => gl::FUNC_SUBTRACT,
        vk::BlendOp::REVERSE_SUBTRACT => gl::FUNC_REVERSE_SUBTRACT,
        vk::BlendOp::MIN => gl::MIN,
        vk::BlendOp::MAX => gl::MAX,
        _ => gl::FUNC_ADD,
    }
}

pub fn logic_op(op: vk::LogicOp) -> u32 {
    match op {
        vk::LogicOp::CLEAR => gl::CLEAR,
        vk::LogicOp::AND => gl::AND,
        vk::LogicOp::AND_REVERSE => gl::AND_REVERSE,
        vk::LogicOp::AND_INVERTED => gl::AND_INVERTED,
        vk::LogicOp::NO_OP => gl::NOOP,
        vk::LogicOp::XOR => gl::XOR,
        vk::LogicOp::OR => gl::OR,
        vk::LogicOp::NOR => gl::NOR,
        vk::LogicOp::EQUIVALENT => gl::EQUIV,
        vk::LogicOp::INVERT => gl::INVERT,
        vk::LogicOp::OR_REVERSE => gl::OR_REVERSE,
        vk::LogicOp::COPY_INVERTED => gl::COPY_INVERTED,
        vk::LogicOp::OR_INVERTED => gl::OR_INVERTED,
        vk::LogicOp::NAND => gl::NAND,
        vk::LogicOp::SET => gl::SET,
        _ => gl::COPY,
    }
}

pub fn polygon_mode(mode: vk::PolygonMode) -> u32 {
    match mode {
        vk::PolygonMode::LINE => gl::LINE,
        vk::PolygonMode::POINT => gl::POINT,
        _ => gl::FILL,
    }
}

pub fn cull_mode(mode: vk::CullModeFlags) -> Option<u32> {
    if mode == vk::CullModeFlags::FRONT_AND_BACK {
        Some(gl::FRONT_AND_BACK)
    } else if mode.contains(vk::CullModeFlags::FRONT) {
        Some(gl::FRONT)
    } else if mode.contains(vk::CullModeFlags::BACK) {
        Some(gl::BACK)
    } else {
        None
    }
}

pub fn front_face(face: vk::FrontFace) -> u32 {
    match face {
        vk::FrontFace::CLOCKWISE => gl::CW,
        _ => gl::CCW,
    }
}

pub fn topology(topology: vk::PrimitiveTopology) -> u32 {
    match topology {
        vk::PrimitiveTopology::POINT_LIST => gl::POINTS,
        vk::PrimitiveTopology::LINE_LIST => gl::LINES,
        vk::PrimitiveTopology::LINE_STRIP => gl::LINE_STRIP,
        vk::PrimitiveTopology::TRIANGLE_STRIP => gl::TRIANGLE_STRIP,
        vk::PrimitiveTopology::TRIANGLE_FAN => gl::TRIANGLE_FAN,
        vk::PrimitiveTopology::LINE_LIST_WITH_ADJACENCY => gl::LINES_ADJACENCY,
        vk::PrimitiveTopology::LINE_STRIP_WITH_ADJACENCY => gl::LINE_STRIP_ADJACENCY,
        vk::PrimitiveTopology::TRIANGLE_LIST_WITH_ADJACENCY => gl::TRIANGLES_ADJACENCY,
        vk::PrimitiveTopology::TRIANGLE_STRIP_WITH_ADJACENCY => gl::TRIANGLE_STRIP_ADJACENCY,
        vk::PrimitiveTopology::PATCH_LIST => gl::PATCHES,
        _ => gl::TRIANGLES,
    }
}

/// GL element type, byte size and primitive restart index of an index type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexFormat {
    pub ty: u32,
    pub size: u32,
    pub restart_index: u32,
}

pub fn index_format(ty: vk::IndexType) -> IndexFormat {
    match ty {
        vk::IndexType::UINT16 => IndexFormat {
            ty: gl::UNSIGNED_SHORT,
            size: 2,
            restart_index: u32::from(u16::MAX),
        },
        _ => IndexFormat {
            ty: gl::UNSIGNED_INT,
            size: 4,
            restart_index: u32::MAX,
        },
    }
}

pub fn filter(filter: vk::Filter) -> u32 {
    match filter {
        vk::Filter::NEAREST => gl::NEAREST,
        _ => gl::LINEAR,
    }
}

pub fn min_filter(filter: vk::Filter, mipmap: vk::SamplerMipmapMode) -> u32 {
    match (filter, mipmap) {
        (vk::Filter::NEAREST, vk::SamplerMipmapMode::NEAREST) => gl::NEAREST_MIPMAP_NEAREST,
        (vk::Filter::NEAREST, _) => gl::NEAREST_MIPMAP_LINEAR,
        (_, vk::SamplerMipmapMode::NEAREST) => gl::LINEAR_MIPMAP_NEAREST,
        _ => gl::LINEAR_MIPMAP_LINEAR,
    }
}

pub fn address_mode(mode: vk::SamplerAddressMode) -> u32 {
    match mode {
        vk::SamplerAddressMode::MIRRORED_REPEAT => gl::MIRRORED_REPEAT,
        vk::SamplerAddressMode::CLAMP_TO_EDGE => gl::CLAMP_TO_EDGE,
        vk::SamplerAddressMode::CLAMP_TO_BORDER => gl::CLAMP_TO_BORDER,
        _ => gl::REPEAT,
    }
}

/// GL faces addressed by a Vulkan stencil face mask.
pub fn stencil_faces(faces: vk::StencilFaceFlags) -> &'static [u32] {
    if faces.contains(vk::StencilFaceFlags::FRONT_AND_BACK) {
        &[gl::FRONT, gl::BACK]
    } else if faces.contains(vk::StencilFaceFlags::FRONT) {
        &[gl::FRONT]
    } else if faces.contains(vk::StencilFaceFlags::BACK) {
        &[gl::BACK]
    } else {
        &[]
    }
}

/// `glMemoryBarrier` bits covering accesses that consume data after the barrier.
pub fn barrier_bits(access: vk::AccessFlags) -> u32 {
    const TABLE: &[(vk::AccessFlags, u32)] = &[
        (vk::AccessFlags::INDIRECT_COMMAND_READ, gl::COMMAND_BARRIER_BIT),
        (vk::AccessFlags::INDEX_READ, gl::ELEMENT_ARRAY_BARRIER_BIT),
        (vk::AccessFlags::VERTEX_ATTRIBUTE_READ, gl::VERTEX_ATTRIB_ARRAY_BARRIER_BIT),
        (vk::AccessFlags::UNIFORM_READ, gl::UNIFORM_BARRIER_BIT),
        (vk::AccessFlags::INPUT_ATTACHMENT_READ, gl::TEXTURE_FETCH_BARRIER_BIT),
        (
            vk::AccessFlags::SHADER_READ,
            gl::TEXTURE_FETCH_BARRIER_BIT
                | gl::SHADER_IMAGE_ACCESS_BARRIER_BIT
                | gl::SHADER_STORAGE_BARRIER_BIT,
        ),
        (
            vk::AccessFlags::SHADER_WRITE,
            gl::SHADER_IMAGE_ACCESS_BARRIER_BIT | gl::SHADER_STORAGE_BARRIER_BIT,
        ),
        (vk::AccessFlags::COLOR_ATTACHMENT_READ, gl::FRAMEBUFFER_BARRIER_BIT),
        (vk::AccessFlags::COLOR_ATTACHMENT_WRITE, gl::FRAMEBUFFER_BARRIER_BIT),
        (vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ, gl::FRAMEBUFFER_BARRIER_BIT),
        (vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE, gl::FRAMEBUFFER_BARRIER_BIT),
        (
            vk::AccessFlags::TRANSFER_READ,
            gl::PIXEL_BUFFER_BARRIER_BIT
                | gl::TEXTURE_UPDATE_BARRIER_BIT
                | gl::BUFFER_UPDATE_BARRIER_BIT,
        ),
        (
            vk::AccessFlags::TRANSFER_WRITE,
            gl::PIXEL_BUFFER_BARRIER_BIT
                | gl::TEXTURE_UPDATE_BARRIER_BIT
                | gl::BUFFER_UPDATE_BARRIER_BIT,
        ),
        (vk::AccessFlags::HOST_READ, gl::CLIENT_MAPPED_BUFFER_BARRIER_BIT),
        (vk::AccessFlags::HOST_WRITE, gl::CLIENT_MAPPED_BUFFER_BARRIER_BIT),
    ];
    if access.intersects(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE) {
        return gl::ALL_BARRIER_BITS;
    }
    TABLE
        .iter()
        .filter(|(flag, _)| access.intersects(*flag))
        .fold(0, |bits, (_, gl_bits)| bits | gl_bits)
}

/// GL query target for a pool type, or `None` when GL has no equivalent.
pub fn query_target(ty: vk::QueryType, flags: vk::QueryControlFlags) -> Option<u32> {
    match ty {
        vk::QueryType::OCCLUSION if flags.contains(vk::QueryControlFlags::PRECISE) => {
            Some(gl::SAMPLES_PASSED)
        }
        vk::QueryType::OCCLUSION => Some(gl::ANY_SAMPLES_PASSED),
        vk::QueryType::TIMESTAMP => Some(gl::TIMESTAMP),
        _ => None,
    }
}

fn blend_attachment(a: &vk::PipelineColorBlendAttachmentState) -> BlendAttachmentState {
    let mask = a.color_write_mask;
    BlendAttachmentState {
        enabled: a.blend_enable != vk::FALSE,
        src_rgb: blend_factor(a.src_color_blend_factor),
        dst_rgb: blend_factor(a.dst_color_blend_factor),
        src_alpha: blend_factor(a.src_alpha_blend_factor),
        dst_alpha: blend_factor(a.dst_alpha_blend_factor),
        eq_rgb: blend_op(a.color_blend_op),
        eq_alpha: blend_op(a.alpha_blend_op),
        write_mask: [
            mask.contains(vk::ColorComponentFlags::R),
            mask.contains(vk::ColorComponentFlags::G),
            mask.contains(vk::ColorComponentFlags::B),
            mask.contains(vk::ColorComponentFlags::A),
        ],
    }
}

fn stencil_face(s: &vk::StencilOpState) -> StencilFaceState {
    StencilFaceState {
        fail: stencil_op(s.fail_op),
        depth_fail: stencil_op(s.depth_fail_op),
        pass: stencil_op(s.pass_op),
        func: compare_op(s.compare_op),
        compare_mask: s.compare_mask,
        write_mask: s.write_mask,
        reference: s.reference,
    }
}

pub fn color_blend(desc: &ColorBlendDesc) -> ColorBlendState {
    let mut attachments: Vec<_> = desc.attachments.iter().map(blend_attachment).collect();
    if attachments.is_empty() {
        attachments.push(BlendAttachmentState::default());
    }
    ColorBlendState {
        logic_op: desc.logic_op.map(logic_op),
        attachments,
        constants: desc.constants,
    }
}

pub fn depth_stencil(desc: &DepthStencilDesc) -> DepthStencilState {
    DepthStencilState {
        depth_test: desc.depth_test,
        depth_write: desc.depth_write,
        depth_func: compare_op(desc.depth_compare),
        stencil_test: desc.stencil_test,
        front: stencil_face(&desc.front),
        back: stencil_face(&desc.back),
    }
}

pub fn multisample(desc: &MultisampleDesc) -> MultisampleState {
    MultisampleState {
        sample_shading: desc.sample_shading_enable.then_some(desc.min_sample_shading),
        sample_mask: desc.sample_mask,
        alpha_to_coverage: desc.alpha_to_coverage,
        alpha_to_one: desc.alpha_to_one,
    }
}

pub fn rasterization(desc: &RasterizationDesc) -> RasterizationState {
    RasterizationState {
        depth_clamp: desc.depth_clamp,
        discard: desc.discard,
        polygon_mode: polygon_mode(desc.polygon_mode),
        cull_face: cull_mode(desc.cull_mode),
        front_face: front_face(desc.front_face),
        depth_bias_enable: desc.depth_bias_enable,
        depth_bias: DepthBias {
            constant: desc.depth_bias_constant,
            clamp: desc.depth_bias_clamp,
            slope: desc.depth_bias_slope,
        },
        line_width: desc.line_width,
    }
}

/// Translates everything a graphics pipeline captures into GL terms.
pub fn fixed_function(desc: &GraphicsPipelineDesc) -> FixedFunctionState {
    FixedFunctionState {
        color_blend: color_blend(&desc.color_blend),
        depth_stencil: depth_stencil(&desc.depth_stencil),
        multisample: multisample(&desc.multisample),
        input_assembly: InputAssemblyState {
            mode: topology(desc.topology),
            primitive_restart: desc.primitive_restart,
        },
        rasterization: rasterization(&desc.rasterization),
        tessellation: TessellationState {
            patch_vertices: desc.patch_control_points.max(1),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_barriers_select_consumer_bits() {
        assert_eq!(
            barrier_bits(vk::AccessFlags::UNIFORM_READ | vk::AccessFlags::INDEX_READ),
            gl::UNIFORM_BARRIER_BIT | gl::ELEMENT_ARRAY_BARRIER_BIT
        );
        assert_eq!(barrier_bits(vk::AccessFlags::empty()), 0);
        assert_eq!(barrier_bits(vk::AccessFlags::MEMORY_READ), gl::ALL_BARRIER_BITS);
    }

    #[test]
    fn index_types_restart_at_their_maximum() {
        assert_eq!(index_format(vk::IndexType::UINT16).restart_index, 0xFFFF);
        assert_eq!(index_format(vk::IndexType::UINT32).restart_index, 0xFFFF_FFFF);
        assert_eq!(index_format(vk::IndexType::UINT32).size, 4);
    }

    #[test]
    fn cull_none_disables_culling() {
        assert_eq!(cull_mode(vk::CullModeFlags::NONE), None);
        assert_eq!(cull_mode(vk::CullModeFlags::BACK), Some(gl::BACK));
        assert_eq!(cull_mode(vk::CullModeFlags::FRONT_AND_BACK), Some(gl::FRONT_AND_BACK));
    }
}
