//! Deferred command encoding.
//!
//! Recording never touches GL. Every Vulkan command is lowered into one or
//! more [`GlCmd`] values appended to a [`CmdStream`]; [`crate::replay`] turns
//! them into real GL calls at submission. Payloads are plain owned data, the
//! only variable-length ones being the explicitly sized arrays of the
//! `*Array` variants and byte payloads.

mod deferred;
mod stream;

pub use deferred::{Deferred, PreExecuteAction};
pub use stream::{CmdIndex, CmdList, CmdStream, Remap};

use vkgl_gl::{TextureSubresource, UniformValue};

use crate::format::{FormatInfo, NumericClass};
use crate::geometry::GeometryBuffersId;

/// Texture unit replay uses for pixel transfers, out of the way of the units
/// the shader translator hands out.
pub const TRANSFER_TEXTURE_UNIT: u32 = 47;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearColor {
    Float([f32; 4]),
    Int([i32; 4]),
    Uint([u32; 4]),
}

impl ClearColor {
    fn bits(self) -> [u32; 4] {
        match self {
            ClearColor::Float(v) => bytemuck::cast(v),
            ClearColor::Int(v) => bytemuck::cast(v),
            ClearColor::Uint(v) => v,
        }
    }

    /// Reads the same 16 bytes the way an attachment of `info` interprets
    /// them. Normalized formats always clear with floats.
    pub fn reinterpret(self, info: &FormatInfo) -> Self {
        let bits = self.bits();
        match (info.normalized, info.class) {
            (false, NumericClass::Sint) => ClearColor::Int(bytemuck::cast(bits)),
            (false, NumericClass::Uint) => ClearColor::Uint(bits),
            _ => ClearColor::Float(bytemuck::cast(bits)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color(ClearColor),
    DepthStencil { depth: f32, stencil: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlCmd {
    Enable(u32),
    Disable(u32),
    EnableIndexed { cap: u32, index: u32 },
    DisableIndexed { cap: u32, index: u32 },

    BlendFunc { src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32 },
    BlendFuncIndexed { buf: u32, src_rgb: u32, dst_rgb: u32, src_alpha: u32, dst_alpha: u32 },
    BlendEquation { rgb: u32, alpha: u32 },
    BlendEquationIndexed { buf: u32, rgb: u32, alpha: u32 },
    BlendColor([f32; 4]),
    ColorMask([bool; 4]),
    ColorMaskIndexed { buf: u32, mask: [bool; 4] },
    LogicOp(u32),

    DepthFunc(u32),
    DepthMask(bool),
    StencilFunc { face: u32, func: u32, reference: u32, mask: u32 },
    StencilOp { face: u32, fail: u32, depth_fail: u32, pass: u32 },
    StencilMask { face: u32, mask: u32 },

    PolygonMode(u32),
    CullFace(u32),
    FrontFace(u32),
    PolygonOffset { factor: f32, units: f32 },
    PolygonOffsetClamp { factor: f32, units: f32, clamp: f32 },
    LineWidth(f32),
    MinSampleShading(f32),
    SampleMask(u32),
    PatchVertices(u32),
    PrimitiveRestartIndex(u32),

    Viewport { rect: [i32; 4], depth: [f64; 2] },
    ViewportArray { first: u32, rects: Vec<[f32; 4]>, depths: Vec<[f64; 2]> },
    Scissor([i32; 4]),
    ScissorArray { first: u32, rects: Vec<[i32; 4]> },

    BindFramebuffer { target: u32, framebuffer: u32 },
    DrawBuffers(Vec<u32>),
    /// `glClearBuffer*` on the bound draw framebuffer.
    ClearAttachment { buffer: u32, draw_buffer: i32, value: ClearValue },
    InvalidateFramebuffer { target: u32, attachments: Vec<u32> },
    /// Blit between two texture subresources through the scratch framebuffers.
    BlitImage {
        src: TextureSubresource,
        dst: TextureSubresource,
        src_rect: [i32; 4],
        dst_rect: [i32; 4],
        mask: u32,
        filter: u32,
    },
    /// Clear of one subresource through the scratch draw framebuffer.
    ClearImageLayer { dst: TextureSubresource, value: ClearValue },
    CopyImage {
        src: u32,
        src_target: u32,
        src_level: u32,
        src_origin: [i32; 3],
        dst: u32,
        dst_target: u32,
        dst_level: u32,
        dst_origin: [i32; 3],
        extent: [u32; 3],
    },
    ClearTexImage {
        texture: u32,
        level: u32,
        origin: [i32; 3],
        extent: [u32; 3],
        format: u32,
        ty: u32,
        data: Vec<u8>,
    },
    /// Upload from a buffer into a texture through `PIXEL_UNPACK_BUFFER`.
    TexSubImage {
        texture: u32,
        bind_target: u32,
        target: u32,
        level: u32,
        origin: [i32; 3],
        extent: [u32; 3],
        format: u32,
        ty: u32,
        /// Byte size for compressed formats; `None` for uncompressed.
        compressed_size: Option<u32>,
        buffer: u32,
        offset: u64,
        row_length: u32,
        image_height: u32,
    },
    /// Readback from a texture into a buffer through `PIXEL_PACK_BUFFER`.
    ReadImage {
        src: TextureSubresource,
        origin: [i32; 3],
        extent: [u32; 3],
        format: u32,
        ty: u32,
        buffer: u32,
        offset: u64,
        buf_size: u32,
        row_length: u32,
        image_height: u32,
    },

    CopyBuffer { src: u32, dst: u32, src_offset: u64, dst_offset: u64, size: u64 },
    UpdateBuffer { buffer: u32, offset: u64, data: Vec<u8> },
    /// Repeats `data` over `size` bytes. `use_clear` selects `glClearBufferSubData`.
    FillBuffer { buffer: u32, offset: u64, size: u64, data: u32, use_clear: bool },
    /// Host shadow of `memory` to its GL buffer.
    UploadMemory { memory: u64, offset: u64, size: u64 },
    /// GL buffer of `memory` back to its host shadow.
    DownloadMemory { memory: u64, offset: u64, size: u64 },

    UseProgram(u32),
    Uniform { program: u32, location: i32, value: UniformValue },
    BindBuffer { target: u32, buffer: u32 },
    BindBufferRange { target: u32, index: u32, buffer: u32, offset: u64, size: u64 },
    BindTexture { unit: u32, target: u32, texture: u32 },
    BindSampler { unit: u32, sampler: u32 },
    BindImageTexture {
        unit: u32,
        texture: u32,
        level: u32,
        layered: bool,
        layer: u32,
        access: u32,
        format: u32,
    },
    BindGeometry(GeometryBuffersId),
    UnbindVertexArray,

    DrawArrays { mode: u32, first: u32, count: u32, instances: u32, base_instance: u32 },
    DrawElements {
        mode: u32,
        count: u32,
        ty: u32,
        offset: u64,
        instances: u32,
        base_vertex: i32,
        base_instance: u32,
    },
    DrawArraysIndirect { mode: u32, offset: u64, draw_count: u32, stride: u32 },
    DrawElementsIndirect { mode: u32, ty: u32, offset: u64, draw_count: u32, stride: u32 },
    Dispatch([u32; 3]),
    DispatchIndirect { offset: u64 },
    MemoryBarrier(u32),

    BeginQuery { target: u32, query: u32 },
    EndQuery { target: u32 },
    QueryCounter { query: u32 },
    CopyQueryResult { query: u32, buffer: u32, pname: u32, offset: u64, wide: bool },

    PushDebugGroup(String),
    PopDebugGroup,
    DebugMessage(String),
}

impl GlCmd {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            GlCmd::DrawArrays { .. }
                | GlCmd::DrawElements { .. }
                | GlCmd::DrawArraysIndirect { .. }
                | GlCmd::DrawElementsIndirect { .. }
        )
    }

    /// Memory handle of an upload or download command.
    pub fn mapped_memory(&self) -> Option<u64> {
        match self {
            GlCmd::UploadMemory { memory, .. } | GlCmd::DownloadMemory { memory, .. } => {
                Some(*memory)
            }
            _ => None,
        }
    }
}
