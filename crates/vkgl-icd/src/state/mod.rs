//! Context state snapshots and the stack that diffs them into GL calls.
//!
//! All values here are already in GL terms (enum values, flipped winding);
//! the Vulkan-side descriptions are translated once at pipeline creation by
//! [`translate`].

mod stack;
pub mod translate;

pub use stack::ContextStateStack;
pub(crate) use stack::{encode_scissors, encode_viewports};

use ash::vk;
use vkgl_gl::consts as gl;

use crate::objects::DynamicStates;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

impl From<vk::Viewport> for Viewport {
    fn from(v: vk::Viewport) -> Self {
        Self {
            x: v.x,
            y: v.y,
            width: v.width,
            height: v.height,
            min_depth: v.min_depth,
            max_depth: v.max_depth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

impl From<vk::Rect2D> for Rect {
    fn from(r: vk::Rect2D) -> Self {
        Self {
            x: r.offset.x,
            y: r.offset.y,
            width: r.extent.width,
            height: r.extent.height,
        }
    }
}

/// Size of the render target viewports and scissors are flipped against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderArea {
    pub width: u32,
    pub height: u32,
}

impl RenderArea {
    /// Target not known while recording, e.g. a secondary command buffer
    /// inheriting a render pass without a framebuffer.
    pub const UNKNOWN: RenderArea = RenderArea {
        width: u32::MAX,
        height: u32::MAX,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_known(&self) -> bool {
        *self != Self::UNKNOWN
    }
}

impl From<vk::Extent2D> for RenderArea {
    fn from(e: vk::Extent2D) -> Self {
        Self::new(e.width, e.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendAttachmentState {
    pub enabled: bool,
    pub src_rgb: u32,
    pub dst_rgb: u32,
    pub src_alpha: u32,
    pub dst_alpha: u32,
    pub eq_rgb: u32,
    pub eq_alpha: u32,
    pub write_mask: [bool; 4],
}

impl Default for BlendAttachmentState {
    fn default() -> Self {
        Self {
            enabled: false,
            src_rgb: gl::ONE,
            dst_rgb: gl::ZERO,
            src_alpha: gl::ONE,
            dst_alpha: gl::ZERO,
            eq_rgb: gl::FUNC_ADD,
            eq_alpha: gl::FUNC_ADD,
            write_mask: [true; 4],
        }
    }
}

impl BlendAttachmentState {
    /// Blend factors and equations, ignoring the enable bit and write mask.
    fn same_equation(&self, other: &Self) -> bool {
        (self.src_rgb, self.dst_rgb, self.src_alpha, self.dst_alpha, self.eq_rgb, self.eq_alpha)
            == (
                other.src_rgb,
                other.dst_rgb,
                other.src_alpha,
                other.dst_alpha,
                other.eq_rgb,
                other.eq_alpha,
            )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorBlendState {
    /// `None` disables `GL_COLOR_LOGIC_OP`.
    pub logic_op: Option<u32>,
    pub attachments: Vec<BlendAttachmentState>,
    pub constants: [f32; 4],
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self {
            logic_op: None,
            attachments: vec![BlendAttachmentState::default()],
            constants: [0.0; 4],
        }
    }
}

impl ColorBlendState {
    /// Whether every attachment uses the same blend state, so the
    /// non-indexed entry points suffice.
    pub fn is_uniform(&self) -> bool {
        match self.attachments.split_first() {
            Some((first, rest)) => rest.iter().all(|a| a == first),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilFaceState {
    pub fail: u32,
    pub depth_fail: u32,
    pub pass: u32,
    pub func: u32,
    pub compare_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
}

impl Default for StencilFaceState {
    fn default() -> Self {
        Self {
            fail: gl::KEEP,
            depth_fail: gl::KEEP,
            pass: gl::KEEP,
            func: gl::ALWAYS,
            compare_mask: !0,
            write_mask: !0,
            reference: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilState {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_func: u32,
    pub stencil_test: bool,
    pub front: StencilFaceState,
    pub back: StencilFaceState,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test: false,
            depth_write: true,
            depth_func: gl::LESS,
            stencil_test: false,
            front: StencilFaceState::default(),
            back: StencilFaceState::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MultisampleState {
    /// Minimum sample shading fraction; `None` disables sample shading.
    pub sample_shading: Option<f32>,
    pub sample_mask: Option<u32>,
    pub alpha_to_coverage: bool,
    pub alpha_to_one: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputAssemblyState {
    /// Draw mode passed to the draw entry points.
    pub mode: u32,
    pub primitive_restart: bool,
}

impl Default for InputAssemblyState {
    fn default() -> Self {
        Self {
            mode: gl::TRIANGLES,
            primitive_restart: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthBias {
    pub constant: f32,
    pub clamp: f32,
    pub slope: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    pub depth_clamp: bool,
    pub discard: bool,
    pub polygon_mode: u32,
    /// `None` disables face culling.
    pub cull_face: Option<u32>,
    pub front_face: u32,
    pub depth_bias_enable: bool,
    pub depth_bias: DepthBias,
    pub line_width: f32,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            depth_clamp: false,
            discard: false,
            polygon_mode: gl::FILL,
            cull_face: None,
            front_face: gl::CCW,
            depth_bias_enable: false,
            depth_bias: DepthBias::default(),
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TessellationState {
    pub patch_vertices: u32,
}

impl Default for TessellationState {
    fn default() -> Self {
        Self { patch_vertices: 3 }
    }
}

/// Everything a graphics pipeline captures besides viewports and scissors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FixedFunctionState {
    pub color_blend: ColorBlendState,
    pub depth_stencil: DepthStencilState,
    pub multisample: MultisampleState,
    pub input_assembly: InputAssemblyState,
    pub rasterization: RasterizationState,
    pub tessellation: TessellationState,
}

impl FixedFunctionState {
    /// Copies every field named dynamic from `current`, so binding a pipeline
    /// never overwrites state set through `vkCmdSet*`.
    pub fn with_dynamic(&self, current: &FixedFunctionState, dynamic: DynamicStates) -> Self {
        let mut out = self.clone();
        if dynamic.contains(DynamicStates::LINE_WIDTH) {
            out.rasterization.line_width = current.rasterization.line_width;
        }
        if dynamic.contains(DynamicStates::DEPTH_BIAS) {
            out.rasterization.depth_bias = current.rasterization.depth_bias;
        }
        if dynamic.contains(DynamicStates::BLEND_CONSTANTS) {
            out.color_blend.constants = current.color_blend.constants;
        }
        let ds = &mut out.depth_stencil;
        let cur = &current.depth_stencil;
        if dynamic.contains(DynamicStates::STENCIL_COMPARE_MASK) {
            ds.front.compare_mask = cur.front.compare_mask;
            ds.back.compare_mask = cur.back.compare_mask;
        }
        if dynamic.contains(DynamicStates::STENCIL_WRITE_MASK) {
            ds.front.write_mask = cur.front.write_mask;
            ds.back.write_mask = cur.back.write_mask;
        }
        if dynamic.contains(DynamicStates::STENCIL_REFERENCE) {
            ds.front.reference = cur.front.reference;
            ds.back.reference = cur.back.reference;
        }
        out
    }

    /// Same state with the front-face winding reversed; a vertically flipped
    /// target reverses the apparent winding of every primitive.
    pub fn inverted_winding(&self) -> Self {
        let mut out = self.clone();
        out.rasterization.front_face = if out.rasterization.front_face == gl::CCW {
            gl::CW
        } else {
            gl::CCW
        };
        out
    }
}

/// Complete snapshot tracked by a [`ContextStateStack`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContextState {
    pub fixed: FixedFunctionState,
    /// Viewports as given by the application, before the flip.
    pub viewports: Vec<Viewport>,
    pub scissors: Vec<Rect>,
    pub scissor_test: bool,
    /// GL framebuffer bound to `GL_FRAMEBUFFER`, if known.
    pub framebuffer: Option<u32>,
    /// Whether the bound framebuffer is the window-system target.
    pub window_target: Option<bool>,
    pub render_area: RenderArea,
    pub program: Option<u32>,
    pub srgb: Option<bool>,
}

impl Default for ContextState {
    fn default() -> Self {
        Self {
            fixed: FixedFunctionState::default(),
            viewports: Vec::new(),
            scissors: Vec::new(),
            scissor_test: false,
            framebuffer: None,
            window_target: None,
            render_area: RenderArea::UNKNOWN,
            program: None,
            srgb: None,
        }
    }
}

/// Snapshot every state stack starts from. GL defaults unless configured
/// otherwise; nothing in it is trusted until the first `apply` of each
/// category, which is always forced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefaultState(pub ContextState);

impl DefaultState {
    pub fn state(&self) -> &ContextState {
        &self.0
    }
}
