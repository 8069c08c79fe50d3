use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use ash::vk;
use bitflags::bitflags;
use vkgl_gl::VertexArrayLayout;
use xxhash_rust::xxh3::Xxh3;

use crate::dependents::{DestructionListener, ObjectId};
use crate::geometry::{GeometryBuffersId, GeometryRegistry};
use crate::handle::DeviceObject;
use crate::objects::{Buffer, PipelineLayout};
use crate::shader::{CompiledProgram, ShaderStage};
use crate::state::{translate, FixedFunctionState, Rect, Viewport};

bitflags! {
    /// Pipeline state supplied through `vkCmdSet*` instead of the pipeline.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DynamicStates: u32 {
        const VIEWPORT = 1 << 0;
        const SCISSOR = 1 << 1;
        const LINE_WIDTH = 1 << 2;
        const DEPTH_BIAS = 1 << 3;
        const BLEND_CONSTANTS = 1 << 4;
        const DEPTH_BOUNDS = 1 << 5;
        const STENCIL_COMPARE_MASK = 1 << 6;
        const STENCIL_WRITE_MASK = 1 << 7;
        const STENCIL_REFERENCE = 1 << 8;
    }
}

impl DynamicStates {
    pub fn from_vk(states: &[vk::DynamicState]) -> Self {
        states.iter().fold(Self::empty(), |acc, s| {
            acc | match *s {
                vk::DynamicState::VIEWPORT => Self::VIEWPORT,
                vk::DynamicState::SCISSOR => Self::SCISSOR,
                vk::DynamicState::LINE_WIDTH => Self::LINE_WIDTH,
                vk::DynamicState::DEPTH_BIAS => Self::DEPTH_BIAS,
                vk::DynamicState::BLEND_CONSTANTS => Self::BLEND_CONSTANTS,
                vk::DynamicState::DEPTH_BOUNDS => Self::DEPTH_BOUNDS,
                vk::DynamicState::STENCIL_COMPARE_MASK => Self::STENCIL_COMPARE_MASK,
                vk::DynamicState::STENCIL_WRITE_MASK => Self::STENCIL_WRITE_MASK,
                vk::DynamicState::STENCIL_REFERENCE => Self::STENCIL_REFERENCE,
                _ => Self::empty(),
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBindingDesc {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: vk::VertexInputRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttributeDesc {
    pub location: u32,
    pub binding: u32,
    pub format: vk::Format,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexInputDesc {
    pub bindings: Vec<VertexBindingDesc>,
    pub attributes: Vec<VertexAttributeDesc>,
}

impl VertexInputDesc {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn binding(&self, binding: u32) -> Option<&VertexBindingDesc> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    /// Stable content hash; two pipelines with equal hashes interpret vertex
    /// buffer bindings identically.
    pub fn content_hash(&self) -> u64 {
        let mut h = Xxh3::new();
        for b in &self.bindings {
            h.update(&b.binding.to_le_bytes());
            h.update(&b.stride.to_le_bytes());
            h.update(&b.input_rate.as_raw().to_le_bytes());
        }
        h.update(&[0xff]);
        for a in &self.attributes {
            h.update(&a.location.to_le_bytes());
            h.update(&a.binding.to_le_bytes());
            h.update(&a.format.as_raw().to_le_bytes());
            h.update(&a.offset.to_le_bytes());
        }
        h.digest()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationDesc {
    pub depth_clamp: bool,
    pub discard: bool,
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_bias_enable: bool,
    pub depth_bias_constant: f32,
    pub depth_bias_clamp: f32,
    pub depth_bias_slope: f32,
    pub line_width: f32,
}

impl Default for RasterizationDesc {
    fn default() -> Self {
        Self {
            depth_clamp: false,
            discard: false,
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            depth_bias_enable: false,
            depth_bias_constant: 0.0,
            depth_bias_clamp: 0.0,
            depth_bias_slope: 0.0,
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MultisampleDesc {
    pub samples: u32,
    pub sample_shading_enable: bool,
    pub min_sample_shading: f32,
    pub sample_mask: Option<u32>,
    pub alpha_to_coverage: bool,
    pub alpha_to_one: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DepthStencilDesc {
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: vk::CompareOp,
    pub stencil_test: bool,
    pub front: vk::StencilOpState,
    pub back: vk::StencilOpState,
}

#[derive(Debug, Clone, Default)]
pub struct ColorBlendDesc {
    pub logic_op: Option<vk::LogicOp>,
    pub attachments: Vec<vk::PipelineColorBlendAttachmentState>,
    pub constants: [f32; 4],
}

#[derive(Debug, Clone)]
pub struct GraphicsPipelineDesc {
    pub stages: Vec<ShaderStage>,
    pub layout: Arc<PipelineLayout>,
    pub flags: vk::PipelineCreateFlags,
    pub vertex_input: VertexInputDesc,
    pub topology: vk::PrimitiveTopology,
    pub primitive_restart: bool,
    pub patch_control_points: u32,
    pub rasterization: RasterizationDesc,
    pub multisample: MultisampleDesc,
    pub depth_stencil: DepthStencilDesc,
    pub color_blend: ColorBlendDesc,
    pub dynamic_states: Vec<vk::DynamicState>,
    pub viewports: Vec<Viewport>,
    pub scissors: Vec<Rect>,
}

impl GraphicsPipelineDesc {
    /// Triangle list with every other state at its Vulkan default.
    pub fn new(stages: Vec<ShaderStage>, layout: Arc<PipelineLayout>) -> Self {
        Self {
            stages,
            layout,
            flags: vk::PipelineCreateFlags::empty(),
            vertex_input: VertexInputDesc::default(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            primitive_restart: false,
            patch_control_points: 0,
            rasterization: RasterizationDesc::default(),
            multisample: MultisampleDesc::default(),
            depth_stencil: DepthStencilDesc::default(),
            color_blend: ColorBlendDesc::default(),
            dynamic_states: Vec::new(),
            viewports: Vec::new(),
            scissors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComputePipelineDesc {
    pub stage: ShaderStage,
    pub layout: Arc<PipelineLayout>,
    pub flags: vk::PipelineCreateFlags,
}

/// Fixed-function state and program for one render-target convention.
#[derive(Debug, Clone)]
pub struct PipelineVariant {
    pub fixed: FixedFunctionState,
    pub program: CompiledProgram,
}

#[derive(Debug)]
struct CachedGeometry {
    id: GeometryBuffersId,
    buffers: Vec<ObjectId>,
}

/// Content key of a vertex/index buffer combination.
pub fn geometry_key(
    vertex_buffers: &[(u32, ObjectId, u64)],
    index_buffer: Option<ObjectId>,
) -> u64 {
    let mut h = Xxh3::new();
    for (slot, buffer, offset) in vertex_buffers {
        h.update(&slot.to_le_bytes());
        h.update(&buffer.raw.to_le_bytes());
        h.update(&offset.to_le_bytes());
    }
    match index_buffer {
        Some(ib) => {
            h.update(&[1]);
            h.update(&ib.raw.to_le_bytes());
        }
        None => h.update(&[0]),
    }
    h.digest()
}

#[derive(Debug)]
pub struct Pipeline {
    handle: vk::Pipeline,
    bind_point: vk::PipelineBindPoint,
    layout: Arc<PipelineLayout>,
    window: PipelineVariant,
    offscreen: PipelineVariant,
    vertex_input: VertexInputDesc,
    vertex_input_hash: u64,
    dynamic: DynamicStates,
    viewports: Vec<Viewport>,
    scissors: Vec<Rect>,
    registry: Arc<GeometryRegistry>,
    geometry: Mutex<HashMap<u64, CachedGeometry>>,
    this: Weak<Pipeline>,
}

impl DeviceObject for Pipeline {
    type Handle = vk::Pipeline;

    fn handle(&self) -> vk::Pipeline {
        self.handle
    }
}

impl Pipeline {
    /// `window_program` was compiled with the vertical flip; the window
    /// variant also gets the reversed winding.
    pub fn graphics(
        handle: vk::Pipeline,
        desc: &GraphicsPipelineDesc,
        window_program: CompiledProgram,
        offscreen_program: CompiledProgram,
        registry: Arc<GeometryRegistry>,
    ) -> Arc<Self> {
        let fixed = translate::fixed_function(desc);
        Arc::new_cyclic(|this| Self {
            handle,
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            layout: desc.layout.clone(),
            window: PipelineVariant {
                fixed: fixed.inverted_winding(),
                program: window_program,
            },
            offscreen: PipelineVariant {
                fixed,
                program: offscreen_program,
            },
            vertex_input: desc.vertex_input.clone(),
            vertex_input_hash: desc.vertex_input.content_hash(),
            dynamic: DynamicStates::from_vk(&desc.dynamic_states),
            viewports: desc.viewports.clone(),
            scissors: desc.scissors.clone(),
            registry,
            geometry: Mutex::new(HashMap::new()),
            this: this.clone(),
        })
    }

    pub fn compute(
        handle: vk::Pipeline,
        layout: Arc<PipelineLayout>,
        program: CompiledProgram,
        registry: Arc<GeometryRegistry>,
    ) -> Arc<Self> {
        let variant = PipelineVariant {
            fixed: FixedFunctionState::default(),
            program,
        };
        Arc::new_cyclic(|this| Self {
            handle,
            bind_point: vk::PipelineBindPoint::COMPUTE,
            layout,
            window: variant.clone(),
            offscreen: variant,
            vertex_input: VertexInputDesc::default(),
            vertex_input_hash: VertexInputDesc::default().content_hash(),
            dynamic: DynamicStates::empty(),
            viewports: Vec::new(),
            scissors: Vec::new(),
            registry,
            geometry: Mutex::new(HashMap::new()),
            this: this.clone(),
        })
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::of(self.handle)
    }

    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        self.bind_point
    }

    pub fn layout(&self) -> &Arc<PipelineLayout> {
        &self.layout
    }

    pub fn variant(&self, window_target: bool) -> &PipelineVariant {
        if window_target {
            &self.window
        } else {
            &self.offscreen
        }
    }

    pub fn is_valid(&self) -> bool {
        self.window.program.is_valid() && self.offscreen.program.is_valid()
    }

    pub fn vertex_input(&self) -> &VertexInputDesc {
        &self.vertex_input
    }

    pub fn vertex_input_hash(&self) -> u64 {
        self.vertex_input_hash
    }

    pub fn dynamic_states(&self) -> DynamicStates {
        self.dynamic
    }

    pub fn viewports(&self) -> &[Viewport] {
        &self.viewports
    }

    pub fn scissors(&self) -> &[Rect] {
        &self.scissors
    }

    /// Distinct GL programs owned by this pipeline.
    pub fn programs(&self) -> Vec<u32> {
        let mut programs = vec![self.window.program.program];
        if self.offscreen.program.program != self.window.program.program {
            programs.push(self.offscreen.program.program);
        }
        programs.retain(|&p| p != 0);
        programs
    }

    /// Geometry buffers for the combination hashed into `key`, registering a
    /// new one through `build` on first use. The pipeline watches every
    /// buffer in the combination and retires the entry when one goes away.
    pub fn geometry_buffers(
        &self,
        key: u64,
        build: impl FnOnce() -> (VertexArrayLayout, Vec<Arc<Buffer>>),
    ) -> GeometryBuffersId {
        let mut cache = self.cache();
        if let Some(entry) = cache.get(&key) {
            return entry.id;
        }
        let (layout, buffers) = build();
        let id = self.registry.register(layout);
        let listener: Weak<dyn DestructionListener> = self.this.clone();
        for buffer in &buffers {
            buffer.dependents().register(listener.clone());
        }
        cache.insert(
            key,
            CachedGeometry {
                id,
                buffers: buffers.iter().map(|b| b.id()).collect(),
            },
        );
        id
    }

    pub fn cached_geometry_count(&self) -> usize {
        self.cache().len()
    }

    /// Retires every cached geometry object. Called when the pipeline is destroyed.
    pub fn release_geometry(&self) {
        for (_, entry) in self.cache().drain() {
            self.registry.retire(entry.id);
        }
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<u64, CachedGeometry>> {
        self.geometry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DestructionListener for Pipeline {
    fn on_destroyed(&self, object: ObjectId) {
        let mut cache = self.cache();
        cache.retain(|_, entry| {
            let keep = !entry.buffers.contains(&object);
            if !keep {
                tracing::debug!(
                    pipeline = %self.id(),
                    buffer = %object,
                    id = entry.id.0,
                    "dropping geometry buffers"
                );
                self.registry.retire(entry.id);
            }
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn layout() -> Arc<PipelineLayout> {
        Arc::new(PipelineLayout::new(vk::PipelineLayout::from_raw(1), vec![], vec![]))
    }

    fn program(name: u32) -> CompiledProgram {
        CompiledProgram {
            program: name,
            ..Default::default()
        }
    }

    #[test]
    fn window_variant_reverses_winding() {
        let registry = Arc::new(GeometryRegistry::new());
        let desc = GraphicsPipelineDesc::new(vec![], layout());
        let handle = vk::Pipeline::from_raw(2);
        let p = Pipeline::graphics(handle, &desc, program(5), program(6), registry);
        assert_eq!(p.variant(true).fixed.rasterization.front_face, vkgl_gl::consts::CW);
        assert_eq!(p.variant(false).fixed.rasterization.front_face, vkgl_gl::consts::CCW);
        assert_eq!(p.programs(), vec![5, 6]);
    }

    #[test]
    fn destroying_a_buffer_retires_its_geometry() {
        let registry = Arc::new(GeometryRegistry::new());
        let desc = GraphicsPipelineDesc::new(vec![], layout());
        let handle = vk::Pipeline::from_raw(2);
        let p = Pipeline::graphics(handle, &desc, program(5), program(6), registry.clone());
        let vb = Arc::new(Buffer::new(
            vk::Buffer::from_raw(3),
            64,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        ));

        let key = geometry_key(&[(0, vb.id(), 0)], None);
        let id = p.geometry_buffers(key, || (VertexArrayLayout::default(), vec![vb.clone()]));
        let again = p.geometry_buffers(key, || unreachable!());
        assert_eq!(id, again);
        assert_eq!(registry.len(), 1);

        vb.dependents().notify(vb.id());
        assert_eq!(p.cached_geometry_count(), 0);
        assert_eq!(registry.take_retired(), vec![id]);
    }

    #[test]
    fn vertex_input_hash_tracks_content() {
        let a = VertexInputDesc {
            bindings: vec![VertexBindingDesc {
                binding: 0,
                stride: 12,
                input_rate: vk::VertexInputRate::VERTEX,
            }],
            attributes: vec![],
        };
        let mut b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());
        b.bindings[0].stride = 16;
        assert_ne!(a.content_hash(), b.content_hash());
    }
}
