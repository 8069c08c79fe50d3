//! Command buffer recording.
//!
//! A [`CommandBuffer`] lowers every `vkCmd*` call into [`GlCmd`] values on its
//! own [`CmdStream`]s. Nothing here touches GL; the only shared state is the
//! device-wide geometry registry. Recording is lock-free across buffers: each
//! buffer sits behind its own mutex ([`SharedCommandBuffer`]) and owns its
//! [`ContextStateStack`].
//!
//! Two streams are kept: `during` holds the commands replayed at submission,
//! `after` the cleanup replayed once the whole buffer has run (unbinding the
//! last program so it does not leak into the next submission).

mod bind;
mod draw;
mod mapped;
mod render_pass;
mod sync;
mod transfer;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, Weak};

use ash::vk;
use tracing::debug;
use vkgl_gl::GlFeatures;

use crate::cmd::{ClearValue, CmdStream, GlCmd, PreExecuteAction};
use crate::dependents::{DestructionListener, ObjectId};
use crate::error::{IcdError, Result};
use crate::geometry::{GeometryBuffersId, GeometryRegistry};
use crate::handle::DeviceObject;
use crate::objects::{Buffer, DescriptorSet, Framebuffer, Pipeline, PipelineLayout, RenderPass};
use crate::report::Reporter;
use crate::state::{ContextStateStack, DefaultState, FixedFunctionState, Rect, RenderArea, Viewport};

pub use mapped::MappedEntry;

/// Device-wide inputs every command buffer records against.
pub struct RecordEnv {
    pub features: GlFeatures,
    pub reporter: Arc<dyn Reporter>,
    pub default_state: DefaultState,
    /// Geometry with the dummy index buffer and no attributes, used for draws
    /// that consume no vertex input.
    pub dummy_geometry: GeometryBuffersId,
    pub geometry: Arc<GeometryRegistry>,
}

impl std::fmt::Debug for RecordEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordEnv")
            .field("features", &self.features)
            .field("dummy_geometry", &self.dummy_geometry)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordingState {
    Initial,
    Recording,
    Executable,
}

pub type SharedCommandBuffer = Arc<Mutex<CommandBuffer>>;

/// Render pass a secondary command buffer continues.
#[derive(Debug, Clone)]
pub struct Inheritance {
    pub render_pass: Arc<RenderPass>,
    pub subpass: u32,
    pub framebuffer: Option<Arc<Framebuffer>>,
}

#[derive(Debug, Clone, Default)]
pub struct BeginInfo {
    pub flags: vk::CommandBufferUsageFlags,
    pub inheritance: Option<Inheritance>,
}

#[derive(Debug, Clone)]
pub struct RenderPassBeginInfo {
    pub render_pass: Arc<RenderPass>,
    pub framebuffer: Arc<Framebuffer>,
    pub render_area: Rect,
    /// Indexed by attachment.
    pub clear_values: Vec<ClearValue>,
}

/// One entry of `vkCmdClearAttachments`.
#[derive(Debug, Clone, Copy)]
pub struct ClearAttachmentDesc {
    pub aspect: vk::ImageAspectFlags,
    /// Index into the subpass color attachments; ignored for depth/stencil.
    pub color_attachment: u32,
    pub value: ClearValue,
}

/// The part of a `VkBufferMemoryBarrier` recording cares about.
#[derive(Debug, Clone)]
pub struct BufferBarrier {
    pub buffer: Arc<Buffer>,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
}

#[derive(Debug, Clone)]
struct BoundSet {
    set: Arc<DescriptorSet>,
    dynamic_offsets: Vec<u32>,
}

#[derive(Debug, Clone)]
struct IndexBinding {
    buffer: Arc<Buffer>,
    offset: u64,
    ty: vk::IndexType,
}

/// Bindings of one pipeline bind point.
#[derive(Debug, Default)]
struct BindPoint {
    pipeline: Option<Arc<Pipeline>>,
    /// Layout the bound descriptor sets were last checked against.
    layout: Option<Arc<PipelineLayout>>,
    sets: BTreeMap<u32, BoundSet>,
    /// Sets recorded but not yet encoded, waiting for a pipeline.
    dirty_sets: BTreeSet<u32>,
    push_deferred: bool,
}

impl BindPoint {
    fn invalidate_from(&mut self, first: usize) {
        self.sets.retain(|&s, _| (s as usize) < first);
        self.dirty_sets.retain(|&s| (s as usize) < first);
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone)]
struct ActiveRenderPass {
    render_pass: Arc<RenderPass>,
    /// `None` for a secondary continuing a render pass with an unknown target.
    framebuffer: Option<Arc<Framebuffer>>,
    subpass: u32,
    area: Rect,
}

pub struct CommandBuffer {
    handle: vk::CommandBuffer,
    level: vk::CommandBufferLevel,
    env: Arc<RecordEnv>,
    this: Weak<Mutex<CommandBuffer>>,
    state: RecordingState,
    usage: vk::CommandBufferUsageFlags,
    stack: ContextStateStack,
    during: CmdStream,
    after: CmdStream,
    pending: Vec<PreExecuteAction>,
    mapped: Vec<MappedEntry>,
    render_pass: Option<ActiveRenderPass>,
    graphics: BindPoint,
    compute: BindPoint,
    /// Bind point whose program and resources are currently encoded.
    active_point: Option<vk::PipelineBindPoint>,
    /// Vertex-input hash of the last graphics pipeline.
    vertex_input_hash: Option<u64>,
    vertex_buffers: BTreeMap<u32, (Arc<Buffer>, u64)>,
    index_buffer: Option<IndexBinding>,
    selected_geometry: Option<GeometryBuffersId>,
    restart_index: Option<u32>,
    push_data: Vec<u8>,
    /// Values last set through `vkCmdSet*`, merged into every pipeline state.
    dynamic: FixedFunctionState,
    viewports: Vec<Viewport>,
    scissors: Vec<Rect>,
    unbind_queued: bool,
    active_queries: BTreeMap<(u64, u32), u32>,
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("handle", &self.handle)
            .field("level", &self.level)
            .field("state", &self.state)
            .field("commands", &self.during.len())
            .finish_non_exhaustive()
    }
}

impl CommandBuffer {
    pub fn allocate(
        handle: vk::CommandBuffer,
        level: vk::CommandBufferLevel,
        env: Arc<RecordEnv>,
    ) -> SharedCommandBuffer {
        Arc::new_cyclic(|this| {
            Mutex::new(CommandBuffer {
                handle,
                level,
                stack: ContextStateStack::new(env.features, &env.default_state),
                env,
                this: this.clone(),
                state: RecordingState::Initial,
                usage: vk::CommandBufferUsageFlags::empty(),
                during: CmdStream::new(),
                after: CmdStream::new(),
                pending: Vec::new(),
                mapped: Vec::new(),
                render_pass: None,
                graphics: BindPoint::default(),
                compute: BindPoint::default(),
                active_point: None,
                vertex_input_hash: None,
                vertex_buffers: BTreeMap::new(),
                index_buffer: None,
                selected_geometry: None,
                restart_index: None,
                push_data: Vec::new(),
                dynamic: FixedFunctionState::default(),
                viewports: Vec::new(),
                scissors: Vec::new(),
                unbind_queued: false,
                active_queries: BTreeMap::new(),
            })
        })
    }

    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    pub fn id(&self) -> ObjectId {
        ObjectId::of(self.handle)
    }

    pub fn level(&self) -> vk::CommandBufferLevel {
        self.level
    }

    pub fn is_primary(&self) -> bool {
        self.level == vk::CommandBufferLevel::PRIMARY
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn usage(&self) -> vk::CommandBufferUsageFlags {
        self.usage
    }

    /// Commands replayed at submission.
    pub fn commands(&self) -> &CmdStream {
        &self.during
    }

    /// Commands replayed after the whole buffer has run.
    pub fn after_commands(&self) -> &CmdStream {
        &self.after
    }

    pub fn pending_actions(&self) -> &[PreExecuteAction] {
        &self.pending
    }

    pub fn state_stack(&self) -> &ContextStateStack {
        &self.stack
    }

    /// Set indices with a descriptor set bound at `point`.
    pub fn bound_descriptor_sets(&self, point: vk::PipelineBindPoint) -> Vec<u32> {
        self.point(point).sets.keys().copied().collect()
    }

    pub fn bound_vertex_buffers(&self) -> Vec<u32> {
        self.vertex_buffers.keys().copied().collect()
    }

    /// `vkBeginCommandBuffer`. Implicitly resets an executable buffer.
    pub fn begin(&mut self, info: &BeginInfo) -> Result<()> {
        if self.state == RecordingState::Recording {
            return Err(IcdError::InvalidCommandBufferState {
                expected: RecordingState::Initial,
                actual: self.state,
            });
        }
        self.clear();
        self.usage = info.flags;
        self.state = RecordingState::Recording;

        let continues = info.flags.contains(vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE);
        if let (false, true, Some(inh)) = (self.is_primary(), continues, &info.inheritance) {
            match &inh.framebuffer {
                Some(fb) => self.stack.seed_target(
                    Some(fb.gl_name()),
                    RenderArea::from(fb.extent()),
                    Some(fb.is_window_surface()),
                ),
                None => self.stack.seed_target(None, RenderArea::UNKNOWN, None),
            }
            let area = inh.framebuffer.as_ref().map_or(Rect::new(0, 0, u32::MAX, u32::MAX), |fb| {
                Rect::new(0, 0, fb.extent().width, fb.extent().height)
            });
            self.render_pass = Some(ActiveRenderPass {
                render_pass: inh.render_pass.clone(),
                framebuffer: inh.framebuffer.clone(),
                subpass: inh.subpass,
                area,
            });
        }
        debug!(cb = %self.id(), flags = ?info.flags, "begin command buffer");
        Ok(())
    }

    /// `vkEndCommandBuffer`. Primary buffers are flattened into a single
    /// list per stream here.
    pub fn end(&mut self) -> Result<()> {
        if self.state != RecordingState::Recording {
            return Err(IcdError::InvalidCommandBufferState {
                expected: RecordingState::Recording,
                actual: self.state,
            });
        }
        if self.is_primary() && self.render_pass.is_some() {
            self.reporter()
                .validation(Some(self.id()), "command buffer ended inside a render pass");
        }
        self.push_data.clear();
        self.graphics.push_deferred = false;
        self.compute.push_deferred = false;

        if self.is_primary() {
            let remap = self.during.flatten();
            for entry in &mut self.mapped {
                entry.at = remap.apply(entry.at);
            }
            for action in &mut self.pending {
                action.at = remap.apply(action.at);
            }
            self.after.flatten();
        }
        self.state = RecordingState::Executable;
        debug!(cb = %self.id(), commands = self.during.len(), "end command buffer");
        Ok(())
    }

    /// `vkResetCommandBuffer`.
    pub fn reset(&mut self) {
        self.clear();
        self.state = RecordingState::Initial;
    }

    fn clear(&mut self) {
        self.stack = ContextStateStack::new(self.env.features, &self.env.default_state);
        self.usage = vk::CommandBufferUsageFlags::empty();
        self.during.clear();
        self.after.clear();
        self.pending.clear();
        self.mapped.clear();
        self.render_pass = None;
        self.graphics.clear();
        self.compute.clear();
        self.active_point = None;
        self.vertex_input_hash = None;
        self.vertex_buffers.clear();
        self.index_buffer = None;
        self.selected_geometry = None;
        self.restart_index = None;
        self.push_data.clear();
        self.dynamic = FixedFunctionState::default();
        self.viewports.clear();
        self.scissors.clear();
        self.unbind_queued = false;
        self.active_queries.clear();
    }

    fn reporter(&self) -> &dyn Reporter {
        self.env.reporter.as_ref()
    }

    fn features(&self) -> GlFeatures {
        self.env.features
    }

    /// Whether recording commands is allowed; reports when it is not.
    fn recording(&self, command: &str) -> bool {
        if self.state == RecordingState::Recording {
            return true;
        }
        self.reporter().validation(
            Some(self.id()),
            format!("{command} recorded while the command buffer is {:?}", self.state),
        );
        false
    }

    /// Reports a missing GL feature for `command`; returns whether it is present.
    fn require(&self, feature: GlFeatures, command: &str) -> bool {
        if self.features().contains(feature) {
            return true;
        }
        self.reporter()
            .unsupported(Some(self.id()), format!("{command} requires {feature:?}"));
        false
    }

    fn point(&self, point: vk::PipelineBindPoint) -> &BindPoint {
        match point {
            vk::PipelineBindPoint::COMPUTE => &self.compute,
            _ => &self.graphics,
        }
    }

    fn point_mut(&mut self, point: vk::PipelineBindPoint) -> &mut BindPoint {
        match point {
            vk::PipelineBindPoint::COMPUTE => &mut self.compute,
            _ => &mut self.graphics,
        }
    }

    fn push(&mut self, cmd: GlCmd) {
        self.during.push(cmd);
    }

    fn window_target(&self) -> bool {
        self.stack.current().window_target == Some(true)
    }
}

impl DeviceObject for Mutex<CommandBuffer> {
    type Handle = vk::CommandBuffer;

    fn handle(&self) -> vk::CommandBuffer {
        self.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).handle
    }
}

impl DestructionListener for Mutex<CommandBuffer> {
    fn on_destroyed(&self, object: ObjectId) {
        let mut cb = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cb.forget_memory(object);
    }
}
