use std::sync::Arc;

use ash::vk;
use tracing::{debug, trace};
use vkgl_gl::consts as gl;
use vkgl_gl::GlFeatures;

use crate::cmd::{CmdIndex, GlCmd, PreExecuteAction};
use crate::objects::{Buffer, QueryPool};
use crate::state::{translate, DepthBias, Rect, StencilFaceState, Viewport};

use super::{BufferBarrier, CommandBuffer, SharedCommandBuffer};

/// Writes `values` into `slots` starting at `first`, growing it as needed.
fn store<T: Copy + Default>(slots: &mut Vec<T>, first: u32, values: &[T]) {
    let first = first as usize;
    if slots.len() < first + values.len() {
        slots.resize(first + values.len(), T::default());
    }
    slots[first..first + values.len()].copy_from_slice(values);
}

impl CommandBuffer {
    /// `vkCmdPipelineBarrier`. Host writes made visible by the barrier are
    /// uploaded before it, host reads downloaded after it.
    pub fn pipeline_barrier(
        &mut self,
        src_access: vk::AccessFlags,
        dst_access: vk::AccessFlags,
        buffers: &[BufferBarrier],
    ) {
        if !self.recording("vkCmdPipelineBarrier") {
            return;
        }
        for b in buffers {
            if (src_access | b.src_access).contains(vk::AccessFlags::HOST_WRITE) {
                self.upload_buffer(&b.buffer);
            }
        }
        let dst = buffers.iter().fold(dst_access, |acc, b| acc | b.dst_access);
        let bits = translate::barrier_bits(dst);
        if bits != 0 && self.features().contains(GlFeatures::MEMORY_BARRIER) {
            self.push(GlCmd::MemoryBarrier(bits));
        }
        for b in buffers {
            if (dst_access | b.dst_access).contains(vk::AccessFlags::HOST_READ) {
                self.download_buffer(&b.buffer);
            }
        }
    }

    /// `vkCmdSetViewport`.
    pub fn set_viewport(&mut self, first: u32, viewports: &[Viewport]) {
        if !self.recording("vkCmdSetViewport")
            || (first != 0
                && !self.require(GlFeatures::VIEWPORT_ARRAY, "vkCmdSetViewport with firstViewport"))
        {
            return;
        }
        store(&mut self.viewports, first, viewports);
        self.stack
            .apply_viewports(&mut self.during, &mut self.pending, first, viewports, false);
    }

    /// `vkCmdSetScissor`.
    pub fn set_scissor(&mut self, first: u32, rects: &[Rect]) {
        if !self.recording("vkCmdSetScissor")
            || (first != 0
                && !self.require(GlFeatures::VIEWPORT_ARRAY, "vkCmdSetScissor with firstScissor"))
        {
            return;
        }
        store(&mut self.scissors, first, rects);
        if rects.is_empty() {
            return;
        }
        self.stack
            .apply_scissors(&mut self.during, &mut self.pending, first, rects, false);
    }

    pub fn set_line_width(&mut self, width: f32) {
        if !self.recording("vkCmdSetLineWidth") {
            return;
        }
        self.dynamic.rasterization.line_width = width;
        self.stack.apply_line_width(&mut self.during, width);
    }

    pub fn set_depth_bias(&mut self, constant: f32, clamp: f32, slope: f32) {
        if !self.recording("vkCmdSetDepthBias") {
            return;
        }
        let bias = DepthBias { constant, clamp, slope };
        self.dynamic.rasterization.depth_bias = bias;
        self.stack.apply_depth_bias(&mut self.during, bias);
    }

    pub fn set_blend_constants(&mut self, constants: [f32; 4]) {
        if !self.recording("vkCmdSetBlendConstants") {
            return;
        }
        self.dynamic.color_blend.constants = constants;
        self.stack.apply_blend_constants(&mut self.during, constants);
    }

    /// `vkCmdSetDepthBounds`. GL core has no depth bounds test.
    pub fn set_depth_bounds(&mut self, min: f32, max: f32) {
        if !self.recording("vkCmdSetDepthBounds") {
            return;
        }
        self.reporter()
            .unsupported(Some(self.id()), format!("vkCmdSetDepthBounds({min}, {max})"));
    }

    pub fn set_stencil_compare_mask(&mut self, faces: vk::StencilFaceFlags, mask: u32) {
        if !self.recording("vkCmdSetStencilCompareMask") {
            return;
        }
        self.update_dynamic_stencil(faces, |f| f.compare_mask = mask);
        self.stack.apply_stencil_compare_mask(&mut self.during, faces, mask);
    }

    pub fn set_stencil_write_mask(&mut self, faces: vk::StencilFaceFlags, mask: u32) {
        if !self.recording("vkCmdSetStencilWriteMask") {
            return;
        }
        self.update_dynamic_stencil(faces, |f| f.write_mask = mask);
        self.stack.apply_stencil_write_mask(&mut self.during, faces, mask);
    }

    pub fn set_stencil_reference(&mut self, faces: vk::StencilFaceFlags, reference: u32) {
        if !self.recording("vkCmdSetStencilReference") {
            return;
        }
        self.update_dynamic_stencil(faces, |f| f.reference = reference);
        self.stack.apply_stencil_reference(&mut self.during, faces, reference);
    }

    fn update_dynamic_stencil(
        &mut self,
        faces: vk::StencilFaceFlags,
        update: impl Fn(&mut StencilFaceState),
    ) {
        let ds = &mut self.dynamic.depth_stencil;
        if faces.contains(vk::StencilFaceFlags::FRONT) {
            update(&mut ds.front);
        }
        if faces.contains(vk::StencilFaceFlags::BACK) {
            update(&mut ds.back);
        }
    }

    /// `vkCmdResetQueryPool`. GL query objects need no reset.
    pub fn reset_query_pool(&mut self, pool: &Arc<QueryPool>, first: u32, count: u32) {
        if self.recording("vkCmdResetQueryPool") {
            trace!(cb = %self.id(), pool = %pool.id(), first, count, "query reset is implicit");
        }
    }

    pub fn begin_query(&mut self, pool: &Arc<QueryPool>, query: u32, flags: vk::QueryControlFlags) {
        if !self.recording("vkCmdBeginQuery") {
            return;
        }
        let Some(target) = translate::query_target(pool.query_type(), flags) else {
            self.reporter()
                .unsupported(Some(pool.id()), format!("queries of type {:?}", pool.query_type()));
            return;
        };
        let Some(name) = self.query_name(pool, query) else {
            return;
        };
        self.push(GlCmd::BeginQuery { target, query: name });
        self.active_queries.insert((pool.id().raw, query), target);
    }

    pub fn end_query(&mut self, pool: &Arc<QueryPool>, query: u32) {
        if !self.recording("vkCmdEndQuery") {
            return;
        }
        match self.active_queries.remove(&(pool.id().raw, query)) {
            Some(target) => self.push(GlCmd::EndQuery { target }),
            None => self
                .reporter()
                .validation(Some(pool.id()), format!("vkCmdEndQuery for inactive query {query}")),
        }
    }

    pub fn write_timestamp(&mut self, pool: &Arc<QueryPool>, query: u32) {
        if !self.recording("vkCmdWriteTimestamp") {
            return;
        }
        if let Some(name) = self.query_name(pool, query) {
            self.push(GlCmd::QueryCounter { query: name });
        }
    }

    /// `vkCmdCopyQueryPoolResults` through `GL_QUERY_BUFFER`. Availability,
    /// when requested, follows each result.
    #[allow(clippy::too_many_arguments)]
    pub fn copy_query_pool_results(
        &mut self,
        pool: &Arc<QueryPool>,
        first: u32,
        count: u32,
        buffer: &Arc<Buffer>,
        offset: u64,
        stride: u64,
        flags: vk::QueryResultFlags,
    ) {
        if !self.recording("vkCmdCopyQueryPoolResults")
            || !self.require(GlFeatures::QUERY_BUFFER_OBJECT, "vkCmdCopyQueryPoolResults")
        {
            return;
        }
        let wide = flags.contains(vk::QueryResultFlags::TYPE_64);
        let size = if wide { 8 } else { 4 };
        let pname = if flags.contains(vk::QueryResultFlags::WAIT) {
            gl::QUERY_RESULT
        } else {
            gl::QUERY_RESULT_NO_WAIT
        };
        self.upload_buffer(buffer);
        for i in 0..count {
            let Some(name) = self.query_name(pool, first + i) else {
                continue;
            };
            let at = buffer.gl_offset(offset + u64::from(i) * stride);
            self.push(GlCmd::CopyQueryResult {
                query: name,
                buffer: buffer.gl_name(),
                pname,
                offset: at,
                wide,
            });
            if flags.contains(vk::QueryResultFlags::WITH_AVAILABILITY) {
                self.push(GlCmd::CopyQueryResult {
                    query: name,
                    buffer: buffer.gl_name(),
                    pname: gl::QUERY_RESULT_AVAILABLE,
                    offset: at + size,
                    wide,
                });
            }
        }
        self.download_buffer(buffer);
    }

    fn query_name(&self, pool: &QueryPool, query: u32) -> Option<u32> {
        let name = pool.gl_name(query);
        if name.is_none() {
            self.reporter().validation(
                Some(pool.id()),
                format!("query {query} out of range for a pool of {}", pool.len()),
            );
        }
        name
    }

    /// `vkCmdBeginDebugUtilsLabelEXT`. Labels are dropped without debug output.
    pub fn begin_debug_label(&mut self, name: &str) {
        if self.recording("vkCmdBeginDebugUtilsLabelEXT")
            && self.features().contains(GlFeatures::DEBUG_OUTPUT)
        {
            self.push(GlCmd::PushDebugGroup(name.to_owned()));
        }
    }

    pub fn end_debug_label(&mut self) {
        if self.recording("vkCmdEndDebugUtilsLabelEXT")
            && self.features().contains(GlFeatures::DEBUG_OUTPUT)
        {
            self.push(GlCmd::PopDebugGroup);
        }
    }

    pub fn insert_debug_label(&mut self, name: &str) {
        if self.recording("vkCmdInsertDebugUtilsLabelEXT")
            && self.features().contains(GlFeatures::DEBUG_OUTPUT)
        {
            self.push(GlCmd::DebugMessage(name.to_owned()));
        }
    }

    /// `vkCmdExecuteCommands`. Each secondary's commands are inlined as a
    /// segment of their own; its mapped-memory entries and placeholders are
    /// carried over with their indices moved into that segment. Afterwards
    /// nothing is assumed about GL state or bindings.
    pub fn execute_commands(&mut self, secondaries: &[SharedCommandBuffer]) {
        if !self.recording("vkCmdExecuteCommands") {
            return;
        }
        if !self.is_primary() {
            self.reporter()
                .validation(Some(self.id()), "vkCmdExecuteCommands in a secondary command buffer");
            return;
        }
        let features = self.features();
        for shared in secondaries {
            if self.this.upgrade().is_some_and(|me| Arc::ptr_eq(&me, shared)) {
                self.reporter()
                    .validation(Some(self.id()), "command buffer executes itself");
                continue;
            }
            let secondary = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if secondary.is_primary() || secondary.state() != super::RecordingState::Executable {
                self.reporter().validation(
                    Some(secondary.id()),
                    format!(
                        "vkCmdExecuteCommands needs an executable secondary, got {:?} {:?}",
                        secondary.level(),
                        secondary.state()
                    ),
                );
                continue;
            }

            let (list, remap) = secondary.during.to_list();
            let segment = self.during.append_list(list);
            let place = |at: CmdIndex| CmdIndex {
                segment,
                index: remap.apply(at).index,
            };
            self.adopt_mapped(&secondary.mapped, place);

            let area = self.stack.current().render_area;
            for action in &secondary.pending {
                let moved = PreExecuteAction::new(place(action.at), action.deferred.clone());
                if area.is_known() && self.render_pass.is_some() {
                    moved.resolve(&mut self.during, features, area);
                } else {
                    self.pending.push(moved);
                }
            }
            for cmd in secondary.after.iter() {
                self.after.push(cmd.clone());
            }
            debug!(
                cb = %self.id(),
                secondary = %secondary.id(),
                commands = secondary.during.len(),
                segment,
                "inlined secondary command buffer"
            );
        }

        self.stack.invalidate();
        if self.render_pass.is_none() {
            self.stack.forget_framebuffer();
        }
        self.graphics.clear();
        self.compute.clear();
        self.active_point = None;
        self.vertex_input_hash = None;
        self.vertex_buffers.clear();
        self.index_buffer = None;
        self.selected_geometry = None;
        self.restart_index = None;
    }
}
