use std::collections::BTreeSet;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, trace};
use vkgl_gl::consts as gl;

use crate::cmd::GlCmd;
use crate::objects::{Buffer, DescriptorSet, Descriptor, DynamicStates, Pipeline, PipelineLayout};
use crate::shader::CompiledProgram;

use super::{BoundSet, CommandBuffer, IndexBinding};

impl CommandBuffer {
    /// `vkCmdBindPipeline`.
    pub fn bind_pipeline(&mut self, pipeline: &Arc<Pipeline>) {
        if !self.recording("vkCmdBindPipeline") {
            return;
        }
        let point = pipeline.bind_point();
        let has_push_data = !self.push_data.is_empty();
        let bp = self.point_mut(point);
        if let Some(previous) = &bp.layout {
            let first = previous.compatibility(pipeline.layout()).first_invalidated();
            bp.invalidate_from(first);
        }
        bp.layout = Some(pipeline.layout().clone());
        bp.pipeline = Some(pipeline.clone());
        let remaining: Vec<u32> = bp.sets.keys().copied().collect();
        bp.dirty_sets.extend(remaining);
        bp.push_deferred |= has_push_data;

        if point == vk::PipelineBindPoint::GRAPHICS {
            let hash = pipeline.vertex_input_hash();
            if self.vertex_input_hash.is_some_and(|h| h != hash) {
                trace!(cb = %self.id(), "vertex input changed, dropping vertex buffer bindings");
                self.vertex_buffers.clear();
                self.index_buffer = None;
            }
            self.vertex_input_hash = Some(hash);
            self.selected_geometry = None;
            self.apply_graphics_state();
        }
        if !pipeline.is_valid() {
            self.reporter()
                .validation(Some(pipeline.id()), "bound pipeline has no usable program");
        }
        self.activate(point);

        if !self.unbind_queued {
            self.after.push(GlCmd::UseProgram(0));
            self.unbind_queued = true;
        }
        debug!(cb = %self.id(), pipeline = %pipeline.id(), ?point, "bound pipeline");
    }

    /// `vkCmdBindVertexBuffers`.
    pub fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[(Arc<Buffer>, u64)]) {
        if !self.recording("vkCmdBindVertexBuffers") {
            return;
        }
        for (i, (buffer, offset)) in buffers.iter().enumerate() {
            self.vertex_buffers
                .insert(first_binding + i as u32, (buffer.clone(), *offset));
        }
        self.selected_geometry = None;
    }

    /// `vkCmdBindIndexBuffer`.
    pub fn bind_index_buffer(&mut self, buffer: &Arc<Buffer>, offset: u64, ty: vk::IndexType) {
        if !self.recording("vkCmdBindIndexBuffer") {
            return;
        }
        self.index_buffer = Some(IndexBinding {
            buffer: buffer.clone(),
            offset,
            ty,
        });
        self.selected_geometry = None;
    }

    /// `vkCmdBindDescriptorSets`. Mapped buffers referenced by the sets are
    /// uploaded right away; the bindings themselves are encoded once a
    /// pipeline is bound at `point`.
    pub fn bind_descriptor_sets(
        &mut self,
        point: vk::PipelineBindPoint,
        layout: &Arc<PipelineLayout>,
        first_set: u32,
        sets: &[Arc<DescriptorSet>],
        dynamic_offsets: &[u32],
    ) {
        if !self.recording("vkCmdBindDescriptorSets") {
            return;
        }
        let expected: usize = sets.iter().map(|s| s.layout().dynamic_count()).sum();
        if expected != dynamic_offsets.len() {
            self.reporter().validation(
                Some(self.id()),
                format!(
                    "{} dynamic offsets supplied, descriptor sets consume {expected}",
                    dynamic_offsets.len()
                ),
            );
            return;
        }
        for (i, set) in sets.iter().enumerate() {
            let index = first_set + i as u32;
            let compatible = layout
                .set_layout(index)
                .is_some_and(|l| Arc::ptr_eq(l, set.layout()) || l.is_compatible(set.layout()));
            if !compatible {
                self.reporter().validation(
                    Some(self.id()),
                    format!("descriptor set {index} does not match the pipeline layout"),
                );
                return;
            }
        }

        let bp = self.point_mut(point);
        if let Some(previous) = &bp.layout {
            if !Arc::ptr_eq(previous, layout) {
                let first = previous.compatibility(layout).first_invalidated();
                bp.invalidate_from(first);
            }
        }
        bp.layout = Some(layout.clone());
        let mut offsets = dynamic_offsets;
        for (i, set) in sets.iter().enumerate() {
            let (own, rest) = offsets.split_at(set.layout().dynamic_count());
            offsets = rest;
            let index = first_set + i as u32;
            bp.sets.insert(
                index,
                BoundSet {
                    set: set.clone(),
                    dynamic_offsets: own.to_vec(),
                },
            );
            bp.dirty_sets.insert(index);
        }

        let mut seen = BTreeSet::new();
        for set in sets {
            for (_, descriptor) in set.snapshot() {
                if let Some(range) = descriptor.buffer_range() {
                    if range.buffer.is_mapped() && seen.insert(range.buffer.id()) {
                        self.upload_buffer(&range.buffer);
                    }
                }
            }
        }

        if self.active_point == Some(point) {
            if let Some(pipeline) = self.point(point).pipeline.clone() {
                self.flush_sets(point, &pipeline);
            }
        }
    }

    /// `vkCmdPushConstants`. Written bytes are kept for the whole recording;
    /// members are encoded as uniforms of the program that consumes them.
    pub fn push_constants(&mut self, stages: vk::ShaderStageFlags, offset: u32, data: &[u8]) {
        if !self.recording("vkCmdPushConstants") {
            return;
        }
        let start = offset as usize;
        let end = start + data.len();
        if self.push_data.len() < end {
            self.push_data.resize(end, 0);
        }
        self.push_data[start..end].copy_from_slice(data);

        let mut points = Vec::with_capacity(2);
        if stages.intersects(vk::ShaderStageFlags::ALL_GRAPHICS) {
            points.push(vk::PipelineBindPoint::GRAPHICS);
        }
        if stages.contains(vk::ShaderStageFlags::COMPUTE) {
            points.push(vk::PipelineBindPoint::COMPUTE);
        }
        for point in points {
            let pipeline = self.point(point).pipeline.clone();
            match pipeline {
                Some(pipeline) if self.active_point == Some(point) && pipeline.is_valid() => {
                    let program = &pipeline.variant(self.window_target()).program;
                    self.encode_push_constants(program, Some((offset, data.len() as u32)));
                }
                _ => self.point_mut(point).push_deferred = true,
            }
        }
    }

    /// Brings the bound graphics pipeline's fixed-function state, viewports
    /// and scissors into the state stack. Everything is diffed, so calling
    /// this before every draw only encodes what other commands disturbed.
    pub(super) fn apply_graphics_state(&mut self) {
        let Some(pipeline) = self.graphics.pipeline.clone() else {
            return;
        };
        let dynamic = pipeline.dynamic_states();
        let fixed = pipeline
            .variant(self.window_target())
            .fixed
            .with_dynamic(&self.dynamic, dynamic);
        self.stack.apply(&mut self.during, &fixed, false);

        if dynamic.contains(DynamicStates::VIEWPORT) {
            self.stack
                .apply_viewports(&mut self.during, &mut self.pending, 0, &self.viewports, false);
        } else {
            self.stack
                .apply_viewports(
                    &mut self.during,
                    &mut self.pending,
                    0,
                    pipeline.viewports(),
                    false,
                );
        }
        if dynamic.contains(DynamicStates::SCISSOR) {
            if !self.scissors.is_empty() {
                self.stack
                    .apply_scissors(&mut self.during, &mut self.pending, 0, &self.scissors, false);
            }
        } else {
            self.stack
                .apply_scissors(&mut self.during, &mut self.pending, 0, pipeline.scissors(), false);
        }
    }

    /// Makes `point` the bind point whose program and resources are encoded,
    /// then flushes whatever is still deferred. Returns false when no usable
    /// program is bound there.
    pub(super) fn activate(&mut self, point: vk::PipelineBindPoint) -> bool {
        let Some(pipeline) = self.point(point).pipeline.clone() else {
            return false;
        };
        let program = &pipeline.variant(self.window_target()).program;
        if !program.is_valid() {
            return false;
        }
        if self.active_point != Some(point) {
            let has_push_data = !self.push_data.is_empty();
            let bp = self.point_mut(point);
            let all: Vec<u32> = bp.sets.keys().copied().collect();
            bp.dirty_sets.extend(all);
            bp.push_deferred |= has_push_data;
            self.active_point = Some(point);
        }
        self.stack.set_program(&mut self.during, program.program);
        self.flush_sets(point, &pipeline);
        if std::mem::take(&mut self.point_mut(point).push_deferred) {
            self.encode_push_constants(program, None);
        }
        true
    }

    fn flush_sets(&mut self, point: vk::PipelineBindPoint, pipeline: &Pipeline) {
        let dirty = std::mem::take(&mut self.point_mut(point).dirty_sets);
        let program = &pipeline.variant(self.window_target()).program;
        for index in dirty {
            if let Some(bound) = self.point(point).sets.get(&index).cloned() {
                self.encode_set(index, &bound, program);
            }
        }
    }

    fn encode_set(&mut self, index: u32, bound: &BoundSet, program: &CompiledProgram) {
        for rb in program.bindings.iter().filter(|b| b.set == index) {
            let Some(descriptor) = bound.set.get(rb.binding, rb.array_element) else {
                continue;
            };
            let dynamic_offset = if descriptor.is_dynamic() {
                bound
                    .set
                    .dynamic_index(rb.binding, rb.array_element)
                    .and_then(|i| bound.dynamic_offsets.get(i))
                    .copied()
                    .map_or(0, u64::from)
            } else {
                0
            };
            let unit = rb.unit;
            match &descriptor {
                Descriptor::UniformBuffer(r)
                | Descriptor::UniformBufferDynamic(r)
                | Descriptor::StorageBuffer(r)
                | Descriptor::StorageBufferDynamic(r) => {
                    let target = if descriptor.is_storage_buffer() {
                        gl::SHADER_STORAGE_BUFFER
                    } else {
                        gl::UNIFORM_BUFFER
                    };
                    let offset = r.offset + dynamic_offset;
                    self.push(GlCmd::BindBufferRange {
                        target,
                        index: unit,
                        buffer: r.buffer.gl_name(),
                        offset: r.buffer.gl_offset(offset),
                        size: r.buffer.range(offset, r.range),
                    });
                }
                Descriptor::CombinedImageSampler { view, sampler } => {
                    self.push(GlCmd::BindTexture {
                        unit,
                        target: view.target(),
                        texture: view.gl_name(),
                    });
                    self.push(GlCmd::BindSampler {
                        unit,
                        sampler: sampler.gl_name(),
                    });
                }
                Descriptor::SampledImage(view) | Descriptor::InputAttachment(view) => {
                    self.push(GlCmd::BindTexture {
                        unit,
                        target: view.target(),
                        texture: view.gl_name(),
                    });
                }
                Descriptor::Sampler(sampler) => {
                    self.push(GlCmd::BindSampler {
                        unit,
                        sampler: sampler.gl_name(),
                    });
                }
                Descriptor::StorageImage(view) => {
                    self.push(GlCmd::BindImageTexture {
                        unit,
                        texture: view.gl_name(),
                        level: view.base_level(),
                        layered: view.layer_count() > 1,
                        layer: view.base_layer(),
                        access: gl::READ_WRITE,
                        format: view.info().internal_format,
                    });
                }
            }
        }
    }

    /// Encodes the members of `program` covered by the pushed bytes, limited
    /// to those overlapping `range` when given.
    fn encode_push_constants(&mut self, program: &CompiledProgram, range: Option<(u32, u32)>) {
        for member in &program.push_constants {
            if range.is_some_and(|(offset, size)| !member.overlaps(offset, size)) {
                continue;
            }
            if let Some(value) = member.decode(&self.push_data) {
                self.during.push(GlCmd::Uniform {
                    program: program.program,
                    location: member.location,
                    value,
                });
            }
        }
    }

    /// Storage buffers bound at `point`, which a shader may have written.
    pub(super) fn bound_storage_buffers(&self, point: vk::PipelineBindPoint) -> Vec<Arc<Buffer>> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for bound in self.point(point).sets.values() {
            for (_, descriptor) in bound.set.snapshot() {
                let storage = descriptor.is_storage_buffer();
                if let (true, Some(range)) = (storage, descriptor.buffer_range()) {
                    if seen.insert(range.buffer.id()) {
                        out.push(range.buffer.clone());
                    }
                }
            }
        }
        out
    }
}
