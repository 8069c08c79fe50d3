use std::sync::Arc;

use ash::vk;
use tracing::warn;
use vkgl_gl::consts as gl;
use vkgl_gl::{GlFeatures, VertexArrayLayout, VertexAttribLayout, VertexBindingLayout};

use crate::cmd::GlCmd;
use crate::format::format_info;
use crate::geometry::GeometryBuffersId;
use crate::objects::{geometry_key, Buffer, Pipeline, VertexInputDesc};
use crate::state::translate::{self, IndexFormat};

use super::CommandBuffer;

/// Geometry and draw parameters resolved for one draw.
struct DrawSetup {
    mode: u32,
    geometry: GeometryBuffersId,
    /// Element type and byte offset of the first index for indexed draws.
    index: Option<(IndexFormat, u64)>,
}

impl CommandBuffer {
    /// `vkCmdDraw`.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        if !self.recording("vkCmdDraw")
            || (first_instance != 0
                && !self.require(GlFeatures::BASE_INSTANCE, "vkCmdDraw with firstInstance"))
        {
            return;
        }
        let Some(setup) = self.prepare_draw(false, 0) else {
            return;
        };
        self.emit_draw(
            setup.geometry,
            GlCmd::DrawArrays {
                mode: setup.mode,
                first: first_vertex,
                count: vertex_count,
                instances: instance_count,
                base_instance: first_instance,
            },
        );
    }

    /// `vkCmdDrawIndexed`.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        if !self.recording("vkCmdDrawIndexed")
            || (first_instance != 0
                && !self.require(GlFeatures::BASE_INSTANCE, "vkCmdDrawIndexed with firstInstance"))
        {
            return;
        }
        let Some(setup) = self.prepare_draw(true, first_index) else {
            return;
        };
        let Some((format, offset)) = setup.index else {
            return;
        };
        self.emit_draw(
            setup.geometry,
            GlCmd::DrawElements {
                mode: setup.mode,
                count: index_count,
                ty: format.ty,
                offset,
                instances: instance_count,
                base_vertex: vertex_offset,
                base_instance: first_instance,
            },
        );
    }

    /// `vkCmdDrawIndirect`.
    pub fn draw_indirect(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        if !self.recording("vkCmdDrawIndirect")
            || !self.check_indirect("vkCmdDrawIndirect", draw_count)
        {
            return;
        }
        let Some(setup) = self.prepare_draw(false, 0) else {
            return;
        };
        self.bind_indirect(gl::DRAW_INDIRECT_BUFFER, buffer);
        self.emit_draw(
            setup.geometry,
            GlCmd::DrawArraysIndirect {
                mode: setup.mode,
                offset: buffer.gl_offset(offset),
                draw_count,
                stride,
            },
        );
    }

    /// `vkCmdDrawIndexedIndirect`.
    pub fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) {
        if !self.recording("vkCmdDrawIndexedIndirect")
            || !self.check_indirect("vkCmdDrawIndexedIndirect", draw_count)
        {
            return;
        }
        let Some(setup) = self.prepare_draw(true, 0) else {
            return;
        };
        let Some((format, _)) = setup.index else {
            return;
        };
        self.bind_indirect(gl::DRAW_INDIRECT_BUFFER, buffer);
        self.emit_draw(
            setup.geometry,
            GlCmd::DrawElementsIndirect {
                mode: setup.mode,
                ty: format.ty,
                offset: buffer.gl_offset(offset),
                draw_count,
                stride,
            },
        );
    }

    /// `vkCmdDispatch`.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        if !self.recording("vkCmdDispatch")
            || !self.require(GlFeatures::COMPUTE, "vkCmdDispatch")
            || !self.prepare_dispatch()
        {
            return;
        }
        self.push(GlCmd::Dispatch([x, y, z]));
        self.download_storage(vk::PipelineBindPoint::COMPUTE);
    }

    /// `vkCmdDispatchIndirect`.
    pub fn dispatch_indirect(&mut self, buffer: &Arc<Buffer>, offset: u64) {
        if !self.recording("vkCmdDispatchIndirect")
            || !self.require(GlFeatures::COMPUTE, "vkCmdDispatchIndirect")
            || !self.prepare_dispatch()
        {
            return;
        }
        self.bind_indirect(gl::DISPATCH_INDIRECT_BUFFER, buffer);
        self.push(GlCmd::DispatchIndirect {
            offset: buffer.gl_offset(offset),
        });
        self.download_storage(vk::PipelineBindPoint::COMPUTE);
    }

    fn check_indirect(&self, command: &str, draw_count: u32) -> bool {
        if !self.require(GlFeatures::DRAW_INDIRECT, command) {
            return false;
        }
        draw_count <= 1
            || self.require(
                GlFeatures::MULTI_DRAW_INDIRECT,
                &format!("{command} with drawCount > 1"),
            )
    }

    fn bind_indirect(&mut self, target: u32, buffer: &Buffer) {
        self.upload_buffer(buffer);
        self.push(GlCmd::BindBuffer {
            target,
            buffer: buffer.gl_name(),
        });
    }

    fn emit_draw(&mut self, geometry: GeometryBuffersId, draw: GlCmd) {
        self.push(GlCmd::BindGeometry(geometry));
        self.push(draw);
        self.push(GlCmd::UnbindVertexArray);
        self.download_storage(vk::PipelineBindPoint::GRAPHICS);
    }

    fn download_storage(&mut self, point: vk::PipelineBindPoint) {
        for buffer in self.bound_storage_buffers(point) {
            self.download_buffer(&buffer);
        }
    }

    fn prepare_dispatch(&mut self) -> bool {
        if self.compute.pipeline.is_none() {
            self.reporter()
                .validation(Some(self.id()), "dispatch without a bound compute pipeline");
            return false;
        }
        if !self.activate(vk::PipelineBindPoint::COMPUTE) {
            self.reporter()
                .validation(Some(self.id()), "compute pipeline has no usable program");
            return false;
        }
        true
    }

    /// Encodes everything a draw depends on except the draw itself.
    fn prepare_draw(&mut self, indexed: bool, first_index: u32) -> Option<DrawSetup> {
        let Some(pipeline) = self.graphics.pipeline.clone() else {
            self.reporter()
                .validation(Some(self.id()), "draw without a bound graphics pipeline");
            return None;
        };
        if self.render_pass.is_none() {
            self.reporter().validation(Some(self.id()), "draw outside a render pass");
            return None;
        }
        self.apply_graphics_state();
        if !self.activate(vk::PipelineBindPoint::GRAPHICS) {
            self.reporter()
                .validation(Some(pipeline.id()), "graphics pipeline has no usable program");
            return None;
        }

        let fixed = &pipeline.variant(self.window_target()).fixed;
        let mode = fixed.input_assembly.mode;
        let restart = fixed.input_assembly.primitive_restart;

        let input = pipeline.vertex_input();
        if input.is_empty() && (!indexed || self.index_buffer.is_none()) {
            let index = indexed.then(|| (translate::index_format(vk::IndexType::UINT32), 0));
            if let (true, Some((format, _))) = (restart, index) {
                self.set_restart_index(format.restart_index);
            }
            return Some(DrawSetup {
                mode,
                geometry: self.env.dummy_geometry,
                index,
            });
        }
        if indexed && self.index_buffer.is_none() {
            self.reporter()
                .validation(Some(self.id()), "indexed draw without a bound index buffer");
            return None;
        }

        for binding in &input.bindings {
            if let Some((buffer, _)) = self.vertex_buffers.get(&binding.binding).cloned() {
                self.upload_buffer(&buffer);
            }
        }
        let index = match (indexed, self.index_buffer.clone()) {
            (true, Some(ib)) => {
                self.upload_buffer(&ib.buffer);
                let format = translate::index_format(ib.ty);
                let skipped = u64::from(first_index) * u64::from(format.size);
                let offset = ib.buffer.gl_offset(ib.offset) + skipped;
                if restart {
                    self.set_restart_index(format.restart_index);
                }
                Some((format, offset))
            }
            _ => None,
        };

        let geometry = match self.selected_geometry {
            Some(id) => id,
            None => {
                let id = self.geometry_for(&pipeline);
                self.selected_geometry = Some(id);
                id
            }
        };
        Some(DrawSetup { mode, geometry, index })
    }

    fn set_restart_index(&mut self, index: u32) {
        if self.restart_index != Some(index) {
            self.push(GlCmd::PrimitiveRestartIndex(index));
            self.restart_index = Some(index);
        }
    }

    fn geometry_for(&self, pipeline: &Pipeline) -> GeometryBuffersId {
        let input = pipeline.vertex_input();
        let vertex_buffers: Vec<_> = input
            .bindings
            .iter()
            .filter_map(|b| {
                let (buffer, offset) = self.vertex_buffers.get(&b.binding)?;
                Some((b.binding, buffer.id(), *offset))
            })
            .collect();
        let index = self.index_buffer.as_ref().map(|ib| ib.buffer.id());
        let key = geometry_key(&vertex_buffers, index);
        pipeline.geometry_buffers(key, || self.geometry_layout(input))
    }

    fn geometry_layout(&self, input: &VertexInputDesc) -> (VertexArrayLayout, Vec<Arc<Buffer>>) {
        let mut buffers = Vec::new();
        let mut layout = VertexArrayLayout::default();
        for b in &input.bindings {
            let Some((buffer, offset)) = self.vertex_buffers.get(&b.binding) else {
                warn!(cb = %self.id(), binding = b.binding, "no vertex buffer bound for binding");
                continue;
            };
            buffers.push(buffer.clone());
            layout.bindings.push(VertexBindingLayout {
                binding: b.binding,
                buffer: buffer.gl_name(),
                offset: buffer.gl_offset(*offset),
                stride: b.stride,
                divisor: u32::from(b.input_rate == vk::VertexInputRate::INSTANCE),
            });
        }
        for a in &input.attributes {
            let Some(info) = format_info(a.format) else {
                warn!(
                    cb = %self.id(),
                    location = a.location,
                    format = ?a.format,
                    "unsupported vertex format"
                );
                continue;
            };
            layout.attributes.push(VertexAttribLayout {
                location: a.location,
                binding: a.binding,
                components: info.components,
                ty: info.ty,
                normalized: info.normalized,
                integer: info.is_integer(),
                offset: a.offset,
            });
        }
        if let Some(ib) = &self.index_buffer {
            layout.element_buffer = ib.buffer.gl_name();
            buffers.push(ib.buffer.clone());
        }
        (layout, buffers)
    }
}
