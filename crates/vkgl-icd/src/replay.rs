//! Command replay.
//!
//! [`Replayer`] walks a finished command list in encoding order and issues the
//! GL calls for each [`GlCmd`]. It runs with the context lock held and never
//! fails: GL errors and dangling references are reported and the next
//! command runs regardless.

use ash::vk;
use tracing::trace;
use vkgl_gl::consts as gl;
use vkgl_gl::{DeviceBackend, GlApi, TextureSubresource};

use crate::cmd::{ClearColor, ClearValue, GlCmd, TRANSFER_TEXTURE_UNIT};
use crate::dependents::ObjectId;
use crate::geometry::{GeometryRegistry, VaoTable};
use crate::handle::HandleTable;
use crate::objects::DeviceMemory;
use crate::report::{Category, Reporter};

/// Everything replay needs from the device, borrowed for one submission.
pub struct Replayer<'a> {
    pub gl: &'a mut dyn GlApi,
    pub backend: &'a mut DeviceBackend,
    pub vaos: &'a mut VaoTable,
    pub geometry: &'a GeometryRegistry,
    pub memories: &'a HandleTable<DeviceMemory>,
    pub reporter: &'a dyn Reporter,
    /// Trace every command before it runs.
    pub log_calls: bool,
    /// Poll `glGetError` after every command.
    pub check_errors: bool,
}

/// Upper bound on `glGetError` polls per command; some drivers never return
/// `GL_NO_ERROR` once the context is lost.
const MAX_ERRORS_PER_COMMAND: usize = 8;

impl Replayer<'_> {
    /// Replays `cmds` in order. Returns the number of GL errors observed.
    pub fn run<'c>(&mut self, cmds: impl IntoIterator<Item = &'c GlCmd>) -> usize {
        let mut errors = 0;
        for cmd in cmds {
            if self.log_calls {
                trace!(?cmd, "replay");
            }
            self.apply(cmd);
            if self.check_errors {
                errors += self.drain_errors(cmd);
            }
        }
        errors
    }

    fn drain_errors(&mut self, cmd: &GlCmd) -> usize {
        let mut seen = 0;
        while seen < MAX_ERRORS_PER_COMMAND {
            let code = self.gl.get_error();
            if code == gl::NO_ERROR {
                break;
            }
            seen += 1;
            self.reporter.error(
                None,
                vk::Result::ERROR_UNKNOWN,
                Category::Backend,
                format!("GL error {code:#x} replaying {cmd:?}"),
            );
        }
        seen
    }

    fn apply(&mut self, cmd: &GlCmd) {
        let gl = &mut *self.gl;
        match cmd {
            GlCmd::Enable(cap) => gl.enable(*cap),
            GlCmd::Disable(cap) => gl.disable(*cap),
            GlCmd::EnableIndexed { cap, index } => gl.enable_i(*cap, *index),
            GlCmd::DisableIndexed { cap, index } => gl.disable_i(*cap, *index),

            GlCmd::BlendFunc {
                src_rgb,
                dst_rgb,
                src_alpha,
                dst_alpha,
            } => gl.blend_func_separate(*src_rgb, *dst_rgb, *src_alpha, *dst_alpha),
            GlCmd::BlendFuncIndexed {
                buf,
                src_rgb,
                dst_rgb,
                src_alpha,
                dst_alpha,
            } => gl.blend_func_separate_i(*buf, *src_rgb, *dst_rgb, *src_alpha, *dst_alpha),
            GlCmd::BlendEquation { rgb, alpha } => gl.blend_equation_separate(*rgb, *alpha),
            GlCmd::BlendEquationIndexed { buf, rgb, alpha } => {
                gl.blend_equation_separate_i(*buf, *rgb, *alpha)
            }
            GlCmd::BlendColor([r, g, b, a]) => gl.blend_color(*r, *g, *b, *a),
            GlCmd::ColorMask([r, g, b, a]) => gl.color_mask(*r, *g, *b, *a),
            GlCmd::ColorMaskIndexed { buf, mask: [r, g, b, a] } => {
                gl.color_mask_i(*buf, *r, *g, *b, *a)
            }
            GlCmd::LogicOp(op) => gl.logic_op(*op),

            GlCmd::DepthFunc(func) => gl.depth_func(*func),
            GlCmd::DepthMask(flag) => gl.depth_mask(*flag),
            GlCmd::StencilFunc {
                face,
                func,
                reference,
                mask,
            } => gl.stencil_func_separate(*face, *func, *reference as i32, *mask),
            GlCmd::StencilOp {
                face,
                fail,
                depth_fail,
                pass,
            } => gl.stencil_op_separate(*face, *fail, *depth_fail, *pass),
            GlCmd::StencilMask { face, mask } => gl.stencil_mask_separate(*face, *mask),

            GlCmd::PolygonMode(mode) => gl.polygon_mode(gl::FRONT_AND_BACK, *mode),
            GlCmd::CullFace(mode) => gl.cull_face(*mode),
            GlCmd::FrontFace(mode) => gl.front_face(*mode),
            GlCmd::PolygonOffset { factor, units } => gl.polygon_offset(*factor, *units),
            GlCmd::PolygonOffsetClamp { factor, units, clamp } => {
                gl.polygon_offset_clamp(*factor, *units, *clamp)
            }
            GlCmd::LineWidth(width) => gl.line_width(*width),
            GlCmd::MinSampleShading(value) => gl.min_sample_shading(*value),
            GlCmd::SampleMask(mask) => gl.sample_mask_i(0, *mask),
            GlCmd::PatchVertices(count) => gl.patch_parameter_i(gl::PATCH_VERTICES, *count as i32),
            GlCmd::PrimitiveRestartIndex(index) => gl.primitive_restart_index(*index),

            GlCmd::Viewport {
                rect: [x, y, w, h],
                depth: [near, far],
            } => {
                gl.viewport(*x, *y, *w, *h);
                gl.depth_range(*near, *far);
            }
            GlCmd::ViewportArray { first, rects, depths } => {
                gl.viewport_array(*first, rects);
                gl.depth_range_array(*first, depths);
            }
            GlCmd::Scissor([x, y, w, h]) => gl.scissor(*x, *y, *w, *h),
            GlCmd::ScissorArray { first, rects } => gl.scissor_array(*first, rects),

            GlCmd::BindFramebuffer { target, framebuffer } => {
                gl.bind_framebuffer(*target, *framebuffer)
            }
            GlCmd::DrawBuffers(buffers) => gl.draw_buffers(buffers),
            GlCmd::ClearAttachment {
                buffer,
                draw_buffer,
                value,
            } => clear_buffer(gl, *buffer, *draw_buffer, value),
            GlCmd::InvalidateFramebuffer { target, attachments } => {
                gl.invalidate_framebuffer(*target, attachments)
            }
            GlCmd::BlitImage {
                src,
                dst,
                src_rect,
                dst_rect,
                mask,
                filter,
            } => {
                let scratch = self.backend.scratch();
                scratch.bind_read(gl, src);
                scratch.bind_draw(gl, dst);
                gl.blit_framebuffer(*src_rect, *dst_rect, *mask, *filter);
            }
            GlCmd::ClearImageLayer { dst, value } => {
                self.backend.scratch().bind_draw(gl, dst);
                clear_buffer(gl, layer_buffer(dst), 0, value);
            }
            GlCmd::CopyImage {
                src,
                src_target,
                src_level,
                src_origin,
                dst,
                dst_target,
                dst_level,
                dst_origin,
                extent,
            } => gl.copy_image_sub_data(
                *src,
                *src_target,
                *src_level,
                *src_origin,
                *dst,
                *dst_target,
                *dst_level,
                *dst_origin,
                *extent,
            ),
            GlCmd::ClearTexImage {
                texture,
                level,
                origin,
                extent,
                format,
                ty,
                data,
            } => gl.clear_tex_sub_image(*texture, *level, *origin, *extent, *format, *ty, data),
            GlCmd::TexSubImage {
                texture,
                bind_target,
                target,
                level,
                origin,
                extent,
                format,
                ty,
                compressed_size,
                buffer,
                offset,
                row_length,
                image_height,
            } => {
                gl.active_texture(gl::TEXTURE0 + TRANSFER_TEXTURE_UNIT);
                gl.bind_texture(*bind_target, *texture);
                gl.bind_buffer(gl::PIXEL_UNPACK_BUFFER, *buffer);
                gl.pixel_store_i(gl::UNPACK_ROW_LENGTH, *row_length as i32);
                gl.pixel_store_i(gl::UNPACK_IMAGE_HEIGHT, *image_height as i32);
                match compressed_size {
                    Some(size) => {
                        gl.compressed_tex_sub_image(
                            *target,
                            *level,
                            *origin,
                            *extent,
                            *format,
                            *size,
                            *offset as usize,
                        )
                    }
                    None => {
                        let offset = *offset as usize;
                        gl.tex_sub_image(*target, *level, *origin, *extent, *format, *ty, offset)
                    }
                }
                gl.pixel_store_i(gl::UNPACK_ROW_LENGTH, 0);
                gl.pixel_store_i(gl::UNPACK_IMAGE_HEIGHT, 0);
                gl.bind_buffer(gl::PIXEL_UNPACK_BUFFER, 0);
                gl.bind_texture(*bind_target, 0);
            }
            GlCmd::ReadImage {
                src,
                origin,
                extent,
                format,
                ty,
                buffer,
                offset,
                buf_size,
                row_length,
                image_height,
            } => {
                gl.bind_buffer(gl::PIXEL_PACK_BUFFER, *buffer);
                gl.pixel_store_i(gl::PACK_ROW_LENGTH, *row_length as i32);
                gl.pixel_store_i(gl::PACK_IMAGE_HEIGHT, *image_height as i32);
                self.backend
                    .read_image(
                        gl,
                        src,
                        *origin,
                        *extent,
                        *format,
                        *ty,
                        *buf_size,
                        *offset as usize,
                    );
                gl.pixel_store_i(gl::PACK_ROW_LENGTH, 0);
                gl.pixel_store_i(gl::PACK_IMAGE_HEIGHT, 0);
                gl.bind_buffer(gl::PIXEL_PACK_BUFFER, 0);
            }

            GlCmd::CopyBuffer {
                src,
                dst,
                src_offset,
                dst_offset,
                size,
            } => self.backend.copy_buffer(gl, *src, *dst, *src_offset, *dst_offset, *size),
            GlCmd::UpdateBuffer { buffer, offset, data } => {
                self.backend.upload_buffer(gl, *buffer, *offset, data)
            }
            GlCmd::FillBuffer {
                buffer,
                offset,
                size,
                data,
                use_clear,
            } => {
                if *use_clear {
                    gl.bind_buffer(gl::COPY_WRITE_BUFFER, *buffer);
                    gl.clear_buffer_sub_data(
                        gl::COPY_WRITE_BUFFER,
                        gl::R32UI,
                        *offset,
                        *size,
                        gl::RED_INTEGER,
                        gl::UNSIGNED_INT,
                        &data.to_le_bytes(),
                    );
                    gl.bind_buffer(gl::COPY_WRITE_BUFFER, 0);
                } else {
                    let pattern = data.to_le_bytes();
                    let bytes: Vec<u8> =
                        pattern.iter().copied().cycle().take(*size as usize).collect();
                    self.backend.upload_buffer(gl, *buffer, *offset, &bytes);
                }
            }
            GlCmd::UploadMemory { memory, offset, size } => {
                self.upload_memory(*memory, *offset, *size)
            }
            GlCmd::DownloadMemory { memory, offset, size } => {
                self.download_memory(*memory, *offset, *size)
            }

            GlCmd::UseProgram(program) => gl.use_program(*program),
            GlCmd::Uniform {
                program,
                location,
                value,
            } => self.backend.uniform(gl, *program, *location, value),
            GlCmd::BindBuffer { target, buffer } => gl.bind_buffer(*target, *buffer),
            GlCmd::BindBufferRange {
                target,
                index,
                buffer,
                offset,
                size,
            } => gl.bind_buffer_range(*target, *index, *buffer, *offset, *size),
            GlCmd::BindTexture { unit, target, texture } => {
                gl.active_texture(gl::TEXTURE0 + unit);
                gl.bind_texture(*target, *texture);
            }
            GlCmd::BindSampler { unit, sampler } => gl.bind_sampler(*unit, *sampler),
            GlCmd::BindImageTexture {
                unit,
                texture,
                level,
                layered,
                layer,
                access,
                format,
            } => gl.bind_image_texture(*unit, *texture, *level, *layered, *layer, *access, *format),
            GlCmd::BindGeometry(id) => {
                match self.vaos.get_or_create(gl, self.backend, self.geometry, *id) {
                    Some(vao) => gl.bind_vertex_array(vao),
                    None => {
                        gl.bind_vertex_array(0);
                        self.reporter.warning(
                            None,
                            vk::Result::SUCCESS,
                            Category::ResourceLifetime,
                            format!("geometry buffers {} were released before replay", id.0),
                        );
                    }
                }
            }
            GlCmd::UnbindVertexArray => gl.bind_vertex_array(0),

            GlCmd::DrawArrays {
                mode,
                first,
                count,
                instances,
                base_instance,
            } => {
                if *base_instance == 0 {
                    gl.draw_arrays_instanced(*mode, *first as i32, *count, *instances);
                } else {
                    gl.draw_arrays_instanced_base_instance(
                        *mode,
                        *first as i32,
                        *count,
                        *instances,
                        *base_instance,
                    );
                }
            }
            GlCmd::DrawElements {
                mode,
                count,
                ty,
                offset,
                instances,
                base_vertex,
                base_instance,
            } => {
                if *base_instance == 0 {
                    gl.draw_elements_instanced_base_vertex(
                        *mode,
                        *count,
                        *ty,
                        *offset,
                        *instances,
                        *base_vertex,
                    );
                } else {
                    gl.draw_elements_instanced_base_vertex_base_instance(
                        *mode,
                        *count,
                        *ty,
                        *offset,
                        *instances,
                        *base_vertex,
                        *base_instance,
                    );
                }
            }
            GlCmd::DrawArraysIndirect {
                mode,
                offset,
                draw_count,
                stride,
            } => {
                if *draw_count <= 1 {
                    gl.draw_arrays_indirect(*mode, *offset);
                } else {
                    gl.multi_draw_arrays_indirect(*mode, *offset, *draw_count, *stride);
                }
            }
            GlCmd::DrawElementsIndirect {
                mode,
                ty,
                offset,
                draw_count,
                stride,
            } => {
                if *draw_count <= 1 {
                    gl.draw_elements_indirect(*mode, *ty, *offset);
                } else {
                    gl.multi_draw_elements_indirect(*mode, *ty, *offset, *draw_count, *stride);
                }
            }
            GlCmd::Dispatch([x, y, z]) => gl.dispatch_compute(*x, *y, *z),
            GlCmd::DispatchIndirect { offset } => gl.dispatch_compute_indirect(*offset),
            GlCmd::MemoryBarrier(bits) => gl.memory_barrier(*bits),

            GlCmd::BeginQuery { target, query } => gl.begin_query(*target, *query),
            GlCmd::EndQuery { target } => gl.end_query(*target),
            GlCmd::QueryCounter { query } => gl.query_counter(*query, gl::TIMESTAMP),
            GlCmd::CopyQueryResult {
                query,
                buffer,
                pname,
                offset,
                wide,
            } => gl.get_query_buffer_object(*query, *buffer, *pname, *offset, *wide),

            GlCmd::PushDebugGroup(message) => {
                gl.push_debug_group(gl::DEBUG_SOURCE_APPLICATION, 0, message)
            }
            GlCmd::PopDebugGroup => gl.pop_debug_group(),
            GlCmd::DebugMessage(message) => gl.debug_message_insert(
                gl::DEBUG_SOURCE_APPLICATION,
                gl::DEBUG_TYPE_MARKER,
                0,
                gl::DEBUG_SEVERITY_NOTIFICATION,
                message,
            ),
        }
    }

    fn upload_memory(&mut self, raw: u64, offset: u64, size: u64) {
        let Some(memory) = self.memory(raw) else {
            return;
        };
        let shadow = memory.shadow();
        let Some(bytes) = shadow_range(&shadow, offset, size) else {
            return;
        };
        self.backend.upload_buffer(self.gl, memory.gl_buffer(), offset, bytes);
    }

    fn download_memory(&mut self, raw: u64, offset: u64, size: u64) {
        let Some(memory) = self.memory(raw) else {
            return;
        };
        let mut shadow = memory.shadow();
        let Some(range) = shadow_bounds(shadow.len(), offset, size) else {
            return;
        };
        self.backend
            .download_buffer(self.gl, memory.gl_buffer(), offset, &mut shadow[range]);
    }

    fn memory(&self, raw: u64) -> Option<std::sync::Arc<DeviceMemory>> {
        let memory = self.memories.get_raw(raw);
        if memory.is_none() {
            self.reporter.warning(
                Some(ObjectId {
                    kind: vk::ObjectType::DEVICE_MEMORY,
                    raw,
                }),
                vk::Result::SUCCESS,
                Category::ResourceLifetime,
                "transfer skipped for memory freed before replay",
            );
        }
        memory
    }
}

fn shadow_bounds(len: usize, offset: u64, size: u64) -> Option<std::ops::Range<usize>> {
    let start = usize::try_from(offset).ok()?.min(len);
    let end = usize::try_from(offset.saturating_add(size)).unwrap_or(usize::MAX).min(len);
    (start < end).then_some(start..end)
}

fn shadow_range(shadow: &[u8], offset: u64, size: u64) -> Option<&[u8]> {
    shadow_bounds(shadow.len(), offset, size).map(|range| &shadow[range])
}

/// `glClearBuffer*` buffer for the attachment point a layer is bound to.
fn layer_buffer(dst: &TextureSubresource) -> u32 {
    match dst.attachment {
        gl::DEPTH_ATTACHMENT => gl::DEPTH,
        gl::STENCIL_ATTACHMENT => gl::STENCIL,
        gl::DEPTH_STENCIL_ATTACHMENT => gl::DEPTH_STENCIL,
        _ => gl::COLOR,
    }
}

fn clear_buffer(gl: &mut dyn GlApi, buffer: u32, draw_buffer: i32, value: &ClearValue) {
    match (*value, buffer) {
        (ClearValue::Color(ClearColor::Float(v)), _) => gl.clear_buffer_fv(buffer, draw_buffer, &v),
        (ClearValue::Color(ClearColor::Int(v)), _) => gl.clear_buffer_iv(buffer, draw_buffer, &v),
        (ClearValue::Color(ClearColor::Uint(v)), _) => gl.clear_buffer_uiv(buffer, draw_buffer, &v),
        (ClearValue::DepthStencil { depth, .. }, gl::DEPTH) => {
            gl.clear_buffer_fv(gl::DEPTH, 0, &[depth, 0.0, 0.0, 0.0])
        }
        (ClearValue::DepthStencil { stencil, .. }, gl::STENCIL) => {
            gl.clear_buffer_iv(gl::STENCIL, 0, &[stencil as i32, 0, 0, 0])
        }
        (ClearValue::DepthStencil { depth, stencil }, _) => {
            gl.clear_buffer_fi(gl::DEPTH_STENCIL, 0, depth, stencil as i32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CollectingReporter;
    use ash::vk::Handle;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use vkgl_gl::testing::{CallLog, RecordingGl};
    use vkgl_gl::BackendTier;

    struct Fixture {
        gl: RecordingGl,
        log: CallLog,
        backend: DeviceBackend,
        vaos: VaoTable,
        geometry: GeometryRegistry,
        memories: HandleTable<DeviceMemory>,
        reporter: CollectingReporter,
    }

    impl Fixture {
        fn new(tier: BackendTier) -> Self {
            let (gl, log) = RecordingGl::new();
            Self {
                gl,
                log,
                backend: DeviceBackend::new(tier),
                vaos: VaoTable::new(),
                geometry: GeometryRegistry::new(),
                memories: HandleTable::default(),
                reporter: CollectingReporter::new(),
            }
        }

        fn run(&mut self, cmds: &[GlCmd], check_errors: bool) -> usize {
            Replayer {
                gl: &mut self.gl,
                backend: &mut self.backend,
                vaos: &mut self.vaos,
                geometry: &self.geometry,
                memories: &self.memories,
                reporter: &self.reporter,
                log_calls: true,
                check_errors,
            }
            .run(cmds)
        }
    }

    #[test]
    fn replays_in_encoding_order() {
        let mut f = Fixture::new(BackendTier::Modern);
        f.run(
            &[
                GlCmd::Enable(gl::DEPTH_TEST),
                GlCmd::DepthFunc(gl::LESS),
                GlCmd::Viewport {
                    rect: [0, 0, 800, 600],
                    depth: [0.0, 1.0],
                },
                GlCmd::Disable(gl::BLEND),
            ],
            false,
        );
        assert_eq!(
            f.log.names(),
            vec!["enable", "depth_func", "viewport", "depth_range", "disable"]
        );
    }

    #[test]
    fn gl_errors_are_reported_and_replay_continues() {
        let mut f = Fixture::new(BackendTier::Modern);
        f.log.push_error(gl::INVALID_OPERATION);
        let errors = f.run(&[GlCmd::UseProgram(3), GlCmd::UseProgram(0)], true);

        assert_eq!(errors, 1);
        assert_eq!(f.reporter.count(Category::Backend), 1);
        assert!(f.log.contains("use_program(0)"));
    }

    #[test]
    fn single_indirect_draw_avoids_multi_draw() {
        let mut f = Fixture::new(BackendTier::Modern);
        f.run(
            &[
                GlCmd::DrawArraysIndirect {
                    mode: gl::TRIANGLES,
                    offset: 16,
                    draw_count: 1,
                    stride: 16,
                },
                GlCmd::DrawElementsIndirect {
                    mode: gl::TRIANGLES,
                    ty: gl::UNSIGNED_SHORT,
                    offset: 0,
                    draw_count: 4,
                    stride: 20,
                },
            ],
            false,
        );
        assert_eq!(f.log.names(), vec!["draw_arrays_indirect", "multi_draw_elements_indirect"]);
    }

    #[test]
    fn depth_stencil_clear_uses_combined_entry_point() {
        let mut f = Fixture::new(BackendTier::Modern);
        f.run(
            &[GlCmd::ClearAttachment {
                buffer: gl::DEPTH_STENCIL,
                draw_buffer: 0,
                value: ClearValue::DepthStencil {
                    depth: 1.0,
                    stencil: 3,
                },
            }],
            false,
        );
        assert!(f.log.contains(&format!("clear_buffer_fi({}, 0, 1.0, 3)", gl::DEPTH_STENCIL)));
    }

    #[test]
    fn memory_transfers_move_the_host_shadow() {
        let mut f = Fixture::new(BackendTier::Legacy);
        let memory = Arc::new(DeviceMemory::new(vk::DeviceMemory::from_raw(9), 4, 16, true));
        f.memories.insert(memory.clone());
        memory.write(4, &[1, 2, 3, 4]);

        f.run(&[GlCmd::UploadMemory { memory: 9, offset: 4, size: 4 }], false);
        assert_eq!(f.log.buffer_contents(4), Some(vec![0, 0, 0, 0, 1, 2, 3, 4]));

        memory.write(4, &[0; 4]);
        f.run(&[GlCmd::DownloadMemory { memory: 9, offset: 4, size: 4 }], false);
        assert_eq!(memory.read(4, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn transfers_for_freed_memory_are_skipped() {
        let mut f = Fixture::new(BackendTier::Modern);
        f.run(&[GlCmd::UploadMemory { memory: 42, offset: 0, size: 4 }], false);
        assert_eq!(f.reporter.count(Category::ResourceLifetime), 1);
        assert_eq!(f.log.count("named_buffer_sub_data"), 0);
    }

    #[test]
    fn geometry_vertex_array_is_created_on_first_bind() {
        let mut f = Fixture::new(BackendTier::Modern);
        let id = f.geometry.register(vkgl_gl::VertexArrayLayout {
            element_buffer: 2,
            ..Default::default()
        });
        f.run(&[GlCmd::BindGeometry(id), GlCmd::UnbindVertexArray, GlCmd::BindGeometry(id)], false);
        assert_eq!(f.log.count("gen_vertex_array"), 1);
        assert_eq!(f.vaos.len(), 1);
    }

    #[test]
    fn fill_without_clear_support_uploads_the_pattern() {
        let mut f = Fixture::new(BackendTier::Modern);
        f.run(
            &[GlCmd::FillBuffer {
                buffer: 5,
                offset: 0,
                size: 8,
                data: 0x0403_0201,
                use_clear: false,
            }],
            false,
        );
        assert_eq!(f.log.buffer_contents(5), Some(vec![1, 2, 3, 4, 1, 2, 3, 4]));
    }
}
