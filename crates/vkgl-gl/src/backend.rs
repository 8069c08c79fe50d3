use crate::api::GlApi;
use crate::caps::BackendTier;
use crate::consts;
use crate::scratch::ScratchFramebuffers;

/// One mip level / array layer of a texture, plus the framebuffer attachment
/// point it is bound to when addressed through a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSubresource {
    pub texture: u32,
    pub target: u32,
    pub level: u32,
    pub layer: u32,
    pub attachment: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribLayout {
    pub location: u32,
    pub binding: u32,
    pub components: u32,
    pub ty: u32,
    pub normalized: bool,
    /// Integer attributes go through the `I` entry points and are never converted.
    pub integer: bool,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBindingLayout {
    pub binding: u32,
    pub buffer: u32,
    pub offset: u64,
    pub stride: u32,
    pub divisor: u32,
}

/// Everything needed to build one vertex array object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexArrayLayout {
    pub attributes: Vec<VertexAttribLayout>,
    pub bindings: Vec<VertexBindingLayout>,
    /// `0` when no element buffer is attached.
    pub element_buffer: u32,
}

impl VertexArrayLayout {
    fn binding(&self, binding: u32) -> Option<&VertexBindingLayout> {
        self.bindings.iter().find(|b| b.binding == binding)
    }
}

/// Typed uniform payload decoded from push-constant bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    F32 { components: u32, values: Vec<f32> },
    I32 { components: u32, values: Vec<i32> },
    U32 { components: u32, values: Vec<u32> },
    Matrix { columns: u32, rows: u32, values: Vec<f32> },
}

/// GL paths that differ between the legacy (bind-to-edit) and modern (DSA)
/// feature sets. Selected once per device from [`crate::GlCapabilities::tier`].
#[derive(Debug)]
pub enum DeviceBackend {
    Legacy(LegacyBackend),
    Modern(ModernBackend),
}

#[derive(Debug, Default)]
pub struct LegacyBackend {
    scratch: ScratchFramebuffers,
}

#[derive(Debug, Default)]
pub struct ModernBackend {
    scratch: ScratchFramebuffers,
}

impl DeviceBackend {
    pub fn new(tier: BackendTier) -> Self {
        match tier {
            BackendTier::Legacy => Self::Legacy(LegacyBackend::default()),
            BackendTier::Modern => Self::Modern(ModernBackend::default()),
        }
    }

    pub fn tier(&self) -> BackendTier {
        match self {
            Self::Legacy(_) => BackendTier::Legacy,
            Self::Modern(_) => BackendTier::Modern,
        }
    }

    pub fn scratch(&mut self) -> &mut ScratchFramebuffers {
        match self {
            Self::Legacy(b) => &mut b.scratch,
            Self::Modern(b) => &mut b.scratch,
        }
    }

    pub fn upload_buffer(&mut self, gl: &mut dyn GlApi, buffer: u32, offset: u64, data: &[u8]) {
        match self {
            Self::Legacy(_) => {
                gl.bind_buffer(consts::COPY_WRITE_BUFFER, buffer);
                gl.buffer_sub_data(consts::COPY_WRITE_BUFFER, offset, data);
                gl.bind_buffer(consts::COPY_WRITE_BUFFER, 0);
            }
            Self::Modern(_) => gl.named_buffer_sub_data(buffer, offset, data),
        }
    }

    pub fn download_buffer(
        &mut self,
        gl: &mut dyn GlApi,
        buffer: u32,
        offset: u64,
        out: &mut [u8],
    ) {
        match self {
            Self::Legacy(_) => {
                gl.bind_buffer(consts::COPY_READ_BUFFER, buffer);
                gl.get_buffer_sub_data(consts::COPY_READ_BUFFER, offset, out);
                gl.bind_buffer(consts::COPY_READ_BUFFER, 0);
            }
            Self::Modern(_) => gl.get_named_buffer_sub_data(buffer, offset, out),
        }
    }

    pub fn copy_buffer(
        &mut self,
        gl: &mut dyn GlApi,
        src: u32,
        dst: u32,
        src_offset: u64,
        dst_offset: u64,
        size: u64,
    ) {
        match self {
            Self::Legacy(_) => {
                gl.bind_buffer(consts::COPY_READ_BUFFER, src);
                gl.bind_buffer(consts::COPY_WRITE_BUFFER, dst);
                gl.copy_buffer_sub_data(
                    consts::COPY_READ_BUFFER,
                    consts::COPY_WRITE_BUFFER,
                    src_offset,
                    dst_offset,
                    size,
                );
                gl.bind_buffer(consts::COPY_READ_BUFFER, 0);
                gl.bind_buffer(consts::COPY_WRITE_BUFFER, 0);
            }
            Self::Modern(_) => {
                gl.copy_named_buffer_sub_data(src, dst, src_offset, dst_offset, size)
            }
        }
    }

    /// Creates and fully configures a vertex array object. Leaves no VAO bound.
    pub fn create_vertex_array(&mut self, gl: &mut dyn GlApi, layout: &VertexArrayLayout) -> u32 {
        let vao = gl.gen_vertex_array();
        gl.bind_vertex_array(vao);
        match self {
            Self::Legacy(_) => {
                for attr in &layout.attributes {
                    let Some(binding) = layout.binding(attr.binding) else {
                        continue;
                    };
                    gl.bind_buffer(consts::ARRAY_BUFFER, binding.buffer);
                    gl.enable_vertex_attrib_array(attr.location);
                    let offset = binding.offset + u64::from(attr.offset);
                    if attr.integer {
                        gl.vertex_attrib_i_pointer(
                            attr.location,
                            attr.components,
                            attr.ty,
                            binding.stride,
                            offset,
                        );
                    } else {
                        gl.vertex_attrib_pointer(
                            attr.location,
                            attr.components,
                            attr.ty,
                            attr.normalized,
                            binding.stride,
                            offset,
                        );
                    }
                    gl.vertex_attrib_divisor(attr.location, binding.divisor);
                }
                gl.bind_buffer(consts::ARRAY_BUFFER, 0);
            }
            Self::Modern(_) => {
                for attr in &layout.attributes {
                    gl.enable_vertex_attrib_array(attr.location);
                    if attr.integer {
                        gl.vertex_attrib_i_format(
                            attr.location,
                            attr.components,
                            attr.ty,
                            attr.offset,
                        );
                    } else {
                        gl.vertex_attrib_format(
                            attr.location,
                            attr.components,
                            attr.ty,
                            attr.normalized,
                            attr.offset,
                        );
                    }
                    gl.vertex_attrib_binding(attr.location, attr.binding);
                }
                for binding in &layout.bindings {
                    gl.bind_vertex_buffer(
                        binding.binding,
                        binding.buffer,
                        binding.offset,
                        binding.stride,
                    );
                    gl.vertex_binding_divisor(binding.binding, binding.divisor);
                }
            }
        }
        if layout.element_buffer != 0 {
            gl.bind_buffer(consts::ELEMENT_ARRAY_BUFFER, layout.element_buffer);
        }
        gl.bind_vertex_array(0);
        vao
    }

    /// Reads a region of `src` into the bound `PIXEL_PACK_BUFFER` at `offset`.
    ///
    /// The legacy path goes through the scratch read framebuffer, so callers
    /// must rebind their own read framebuffer afterwards.
    #[allow(clippy::too_many_arguments)]
    pub fn read_image(
        &mut self,
        gl: &mut dyn GlApi,
        src: &TextureSubresource,
        origin: [i32; 3],
        extent: [u32; 3],
        format: u32,
        ty: u32,
        buf_size: u32,
        offset: usize,
    ) {
        match self {
            Self::Modern(_) => gl.get_texture_sub_image(
                src.texture,
                src.level,
                origin,
                extent,
                format,
                ty,
                buf_size,
                offset,
            ),
            Self::Legacy(b) => {
                b.scratch.bind_read(gl, src);
                gl.read_pixels(origin[0], origin[1], extent[0], extent[1], format, ty, offset);
            }
        }
    }

    /// Writes a uniform of `program`. The legacy path requires `program` to be current.
    pub fn uniform(
        &mut self,
        gl: &mut dyn GlApi,
        program: u32,
        location: i32,
        value: &UniformValue,
    ) {
        match (self, value) {
            (Self::Modern(_), UniformValue::F32 { components, values }) => {
                gl.program_uniform_f32(program, location, *components, values)
            }
            (Self::Modern(_), UniformValue::I32 { components, values }) => {
                gl.program_uniform_i32(program, location, *components, values)
            }
            (Self::Modern(_), UniformValue::U32 { components, values }) => {
                gl.program_uniform_u32(program, location, *components, values)
            }
            (Self::Modern(_), UniformValue::Matrix { columns, rows, values }) => {
                gl.program_uniform_matrix_f32(program, location, *columns, *rows, values)
            }
            (Self::Legacy(_), UniformValue::F32 { components, values }) => {
                gl.uniform_f32(location, *components, values)
            }
            (Self::Legacy(_), UniformValue::I32 { components, values }) => {
                gl.uniform_i32(location, *components, values)
            }
            (Self::Legacy(_), UniformValue::U32 { components, values }) => {
                gl.uniform_u32(location, *components, values)
            }
            (Self::Legacy(_), UniformValue::Matrix { columns, rows, values }) => {
                gl.uniform_matrix_f32(location, *columns, *rows, values)
            }
        }
    }

    /// Releases context-owned helper objects. The context must be current.
    pub fn release(&mut self, gl: &mut dyn GlApi) {
        self.scratch().release(gl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingGl;
    use pretty_assertions::assert_eq;

    fn layout() -> VertexArrayLayout {
        VertexArrayLayout {
            attributes: vec![VertexAttribLayout {
                location: 0,
                binding: 0,
                components: 3,
                ty: consts::FLOAT,
                normalized: false,
                integer: false,
                offset: 12,
            }],
            bindings: vec![VertexBindingLayout {
                binding: 0,
                buffer: 7,
                offset: 256,
                stride: 24,
                divisor: 0,
            }],
            element_buffer: 9,
        }
    }

    #[test]
    fn legacy_vertex_array_folds_binding_offset_into_pointer() {
        let (mut gl, log) = RecordingGl::new();
        let mut backend = DeviceBackend::new(BackendTier::Legacy);
        backend.create_vertex_array(&mut gl, &layout());

        assert!(log.contains("vertex_attrib_pointer(0, 3, 5126, false, 24, 268)"));
        assert_eq!(log.count("vertex_attrib_format"), 0);
        assert_eq!(log.last_name(), Some("bind_vertex_array"));
    }

    #[test]
    fn modern_vertex_array_uses_separate_bindings() {
        let (mut gl, log) = RecordingGl::new();
        let mut backend = DeviceBackend::new(BackendTier::Modern);
        backend.create_vertex_array(&mut gl, &layout());

        assert!(log.contains("vertex_attrib_format(0, 3, 5126, false, 12)"));
        assert!(log.contains("bind_vertex_buffer(0, 7, 256, 24)"));
        assert!(log.contains("bind_buffer(34963, 9)"));
        assert_eq!(log.count("vertex_attrib_pointer"), 0);
    }

    #[test]
    fn legacy_upload_binds_copy_write_target() {
        let (mut gl, log) = RecordingGl::new();
        let mut backend = DeviceBackend::new(BackendTier::Legacy);
        backend.upload_buffer(&mut gl, 4, 16, &[1, 2, 3, 4]);
        assert_eq!(
            log.names(),
            vec!["bind_buffer", "buffer_sub_data", "bind_buffer"]
        );
    }
}
