//! Contract with the shader translator.
//!
//! SPIR-V to GLSL translation and linking live outside this crate. The core
//! hands a [`ShaderCompiler`] the stages of a pipeline together with its
//! layout and gets back a linked program plus the tables it needs to bind
//! descriptors and push constants.

use ash::vk;
use thiserror::Error;
use vkgl_gl::{GlApi, UniformValue};

use crate::objects::PipelineLayout;

#[derive(Debug, Clone)]
pub struct ShaderStage {
    pub stage: vk::ShaderStageFlags,
    pub code: Vec<u32>,
    pub entry_point: String,
}

/// Shape of a uniform a push-constant block member is lowered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float(u32),
    Int(u32),
    Uint(u32),
    Matrix { columns: u32, rows: u32 },
}

impl UniformKind {
    /// Bytes one element occupies in the push-constant block (std430).
    pub fn stride(&self) -> u32 {
        match *self {
            UniformKind::Float(n) | UniformKind::Int(n) | UniformKind::Uint(n) => 4 * n,
            UniformKind::Matrix { columns, rows } => columns * column_stride(rows),
        }
    }
}

fn column_stride(rows: u32) -> u32 {
    if rows == 3 {
        16
    } else {
        4 * rows
    }
}

/// One push-constant member and the uniform location it was lowered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PushConstantUniform {
    pub offset: u32,
    pub location: i32,
    pub kind: UniformKind,
    pub array_len: u32,
}

impl PushConstantUniform {
    pub fn size(&self) -> u32 {
        self.kind.stride() * self.array_len.max(1)
    }

    pub fn overlaps(&self, offset: u32, size: u32) -> bool {
        self.offset < offset + size && offset < self.offset + self.size()
    }

    /// Decodes this member out of the push-constant bytes. `None` if `data`
    /// does not cover it.
    pub fn decode(&self, data: &[u8]) -> Option<UniformValue> {
        let start = self.offset as usize;
        let bytes = data.get(start..start + self.size() as usize)?;
        let count = self.array_len.max(1) as usize;
        let value = match self.kind {
            UniformKind::Float(components) => UniformValue::F32 {
                components,
                values: words(bytes),
            },
            UniformKind::Int(components) => UniformValue::I32 {
                components,
                values: words(bytes),
            },
            UniformKind::Uint(components) => UniformValue::U32 {
                components,
                values: words(bytes),
            },
            UniformKind::Matrix { columns, rows } => {
                let stride = column_stride(rows) as usize;
                let mut values = Vec::with_capacity(count * (columns * rows) as usize);
                for column in bytes.chunks_exact(stride) {
                    values.extend(words::<f32>(&column[..4 * rows as usize]));
                }
                UniformValue::Matrix { columns, rows, values }
            }
        };
        Some(value)
    }
}

fn words<T: bytemuck::Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

/// Where a descriptor lands in GL: the texture unit, image unit or indexed
/// buffer binding assigned by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceBinding {
    pub set: u32,
    pub binding: u32,
    pub array_element: u32,
    pub unit: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledProgram {
    /// Linked program; `0` when compilation or linking failed.
    pub program: u32,
    pub bindings: Vec<ResourceBinding>,
    pub push_constants: Vec<PushConstantUniform>,
}

impl CompiledProgram {
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.program != 0
    }
}

pub struct CompileRequest<'a> {
    pub stages: &'a [ShaderStage],
    pub layout: &'a PipelineLayout,
    pub flags: vk::PipelineCreateFlags,
    /// Negate clip-space Y, for programs drawing to the window-system target.
    pub flip_y: bool,
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("failed to compile {stage:?} stage:\n{log}")]
    Compile { stage: vk::ShaderStageFlags, log: String },
    #[error("failed to link program:\n{log}")]
    Link { log: String },
}

pub trait ShaderCompiler: Send + Sync {
    /// Compiles and links every stage of `request` with the context current.
    fn compile(
        &self,
        gl: &mut dyn GlApi,
        request: &CompileRequest<'_>,
    ) -> Result<CompiledProgram, ShaderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_vec4_and_mat3() {
        let mut data = Vec::new();
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        // mat3 columns are padded to 16 bytes.
        for column in 0..3 {
            for row in 0..4 {
                data.extend_from_slice(&((column * 10 + row) as f32).to_le_bytes());
            }
        }

        let vec4 = PushConstantUniform {
            offset: 0,
            location: 0,
            kind: UniformKind::Float(4),
            array_len: 1,
        };
        assert_eq!(
            vec4.decode(&data),
            Some(UniformValue::F32 {
                components: 4,
                values: vec![1.0, 2.0, 3.0, 4.0]
            })
        );

        let mat3 = PushConstantUniform {
            offset: 16,
            location: 1,
            kind: UniformKind::Matrix { columns: 3, rows: 3 },
            array_len: 1,
        };
        assert_eq!(mat3.size(), 48);
        assert_eq!(
            mat3.decode(&data),
            Some(UniformValue::Matrix {
                columns: 3,
                rows: 3,
                values: vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0]
            })
        );
    }

    #[test]
    fn short_data_decodes_nothing() {
        let u = PushConstantUniform {
            offset: 8,
            location: 0,
            kind: UniformKind::Uint(2),
            array_len: 1,
        };
        assert_eq!(u.decode(&[0; 12]), None);
        assert!(u.overlaps(12, 4));
        assert!(!u.overlaps(16, 4));
    }
}
