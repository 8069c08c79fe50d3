use bitflags::bitflags;

bitflags! {
    /// Optional GL functionality the core picks code paths on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GlFeatures: u32 {
        /// `glViewportArrayv`, `glScissorArrayv`, `glDepthRangeArrayv` (GL 4.1).
        const VIEWPORT_ARRAY = 1 << 0;
        /// `glMemoryBarrier` (GL 4.2).
        const MEMORY_BARRIER = 1 << 1;
        /// Program pipelines and `glProgramUniform*` (GL 4.1).
        const SEPARATE_SHADER_OBJECTS = 1 << 2;
        /// `*BaseInstance` draw entry points (GL 4.2).
        const BASE_INSTANCE = 1 << 3;
        /// `glDraw*Indirect` (GL 4.0).
        const DRAW_INDIRECT = 1 << 4;
        /// `glMultiDraw*Indirect` (GL 4.3).
        const MULTI_DRAW_INDIRECT = 1 << 5;
        /// Compute shaders (GL 4.3).
        const COMPUTE = 1 << 6;
        /// Tessellation stages (GL 4.0).
        const TESSELLATION = 1 << 7;
        /// `glCopyImageSubData` (GL 4.3).
        const COPY_IMAGE = 1 << 8;
        /// `glClearTexSubImage` (GL 4.4).
        const CLEAR_TEXTURE = 1 << 9;
        /// `glClearBufferSubData` (GL 4.3).
        const CLEAR_BUFFER_DATA = 1 << 10;
        /// Direct state access (GL 4.5).
        const DIRECT_STATE_ACCESS = 1 << 11;
        /// Separate vertex attribute format / buffer binding (GL 4.3).
        const VERTEX_ATTRIB_BINDING = 1 << 12;
        /// `glGetTextureSubImage` (GL 4.5).
        const GET_TEXTURE_SUB_IMAGE = 1 << 13;
        /// Query results written to buffer objects (GL 4.4).
        const QUERY_BUFFER_OBJECT = 1 << 14;
        /// `glInvalidateFramebuffer` (GL 4.3).
        const INVALIDATE_SUBDATA = 1 << 15;
        /// Debug groups and message insertion (GL 4.3).
        const DEBUG_OUTPUT = 1 << 16;
        /// `glPolygonOffsetClamp` (GL 4.6).
        const POLYGON_OFFSET_CLAMP = 1 << 17;
        /// Per-sample shading (GL 4.0).
        const SAMPLE_SHADING = 1 << 18;
        /// Indexed blend state (GL 4.0).
        const DRAW_BUFFERS_BLEND = 1 << 19;
        /// `GL_DEPTH_CLAMP` (GL 3.2).
        const DEPTH_CLAMP = 1 << 20;
        /// `GL_FRAMEBUFFER_SRGB` (GL 3.0).
        const FRAMEBUFFER_SRGB = 1 << 21;
    }
}

/// Which backend implementation a device uses for paths that differ between
/// older and newer GL versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendTier {
    /// Bind-to-edit buffers, `glVertexAttribPointer`, readback through a framebuffer.
    Legacy,
    /// Direct state access and separate vertex formats/bindings.
    Modern,
}

/// Result of probing the current context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlCapabilities {
    pub major: u32,
    pub minor: u32,
    pub features: GlFeatures,
    pub max_viewports: u32,
    pub max_color_attachments: u32,
    pub max_vertex_attribs: u32,
}

impl GlCapabilities {
    /// Capabilities guaranteed by a core profile of the given version.
    pub fn for_core_version(major: u32, minor: u32) -> Self {
        let at_least = |m: u32, n: u32| (major, minor) >= (m, n);

        let mut features = GlFeatures::FRAMEBUFFER_SRGB;
        if at_least(3, 2) {
            features |= GlFeatures::DEPTH_CLAMP;
        }
        if at_least(4, 0) {
            features |= GlFeatures::DRAW_INDIRECT
                | GlFeatures::TESSELLATION
                | GlFeatures::SAMPLE_SHADING
                | GlFeatures::DRAW_BUFFERS_BLEND;
        }
        if at_least(4, 1) {
            features |= GlFeatures::VIEWPORT_ARRAY | GlFeatures::SEPARATE_SHADER_OBJECTS;
        }
        if at_least(4, 2) {
            features |= GlFeatures::MEMORY_BARRIER | GlFeatures::BASE_INSTANCE;
        }
        if at_least(4, 3) {
            features |= GlFeatures::COMPUTE
                | GlFeatures::MULTI_DRAW_INDIRECT
                | GlFeatures::COPY_IMAGE
                | GlFeatures::CLEAR_BUFFER_DATA
                | GlFeatures::VERTEX_ATTRIB_BINDING
                | GlFeatures::INVALIDATE_SUBDATA
                | GlFeatures::DEBUG_OUTPUT;
        }
        if at_least(4, 4) {
            features |= GlFeatures::CLEAR_TEXTURE | GlFeatures::QUERY_BUFFER_OBJECT;
        }
        if at_least(4, 5) {
            features |= GlFeatures::DIRECT_STATE_ACCESS | GlFeatures::GET_TEXTURE_SUB_IMAGE;
        }
        if at_least(4, 6) {
            features |= GlFeatures::POLYGON_OFFSET_CLAMP;
        }

        Self {
            major,
            minor,
            features,
            max_viewports: if at_least(4, 1) { 16 } else { 1 },
            max_color_attachments: 8,
            max_vertex_attribs: 16,
        }
    }

    pub fn has(&self, features: GlFeatures) -> bool {
        self.features.contains(features)
    }

    /// Modern requires both DSA buffer updates and separate vertex bindings;
    /// anything less runs on the legacy paths.
    pub fn tier(&self) -> BackendTier {
        if self.has(GlFeatures::DIRECT_STATE_ACCESS | GlFeatures::VERTEX_ATTRIB_BINDING) {
            BackendTier::Modern
        } else {
            BackendTier::Legacy
        }
    }
}

impl Default for GlCapabilities {
    fn default() -> Self {
        Self::for_core_version(3, 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gl33_is_legacy_without_viewport_arrays() {
        let caps = GlCapabilities::for_core_version(3, 3);
        assert_eq!(caps.tier(), BackendTier::Legacy);
        assert!(!caps.has(GlFeatures::VIEWPORT_ARRAY));
        assert!(!caps.has(GlFeatures::MEMORY_BARRIER));
        assert!(caps.has(GlFeatures::DEPTH_CLAMP));
        assert_eq!(caps.max_viewports, 1);
    }

    #[test]
    fn gl45_is_modern() {
        let caps = GlCapabilities::for_core_version(4, 5);
        assert_eq!(caps.tier(), BackendTier::Modern);
        assert!(caps.has(GlFeatures::COPY_IMAGE | GlFeatures::CLEAR_TEXTURE));
        assert!(!caps.has(GlFeatures::POLYGON_OFFSET_CLAMP));
    }

    #[test]
    fn gl43_without_dsa_stays_legacy() {
        let caps = GlCapabilities::for_core_version(4, 3);
        assert!(caps.has(GlFeatures::VERTEX_ATTRIB_BINDING));
        assert_eq!(caps.tier(), BackendTier::Legacy);
    }
}
