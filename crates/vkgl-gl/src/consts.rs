//! GL enum values used by the driver core.
//!
//! Values match the Khronos `gl.xml` registry.

#![allow(missing_docs)]

pub const NONE: u32 = 0;
pub const ZERO: u32 = 0;
pub const ONE: u32 = 1;

// Errors.
pub const NO_ERROR: u32 = 0;
pub const INVALID_ENUM: u32 = 0x0500;
pub const INVALID_VALUE: u32 = 0x0501;
pub const INVALID_OPERATION: u32 = 0x0502;
pub const OUT_OF_MEMORY: u32 = 0x0505;
pub const INVALID_FRAMEBUFFER_OPERATION: u32 = 0x0506;

// Capabilities.
pub const BLEND: u32 = 0x0BE2;
pub const CULL_FACE: u32 = 0x0B44;
pub const DEPTH_TEST: u32 = 0x0B71;
pub const STENCIL_TEST: u32 = 0x0B90;
pub const SCISSOR_TEST: u32 = 0x0C11;
pub const POLYGON_OFFSET_POINT: u32 = 0x2A01;
pub const POLYGON_OFFSET_LINE: u32 = 0x2A02;
pub const POLYGON_OFFSET_FILL: u32 = 0x8037;
pub const MULTISAMPLE: u32 = 0x809D;
pub const SAMPLE_ALPHA_TO_COVERAGE: u32 = 0x809E;
pub const SAMPLE_ALPHA_TO_ONE: u32 = 0x809F;
pub const SAMPLE_SHADING: u32 = 0x8C36;
pub const SAMPLE_MASK: u32 = 0x8E51;
pub const DEPTH_CLAMP: u32 = 0x864F;
pub const RASTERIZER_DISCARD: u32 = 0x8C89;
pub const PRIMITIVE_RESTART: u32 = 0x8F9D;
pub const FRAMEBUFFER_SRGB: u32 = 0x8DB9;
pub const COLOR_LOGIC_OP: u32 = 0x0BF2;
pub const PROGRAM_POINT_SIZE: u32 = 0x8642;
pub const DEBUG_OUTPUT: u32 = 0x92E0;

// Blend factors.
pub const SRC_COLOR: u32 = 0x0300;
pub const ONE_MINUS_SRC_COLOR: u32 = 0x0301;
pub const SRC_ALPHA: u32 = 0x0302;
pub const ONE_MINUS_SRC_ALPHA: u32 = 0x0303;
pub const DST_ALPHA: u32 = 0x0304;
pub const ONE_MINUS_DST_ALPHA: u32 = 0x0305;
pub const DST_COLOR: u32 = 0x0306;
pub const ONE_MINUS_DST_COLOR: u32 = 0x0307;
pub const SRC_ALPHA_SATURATE: u32 = 0x0308;
pub const CONSTANT_COLOR: u32 = 0x8001;
pub const ONE_MINUS_CONSTANT_COLOR: u32 = 0x8002;
pub const CONSTANT_ALPHA: u32 = 0x8003;
pub const ONE_MINUS_CONSTANT_ALPHA: u32 = 0x8004;
pub const SRC1_ALPHA: u32 = 0x8589;
pub const SRC1_COLOR: u32 = 0x88F9;
pub const ONE_MINUS_SRC1_COLOR: u32 = 0x88FA;
pub const ONE_MINUS_SRC1_ALPHA: u32 = 0x88FB;

// Blend equations.
pub const FUNC_ADD: u32 = 0x8006;
pub const MIN: u32 = 0x8007;
pub const MAX: u32 = 0x8008;
pub const FUNC_SUBTRACT: u32 = 0x800A;
pub const FUNC_REVERSE_SUBTRACT: u32 = 0x800B;

// Comparison functions.
pub const NEVER: u32 = 0x0200;
pub const LESS: u32 = 0x0201;
pub const EQUAL: u32 = 0x0202;
pub const LEQUAL: u32 = 0x0203;
pub const GREATER: u32 = 0x0204;
pub const NOTEQUAL: u32 = 0x0205;
pub const GEQUAL: u32 = 0x0206;
pub const ALWAYS: u32 = 0x0207;

// Stencil operations.
pub const KEEP: u32 = 0x1E00;
pub const REPLACE: u32 = 0x1E01;
pub const INCR: u32 = 0x1E02;
pub const DECR: u32 = 0x1E03;
pub const INVERT: u32 = 0x150A;
pub const INCR_WRAP: u32 = 0x8507;
pub const DECR_WRAP: u32 = 0x8508;

// Faces and winding.
pub const FRONT: u32 = 0x0404;
pub const BACK: u32 = 0x0405;
pub const FRONT_AND_BACK: u32 = 0x0408;
pub const CW: u32 = 0x0900;
pub const CCW: u32 = 0x0901;

// Polygon modes.
pub const POINT: u32 = 0x1B00;
pub const LINE: u32 = 0x1B01;
pub const FILL: u32 = 0x1B02;

// Logic ops.
pub const CLEAR: u32 = 0x1500;
pub const AND: u32 = 0x1501;
pub const AND_REVERSE: u32 = 0x1502;
pub const COPY: u32 = 0x1503;
pub const AND_INVERTED: u32 = 0x1504;
pub const NOOP: u32 = 0x1505;
pub const XOR: u32 = 0x1506;
pub const OR: u32 = 0x1507;
pub const NOR: u32 = 0x1508;
pub const EQUIV: u32 = 0x1509;
pub const OR_REVERSE: u32 = 0x150B;
pub const COPY_INVERTED: u32 = 0x150C;
pub const OR_INVERTED: u32 = 0x150D;
pub const NAND: u32 = 0x150E;
pub const SET: u32 = 0x150F;

// Primitive modes.
pub const POINTS: u32 = 0x0000;
pub const LINES: u32 = 0x0001;
pub const LINE_STRIP: u32 = 0x0003;
pub const TRIANGLES: u32 = 0x0004;
pub const TRIANGLE_STRIP: u32 = 0x0005;
pub const TRIANGLE_FAN: u32 = 0x0006;
pub const LINES_ADJACENCY: u32 = 0x000A;
pub const LINE_STRIP_ADJACENCY: u32 = 0x000B;
pub const TRIANGLES_ADJACENCY: u32 = 0x000C;
pub const TRIANGLE_STRIP_ADJACENCY: u32 = 0x000D;
pub const PATCHES: u32 = 0x000E;
pub const PATCH_VERTICES: u32 = 0x8E72;

// Data types.
pub const BYTE: u32 = 0x1400;
pub const UNSIGNED_BYTE: u32 = 0x1401;
pub const SHORT: u32 = 0x1402;
pub const UNSIGNED_SHORT: u32 = 0x1403;
pub const INT: u32 = 0x1404;
pub const UNSIGNED_INT: u32 = 0x1405;
pub const FLOAT: u32 = 0x1406;
pub const HALF_FLOAT: u32 = 0x140B;
pub const UNSIGNED_SHORT_5_6_5: u32 = 0x8363;
pub const UNSIGNED_INT_2_10_10_10_REV: u32 = 0x8368;
pub const UNSIGNED_INT_24_8: u32 = 0x84FA;
pub const UNSIGNED_INT_10F_11F_11F_REV: u32 = 0x8C3B;
pub const FLOAT_32_UNSIGNED_INT_24_8_REV: u32 = 0x8DAD;
pub const INT_2_10_10_10_REV: u32 = 0x8D9F;

// Buffer targets and usage.
pub const ARRAY_BUFFER: u32 = 0x8892;
pub const ELEMENT_ARRAY_BUFFER: u32 = 0x8893;
pub const PIXEL_PACK_BUFFER: u32 = 0x88EB;
pub const PIXEL_UNPACK_BUFFER: u32 = 0x88EC;
pub const UNIFORM_BUFFER: u32 = 0x8A11;
pub const TEXTURE_BUFFER: u32 = 0x8C2A;
pub const COPY_READ_BUFFER: u32 = 0x8F36;
pub const COPY_WRITE_BUFFER: u32 = 0x8F37;
pub const DRAW_INDIRECT_BUFFER: u32 = 0x8F3F;
pub const SHADER_STORAGE_BUFFER: u32 = 0x90D2;
pub const DISPATCH_INDIRECT_BUFFER: u32 = 0x90EE;
pub const QUERY_BUFFER: u32 = 0x9192;
pub const STATIC_DRAW: u32 = 0x88E4;
pub const DYNAMIC_DRAW: u32 = 0x88E8;

// Texture targets.
pub const TEXTURE_1D: u32 = 0x0DE0;
pub const TEXTURE_2D: u32 = 0x0DE1;
pub const TEXTURE_3D: u32 = 0x806F;
pub const TEXTURE_CUBE_MAP: u32 = 0x8513;
pub const TEXTURE_CUBE_MAP_POSITIVE_X: u32 = 0x8515;
pub const TEXTURE_1D_ARRAY: u32 = 0x8C18;
pub const TEXTURE_2D_ARRAY: u32 = 0x8C1A;
pub const TEXTURE_CUBE_MAP_ARRAY: u32 = 0x9009;
pub const TEXTURE_2D_MULTISAMPLE: u32 = 0x9100;
pub const TEXTURE_2D_MULTISAMPLE_ARRAY: u32 = 0x9102;
pub const TEXTURE0: u32 = 0x84C0;

// Framebuffers.
pub const FRAMEBUFFER: u32 = 0x8D40;
pub const READ_FRAMEBUFFER: u32 = 0x8CA8;
pub const DRAW_FRAMEBUFFER: u32 = 0x8CA9;
pub const COLOR_ATTACHMENT0: u32 = 0x8CE0;
pub const DEPTH_ATTACHMENT: u32 = 0x8D00;
pub const STENCIL_ATTACHMENT: u32 = 0x8D20;
pub const DEPTH_STENCIL_ATTACHMENT: u32 = 0x821A;
pub const COLOR: u32 = 0x1800;
pub const DEPTH: u32 = 0x1801;
pub const STENCIL: u32 = 0x1802;
pub const DEPTH_STENCIL: u32 = 0x84F9;
pub const COLOR_BUFFER_BIT: u32 = 0x0000_4000;
pub const DEPTH_BUFFER_BIT: u32 = 0x0000_0100;
pub const STENCIL_BUFFER_BIT: u32 = 0x0000_0400;
pub const NEAREST: u32 = 0x2600;
pub const LINEAR: u32 = 0x2601;
pub const NEAREST_MIPMAP_NEAREST: u32 = 0x2700;
pub const LINEAR_MIPMAP_NEAREST: u32 = 0x2701;
pub const NEAREST_MIPMAP_LINEAR: u32 = 0x2702;
pub const LINEAR_MIPMAP_LINEAR: u32 = 0x2703;

// Sampler parameters.
pub const TEXTURE_MAG_FILTER: u32 = 0x2800;
pub const TEXTURE_MIN_FILTER: u32 = 0x2801;
pub const TEXTURE_WRAP_S: u32 = 0x2802;
pub const TEXTURE_WRAP_T: u32 = 0x2803;
pub const TEXTURE_WRAP_R: u32 = 0x8072;
pub const TEXTURE_COMPARE_MODE: u32 = 0x884C;
pub const TEXTURE_COMPARE_FUNC: u32 = 0x884D;
pub const COMPARE_REF_TO_TEXTURE: u32 = 0x884E;
pub const REPEAT: u32 = 0x2901;
pub const CLAMP_TO_EDGE: u32 = 0x812F;
pub const CLAMP_TO_BORDER: u32 = 0x812D;
pub const MIRRORED_REPEAT: u32 = 0x8370;

// Pixel storage.
pub const UNPACK_ROW_LENGTH: u32 = 0x0CF2;
pub const UNPACK_ALIGNMENT: u32 = 0x0CF5;
pub const UNPACK_IMAGE_HEIGHT: u32 = 0x806E;
pub const PACK_ROW_LENGTH: u32 = 0x0D02;
pub const PACK_ALIGNMENT: u32 = 0x0D05;
pub const PACK_IMAGE_HEIGHT: u32 = 0x806C;

// Pixel formats.
pub const STENCIL_INDEX: u32 = 0x1901;
pub const DEPTH_COMPONENT: u32 = 0x1902;
pub const RED: u32 = 0x1903;
pub const RGB: u32 = 0x1907;
pub const RGBA: u32 = 0x1908;
pub const BGRA: u32 = 0x80E1;
pub const RG: u32 = 0x8227;
pub const RG_INTEGER: u32 = 0x8228;
pub const RED_INTEGER: u32 = 0x8D94;
pub const RGBA_INTEGER: u32 = 0x8D99;

// Internal formats.
pub const RGBA8: u32 = 0x8058;
pub const RGB10_A2: u32 = 0x8059;
pub const R8: u32 = 0x8229;
pub const RG8: u32 = 0x822B;
pub const R16F: u32 = 0x822D;
pub const R32F: u32 = 0x822E;
pub const RG16F: u32 = 0x822F;
pub const RG32F: u32 = 0x8230;
pub const R16UI: u32 = 0x8234;
pub const R32I: u32 = 0x8235;
pub const R32UI: u32 = 0x8236;
pub const RGBA32F: u32 = 0x8814;
pub const RGB32F: u32 = 0x8815;
pub const RGBA8_SNORM: u32 = 0x8F97;
pub const RGBA16F: u32 = 0x881A;
pub const SRGB8_ALPHA8: u32 = 0x8C43;
pub const R11F_G11F_B10F: u32 = 0x8C3A;
pub const RGBA32UI: u32 = 0x8D70;
pub const RGBA8UI: u32 = 0x8D7C;
pub const RGB565: u32 = 0x8D62;
pub const DEPTH_COMPONENT16: u32 = 0x81A5;
pub const DEPTH_COMPONENT24: u32 = 0x81A6;
pub const DEPTH_COMPONENT32F: u32 = 0x8CAC;
pub const DEPTH24_STENCIL8: u32 = 0x88F0;
pub const DEPTH32F_STENCIL8: u32 = 0x8CAD;
pub const STENCIL_INDEX8: u32 = 0x8D48;
pub const COMPRESSED_RGBA_S3TC_DXT1_EXT: u32 = 0x83F1;
pub const COMPRESSED_RGBA_S3TC_DXT5_EXT: u32 = 0x83F3;
pub const COMPRESSED_SRGB_ALPHA_S3TC_DXT1_EXT: u32 = 0x8C4D;
pub const COMPRESSED_RGBA_BPTC_UNORM: u32 = 0x8E8C;

// Image unit access.
pub const READ_ONLY: u32 = 0x88B8;
pub const WRITE_ONLY: u32 = 0x88B9;
pub const READ_WRITE: u32 = 0x88BA;

// glMemoryBarrier bits.
pub const VERTEX_ATTRIB_ARRAY_BARRIER_BIT: u32 = 0x0000_0001;
pub const ELEMENT_ARRAY_BARRIER_BIT: u32 = 0x0000_0002;
pub const UNIFORM_BARRIER_BIT: u32 = 0x0000_0004;
pub const TEXTURE_FETCH_BARRIER_BIT: u32 = 0x0000_0008;
pub const SHADER_IMAGE_ACCESS_BARRIER_BIT: u32 = 0x0000_0020;
pub const COMMAND_BARRIER_BIT: u32 = 0x0000_0040;
pub const PIXEL_BUFFER_BARRIER_BIT: u32 = 0x0000_0080;
pub const TEXTURE_UPDATE_BARRIER_BIT: u32 = 0x0000_0100;
pub const BUFFER_UPDATE_BARRIER_BIT: u32 = 0x0000_0200;
pub const FRAMEBUFFER_BARRIER_BIT: u32 = 0x0000_0400;
pub const SHADER_STORAGE_BARRIER_BIT: u32 = 0x0000_2000;
pub const CLIENT_MAPPED_BUFFER_BARRIER_BIT: u32 = 0x0000_4000;
pub const QUERY_BUFFER_BARRIER_BIT: u32 = 0x0000_8000;
pub const ALL_BARRIER_BITS: u32 = 0xFFFF_FFFF;

// Queries.
pub const TIME_ELAPSED: u32 = 0x88BF;
pub const QUERY_RESULT: u32 = 0x8866;
pub const QUERY_RESULT_AVAILABLE: u32 = 0x8867;
pub const SAMPLES_PASSED: u32 = 0x8914;
pub const PRIMITIVES_GENERATED: u32 = 0x8C87;
pub const ANY_SAMPLES_PASSED: u32 = 0x8C2F;
pub const TIMESTAMP: u32 = 0x8E28;
pub const QUERY_RESULT_NO_WAIT: u32 = 0x9194;

// Sync objects.
pub const SYNC_FLUSH_COMMANDS_BIT: u32 = 0x0000_0001;
pub const SYNC_GPU_COMMANDS_COMPLETE: u32 = 0x9117;
pub const ALREADY_SIGNALED: u32 = 0x911A;
pub const TIMEOUT_EXPIRED: u32 = 0x911B;
pub const CONDITION_SATISFIED: u32 = 0x911C;
pub const WAIT_FAILED: u32 = 0x911D;

// Debug output.
pub const DEBUG_SOURCE_APPLICATION: u32 = 0x824A;
pub const DEBUG_TYPE_MARKER: u32 = 0x8268;
pub const DEBUG_SEVERITY_NOTIFICATION: u32 = 0x826B;

/// Human readable name for a `glGetError` code.
pub fn error_name(code: u32) -> &'static str {
    match code {
        NO_ERROR => "GL_NO_ERROR",
        INVALID_ENUM => "GL_INVALID_ENUM",
        INVALID_VALUE => "GL_INVALID_VALUE",
        INVALID_OPERATION => "GL_INVALID_OPERATION",
        OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        _ => "GL_UNKNOWN_ERROR",
    }
}
