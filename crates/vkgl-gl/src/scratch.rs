use crate::api::GlApi;
use crate::backend::TextureSubresource;
use crate::consts;

/// Read/draw framebuffer pair used to address single image layers.
///
/// GL can only blit, read back or clear a texture through a framebuffer
/// attachment, so every image-to-image blit, multisample resolve and fallback
/// clear goes through these two objects. They are created on first use and
/// live as long as the context.
#[derive(Debug, Default)]
pub struct ScratchFramebuffers {
    read: u32,
    draw: u32,
}

impl ScratchFramebuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the read framebuffer with `src` attached.
    pub fn bind_read(&mut self, gl: &mut dyn GlApi, src: &TextureSubresource) {
        if self.read == 0 {
            self.read = gl.gen_framebuffer();
        }
        gl.bind_framebuffer(consts::READ_FRAMEBUFFER, self.read);
        attach(gl, consts::READ_FRAMEBUFFER, src);
        if src.attachment >= consts::COLOR_ATTACHMENT0 {
            gl.read_buffer(src.attachment);
        }
    }

    /// Binds the draw framebuffer with `dst` attached.
    pub fn bind_draw(&mut self, gl: &mut dyn GlApi, dst: &TextureSubresource) {
        if self.draw == 0 {
            self.draw = gl.gen_framebuffer();
        }
        gl.bind_framebuffer(consts::DRAW_FRAMEBUFFER, self.draw);
        attach(gl, consts::DRAW_FRAMEBUFFER, dst);
        if dst.attachment >= consts::COLOR_ATTACHMENT0 {
            gl.draw_buffers(&[dst.attachment]);
        }
    }

    /// Deletes both framebuffers. The context must be current.
    pub fn release(&mut self, gl: &mut dyn GlApi) {
        for fbo in [&mut self.read, &mut self.draw] {
            if *fbo != 0 {
                gl.delete_framebuffer(*fbo);
                *fbo = 0;
            }
        }
    }
}

fn attach(gl: &mut dyn GlApi, fb_target: u32, sub: &TextureSubresource) {
    match sub.target {
        consts::TEXTURE_2D | consts::TEXTURE_2D_MULTISAMPLE => {
            gl.framebuffer_texture_2d(fb_target, sub.attachment, sub.target, sub.texture, sub.level)
        }
        // Non-array cube maps are addressed per face.
        consts::TEXTURE_CUBE_MAP => gl.framebuffer_texture_2d(
            fb_target,
            sub.attachment,
            consts::TEXTURE_CUBE_MAP_POSITIVE_X + sub.layer,
            sub.texture,
            sub.level,
        ),
        _ => {
            let layer = sub.layer;
            gl.framebuffer_texture_layer(fb_target, sub.attachment, sub.texture, sub.level, layer)
        }
    }
}
