use bitflags::bitflags;
use vkgl_gl::consts as gl;
use vkgl_gl::GlFeatures;

use crate::cmd::{CmdStream, Deferred, GlCmd, PreExecuteAction};
use crate::state::translate;
use crate::state::{
    BlendAttachmentState, ColorBlendState, ContextState, DefaultState, DepthBias, DepthStencilState,
    FixedFunctionState, MultisampleState, RasterizationState, Rect, RenderArea, StencilFaceState,
    Viewport,
};

bitflags! {
    /// State categories whose recorded snapshot cannot be trusted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Categories: u32 {
        const COLOR_BLEND = 1 << 0;
        const DEPTH_STENCIL = 1 << 1;
        const MULTISAMPLE = 1 << 2;
        const RASTERIZATION = 1 << 3;
        const INPUT_ASSEMBLY = 1 << 4;
        const TESSELLATION = 1 << 5;
        const VIEWPORT = 1 << 6;
        const SCISSOR = 1 << 7;
        const FIXED = Self::COLOR_BLEND.bits()
            | Self::DEPTH_STENCIL.bits()
            | Self::MULTISAMPLE.bits()
            | Self::RASTERIZATION.bits()
            | Self::INPUT_ASSEMBLY.bits()
            | Self::TESSELLATION.bits();
    }
}

/// Tracks the GL state a command stream leaves behind and encodes only the
/// calls needed to reach a new state.
///
/// Each command buffer owns one stack for the duration of a recording. It
/// starts from a [`DefaultState`] it does not trust: the first transition of
/// every category is encoded in full.
#[derive(Debug, Clone)]
pub struct ContextStateStack {
    features: GlFeatures,
    current: ContextState,
    forced: Categories,
}

impl ContextStateStack {
    pub fn new(features: GlFeatures, default: &DefaultState) -> Self {
        Self {
            features,
            current: default.state().clone(),
            forced: Categories::all(),
        }
    }

    pub fn features(&self) -> GlFeatures {
        self.features
    }

    pub fn current(&self) -> &ContextState {
        &self.current
    }

    /// Forgets everything known about the context except the bound target.
    /// Used after commands whose effect on GL state is not tracked.
    pub fn invalidate(&mut self) {
        self.forced = Categories::all();
        self.current.program = None;
        self.current.srgb = None;
    }

    /// Transitions every fixed-function category to `next`.
    pub fn apply(&mut self, out: &mut CmdStream, next: &FixedFunctionState, force: bool) {
        let forced = |cat: Categories| force || self.forced.contains(cat);
        let prev = &self.current.fixed;

        emit_color_blend(
            out,
            self.features,
            &prev.color_blend,
            &next.color_blend,
            forced(Categories::COLOR_BLEND),
        );
        emit_depth_stencil(
            out,
            &prev.depth_stencil,
            &next.depth_stencil,
            forced(Categories::DEPTH_STENCIL),
        );
        emit_multisample(
            out,
            self.features,
            &prev.multisample,
            &next.multisample,
            forced(Categories::MULTISAMPLE),
        );
        toggle(
            out,
            gl::PRIMITIVE_RESTART,
            prev.input_assembly.primitive_restart,
            next.input_assembly.primitive_restart,
            forced(Categories::INPUT_ASSEMBLY),
        );
        emit_rasterization(
            out,
            self.features,
            &prev.rasterization,
            &next.rasterization,
            forced(Categories::RASTERIZATION),
        );
        if self.features.contains(GlFeatures::TESSELLATION)
            && (forced(Categories::TESSELLATION)
                || prev.tessellation.patch_vertices != next.tessellation.patch_vertices)
        {
            out.push(GlCmd::PatchVertices(next.tessellation.patch_vertices));
        }

        self.current.fixed = next.clone();
        self.forced.remove(Categories::FIXED);
    }

    /// Sets viewports `first..first + viewports.len()`, flipped against the
    /// render area. With the render area unknown a placeholder is encoded and
    /// a [`PreExecuteAction`] queued on `actions` to patch it later.
    pub fn apply_viewports(
        &mut self,
        out: &mut CmdStream,
        actions: &mut Vec<PreExecuteAction>,
        first: u32,
        viewports: &[Viewport],
        force: bool,
    ) {
        if viewports.is_empty() {
            return;
        }
        let force = force || self.forced.contains(Categories::VIEWPORT);
        if !store_range(&mut self.current.viewports, first, viewports) && !force {
            return;
        }
        self.forced.remove(Categories::VIEWPORT);
        self.encode_deferred(
            out,
            actions,
            Deferred::Viewports {
                first,
                viewports: viewports.to_vec(),
            },
        );
    }

    /// Scissor counterpart of [`Self::apply_viewports`]. An empty `rects`
    /// disables the scissor test instead of encoding an empty list.
    pub fn apply_scissors(
        &mut self,
        out: &mut CmdStream,
        actions: &mut Vec<PreExecuteAction>,
        first: u32,
        rects: &[Rect],
        force: bool,
    ) {
        let force = force || self.forced.contains(Categories::SCISSOR);
        if rects.is_empty() {
            if force || self.current.scissor_test {
                out.push(GlCmd::Disable(gl::SCISSOR_TEST));
                self.current.scissor_test = false;
            }
            self.current.scissors.clear();
            self.forced.remove(Categories::SCISSOR);
            return;
        }
        if force || !self.current.scissor_test {
            out.push(GlCmd::Enable(gl::SCISSOR_TEST));
            self.current.scissor_test = true;
        }
        if !store_range(&mut self.current.scissors, first, rects) && !force {
            return;
        }
        self.forced.remove(Categories::SCISSOR);
        self.encode_deferred(
            out,
            actions,
            Deferred::Scissors {
                first,
                rects: rects.to_vec(),
            },
        );
    }

    fn encode_deferred(
        &self,
        out: &mut CmdStream,
        actions: &mut Vec<PreExecuteAction>,
        deferred: Deferred,
    ) {
        let area = self.current.render_area;
        let at = out.push(deferred.encode(self.features, area));
        if !area.is_known() {
            tracing::trace!(?at, "render area unknown, deferring flip");
            actions.push(PreExecuteAction::new(at, deferred));
        }
    }

    /// Binds `framebuffer` unless it is already bound and records the render
    /// area later viewports are flipped against. Returns whether the area
    /// changed; stored viewports and scissors are dropped when it does.
    pub fn bind_framebuffer(
        &mut self,
        out: &mut CmdStream,
        framebuffer: u32,
        area: RenderArea,
        window: bool,
    ) -> bool {
        if self.current.framebuffer != Some(framebuffer) {
            out.push(GlCmd::BindFramebuffer {
                target: gl::FRAMEBUFFER,
                framebuffer,
            });
            self.current.framebuffer = Some(framebuffer);
        }
        self.current.window_target = Some(window);
        self.set_render_area(area)
    }

    /// Records a target bound by someone else, e.g. the primary command
    /// buffer a secondary is executed from.
    pub fn seed_target(
        &mut self,
        framebuffer: Option<u32>,
        area: RenderArea,
        window: Option<bool>,
    ) {
        self.current.framebuffer = framebuffer;
        self.current.window_target = window;
        self.set_render_area(area);
    }

    fn set_render_area(&mut self, area: RenderArea) -> bool {
        if self.current.render_area == area {
            return false;
        }
        self.current.render_area = area;
        self.current.viewports.clear();
        self.current.scissors.clear();
        self.forced |= Categories::VIEWPORT | Categories::SCISSOR;
        true
    }

    /// The framebuffer binding was disturbed by a transfer command.
    pub fn forget_framebuffer(&mut self) {
        self.current.framebuffer = None;
    }

    pub fn apply_srgb_status(&mut self, out: &mut CmdStream, enabled: bool) {
        if !self.features.contains(GlFeatures::FRAMEBUFFER_SRGB)
            || self.current.srgb == Some(enabled)
        {
            return;
        }
        out.push(if enabled {
            GlCmd::Enable(gl::FRAMEBUFFER_SRGB)
        } else {
            GlCmd::Disable(gl::FRAMEBUFFER_SRGB)
        });
        self.current.srgb = Some(enabled);
    }

    pub fn apply_depth_bias(&mut self, out: &mut CmdStream, bias: DepthBias) {
        let force = self.forced.contains(Categories::RASTERIZATION);
        let current = &mut self.current.fixed.rasterization.depth_bias;
        if force || *current != bias {
            emit_depth_bias(out, self.features, bias);
            *current = bias;
        }
    }

    pub fn apply_line_width(&mut self, out: &mut CmdStream, width: f32) {
        let force = self.forced.contains(Categories::RASTERIZATION);
        let current = &mut self.current.fixed.rasterization.line_width;
        if force || *current != width {
            out.push(GlCmd::LineWidth(width));
            *current = width;
        }
    }

    pub fn apply_blend_constants(&mut self, out: &mut CmdStream, constants: [f32; 4]) {
        let force = self.forced.contains(Categories::COLOR_BLEND);
        let current = &mut self.current.fixed.color_blend.constants;
        if force || *current != constants {
            out.push(GlCmd::BlendColor(constants));
            *current = constants;
        }
    }

    pub fn apply_stencil_compare_mask(
        &mut self,
        out: &mut CmdStream,
        faces: ash::vk::StencilFaceFlags,
        mask: u32,
    ) {
        self.update_stencil(out, faces, |f| &mut f.compare_mask, mask, stencil_func);
    }

    pub fn apply_stencil_write_mask(
        &mut self,
        out: &mut CmdStream,
        faces: ash::vk::StencilFaceFlags,
        mask: u32,
    ) {
        self.update_stencil(out, faces, |f| &mut f.write_mask, mask, |face, f| GlCmd::StencilMask {
            face,
            mask: f.write_mask,
        });
    }

    pub fn apply_stencil_reference(
        &mut self,
        out: &mut CmdStream,
        faces: ash::vk::StencilFaceFlags,
        reference: u32,
    ) {
        self.update_stencil(out, faces, |f| &mut f.reference, reference, stencil_func);
    }

    fn update_stencil(
        &mut self,
        out: &mut CmdStream,
        faces: ash::vk::StencilFaceFlags,
        field: impl Fn(&mut StencilFaceState) -> &mut u32,
        value: u32,
        encode: impl Fn(u32, &StencilFaceState) -> GlCmd,
    ) {
        let force = self.forced.contains(Categories::DEPTH_STENCIL);
        for &face in translate::stencil_faces(faces) {
            let state = match face {
                gl::FRONT => &mut self.current.fixed.depth_stencil.front,
                _ => &mut self.current.fixed.depth_stencil.back,
            };
            let slot = field(state);
            if force || *slot != value {
                *slot = value;
                out.push(encode(face, state));
            }
        }
    }

    pub fn set_program(&mut self, out: &mut CmdStream, program: u32) {
        if self.current.program != Some(program) {
            out.push(GlCmd::UseProgram(program));
            self.current.program = Some(program);
        }
    }

    /// Disables blending on every draw buffer, as done at render pass begin.
    pub fn disable_blending(&mut self, out: &mut CmdStream) {
        let force = self.forced.contains(Categories::COLOR_BLEND);
        let blend = &mut self.current.fixed.color_blend;
        if force || blend.attachments.iter().any(|a| a.enabled) {
            out.push(GlCmd::Disable(gl::BLEND));
            for a in &mut blend.attachments {
                a.enabled = false;
            }
        }
    }

    /// Puts the context into a state where `glClearBuffer*` writes every
    /// channel of the whole attachment.
    pub fn prepare_clear(&mut self, out: &mut CmdStream) {
        let forced = self.forced;
        let fixed = &mut self.current.fixed;

        let blend = &mut fixed.color_blend;
        let masked = blend.attachments.iter().any(|a| a.write_mask != [true; 4]);
        if forced.contains(Categories::COLOR_BLEND) || masked {
            out.push(GlCmd::ColorMask([true; 4]));
            for a in &mut blend.attachments {
                a.write_mask = [true; 4];
            }
        }

        let ds = &mut fixed.depth_stencil;
        let force_ds = forced.contains(Categories::DEPTH_STENCIL);
        if force_ds || !ds.depth_write {
            out.push(GlCmd::DepthMask(true));
            ds.depth_write = true;
        }
        for (face, state) in [(gl::FRONT, &mut ds.front), (gl::BACK, &mut ds.back)] {
            if force_ds || state.write_mask != !0 {
                out.push(GlCmd::StencilMask { face, mask: !0 });
                state.write_mask = !0;
            }
        }

        if forced.contains(Categories::RASTERIZATION) || fixed.rasterization.discard {
            out.push(GlCmd::Disable(gl::RASTERIZER_DISCARD));
            fixed.rasterization.discard = false;
        }
        if forced.contains(Categories::SCISSOR) || self.current.scissor_test {
            out.push(GlCmd::Disable(gl::SCISSOR_TEST));
            self.current.scissor_test = false;
        }
    }
}

/// Writes `values` at `first`, growing `stored` as needed. Returns whether
/// anything changed.
fn store_range<T: Copy + PartialEq + Default>(
    stored: &mut Vec<T>,
    first: u32,
    values: &[T],
) -> bool {
    let start = first as usize;
    let end = start + values.len();
    if stored.get(start..end) == Some(values) {
        return false;
    }
    if stored.len() < end {
        stored.resize(end, T::default());
    }
    stored[start..end].copy_from_slice(values);
    true
}

fn toggle(out: &mut CmdStream, cap: u32, prev: bool, next: bool, force: bool) {
    if force || prev != next {
        out.push(if next { GlCmd::Enable(cap) } else { GlCmd::Disable(cap) });
    }
}

fn emit_color_blend(
    out: &mut CmdStream,
    features: GlFeatures,
    prev: &ColorBlendState,
    next: &ColorBlendState,
    force: bool,
) {
    if force || prev.logic_op != next.logic_op {
        match next.logic_op {
            Some(op) => {
                if force || prev.logic_op.is_none() {
                    out.push(GlCmd::Enable(gl::COLOR_LOGIC_OP));
                }
                out.push(GlCmd::LogicOp(op));
            }
            None => {
                out.push(GlCmd::Disable(gl::COLOR_LOGIC_OP));
            }
        }
    }

    if !next.is_uniform() && features.contains(GlFeatures::DRAW_BUFFERS_BLEND) {
        for (i, a) in next.attachments.iter().enumerate() {
            let before = match (force, prev.is_uniform()) {
                (true, _) => None,
                (false, true) => prev.attachments.first(),
                (false, false) => prev.attachments.get(i),
            };
            emit_blend_attachment(out, Some(i as u32), before, a);
        }
    } else {
        let a = next.attachments.first().copied().unwrap_or_default();
        // Without indexed blending GL only ever held the first attachment.
        // Per-buffer state left behind by an indexed transition is not
        // described by it.
        let applied_indexed =
            !prev.is_uniform() && features.contains(GlFeatures::DRAW_BUFFERS_BLEND);
        let before = prev.attachments.first().filter(|_| !force && !applied_indexed);
        emit_blend_attachment(out, None, before, &a);
    }

    if force || prev.constants != next.constants {
        out.push(GlCmd::BlendColor(next.constants));
    }
}

fn emit_blend_attachment(
    out: &mut CmdStream,
    index: Option<u32>,
    prev: Option<&BlendAttachmentState>,
    next: &BlendAttachmentState,
) {
    if prev.map_or(true, |p| p.enabled != next.enabled) {
        out.push(match (index, next.enabled) {
            (None, true) => GlCmd::Enable(gl::BLEND),
            (None, false) => GlCmd::Disable(gl::BLEND),
            (Some(index), true) => GlCmd::EnableIndexed { cap: gl::BLEND, index },
            (Some(index), false) => GlCmd::DisableIndexed { cap: gl::BLEND, index },
        });
    }
    if prev.map_or(true, |p| !p.same_equation(next)) {
        match index {
            None => {
                out.push(GlCmd::BlendFunc {
                    src_rgb: next.src_rgb,
                    dst_rgb: next.dst_rgb,
                    src_alpha: next.src_alpha,
                    dst_alpha: next.dst_alpha,
                });
                out.push(GlCmd::BlendEquation {
                    rgb: next.eq_rgb,
                    alpha: next.eq_alpha,
                });
            }
            Some(buf) => {
                out.push(GlCmd::BlendFuncIndexed {
                    buf,
                    src_rgb: next.src_rgb,
                    dst_rgb: next.dst_rgb,
                    src_alpha: next.src_alpha,
                    dst_alpha: next.dst_alpha,
                });
                out.push(GlCmd::BlendEquationIndexed {
                    buf,
                    rgb: next.eq_rgb,
                    alpha: next.eq_alpha,
                });
            }
        }
    }
    if prev.map_or(true, |p| p.write_mask != next.write_mask) {
        out.push(match index {
            None => GlCmd::ColorMask(next.write_mask),
            Some(buf) => GlCmd::ColorMaskIndexed {
                buf,
                mask: next.write_mask,
            },
        });
    }
}

fn stencil_func(face: u32, s: &StencilFaceState) -> GlCmd {
    GlCmd::StencilFunc {
        face,
        func: s.func,
        reference: s.reference,
        mask: s.compare_mask,
    }
}

fn emit_depth_stencil(
    out: &mut CmdStream,
    prev: &DepthStencilState,
    next: &DepthStencilState,
    force: bool,
) {
    toggle(out, gl::DEPTH_TEST, prev.depth_test, next.depth_test, force);
    if force || prev.depth_write != next.depth_write {
        out.push(GlCmd::DepthMask(next.depth_write));
    }
    if force || prev.depth_func != next.depth_func {
        out.push(GlCmd::DepthFunc(next.depth_func));
    }
    toggle(out, gl::STENCIL_TEST, prev.stencil_test, next.stencil_test, force);
    let faces = [(gl::FRONT, &prev.front, &next.front), (gl::BACK, &prev.back, &next.back)];
    for (face, p, n) in faces {
        if force || (p.func, p.reference, p.compare_mask) != (n.func, n.reference, n.compare_mask) {
            out.push(stencil_func(face, n));
        }
        if force || (p.fail, p.depth_fail, p.pass) != (n.fail, n.depth_fail, n.pass) {
            out.push(GlCmd::StencilOp {
                face,
                fail: n.fail,
                depth_fail: n.depth_fail,
                pass: n.pass,
            });
        }
        if force || p.write_mask != n.write_mask {
            out.push(GlCmd::StencilMask {
                face,
                mask: n.write_mask,
            });
        }
    }
}

fn emit_multisample(
    out: &mut CmdStream,
    features: GlFeatures,
    prev: &MultisampleState,
    next: &MultisampleState,
    force: bool,
) {
    if force || prev.sample_shading != next.sample_shading {
        if features.contains(GlFeatures::SAMPLE_SHADING) {
            match next.sample_shading {
                Some(min) => {
                    out.push(GlCmd::Enable(gl::SAMPLE_SHADING));
                    out.push(GlCmd::MinSampleShading(min));
                }
                None => {
                    out.push(GlCmd::Disable(gl::SAMPLE_SHADING));
                }
            }
        } else if next.sample_shading.is_some() {
            tracing::warn!("sample shading requested without GL support; ignoring");
        }
    }
    if force || prev.sample_mask != next.sample_mask {
        match next.sample_mask {
            Some(mask) => {
                out.push(GlCmd::Enable(gl::SAMPLE_MASK));
                out.push(GlCmd::SampleMask(mask));
            }
            None => {
                out.push(GlCmd::Disable(gl::SAMPLE_MASK));
            }
        }
    }
    toggle(
        out,
        gl::SAMPLE_ALPHA_TO_COVERAGE,
        prev.alpha_to_coverage,
        next.alpha_to_coverage,
        force,
    );
    toggle(out, gl::SAMPLE_ALPHA_TO_ONE, prev.alpha_to_one, next.alpha_to_one, force);
}

fn emit_rasterization(
    out: &mut CmdStream,
    features: GlFeatures,
    prev: &RasterizationState,
    next: &RasterizationState,
    force: bool,
) {
    if features.contains(GlFeatures::DEPTH_CLAMP) {
        toggle(out, gl::DEPTH_CLAMP, prev.depth_clamp, next.depth_clamp, force);
    }
    toggle(out, gl::RASTERIZER_DISCARD, prev.discard, next.discard, force);
    if force || prev.polygon_mode != next.polygon_mode {
        out.push(GlCmd::PolygonMode(next.polygon_mode));
    }
    if force || prev.cull_face != next.cull_face {
        match next.cull_face {
            Some(face) => {
                if force || prev.cull_face.is_none() {
                    out.push(GlCmd::Enable(gl::CULL_FACE));
                }
                out.push(GlCmd::CullFace(face));
            }
            None => {
                out.push(GlCmd::Disable(gl::CULL_FACE));
            }
        }
    }
    if force || prev.front_face != next.front_face {
        out.push(GlCmd::FrontFace(next.front_face));
    }
    for cap in [gl::POLYGON_OFFSET_FILL, gl::POLYGON_OFFSET_LINE, gl::POLYGON_OFFSET_POINT] {
        toggle(out, cap, prev.depth_bias_enable, next.depth_bias_enable, force);
    }
    if force || prev.depth_bias != next.depth_bias {
        emit_depth_bias(out, features, next.depth_bias);
    }
    if force || prev.line_width != next.line_width {
        out.push(GlCmd::LineWidth(next.line_width));
    }
}

fn emit_depth_bias(out: &mut CmdStream, features: GlFeatures, bias: DepthBias) {
    if bias.clamp != 0.0 && features.contains(GlFeatures::POLYGON_OFFSET_CLAMP) {
        out.push(GlCmd::PolygonOffsetClamp {
            factor: bias.slope,
            units: bias.constant,
            clamp: bias.clamp,
        });
    } else {
        out.push(GlCmd::PolygonOffset {
            factor: bias.slope,
            units: bias.constant,
        });
    }
}

/// Viewport command for `viewports` starting at index `first`. With a
/// `height` the Y origin is flipped to the GL bottom-left convention.
/// Without viewport arrays only viewport 0 exists; recording rejects a
/// nonzero `first` before it gets here.
pub fn encode_viewports(
    features: GlFeatures,
    first: u32,
    viewports: &[Viewport],
    height: Option<u32>,
) -> GlCmd {
    let flip = |v: &Viewport| match height {
        Some(h) => h as f32 - (v.y + v.height),
        None => v.y,
    };
    let depth = |v: &Viewport| [f64::from(v.min_depth), f64::from(v.max_depth)];

    if !features.contains(GlFeatures::VIEWPORT_ARRAY) {
        let v = viewports.first().copied().unwrap_or_default();
        return GlCmd::Viewport {
            rect: [
                v.x.round() as i32,
                flip(&v).round() as i32,
                v.width.round() as i32,
                v.height.round() as i32,
            ],
            depth: depth(&v),
        };
    }
    GlCmd::ViewportArray {
        first,
        rects: viewports.iter().map(|v| [v.x, flip(v), v.width, v.height]).collect(),
        depths: viewports.iter().map(depth).collect(),
    }
}

/// Scissor counterpart of [`encode_viewports`].
pub fn encode_scissors(
    features: GlFeatures,
    first: u32,
    rects: &[Rect],
    height: Option<u32>,
) -> GlCmd {
    let encode = |r: &Rect| {
        let y = match height {
            Some(h) => i64::from(h) - (i64::from(r.y) + i64::from(r.height)),
            None => i64::from(r.y),
        };
        [r.x, y as i32, r.width as i32, r.height as i32]
    };
    if !features.contains(GlFeatures::VIEWPORT_ARRAY) {
        return GlCmd::Scissor(rects.first().map(encode).unwrap_or_default());
    }
    GlCmd::ScissorArray {
        first,
        rects: rects.iter().map(encode).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stack(features: GlFeatures) -> ContextStateStack {
        ContextStateStack::new(features, &DefaultState::default())
    }

    #[test]
    fn unknown_area_leaves_placeholder_and_action() {
        let mut s = stack(GlFeatures::empty());
        let mut out = CmdStream::new();
        let mut actions = Vec::new();
        let viewport = [Viewport::new(0.0, 10.0, 100.0, 50.0)];
        s.apply_viewports(&mut out, &mut actions, 0, &viewport, false);
        assert_eq!(actions.len(), 1);
        assert_eq!(
            out.get(actions[0].at),
            Some(&GlCmd::Viewport {
                rect: [0, 10, 100, 50],
                depth: [0.0, 1.0]
            })
        );

        assert!(actions[0].resolve(&mut out, s.features(), RenderArea::new(100, 200)));
        assert_eq!(
            out.get(actions[0].at),
            Some(&GlCmd::Viewport {
                rect: [0, 140, 100, 50],
                depth: [0.0, 1.0]
            })
        );
    }

    #[test]
    fn stencil_reference_only_touches_named_face() {
        let mut s = stack(GlFeatures::empty());
        let mut out = CmdStream::new();
        s.apply(&mut out, &FixedFunctionState::default(), false);
        out.clear();

        s.apply_stencil_reference(&mut out, ash::vk::StencilFaceFlags::BACK, 7);
        s.apply_stencil_reference(&mut out, ash::vk::StencilFaceFlags::BACK, 7);
        assert_eq!(
            out.iter().cloned().collect::<Vec<_>>(),
            vec![GlCmd::StencilFunc {
                face: gl::BACK,
                func: gl::ALWAYS,
                reference: 7,
                mask: !0
            }]
        );
    }

    #[test]
    fn empty_scissors_disable_the_test() {
        let mut s = stack(GlFeatures::VIEWPORT_ARRAY);
        let mut out = CmdStream::new();
        let mut actions = Vec::new();
        s.bind_framebuffer(&mut out, 3, RenderArea::new(64, 64), false);
        s.apply_scissors(&mut out, &mut actions, 0, &[Rect::new(0, 0, 8, 8)], false);
        out.clear();

        s.apply_scissors(&mut out, &mut actions, 0, &[], false);
        assert_eq!(out.iter().cloned().collect::<Vec<_>>(), vec![GlCmd::Disable(gl::SCISSOR_TEST)]);
        assert!(actions.is_empty());
    }

    fn two_attachments_second_blending() -> FixedFunctionState {
        let mut state = FixedFunctionState::default();
        state.color_blend.attachments.push(BlendAttachmentState {
            enabled: true,
            ..Default::default()
        });
        state
    }

    #[test]
    fn non_uniform_blend_without_indexed_blending_is_idempotent() {
        let mut s = stack(GlFeatures::empty());
        let state = two_attachments_second_blending();
        let mut out = CmdStream::new();
        s.apply(&mut out, &state, false);
        out.clear();

        s.apply(&mut out, &state, false);
        assert_eq!(out.iter().cloned().collect::<Vec<_>>(), Vec::<GlCmd>::new());
    }

    #[test]
    fn leaving_indexed_blending_reencodes_the_shared_state() {
        let mut s = stack(GlFeatures::DRAW_BUFFERS_BLEND);
        let mut out = CmdStream::new();
        s.apply(&mut out, &two_attachments_second_blending(), false);
        out.clear();

        s.apply(&mut out, &FixedFunctionState::default(), false);
        assert_eq!(
            out.iter().cloned().collect::<Vec<_>>(),
            vec![
                GlCmd::Disable(gl::BLEND),
                GlCmd::BlendFunc {
                    src_rgb: gl::ONE,
                    dst_rgb: gl::ZERO,
                    src_alpha: gl::ONE,
                    dst_alpha: gl::ZERO,
                },
                GlCmd::BlendEquation {
                    rgb: gl::FUNC_ADD,
                    alpha: gl::FUNC_ADD,
                },
                GlCmd::ColorMask([true; 4]),
            ]
        );
    }
}
