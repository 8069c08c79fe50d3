use pretty_assertions::assert_eq;
use vkgl_gl::consts as gl;
use vkgl_gl::GlFeatures;
use vkgl_icd::cmd::{CmdStream, GlCmd};
use vkgl_icd::state::{
    ContextStateStack, DefaultState, FixedFunctionState, Rect, RenderArea, Viewport,
};

fn cmds(out: &CmdStream) -> Vec<GlCmd> {
    out.iter().cloned().collect()
}

fn bound(features: GlFeatures, width: u32, height: u32) -> ContextStateStack {
    let mut stack = ContextStateStack::new(features, &DefaultState::default());
    stack.bind_framebuffer(&mut CmdStream::new(), 5, RenderArea::new(width, height), false);
    stack
}

#[test]
fn first_apply_is_complete_and_repeats_are_free() {
    let mut stack = ContextStateStack::new(GlFeatures::empty(), &DefaultState::default());
    let state = FixedFunctionState::default();

    let mut first = CmdStream::new();
    stack.apply(&mut first, &state, false);
    assert!(!first.is_empty());

    let mut second = CmdStream::new();
    stack.apply(&mut second, &state, false);
    assert!(second.is_empty());

    let mut forced = CmdStream::new();
    stack.apply(&mut forced, &state, true);
    assert_eq!(cmds(&forced), cmds(&first));
}

#[test]
fn only_changed_state_is_encoded() {
    let mut stack = ContextStateStack::new(GlFeatures::empty(), &DefaultState::default());
    let mut state = FixedFunctionState::default();
    stack.apply(&mut CmdStream::new(), &state, false);

    state.rasterization.line_width = 2.0;
    let mut out = CmdStream::new();
    stack.apply(&mut out, &state, false);
    assert_eq!(cmds(&out), vec![GlCmd::LineWidth(2.0)]);
}

#[test]
fn invalidate_forces_the_next_apply() {
    let mut stack = ContextStateStack::new(GlFeatures::empty(), &DefaultState::default());
    let state = FixedFunctionState::default();
    let mut first = CmdStream::new();
    stack.apply(&mut first, &state, false);

    stack.invalidate();
    let mut again = CmdStream::new();
    stack.apply(&mut again, &state, false);
    assert_eq!(cmds(&again), cmds(&first));
}

#[test]
fn viewports_flip_against_the_render_area() {
    let mut stack = bound(GlFeatures::VIEWPORT_ARRAY, 800, 600);
    let mut out = CmdStream::new();
    let mut actions = Vec::new();
    stack.apply_viewports(
        &mut out,
        &mut actions,
        0,
        &[Viewport::new(0.0, 0.0, 800.0, 600.0), Viewport::new(10.0, 20.0, 100.0, 50.0)],
        false,
    );
    assert!(actions.is_empty());
    assert_eq!(
        cmds(&out),
        vec![GlCmd::ViewportArray {
            first: 0,
            rects: vec![[0.0, 0.0, 800.0, 600.0], [10.0, 530.0, 100.0, 50.0]],
            depths: vec![[0.0, 1.0], [0.0, 1.0]],
        }]
    );
}

#[test]
fn scissors_flip_without_viewport_arrays() {
    let mut stack = bound(GlFeatures::empty(), 800, 600);
    let mut out = CmdStream::new();
    stack.apply_scissors(&mut out, &mut Vec::new(), 0, &[Rect::new(4, 8, 16, 32)], false);
    assert_eq!(
        cmds(&out),
        vec![GlCmd::Enable(gl::SCISSOR_TEST), GlCmd::Scissor([4, 560, 16, 32])]
    );
}

#[test]
fn rebinding_the_same_framebuffer_emits_nothing() {
    let mut stack = ContextStateStack::new(GlFeatures::empty(), &DefaultState::default());
    let area = RenderArea::new(64, 64);

    let mut out = CmdStream::new();
    assert!(stack.bind_framebuffer(&mut out, 3, area, false));
    assert_eq!(
        cmds(&out),
        vec![GlCmd::BindFramebuffer {
            target: gl::FRAMEBUFFER,
            framebuffer: 3,
        }]
    );

    let mut again = CmdStream::new();
    assert!(!stack.bind_framebuffer(&mut again, 3, area, false));
    assert!(again.is_empty());
}

#[test]
fn render_area_change_reencodes_viewports() {
    let mut stack = bound(GlFeatures::empty(), 100, 100);
    let viewport = [Viewport::new(0.0, 0.0, 50.0, 50.0)];
    let mut actions = Vec::new();
    stack.apply_viewports(&mut CmdStream::new(), &mut actions, 0, &viewport, false);

    let mut same = CmdStream::new();
    stack.apply_viewports(&mut same, &mut actions, 0, &viewport, false);
    assert!(same.is_empty());

    assert!(stack.bind_framebuffer(&mut CmdStream::new(), 5, RenderArea::new(100, 200), false));
    let mut resized = CmdStream::new();
    stack.apply_viewports(&mut resized, &mut actions, 0, &viewport, false);
    assert_eq!(
        cmds(&resized),
        vec![GlCmd::Viewport {
            rect: [0, 150, 50, 50],
            depth: [0.0, 1.0],
        }]
    );
    assert!(actions.is_empty());
}
