use bizsdk::engine::stencil::*;
use wgpu::{CompareFunction, Face, StencilOperation};

#[test]
fn frame_without_shadowed_pass_is_rejected() {
    let mut frame = ShadowFrame::new();
    frame.advance(ShadowPass::Geometry).unwrap();
    let err = frame.finish().unwrap_err();
    assert_eq!(err.from, Some(ShadowPass::Geometry));
    assert_eq!(err.to, None);
}

#[test]
fn visualization_cannot_precede_shadowed_geometry() {
    let mut frame = ShadowFrame::new();
    frame.advance(ShadowPass::Geometry).unwrap();
    frame.advance(ShadowPass::Stencil).unwrap();
    let err = frame.advance(ShadowPass::PlaneVisualization).unwrap_err();
    assert_eq!(err.from, Some(ShadowPass::Stencil));
    assert_eq!(frame.current(), Some(ShadowPass::Stencil));
    frame.advance(ShadowPass::ShadowedGeometry).unwrap();
    assert!(frame.finish().is_ok());
}

#[test]
fn two_pass_mode_draws_back_faces_first() {
    let draws = stencil_volume_states(StencilMode::TwoPass);
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].cull_mode, Some(Face::Front));
    assert_eq!(draws[0].depth_stencil.stencil.back.depth_fail_op, StencilOperation::IncrementWrap);
    assert_eq!(draws[1].cull_mode, Some(Face::Back));
    assert_eq!(draws[1].depth_stencil.stencil.front.depth_fail_op, StencilOperation::DecrementWrap);

    let two_sided = stencil_volume_states(StencilMode::TwoSided);
    assert_eq!(two_sided.len(), 1);
    assert_eq!(two_sided[0].cull_mode, None);
}

#[test]
fn volume_states_only_count_on_depth_fail() {
    for mode in [StencilMode::TwoSided, StencilMode::TwoPass] {
        for draw in stencil_volume_states(mode) {
            let state = draw.depth_stencil;
            assert_eq!(state.format, DEPTH_FORMAT);
            assert!(!state.depth_write_enabled);
            for face in [state.stencil.front, state.stencil.back] {
                assert_eq!(face.compare, CompareFunction::Always);
                assert_eq!(face.pass_op, StencilOperation::Keep);
                assert_eq!(face.fail_op, StencilOperation::Keep);
            }
        }
    }
}

#[test]
fn diagnostic_pass_matches_exact_counts() {
    let state = diagnostic_depth_stencil();
    assert_eq!(state.stencil.front.compare, CompareFunction::Equal);
    assert_eq!(state.stencil.write_mask, 0);
    assert!(!state.depth_write_enabled);
    let colors: Vec<_> = (1..=MAX_DIAGNOSTIC_COUNT).map(diagnostic_color).collect();
    for (i, a) in colors.iter().enumerate() {
        assert!(a[3] > 0.0);
        assert!(colors[i + 1..].iter().all(|b| b != a));
    }
}

#[test]
fn geometry_pass_writes_depth_without_stencil() {
    let state = geometry_depth_stencil();
    assert!(state.depth_write_enabled);
    assert_eq!(state.depth_compare, CompareFunction::Less);
    assert!(!state.stencil.is_enabled());
}
