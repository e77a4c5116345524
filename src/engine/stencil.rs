//! Z-fail ("Carmack's reverse") stencil shadow passes.
//!
//! One frame runs `Geometry → Stencil → ShadowedGeometry`, optionally
//! followed by `PlaneVisualization`. The pipeline state of every pass is
//! described here as plain wgpu values so the GPU side only has to wrap
//! them into pipelines.

use std::fmt;

use wgpu::*;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth24PlusStencil8;

/// Stencil counts 1..=MAX_DIAGNOSTIC_COUNT get their own colour in the
/// diagnostic pass; higher counts are left undrawn.
pub const MAX_DIAGNOSTIC_COUNT: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShadowPass {
    Geometry,
    Stencil,
    ShadowedGeometry,
    PlaneVisualization,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StencilMode {
    /// Front and back faces in one draw with separate stencil ops.
    TwoSided,
    /// Back faces first, then front faces, with culling flipped in between.
    TwoPass,
}

impl StencilMode {
    pub fn toggle(self) -> Self {
        match self {
            StencilMode::TwoSided => StencilMode::TwoPass,
            StencilMode::TwoPass => StencilMode::TwoSided,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    Shaded,
    StencilCount,
    ShadowVolumes,
}

impl DisplayMode {
    pub fn next(self) -> Self {
        match self {
            DisplayMode::Shaded => DisplayMode::StencilCount,
            DisplayMode::StencilCount => DisplayMode::ShadowVolumes,
            DisplayMode::ShadowVolumes => DisplayMode::Shaded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOrderError {
    pub from: Option<ShadowPass>,
    pub to: Option<ShadowPass>,
}

impl fmt::Display for PassOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from, self.to) {
            (from, Some(to)) => write!(f, "pass {:?} cannot follow {:?}", to, from),
            (from, None) => write!(f, "frame ended after {:?} before shadows were applied", from),
        }
    }
}

impl std::error::Error for PassOrderError {}

/// Tracks the passes of one frame and rejects anything out of order.
#[derive(Debug, Default)]
pub struct ShadowFrame {
    current: Option<ShadowPass>,
}

impl ShadowFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ShadowPass> {
        self.current
    }

    pub fn advance(&mut self, next: ShadowPass) -> Result<(), PassOrderError> {
        let allowed = matches!(
            (self.current, next),
            (None, ShadowPass::Geometry)
                | (Some(ShadowPass::Geometry), ShadowPass::Stencil)
                | (Some(ShadowPass::Stencil), ShadowPass::ShadowedGeometry)
                | (Some(ShadowPass::ShadowedGeometry), ShadowPass::PlaneVisualization)
        );
        if !allowed {
            return Err(PassOrderError {
                from: self.current,
                to: Some(next),
            });
        }
        self.current = Some(next);
        Ok(())
    }

    pub fn finish(self) -> Result<(), PassOrderError> {
        match self.current {
            Some(ShadowPass::ShadowedGeometry) | Some(ShadowPass::PlaneVisualization) => Ok(()),
            other => Err(PassOrderError { from: other, to: None }),
        }
    }
}

fn face(compare: CompareFunction, depth_fail_op: StencilOperation) -> StencilFaceState {
    StencilFaceState {
        compare,
        fail_op: StencilOperation::Keep,
        depth_fail_op,
        pass_op: StencilOperation::Keep,
    }
}

/// Plain opaque geometry: depth test and write on, stencil untouched.
pub fn geometry_depth_stencil() -> DepthStencilState {
    DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: CompareFunction::Less,
        stencil: StencilState::default(),
        bias: DepthBiasState::default(),
    }
}

/// One shadow-volume draw of the stencil pass.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeDraw {
    pub label: &'static str,
    pub cull_mode: Option<Face>,
    pub depth_stencil: DepthStencilState,
}

/// Stencil pass state: always pass, reference 0, no colour or depth
/// writes; back faces increment and front faces decrement on depth fail.
pub fn stencil_volume_states(mode: StencilMode) -> Vec<VolumeDraw> {
    let state = |front: StencilFaceState, back: StencilFaceState| DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: CompareFunction::Less,
        stencil: StencilState {
            front,
            back,
            read_mask: 0xff,
            write_mask: 0xff,
        },
        bias: DepthBiasState::default(),
    };
    let incr = face(CompareFunction::Always, StencilOperation::IncrementWrap);
    let decr = face(CompareFunction::Always, StencilOperation::DecrementWrap);
    let keep = face(CompareFunction::Always, StencilOperation::Keep);

    match mode {
        StencilMode::TwoSided => vec![VolumeDraw {
            label: "Shadow Volume Two-Sided",
            cull_mode: None,
            depth_stencil: state(decr, incr),
        }],
        StencilMode::TwoPass => vec![
            VolumeDraw {
                label: "Shadow Volume Back Faces",
                cull_mode: Some(Face::Front),
                depth_stencil: state(keep, incr),
            },
            VolumeDraw {
                label: "Shadow Volume Front Faces",
                cull_mode: Some(Face::Back),
                depth_stencil: state(decr, keep),
            },
        ],
    }
}

/// Re-draw of the geometry that darkens only what is already visible
/// (depth equal) and in shadow (stencil != 0).
pub fn shadowed_geometry_depth_stencil() -> DepthStencilState {
    let test = face(CompareFunction::NotEqual, StencilOperation::Keep);
    DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: CompareFunction::Equal,
        stencil: StencilState {
            front: test,
            back: test,
            read_mask: 0xff,
            write_mask: 0x00,
        },
        bias: DepthBiasState::default(),
    }
}

/// Diagnostic pass: fullscreen draws that pass where the stencil equals
/// the reference set on the render pass.
pub fn diagnostic_depth_stencil() -> DepthStencilState {
    let test = face(CompareFunction::Equal, StencilOperation::Keep);
    DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: CompareFunction::Always,
        stencil: StencilState {
            front: test,
            back: test,
            read_mask: 0xff,
            write_mask: 0x00,
        },
        bias: DepthBiasState::default(),
    }
}

pub fn shadow_blend() -> BlendState {
    BlendState {
        color: BlendComponent {
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
        alpha: BlendComponent {
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            operation: BlendOperation::Add,
        },
    }
}

/// Colour for stencil count `n` in the diagnostic pass.
pub fn diagnostic_color(n: u32) -> [f32; 4] {
    match n.min(MAX_DIAGNOSTIC_COUNT) {
        0 => [0.0, 0.0, 0.0, 0.0],
        1 => [0.9, 0.2, 0.2, 0.6],
        2 => [0.2, 0.9, 0.2, 0.6],
        3 => [0.2, 0.3, 0.9, 0.6],
        _ => [0.9, 0.9, 0.2, 0.6],
    }
}
