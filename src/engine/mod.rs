pub mod infinite_plane;
pub mod math;
pub mod mesh;
pub mod renderer;
pub mod shaders;
pub mod shadow_volume;
pub mod stencil;
pub mod vbo;
