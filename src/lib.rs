pub mod engine;
pub mod input;

pub mod app;
pub mod camera;
pub mod game_loop;
pub mod log;
pub mod resource_path;
pub mod settings;
