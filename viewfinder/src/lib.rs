pub mod camera;
pub mod display;
pub mod session;
