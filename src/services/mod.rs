pub mod animation;
pub mod camera;
pub mod classifier;
pub mod history;
pub mod image_source;
pub mod lifecycle;
