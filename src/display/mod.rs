pub mod fps;
pub mod renderer;

pub use fps::{FpsCounter, FpsReport};
pub use renderer::{RenderSummary, Renderer};
