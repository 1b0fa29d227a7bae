pub mod mondrian;
pub mod render;
pub mod sprite;
pub mod text;

pub use mondrian::MaskBank;
pub use render::{RenderStats, Renderer, SkiaRenderer};
pub use text::TextCache;
