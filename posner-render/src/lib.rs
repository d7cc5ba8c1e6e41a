pub mod chart;
pub mod render;
pub mod text;

pub use chart::{ChartReporter, render_bar_chart};
pub use render::{FrameStats, Palette, SkiaRenderer};
pub use text::{load_font, render_text_pixmap};
