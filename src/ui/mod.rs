pub mod progress;
pub mod theme;

pub use progress::{progress_bar, spinner};
pub use theme::{percent, Theme};
