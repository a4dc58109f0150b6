//! Terminal UI components: spinners and colors.

mod spinner;
mod theme;

pub use spinner::{Spinner, spinner_style};
pub use theme::Style;
