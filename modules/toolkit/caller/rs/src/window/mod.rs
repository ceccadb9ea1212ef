pub use grid::{GenomeMap, Grid};
pub use list::WindowList;
pub use window::Window;

mod grid;
mod list;
#[allow(clippy::module_inception)]
mod window;
