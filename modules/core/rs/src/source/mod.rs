pub use memory::{MemoryDataset, MemoryOpener};
pub use read::Read;
pub use source::{Opener, ReadSource, Reads};

mod memory;
mod read;
#[allow(clippy::module_inception)]
mod source;
