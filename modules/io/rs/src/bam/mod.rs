pub use builder::ReaderBuilder;
pub use opener::BamOpener;
pub use reader::{Filters, Reader};

mod builder;
mod indexed_reader;
mod opener;
mod query;
mod reader;
