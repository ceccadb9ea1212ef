pub mod bam;
pub mod bed;
pub mod compression;
pub mod table;
mod traits;

pub use traits::WriteRecord;
