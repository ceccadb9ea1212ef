// Format specification: https://samtools.github.io/hts-specs/BEDv1.pdf
//
// Only the first five columns are produced:
// 1. seqid: non-whitespace ASCII, 1-255 characters
// 2. start: u64
// 3. end: u64
// 4. name: [\x20-\x7e]{1,255}
// 5. score: u16 [0, 1000]

mod record;
pub mod validate;
mod writer;

pub use record::Bed5;
pub use writer::Writer;
