//! Peak assembly: narrow peaks from significant windows, broad peaks from nearby narrow peaks.

pub use caller::{broad, narrow};
pub use peak::Peak;
pub use quality::{quality, PeakQuality};

mod caller;
mod peak;
mod quality;
