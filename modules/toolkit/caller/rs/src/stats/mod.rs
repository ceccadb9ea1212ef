//! Statistical pipeline: Poisson models, p-values, q-values and the inverse normal combination.

pub use boxplot::BoxPlot;
pub use combine::{Combiner, EXTREME_PVALUE, KAPPA};
pub use histogram::{AtomicHistogram, PValueHistogram};
pub use poisson::{PoissonModel, PVALUE_EPSILON};
pub use qvalue::correct;
pub use summary::{summarize, ContigSummary, Summary};

mod boxplot;
mod combine;
pub mod histogram;
mod poisson;
pub mod pipeline;
mod qvalue;
mod summary;
