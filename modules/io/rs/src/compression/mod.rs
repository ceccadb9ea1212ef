mod config;
pub mod decode;
pub mod encode;

pub use config::{Config, Level};
