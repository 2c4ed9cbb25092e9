pub mod constants;
pub mod options;

pub use options::{LogConfig, VickletConfig};
