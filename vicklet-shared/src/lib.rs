//! Vicklet Shared - error taxonomy and wire constants
//!
//! This crate contains the types every vicklet layer agrees on: the error
//! kinds surfaced by the pod lifecycle engine and the fixed strings used
//! on the wire when talking to the portlayer and persona services.

pub mod constants;
pub mod errors;

pub use errors::{VickletError, VickletResult};
