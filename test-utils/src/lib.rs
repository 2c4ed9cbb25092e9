//! Recording fakes and fixtures for vicklet tests.
//!
//! The fakes record every call in order and let a test inject failures per
//! operation, which is how the lifecycle sequences are asserted.

pub mod fixtures;
pub mod images;
pub mod isolation;
pub mod system;

pub use images::FakeImageStore;
pub use isolation::{Call, FakeIsolationProxy, Op};
pub use system::FakeSystemProxy;
