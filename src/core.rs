//! Core building blocks shared by every layer: the frame type and its
//! binary codec, composable frame filters, and the crate error type.

pub mod error;
pub mod filter;
pub mod frame;

pub use error::{CanError, Result};
pub use filter::FrameFilter;
pub use frame::Frame;
