//! Optional extensions to the base camera controller.

pub mod requests;
#[cfg(feature = "extension_target_indicator")]
pub mod target_indicator;
