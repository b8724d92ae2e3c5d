//! Gateway shell protocol
//!
//! - [`decoder`] - Strips prompt, framing and escape artifacts from raw lines
//! - [`classifier`] - Maps clean lines to [`crate::types::Message`]
//! - [`command`] - Outbound `monitor ...` commands

pub mod classifier;
pub mod command;
pub mod decoder;

pub use classifier::{classify, node_update};
pub use command::Command;
pub use decoder::{DecodedLine, LineDecoder};
