//! Common types shared by the VK API workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
