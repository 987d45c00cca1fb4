//! Utility modules shared by the bundler and the delivery tier.

pub mod html;
pub mod mime;
pub mod path;
