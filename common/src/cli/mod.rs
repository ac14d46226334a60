//! CLI policy shared by the sender and receiver binaries.

mod color;

pub use color::ColorWhen;
