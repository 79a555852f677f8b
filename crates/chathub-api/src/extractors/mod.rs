//! Custom Axum extractors.

pub mod payload;

pub use payload::Payload;
