//! Concrete [`crate::traits::source::TableSource`] implementations.

pub mod json_dir;

pub use json_dir::JsonDirSource;
