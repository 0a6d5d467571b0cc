//! Storage backends for quizmark.
//!
//! [`MemoryStore`] implements the catalog, attempt and answer traits from
//! `quizmark-core` over process memory. The CLI seeds it from TOML catalogs.

pub mod memory;

pub use memory::MemoryStore;
