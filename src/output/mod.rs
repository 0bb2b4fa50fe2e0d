// src/output/mod.rs
//! Rendering and delivery of converted documents.
//!
//! The renderer is pure: it only formats what the chain already holds.
//! All file and terminal I/O lives in `writer`.

mod renderer;
mod writer;

// Re-export the public interface
pub use renderer::JsonTreeRenderer;
pub use writer::{FileExporter, StdoutExporter};
