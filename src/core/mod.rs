//! Core domain types.
//!
//! Value types shared across the pipeline: chunks, sources, file records.
//! None of them hold store references; anything handed to the formatter is
//! plain data.

mod chunk;
mod source;

pub use chunk::{Chunk, ChunkKind, chunk_id};
pub use source::{FileRecord, Source};
