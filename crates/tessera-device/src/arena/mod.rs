//! Shared vertex-buffer arenas.
//!
//! Many logical vertex buffers of one format live in a single backend buffer. The
//! arena types here only track byte ranges; the device executes the copies.

mod format;
mod shared;

pub use format::{FlatVertex, Vertex, VertexFormat, WorldVertex};
pub use shared::{
    grown_capacity, Allocation, AllocationId, CompactionPlan, CopyRange, SharedBufferArena,
};
