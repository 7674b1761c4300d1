//! Resource handles and their cross-thread deletion path.

mod deletion;
mod handles;
mod texture;

pub use deletion::{DeletionQueue, DeviceLink, PendingDeletes, Release};
pub use handles::{IndexBuffer, IndexBufferId, Texture, TextureId, VertexBuffer, VertexBufferId};
pub use texture::{CubeMapFace, TextureDesc, TextureKind};
