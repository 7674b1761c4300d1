use super::deletion::{DeviceLink, Release, ResourceId};
use super::{TextureDesc, TextureKind};

slotmap::new_key_type! {
    pub struct VertexBufferId;
    pub struct IndexBufferId;
    pub struct TextureId;
}

/// A logical vertex buffer living in one of the device's shared arenas.
///
/// Dropping the handle (on any thread) queues the buffer for destruction; see
/// [`Release`].
#[derive(Debug)]
pub struct VertexBuffer {
    id: VertexBufferId,
    link: DeviceLink,
}

impl VertexBuffer {
    pub(crate) fn new(id: VertexBufferId, link: DeviceLink) -> Self {
        Self { id, link }
    }

    #[inline]
    pub fn id(&self) -> VertexBufferId {
        self.id
    }

    /// True once the owning device has been dropped.
    pub fn is_detached(&self) -> bool {
        self.link.is_detached()
    }

    pub(crate) fn link(&self) -> &DeviceLink {
        &self.link
    }

    pub fn release(mut self) -> Release {
        self.link.release(ResourceId::VertexBuffer(self.id))
    }
}

impl Drop for VertexBuffer {
    fn drop(&mut self) {
        let _ = self.link.release(ResourceId::VertexBuffer(self.id));
    }
}

/// A 32-bit index buffer.
#[derive(Debug)]
pub struct IndexBuffer {
    id: IndexBufferId,
    link: DeviceLink,
}

impl IndexBuffer {
    pub(crate) fn new(id: IndexBufferId, link: DeviceLink) -> Self {
        Self { id, link }
    }

    #[inline]
    pub fn id(&self) -> IndexBufferId {
        self.id
    }

    pub fn is_detached(&self) -> bool {
        self.link.is_detached()
    }

    pub(crate) fn link(&self) -> &DeviceLink {
        &self.link
    }

    pub fn release(mut self) -> Release {
        self.link.release(ResourceId::IndexBuffer(self.id))
    }
}

impl Drop for IndexBuffer {
    fn drop(&mut self) {
        let _ = self.link.release(ResourceId::IndexBuffer(self.id));
    }
}

/// A flat or cube texture. Also usable as a render target.
#[derive(Debug)]
pub struct Texture {
    id: TextureId,
    desc: TextureDesc,
    link: DeviceLink,
}

impl Texture {
    pub(crate) fn new(id: TextureId, desc: TextureDesc, link: DeviceLink) -> Self {
        Self { id, desc, link }
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    #[inline]
    pub fn kind(&self) -> TextureKind {
        self.desc.kind
    }

    pub fn desc(&self) -> TextureDesc {
        self.desc
    }

    pub fn is_detached(&self) -> bool {
        self.link.is_detached()
    }

    pub(crate) fn link(&self) -> &DeviceLink {
        &self.link
    }

    pub fn release(mut self) -> Release {
        self.link.release(ResourceId::Texture(self.id))
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        let _ = self.link.release(ResourceId::Texture(self.id));
    }
}
