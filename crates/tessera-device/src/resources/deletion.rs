use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::{IndexBufferId, TextureId, VertexBufferId};

/// Outcome of releasing a handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[must_use]
pub enum Release {
    /// The owning device is alive; the GPU object goes away at its next drain.
    Queued,
    /// No device owns the resource any more; nothing was left to destroy.
    Freed,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ResourceId {
    VertexBuffer(VertexBufferId),
    IndexBuffer(IndexBufferId),
    Texture(TextureId),
}

/// Ids waiting for destruction, one list per resource type.
#[derive(Debug, Default)]
pub struct PendingDeletes {
    pub index_buffers: Vec<IndexBufferId>,
    pub vertex_buffers: Vec<VertexBufferId>,
    pub textures: Vec<TextureId>,
}

impl PendingDeletes {
    pub fn len(&self) -> usize {
        self.index_buffers.len() + self.vertex_buffers.len() + self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-device staging area for resources released from any thread.
///
/// Handles push ids here; the device drains it while its context is current.
#[derive(Debug, Default)]
pub struct DeletionQueue {
    pending: Mutex<PendingDeletes>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn enqueue(&self, id: ResourceId) {
        let mut pending = self.pending.lock();
        match id {
            ResourceId::VertexBuffer(id) => pending.vertex_buffers.push(id),
            ResourceId::IndexBuffer(id) => pending.index_buffers.push(id),
            ResourceId::Texture(id) => pending.textures.push(id),
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs `destroy` on the pending lists with the lock held, then clears them.
    ///
    /// Holding the lock keeps a concurrent release from racing the destruction.
    pub fn drain_with<F>(&self, destroy: F) -> usize
    where
        F: FnOnce(&PendingDeletes),
    {
        let mut pending = self.pending.lock();
        let count = pending.len();
        if count == 0 {
            return 0;
        }
        destroy(&pending);
        *pending = PendingDeletes::default();
        count
    }
}

/// A handle's link back to the device that created it.
///
/// The link only reaches the device's deletion queue. Once the device is gone the
/// upgrade fails and the handle is detached.
#[derive(Debug, Default)]
pub struct DeviceLink {
    queue: Weak<DeletionQueue>,
}

impl DeviceLink {
    pub(crate) fn new(queue: &Arc<DeletionQueue>) -> Self {
        Self {
            queue: Arc::downgrade(queue),
        }
    }

    /// A link that never had a device.
    pub fn detached() -> Self {
        Self::default()
    }

    pub fn is_detached(&self) -> bool {
        self.queue.strong_count() == 0
    }

    pub(crate) fn belongs_to(&self, queue: &Arc<DeletionQueue>) -> bool {
        !self.is_detached() && std::ptr::eq(self.queue.as_ptr(), Arc::as_ptr(queue))
    }

    /// Hands the resource to the owning device's queue. Only the first call does
    /// anything; the link is detached afterwards.
    pub(crate) fn release(&mut self, id: ResourceId) -> Release {
        match std::mem::take(&mut self.queue).upgrade() {
            Some(queue) => {
                queue.enqueue(id);
                Release::Queued
            }
            None => Release::Freed,
        }
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    fn texture_id() -> TextureId {
        let mut ids: SlotMap<TextureId, ()> = SlotMap::with_key();
        ids.insert(())
    }

    #[test]
    fn release_with_live_queue_enqueues_once() {
        let queue = Arc::new(DeletionQueue::new());
        let mut link = DeviceLink::new(&queue);
        let id = texture_id();

        assert_eq!(link.release(ResourceId::Texture(id)), Release::Queued);
        assert_eq!(link.release(ResourceId::Texture(id)), Release::Freed);
        assert_eq!(queue.len(), 1);
        assert!(link.is_detached());
    }

    #[test]
    fn release_after_queue_dropped_frees() {
        let queue = Arc::new(DeletionQueue::new());
        let mut link = DeviceLink::new(&queue);
        drop(queue);

        assert!(link.is_detached());
        assert_eq!(link.release(ResourceId::Texture(texture_id())), Release::Freed);
    }

    #[test]
    fn drain_clears_lists() {
        let queue = Arc::new(DeletionQueue::new());
        queue.enqueue(ResourceId::Texture(texture_id()));
        queue.enqueue(ResourceId::Texture(texture_id()));

        let mut seen = 0;
        assert_eq!(queue.drain_with(|p| seen = p.textures.len()), 2);
        assert_eq!(seen, 2);
        assert!(queue.is_empty());
        assert_eq!(queue.drain_with(|_| unreachable!()), 0);
    }

    #[test]
    fn belongs_to_distinguishes_queues() {
        let a = Arc::new(DeletionQueue::new());
        let b = Arc::new(DeletionQueue::new());
        let link = DeviceLink::new(&a);

        assert!(link.belongs_to(&a));
        assert!(!link.belongs_to(&b));
        assert!(!DeviceLink::detached().belongs_to(&a));
    }
}
