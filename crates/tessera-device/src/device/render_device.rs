use std::sync::Arc;

use slotmap::SlotMap;

use super::{DeviceConfig, DeviceError, DeviceStats};
use crate::arena::{Allocation, AllocationId, SharedBufferArena, VertexFormat};
use crate::backend::{Backend, BufferTarget, BufferUsage, RenderContext};
use crate::logging::DebugLog;
use crate::paint::PixelColor;
use crate::resources::{
    CubeMapFace, DeletionQueue, DeviceLink, IndexBuffer, IndexBufferId, Texture, TextureDesc,
    TextureId, TextureKind, VertexBuffer, VertexBufferId,
};
use crate::shader::{ShaderManager, ShaderSlot};
use crate::state::{
    Blend, BlendOperation, CullMode, DirtyFlags, FillMode, RenderState, SamplerCache,
    StateTracker, TextureAddress, TextureFilter, UniformKind, UniformSlot,
};

pub(super) struct VertexBufferRecord {
    pub format: VertexFormat,
    pub allocation: Option<AllocationId>,
}

pub(super) struct IndexBufferRecord<B: Backend> {
    pub buffer: Option<B::Buffer>,
}

pub(super) struct TextureRecord<B: Backend> {
    pub desc: TextureDesc,
    /// CPU copy per face; empty until pixels are set.
    pub pixels: Vec<Vec<PixelColor>>,
    pub gpu: Option<B::Texture>,
    /// Framebuffer and whether it has a depth attachment.
    pub target: Option<(B::Framebuffer, bool)>,
    pub pbo: Option<B::Buffer>,
}

pub(super) struct ArenaBuffer<B: Backend> {
    pub arena: SharedBufferArena,
    pub buffer: Option<B::Buffer>,
    pub array: Option<B::VertexArray>,
}

/// Everything the commit path touches. Split from [`RenderDevice`] so the state
/// tracker can borrow it mutably while applying.
pub(super) struct DeviceCore<B: Backend> {
    pub backend: B,
    pub context: Box<dyn RenderContext>,
    /// Set by `begin_frame`, cleared by `end_frame`.
    pub context_is_current: bool,
    pub shaders: ShaderManager<B>,
    pub arenas: Vec<ArenaBuffer<B>>,
    pub vertex_buffers: SlotMap<VertexBufferId, VertexBufferRecord>,
    pub index_buffers: SlotMap<IndexBufferId, IndexBufferRecord<B>>,
    pub textures: SlotMap<TextureId, TextureRecord<B>>,
    pub samplers: SamplerCache<B>,
    pub bound_sampler: Option<B::Sampler>,
    pub stream: Option<(B::Buffer, B::VertexArray)>,
    pub stats: DeviceStats,
}

impl<B: Backend> DeviceCore<B> {
    /// Reports a context that is not current, then the backend's error flag.
    pub fn check_error(&mut self) -> Result<(), DeviceError> {
        if !self.context.is_current() {
            return Err(DeviceError::ContextNotCurrent);
        }
        match self.backend.poll_error() {
            Some(code) => Err(DeviceError::Backend { code }),
            None => Ok(()),
        }
    }

    /// Makes the context current unless a frame is in progress.
    pub fn ensure_current(&mut self) {
        if !self.context_is_current && !self.context.make_current() {
            log::warn!("failed to make the rendering context current");
        }
    }

    pub fn allocation(&self, id: VertexBufferId) -> Option<(Allocation, VertexFormat)> {
        let record = self.vertex_buffers.get(id)?;
        let allocation = record.allocation?;
        self.arenas[record.format.index()]
            .arena
            .get(allocation)
            .map(|a| (a, record.format))
    }

    /// Returns the backend texture, creating it and uploading stored pixels first.
    pub fn gpu_texture(&mut self, id: TextureId) -> Result<B::Texture, DeviceError> {
        let record = self
            .textures
            .get_mut(id)
            .ok_or(DeviceError::StaleHandle("texture"))?;
        if let Some(texture) = record.gpu {
            return Ok(texture);
        }

        let texture = self
            .backend
            .create_texture(&record.desc)
            .map_err(|e| DeviceError::construction("texture", e))?;
        for (index, pixels) in record.pixels.iter().enumerate() {
            if pixels.is_empty() {
                continue;
            }
            let face = match record.desc.kind {
                TextureKind::Flat => None,
                TextureKind::Cube => Some(CubeMapFace::ALL[index]),
            };
            self.backend.upload_texture(texture, &record.desc, face, pixels);
        }
        record.gpu = Some(texture);
        Ok(texture)
    }

    /// Claims `size` bytes in the arena for `format`, compacting when the request
    /// does not fit. The flag is true when the arena's buffer was replaced.
    pub fn allocate_vertices(
        &mut self,
        format: VertexFormat,
        size: usize,
    ) -> Result<(AllocationId, Allocation, bool), DeviceError> {
        let index = format.index();
        let needs_buffer =
            self.arenas[index].buffer.is_none() || !self.arenas[index].arena.fits(size);
        if needs_buffer {
            self.rebuild_arena(format, size)?;
        }

        let slot = &mut self.arenas[index];
        let (id, allocation) = slot
            .arena
            .allocate(size)
            .ok_or_else(|| DeviceError::Construction {
                what: "vertex allocation",
                message: format!("{size} bytes do not fit after compaction"),
            })?;
        Ok((id, allocation, needs_buffer))
    }

    /// Moves every live allocation into a new buffer with room for `size` more
    /// bytes. The arena only changes once the copies went through.
    fn rebuild_arena(&mut self, format: VertexFormat, size: usize) -> Result<(), DeviceError> {
        let index = format.index();
        let plan = self.arenas[index].arena.plan_compaction(size);
        let old_buffer = self.arenas[index].buffer;
        let old_array = self.arenas[index].array;

        let buffer = self
            .backend
            .create_buffer(BufferTarget::Vertex, plan.new_capacity, BufferUsage::Static)
            .map_err(|e| DeviceError::construction("vertex arena", e))?;
        let array = match self.backend.create_vertex_array(format, buffer) {
            Ok(array) => array,
            Err(e) => {
                self.backend.delete_buffer(buffer);
                return Err(DeviceError::construction("vertex layout", e));
            }
        };

        if let Some(old) = old_buffer {
            for copy in &plan.copies {
                self.backend
                    .copy_buffer(old, buffer, copy.src_offset, copy.dst_offset, copy.len);
            }
        }
        if let Err(err) = self.check_error() {
            self.backend.delete_vertex_array(array);
            self.backend.delete_buffer(buffer);
            return Err(err);
        }

        let slot = &mut self.arenas[index];
        slot.arena.apply_compaction(&plan);
        slot.buffer = Some(buffer);
        slot.array = Some(array);

        if let Some(old) = old_array {
            self.backend.delete_vertex_array(old);
        }
        if let Some(old) = old_buffer {
            self.backend.delete_buffer(old);

            let moved: usize = plan.copies.iter().map(|c| c.len).sum();
            self.stats.compactions += 1;
            self.stats.bytes_relocated += moved as u64;
            if plan.new_capacity > plan.old_capacity {
                log::info!(
                    "{format:?} arena grew {} -> {} bytes",
                    plan.old_capacity,
                    plan.new_capacity
                );
            }
            log::debug!(
                "{format:?} arena compacted: {} allocations, {} copies, {moved} bytes",
                plan.relocations.len(),
                plan.copies.len()
            );
        } else {
            log::debug!("{format:?} arena created with {} bytes", plan.new_capacity);
        }
        Ok(())
    }

    pub fn destroy_vertex_buffer(&mut self, id: VertexBufferId) {
        if let Some(record) = self.vertex_buffers.remove(id) {
            if let Some(allocation) = record.allocation {
                self.arenas[record.format.index()].arena.free(allocation);
            }
        }
    }

    pub fn destroy_index_buffer(&mut self, id: IndexBufferId) {
        if let Some(IndexBufferRecord {
            buffer: Some(buffer),
        }) = self.index_buffers.remove(id)
        {
            self.backend.delete_buffer(buffer);
        }
    }

    pub fn destroy_texture(&mut self, id: TextureId) {
        if let Some(record) = self.textures.remove(id) {
            self.delete_texture_objects(record);
        }
    }

    fn delete_texture_objects(&mut self, record: TextureRecord<B>) {
        if let Some((framebuffer, _)) = record.target {
            self.backend.delete_framebuffer(framebuffer);
        }
        if let Some(pbo) = record.pbo {
            self.backend.delete_buffer(pbo);
        }
        if let Some(texture) = record.gpu {
            self.backend.delete_texture(texture);
        }
    }

    /// Deletes every backend object the device still owns.
    fn release_all(&mut self) {
        for (_, record) in std::mem::take(&mut self.index_buffers) {
            if let Some(buffer) = record.buffer {
                self.backend.delete_buffer(buffer);
            }
        }
        self.vertex_buffers.clear();
        for (_, record) in std::mem::take(&mut self.textures) {
            self.delete_texture_objects(record);
        }
        for slot in &mut self.arenas {
            if let Some(array) = slot.array.take() {
                self.backend.delete_vertex_array(array);
            }
            if let Some(buffer) = slot.buffer.take() {
                self.backend.delete_buffer(buffer);
            }
        }
        if let Some((buffer, array)) = self.stream.take() {
            self.backend.delete_vertex_array(array);
            self.backend.delete_buffer(buffer);
        }
        self.shaders.release_all(&mut self.backend);
        self.samplers.release_all(&mut self.backend);
        self.bound_sampler = None;
    }
}

/// Retained-state render device over a [`Backend`].
///
/// State setters only record what the caller wants; the backend sees the changes
/// when a draw commits them. Vertex data lives in one shared arena per vertex
/// format. Handles may be dropped on any thread; their GPU objects are destroyed
/// at the next [`present`](Self::present) or when the device is dropped.
///
/// Fallible operations return [`DeviceError`] and also keep the message for
/// [`take_last_error`](Self::take_last_error).
pub struct RenderDevice<B: Backend> {
    pub(super) tracker: StateTracker,
    pub(super) core: DeviceCore<B>,
    pub(super) deletions: Arc<DeletionQueue>,
    last_error: Option<String>,
}

impl<B: Backend> RenderDevice<B> {
    /// Creates a device on `context`, which becomes current on the calling thread.
    pub fn new(
        mut backend: B,
        context: impl RenderContext + 'static,
        config: DeviceConfig,
    ) -> Result<Self, DeviceError> {
        let mut context: Box<dyn RenderContext> = Box::new(context);
        if !context.make_current() {
            return Err(DeviceError::ContextNotCurrent);
        }

        if config.debug_output {
            backend.enable_debug_output(DebugLog::new(&config.debug_log_path));
            log::debug!("backend diagnostics -> {}", config.debug_log_path.display());
        }

        let arenas = VertexFormat::ALL
            .iter()
            .map(|&format| ArenaBuffer {
                arena: SharedBufferArena::new(format, config.initial_arena_capacity),
                buffer: None,
                array: None,
            })
            .collect();

        let mut core = DeviceCore {
            backend,
            context,
            context_is_current: false,
            shaders: ShaderManager::default(),
            arenas,
            vertex_buffers: SlotMap::with_key(),
            index_buffers: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            samplers: SamplerCache::default(),
            bound_sampler: None,
            stream: None,
            stats: DeviceStats::default(),
        };
        core.check_error()?;

        log::info!(
            "render device created ({}x{}, {} byte arenas)",
            core.context.width(),
            core.context.height(),
            config.initial_arena_capacity
        );

        Ok(Self {
            tracker: StateTracker::new(),
            core,
            deletions: Arc::new(DeletionQueue::new()),
            last_error: None,
        })
    }

    // ── errors ────────────────────────────────────────────────────────────

    /// Keeps the message of a failed result in the last-error slot.
    pub(super) fn record<T>(&mut self, result: Result<T, DeviceError>) -> Result<T, DeviceError> {
        if let Err(err) = &result {
            log::warn!("{err}");
            self.last_error = Some(err.to_string());
        }
        result
    }

    /// Returns and clears the most recent error message.
    pub fn take_last_error(&mut self) -> Option<String> {
        self.last_error.take()
    }

    // ── handle validation ─────────────────────────────────────────────────

    pub(super) fn vertex_buffer_id(
        &self,
        buffer: &VertexBuffer,
    ) -> Result<VertexBufferId, DeviceError> {
        if buffer.link().belongs_to(&self.deletions)
            && self.core.vertex_buffers.contains_key(buffer.id())
        {
            Ok(buffer.id())
        } else {
            Err(DeviceError::StaleHandle("vertex buffer"))
        }
    }

    pub(super) fn index_buffer_id(
        &self,
        buffer: &IndexBuffer,
    ) -> Result<IndexBufferId, DeviceError> {
        if buffer.link().belongs_to(&self.deletions)
            && self.core.index_buffers.contains_key(buffer.id())
        {
            Ok(buffer.id())
        } else {
            Err(DeviceError::StaleHandle("index buffer"))
        }
    }

    pub(super) fn texture_id(&self, texture: &Texture) -> Result<TextureId, DeviceError> {
        if texture.link().belongs_to(&self.deletions)
            && self.core.textures.contains_key(texture.id())
        {
            Ok(texture.id())
        } else {
            Err(DeviceError::StaleHandle("texture"))
        }
    }

    // ── resources ─────────────────────────────────────────────────────────

    pub fn create_vertex_buffer(&mut self) -> VertexBuffer {
        let id = self.core.vertex_buffers.insert(VertexBufferRecord {
            format: VertexFormat::Flat,
            allocation: None,
        });
        VertexBuffer::new(id, DeviceLink::new(&self.deletions))
    }

    pub fn create_index_buffer(&mut self) -> IndexBuffer {
        let id = self
            .core
            .index_buffers
            .insert(IndexBufferRecord { buffer: None });
        IndexBuffer::new(id, DeviceLink::new(&self.deletions))
    }

    pub fn create_texture(&mut self, width: u32, height: u32) -> Texture {
        self.insert_texture(TextureDesc::flat(width, height))
    }

    pub fn create_cube_texture(&mut self, size: u32) -> Texture {
        self.insert_texture(TextureDesc::cube(size))
    }

    fn insert_texture(&mut self, desc: TextureDesc) -> Texture {
        let id = self.core.textures.insert(TextureRecord {
            desc,
            pixels: vec![Vec::new(); desc.face_count()],
            gpu: None,
            target: None,
            pbo: None,
        });
        Texture::new(id, desc, DeviceLink::new(&self.deletions))
    }

    /// Destroys everything released since the last drain. Needs the context current.
    pub(super) fn drain_deletions(&mut self) {
        let core = &mut self.core;
        let tracker = &mut self.tracker;
        let drained = self.deletions.drain_with(|pending| {
            for &id in &pending.index_buffers {
                tracker.forget_index_buffer(id);
                core.destroy_index_buffer(id);
            }
            for &id in &pending.vertex_buffers {
                tracker.forget_vertex_buffer(id);
                core.destroy_vertex_buffer(id);
            }
            for &id in &pending.textures {
                tracker.forget_texture(id);
                core.destroy_texture(id);
            }
        });

        if drained > 0 {
            self.core.stats.deletions_drained += drained as u64;
            log::debug!("destroyed {drained} released resources");
        }
    }

    // ── shaders and uniforms ──────────────────────────────────────────────

    /// Registers shader sources under `slot`. Compilation happens on first bind.
    pub fn declare_shader(&mut self, slot: ShaderSlot, name: &str, vertex: &str, fragment: &str) {
        self.core.ensure_current();
        self.core
            .shaders
            .declare(&mut self.core.backend, slot, name, vertex, fragment);
        if self.tracker.state().shader == Some(slot) {
            self.tracker
                .invalidate(DirtyFlags::SHADER | DirtyFlags::UNIFORMS);
        }
    }

    pub fn declare_uniform(&mut self, slot: UniformSlot, name: &str, kind: UniformKind) {
        self.tracker.declare_uniform(slot, name, kind);
    }

    pub fn set_shader(&mut self, slot: ShaderSlot) {
        self.tracker.set_shader(Some(slot));
    }

    pub fn set_uniform(&mut self, slot: UniformSlot, values: &[f32]) -> Result<(), DeviceError> {
        let result = self.tracker.set_uniform(slot, values);
        self.record(result)
    }

    // ── state setters ─────────────────────────────────────────────────────

    pub fn set_vertex_buffer(&mut self, buffer: Option<&VertexBuffer>) -> Result<(), DeviceError> {
        let binding = match buffer {
            None => None,
            Some(buffer) => {
                let id = self.vertex_buffer_id(buffer);
                let id = self.record(id)?;
                Some((id, self.core.vertex_buffers[id].format))
            }
        };
        self.tracker.set_vertex_buffer(binding);
        Ok(())
    }

    pub fn set_index_buffer(&mut self, buffer: Option<&IndexBuffer>) -> Result<(), DeviceError> {
        let id = buffer.map(|b| self.index_buffer_id(b)).transpose();
        let id = self.record(id)?;
        self.tracker.set_index_buffer(id);
        Ok(())
    }

    pub fn set_texture(&mut self, texture: Option<&Texture>) -> Result<(), DeviceError> {
        let id = texture.map(|t| self.texture_id(t)).transpose();
        let id = self.record(id)?;
        self.tracker.set_texture(id);
        Ok(())
    }

    pub fn set_alpha_blend_enable(&mut self, enable: bool) {
        self.tracker.set_alpha_blend_enable(enable);
    }

    /// Selects the alpha-test variant of the bound shader.
    pub fn set_alpha_test_enable(&mut self, enable: bool) {
        self.tracker.set_alpha_test_enable(enable);
    }

    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.tracker.set_cull_mode(mode);
    }

    pub fn set_blend_operation(&mut self, op: BlendOperation) {
        self.tracker.set_blend_operation(op);
    }

    pub fn set_source_blend(&mut self, blend: Blend) {
        self.tracker.set_source_blend(blend);
    }

    pub fn set_destination_blend(&mut self, blend: Blend) {
        self.tracker.set_destination_blend(blend);
    }

    pub fn set_fill_mode(&mut self, mode: FillMode) {
        self.tracker.set_fill_mode(mode);
    }

    /// Accepted for interface compatibility; multisampling is fixed at context creation.
    pub fn set_multisample_antialias(&mut self, _enable: bool) {}

    pub fn set_z_enable(&mut self, enable: bool) {
        self.tracker.set_z_enable(enable);
    }

    pub fn set_z_write_enable(&mut self, enable: bool) {
        self.tracker.set_z_write_enable(enable);
    }

    pub fn set_sampler_filter(
        &mut self,
        min: TextureFilter,
        mag: TextureFilter,
        mip: TextureFilter,
        max_anisotropy: f32,
    ) {
        self.tracker.set_sampler_filter(min, mag, mip, max_anisotropy);
    }

    pub fn set_sampler_state(&mut self, address: TextureAddress) {
        self.tracker.set_sampler_state(address);
    }

    // ── inspection ────────────────────────────────────────────────────────

    pub fn backend(&self) -> &B {
        &self.core.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.core.backend
    }

    pub fn stats(&self) -> &DeviceStats {
        &self.core.stats
    }

    pub fn state(&self) -> &RenderState {
        self.tracker.state()
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.tracker.dirty()
    }

    pub fn arena(&self, format: VertexFormat) -> &SharedBufferArena {
        &self.core.arenas[format.index()].arena
    }

    pub fn arena_buffer(&self, format: VertexFormat) -> Option<B::Buffer> {
        self.core.arenas[format.index()].buffer
    }

    /// Where the buffer's data currently sits in its arena.
    pub fn vertex_buffer_range(&self, buffer: &VertexBuffer) -> Option<Allocation> {
        let id = self.vertex_buffer_id(buffer).ok()?;
        let record = &self.core.vertex_buffers[id];
        self.core.arenas[record.format.index()]
            .arena
            .get(record.allocation?)
    }

    pub fn index_buffer_object(&self, buffer: &IndexBuffer) -> Option<B::Buffer> {
        let id = self.index_buffer_id(buffer).ok()?;
        self.core.index_buffers[id].buffer
    }

    /// The backend texture, if it has been created yet.
    pub fn texture_object(&self, texture: &Texture) -> Option<B::Texture> {
        let id = self.texture_id(texture).ok()?;
        self.core.textures[id].gpu
    }

    pub fn pending_deletions(&self) -> usize {
        self.deletions.len()
    }

    pub fn is_frame_active(&self) -> bool {
        self.core.context_is_current
    }
}

impl<B: Backend> Drop for RenderDevice<B> {
    fn drop(&mut self) {
        if !self.core.context.make_current() {
            log::warn!("dropping render device without a current context");
        }
        self.drain_deletions();
        self.core.release_all();
        self.core.context.clear_current();
        log::info!("render device destroyed");
    }
}
