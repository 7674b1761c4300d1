use super::{
    Blend, BlendOperation, CullMode, DirtyFlags, FillMode, SamplerFilterKey, StateCategory,
    TextureAddress, TextureFilter, UniformKind, UniformSlot, UniformStore,
};
use crate::arena::VertexFormat;
use crate::device::DeviceError;
use crate::resources::{IndexBufferId, TextureId, VertexBufferId};
use crate::shader::ShaderSlot;

/// The render state callers asked for. What the backend holds may lag behind until
/// the next commit.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub shader: Option<ShaderSlot>,
    pub alpha_test: bool,
    pub vertex_buffer: Option<VertexBufferId>,
    /// Format of the bound vertex buffer. Selects the arena layout to bind.
    pub vertex_format: Option<VertexFormat>,
    pub index_buffer: Option<IndexBufferId>,
    pub texture: Option<TextureId>,
    pub sampler_filter: SamplerFilterKey,
    pub address: TextureAddress,
    pub cull: CullMode,
    pub fill: FillMode,
    pub alpha_blend: bool,
    pub blend_operation: BlendOperation,
    pub source_blend: Blend,
    pub destination_blend: Blend,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            shader: None,
            alpha_test: false,
            vertex_buffer: None,
            vertex_format: None,
            index_buffer: None,
            texture: None,
            sampler_filter: SamplerFilterKey::default(),
            address: TextureAddress::Wrap,
            cull: CullMode::None,
            fill: FillMode::Solid,
            alpha_blend: false,
            blend_operation: BlendOperation::Add,
            source_blend: Blend::SourceAlpha,
            destination_blend: Blend::InverseSourceAlpha,
            depth_test: false,
            depth_write: false,
        }
    }
}

/// Pushes one state category to the backend.
pub trait ApplyState {
    fn apply(
        &mut self,
        category: StateCategory,
        state: &RenderState,
        uniforms: &UniformStore,
    ) -> Result<(), DeviceError>;
}

/// Pending render state plus one dirty bit per category.
///
/// Setters compare against the pending value and only dirty their category on a
/// real change. [`commit`](Self::commit) walks [`StateCategory::COMMIT_ORDER`] and
/// stops at the first failing category; that category and everything after it
/// stay dirty.
#[derive(Debug)]
pub struct StateTracker {
    state: RenderState,
    dirty: DirtyFlags,
    uniforms: UniformStore,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn update<T: PartialEq>(slot: &mut T, value: T, dirty: &mut DirtyFlags, flags: DirtyFlags) {
    if *slot != value {
        *slot = value;
        dirty.insert(flags);
    }
}

impl StateTracker {
    /// A fresh tracker has every category dirty; nothing has reached the backend yet.
    pub fn new() -> Self {
        Self {
            state: RenderState::default(),
            dirty: DirtyFlags::all(),
            uniforms: UniformStore::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    #[inline]
    pub fn uniforms(&self) -> &UniformStore {
        &self.uniforms
    }

    #[inline]
    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    #[inline]
    pub fn needs_commit(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn invalidate(&mut self, flags: DirtyFlags) {
        self.dirty.insert(flags);
    }

    pub fn force_all_dirty(&mut self) {
        self.dirty = DirtyFlags::all();
    }

    // ── shader / uniforms ─────────────────────────────────────────────────

    pub fn set_shader(&mut self, shader: Option<ShaderSlot>) {
        update(
            &mut self.state.shader,
            shader,
            &mut self.dirty,
            DirtyFlags::SHADER | DirtyFlags::UNIFORMS,
        );
    }

    pub fn set_alpha_test_enable(&mut self, enable: bool) {
        update(
            &mut self.state.alpha_test,
            enable,
            &mut self.dirty,
            DirtyFlags::SHADER | DirtyFlags::UNIFORMS,
        );
    }

    pub fn declare_uniform(&mut self, slot: UniformSlot, name: &str, kind: UniformKind) {
        self.uniforms.declare(slot, name, kind);
    }

    pub fn set_uniform(&mut self, slot: UniformSlot, values: &[f32]) -> Result<(), DeviceError> {
        if self.uniforms.set(slot, values)? {
            self.dirty.insert(DirtyFlags::UNIFORMS);
        }
        Ok(())
    }

    // ── buffers ───────────────────────────────────────────────────────────

    /// Binds a vertex buffer. Buffers of one format share an arena layout, so only
    /// a format change needs reapplying; the start index is read at draw time.
    pub fn set_vertex_buffer(&mut self, binding: Option<(VertexBufferId, VertexFormat)>) {
        let id = binding.map(|(id, _)| id);
        if self.state.vertex_buffer == id {
            return;
        }
        self.state.vertex_buffer = id;

        let format = binding.map(|(_, format)| format);
        update(
            &mut self.state.vertex_format,
            format,
            &mut self.dirty,
            DirtyFlags::VERTEX_BUFFER,
        );
    }

    pub fn set_index_buffer(&mut self, buffer: Option<IndexBufferId>) {
        update(
            &mut self.state.index_buffer,
            buffer,
            &mut self.dirty,
            DirtyFlags::INDEX_BUFFER,
        );
    }

    // ── textures ──────────────────────────────────────────────────────────

    pub fn set_texture(&mut self, texture: Option<TextureId>) {
        update(&mut self.state.texture, texture, &mut self.dirty, DirtyFlags::TEXTURES);
    }

    pub fn set_sampler_filter(
        &mut self,
        min: TextureFilter,
        mag: TextureFilter,
        mip: TextureFilter,
        max_anisotropy: f32,
    ) {
        let key = SamplerFilterKey::new(min, mag, mip, max_anisotropy);
        update(&mut self.state.sampler_filter, key, &mut self.dirty, DirtyFlags::TEXTURES);
    }

    pub fn set_sampler_state(&mut self, address: TextureAddress) {
        update(&mut self.state.address, address, &mut self.dirty, DirtyFlags::TEXTURES);
    }

    // ── fixed function ────────────────────────────────────────────────────

    pub fn set_cull_mode(&mut self, mode: CullMode) {
        update(&mut self.state.cull, mode, &mut self.dirty, DirtyFlags::RASTERIZER);
    }

    pub fn set_fill_mode(&mut self, mode: FillMode) {
        update(&mut self.state.fill, mode, &mut self.dirty, DirtyFlags::RASTERIZER);
    }

    pub fn set_alpha_blend_enable(&mut self, enable: bool) {
        update(&mut self.state.alpha_blend, enable, &mut self.dirty, DirtyFlags::BLEND);
    }

    pub fn set_blend_operation(&mut self, op: BlendOperation) {
        update(&mut self.state.blend_operation, op, &mut self.dirty, DirtyFlags::BLEND);
    }

    pub fn set_source_blend(&mut self, blend: Blend) {
        update(&mut self.state.source_blend, blend, &mut self.dirty, DirtyFlags::BLEND);
    }

    pub fn set_destination_blend(&mut self, blend: Blend) {
        update(&mut self.state.destination_blend, blend, &mut self.dirty, DirtyFlags::BLEND);
    }

    pub fn set_z_enable(&mut self, enable: bool) {
        update(&mut self.state.depth_test, enable, &mut self.dirty, DirtyFlags::DEPTH);
    }

    pub fn set_z_write_enable(&mut self, enable: bool) {
        update(&mut self.state.depth_write, enable, &mut self.dirty, DirtyFlags::DEPTH);
    }

    // ── destroyed resources ───────────────────────────────────────────────

    pub fn forget_vertex_buffer(&mut self, id: VertexBufferId) {
        if self.state.vertex_buffer == Some(id) {
            self.set_vertex_buffer(None);
        }
    }

    pub fn forget_index_buffer(&mut self, id: IndexBufferId) {
        if self.state.index_buffer == Some(id) {
            self.set_index_buffer(None);
        }
    }

    pub fn forget_texture(&mut self, id: TextureId) {
        if self.state.texture == Some(id) {
            self.set_texture(None);
        }
    }

    // ── commit ────────────────────────────────────────────────────────────

    /// Applies every dirty category in commit order.
    pub fn commit<A: ApplyState + ?Sized>(&mut self, applier: &mut A) -> Result<(), DeviceError> {
        for category in StateCategory::COMMIT_ORDER {
            let flag = category.flag();
            if !self.dirty.contains(flag) {
                continue;
            }
            applier.apply(category, &self.state, &self.uniforms)?;
            self.dirty.remove(flag);
        }
        Ok(())
    }
}
