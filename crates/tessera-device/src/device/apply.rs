use super::render_device::DeviceCore;
use super::DeviceError;
use crate::backend::{Backend, BlendState, DepthState};
use crate::state::{ApplyState, RenderState, StateCategory, UniformStore};

impl<B: Backend> ApplyState for DeviceCore<B> {
    fn apply(
        &mut self,
        category: StateCategory,
        state: &RenderState,
        uniforms: &UniformStore,
    ) -> Result<(), DeviceError> {
        match category {
            StateCategory::Shader => self.apply_shader(state)?,
            StateCategory::VertexBuffer => self.apply_vertex_buffer(state)?,
            StateCategory::IndexBuffer => self.apply_index_buffer(state)?,
            StateCategory::Uniforms => self.apply_uniforms(state, uniforms)?,
            StateCategory::Textures => self.apply_textures(state)?,
            StateCategory::Rasterizer => {
                self.backend.set_rasterizer(state.cull, state.fill);
                self.check_error()?;
            }
            StateCategory::Blend => {
                let blend = state.alpha_blend.then_some(BlendState {
                    operation: state.blend_operation,
                    source: state.source_blend,
                    destination: state.destination_blend,
                });
                self.backend.set_blend(blend);
                self.check_error()?;
            }
            StateCategory::Depth => {
                let depth = state.depth_test.then_some(DepthState {
                    write: state.depth_write,
                });
                self.backend.set_depth(depth);
                self.check_error()?;
            }
        }

        self.stats.applies[category.index()] += 1;
        Ok(())
    }
}

impl<B: Backend> DeviceCore<B> {
    fn apply_shader(&mut self, state: &RenderState) -> Result<(), DeviceError> {
        let program = match state.shader {
            None => None,
            Some(slot) => {
                let shader = self
                    .shaders
                    .get_mut(slot, state.alpha_test)
                    .ok_or(DeviceError::UnknownShader(slot.0))?;
                Some(shader.program(&mut self.backend)?)
            }
        };
        self.backend.use_program(program);
        self.check_error()
    }

    /// The vertex array of the bound buffer's arena, if that arena has a buffer yet.
    fn bound_vertex_array(&self, state: &RenderState) -> Option<B::VertexArray> {
        state
            .vertex_format
            .and_then(|format| self.arenas[format.index()].array)
    }

    fn bound_index_buffer(&self, state: &RenderState) -> Option<B::Buffer> {
        state
            .index_buffer
            .and_then(|id| self.index_buffers.get(id))
            .and_then(|record| record.buffer)
    }

    fn apply_vertex_buffer(&mut self, state: &RenderState) -> Result<(), DeviceError> {
        let array = self.bound_vertex_array(state);
        self.backend.bind_vertex_array(array);
        // The element binding is vertex-array state; carry it over.
        if array.is_some() {
            let index_buffer = self.bound_index_buffer(state);
            self.backend.bind_index_buffer(index_buffer);
        }
        self.check_error()
    }

    fn apply_index_buffer(&mut self, state: &RenderState) -> Result<(), DeviceError> {
        if self.bound_vertex_array(state).is_some() {
            let index_buffer = self.bound_index_buffer(state);
            self.backend.bind_index_buffer(index_buffer);
        }
        self.check_error()
    }

    fn apply_uniforms(
        &mut self,
        state: &RenderState,
        uniforms: &UniformStore,
    ) -> Result<(), DeviceError> {
        if let Some(shader) = state
            .shader
            .and_then(|slot| self.shaders.get_mut(slot, state.alpha_test))
        {
            let pushed = shader.push_changed(&mut self.backend, uniforms);
            if pushed > 0 {
                log::trace!("pushed {pushed} uniforms to {}", shader.name());
            }
        }
        self.check_error()
    }

    fn apply_textures(&mut self, state: &RenderState) -> Result<(), DeviceError> {
        let bound = state
            .texture
            .and_then(|id| self.textures.get(id).map(|record| (id, record.desc.kind)));

        match bound {
            None => self.backend.bind_texture(0, None),
            Some((id, kind)) => {
                let texture = self.gpu_texture(id)?;
                self.backend.bind_texture(0, Some((texture, kind)));

                let sampler = self
                    .samplers
                    .get_or_create(&mut self.backend, state.sampler_filter, state.address)
                    .map_err(|e| DeviceError::construction("sampler", e))?;
                if self.bound_sampler != Some(sampler) {
                    self.backend.bind_sampler(0, Some(sampler));
                    self.bound_sampler = Some(sampler);
                }
            }
        }
        self.check_error()
    }
}
