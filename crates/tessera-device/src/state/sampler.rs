use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use anyhow::Result;

use super::{TextureAddress, TextureFilter};
use crate::backend::{Backend, SamplerDesc};

/// Minification filter as the backend sees it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    NearestMipmapLinear,
    LinearMipmapNearest,
    LinearMipmapLinear,
}

impl MinFilter {
    /// Combines the texel filter with the mip filter.
    pub fn from_filters(filter: TextureFilter, mip: TextureFilter) -> Self {
        let nearest = filter.is_nearest();
        match mip {
            TextureFilter::Linear => {
                if nearest {
                    MinFilter::LinearMipmapNearest
                } else {
                    MinFilter::LinearMipmapLinear
                }
            }
            TextureFilter::Point => {
                if nearest {
                    MinFilter::NearestMipmapNearest
                } else {
                    MinFilter::NearestMipmapLinear
                }
            }
            TextureFilter::None | TextureFilter::Anisotropic => {
                if nearest {
                    MinFilter::Nearest
                } else {
                    MinFilter::Linear
                }
            }
        }
    }

    pub fn uses_mipmaps(self) -> bool {
        !matches!(self, MinFilter::Nearest | MinFilter::Linear)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MagFilter {
    Nearest,
    Linear,
}

impl From<TextureFilter> for MagFilter {
    fn from(filter: TextureFilter) -> Self {
        if filter.is_nearest() {
            MagFilter::Nearest
        } else {
            MagFilter::Linear
        }
    }
}

/// Filter part of a sampler key. The wrap mode picks one of two samplers per key.
#[derive(Debug, Copy, Clone)]
pub struct SamplerFilterKey {
    pub min: MinFilter,
    pub mag: MagFilter,
    pub max_anisotropy: f32,
}

impl SamplerFilterKey {
    pub fn new(
        min: TextureFilter,
        mag: TextureFilter,
        mip: TextureFilter,
        max_anisotropy: f32,
    ) -> Self {
        Self {
            min: MinFilter::from_filters(min, mip),
            mag: mag.into(),
            max_anisotropy,
        }
    }
}

impl Default for SamplerFilterKey {
    fn default() -> Self {
        Self::new(TextureFilter::None, TextureFilter::None, TextureFilter::None, 0.0)
    }
}

// Anisotropy compares by bit pattern so the key can be hashed.
impl PartialEq for SamplerFilterKey {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min
            && self.mag == other.mag
            && self.max_anisotropy.to_bits() == other.max_anisotropy.to_bits()
    }
}

impl Eq for SamplerFilterKey {}

impl Hash for SamplerFilterKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.min.hash(state);
        self.mag.hash(state);
        self.max_anisotropy.to_bits().hash(state);
    }
}

/// Interned backend samplers, one per distinct filter key and wrap mode.
#[derive(Debug)]
pub struct SamplerCache<B: Backend> {
    samplers: HashMap<SamplerFilterKey, [Option<B::Sampler>; 2]>,
}

impl<B: Backend> Default for SamplerCache<B> {
    fn default() -> Self {
        Self {
            samplers: HashMap::new(),
        }
    }
}

impl<B: Backend> SamplerCache<B> {
    pub fn get_or_create(
        &mut self,
        backend: &mut B,
        key: SamplerFilterKey,
        wrap: TextureAddress,
    ) -> Result<B::Sampler> {
        let slot = &mut self.samplers.entry(key).or_insert([None, None])[wrap.index()];
        if let Some(sampler) = *slot {
            return Ok(sampler);
        }

        let sampler = backend.create_sampler(&SamplerDesc { key, wrap })?;
        log::trace!("created sampler {key:?} {wrap:?}");
        *slot = Some(sampler);
        Ok(sampler)
    }

    pub fn len(&self) -> usize {
        self.samplers.values().flatten().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn release_all(&mut self, backend: &mut B) {
        for sampler in self.samplers.drain().flat_map(|(_, pair)| pair).flatten() {
            backend.delete_sampler(sampler);
        }
    }
}
