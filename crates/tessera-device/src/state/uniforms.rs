use crate::device::DeviceError;

/// Index of a declared uniform. Callers pick the numbering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformSlot(pub u16);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformKind {
    /// Number of floats a backend push consumes.
    pub const fn components(self) -> usize {
        match self {
            UniformKind::Float => 1,
            UniformKind::Vec2 => 2,
            UniformKind::Vec3 => 3,
            UniformKind::Vec4 => 4,
            UniformKind::Mat4 => 16,
        }
    }

    /// Floats reserved in the store. Scalars and vectors share a 4-float slot.
    pub const fn slot_len(self) -> usize {
        match self {
            UniformKind::Mat4 => 16,
            _ => 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UniformInfo {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
    /// Store-wide counter value of the last real change. Starts at 0, so a
    /// uniform that was never set is never pushed.
    pub version: u64,
}

/// Flat storage for every declared uniform value.
#[derive(Debug, Default)]
pub struct UniformStore {
    infos: Vec<Option<UniformInfo>>,
    data: Vec<f32>,
    /// Source of versions. Only grows, across redeclarations too.
    clock: u64,
}

impl UniformStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `slot` under the shader-side `name`. Redeclaring a slot gives it
    /// zeroed storage, reusing the old range when the size matches.
    pub fn declare(&mut self, slot: UniformSlot, name: &str, kind: UniformKind) {
        let index = usize::from(slot.0);
        if self.infos.len() <= index {
            self.infos.resize(index + 1, None);
        }

        let previous = self.infos[index].take();
        let (offset, version) = match previous {
            Some(old) if old.kind.slot_len() == kind.slot_len() => {
                self.data[old.offset..old.offset + kind.slot_len()].fill(0.0);
                let version = if old.name == name { old.version } else { 0 };
                (old.offset, version)
            }
            _ => {
                let offset = self.data.len();
                self.data.resize(offset + kind.slot_len(), 0.0);
                (offset, 0)
            }
        };
        self.infos[index] = Some(UniformInfo {
            name: name.to_owned(),
            kind,
            offset,
            version,
        });
    }

    /// Stores `values` into the slot. Returns `Ok(false)` when the stored bits are
    /// already identical.
    pub fn set(&mut self, slot: UniformSlot, values: &[f32]) -> Result<bool, DeviceError> {
        let info = self
            .infos
            .get_mut(usize::from(slot.0))
            .and_then(Option::as_mut)
            .ok_or(DeviceError::UnknownUniform(slot.0))?;

        let capacity = info.kind.slot_len();
        if values.len() > capacity {
            return Err(DeviceError::UniformOverflow {
                slot: slot.0,
                len: values.len(),
                capacity,
            });
        }

        let dest = &mut self.data[info.offset..info.offset + values.len()];
        let same = dest
            .iter()
            .zip(values)
            .all(|(a, b)| a.to_bits() == b.to_bits());
        if same {
            return Ok(false);
        }

        dest.copy_from_slice(values);
        self.clock += 1;
        info.version = self.clock;
        Ok(true)
    }

    /// Number of slot indices in use (declared or not).
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn info(&self, slot: UniformSlot) -> Option<&UniformInfo> {
        self.infos.get(usize::from(slot.0)).and_then(Option::as_ref)
    }

    /// The floats a push sends for this uniform (`kind.components()` of them).
    pub fn values(&self, info: &UniformInfo) -> &[f32] {
        &self.data[info.offset..info.offset + info.kind.components()]
    }

    /// Declared uniforms with their slot index.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &UniformInfo)> + '_ {
        self.infos
            .iter()
            .enumerate()
            .filter_map(|(i, info)| info.as_ref().map(|info| (i, info)))
    }
}
