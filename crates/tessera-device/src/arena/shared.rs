use slotmap::SlotMap;

use super::VertexFormat;

slotmap::new_key_type! {
    /// Generation-checked id of one logical buffer inside an arena.
    pub struct AllocationId;
}

/// Byte range a logical buffer occupies in its arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub offset: usize,
    pub size: usize,
    /// `offset / stride`; the first vertex index of this buffer inside the arena.
    pub start_index: u32,
}

/// One `copy_buffer` call issued while compacting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CopyRange {
    pub src_offset: usize,
    pub dst_offset: usize,
    pub len: usize,
}

/// Result of [`SharedBufferArena::plan_compaction`].
///
/// The caller creates a buffer of `new_capacity` bytes, executes `copies` from the old
/// buffer into it, then hands the plan back to [`SharedBufferArena::apply_compaction`].
/// Nothing in the arena changes until that last step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionPlan {
    pub old_capacity: usize,
    pub new_capacity: usize,
    pub copies: Vec<CopyRange>,
    pub relocations: Vec<(AllocationId, usize)>,
    pub next_pos: usize,
}

/// Capacity after growing a buffer of `current` bytes that must hold `required`.
///
/// The larger of the two is kept as-is when it leaves at least `required` bytes of
/// headroom, otherwise it is doubled.
pub fn grown_capacity(current: usize, required: usize) -> usize {
    let capacity = current.max(required);
    if capacity < required.saturating_mul(2) {
        capacity.saturating_mul(2)
    } else {
        capacity
    }
}

/// Bookkeeping for one large GPU buffer shared by every logical vertex buffer of a
/// format.
///
/// The arena never touches GPU memory itself. It hands out byte ranges with a bump
/// pointer (`next_pos`), forgets ranges on [`free`](Self::free), and reclaims the
/// holes only when an allocation no longer fits and the live ranges are packed
/// into a fresh buffer.
///
/// Invariants: `next_pos <= capacity`; live ranges are pairwise disjoint and lie in
/// `[0, next_pos)`.
#[derive(Debug)]
pub struct SharedBufferArena {
    format: VertexFormat,
    capacity: usize,
    next_pos: usize,
    live: SlotMap<AllocationId, Allocation>,
}

impl SharedBufferArena {
    pub fn new(format: VertexFormat, capacity: usize) -> Self {
        Self {
            format,
            capacity,
            next_pos: 0,
            live: SlotMap::with_key(),
        }
    }

    #[inline]
    pub fn format(&self) -> VertexFormat {
        self.format
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn next_pos(&self) -> usize {
        self.next_pos
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Sum of live allocation sizes.
    pub fn live_bytes(&self) -> usize {
        self.live.values().map(|a| a.size).sum()
    }

    /// Whether `size` more bytes fit behind the high-water mark.
    ///
    /// Holes left by freed allocations do not count; they are only reclaimed by
    /// compaction.
    #[inline]
    pub fn fits(&self, size: usize) -> bool {
        self.next_pos
            .checked_add(size)
            .is_some_and(|end| end <= self.capacity)
    }

    pub fn get(&self, id: AllocationId) -> Option<Allocation> {
        self.live.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AllocationId, Allocation)> + '_ {
        self.live.iter().map(|(id, a)| (id, *a))
    }

    /// Claims `size` bytes at the high-water mark. Returns `None` when the request
    /// does not fit; compact first.
    pub fn allocate(&mut self, size: usize) -> Option<(AllocationId, Allocation)> {
        if !self.fits(size) {
            return None;
        }

        let allocation = Allocation {
            offset: self.next_pos,
            size,
            start_index: self.start_index(self.next_pos),
        };
        self.next_pos += size;

        let id = self.live.insert(allocation);
        Some((id, allocation))
    }

    /// Forgets an allocation. The bytes become a hole until the next compaction.
    pub fn free(&mut self, id: AllocationId) -> Option<Allocation> {
        self.live.remove(id)
    }

    /// Puts back a range released by [`free`](Self::free). Refused once a compaction
    /// may have reused its bytes.
    pub fn reinstate(&mut self, allocation: Allocation) -> Option<AllocationId> {
        let end = allocation.offset.checked_add(allocation.size)?;
        let overlaps = self
            .live
            .values()
            .any(|a| a.offset < end && allocation.offset < a.offset + a.size);
        if end > self.next_pos
            || overlaps
            || allocation.start_index != self.start_index(allocation.offset)
        {
            return None;
        }
        Some(self.live.insert(allocation))
    }

    /// Plans packing every live allocation into a buffer big enough for `size` more
    /// bytes.
    ///
    /// Survivors keep their relative order. Runs of allocations that are adjacent in
    /// the old buffer become a single copy.
    pub fn plan_compaction(&self, size: usize) -> CompactionPlan {
        let required = self.live_bytes().saturating_add(size);
        let new_capacity = grown_capacity(self.capacity, required);

        let mut sorted: Vec<(AllocationId, Allocation)> = self.iter().collect();
        sorted.sort_by_key(|(_, a)| a.offset);

        let mut copies = Vec::new();
        let mut relocations = Vec::with_capacity(sorted.len());
        let mut write = 0usize;
        let mut run: Option<CopyRange> = None;

        for (id, a) in sorted {
            match run.as_mut() {
                Some(r) if r.src_offset + r.len == a.offset => r.len += a.size,
                _ => {
                    if let Some(r) = run.take() {
                        copies.push(r);
                    }
                    run = Some(CopyRange {
                        src_offset: a.offset,
                        dst_offset: write,
                        len: a.size,
                    });
                }
            }
            relocations.push((id, write));
            write += a.size;
        }
        copies.extend(run);
        copies.retain(|c| c.len > 0);

        CompactionPlan {
            old_capacity: self.capacity,
            new_capacity,
            copies,
            relocations,
            next_pos: write,
        }
    }

    /// Commits a plan produced by [`plan_compaction`](Self::plan_compaction) on this
    /// arena, after its copies have been executed.
    pub fn apply_compaction(&mut self, plan: &CompactionPlan) {
        for &(id, offset) in &plan.relocations {
            let start_index = self.start_index(offset);
            if let Some(a) = self.live.get_mut(id) {
                a.offset = offset;
                a.start_index = start_index;
            }
        }
        self.capacity = plan.new_capacity;
        self.next_pos = plan.next_pos;
    }

    #[inline]
    fn start_index(&self, offset: usize) -> u32 {
        (offset / self.format.stride()) as u32
    }
}
