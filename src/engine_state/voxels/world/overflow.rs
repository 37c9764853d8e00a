//! # Overflow Ledger
//!
//! Terrain jobs may place blocks (tree canopies) into neighbouring chunks. Those
//! writes are kept here, keyed by the chunk they target and the chunk that
//! produced them:
//!
//! - a target that is already generated receives them immediately
//! - a target that is not generated yet receives them before it is marked generated
//! - a target that is evicted and regenerated receives them again
//!
//! Writes are forgotten once their source chunk is evicted.

use std::collections::{HashMap, HashSet};

use crate::engine_state::voxels::{
    block::AIR,
    chunk::{ChunkCoord, ChunkError, VoxelChunk},
    terrain::OverflowWrite,
};

/// Pending cross-chunk writes.
#[derive(Debug, Default)]
pub struct OverflowLedger {
    /// target -> source -> writes
    pending: HashMap<ChunkCoord, HashMap<ChunkCoord, Vec<OverflowWrite>>>,
    /// source -> targets
    targets: HashMap<ChunkCoord, HashSet<ChunkCoord>>,
}

impl OverflowLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the overflow produced by `source`, replacing anything it produced before.
    pub fn record(&mut self, source: ChunkCoord, overflow: HashMap<ChunkCoord, Vec<OverflowWrite>>) {
        self.forget_source(source);
        for (target, writes) in overflow {
            if writes.is_empty() || target == source {
                continue;
            }
            self.pending.entry(target).or_default().insert(source, writes);
            self.targets.entry(source).or_default().insert(target);
        }
    }

    /// Drops every write produced by `source`.
    pub fn forget_source(&mut self, source: ChunkCoord) {
        let Some(targets) = self.targets.remove(&source) else {
            return;
        };
        for target in targets {
            if let Some(sources) = self.pending.get_mut(&target) {
                sources.remove(&source);
                if sources.is_empty() {
                    self.pending.remove(&target);
                }
            }
        }
    }

    /// Targets of the writes produced by `source`, sorted.
    pub fn targets_of(&self, source: ChunkCoord) -> Vec<ChunkCoord> {
        let mut targets: Vec<ChunkCoord> = self
            .targets
            .get(&source)
            .map(|targets| targets.iter().copied().collect())
            .unwrap_or_default();
        targets.sort();
        targets
    }

    /// Writes from one source into one target.
    pub fn writes_from(&self, source: ChunkCoord, target: ChunkCoord) -> &[OverflowWrite] {
        self.pending
            .get(&target)
            .and_then(|sources| sources.get(&source))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every write aimed at `target`, in source order.
    pub fn writes_for(&self, target: ChunkCoord) -> Vec<OverflowWrite> {
        let Some(sources) = self.pending.get(&target) else {
            return Vec::new();
        };
        let mut ordered: Vec<_> = sources.iter().collect();
        ordered.sort_by_key(|(source, _)| **source);
        ordered
            .into_iter()
            .flat_map(|(_, writes)| writes.iter().copied())
            .collect()
    }

    /// Number of targets with pending writes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no writes are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Applies writes to air cells of `chunk`.
///
/// # Returns
/// The local `(x, z)` columns that changed.
pub fn apply_writes(
    chunk: &mut VoxelChunk,
    writes: &[OverflowWrite],
) -> Result<Vec<(usize, usize)>, ChunkError> {
    let mut changed = Vec::new();
    for write in writes {
        if chunk.get(write.x, write.y, write.z)? == AIR {
            chunk.set(write.x, write.y, write.z, write.block)?;
            changed.push((write.x, write.z));
        }
    }
    Ok(changed)
}
