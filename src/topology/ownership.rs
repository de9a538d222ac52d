//! Ownership metadata for mesh entities.
//!
//! [`Ownership`] records, per local entity, the owning rank and whether the
//! entity is a ghost on the current rank. Halo exchange uses it to decide
//! which values must be fetched from which neighbour.

use std::collections::{BTreeMap, BTreeSet};

use crate::mesh_error::MeshError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OwnershipEntry {
    pub owner: usize,
    pub is_ghost: bool,
}

/// Owner rank and ghost flag for each local entity, indexed by local index.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ownership {
    my_rank: usize,
    entries: Vec<OwnershipEntry>,
}

impl Ownership {
    /// Build from per-entity owner ranks; ghosts are entities not owned by `my_rank`.
    pub fn from_owners(owners: &[usize], my_rank: usize) -> Self {
        let entries = owners
            .iter()
            .map(|&owner| OwnershipEntry {
                owner,
                is_ghost: owner != my_rank,
            })
            .collect();
        Self { my_rank, entries }
    }

    /// Every entity owned by `my_rank`.
    pub fn all_owned(len: usize, my_rank: usize) -> Self {
        Self::from_owners(&vec![my_rank; len], my_rank)
    }

    pub fn my_rank(&self) -> usize {
        self.my_rank
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, idx: usize) -> Option<OwnershipEntry> {
        self.entries.get(idx).copied()
    }

    pub fn owner(&self, idx: usize) -> Option<usize> {
        self.entry(idx).map(|e| e.owner)
    }

    /// Whether the entity is a ghost here; out-of-range indices count as ghosts.
    pub fn is_ghost(&self, idx: usize) -> bool {
        self.entries.get(idx).is_none_or(|e| e.is_ghost)
    }

    pub fn owned_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, e)| (!e.is_ghost).then_some(idx))
    }

    pub fn ghost_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(idx, e)| e.is_ghost.then_some(idx))
    }

    pub fn nb_owned(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_ghost).count()
    }

    pub fn nb_ghosts(&self) -> usize {
        self.len() - self.nb_owned()
    }

    /// Per-entity ghost flags, in local order.
    pub fn ghost_flags(&self) -> Vec<bool> {
        self.entries.iter().map(|e| e.is_ghost).collect()
    }

    /// Per-entity owner ranks, in local order.
    pub fn owners(&self) -> Vec<usize> {
        self.entries.iter().map(|e| e.owner).collect()
    }

    /// Ranks that own at least one of our ghosts.
    pub fn neighbour_ranks(&self) -> BTreeSet<usize> {
        self.entries
            .iter()
            .filter(|e| e.is_ghost)
            .map(|e| e.owner)
            .collect()
    }

    /// Ghost indices grouped by owner, in ascending local order per owner.
    pub fn ghosts_by_owner(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut out: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for idx in self.ghost_indices() {
            out.entry(self.entries[idx].owner).or_default().push(idx);
        }
        out
    }

    /// Check all owners lie inside a communicator of `size` ranks.
    pub fn validate_owners(&self, size: usize) -> Result<(), MeshError> {
        match self.entries.iter().find(|e| e.owner >= size) {
            Some(e) => Err(MeshError::OwnerOutOfRange {
                owner: e.owner,
                size,
            }),
            None => Ok(()),
        }
    }
}
