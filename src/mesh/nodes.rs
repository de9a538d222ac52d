//! Mesh nodes: coordinates, global identity and ownership.

use crate::mesh_error::MeshError;
use crate::topology::global_id::GlobalId;
use crate::topology::ownership::Ownership;
use crate::util::earth::lonlat_to_xyz;

/// Node set of one partition, owned and ghost nodes together.
///
/// Coordinates are `[lon, lat]` in degrees; unit-sphere Cartesian coordinates
/// are derived once at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Nodes {
    lonlat: Vec<[f64; 2]>,
    xyz: Vec<[f64; 3]>,
    global_ids: Vec<GlobalId>,
    ownership: Ownership,
}

impl Nodes {
    /// # Errors
    /// [`MeshError::LengthMismatch`] if the three inputs disagree in length.
    pub fn new(
        lonlat: Vec<[f64; 2]>,
        global_ids: Vec<GlobalId>,
        ownership: Ownership,
    ) -> Result<Self, MeshError> {
        if global_ids.len() != lonlat.len() {
            return Err(MeshError::LengthMismatch {
                what: "node global ids",
                expected: lonlat.len(),
                found: global_ids.len(),
            });
        }
        if ownership.len() != lonlat.len() {
            return Err(MeshError::LengthMismatch {
                what: "node ownership",
                expected: lonlat.len(),
                found: ownership.len(),
            });
        }
        let xyz = lonlat.iter().map(|&p| lonlat_to_xyz(p)).collect();
        Ok(Self {
            lonlat,
            xyz,
            global_ids,
            ownership,
        })
    }

    /// Single-partition node set with global ids `1..=n`, all owned by rank 0.
    pub fn serial(lonlat: Vec<[f64; 2]>) -> Result<Self, MeshError> {
        let global_ids = (1..=lonlat.len() as u64)
            .map(GlobalId::new)
            .collect::<Result<Vec<_>, _>>()?;
        let ownership = Ownership::all_owned(lonlat.len(), 0);
        Self::new(lonlat, global_ids, ownership)
    }

    pub fn len(&self) -> usize {
        self.lonlat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lonlat.is_empty()
    }

    pub fn lonlat(&self) -> &[[f64; 2]] {
        &self.lonlat
    }

    pub fn xyz(&self) -> &[[f64; 3]] {
        &self.xyz
    }

    pub fn global_ids(&self) -> &[GlobalId] {
        &self.global_ids
    }

    pub fn global_id(&self, node: usize) -> Option<GlobalId> {
        self.global_ids.get(node).copied()
    }

    pub fn ownership(&self) -> &Ownership {
        &self.ownership
    }

    pub fn is_ghost(&self, node: usize) -> bool {
        self.ownership.is_ghost(node)
    }
}
