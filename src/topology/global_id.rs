//! `GlobalId`: partition-independent identity of a mesh entity.
//!
//! Every node (and, derived from its endpoints, every edge) carries a global
//! id that is identical on all ranks holding a copy of the entity. Halo
//! exchange matches ghost copies to their owners through these ids.
//!
//! Ids are 1-based. `GlobalId` wraps a `NonZeroU64` so zero stays available as
//! a sentinel and `Option<GlobalId>` costs nothing.

use std::{fmt, num::NonZeroU64};

use crate::mesh_error::MeshError;

/// Global identifier of a mesh entity.
///
/// # Memory layout
/// `repr(transparent)` over `NonZeroU64`; travels on the wire as a plain `u64`.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct GlobalId(NonZeroU64);

impl GlobalId {
    /// Create a `GlobalId` from a raw value.
    ///
    /// # Errors
    /// Returns [`MeshError::InvalidGlobalId`] if `raw == 0`.
    #[inline]
    pub fn new(raw: u64) -> Result<Self, MeshError> {
        NonZeroU64::new(raw)
            .map(GlobalId)
            .ok_or(MeshError::InvalidGlobalId)
    }

    /// Raw `u64` value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Id of the edge joining two nodes, independent of endpoint order.
    ///
    /// The smaller id occupies the high 32 bits, so node ids must be below
    /// `2^32`.
    pub fn edge(a: GlobalId, b: GlobalId) -> Result<GlobalId, MeshError> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if hi.get() > u64::from(u32::MAX) {
            return Err(MeshError::GlobalIdOverflow(hi.get()));
        }
        GlobalId::new((lo.get() << 32) | hi.get())
    }
}

impl fmt::Debug for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GlobalId").field(&self.get()).finish()
    }
}

impl fmt::Display for GlobalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl TryFrom<u64> for GlobalId {
    type Error = MeshError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        GlobalId::new(raw)
    }
}

impl From<GlobalId> for u64 {
    fn from(id: GlobalId) -> u64 {
        id.get()
    }
}
