//! Serializable option structs for the operators.
//!
//! Every struct implements `Default` and deserializes with missing keys filled
//! from it, so partial configurations in any serde format are accepted.

use serde::{Deserialize, Serialize};

use crate::algs::communicator::{CommTag, ExchangeTags};
use crate::interpolation::kernel::KernelKind;
use crate::util::Earth;

/// Name under which the finite-volume gradient is registered.
pub const EDGE_BASED_FINITE_VOLUME: &str = "EdgeBasedFiniteVolume";

/// Options of the edge-based finite-volume function space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FvmOptions {
    /// Sphere radius in meters.
    pub radius: f64,
    /// Apply the latitudinal correction at pole-edge endpoints.
    pub pole_edges: bool,
    /// First of the message tags used by this space's exchanges.
    pub tags: CommTag,
}

impl Default for FvmOptions {
    fn default() -> Self {
        Self {
            radius: Earth::RADIUS_IN_METERS,
            pole_edges: true,
            tags: CommTag::new(0xB000),
        }
    }
}

impl FvmOptions {
    pub fn node_tags(&self) -> ExchangeTags {
        ExchangeTags::from_base(self.tags)
    }

    pub fn edge_tags(&self) -> ExchangeTags {
        ExchangeTags::from_base(self.tags.offset(3))
    }

    /// Tag for the global node count reduction.
    pub fn count_tag(&self) -> CommTag {
        self.tags.offset(6)
    }
}

/// Options of the structured-grid interpolation engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpolationOptions {
    pub kernel: KernelKind,
    /// Recompute stencils on every execute instead of storing a matrix.
    pub matrix_free: bool,
}

/// Selects a nabla implementation from a registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NablaOptions {
    pub kind: String,
}

impl Default for NablaOptions {
    fn default() -> Self {
        Self {
            kind: EDGE_BASED_FINITE_VOLUME.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let opts: FvmOptions = serde_json::from_str(r#"{ "radius": 1.0 }"#).unwrap();
        assert_eq!(opts.radius, 1.0);
        assert!(opts.pole_edges);
        assert_eq!(opts.tags, FvmOptions::default().tags);

        let opts: InterpolationOptions = serde_json::from_str(r#"{ "kernel": "cubic" }"#).unwrap();
        assert_eq!(opts.kernel, KernelKind::Cubic);
        assert!(!opts.matrix_free);

        let opts: NablaOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts.kind, EDGE_BASED_FINITE_VOLUME);
    }

    #[test]
    fn options_round_trip() {
        let opts = InterpolationOptions {
            kernel: KernelKind::Nearest,
            matrix_free: true,
        };
        let json = serde_json::to_string(&opts).unwrap();
        assert_eq!(json, r#"{"kernel":"nearest","matrix_free":true}"#);
        assert_eq!(serde_json::from_str::<InterpolationOptions>(&json).unwrap(), opts);
    }

    #[test]
    fn tag_blocks_do_not_overlap() {
        let opts = FvmOptions::default();
        let nodes = opts.node_tags();
        let edges = opts.edge_tags();
        assert!(nodes.data.as_u16() < edges.sizes.as_u16());
        assert!(edges.data.as_u16() < opts.count_tag().as_u16());
    }
}
