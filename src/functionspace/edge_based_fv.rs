//! Edge-based finite-volume function space.
//!
//! Wraps a [`NodeColumns`] space with the metric-scaled dual geometry needed
//! by the finite-volume operators. Dual volumes are scaled by
//! `(π/180)²·R²·cos(lat)` and dual normals by `π/180`. Edges get their own
//! halo exchange.

use std::sync::Arc;

use rayon::prelude::*;

use crate::algs::communicator::Communicator;
use crate::algs::halo_exchange::HaloExchange;
use crate::config::FvmOptions;
use crate::field::{Field, FieldLocation, FieldSet, FieldValue};
use crate::functionspace::node_columns::NodeColumns;
use crate::mesh::{EdgeTopology, Mesh};
use crate::mesh_error::MeshError;
use crate::util::earth::DEG2RAD;

pub struct EdgeBasedFiniteVolume<C: Communicator> {
    nodes: NodeColumns<C>,
    topology: EdgeTopology,
    edge_halo: HaloExchange,
    volumes: Vec<f64>,
    normals: Vec<[f64; 2]>,
    radius: f64,
    pole_correction: bool,
}

/// Reject nodes that terminate more than one pole edge.
fn check_pole_edges(topology: &EdgeTopology) -> Result<(), MeshError> {
    let mut count = vec![0usize; topology.nb_nodes()];
    for e in topology.pole_edges() {
        for node in topology.edge(e) {
            count[node] += 1;
        }
    }
    match count.iter().enumerate().find(|&(_, &c)| c > 1) {
        Some((node, &count)) => Err(MeshError::AmbiguousPoleNode { node, count }),
        None => Ok(()),
    }
}

impl<C: Communicator> EdgeBasedFiniteVolume<C> {
    /// Build edges and dual mesh if needed, scale the geometry and set up the
    /// node and edge halo exchanges. Collective over `comm`.
    ///
    /// # Errors
    /// Propagates topology and dual-mesh failures, and
    /// [`MeshError::AmbiguousPoleNode`] for a node on several pole edges.
    pub fn new(mesh: Arc<Mesh>, comm: C, options: &FvmOptions) -> Result<Self, MeshError> {
        let topology = mesh.build_edges(&comm)?.clone();
        check_pole_edges(&topology)?;
        let dual = mesh.build_dual_mesh(&comm)?;

        let r = options.radius;
        let lonlat = mesh.nodes().lonlat();
        let volumes: Vec<f64> = dual
            .volumes()
            .par_iter()
            .zip(lonlat.par_iter())
            .map(|(&v, p)| v * DEG2RAD * DEG2RAD * r * r * (p[1] * DEG2RAD).cos())
            .collect();
        if let Some(node) = volumes.iter().position(|&v| v == 0.0) {
            return Err(MeshError::ZeroDualVolume(node));
        }
        let normals: Vec<[f64; 2]> = dual
            .normals()
            .iter()
            .map(|s| [s[0] * DEG2RAD, s[1] * DEG2RAD])
            .collect();

        let nodes = NodeColumns::new(mesh, comm, options.node_tags(), options.count_tag())?;
        let edge_halo = HaloExchange::setup(
            topology.ownership(),
            topology.global_ids(),
            nodes.comm(),
            options.edge_tags(),
        )?;

        log::info!(
            "edge-based finite volume space on rank {}: {} nodes ({} globally), {} edges, {} pole edges",
            nodes.comm().rank(),
            nodes.nb_nodes(),
            nodes.nb_nodes_global(),
            topology.len(),
            topology.nb_pole_edges()
        );

        Ok(Self {
            nodes,
            topology,
            edge_halo,
            volumes,
            normals,
            radius: r,
            pole_correction: options.pole_edges,
        })
    }

    pub fn node_columns(&self) -> &NodeColumns<C> {
        &self.nodes
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        self.nodes.mesh()
    }

    pub fn comm(&self) -> &C {
        self.nodes.comm()
    }

    pub fn topology(&self) -> &EdgeTopology {
        &self.topology
    }

    pub fn nb_nodes(&self) -> usize {
        self.nodes.nb_nodes()
    }

    pub fn nb_nodes_global(&self) -> usize {
        self.nodes.nb_nodes_global()
    }

    pub fn nb_edges(&self) -> usize {
        self.topology.len()
    }

    /// Scaled dual volumes, one per node.
    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    /// Scaled dual normals, one per edge.
    pub fn normals(&self) -> &[[f64; 2]] {
        &self.normals
    }

    pub fn edge_halo(&self) -> &HaloExchange {
        &self.edge_halo
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn pole_correction(&self) -> bool {
        self.pole_correction
    }

    pub fn create_field<V: FieldValue>(&self, name: &str, levels: usize, variables: usize) -> Field {
        self.nodes.create_field::<V>(name, levels, variables)
    }

    pub fn create_edge_field<V: FieldValue>(&self, name: &str, levels: usize, variables: usize) -> Field {
        if variables == 1 {
            Field::scalar::<V>(name, FieldLocation::Edges, self.nb_edges(), levels)
        } else {
            Field::vector::<V>(name, FieldLocation::Edges, self.nb_edges(), levels, variables)
        }
    }

    /// Exchange a node or edge field, chosen by its location.
    pub fn halo_exchange(&self, field: &mut Field) -> Result<(), MeshError> {
        match field.location() {
            FieldLocation::Edges => self.edge_halo.execute(field, self.nodes.comm()),
            _ => self.nodes.halo_exchange(field),
        }
    }

    pub fn halo_exchange_set(&self, fields: &mut FieldSet) -> Result<(), MeshError> {
        for field in fields.iter_mut() {
            self.halo_exchange(field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::algs::meshgen::LonLatQuads;
    use crate::mesh::{Cells, Domain, DualMesh, Nodes};
    use crate::util::Earth;

    #[test]
    fn scaled_volumes_sum_to_sphere_area() {
        // Rings at cell-centred latitudes plus polar caps cover the sphere
        // up to the cos(lat) quadrature error of the coarse rows.
        let mesh = Arc::new(LonLatQuads::regular_global(72, 36).generate().unwrap());
        let fvm = EdgeBasedFiniteVolume::new(mesh, NoComm, &FvmOptions::default()).unwrap();
        let area: f64 = fvm.volumes().iter().sum();
        let rel = (area - Earth::area_in_sq_meters()).abs() / Earth::area_in_sq_meters();
        assert!(rel < 1e-2, "relative area error {rel}");
        assert_eq!(fvm.topology().nb_pole_edges(), 72);
        assert_eq!(fvm.nb_nodes_global(), 72 * 36);
    }

    #[test]
    fn node_on_two_pole_edges_is_ambiguous() {
        let nodes = Nodes::serial(vec![[0.0, 80.0], [120.0, 80.0], [240.0, 80.0]]).unwrap();
        let topology =
            EdgeTopology::from_edges(&nodes, vec![[0, 1], [1, 2], [2, 0]], vec![[0, 1], [0, 2]]).unwrap();
        let dual = DualMesh::from_parts(vec![1.0; 3], vec![[0.0, 0.0]; 5]).unwrap();
        let mesh = Mesh::with_derived(nodes, Cells::default(), Domain::Regional, topology, dual).unwrap();
        let err = EdgeBasedFiniteVolume::new(Arc::new(mesh), NoComm, &FvmOptions::default())
            .err()
            .unwrap();
        assert_eq!(err, MeshError::AmbiguousPoleNode { node: 0, count: 2 });
    }

    #[test]
    fn edge_fields_use_the_edge_halo() {
        let mesh = Arc::new(LonLatQuads::regional(2, 2, [0.0, 2.0], [0.0, 2.0]).generate().unwrap());
        let fvm = EdgeBasedFiniteVolume::new(mesh, NoComm, &FvmOptions::default()).unwrap();
        let mut e = fvm.create_edge_field::<f64>("flux", 1, 2);
        assert_eq!(e.size(), 12);
        fvm.halo_exchange(&mut e).unwrap();
        assert!(!e.is_dirty());
        let mut wrong = Field::scalar::<f64>("flux", FieldLocation::Edges, 3, 1);
        assert!(fvm.halo_exchange(&mut wrong).is_err());
    }
}
