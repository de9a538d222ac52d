//! Mesh: nodes, cells and the derived topology built from them.
//!
//! Edge topology and dual geometry are derived on first request and memoised;
//! repeated builds return the stored result. Both are immutable afterwards and
//! may be shared freely across threads.

pub mod cells;
pub mod dual;
pub mod edges;
pub mod nodes;

use once_cell::sync::OnceCell;

use crate::algs::communicator::Communicator;
use crate::field::{Field, FieldLocation, FieldShape};
use crate::mesh_error::MeshError;

pub use cells::Cells;
pub use dual::DualMesh;
pub use edges::EdgeTopology;
pub use nodes::Nodes;

/// Extent of the mesh on the sphere.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Domain {
    /// Covers the whole sphere; pole rings are closed by pole edges.
    Global,
    /// A limited-area patch.
    Regional,
}

/// One partition of a spherical mesh.
#[derive(Debug)]
pub struct Mesh {
    nodes: Nodes,
    cells: Cells,
    domain: Domain,
    topology: OnceCell<EdgeTopology>,
    dual: OnceCell<DualMesh>,
}

impl Mesh {
    /// # Errors
    /// Propagates [`Cells::validate`] failures.
    pub fn new(nodes: Nodes, cells: Cells, domain: Domain) -> Result<Self, MeshError> {
        cells.validate(nodes.len())?;
        Ok(Self {
            nodes,
            cells,
            domain,
            topology: OnceCell::new(),
            dual: OnceCell::new(),
        })
    }

    /// Mesh whose edge topology and dual geometry are supplied by the caller
    /// instead of being derived from cells.
    ///
    /// # Errors
    /// [`MeshError::LengthMismatch`] if the stores do not fit the nodes or each other.
    pub fn with_derived(
        nodes: Nodes,
        cells: Cells,
        domain: Domain,
        topology: EdgeTopology,
        dual: DualMesh,
    ) -> Result<Self, MeshError> {
        cells.validate(nodes.len())?;
        let checks = [
            ("edge incidence", nodes.len(), topology.nb_nodes()),
            ("dual volumes", nodes.len(), dual.volumes().len()),
            ("dual normals", topology.len(), dual.normals().len()),
        ];
        for (what, expected, found) in checks {
            if expected != found {
                return Err(MeshError::LengthMismatch {
                    what,
                    expected,
                    found,
                });
            }
        }
        Ok(Self {
            nodes,
            cells,
            domain,
            topology: OnceCell::with_value(topology),
            dual: OnceCell::with_value(dual),
        })
    }

    pub fn nodes(&self) -> &Nodes {
        &self.nodes
    }

    pub fn cells(&self) -> &Cells {
        &self.cells
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Build the edge topology, or return the one already built.
    ///
    /// Collective on global meshes: every rank must call it.
    pub fn build_edges<C: Communicator>(&self, comm: &C) -> Result<&EdgeTopology, MeshError> {
        self.topology
            .get_or_try_init(|| EdgeTopology::build(&self.nodes, &self.cells, self.domain, comm))
    }

    pub fn has_edges(&self) -> bool {
        self.topology.get().is_some()
    }

    pub fn edges(&self) -> Option<&EdgeTopology> {
        self.topology.get()
    }

    /// Build the median dual (and the edges it needs), or return the stored one.
    pub fn build_dual_mesh<C: Communicator>(&self, comm: &C) -> Result<&DualMesh, MeshError> {
        let edges = self.build_edges(comm)?;
        self.dual
            .get_or_try_init(|| DualMesh::build(&self.nodes, &self.cells, edges))
    }

    pub fn dual_mesh(&self) -> Option<&DualMesh> {
        self.dual.get()
    }

    /// Derived per-node or per-edge data as a standalone field.
    ///
    /// Node fields: `lonlat`, `glb_idx`, `ghost`, `partition`, `dual_volumes`.
    /// Edge fields: `dual_normals`, `is_pole_edge`, `edge_glb_idx`. Edge and
    /// dual fields require the corresponding build to have happened.
    pub fn named_field(&self, name: &str) -> Result<Field, MeshError> {
        let nodes = &self.nodes;
        let missing = || MeshError::MissingField(name.to_owned());
        let shape = |size, variables| FieldShape {
            size,
            levels: 1,
            variables,
        };
        let mut field = match name {
            "lonlat" => Field::from_values(
                name,
                FieldLocation::Nodes,
                shape(nodes.len(), 2),
                1,
                nodes.lonlat().iter().flatten().copied().collect::<Vec<f64>>(),
            )?,
            "glb_idx" => Field::from_values(
                name,
                FieldLocation::Nodes,
                shape(nodes.len(), 1),
                0,
                nodes.global_ids().iter().map(|g| g.get() as i64).collect(),
            )?,
            "ghost" => Field::from_values(
                name,
                FieldLocation::Nodes,
                shape(nodes.len(), 1),
                0,
                nodes.ownership().ghost_flags().into_iter().map(i32::from).collect(),
            )?,
            "partition" => Field::from_values(
                name,
                FieldLocation::Nodes,
                shape(nodes.len(), 1),
                0,
                nodes.ownership().owners().into_iter().map(|r| r as i32).collect(),
            )?,
            "dual_volumes" => {
                let dual = self.dual_mesh().ok_or_else(missing)?;
                Field::from_values(name, FieldLocation::Nodes, shape(nodes.len(), 1), 0, dual.volumes().to_vec())?
            }
            "dual_normals" => {
                let dual = self.dual_mesh().ok_or_else(missing)?;
                Field::from_values(
                    name,
                    FieldLocation::Edges,
                    shape(dual.normals().len(), 2),
                    1,
                    dual.normals().iter().flatten().copied().collect::<Vec<f64>>(),
                )?
            }
            "is_pole_edge" => {
                let edges = self.edges().ok_or_else(missing)?;
                Field::from_values(
                    name,
                    FieldLocation::Edges,
                    shape(edges.len(), 1),
                    0,
                    (0..edges.len()).map(|e| i32::from(edges.is_pole_edge(e))).collect(),
                )?
            }
            "edge_glb_idx" => {
                let edges = self.edges().ok_or_else(missing)?;
                Field::from_values(
                    name,
                    FieldLocation::Edges,
                    shape(edges.len(), 1),
                    0,
                    edges.global_ids().iter().map(|g| g.get() as i64).collect(),
                )?
            }
            _ => return Err(missing()),
        };
        // Derived data is computed identically on every rank.
        field.set_dirty(false);
        Ok(field)
    }
}
