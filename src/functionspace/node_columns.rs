//! Columns of values on mesh nodes, with their halo exchange.

use std::sync::Arc;

use crate::algs::collective::all_reduce_sum;
use crate::algs::communicator::{CommTag, Communicator, ExchangeTags};
use crate::algs::halo_exchange::HaloExchange;
use crate::field::{Field, FieldLocation, FieldSet, FieldValue};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;

pub struct NodeColumns<C: Communicator> {
    mesh: Arc<Mesh>,
    comm: C,
    halo: HaloExchange,
    nb_nodes_global: usize,
}

impl<C: Communicator> NodeColumns<C> {
    /// Set up the node halo exchange. Collective over `comm`.
    pub fn new(mesh: Arc<Mesh>, comm: C, tags: ExchangeTags, count_tag: CommTag) -> Result<Self, MeshError> {
        let nodes = mesh.nodes();
        let halo = HaloExchange::setup(nodes.ownership(), nodes.global_ids(), &comm, tags)?;
        let owned = nodes.ownership().nb_owned() as u64;
        let nb_nodes_global = all_reduce_sum(&comm, count_tag, owned)? as usize;
        Ok(Self {
            mesh,
            comm,
            halo,
            nb_nodes_global,
        })
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn comm(&self) -> &C {
        &self.comm
    }

    /// Local nodes, ghosts included.
    pub fn nb_nodes(&self) -> usize {
        self.mesh.nb_nodes()
    }

    /// Owned nodes summed over all partitions.
    pub fn nb_nodes_global(&self) -> usize {
        self.nb_nodes_global
    }

    pub fn halo(&self) -> &HaloExchange {
        &self.halo
    }

    /// New zeroed node field: rank 0 for one variable, rank 1 otherwise.
    pub fn create_field<V: FieldValue>(&self, name: &str, levels: usize, variables: usize) -> Field {
        if variables == 1 {
            Field::scalar::<V>(name, FieldLocation::Nodes, self.nb_nodes(), levels)
        } else {
            Field::vector::<V>(name, FieldLocation::Nodes, self.nb_nodes(), levels, variables)
        }
    }

    pub fn halo_exchange(&self, field: &mut Field) -> Result<(), MeshError> {
        field.expect_location(FieldLocation::Nodes)?;
        self.halo.execute(field, &self.comm)
    }

    pub fn halo_exchange_set(&self, fields: &mut FieldSet) -> Result<(), MeshError> {
        for field in fields.iter() {
            field.expect_location(FieldLocation::Nodes)?;
        }
        self.halo.execute_set(fields, &self.comm)
    }
}
