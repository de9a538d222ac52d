//! Per-partition entity counts and their imbalance.

use std::fmt;

use crate::algs::collective::all_gather;
use crate::algs::communicator::{CommTag, Communicator};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;

/// Default tag for [`LoadBalanceReport::gather`]; uses offsets `0..2`.
pub const LOAD_BALANCE_TAG: CommTag = CommTag::new(0xA700);

/// Entity counts of one partition.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionCounts {
    pub nodes: u64,
    pub owned_nodes: u64,
    pub ghost_nodes: u64,
    pub edges: u64,
    pub owned_edges: u64,
}

impl PartitionCounts {
    pub fn of(mesh: &Mesh) -> Self {
        let nodes = mesh.nodes().ownership();
        let (edges, owned_edges) = mesh
            .edges()
            .map(|e| (e.len() as u64, e.ownership().nb_owned() as u64))
            .unwrap_or((0, 0));
        Self {
            nodes: nodes.len() as u64,
            owned_nodes: nodes.nb_owned() as u64,
            ghost_nodes: nodes.nb_ghosts() as u64,
            edges,
            owned_edges,
        }
    }

    fn to_array(self) -> [u64; 5] {
        [self.nodes, self.owned_nodes, self.ghost_nodes, self.edges, self.owned_edges]
    }

    fn from_array(a: &[u64]) -> Option<Self> {
        match *a {
            [nodes, owned_nodes, ghost_nodes, edges, owned_edges] => Some(Self {
                nodes,
                owned_nodes,
                ghost_nodes,
                edges,
                owned_edges,
            }),
            _ => None,
        }
    }
}

/// Counts of every partition, identical on all ranks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadBalanceReport {
    partitions: Vec<PartitionCounts>,
}

impl LoadBalanceReport {
    /// Collective: every rank must call it with the same `tag`.
    /// Edge counts are zero on ranks whose mesh has no edges yet.
    pub fn gather<C: Communicator>(mesh: &Mesh, comm: &C, tag: CommTag) -> Result<Self, MeshError> {
        let local = PartitionCounts::of(mesh).to_array();
        let partitions = all_gather(comm, tag, &local)?
            .iter()
            .enumerate()
            .map(|(rank, counts)| {
                PartitionCounts::from_array(counts).ok_or_else(|| MeshError::CommError {
                    neighbor: rank,
                    message: format!("expected 5 partition counts, received {}", counts.len()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("gathered load balance of {} partitions", partitions.len());
        Ok(Self { partitions })
    }

    pub fn partitions(&self) -> &[PartitionCounts] {
        &self.partitions
    }

    pub fn total_owned_nodes(&self) -> u64 {
        self.partitions.iter().map(|p| p.owned_nodes).sum()
    }

    pub fn total_owned_edges(&self) -> u64 {
        self.partitions.iter().map(|p| p.owned_edges).sum()
    }

    /// Largest owned-node count divided by the mean; `1.0` is perfect balance.
    pub fn node_imbalance(&self) -> f64 {
        imbalance(self.partitions.iter().map(|p| p.owned_nodes))
    }

    pub fn edge_imbalance(&self) -> f64 {
        imbalance(self.partitions.iter().map(|p| p.owned_edges))
    }
}

fn imbalance(counts: impl Iterator<Item = u64> + Clone) -> f64 {
    let n = counts.clone().count();
    let total: u64 = counts.clone().sum();
    if n == 0 || total == 0 {
        return 1.0;
    }
    let max = counts.max().unwrap_or(0);
    max as f64 * n as f64 / total as f64
}

impl fmt::Display for LoadBalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "part", "nodes", "owned", "ghost", "edges", "owned"
        )?;
        for (rank, p) in self.partitions.iter().enumerate() {
            writeln!(
                f,
                "{rank:>6} {:>10} {:>10} {:>10} {:>10} {:>10}",
                p.nodes, p.owned_nodes, p.ghost_nodes, p.edges, p.owned_edges
            )?;
        }
        let stat = |sel: fn(&PartitionCounts) -> u64| {
            let min = self.partitions.iter().map(sel).min().unwrap_or(0);
            let max = self.partitions.iter().map(sel).max().unwrap_or(0);
            (min, max)
        };
        let (nmin, nmax) = stat(|p| p.owned_nodes);
        let (emin, emax) = stat(|p| p.owned_edges);
        writeln!(
            f,
            "owned nodes min {nmin} max {nmax} imbalance {:.3}",
            self.node_imbalance()
        )?;
        write!(
            f,
            "owned edges min {emin} max {emax} imbalance {:.3}",
            self.edge_imbalance()
        )
    }
}
