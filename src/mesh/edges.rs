//! Edge topology derived from cell connectivity.
//!
//! Edges are the distinct cell-boundary segments, deduplicated by unordered
//! endpoint pair. Ordinary edges point from the endpoint with the lower global
//! id to the higher one, so every partition holding a copy agrees on the
//! orientation. On global meshes the pole rings are additionally closed by
//! *pole edges*, appended after the ordinary edges.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::ops::Range;

use itertools::Itertools;

use crate::algs::collective::{all_gather, all_reduce_max, all_reduce_min};
use crate::algs::communicator::{CommTag, Communicator};
use crate::mesh::Domain;
use crate::mesh::cells::Cells;
use crate::mesh::nodes::Nodes;
use crate::mesh_error::MeshError;
use crate::topology::global_id::GlobalId;
use crate::topology::ownership::Ownership;
use crate::util::earth::{normalise_longitude, wrap_delta};

/// Base tag of the latitude reductions and ring gathers of the pole-edge pass.
pub const POLE_EDGE_TAG: CommTag = CommTag::new(0xA600);

/// Nodes within this many degrees of a ring latitude belong to the ring.
pub(crate) const RING_LAT_TOLERANCE: f64 = 1.0e-6;
const ANTIPODE_LON_TOLERANCE: f64 = 1.0e-6;

/// Edges of one partition plus node-to-edge incidence.
#[derive(Clone, Debug)]
pub struct EdgeTopology {
    endpoints: Vec<[usize; 2]>,
    cells: Vec<[Option<usize>; 2]>,
    nb_ordinary: usize,
    global_ids: Vec<GlobalId>,
    ownership: Ownership,
    incidence_offsets: Vec<usize>,
    incidence_edges: Vec<usize>,
    incidence_signs: Vec<i8>,
}

impl EdgeTopology {
    /// Derive edges, pole edges, parallel fields and incidence. Collective over
    /// `comm` for [`Domain::Global`] meshes.
    ///
    /// # Errors
    /// - [`MeshError::NonManifoldEdge`] if a segment is shared by more than two cells.
    /// - [`MeshError::IsolatedNode`] if a node ends up with no edges.
    /// - [`MeshError::GlobalIdOverflow`] if node ids are too wide to pack into edge ids.
    /// - [`MeshError::RemoteAntipode`] if an owned pole-ring node cannot be
    ///   paired because its antipode is missing from this partition.
    pub fn build<C: Communicator>(
        nodes: &Nodes,
        cells: &Cells,
        domain: Domain,
        comm: &C,
    ) -> Result<Self, MeshError> {
        let gids = nodes.global_ids();
        let mut lookup: HashMap<(usize, usize), usize> = HashMap::new();
        let mut endpoints: Vec<[usize; 2]> = Vec::new();
        let mut adjacent: Vec<[Option<usize>; 2]> = Vec::new();

        for (c, cell) in cells.iter().enumerate() {
            for (&a, &b) in cell.iter().circular_tuple_windows::<(_, _)>() {
                let key = (a.min(b), a.max(b));
                match lookup.entry(key) {
                    Entry::Occupied(slot) => {
                        let pair = &mut adjacent[*slot.get()];
                        if pair[1].is_some() {
                            return Err(MeshError::NonManifoldEdge(key.0, key.1));
                        }
                        pair[1] = Some(c);
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(endpoints.len());
                        endpoints.push(if gids[a] <= gids[b] { [a, b] } else { [b, a] });
                        adjacent.push([Some(c), None]);
                    }
                }
            }
        }
        let nb_ordinary = endpoints.len();

        if domain == Domain::Global {
            let poles = build_pole_edges(nodes, comm)?;
            adjacent.extend(std::iter::repeat_n([None, None], poles.len()));
            endpoints.extend(poles);
        }

        Self::assemble(nodes, endpoints, adjacent, nb_ordinary)
    }

    /// Topology from explicit, already oriented edge lists.
    ///
    /// `pole_edges` are appended after `edges`. No cell adjacency is recorded.
    ///
    /// # Errors
    /// [`MeshError::EdgeNodeOutOfRange`] for a bad endpoint, otherwise as [`EdgeTopology::build`].
    pub fn from_edges(
        nodes: &Nodes,
        edges: Vec<[usize; 2]>,
        pole_edges: Vec<[usize; 2]>,
    ) -> Result<Self, MeshError> {
        let nb_ordinary = edges.len();
        let mut endpoints = edges;
        endpoints.extend(pole_edges);
        for (edge, pair) in endpoints.iter().enumerate() {
            if let Some(&node) = pair.iter().find(|&&n| n >= nodes.len()) {
                return Err(MeshError::EdgeNodeOutOfRange {
                    edge,
                    node,
                    nb_nodes: nodes.len(),
                });
            }
        }
        let adjacent = vec![[None, None]; endpoints.len()];
        Self::assemble(nodes, endpoints, adjacent, nb_ordinary)
    }

    fn assemble(
        nodes: &Nodes,
        endpoints: Vec<[usize; 2]>,
        adjacent: Vec<[Option<usize>; 2]>,
        nb_ordinary: usize,
    ) -> Result<Self, MeshError> {
        let gids = nodes.global_ids();
        let global_ids = endpoints
            .iter()
            .map(|&[a, b]| GlobalId::edge(gids[a], gids[b]))
            .collect::<Result<Vec<_>, _>>()?;
        let node_ownership = nodes.ownership();
        let owners: Vec<usize> = endpoints
            .iter()
            .map(|&[a, _]| node_ownership.entry(a).map_or(node_ownership.my_rank(), |e| e.owner))
            .collect();
        let ownership = Ownership::from_owners(&owners, node_ownership.my_rank());

        let (incidence_offsets, incidence_edges, incidence_signs) =
            build_incidence(nodes.len(), &endpoints)?;

        log::debug!(
            "built {} edges ({} pole edges) over {} nodes",
            endpoints.len(),
            endpoints.len() - nb_ordinary,
            nodes.len()
        );

        Ok(Self {
            endpoints,
            cells: adjacent,
            nb_ordinary,
            global_ids,
            ownership,
            incidence_offsets,
            incidence_edges,
            incidence_signs,
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// `[first, second]` node indices; `first` defines the orientation.
    pub fn endpoints(&self) -> &[[usize; 2]] {
        &self.endpoints
    }

    pub fn edge(&self, e: usize) -> [usize; 2] {
        self.endpoints[e]
    }

    /// Cells on either side of edge `e`; `None` for boundary and pole edges.
    pub fn adjacent_cells(&self, e: usize) -> [Option<usize>; 2] {
        self.cells[e]
    }

    pub fn nb_pole_edges(&self) -> usize {
        self.endpoints.len() - self.nb_ordinary
    }

    /// Index range of the pole edges.
    pub fn pole_edges(&self) -> Range<usize> {
        self.nb_ordinary..self.endpoints.len()
    }

    pub fn is_pole_edge(&self, e: usize) -> bool {
        e >= self.nb_ordinary && e < self.endpoints.len()
    }

    pub fn global_ids(&self) -> &[GlobalId] {
        &self.global_ids
    }

    pub fn ownership(&self) -> &Ownership {
        &self.ownership
    }

    /// Edges incident to `node` with their signs: `+1` when `node` is the
    /// edge's first endpoint, `-1` otherwise.
    pub fn incident(&self, node: usize) -> (&[usize], &[i8]) {
        let range = self.incidence_offsets[node]..self.incidence_offsets[node + 1];
        (
            &self.incidence_edges[range.clone()],
            &self.incidence_signs[range],
        )
    }

    pub fn nb_nodes(&self) -> usize {
        self.incidence_offsets.len() - 1
    }
}

type Incidence = (Vec<usize>, Vec<usize>, Vec<i8>);

fn build_incidence(nb_nodes: usize, endpoints: &[[usize; 2]]) -> Result<Incidence, MeshError> {
    let mut counts = vec![0usize; nb_nodes];
    for &[a, b] in endpoints {
        counts[a] += 1;
        counts[b] += 1;
    }
    if let Some(node) = counts.iter().position(|&n| n == 0) {
        return Err(MeshError::IsolatedNode(node));
    }
    let mut offsets = Vec::with_capacity(nb_nodes + 1);
    offsets.push(0);
    for n in &counts {
        offsets.push(offsets[offsets.len() - 1] + n);
    }
    let total = offsets[nb_nodes];
    let mut edges = vec![0usize; total];
    let mut signs = vec![0i8; total];
    let mut cursor = offsets[..nb_nodes].to_vec();
    for (e, &[a, b]) in endpoints.iter().enumerate() {
        for (node, sign) in [(a, 1i8), (b, -1i8)] {
            edges[cursor[node]] = e;
            signs[cursor[node]] = sign;
            cursor[node] += 1;
        }
    }
    Ok((offsets, edges, signs))
}

/// Connect antipodal nodes on the northernmost and southernmost rings.
///
/// Ring latitudes are global extremes, found by all-reduce. A ring lying
/// exactly on a pole is skipped: its nodes are the pole itself. Owned ring
/// longitudes are gathered from every rank so that an owned node whose
/// antipode exists elsewhere but not locally is reported instead of being
/// left without a polar cap.
fn build_pole_edges<C: Communicator>(nodes: &Nodes, comm: &C) -> Result<Vec<[usize; 2]>, MeshError> {
    let lonlat = nodes.lonlat();
    let local_max = lonlat.iter().map(|p| p[1]).fold(f64::NEG_INFINITY, f64::max);
    let local_min = lonlat.iter().map(|p| p[1]).fold(f64::INFINITY, f64::min);
    let north = all_reduce_max(comm, POLE_EDGE_TAG, local_max)?;
    let south = all_reduce_min(comm, POLE_EDGE_TAG.offset(2), local_min)?;

    let mut rings = vec![north];
    if south != north {
        rings.push(south);
    }

    let ownership = nodes.ownership();
    let mut pole_edges = Vec::new();
    for (r, ring_lat) in rings.into_iter().enumerate() {
        if !ring_lat.is_finite() || ring_lat.abs() == 90.0 {
            continue;
        }
        let ring: Vec<(usize, f64)> = lonlat
            .iter()
            .enumerate()
            .filter(|(_, p)| (p[1] - ring_lat).abs() < RING_LAT_TOLERANCE)
            .map(|(i, p)| (i, normalise_longitude(p[0], 0.0)))
            .collect();
        let owned: Vec<f64> = ring
            .iter()
            .filter(|&&(i, _)| !ownership.is_ghost(i))
            .map(|&(_, lon)| lon)
            .collect();
        let global = all_gather(comm, POLE_EDGE_TAG.offset(4 + 2 * r as u16), &owned)?;
        let is_antipode = |other: f64, lon: f64| wrap_delta(other - lon - 180.0).abs() < ANTIPODE_LON_TOLERANCE;

        for &(i, lon) in ring.iter().filter(|&&(i, _)| !ownership.is_ghost(i)) {
            let local = ring.iter().any(|&(_, other)| is_antipode(other, lon));
            let remote = global.iter().flatten().any(|&other| is_antipode(other, lon));
            if remote && !local {
                return Err(MeshError::RemoteAntipode { node: i, lon });
            }
        }

        let before = pole_edges.len();
        for &(i, lon) in &ring {
            if lon >= 180.0 {
                continue;
            }
            if let Some(&(j, _)) = ring.iter().find(|&&(_, other)| is_antipode(other, lon)) {
                pole_edges.push([i, j]);
            }
        }
        log::debug!(
            "ring at latitude {ring_lat}: {} nodes, {} pole edges",
            ring.len(),
            pole_edges.len() - before
        );
    }
    Ok(pole_edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use serial_test::serial;

    fn square_pair() -> (Nodes, Cells) {
        // 3 --- 4 --- 5
        // |     |     |
        // 0 --- 1 --- 2
        let nodes = Nodes::serial(vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [2.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [2.0, 1.0],
        ])
        .unwrap();
        let cells = Cells::from_polygons(&[[0, 1, 4, 3], [1, 2, 5, 4]]);
        (nodes, cells)
    }

    #[test]
    fn shared_edge_is_deduplicated() {
        let (nodes, cells) = square_pair();
        let topo = EdgeTopology::build(&nodes, &cells, Domain::Regional, &NoComm).unwrap();
        assert_eq!(topo.len(), 7);
        assert_eq!(topo.nb_pole_edges(), 0);
        let shared = topo
            .endpoints()
            .iter()
            .position(|&e| e == [1, 4])
            .unwrap();
        assert_eq!(topo.adjacent_cells(shared), [Some(0), Some(1)]);
    }

    #[test]
    fn edges_point_to_higher_global_id() {
        let (nodes, cells) = square_pair();
        let topo = EdgeTopology::build(&nodes, &cells, Domain::Regional, &NoComm).unwrap();
        for &[a, b] in topo.endpoints() {
            assert!(nodes.global_ids()[a] < nodes.global_ids()[b]);
        }
    }

    #[test]
    fn incidence_signs_follow_orientation() {
        let (nodes, cells) = square_pair();
        let topo = EdgeTopology::build(&nodes, &cells, Domain::Regional, &NoComm).unwrap();
        for node in 0..nodes.len() {
            let (edges, signs) = topo.incident(node);
            for (&e, &s) in edges.iter().zip(signs) {
                let [a, _] = topo.edge(e);
                assert_eq!(s == 1, a == node);
            }
        }
        assert_eq!(topo.incident(1).0.len(), 3);
    }

    #[test]
    fn third_cell_on_edge_is_rejected() {
        let nodes = Nodes::serial(vec![[0.0, 0.0], [1.0, 0.0], [0.5, 1.0], [0.5, -1.0], [2.0, 0.5]])
            .unwrap();
        let cells = Cells::from_polygons(&[[0, 1, 2], [1, 0, 3], [0, 1, 4]]);
        assert_eq!(
            EdgeTopology::build(&nodes, &cells, Domain::Regional, &NoComm).unwrap_err(),
            MeshError::NonManifoldEdge(0, 1)
        );
    }

    #[test]
    fn unused_node_is_isolated() {
        let nodes = Nodes::serial(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]]).unwrap();
        let cells = Cells::from_polygons(&[[0, 1, 2]]);
        assert_eq!(
            EdgeTopology::build(&nodes, &cells, Domain::Regional, &NoComm).unwrap_err(),
            MeshError::IsolatedNode(3)
        );
    }

    #[test]
    fn pole_ring_gets_antipodal_edges() {
        // Two rings of four longitudes at +-60 closed by quads around the globe.
        let mut lonlat = Vec::new();
        for lat in [60.0, -60.0] {
            for i in 0..4 {
                lonlat.push([90.0 * i as f64, lat]);
            }
        }
        let nodes = Nodes::serial(lonlat).unwrap();
        let cells = Cells::from_polygons(
            &(0..4)
                .map(|i| [i, (i + 1) % 4, 4 + (i + 1) % 4, 4 + i])
                .collect::<Vec<_>>(),
        );
        let topo = EdgeTopology::build(&nodes, &cells, Domain::Global, &NoComm).unwrap();
        assert_eq!(topo.nb_pole_edges(), 4);
        let poles: Vec<[usize; 2]> = topo.pole_edges().map(|e| topo.edge(e)).collect();
        assert_eq!(poles, vec![[0, 2], [1, 3], [4, 6], [5, 7]]);
        assert!(topo.is_pole_edge(topo.len() - 1));
        assert!(!topo.is_pole_edge(0));
    }

    #[test]
    fn ring_on_the_pole_is_skipped() {
        let nodes = Nodes::serial(vec![[0.0, 90.0], [0.0, 0.0], [120.0, 0.0], [240.0, 0.0]]).unwrap();
        let cells = Cells::from_polygons(&[[0, 1, 2], [0, 2, 3], [0, 3, 1]]);
        let topo = EdgeTopology::build(&nodes, &cells, Domain::Global, &NoComm).unwrap();
        // Southern ring at the equator has no antipodal pairs (120 degree spacing).
        assert_eq!(topo.nb_pole_edges(), 0);
    }

    #[test]
    #[serial]
    fn ring_split_by_longitude_reports_missing_antipode() {
        use crate::algs::communicator::RayonComm;

        // Eight longitudes at 60N; each rank owns four of them plus one halo
        // column on either side.
        let local_columns = [[7usize, 0, 1, 2, 3, 4], [3, 4, 5, 6, 7, 0]];
        let handles: Vec<_> = RayonComm::world(2)
            .into_iter()
            .map(|comm| {
                let columns = local_columns[comm.rank()];
                std::thread::spawn(move || {
                    let lonlat = columns.iter().map(|&c| [45.0 * c as f64, 60.0]).collect();
                    let ids = columns
                        .iter()
                        .map(|&c| GlobalId::new(c as u64 + 1).unwrap())
                        .collect();
                    let owners: Vec<usize> = columns.iter().map(|&c| c / 4).collect();
                    let own = Ownership::from_owners(&owners, comm.rank());
                    let nodes = Nodes::new(lonlat, ids, own).unwrap();
                    build_pole_edges(&nodes, &comm)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0], Err(MeshError::RemoteAntipode { node: 2, lon: 45.0 }));
        assert_eq!(results[1], Err(MeshError::RemoteAntipode { node: 2, lon: 225.0 }));
    }

    #[test]
    fn edge_ownership_follows_first_endpoint() {
        let (_, cells) = square_pair();
        let lonlat = vec![[0.0, 0.0], [1.0, 0.0], [2.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0]];
        let ids = (1..=6).map(|g| GlobalId::new(g).unwrap()).collect();
        let own = Ownership::from_owners(&[0, 0, 1, 0, 0, 1], 0);
        let nodes = Nodes::new(lonlat, ids, own).unwrap();
        let topo = EdgeTopology::build(&nodes, &cells, Domain::Regional, &NoComm).unwrap();
        for (e, &[a, _]) in topo.endpoints().iter().enumerate() {
            assert_eq!(topo.ownership().owner(e), nodes.ownership().owner(a));
        }
        assert_eq!(topo.ownership().nb_ghosts(), 1);
    }
}
