//! Median-dual geometry in lon/lat degree space.
//!
//! Each node's control volume is bounded by the segments joining edge
//! midpoints to the centroids of the surrounding cells. Longitudes are
//! unwrapped relative to the node (or edge) being processed, so cells that
//! straddle the date line are treated as contiguous.
//!
//! Volumes are in square degrees and normals in degrees; the spherical metric
//! is applied by the finite-volume function space.

use rayon::prelude::*;

use crate::mesh::cells::Cells;
use crate::mesh::edges::{EdgeTopology, RING_LAT_TOLERANCE};
use crate::mesh::nodes::Nodes;
use crate::mesh_error::MeshError;
use crate::util::earth::wrap_delta;

/// Dual control volumes per node and dual normals per edge.
#[derive(Clone, Debug, PartialEq)]
pub struct DualMesh {
    volumes: Vec<f64>,
    normals: Vec<[f64; 2]>,
}

#[inline]
fn unwrap_to(p: [f64; 2], reference: f64) -> [f64; 2] {
    [reference + wrap_delta(p[0] - reference), p[1]]
}

#[inline]
fn mid(a: [f64; 2], b: [f64; 2]) -> [f64; 2] {
    [0.5 * (a[0] + b[0]), 0.5 * (a[1] + b[1])]
}

/// Absolute polygon area by the shoelace formula.
fn polygon_area(points: &[[f64; 2]]) -> f64 {
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p[0] * q[1] - q[0] * p[1]
        })
        .sum();
    0.5 * twice.abs()
}

/// Vertex average of a cell, unwrapped relative to its first vertex.
fn centroid(lonlat: &[[f64; 2]], cell: &[usize]) -> [f64; 2] {
    let origin = lonlat[cell[0]][0];
    let (mut lon, mut lat) = (0.0, 0.0);
    for &n in cell {
        let p = unwrap_to(lonlat[n], origin);
        lon += p[0];
        lat += p[1];
    }
    let k = cell.len() as f64;
    [lon / k, lat / k]
}

impl DualMesh {
    /// # Errors
    /// [`MeshError::ZeroDualVolume`] if any node ends up with no area.
    pub fn build(nodes: &Nodes, cells: &Cells, edges: &EdgeTopology) -> Result<Self, MeshError> {
        let lonlat = nodes.lonlat();
        let centroids: Vec<[f64; 2]> = (0..cells.len())
            .into_par_iter()
            .map(|c| centroid(lonlat, cells.cell(c)))
            .collect();

        // Per-cell quadrilateral contributions, scattered serially.
        let contributions: Vec<Vec<(usize, f64)>> = (0..cells.len())
            .into_par_iter()
            .map(|c| {
                let cell = cells.cell(c);
                let k = cell.len();
                (0..k)
                    .map(|i| {
                        let node = cell[i];
                        let p = lonlat[node];
                        let next = unwrap_to(lonlat[cell[(i + 1) % k]], p[0]);
                        let prev = unwrap_to(lonlat[cell[(i + k - 1) % k]], p[0]);
                        let cen = unwrap_to(centroids[c], p[0]);
                        (node, polygon_area(&[p, mid(p, next), cen, mid(prev, p)]))
                    })
                    .collect()
            })
            .collect();
        let mut volumes = vec![0.0; nodes.len()];
        for (node, area) in contributions.into_iter().flatten() {
            volumes[node] += area;
        }

        let mut normals: Vec<[f64; 2]> = edges
            .endpoints()
            .par_iter()
            .enumerate()
            .map(|(e, &[a, b])| {
                let pa = lonlat[a];
                let pb = unwrap_to(lonlat[b], pa[0]);
                let along = [pb[0] - pa[0], pb[1] - pa[1]];
                let m = mid(pa, pb);
                let mut normal = [0.0, 0.0];
                for c in edges.adjacent_cells(e).into_iter().flatten() {
                    let cen = unwrap_to(centroids[c], pa[0]);
                    let d = [cen[0] - m[0], cen[1] - m[1]];
                    let mut s = [d[1], -d[0]];
                    if s[0] * along[0] + s[1] * along[1] < 0.0 {
                        s = [-s[0], -s[1]];
                    }
                    normal[0] += s[0];
                    normal[1] += s[1];
                }
                normal
            })
            .collect();

        add_pole_geometry(nodes, edges, &mut volumes, &mut normals);

        if let Some(node) = volumes.iter().position(|&v| v == 0.0) {
            return Err(MeshError::ZeroDualVolume(node));
        }
        Ok(Self { volumes, normals })
    }

    /// Assemble from precomputed geometry, for meshes whose dual is known.
    ///
    /// # Errors
    /// [`MeshError::ZeroDualVolume`] if any volume is zero.
    pub fn from_parts(volumes: Vec<f64>, normals: Vec<[f64; 2]>) -> Result<Self, MeshError> {
        if let Some(node) = volumes.iter().position(|&v| v == 0.0) {
            return Err(MeshError::ZeroDualVolume(node));
        }
        Ok(Self { volumes, normals })
    }

    /// Dual volume per node, in square degrees.
    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    /// Dual normal `[S_lon, S_lat]` per edge, in degrees.
    pub fn normals(&self) -> &[[f64; 2]] {
        &self.normals
    }
}

/// Longitudinal half-width of a ring node's dual cell, from its neighbours on
/// the same latitude.
fn ring_half_width(node: usize, nodes: &Nodes, edges: &EdgeTopology) -> f64 {
    let lonlat = nodes.lonlat();
    let p = lonlat[node];
    let (incident, _) = edges.incident(node);
    let distances: Vec<f64> = incident
        .iter()
        .filter(|&&e| !edges.is_pole_edge(e))
        .map(|&e| {
            let [a, b] = edges.edge(e);
            if a == node { b } else { a }
        })
        .filter(|&other| (lonlat[other][1] - p[1]).abs() < RING_LAT_TOLERANCE)
        .map(|other| wrap_delta(lonlat[other][0] - p[0]).abs())
        .collect();
    match distances.len() {
        0 => {
            log::warn!("ring node {node} at latitude {} has no ring neighbours", p[1]);
            0.0
        }
        1 => {
            log::warn!("ring node {node} at latitude {} has a single ring neighbour", p[1]);
            distances[0]
        }
        _ => 0.5 * distances.iter().sum::<f64>(),
    }
}

/// Pole edges get a purely latitudinal normal; their endpoints gain the area
/// between the ring and the pole.
fn add_pole_geometry(nodes: &Nodes, edges: &EdgeTopology, volumes: &mut [f64], normals: &mut [[f64; 2]]) {
    let lonlat = nodes.lonlat();
    for e in edges.pole_edges() {
        let [first, second] = edges.edge(e);
        let lat = lonlat[first][1];
        let dlon = ring_half_width(first, nodes, edges);
        normals[e] = [0.0, if lat > 0.0 { dlon } else { -dlon }];
        volumes[first] += dlon * (90.0 - lat.abs());
        let dlon_second = ring_half_width(second, nodes, edges);
        volumes[second] += dlon_second * (90.0 - lonlat[second][1].abs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::mesh::Domain;

    fn grid(nx: usize, ny: usize) -> (Nodes, Cells) {
        let mut lonlat = Vec::new();
        for j in 0..=ny {
            for i in 0..=nx {
                lonlat.push([i as f64, j as f64]);
            }
        }
        let w = nx + 1;
        let quads: Vec<[usize; 4]> = (0..ny)
            .flat_map(|j| (0..nx).map(move |i| [j * w + i, j * w + i + 1, (j + 1) * w + i + 1, (j + 1) * w + i]))
            .collect();
        (Nodes::serial(lonlat).unwrap(), Cells::from_polygons(&quads))
    }

    #[test]
    fn volumes_tile_the_domain() {
        let (nodes, cells) = grid(3, 2);
        let topo = EdgeTopology::build(&nodes, &cells, Domain::Regional, &NoComm).unwrap();
        let dual = DualMesh::build(&nodes, &cells, &topo).unwrap();
        let total: f64 = dual.volumes().iter().sum();
        assert!((total - 6.0).abs() < 1e-12);
        // interior node of a unit grid owns a unit square
        assert!((dual.volumes()[5] - 1.0).abs() < 1e-12);
        assert!((dual.volumes()[0] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn interior_dual_cell_is_closed() {
        let (nodes, cells) = grid(2, 2);
        let topo = EdgeTopology::build(&nodes, &cells, Domain::Regional, &NoComm).unwrap();
        let dual = DualMesh::build(&nodes, &cells, &topo).unwrap();
        let (incident, signs) = topo.incident(4);
        let mut sum = [0.0, 0.0];
        for (&e, &s) in incident.iter().zip(signs) {
            sum[0] += f64::from(s) * dual.normals()[e][0];
            sum[1] += f64::from(s) * dual.normals()[e][1];
        }
        assert!(sum[0].abs() < 1e-12 && sum[1].abs() < 1e-12);
        // normals point along their edge
        for (e, &[a, b]) in topo.endpoints().iter().enumerate() {
            let d = [nodes.lonlat()[b][0] - nodes.lonlat()[a][0], nodes.lonlat()[b][1] - nodes.lonlat()[a][1]];
            let n = dual.normals()[e];
            assert!(n[0] * d[0] + n[1] * d[1] > 0.0);
        }
    }

    #[test]
    fn cells_across_the_date_line_stay_contiguous() {
        let nodes = Nodes::serial(vec![[359.0, 0.0], [1.0, 0.0], [1.0, 2.0], [359.0, 2.0]]).unwrap();
        let cells = Cells::from_polygons(&[[0, 1, 2, 3]]);
        let topo = EdgeTopology::build(&nodes, &cells, Domain::Regional, &NoComm).unwrap();
        let dual = DualMesh::build(&nodes, &cells, &topo).unwrap();
        for &v in dual.volumes() {
            assert!((v - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn zero_volume_is_rejected() {
        assert_eq!(
            DualMesh::from_parts(vec![1.0, 0.0], vec![]),
            Err(MeshError::ZeroDualVolume(1))
        );
    }
}
