//! Lon/lat quadrilateral mesh generator with row-stripe partitioning.
//!
//! Nodes sit on a tensor product of longitudes and latitude rows; cells are
//! the quads between neighbouring rows. Periodic generators wrap in longitude
//! and produce [`Domain::Global`] meshes. Partitions own contiguous stripes of
//! cell rows and carry a one-cell halo on each side.

use std::ops::Range;

use crate::mesh::{Cells, Domain, Mesh, Nodes};
use crate::mesh_error::MeshError;
use crate::topology::global_id::GlobalId;
use crate::topology::ownership::Ownership;

/// Description of a lon/lat quad mesh.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LonLatQuads {
    /// Node longitudes of every row, in degrees.
    pub lons: Vec<f64>,
    /// Latitudes of the node rows, in degrees.
    pub lats: Vec<f64>,
    /// Wrap cells around in longitude.
    pub periodic: bool,
}

fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![a];
    }
    (0..n)
        .map(|k| a + (b - a) * k as f64 / (n - 1) as f64)
        .collect()
}

impl LonLatQuads {
    /// Global mesh of `nx` longitudes and the given latitude rows.
    pub fn global(nx: usize, lats: Vec<f64>) -> Self {
        let lons = (0..nx).map(|i| 360.0 * i as f64 / nx as f64).collect();
        Self {
            lons,
            lats,
            periodic: true,
        }
    }

    /// Global mesh with `ny` rows at cell-centred latitudes, so no node sits
    /// on a pole.
    pub fn regular_global(nx: usize, ny: usize) -> Self {
        let dlat = 180.0 / ny as f64;
        let lats = (0..ny).map(|j| 90.0 - (j as f64 + 0.5) * dlat).collect();
        Self::global(nx, lats)
    }

    /// Limited-area patch of `nx` by `ny` cells.
    pub fn regional(nx: usize, ny: usize, lon: [f64; 2], lat: [f64; 2]) -> Self {
        Self {
            lons: linspace(lon[0], lon[1], nx + 1),
            lats: linspace(lat[0], lat[1], ny + 1),
            periodic: false,
        }
    }

    pub fn nb_nodes(&self) -> usize {
        self.lons.len() * self.lats.len()
    }

    fn cell_columns(&self) -> usize {
        if self.periodic {
            self.lons.len()
        } else {
            self.lons.len().saturating_sub(1)
        }
    }

    fn cell_rows(&self) -> usize {
        self.lats.len().saturating_sub(1)
    }

    /// Cell rows owned by `part` out of `nb_parts`.
    pub fn stripe(&self, part: usize, nb_parts: usize) -> Range<usize> {
        let rows = self.cell_rows();
        (part * rows / nb_parts)..((part + 1) * rows / nb_parts)
    }

    fn row_owner(&self, cell_row: usize, nb_parts: usize) -> usize {
        let rows = self.cell_rows();
        (0..nb_parts)
            .rev()
            .find(|&p| p * rows / nb_parts <= cell_row)
            .unwrap_or(0)
    }

    /// Owner of a node row: the owner of the cell row below it, or of the
    /// last cell row for the last node row.
    fn node_row_owner(&self, node_row: usize, nb_parts: usize) -> usize {
        self.row_owner(node_row.min(self.cell_rows().saturating_sub(1)), nb_parts)
    }

    /// Whole mesh on a single rank.
    pub fn generate(&self) -> Result<Mesh, MeshError> {
        self.generate_partition(0, 1)
    }

    /// Partition `part` of `nb_parts`, including its halo.
    ///
    /// # Errors
    /// [`MeshError::OwnerOutOfRange`] if `part >= nb_parts`, and
    /// [`MeshError::LengthMismatch`] if there are fewer cell rows than parts.
    pub fn generate_partition(&self, part: usize, nb_parts: usize) -> Result<Mesh, MeshError> {
        if part >= nb_parts {
            return Err(MeshError::OwnerOutOfRange {
                owner: part,
                size: nb_parts,
            });
        }
        let rows = self.cell_rows();
        if rows < nb_parts {
            return Err(MeshError::LengthMismatch {
                what: "cell rows per partition",
                expected: nb_parts,
                found: rows,
            });
        }
        let nx = self.lons.len();
        let stripe = self.stripe(part, nb_parts);
        let first_row = stripe.start.saturating_sub(1);
        let last_row = (stripe.end + 1).min(rows);

        let mut lonlat = Vec::new();
        let mut global_ids = Vec::new();
        let mut owners = Vec::new();
        for j in first_row..=last_row {
            let owner = self.node_row_owner(j, nb_parts);
            for (i, &lon) in self.lons.iter().enumerate() {
                lonlat.push([lon, self.lats[j]]);
                global_ids.push(GlobalId::new((j * nx + i + 1) as u64)?);
                owners.push(owner);
            }
        }

        let local = |j: usize, i: usize| (j - first_row) * nx + i % nx;
        let quads: Vec<[usize; 4]> = (first_row..last_row)
            .flat_map(|j| {
                (0..self.cell_columns())
                    .map(move |i| [local(j, i), local(j, i + 1), local(j + 1, i + 1), local(j + 1, i)])
            })
            .collect();

        let nodes = Nodes::new(lonlat, global_ids, Ownership::from_owners(&owners, part))?;
        let domain = if self.periodic {
            Domain::Global
        } else {
            Domain::Regional
        };
        Mesh::new(nodes, Cells::from_polygons(&quads), domain)
    }
}
