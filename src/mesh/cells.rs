//! Cell connectivity: polygons stored in CSR form.

use crate::mesh_error::MeshError;

/// Polygonal cells as `offsets`/`nodes` arrays; cell `c` is
/// `nodes[offsets[c]..offsets[c + 1]]`, listed in boundary order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cells {
    offsets: Vec<usize>,
    nodes: Vec<usize>,
}

impl Cells {
    pub fn from_polygons<P: AsRef<[usize]>>(polygons: &[P]) -> Self {
        let mut offsets = Vec::with_capacity(polygons.len() + 1);
        let mut nodes = Vec::new();
        offsets.push(0);
        for p in polygons {
            nodes.extend_from_slice(p.as_ref());
            offsets.push(nodes.len());
        }
        Self { offsets, nodes }
    }

    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node indices of cell `c`. Panics if `c >= len()`.
    #[inline]
    pub fn cell(&self, c: usize) -> &[usize] {
        &self.nodes[self.offsets[c]..self.offsets[c + 1]]
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[usize]> + '_ {
        self.offsets.windows(2).map(|w| &self.nodes[w[0]..w[1]])
    }

    /// Check node references and reject degenerate polygons.
    ///
    /// # Errors
    /// - [`MeshError::NodeIndexOutOfRange`] for a reference past `nb_nodes`.
    /// - [`MeshError::DegenerateCell`] for fewer than three nodes or a repeated node.
    pub fn validate(&self, nb_nodes: usize) -> Result<(), MeshError> {
        for (c, cell) in self.iter().enumerate() {
            if let Some(&node) = cell.iter().find(|&&n| n >= nb_nodes) {
                return Err(MeshError::NodeIndexOutOfRange {
                    cell: c,
                    node,
                    nb_nodes,
                });
            }
            if cell.len() < 3 {
                return Err(MeshError::DegenerateCell {
                    cell: c,
                    reason: format!("{} nodes", cell.len()),
                });
            }
            for (i, &n) in cell.iter().enumerate() {
                if cell[i + 1..].contains(&n) {
                    return Err(MeshError::DegenerateCell {
                        cell: c,
                        reason: format!("node {n} appears twice"),
                    });
                }
            }
        }
        Ok(())
    }
}
