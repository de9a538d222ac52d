//! Compressed sparse row matrix for stored interpolation weights.

use rayon::prelude::*;

use crate::field::Real;
use crate::mesh_error::MeshError;

/// One `(row, col, value)` matrix entry.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Triplet {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CsrMatrix {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Assemble from triplets in any order. Duplicate entries are summed and
    /// exact zeros are dropped.
    ///
    /// # Errors
    /// [`MeshError::MatrixIndexOutOfRange`] for an entry outside the matrix.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[Triplet]) -> Result<Self, MeshError> {
        let mut entries: Vec<Triplet> = triplets.iter().filter(|t| t.value != 0.0).copied().collect();
        if let Some(t) = entries.iter().find(|t| t.row >= nrows || t.col >= ncols) {
            return Err(MeshError::MatrixIndexOutOfRange {
                row: t.row,
                col: t.col,
                nrows,
                ncols,
            });
        }
        entries.par_sort_unstable_by_key(|t| (t.row, t.col));

        let mut row_ptr = vec![0usize; nrows + 1];
        let mut col_idx = Vec::with_capacity(entries.len());
        let mut values: Vec<f64> = Vec::with_capacity(entries.len());
        let mut rows = Vec::with_capacity(entries.len());
        for t in entries {
            match (rows.last(), col_idx.last()) {
                (Some(&r), Some(&c)) if r == t.row && c == t.col => {
                    if let Some(v) = values.last_mut() {
                        *v += t.value;
                    }
                }
                _ => {
                    rows.push(t.row);
                    col_idx.push(t.col);
                    values.push(t.value);
                }
            }
        }
        // Summed duplicates may cancel.
        let keep: Vec<bool> = values.iter().map(|&v| v != 0.0).collect();
        let mut k = 0;
        rows.retain(|_| {
            k += 1;
            keep[k - 1]
        });
        k = 0;
        col_idx.retain(|_| {
            k += 1;
            keep[k - 1]
        });
        values.retain(|&v| v != 0.0);

        for &r in &rows {
            row_ptr[r + 1] += 1;
        }
        for r in 0..nrows {
            row_ptr[r + 1] += row_ptr[r];
        }
        Ok(Self {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        })
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values of row `r`.
    pub fn row(&self, r: usize) -> (&[usize], &[f64]) {
        let range = self.row_ptr[r]..self.row_ptr[r + 1];
        (&self.col_idx[range.clone()], &self.values[range])
    }

    /// `y = A x` for `stride` interleaved vectors; rows flagged in `skip` keep
    /// their current values.
    pub fn apply<V: Real>(&self, x: &[V], y: &mut [V], stride: usize, skip: &[bool]) -> Result<(), MeshError> {
        if x.len() != self.ncols * stride {
            return Err(MeshError::LengthMismatch {
                what: "matrix operand",
                expected: self.ncols * stride,
                found: x.len(),
            });
        }
        if y.len() != self.nrows * stride {
            return Err(MeshError::LengthMismatch {
                what: "matrix result",
                expected: self.nrows * stride,
                found: y.len(),
            });
        }
        if stride == 0 {
            return Ok(());
        }
        y.par_chunks_mut(stride).enumerate().for_each(|(r, out)| {
            if skip.get(r).copied().unwrap_or(false) {
                return;
            }
            let (cols, vals) = self.row(r);
            for (q, o) in out.iter_mut().enumerate() {
                let acc: f64 = cols
                    .iter()
                    .zip(vals)
                    .map(|(&c, &w)| w * x[c * stride + q].widen())
                    .sum();
                *o = V::narrow(acc);
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(row: usize, col: usize, value: f64) -> Triplet {
        Triplet { row, col, value }
    }

    #[test]
    fn duplicates_are_summed_and_zeros_dropped() {
        let m = CsrMatrix::from_triplets(
            3,
            4,
            &[t(2, 1, 1.0), t(0, 3, 0.5), t(0, 3, 0.25), t(1, 0, 0.0), t(2, 0, 2.0), t(2, 2, 1.0), t(2, 2, -1.0)],
        )
        .unwrap();
        assert_eq!(m.nnz(), 3);
        assert_eq!(m.row(0), (&[3][..], &[0.75][..]));
        assert_eq!(m.row(1).0.len(), 0);
        assert_eq!(m.row(2), (&[0, 1][..], &[2.0, 1.0][..]));
    }

    #[test]
    fn out_of_range_entry_is_rejected() {
        assert!(matches!(
            CsrMatrix::from_triplets(2, 2, &[t(0, 2, 1.0)]),
            Err(MeshError::MatrixIndexOutOfRange { col: 2, .. })
        ));
    }

    #[test]
    fn apply_with_stride_and_skip() {
        let m = CsrMatrix::from_triplets(2, 2, &[t(0, 0, 0.5), t(0, 1, 0.5), t(1, 1, 1.0)]).unwrap();
        // two values per point
        let x = [1.0f64, 10.0, 3.0, 30.0];
        let mut y = [-1.0f64; 4];
        m.apply(&x, &mut y, 2, &[false, true]).unwrap();
        assert_eq!(y, [2.0, 20.0, -1.0, -1.0]);
        assert!(m.apply(&x[..2], &mut y, 2, &[]).is_err());
    }
}
