//! Interpolation from a single-partition structured grid to scattered points.
//!
//! `setup` fixes the source grid and the target points. In matrix mode it also
//! assembles the weights into a [`CsrMatrix`], so each `execute` is one sparse
//! product per field. In matrix-free mode `execute` evaluates stencils on the
//! fly. Both modes see the same normalised target points, so they agree
//! across the date line. Ghost targets are never written.

use std::sync::Arc;

use rayon::prelude::*;

use crate::field::{DataType, Field, FieldLocation, FieldSet, Real};
use crate::functionspace::{PointCloud, StructuredColumns};
use crate::interpolation::grid::StructuredGrid;
use crate::interpolation::kernel::{Kernel, KernelWorkspace};
use crate::interpolation::sparse::CsrMatrix;
use crate::mesh_error::MeshError;

#[derive(Debug)]
struct SetupState {
    grid: Arc<StructuredGrid>,
    points: Vec<[f64; 2]>,
    ghost: Vec<bool>,
    matrix: Option<CsrMatrix>,
}

#[derive(Debug)]
pub struct StructuredInterpolation2D<K: Kernel> {
    kernel: K,
    matrix_free: bool,
    state: Option<SetupState>,
}

impl<K: Kernel> StructuredInterpolation2D<K> {
    pub fn new(kernel: K, matrix_free: bool) -> Self {
        Self {
            kernel,
            matrix_free,
            state: None,
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn is_matrix_free(&self) -> bool {
        self.matrix_free
    }

    pub fn is_setup(&self) -> bool {
        self.state.is_some()
    }

    /// Assembled weights, if set up in matrix mode.
    pub fn matrix(&self) -> Option<&CsrMatrix> {
        self.state.as_ref().and_then(|s| s.matrix.as_ref())
    }

    /// Bind the source grid and target points, replacing any earlier setup.
    ///
    /// # Errors
    /// [`MeshError::MultiPartitionSource`] for a distributed source, and
    /// [`MeshError::InvalidGrid`] if the grid is too small for the kernel.
    pub fn setup(&mut self, source: &StructuredColumns, target: &PointCloud) -> Result<(), MeshError> {
        if source.nb_partitions() > 1 {
            return Err(MeshError::MultiPartitionSource(source.nb_partitions()));
        }
        let grid = Arc::clone(source.grid());
        self.kernel.check_grid(&grid)?;

        let points: Vec<[f64; 2]> = target.lonlat().par_iter().map(|&p| grid.normalise(p)).collect();
        let ghost = target.ghost().to_vec();

        let matrix = if self.matrix_free {
            log::info!(
                "interpolation {:?} {} -> {} points: matrix-free",
                self.kernel.kind(),
                grid.name(),
                points.len()
            );
            None
        } else {
            let kernel = &self.kernel;
            let mut triplets = kernel.allocate_triplets(points.len());
            triplets
                .par_chunks_mut(kernel.stencil_size())
                .zip(points.par_iter().zip(ghost.par_iter()))
                .enumerate()
                .for_each_init(KernelWorkspace::default, |ws, (row, (slot, (&p, &g)))| {
                    if !g {
                        kernel.insert_triplets(row, p, &grid, slot, ws);
                    }
                });
            let matrix = CsrMatrix::from_triplets(points.len(), grid.size(), &triplets)?;
            log::info!(
                "interpolation {:?} {} -> {} points: {} weights",
                kernel.kind(),
                grid.name(),
                points.len(),
                matrix.nnz()
            );
            Some(matrix)
        };

        self.state = Some(SetupState {
            grid,
            points,
            ghost,
            matrix,
        });
        Ok(())
    }

    fn state(&self) -> Result<&SetupState, MeshError> {
        self.state.as_ref().ok_or(MeshError::MissingSetup)
    }

    fn check_pair(state: &SetupState, source: &Field, target: &Field) -> Result<(), MeshError> {
        source.expect_location(FieldLocation::Points)?;
        target.expect_location(FieldLocation::Points)?;
        source.expect_size(state.grid.size())?;
        target.expect_size(state.points.len())?;
        if target.datatype() != source.datatype() {
            return Err(MeshError::DatatypeMismatch {
                field: target.name().to_owned(),
                expected: source.datatype(),
                found: target.datatype(),
            });
        }
        if target.levels() != source.levels() {
            return Err(MeshError::LevelMismatch {
                field: target.name().to_owned(),
                expected: source.levels(),
                found: target.levels(),
            });
        }
        if target.rank() != source.rank() || target.variables() != source.variables() {
            return Err(MeshError::RankMismatch {
                field: target.name().to_owned(),
                expected: source.rank(),
                variables: source.variables(),
                found: target.rank(),
            });
        }
        match (source.datatype(), source.rank()) {
            (DataType::F32 | DataType::F64, 0 | 1) => Ok(()),
            (datatype, rank) => Err(MeshError::NotImplemented(format!(
                "interpolation of {datatype:?} rank-{rank} field `{}`",
                source.name()
            ))),
        }
    }

    /// Interpolate one field.
    ///
    /// Sources are read as they are, dirty or not: a single-partition grid
    /// has no ghost points for a halo exchange to refresh, so the source's
    /// dirty flag is left untouched.
    pub fn execute_field(&self, source: &Field, target: &mut Field) -> Result<(), MeshError> {
        let state = self.state()?;
        Self::check_pair(state, source, target)?;
        self.execute_checked(state, source, target)
    }

    /// Interpolate every field of `sources` into the field of `targets` at the
    /// same position. All pairs are checked before any target is written.
    pub fn execute(&self, sources: &FieldSet, targets: &mut FieldSet) -> Result<(), MeshError> {
        let state = self.state()?;
        if sources.len() != targets.len() {
            return Err(MeshError::LengthMismatch {
                what: "target field set",
                expected: sources.len(),
                found: targets.len(),
            });
        }
        for (source, target) in sources.iter().zip(targets.iter()) {
            Self::check_pair(state, source, target)?;
        }
        for (source, target) in sources.iter().zip(targets.iter_mut()) {
            self.execute_checked(state, source, target)?;
        }
        Ok(())
    }

    fn execute_checked(&self, state: &SetupState, source: &Field, target: &mut Field) -> Result<(), MeshError> {
        match source.datatype() {
            DataType::F32 => self.execute_values::<f32>(state, source, target)?,
            _ => self.execute_values::<f64>(state, source, target)?,
        }
        target.set_dirty(true);
        Ok(())
    }

    fn execute_values<V: Real>(&self, state: &SetupState, source: &Field, target: &mut Field) -> Result<(), MeshError> {
        let stride = source.shape().stride();
        let src = source.values::<V>()?;
        let out = target.values_mut::<V>()?;
        if stride == 0 {
            return Ok(());
        }
        if let Some(matrix) = &state.matrix {
            return matrix.apply(src, out, stride, &state.ghost);
        }
        let kernel = &self.kernel;
        let grid = &*state.grid;
        out.par_chunks_mut(stride)
            .zip(state.points.par_iter().zip(state.ghost.par_iter()))
            .for_each_init(KernelWorkspace::default, |ws, (values, (&p, &g))| {
                if g {
                    return;
                }
                kernel.compute_stencil(grid, p, &mut ws.stencil);
                kernel.compute_weights(grid, p, &ws.stencil, &mut ws.weights);
                kernel.interpolate(grid, &ws.stencil, &ws.weights, src, stride, values);
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::bilinear::Bilinear;

    fn source() -> StructuredColumns {
        StructuredColumns::new(Arc::new(StructuredGrid::regular_lonlat(8, 5).unwrap()))
    }

    #[test]
    fn execute_before_setup_fails() {
        let interp = StructuredInterpolation2D::new(Bilinear, false);
        let src = source().create_field::<f64>("t", 1, 1);
        let mut dst = PointCloud::new(vec![[0.0, 0.0]]).create_field::<f64>("t", 1, 1);
        assert_eq!(interp.execute_field(&src, &mut dst), Err(MeshError::MissingSetup));
    }

    #[test]
    fn dirty_source_is_read_without_exchange() {
        let fs = source();
        let targets = PointCloud::new(vec![[10.0, 10.0], [200.0, -30.0]]);
        let mut interp = StructuredInterpolation2D::new(Bilinear, true);
        interp.setup(&fs, &targets).unwrap();

        let mut src = fs.create_field::<f64>("t", 1, 1);
        src.fill(2.0f64).unwrap();
        src.set_dirty(true);
        let mut dst = targets.create_field::<f64>("t", 1, 1);
        interp.execute_field(&src, &mut dst).unwrap();
        assert!(src.is_dirty());
        assert!(dst.values::<f64>().unwrap().iter().all(|&v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn distributed_source_is_rejected() {
        let mut interp = StructuredInterpolation2D::new(Bilinear, false);
        let fs = StructuredColumns::distributed(Arc::clone(source().grid()), 2);
        let err = interp.setup(&fs, &PointCloud::new(vec![])).unwrap_err();
        assert_eq!(err, MeshError::MultiPartitionSource(2));
        assert!(!interp.is_setup());
    }

    #[test]
    fn bad_pair_leaves_every_target_untouched() {
        let fs = source();
        let targets = PointCloud::new(vec![[10.0, 10.0], [200.0, -30.0]]);
        let mut interp = StructuredInterpolation2D::new(Bilinear, false);
        interp.setup(&fs, &targets).unwrap();

        let mut sources = FieldSet::new("src");
        let mut a = fs.create_field::<f64>("a", 1, 1);
        a.fill(1.0f64).unwrap();
        sources.add(a).unwrap();
        sources.add(fs.create_field::<f64>("b", 2, 1)).unwrap();

        let mut out = FieldSet::new("dst");
        out.add(targets.create_field::<f64>("a", 1, 1)).unwrap();
        out.add(targets.create_field::<f64>("b", 3, 1)).unwrap();
        assert!(matches!(interp.execute(&sources, &mut out), Err(MeshError::LevelMismatch { .. })));
        assert!(out.field("a").unwrap().values::<f64>().unwrap().iter().all(|&v| v == 0.0));
    }
}
