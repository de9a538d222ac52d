//! Edge-based finite-volume gradient.
//!
//! Discrete Gauss theorem over the median dual: for every node `n`,
//!
//! ```text
//! grad(n) = 1/V(n) * sum_e sign(n, e) * S(e) * (f(first(e)) + f(second(e))) / 2
//! ```
//!
//! With the metric folded into `V` and `S` by the function space the result is
//! `(∂f/∂λ, ∂f/∂φ) / (R² cos φ)`. The orientation of a pole edge is arbitrary,
//! so its second endpoint receives the latitudinal flux with the wrong sign;
//! a serial post-pass adds it back twice.

use std::sync::Arc;

use rayon::prelude::*;

use crate::algs::communicator::Communicator;
use crate::field::{DataType, Field, FieldLocation, Real};
use crate::functionspace::{EdgeBasedFiniteVolume, FunctionSpace};
use crate::mesh_error::MeshError;
use crate::numerics::nabla::Nabla;

/// Gradient operator over an [`EdgeBasedFiniteVolume`] space.
pub struct FvmNabla<C: Communicator> {
    fvm: Arc<EdgeBasedFiniteVolume<C>>,
}

impl<C: Communicator> FvmNabla<C> {
    /// # Errors
    /// [`MeshError::IncompatibleFunctionSpace`] unless `fs` is an edge-based
    /// finite-volume space.
    pub fn new(fs: &FunctionSpace<C>) -> Result<Self, MeshError> {
        let fvm = fs
            .as_edge_based_finite_volume()
            .ok_or(MeshError::IncompatibleFunctionSpace {
                found: fs.type_name(),
                required: "EdgeBasedFiniteVolume",
            })?;
        Ok(Self {
            fvm: Arc::clone(fvm),
        })
    }

    pub fn function_space(&self) -> &Arc<EdgeBasedFiniteVolume<C>> {
        &self.fvm
    }

    fn check_shapes(&self, scalar: &Field, grad: &Field) -> Result<(), MeshError> {
        let nb_nodes = self.fvm.nb_nodes();
        scalar.expect_location(FieldLocation::Nodes)?;
        grad.expect_location(FieldLocation::Nodes)?;
        scalar.expect_size(nb_nodes)?;
        grad.expect_size(nb_nodes)?;
        if grad.levels() != scalar.levels() {
            return Err(MeshError::LevelMismatch {
                field: grad.name().to_owned(),
                expected: scalar.levels(),
                found: grad.levels(),
            });
        }
        if scalar.rank() != 0 || scalar.variables() != 1 {
            return Err(MeshError::RankMismatch {
                field: scalar.name().to_owned(),
                expected: 0,
                variables: 1,
                found: scalar.rank(),
            });
        }
        if grad.rank() != scalar.rank() + 1 || grad.variables() != 2 {
            return Err(MeshError::RankMismatch {
                field: grad.name().to_owned(),
                expected: scalar.rank() + 1,
                variables: 2,
                found: grad.rank(),
            });
        }
        if grad.datatype() != scalar.datatype() {
            return Err(MeshError::DatatypeMismatch {
                field: grad.name().to_owned(),
                expected: scalar.datatype(),
                found: grad.datatype(),
            });
        }
        Ok(())
    }

    /// Accumulate the gradient in `f64` and store it in `grad`.
    fn compute<V: Real>(&self, scalar: &Field, grad: &mut Field) -> Result<(), MeshError> {
        let nlev = scalar.levels();
        let out = grad.values_mut::<V>()?;
        if nlev == 0 {
            return Ok(());
        }
        let f = scalar.values::<V>()?;
        let topology = self.fvm.topology();
        let normals = self.fvm.normals();
        let volumes = self.fvm.volumes();
        let width = 2 * nlev;

        let mut avg_s = vec![0.0f64; topology.len() * width];
        avg_s
            .par_chunks_mut(width)
            .zip(topology.endpoints().par_iter())
            .zip(normals.par_iter())
            .for_each(|((edge, &[a, b]), s)| {
                for l in 0..nlev {
                    let avg = 0.5 * (f[a * nlev + l].widen() + f[b * nlev + l].widen());
                    edge[2 * l] = s[0] * avg;
                    edge[2 * l + 1] = s[1] * avg;
                }
            });

        let mut acc = vec![0.0f64; volumes.len() * width];
        acc.par_chunks_mut(width).enumerate().for_each(|(n, node)| {
            let (edges, signs) = topology.incident(n);
            for (&e, &sign) in edges.iter().zip(signs) {
                let sign = f64::from(sign);
                for (g, s) in node.iter_mut().zip(&avg_s[e * width..(e + 1) * width]) {
                    *g += sign * s;
                }
            }
            let inv = 1.0 / volumes[n];
            for g in node.iter_mut() {
                *g *= inv;
            }
        });

        if self.fvm.pole_correction() {
            for e in topology.pole_edges() {
                let [_, second] = topology.edge(e);
                for l in 0..nlev {
                    acc[second * width + 2 * l + 1] += 2.0 * avg_s[e * width + 2 * l + 1] / volumes[second];
                }
            }
        }

        out.par_iter_mut()
            .zip(acc.par_iter())
            .for_each(|(o, &g)| *o = V::narrow(g));
        Ok(())
    }
}

impl<C: Communicator> Nabla for FvmNabla<C> {
    fn gradient(&self, scalar: &mut Field, grad: &mut Field) -> Result<(), MeshError> {
        self.check_shapes(scalar, grad)?;
        if !scalar.datatype().is_real() {
            return Err(MeshError::NotImplemented(format!(
                "gradient of {:?} field `{}`",
                scalar.datatype(),
                scalar.name()
            )));
        }
        if scalar.is_dirty() {
            self.fvm.halo_exchange(scalar)?;
        }
        match scalar.datatype() {
            DataType::F32 => self.compute::<f32>(scalar, grad)?,
            _ => self.compute::<f64>(scalar, grad)?,
        }
        grad.set_dirty(true);
        self.fvm.halo_exchange(grad)
    }
}
