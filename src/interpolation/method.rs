//! Kernel selection at construction time.

use crate::config::InterpolationOptions;
use crate::field::{Field, FieldSet};
use crate::functionspace::{PointCloud, StructuredColumns};
use crate::interpolation::bilinear::Bilinear;
use crate::interpolation::cubic::Cubic;
use crate::interpolation::kernel::KernelKind;
use crate::interpolation::nearest::Nearest;
use crate::interpolation::sparse::CsrMatrix;
use crate::interpolation::structured2d::StructuredInterpolation2D;
use crate::mesh_error::MeshError;

/// Structured-grid interpolation with the kernel chosen by [`KernelKind`].
#[derive(Debug)]
pub enum Interpolation {
    Bilinear(StructuredInterpolation2D<Bilinear>),
    Cubic(StructuredInterpolation2D<Cubic>),
    Nearest(StructuredInterpolation2D<Nearest>),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Interpolation::Bilinear($inner) => $body,
            Interpolation::Cubic($inner) => $body,
            Interpolation::Nearest($inner) => $body,
        }
    };
}

impl Interpolation {
    pub fn new(options: &InterpolationOptions) -> Self {
        let mf = options.matrix_free;
        match options.kernel {
            KernelKind::Bilinear => Self::Bilinear(StructuredInterpolation2D::new(Bilinear, mf)),
            KernelKind::Cubic => Self::Cubic(StructuredInterpolation2D::new(Cubic, mf)),
            KernelKind::Nearest => Self::Nearest(StructuredInterpolation2D::new(Nearest, mf)),
        }
    }

    pub fn kind(&self) -> KernelKind {
        match self {
            Self::Bilinear(_) => KernelKind::Bilinear,
            Self::Cubic(_) => KernelKind::Cubic,
            Self::Nearest(_) => KernelKind::Nearest,
        }
    }

    pub fn setup(&mut self, source: &StructuredColumns, target: &PointCloud) -> Result<(), MeshError> {
        dispatch!(self, i => i.setup(source, target))
    }

    pub fn execute(&self, sources: &FieldSet, targets: &mut FieldSet) -> Result<(), MeshError> {
        dispatch!(self, i => i.execute(sources, targets))
    }

    pub fn execute_field(&self, source: &Field, target: &mut Field) -> Result<(), MeshError> {
        dispatch!(self, i => i.execute_field(source, target))
    }

    pub fn matrix(&self) -> Option<&CsrMatrix> {
        dispatch!(self, i => i.matrix())
    }

    pub fn is_matrix_free(&self) -> bool {
        dispatch!(self, i => i.is_matrix_free())
    }
}

impl Default for Interpolation {
    fn default() -> Self {
        Self::new(&InterpolationOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_select_the_kernel() {
        let opts: InterpolationOptions = serde_json::from_str(r#"{"kernel":"cubic","matrix_free":true}"#).unwrap();
        let interp = Interpolation::new(&opts);
        assert_eq!(interp.kind(), KernelKind::Cubic);
        assert!(interp.is_matrix_free());
        assert!(interp.matrix().is_none());
        assert_eq!(Interpolation::default().kind(), KernelKind::Bilinear);
    }
}
