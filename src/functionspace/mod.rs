//! Function spaces: where fields live and how their halos are exchanged.
//!
//! [`FunctionSpace`] is a cheap handle over one of the concrete spaces.
//! Operators that need a particular kind ask for it with a capability query
//! such as [`FunctionSpace::as_edge_based_finite_volume`].

pub mod edge_based_fv;
pub mod node_columns;
pub mod point_cloud;
pub mod structured_columns;

use std::sync::Arc;

use crate::algs::communicator::Communicator;

pub use edge_based_fv::EdgeBasedFiniteVolume;
pub use node_columns::NodeColumns;
pub use point_cloud::PointCloud;
pub use structured_columns::StructuredColumns;

pub enum FunctionSpace<C: Communicator> {
    NodeColumns(Arc<NodeColumns<C>>),
    EdgeBasedFiniteVolume(Arc<EdgeBasedFiniteVolume<C>>),
    StructuredColumns(Arc<StructuredColumns>),
    PointCloud(Arc<PointCloud>),
}

impl<C: Communicator> Clone for FunctionSpace<C> {
    fn clone(&self) -> Self {
        match self {
            Self::NodeColumns(fs) => Self::NodeColumns(Arc::clone(fs)),
            Self::EdgeBasedFiniteVolume(fs) => Self::EdgeBasedFiniteVolume(Arc::clone(fs)),
            Self::StructuredColumns(fs) => Self::StructuredColumns(Arc::clone(fs)),
            Self::PointCloud(fs) => Self::PointCloud(Arc::clone(fs)),
        }
    }
}

impl<C: Communicator> FunctionSpace<C> {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NodeColumns(_) => "NodeColumns",
            Self::EdgeBasedFiniteVolume(_) => "EdgeBasedFiniteVolume",
            Self::StructuredColumns(_) => "StructuredColumns",
            Self::PointCloud(_) => "PointCloud",
        }
    }

    pub fn as_edge_based_finite_volume(&self) -> Option<&Arc<EdgeBasedFiniteVolume<C>>> {
        match self {
            Self::EdgeBasedFiniteVolume(fs) => Some(fs),
            _ => None,
        }
    }

    pub fn as_node_columns(&self) -> Option<&NodeColumns<C>> {
        match self {
            Self::NodeColumns(fs) => Some(fs),
            Self::EdgeBasedFiniteVolume(fs) => Some(fs.node_columns()),
            _ => None,
        }
    }

    pub fn as_structured_columns(&self) -> Option<&Arc<StructuredColumns>> {
        match self {
            Self::StructuredColumns(fs) => Some(fs),
            _ => None,
        }
    }

    pub fn as_point_cloud(&self) -> Option<&Arc<PointCloud>> {
        match self {
            Self::PointCloud(fs) => Some(fs),
            _ => None,
        }
    }
}

impl<C: Communicator> From<EdgeBasedFiniteVolume<C>> for FunctionSpace<C> {
    fn from(fs: EdgeBasedFiniteVolume<C>) -> Self {
        Self::EdgeBasedFiniteVolume(Arc::new(fs))
    }
}

impl<C: Communicator> From<NodeColumns<C>> for FunctionSpace<C> {
    fn from(fs: NodeColumns<C>) -> Self {
        Self::NodeColumns(Arc::new(fs))
    }
}

impl<C: Communicator> From<StructuredColumns> for FunctionSpace<C> {
    fn from(fs: StructuredColumns) -> Self {
        Self::StructuredColumns(Arc::new(fs))
    }
}

impl<C: Communicator> From<PointCloud> for FunctionSpace<C> {
    fn from(fs: PointCloud) -> Self {
        Self::PointCloud(Arc::new(fs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::algs::meshgen::LonLatQuads;
    use crate::config::FvmOptions;

    #[test]
    fn capability_queries() {
        let mesh = Arc::new(LonLatQuads::regional(2, 2, [0.0, 2.0], [0.0, 2.0]).generate().unwrap());
        let fvm: FunctionSpace<NoComm> =
            EdgeBasedFiniteVolume::new(mesh, NoComm, &FvmOptions::default()).unwrap().into();
        assert!(fvm.as_edge_based_finite_volume().is_some());
        assert!(fvm.as_node_columns().is_some());
        assert_eq!(fvm.clone().type_name(), "EdgeBasedFiniteVolume");

        let cloud: FunctionSpace<NoComm> = PointCloud::new(vec![[0.0, 0.0]]).into();
        assert!(cloud.as_edge_based_finite_volume().is_none());
        assert!(cloud.as_point_cloud().is_some());
    }
}
