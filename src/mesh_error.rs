//! MeshError: unified error type for globe-mesh public APIs.
//!
//! Every fallible operation in the crate returns `Result<_, MeshError>`.
//! Variants are grouped into four kinds (see [`ErrorKind`]) so callers can tell
//! bad input apart from a missing feature or a broken mesh.

use thiserror::Error;

use crate::field::{DataType, FieldLocation};

/// Coarse classification of a [`MeshError`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Mismatched levels, rank, datatype or size between paired fields.
    Shape,
    /// Degenerate connectivity or geometry; the current call cannot proceed.
    Structural,
    /// A value type / rank combination without a specialised execution path.
    NotImplemented,
    /// Malformed or missing data from a peer partition.
    Communication,
}

/// Unified error type for globe-mesh operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeshError {
    /// Global ids are 1-based; zero is reserved.
    #[error("global id must be non-zero")]
    InvalidGlobalId,
    /// Edge ids pack both endpoint ids into 64 bits.
    #[error("global id {0} does not fit in 32 bits")]
    GlobalIdOverflow(u64),
    /// Two per-node or per-cell arrays disagree in length.
    #[error("length mismatch for `{what}`: expected {expected}, found {found}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A cell references a node index that does not exist.
    #[error("cell {cell} references node {node}, but the mesh has {nb_nodes} nodes")]
    NodeIndexOutOfRange {
        cell: usize,
        node: usize,
        nb_nodes: usize,
    },
    /// An explicitly supplied edge references a node that does not exist.
    #[error("edge {edge} references node {node}, but the mesh has {nb_nodes} nodes")]
    EdgeNodeOutOfRange {
        edge: usize,
        node: usize,
        nb_nodes: usize,
    },
    /// A cell has fewer than three distinct nodes.
    #[error("cell {cell} is degenerate: {reason}")]
    DegenerateCell { cell: usize, reason: String },
    /// More than two cells share one edge.
    #[error("edge ({0}, {1}) is shared by more than two cells")]
    NonManifoldEdge(usize, usize),
    /// A node is not connected to any edge.
    #[error("node {0} has no incident edges")]
    IsolatedNode(usize),
    /// Dual control volume of a node is zero.
    #[error("node {0} has zero dual volume")]
    ZeroDualVolume(usize),
    /// A node touches more than one pole edge.
    #[error("node {node} is an endpoint of {count} pole edges")]
    AmbiguousPoleNode { node: usize, count: usize },
    /// An owned pole-ring node whose antipode lives only on another partition.
    #[error("pole-ring node {node} at longitude {lon} has its antipode outside this partition")]
    RemoteAntipode { node: usize, lon: f64 },
    /// Structured grid parameters do not describe a usable grid.
    #[error("invalid structured grid: {0}")]
    InvalidGrid(String),
    /// A matrix entry lies outside the matrix.
    #[error("matrix entry ({row}, {col}) outside a {nrows}x{ncols} matrix")]
    MatrixIndexOutOfRange {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },
    /// The single-partition interpolation engine received a distributed source.
    #[error("structured source is distributed over {0} partitions; only 1 is supported")]
    MultiPartitionSource(usize),
    /// A field name is already present in a field set.
    #[error("field `{0}` already exists in field set")]
    DuplicateField(String),
    /// Lookup by name or position failed.
    #[error("no field `{0}` in field set")]
    MissingField(String),
    /// Requested data type differs from the field's data type.
    #[error("datatype mismatch for `{field}`: expected {expected:?}, found {found:?}")]
    DatatypeMismatch {
        field: String,
        expected: DataType,
        found: DataType,
    },
    /// Paired fields disagree in number of vertical levels.
    #[error("level mismatch for `{field}`: expected {expected}, found {found}")]
    LevelMismatch {
        field: String,
        expected: usize,
        found: usize,
    },
    /// Paired fields disagree in tensor rank or component count.
    #[error("rank mismatch for `{field}`: expected rank {expected} with {variables} components, found rank {found}")]
    RankMismatch {
        field: String,
        expected: usize,
        variables: usize,
        found: usize,
    },
    /// Number of entities in a field does not match its function space.
    #[error("size mismatch for `{field}`: expected {expected}, found {found}")]
    SizeMismatch {
        field: String,
        expected: usize,
        found: usize,
    },
    /// Field lives on a different mesh entity than the operator expects.
    #[error("field `{field}` is located on {found:?}, expected {expected:?}")]
    LocationMismatch {
        field: String,
        expected: FieldLocation,
        found: FieldLocation,
    },
    /// `execute` was called before `setup`.
    #[error("interpolation has not been set up")]
    MissingSetup,
    /// No specialised path exists for the requested combination.
    #[error("not implemented: {0}")]
    NotImplemented(String),
    /// Unknown operator name in a registry.
    #[error("no nabla operator registered as `{0}`")]
    UnknownNabla(String),
    /// The function space handed to an operator lacks a required capability.
    #[error("function space `{found}` cannot be used here: {required} required")]
    IncompatibleFunctionSpace {
        found: &'static str,
        required: &'static str,
    },
    /// A peer requested an entity this rank does not own.
    #[error("rank {rank} asked for global id {global_id}, which is not owned here")]
    UnknownRemoteEntity { rank: usize, global_id: u64 },
    /// An owner rank is outside the communicator.
    #[error("owner rank {owner} is outside a communicator of size {size}")]
    OwnerOutOfRange { owner: usize, size: usize },
    /// Communication failed or returned malformed data.
    #[error("communication with rank {neighbor} failed: {message}")]
    CommError { neighbor: usize, message: String },
}

impl MeshError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use MeshError::*;
        match self {
            DatatypeMismatch { .. }
            | LevelMismatch { .. }
            | RankMismatch { .. }
            | SizeMismatch { .. }
            | LocationMismatch { .. }
            | LengthMismatch { .. }
            | DuplicateField(_)
            | MissingField(_)
            | MissingSetup
            | UnknownNabla(_)
            | IncompatibleFunctionSpace { .. } => ErrorKind::Shape,
            NotImplemented(_) => ErrorKind::NotImplemented,
            UnknownRemoteEntity { .. } | CommError { .. } => ErrorKind::Communication,
            InvalidGlobalId
            | GlobalIdOverflow(_)
            | NodeIndexOutOfRange { .. }
            | EdgeNodeOutOfRange { .. }
            | DegenerateCell { .. }
            | NonManifoldEdge(..)
            | IsolatedNode(_)
            | ZeroDualVolume(_)
            | AmbiguousPoleNode { .. }
            | RemoteAntipode { .. }
            | MultiPartitionSource(_)
            | InvalidGrid(_)
            | MatrixIndexOutOfRange { .. }
            | OwnerOutOfRange { .. } => ErrorKind::Structural,
        }
    }

    /// True for errors that flag a missing feature rather than bad input.
    pub fn is_not_implemented(&self) -> bool {
        self.kind() == ErrorKind::NotImplemented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinguishable() {
        assert_eq!(MeshError::ZeroDualVolume(3).kind(), ErrorKind::Structural);
        assert_eq!(MeshError::MissingSetup.kind(), ErrorKind::Shape);
        assert!(MeshError::NotImplemented("i32 interpolation".into()).is_not_implemented());
        assert!(!MeshError::MultiPartitionSource(2).is_not_implemented());
    }

    #[test]
    fn messages_name_the_offender() {
        let err = MeshError::LevelMismatch {
            field: "grad".into(),
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "level mismatch for `grad`: expected 3, found 2"
        );
    }
}
