use thiserror::Error;

use crate::mesh::Vertex;

/// Why the scale operator refused to run. None of these leave a mutation behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaleError {
    #[error("Active object is not a mesh")]
    InvalidTarget,

    #[error("Must be in Edit Mode")]
    WrongMode,

    #[error("Select exactly two vertices ({count} selected)")]
    InvalidSelection { count: usize },

    #[error("Selected vertices are at the same location")]
    DegenerateSelection,

    #[error("Target distance must be a finite number, got {0}")]
    InvalidTargetDistance(f64),

    #[error("Parent transform is not invertible")]
    SingularParent,
}

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("face {face} references vertex {vertex}, but the mesh has {count} vertices")]
    VertexOutOfRange {
        face: usize,
        vertex: Vertex,
        count: usize,
    },

    #[error("face {0} is degenerate")]
    DegenerateFace(usize),

    #[error("malformed OBJ data: {0}")]
    Obj(#[from] obj::ObjError),
}

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("no object named {0:?}")]
    UnknownObject(String),

    #[error("an object named {0:?} already exists")]
    DuplicateName(String),

    #[error("parenting {child:?} to {parent:?} would create a cycle")]
    ParentCycle { child: String, parent: String },

    #[error("{0:?} is not a mesh")]
    NotAMesh(String),

    #[error("cannot enter edit mode without an active mesh")]
    ModeUnavailable,

    #[error("vertex {vertex} is out of range for {object:?} ({count} vertices)")]
    VertexOutOfRange {
        object: String,
        vertex: usize,
        count: usize,
    },

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("no operator with id {0:?}")]
    UnknownOperator(String),

    #[error("no menu named {0:?}")]
    UnknownMenu(String),

    #[error("no operation to adjust")]
    NothingToRedo,
}
