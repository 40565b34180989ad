//! Uniformly scale a mesh object so that two selected vertices end up a given
//! distance apart, keeping their midpoint fixed in world space.
//!
//! [`ops::scale_to_distance`] is the pure computation. Everything else
//! ([`scene`], [`operator`], [`registry`], [`server`]) is the host around it:
//! objects with parented transforms, edit-mode vertex selection, undo, a
//! context menu, and an HTTP surface to drive them.

pub mod config;
pub mod error;
pub mod idx;
pub mod mesh;
pub mod operator;
pub mod ops;
pub mod registry;
pub mod scene;
pub mod server;
pub mod transform;

pub use error::{MeshError, RegistryError, ScaleError, SceneError};
pub use ops::{scale_to_distance, SelectionPair, UniformScale};
pub use scene::{Mode, ObjectKind, Scene};
pub use transform::Transform;
