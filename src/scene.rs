use derive_more::{Display, From, Into};
use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SceneError;
use crate::idx::{Index, IndexedStore};
use crate::mesh::{Mesh, Vertex};
use crate::transform::Transform;

#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Debug, Display, From, Into)]
pub struct ObjectId(usize);

impl Index for ObjectId {}

#[derive(Clone, Debug)]
pub enum ObjectKind {
    Mesh(Mesh),
    Empty,
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Mesh(_) => "mesh",
            ObjectKind::Empty => "empty",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Object {
    pub name: String,
    pub kind: ObjectKind,
    pub transform: Transform,
    pub parent: Option<ObjectId>,
}

impl Object {
    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            ObjectKind::Empty => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            ObjectKind::Empty => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Object,
    EditMesh,
}

/// Every object's transform at one point in time.
pub type Snapshot = Vec<(ObjectId, Transform)>;

#[derive(Debug, Default)]
pub struct Scene {
    objects: IndexedStore<ObjectId, Object>,
    active: Option<ObjectId>,
    mode: Mode,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(
        &mut self,
        name: impl Into<String>,
        kind: ObjectKind,
        transform: Transform,
        parent: Option<ObjectId>,
    ) -> Result<ObjectId, SceneError> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(SceneError::DuplicateName(name));
        }
        if let Some(p) = parent {
            if !self.objects.contains(p) {
                return Err(SceneError::UnknownObject(format!("#{p}")));
            }
        }
        debug!(%name, kind = kind.name(), "adding object");
        Ok(self.objects.push(Object {
            name,
            kind,
            transform,
            parent,
        }))
    }

    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, o)| o.name == name)
            .map(|(id, _)| id)
    }

    /// Like [`Scene::find`], but an unknown name is an error.
    pub fn lookup(&self, name: &str) -> Result<ObjectId, SceneError> {
        self.find(name)
            .ok_or_else(|| SceneError::UnknownObject(name.to_string()))
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
        self.objects.iter()
    }

    pub fn set_parent(&mut self, child: ObjectId, parent: Option<ObjectId>) -> Result<(), SceneError> {
        let child_name = self.name_of(child)?;
        if let Some(p) = parent {
            let parent_name = self.name_of(p)?;
            let mut cursor = Some(p);
            while let Some(id) = cursor {
                if id == child {
                    return Err(SceneError::ParentCycle {
                        child: child_name,
                        parent: parent_name,
                    });
                }
                cursor = self.objects.get(id).and_then(|o| o.parent);
            }
        }
        if let Some(object) = self.objects.get_mut(child) {
            object.parent = parent;
        }
        Ok(())
    }

    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    pub fn active_object(&self) -> Option<&Object> {
        self.active.and_then(|id| self.objects.get(id))
    }

    /// Changing the active object drops back to object mode, as only the
    /// active mesh can be in edit mode.
    pub fn set_active(&mut self, id: Option<ObjectId>) -> Result<(), SceneError> {
        if let Some(id) = id {
            self.name_of(id)?;
        }
        if self.active != id {
            self.mode = Mode::Object;
        }
        self.active = id;
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), SceneError> {
        if mode == Mode::EditMesh && self.active_object().and_then(Object::mesh).is_none() {
            return Err(SceneError::ModeUnavailable);
        }
        debug!(?mode, "switching mode");
        self.mode = mode;
        Ok(())
    }

    pub fn select_vertices(&mut self, id: ObjectId, vertices: &[usize], extend: bool) -> Result<(), SceneError> {
        let object = self
            .objects
            .get_mut(id)
            .ok_or_else(|| SceneError::UnknownObject(format!("#{id}")))?;
        let name = object.name.clone();
        let mesh = object
            .mesh_mut()
            .ok_or_else(|| SceneError::NotAMesh(name.clone()))?;
        let count = mesh.vertex_count();
        let vertices: Vec<Vertex> = vertices.iter().copied().map(Vertex::from).collect();
        mesh.select(&vertices, extend)
            .map_err(|bad| SceneError::VertexOutOfRange {
                object: name,
                vertex: bad.into(),
                count,
            })
    }

    /// Local-to-world matrix, following the parent chain.
    pub fn world_matrix(&self, id: ObjectId) -> Matrix4<f64> {
        let mut matrix = Matrix4::identity();
        let mut cursor = Some(id);
        while let Some(object) = cursor.and_then(|id| self.objects.get(id)) {
            matrix = object.transform.to_matrix() * matrix;
            cursor = object.parent;
        }
        matrix
    }

    pub fn parent_world_matrix(&self, id: ObjectId) -> Option<Matrix4<f64>> {
        self.objects
            .get(id)
            .and_then(|o| o.parent)
            .map(|p| self.world_matrix(p))
    }

    pub fn snapshot(&self) -> Snapshot {
        self.objects.iter().map(|(id, o)| (id, o.transform)).collect()
    }

    /// Records a state to return to with [`Scene::undo`]. Clears redo history.
    pub fn push_undo(&mut self, snapshot: Snapshot) {
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
    }

    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(prev) => {
                let current = self.snapshot();
                self.restore(prev);
                self.redo_stack.push(current);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(next) => {
                let current = self.snapshot();
                self.restore(next);
                self.undo_stack.push(current);
                true
            }
            None => false,
        }
    }

    /// Forgets everything [`Scene::redo`] could bring back.
    pub fn discard_redo(&mut self) {
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    fn restore(&mut self, snapshot: Snapshot) {
        for (id, transform) in snapshot {
            if let Some(object) = self.objects.get_mut(id) {
                object.transform = transform;
            }
        }
    }

    fn name_of(&self, id: ObjectId) -> Result<String, SceneError> {
        self.objects
            .get(id)
            .map(|o| o.name.clone())
            .ok_or_else(|| SceneError::UnknownObject(format!("#{id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    fn triangle() -> ObjectKind {
        ObjectKind::Mesh(
            Mesh::new(
                vec![Point3::new(0., 0., 0.), Point3::new(1., 0., 0.), Point3::new(0., 1., 0.)],
                vec![vec![0.into(), 1.into(), 2.into()]],
            )
            .unwrap(),
        )
    }

    #[test]
    fn names_are_unique() {
        let mut scene = Scene::new();
        scene.add_object("a", ObjectKind::Empty, Transform::identity(), None).unwrap();
        let err = scene.add_object("a", ObjectKind::Empty, Transform::identity(), None).unwrap_err();
        assert!(matches!(err, SceneError::DuplicateName(_)));
    }

    #[test]
    fn parenting_cannot_loop() {
        let mut scene = Scene::new();
        let a = scene.add_object("a", ObjectKind::Empty, Transform::identity(), None).unwrap();
        let b = scene.add_object("b", ObjectKind::Empty, Transform::identity(), Some(a)).unwrap();
        let c = scene.add_object("c", ObjectKind::Empty, Transform::identity(), Some(b)).unwrap();

        assert!(matches!(scene.set_parent(a, Some(c)), Err(SceneError::ParentCycle { .. })));
        assert!(matches!(scene.set_parent(a, Some(a)), Err(SceneError::ParentCycle { .. })));
        scene.set_parent(c, Some(a)).unwrap();
        assert_eq!(scene.object(c).unwrap().parent, Some(a));
    }

    #[test]
    fn world_matrix_composes_parents() {
        let mut scene = Scene::new();
        let root = scene
            .add_object(
                "root",
                ObjectKind::Empty,
                Transform::from_location(Vector3::new(10., 0., 0.)).with_scale(Vector3::repeat(2.)),
                None,
            )
            .unwrap();
        let child = scene
            .add_object("child", triangle(), Transform::from_location(Vector3::new(0., 1., 0.)), Some(root))
            .unwrap();

        let p = scene.world_matrix(child).transform_point(&Point3::new(1., 0., 0.));
        assert_relative_eq!(p, Point3::new(12., 2., 0.));
        assert_eq!(scene.parent_world_matrix(root), None);
    }

    #[test]
    fn edit_mode_needs_an_active_mesh() {
        let mut scene = Scene::new();
        let empty = scene.add_object("empty", ObjectKind::Empty, Transform::identity(), None).unwrap();
        let mesh = scene.add_object("mesh", triangle(), Transform::identity(), None).unwrap();

        assert!(matches!(scene.set_mode(Mode::EditMesh), Err(SceneError::ModeUnavailable)));
        scene.set_active(Some(empty)).unwrap();
        assert!(matches!(scene.set_mode(Mode::EditMesh), Err(SceneError::ModeUnavailable)));

        scene.set_active(Some(mesh)).unwrap();
        scene.set_mode(Mode::EditMesh).unwrap();
        scene.set_active(Some(empty)).unwrap();
        assert_eq!(scene.mode(), Mode::Object);
    }

    #[test]
    fn out_of_range_selection_is_reported() {
        let mut scene = Scene::new();
        let mesh = scene.add_object("mesh", triangle(), Transform::identity(), None).unwrap();
        let err = scene.select_vertices(mesh, &[0, 7], false).unwrap_err();
        assert!(matches!(err, SceneError::VertexOutOfRange { vertex: 7, count: 3, .. }));
    }

    #[test]
    fn undo_and_redo_swap_transforms() {
        let mut scene = Scene::new();
        let a = scene.add_object("a", ObjectKind::Empty, Transform::identity(), None).unwrap();

        scene.push_undo(scene.snapshot());
        scene.object_mut(a).unwrap().transform.location.x = 4.;

        assert!(scene.undo());
        assert_eq!(scene.object(a).unwrap().transform.location.x, 0.);
        assert!(scene.redo());
        assert_eq!(scene.object(a).unwrap().transform.location.x, 4.);
        assert!(!scene.redo());
    }
}
