use std::collections::BTreeSet;

use derive_more::{Display, From, Into};
use nalgebra::{Matrix4, Point3, Vector3};
use obj::{Group, IndexTuple, ObjData, Object, SimplePolygon};

use crate::error::MeshError;

#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Debug, Display, From, Into)]
pub struct Face(usize);

#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Debug, Display, From, Into)]
pub struct Vertex(usize);

#[derive(Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash, Debug)]
pub struct Corner {
    pub face: Face,
    pub index: usize,
}

/// Polygon mesh in object-local coordinates, carrying its own vertex selection
/// the way an edit-mode mesh does.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<Vec<Vertex>>,
    selected: BTreeSet<Vertex>,
}

pub struct FaceCornersIter {
    face: Face,
    index: usize,
    count: usize,
}

impl Iterator for FaceCornersIter {
    type Item = Corner;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let index = self.index;
        self.index += 1;
        Some(Corner {
            face: self.face,
            index,
        })
    }
}

impl Mesh {
    /// Builds a mesh, rejecting faces that point past the vertex list or
    /// collapse to fewer than three distinct corners.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<Vec<Vertex>>) -> Result<Self, MeshError> {
        let mesh = Self {
            vertices,
            faces,
            selected: BTreeSet::new(),
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Flattens every object and group of an OBJ file into one polygon mesh.
    pub fn from_obj(data: &ObjData) -> Result<Self, MeshError> {
        let vertices = data
            .position
            .iter()
            .map(|p| Point3::new(p[0] as f64, p[1] as f64, p[2] as f64))
            .collect();
        let faces = data
            .objects
            .iter()
            .flat_map(|object| object.groups.iter())
            .flat_map(|group| group.polys.iter())
            .map(|poly| poly.0.iter().map(|tuple| Vertex(tuple.0)).collect())
            .collect();
        Self::new(vertices, faces)
    }

    /// Writes the mesh as OBJ data, optionally baking `matrix` into the
    /// positions. Each face gets its own normal.
    pub fn to_obj(&self, name: &str, matrix: Option<&Matrix4<f64>>) -> ObjData {
        let points: Vec<Point3<f64>> = match matrix {
            Some(m) => self.vertices.iter().map(|p| m.transform_point(p)).collect(),
            None => self.vertices.clone(),
        };

        let mut normal = Vec::with_capacity(self.faces.len());
        let mut polys = Vec::with_capacity(self.faces.len());
        for (f, corners) in self.faces.iter().enumerate() {
            let n = Face(f).compute_normal(&points, self);
            let normal_index = if n.norm_squared() == 0. {
                None
            } else {
                normal.push([n.x as f32, n.y as f32, n.z as f32]);
                Some(normal.len() - 1)
            };
            polys.push(SimplePolygon(
                corners
                    .iter()
                    .map(|v| IndexTuple(v.0, None, normal_index))
                    .collect(),
            ));
        }

        ObjData {
            position: points
                .iter()
                .map(|p| [p.x as f32, p.y as f32, p.z as f32])
                .collect(),
            texture: Vec::new(),
            normal,
            objects: vec![Object {
                name: name.to_string(),
                groups: vec![Group {
                    name: "default".to_string(),
                    index: 0,
                    material: None,
                    polys,
                }],
            }],
            material_libs: Vec::new(),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn point(&self, v: Vertex) -> Option<&Point3<f64>> {
        self.vertices.get(v.0)
    }

    /// Replaces (or with `extend`, adds to) the selection. Returns the first
    /// out-of-range vertex without touching the selection if there is one.
    pub fn select(&mut self, vertices: &[Vertex], extend: bool) -> Result<(), Vertex> {
        if let Some(bad) = vertices.iter().find(|v| !v.is_valid(self)) {
            return Err(*bad);
        }
        if !extend {
            self.deselect_all();
        }
        self.selected.extend(vertices.iter().copied());
        Ok(())
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    /// Selected vertices in index order.
    pub fn selected(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.selected.iter().copied()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn selected_points(&self) -> Vec<Point3<f64>> {
        self.selected
            .iter()
            .filter_map(|v| self.point(*v).copied())
            .collect()
    }

    fn validate(&self) -> Result<(), MeshError> {
        for (f, corners) in self.faces.iter().enumerate() {
            if let Some(bad) = corners.iter().find(|v| !v.is_valid(self)) {
                return Err(MeshError::VertexOutOfRange {
                    face: f,
                    vertex: *bad,
                    count: self.vertices.len(),
                });
            }
            if Face(f).is_degenerate(self) {
                return Err(MeshError::DegenerateFace(f));
            }
        }
        Ok(())
    }
}

impl Face {
    pub fn corner_count(&self, mesh: &Mesh) -> usize {
        mesh.faces[self.0].len()
    }

    pub fn corners(&self, mesh: &Mesh) -> FaceCornersIter {
        FaceCornersIter {
            face: *self,
            index: 0,
            count: self.corner_count(mesh),
        }
    }

    /// Normal of the face spanned by its first three corners, looked up in
    /// `points` (which may be a transformed copy of the mesh positions).
    pub fn compute_normal(&self, points: &[Point3<f64>], mesh: &Mesh) -> Vector3<f64> {
        let mut corners = self.corners(mesh).map(|c| points[c.to_vertex(mesh).0]);
        let (Some(a), Some(b), Some(c)) = (corners.next(), corners.next(), corners.next()) else {
            return Vector3::zeros();
        };
        let mut n = (b - a).cross(&(c - a));
        if n.norm_squared() == 0. {
            return n;
        }
        n.normalize_mut();
        n
    }

    pub fn is_degenerate(&self, mesh: &Mesh) -> bool {
        let corners = &mesh.faces[self.0];
        if corners.len() < 3 {
            return true;
        }
        for a in 0..(corners.len() - 1) {
            for b in (a + 1)..corners.len() {
                if corners[a] == corners[b] {
                    return true;
                }
            }
        }
        false
    }
}

impl Vertex {
    pub fn is_valid(&self, mesh: &Mesh) -> bool {
        self.0 < mesh.vertices.len()
    }
}

impl Corner {
    fn to_vertex(self, mesh: &Mesh) -> Vertex {
        mesh.faces[self.face.0][self.index]
    }
}
