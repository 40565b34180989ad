//! Operators: named, undoable edits invoked from menus.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ScaleError;
use crate::ops::{scale_to_distance, SelectionPair, UniformScale, MIN_TARGET_DISTANCE};
use crate::scene::{Mode, ObjectId, Scene};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub level: ReportLevel,
    pub message: String,
}

/// Messages an operator leaves for the user, in the order it emitted them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reports(Vec<Report>);

impl Reports {
    pub fn report(&mut self, level: ReportLevel, message: impl Into<String>) {
        self.0.push(Report {
            level,
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.report(ReportLevel::Error, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.report(ReportLevel::Warning, message)
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.report(ReportLevel::Info, message)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Report> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Report> {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorStatus {
    Finished,
    Cancelled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OperatorFlags {
    /// Remember the last properties so the run can be adjusted afterwards.
    pub register: bool,
    /// Snapshot the scene before a run that changes it.
    pub undo: bool,
}

/// What an invoke produced: either a dialog pre-filled with properties for
/// the user to confirm, or a refusal.
#[derive(Clone, Debug, PartialEq)]
pub enum Invocation {
    Dialog(Value),
    Cancelled,
}

pub trait Operator: Send + Sync {
    fn id(&self) -> &'static str;

    fn label(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    fn flags(&self) -> OperatorFlags {
        OperatorFlags::default()
    }

    /// Whether the operator makes sense in the current scene at all. Decides
    /// menu visibility; `execute` still checks its own preconditions.
    fn poll(&self, scene: &Scene) -> bool;

    fn invoke(&self, scene: &Scene, reports: &mut Reports) -> Invocation;

    fn execute(&self, scene: &mut Scene, properties: &Value, reports: &mut Reports) -> OperatorStatus;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleProperties {
    /// Desired world-space distance between the two selected vertices.
    #[serde(default = "ScaleProperties::default_target_distance")]
    pub target_distance: f64,
}

impl ScaleProperties {
    fn default_target_distance() -> f64 {
        1.0
    }
}

impl Default for ScaleProperties {
    fn default() -> Self {
        Self {
            target_distance: Self::default_target_distance(),
        }
    }
}

/// Uniformly scales the active mesh object so its two selected vertices end
/// up `target_distance` apart, keeping their midpoint where it is.
pub struct ScaleToVertexDistance;

impl ScaleToVertexDistance {
    pub const ID: &'static str = "object.scale_to_vertex_distance";
}

/// Active mesh and its selected pair in world space, or the first
/// precondition that fails.
fn selected_pair(scene: &Scene) -> Result<(ObjectId, SelectionPair), ScaleError> {
    let id = scene.active().ok_or(ScaleError::InvalidTarget)?;
    let mesh = scene
        .object(id)
        .and_then(|o| o.mesh())
        .ok_or(ScaleError::InvalidTarget)?;
    if scene.mode() != Mode::EditMesh {
        return Err(ScaleError::WrongMode);
    }
    let pair = SelectionPair::try_from(mesh.selected_points())?;
    Ok((id, pair.map(&scene.world_matrix(id))))
}

/// Applies the scale to the active object. The transform is written only
/// once everything has been checked, so an error leaves the scene as it was.
pub fn scale_active(scene: &mut Scene, target: f64) -> Result<UniformScale, ScaleError> {
    let (id, pair) = selected_pair(scene)?;
    let parent_world = scene.parent_world_matrix(id);
    let object = scene.object_mut(id).ok_or(ScaleError::InvalidTarget)?;
    let result = scale_to_distance(pair, &object.transform, parent_world.as_ref(), target)?;
    if let Some(transform) = result.transform {
        object.transform = transform;
    }
    Ok(result)
}

impl Operator for ScaleToVertexDistance {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn label(&self) -> &'static str {
        "Scale to Vertex Distance"
    }

    fn description(&self) -> &'static str {
        "Uniformly scale an object based on the distance between two selected vertices"
    }

    fn flags(&self) -> OperatorFlags {
        OperatorFlags {
            register: true,
            undo: true,
        }
    }

    fn poll(&self, scene: &Scene) -> bool {
        scene.mode() == Mode::EditMesh && scene.active_object().and_then(|o| o.mesh()).is_some()
    }

    fn invoke(&self, scene: &Scene, reports: &mut Reports) -> Invocation {
        match selected_pair(scene) {
            Ok((_, pair)) => {
                let properties = ScaleProperties {
                    target_distance: pair.distance(),
                };
                debug!(target_distance = properties.target_distance, "pre-filling dialog");
                match serde_json::to_value(properties) {
                    Ok(value) => Invocation::Dialog(value),
                    Err(e) => {
                        reports.error(format!("Could not encode properties: {e}"));
                        Invocation::Cancelled
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "invoke cancelled");
                reports.error(e.to_string());
                Invocation::Cancelled
            }
        }
    }

    fn execute(&self, scene: &mut Scene, properties: &Value, reports: &mut Reports) -> OperatorStatus {
        let properties: ScaleProperties = match serde_json::from_value(properties.clone()) {
            Ok(p) => p,
            Err(e) => {
                reports.error(format!("Invalid properties: {e}"));
                return OperatorStatus::Cancelled;
            }
        };

        let result = match scale_active(scene, properties.target_distance) {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "scale cancelled");
                reports.error(e.to_string());
                return OperatorStatus::Cancelled;
            }
        };

        if result.clamped {
            warn!(requested = properties.target_distance, "clamping target distance");
            reports.warning(format!(
                "Target distance cannot be 0; using minimum value {MIN_TARGET_DISTANCE:.6}"
            ));
        }
        if result.is_noop() {
            reports.info("No scaling needed");
        } else {
            info!(factor = result.factor, pivot = ?result.pivot, "scaled object");
            reports.info("Object scaled successfully");
        }
        OperatorStatus::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Mesh;
    use crate::scene::ObjectKind;
    use crate::transform::Transform;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};
    use serde_json::json;

    fn scene_with_edge(selected: &[usize]) -> (Scene, ObjectId) {
        let mesh = Mesh::new(
            vec![
                Point3::new(0., 0., 0.),
                Point3::new(2., 0., 0.),
                Point3::new(0., 1., 0.),
                Point3::new(0., 0., 0.),
            ],
            vec![vec![0.into(), 1.into(), 2.into()]],
        )
        .unwrap();
        let mut scene = Scene::new();
        let id = scene
            .add_object("edge", ObjectKind::Mesh(mesh), Transform::identity(), None)
            .unwrap();
        scene.select_vertices(id, selected, false).unwrap();
        scene.set_active(Some(id)).unwrap();
        scene.set_mode(Mode::EditMesh).unwrap();
        (scene, id)
    }

    fn run(scene: &mut Scene, properties: Value) -> (OperatorStatus, Vec<Report>) {
        let mut reports = Reports::default();
        let status = ScaleToVertexDistance.execute(scene, &properties, &mut reports);
        (status, reports.into_vec())
    }

    #[test]
    fn scales_about_the_midpoint() {
        let (mut scene, id) = scene_with_edge(&[0, 1]);
        let (status, reports) = run(&mut scene, json!({ "target_distance": 1.0 }));

        assert_eq!(status, OperatorStatus::Finished);
        assert_eq!(reports[0].message, "Object scaled successfully");
        let t = scene.object(id).unwrap().transform;
        assert_relative_eq!(t.scale, Vector3::repeat(0.5));
        assert_relative_eq!(t.location, Vector3::new(0.5, 0., 0.));
    }

    #[test]
    fn invoke_prefills_the_current_distance() {
        let (mut scene, id) = scene_with_edge(&[0, 1]);
        let mut reports = Reports::default();
        let Invocation::Dialog(properties) = ScaleToVertexDistance.invoke(&scene, &mut reports) else {
            panic!("expected a dialog");
        };
        assert_eq!(properties, json!({ "target_distance": 2.0 }));

        let (status, reports) = run(&mut scene, properties);
        assert_eq!(status, OperatorStatus::Finished);
        assert_eq!(reports, vec![Report { level: ReportLevel::Info, message: "No scaling needed".into() }]);
        assert_eq!(scene.object(id).unwrap().transform, Transform::identity());
    }

    #[test]
    fn missing_property_uses_the_default() {
        let (mut scene, id) = scene_with_edge(&[1, 2]);
        run(&mut scene, json!({}));
        let t = scene.object(id).unwrap().transform;
        assert_relative_eq!(t.scale.x, 1. / 5f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn zero_target_warns_and_still_scales() {
        let (mut scene, id) = scene_with_edge(&[0, 1]);
        let (status, reports) = run(&mut scene, json!({ "target_distance": 0.0 }));

        assert_eq!(status, OperatorStatus::Finished);
        assert_eq!(reports[0].level, ReportLevel::Warning);
        assert_eq!(reports[0].message, "Target distance cannot be 0; using minimum value 0.000001");
        assert_eq!(reports[1].level, ReportLevel::Info);
        assert_relative_eq!(scene.object(id).unwrap().transform.scale.x, 5e-7);
    }

    #[test]
    fn wrong_selection_count_is_cancelled_without_changes() {
        let cases: [&[usize]; 3] = [&[], &[0], &[0, 1, 2]];
        for selected in cases {
            let (mut scene, id) = scene_with_edge(selected);
            let (status, reports) = run(&mut scene, json!({ "target_distance": 5.0 }));
            assert_eq!(status, OperatorStatus::Cancelled);
            assert_eq!(reports[0].level, ReportLevel::Error);
            assert!(reports[0].message.starts_with("Select exactly two vertices"));
            assert_eq!(scene.object(id).unwrap().transform, Transform::identity());
        }
    }

    #[test]
    fn coincident_vertices_are_cancelled() {
        let (mut scene, _) = scene_with_edge(&[0, 3]);
        let (status, reports) = run(&mut scene, json!({ "target_distance": 5.0 }));
        assert_eq!(status, OperatorStatus::Cancelled);
        assert_eq!(reports[0].message, "Selected vertices are at the same location");
    }

    #[test]
    fn vertices_collapsed_by_object_scale_are_coincident() {
        let (mut scene, id) = scene_with_edge(&[0, 1]);
        scene.object_mut(id).unwrap().transform.scale = Vector3::new(0., 1., 1.);

        let (status, reports) = run(&mut scene, json!({ "target_distance": 5.0 }));
        assert_eq!(status, OperatorStatus::Cancelled);
        assert_eq!(reports[0].message, "Selected vertices are at the same location");
        assert_eq!(scene.object(id).unwrap().transform.scale, Vector3::new(0., 1., 1.));
    }

    #[test]
    fn object_mode_is_the_wrong_mode() {
        let (mut scene, _) = scene_with_edge(&[0, 1]);
        scene.set_mode(Mode::Object).unwrap();
        assert!(!ScaleToVertexDistance.poll(&scene));
        assert_eq!(scale_active(&mut scene, 1.), Err(ScaleError::WrongMode));

        let mut reports = Reports::default();
        assert_eq!(ScaleToVertexDistance.invoke(&scene, &mut reports), Invocation::Cancelled);
        assert_eq!(reports.iter().next().unwrap().message, "Must be in Edit Mode");
    }

    #[test]
    fn non_mesh_target_is_invalid() {
        let (mut scene, _) = scene_with_edge(&[0, 1]);
        assert_eq!(scale_active(&mut Scene::new(), 1.), Err(ScaleError::InvalidTarget));

        let empty = scene
            .add_object("empty", ObjectKind::Empty, Transform::identity(), None)
            .unwrap();
        scene.set_active(Some(empty)).unwrap();
        assert_eq!(scale_active(&mut scene, 1.), Err(ScaleError::InvalidTarget));
    }

    #[test]
    fn malformed_properties_are_reported() {
        let (mut scene, _) = scene_with_edge(&[0, 1]);
        let (status, reports) = run(&mut scene, json!({ "target_distance": "far" }));
        assert_eq!(status, OperatorStatus::Cancelled);
        assert!(reports[0].message.starts_with("Invalid properties"));
    }
}
