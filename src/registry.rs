use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::RegistryError;
use crate::operator::{Invocation, Operator, OperatorStatus, Report, Reports, ScaleToVertexDistance};
use crate::scene::Scene;

/// Context menu shown while editing a mesh's vertices.
pub const EDIT_MESH_CONTEXT_MENU: &str = "VIEW3D_MT_edit_mesh_context_menu";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MenuEntry {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Outcome {
    pub status: OperatorStatus,
    pub reports: Vec<Report>,
    /// Whether any object's transform changed.
    pub changed: bool,
}

#[derive(Clone, Debug)]
struct LastOperation {
    id: &'static str,
    properties: Value,
    changed: bool,
}

#[derive(Default)]
pub struct Registry {
    operators: HashMap<&'static str, Arc<dyn Operator>>,
    menus: BTreeMap<String, Vec<&'static str>>,
    last: Option<LastOperation>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in operator registered and hooked into
    /// its menus.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ScaleToVertexDistance));
        registry.menu_append(EDIT_MESH_CONTEXT_MENU, ScaleToVertexDistance::ID);
        registry
    }

    pub fn register(&mut self, operator: Arc<dyn Operator>) {
        debug!(id = operator.id(), "registering operator");
        self.operators.insert(operator.id(), operator);
    }

    /// Removes the operator and every menu entry pointing at it.
    pub fn unregister(&mut self, id: &str) -> bool {
        for entries in self.menus.values_mut() {
            entries.retain(|e| *e != id);
        }
        if self.last.as_ref().is_some_and(|l| l.id == id) {
            self.last = None;
        }
        self.operators.remove(id).is_some()
    }

    pub fn menu_append(&mut self, menu: &str, id: &'static str) {
        let entries = self.menus.entry(menu.to_string()).or_default();
        if !entries.contains(&id) {
            entries.push(id);
        }
    }

    pub fn menu_remove(&mut self, menu: &str, id: &str) {
        if let Some(entries) = self.menus.get_mut(menu) {
            entries.retain(|e| *e != id);
        }
    }

    /// Entries of `menu` whose operator polls true for `scene`.
    pub fn menu(&self, menu: &str, scene: &Scene) -> Result<Vec<MenuEntry>, RegistryError> {
        let entries = self
            .menus
            .get(menu)
            .ok_or_else(|| RegistryError::UnknownMenu(menu.to_string()))?;
        Ok(entries
            .iter()
            .filter_map(|id| self.operators.get(id))
            .filter(|op| op.poll(scene))
            .map(|op| MenuEntry {
                id: op.id(),
                label: op.label(),
                description: op.description(),
            })
            .collect())
    }

    pub fn operator(&self, id: &str) -> Result<Arc<dyn Operator>, RegistryError> {
        self.operators
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownOperator(id.to_string()))
    }

    pub fn invoke(&self, id: &str, scene: &Scene) -> Result<(Invocation, Vec<Report>), RegistryError> {
        let operator = self.operator(id)?;
        let mut reports = Reports::default();
        let invocation = operator.invoke(scene, &mut reports);
        Ok((invocation, reports.into_vec()))
    }

    /// Runs an operator, recording an undo step if it changed the scene.
    pub fn execute(&mut self, id: &str, scene: &mut Scene, properties: Value) -> Result<Outcome, RegistryError> {
        let operator = self.operator(id)?;
        let flags = operator.flags();

        let before = scene.snapshot();
        let mut reports = Reports::default();
        let status = operator.execute(scene, &properties, &mut reports);
        let changed = scene.snapshot() != before;

        if flags.undo && changed {
            scene.push_undo(before);
        }
        if flags.register && status == OperatorStatus::Finished {
            self.last = Some(LastOperation {
                id: operator.id(),
                properties,
                changed,
            });
        }
        debug!(id, ?status, changed, "executed operator");
        Ok(Outcome {
            status,
            reports: reports.into_vec(),
            changed,
        })
    }

    /// Re-runs the last registered operator with new properties, replacing
    /// the effect of its previous run.
    pub fn redo_last(&mut self, scene: &mut Scene, properties: Value) -> Result<Outcome, RegistryError> {
        let last = self.last.take().ok_or(RegistryError::NothingToRedo)?;
        if last.changed {
            scene.undo();
            scene.discard_redo();
        }
        self.execute(last.id, scene, properties)
    }

    pub fn last_properties(&self) -> Option<(&'static str, &Value)> {
        self.last.as_ref().map(|l| (l.id, &l.properties))
    }

    /// Undo that also forgets the last registered run, since it may no
    /// longer be the most recent change.
    pub fn undo(&mut self, scene: &mut Scene) -> bool {
        self.last = None;
        scene.undo()
    }

    pub fn redo(&mut self, scene: &mut Scene) -> bool {
        self.last = None;
        scene.redo()
    }
}
