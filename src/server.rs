//! HTTP surface of the daemon.
//!
//! One [`Session`] (scene plus operator registry) lives behind a mutex.
//! Scene-level failures become HTTP errors. An operator that refuses to run
//! is an ordinary outcome, reported with status `cancelled`.

use std::sync::{Mutex, MutexGuard};

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use nalgebra::Point3;
use obj::ObjData;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{MeshError, RegistryError, SceneError};
use crate::mesh::{Mesh, Vertex};
use crate::operator::{Invocation, Report};
use crate::registry::{Outcome, Registry};
use crate::scene::{Mode, Object, ObjectId, ObjectKind, Scene};
use crate::transform::{Transform, TransformDto};

pub struct Session {
    pub scene: Scene,
    pub registry: Registry,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            registry: Registry::with_builtins(),
        }
    }

    /// Adds an OBJ file as a mesh object at the origin.
    pub fn load_obj(&mut self, name: &str, data: &ObjData) -> Result<ObjectId, SceneError> {
        let mesh = Mesh::from_obj(data)?;
        info!(name, vertices = mesh.vertex_count(), faces = mesh.faces.len(), "loaded mesh");
        self.scene
            .add_object(name, ObjectKind::Mesh(mesh), Transform::identity(), None)
    }
}

pub type SharedSession = web::Data<Mutex<Session>>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{0}")]
    BadRequest(String),

    #[error("failed to write OBJ data: {0}")]
    Export(String),

    #[error("session state is poisoned")]
    Poisoned,
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Scene(SceneError::UnknownObject(_)) => StatusCode::NOT_FOUND,
            ServiceError::Scene(SceneError::DuplicateName(_) | SceneError::ParentCycle { .. }) => {
                StatusCode::CONFLICT
            }
            ServiceError::Scene(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Registry(RegistryError::NothingToRedo) => StatusCode::CONFLICT,
            ServiceError::Registry(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Export(_) | ServiceError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

fn lock(session: &SharedSession) -> Result<MutexGuard<'_, Session>, ServiceError> {
    session.lock().map_err(|_| ServiceError::Poisoned)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub name: String,
    pub kind: String,
    pub transform: TransformDto,
    pub parent: Option<String>,
    pub vertex_count: Option<usize>,
    pub selected: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SceneSummary {
    pub mode: Mode,
    pub active: Option<String>,
    pub objects: Vec<ObjectSummary>,
    pub can_undo: bool,
    pub last_operator: Option<String>,
}

fn summarize(scene: &Scene, object: &Object) -> ObjectSummary {
    ObjectSummary {
        name: object.name.clone(),
        kind: object.kind.name().to_string(),
        transform: object.transform.into(),
        parent: object
            .parent
            .and_then(|p| scene.object(p))
            .map(|p| p.name.clone()),
        vertex_count: object.mesh().map(Mesh::vertex_count),
        selected: object
            .mesh()
            .map(|m| m.selected().map(usize::from).collect())
            .unwrap_or_default(),
    }
}

fn summarize_session(session: &Session) -> SceneSummary {
    let scene = &session.scene;
    SceneSummary {
        mode: scene.mode(),
        active: scene.active_object().map(|o| o.name.clone()),
        objects: scene.objects().map(|(_, o)| summarize(scene, o)).collect(),
        can_undo: scene.can_undo(),
        last_operator: session
            .registry
            .last_properties()
            .map(|(id, _)| id.to_string()),
    }
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn get_scene(session: SharedSession) -> Result<web::Json<SceneSummary>, ServiceError> {
    let session = lock(&session)?;
    Ok(web::Json(summarize_session(&session)))
}

#[derive(Debug, Deserialize)]
pub struct NewObject {
    pub name: String,
    /// OBJ file contents.
    #[serde(default)]
    pub obj: Option<String>,
    #[serde(default)]
    pub vertices: Option<Vec<[f64; 3]>>,
    #[serde(default)]
    pub faces: Vec<Vec<usize>>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub transform: TransformDto,
}

fn new_object_kind(request: &NewObject) -> Result<ObjectKind, ServiceError> {
    let mesh = match (&request.obj, &request.vertices) {
        (Some(_), Some(_)) => {
            return Err(ServiceError::BadRequest(
                "give either `obj` or `vertices`, not both".to_string(),
            ))
        }
        (Some(text), None) => {
            ObjData::load_buf(text.as_bytes())
                .map_err(MeshError::from)
                .and_then(|data| Mesh::from_obj(&data))
        }
        (None, Some(vertices)) => Mesh::new(
            vertices.iter().map(|v| Point3::from(*v)).collect(),
            request
                .faces
                .iter()
                .map(|f| f.iter().copied().map(Vertex::from).collect())
                .collect(),
        ),
        (None, None) if request.faces.is_empty() => return Ok(ObjectKind::Empty),
        (None, None) => {
            return Err(ServiceError::BadRequest(
                "faces given without vertices".to_string(),
            ))
        }
    };
    Ok(ObjectKind::Mesh(mesh.map_err(SceneError::from)?))
}

async fn create_object(
    session: SharedSession,
    request: web::Json<NewObject>,
) -> Result<HttpResponse, ServiceError> {
    let request = request.into_inner();
    let kind = new_object_kind(&request)?;

    let mut session = lock(&session)?;
    let scene = &mut session.scene;
    let parent = request
        .parent
        .as_deref()
        .map(|name| scene.lookup(name))
        .transpose()?;
    let id = scene.add_object(request.name, kind, request.transform.into(), parent)?;

    let summary = scene.object(id).map(|o| summarize(scene, o));
    Ok(HttpResponse::Created().json(summary))
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    #[default]
    Local,
    World,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub space: Space,
}

async fn export_obj(
    session: SharedSession,
    name: web::Path<String>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, ServiceError> {
    let session = lock(&session)?;
    let scene = &session.scene;
    let id = scene.lookup(&name)?;
    let object = scene
        .object(id)
        .ok_or_else(|| SceneError::UnknownObject(name.to_string()))?;
    let mesh = object
        .mesh()
        .ok_or_else(|| SceneError::NotAMesh(name.to_string()))?;

    let matrix = match query.space {
        Space::Local => None,
        Space::World => Some(scene.world_matrix(id)),
    };
    let data = mesh.to_obj(&object.name, matrix.as_ref());
    let mut out = Vec::new();
    data.write_to_buf(&mut out)
        .map_err(|e| ServiceError::Export(e.to_string()))?;

    Ok(HttpResponse::Ok()
        .content_type("model/obj")
        .body(String::from_utf8_lossy(&out).into_owned()))
}

#[derive(Debug, Deserialize)]
pub struct SetActive {
    pub name: Option<String>,
}

async fn set_active(
    session: SharedSession,
    request: web::Json<SetActive>,
) -> Result<web::Json<SceneSummary>, ServiceError> {
    let mut session = lock(&session)?;
    let id = request
        .name
        .as_deref()
        .map(|name| session.scene.lookup(name))
        .transpose()?;
    session.scene.set_active(id)?;
    Ok(web::Json(summarize_session(&session)))
}

#[derive(Debug, Deserialize)]
pub struct SetMode {
    pub mode: Mode,
}

async fn set_mode(
    session: SharedSession,
    request: web::Json<SetMode>,
) -> Result<web::Json<SceneSummary>, ServiceError> {
    let mut session = lock(&session)?;
    session.scene.set_mode(request.mode)?;
    Ok(web::Json(summarize_session(&session)))
}

#[derive(Debug, Deserialize)]
pub struct SetParent {
    pub parent: Option<String>,
}

async fn set_parent(
    session: SharedSession,
    name: web::Path<String>,
    request: web::Json<SetParent>,
) -> Result<web::Json<ObjectSummary>, ServiceError> {
    let mut session = lock(&session)?;
    let scene = &mut session.scene;
    let child = scene.lookup(&name)?;
    let parent = request
        .parent
        .as_deref()
        .map(|p| scene.lookup(p))
        .transpose()?;
    scene.set_parent(child, parent)?;
    let object = scene
        .object(child)
        .ok_or_else(|| SceneError::UnknownObject(name.to_string()))?;
    Ok(web::Json(summarize(scene, object)))
}

#[derive(Debug, Deserialize)]
pub struct SetSelection {
    pub vertices: Vec<usize>,
    #[serde(default)]
    pub extend: bool,
}

async fn set_selection(
    session: SharedSession,
    name: web::Path<String>,
    request: web::Json<SetSelection>,
) -> Result<web::Json<ObjectSummary>, ServiceError> {
    let mut session = lock(&session)?;
    let scene = &mut session.scene;
    let id = scene.lookup(&name)?;
    scene.select_vertices(id, &request.vertices, request.extend)?;
    let object = scene
        .object(id)
        .ok_or_else(|| SceneError::UnknownObject(name.to_string()))?;
    Ok(web::Json(summarize(scene, object)))
}

async fn get_menu(
    session: SharedSession,
    menu: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let session = lock(&session)?;
    let entries = session.registry.menu(&menu, &session.scene)?;
    Ok(HttpResponse::Ok().json(json!({ "menu": menu.as_str(), "entries": entries })))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InvokeResponse {
    Dialog { properties: Value },
    Cancelled { reports: Vec<Report> },
}

async fn invoke_operator(
    session: SharedSession,
    id: web::Path<String>,
) -> Result<web::Json<InvokeResponse>, ServiceError> {
    let session = lock(&session)?;
    let (invocation, reports) = session.registry.invoke(&id, &session.scene)?;
    debug!(id = id.as_str(), ?invocation, "invoked operator");
    Ok(web::Json(match invocation {
        Invocation::Dialog(properties) => InvokeResponse::Dialog { properties },
        Invocation::Cancelled => InvokeResponse::Cancelled { reports },
    }))
}

fn properties(body: Option<web::Json<Value>>) -> Value {
    body.map(web::Json::into_inner)
        .unwrap_or_else(|| json!({}))
}

async fn execute_operator(
    session: SharedSession,
    id: web::Path<String>,
    body: Option<web::Json<Value>>,
) -> Result<web::Json<Outcome>, ServiceError> {
    let mut session = lock(&session)?;
    let Session { scene, registry } = &mut *session;
    let outcome = registry.execute(&id, scene, properties(body))?;
    Ok(web::Json(outcome))
}

async fn redo_last(
    session: SharedSession,
    body: Option<web::Json<Value>>,
) -> Result<web::Json<Outcome>, ServiceError> {
    let mut session = lock(&session)?;
    let Session { scene, registry } = &mut *session;
    let outcome = registry.redo_last(scene, properties(body))?;
    Ok(web::Json(outcome))
}

async fn undo(session: SharedSession) -> Result<HttpResponse, ServiceError> {
    let mut session = lock(&session)?;
    let Session { scene, registry } = &mut *session;
    let changed = registry.undo(scene);
    Ok(HttpResponse::Ok().json(json!({ "changed": changed })))
}

async fn redo(session: SharedSession) -> Result<HttpResponse, ServiceError> {
    let mut session = lock(&session)?;
    let Session { scene, registry } = &mut *session;
    let changed = registry.redo(scene);
    Ok(HttpResponse::Ok().json(json!({ "changed": changed })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/scene", web::get().to(get_scene))
        .route("/objects", web::post().to(create_object))
        .route("/objects/{name}/obj", web::get().to(export_obj))
        .route("/objects/{name}/parent", web::put().to(set_parent))
        .route("/objects/{name}/selection", web::put().to(set_selection))
        .route("/active", web::put().to(set_active))
        .route("/mode", web::put().to(set_mode))
        .route("/menus/{menu}", web::get().to(get_menu))
        .route("/operators/last/redo", web::post().to(redo_last))
        .route("/operators/{id}/invoke", web::post().to(invoke_operator))
        .route("/operators/{id}/execute", web::post().to(execute_operator))
        .route("/undo", web::post().to(undo))
        .route("/redo", web::post().to(redo));
}
