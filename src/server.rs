use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Settings;
use crate::data::{CourseId, GenerationInput, GenerationOutput, StaffId, TimetableId};
use crate::engine::{generate, EngineOptions};
use crate::error::GenerationError;
use crate::store::{
    CourseView, GeneratedTimetable, NewCourse, NewStaff, NewTimetable, StaffView, Store, StoreError,
    Timetable,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub options: EngineOptions,
}

impl AppState {
    pub fn new(store: Arc<Store>, options: EngineOptions) -> Self {
        Self { store, options }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

/// Error returned by every handler.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };
        (status, Json(ErrorBody { code, message })).into_response()
    }
}

impl From<GenerationError> for ApiError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::InvalidConfiguration { .. } => ApiError::BadRequest(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            StoreError::Invalid(_) => ApiError::BadRequest(err.to_string()),
            StoreError::Generation(inner) => inner.into(),
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CourseRef {
    course_id: CourseId,
}

async fn generate_handler(
    State(state): State<AppState>,
    Json(input): Json<GenerationInput>,
) -> ApiResult<GenerationOutput> {
    let options = state.options;
    let output = tokio::task::spawn_blocking(move || generate(&input, &options))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(output))
}

async fn list_courses(State(state): State<AppState>) -> Json<Vec<CourseView>> {
    Json(state.store.list_courses())
}

async fn create_course(
    State(state): State<AppState>,
    Json(new): Json<NewCourse>,
) -> Result<(StatusCode, Json<CourseView>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.store.create_course(new)?)))
}

async fn get_course(State(state): State<AppState>, Path(id): Path<CourseId>) -> ApiResult<CourseView> {
    Ok(Json(state.store.get_course(id)?))
}

async fn delete_course(State(state): State<AppState>, Path(id): Path<CourseId>) -> Result<StatusCode, ApiError> {
    state.store.delete_course(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_staff(State(state): State<AppState>) -> Json<Vec<StaffView>> {
    Json(state.store.list_staff())
}

async fn create_staff(
    State(state): State<AppState>,
    Json(new): Json<NewStaff>,
) -> Result<(StatusCode, Json<StaffView>), ApiError> {
    Ok((StatusCode::CREATED, Json(state.store.create_staff(new)?)))
}

async fn get_staff(State(state): State<AppState>, Path(id): Path<StaffId>) -> ApiResult<StaffView> {
    Ok(Json(state.store.get_staff(id)?))
}

async fn delete_staff(State(state): State<AppState>, Path(id): Path<StaffId>) -> Result<StatusCode, ApiError> {
    state.store.delete_staff(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn assign_course(
    State(state): State<AppState>,
    Path(id): Path<StaffId>,
    Json(body): Json<CourseRef>,
) -> ApiResult<StaffView> {
    Ok(Json(state.store.assign_course(id, body.course_id)?))
}

async fn remove_course(
    State(state): State<AppState>,
    Path(id): Path<StaffId>,
    Json(body): Json<CourseRef>,
) -> ApiResult<StaffView> {
    Ok(Json(state.store.remove_course(id, body.course_id)?))
}

async fn list_timetables(State(state): State<AppState>) -> Json<Vec<Timetable>> {
    Json(state.store.list_timetables())
}

async fn create_timetable(
    State(state): State<AppState>,
    Json(new): Json<NewTimetable>,
) -> Result<(StatusCode, Json<Timetable>), ApiError> {
    let timetable = state.store.create_timetable(new, state.options.day_start_hour)?;
    Ok((StatusCode::CREATED, Json(timetable)))
}

async fn get_timetable(State(state): State<AppState>, Path(id): Path<TimetableId>) -> ApiResult<Timetable> {
    Ok(Json(state.store.get_timetable(id)?))
}

async fn delete_timetable(
    State(state): State<AppState>,
    Path(id): Path<TimetableId>,
) -> Result<StatusCode, ApiError> {
    state.store.delete_timetable(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn generate_timetable(
    State(state): State<AppState>,
    Path(id): Path<TimetableId>,
) -> ApiResult<GeneratedTimetable> {
    let generated = tokio::task::spawn_blocking(move || state.store.generate_timetable(id, &state.options))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(generated))
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/generate", post(generate_handler))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/:id", get(get_course).delete(delete_course))
        .route("/staff", get(list_staff).post(create_staff))
        .route("/staff/:id", get(get_staff).delete(delete_staff))
        .route("/staff/:id/assign-course", post(assign_course))
        .route("/staff/:id/remove-course", post(remove_course))
        .route("/timetables", get(list_timetables).post(create_timetable))
        .route("/timetables/:id", get(get_timetable).delete(delete_timetable))
        .route("/timetables/:id/generate", post(generate_timetable));

    Router::new().nest("/api", api).with_state(state)
}

pub async fn run_server(settings: Settings) -> std::io::Result<()> {
    let state = AppState::new(Arc::new(Store::new()), settings.engine_options());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&settings.listen_addr).await?;
    info!(
        "Server running at http://{} ({} solver)",
        listener.local_addr()?,
        settings.solver
    );

    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(Arc::new(Store::new()), EngineOptions::default()))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(v) => Body::from(v.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn full_generation_flow() {
        let app = app();
        let (status, course) = call(
            &app,
            "POST",
            "/api/courses",
            Some(json!({"name": "Biology", "code": "BIO1", "hoursPerWeek": 3, "preferredDays": ["Monday"]})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let course_id = course["id"].as_u64().unwrap();

        let (_, staff) = call(
            &app,
            "POST",
            "/api/staff",
            Some(json!({"name": "Grace", "email": "grace@school.test"})),
        )
        .await;
        let staff_id = staff["id"].as_u64().unwrap();
        assert_eq!(staff["availableDays"].as_array().unwrap().len(), 5);

        let (status, staff) = call(
            &app,
            "POST",
            &format!("/api/staff/{}/assign-course", staff_id),
            Some(json!({"courseId": course_id})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(staff["courses"][0]["code"], "BIO1");

        let (_, course) = call(&app, "GET", &format!("/api/courses/{}", course_id), None).await;
        assert_eq!(course["staffIds"], json!([staff_id]));

        let (status, timetable) = call(
            &app,
            "POST",
            "/api/timetables",
            Some(json!({"name": "Autumn", "hoursPerDay": 6})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(timetable["schedule"].is_null());
        let timetable_id = timetable["id"].as_u64().unwrap();

        let (status, generated) = call(
            &app,
            "POST",
            &format!("/api/timetables/{}/generate", timetable_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let days = generated["schedule"]["days"].as_array().unwrap();
        assert_eq!(days.len(), 5);
        assert_eq!(days[0]["day"], "Monday");
        assert_eq!(days[0]["slots"][0]["time"], json!({"start": "09:00", "end": "10:00"}));
        assert_eq!(days[0]["slots"][0]["course"]["code"], "BIO1");
        assert_eq!(days[0]["slots"][0]["staff"]["name"], "Grace");
        assert_eq!(generated["diagnostics"], json!([]));

        let (_, stored) = call(&app, "GET", &format!("/api/timetables/{}", timetable_id), None).await;
        assert_eq!(stored["schedule"], generated["schedule"]);
    }

    #[tokio::test]
    async fn stateless_generate_reports_diagnostics() {
        let app = app();
        let input = json!({
            "courses": [{"id": 1, "name": "History", "code": "HIS1", "hoursPerWeek": 12}],
            "staff": [],
            "timetable": {"hoursPerDay": 2}
        });
        let (status, output) = call(&app, "POST", "/api/generate", Some(input)).await;
        assert_eq!(status, StatusCode::OK);
        let kinds: Vec<&str> = output["diagnostics"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["OverDemand", "UnstaffedCourse"]);
        assert_eq!(output["diagnostics"][0]["shortfall"], 2);
    }

    #[tokio::test]
    async fn maps_errors_to_status_codes() {
        let app = app();
        let (status, body) = call(&app, "GET", "/api/courses/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, _) = call(
            &app,
            "POST",
            "/api/timetables",
            Some(json!({"name": "Broken", "hoursPerDay": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let input = json!({"courses": [], "staff": [], "timetable": {"hoursPerDay": 6, "days": []}});
        let (status, body) = call(&app, "POST", "/api/generate", Some(input)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("no teaching days"));

        let (status, _) = call(&app, "POST", "/api/timetables/5/generate", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_endpoints_remove_entities() {
        let app = app();
        let (_, course) = call(
            &app,
            "POST",
            "/api/courses",
            Some(json!({"name": "Drama", "code": "DRA1", "hoursPerWeek": 1})),
        )
        .await;
        let uri = format!("/api/courses/{}", course["id"]);
        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (_, courses) = call(&app, "GET", "/api/courses", None).await;
        assert_eq!(courses, json!([]));
    }
}
