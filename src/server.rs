use crate::catalog::RegionCatalog;
use crate::config::AppConfig;
use crate::render;
use crate::store::VisitedStore;
use anyhow::Result;
use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::warn;

pub struct AppState {
    pub config: AppConfig,
    pub catalog: RegionCatalog,
    pub store: VisitedStore,
}

#[derive(Deserialize)]
pub struct AreaForm {
    pub area: Option<String>,
}

#[derive(Deserialize)]
pub struct AddAreaRequest {
    pub area_name: String,
}

#[derive(Serialize)]
pub struct ApiResponse {
    pub success: bool,
    pub message: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index).post(submit_area))
        .route("/add_clicked_area", post(add_clicked_area))
        .route("/clear", get(clear_visited))
        .nest_service("/static", ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(state: Arc<AppState>) -> Result<()> {
    let port = state.config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    println!("Starting server on http://{}", addr);

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let visited = state.store.load();
    render_index(&state, visited, None)
}

async fn submit_area(
    State(state): State<Arc<AppState>>,
    form: Result<Form<AreaForm>, FormRejection>,
) -> Html<String> {
    let mut visited = state.store.load();
    let mut focus = None;

    let area = form.ok().and_then(|Form(f)| f.area);
    if let Some(name) = area {
        if state.catalog.contains(&name) && !visited.contains(&name) {
            visited.insert(name.clone());
            // Write failure is deliberately not surfaced on this path; the
            // page still renders from the in-memory set.
            if !state.store.save(visited.iter().map(|s| s.as_str())) {
                warn!("Failed to persist visited set after adding '{}'", name);
            }
            focus = state.catalog.bounds_of(&name);
        }
    }

    render_index(&state, visited, focus)
}

async fn add_clicked_area(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddAreaRequest>, JsonRejection>,
) -> (StatusCode, Json<ApiResponse>) {
    let Ok(Json(req)) = payload else {
        return api(
            StatusCode::BAD_REQUEST,
            false,
            "Invalid request data.".to_string(),
        );
    };

    let name = req.area_name;
    if name.is_empty() {
        return api(
            StatusCode::BAD_REQUEST,
            false,
            "No region name received.".to_string(),
        );
    }
    if !state.catalog.contains(&name) {
        return api(
            StatusCode::BAD_REQUEST,
            false,
            format!("Invalid region name: {name}"),
        );
    }

    let mut visited = state.store.load();
    if visited.contains(&name) {
        // Idempotent no-op, not an error
        return api(
            StatusCode::OK,
            false,
            format!("{name} is already in the list."),
        );
    }

    visited.insert(name.clone());
    if state.store.save(visited.iter().map(|s| s.as_str())) {
        api(StatusCode::OK, true, format!("Added {name}."))
    } else {
        api(
            StatusCode::INTERNAL_SERVER_ERROR,
            false,
            "Server error while saving the list.".to_string(),
        )
    }
}

async fn clear_visited(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if !state.store.save(std::iter::empty::<&str>()) {
        warn!("Failed to clear visited set");
    }
    (StatusCode::FOUND, [(header::LOCATION, "/")])
}

fn render_index(
    state: &AppState,
    visited: BTreeSet<String>,
    focus: Option<geo::Rect<f64>>,
) -> Html<String> {
    let available: Vec<String> = state
        .catalog
        .names()
        .iter()
        .filter(|name| !visited.contains(*name))
        .cloned()
        .collect();
    let visited_sorted: Vec<String> = visited.iter().cloned().collect();

    let doc = render::render(
        &visited,
        &state.catalog,
        focus,
        &state.config.input.name_property,
    );
    Html(render::page(&doc, &available, &visited_sorted))
}

fn api(status: StatusCode, success: bool, message: String) -> (StatusCode, Json<ApiResponse>) {
    (status, Json(ApiResponse { success, message }))
}
