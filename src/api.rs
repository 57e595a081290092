use axum::{
    extract::{DefaultBodyLimit, Json, Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::spawn;
use tracing::info;

use crate::{
    app_state::AppState,
    conversation::{ChatSession, ChatSnapshot},
    error::ApiError,
    models::{AnalysisResult, ChatMessage, FileHandle},
    orchestrator::{Outcome, UploadStatus},
    preferences::{Preferences, PreferencesUpdate},
    report::{self, ShareAction, ShareRequest},
};

// --- Payloads y Respuestas de la API ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Demo,
    Widget,
}

#[derive(Deserialize)]
pub struct AskPayload {
    question: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    reply: Option<ChatMessage>,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    accepted: bool,
    status: UploadStatus,
}

// --- Router ---

/// Tope del cuerpo multipart de `/api/upload` (el de axum por defecto es 2 MB).
pub const UPLOAD_BODY_LIMIT: usize = 100 * 1024 * 1024;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/api/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/status", get(status_handler))
        .route("/api/analysis", get(analysis_handler))
        .route("/api/chat/:panel/messages", get(chat_messages_handler))
        .route("/api/chat/:panel/ask", post(chat_ask_handler))
        .route("/api/chat/:panel/open", post(chat_open_handler))
        .route("/api/chat/:panel/close", post(chat_close_handler))
        .route("/api/report", get(report_handler))
        .route("/api/share", post(share_handler))
        .route("/api/preferences", get(get_preferences_handler).put(put_preferences_handler))
        .route("/api/preferences/theme/toggle", post(toggle_theme_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

fn session(state: &AppState, panel: Panel) -> &ChatSession {
    match panel {
        Panel::Demo => &state.demo_chat,
        Panel::Widget => &state.widget_chat,
    }
}

// --- Handlers: subida y análisis ---

#[axum::debug_handler]
async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut files = Vec::new();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Formulario multipart inválido: {e}")))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        // Sólo interesa el tamaño: se cuenta por trozos sin guardar el contenido.
        let mut size = 0u64;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("No se pudo leer '{name}': {e}")))?
        {
            size += chunk.len() as u64;
        }
        files.push(FileHandle::new(name, size));
    }

    let Some(cycle_id) = state.orchestrator.begin(files) else {
        return Ok((
            StatusCode::OK,
            Json(UploadResponse {
                accepted: false,
                status: state.orchestrator.status(),
            }),
        ));
    };

    info!("Subida {} aceptada.", cycle_id);
    let orchestrator = state.orchestrator.clone();
    spawn(async move {
        if let Outcome::Completed(result) = orchestrator.run_cycle(cycle_id).await {
            info!("Subida {} completada: {}", cycle_id, result.document_type_label);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            accepted: true,
            status: state.orchestrator.status(),
        }),
    ))
}

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<UploadStatus> {
    Json(state.orchestrator.status())
}

#[axum::debug_handler]
async fn analysis_handler(State(state): State<AppState>) -> Result<Json<AnalysisResult>, ApiError> {
    state.orchestrator.result().map(Json).ok_or(ApiError::NoAnalysis)
}

// --- Handlers: chat ---

#[axum::debug_handler]
async fn chat_messages_handler(
    State(state): State<AppState>,
    Path(panel): Path<Panel>,
) -> Json<ChatSnapshot> {
    Json(session(&state, panel).snapshot())
}

#[axum::debug_handler]
async fn chat_ask_handler(
    State(state): State<AppState>,
    Path(panel): Path<Panel>,
    Json(payload): Json<AskPayload>,
) -> Result<Json<AskResponse>, ApiError> {
    let context = state.turn_context();
    let chat = session(&state, panel);
    let reply = chat.ask(&payload.question, &context).await?;
    Ok(Json(AskResponse {
        reply,
        messages: chat.history(),
    }))
}

#[axum::debug_handler]
async fn chat_open_handler(
    State(state): State<AppState>,
    Path(panel): Path<Panel>,
) -> Json<ChatSnapshot> {
    let language = state.turn_context().language;
    let chat = session(&state, panel);
    chat.open(language);
    Json(chat.snapshot())
}

#[axum::debug_handler]
async fn chat_close_handler(
    State(state): State<AppState>,
    Path(panel): Path<Panel>,
) -> Json<ChatSnapshot> {
    let chat = session(&state, panel);
    chat.close();
    Json(chat.snapshot())
}

// --- Handlers: informe y compartir ---

#[axum::debug_handler]
async fn report_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let result = state.orchestrator.result();
    let report = report::export_report(result.as_ref(), &state.demo_chat.history(), Utc::now())?;
    info!("Informe generado: {}", report.filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", report.filename),
            ),
        ],
        report.body,
    ))
}

#[axum::debug_handler]
async fn share_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShareRequest>,
) -> Result<Json<ShareAction>, ApiError> {
    let result = state.orchestrator.result();
    Ok(Json(report::share(result.as_ref(), &payload)?))
}

// --- Handlers: preferencias ---

#[axum::debug_handler]
async fn get_preferences_handler(State(state): State<AppState>) -> Json<Preferences> {
    let prefs = state
        .preferences
        .lock()
        .map(|p| p.current())
        .unwrap_or_default();
    Json(prefs)
}

#[axum::debug_handler]
async fn put_preferences_handler(
    State(state): State<AppState>,
    Json(update): Json<PreferencesUpdate>,
) -> Result<Json<Preferences>, ApiError> {
    let mut store = state
        .preferences
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(Json(store.update(update)?))
}

#[axum::debug_handler]
async fn toggle_theme_handler(State(state): State<AppState>) -> Result<Json<Preferences>, ApiError> {
    let mut store = state
        .preferences
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    Ok(Json(store.toggle_theme()?))
}

// --- Handler de Apagado ---

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Ok(mut sender) = state.shutdown_sender.lock() {
        if let Some(sender) = sender.take() {
            let _ = sender.send(());
        }
    }
    StatusCode::OK
}
