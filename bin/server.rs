// Conciliador Base de Clientes - API REST (Axum)

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use conciliador::{
    export_csv, load_state, open_database, save_state, AppState as CoreState,
    AuditEntry, ConsolidatedEntity, SourceKind,
};

/// Shared application state. The reconciled view lives in memory and
/// every mutation is written back to SQLite before the response leaves.
#[derive(Clone)]
struct ServerState {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    conn: rusqlite::Connection,
    core: CoreState,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: String) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message),
        }
    }
}

#[derive(Serialize)]
struct SourceStat {
    sistema: &'static str,
    registros: usize,
}

#[derive(Serialize)]
struct SummaryResponse {
    total: usize,
    consistentes: usize,
    divergentes: usize,
    inativos: usize,
    falta_cadastro: usize,
    fontes: Vec<SourceStat>,
}

#[derive(Deserialize)]
struct LoginRequest {
    nome: String,
}

#[derive(Deserialize)]
struct LinkRequest {
    dependentes: Vec<String>,
    pagador: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/empresas - the full consolidated base
async fn get_companies(State(state): State<ServerState>) -> impl IntoResponse {
    let guard = state.inner.lock().unwrap();
    let rows: Vec<ConsolidatedEntity> = guard.core.consolidated().to_vec();
    (StatusCode::OK, Json(ApiResponse::ok(rows))).into_response()
}

/// GET /api/empresas/:id - one company by normalized document
async fn get_company(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let guard = state.inner.lock().unwrap();
    let wanted = conciliador::normalize_id(&id);

    match guard.core.consolidated().iter().find(|e| e.id == wanted) {
        Some(entity) => (StatusCode::OK, Json(ApiResponse::ok(entity.clone()))).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!("Documento {wanted} não encontrado"))),
        )
            .into_response(),
    }
}

/// GET /api/resumo - counts by diagnosis plus loaded source sizes
async fn get_summary(State(state): State<ServerState>) -> impl IntoResponse {
    use conciliador::Diagnosis;

    let guard = state.inner.lock().unwrap();
    let entities = guard.core.consolidated();

    let count = |d: Diagnosis| entities.iter().filter(|e| e.diagnostico == d).count();

    let summary = SummaryResponse {
        total: entities.len(),
        consistentes: count(Diagnosis::Consistente),
        divergentes: count(Diagnosis::Divergente),
        inativos: count(Diagnosis::ClienteInativoBaixa),
        falta_cadastro: count(Diagnosis::FaltaCadastroQuestor),
        fontes: vec![
            SourceStat {
                sistema: SourceKind::Questor.name(),
                registros: guard.core.questor.len(),
            },
            SourceStat {
                sistema: SourceKind::Senior.name(),
                registros: guard.core.senior.len(),
            },
            SourceStat {
                sistema: SourceKind::Gestta.name(),
                registros: guard.core.gestta.len(),
            },
        ],
    };

    (StatusCode::OK, Json(ApiResponse::ok(summary))).into_response()
}

/// GET /api/auditoria - audit trail, newest first
async fn get_audit(State(state): State<ServerState>) -> impl IntoResponse {
    let guard = state.inner.lock().unwrap();
    let entries: Vec<AuditEntry> = guard.core.audit.clone();
    (StatusCode::OK, Json(ApiResponse::ok(entries))).into_response()
}

/// GET /api/export - CSV download of the consolidated base
async fn get_export(State(state): State<ServerState>) -> impl IntoResponse {
    let guard = state.inner.lock().unwrap();
    let body = export_csv(guard.core.consolidated());

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"conciliacao_clientes.csv\"",
            ),
        ],
        body,
    )
        .into_response()
}

/// POST /api/login - identify the operator for the audit trail
async fn post_login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let mut guard = state.inner.lock().unwrap();
    let Inner { conn, core } = &mut *guard;

    if let Err(e) = core.login(&req.nome) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err(e.to_string())),
        )
            .into_response();
    }

    match save_state(conn, core) {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(core.operator.clone()))).into_response(),
        Err(e) => persistence_error(e),
    }
}

/// POST /api/vinculos - bulk manual payer link
async fn post_link(
    State(state): State<ServerState>,
    Json(req): Json<LinkRequest>,
) -> impl IntoResponse {
    if req.dependentes.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::err("Nenhum dependente informado".to_string())),
        )
            .into_response();
    }

    let mut guard = state.inner.lock().unwrap();
    let Inner { conn, core } = &mut *guard;

    let dependentes: Vec<String> = req
        .dependentes
        .iter()
        .map(|d| conciliador::normalize_id(d))
        .filter(|d| !d.is_empty())
        .collect();
    core.assign_payer(&dependentes, &req.pagador);

    match save_state(conn, core) {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(dependentes.len()))).into_response(),
        Err(e) => persistence_error(e),
    }
}

/// DELETE /api/vinculos/:id - drop one manual payer link
async fn delete_link(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let mut guard = state.inner.lock().unwrap();
    let Inner { conn, core } = &mut *guard;

    let wanted = conciliador::normalize_id(&id);
    if !core.payer_overrides.contains_key(&wanted) {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!(
                "Sem vínculo manual para o documento {wanted}"
            ))),
        )
            .into_response();
    }
    core.remove_payer(&wanted);

    match save_state(conn, core) {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(wanted))).into_response(),
        Err(e) => persistence_error(e),
    }
}

/// POST /api/matriz/:id - flip the head-office inheritance exclusion
async fn post_matrix_toggle(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let mut guard = state.inner.lock().unwrap();
    let Inner { conn, core } = &mut *guard;

    let wanted = conciliador::normalize_id(&id);
    core.toggle_matrix_exclusion(&wanted);
    let excluded = core.matrix_exclusions.contains(&wanted);

    match save_state(conn, core) {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::ok(excluded))).into_response(),
        Err(e) => persistence_error(e),
    }
}

fn persistence_error(e: anyhow::Error) -> axum::response::Response {
    eprintln!("Erro ao gravar estado: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::err("Falha ao gravar estado".to_string())),
    )
        .into_response()
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Conciliador Base de Clientes - API");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::var("CONCILIADOR_DB").unwrap_or_else(|_| "conciliador.db".to_string());

    let conn = open_database(std::path::Path::new(&db_path)).expect("Falha ao abrir base de dados");
    let core = load_state(&conn).expect("Falha ao carregar estado");
    println!("✓ Base de dados aberta: {db_path}");
    println!("✓ {} empresa(s) consolidada(s)", core.consolidated().len());

    let state = ServerState {
        inner: Arc::new(Mutex::new(Inner { conn, core })),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/empresas", get(get_companies))
        .route("/empresas/:id", get(get_company))
        .route("/resumo", get(get_summary))
        .route("/auditoria", get(get_audit))
        .route("/export", get(get_export))
        .route("/login", post(post_login))
        .route("/vinculos", post(post_link))
        .route("/vinculos/:id", delete(delete_link))
        .route("/matriz/:id", post(post_matrix_toggle))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Falha ao abrir a porta");

    println!("\n🚀 API disponível em http://localhost:3000/api/empresas");
    println!("   Ctrl+C encerra\n");

    axum::serve(listener, app)
        .await
        .expect("Falha ao iniciar o servidor");
}
