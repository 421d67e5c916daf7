// MoMo Ledger - Query API Server
// Read-only HTTP surface over the transaction store: filtered lists,
// per-id lookup, aggregate statistics, substring search. No classification
// happens here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use momo_ledger::{
    get_transaction, list_transactions, monthly_stats, overall_stats, search_transactions,
    type_stats, MonthlyStat, OverallStats, StoredTransaction, TransactionFilter, TypeStat,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
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
    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

#[derive(Deserialize)]
struct ListParams {
    #[serde(rename = "type")]
    transaction_type: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    min_amount: Option<f64>,
    max_amount: Option<f64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Serialize)]
struct StatsResponse {
    by_type: Vec<TypeStat>,
    by_month: Vec<MonthlyStat>,
    overall: OverallStats,
    generated_at: String,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/transactions - Filtered transaction list
async fn get_transactions(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    let filter = TransactionFilter {
        transaction_type: params.transaction_type,
        start_date: params.start_date,
        end_date: params.end_date,
        min_amount: params.min_amount,
        max_amount: params.max_amount,
        limit: params.limit,
    };

    match list_transactions(&conn, &filter) {
        Ok(transactions) => (StatusCode::OK, Json(ApiResponse::ok(transactions))).into_response(),
        Err(e) => {
            eprintln!("Error listing transactions: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("failed to list transactions")),
            )
                .into_response()
        }
    }
}

/// GET /api/transactions/:id - Per-id lookup
async fn get_transaction_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    match get_transaction(&conn, id) {
        Ok(Some(transaction)) => (StatusCode::OK, Json(ApiResponse::ok(transaction))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err("Transaction not found")),
        )
            .into_response(),
        Err(e) => {
            eprintln!("Error getting transaction {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("failed to load transaction")),
            )
                .into_response()
        }
    }
}

/// GET /api/stats - Aggregate statistics (by type, by month, overall)
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let conn = state.db.lock().unwrap();

    let stats = type_stats(&conn)
        .and_then(|by_type| {
            let by_month = monthly_stats(&conn)?;
            let overall = overall_stats(&conn)?;
            Ok(StatsResponse {
                by_type,
                by_month,
                overall,
                generated_at: Utc::now().to_rfc3339(),
            })
        });

    match stats {
        Ok(stats) => (StatusCode::OK, Json(ApiResponse::ok(stats))).into_response(),
        Err(e) => {
            eprintln!("Error computing stats: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("failed to compute statistics")),
            )
                .into_response()
        }
    }
}

/// GET /api/search?q= - Substring search over free-text fields
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let term = params.q.unwrap_or_default();
    if term.is_empty() {
        return (
            StatusCode::OK,
            Json(ApiResponse::ok(Vec::<StoredTransaction>::new())),
        )
            .into_response();
    }

    let conn = state.db.lock().unwrap();

    match search_transactions(&conn, &term) {
        Ok(transactions) => (StatusCode::OK, Json(ApiResponse::ok(transactions))).into_response(),
        Err(e) => {
            eprintln!("Error searching transactions: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::err("search failed")),
            )
                .into_response()
        }
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 MoMo Ledger - Query API Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "momo_transactions.db".to_string());
    let db_path = std::path::Path::new(&db_path);

    if !db_path.exists() {
        eprintln!("❌ Database not found at {:?}", db_path);
        eprintln!("   Run: momo-ledger import <sms_export.xml> {:?}", db_path);
        eprintln!("   to import transactions first.");
        std::process::exit(1);
    }

    let conn = Connection::open(db_path).expect("Failed to open database");
    println!("✓ Database opened: {:?}", db_path);

    // Create shared state
    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/transactions", get(get_transactions))
        .route("/transactions/:id", get(get_transaction_detail))
        .route("/stats", get(get_stats))
        .route("/search", get(search))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/transactions");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
