//! Router assembly. The tenant resolution middleware wraps every route; the
//! exemption table inside it lets the control-plane endpoints through.

use crate::handlers::auth::{
    forgot_password, get_tenant_id, login, register_admin, register_doctor, register_hospital,
    reset_password, signup,
};
use crate::handlers::hospitals::{delete_hospital, update_hospital};
use crate::handlers::users::get_users;
use crate::state::AppState;
use crate::tenant::middleware::resolve_tenant;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/auth/register-hospital", post(register_hospital))
        .route("/auth/get-tenant-id/:subdomain", get(get_tenant_id))
        .route("/auth/register-admin", post(register_admin))
        .route("/auth/signup", post(signup))
        .route("/auth/register-doctor", post(register_doctor))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/users", get(get_users))
        .route("/hospitals/:id", patch(update_hospital))
        .route("/hospitals/:tenant_id/:hospital_id", delete(delete_hospital))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_tenant))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
