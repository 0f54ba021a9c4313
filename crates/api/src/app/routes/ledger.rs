use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;

use karatbook_core::EntryId;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OrganizationContext;

pub fn router() -> Router {
    Router::new()
        .route("/accounts", post(create_account).get(list_accounts))
        .route("/accounts/seed", post(seed_default_chart))
        .route("/entries", post(post_entry))
        .route("/entries/:id", get(get_entry))
        .route("/drafts", post(save_draft))
        .route("/drafts/:id/post", post(post_draft))
        .route("/trial-balance", get(trial_balance))
        .route("/profit-and-loss", get(profit_and_loss))
        .route("/audit", get(audit_balances))
        .route("/audit/repair", post(repair_balances))
}

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Json(body): Json<dto::CreateAccountRequest>,
) -> axum::response::Response {
    let kind = match body.kind() {
        Ok(k) => k,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .ledger
        .create_account(org.organization_id(), &body.code, &body.name, kind)
        .await
    {
        Ok(account) => (StatusCode::CREATED, Json(account)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
) -> axum::response::Response {
    match services.ledger.list_accounts(org.organization_id()).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn seed_default_chart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
) -> axum::response::Response {
    match services.ledger.seed_default_chart(org.organization_id()).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn post_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Json(body): Json<dto::PostEntryRequest>,
) -> axum::response::Response {
    let cmd = body.into_command(org.organization_id());
    match services.ledger.post_entry(&cmd).await {
        Ok(entry_id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "entry_id": entry_id, "status": "posted" })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn save_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Json(body): Json<dto::PostEntryRequest>,
) -> axum::response::Response {
    let cmd = body.into_command(org.organization_id());
    match services.ledger.save_draft(&cmd).await {
        Ok(entry_id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "entry_id": entry_id, "status": "draft" })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let entry_id: EntryId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.get_entry(org.organization_id(), entry_id).await {
        Ok((entry, details)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "entry": entry, "details": details })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn post_draft(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let entry_id: EntryId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.ledger.post_draft(org.organization_id(), entry_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "entry_id": entry_id, "status": "posted" })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn trial_balance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Query(query): Query<dto::TrialBalanceQuery>,
) -> axum::response::Response {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    match services.ledger.trial_balance(org.organization_id(), as_of).await {
        Ok(tb) => (StatusCode::OK, Json(tb)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn profit_and_loss(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Query(query): Query<dto::ProfitAndLossQuery>,
) -> axum::response::Response {
    match services
        .ledger
        .profit_and_loss(org.organization_id(), query.from, query.to)
        .await
    {
        Ok(pnl) => (StatusCode::OK, Json(pnl)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn audit_balances(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
) -> axum::response::Response {
    match services.ledger.audit_balances(org.organization_id()).await {
        Ok(drift) => (
            StatusCode::OK,
            Json(serde_json::json!({ "consistent": drift.is_empty(), "drift": drift })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn repair_balances(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
) -> axum::response::Response {
    match services.ledger.repair_balances(org.organization_id()).await {
        Ok(accounts) => (
            StatusCode::OK,
            Json(serde_json::json!({ "accounts_recomputed": accounts })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
