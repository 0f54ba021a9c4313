//! Posting of sales, vouchers and advances.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OrganizationContext;

pub async fn post_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Json(body): Json<dto::SaleRequest>,
) -> axum::response::Response {
    let sale = match body.into_sale(org.organization_id()) {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.post_document(&sale).await {
        Ok(posted) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "document_id": posted.document_id,
                "entry_id": posted.entry_id,
                "total": sale.total(),
                "outstanding": sale.outstanding(),
            })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn post_voucher(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Json(body): Json<dto::VoucherRequest>,
) -> axum::response::Response {
    let voucher = match body.into_voucher(org.organization_id()) {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.post_document(&voucher).await {
        Ok(posted) => (StatusCode::CREATED, Json(posted)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn post_advance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Json(body): Json<dto::AdvanceRequest>,
) -> axum::response::Response {
    let advance = match body.into_advance(org.organization_id()) {
        Ok(a) => a,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.post_document(&advance).await {
        Ok(posted) => (StatusCode::CREATED, Json(posted)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
