use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use karatbook_core::DocumentId;

use crate::app::routes::common::parse_id;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OrganizationContext;

pub fn router() -> Router {
    Router::new()
        .route("/orders", post(create_purchase_order))
        .route("/orders/:id", get(get_purchase_order))
        .route("/receipts", post(post_purchase_receipt))
}

pub async fn create_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Json(body): Json<dto::PurchaseOrderRequest>,
) -> axum::response::Response {
    let order = match body.into_order(org.organization_id()) {
        Ok(o) => o,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.documents.create_purchase_order(&order).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(serde_json::json!({ "id": id, "total": order.total() })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_purchase_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: DocumentId = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .documents
        .purchase_order(org.organization_id(), order_id)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn post_purchase_receipt(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Json(body): Json<dto::PurchaseReceiptRequest>,
) -> axum::response::Response {
    let (receipt, order_id) = match body.into_receipt(org.organization_id()) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .documents
        .post_purchase_receipt(receipt, order_id)
        .await
    {
        Ok(posted) => (StatusCode::CREATED, Json(posted)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
