//! Maintenance endpoints.

use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use karatbook_infra::reset_transactional_data;

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::OrganizationContext;

/// Delete every transactional row of the organization. Master data stays.
pub async fn reset(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
) -> axum::response::Response {
    match reset_transactional_data(services.store.as_ref(), org.organization_id()).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::reset_error_to_response(e),
    }
}
