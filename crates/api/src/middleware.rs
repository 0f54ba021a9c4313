use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use karatbook_core::OrganizationId;

use crate::app::errors::json_error;
use crate::context::OrganizationContext;

/// Set by the upstream identity layer once the caller is authenticated.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

pub async fn organization_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let organization_id = extract_organization(req.headers())?;

    req.extensions_mut()
        .insert(OrganizationContext::new(organization_id));

    Ok(next.run(req).await)
}

fn extract_organization(headers: &HeaderMap) -> Result<OrganizationId, Response> {
    let header = headers.get(ORGANIZATION_HEADER).ok_or_else(|| {
        json_error(
            StatusCode::UNAUTHORIZED,
            "missing_organization",
            "X-Organization-Id header is required",
        )
    })?;

    header
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or_else(|| {
            json_error(
                StatusCode::BAD_REQUEST,
                "invalid_organization",
                "X-Organization-Id must be a UUID",
            )
        })
}
