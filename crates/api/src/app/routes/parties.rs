use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use karatbook_parties::PartyKind;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::OrganizationContext;

pub async fn create_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Json(body): Json<dto::CreatePartyRequest>,
) -> axum::response::Response {
    let party = match body.into_party(org.organization_id()) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.parties.create_party(party).await {
        Ok(party) => (StatusCode::CREATED, Json(party)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_parties(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(org): Extension<OrganizationContext>,
    Query(query): Query<dto::ListPartiesQuery>,
) -> axum::response::Response {
    let kind: Option<PartyKind> = match query.kind.as_deref().map(str::parse::<PartyKind>).transpose() {
        Ok(k) => k,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.parties.list_parties(org.organization_id(), kind).await {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
