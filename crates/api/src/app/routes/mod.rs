use axum::{Router, routing::post};

pub mod admin;
pub mod common;
pub mod documents;
pub mod inventory;
pub mod ledger;
pub mod parties;
pub mod purchases;
pub mod system;

/// Router for all organization-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/ledger", ledger::router())
        .nest("/inventory", inventory::router())
        .nest("/purchases", purchases::router())
        .route("/parties", post(parties::create_party).get(parties::list_parties))
        .route("/sales", post(documents::post_sale))
        .route("/vouchers", post(documents::post_voucher))
        .route("/advances", post(documents::post_advance))
        .route("/admin/reset", post(admin::reset))
}
