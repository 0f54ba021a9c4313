use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use karatbook_core::DomainError;
use karatbook_infra::{ResetError, ServiceError, StoreError};

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Domain(e) => domain_error_to_response(e),
        ServiceError::Store { step, source } => store_error_to_response(step, source),
    }
}

fn store_error_to_response(step: &str, err: StoreError) -> axum::response::Response {
    match err {
        // unique and foreign keys reject what the request referenced
        StoreError::Conflict { .. } | StoreError::ForeignKeyViolation { .. } => {
            json_error(StatusCode::CONFLICT, "conflict", format!("{step}: {err}"))
        }
        other => {
            tracing::error!(step, error = %other, "store failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                format!("{step}: {other}"),
            )
        }
    }
}

pub fn reset_error_to_response(err: ResetError) -> axum::response::Response {
    tracing::error!(step = %err.step, error = %err.source, "reset aborted");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({
            "error": "reset_failed",
            "message": err.to_string(),
            "step": err.step,
            "completed": err.completed,
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use karatbook_infra::Table;

    #[test]
    fn domain_errors_map_to_statuses() {
        let cases = [
            (DomainError::validation("x"), StatusCode::BAD_REQUEST),
            (DomainError::invalid_id("x"), StatusCode::BAD_REQUEST),
            (DomainError::not_found("x"), StatusCode::NOT_FOUND),
            (DomainError::conflict("x"), StatusCode::CONFLICT),
            (DomainError::invariant("x"), StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (err, status) in cases {
            assert_eq!(domain_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn backend_failures_are_internal_errors() {
        let res = service_error_to_response(ServiceError::Store {
            step: "commit",
            source: StoreError::Backend("boom".into()),
        });
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let res = service_error_to_response(ServiceError::Store {
            step: "commit",
            source: StoreError::Conflict {
                table: Table::Sales,
                detail: "duplicate invoice".into(),
            },
        });
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }
}
