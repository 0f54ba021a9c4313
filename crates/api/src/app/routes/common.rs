use std::str::FromStr;

use axum::response::Response;

use karatbook_core::DomainError;

use crate::app::errors;

/// Parse an id taken from the request path.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}
