//! Bearer token check for the control API.
//!
//! The API listens on loopback for the UI shell. When `CONTROL_API_TOKEN` is
//! set every request must present it; otherwise requests are accepted as is.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
};

use crate::AppState;

/// Marker extracted by handlers that require an authorized caller.
#[derive(Debug, Clone, Copy)]
pub struct ControlAuth;

impl FromRequestParts<AppState> for ControlAuth {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.control_api_token.as_deref() else {
            return Ok(ControlAuth);
        };

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        match auth_header {
            Some(header) if header.starts_with("Bearer ") => {
                let token = header.trim_start_matches("Bearer ").trim();
                if token.is_empty() {
                    return Err((StatusCode::UNAUTHORIZED, "Empty bearer token"));
                }
                if token != expected {
                    tracing::warn!("Control API request with wrong token");
                    return Err((StatusCode::UNAUTHORIZED, "Invalid token"));
                }
                Ok(ControlAuth)
            }
            Some(_) => Err((
                StatusCode::UNAUTHORIZED,
                "Invalid authorization header format",
            )),
            None => Err((StatusCode::UNAUTHORIZED, "Missing authorization header")),
        }
    }
}
