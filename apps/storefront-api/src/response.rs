//! Success envelope: `{ "status": "success", "message": ..., "data": ... }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

/// 200 with the success envelope.
pub fn success<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    respond(StatusCode::OK, message.into(), data)
}

/// 201 with the success envelope.
pub fn created<T: Serialize>(message: impl Into<String>, data: T) -> Response {
    respond(StatusCode::CREATED, message.into(), data)
}

fn respond<T: Serialize>(status: StatusCode, message: String, data: T) -> Response {
    (
        status,
        Json(Envelope {
            status: "success",
            message,
            data,
        }),
    )
        .into_response()
}
