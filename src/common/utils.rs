use lambda_http::http::StatusCode;
use lambda_http::Response;
use serde::Serialize;

use crate::common::errors::Error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse<'a> {
    pub message: &'a str,
    pub error: String,
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Result<Response<String>, Error> {
    let response = Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(serde_json::to_string(body)?)?;

    Ok(response)
}

pub fn error_response(message: &str, err: &Error) -> Result<Response<String>, Error> {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorResponse {
            message,
            error: err.to_string(),
        },
    )
}
