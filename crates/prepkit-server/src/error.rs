//! Rejection → JSON error mapping.
//!
//! Every failure leaves the server as `{error, message}` with a matching
//! status. Development builds put the detailed error in `message` and the
//! source chain in `detail`; production builds only ever show the generic
//! user message.

use prepkit_core::{AppError, Environment};
use serde::Serialize;
use std::convert::Infallible;
use std::error::Error as _;
use warp::http::StatusCode;
use warp::reject::{MethodNotAllowed, Reject};
use warp::{Rejection, Reply};

/// An application error carried through warp's rejection path.
#[derive(Debug)]
pub struct ApiRejection(pub AppError);

impl Reject for ApiRejection {}

pub fn reject(err: impl Into<AppError>) -> Rejection {
    warp::reject::custom(ApiRejection(err.into()))
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<String>>,
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Weather(_) => StatusCode::BAD_GATEWAY,
        AppError::Storage(_) | AppError::Config(_) | AppError::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn source_chain(err: &AppError) -> Vec<String> {
    let mut chain = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain
}

fn body_for(err: &AppError, status: StatusCode, environment: Environment) -> ErrorBody {
    let error = status.canonical_reason().unwrap_or("Error").to_string();
    if environment.is_development() {
        let chain = source_chain(err);
        ErrorBody {
            error,
            message: err.to_string(),
            detail: (!chain.is_empty()).then_some(chain),
        }
    } else {
        ErrorBody {
            error,
            message: err.user_message().to_string(),
            detail: None,
        }
    }
}

fn plain(status: StatusCode, message: &str) -> ErrorBody {
    ErrorBody {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        message: message.to_string(),
        detail: None,
    }
}

/// Turn any rejection into a JSON error reply.
pub async fn handle_rejection(
    err: Rejection,
    environment: Environment,
) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(ApiRejection(app_err)) = err.find::<ApiRejection>() {
        let status = status_for(app_err);
        tracing::error!("Request failed ({}): {}", status.as_u16(), app_err);
        (status, body_for(app_err, status, environment))
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, plain(StatusCode::NOT_FOUND, "Resource not found"))
    } else if err.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            plain(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed"),
        )
    } else if err.find::<warp::reject::InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, plain(StatusCode::BAD_REQUEST, "Invalid query string"))
    } else {
        tracing::error!("Unhandled rejection: {:?}", err);
        let message = if environment.is_development() {
            format!("{:?}", err)
        } else {
            "An error occurred".to_string()
        };
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            plain(StatusCode::INTERNAL_SERVER_ERROR, &message),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
