use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Why a rate source could not produce a quote.
///
/// Every variant means "try the next source"; none of them reach a caller.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{provider}: request timed out")]
    Timeout { provider: &'static str },

    #[error("{provider}: request failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: responded {status}")]
    HttpStatus {
        provider: &'static str,
        status: u16,
    },

    #[error("{provider}: malformed payload: {message}")]
    Malformed {
        provider: &'static str,
        message: String,
    },

    #[error("{provider}: invalid rate {value:?}")]
    InvalidRate {
        provider: &'static str,
        value: String,
    },

    #[error("{provider}: no data")]
    NoData { provider: &'static str },
}

impl SourceError {
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { provider }
        } else {
            Self::Request {
                provider,
                message: err.to_string(),
            }
        }
    }
}

/// Failures fetching the BCRP time series.
#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("BCRP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("BCRP responded {0}")]
    HttpStatus(u16),

    #[error("Invalid BCRP response format")]
    InvalidFormat,

    #[error("Invalid BCRP JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No periods in BCRP response")]
    MissingPeriods,
}

/// Errors surfaced at the HTTP boundary as `{"error": ...}` bodies.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Internal(String),
}

impl From<SeriesError> for ApiError {
    fn from(err: SeriesError) -> Self {
        match err {
            SeriesError::Request(_) => Self::Internal(err.to_string()),
            SeriesError::HttpStatus(_)
            | SeriesError::InvalidFormat
            | SeriesError::Json(_)
            | SeriesError::MissingPeriods => Self::BadGateway(err.to_string()),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_format_errors_are_bad_gateway() {
        let err: ApiError = SeriesError::MissingPeriods.into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "No periods in BCRP response");

        let err: ApiError = SeriesError::HttpStatus(503).into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "BCRP responded 503");
    }

    #[test]
    fn internal_error_is_500() {
        let err = ApiError::Internal("boom".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn source_error_display_names_provider() {
        let err = SourceError::InvalidRate {
            provider: "apisnetpe",
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "apisnetpe: invalid rate \"abc\"");
    }
}
