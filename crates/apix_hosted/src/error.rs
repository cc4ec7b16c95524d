use apix_runner::api::ApiError;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("could not authenticate against the hosted API")]
    Unauthenticated,
    #[error("could not authorize against the hosted API")]
    Unauthorized,
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("internal server error")]
    ServerError,
    #[error("request failed; unexpected response code: '{status}', msg: '{body}'")]
    UnexpectedStatus { status: u16, body: String },
    #[error("hosted API returned an unexpected schema: {0}")]
    SchemaError(String),
    #[error("hosted API returned an unexpected error: {0}")]
    Other(String),
}

impl Error {
    /// Maps a non-success response status, along with whatever body came with it.
    pub(crate) fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            Self::Unauthenticated
        } else if status == StatusCode::FORBIDDEN {
            Self::Unauthorized
        } else if status == StatusCode::NOT_FOUND {
            Self::NotFound(body)
        } else if status.is_server_error() {
            Self::ServerError
        } else {
            Self::UnexpectedStatus {
                status: status.as_u16(),
                body,
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            return Self::SchemaError(e.to_string());
        }
        match e.status() {
            Some(code) => Self::from_status(code, e.to_string()),
            None => Self::Other(e.to_string()),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidUrl(url) => ApiError::InvalidUrl(url),
            Error::Unauthenticated | Error::Unauthorized => ApiError::Unauthenticated,
            Error::NotFound(body) => ApiError::UnexpectedStatus { status: 404, body },
            Error::ServerError => ApiError::InternalServerError,
            Error::UnexpectedStatus { status, body } => ApiError::UnexpectedStatus { status, body },
            Error::SchemaError(msg) => ApiError::SchemaError(msg),
            Error::Other(msg) => ApiError::Transport(msg),
        }
    }
}

#[cfg(test)]
mod test {
    use apix_runner::api::ApiError;
    use reqwest::StatusCode;

    use super::Error;

    #[test]
    fn statuses_map_to_errors() {
        assert!(matches!(
            Error::from_status(StatusCode::UNAUTHORIZED, String::new()),
            Error::Unauthenticated
        ));
        assert!(matches!(
            Error::from_status(StatusCode::FORBIDDEN, String::new()),
            Error::Unauthorized
        ));
        assert!(matches!(
            Error::from_status(StatusCode::BAD_GATEWAY, String::new()),
            Error::ServerError
        ));
        assert!(matches!(
            Error::from_status(StatusCode::BAD_REQUEST, "bad".to_owned()),
            Error::UnexpectedStatus { status: 400, body } if body == "bad"
        ));
    }

    #[test]
    fn not_found_is_not_an_event_lookup_miss_by_default() {
        let api_error = ApiError::from(Error::NotFound("gone".to_owned()));
        assert!(!api_error.is_not_found());
        assert!(matches!(api_error, ApiError::UnexpectedStatus { status: 404, .. }));
    }
}
