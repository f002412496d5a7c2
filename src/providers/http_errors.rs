use reqwest::StatusCode;
use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::error::Error;

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::ConnectionRefused
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("connection refused")
        {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == ErrorKind::TimedOut
        {
            return true;
        }

        if source
            .to_string()
            .to_ascii_lowercase()
            .contains("timed out")
        {
            return true;
        }

        current = source.source();
    }

    false
}

/// Maps a transport-level failure to an actionable `Error::Network`.
pub(crate) fn request_error(err: reqwest::Error, api_url: &str) -> Error {
    if err.is_timeout() || error_chain_has_timeout(&err) {
        return Error::Network(format!(
            "request to '{}' timed out. Check model responsiveness and network latency.",
            api_url
        ));
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return Error::Network(format!(
                "connection refused by '{}'. Check the api_base configured for this model.",
                api_url
            ));
        }

        return Error::Network(format!(
            "failed to connect to '{}'. Check the api_base and network connectivity.",
            api_url
        ));
    }

    Error::Network(format!("failed to call '{}': {}", api_url, err))
}

/// Maps a non-2xx response to the exchange error taxonomy.
pub(crate) fn status_error(status: StatusCode, body: &str) -> Error {
    let message = if body.trim().is_empty() {
        "<empty response body>".to_string()
    } else {
        body.trim().to_string()
    };

    match status.as_u16() {
        401 | 403 => Error::Auth {
            status: status.as_u16(),
            message,
        },
        429 => Error::RateLimit {
            status: status.as_u16(),
            message,
        },
        other => Error::Api {
            status: other,
            message,
        },
    }
}
