//! Internal helpers mapping HTTP/reqwest failures to [`TransportError`].

use std::time::Duration;

use rill_types::TransportError;

/// Map a non-success HTTP status from the chat-completions API to a
/// [`TransportError`].
pub(crate) fn map_http_status(status: reqwest::StatusCode, body: &str) -> TransportError {
    match status.as_u16() {
        401 | 403 => TransportError::Authentication(body.to_string()),
        429 => TransportError::RateLimited(body.to_string()),
        500..=599 => TransportError::ServiceUnavailable(body.to_string()),
        code => TransportError::Status {
            code,
            body: body.to_string(),
        },
    }
}

/// Map a [`reqwest::Error`] to a [`TransportError`].
pub(crate) fn map_reqwest_error(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else {
        TransportError::Network(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_statuses_map_to_authentication() {
        for code in [401u16, 403] {
            let status = reqwest::StatusCode::from_u16(code).unwrap();
            assert!(matches!(
                map_http_status(status, "denied"),
                TransportError::Authentication(body) if body == "denied"
            ));
        }
    }

    #[test]
    fn rate_limit_maps_to_rate_limited() {
        let status = reqwest::StatusCode::TOO_MANY_REQUESTS;
        assert!(matches!(
            map_http_status(status, "slow down"),
            TransportError::RateLimited(_)
        ));
    }

    #[test]
    fn server_errors_map_to_service_unavailable() {
        for code in [500u16, 502, 529] {
            let status = reqwest::StatusCode::from_u16(code).unwrap();
            assert!(matches!(
                map_http_status(status, "oops"),
                TransportError::ServiceUnavailable(_)
            ));
        }
    }

    #[test]
    fn other_statuses_keep_the_code() {
        let status = reqwest::StatusCode::NOT_FOUND;
        assert!(matches!(
            map_http_status(status, "no such model"),
            TransportError::Status { code: 404, .. }
        ));
    }
}
