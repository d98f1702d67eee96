//! Login response classification.
//!
//! The server enforces the token check, so the client cannot tell an
//! attestation rejection from any other server problem. Only a 200 with a
//! non-empty text body counts as acceptance.

use attested_core::DispatchError;

/// The only status the login endpoint answers with on acceptance.
pub const ACCEPTED_STATUS: u16 = 200;

/// Turn a status and raw body into a shape name or a dispatch error.
pub fn classify(status: u16, body: &[u8]) -> Result<String, DispatchError> {
    if status != ACCEPTED_STATUS {
        return Err(DispatchError::Rejected { status });
    }

    if body.is_empty() {
        return Err(DispatchError::EmptyBody);
    }

    String::from_utf8(body.to_vec()).map_err(|e| DispatchError::InvalidBody(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_shape() {
        assert_eq!(classify(200, b"Triangle").unwrap(), "Triangle");
    }

    #[test]
    fn test_forbidden_ignores_body() {
        assert_eq!(
            classify(403, b"Triangle"),
            Err(DispatchError::Rejected { status: 403 })
        );
    }

    #[test]
    fn test_other_statuses_are_rejections() {
        for status in [201, 204, 301, 400, 401, 404, 500, 503] {
            assert_eq!(classify(status, b"Circle"), Err(DispatchError::Rejected { status }));
        }
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(classify(200, b""), Err(DispatchError::EmptyBody));
    }

    #[test]
    fn test_non_text_body() {
        let err = classify(200, &[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidBody(_)));
    }

    #[test]
    fn test_body_is_not_trimmed() {
        assert_eq!(classify(200, b"Square\n").unwrap(), "Square\n");
    }
}
