// SPDX-License-Identifier: BUSL-1.1

use super::*;

#[test]
fn http_status_mapping() {
    assert_eq!(GatewayError::InvalidArgument.http_status(), 400);
    assert_eq!(GatewayError::NotFound.http_status(), 404);
    assert_eq!(GatewayError::AlreadyExists.http_status(), 409);
    assert_eq!(GatewayError::Unavailable.http_status(), 503);
    assert_eq!(GatewayError::Internal.http_status(), 500);
}

#[test]
fn display_matches_as_str() {
    for err in [
        GatewayError::InvalidArgument,
        GatewayError::NotFound,
        GatewayError::AlreadyExists,
        GatewayError::Unavailable,
        GatewayError::Internal,
    ] {
        assert_eq!(err.to_string(), err.as_str());
    }
}
