//! Session cookie handling.

use axum::http::{HeaderMap, HeaderValue, header};
use promptwright_core::session::SessionId;

/// Find the session id carried by the `Cookie` header(s), if any.
///
/// Values that are not well-formed session ids are ignored, the same as a
/// missing cookie.
pub fn read_session_id(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .and_then(|(_, value)| SessionId::parse(value.trim()))
}

/// Build the `Set-Cookie` value that hands `id` to the client.
pub fn session_cookie(cookie_name: &str, id: &SessionId) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{cookie_name}={id}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .ok()
}
