//! Partial-navigation negotiation
//!
//! The site frontend swaps page fragments over XHR and cannot follow a 301
//! transparently, so a resolved redirect is answered in two wire shapes:
//! full page loads get `301 Moved Permanently` with `Location`, fragment
//! requests (marked by `X-Partial-Request: true`) get `204 No Content` with
//! the target in `X-Redirect-To`. The original query string rides along
//! unchanged in both.

use axum::{
    extract::FromRequestParts,
    http::{header::LOCATION, request::Parts, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::debug;
use waypost_common::{metrics, resolver::RedirectTarget, slug::EntityKind};

/// Marks an in-page fragment request
pub const PARTIAL_REQUEST: HeaderName = HeaderName::from_static("x-partial-request");

/// Carries the redirect address on a partial-navigation response
pub const REDIRECT_TO: HeaderName = HeaderName::from_static("x-redirect-to");

/// Whether the request asked for a page fragment
#[derive(Clone, Copy, Debug)]
pub struct PartialNavigation(pub bool);

impl<S> FromRequestParts<S> for PartialNavigation
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let partial = parts
            .headers
            .get(&PARTIAL_REQUEST)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(PartialNavigation(partial))
    }
}

/// Answer a resolved redirect in the transport the client can follow
pub fn redirect_reply(
    kind: EntityKind,
    target: &RedirectTarget,
    raw_query: Option<&str>,
    partial: bool,
) -> Response {
    let location = target.location(raw_query);
    debug!(kind = kind.as_str(), location, partial, "Redirecting retired slug");

    if partial {
        metrics::record_redirect(kind, "partial");
        (StatusCode::NO_CONTENT, [(REDIRECT_TO, location)]).into_response()
    } else {
        metrics::record_redirect(kind, "permanent");
        (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response()
    }
}
