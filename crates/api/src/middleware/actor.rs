//! Acting-user extraction from the `X-Actor-Id` header.

use std::convert::Infallible;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde_json::json;

/// Header carrying the acting user's ID.
pub const ACTOR_HEADER: &str = "x-actor-id";

fn actor_id(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(ACTOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// The user performing a command. Rejects requests without an actor.
///
/// ```ignore
/// async fn handler(actor: Actor) -> impl IntoResponse {
///     let who = actor.id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Actor(pub String);

impl Actor {
    /// Returns the actor's user ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_id(parts).map(Actor).ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "missing_actor",
                    "message": "X-Actor-Id header is required"
                })),
            )
        })
    }
}

/// The user viewing a resource, if known. Anonymous viewers get read-only views.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<String>);

impl Viewer {
    /// Returns the viewer's user ID, or an empty string for anonymous viewers.
    #[must_use]
    pub fn id(&self) -> &str {
        self.0.as_deref().unwrap_or_default()
    }

    /// Returns true if the viewer identified themselves.
    #[must_use]
    pub fn is_known(&self) -> bool {
        self.0.is_some()
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(actor_id(parts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(ACTOR_HEADER, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_actor_from_header() {
        let actor = Actor::from_request_parts(&mut parts(Some(" dm-1 ")), &())
            .await
            .unwrap();
        assert_eq!(actor.id(), "dm-1");
    }

    #[tokio::test]
    async fn test_missing_or_blank_actor_rejected() {
        for header in [None, Some("   ")] {
            let (status, _) = Actor::from_request_parts(&mut parts(header), &())
                .await
                .unwrap_err();
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_viewer_is_optional() {
        let viewer = Viewer::from_request_parts(&mut parts(None), &()).await.unwrap();
        assert!(!viewer.is_known());
        assert_eq!(viewer.id(), "");
    }
}
