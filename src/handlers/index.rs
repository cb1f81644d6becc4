use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
};
use std::convert::Infallible;
use tracing::debug;

const INDEX_TEMPLATE: &str = include_str!("index.html");
const SPLASH_MARKER: &str = "<!--SPLASH-->";
const SPLASH_HTML: &str = r#"<div class="splash-overlay" id="splash-screen">
  <div class="splash-progress">
    <div class="splash-progress-bg"><div class="splash-progress-bar"></div></div>
    <p class="splash-text">Loading...</p>
  </div>
</div>"#;

pub const SPLASH_COOKIE: &str = "splash_seen";

/// Whether this browser session has already seen the splash screen, read
/// from the request's cookies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplashSeen(pub bool);

impl SplashSeen {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let seen = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(name, value)| name == SPLASH_COOKIE && value == "1");
        SplashSeen(seen)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SplashSeen
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SplashSeen::from_headers(&parts.headers))
    }
}

pub fn render_index(show_splash: bool) -> String {
    let splash = if show_splash { SPLASH_HTML } else { "" };
    INDEX_TEMPLATE.replace(SPLASH_MARKER, splash)
}

/// The upload forms. The splash overlay is shown once per browser session.
pub async fn index_handler(SplashSeen(seen): SplashSeen) -> Response {
    debug!(splash_seen = seen, "Rendering index page");

    let mut response = Html(render_index(!seen)).into_response();
    if !seen {
        response.headers_mut().insert(
            header::SET_COOKIE,
            HeaderValue::from_static("splash_seen=1; Path=/; HttpOnly; SameSite=Lax"),
        );
    }
    response
}
