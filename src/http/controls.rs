use axum::{
    http::header,
    response::{Html, IntoResponse},
};

const CONTROLS_HTML: &str = include_str!("../../assets/controls.html");
const INTEGRATION_JS: &str = include_str!("../../assets/familystream-ha-integration.js");

/// GET /controls
pub async fn serve_controls() -> Html<&'static str> {
    Html(CONTROLS_HTML)
}

/// GET /familystream-ha-integration.js: the script injected into proxied pages.
pub async fn serve_integration_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        INTEGRATION_JS,
    )
}
