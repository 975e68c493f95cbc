//! OpenAPI document and the Swagger UI page served at `/docs`.

use axum::Json;
use axum::response::Html;
use utoipa::OpenApi;

use super::handler;
use crate::core::models::{HealthResponse, SummarizeRequest};

pub const API_TITLE: &str = "Smart Summary App Backend";
pub const OPENAPI_PATH: &str = "/openapi.json";

const SWAGGER_UI_VERSION: &str = "5";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Smart Summary App Backend",
        version = "1.0.0",
        description = "Streams LLM-generated summaries of submitted text."
    ),
    paths(handler::health_handler, handler::summarize_handler),
    components(schemas(SummarizeRequest, HealthResponse)),
    tags(
        (name = "health", description = "Liveness"),
        (name = "summarize", description = "Text summarization")
    )
)]
pub struct ApiDoc;

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub async fn swagger_ui_handler() -> Html<String> {
    Html(swagger_ui_html(OPENAPI_PATH, &format!("{API_TITLE} - Swagger UI")))
}

/// Minimal Swagger UI page; assets come from the jsDelivr CDN.
#[must_use]
pub fn swagger_ui_html(openapi_url: &str, title: &str) -> String {
    let cdn = format!("https://cdn.jsdelivr.net/npm/swagger-ui-dist@{SWAGGER_UI_VERSION}");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<link type="text/css" rel="stylesheet" href="{cdn}/swagger-ui.css">
</head>
<body>
<div id="swagger-ui"></div>
<script src="{cdn}/swagger-ui-bundle.js"></script>
<script>
const ui = SwaggerUIBundle({{
    url: '{openapi_url}',
    dom_id: '#swagger-ui',
    layout: 'BaseLayout',
    deepLinking: true,
    showExtensions: true,
    showCommonExtensions: true,
    presets: [SwaggerUIBundle.presets.apis, SwaggerUIBundle.SwaggerUIStandalonePreset],
}})
</script>
</body>
</html>
"#
    )
}
