//! Static file serving for the embedded browser shell
//!
//! Uses rust-embed to bundle the assets/ folder into the binary, enabling
//! single-binary distribution.

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    response::IntoResponse,
};
use rust_embed::Embed;

/// Embedded frontend assets, populated at compile time from assets/
#[derive(Embed)]
#[folder = "assets/"]
struct FrontendAssets;

/// Serve embedded static files, falling back to index.html for the root.
pub async fn serve_static(req: Request<Body>) -> impl IntoResponse {
    let path = req.uri().path().trim_start_matches('/');
    let path = if path.is_empty() { "index.html" } else { path };

    match serve_file(path) {
        Some(response) => response,
        None => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Body::from("Not found"))
            .unwrap_or_default(),
    }
}

fn serve_file(path: &str) -> Option<Response<Body>> {
    let file = FrontendAssets::get(path)?;

    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type)
        .header(header::CACHE_CONTROL, "public, max-age=0, must-revalidate")
        .body(Body::from(file.data.into_owned()))
        .ok()
}
