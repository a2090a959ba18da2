//! The landing page and its assets, compiled into the binary.
//!
//! Everything under `frontend/` is listed once in [`ASSETS`]; `/` serves the
//! page and `/static/{file}` looks the rest up by file name.

use axum::{
    Router,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

struct Asset {
    file: &'static str,
    content_type: &'static str,
    body: &'static str,
}

const INDEX: Asset = Asset {
    file: "index.html",
    content_type: "text/html; charset=utf-8",
    body: include_str!("../../../frontend/index.html"),
};

const ASSETS: &[Asset] = &[
    Asset {
        file: "style.css",
        content_type: "text/css; charset=utf-8",
        body: include_str!("../../../frontend/style.css"),
    },
    Asset {
        file: "app.js",
        content_type: "text/javascript; charset=utf-8",
        body: include_str!("../../../frontend/app.js"),
    },
];

/// Assets are embedded per build, so a short cache is safe across restarts.
const ASSET_CACHE: &str = "public, max-age=300";

pub fn frontend_router() -> Router {
    Router::new()
        .route("/", get(|| async { serve(&INDEX, "no-cache") }))
        .route("/static/{file}", get(static_handler))
}

async fn static_handler(Path(file): Path<String>) -> Response {
    match ASSETS.iter().find(|asset| asset.file == file) {
        Some(asset) => serve(asset, ASSET_CACHE),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn serve(asset: &Asset, cache_control: &'static str) -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(asset.content_type)),
            (header::CACHE_CONTROL, HeaderValue::from_static(cache_control)),
        ],
        asset.body,
    )
        .into_response()
}
