use axum::http::{header, HeaderValue};
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeader;

pub type StaticFiles = SetResponseHeader<ServeDir<ServeFile>, HeaderValue>;

/// Files under `folder`, with `index.html` for any path that is not a file.
pub fn static_files(folder: &Path) -> StaticFiles {
    let index = ServeFile::new(folder.join("index.html"));
    SetResponseHeader::if_not_present(
        ServeDir::new(folder).fallback(index),
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    )
}
