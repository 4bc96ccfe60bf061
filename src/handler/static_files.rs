//! Static file serving module
//!
//! Resolves a request against the asset root, then serves a file, an index file,
//! a directory listing, or an error status.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::AssetsConfig;
use crate::error::{Result, ServerError};
use crate::handler::listing;
use crate::handler::resolve::{self, ResolveError, Resolved};
use crate::http::{self, mime};
use crate::logger;

/// The directory assets are served from, checked once at startup
#[derive(Debug, Clone)]
pub struct AssetRoot {
    root: PathBuf,
    index_files: Vec<String>,
    directory_listing: bool,
}

impl AssetRoot {
    /// Canonicalize and verify the configured root directory
    pub fn open(assets: &AssetsConfig) -> Result<Self> {
        let root = assets.root_dir.canonicalize().map_err(|e| {
            ServerError::Config(format!(
                "Asset root '{}' is not accessible: {e}",
                assets.root_dir.display()
            ))
        })?;
        if !root.is_dir() {
            return Err(ServerError::Config(format!(
                "Asset root '{}' is not a directory",
                assets.root_dir.display()
            )));
        }
        std::fs::read_dir(&root).map_err(|e| {
            ServerError::Config(format!(
                "Asset root '{}' is not readable: {e}",
                assets.root_dir.display()
            ))
        })?;

        Ok(Self {
            root,
            index_files: assets.index_files.clone(),
            directory_listing: assets.directory_listing,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }
}

/// Serve `request_path`, with `query` (if any) preserved on redirects
pub async fn serve(root: &AssetRoot, request_path: &str, query: Option<&str>) -> Response<Full<Bytes>> {
    let decoded = match resolve::decode_path(request_path) {
        Ok(decoded) => decoded,
        Err(err) => return error_response(err),
    };

    match resolve::resolve(&root.root, &decoded).await {
        Ok(Resolved::File(file)) => {
            // "/app.js/" names a directory that does not exist
            if request_path.ends_with('/') {
                return http::build_404_response();
            }
            serve_file(&file).await
        }
        Ok(Resolved::Directory(dir)) => {
            if !request_path.ends_with('/') {
                return http::build_redirect_response(&slash_location(request_path, query));
            }
            serve_directory(root, &dir, &decoded).await
        }
        Err(err) => error_response(err),
    }
}

/// Redirect target for a directory requested without its trailing slash
///
/// Leading slashes are collapsed to one: "//host" in a Location header is a
/// scheme-relative URL pointing at another site.
fn slash_location(request_path: &str, query: Option<&str>) -> String {
    let path = request_path.trim_start_matches('/');
    match query {
        Some(q) => format!("/{path}/?{q}"),
        None => format!("/{path}/"),
    }
}

async fn serve_directory(root: &AssetRoot, dir: &Path, decoded: &str) -> Response<Full<Bytes>> {
    for index_file in &root.index_files {
        match resolve::contain(&root.root, &dir.join(index_file)).await {
            Ok(Resolved::File(path)) => return serve_file(&path).await,
            Ok(Resolved::Directory(_)) | Err(ResolveError::NotFound) => {}
            Err(ResolveError::Forbidden) => return http::build_403_response(),
        }
    }

    if !root.directory_listing {
        return http::build_404_response();
    }

    match listing::read_entries(dir).await {
        Ok(entries) => http::build_html_response(listing::render(decoded, &entries)),
        Err(e) => {
            logger::log_error(&format!(
                "Failed to list directory '{}': {e}",
                dir.display()
            ));
            error_response(resolve::io_to_resolve(&e))
        }
    }
}

/// Read a whole file and answer 200 with its inferred content type
pub async fn serve_file(path: &Path) -> Response<Full<Bytes>> {
    match fs::read(path).await {
        Ok(content) => http::build_file_response(Bytes::from(content), mime::content_type_for(path)),
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            error_response(resolve::io_to_resolve(&e))
        }
    }
}

fn error_response(err: ResolveError) -> Response<Full<Bytes>> {
    match err {
        ResolveError::Forbidden => http::build_403_response(),
        ResolveError::NotFound => http::build_404_response(),
    }
}
