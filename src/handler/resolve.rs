//! Request path resolution
//!
//! Turns a URL path into a location under the asset root. Anything that could
//! reach outside the root is rejected before the filesystem is touched, and the
//! canonical result is checked again so symlinks cannot escape either.

use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::logger;

/// What a request path points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    File(PathBuf),
    Directory(PathBuf),
}

/// Why a request path could not be served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// Traversal attempt, escape through a symlink, or permission denied (403)
    Forbidden,
    /// Nothing servable at that path (404)
    NotFound,
}

/// Percent-decode a request path once
///
/// A path that is not valid UTF-8 after decoding cannot name anything we serve.
pub fn decode_path(request_path: &str) -> Result<String, ResolveError> {
    percent_decode_str(request_path)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| ResolveError::NotFound)
}

/// Join the segments of an already decoded path onto `root`
///
/// Empty and `.` segments are skipped. A `..` segment, a backslash, or a NUL byte is
/// treated as a traversal attempt.
pub fn sanitize_path(root: &Path, decoded: &str) -> Result<PathBuf, ResolveError> {
    let mut buf = root.to_path_buf();
    for seg in decoded.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                logger::log_warning(&format!("Path traversal attempt blocked: {decoded}"));
                return Err(ResolveError::Forbidden);
            }
            s if s.contains(['\\', '\0']) || (cfg!(windows) && s.contains(':')) => {
                logger::log_warning(&format!("Rejected path segment in: {decoded:?}"));
                return Err(ResolveError::Forbidden);
            }
            s => buf.push(s),
        }
    }
    Ok(buf)
}

/// Resolve a decoded request path against an already canonicalized `root`
pub async fn resolve(root: &Path, decoded: &str) -> Result<Resolved, ResolveError> {
    let candidate = sanitize_path(root, decoded)?;
    contain(root, &candidate).await
}

/// Canonicalize `candidate` and make sure it is still under `root`
///
/// Every path that is about to be served goes through here, including index files
/// picked for a directory, so a symlink anywhere on the way cannot lead outside.
pub async fn contain(root: &Path, candidate: &Path) -> Result<Resolved, ResolveError> {
    let canonical = fs::canonicalize(candidate).await.map_err(|e| io_to_resolve(&e))?;
    if !canonical.starts_with(root) {
        logger::log_warning(&format!(
            "Path escapes asset root: {} -> {}",
            candidate.display(),
            canonical.display()
        ));
        return Err(ResolveError::Forbidden);
    }

    let metadata = fs::metadata(&canonical).await.map_err(|e| io_to_resolve(&e))?;
    if metadata.is_dir() {
        Ok(Resolved::Directory(canonical))
    } else if metadata.is_file() {
        Ok(Resolved::File(canonical))
    } else {
        // sockets, fifos and devices are never served
        Err(ResolveError::NotFound)
    }
}

/// Map a filesystem error to the status family it is reported as
pub fn io_to_resolve(err: &io::Error) -> ResolveError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => ResolveError::Forbidden,
        _ => ResolveError::NotFound,
    }
}
