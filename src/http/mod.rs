//! HTTP protocol layer module
//!
//! Content type detection and response builders, independent of how files are
//! located on disk.

pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_403_response, build_404_response, build_405_response, build_file_response,
    build_html_response, build_redirect_response, strip_body,
};
