//! Directory listing page
//!
//! Rendered for directories that have no index file, when listing is enabled.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::fmt::Write;
use std::io;
use std::path::Path;
use tokio::fs;

use crate::logger;

/// Characters left unescaped in `href` values (RFC 3986 unreserved set)
const HREF_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// A single row of the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub name: String,
    pub is_dir: bool,
}

/// Read the entries of `dir`, sorted case-insensitively by name
///
/// Names that are not valid UTF-8 are left out: no request path can reach them,
/// so a link to one would only ever 404.
pub async fn read_entries(dir: &Path) -> io::Result<Vec<ListingEntry>> {
    let mut reader = fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                logger::log_debug(&format!("Skipping non UTF-8 entry {raw:?} in listing"));
                continue;
            }
        };
        // metadata() follows symlinks, so a link to a directory lists as one
        let is_dir = fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        entries.push(ListingEntry {
            name,
            is_dir,
        });
    }
    entries.sort_by_cached_key(|e| e.name.to_lowercase());
    Ok(entries)
}

/// Render the listing page for `request_path` (the decoded URL of the directory)
pub fn render(request_path: &str, entries: &[ListingEntry]) -> String {
    let title = format!("Directory listing for {}", escape_html(request_path));
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n<hr>\n<ul>\n"
    );

    if request_path != "/" {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }

    for entry in entries {
        let suffix = if entry.is_dir { "/" } else { "" };
        let href = utf8_percent_encode(&entry.name, HREF_ENCODE_SET);
        let _ = writeln!(
            html,
            "<li><a href=\"{href}{suffix}\">{}{suffix}</a></li>",
            escape_html(&entry.name)
        );
    }

    html.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    html
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_sorted_with_dir_flag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.js"), "").unwrap();
        std::fs::write(dir.path().join("A.css"), "").unwrap();
        std::fs::create_dir(dir.path().join("assets")).unwrap();

        let entries = read_entries(dir.path()).await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| (e.name.as_str(), e.is_dir)).collect();
        assert_eq!(names, vec![("A.css", false), ("assets", true), ("b.js", false)]);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_entries_skip_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "").unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.txt")), "").unwrap();

        let entries = read_entries(dir.path()).await.unwrap();
        assert_eq!(
            entries,
            vec![ListingEntry {
                name: "app.js".to_string(),
                is_dir: false,
            }]
        );
        assert!(!render("/", &entries).contains('\u{fffd}'));
    }

    #[test]
    fn test_render_escapes_and_encodes() {
        let entries = vec![
            ListingEntry {
                name: "<script>.js".to_string(),
                is_dir: false,
            },
            ListingEntry {
                name: "my docs".to_string(),
                is_dir: true,
            },
        ];
        let html = render("/files/", &entries);
        assert!(html.contains("<title>Directory listing for /files/</title>"));
        assert!(html.contains("<a href=\"../\">../</a>"));
        assert!(html.contains("<a href=\"%3Cscript%3E.js\">&lt;script&gt;.js</a>"));
        assert!(html.contains("<a href=\"my%20docs/\">my docs/</a>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_render_root_has_no_parent_link() {
        let html = render("/", &[]);
        assert!(!html.contains("../"));
    }
}
