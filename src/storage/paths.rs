use std::path::PathBuf;
use url::Url;

/// Derives the relative artifact path for a fetched URL.
///
/// The `www.`-stripped host becomes the leading directory and the URL path
/// nests beneath it; a trailing empty segment becomes `index`. When the
/// filename carries no extension, one is inferred from the content type.
/// Distinct URLs can derive the same path (query strings are ignored); the
/// later write wins.
///
/// # Arguments
///
/// * `url` - Canonical URL of the fetched document
/// * `content_type` - Response Content-Type header value
///
/// # Examples
///
/// ```
/// use url::Url;
/// use std::path::PathBuf;
/// use tidepool::storage::artifact_rel_path;
///
/// let url = Url::parse("https://www.example.com/docs/guide/").unwrap();
/// assert_eq!(
///     artifact_rel_path(&url, "text/html; charset=utf-8"),
///     PathBuf::from("example.com/docs/guide/index.html"),
/// );
///
/// let url = Url::parse("https://example.com/files/report.pdf").unwrap();
/// assert_eq!(
///     artifact_rel_path(&url, "application/pdf"),
///     PathBuf::from("example.com/files/report.pdf"),
/// );
/// ```
pub fn artifact_rel_path(url: &Url, content_type: &str) -> PathBuf {
    let host = url.host_str().unwrap_or("unknown-host");
    let host = host.strip_prefix("www.").unwrap_or(host);
    let domain = sanitize_segment(host);

    let mut segments: Vec<String> = url
        .path_segments()
        .map(|segs| {
            segs.filter(|s| !s.is_empty() && *s != "." && *s != "..")
                .map(sanitize_segment)
                .collect()
        })
        .unwrap_or_default();

    if segments.is_empty() || url.path().ends_with('/') {
        segments.push("index".to_string());
    }

    if let Some(last) = segments.last_mut() {
        if !last.contains('.') {
            if let Some(ext) = extension_for(content_type) {
                last.push('.');
                last.push_str(ext);
            }
        }
    }

    let mut path = PathBuf::from(domain);
    for segment in segments {
        path.push(segment);
    }
    path
}

/// Strips parameters and normalizes a Content-Type header value to its
/// lowercase essence (`"text/HTML; charset=utf-8"` becomes `"text/html"`).
pub fn content_type_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Maps a Content-Type essence to a storage extension.
///
/// Unrecognized types map to `None`; the artifact is stored without an
/// added extension.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type_essence(content_type);

    match essence.as_str() {
        "text/html" | "application/xhtml+xml" => Some("html"),
        "application/pdf" => Some("pdf"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "text/plain" => Some("txt"),
        "application/json" => Some("json"),
        "text/css" => Some("css"),
        "application/javascript" | "text/javascript" => Some("js"),
        _ => None,
    }
}

/// Whether a Content-Type essence is HTML.
pub fn is_html(content_type: &str) -> bool {
    let essence = content_type_essence(content_type);
    essence == "text/html" || essence == "application/xhtml+xml"
}

pub(crate) fn sanitize_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
