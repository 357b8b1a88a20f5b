use crate::UrlError;
use url::Url;

/// Canonicalizes a raw link string into the absolute URL form used as the
/// identity key throughout the crawl.
///
/// # Canonicalization Steps
///
/// 1. Resolve relative references against `base` (RFC 3986 join); absolute
///    inputs parse directly
/// 2. Reject anything that is not http:// or https://
/// 3. Lowercase the host
/// 4. Strip the fragment
///
/// The query string is kept exactly as written: two URLs that differ only in
/// query order are distinct crawl targets. Canonicalization is idempotent --
/// feeding the output back in yields the same URL.
///
/// # Arguments
///
/// * `raw` - The link string, absolute or relative
/// * `base` - The URL of the page the link was found on, if any
///
/// # Returns
///
/// * `Ok(Url)` - Canonical absolute URL
/// * `Err(UrlError)` - Malformed input, unsupported scheme, or no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use tidepool::url::canonicalize;
///
/// let url = canonicalize("https://Example.COM/a/page#section", None).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/a/page");
///
/// let base = Url::parse("https://example.com/docs/index.html").unwrap();
/// let url = canonicalize("../about", Some(&base)).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/about");
/// ```
pub fn canonicalize(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let mut url = match base {
        Some(base) => base
            .join(raw)
            .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?,
        None => Url::parse(raw).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?,
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme(url.scheme().to_string()));
    }

    // The url crate lowercases ASCII hosts on parse; re-setting keeps the
    // invariant explicit for anything that slipped through (IDNA edge forms).
    match url.host_str() {
        Some(host) => {
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
            }
        }
        None => return Err(UrlError::MissingHost),
    }

    url.set_fragment(None);

    Ok(url)
}

/// Returns the lowercase host of a canonical URL.
///
/// Canonical URLs always carry a host, so `None` only appears for URLs built
/// outside [`canonicalize`].
pub fn domain_of(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
