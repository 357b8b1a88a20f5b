/// Allowed-domain predicate for the crawl scope.
///
/// Entries are normalized once at construction (lowercased, `www.` stripped),
/// and candidate hosts get the same treatment, so `example.com` and
/// `www.example.com` are always the same site from the scope's point of view.
/// A host is in scope when it equals an entry or is a subdomain of one. There
/// is no other wildcard syntax.
#[derive(Debug, Clone)]
pub struct ScopeList {
    domains: Vec<String>,
}

impl ScopeList {
    /// Builds a scope list from configured allowed domains.
    pub fn new(allowed: &[String]) -> Self {
        let domains = allowed
            .iter()
            .map(|d| strip_www(&d.to_lowercase()).to_string())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    /// Checks whether a host falls inside the crawl scope.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidepool::url::ScopeList;
    ///
    /// let scope = ScopeList::new(&["example.com".to_string()]);
    /// assert!(scope.in_scope("example.com"));
    /// assert!(scope.in_scope("www.example.com"));
    /// assert!(scope.in_scope("blog.example.com"));
    /// assert!(!scope.in_scope("example.org"));
    /// assert!(!scope.in_scope("evilexample.com"));
    /// ```
    pub fn in_scope(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let host = strip_www(&host);
        self.domains
            .iter()
            .any(|d| host == d || is_subdomain_of(host, d))
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

fn is_subdomain_of(host: &str, base: &str) -> bool {
    host.len() > base.len()
        && host.ends_with(base)
        && host.as_bytes()[host.len() - base.len() - 1] == b'.'
}
