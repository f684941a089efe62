use url::{Host, Url};

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_sweep::url::extract_host;
///
/// let url = Url::parse("https://Blog.Example.COM:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("blog.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the registrable domain of a URL: its last two DNS labels
///
/// IP addresses and single-label hosts are returned whole. This is a
/// deliberately simple rule, so `a.example.co.uk` and `b.other.co.uk` share
/// the registrable domain `co.uk`.
pub fn registrable_domain(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_lowercase();
            let labels: Vec<&str> = domain.split('.').collect();
            if labels.len() <= 2 {
                Some(domain)
            } else {
                Some(labels[labels.len() - 2..].join("."))
            }
        }
    }
}
