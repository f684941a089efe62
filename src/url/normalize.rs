use crate::UrlError;
use url::Url;

/// Parses a string as an absolute HTTP(S) URL
///
/// Fragments are dropped since they never identify a different page.
pub fn parse_http_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);
    Ok(url)
}

/// Removes `utm_*` tracking parameters and the fragment from a URL
///
/// The order of the remaining query parameters is preserved so the URL that is
/// actually requested stays as close as possible to what the page linked to.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_sweep::url::strip_tracking_params;
///
/// let url = Url::parse("https://example.com/a?id=3&utm_source=x#top").unwrap();
/// assert_eq!(strip_tracking_params(&url).as_str(), "https://example.com/a?id=3");
/// ```
pub fn strip_tracking_params(url: &Url) -> Url {
    let mut cleaned = url.clone();
    cleaned.set_fragment(None);

    if url.query().is_none() {
        return cleaned;
    }

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        cleaned.set_query(None);
    } else {
        cleaned.query_pairs_mut().clear().extend_pairs(kept);
    }
    cleaned
}

/// Computes the key used to decide whether two URLs are the same page
///
/// The key ignores the scheme, a leading `www.`, the fragment, `utm_*` query
/// parameters, duplicate or trailing slashes and query parameter order.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_sweep::url::dedup_key;
///
/// let a = Url::parse("http://www.example.com/page/?utm_source=news").unwrap();
/// let b = Url::parse("https://example.com/page").unwrap();
/// assert_eq!(dedup_key(&a), dedup_key(&b));
/// ```
pub fn dedup_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let mut key = String::with_capacity(url.as_str().len());
    key.push_str(host);
    if let Some(port) = url.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push_str(&normalize_path(url.path()));

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if !params.is_empty() {
        params.sort();
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        key.push('?');
        key.push_str(&query);
    }

    key
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    format!("/{}", segments.join("/"))
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_")
}
