use crate::UrlError;
use url::Url;

/// Query parameters the newsletter platform appends for share tracking
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
    "ref",
    "r",
    "s",
    "triedRedirect",
    "publication_id",
    "post_id",
    "isFreemail",
];

/// Canonicalises a post URL so the same post always maps to the same string
///
/// # Normalization Steps
///
/// 1. Resolve against `base` when `raw` is relative; reject if malformed
/// 2. Reject non-HTTP(S) schemes
/// 3. Lowercase the host (the scheme is left alone so local mocks keep working)
/// 4. Normalize path: remove dot segments, empty segments and the trailing slash
/// 5. Remove fragment
/// 6. Remove tracking query parameters, sort the rest, drop an empty query
///
/// # Examples
///
/// ```
/// use comment_gleaner::url::canonical_post_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.substack.com").unwrap();
/// let url = canonical_post_url("/p/hello-world/?utm_source=x#comments", &base).unwrap();
/// assert_eq!(url, "https://example.substack.com/p/hello-world");
/// ```
pub fn canonical_post_url(raw: &str, base: &Url) -> Result<String, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let mut url = base
        .join(raw)
        .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;

    let path = normalize_path(url.path());
    url.set_path(&path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query));
        }
    }

    let mut out = url.to_string();
    // Url always renders a bare host with a root slash
    if path == "/" && url.query().is_none() && out.ends_with('/') {
        out.pop();
    }
    Ok(out)
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

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
