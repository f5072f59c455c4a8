use crate::UrlError;
use url::Url;

/// Extracts the post slug used by the id lookup endpoint
///
/// Post URLs look like `https://host/p/<slug>`; the segment following `p` is
/// preferred, otherwise the last non-empty path segment is used.
///
/// # Examples
///
/// ```
/// use comment_gleaner::url::post_slug;
///
/// assert_eq!(post_slug("https://example.substack.com/p/hello-world").unwrap(), "hello-world");
/// ```
pub fn post_slug(post_url: &str) -> Result<String, UrlError> {
    let url = Url::parse(post_url).map_err(|e| UrlError::Parse(e.to_string()))?;

    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let after_p = segments
        .iter()
        .position(|seg| *seg == "p")
        .and_then(|i| segments.get(i + 1));

    after_p
        .or_else(|| segments.last())
        .map(|seg| seg.to_string())
        .ok_or_else(|| UrlError::MissingSlug(post_url.to_string()))
}
