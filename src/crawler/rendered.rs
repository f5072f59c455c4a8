//! Rendered comments page fallback
//!
//! Best-effort and lossy: comment containers are located by class names and
//! attributes observed on the rendered page, reply nesting is not recovered
//! (every comment comes back as a root), and anything the selectors miss is
//! silently dropped. Only used when the JSON comment endpoint is unavailable.
//!
//! Each extracted comment is emitted as a small JSON record using the same
//! keys as the API, so it flows through the regular thread projection.

use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Map, Value};

const CONTAINER_SELECTOR: &str = ".comment, [data-comment-id]";
const AUTHOR_SELECTOR: &str =
    ".comment-author a, a.comment-author, .commenter-name a, a.commenter-name, a[href*='/@']";
const BODY_SELECTOR: &str = ".comment-body, .comment-content, .body";
const TIME_SELECTOR: &str = "time[datetime]";
const LIKE_SELECTOR: &str = ".like-count, .reaction-count, [data-like-count]";

/// Interface labels that leak into the rendered comment body
const CHROME_LABELS: &[&str] = &[
    "reply",
    "share",
    "like",
    "liked",
    "edit",
    "delete",
    "report",
    "collapse",
    "expand full comment",
    "hide",
];

/// Control-like elements that may carry a chrome label; paragraphs never do
const CHROME_ELEMENTS: &[&str] = &["a", "button", "span", "div"];

struct Selectors {
    container: Selector,
    author: Selector,
    body: Selector,
    time: Selector,
    like: Selector,
}

impl Selectors {
    fn build() -> Option<Self> {
        Some(Self {
            container: Selector::parse(CONTAINER_SELECTOR).ok()?,
            author: Selector::parse(AUTHOR_SELECTOR).ok()?,
            body: Selector::parse(BODY_SELECTOR).ok()?,
            time: Selector::parse(TIME_SELECTOR).ok()?,
            like: Selector::parse(LIKE_SELECTOR).ok()?,
        })
    }
}

/// Extracts comment records from a rendered comments page
///
/// # Example
///
/// ```
/// use comment_gleaner::crawler::parse_rendered_comments;
///
/// let html = r#"<div class="comment" data-comment-id="42">
///   <a class="comment-author" href="https://substack.com/@jane">Jane</a>
///   <div class="comment-body"><p>Hello</p></div>
/// </div>"#;
/// let comments = parse_rendered_comments(html);
/// assert_eq!(comments.len(), 1);
/// assert_eq!(comments[0]["id"], "42");
/// assert_eq!(comments[0]["handle"], "jane");
/// ```
pub fn parse_rendered_comments(html: &str) -> Vec<Value> {
    let Some(selectors) = Selectors::build() else {
        return Vec::new();
    };

    let document = Html::parse_document(html);

    document
        .select(&selectors.container)
        .filter_map(|container| extract_comment(container, &selectors))
        .collect()
}

fn extract_comment(container: ElementRef<'_>, selectors: &Selectors) -> Option<Value> {
    let body = container
        .select(&selectors.body)
        .next()
        .map(body_without_chrome)?;

    let mut record = Map::new();
    record.insert("body_html".to_string(), Value::String(body));

    if let Some(id) = comment_id(container) {
        record.insert("id".to_string(), Value::String(id));
    }

    if let Some(author) = container.select(&selectors.author).next() {
        let name = collapse_text(author);
        if !name.is_empty() {
            record.insert("name".to_string(), Value::String(name));
        }
        if let Some(handle) = author.value().attr("href").and_then(handle_from_href) {
            record.insert("handle".to_string(), Value::String(handle));
        }
    }

    if let Some(datetime) = container
        .select(&selectors.time)
        .next()
        .and_then(|time| time.value().attr("datetime"))
    {
        record.insert("date".to_string(), Value::String(datetime.to_string()));
    }

    if let Some(likes) = container.select(&selectors.like).next().and_then(like_count) {
        record.insert("reaction_count".to_string(), json!(likes));
    }

    Some(Value::Object(record))
}

/// Inner markup of a comment body with interface controls removed
fn body_without_chrome(body: ElementRef<'_>) -> String {
    let mut html = body.inner_html();

    for element in body.descendants().skip(1).filter_map(ElementRef::wrap) {
        if !CHROME_ELEMENTS.contains(&element.value().name()) {
            continue;
        }
        let label = collapse_text(element).to_lowercase();
        if CHROME_LABELS.contains(&label.as_str()) {
            html = html.replacen(&element.html(), "", 1);
        }
    }

    html
}

/// `data-comment-id`, else an `id` attribute such as `comment-123`
fn comment_id(container: ElementRef<'_>) -> Option<String> {
    let element = container.value();

    if let Some(id) = element.attr("data-comment-id").map(str::trim) {
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }

    element
        .attr("id")
        .and_then(|id| id.strip_prefix("comment-"))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Profile links look like `https://substack.com/@handle` or `/@handle`
fn handle_from_href(href: &str) -> Option<String> {
    let (_, rest) = href.split_once("/@")?;
    let handle: String = rest
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || *c == '.')
        .collect();
    (!handle.is_empty()).then_some(handle)
}

fn like_count(element: ElementRef<'_>) -> Option<u64> {
    if let Some(count) = element
        .value()
        .attr("data-like-count")
        .and_then(|v| v.trim().parse().ok())
    {
        return Some(count);
    }

    let digits: String = element
        .text()
        .collect::<String>()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

fn collapse_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
