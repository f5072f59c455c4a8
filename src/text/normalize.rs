//! Comment body normalization
//!
//! Bodies arrive either as plain text or as HTML fragments. Both end up as
//! multi-line plain text: paragraphs separated by one blank line, block
//! quotes rendered as `> ` prefixed lines, no trailing whitespace.

use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::LazyLock;

/// An opening or closing tag such as `<p>`, `</div>` or `<br/>`
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[a-zA-Z][a-zA-Z0-9-]*(\s[^<>]*)?/?>").expect("valid tag regex")
});

/// Elements rendered as one logical line each
const LINE_BLOCKS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "pre"];

/// Elements that start a new line when flattened to text
const BREAKING_ELEMENTS: &[&str] = &[
    "p", "div", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "tr",
];

/// Elements whose content is never comment text
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "button", "svg", "noscript", "template"];

/// Converts a raw comment body to clean plain text; never fails
///
/// # Examples
///
/// ```
/// use comment_gleaner::text::to_plain_text;
///
/// let text = to_plain_text("<p>First</p><blockquote><p>quoted</p></blockquote><p>Second</p>");
/// assert_eq!(text, "First\n\n> quoted\n\nSecond");
/// ```
pub fn to_plain_text(raw: &str) -> String {
    if !looks_like_markup(raw) {
        return tidy(raw);
    }

    let fragment = Html::parse_fragment(raw);
    let root = fragment.root_element();

    // Without paragraph-like elements the whole container is one text run,
    // with only block quotes split out.
    let paragraphs = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|el| LINE_BLOCKS.contains(&el.value().name()));

    let mut blocks = Vec::new();
    collect_blocks(root, paragraphs, &mut blocks);

    tidy(&blocks.join("\n\n"))
}

/// True when the input contains something shaped like an HTML tag
pub fn looks_like_markup(raw: &str) -> bool {
    TAG_PATTERN.is_match(raw)
}

/// Walks the child nodes of `element` in document order, rendering blocks
///
/// Text and inline content between blocks is gathered into runs, each run
/// becoming a block of its own.
fn collect_blocks(element: ElementRef<'_>, paragraphs: bool, blocks: &mut Vec<String>) {
    let mut run = String::new();

    for child in element.children() {
        let Some(child_el) = ElementRef::wrap(child) else {
            if let Node::Text(text) = child.value() {
                push_inline(&mut run, &**text);
            }
            continue;
        };

        let name = child_el.value().name();
        if SKIPPED_ELEMENTS.contains(&name) {
            continue;
        }
        if name == "br" {
            run.push('\n');
            continue;
        }

        if name == "blockquote" {
            flush_run(&mut run, blocks);
            push_block(blocks, quote_block(child_el));
        } else if paragraphs && LINE_BLOCKS.contains(&name) {
            flush_run(&mut run, blocks);
            push_block(
                blocks,
                clean_lines(&inline_text(child_el, name == "pre")).join("\n"),
            );
        } else if contains_block(child_el, paragraphs) {
            flush_run(&mut run, blocks);
            collect_blocks(child_el, paragraphs, blocks);
        } else {
            let breaking = BREAKING_ELEMENTS.contains(&name);
            if breaking {
                run.push('\n');
            }
            run.push_str(&inline_text(child_el, name == "pre"));
            if breaking {
                run.push('\n');
            }
        }
    }

    flush_run(&mut run, blocks);
}

/// True when a block quote, or a paragraph-like element, sits below `element`
fn contains_block(element: ElementRef<'_>, paragraphs: bool) -> bool {
    element.descendants().filter_map(ElementRef::wrap).any(|el| {
        let name = el.value().name();
        name == "blockquote" || (paragraphs && LINE_BLOCKS.contains(&name))
    })
}

fn flush_run(run: &mut String, blocks: &mut Vec<String>) {
    push_block(blocks, clean_lines(run).join("\n"));
    run.clear();
}

fn push_block(blocks: &mut Vec<String>, block: String) {
    if !block.is_empty() {
        blocks.push(block);
    }
}

/// Appends a text node, source newlines becoming plain whitespace
fn push_inline(out: &mut String, text: &str) {
    out.extend(
        text.chars()
            .map(|c| if c == '\n' || c == '\r' { ' ' } else { c }),
    );
}

/// Renders a block quote as `> ` prefixed lines
fn quote_block(element: ElementRef<'_>) -> String {
    clean_lines(&inline_text(element, false))
        .iter()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

enum Piece<'a> {
    Element(ElementRef<'a>),
    Text(&'a str),
    Break,
}

/// Concatenated text of an element with `<br>` and block boundaries as newlines
///
/// Source newlines are plain whitespace unless `preformatted` is set.
fn inline_text(element: ElementRef<'_>, preformatted: bool) -> String {
    let mut out = String::new();
    let mut stack: Vec<Piece<'_>> = children_pieces(element);

    while let Some(piece) = stack.pop() {
        match piece {
            Piece::Text(text) if preformatted => out.push_str(text),
            Piece::Text(text) => push_inline(&mut out, text),
            Piece::Break => out.push('\n'),
            Piece::Element(child) => {
                let name = child.value().name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                let breaking = BREAKING_ELEMENTS.contains(&name);
                if breaking {
                    out.push('\n');
                    stack.push(Piece::Break);
                }
                stack.extend(children_pieces(child));
            }
        }
    }

    out
}

/// Children of an element as pieces, reversed for stack consumption
fn children_pieces(element: ElementRef<'_>) -> Vec<Piece<'_>> {
    let mut pieces: Vec<Piece<'_>> = element
        .children()
        .filter_map(|child| {
            if let Some(el) = ElementRef::wrap(child) {
                return Some(Piece::Element(el));
            }
            match child.value() {
                Node::Text(text) => Some(Piece::Text(&**text)),
                _ => None,
            }
        })
        .collect();
    pieces.reverse();
    pieces
}

/// Collapses whitespace inside each line and drops empty lines
fn clean_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Strips trailing whitespace per line, collapses blank-line runs, trims
fn tidy(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_run = 0;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        lines.push(line);
    }

    lines.join("\n").trim().to_string()
}
