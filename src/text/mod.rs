//! Text handling for comment bodies

mod normalize;

pub use normalize::{looks_like_markup, to_plain_text};

/// First `n` characters of a string, respecting char boundaries
pub fn prefix_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
