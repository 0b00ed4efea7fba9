// src/extract.rs
//! Post body extraction: headings and paragraphs of the `<main>` region.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::fetch::{FetchError, FetchedPage};

pub const CONTENT_NOT_FOUND: &str = "Content not found";

static MAIN_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("main").expect("main selector"));
static TEXT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, p").expect("text block selector"));

/// Text of every h1/h2/h3/p under the first `<main>`, one element per line.
/// Each element's text nodes are trimmed and glued without separator.
/// `None` when the page has no `<main>`.
pub fn extract_content(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let main = doc.select(&MAIN_SEL).next()?;
    let blocks: Vec<String> = main
        .select(&TEXT_SEL)
        .map(|el| el.text().map(str::trim).collect::<String>())
        .collect();
    Some(blocks.join("\n"))
}

/// Turn a post fetch outcome into report content. Never fails: misses and
/// fetch problems become placeholder text.
pub fn content_for(outcome: &Result<FetchedPage, FetchError>) -> String {
    match outcome {
        Ok(page) if page.is_success() => {
            extract_content(&page.body).unwrap_or_else(|| CONTENT_NOT_FOUND.to_string())
        }
        Ok(page) => fetch_error_placeholder(page.status),
        Err(e) => format!("Error: Unable to fetch content ({e})"),
    }
}

pub fn fetch_error_placeholder(status: u16) -> String {
    format!("Error: Unable to fetch content (status code: {status})")
}
