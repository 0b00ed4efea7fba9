// src/listing.rs
//! Post listing parser for Bear Blog style index pages.
//!
//! The listing lives in `<ul class="blog-posts">`; every `<li>` carries an
//! anchor (title + href) and optionally a `<span>` with the publish date.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const NO_DATE: &str = "No date provided";

static LIST_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul.blog-posts").expect("listing selector"));
static ITEM_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("li").expect("item selector"));
static LINK_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("link selector"));
static DATE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("span").expect("date selector"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDescriptor {
    pub title: String,
    /// As found in the markup; may be relative.
    pub link: String,
    pub date: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("could not find blog posts section")]
    MissingContainer,
}

/// Parse the listing page into descriptors, in document order.
pub fn parse_listing(html: &str) -> Result<Vec<PostDescriptor>, ListingError> {
    let doc = Html::parse_document(html);
    let list = doc
        .select(&LIST_SEL)
        .next()
        .ok_or(ListingError::MissingContainer)?;

    let mut out = Vec::new();
    for li in list.select(&ITEM_SEL) {
        match descriptor_from_item(li) {
            Some(d) => out.push(d),
            None => tracing::debug!(target: "listing", "skipping list item without link"),
        }
    }
    Ok(out)
}

fn descriptor_from_item(li: ElementRef<'_>) -> Option<PostDescriptor> {
    let anchor = li.select(&LINK_SEL).next()?;
    let link = anchor.value().attr("href")?.trim().to_string();
    let title = element_text(anchor);
    let date = li
        .select(&DATE_SEL)
        .next()
        .map(element_text)
        .unwrap_or_else(|| NO_DATE.to_string());
    Some(PostDescriptor { title, link, date })
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body><main>
        <ul class="embedded blog-posts">
            <li>
                <span><i><time datetime="2024-03-01">01 Mar, 2024</time></i></span>
                <a href="/first-post/">First post</a>
            </li>
            <li><a href="https://other.example/second/"> Second </a></li>
            <li>no link here</li>
        </ul>
        </main></body></html>"#;

    #[test]
    fn parses_items_in_order_with_default_date() {
        let posts = parse_listing(LISTING).unwrap();
        assert_eq!(
            posts,
            vec![
                PostDescriptor {
                    title: "First post".into(),
                    link: "/first-post/".into(),
                    date: "01 Mar, 2024".into(),
                },
                PostDescriptor {
                    title: "Second".into(),
                    link: "https://other.example/second/".into(),
                    date: NO_DATE.into(),
                },
            ]
        );
    }

    #[test]
    fn missing_container_is_an_error() {
        let err = parse_listing("<html><body><ul><li><a href='/x'>x</a></li></ul></body></html>")
            .unwrap_err();
        assert_eq!(err, ListingError::MissingContainer);
    }

    #[test]
    fn empty_container_yields_no_posts() {
        let posts = parse_listing(r#"<ul class="blog-posts"></ul>"#).unwrap();
        assert!(posts.is_empty());
    }
}
