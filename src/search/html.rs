//! HTML parsing for search result pages and fetched documents

use scraper::{ElementRef, Html, Selector};

use crate::models::hit::{RawHit, truncate_with_ellipsis};
use crate::search::BackendError;

/// Maximum number of characters kept from a fetched page body
pub const MAX_PAGE_CHARS: usize = 10_000;

const SUMMARY_CHARS: usize = 100;

/// Text and links pulled out of a fetched page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub url: String,
    pub title: String,
    pub description: String,
    pub text: String,
    pub links: Vec<String>,
}

fn selector(css: &str) -> Result<Selector, BackendError> {
    Selector::parse(css).map_err(|e| BackendError::Parse(format!("invalid CSS selector {css}: {e:?}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a Bing-style result page (`li.b_algo` items) into raw hits.
///
/// Items without an absolute http(s) link are skipped. Provider order is kept.
pub fn parse_result_page(
    html: &str,
    source: &str,
    max_results: usize,
) -> Result<Vec<RawHit>, BackendError> {
    let document = Html::parse_document(html);
    let item_selector = selector("li.b_algo")?;
    let link_selector = selector("h2 a")?;
    let snippet_selector = selector(".b_caption p")?;

    let mut hits = Vec::new();
    for item in document.select(&item_selector) {
        if hits.len() >= max_results {
            break;
        }

        let Some(link) = item.select(&link_selector).next() else {
            continue;
        };
        let url = link.value().attr("href").unwrap_or_default().trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            continue;
        }

        let title = element_text(link);
        let snippet = item
            .select(&snippet_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();

        hits.push(
            RawHit::new(&title, url, &snippet)
                .with_snippet(&snippet)
                .with_metadata("source", source)
                .with_metadata("summary", truncate_with_ellipsis(&snippet, SUMMARY_CHARS)),
        );
    }

    Ok(hits)
}

/// Extracts title, meta description, readable text and outbound links from a page.
pub fn extract_page(url: &str, html: &str) -> Result<PageContent, BackendError> {
    let document = Html::parse_document(html);
    let title_selector = selector("title")?;
    let description_selector = selector("meta[name=\"description\"]")?;
    let text_selector = selector("p, h1, h2, h3, h4, h5, h6")?;
    let link_selector = selector("a[href]")?;

    let title = document
        .select(&title_selector)
        .next()
        .map(element_text)
        .unwrap_or_default();
    let description = document
        .select(&description_selector)
        .next()
        .and_then(|m| m.value().attr("content"))
        .unwrap_or_default()
        .trim()
        .to_string();

    let text = document
        .select(&text_selector)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let text = if text.chars().count() > MAX_PAGE_CHARS {
        truncate_with_ellipsis(&text, MAX_PAGE_CHARS)
    } else {
        text
    };

    let base = url::Url::parse(url).ok();
    let mut links = Vec::new();
    for anchor in document.select(&link_selector) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let resolved = match &base {
            Some(base) => base.join(href).map(|u| u.to_string()).ok(),
            None => Some(href.to_string()),
        };
        if let Some(link) = resolved {
            if (link.starts_with("http://") || link.starts_with("https://"))
                && !links.contains(&link)
            {
                links.push(link);
            }
        }
    }

    Ok(PageContent {
        url: url.to_string(),
        title,
        description,
        text,
        links,
    })
}
