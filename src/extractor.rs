use std::fmt;

use scraper::{Html, Selector};

use crate::error::{Error, Result};

/// The human-readable fields pulled out of a store page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreInfo {
    pub title: String,
    pub description: String,
}

impl StoreInfo {
    /// Parse permissively: missing or malformed elements become empty fields.
    pub fn from_html(html: &str) -> Result<Self> {
        let doc = Html::parse_document(html);
        let title_selector = selector("title")?;
        let description_selector = selector(r#"meta[name="description"]"#)?;

        let title = doc
            .select(&title_selector)
            .next()
            .map(|e| e.text().collect::<String>())
            .unwrap_or_default();

        let description = doc
            .select(&description_selector)
            .next()
            .and_then(|e| e.value().attr("content"))
            .unwrap_or_default()
            .to_string();

        Ok(StoreInfo { title, description })
    }
}

/// Renders the two-line extraction text sent to the chat service and stored verbatim.
impl fmt::Display for StoreInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Title: {}\nDescription: {}", self.title, self.description)
    }
}

pub fn extract_relevant_info(html: &str) -> Result<String> {
    Ok(StoreInfo::from_html(html)?.to_string())
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("invalid selector '{}': {}", css, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_description() {
        let html = r#"<html><head><title>Acme</title><meta name="description" content="Cool store"></head></html>"#;
        assert_eq!(
            extract_relevant_info(html).unwrap(),
            "Title: Acme\nDescription: Cool store"
        );
    }

    #[test]
    fn missing_title_yields_empty_first_line() {
        let html = r#"<html><head><meta name="description" content="Only a description"></head></html>"#;
        let text = extract_relevant_info(html).unwrap();
        assert!(text.starts_with("Title: \n"));
        assert_eq!(text, "Title: \nDescription: Only a description");
    }

    #[test]
    fn missing_description_or_content_is_empty() {
        assert_eq!(
            extract_relevant_info("<title>Shop</title>").unwrap(),
            "Title: Shop\nDescription: "
        );
        assert_eq!(
            extract_relevant_info(r#"<title>Shop</title><meta name="description">"#).unwrap(),
            "Title: Shop\nDescription: "
        );
    }

    #[test]
    fn first_title_wins_and_other_meta_tags_are_ignored() {
        let html = r#"
            <head>
              <title>First</title>
              <meta name="keywords" content="shoes, bags">
              <meta property="og:description" content="Open Graph">
              <meta name="description" content="Real description">
            </head>
            <body><svg><title>Icon</title></svg></body>"#;
        let info = StoreInfo::from_html(html).unwrap();
        assert_eq!(info.title, "First");
        assert_eq!(info.description, "Real description");
    }

    #[test]
    fn malformed_markup_degrades_gracefully() {
        let info = StoreInfo::from_html("<html><head><title>Broken <b>store</head").unwrap();
        assert!(info.title.starts_with("Broken"));
        assert_eq!(info.description, "");

        assert_eq!(StoreInfo::from_html("").unwrap(), StoreInfo::default());
        assert_eq!(
            extract_relevant_info("not html at all").unwrap(),
            "Title: \nDescription: "
        );
    }
}
