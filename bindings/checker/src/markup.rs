//! Selection helpers over the pages rendered by the target.
//!
//! Selectors are plain CSS. A selector that does not parse matches nothing.

use scraper::{ElementRef, Html, Selector};

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::debug!("Invalid selector {selector:?}: {e}");
            None
        }
    }
}

#[derive(Debug)]
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: impl AsRef<str>) -> Self {
        Self {
            html: Html::parse_document(html.as_ref()),
        }
    }

    pub fn select(&self, selector: &str) -> Vec<Node<'_>> {
        match parse_selector(selector) {
            Some(selector) => self.html.select(&selector).map(Node).collect(),
            None => Vec::new(),
        }
    }

    pub fn exists(&self, selector: &str) -> bool {
        !self.select(selector).is_empty()
    }

    /// Combined text of every element matching `selector`, trimmed.
    pub fn text(&self, selector: &str) -> String {
        join_text(&self.select(selector))
    }
}

/// A matched element.
#[derive(Debug, Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Node<'a> {
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.0.value().attr(name)
    }

    /// Descendants matching `selector`.
    pub fn select(&self, selector: &str) -> Vec<Node<'a>> {
        match parse_selector(selector) {
            Some(selector) => self.0.select(&selector).map(Node).collect(),
            None => Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.0.text().collect()
    }

    /// Combined text of the descendants matching `selector`, trimmed.
    pub fn text_of(&self, selector: &str) -> String {
        join_text(&self.select(selector))
    }
}

fn join_text(nodes: &[Node<'_>]) -> String {
    nodes
        .iter()
        .map(Node::text)
        .collect::<String>()
        .trim()
        .to_string()
}
