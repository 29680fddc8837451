//! Minimal DOM query capability used by the decoders.
//!
//! Decoding only needs three things from a parsed page: sub-fragments
//! matching a CSS selector, the text of a fragment, and an attribute value.
//! [`Fragment`] captures exactly that so the decoders do not depend on the
//! HTML parser; [`Document`] and [`Node`] implement it on top of `scraper`.

use dashmap::DashMap;
use html_scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::warn;

/// A queryable piece of a parsed page.
pub trait Fragment: Sized {
    /// All descendants matching `selector`, in document order.
    fn select(&self, selector: &str) -> Vec<Self>;

    /// Text content with runs of whitespace collapsed, or `None` if blank.
    fn text(&self) -> Option<String>;

    /// Value of attribute `name` on this fragment's root element.
    fn attr(&self, name: &str) -> Option<String>;

    /// First descendant matching `selector`.
    fn select_first(&self, selector: &str) -> Option<Self> {
        self.select(selector).into_iter().next()
    }
}

/// Compiled selectors, keyed by their source text. The decoders use a small
/// fixed set, so this stays tiny.
static SELECTORS: LazyLock<DashMap<String, Option<Selector>>> = LazyLock::new(DashMap::new);

fn with_selector<R>(css: &str, f: impl FnOnce(&Selector) -> R) -> Option<R> {
    if !SELECTORS.contains_key(css) {
        let compiled = match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!(selector = css, error = %e, "Invalid CSS selector");
                None
            }
        };
        SELECTORS.insert(css.to_owned(), compiled);
    }

    let entry = SELECTORS.get(css)?;
    entry.as_ref().map(f)
}

/// A parsed HTML page.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// The document's root element, from which all queries start.
    pub fn root(&self) -> Node<'_> {
        Node(self.html.root_element())
    }
}

/// An element within a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a>(ElementRef<'a>);

impl<'a> Fragment for Node<'a> {
    fn select(&self, selector: &str) -> Vec<Self> {
        let element = self.0;
        with_selector(selector, |compiled| element.select(compiled).map(Node).collect())
            .unwrap_or_default()
    }

    fn text(&self) -> Option<String> {
        let text = self
            .0
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        (!text.is_empty()).then_some(text)
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.0.attr(name).map(str::to_owned)
    }
}
