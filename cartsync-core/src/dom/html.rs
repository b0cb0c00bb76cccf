//! Glue between the document and `scraper`.
//!
//! Element and text values, attribute edits and selector parsing. The tree
//! itself is `scraper::Html`; markup fragments are parsed by it and grafted
//! into the document.

use html5ever::tendril::StrTendril as ParseTendril;
use html5ever::{ns, Attribute, LocalName, QualName};
use scraper::node::{Element, Text};
use scraper::{Node, Selector, StrTendril};

use crate::error::SelectorError;

/// Parse a CSS selector, keeping the failing source in the error.
pub fn parse_selector(source: &str) -> Result<Selector, SelectorError> {
    Selector::parse(source).map_err(|err| SelectorError {
        selector: source.to_string(),
        reason: err.to_string(),
    })
}

/// A detached HTML element value with no attributes.
pub(super) fn element(tag: &str) -> Node {
    let name = QualName::new(None, ns!(html), LocalName::from(&*tag.to_ascii_lowercase()));
    Node::Element(Element::new(name, Vec::new()))
}

pub(super) fn text(text: &str) -> Node {
    Node::Text(Text {
        text: StrTendril::from_slice(text),
    })
}

/// `element` with `name` set to `value`, or removed when `value` is `None`.
///
/// The element is rebuilt rather than edited in place: `scraper` caches the
/// id and class list on first use.
pub(super) fn with_attr(element: &Element, name: &str, value: Option<&str>) -> Element {
    let name = name.to_ascii_lowercase();
    let mut attrs: Vec<Attribute> = Vec::with_capacity(element.attrs.len() + 1);
    let mut replaced = false;
    for (key, existing) in element.attrs() {
        if key == name {
            replaced = true;
            if let Some(value) = value {
                attrs.push(attribute(key, value));
            }
        } else {
            attrs.push(attribute(key, existing));
        }
    }
    if let (false, Some(value)) = (replaced, value) {
        attrs.push(attribute(&name, value));
    }
    Element::new(element.name.clone(), attrs)
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: ParseTendril::from_slice(value),
    }
}
