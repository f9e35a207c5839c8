//! Plain-text notes
//!
//! Flattens the XHTML content of a `<notes>` element into wrapped lines of
//! plain text.

use crate::sbml::xml::{XmlElement, XmlNode};

/// Elements that start a new line.
const BLOCK_ELEMENTS: [&str; 14] = [
    "body", "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr",
];

/// Extracts the text of a `<notes>` element, wrapping lines at `width`.
///
/// Returns `None` if the notes contain no text.
pub fn notes_to_text(notes: &XmlElement, width: usize) -> Option<String> {
    let mut lines = vec![String::new()];
    collect(notes, &mut lines);

    let text = lines
        .iter()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .flat_map(|line| wrap(&line, width))
        .collect::<Vec<_>>()
        .join("\n");

    (!text.is_empty()).then_some(text)
}

fn collect(element: &XmlElement, lines: &mut Vec<String>) {
    let block = BLOCK_ELEMENTS.contains(&element.name.as_str());
    if block {
        lines.push(String::new());
    }

    for child in &element.children {
        match child {
            XmlNode::Text(text) => {
                if let Some(line) = lines.last_mut() {
                    line.push_str(text);
                }
            }
            XmlNode::Element(child) => collect(child, lines),
        }
    }

    if block {
        lines.push(String::new());
    }
}

/// Greedy word wrap. Words longer than `width` get a line of their own.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut wrapped = Vec::new();
    let mut current = String::new();

    for word in line.split(' ') {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            wrapped.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        wrapped.push(current);
    }
    wrapped
}
