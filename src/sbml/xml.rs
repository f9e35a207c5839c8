//! Owned XML tree
//!
//! SBML documents are small enough to be read into memory as a whole. This
//! module turns the `quick_xml` event stream into a tree of [`XmlElement`]s with
//! resolved namespaces, and writes such trees back out.

use std::{collections::HashMap, io::Write};

use quick_xml::{
    escape::{resolve_predefined_entity, unescape},
    events::{BytesEnd, BytesStart, BytesText, Event},
    Reader, Writer,
};
use serde::{Deserialize, Serialize};

use crate::sbml::error::SBMLError;

/// A node in the element tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An XML element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlElement {
    /// Local name, without prefix.
    pub name: String,
    pub prefix: Option<String>,
    /// The namespace URI the element resolves to.
    pub namespace: Option<String>,
    /// Attributes in document order, keyed by their qualified name.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: None,
            namespace: None,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> Result<XmlElement, SBMLError> {
        let mut reader = Reader::from_str(xml);
        let mut builder = TreeBuilder::default();

        loop {
            let event = reader.read_event().map_err(|err| {
                SBMLError::Xml(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    err
                ))
            })?;

            match event {
                Event::Start(start) => builder.open(&start)?,
                Event::Empty(start) => {
                    builder.open(&start)?;
                    builder.close()?;
                }
                Event::End(_) => builder.close()?,
                Event::Text(text) => {
                    let raw = std::str::from_utf8(&text)
                        .map_err(|err| SBMLError::Xml(err.to_string()))?;
                    let text = unescape(raw).map_err(|err| SBMLError::Xml(err.to_string()))?;
                    builder.text(&text);
                }
                Event::CData(data) => {
                    let text = std::str::from_utf8(&data)
                        .map_err(|err| SBMLError::Xml(err.to_string()))?;
                    builder.text(text);
                }
                Event::GeneralRef(reference) => {
                    let name = std::str::from_utf8(&reference)
                        .map_err(|err| SBMLError::Xml(err.to_string()))?;
                    builder.text(&resolve_reference(name)?);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        builder.finish()
    }

    /// Returns the value of the attribute with the given qualified name.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, key: &str) -> bool {
        self.attribute(key).is_some()
    }

    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        self.attributes.push((key.to_string(), value.into()));
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// The first child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.name == name)
    }

    /// The trimmed text directly inside this element.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect::<String>()
            .trim()
            .to_string()
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }

    /// A copy of this element that can stand on its own.
    ///
    /// A namespace declaration is added when the element's namespace was
    /// declared on an ancestor that is not part of the copy.
    pub fn detached(&self) -> XmlElement {
        let declaration = match &self.prefix {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };

        let mut element = self.clone();
        if let Some(namespace) = &self.namespace {
            if !self.has_attribute(&declaration) {
                element.attributes.insert(0, (declaration, namespace.clone()));
            }
        }
        element
    }

    /// Writes this element as the root of a fragment.
    pub fn write_fragment<W: Write>(&self, writer: &mut Writer<W>) -> std::io::Result<()> {
        self.detached().write(writer)
    }

    pub fn write<W: Write>(&self, writer: &mut Writer<W>) -> std::io::Result<()> {
        let name = self.qualified_name();
        let mut start = BytesStart::new(name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            return writer.write_event(Event::Empty(start));
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                XmlNode::Element(element) => element.write(writer)?,
                XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(name.as_str())))
    }
}

fn resolve_reference(name: &str) -> Result<String, SBMLError> {
    if let Some(code) = name.strip_prefix('#') {
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => code.parse::<u32>(),
        };
        return value
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| SBMLError::Xml(format!("invalid character reference &{};", name)));
    }

    resolve_predefined_entity(name)
        .map(String::from)
        .ok_or_else(|| SBMLError::Xml(format!("unknown entity &{};", name)))
}

/// Assembles elements from start, text and end events.
#[derive(Default)]
struct TreeBuilder {
    stack: Vec<XmlElement>,
    scopes: Vec<HashMap<String, String>>,
    root: Option<XmlElement>,
}

impl TreeBuilder {
    fn open(&mut self, start: &BytesStart) -> Result<(), SBMLError> {
        if self.root.is_some() {
            return Err(SBMLError::Xml(
                "content found after the root element".to_string(),
            ));
        }

        let qname = std::str::from_utf8(start.name().as_ref())
            .map_err(|err| SBMLError::Xml(err.to_string()))?
            .to_string();
        let (prefix, name) = match qname.split_once(':') {
            Some((prefix, name)) => (Some(prefix.to_string()), name.to_string()),
            None => (None, qname),
        };

        let mut attributes = Vec::new();
        let mut scope = HashMap::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|err| SBMLError::Xml(err.to_string()))?;
            let key = std::str::from_utf8(attribute.key.as_ref())
                .map_err(|err| SBMLError::Xml(err.to_string()))?
                .to_string();
            let value = attribute
                .unescape_value()
                .map_err(|err| SBMLError::Xml(err.to_string()))?
                .to_string();

            if key == "xmlns" {
                scope.insert(String::new(), value.clone());
            } else if let Some(declared) = key.strip_prefix("xmlns:") {
                scope.insert(declared.to_string(), value.clone());
            }
            attributes.push((key, value));
        }
        self.scopes.push(scope);

        let namespace = self.resolve_namespace(prefix.as_deref().unwrap_or(""));
        if let (Some(prefix), None) = (&prefix, &namespace) {
            return Err(SBMLError::Xml(format!(
                "undeclared namespace prefix \"{}\"",
                prefix
            )));
        }

        self.stack.push(XmlElement {
            name,
            prefix,
            namespace,
            attributes,
            children: Vec::new(),
        });
        Ok(())
    }

    fn resolve_namespace(&self, prefix: &str) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(prefix))
            .filter(|uri| !uri.is_empty())
            .cloned()
    }

    fn text(&mut self, text: &str) {
        if let Some(current) = self.stack.last_mut() {
            match current.children.last_mut() {
                Some(XmlNode::Text(existing)) => existing.push_str(text),
                _ => current.children.push(XmlNode::Text(text.to_string())),
            }
        }
    }

    fn close(&mut self) -> Result<(), SBMLError> {
        let mut element = self
            .stack
            .pop()
            .ok_or_else(|| SBMLError::Xml("unexpected closing tag".to_string()))?;
        self.scopes.pop();

        // Whitespace between elements carries no meaning in SBML.
        element.children.retain(|child| match child {
            XmlNode::Text(text) => !text.trim().is_empty(),
            XmlNode::Element(_) => true,
        });

        match self.stack.last_mut() {
            Some(parent) => parent.children.push(XmlNode::Element(element)),
            None => self.root = Some(element),
        }
        Ok(())
    }

    fn finish(self) -> Result<XmlElement, SBMLError> {
        if let Some(open) = self.stack.last() {
            return Err(SBMLError::Xml(format!(
                "unexpected end of document, <{}> is not closed",
                open.qualified_name()
            )));
        }
        self.root
            .ok_or_else(|| SBMLError::Xml("document has no root element".to_string()))
    }
}
