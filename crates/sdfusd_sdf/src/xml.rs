//! A small XML element tree on top of quick-xml.
//!
//! SDF keeps most values in element text, so the reader builds a tree first
//! and the typed parser walks it.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{SdfError, SdfResult};

/// An XML element with its attributes, text and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed text content.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> SdfResult<XmlElement> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => stack.push(element_from_start(e)),
                Ok(Event::Empty(ref e)) => {
                    let element = element_from_start(e);
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| SdfError::XmlParse("unbalanced closing tag".into()))?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::Text(ref t)) => {
                    if let Some(top) = stack.last_mut() {
                        let text = t.unescape().map_err(|e| SdfError::XmlParse(e.to_string()))?;
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(ref t)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(t.as_ref()));
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(SdfError::XmlParse(e.to_string())),
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err(SdfError::XmlParse("unexpected EOF inside an element".into()));
        }
        root.ok_or_else(|| SdfError::XmlParse("document has no root element".into()))
    }

    /// Serialize as an indented document with an XML declaration.
    pub fn to_document_string(&self) -> SdfResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
            .map_err(|e| SdfError::XmlWrite(e.to_string()))?;
        write_element(&mut writer, self)?;
        let mut text =
            String::from_utf8(writer.into_inner()).map_err(|e| SdfError::XmlWrite(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }
}

fn element_from_start(start: &BytesStart) -> XmlElement {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        element.attributes.push((key, value));
    }
    element
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> SdfResult<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| SdfError::XmlWrite(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| SdfError::XmlWrite(e.to_string()))?;
    if !element.text.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&element.text)))
            .map_err(|e| SdfError::XmlWrite(e.to_string()))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|e| SdfError::XmlWrite(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let xml = r#"<?xml version="1.0"?>
<sdf version="1.9">
  <world name="shapes">
    <gravity>0 0 -9.8</gravity>
    <model name="box"/>
  </world>
</sdf>"#;
        let root = XmlElement::parse(xml).unwrap();
        assert_eq!(root.name, "sdf");
        assert_eq!(root.attr("version"), Some("1.9"));
        let world = root.child("world").unwrap();
        assert_eq!(world.attr("name"), Some("shapes"));
        assert_eq!(world.child("gravity").unwrap().text(), "0 0 -9.8");
        assert_eq!(world.children_named("model").count(), 1);
    }

    #[test]
    fn test_unescapes_text() {
        let root = XmlElement::parse("<a><b>x &amp; y</b></a>").unwrap();
        assert_eq!(root.child("b").unwrap().text(), "x & y");
    }

    #[test]
    fn test_malformed_is_error() {
        assert!(XmlElement::parse("<a><b></a>").is_err());
        assert!(XmlElement::parse("").is_err());
    }

    #[test]
    fn test_write_then_read() {
        let element = XmlElement::new("model")
            .with_attr("name", "box")
            .with_child(XmlElement::new("static").with_text("true"))
            .with_child(XmlElement::new("link").with_attr("name", "a <b>"));
        let text = element.to_document_string().unwrap();
        assert!(text.starts_with("<?xml"));
        assert_eq!(XmlElement::parse(&text).unwrap(), element);
    }
}
