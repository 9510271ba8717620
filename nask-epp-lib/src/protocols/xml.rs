//! Minimal XML element tree used for both outbound frames and decoded responses.
//!
//! Frames are assembled as `Element` trees and written with quick-xml; responses
//! are read back into the same tree shape so the interpreter can walk them.

use crate::error::RegistryError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;

/// One XML element: qualified name, attributes, text and child elements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Qualified name as written on the wire (e.g. `domain:name`)
    pub name: String,
    pub attributes: Vec<(String, String)>,
    /// Concatenated text content directly inside this element
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: add an attribute.
    pub fn attr<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Builder: set text content.
    pub fn text<T: Into<String>>(mut self, text: T) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: append a child element.
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: append a `<name>text</name>` child.
    pub fn leaf<N: Into<String>, T: Into<String>>(self, name: N, text: T) -> Self {
        self.child(Element::new(name).text(text))
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Attribute value by local name.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key || k.rsplit_once(':').map(|(_, l)| l) == Some(key))
            .map(|(_, v)| v.as_str())
    }

    /// First direct child with the given local name.
    pub fn find(&self, local: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    /// All direct children with the given local name.
    pub fn find_all<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.local_name() == local)
    }

    /// Follow a path of local names from this element.
    pub fn path(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |node, step| node.find(step))
    }

    /// Serialize this element as a complete UTF-8 document.
    pub fn to_document(&self) -> Result<String, RegistryError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
        self.write_into(&mut writer)?;
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| RegistryError::internal(format!("Non UTF-8 frame: {}", e)))
    }

    fn write_into(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<(), RegistryError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.text.is_empty() && self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }

    /// Parse a document and return its root element.
    pub fn parse(document: &str) -> Result<Element, RegistryError> {
        let mut reader = Reader::from_str(document);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&text.unescape()?);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current
                            .text
                            .push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| RegistryError::data("Unbalanced closing tag"))?;
                    attach(&mut stack, &mut root, element);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(RegistryError::data("Unexpected end of document"));
        }
        root.ok_or_else(|| RegistryError::data("Empty document"))
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, RegistryError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_escapes_text() {
        let doc = Element::new("contact:name")
            .text("Smith & Sons <Ltd>")
            .to_document()
            .unwrap();
        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>"));
        assert!(doc.contains("<contact:name>Smith &amp; Sons &lt;Ltd&gt;</contact:name>"));
    }

    #[test]
    fn test_empty_element_is_self_closing() {
        let doc = Element::new("logout").to_document().unwrap();
        assert!(doc.ends_with("<logout/>"));
    }

    #[test]
    fn test_parse_nested_with_prefixes() {
        let doc = r#"<?xml version="1.0"?>
<epp xmlns="urn:x"><response><result code="1000"><msg>OK</msg></result>
<resData><domain:chkData xmlns:domain="urn:d">
<domain:cd><domain:name avail="1">a.pl</domain:name></domain:cd>
</domain:chkData></resData></response></epp>"#;

        let root = Element::parse(doc).unwrap();
        assert_eq!(root.local_name(), "epp");
        let result = root.path(&["response", "result"]).unwrap();
        assert_eq!(result.attribute("code"), Some("1000"));
        assert_eq!(result.find("msg").unwrap().text, "OK");

        let name = root
            .path(&["response", "resData", "chkData", "cd", "name"])
            .unwrap();
        assert_eq!(name.name, "domain:name");
        assert_eq!(name.attribute("avail"), Some("1"));
        assert_eq!(name.text, "a.pl");
    }

    #[test]
    fn test_parse_rejects_truncated_document() {
        assert!(Element::parse("<epp><response>").is_err());
        assert!(Element::parse("").is_err());
    }

    #[test]
    fn test_written_document_parses_back() {
        let frame = Element::new("epp")
            .attr("xmlns", "urn:x")
            .child(Element::new("command").leaf("clID", "user"));
        let parsed = Element::parse(&frame.to_document().unwrap()).unwrap();
        assert_eq!(parsed.path(&["command", "clID"]).unwrap().text, "user");
        // namespace declarations are not kept as attributes
        assert!(parsed.attributes.is_empty());
    }
}
