//! Owned XML element tree built from a pull parser
//!
//! Submissions and form definitions are small documents navigated many
//! times, so the pull events are materialized into an owned tree once and
//! cached. Namespace prefixes are stripped: lookups use local names only,
//! which is how collection clients address submission elements.

use crate::domain::errors::SatchelError;
use crate::domain::result::Result;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

/// One element of a parsed XML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    /// Local element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Trimmed text content; `None` when empty or whitespace-only.
    pub fn value(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// First direct child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given local name, in document order.
    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First descendant (depth-first, document order) with the given local
    /// name, the element itself included.
    pub fn find_first(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_first(name))
    }

    /// Descends along a path of local names, taking the first match at
    /// every level.
    pub fn navigate(&self, path: &[&str]) -> Option<&XmlElement> {
        let mut cursor = self;
        for segment in path {
            cursor = cursor.child(segment)?;
        }
        Some(cursor)
    }
}

/// Parses a file into an element tree.
pub fn parse_file(path: &Path) -> Result<XmlElement> {
    let file = File::open(path).map_err(|e| SatchelError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_reader(BufReader::new(file)).map_err(|reason| SatchelError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Parses an in-memory document, mainly for tests and fixtures.
pub fn parse_str(content: &str) -> Result<XmlElement> {
    parse_reader(content.as_bytes()).map_err(|reason| SatchelError::Parse {
        path: "<memory>".into(),
        reason,
    })
}

fn local_name(raw: &[u8]) -> String {
    let start = raw
        .iter()
        .rposition(|b| *b == b':')
        .map(|i| i + 1)
        .unwrap_or(0);
    String::from_utf8_lossy(&raw[start..]).into_owned()
}

fn parse_reader(input: impl BufRead) -> std::result::Result<XmlElement, String> {
    let mut reader = Reader::from_reader(input);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                let mut element = XmlElement {
                    name: local_name(start.name().as_ref()),
                    ..XmlElement::default()
                };
                for attr in start.attributes().filter_map(|a| a.ok()) {
                    let key = local_name(attr.key.as_ref());
                    let value = attr
                        .unescape_value()
                        .map_err(|e| e.to_string())?
                        .into_owned();
                    element.attributes.push((key, value));
                }
                stack.push(element);
            }
            Ok(Event::Empty(start)) => {
                let mut element = XmlElement {
                    name: local_name(start.name().as_ref()),
                    ..XmlElement::default()
                };
                for attr in start.attributes().filter_map(|a| a.ok()) {
                    let key = local_name(attr.key.as_ref());
                    let value = attr
                        .unescape_value()
                        .map_err(|e| e.to_string())?
                        .into_owned();
                    element.attributes.push((key, value));
                }
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(text)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(top) = stack.last_mut() {
                    top.text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| "unbalanced closing tag".to_string())?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(e.to_string()),
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err("unexpected end of document".to_string());
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> std::result::Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err("multiple root elements".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_document() {
        let root = parse_str(r#"<data id="f1"><name>Ada</name><age>36</age></data>"#).unwrap();
        assert_eq!(root.name(), "data");
        assert_eq!(root.attribute("id"), Some("f1"));
        assert_eq!(root.child("name").unwrap().value(), Some("Ada"));
        assert_eq!(root.child("age").unwrap().value(), Some("36"));
    }

    #[test]
    fn test_namespace_prefixes_are_stripped() {
        let root = parse_str(
            r#"<data xmlns:orx="http://openrosa.org/xforms">
                 <orx:meta><orx:instanceID>uuid:1</orx:instanceID></orx:meta>
               </data>"#,
        )
        .unwrap();
        let id = root.find_first("instanceID").unwrap();
        assert_eq!(id.value(), Some("uuid:1"));
    }

    #[test]
    fn test_repeated_children_keep_document_order() {
        let root = parse_str("<data><g><x>1</x></g><g><x>2</x></g></data>").unwrap();
        let values: Vec<_> = root
            .children_named("g")
            .map(|g| g.child("x").unwrap().value().unwrap())
            .collect();
        assert_eq!(values, vec!["1", "2"]);
    }

    #[test]
    fn test_value_trims_surrounding_whitespace_only() {
        let root = parse_str("<data><note>\n  line1\nline2  \n</note><blank>  </blank></data>")
            .unwrap();
        assert_eq!(root.child("note").unwrap().value(), Some("line1\nline2"));
        assert_eq!(root.child("blank").unwrap().value(), None);
    }

    #[test]
    fn test_entities_are_unescaped() {
        let root = parse_str(r#"<data><q>a &amp; b &lt;c&gt;</q></data>"#).unwrap();
        assert_eq!(root.child("q").unwrap().value(), Some("a & b <c>"));
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(parse_str("<data><open></data>").is_err());
        assert!(parse_str("").is_err());
    }

    #[test]
    fn test_navigate_path() {
        let root = parse_str("<data><a><b><c>deep</c></b></a></data>").unwrap();
        assert_eq!(root.navigate(&["a", "b", "c"]).unwrap().value(), Some("deep"));
        assert!(root.navigate(&["a", "missing"]).is_none());
    }
}
