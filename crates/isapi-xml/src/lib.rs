//! Parse ISAPI XML payloads with quick-xml and pull device identity fields out of them.

pub mod fields;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use thiserror::Error;
use tracing::trace;

pub use fields::{extract_device_info, DeviceInfoMap, KNOWN_FIELDS};

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("xml: {0}")]
    Xml(String),
    #[error("invalid document: {0}")]
    Invalid(String),
}

/// Element of a parsed document.
///
/// Namespaced tags are kept in Clark notation (`{uri}local`), so two documents
/// using different prefixes for the same namespace produce identical trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    tag: String,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.text = if text.is_empty() { None } else { Some(text) };
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Character data preceding the first child element, untrimmed.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Tag with any `{uri}` prefix removed.
    pub fn local_name(&self) -> &str {
        split_namespace(&self.tag).1
    }

    /// The `{uri}` part of the tag, or an empty string for un-namespaced elements.
    pub fn namespace_prefix(&self) -> &str {
        split_namespace(&self.tag).0
    }

    /// Every element below this one in document order. The element itself is not included.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// First descendant whose full tag equals `tag`.
    pub fn find_descendant(&self, tag: &str) -> Option<&XmlElement> {
        self.descendants().find(|el| el.tag == tag)
    }
}

/// Pre-order iterator returned by [`XmlElement::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Split a Clark-notation tag into `({uri}, local)`.
pub fn split_namespace(tag: &str) -> (&str, &str) {
    match tag.rfind('}') {
        Some(idx) => (&tag[..=idx], &tag[idx + 1..]),
        None => ("", tag),
    }
}

/// Parse a complete document and return its root element.
pub fn parse(xml: &[u8]) -> Result<XmlElement, XmlError> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();
    let mut tree = TreeBuilder::default();

    loop {
        let position = reader.buffer_position();
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) => {
                let tag = clark_tag(ns, &e)?;
                tree.open(tag)?;
            }
            Ok((ns, Event::Empty(e))) => {
                let tag = clark_tag(ns, &e)?;
                tree.open(tag)?;
                tree.close()?;
            }
            Ok((_, Event::End(_))) => tree.close()?,
            Ok((_, Event::Text(t))) => {
                let text = t
                    .unescape()
                    .map_err(|err| XmlError::Xml(format!("{err} (at byte {position})")))?;
                tree.text(&text)?;
            }
            Ok((_, Event::CData(c))) => {
                let text = std::str::from_utf8(&c)
                    .map_err(|err| XmlError::Xml(format!("{err} (at byte {position})")))?;
                tree.text(text)?;
            }
            Ok((_, Event::Eof)) => break,
            Err(err) => return Err(XmlError::Xml(format!("{err} (at byte {position})"))),
            _ => {}
        }
        buf.clear();
    }

    tree.finish()
}

fn clark_tag(ns: ResolveResult<'_>, event: &BytesStart<'_>) -> Result<String, XmlError> {
    let name = event.name();
    let local = String::from_utf8_lossy(name.local_name().as_ref()).into_owned();
    match ns {
        ResolveResult::Bound(namespace) => Ok(format!(
            "{{{}}}{local}",
            String::from_utf8_lossy(namespace.as_ref())
        )),
        ResolveResult::Unbound => Ok(local),
        ResolveResult::Unknown(prefix) => Err(XmlError::Xml(format!(
            "unbound prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

#[derive(Debug)]
struct Frame {
    tag: String,
    text: String,
    seen_child: bool,
    children: Vec<XmlElement>,
}

#[derive(Debug, Default)]
struct TreeBuilder {
    open: Vec<Frame>,
    root: Option<XmlElement>,
}

impl TreeBuilder {
    fn open(&mut self, tag: String) -> Result<(), XmlError> {
        if self.open.is_empty() && self.root.is_some() {
            return Err(XmlError::Invalid(format!(
                "junk after document element: <{tag}>"
            )));
        }
        if let Some(parent) = self.open.last_mut() {
            parent.seen_child = true;
        }
        trace!(%tag, depth = self.open.len(), "open element");
        self.open.push(Frame {
            tag,
            text: String::new(),
            seen_child: false,
            children: Vec::new(),
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), XmlError> {
        let frame = self
            .open
            .pop()
            .ok_or_else(|| XmlError::Invalid("closing tag without matching start".into()))?;
        let element = XmlElement {
            tag: frame.tag,
            text: if frame.text.is_empty() {
                None
            } else {
                Some(frame.text)
            },
            children: frame.children,
        };
        match self.open.last_mut() {
            Some(parent) => parent.children.push(element),
            None => self.root = Some(element),
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<(), XmlError> {
        match self.open.last_mut() {
            // Text following a child belongs to that child's tail; it is not kept.
            Some(frame) if !frame.seen_child => frame.text.push_str(text),
            Some(_) => {}
            None if text.trim().is_empty() => {}
            None => {
                return Err(XmlError::Invalid(
                    "text content outside the document element".into(),
                ))
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<XmlElement, XmlError> {
        if let Some(frame) = self.open.last() {
            return Err(XmlError::Invalid(format!(
                "unclosed element <{}> at end of input",
                frame.tag
            )));
        }
        self.root
            .ok_or_else(|| XmlError::Invalid("no element found".into()))
    }
}
