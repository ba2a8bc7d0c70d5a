//! Parsed XML document and element serialization.
//!
//! The document is kept as the flat, owned event stream produced by
//! [`quick_xml`]. Parsing checks well-formedness (one root, balanced and
//! matching tags, valid attributes and entity references); element lookup
//! walks the stream by depth.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

/// Why a document could not be parsed or serialized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DocumentError(String);

impl DocumentError {
    fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }

    pub fn reason(&self) -> &str {
        &self.0
    }
}

impl From<std::string::FromUtf8Error> for DocumentError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self(format!("invalid UTF-8: {e}"))
    }
}

/// A well-formed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    events: Vec<Event<'static>>,
}

impl Document {
    /// Parse `xml`, rejecting anything that is not a single well-formed root.
    pub fn parse(xml: &str) -> Result<Self, DocumentError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut events = Vec::new();
        let mut depth = 0usize;
        let mut seen_root = false;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| DocumentError::new(format!("at byte {}: {e}", reader.error_position())))?;

            match &event {
                Event::Eof => break,
                Event::Start(start) | Event::Empty(start) => {
                    if depth == 0 && seen_root {
                        return Err(DocumentError::new("content after the root element"));
                    }
                    check_attributes(start)?;
                    seen_root = true;
                    if matches!(event, Event::Start(_)) {
                        depth += 1;
                    }
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                Event::Text(text) => {
                    if depth == 0 {
                        if !text.iter().all(u8::is_ascii_whitespace) {
                            return Err(DocumentError::new("text outside the root element"));
                        }
                    } else {
                        text.unescape().map_err(|e| DocumentError::new(e.to_string()))?;
                    }
                }
                Event::CData(_) if depth == 0 => {
                    return Err(DocumentError::new("CDATA outside the root element"));
                }
                Event::Decl(_) => {
                    return Err(DocumentError::new("misplaced XML declaration"));
                }
                _ => {}
            }

            events.push(event.into_owned());
        }

        if depth != 0 {
            return Err(DocumentError::new(format!("{depth} unclosed element(s) at end of input")));
        }
        if !seen_root {
            return Err(DocumentError::new("no root element"));
        }

        Ok(Self { events })
    }

    /// The first direct child of the root element named `name`.
    pub fn first_child(&self, name: &str) -> Option<Element<'_>> {
        let mut depth = 0usize;
        for (i, event) in self.events.iter().enumerate() {
            match event {
                Event::Start(start) => {
                    if depth == 1 && start.name().as_ref() == name.as_bytes() {
                        return Some(Element {
                            events: &self.events[i..i + self.element_len(i)],
                        });
                    }
                    depth += 1;
                }
                Event::Empty(start) if depth == 1 && start.name().as_ref() == name.as_bytes() => {
                    return Some(Element {
                        events: &self.events[i..=i],
                    });
                }
                Event::End(_) => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        None
    }

    /// Number of events from the `Start` at `start` through its matching `End`.
    fn element_len(&self, start: usize) -> usize {
        let mut depth = 0usize;
        for (offset, event) in self.events[start..].iter().enumerate() {
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    depth -= 1;
                    if depth == 0 {
                        return offset + 1;
                    }
                }
                _ => {}
            }
        }
        // parse() guarantees balance
        self.events.len() - start
    }
}

/// A borrowed element within a [`Document`].
#[derive(Debug, Clone, Copy)]
pub struct Element<'a> {
    events: &'a [Event<'static>],
}

impl Element<'_> {
    /// Serialize the element to UTF-8 XML.
    ///
    /// Start tags are rebuilt so attribute values are always double-quoted and
    /// escaped the same way; text, comments and CDATA are written as read.
    pub fn to_xml(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new(Vec::new());
        for event in self.events {
            let out = match event {
                Event::Start(start) => Event::Start(canonical_start(start)?),
                Event::Empty(start) => Event::Empty(canonical_start(start)?),
                other => other.borrow(),
            };
            writer
                .write_event(out)
                .map_err(|e| DocumentError::new(e.to_string()))?;
        }
        String::from_utf8(writer.into_inner()).map_err(|e| DocumentError::new(e.to_string()))
    }
}

fn check_attributes(start: &BytesStart<'_>) -> Result<(), DocumentError> {
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DocumentError::new(e.to_string()))?;
        attr.unescape_value()
            .map_err(|e| DocumentError::new(e.to_string()))?;
    }
    Ok(())
}

fn canonical_start(start: &BytesStart<'_>) -> Result<BytesStart<'static>, DocumentError> {
    let name = utf8(start.name().as_ref())?.to_owned();
    let mut out = BytesStart::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| DocumentError::new(e.to_string()))?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr
            .unescape_value()
            .map_err(|e| DocumentError::new(e.to_string()))?;
        out.push_attribute((key, value.as_ref()));
    }
    Ok(out)
}

fn utf8(bytes: &[u8]) -> Result<&str, DocumentError> {
    std::str::from_utf8(bytes).map_err(|e| DocumentError::new(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_xml(xml: &str) -> Option<String> {
        Document::parse(xml)
            .unwrap()
            .first_child("event")
            .map(|e| e.to_xml().unwrap())
    }

    #[test]
    fn extracts_first_event_child() {
        let xml = r#"<multiEvent><event uid="a">1</event><event uid="b">2</event></multiEvent>"#;
        assert_eq!(event_xml(xml).unwrap(), r#"<event uid="a">1</event>"#);
    }

    #[test]
    fn nested_markup_is_preserved() {
        let xml = r#"<multiEvent><event version="2.0"><point lat="1.0" lon="2.0"/><detail><contact callsign="A&amp;B"/></detail></event></multiEvent>"#;
        assert_eq!(
            event_xml(xml).unwrap(),
            r#"<event version="2.0"><point lat="1.0" lon="2.0"/><detail><contact callsign="A&amp;B"/></detail></event>"#
        );
    }

    #[test]
    fn single_quoted_attributes_are_normalized() {
        let xml = r#"<multiEvent><event how='m-g' note='say "hi"'>X</event></multiEvent>"#;
        assert_eq!(
            event_xml(xml).unwrap(),
            r#"<event how="m-g" note="say &quot;hi&quot;">X</event>"#
        );
    }

    #[test]
    fn empty_event_element() {
        let xml = "<multiEvent><event/></multiEvent>";
        assert_eq!(event_xml(xml).unwrap(), "<event/>");
    }

    #[test]
    fn only_direct_children_match() {
        let xml = "<multiEvent><wrapper><event>deep</event></wrapper></multiEvent>";
        assert!(event_xml(xml).is_none());
    }

    #[test]
    fn skips_other_siblings() {
        let xml = "<multiEvent><ping/><event>X</event></multiEvent>";
        assert_eq!(event_xml(xml).unwrap(), "<event>X</event>");
    }

    #[test]
    fn rejects_unclosed_elements() {
        let err = Document::parse("<multiEvent><event>X").unwrap_err();
        assert!(err.reason().contains("unclosed"));
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(Document::parse("<multiEvent><event>X</point></multiEvent>").is_err());
    }

    #[test]
    fn rejects_multiple_roots() {
        assert!(Document::parse("<a/><b/>").is_err());
    }

    #[test]
    fn rejects_text_outside_root() {
        assert!(Document::parse("TEST").is_err());
        assert!(Document::parse("<a/>trailing").is_err());
    }

    #[test]
    fn rejects_unknown_entities() {
        assert!(Document::parse("<multiEvent><event>&bogus;</event></multiEvent>").is_err());
    }

    #[test]
    fn rejects_embedded_declaration() {
        assert!(Document::parse(r#"<multiEvent><?xml version="1.0"?><event/></multiEvent>"#).is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(Document::parse("").is_err());
        assert!(Document::parse("   ").is_err());
    }
}
