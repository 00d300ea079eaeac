//! Event-driven XML walking.
//!
//! [`XmlDecoder`] reads a document with `quick-xml` and hands every element to
//! an [`ElementBuilder`] twice: once when the start tag is read and once when
//! the matching end tag is read. The builder sees the element through an
//! [`XmlElement`], which also knows the name of the enclosing element and,
//! at the end tag, the text the element contained directly.
//!
//! The decoder knows nothing about map data. Domain decoding lives in
//! [`crate::decode`].

use std::io::BufRead;
use std::str::{self, FromStr};

use chrono::{DateTime, Utc};
use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::errors::{DecodeCause, Error, Result};

/// Nesting deeper than this is treated as a malformed document.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Receives start and end events for every element of a document.
pub trait ElementBuilder {
    fn on_start_element(&mut self, element: &XmlElement<'_>) -> Result<()>;
    fn on_end_element(&mut self, element: &XmlElement<'_>) -> Result<()>;
}

/// The element currently being reported to an [`ElementBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct XmlElement<'a> {
    name: &'a str,
    parent: Option<&'a str>,
    attributes: &'a [(String, String)],
    text: Option<&'a str>,
    depth: usize,
    position: usize,
}

impl<'a> XmlElement<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Name of the enclosing element, `None` for the document root.
    pub fn parent_name(&self) -> Option<&'a str> {
        self.parent
    }

    /// Number of open ancestors.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Byte offset of the reader in the document.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Text directly inside this element, excluding text of child elements,
    /// exactly as it appeared after unescaping. Only available in
    /// [`ElementBuilder::on_end_element`], and `None` when the element held
    /// no text or only whitespace.
    pub fn text(&self) -> Option<&'a str> {
        self.text
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn attr_i64(&self, name: &str) -> Result<Option<i64>> {
        self.parse_attr(name, "an integer")
    }

    pub fn attr_i32(&self, name: &str) -> Result<Option<i32>> {
        self.parse_attr(name, "a 32-bit integer")
    }

    pub fn attr_f64(&self, name: &str) -> Result<Option<f64>> {
        self.parse_attr(name, "a decimal number")
    }

    /// Accepts exactly `true` and `false`.
    pub fn attr_bool(&self, name: &str) -> Result<Option<bool>> {
        match self.attribute(name) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(value) => Err(self.invalid(name, value, "true or false")),
        }
    }

    /// Reads an RFC 3339 timestamp such as `2024-03-01T12:00:00Z`.
    pub fn attr_datetime(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        match self.attribute(name) {
            None => Ok(None),
            Some(value) => DateTime::parse_from_rfc3339(value)
                .map(|date| Some(date.with_timezone(&Utc)))
                .map_err(|_| self.invalid(name, value, "an RFC 3339 timestamp")),
        }
    }

    /// Parses an attribute with `FromStr`. `expected` describes the accepted
    /// values in the error message.
    pub fn attr_parsed<T: FromStr>(&self, name: &str, expected: &'static str) -> Result<Option<T>> {
        self.parse_attr(name, expected)
    }

    /// Turns an absent attribute into a decoding error.
    pub fn required<T>(&self, name: &str, value: Option<T>) -> Result<T> {
        value.ok_or_else(|| self.missing(name))
    }

    pub fn required_str(&self, name: &str) -> Result<&'a str> {
        self.attribute(name).ok_or_else(|| self.missing(name))
    }

    pub fn required_i64(&self, name: &str) -> Result<i64> {
        self.attr_i64(name)?.ok_or_else(|| self.missing(name))
    }

    pub fn required_f64(&self, name: &str) -> Result<f64> {
        self.attr_f64(name)?.ok_or_else(|| self.missing(name))
    }

    fn parse_attr<T: FromStr>(&self, name: &str, expected: &'static str) -> Result<Option<T>> {
        match self.attribute(name) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| self.invalid(name, value, expected)),
        }
    }

    fn invalid(&self, name: &str, value: &str, expected: &'static str) -> Error {
        Error::decoding(
            self.position,
            DecodeCause::InvalidAttribute {
                name: name.to_owned(),
                value: value.to_owned(),
                expected,
            },
        )
    }

    fn missing(&self, name: &str) -> Error {
        Error::decoding(self.position, DecodeCause::MissingAttribute(name.to_owned()))
    }
}

struct Frame {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
}

impl Frame {
    fn from_start(start: &BytesStart, position: usize) -> Result<Frame> {
        let name = str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::decoding(position, e))?
            .to_owned();
        let mut attributes = Vec::new();
        for attribute_res in start.attributes() {
            let attribute = attribute_res.map_err(|e| Error::decoding(position, e))?;
            let key = str::from_utf8(attribute.key.as_ref())
                .map_err(|e| Error::decoding(position, e))?
                .to_owned();
            let value = attribute
                .unescape_value()
                .map_err(|e| Error::decoding(position, e))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Frame {
            name,
            attributes,
            text: String::new(),
        })
    }
}

/// Walks one document. Each instance owns its ancestor stack, so separate
/// documents need separate decoders.
pub struct XmlDecoder<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    stack: Vec<Frame>,
    max_depth: usize,
}

impl<R: BufRead> XmlDecoder<R> {
    /// Creates a decoder that accepts at most [`DEFAULT_MAX_DEPTH`] nested
    /// elements. Deeper documents fail with a `Malformed` decoding error even
    /// when they are well-formed; use [`XmlDecoder::with_max_depth`] to
    /// raise the limit.
    pub fn new(input: R) -> Self {
        let mut reader = Reader::from_reader(input);
        reader.expand_empty_elements(true);
        XmlDecoder {
            reader,
            buf: Vec::new(),
            stack: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Reads the whole document, reporting every element to `builder`.
    ///
    /// The first error ends the walk. Errors returned by the builder are
    /// wrapped with the position of the element that caused them.
    pub fn decode(mut self, builder: &mut impl ElementBuilder) -> Result<()> {
        let mut elements: usize = 0;
        loop {
            let event = self.reader.read_event_into(&mut self.buf);
            let position = self.reader.buffer_position();
            match event.map_err(|e| Error::decoding(position, e))? {
                Event::Start(start) => {
                    if self.stack.len() >= self.max_depth {
                        return Err(Error::decoding(
                            position,
                            DecodeCause::Malformed(format!(
                                "elements nested deeper than {}",
                                self.max_depth
                            )),
                        ));
                    }
                    let frame = Frame::from_start(&start, position)?;
                    // Indentation before a child is dropped so long runs of
                    // siblings do not grow the parent's text.
                    if let Some(parent) = self.stack.last_mut() {
                        if parent.text.trim().is_empty() {
                            parent.text.clear();
                        }
                    }
                    let element = XmlElement {
                        name: &frame.name,
                        parent: self.stack.last().map(|f| f.name.as_str()),
                        attributes: &frame.attributes,
                        text: None,
                        depth: self.stack.len(),
                        position,
                    };
                    builder
                        .on_start_element(&element)
                        .map_err(|e| e.at_position(position))?;
                    self.stack.push(frame);
                    elements += 1;
                }
                Event::End(_) => {
                    let frame = self.stack.pop().ok_or_else(|| {
                        Error::decoding(
                            position,
                            DecodeCause::Malformed("end tag without start tag".into()),
                        )
                    })?;
                    let element = XmlElement {
                        name: &frame.name,
                        parent: self.stack.last().map(|f| f.name.as_str()),
                        attributes: &frame.attributes,
                        text: Some(frame.text.as_str()).filter(|text| !text.trim().is_empty()),
                        depth: self.stack.len(),
                        position,
                    };
                    builder
                        .on_end_element(&element)
                        .map_err(|e| e.at_position(position))?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| Error::decoding(position, e))?;
                    if let Some(frame) = self.stack.last_mut() {
                        frame.text.push_str(&text);
                    }
                }
                Event::CData(data) => {
                    let text = str::from_utf8(&data).map_err(|e| Error::decoding(position, e))?;
                    if let Some(frame) = self.stack.last_mut() {
                        frame.text.push_str(text);
                    }
                }
                Event::Eof => {
                    if let Some(open) = self.stack.last() {
                        return Err(Error::decoding(
                            position,
                            DecodeCause::Malformed(format!(
                                "document ended inside <{}>",
                                open.name
                            )),
                        ));
                    }
                    break;
                }
                // Declarations, comments, processing instructions and doctypes
                // carry nothing we decode.
                _ => (),
            }
            self.buf.clear();
        }
        debug!(elements = elements; "Finished decoding XML document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        texts: Vec<(String, Option<String>)>,
    }

    impl ElementBuilder for Recorder {
        fn on_start_element(&mut self, element: &XmlElement<'_>) -> Result<()> {
            assert_eq!(element.text(), None);
            self.events.push(format!(
                "start {} in {}",
                element.name(),
                element.parent_name().unwrap_or("-")
            ));
            Ok(())
        }

        fn on_end_element(&mut self, element: &XmlElement<'_>) -> Result<()> {
            self.events.push(format!(
                "end {} in {}",
                element.name(),
                element.parent_name().unwrap_or("-")
            ));
            self.texts
                .push((element.name().to_owned(), element.text().map(str::to_owned)));
            Ok(())
        }
    }

    fn record(xml: &str) -> Result<Recorder> {
        let mut recorder = Recorder::default();
        XmlDecoder::new(xml.as_bytes()).decode(&mut recorder)?;
        Ok(recorder)
    }

    #[test]
    fn test_parent_names_follow_nesting() {
        let recorder = record("<a><b><c/></b></a>").unwrap();
        assert_eq!(
            recorder.events,
            vec![
                "start a in -",
                "start b in a",
                "start c in b",
                "end c in b",
                "end b in a",
                "end a in -",
            ]
        );
    }

    #[test]
    fn test_text_is_scoped_to_element() {
        let recorder = record("<a>x<b>inner</b>z<c/></a>").unwrap();
        assert_eq!(
            recorder.texts,
            vec![
                ("b".to_owned(), Some("inner".to_owned())),
                ("c".to_owned(), None),
                ("a".to_owned(), Some("xz".to_owned())),
            ]
        );
    }

    #[test]
    fn test_text_keeps_whitespace_around_children() {
        let recorder = record("<r><a>fish <b/> chips</a><c>  padded  </c></r>").unwrap();
        assert_eq!(
            recorder.texts,
            vec![
                ("b".to_owned(), None),
                ("a".to_owned(), Some("fish  chips".to_owned())),
                ("c".to_owned(), Some("  padded  ".to_owned())),
                ("r".to_owned(), None),
            ]
        );
    }

    #[test]
    fn test_indentation_only_text_is_none() {
        let recorder = record("<r>\n  <a>\n    <b/>\n  </a>\n</r>\n").unwrap();
        assert_eq!(
            recorder.texts,
            vec![
                ("b".to_owned(), None),
                ("a".to_owned(), None),
                ("r".to_owned(), None),
            ]
        );
    }

    #[test]
    fn test_text_is_unescaped() {
        let recorder = record("<a>fish &amp; chips</a>").unwrap();
        assert_eq!(recorder.texts[0].1.as_deref(), Some("fish & chips"));
    }

    #[test]
    fn test_element_without_text_has_none() {
        let recorder = record("<a><b>t</b></a>").unwrap();
        assert_eq!(recorder.texts[1], ("a".to_owned(), None));
    }

    struct AttrProbe;

    impl ElementBuilder for AttrProbe {
        fn on_start_element(&mut self, element: &XmlElement<'_>) -> Result<()> {
            assert_eq!(element.attr_i64("id")?, Some(-5));
            assert_eq!(element.attr_f64("lat")?, Some(1.5));
            assert_eq!(element.attr_bool("visible")?, Some(true));
            assert_eq!(element.attribute("name"), Some("a<b"));
            assert_eq!(element.attr_i64("missing")?, None);
            assert!(element.attr_datetime("timestamp")?.is_some());
            Ok(())
        }

        fn on_end_element(&mut self, _element: &XmlElement<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_typed_attributes() {
        let xml = r#"<n id="-5" lat="1.5" visible="true" name="a&lt;b" timestamp="2024-03-01T12:00:00Z"/>"#;
        XmlDecoder::new(xml.as_bytes()).decode(&mut AttrProbe).unwrap();
    }

    struct ReadsId;

    impl ElementBuilder for ReadsId {
        fn on_start_element(&mut self, element: &XmlElement<'_>) -> Result<()> {
            element.attr_i64("id")?;
            element.attr_bool("flag")?;
            Ok(())
        }

        fn on_end_element(&mut self, _element: &XmlElement<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_unparsable_attribute_names_position() {
        let xml = r#"<root><n id="12x"/></root>"#;
        let err = XmlDecoder::new(xml.as_bytes()).decode(&mut ReadsId).unwrap_err();
        match err {
            Error::Decoding {
                position,
                cause: DecodeCause::InvalidAttribute { name, value, .. },
            } => {
                assert_eq!(name, "id");
                assert_eq!(value, "12x");
                assert!(position > 6);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bool_attribute_rejects_other_tokens() {
        let err = XmlDecoder::new(r#"<n flag="yes"/>"#.as_bytes())
            .decode(&mut ReadsId)
            .unwrap_err();
        assert!(err.is_decoding());
    }

    #[test]
    fn test_mismatched_end_tag_fails() {
        let err = record("<a><b></a>").err().unwrap();
        assert!(err.is_decoding());
    }

    #[test]
    fn test_unclosed_document_fails() {
        let err = record("<a><b></b>").err().unwrap();
        assert!(err.is_decoding());
    }

    fn nested(depth: usize) -> String {
        "<e>".repeat(depth) + &"</e>".repeat(depth)
    }

    #[test]
    fn test_default_max_depth() {
        assert!(record(&nested(DEFAULT_MAX_DEPTH)).is_ok());
        let err = record(&nested(DEFAULT_MAX_DEPTH + 1)).err().unwrap();
        assert!(matches!(
            err,
            Error::Decoding {
                cause: DecodeCause::Malformed(_),
                ..
            }
        ));
    }

    #[test]
    fn test_max_depth() {
        let mut recorder = Recorder::default();
        let err = XmlDecoder::new("<a><b><c/></b></a>".as_bytes())
            .with_max_depth(2)
            .decode(&mut recorder)
            .unwrap_err();
        assert!(err.is_decoding());
        assert_eq!(recorder.events, vec!["start a in -", "start b in a"]);
    }

    struct FailsOn(&'static str);

    impl ElementBuilder for FailsOn {
        fn on_start_element(&mut self, element: &XmlElement<'_>) -> Result<()> {
            if element.name() == self.0 {
                return Err(Error::validation("rejected"));
            }
            Ok(())
        }

        fn on_end_element(&mut self, _element: &XmlElement<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_builder_error_is_wrapped() {
        let err = XmlDecoder::new("<a><b/></a>".as_bytes())
            .decode(&mut FailsOn("b"))
            .unwrap_err();
        match err {
            Error::Decoding {
                cause: DecodeCause::Rejected(inner),
                ..
            } => assert!(inner.is_validation()),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
