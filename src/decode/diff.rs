use std::io::BufRead;

use serde::Serialize;

use super::handler::Handler;
use crate::data::osm::{ElementType, OsmId};
use crate::errors::Result;
use crate::xml::{ElementBuilder, XmlDecoder, XmlElement};

/// One entry of an upload's diff result: the placeholder id the client used
/// and, unless the entity was deleted, the id and version the server assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffRecord {
    pub element_type: ElementType,
    pub client_id: OsmId,
    pub server_id: Option<OsmId>,
    pub server_version: Option<i32>,
}

impl DiffRecord {
    pub fn is_deletion(&self) -> bool {
        self.server_id.is_none()
    }
}

/// Decodes a `<diffResult>` document into [`DiffRecord`]s, one per child of
/// the root element.
///
/// A record carrying only one of `new_id` and `new_version` is passed on as
/// it is. Applying the records to local entities is up to the handler.
pub struct DiffDecoder<'h, H> {
    handler: &'h mut H,
}

impl<'h, H: Handler<DiffRecord>> DiffDecoder<'h, H> {
    pub fn new(handler: &'h mut H) -> Self {
        DiffDecoder { handler }
    }

    pub fn decode(&mut self, input: impl BufRead) -> Result<()> {
        XmlDecoder::new(input).decode(self)
    }
}

impl<H: Handler<DiffRecord>> ElementBuilder for DiffDecoder<'_, H> {
    fn on_start_element(&mut self, el: &XmlElement<'_>) -> Result<()> {
        if el.depth() != 1 {
            return Ok(());
        }
        let element_type = match el.name() {
            "node" => ElementType::Node,
            "way" => ElementType::Way,
            "relation" => ElementType::Relation,
            _ => return Ok(()),
        };
        self.handler.handle(DiffRecord {
            element_type,
            client_id: el.required_i64("old_id")?,
            server_id: el.attr_i64("new_id")?,
            server_version: el.attr_i32("new_version")?,
        })
    }

    fn on_end_element(&mut self, _el: &XmlElement<'_>) -> Result<()> {
        Ok(())
    }
}

pub fn decode_diff(input: impl BufRead, handler: &mut impl Handler<DiffRecord>) -> Result<()> {
    DiffDecoder::new(handler).decode(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::handler::{ListHandler, SingleElementHandler};
    use crate::errors::{DecodeCause, Error};

    fn decode(xml: &str) -> Result<Vec<DiffRecord>> {
        let mut handler = ListHandler::new();
        decode_diff(xml.as_bytes(), &mut handler)?;
        Ok(handler.into_inner())
    }

    #[test]
    fn test_create_acknowledgement() {
        let mut handler = SingleElementHandler::new();
        decode_diff(
            r#"<diffResult><node old_id='1' new_id='2' new_version='3'/></diffResult>"#.as_bytes(),
            &mut handler,
        )
        .unwrap();
        assert_eq!(
            handler.into_inner(),
            Some(DiffRecord {
                element_type: ElementType::Node,
                client_id: 1,
                server_id: Some(2),
                server_version: Some(3),
            })
        );
    }

    #[test]
    fn test_deletion_acknowledgement() {
        let records = decode(r#"<diffResult><node old_id='1'/></diffResult>"#).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].server_id, None);
        assert_eq!(records[0].server_version, None);
        assert!(records[0].is_deletion());
    }

    #[test]
    fn test_records_in_document_order() {
        let xml = r#"<diffResult generator="server" version="0.6">
            <node old_id="-1" new_id="100" new_version="1"/>
            <way old_id="-2" new_id="200" new_version="1"/>
            <relation old_id="5" new_id="5" new_version="4"/>
            <node old_id="7"/>
        </diffResult>"#;
        let records = decode(xml).unwrap();
        let summary: Vec<_> = records
            .iter()
            .map(|r| (r.element_type, r.client_id, r.server_id))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ElementType::Node, -1, Some(100)),
                (ElementType::Way, -2, Some(200)),
                (ElementType::Relation, 5, Some(5)),
                (ElementType::Node, 7, None),
            ]
        );
    }

    #[test]
    fn test_partial_record_is_kept() {
        let records = decode(r#"<diffResult><way old_id="3" new_id="4"/></diffResult>"#).unwrap();
        assert_eq!(records[0].server_id, Some(4));
        assert_eq!(records[0].server_version, None);
    }

    #[test]
    fn test_missing_old_id_fails() {
        let err = decode(r#"<diffResult><node new_id="4" new_version="1"/></diffResult>"#)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Decoding {
                cause: DecodeCause::MissingAttribute(ref name),
                ..
            } if name == "old_id"
        ));
    }

    #[test]
    fn test_unparsable_new_version_fails() {
        let err = decode(r#"<diffResult><node old_id="1" new_id="2" new_version="x"/></diffResult>"#)
            .unwrap_err();
        assert!(err.is_decoding());
    }
}
