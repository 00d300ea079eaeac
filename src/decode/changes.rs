use std::io::BufRead;

use super::handler::{ChangeGroup, MapDataChangesHandler};
use super::map_data::MapDataDecoder;
use crate::errors::Result;
use crate::xml::{ElementBuilder, XmlDecoder, XmlElement};

/// Decodes a change document (`<osmChange>` with `create`, `modify` and
/// `delete` sections). Groups may come in any order, repeat or be missing.
pub struct MapDataChangesDecoder<'h, H> {
    inner: MapDataDecoder<'h, H>,
}

impl<'h, H: MapDataChangesHandler> MapDataChangesDecoder<'h, H> {
    pub fn new(handler: &'h mut H) -> Self {
        MapDataChangesDecoder {
            inner: MapDataDecoder::new(handler),
        }
    }

    pub fn decode(&mut self, input: impl BufRead) -> Result<()> {
        self.inner.reset();
        XmlDecoder::new(input).decode(self)
    }
}

impl<H: MapDataChangesHandler> ElementBuilder for MapDataChangesDecoder<'_, H> {
    fn on_start_element(&mut self, el: &XmlElement<'_>) -> Result<()> {
        match ChangeGroup::from_element_name(el.name()) {
            Some(group) => self.inner.handler_mut().handle_change_group(group),
            None => self.inner.on_start_element(el),
        }
    }

    fn on_end_element(&mut self, el: &XmlElement<'_>) -> Result<()> {
        match ChangeGroup::from_element_name(el.name()) {
            Some(_) => Ok(()),
            None => self.inner.on_end_element(el),
        }
    }
}

pub fn decode_map_data_changes(
    input: impl BufRead,
    handler: &mut impl MapDataChangesHandler,
) -> Result<()> {
    MapDataChangesDecoder::new(handler).decode(input)
}
