use std::io::BufRead;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use super::handler::MapDataHandler;
use crate::data::bounds::BoundingBox;
use crate::data::coords::OsmLatLon;
use crate::data::osm::{
    Changeset, ElementBase, ElementType, Node, OsmId, Relation, RelationMember, User, Way,
};
use crate::errors::Result;
use crate::xml::{ElementBuilder, XmlDecoder, XmlElement};

/// An entity whose start tag has been read but whose end tag has not.
struct PendingElement {
    element_type: ElementType,
    id: OsmId,
    version: i32,
    changeset: Option<Arc<Changeset>>,
    edited_at: Option<DateTime<Utc>>,
    visible: bool,
    position: Option<OsmLatLon>,
    tags: IndexMap<String, String>,
    node_ids: Vec<OsmId>,
    members: Vec<RelationMember>,
}

impl PendingElement {
    fn from_start(element_type: ElementType, el: &XmlElement<'_>) -> Result<Self> {
        let position = if element_type == ElementType::Node {
            Self::parse_position(el)?
        } else {
            None
        };
        Ok(PendingElement {
            element_type,
            id: el.required_i64("id")?,
            version: el.attr_i32("version")?.unwrap_or(0),
            changeset: Self::parse_changeset(el)?,
            edited_at: el.attr_datetime("timestamp")?,
            visible: el.attr_bool("visible")?.unwrap_or(true),
            position,
            tags: IndexMap::new(),
            node_ids: Vec::new(),
            members: Vec::new(),
        })
    }

    /// Nodes in a deletion carry no position, otherwise both coordinates must
    /// be given.
    fn parse_position(el: &XmlElement<'_>) -> Result<Option<OsmLatLon>> {
        match (el.attr_f64("lat")?, el.attr_f64("lon")?) {
            (None, None) => Ok(None),
            (lat, lon) => Ok(Some(OsmLatLon::new(
                el.required("lat", lat)?,
                el.required("lon", lon)?,
            )?)),
        }
    }

    fn parse_changeset(el: &XmlElement<'_>) -> Result<Option<Arc<Changeset>>> {
        let Some(id) = el.attr_i64("changeset")? else {
            return Ok(None);
        };
        let user = match (el.attr_i64("uid")?, el.attribute("user")) {
            (Some(uid), name) => Some(User {
                id: uid,
                name: name.unwrap_or_default().to_owned(),
            }),
            (None, _) => None,
        };
        Ok(Some(Arc::new(Changeset { id, user })))
    }

    fn base(&mut self) -> ElementBase {
        let mut base = ElementBase::new(
            self.id,
            self.version,
            std::mem::take(&mut self.tags).into(),
            self.changeset.take(),
            self.edited_at,
        );
        if !self.visible {
            base.mark_deleted_on_server();
        }
        base
    }

    fn dispatch(mut self, handler: &mut impl MapDataHandler) -> Result<()> {
        let base = self.base();
        match self.element_type {
            ElementType::Node => handler.handle_node(Node::new(base, self.position)),
            ElementType::Way => handler.handle_way(Way::new(base, self.node_ids.into())),
            ElementType::Relation => {
                handler.handle_relation(Relation::new(base, self.members.into()))
            }
        }
    }
}

/// Decodes a map data document (`<osm>` with `bounds`, `node`, `way` and
/// `relation` children) and reports every entity as soon as its end tag is
/// read.
///
/// Referenced node and member ids are not checked against the document.
pub struct MapDataDecoder<'h, H> {
    handler: &'h mut H,
    pending: Option<PendingElement>,
}

impl<'h, H: MapDataHandler> MapDataDecoder<'h, H> {
    pub fn new(handler: &'h mut H) -> Self {
        MapDataDecoder {
            handler,
            pending: None,
        }
    }

    pub fn decode(&mut self, input: impl BufRead) -> Result<()> {
        self.reset();
        XmlDecoder::new(input).decode(self)
    }

    /// Forgets an entity left half-built by an earlier failed decode.
    pub(crate) fn reset(&mut self) {
        self.pending = None;
    }

    #[cfg(test)]
    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn handler_mut(&mut self) -> &mut H {
        &mut *self.handler
    }

    /// The pending entity, if `el` sits directly inside it.
    fn pending_parent(&mut self, el: &XmlElement<'_>) -> Option<&mut PendingElement> {
        let parent = el.parent_name()?;
        self.pending
            .as_mut()
            .filter(|pending| pending.element_type.as_str() == parent)
    }
}

impl<H: MapDataHandler> ElementBuilder for MapDataDecoder<'_, H> {
    fn on_start_element(&mut self, el: &XmlElement<'_>) -> Result<()> {
        match el.name() {
            "bounds" => {
                let bounds = BoundingBox::from_bounds(
                    el.required_f64("minlat")?,
                    el.required_f64("minlon")?,
                    el.required_f64("maxlat")?,
                    el.required_f64("maxlon")?,
                )?;
                self.handler.handle_bounds(bounds)?;
            }
            "node" => self.pending = Some(PendingElement::from_start(ElementType::Node, el)?),
            "way" => self.pending = Some(PendingElement::from_start(ElementType::Way, el)?),
            "relation" => {
                self.pending = Some(PendingElement::from_start(ElementType::Relation, el)?)
            }
            "tag" => {
                if let Some(pending) = self.pending_parent(el) {
                    let key = el.required_str("k")?;
                    let value = el.required_str("v")?;
                    pending.tags.insert(key.to_owned(), value.to_owned());
                }
            }
            "nd" => {
                if let Some(pending) = self.pending_parent(el) {
                    if pending.element_type == ElementType::Way {
                        pending.node_ids.push(el.required_i64("ref")?);
                    }
                }
            }
            "member" => {
                if let Some(pending) = self.pending_parent(el) {
                    if pending.element_type == ElementType::Relation {
                        let element_type = el.required(
                            "type",
                            el.attr_parsed::<ElementType>("type", "node, way or relation")?,
                        )?;
                        let ref_id = el.required_i64("ref")?;
                        let role = el.attribute("role").unwrap_or_default();
                        pending
                            .members
                            .push(RelationMember::new(ref_id, element_type, role)?);
                    }
                }
            }
            _ => (),
        }
        Ok(())
    }

    fn on_end_element(&mut self, el: &XmlElement<'_>) -> Result<()> {
        let closes_pending = self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.element_type.as_str() == el.name());
        if closes_pending {
            if let Some(pending) = self.pending.take() {
                pending.dispatch(&mut *self.handler)?;
            }
        }
        Ok(())
    }
}

/// Decodes a map data document into `handler`.
pub fn decode_map_data(input: impl BufRead, handler: &mut impl MapDataHandler) -> Result<()> {
    MapDataDecoder::new(handler).decode(input)
}
