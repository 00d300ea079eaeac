use std::collections::HashMap;

use log::debug;

use self::bounds::BoundingBox;
use self::osm::{ElementType, Node, OsmId, Relation, Way};
use crate::decode::{DiffRecord, MapDataHandler};
use crate::errors::Result;

pub mod bounds;
pub mod coords;
pub mod osm;
pub mod tracked;

/// Map data keyed by id, as decoded from one or more documents. Later
/// versions of an entity replace earlier ones.
#[derive(Debug, Default, Clone)]
pub struct MapDataSet {
    pub bounds: Option<BoundingBox>,
    pub nodes: HashMap<OsmId, Node>,
    pub ways: HashMap<OsmId, Way>,
    pub relations: HashMap<OsmId, Relation>,
}

impl MapDataSet {
    pub fn new() -> Self {
        MapDataSet::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len() + self.ways.len() + self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reconciles one diff record with the stored entities.
    ///
    /// A record with a server id moves the entity from its placeholder id to
    /// the server id, takes over the server version and marks the entity as
    /// in sync. Way and relation references to the placeholder are rewritten
    /// too. A record without a server id acknowledges a deletion and drops
    /// the entity.
    ///
    /// Returns `false` if no entity with the placeholder id is stored.
    pub fn apply_diff(&mut self, record: &DiffRecord) -> bool {
        let DiffRecord {
            element_type,
            client_id,
            server_id,
            server_version,
        } = *record;
        let found = match element_type {
            ElementType::Node => match self.nodes.remove(&client_id) {
                Some(mut node) => {
                    if let Some(id) = server_id {
                        node.assign_server_identity(id, server_version);
                        self.nodes.insert(id, node);
                    }
                    true
                }
                None => false,
            },
            ElementType::Way => match self.ways.remove(&client_id) {
                Some(mut way) => {
                    if let Some(id) = server_id {
                        way.assign_server_identity(id, server_version);
                        self.ways.insert(id, way);
                    }
                    true
                }
                None => false,
            },
            ElementType::Relation => match self.relations.remove(&client_id) {
                Some(mut relation) => {
                    if let Some(id) = server_id {
                        relation.assign_server_identity(id, server_version);
                        self.relations.insert(id, relation);
                    }
                    true
                }
                None => false,
            },
        };
        if !found {
            debug!(element_type = element_type.as_str(), client_id = client_id; "No stored entity for diff record");
            return false;
        }
        if let Some(id) = server_id.filter(|id| *id != client_id) {
            self.rename_references(element_type, client_id, id);
        }
        true
    }

    fn rename_references(&mut self, element_type: ElementType, from: OsmId, to: OsmId) {
        if element_type == ElementType::Node {
            for way in self.ways.values_mut() {
                way.rename_node_ref(from, to);
            }
        }
        for relation in self.relations.values_mut() {
            relation.rename_member_ref(element_type, from, to);
        }
    }
}

impl MapDataHandler for MapDataSet {
    fn handle_bounds(&mut self, bounds: BoundingBox) -> Result<()> {
        self.bounds = Some(bounds);
        Ok(())
    }

    fn handle_node(&mut self, node: Node) -> Result<()> {
        self.nodes.insert(node.id(), node);
        Ok(())
    }

    fn handle_way(&mut self, way: Way) -> Result<()> {
        self.ways.insert(way.id(), way);
        Ok(())
    }

    fn handle_relation(&mut self, relation: Relation) -> Result<()> {
        self.relations.insert(relation.id(), relation);
        Ok(())
    }
}
