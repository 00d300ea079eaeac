use std::fmt;

use crate::data::bounds::BoundingBox;
use crate::data::osm::{Element, Node, Relation, Way};
use crate::errors::Result;

/// Receives decoded values one at a time.
pub trait Handler<T> {
    fn handle(&mut self, value: T) -> Result<()>;
}

/// Collects every handled value, in the order they were decoded.
#[derive(Debug, Clone)]
pub struct ListHandler<T> {
    items: Vec<T>,
}

impl<T> ListHandler<T> {
    pub fn new() -> Self {
        ListHandler { items: Vec::new() }
    }

    pub fn get(&self) -> &[T] {
        &self.items
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for ListHandler<T> {
    fn default() -> Self {
        ListHandler::new()
    }
}

impl<T> Handler<T> for ListHandler<T> {
    fn handle(&mut self, value: T) -> Result<()> {
        self.items.push(value);
        Ok(())
    }
}

/// For responses that carry a single value. Keeps the last one handled.
#[derive(Debug, Clone)]
pub struct SingleElementHandler<T> {
    item: Option<T>,
}

impl<T> SingleElementHandler<T> {
    pub fn new() -> Self {
        SingleElementHandler { item: None }
    }

    pub fn get(&self) -> Option<&T> {
        self.item.as_ref()
    }

    pub fn into_inner(self) -> Option<T> {
        self.item
    }
}

impl<T> Default for SingleElementHandler<T> {
    fn default() -> Self {
        SingleElementHandler::new()
    }
}

impl<T> Handler<T> for SingleElementHandler<T> {
    fn handle(&mut self, value: T) -> Result<()> {
        self.item = Some(value);
        Ok(())
    }
}

/// Receives the content of a map data document. Implement only the kinds
/// you are interested in, the rest are dropped.
pub trait MapDataHandler {
    fn handle_bounds(&mut self, _bounds: BoundingBox) -> Result<()> {
        Ok(())
    }

    fn handle_node(&mut self, _node: Node) -> Result<()> {
        Ok(())
    }

    fn handle_way(&mut self, _way: Way) -> Result<()> {
        Ok(())
    }

    fn handle_relation(&mut self, _relation: Relation) -> Result<()> {
        Ok(())
    }
}

/// Collects entities in document order. Bounds are not entities and are
/// dropped; use a handler such as [`crate::data::MapDataSet`] to keep them.
impl MapDataHandler for ListHandler<Element> {
    fn handle_node(&mut self, node: Node) -> Result<()> {
        self.handle(Element::Node(node))
    }

    fn handle_way(&mut self, way: Way) -> Result<()> {
        self.handle(Element::Way(way))
    }

    fn handle_relation(&mut self, relation: Relation) -> Result<()> {
        self.handle(Element::Relation(relation))
    }
}

/// The section of a change document the following entities belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeGroup {
    Created,
    Modified,
    Deleted,
}

impl ChangeGroup {
    pub fn from_element_name(name: &str) -> Option<ChangeGroup> {
        match name {
            "create" => Some(ChangeGroup::Created),
            "modify" => Some(ChangeGroup::Modified),
            "delete" => Some(ChangeGroup::Deleted),
            _ => None,
        }
    }

    pub fn element_name(&self) -> &'static str {
        match self {
            ChangeGroup::Created => "create",
            ChangeGroup::Modified => "modify",
            ChangeGroup::Deleted => "delete",
        }
    }
}

impl fmt::Display for ChangeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// Receives a change document. `handle_change_group` is called before the
/// entities of each group are reported.
pub trait MapDataChangesHandler: MapDataHandler {
    fn handle_change_group(&mut self, group: ChangeGroup) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_element_handler_keeps_last() {
        let mut handler = SingleElementHandler::new();
        assert!(handler.get().is_none());
        handler.handle(1).unwrap();
        handler.handle(2).unwrap();
        assert_eq!(handler.into_inner(), Some(2));
    }

    #[test]
    fn test_list_handler_keeps_order() {
        let mut handler = ListHandler::new();
        handler.handle("a").unwrap();
        handler.handle("b").unwrap();
        assert_eq!(handler.get(), &["a", "b"]);
    }

    #[test]
    fn test_element_list_skips_bounds() {
        let mut handler: ListHandler<Element> = ListHandler::new();
        handler
            .handle_bounds(BoundingBox::from_bounds(0.0, 0.0, 1.0, 1.0).unwrap())
            .unwrap();
        assert!(handler.get().is_empty());
    }

    #[test]
    fn test_change_group_names() {
        for group in [ChangeGroup::Created, ChangeGroup::Modified, ChangeGroup::Deleted] {
            assert_eq!(ChangeGroup::from_element_name(group.element_name()), Some(group));
        }
        assert_eq!(ChangeGroup::from_element_name("node"), None);
    }
}
