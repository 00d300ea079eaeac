use std::{fmt, str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};

use super::coords::{LatLon, OsmLatLon};
use super::tracked::{Tags, TrackedList};
use crate::errors::{Error, Result};

pub type OsmId = i64;

/// Roles of this many characters or more are rejected by the server.
pub const MAX_ROLE_LENGTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Node,
    Way,
    Relation,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Node => "node",
            ElementType::Way => "way",
            ElementType::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("node") {
            Ok(ElementType::Node)
        } else if s.eq_ignore_ascii_case("way") {
            Ok(ElementType::Way)
        } else if s.eq_ignore_ascii_case("relation") {
            Ok(ElementType::Relation)
        } else {
            Err(Error::validation(format!("unknown element type {s:?}")))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
}

/// The server-side changeset an entity was last edited in. Entities share it
/// through an `Arc` and never modify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    pub id: i64,
    pub user: Option<User>,
}

/// Fields every map entity carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBase {
    id: OsmId,
    version: i32,
    tags: Tags,
    changeset: Option<Arc<Changeset>>,
    edited_at: Option<DateTime<Utc>>,
    new: bool,
    deleted: bool,
    modified: bool,
}

impl ElementBase {
    pub fn new(
        id: OsmId,
        version: i32,
        tags: Tags,
        changeset: Option<Arc<Changeset>>,
        edited_at: Option<DateTime<Utc>>,
    ) -> Self {
        ElementBase {
            id,
            version,
            tags,
            changeset,
            edited_at,
            new: false,
            deleted: false,
            modified: false,
        }
    }

    /// A client-side entity the server has not seen yet.
    pub fn create(id: OsmId, tags: Tags) -> Self {
        ElementBase {
            new: true,
            ..ElementBase::new(id, 0, tags, None, None)
        }
    }

    pub fn id(&self) -> OsmId {
        self.id
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut Tags {
        &mut self.tags
    }

    /// Replaces the whole tag map.
    pub fn set_tags(&mut self, tags: Tags) {
        self.tags = tags;
        self.modified = true;
    }

    pub fn changeset(&self) -> Option<&Arc<Changeset>> {
        self.changeset.as_ref()
    }

    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.edited_at
    }

    /// True for entities created on the client, including any entity still
    /// carrying a negative placeholder id.
    pub fn is_new(&self) -> bool {
        self.new || self.id < 0
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn set_deleted(&mut self, deleted: bool) {
        if self.deleted != deleted {
            self.modified = true;
        }
        self.deleted = deleted;
    }

    pub fn is_modified(&self) -> bool {
        self.modified || self.tags.is_modified()
    }

    pub fn set_modified(&mut self) {
        self.modified = true;
    }

    /// Applies the id and version the server assigned after an upload. The
    /// entity is considered in sync with the server afterwards.
    pub(crate) fn assign_server_identity(&mut self, id: OsmId, version: Option<i32>) {
        self.id = id;
        if let Some(version) = version {
            self.version = version;
        }
        self.new = false;
        self.modified = false;
        self.tags.mark_clean();
    }

    /// Marks entities decoded with `visible="false"`.
    pub(crate) fn mark_deleted_on_server(&mut self) {
        self.deleted = true;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    base: ElementBase,
    position: Option<OsmLatLon>,
}

impl Node {
    pub fn new(base: ElementBase, position: Option<OsmLatLon>) -> Self {
        Node { base, position }
    }

    pub fn create(id: OsmId, position: OsmLatLon, tags: Tags) -> Self {
        Node::new(ElementBase::create(id, tags), Some(position))
    }

    pub fn base(&self) -> &ElementBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    pub fn id(&self) -> OsmId {
        self.base.id
    }

    pub fn position(&self) -> Option<OsmLatLon> {
        self.position
    }

    pub fn set_position(&mut self, position: &impl LatLon) -> Result<()> {
        self.position = Some(OsmLatLon::from_lat_lon(position)?);
        self.base.modified = true;
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.base.is_modified()
    }

    pub(crate) fn assign_server_identity(&mut self, id: OsmId, version: Option<i32>) {
        self.base.assign_server_identity(id, version);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    base: ElementBase,
    node_ids: TrackedList<OsmId>,
}

impl Way {
    pub fn new(base: ElementBase, node_ids: TrackedList<OsmId>) -> Self {
        Way { base, node_ids }
    }

    pub fn create(id: OsmId, node_ids: Vec<OsmId>, tags: Tags) -> Self {
        Way::new(ElementBase::create(id, tags), node_ids.into())
    }

    pub fn base(&self) -> &ElementBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    pub fn id(&self) -> OsmId {
        self.base.id
    }

    pub fn node_ids(&self) -> &TrackedList<OsmId> {
        &self.node_ids
    }

    pub fn node_ids_mut(&mut self) -> &mut TrackedList<OsmId> {
        &mut self.node_ids
    }

    /// A way is closed when it has at least three references and ends where it
    /// starts.
    pub fn is_closed(&self) -> bool {
        self.node_ids.len() >= 3 && self.node_ids.first() == self.node_ids.last()
    }

    pub fn is_modified(&self) -> bool {
        self.base.is_modified() || self.node_ids.is_modified()
    }

    pub(crate) fn assign_server_identity(&mut self, id: OsmId, version: Option<i32>) {
        self.base.assign_server_identity(id, version);
        self.node_ids.mark_clean();
    }

    pub(crate) fn rename_node_ref(&mut self, from: OsmId, to: OsmId) {
        for id in self.node_ids.as_mut_slice_untracked() {
            if *id == from {
                *id = to;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMember {
    ref_id: OsmId,
    element_type: ElementType,
    role: String,
    modified: bool,
}

fn check_role(role: &str) -> Result<()> {
    let len = role.chars().count();
    if len >= MAX_ROLE_LENGTH {
        return Err(Error::validation(format!(
            "role has {len} characters, must be less than {MAX_ROLE_LENGTH}"
        )));
    }
    Ok(())
}

impl RelationMember {
    pub fn new(ref_id: OsmId, element_type: ElementType, role: impl Into<String>) -> Result<Self> {
        let role = role.into();
        check_role(&role)?;
        Ok(RelationMember {
            ref_id,
            element_type,
            role,
            modified: false,
        })
    }

    pub fn ref_id(&self) -> OsmId {
        self.ref_id
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn set_role(&mut self, role: impl Into<String>) -> Result<()> {
        let role = role.into();
        check_role(&role)?;
        if role != self.role {
            self.role = role;
            self.modified = true;
        }
        Ok(())
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    base: ElementBase,
    members: TrackedList<RelationMember>,
}

impl Relation {
    pub fn new(base: ElementBase, members: TrackedList<RelationMember>) -> Self {
        Relation { base, members }
    }

    pub fn create(id: OsmId, members: Vec<RelationMember>, tags: Tags) -> Self {
        Relation::new(ElementBase::create(id, tags), members.into())
    }

    pub fn base(&self) -> &ElementBase {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut ElementBase {
        &mut self.base
    }

    pub fn id(&self) -> OsmId {
        self.base.id
    }

    pub fn members(&self) -> &TrackedList<RelationMember> {
        &self.members
    }

    pub fn members_mut(&mut self) -> &mut TrackedList<RelationMember> {
        &mut self.members
    }

    pub fn is_modified(&self) -> bool {
        self.base.is_modified()
            || self.members.is_modified()
            || self.members.iter().any(RelationMember::is_modified)
    }

    /// Changes the role of one member. Only the member is marked as modified,
    /// the member list itself keeps its flag.
    pub fn set_member_role(&mut self, index: usize, role: impl Into<String>) -> Result<()> {
        let member = self
            .members
            .as_mut_slice_untracked()
            .get_mut(index)
            .ok_or_else(|| Error::validation(format!("relation has no member at index {index}")))?;
        member.set_role(role)
    }

    pub(crate) fn assign_server_identity(&mut self, id: OsmId, version: Option<i32>) {
        self.base.assign_server_identity(id, version);
        self.members.mark_clean();
        for member in self.members.as_mut_slice_untracked() {
            member.modified = false;
        }
    }

    pub(crate) fn rename_member_ref(&mut self, element_type: ElementType, from: OsmId, to: OsmId) {
        for member in self.members.as_mut_slice_untracked() {
            if member.element_type == element_type && member.ref_id == from {
                member.ref_id = to;
            }
        }
    }
}

/// Any of the three map entity kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Element {
    pub fn base(&self) -> &ElementBase {
        match self {
            Element::Node(node) => node.base(),
            Element::Way(way) => way.base(),
            Element::Relation(relation) => relation.base(),
        }
    }

    pub fn base_mut(&mut self) -> &mut ElementBase {
        match self {
            Element::Node(node) => node.base_mut(),
            Element::Way(way) => way.base_mut(),
            Element::Relation(relation) => relation.base_mut(),
        }
    }

    pub fn id(&self) -> OsmId {
        self.base().id()
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Element::Node(_) => ElementType::Node,
            Element::Way(_) => ElementType::Way,
            Element::Relation(_) => ElementType::Relation,
        }
    }

    pub fn is_modified(&self) -> bool {
        match self {
            Element::Node(node) => node.is_modified(),
            Element::Way(way) => way.is_modified(),
            Element::Relation(relation) => relation.is_modified(),
        }
    }
}
