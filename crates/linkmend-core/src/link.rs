//! Link records and the document's link table.
//!
//! Two wire encodings exist for a link. The array form
//! `[id, origin_id, origin_slot, target_id, target_slot, type]` is what
//! exported workflow files use; the object form
//! `{"id": .., "origin_id": .., ...}` shows up once an editor has loaded the
//! graph and serialized it again. Both decode into [`Link`], which remembers
//! its [`LinkEncoding`] so the document is written back the way it was read.
//!
//! The table itself is either an array (possibly with `null` holes left by
//! earlier deletions) or an object keyed by link id.

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::id::{LinkId, NodeId, SlotIndex};

/// Wire shape a link was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkEncoding {
    Tuple,
    Object,
}

/// A directed edge from an output slot to an input slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub origin_id: NodeId,
    pub origin_slot: SlotIndex,
    pub target_id: NodeId,
    pub target_slot: SlotIndex,
    /// Data type carried by the link. `None` when the record had no type at
    /// all; `Some(Value::Null)` when it was explicitly `null`.
    pub link_type: Option<Value>,
    pub encoding: LinkEncoding,
    /// Tuple elements past the type, kept verbatim.
    pub rest: Vec<Value>,
    /// Unknown object fields, kept verbatim.
    pub extra: Map<String, Value>,
}

impl Link {
    /// Creates a tuple-encoded link.
    pub fn new(
        id: LinkId,
        origin_id: NodeId,
        origin_slot: SlotIndex,
        target_id: NodeId,
        target_slot: SlotIndex,
        link_type: impl Into<Value>,
    ) -> Self {
        Link {
            id,
            origin_id,
            origin_slot,
            target_id,
            target_slot,
            link_type: Some(link_type.into()),
            encoding: LinkEncoding::Tuple,
            rest: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Decodes either wire form.
    pub fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Array(items) => Self::from_tuple(items),
            Value::Object(_) => {
                let raw: ObjectLink =
                    serde_json::from_value(value).map_err(|e| format!("link object: {e}"))?;
                Ok(Link {
                    id: raw.id,
                    origin_id: raw.origin_id,
                    origin_slot: raw.origin_slot,
                    target_id: raw.target_id,
                    target_slot: raw.target_slot,
                    link_type: raw.link_type,
                    encoding: LinkEncoding::Object,
                    rest: Vec::new(),
                    extra: raw.extra,
                })
            }
            other => Err(format!("link must be an array or an object, got {other}")),
        }
    }

    fn from_tuple(items: Vec<Value>) -> Result<Self, String> {
        if items.len() < 5 {
            return Err(format!(
                "link tuple needs at least 5 elements, got {}",
                items.len()
            ));
        }
        let mut items = items.into_iter();
        let mut next_int = |field: &str| -> Result<i64, String> {
            items
                .next()
                .and_then(|v| v.as_i64())
                .ok_or_else(|| format!("link tuple field '{field}' is not an integer"))
        };
        let id = LinkId(next_int("id")?);
        let origin_id = NodeId(next_int("origin_id")?);
        let origin_slot = slot_from_int(next_int("origin_slot")?, "origin_slot")?;
        let target_id = NodeId(next_int("target_id")?);
        let target_slot = slot_from_int(next_int("target_slot")?, "target_slot")?;
        let link_type = items.next();
        Ok(Link {
            id,
            origin_id,
            origin_slot,
            target_id,
            target_slot,
            link_type,
            encoding: LinkEncoding::Tuple,
            rest: items.collect(),
            extra: Map::new(),
        })
    }
}

fn slot_from_int(raw: i64, field: &str) -> Result<SlotIndex, String> {
    SlotIndex::try_from(raw).map_err(|_| format!("link field '{field}' is not a valid slot: {raw}"))
}

/// Typed view of the object encoding; unknown keys land in `extra`.
#[derive(Deserialize)]
struct ObjectLink {
    id: LinkId,
    origin_id: NodeId,
    origin_slot: SlotIndex,
    target_id: NodeId,
    target_slot: SlotIndex,
    #[serde(rename = "type", default, deserialize_with = "present")]
    link_type: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Distinguishes an explicit `null` from a missing key.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Link::from_value(value).map_err(de::Error::custom)
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.encoding {
            LinkEncoding::Tuple => {
                let len = 5 + usize::from(self.link_type.is_some()) + self.rest.len();
                let mut seq = serializer.serialize_seq(Some(len))?;
                seq.serialize_element(&self.id)?;
                seq.serialize_element(&self.origin_id)?;
                seq.serialize_element(&self.origin_slot)?;
                seq.serialize_element(&self.target_id)?;
                seq.serialize_element(&self.target_slot)?;
                if let Some(link_type) = &self.link_type {
                    seq.serialize_element(link_type)?;
                }
                for item in &self.rest {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            LinkEncoding::Object => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("id", &self.id)?;
                map.serialize_entry("origin_id", &self.origin_id)?;
                map.serialize_entry("origin_slot", &self.origin_slot)?;
                map.serialize_entry("target_id", &self.target_id)?;
                map.serialize_entry("target_slot", &self.target_slot)?;
                if let Some(link_type) = &self.link_type {
                    map.serialize_entry("type", link_type)?;
                }
                for (key, value) in &self.extra {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Link table
// ---------------------------------------------------------------------------

/// The document's global link table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LinkTable {
    /// Array form. `None` entries are holes left by earlier deletions.
    Sequence(Vec<Option<Link>>),
    /// Object form keyed by link id.
    Keyed(IndexMap<String, Option<Link>>),
}

impl Default for LinkTable {
    fn default() -> Self {
        LinkTable::Sequence(Vec::new())
    }
}

impl LinkTable {
    /// Number of entries, holes included.
    pub fn len(&self) -> usize {
        match self {
            LinkTable::Sequence(links) => links.len(),
            LinkTable::Keyed(links) => links.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `null` entries.
    pub fn hole_count(&self) -> usize {
        self.entries().filter(|(_, link)| link.is_none()).count()
    }

    /// Every entry with its raw storage position, holes included.
    pub fn entries(&self) -> Box<dyn Iterator<Item = (usize, Option<&Link>)> + '_> {
        match self {
            LinkTable::Sequence(links) => {
                Box::new(links.iter().enumerate().map(|(i, l)| (i, l.as_ref())))
            }
            LinkTable::Keyed(links) => {
                Box::new(links.values().enumerate().map(|(i, l)| (i, l.as_ref())))
            }
        }
    }

    /// Links in stored order, skipping holes.
    ///
    /// The array form keeps its array order. The keyed form is ordered by
    /// ascending link id, which is the order it takes once it is spread into
    /// an id-indexed array.
    pub fn iter_stored(&self) -> Vec<&Link> {
        match self {
            LinkTable::Sequence(links) => links.iter().flatten().collect(),
            LinkTable::Keyed(links) => {
                let mut ordered: Vec<&Link> = links.values().flatten().collect();
                ordered.sort_by_key(|link| link.id);
                ordered
            }
        }
    }

    /// Removes the entry at a raw storage position, shifting later entries.
    pub fn remove_at(&mut self, position: usize) -> Option<Option<Link>> {
        match self {
            LinkTable::Sequence(links) => {
                (position < links.len()).then(|| links.remove(position))
            }
            LinkTable::Keyed(links) => links.shift_remove_index(position).map(|(_, l)| l),
        }
    }

    /// Drops every hole.
    pub fn compact(&mut self) {
        match self {
            LinkTable::Sequence(links) => links.retain(Option::is_some),
            LinkTable::Keyed(links) => links.retain(|_, link| link.is_some()),
        }
    }
}

impl<'de> Deserialize<'de> for LinkTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let decode = |value: Value| -> Result<Option<Link>, D::Error> {
            match value {
                Value::Null => Ok(None),
                other => Link::from_value(other).map(Some).map_err(de::Error::custom),
            }
        };
        match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .map(decode)
                .collect::<Result<Vec<_>, _>>()
                .map(LinkTable::Sequence),
            Value::Object(entries) => entries
                .into_iter()
                .map(|(key, value)| -> Result<(String, Option<Link>), D::Error> {
                    Ok((key, decode(value)?))
                })
                .collect::<Result<IndexMap<_, _>, D::Error>>()
                .map(LinkTable::Keyed),
            other => Err(de::Error::custom(format!(
                "links must be an array or an object, got {other}"
            ))),
        }
    }
}
