//! Map id rewriting on a single item node.
//!
//! Map items have stored their id in several places over the years. The
//! encodings are tried in a fixed order and the first one present wins:
//!
//! 1. `components."minecraft:map_id"` / `components.map_id`
//! 2. `Damage` (short)
//! 3. `tag.map` / `tag.map_id`
//! 4. `map` / `map_id` on the item itself
//! 5. no id but a stack count: heuristic target, written in the era's layout
//!
//! Every branch leaves target ids and negative sentinels untouched, which
//! makes a second visit to an already rewritten node a no-op.

use compendium_nbt::{NbtCompound, NbtTag};
use tracing::{debug, warn};

use crate::error::RewriteError;
use crate::heuristic::Holder;
use crate::schema::SchemaFields;
use crate::session::RemapSession;

pub const FILLED_MAP: &str = "minecraft:filled_map";
/// Numeric item id of a filled map before string ids.
pub const LEGACY_FILLED_MAP: i32 = 358;

const COMPONENT_ID_FIELDS: [&str; 2] = ["minecraft:map_id", "map_id"];
const COMPONENT_ID: &str = "minecraft:map_id";

const FRAME_IDS: [&str; 4] = [
    "minecraft:item_frame",
    "minecraft:glow_item_frame",
    "ItemFrame",
    "GlowItemFrame",
];

/// Where a map id was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Component,
    Damage,
    Tag,
    Direct,
    /// `item_id` / `has_map` directly on a frame entity.
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    NotAMap,
    /// An explicit id was found and resolved (or passed through).
    Resolved(Encoding),
    /// No id was present and a heuristic target was written.
    Inferred(Encoding),
    /// A map with nothing to go on; left untouched.
    Unresolved,
    /// Malformed node; left untouched.
    Anomaly,
}

pub fn is_map_item(item: &NbtCompound) -> bool {
    match item.get("id") {
        Some(NbtTag::String(id)) => id == FILLED_MAP || id == "filled_map",
        Some(NbtTag::Short(id)) => i32::from(*id) == LEGACY_FILLED_MAP,
        Some(NbtTag::Int(id)) => *id == LEGACY_FILLED_MAP,
        _ => false,
    }
}

pub fn is_frame_entity(entity: &NbtCompound) -> bool {
    matches!(entity.get("id"), Some(NbtTag::String(id)) if FRAME_IDS.contains(&id.as_str()))
}

/// Get `name` as a compound, inserting an empty one when absent.
fn compound_entry<'a>(
    node: &'a mut NbtCompound,
    name: &str,
) -> Result<&'a mut NbtCompound, RewriteError> {
    let key = node.physical_name(name).unwrap_or_else(|| name.to_owned());
    match node
        .entry(key)
        .or_insert_with(|| NbtTag::Compound(NbtCompound::new()))
    {
        NbtTag::Compound(c) => Ok(c),
        other => Err(RewriteError::UnexpectedType {
            field: name.to_owned(),
            expected: "compound",
            found: other.type_name(),
        }),
    }
}

impl RemapSession {
    /// Rewrite one item, logging and counting any structural anomaly.
    pub fn visit_item(&mut self, item: &mut NbtCompound, holder: &Holder) -> ItemOutcome {
        match self.rewrite_item(item, holder) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.anomalies += 1;
                warn!("Skipping malformed map item: {e}");
                ItemOutcome::Anomaly
            }
        }
    }

    /// Rewrite the map id of one item node.
    ///
    /// On error the node is unchanged.
    pub fn rewrite_item(
        &mut self,
        item: &mut NbtCompound,
        holder: &Holder,
    ) -> Result<ItemOutcome, RewriteError> {
        if !is_map_item(item) {
            return Ok(ItemOutcome::NotAMap);
        }

        if let Some(outcome) = self.rewrite_component(item)? {
            return Ok(outcome);
        }
        if let Some(outcome) = self.rewrite_damage(item)? {
            return Ok(outcome);
        }
        if let Some(outcome) = self.rewrite_tag(item)? {
            return Ok(outcome);
        }
        if let Some(outcome) = self.rewrite_direct(item)? {
            return Ok(outcome);
        }
        self.infer_item(item, holder)
    }

    fn rewrite_component(
        &mut self,
        item: &mut NbtCompound,
    ) -> Result<Option<ItemOutcome>, RewriteError> {
        let Some(components) = item.read_compound_mut("components")? else {
            return Ok(None);
        };
        for field in COMPONENT_ID_FIELDS {
            let Some(id) = components.read_int(field)? else {
                continue;
            };
            let resolution = self.classify(id);
            if resolution.changes_field() {
                components.write_int(field, resolution.value());
            }
            self.record(resolution);
            return Ok(Some(ItemOutcome::Resolved(Encoding::Component)));
        }
        Ok(None)
    }

    fn rewrite_damage(&mut self, item: &mut NbtCompound) -> Result<Option<ItemOutcome>, RewriteError> {
        let Some(id) = item.read_short("Damage")? else {
            return Ok(None);
        };
        let resolution = self.classify(i32::from(id));
        let value = i16::try_from(resolution.value()).map_err(|_| RewriteError::OutOfRange {
            field: "Damage".to_owned(),
            id: resolution.value(),
        })?;
        if resolution.changes_field() {
            item.write_short("Damage", value);
        }
        self.record(resolution);
        Ok(Some(ItemOutcome::Resolved(Encoding::Damage)))
    }

    fn rewrite_tag(&mut self, item: &mut NbtCompound) -> Result<Option<ItemOutcome>, RewriteError> {
        let Some(tag) = item.read_compound_mut("tag")? else {
            return Ok(None);
        };
        let (id, from_alternate) = match tag.read_int("map")? {
            Some(id) => (id, false),
            None => match tag.read_int("map_id")? {
                Some(id) => (id, true),
                None => return Ok(None),
            },
        };

        let resolution = self.classify(id);
        if resolution.changes_field() || from_alternate {
            tag.write_int("map", resolution.value());
            if from_alternate {
                tag.remove_field("map_id");
            }
        }
        self.record(resolution);
        Ok(Some(ItemOutcome::Resolved(Encoding::Tag)))
    }

    fn rewrite_direct(&mut self, item: &mut NbtCompound) -> Result<Option<ItemOutcome>, RewriteError> {
        let id = match item.read_int("map")? {
            Some(id) => id,
            None => match item.read_int("map_id")? {
                Some(id) => id,
                None => return Ok(None),
            },
        };

        let resolution = self.classify(id);
        if resolution.changes_field() || item.has_field("map_id") {
            item.write_int("map", resolution.value());
            item.remove_field("map_id");
        }
        self.record(resolution);
        Ok(Some(ItemOutcome::Resolved(Encoding::Direct)))
    }

    fn infer_item(&mut self, item: &mut NbtCompound, holder: &Holder) -> Result<ItemOutcome, RewriteError> {
        let Some(count_field) = item.physical_name("count") else {
            self.stats.unresolved += 1;
            warn!("Map item without id or stack count, leaving it unchanged");
            return Ok(ItemOutcome::Unresolved);
        };
        let modern = count_field == "count" || item.has_field("components");
        let (container, field, encoding) = if modern {
            ("components", COMPONENT_ID, Encoding::Component)
        } else {
            ("tag", "map", Encoding::Tag)
        };
        // Validate before assigning so a malformed node consumes no memo entry.
        item.read_compound(container)?;

        let key = self.inference.derive_key(item, holder);
        let Some((target, fresh)) = self.inference.assign(&key, self.allocator.target_ids()) else {
            self.stats.unresolved += 1;
            warn!("No map definitions to infer an id from for {key}");
            return Ok(ItemOutcome::Unresolved);
        };
        if !fresh {
            debug!("Reusing inferred target {target} for {key}");
        }

        compound_entry(item, container)?.write_int(field, target);
        self.stats.inferred += 1;
        Ok(ItemOutcome::Inferred(encoding))
    }

    /// Rewrite the id stored directly on a frame entity (`item_id`, `map_id`,
    /// `has_map`, mirrored into `item.components`).
    ///
    /// Returns [`ItemOutcome::NotAMap`] for frames without that layout; their
    /// held item is handled like any other item.
    pub fn rewrite_frame_entity(
        &mut self,
        frame: &mut NbtCompound,
    ) -> Result<ItemOutcome, RewriteError> {
        if !is_frame_entity(frame) {
            return Ok(ItemOutcome::NotAMap);
        }
        let item_id = frame.read_int("item_id")?;
        let has_map = frame.read_bool("has_map")?.unwrap_or(false);
        if item_id.is_none() && !has_map {
            return Ok(ItemOutcome::NotAMap);
        }
        frame.read_int("map_id")?;
        let held_id = match frame.read_compound("item")? {
            Some(item) => component_id(item)?,
            None => None,
        };

        // The held item's component is the reference the item pass already
        // resolved and counted; the frame fields only mirror it.
        if let Some(id) = held_id {
            write_frame_fields(frame, id);
            debug!("Frame fields mirror held map id {id}");
            return Ok(ItemOutcome::Resolved(Encoding::Frame));
        }

        if let Some(id) = item_id {
            let resolution = self.classify(id);
            if resolution.changes_field() {
                write_frame_id(frame, resolution.value())?;
            }
            self.record(resolution);
            return Ok(ItemOutcome::Resolved(Encoding::Frame));
        }

        let key = self.inference.derive_frame_key(frame);
        match self.inference.assign(&key, self.allocator.target_ids()) {
            Some((target, _)) => {
                write_frame_id(frame, target)?;
                self.stats.inferred += 1;
                Ok(ItemOutcome::Inferred(Encoding::Frame))
            }
            None => {
                self.stats.unresolved += 1;
                warn!("Frame at {key} has a map but no id to infer from");
                Ok(ItemOutcome::Unresolved)
            }
        }
    }

    pub(crate) fn visit_frame(&mut self, frame: &mut NbtCompound) -> ItemOutcome {
        match self.rewrite_frame_entity(frame) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.stats.anomalies += 1;
                warn!("Skipping malformed frame entity: {e}");
                ItemOutcome::Anomaly
            }
        }
    }
}

/// Map id in an item's components, whichever spelling is present.
fn component_id(item: &NbtCompound) -> Result<Option<i32>, RewriteError> {
    let Some(components) = item.read_compound("components")? else {
        return Ok(None);
    };
    for field in COMPONENT_ID_FIELDS {
        if let Some(id) = components.read_int(field)? {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

fn write_frame_id(frame: &mut NbtCompound, id: i32) -> Result<(), RewriteError> {
    if let Some(item) = frame.read_compound_mut("item")? {
        compound_entry(item, "components")?.write_int(COMPONENT_ID, id);
    }
    write_frame_fields(frame, id);
    Ok(())
}

fn write_frame_fields(frame: &mut NbtCompound, id: i32) {
    frame.write_int("item_id", id);
    if frame.has_field("map_id") {
        frame.write_int("map_id", id);
    }
    frame.write_bool("has_map", true);
}
