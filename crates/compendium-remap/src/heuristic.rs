//! Stand-in identities for map items that carry no id at all.
//!
//! A key is derived from whatever locates the item (position, slot, holder,
//! rotation) and is memoized to a target id for the rest of the run, so two
//! visits to the same physical item always agree.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use compendium_nbt::{NbtCompound, NbtTag};
use tracing::debug;

use crate::schema::SchemaFields;

/// Derived identity of an item location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeuristicKey(String);

impl HeuristicKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HeuristicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What is known about the entity or block entity holding an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Holder {
    pub position: Option<[i32; 3]>,
    pub identity: Option<String>,
    pub rotation: Option<i32>,
    /// Places of the container items enclosing this one, outermost first.
    pub nesting: Vec<String>,
}

impl Holder {
    /// Context for items held directly by `node`.
    pub fn of_entity(node: &NbtCompound) -> Self {
        Self {
            position: position_of(node),
            identity: identity_of(node),
            rotation: node.read_int("ItemRotation").ok().flatten(),
            nesting: Vec::new(),
        }
    }

    /// Context for items stored inside the container item at `place`.
    pub fn inside(&self, place: impl Into<String>) -> Self {
        let mut holder = self.clone();
        holder.nesting.push(place.into());
        holder
    }

    fn nesting_suffix(&self) -> String {
        self.nesting.iter().map(|place| format!("/in:{place}")).collect()
    }

    fn anchor(&self) -> Option<String> {
        let base = match (&self.position, &self.identity) {
            (Some([x, y, z]), _) => Some(format!("{x},{y},{z}")),
            (None, Some(id)) => Some(id.clone()),
            (None, None) => None,
        };
        let nesting = self.nesting_suffix();
        match base {
            Some(base) => Some(base + &nesting),
            None if nesting.is_empty() => None,
            None => Some(nesting.trim_start_matches('/').to_owned()),
        }
    }
}

fn int_triple(node: &NbtCompound, names: [&str; 3]) -> Option<[i32; 3]> {
    let x = node.read_int(names[0]).ok()??;
    let y = node.read_int(names[1]).ok()??;
    let z = node.read_int(names[2]).ok()??;
    Some([x, y, z])
}

/// Block position of a node, from any of the position layouts in use.
pub fn position_of(node: &NbtCompound) -> Option<[i32; 3]> {
    if let Ok(Some(&[x, y, z, ..])) = node.read_int_array("pos") {
        return Some([x, y, z]);
    }
    if let Some(pos) = int_triple(node, ["x", "y", "z"]) {
        return Some(pos);
    }
    if let Some(pos) = int_triple(node, ["TileX", "TileY", "TileZ"]) {
        return Some(pos);
    }
    match node.read_list("Pos") {
        Ok(Some([NbtTag::Double(x), NbtTag::Double(y), NbtTag::Double(z), ..])) => {
            Some([x.floor() as i32, y.floor() as i32, z.floor() as i32])
        }
        _ => None,
    }
}

/// Stable identity string of an entity: its UUID as hex.
pub fn identity_of(node: &NbtCompound) -> Option<String> {
    match node.field("UUID") {
        Some(NbtTag::IntArray(words)) if !words.is_empty() => {
            return Some(words.iter().map(|w| format!("{:08x}", *w as u32)).collect());
        }
        Some(NbtTag::String(s)) if !s.is_empty() => return Some(s.clone()),
        _ => {}
    }
    match (node.field("UUIDMost"), node.field("UUIDLeast")) {
        (Some(NbtTag::Long(most)), Some(NbtTag::Long(least))) => {
            Some(format!("{:016x}{:016x}", *most as u64, *least as u64))
        }
        _ => None,
    }
}

/// Per-run memo of heuristic keys to target ids.
#[derive(Debug, Default)]
pub struct HeuristicInference {
    memo: HashMap<HeuristicKey, i32>,
    cursor: usize,
    rolling: i64,
}

impl HeuristicInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a key for an id-less item.
    pub fn derive_key(&mut self, item: &NbtCompound, holder: &Holder) -> HeuristicKey {
        if let Ok(Some(&[x, y, z, ..])) = item.read_int_array("pos") {
            return key(format!("pos:{x},{y},{z}"));
        }
        if let Some([x, y, z]) = int_triple(item, ["x", "y", "z"]) {
            return key(format!("pos:{x},{y},{z}"));
        }

        let entity_data = item.read_compound("entity_data").ok().flatten();
        if let Some([x, y, z]) = entity_data.and_then(position_of) {
            return key(format!("entity_pos:{x},{y},{z}"));
        }

        if let Ok(Some(slot)) = item.read_int("Slot") {
            return match holder.anchor() {
                Some(anchor) => key(format!("holder:{anchor}/slot:{slot}")),
                None => key(format!("slot:{slot}")),
            };
        }
        if let Some([x, y, z]) = holder.position {
            let rotation = holder.rotation.unwrap_or(0);
            let nesting = holder.nesting_suffix();
            return key(format!("holder_pos:{x},{y},{z}{nesting}/rot:{rotation}"));
        }

        if let Some(uuid) = entity_data.and_then(identity_of) {
            return key(format!("uuid:{uuid}"));
        }
        if let Some(uuid) = &holder.identity {
            return key(format!("uuid:{uuid}{}", holder.nesting_suffix()));
        }
        let rotation = entity_data
            .and_then(|data| data.read_int("ItemRotation").ok().flatten())
            .or(holder.rotation);
        if let Some(rotation) = rotation {
            return key(format!("rotation:{rotation}"));
        }

        let count = item.read_int("count").ok().flatten().unwrap_or(0) as i64;
        let damage = item.read_int("damage").ok().flatten().unwrap_or(0) as i64;
        let repair_cost = item.read_int("RepairCost").ok().flatten().unwrap_or(0) as i64;
        let meta = count + damage * 10 + repair_cost * 100 + self.rolling;
        self.rolling += 1;
        key(format!("meta:{meta}"))
    }

    /// Key for a frame that claims to hold a map but names no id.
    pub fn derive_frame_key(&self, frame: &NbtCompound) -> HeuristicKey {
        let pos = position_of(frame)
            .map(|[x, y, z]| format!("{x},{y},{z}"))
            .unwrap_or_else(|| "unknown".to_owned());
        let rotation = frame.read_int("ItemRotation").ok().flatten().unwrap_or(0);
        let facing = frame.read_int("Facing").ok().flatten().unwrap_or(0);
        key(format!("frame:{pos}/rot:{rotation}/facing:{facing}"))
    }

    /// Target id for `key`, assigning the next known target id on first sight.
    ///
    /// Returns the id and whether this call made the assignment, or `None`
    /// when there are no target ids to choose from.
    pub fn assign(&mut self, key: &HeuristicKey, targets: &BTreeSet<i32>) -> Option<(i32, bool)> {
        if let Some(&id) = self.memo.get(key) {
            return Some((id, false));
        }
        let id = *targets.iter().nth(self.cursor % targets.len().max(1))?;
        self.cursor += 1;
        self.memo.insert(key.clone(), id);
        debug!("Inferred target {id} for {key}");
        Some((id, true))
    }

    /// Number of keys assigned so far.
    pub fn allocations(&self) -> usize {
        self.memo.len()
    }
}

fn key(s: String) -> HeuristicKey {
    HeuristicKey(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(ids: &[i32]) -> BTreeSet<i32> {
        ids.iter().copied().collect()
    }

    fn item_at(x: i32, y: i32, z: i32) -> NbtCompound {
        let mut item = NbtCompound::new();
        item.insert("id".into(), "minecraft:filled_map".into());
        item.insert("count".into(), NbtTag::Int(1));
        item.insert("x".into(), NbtTag::Int(x));
        item.insert("y".into(), NbtTag::Int(y));
        item.insert("z".into(), NbtTag::Int(z));
        item
    }

    #[test]
    fn position_key_is_memoized() {
        let mut inference = HeuristicInference::new();
        let ids = targets(&[0, 1, 2]);
        let item = item_at(10, 64, -3);

        let k1 = inference.derive_key(&item, &Holder::default());
        let k2 = inference.derive_key(&item, &Holder::default());
        assert_eq!(k1.as_str(), "pos:10,64,-3");
        assert_eq!(k1, k2);

        assert_eq!(inference.assign(&k1, &ids), Some((0, true)));
        assert_eq!(inference.assign(&k2, &ids), Some((0, false)));
        assert_eq!(inference.allocations(), 1);
    }

    #[test]
    fn distinct_keys_cycle_through_targets() {
        let mut inference = HeuristicInference::new();
        let ids = targets(&[3, 8]);
        let picks: Vec<i32> = ["a", "b", "c"]
            .iter()
            .map(|k| inference.assign(&key((*k).into()), &ids).unwrap().0)
            .collect();
        assert_eq!(picks, vec![3, 8, 3]);
    }

    #[test]
    fn no_targets_means_no_assignment() {
        let mut inference = HeuristicInference::new();
        assert_eq!(inference.assign(&key("x".into()), &BTreeSet::new()), None);
        assert_eq!(inference.allocations(), 0);
    }

    #[test]
    fn slot_is_anchored_to_holder() {
        let mut inference = HeuristicInference::new();
        let mut item = NbtCompound::new();
        item.insert("Slot".into(), NbtTag::Byte(4));

        let chest = Holder {
            position: Some([1, 2, 3]),
            ..Holder::default()
        };
        assert_eq!(
            inference.derive_key(&item, &chest).as_str(),
            "holder:1,2,3/slot:4"
        );
        assert_eq!(inference.derive_key(&item, &Holder::default()).as_str(), "slot:4");
    }

    #[test]
    fn nested_slots_are_told_apart() {
        let mut inference = HeuristicInference::new();
        let mut item = NbtCompound::new();
        item.insert("Slot".into(), NbtTag::Byte(0));

        let chest = Holder {
            position: Some([1, 2, 3]),
            ..Holder::default()
        };
        let first = inference.derive_key(&item, &chest.inside("Items:0"));
        let second = inference.derive_key(&item, &chest.inside("Items:1"));
        assert_eq!(first.as_str(), "holder:1,2,3/in:Items:0/slot:0");
        assert_ne!(first, second);
        assert_eq!(
            inference.derive_key(&item, &Holder::default().inside("Items:5")).as_str(),
            "holder:in:Items:5/slot:0"
        );
    }

    #[test]
    fn entity_data_position_and_identity() {
        let mut inference = HeuristicInference::new();
        let mut data = NbtCompound::new();
        data.insert("UUID".into(), NbtTag::IntArray(vec![1, 2, 3, -1]));
        let mut item = NbtCompound::new();
        item.insert("entity_data".into(), NbtTag::Compound(data.clone()));
        assert_eq!(
            inference.derive_key(&item, &Holder::default()).as_str(),
            "uuid:000000010000000200000003ffffffff"
        );

        data.insert("TileX".into(), NbtTag::Int(5));
        data.insert("TileY".into(), NbtTag::Int(6));
        data.insert("TileZ".into(), NbtTag::Int(7));
        item.insert("entity_data".into(), NbtTag::Compound(data));
        assert_eq!(
            inference.derive_key(&item, &Holder::default()).as_str(),
            "entity_pos:5,6,7"
        );
    }

    #[test]
    fn holder_from_entity_pos_doubles() {
        let mut frame = NbtCompound::new();
        frame.insert(
            "Pos".into(),
            NbtTag::List(vec![
                NbtTag::Double(10.5),
                NbtTag::Double(64.0),
                NbtTag::Double(-2.5),
            ]),
        );
        frame.insert("ItemRotation".into(), NbtTag::Byte(2));
        let holder = Holder::of_entity(&frame);
        assert_eq!(holder.position, Some([10, 64, -3]));
        assert_eq!(holder.rotation, Some(2));
    }

    #[test]
    fn rolling_key_changes_each_time() {
        let mut inference = HeuristicInference::new();
        let mut item = NbtCompound::new();
        item.insert("count".into(), NbtTag::Int(1));
        let a = inference.derive_key(&item, &Holder::default());
        let b = inference.derive_key(&item, &Holder::default());
        assert_ne!(a, b);
    }

    #[test]
    fn frame_key_uses_tile_rotation_and_facing() {
        let inference = HeuristicInference::new();
        let mut frame = NbtCompound::new();
        frame.insert("TileX".into(), NbtTag::Int(1));
        frame.insert("TileY".into(), NbtTag::Int(70));
        frame.insert("TileZ".into(), NbtTag::Int(-9));
        frame.insert("Facing".into(), NbtTag::Byte(3));
        assert_eq!(
            inference.derive_frame_key(&frame).as_str(),
            "frame:1,70,-9/rot:0/facing:3"
        );
    }
}
