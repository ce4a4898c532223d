//! Traversal of chunk, entity-chunk, player and level trees.
//!
//! Every list that can hold an item-bearing entity is visited, across all the
//! layouts a world may contain. Some layouts make the same node reachable
//! twice; rewriting is idempotent so that is harmless.

use compendium_nbt::{NbtCompound, NbtTag};

use crate::heuristic::Holder;
use crate::rewriter::is_frame_entity;
use crate::schema::SchemaFields;
use crate::session::RemapSession;

/// Entity and block-entity lists nested under the pre-1.18 `Level` compound.
const LEVEL_LISTS: [(&str, &str); 4] = [
    ("Level", "TileEntities"),
    ("Level", "Entities"),
    ("level", "tile_entities"),
    ("level", "entities"),
];

/// Lists at the root of a 1.18+ chunk.
const ROOT_LISTS: [&str; 4] = ["block_entities", "tile_entities", "entities", "Entities"];

/// Lists at the root of an entity chunk (`entities/*.mca`).
const ENTITY_CHUNK_LISTS: [&str; 2] = ["Entities", "entities"];

/// Single held items.
const ITEM_FIELDS: [&str; 5] = ["Item", "item", "SaddleItem", "ArmorItem", "body_armor_item"];

/// Item collections: lists of items, or compounds of slot name to item.
const ITEM_COLLECTIONS: [&str; 9] = [
    "Items",
    "items",
    "Inventory",
    "EnderItems",
    "HandItems",
    "ArmorItems",
    "hand_items",
    "armor_items",
    "equipment",
];

fn compound_mut<'a>(node: &'a mut NbtCompound, key: &str) -> Option<&'a mut NbtCompound> {
    node.get_mut(key).and_then(NbtTag::as_compound_mut)
}

fn list_mut<'a>(node: &'a mut NbtCompound, key: &str) -> Option<&'a mut Vec<NbtTag>> {
    node.get_mut(key).and_then(NbtTag::as_list_mut)
}

impl RemapSession {
    /// Rewrite every map reference in a terrain chunk. Returns the number of
    /// entities and block entities visited.
    pub fn remap_chunk(&mut self, chunk: &mut NbtCompound) -> usize {
        let mut visited = 0;
        for (level, list) in LEVEL_LISTS {
            if let Some(entities) = compound_mut(chunk, level).and_then(|l| list_mut(l, list)) {
                visited += self.remap_entities(entities);
            }
        }
        for list in ROOT_LISTS {
            if let Some(entities) = list_mut(chunk, list) {
                visited += self.remap_entities(entities);
            }
        }
        self.remap_frames(chunk);
        visited
    }

    /// Rewrite every map reference in an entity chunk.
    pub fn remap_entity_chunk(&mut self, chunk: &mut NbtCompound) -> usize {
        let mut visited = 0;
        for list in ENTITY_CHUNK_LISTS {
            if let Some(entities) = list_mut(chunk, list) {
                visited += self.remap_entities(entities);
            }
        }
        self.remap_frames(chunk);
        visited
    }

    /// Rewrite the inventories of a player file.
    pub fn remap_player(&mut self, player: &mut NbtCompound) {
        self.remap_entity(player);
    }

    /// Rewrite the single-player inventory embedded in `level.dat`.
    pub fn remap_level(&mut self, level: &mut NbtCompound) {
        if let Some(player) = compound_mut(level, "Data").and_then(|d| compound_mut(d, "Player")) {
            self.remap_player(player);
        }
    }

    pub fn remap_entities(&mut self, entities: &mut [NbtTag]) -> usize {
        let mut visited = 0;
        for entity in entities.iter_mut().filter_map(NbtTag::as_compound_mut) {
            self.remap_entity(entity);
            visited += 1;
        }
        visited
    }

    /// Rewrite every item an entity or block entity holds, including riders.
    pub fn remap_entity(&mut self, entity: &mut NbtCompound) {
        let holder = Holder::of_entity(entity);

        for field in ITEM_FIELDS {
            if let Some(item) = compound_mut(entity, field) {
                self.remap_item_tree(item, &holder, field.to_owned());
            }
        }
        for field in ITEM_COLLECTIONS {
            if let Some(collection) = entity.get_mut(field) {
                self.remap_item_collection(collection, field, &holder);
            }
        }
        if let Some(passengers) = list_mut(entity, "Passengers") {
            self.remap_entities(passengers);
        }
    }

    fn remap_item_collection(&mut self, collection: &mut NbtTag, name: &str, holder: &Holder) {
        match collection {
            NbtTag::List(items) => self.remap_item_list(items, name, holder),
            NbtTag::Compound(slots) => {
                for (slot, item) in slots.iter_mut() {
                    if let Some(item) = item.as_compound_mut() {
                        self.remap_item_tree(item, holder, format!("{name}:{slot}"));
                    }
                }
            }
            _ => {}
        }
    }

    fn remap_item_list(&mut self, items: &mut [NbtTag], name: &str, holder: &Holder) {
        for (index, item) in items.iter_mut().enumerate() {
            let Some(item) = item.as_compound_mut() else {
                continue;
            };
            let slot = item.read_int("Slot").ok().flatten().map_or(index as i64, i64::from);
            self.remap_item_tree(item, holder, format!("{name}:{slot}"));
        }
    }

    /// Rewrite an item and any items stored inside it. `place` names where
    /// the item sits in its holder and anchors the items it contains.
    fn remap_item_tree(&mut self, item: &mut NbtCompound, holder: &Holder, place: String) {
        self.visit_item(item, holder);
        let nested = holder.inside(place);

        if let Ok(Some(tag)) = item.read_compound_mut("tag") {
            if let Some(items) = compound_mut(tag, "BlockEntityTag").and_then(|b| list_mut(b, "Items")) {
                self.remap_item_list(items, "Items", &nested);
            }
        }

        let Ok(Some(components)) = item.read_compound_mut("components") else {
            return;
        };
        if let Some(slots) = list_mut(components, "minecraft:container") {
            for (index, entry) in slots.iter_mut().enumerate() {
                let Some(entry) = entry.as_compound_mut() else {
                    continue;
                };
                let slot = entry.read_int("slot").ok().flatten().map_or(index as i64, i64::from);
                if let Some(inner) = compound_mut(entry, "item") {
                    self.remap_item_tree(inner, &nested.inside(format!("container:{slot}")), "item".to_owned());
                }
            }
        }
        if let Some(bundle) = list_mut(components, "minecraft:bundle_contents") {
            for (index, inner) in bundle.iter_mut().enumerate() {
                if let Some(inner) = inner.as_compound_mut() {
                    self.remap_item_tree(inner, &nested.inside(format!("bundle:{index}")), "item".to_owned());
                }
            }
        }
    }

    /// Frame pass: the map fields stored on frame entities themselves, in
    /// every entity list of the chunk. Held items were already visited by the
    /// entity walk.
    fn remap_frames(&mut self, chunk: &mut NbtCompound) {
        if let Some(entities) = compound_mut(chunk, "Level").and_then(|l| list_mut(l, "Entities")) {
            self.remap_frame_list(entities);
        }
        if let Some(entities) = compound_mut(chunk, "level").and_then(|l| list_mut(l, "entities")) {
            self.remap_frame_list(entities);
        }
        for list in ENTITY_CHUNK_LISTS {
            if let Some(entities) = list_mut(chunk, list) {
                self.remap_frame_list(entities);
            }
        }
    }

    fn remap_frame_list(&mut self, entities: &mut [NbtTag]) {
        for frame in entities
            .iter_mut()
            .filter_map(NbtTag::as_compound_mut)
            .filter(|e| is_frame_entity(e))
        {
            self.visit_frame(frame);
        }
    }
}
