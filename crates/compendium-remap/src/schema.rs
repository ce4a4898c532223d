//! Field access that tolerates both naming eras.
//!
//! Older saves spell fields in PascalCase (`ItemRotation`, `TileX`), newer
//! ones in snake_case (`item_rotation`, `tile_x`). Callers use one logical
//! name and the accessors try the verbatim name first, then the other
//! convention. Namespaced keys (`minecraft:map_id`) are only tried verbatim.

use compendium_nbt::{NbtCompound, NbtTag};

use crate::error::RewriteError;

/// The other casing convention of `name`, if it has one.
pub fn alternate_name(name: &str) -> Option<String> {
    if name.is_empty() || name.contains(':') {
        return None;
    }
    let alternate = if name.starts_with(|c: char| c.is_ascii_uppercase()) {
        to_snake_case(name)
    } else {
        to_pascal_case(name)
    };
    (alternate != name).then_some(alternate)
}

/// Physical names to try for a logical field, in order.
pub fn candidate_names(name: &str) -> Vec<String> {
    let mut names = vec![name.to_owned()];
    names.extend(alternate_name(name));
    names
}

fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower)
            {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

fn to_pascal_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn mismatch(field: &str, expected: &'static str, found: &NbtTag) -> RewriteError {
    RewriteError::UnexpectedType {
        field: field.to_owned(),
        expected,
        found: found.type_name(),
    }
}

/// Dual-convention typed accessors on a compound.
///
/// Reads return `Ok(None)` when neither spelling is present and an error
/// when the field exists with an incompatible type.
pub trait SchemaFields {
    /// The physical key under which `name` is present.
    fn physical_name(&self, name: &str) -> Option<String>;
    fn field(&self, name: &str) -> Option<&NbtTag>;
    fn field_mut(&mut self, name: &str) -> Option<&mut NbtTag>;

    fn has_field(&self, name: &str) -> bool {
        self.physical_name(name).is_some()
    }

    fn read_string(&self, name: &str) -> Result<Option<&str>, RewriteError> {
        match self.field(name) {
            None => Ok(None),
            Some(NbtTag::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(mismatch(name, "string", other)),
        }
    }

    /// Integers narrower than an int are widened.
    fn read_int(&self, name: &str) -> Result<Option<i32>, RewriteError> {
        match self.field(name) {
            None => Ok(None),
            Some(NbtTag::Int(v)) => Ok(Some(*v)),
            Some(NbtTag::Short(v)) => Ok(Some(*v as i32)),
            Some(NbtTag::Byte(v)) => Ok(Some(*v as i32)),
            Some(other) => Err(mismatch(name, "int", other)),
        }
    }

    fn read_short(&self, name: &str) -> Result<Option<i16>, RewriteError> {
        match self.field(name) {
            None => Ok(None),
            Some(NbtTag::Short(v)) => Ok(Some(*v)),
            Some(NbtTag::Byte(v)) => Ok(Some(*v as i16)),
            Some(other) => Err(mismatch(name, "short", other)),
        }
    }

    fn read_byte(&self, name: &str) -> Result<Option<i8>, RewriteError> {
        match self.field(name) {
            None => Ok(None),
            Some(NbtTag::Byte(v)) => Ok(Some(*v)),
            Some(other) => Err(mismatch(name, "byte", other)),
        }
    }

    fn read_bool(&self, name: &str) -> Result<Option<bool>, RewriteError> {
        Ok(self.read_byte(name)?.map(|b| b != 0))
    }

    fn read_int_array(&self, name: &str) -> Result<Option<&[i32]>, RewriteError> {
        match self.field(name) {
            None => Ok(None),
            Some(NbtTag::IntArray(v)) => Ok(Some(v.as_slice())),
            Some(other) => Err(mismatch(name, "int array", other)),
        }
    }

    fn read_compound(&self, name: &str) -> Result<Option<&NbtCompound>, RewriteError> {
        match self.field(name) {
            None => Ok(None),
            Some(NbtTag::Compound(c)) => Ok(Some(c)),
            Some(other) => Err(mismatch(name, "compound", other)),
        }
    }

    fn read_compound_mut(&mut self, name: &str) -> Result<Option<&mut NbtCompound>, RewriteError> {
        match self.field_mut(name) {
            None => Ok(None),
            Some(NbtTag::Compound(c)) => Ok(Some(c)),
            Some(other) => Err(mismatch(name, "compound", other)),
        }
    }

    fn read_list(&self, name: &str) -> Result<Option<&[NbtTag]>, RewriteError> {
        match self.field(name) {
            None => Ok(None),
            Some(NbtTag::List(l)) => Ok(Some(l.as_slice())),
            Some(other) => Err(mismatch(name, "list", other)),
        }
    }

    fn read_list_mut(&mut self, name: &str) -> Result<Option<&mut Vec<NbtTag>>, RewriteError> {
        match self.field_mut(name) {
            None => Ok(None),
            Some(NbtTag::List(l)) => Ok(Some(l)),
            Some(other) => Err(mismatch(name, "list", other)),
        }
    }

    fn write_tag(&mut self, name: &str, value: NbtTag);

    fn write_int(&mut self, name: &str, value: i32) {
        self.write_tag(name, NbtTag::Int(value));
    }

    fn write_short(&mut self, name: &str, value: i16) {
        self.write_tag(name, NbtTag::Short(value));
    }

    fn write_bool(&mut self, name: &str, value: bool) {
        self.write_tag(name, NbtTag::Byte(value as i8));
    }

    /// Remove whichever spelling of `name` is present.
    fn remove_field(&mut self, name: &str) -> Option<NbtTag>;
}

impl SchemaFields for NbtCompound {
    fn physical_name(&self, name: &str) -> Option<String> {
        candidate_names(name)
            .into_iter()
            .find(|candidate| self.contains_key(candidate))
    }

    fn field(&self, name: &str) -> Option<&NbtTag> {
        let key = self.physical_name(name)?;
        self.get(&key)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut NbtTag> {
        let key = self.physical_name(name)?;
        self.get_mut(&key)
    }

    /// Overwrites the present spelling, else inserts the logical name.
    fn write_tag(&mut self, name: &str, value: NbtTag) {
        let key = self.physical_name(name).unwrap_or_else(|| name.to_owned());
        self.insert(key, value);
    }

    fn remove_field(&mut self, name: &str) -> Option<NbtTag> {
        let key = self.physical_name(name)?;
        self.shift_remove(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternate_names() {
        assert_eq!(alternate_name("ItemRotation").as_deref(), Some("item_rotation"));
        assert_eq!(alternate_name("item_rotation").as_deref(), Some("ItemRotation"));
        assert_eq!(alternate_name("TileX").as_deref(), Some("tile_x"));
        assert_eq!(alternate_name("UUID").as_deref(), Some("uuid"));
        assert_eq!(alternate_name("UUIDMost").as_deref(), Some("uuid_most"));
        assert_eq!(alternate_name("map").as_deref(), Some("Map"));
        assert_eq!(alternate_name("minecraft:map_id"), None);
        assert_eq!(alternate_name(""), None);
    }

    #[test]
    fn candidates_start_with_verbatim() {
        assert_eq!(candidate_names("Damage"), vec!["Damage", "damage"]);
        assert_eq!(candidate_names("minecraft:map_id"), vec!["minecraft:map_id"]);
    }

    #[test]
    fn reads_either_convention() {
        let mut node = NbtCompound::new();
        node.insert("item_rotation".into(), NbtTag::Byte(3));
        node.insert("Facing".into(), NbtTag::Byte(2));
        assert_eq!(node.read_int("ItemRotation").unwrap(), Some(3));
        assert_eq!(node.read_byte("facing").unwrap(), Some(2));
        assert_eq!(node.read_int("missing").unwrap(), None);
    }

    #[test]
    fn verbatim_name_wins() {
        let mut node = NbtCompound::new();
        node.insert("count".into(), NbtTag::Int(1));
        node.insert("Count".into(), NbtTag::Byte(5));
        assert_eq!(node.physical_name("count").as_deref(), Some("count"));
        assert_eq!(node.physical_name("Count").as_deref(), Some("Count"));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let mut node = NbtCompound::new();
        node.insert("map".into(), NbtTag::String("four".into()));
        assert_eq!(
            node.read_int("map"),
            Err(RewriteError::UnexpectedType {
                field: "map".into(),
                expected: "int",
                found: "String",
            })
        );
    }

    #[test]
    fn writers_reuse_present_spelling() {
        let mut node = NbtCompound::new();
        node.insert("Map".into(), NbtTag::Int(1));
        node.write_int("map", 9);
        assert_eq!(node.get("Map"), Some(&NbtTag::Int(9)));
        assert!(!node.contains_key("map"));

        node.write_bool("has_map", true);
        assert_eq!(node.get("has_map"), Some(&NbtTag::Byte(1)));

        assert_eq!(node.remove_field("map"), Some(NbtTag::Int(9)));
        assert!(node.read_int("map").unwrap().is_none());
    }
}
