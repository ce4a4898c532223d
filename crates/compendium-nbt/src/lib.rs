//! NBT (Named Binary Tag) implementation for Minecraft Java Edition.
//!
//! Java edition uses a single wire variant: big-endian integers and floats,
//! u16 string lengths and modified UTF-8 strings. [`NbtFile`] adds the
//! gzip/zlib framing used by standalone `.dat` files.

pub mod error;
pub mod file;
mod be;
mod io;
mod mutf8;
pub mod tag;

pub use error::NbtError;
pub use file::{FileCompression, NbtFile};
pub use tag::{NbtCompound, NbtRoot, NbtTag};

use bytes::{Buf, BufMut};

/// Read big-endian NBT from a buffer.
pub fn read_nbt(buf: &mut impl Buf) -> Result<NbtRoot, NbtError> {
    io::read_nbt::<be::BeVariant>(buf)
}

/// Write big-endian NBT to a buffer.
pub fn write_nbt(buf: &mut impl BufMut, root: &NbtRoot) {
    io::write_nbt::<be::BeVariant>(buf, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    fn roundtrip(root: &NbtRoot) {
        let mut buf = BytesMut::new();
        write_nbt(&mut buf, root);
        let decoded = read_nbt(&mut buf.freeze()).unwrap();
        assert_eq!(decoded, *root);
    }

    #[test]
    fn empty_compound() {
        roundtrip(&NbtRoot::new("", NbtCompound::new()));
    }

    #[test]
    fn all_scalar_kinds() {
        let mut c = NbtCompound::new();
        c.insert("b".into(), NbtTag::Byte(-3));
        c.insert("s".into(), NbtTag::Short(-1234));
        c.insert("i".into(), NbtTag::Int(100_000));
        c.insert("l".into(), NbtTag::Long(i64::MIN));
        c.insert("f".into(), NbtTag::Float(3.125));
        c.insert("d".into(), NbtTag::Double(std::f64::consts::PI));
        c.insert("str".into(), NbtTag::String("Map #4".into()));
        roundtrip(&NbtRoot::new("", c));
    }

    #[test]
    fn arrays_and_lists() {
        let mut c = NbtCompound::new();
        c.insert("colors".into(), NbtTag::ByteArray(vec![1, -2, 3]));
        c.insert("UUID".into(), NbtTag::IntArray(vec![1, -2, 3, -4]));
        c.insert("heights".into(), NbtTag::LongArray(vec![0, i64::MAX]));
        c.insert("empty".into(), NbtTag::List(vec![]));
        c.insert(
            "Pos".into(),
            NbtTag::List(vec![
                NbtTag::Double(10.5),
                NbtTag::Double(64.0),
                NbtTag::Double(-2.5),
            ]),
        );
        roundtrip(&NbtRoot::new("", c));
    }

    #[test]
    fn nested_item_structure() {
        let mut tag = NbtCompound::new();
        tag.insert("map".into(), NbtTag::Int(4));
        let mut item = NbtCompound::new();
        item.insert("id".into(), NbtTag::String("minecraft:filled_map".into()));
        item.insert("Count".into(), NbtTag::Byte(1));
        item.insert("tag".into(), NbtTag::Compound(tag));

        let mut c = NbtCompound::new();
        c.insert("Inventory".into(), NbtTag::List(vec![NbtTag::Compound(item)]));
        roundtrip(&NbtRoot::new("", c));
    }

    #[test]
    fn int_is_big_endian() {
        let mut c = NbtCompound::new();
        c.insert("v".into(), NbtTag::Int(1));
        let mut buf = Vec::new();
        write_nbt(&mut buf, &NbtRoot::new("", c));
        // 0A 00 00 | 03 00 01 'v' | 00 00 00 01 | 00
        assert_eq!(
            buf,
            vec![0x0A, 0, 0, 0x03, 0, 1, b'v', 0, 0, 0, 1, 0x00]
        );
    }

    #[test]
    fn end_typed_list_with_length_decodes_empty() {
        // Root { "l": List<End>[3] }
        let data: &[u8] = &[0x0A, 0, 0, 0x09, 0, 1, b'l', 0x00, 0, 0, 0, 3, 0x00];
        let root = read_nbt(&mut &data[..]).unwrap();
        assert_eq!(root.compound["l"], NbtTag::List(vec![]));
    }

    #[test]
    fn reencoding_keeps_entry_order() {
        // Root { "z": Byte 1, "a": Byte 2, "m": Byte 3 }
        let data: &[u8] = &[
            0x0A, 0, 0, //
            0x01, 0, 1, b'z', 1, //
            0x01, 0, 1, b'a', 2, //
            0x01, 0, 1, b'm', 3, //
            0x00,
        ];
        let root = read_nbt(&mut &data[..]).unwrap();
        let keys: Vec<&str> = root.compound.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a", "m"]);

        let mut out = Vec::new();
        write_nbt(&mut out, &root);
        assert_eq!(out, data);
    }

    // -- Error cases --

    #[test]
    fn empty_buffer_error() {
        let data = bytes::Bytes::new();
        assert!(matches!(read_nbt(&mut data.clone()), Err(NbtError::UnexpectedEof)));
    }

    #[test]
    fn wrong_root_type_error() {
        let data = bytes::Bytes::from_static(&[1]);
        assert!(matches!(
            read_nbt(&mut data.clone()),
            Err(NbtError::ExpectedCompound { got: 1 })
        ));
    }

    #[test]
    fn truncated_int_array_error() {
        // Root { "a": IntArray[2] } with only one int present
        let data: &[u8] = &[0x0A, 0, 0, 0x0B, 0, 1, b'a', 0, 0, 0, 2, 0, 0, 0, 1];
        assert!(matches!(read_nbt(&mut &data[..]), Err(NbtError::UnexpectedEof)));
    }
}
