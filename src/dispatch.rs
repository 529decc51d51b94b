// nrbf-parser - A high-performance MS-NRBF binary parser and encoder.
// Copyright (C) 2026  driedpampas@proton.me
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! The record dispatcher: peeks the next tag byte, builds the matching
//! record variant, and (recursively, through the variant's own parser)
//! reads its payload off the cursor.

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::primitive;
use crate::records::*;
use crate::registry::{ClassLayoutRegistry, Layout};

/// Reads the next record. Never consumes the tag byte itself before
/// dispatch — each variant parser re-reads and asserts its own tag, so
/// `next` is idempotent with respect to `peek` (§4.3).
pub fn next(cursor: &mut ByteCursor, registry: &mut ClassLayoutRegistry) -> Result<Record> {
    let pos = cursor.position() as usize;
    let tag_byte = cursor.peek()?;
    let tag = RecordTag::try_from(tag_byte).map_err(|tag| Error::UnknownRecord { tag, pos })?;
    log::trace!("dispatch: tag={:?} at offset {}", tag, pos);
    match tag {
        RecordTag::SerializationHeader => parse_serialization_header(cursor),
        RecordTag::BinaryLibrary => parse_binary_library(cursor),
        RecordTag::ClassWithMembersAndTypes => parse_class_with_members_and_types(cursor, registry),
        RecordTag::SystemClassWithMembersAndTypes => {
            parse_system_class_with_members_and_types(cursor, registry)
        }
        RecordTag::SystemClassWithMembers => parse_system_class_with_members(cursor, registry),
        RecordTag::ClassWithId => parse_class_with_id(cursor, registry),
        RecordTag::BinaryObjectString => parse_binary_object_string(cursor),
        RecordTag::BinaryArray => parse_binary_array(cursor, registry),
        RecordTag::MemberPrimitiveTyped => parse_member_primitive_typed(cursor),
        RecordTag::MemberReference => parse_member_reference(cursor),
        RecordTag::ObjectNull => parse_object_null(cursor),
        RecordTag::MessageEnd => parse_message_end(cursor),
        RecordTag::ObjectNullMultiple256 => parse_object_null_multiple_256(cursor),
        RecordTag::ArraySinglePrimitive => parse_array_single_primitive(cursor),
        RecordTag::ArraySingleObject => parse_array_single_object(cursor, registry),
        RecordTag::ArraySingleString => parse_array_single_string(cursor, registry),
    }
}

fn expect_tag(cursor: &mut ByteCursor, expected: RecordTag) -> Result<()> {
    let pos = cursor.position() as usize;
    let got = cursor.read_u8()?;
    if got != expected as u8 {
        return Err(Error::RecordTagMismatch {
            expected: expected as u8,
            got,
            pos,
        });
    }
    Ok(())
}

fn parse_serialization_header(cursor: &mut ByteCursor) -> Result<Record> {
    expect_tag(cursor, RecordTag::SerializationHeader)?;
    Ok(Record::SerializationHeader(SerializationHeader {
        root_id: cursor.read_i32()?,
        header_id: cursor.read_i32()?,
        major_version: cursor.read_i32()?,
        minor_version: cursor.read_i32()?,
    }))
}

fn parse_binary_library(cursor: &mut ByteCursor) -> Result<Record> {
    expect_tag(cursor, RecordTag::BinaryLibrary)?;
    Ok(Record::BinaryLibrary(BinaryLibrary {
        library_id: cursor.read_i32()?,
        library_name: cursor.read_var_string()?,
    }))
}

fn parse_binary_object_string(cursor: &mut ByteCursor) -> Result<Record> {
    expect_tag(cursor, RecordTag::BinaryObjectString)?;
    Ok(Record::BinaryObjectString {
        object_id: cursor.read_i32()?,
        value: cursor.read_var_string()?,
    })
}

fn parse_member_primitive_typed(cursor: &mut ByteCursor) -> Result<Record> {
    expect_tag(cursor, RecordTag::MemberPrimitiveTyped)?;
    let kind = primitive::read_kind(cursor)?;
    let value = primitive::read_value(cursor, kind)?;
    Ok(Record::MemberPrimitiveTyped { kind, value })
}

fn parse_member_reference(cursor: &mut ByteCursor) -> Result<Record> {
    expect_tag(cursor, RecordTag::MemberReference)?;
    Ok(Record::MemberReference {
        id_ref: cursor.read_i32()?,
    })
}

fn parse_object_null(cursor: &mut ByteCursor) -> Result<Record> {
    expect_tag(cursor, RecordTag::ObjectNull)?;
    Ok(Record::ObjectNull)
}

fn parse_message_end(cursor: &mut ByteCursor) -> Result<Record> {
    expect_tag(cursor, RecordTag::MessageEnd)?;
    Ok(Record::MessageEnd)
}

fn parse_object_null_multiple_256(cursor: &mut ByteCursor) -> Result<Record> {
    expect_tag(cursor, RecordTag::ObjectNullMultiple256)?;
    Ok(Record::ObjectNullMultiple256(ObjectNullMultiple256 {
        null_count: cursor.read_u8()?,
    }))
}

fn read_class_info(cursor: &mut ByteCursor) -> Result<ClassInfo> {
    let object_id = cursor.read_i32()?;
    let name = cursor.read_var_string()?;
    let member_count = cursor.read_i32()?;
    let mut member_names = Vec::with_capacity(member_count.max(0) as usize);
    for _ in 0..member_count {
        member_names.push(cursor.read_var_string()?);
    }
    Ok(ClassInfo {
        object_id,
        name,
        member_count,
        member_names,
    })
}

fn read_additional_info(cursor: &mut ByteCursor, bin_type: BinaryTypeKind) -> Result<AdditionalInfo> {
    Ok(match bin_type {
        BinaryTypeKind::Primitive | BinaryTypeKind::PrimitiveArray => {
            AdditionalInfo::Primitive(primitive::read_kind(cursor)?)
        }
        BinaryTypeKind::SystemClass => AdditionalInfo::SystemClass(cursor.read_var_string()?),
        BinaryTypeKind::Class => AdditionalInfo::Class(ClassTypeInfo {
            library_name: cursor.read_var_string()?,
            library_id: cursor.read_i32()?,
        }),
        BinaryTypeKind::String
        | BinaryTypeKind::Object
        | BinaryTypeKind::ObjectArray
        | BinaryTypeKind::StringArray => AdditionalInfo::None,
    })
}

fn read_member_type_info(cursor: &mut ByteCursor, count: i32) -> Result<MemberTypeInfo> {
    let count = count.max(0) as usize;
    let mut bin_types = Vec::with_capacity(count);
    for _ in 0..count {
        let pos = cursor.position() as usize;
        let byte = cursor.read_u8()?;
        bin_types.push(BinaryTypeKind::try_from(byte).map_err(|kind| Error::BadPrimitive { kind, pos })?);
    }
    let mut additional_info = Vec::with_capacity(count);
    for &bt in &bin_types {
        additional_info.push(read_additional_info(cursor, bt)?);
    }
    Ok(MemberTypeInfo {
        bin_types,
        additional_info,
    })
}

/// Reads a single member/element value. `Class` is read the same way as
/// `Object`/`String`/etc. — a nested record via the dispatcher — unlike
/// the lineage decoder, which left `BinaryTypeKind::Class` unimplemented.
fn read_member_value(
    cursor: &mut ByteCursor,
    registry: &mut ClassLayoutRegistry,
    bin_type: BinaryTypeKind,
    add_info: &AdditionalInfo,
) -> Result<MemberValue> {
    match bin_type {
        BinaryTypeKind::Primitive => {
            let AdditionalInfo::Primitive(kind) = add_info else {
                return Err(Error::UnsupportedFeature {
                    detail: "Primitive member without a PrimitiveKind in its additional info"
                        .to_string(),
                    pos: cursor.position() as usize,
                });
            };
            Ok(MemberValue::Primitive(primitive::read_value(cursor, *kind)?))
        }
        _ => Ok(MemberValue::Record(Box::new(next(cursor, registry)?))),
    }
}

fn read_all_member_values(
    cursor: &mut ByteCursor,
    registry: &mut ClassLayoutRegistry,
    class_info: &ClassInfo,
    member_type_info: Option<&MemberTypeInfo>,
) -> Result<Vec<MemberValue>> {
    let mut values = Vec::with_capacity(class_info.member_count.max(0) as usize);
    for i in 0..class_info.member_count {
        match member_type_info {
            Some(mti) => {
                let bt = mti.bin_types[i as usize];
                let add_info = &mti.additional_info[i as usize];
                values.push(read_member_value(cursor, registry, bt, add_info)?);
            }
            None => values.push(MemberValue::Record(Box::new(next(cursor, registry)?))),
        }
    }
    Ok(values)
}

/// Reads `count` array/member-array elements of the given declared type,
/// expanding `ObjectNullMultiple(256)` runs into individual null entries
/// (§4.4 ArraySingleObject).
fn read_all_elements(
    cursor: &mut ByteCursor,
    registry: &mut ClassLayoutRegistry,
    count: i32,
    bin_type: BinaryTypeKind,
    add_info: &AdditionalInfo,
) -> Result<Vec<MemberValue>> {
    if bin_type == BinaryTypeKind::Primitive {
        let AdditionalInfo::Primitive(kind) = add_info else {
            return Err(Error::UnsupportedFeature {
                detail: "Primitive array without a PrimitiveKind in its additional info"
                    .to_string(),
                pos: cursor.position() as usize,
            });
        };
        let mut values = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            values.push(MemberValue::Primitive(primitive::read_value(cursor, *kind)?));
        }
        return Ok(values);
    }

    let mut values = Vec::with_capacity(count.max(0) as usize);
    let mut i = 0;
    while i < count {
        let record = next(cursor, registry)?;
        match record {
            Record::ObjectNullMultiple256(ObjectNullMultiple256 { null_count }) => {
                for _ in 0..null_count {
                    values.push(MemberValue::Primitive(PrimitiveValue::Null));
                    i += 1;
                }
            }
            Record::ObjectNull => {
                values.push(MemberValue::Primitive(PrimitiveValue::Null));
                i += 1;
            }
            other => {
                values.push(MemberValue::Record(Box::new(other)));
                i += 1;
            }
        }
    }
    Ok(values)
}

fn parse_class_with_members_and_types(
    cursor: &mut ByteCursor,
    registry: &mut ClassLayoutRegistry,
) -> Result<Record> {
    let tag_pos = cursor.position() as usize;
    expect_tag(cursor, RecordTag::ClassWithMembersAndTypes)?;
    let class_info = read_class_info(cursor)?;
    let member_type_info = read_member_type_info(cursor, class_info.member_count)?;
    let library_id = cursor.read_i32()?;

    registry.register(
        class_info.object_id,
        Layout {
            class_info: class_info.clone(),
            member_type_info: Some(member_type_info.clone()),
        },
        tag_pos,
    )?;

    let member_values =
        read_all_member_values(cursor, registry, &class_info, Some(&member_type_info))?;
    Ok(Record::ClassWithMembersAndTypes(ClassWithMembersAndTypes {
        class_info,
        member_type_info,
        library_id,
        member_values,
    }))
}

fn parse_system_class_with_members_and_types(
    cursor: &mut ByteCursor,
    registry: &mut ClassLayoutRegistry,
) -> Result<Record> {
    let tag_pos = cursor.position() as usize;
    expect_tag(cursor, RecordTag::SystemClassWithMembersAndTypes)?;
    let class_info = read_class_info(cursor)?;
    let member_type_info = read_member_type_info(cursor, class_info.member_count)?;

    registry.register(
        class_info.object_id,
        Layout {
            class_info: class_info.clone(),
            member_type_info: Some(member_type_info.clone()),
        },
        tag_pos,
    )?;

    let member_values =
        read_all_member_values(cursor, registry, &class_info, Some(&member_type_info))?;
    Ok(Record::SystemClassWithMembersAndTypes(
        SystemClassWithMembersAndTypes {
            class_info,
            member_type_info,
            member_values,
        },
    ))
}

/// Reads `ClassInfo` only — no member values follow on the wire, and no
/// further bytes are consumed. Unlike `SystemClassWithMembersAndTypes`,
/// this record carries no `MemberTypeInfo`, so there is nothing to read
/// member values *with*.
fn parse_system_class_with_members(
    cursor: &mut ByteCursor,
    registry: &mut ClassLayoutRegistry,
) -> Result<Record> {
    let tag_pos = cursor.position() as usize;
    expect_tag(cursor, RecordTag::SystemClassWithMembers)?;
    let class_info = read_class_info(cursor)?;

    registry.register(
        class_info.object_id,
        Layout {
            class_info: class_info.clone(),
            member_type_info: None,
        },
        tag_pos,
    )?;

    Ok(Record::SystemClassWithMembers(SystemClassWithMembers {
        class_info,
        member_values: Vec::new(),
    }))
}

fn parse_class_with_id(cursor: &mut ByteCursor, registry: &mut ClassLayoutRegistry) -> Result<Record> {
    expect_tag(cursor, RecordTag::ClassWithId)?;
    let object_id = cursor.read_i32()?;
    let lookup_pos = cursor.position() as usize;
    let metadata_id = cursor.read_i32()?;

    let layout = registry.lookup(metadata_id, lookup_pos)?.clone();
    let member_values = read_all_member_values(
        cursor,
        registry,
        &layout.class_info,
        layout.member_type_info.as_ref(),
    )?;

    Ok(Record::ClassWithId(ClassWithId {
        object_id,
        metadata_id,
        member_values,
    }))
}

fn parse_binary_array(cursor: &mut ByteCursor, registry: &mut ClassLayoutRegistry) -> Result<Record> {
    expect_tag(cursor, RecordTag::BinaryArray)?;
    let object_id = cursor.read_i32()?;
    let shape_pos = cursor.position() as usize;
    let shape = BinaryArrayShape::try_from(cursor.read_u8()?)
        .map_err(|kind| Error::BadPrimitive { kind, pos: shape_pos })?;
    let rank = cursor.read_i32()?;
    let mut lengths = Vec::with_capacity(rank.max(0) as usize);
    for _ in 0..rank {
        lengths.push(cursor.read_i32()?);
    }
    let lower_bounds = if shape.has_lower_bounds() {
        let mut bounds = Vec::with_capacity(rank.max(0) as usize);
        for _ in 0..rank {
            bounds.push(cursor.read_i32()?);
        }
        Some(bounds)
    } else {
        None
    };

    let type_pos = cursor.position() as usize;
    let type_kind = BinaryTypeKind::try_from(cursor.read_u8()?)
        .map_err(|kind| Error::BadPrimitive { kind, pos: type_pos })?;
    let additional_info = read_additional_info(cursor, type_kind)?;

    // Total element count is the product of per-dimension lengths, not
    // their sum, unlike the lineage decoder.
    let total_elements: i32 = lengths.iter().product();
    let element_values =
        read_all_elements(cursor, registry, total_elements, type_kind, &additional_info)?;

    Ok(Record::BinaryArray(BinaryArray {
        object_id,
        shape,
        rank,
        lengths,
        lower_bounds,
        type_kind,
        additional_info,
        element_values,
    }))
}

fn parse_array_single_primitive(cursor: &mut ByteCursor) -> Result<Record> {
    expect_tag(cursor, RecordTag::ArraySinglePrimitive)?;
    let object_id = cursor.read_i32()?;
    let length = cursor.read_i32()?;
    let kind = primitive::read_kind(cursor)?;
    let mut element_values = Vec::with_capacity(length.max(0) as usize);
    for _ in 0..length {
        element_values.push(primitive::read_value(cursor, kind)?);
    }
    Ok(Record::ArraySinglePrimitive(ArraySinglePrimitive {
        object_id,
        length,
        kind,
        element_values,
    }))
}

fn parse_array_single_object(
    cursor: &mut ByteCursor,
    registry: &mut ClassLayoutRegistry,
) -> Result<Record> {
    expect_tag(cursor, RecordTag::ArraySingleObject)?;
    let object_id = cursor.read_i32()?;
    let length = cursor.read_i32()?;
    let element_values = read_all_elements(
        cursor,
        registry,
        length,
        BinaryTypeKind::Object,
        &AdditionalInfo::None,
    )?;
    Ok(Record::ArraySingleObject(ArraySingleObject {
        object_id,
        length,
        element_values,
    }))
}

/// Reads `length` element records, unlike the lineage decoder, which left
/// the string elements unread.
fn parse_array_single_string(
    cursor: &mut ByteCursor,
    registry: &mut ClassLayoutRegistry,
) -> Result<Record> {
    expect_tag(cursor, RecordTag::ArraySingleString)?;
    let object_id = cursor.read_i32()?;
    let length = cursor.read_i32()?;
    let element_values = read_all_elements(
        cursor,
        registry,
        length,
        BinaryTypeKind::String,
        &AdditionalInfo::None,
    )?;
    Ok(Record::ArraySingleString(ArraySingleString {
        object_id,
        length,
        element_values,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_bytes(hex: &str) -> Vec<u8> {
        hex.split_whitespace()
            .map(|b| u8::from_str_radix(b, 16).unwrap())
            .collect()
    }

    #[test]
    fn header_plus_empty_message() {
        // 00 = SerializationHeader, root=1, header=-1, major=1, minor=0; then 0B = MessageEnd
        let bytes = hex_bytes("00 01 00 00 00 FF FF FF FF 01 00 00 00 00 00 00 00 0B");
        let mut cursor = ByteCursor::new(&bytes);
        let mut registry = ClassLayoutRegistry::new();
        let header = next(&mut cursor, &mut registry).unwrap();
        match header {
            Record::SerializationHeader(h) => {
                assert_eq!(h.root_id, 1);
                assert_eq!(h.header_id, -1);
                assert_eq!(h.major_version, 1);
                assert_eq!(h.minor_version, 0);
            }
            _ => panic!("expected SerializationHeader"),
        }
        let end = next(&mut cursor, &mut registry).unwrap();
        assert!(matches!(end, Record::MessageEnd));
        assert_eq!(cursor.position(), bytes.len() as u64);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let bytes = [0xFEu8];
        let mut cursor = ByteCursor::new(&bytes);
        let mut registry = ClassLayoutRegistry::new();
        assert!(matches!(
            next(&mut cursor, &mut registry),
            Err(Error::UnknownRecord { tag: 0xFE, pos: 0 })
        ));
    }

    #[test]
    fn tag_3_is_not_in_the_wire_table() {
        let bytes = [3u8];
        let mut cursor = ByteCursor::new(&bytes);
        let mut registry = ClassLayoutRegistry::new();
        assert!(matches!(
            next(&mut cursor, &mut registry),
            Err(Error::UnknownRecord { tag: 3, pos: 0 })
        ));
    }

    #[test]
    fn tag_mismatch_is_detected() {
        // ClassWithId's parser is invoked only when tag==1, so simulate a
        // direct call with a buffer whose first byte is wrong.
        let bytes = [9u8, 1, 0, 0, 0];
        let mut cursor = ByteCursor::new(&bytes);
        let err = parse_class_with_id(&mut cursor, &mut ClassLayoutRegistry::new()).unwrap_err();
        assert!(matches!(
            err,
            Error::RecordTagMismatch {
                expected: 1,
                got: 9,
                ..
            }
        ));
    }

    #[test]
    fn system_class_with_two_int_members() {
        // tag=4 SystemClassWithMembersAndTypes
        let mut bytes = vec![4u8];
        bytes.extend_from_slice(&1i32.to_le_bytes()); // object_id
        bytes.push(4); // name length varint
        bytes.extend_from_slice(b"Pair");
        bytes.extend_from_slice(&2i32.to_le_bytes()); // member_count
        bytes.push(1);
        bytes.extend_from_slice(b"a");
        bytes.push(1);
        bytes.extend_from_slice(b"b");
        bytes.push(0); // BinaryType::Primitive
        bytes.push(0); // BinaryType::Primitive
        bytes.push(8); // PrimitiveKind::Int32
        bytes.push(8); // PrimitiveKind::Int32
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.extend_from_slice(&42i32.to_le_bytes());

        let mut cursor = ByteCursor::new(&bytes);
        let mut registry = ClassLayoutRegistry::new();
        let record = next(&mut cursor, &mut registry).unwrap();
        match record {
            Record::SystemClassWithMembersAndTypes(c) => {
                assert_eq!(c.class_info.name, "Pair");
                assert_eq!(c.member_values.len(), 2);
                assert!(matches!(
                    c.member_values[0],
                    MemberValue::Primitive(PrimitiveValue::Int32(7))
                ));
                assert!(matches!(
                    c.member_values[1],
                    MemberValue::Primitive(PrimitiveValue::Int32(42))
                ));
            }
            _ => panic!("expected SystemClassWithMembersAndTypes"),
        }
        assert!(registry.lookup(1, 0).is_ok());
    }

    #[test]
    fn class_with_id_reuses_registered_layout() {
        let mut bytes = vec![4u8];
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.push(4);
        bytes.extend_from_slice(b"Pair");
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.push(1);
        bytes.extend_from_slice(b"a");
        bytes.push(1);
        bytes.extend_from_slice(b"b");
        bytes.push(0);
        bytes.push(0);
        bytes.push(8);
        bytes.push(8);
        bytes.extend_from_slice(&7i32.to_le_bytes());
        bytes.extend_from_slice(&42i32.to_le_bytes());
        // ClassWithId(object_id=9, metadata_id=1), values 1, 2
        bytes.push(1);
        bytes.extend_from_slice(&9i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&2i32.to_le_bytes());

        let mut cursor = ByteCursor::new(&bytes);
        let mut registry = ClassLayoutRegistry::new();
        next(&mut cursor, &mut registry).unwrap();
        let record = next(&mut cursor, &mut registry).unwrap();
        match record {
            Record::ClassWithId(c) => {
                assert_eq!(c.object_id, 9);
                assert!(matches!(
                    c.member_values[0],
                    MemberValue::Primitive(PrimitiveValue::Int32(1))
                ));
                assert!(matches!(
                    c.member_values[1],
                    MemberValue::Primitive(PrimitiveValue::Int32(2))
                ));
            }
            _ => panic!("expected ClassWithId"),
        }
    }

    #[test]
    fn binary_array_element_count_is_product_not_sum() {
        // rank=2, lengths=[2,3] -> 6 elements, Primitive/Int32
        let mut bytes = vec![7u8];
        bytes.extend_from_slice(&1i32.to_le_bytes()); // object_id
        bytes.push(2); // Rectangular
        bytes.extend_from_slice(&2i32.to_le_bytes()); // rank
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&3i32.to_le_bytes());
        bytes.push(0); // BinaryType::Primitive
        bytes.push(8); // Int32
        for i in 0..6i32 {
            bytes.extend_from_slice(&i.to_le_bytes());
        }

        let mut cursor = ByteCursor::new(&bytes);
        let mut registry = ClassLayoutRegistry::new();
        let record = next(&mut cursor, &mut registry).unwrap();
        match record {
            Record::BinaryArray(a) => assert_eq!(a.element_values.len(), 6),
            _ => panic!("expected BinaryArray"),
        }
    }
}
