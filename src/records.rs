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

//! Wire-format type definitions: the closed enumerations from the MS-NRBF
//! grammar, and the record/value types a [`crate::dispatch`] parse
//! produces.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordTag {
    SerializationHeader = 0,
    ClassWithId = 1,
    SystemClassWithMembers = 2,
    SystemClassWithMembersAndTypes = 4,
    ClassWithMembersAndTypes = 5,
    BinaryObjectString = 6,
    BinaryArray = 7,
    MemberPrimitiveTyped = 8,
    MemberReference = 9,
    ObjectNull = 10,
    MessageEnd = 11,
    BinaryLibrary = 12,
    ObjectNullMultiple256 = 13,
    ArraySinglePrimitive = 15,
    ArraySingleObject = 16,
    ArraySingleString = 17,
}

impl TryFrom<u8> for RecordTag {
    /// The rejected byte, for the caller to wrap in [`crate::error::Error::UnknownRecord`]
    /// with the cursor position it actually has.
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        Ok(match value {
            0 => RecordTag::SerializationHeader,
            1 => RecordTag::ClassWithId,
            2 => RecordTag::SystemClassWithMembers,
            4 => RecordTag::SystemClassWithMembersAndTypes,
            5 => RecordTag::ClassWithMembersAndTypes,
            6 => RecordTag::BinaryObjectString,
            7 => RecordTag::BinaryArray,
            8 => RecordTag::MemberPrimitiveTyped,
            9 => RecordTag::MemberReference,
            10 => RecordTag::ObjectNull,
            11 => RecordTag::MessageEnd,
            12 => RecordTag::BinaryLibrary,
            13 => RecordTag::ObjectNullMultiple256,
            15 => RecordTag::ArraySinglePrimitive,
            16 => RecordTag::ArraySingleObject,
            17 => RecordTag::ArraySingleString,
            other => return Err(other),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryTypeKind {
    Primitive = 0,
    String = 1,
    Object = 2,
    SystemClass = 3,
    Class = 4,
    ObjectArray = 5,
    StringArray = 6,
    PrimitiveArray = 7,
}

impl TryFrom<u8> for BinaryTypeKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        Ok(match value {
            0 => BinaryTypeKind::Primitive,
            1 => BinaryTypeKind::String,
            2 => BinaryTypeKind::Object,
            3 => BinaryTypeKind::SystemClass,
            4 => BinaryTypeKind::Class,
            5 => BinaryTypeKind::ObjectArray,
            6 => BinaryTypeKind::StringArray,
            7 => BinaryTypeKind::PrimitiveArray,
            other => return Err(other),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryArrayShape {
    Single = 0,
    Jagged = 1,
    Rectangular = 2,
    SingleOffset = 3,
    JaggedOffset = 4,
    RectangularOffset = 5,
}

impl BinaryArrayShape {
    pub fn has_lower_bounds(self) -> bool {
        matches!(
            self,
            BinaryArrayShape::SingleOffset
                | BinaryArrayShape::JaggedOffset
                | BinaryArrayShape::RectangularOffset
        )
    }
}

impl TryFrom<u8> for BinaryArrayShape {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        Ok(match value {
            0 => BinaryArrayShape::Single,
            1 => BinaryArrayShape::Jagged,
            2 => BinaryArrayShape::Rectangular,
            3 => BinaryArrayShape::SingleOffset,
            4 => BinaryArrayShape::JaggedOffset,
            5 => BinaryArrayShape::RectangularOffset,
            other => return Err(other),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Boolean = 1,
    Byte = 2,
    Char = 3,
    Decimal = 5,
    Double = 6,
    Int16 = 7,
    Int32 = 8,
    Int64 = 9,
    SByte = 10,
    Single = 11,
    TimeSpan = 12,
    DateTime = 13,
    UInt16 = 14,
    UInt32 = 15,
    UInt64 = 16,
    Null = 17,
    String = 18,
}

impl PrimitiveKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "Boolean",
            PrimitiveKind::Byte => "Byte",
            PrimitiveKind::Char => "Char",
            PrimitiveKind::Decimal => "Decimal",
            PrimitiveKind::Double => "Double",
            PrimitiveKind::Int16 => "Int16",
            PrimitiveKind::Int32 => "Int32",
            PrimitiveKind::Int64 => "Int64",
            PrimitiveKind::SByte => "SByte",
            PrimitiveKind::Single => "Single",
            PrimitiveKind::TimeSpan => "TimeSpan",
            PrimitiveKind::DateTime => "DateTime",
            PrimitiveKind::UInt16 => "UInt16",
            PrimitiveKind::UInt32 => "UInt32",
            PrimitiveKind::UInt64 => "UInt64",
            PrimitiveKind::Null => "Null",
            PrimitiveKind::String => "String",
        }
    }
}

impl TryFrom<u8> for PrimitiveKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        Ok(match value {
            1 => PrimitiveKind::Boolean,
            2 => PrimitiveKind::Byte,
            3 => PrimitiveKind::Char,
            5 => PrimitiveKind::Decimal,
            6 => PrimitiveKind::Double,
            7 => PrimitiveKind::Int16,
            8 => PrimitiveKind::Int32,
            9 => PrimitiveKind::Int64,
            10 => PrimitiveKind::SByte,
            11 => PrimitiveKind::Single,
            12 => PrimitiveKind::TimeSpan,
            13 => PrimitiveKind::DateTime,
            14 => PrimitiveKind::UInt16,
            15 => PrimitiveKind::UInt32,
            16 => PrimitiveKind::UInt64,
            17 => PrimitiveKind::Null,
            18 => PrimitiveKind::String,
            other => return Err(other),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassInfo {
    pub object_id: i32,
    pub name: String,
    pub member_count: i32,
    pub member_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassTypeInfo {
    pub library_name: String,
    pub library_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AdditionalInfo {
    Primitive(PrimitiveKind),
    SystemClass(String),
    Class(ClassTypeInfo),
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberTypeInfo {
    pub bin_types: Vec<BinaryTypeKind>,
    pub additional_info: Vec<AdditionalInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayInfo {
    pub object_id: i32,
    pub length: i32,
}

/// A primitive wire value, decoded per [`PrimitiveKind`]'s width table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PrimitiveValue {
    Null,
    Bool(bool),
    Byte(u8),
    SByte(i8),
    Char(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    TimeSpan(i64),
    Single(f32),
    Double(f64),
    /// Textual decimal, read as a varstring like [`PrimitiveValue::String`].
    Decimal(String),
    /// Raw 64-byte DateTime payload, explicitly not interpreted (§4.2).
    DateTime(Vec<u8>),
    String(String),
}

/// A value read for one member/array slot: either a primitive read
/// in-place, or a fully nested record read via the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MemberValue {
    Primitive(PrimitiveValue),
    Record(Box<Record>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializationHeader {
    pub root_id: i32,
    pub header_id: i32,
    pub major_version: i32,
    pub minor_version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryLibrary {
    pub library_id: i32,
    pub library_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassWithId {
    pub object_id: i32,
    pub metadata_id: i32,
    pub member_values: Vec<MemberValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemClassWithMembers {
    pub class_info: ClassInfo,
    pub member_values: Vec<MemberValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemClassWithMembersAndTypes {
    pub class_info: ClassInfo,
    pub member_type_info: MemberTypeInfo,
    pub member_values: Vec<MemberValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassWithMembersAndTypes {
    pub class_info: ClassInfo,
    pub member_type_info: MemberTypeInfo,
    pub library_id: i32,
    pub member_values: Vec<MemberValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryArray {
    pub object_id: i32,
    pub shape: BinaryArrayShape,
    pub rank: i32,
    pub lengths: Vec<i32>,
    pub lower_bounds: Option<Vec<i32>>,
    pub type_kind: BinaryTypeKind,
    pub additional_info: AdditionalInfo,
    pub element_values: Vec<MemberValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArraySinglePrimitive {
    pub object_id: i32,
    pub length: i32,
    pub kind: PrimitiveKind,
    pub element_values: Vec<PrimitiveValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArraySingleObject {
    pub object_id: i32,
    pub length: i32,
    pub element_values: Vec<MemberValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArraySingleString {
    pub object_id: i32,
    pub length: i32,
    pub element_values: Vec<MemberValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectNullMultiple256 {
    pub null_count: u8,
}

/// Every record kind in the stream, retaining its parsed payload verbatim
/// for later graph assembly (§3 "Record").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Record {
    SerializationHeader(SerializationHeader),
    ClassWithId(ClassWithId),
    SystemClassWithMembers(SystemClassWithMembers),
    SystemClassWithMembersAndTypes(SystemClassWithMembersAndTypes),
    ClassWithMembersAndTypes(ClassWithMembersAndTypes),
    BinaryObjectString { object_id: i32, value: String },
    BinaryArray(BinaryArray),
    MemberPrimitiveTyped { kind: PrimitiveKind, value: PrimitiveValue },
    MemberReference { id_ref: i32 },
    ObjectNull,
    MessageEnd,
    BinaryLibrary(BinaryLibrary),
    ObjectNullMultiple256(ObjectNullMultiple256),
    ArraySinglePrimitive(ArraySinglePrimitive),
    ArraySingleObject(ArraySingleObject),
    ArraySingleString(ArraySingleString),
}

impl Record {
    pub fn tag(&self) -> RecordTag {
        match self {
            Record::SerializationHeader(_) => RecordTag::SerializationHeader,
            Record::ClassWithId(_) => RecordTag::ClassWithId,
            Record::SystemClassWithMembers(_) => RecordTag::SystemClassWithMembers,
            Record::SystemClassWithMembersAndTypes(_) => RecordTag::SystemClassWithMembersAndTypes,
            Record::ClassWithMembersAndTypes(_) => RecordTag::ClassWithMembersAndTypes,
            Record::BinaryObjectString { .. } => RecordTag::BinaryObjectString,
            Record::BinaryArray(_) => RecordTag::BinaryArray,
            Record::MemberPrimitiveTyped { .. } => RecordTag::MemberPrimitiveTyped,
            Record::MemberReference { .. } => RecordTag::MemberReference,
            Record::ObjectNull => RecordTag::ObjectNull,
            Record::MessageEnd => RecordTag::MessageEnd,
            Record::BinaryLibrary(_) => RecordTag::BinaryLibrary,
            Record::ObjectNullMultiple256(_) => RecordTag::ObjectNullMultiple256,
            Record::ArraySinglePrimitive(_) => RecordTag::ArraySinglePrimitive,
            Record::ArraySingleObject(_) => RecordTag::ArraySingleObject,
            Record::ArraySingleString(_) => RecordTag::ArraySingleString,
        }
    }
}
