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

//! Writes [`Record`]s back to bytes. Not part of the public decode
//! pipeline — kept as the counterpart [`crate::dispatch`] tests round-trip
//! against.

use crate::records::*;
use std::io::{Result, Write};

/// An encoder for MS-NRBF binary streams.
pub struct Encoder<W: Write> {
    writer: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn encode(&mut self, record: &Record) -> Result<()> {
        match record {
            Record::SerializationHeader(rec) => {
                self.write_u8(RecordTag::SerializationHeader as u8)?;
                self.write_i32(rec.root_id)?;
                self.write_i32(rec.header_id)?;
                self.write_i32(rec.major_version)?;
                self.write_i32(rec.minor_version)?;
            }
            Record::BinaryLibrary(rec) => {
                self.write_u8(RecordTag::BinaryLibrary as u8)?;
                self.write_i32(rec.library_id)?;
                self.write_var_string(&rec.library_name)?;
            }
            Record::ClassWithMembersAndTypes(rec) => {
                self.write_u8(RecordTag::ClassWithMembersAndTypes as u8)?;
                self.write_class_info(&rec.class_info)?;
                self.write_member_type_info(&rec.member_type_info)?;
                self.write_i32(rec.library_id)?;
                for val in &rec.member_values {
                    self.write_member_value(val)?;
                }
            }
            Record::SystemClassWithMembersAndTypes(rec) => {
                self.write_u8(RecordTag::SystemClassWithMembersAndTypes as u8)?;
                self.write_class_info(&rec.class_info)?;
                self.write_member_type_info(&rec.member_type_info)?;
                for val in &rec.member_values {
                    self.write_member_value(val)?;
                }
            }
            Record::SystemClassWithMembers(rec) => {
                self.write_u8(RecordTag::SystemClassWithMembers as u8)?;
                self.write_class_info(&rec.class_info)?;
                for val in &rec.member_values {
                    self.write_member_value(val)?;
                }
            }
            Record::ClassWithId(rec) => {
                self.write_u8(RecordTag::ClassWithId as u8)?;
                self.write_i32(rec.object_id)?;
                self.write_i32(rec.metadata_id)?;
                for val in &rec.member_values {
                    self.write_member_value(val)?;
                }
            }
            Record::BinaryObjectString { object_id, value } => {
                self.write_u8(RecordTag::BinaryObjectString as u8)?;
                self.write_i32(*object_id)?;
                self.write_var_string(value)?;
            }
            Record::BinaryArray(rec) => {
                self.write_u8(RecordTag::BinaryArray as u8)?;
                self.write_i32(rec.object_id)?;
                self.write_u8(rec.shape as u8)?;
                self.write_i32(rec.rank)?;
                for len in &rec.lengths {
                    self.write_i32(*len)?;
                }
                if let Some(bounds) = &rec.lower_bounds {
                    for bound in bounds {
                        self.write_i32(*bound)?;
                    }
                }
                self.write_u8(rec.type_kind as u8)?;
                self.write_additional_info(&rec.additional_info)?;
                for val in &rec.element_values {
                    self.write_member_value(val)?;
                }
            }
            Record::ArraySingleObject(rec) => {
                self.write_u8(RecordTag::ArraySingleObject as u8)?;
                self.write_i32(rec.object_id)?;
                self.write_i32(rec.length)?;
                for val in &rec.element_values {
                    self.write_member_value(val)?;
                }
            }
            Record::ArraySinglePrimitive(rec) => {
                self.write_u8(RecordTag::ArraySinglePrimitive as u8)?;
                self.write_i32(rec.object_id)?;
                self.write_i32(rec.length)?;
                self.write_u8(rec.kind as u8)?;
                for val in &rec.element_values {
                    self.write_primitive_value(val)?;
                }
            }
            Record::ArraySingleString(rec) => {
                self.write_u8(RecordTag::ArraySingleString as u8)?;
                self.write_i32(rec.object_id)?;
                self.write_i32(rec.length)?;
                for val in &rec.element_values {
                    self.write_member_value(val)?;
                }
            }
            Record::MemberPrimitiveTyped { kind, value } => {
                self.write_u8(RecordTag::MemberPrimitiveTyped as u8)?;
                self.write_u8(*kind as u8)?;
                self.write_primitive_value(value)?;
            }
            Record::MemberReference { id_ref } => {
                self.write_u8(RecordTag::MemberReference as u8)?;
                self.write_i32(*id_ref)?;
            }
            Record::ObjectNull => {
                self.write_u8(RecordTag::ObjectNull as u8)?;
            }
            Record::ObjectNullMultiple256(rec) => {
                self.write_u8(RecordTag::ObjectNullMultiple256 as u8)?;
                self.write_u8(rec.null_count)?;
            }
            Record::MessageEnd => {
                self.write_u8(RecordTag::MessageEnd as u8)?;
            }
        }
        Ok(())
    }

    fn write_i32(&mut self, val: i32) -> Result<()> {
        self.writer.write_all(&val.to_le_bytes())?;
        Ok(())
    }

    fn write_u8(&mut self, val: u8) -> Result<()> {
        self.writer.write_all(&[val])?;
        Ok(())
    }

    /// Mirrors [`crate::cursor::ByteCursor::read_var_string`]'s 7-bit
    /// little-endian length prefix.
    fn write_var_string(&mut self, s: &str) -> Result<()> {
        let bytes = s.as_bytes();
        self.write_var_int(bytes.len() as u32)?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn write_var_int(&mut self, mut value: u32) -> Result<()> {
        loop {
            let mut b = (value & 0x7F) as u8;
            value >>= 7;
            if value > 0 {
                b |= 0x80;
                self.write_u8(b)?;
            } else {
                self.write_u8(b)?;
                break;
            }
        }
        Ok(())
    }

    fn write_class_info(&mut self, info: &ClassInfo) -> Result<()> {
        self.write_i32(info.object_id)?;
        self.write_var_string(&info.name)?;
        self.write_i32(info.member_count)?;
        for name in &info.member_names {
            self.write_var_string(name)?;
        }
        Ok(())
    }

    fn write_member_type_info(&mut self, info: &MemberTypeInfo) -> Result<()> {
        for bt in &info.bin_types {
            self.write_u8(*bt as u8)?;
        }
        for add_info in &info.additional_info {
            self.write_additional_info(add_info)?;
        }
        Ok(())
    }

    fn write_additional_info(&mut self, info: &AdditionalInfo) -> Result<()> {
        match info {
            AdditionalInfo::Primitive(kind) => self.write_u8(*kind as u8)?,
            AdditionalInfo::SystemClass(s) => self.write_var_string(s)?,
            AdditionalInfo::Class(c) => {
                self.write_var_string(&c.library_name)?;
                self.write_i32(c.library_id)?;
            }
            AdditionalInfo::None => {}
        }
        Ok(())
    }

    fn write_primitive_value(&mut self, val: &PrimitiveValue) -> Result<()> {
        match val {
            PrimitiveValue::Bool(b) => self.write_u8(if *b { 1 } else { 0 })?,
            PrimitiveValue::Byte(b) => self.write_u8(*b)?,
            PrimitiveValue::Char(c) => self.write_u8(*c)?,
            PrimitiveValue::SByte(v) => self.write_u8(*v as u8)?,
            PrimitiveValue::Int16(v) => self.writer.write_all(&v.to_le_bytes())?,
            PrimitiveValue::UInt16(v) => self.writer.write_all(&v.to_le_bytes())?,
            PrimitiveValue::Int32(v) => self.write_i32(*v)?,
            PrimitiveValue::UInt32(v) => self.writer.write_all(&v.to_le_bytes())?,
            PrimitiveValue::Int64(v) => self.writer.write_all(&v.to_le_bytes())?,
            PrimitiveValue::UInt64(v) => self.writer.write_all(&v.to_le_bytes())?,
            PrimitiveValue::TimeSpan(v) => self.writer.write_all(&v.to_le_bytes())?,
            PrimitiveValue::Single(v) => self.writer.write_all(&v.to_le_bytes())?,
            PrimitiveValue::Double(v) => self.writer.write_all(&v.to_le_bytes())?,
            // Varstring, same as String (§4.2) — not the hex/16-byte
            // scheme this encoder used to mirror.
            PrimitiveValue::Decimal(s) => self.write_var_string(s)?,
            PrimitiveValue::DateTime(bytes) => self.writer.write_all(bytes)?,
            PrimitiveValue::String(s) => self.write_var_string(s)?,
            PrimitiveValue::Null => {}
        }
        Ok(())
    }

    fn write_member_value(&mut self, val: &MemberValue) -> Result<()> {
        match val {
            MemberValue::Primitive(p) => self.write_primitive_value(p),
            MemberValue::Record(r) => self.encode(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ByteCursor;
    use crate::dispatch;
    use crate::registry::ClassLayoutRegistry;

    #[test]
    fn serialization_header_round_trips() {
        let record = Record::SerializationHeader(SerializationHeader {
            root_id: 1,
            header_id: -1,
            major_version: 1,
            minor_version: 0,
        });
        let mut bytes = Vec::new();
        Encoder::new(&mut bytes).encode(&record).unwrap();

        let mut cursor = ByteCursor::new(&bytes);
        let mut registry = ClassLayoutRegistry::new();
        let decoded = dispatch::next(&mut cursor, &mut registry).unwrap();
        match decoded {
            Record::SerializationHeader(h) => {
                assert_eq!(h.root_id, 1);
                assert_eq!(h.header_id, -1);
            }
            _ => panic!("expected SerializationHeader"),
        }
    }

    #[test]
    fn decimal_round_trips_as_text() {
        let record = Record::MemberPrimitiveTyped {
            kind: PrimitiveKind::Decimal,
            value: PrimitiveValue::Decimal("3.14".to_string()),
        };
        let mut bytes = Vec::new();
        Encoder::new(&mut bytes).encode(&record).unwrap();

        let mut cursor = ByteCursor::new(&bytes);
        let mut registry = ClassLayoutRegistry::new();
        let decoded = dispatch::next(&mut cursor, &mut registry).unwrap();
        match decoded {
            Record::MemberPrimitiveTyped {
                value: PrimitiveValue::Decimal(s),
                ..
            } => assert_eq!(s, "3.14"),
            _ => panic!("expected MemberPrimitiveTyped(Decimal)"),
        }
    }
}
