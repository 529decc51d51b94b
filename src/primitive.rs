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

//! Reads a single primitive value of a given [`PrimitiveKind`] from a
//! [`ByteCursor`], per the width/endianness table in the spec.

use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::records::{PrimitiveKind, PrimitiveValue};

pub fn read_kind(cursor: &mut ByteCursor) -> Result<PrimitiveKind> {
    let pos = cursor.position() as usize;
    let byte = cursor.read_u8()?;
    PrimitiveKind::try_from(byte).map_err(|kind| Error::BadPrimitive { kind, pos })
}

pub fn read_value(cursor: &mut ByteCursor, kind: PrimitiveKind) -> Result<PrimitiveValue> {
    Ok(match kind {
        PrimitiveKind::Boolean => PrimitiveValue::Bool(cursor.read_u8()? != 0),
        PrimitiveKind::Byte => PrimitiveValue::Byte(cursor.read_u8()?),
        // Treated as a raw byte, not a UTF-16 code unit (§4.2).
        PrimitiveKind::Char => PrimitiveValue::Char(cursor.read_u8()?),
        PrimitiveKind::SByte => PrimitiveValue::SByte(cursor.read_u8()? as i8),
        PrimitiveKind::Int16 => PrimitiveValue::Int16(cursor.read_i16()?),
        PrimitiveKind::UInt16 => PrimitiveValue::UInt16(cursor.read_u16()?),
        PrimitiveKind::Int32 => PrimitiveValue::Int32(cursor.read_i32()?),
        PrimitiveKind::UInt32 => PrimitiveValue::UInt32(cursor.read_u32()?),
        PrimitiveKind::Int64 => PrimitiveValue::Int64(cursor.read_i64()?),
        PrimitiveKind::UInt64 => PrimitiveValue::UInt64(cursor.read_u64()?),
        PrimitiveKind::TimeSpan => PrimitiveValue::TimeSpan(cursor.read_i64()?),
        PrimitiveKind::Single => PrimitiveValue::Single(cursor.read_f32()?),
        PrimitiveKind::Double => PrimitiveValue::Double(cursor.read_f64()?),
        // Wire-encoded as a varstring holding .NET's textual decimal
        // representation, same mechanism as String (§4.2).
        PrimitiveKind::Decimal => PrimitiveValue::Decimal(cursor.read_var_string()?),
        // Raw 64-byte payload, explicitly not interpreted (§4.2).
        PrimitiveKind::DateTime => PrimitiveValue::DateTime(cursor.read_bytes(64)?.to_vec()),
        PrimitiveKind::String => PrimitiveValue::String(cursor.read_var_string()?),
        PrimitiveKind::Null => PrimitiveValue::Null,
    })
}
