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

use thiserror::Error;

/// Result type for NRBF parsing.
pub type Result<T> = std::result::Result<T, Error>;

/// Closed error taxonomy for the record stream parser and graph builder.
///
/// Every variant carries the cursor byte position at which it was raised,
/// so a caller can point a user at the offending offset in the stream.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unexpected end of stream at offset {pos}")]
    UnexpectedEof { pos: usize },

    #[error("invalid 7-bit length-prefix varint at offset {pos}")]
    InvalidVarInt { pos: usize },

    #[error("invalid UTF-8 string at offset {pos}: {source}")]
    InvalidUtf8 {
        pos: usize,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("unknown record tag 0x{tag:02x} at offset {pos}")]
    UnknownRecord { tag: u8, pos: usize },

    #[error("record tag mismatch at offset {pos}: expected 0x{expected:02x}, got 0x{got:02x}")]
    RecordTagMismatch { expected: u8, got: u8, pos: usize },

    #[error("unknown class metadata id {id} at offset {pos}")]
    UnknownClassMetadata { id: i32, pos: usize },

    #[error("duplicate class metadata id {id} at offset {pos}")]
    DuplicateClassMetadata { id: i32, pos: usize },

    #[error("unknown library id {id} at offset {pos}")]
    UnknownLibrary { id: i32, pos: usize },

    #[error("invalid primitive type 0x{kind:02x} at offset {pos}")]
    BadPrimitive { kind: u8, pos: usize },

    #[error("unsupported feature at offset {pos}: {detail}")]
    UnsupportedFeature { detail: String, pos: usize },

    #[error("stream does not start with a SerializationHeader (offset {pos})")]
    MissingHeader { pos: usize },
}

/// Error type for the CLI boundary: wraps I/O (reading the input file,
/// writing output) and the core parser's [`Error`]. The core library never
/// constructs this type; it only ever deals with an in-memory buffer.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Parse(#[from] Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
