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

//! Decodes an MS-NRBF binary record stream into an inspectable,
//! JSON-renderable object graph.

pub mod cursor;
pub mod dispatch;
pub mod encoder;
pub mod error;
pub mod graph;
pub mod nested;
pub mod primitive;
pub mod records;
pub mod registry;
pub mod render;

pub use error::{Error, Result};
pub use graph::ObjectGraphBuilder;
pub use nested::NestedBlob;
pub use records::Record;

use cursor::ByteCursor;
use registry::ClassLayoutRegistry;

/// The decoded payload: the resolved root graph plus any nested NRBF blobs
/// discovered within it (§4.8).
pub struct Decoded {
    pub graph: ObjectGraphBuilder,
    pub nested: Vec<NestedBlob>,
}

/// Main-loop states from §4.9: the first record off the wire must be a
/// `SerializationHeader`, every record after that is streamed to the graph
/// builder, and nothing is read once `MessageEnd`/EOF is reached.
enum State {
    AwaitHeader,
    Streaming,
    Ended,
}

/// Parses `bytes` as a complete NRBF record stream, builds the resolved
/// object graph, and probes it for nested blobs (§4.8).
pub fn decode(bytes: &[u8]) -> Result<Decoded> {
    log::debug!("decode: {} bytes", bytes.len());
    let graph = decode_graph(bytes)?;
    let nested = nested::detect(&graph.root())?;
    log::debug!("decode: root id {}, {} nested blob(s)", graph.root_id(), nested.len());
    Ok(Decoded { graph, nested })
}

/// Runs the record-dispatch/graph-assembly pipeline over `bytes` to
/// completion, without probing for nested blobs. Used both by [`decode`]
/// for the outer stream and by [`nested`] for each inner sub-parse (a
/// fresh registry and graph per call, never shared across parses — §5).
pub fn decode_graph(bytes: &[u8]) -> Result<ObjectGraphBuilder> {
    let mut cursor = ByteCursor::new(bytes);
    let mut registry = ClassLayoutRegistry::new();
    let mut graph = ObjectGraphBuilder::new();
    let mut state = State::AwaitHeader;

    loop {
        match state {
            State::Ended => break,
            State::AwaitHeader | State::Streaming => {
                if cursor.at_eof() {
                    log::trace!("decode_graph: eof at offset {}", cursor.position());
                    state = State::Ended;
                    continue;
                }
                let pos = cursor.position() as usize;
                let record = dispatch::next(&mut cursor, &mut registry)?;
                if matches!(state, State::AwaitHeader)
                    && !matches!(record, Record::SerializationHeader(_))
                {
                    return Err(Error::MissingHeader { pos });
                }
                let is_end = matches!(record, Record::MessageEnd);
                graph.apply(&record, pos)?;
                state = if is_end { State::Ended } else { State::Streaming };
            }
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_header_is_rejected() {
        // tag 11 = MessageEnd, with no SerializationHeader first.
        let bytes = [0x0Bu8];
        assert!(matches!(
            decode_graph(&bytes),
            Err(Error::MissingHeader { pos: 0 })
        ));
    }

    #[test]
    fn header_plus_end_decodes_empty_graph() {
        let bytes = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x0B,
        ];
        let graph = decode_graph(&bytes).unwrap();
        assert_eq!(graph.root_id(), 1);
    }
}
