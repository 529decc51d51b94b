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

//! Finds `Byte[]` nodes that are themselves an embedded NRBF stream,
//! probes and parses them, and hands back their resolved graphs as
//! sibling output (§4.8).

use crate::error::Result;
use crate::graph::{NodeHandle, ObjectGraphBuilder};
use std::collections::HashSet;

/// Minimum byte-array length the trigger requires: a `SerializationHeader`
/// alone is 17 bytes (tag + 4 i32 fields), so anything shorter could never
/// hold one.
const MIN_TRIGGER_LEN: usize = 17;

/// A nested blob found within the outer graph: the id of the `Byte[]` node
/// that carried it, and the independently-parsed inner graph.
pub struct NestedBlob {
    pub outer_node_id: i32,
    pub graph: ObjectGraphBuilder,
}

/// Walks `root`'s tree looking for trigger nodes, probing and parsing each.
/// A probe failure is not an error: the node is simply skipped and its
/// bytes stay opaque. Nested blobs found inside a successfully parsed
/// inner graph are detected too, so the result may be several levels deep
/// in origin despite being returned as one flat list.
pub fn detect(root: &NodeHandle) -> Result<Vec<NestedBlob>> {
    let mut visited = HashSet::new();
    let mut found = Vec::new();
    walk(root, &mut visited, &mut found)?;
    log::debug!("nested-probe: {} blob(s) found", found.len());
    Ok(found)
}

fn walk(node: &NodeHandle, visited: &mut HashSet<i32>, found: &mut Vec<NestedBlob>) -> Result<()> {
    let (id, raw_bytes, members) = {
        let n = node.borrow();
        (n.id, n.raw_bytes.clone(), n.members.clone())
    };

    if id >= 0 && !visited.insert(id) {
        return Ok(());
    }

    if let Some(bytes) = raw_bytes {
        if is_trigger(&bytes) {
            log::trace!("nested-probe: trigger at node {}, {} bytes", id, bytes.len());
            // The probe and the full parse are the same call: `decode_graph`
            // already requires the stream's first record to be a
            // SerializationHeader (§4.9's AwaitHeader state), which is
            // exactly the probe condition here. A probe failure and a
            // parse failure are the same outcome, so both are swallowed.
            match crate::decode_graph(&bytes) {
                Ok(inner_graph) => {
                    let inner_root = inner_graph.root();
                    found.push(NestedBlob {
                        outer_node_id: id,
                        graph: inner_graph,
                    });
                    walk(&inner_root, &mut HashSet::new(), found)?;
                }
                Err(err) => {
                    log::trace!("nested-probe: node {} failed to parse: {}", id, err);
                }
            }
        }
    }

    for member in &members {
        walk(member, visited, found)?;
    }
    Ok(())
}

fn is_trigger(bytes: &[u8]) -> bool {
    bytes.len() > MIN_TRIGGER_LEN && bytes[0] == 0x00
}
