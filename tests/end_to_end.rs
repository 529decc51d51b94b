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

//! End-to-end scenarios run through the public `decode` entry point,
//! covering the cases not already exercised by inline module tests.

use nrbf_graph::graph::Value;

fn header(root_id: i32) -> Vec<u8> {
    let mut bytes = vec![0x00u8];
    bytes.extend_from_slice(&root_id.to_le_bytes());
    bytes.extend_from_slice(&(-1i32).to_le_bytes());
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes
}

fn varstring(s: &str) -> Vec<u8> {
    let mut bytes = vec![s.len() as u8];
    bytes.extend_from_slice(s.as_bytes());
    bytes
}

/// Scenario 4: `ClassWithId` reusing a layout registered by an earlier
/// `SystemClassWithMembersAndTypes`.
#[test]
fn class_with_id_reuses_prior_layout() {
    let mut bytes = header(1);

    // SystemClassWithMembersAndTypes: Pair { a: Int32, b: Int32 } = (7, 42)
    bytes.push(4);
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend(varstring("Pair"));
    bytes.extend_from_slice(&2i32.to_le_bytes());
    bytes.extend(varstring("a"));
    bytes.extend(varstring("b"));
    bytes.push(0);
    bytes.push(0);
    bytes.push(8);
    bytes.push(8);
    bytes.extend_from_slice(&7i32.to_le_bytes());
    bytes.extend_from_slice(&42i32.to_le_bytes());

    // ClassWithId(object_id=9, metadata_id=1) -> (1, 2)
    bytes.push(1);
    bytes.extend_from_slice(&9i32.to_le_bytes());
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&2i32.to_le_bytes());

    bytes.push(0x0B);

    let decoded = nrbf_graph::decode(&bytes).unwrap();
    let root = decoded.graph.root();
    let root = root.borrow();
    let reused = root
        .members
        .iter()
        .find(|m| m.borrow().id == 9)
        .expect("node 9 present")
        .clone();
    let reused = reused.borrow();
    assert_eq!(reused.node_type.as_deref(), Some("Pair"));
    assert_eq!(reused.members[0].borrow().value, Some(Value::Int(1)));
    assert_eq!(reused.members[1].borrow().value, Some(Value::Int(2)));
}

/// Scenario 5: a `Byte[]` array whose contents are themselves a valid
/// NRBF stream.
#[test]
fn nested_blob_is_detected_and_parsed_independently() {
    let inner = header(42)
        .into_iter()
        .chain([0x0Bu8])
        .collect::<Vec<_>>();
    assert!(inner.len() >= 18);

    let mut bytes = header(1);
    bytes.push(15); // ArraySinglePrimitive
    bytes.extend_from_slice(&4i32.to_le_bytes()); // object_id
    bytes.extend_from_slice(&(inner.len() as i32).to_le_bytes());
    bytes.push(2); // PrimitiveKind::Byte
    bytes.extend_from_slice(&inner);
    bytes.push(0x0B);

    let decoded = nrbf_graph::decode(&bytes).unwrap();
    let root = decoded.graph.root();
    let root = root.borrow();
    let array_node = root.members[0].borrow();
    assert_eq!(array_node.node_type.as_deref(), Some("Byte[]"));
    assert!(array_node.raw_bytes.is_some());

    assert_eq!(decoded.nested.len(), 1);
    assert_eq!(decoded.nested[0].outer_node_id, 4);
    assert_eq!(decoded.nested[0].graph.root_id(), 42);
}

/// Scenario 6: `ObjectNullMultiple256` expands into individual null
/// slots within an object array.
#[test]
fn object_null_multiple_256_expands_in_object_array() {
    let mut bytes = header(1);
    bytes.push(16); // ArraySingleObject
    bytes.extend_from_slice(&4i32.to_le_bytes()); // object_id
    bytes.extend_from_slice(&5i32.to_le_bytes()); // length
    bytes.push(10); // ObjectNull
    bytes.push(13); // ObjectNullMultiple256
    bytes.push(3); // null_count
    bytes.push(6); // BinaryObjectString
    bytes.extend_from_slice(&7i32.to_le_bytes());
    bytes.extend(varstring("x"));
    bytes.push(0x0B);

    let decoded = nrbf_graph::decode(&bytes).unwrap();
    let root = decoded.graph.root();
    let root = root.borrow();
    let array_node = root.members[0].borrow();
    assert_eq!(array_node.members.len(), 5);
    for slot in &array_node.members[0..4] {
        assert_eq!(slot.borrow().value, Some(Value::Null));
    }
    let string_slot = array_node.members[4].borrow();
    assert_eq!(string_slot.node_type.as_deref(), Some("String"));
    assert_eq!(string_slot.value, Some(Value::String("x".to_string())));
}

#[test]
fn tag_3_fails_unknown_record_through_the_public_pipeline() {
    let mut bytes = header(1);
    bytes.push(3);
    let err = nrbf_graph::decode(&bytes).unwrap_err();
    assert!(matches!(
        err,
        nrbf_graph::Error::UnknownRecord { tag: 3, .. }
    ));
}
