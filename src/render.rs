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

//! Renders a resolved [`ObjectNode`] tree into `{Id, Type, Name, Value,
//! Members}` JSON, the way [`crate::interleaved`] renders flat records.

use crate::graph::{NodeHandle, Value as GraphValue};
use serde_json::{Value, json};
use std::collections::HashSet;

/// Renders `root` to JSON. Already-visited ids are rendered as
/// `{"Id": k, "Ref": true}` instead of recursed into, since a
/// `MemberReference` cycle would otherwise recurse forever (§5).
pub fn render(root: &NodeHandle) -> Value {
    let mut visited = HashSet::new();
    render_node(root, &mut visited)
}

fn render_node(node: &NodeHandle, visited: &mut HashSet<i32>) -> Value {
    let node = node.borrow();

    if node.id >= 0 {
        if !visited.insert(node.id) {
            return json!({ "Id": node.id, "Ref": true });
        }
    }

    let mut map = serde_json::Map::new();
    if node.id >= 0 {
        map.insert("Id".to_string(), json!(node.id));
    }
    if let Some(ty) = &node.node_type {
        map.insert("Type".to_string(), json!(ty));
    }
    if let Some(name) = &node.name {
        map.insert("Name".to_string(), json!(name));
    }
    if let Some(value) = &node.value {
        map.insert("Value".to_string(), value_to_json(value));
    }
    if !node.members.is_empty() {
        let members: Vec<Value> = node
            .members
            .iter()
            .map(|m| render_node(m, visited))
            .collect();
        map.insert("Members".to_string(), Value::Array(members));
    }
    Value::Object(map)
}

fn value_to_json(value: &GraphValue) -> Value {
    match value {
        GraphValue::Null => Value::Null,
        GraphValue::Bool(b) => json!(b),
        GraphValue::Int(i) => json!(i),
        GraphValue::UInt(u) => json!(u),
        GraphValue::Float32(f) => json!(f),
        GraphValue::Float64(f) => json!(f),
        GraphValue::String(s) => json!(s),
        GraphValue::Bytes(b) => json!(b),
        GraphValue::Opaque(s) => json!(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ObjectGraphBuilder;
    use std::rc::Rc;

    #[test]
    fn empty_root_renders_with_no_members_field() {
        let graph = ObjectGraphBuilder::new();
        let rendered = render(&graph.root());
        assert!(rendered.get("Members").is_none());
    }

    #[test]
    fn cycle_renders_as_ref_marker() {
        let mut graph = ObjectGraphBuilder::new();
        let a = graph.node_for(1);
        let b = graph.node_for(2);
        a.borrow_mut().node_type = Some("A".to_string());
        a.borrow_mut().members.push(Rc::clone(&b));
        b.borrow_mut().node_type = Some("B".to_string());
        b.borrow_mut().members.push(Rc::clone(&a));

        let rendered = render(&a);
        let members = rendered["Members"].as_array().unwrap();
        let back = &members[0]["Members"].as_array().unwrap()[0];
        assert_eq!(back["Ref"], json!(true));
        assert_eq!(back["Id"], json!(1));
    }
}
