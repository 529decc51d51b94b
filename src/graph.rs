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

//! Resolves a flat stream of [`Record`]s into a rooted object graph,
//! preserving identity across `MemberReference`s and `ClassWithId` reuse.

use crate::error::{Error, Result};
use crate::records::{
    AdditionalInfo, ClassWithId, ClassWithMembersAndTypes, MemberValue, PrimitiveValue, Record,
    SystemClassWithMembers, SystemClassWithMembersAndTypes,
};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// A scalar carried by a resolved node. Mirrors [`PrimitiveValue`] but
/// collapses the width variants a renderer actually needs to distinguish.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Textual data that isn't meant to be interpreted further (Decimal's
    /// textual value, a class/library name used as a bare value, etc).
    Opaque(String),
}

impl From<PrimitiveValue> for Value {
    fn from(v: PrimitiveValue) -> Self {
        match v {
            PrimitiveValue::Null => Value::Null,
            PrimitiveValue::Bool(b) => Value::Bool(b),
            PrimitiveValue::Byte(b) => Value::UInt(b as u64),
            PrimitiveValue::SByte(b) => Value::Int(b as i64),
            PrimitiveValue::Char(c) => Value::UInt(c as u64),
            PrimitiveValue::Int16(n) => Value::Int(n as i64),
            PrimitiveValue::UInt16(n) => Value::UInt(n as u64),
            PrimitiveValue::Int32(n) => Value::Int(n as i64),
            PrimitiveValue::UInt32(n) => Value::UInt(n as u64),
            PrimitiveValue::Int64(n) => Value::Int(n),
            PrimitiveValue::UInt64(n) => Value::UInt(n),
            PrimitiveValue::TimeSpan(n) => Value::Int(n),
            PrimitiveValue::Single(f) => Value::Float32(f),
            PrimitiveValue::Double(f) => Value::Float64(f),
            PrimitiveValue::Decimal(s) => Value::Opaque(s),
            PrimitiveValue::DateTime(bytes) => Value::Bytes(bytes),
            PrimitiveValue::String(s) => Value::String(s),
        }
    }
}

use serde::{Deserialize, Serialize};

/// A node in the resolved graph. `id` is `-1` for synthetic nodes (ROOT,
/// and anonymous array-element containers) that never had a wire id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectNode {
    pub id: i32,
    pub node_type: Option<String>,
    pub name: Option<String>,
    pub value: Option<Value>,
    pub members: Vec<NodeHandle>,
    /// Raw bytes kept alongside a `Byte[]` node so [`crate::nested`] can
    /// probe it without re-deriving them from `value`.
    pub raw_bytes: Option<Vec<u8>>,
}

impl ObjectNode {
    fn unresolved(id: i32) -> Self {
        Self {
            id,
            node_type: Some("Unresolved".to_string()),
            name: None,
            value: None,
            members: Vec::new(),
            raw_bytes: None,
        }
    }

    fn anonymous() -> Self {
        Self {
            id: -1,
            node_type: None,
            name: None,
            value: None,
            members: Vec::new(),
            raw_bytes: None,
        }
    }
}

pub type NodeHandle = Rc<RefCell<ObjectNode>>;

/// The name and member-field names of a class, keyed by the object id it
/// was originally declared under. `ClassWithId` looks itself up here by
/// `metadata_id` (the `ClassLayoutRegistry` itself only lives for the
/// duration of parsing, not graph assembly).
#[derive(Clone)]
struct ClassNaming {
    name: String,
    member_names: Vec<String>,
}

/// Resolves records into a rooted graph. One instance per parse (outer or
/// nested); never shared or reused across parses (spec.md §5).
pub struct ObjectGraphBuilder {
    root_id: i32,
    nodes_by_id: IndexMap<i32, NodeHandle>,
    libraries: IndexMap<i32, NodeHandle>,
    class_layouts: IndexMap<i32, ClassNaming>,
    root: NodeHandle,
    /// Cursor position of the top-level record currently being applied;
    /// used for diagnostics raised while materializing its nested values,
    /// which have no cursor position of their own once parsed.
    current_pos: usize,
}

impl ObjectGraphBuilder {
    pub fn new() -> Self {
        Self {
            root_id: -1,
            nodes_by_id: IndexMap::new(),
            libraries: IndexMap::new(),
            class_layouts: IndexMap::new(),
            root: Rc::new(RefCell::new(ObjectNode::anonymous())),
            current_pos: 0,
        }
    }

    pub fn root(&self) -> NodeHandle {
        Rc::clone(&self.root)
    }

    pub fn root_id(&self) -> i32 {
        self.root_id
    }

    /// Returns the existing node for `id`, or inserts and returns a fresh
    /// `Unresolved` placeholder (spec.md §4.7 `nodeFor`).
    pub(crate) fn node_for(&mut self, id: i32) -> NodeHandle {
        Rc::clone(
            self.nodes_by_id
                .entry(id)
                .or_insert_with(|| Rc::new(RefCell::new(ObjectNode::unresolved(id)))),
        )
    }

    fn library_node(&mut self, library_id: i32, pos: usize) -> Result<NodeHandle> {
        self.libraries
            .get(&library_id)
            .cloned()
            .ok_or(Error::UnknownLibrary {
                id: library_id,
                pos,
            })
    }

    /// Feeds one top-level record into the graph. `pos` is the cursor
    /// position at which the record started, used for `UnknownLibrary`
    /// diagnostics.
    pub fn apply(&mut self, record: &Record, pos: usize) -> Result<()> {
        self.current_pos = pos;
        match record {
            Record::SerializationHeader(header) => {
                self.root_id = header.root_id;
            }
            Record::BinaryLibrary(lib) => {
                let node = self.node_for(lib.library_id);
                {
                    let mut n = node.borrow_mut();
                    n.node_type = Some(lib.library_name.clone());
                }
                self.libraries.insert(lib.library_id, Rc::clone(&node));
                self.root.borrow_mut().members.push(node);
            }
            Record::SystemClassWithMembersAndTypes(class) => {
                let node = self.materialize_system_class(class)?;
                self.root.borrow_mut().members.push(node);
            }
            Record::ClassWithMembersAndTypes(class) => {
                let node = self.materialize_class(class)?;
                let lib = self.library_node(class.library_id, pos)?;
                lib.borrow_mut().members.push(node);
            }
            Record::ClassWithId(c) => {
                let node = self.materialize_class_with_id(c)?;
                self.root.borrow_mut().members.push(node);
            }
            Record::BinaryObjectString { object_id, value } => {
                let node = self.node_for(*object_id);
                {
                    let mut n = node.borrow_mut();
                    n.node_type = Some("String".to_string());
                    n.value = Some(Value::String(value.clone()));
                }
                self.root.borrow_mut().members.push(node);
            }
            Record::MemberReference { id_ref } => {
                self.node_for(*id_ref);
            }
            Record::SystemClassWithMembers(class) => {
                let node = self.materialize_system_class_without_types(class)?;
                self.root.borrow_mut().members.push(node);
            }
            // A top-level array record is itself a graph entry, exactly
            // like a top-level class (spec.md §8 scenarios 5 and 6).
            Record::BinaryArray(_)
            | Record::ArraySinglePrimitive(_)
            | Record::ArraySingleObject(_)
            | Record::ArraySingleString(_) => {
                let node = self.materialize_record_value(record)?;
                self.root.borrow_mut().members.push(node);
            }
            // These carry no standalone graph meaning at the top level;
            // they only matter nested inside a member/element list, which
            // `materialize_members`/array parsing handle.
            Record::ObjectNull | Record::ObjectNullMultiple256(_) | Record::MessageEnd => {}
            Record::MemberPrimitiveTyped { .. } => {}
        }
        Ok(())
    }

    fn materialize_system_class(
        &mut self,
        class: &SystemClassWithMembersAndTypes,
    ) -> Result<NodeHandle> {
        self.class_layouts.insert(
            class.class_info.object_id,
            ClassNaming {
                name: class.class_info.name.clone(),
                member_names: class.class_info.member_names.clone(),
            },
        );
        let node = self.node_for(class.class_info.object_id);
        {
            let mut n = node.borrow_mut();
            n.node_type = Some(class.class_info.name.clone());
        }
        let members =
            self.materialize_members(&class.member_values, Some(&class.class_info.member_names))?;
        let mut n = node.borrow_mut();
        n.members = members;
        Ok(Rc::clone(&node))
    }

    /// `SystemClassWithMembers` reads only `ClassInfo` off the wire — no
    /// member values follow, so the node exists (and its layout is
    /// registered for a later `ClassWithId` to reuse) with no members.
    fn materialize_system_class_without_types(
        &mut self,
        class: &SystemClassWithMembers,
    ) -> Result<NodeHandle> {
        self.class_layouts.insert(
            class.class_info.object_id,
            ClassNaming {
                name: class.class_info.name.clone(),
                member_names: class.class_info.member_names.clone(),
            },
        );
        let node = self.node_for(class.class_info.object_id);
        node.borrow_mut().node_type = Some(class.class_info.name.clone());
        Ok(node)
    }

    fn materialize_class(&mut self, class: &ClassWithMembersAndTypes) -> Result<NodeHandle> {
        self.class_layouts.insert(
            class.class_info.object_id,
            ClassNaming {
                name: class.class_info.name.clone(),
                member_names: class.class_info.member_names.clone(),
            },
        );
        let node = self.node_for(class.class_info.object_id);
        {
            let mut n = node.borrow_mut();
            n.node_type = Some(class.class_info.name.clone());
        }
        let members =
            self.materialize_members(&class.member_values, Some(&class.class_info.member_names))?;
        let mut n = node.borrow_mut();
        n.members = members;
        Ok(Rc::clone(&node))
    }

    /// `ClassWithId` only has `metadataId`; its name and member field
    /// names are recovered from whichever `*WithMembersAndTypes` record
    /// registered that id earlier in this same parse (spec.md §4.4).
    fn materialize_class_with_id(&mut self, c: &ClassWithId) -> Result<NodeHandle> {
        let naming = self
            .class_layouts
            .get(&c.metadata_id)
            .cloned()
            .ok_or(Error::UnknownClassMetadata {
                id: c.metadata_id,
                pos: self.current_pos,
            })?;
        let node = self.node_for(c.object_id);
        {
            let mut n = node.borrow_mut();
            n.node_type = Some(naming.name.clone());
        }
        let members = self.materialize_members(&c.member_values, Some(&naming.member_names))?;
        node.borrow_mut().members = members;
        Ok(node)
    }

    /// Builds the `members`/`element_values` child list for a class or
    /// array record. `names` gives each class member's field name; `None`
    /// (array contexts) names each child by its decimal index (§4.7).
    fn materialize_members(
        &mut self,
        values: &[MemberValue],
        names: Option<&[String]>,
    ) -> Result<Vec<NodeHandle>> {
        let mut out = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            let node = self.materialize_value(value)?;
            let name = match names {
                Some(names) => names.get(i).cloned().unwrap_or_else(|| i.to_string()),
                None => i.to_string(),
            };
            node.borrow_mut().name = Some(name);
            out.push(node);
        }
        Ok(out)
    }

    fn materialize_value(&mut self, value: &MemberValue) -> Result<NodeHandle> {
        Ok(match value {
            MemberValue::Primitive(p) => {
                let node = Rc::new(RefCell::new(ObjectNode::anonymous()));
                {
                    let mut n = node.borrow_mut();
                    n.node_type = Some(primitive_type_name(p));
                    n.value = Some(Value::from(p.clone()));
                }
                node
            }
            MemberValue::Record(record) => self.materialize_record_value(record)?,
        })
    }

    fn materialize_record_value(&mut self, record: &Record) -> Result<NodeHandle> {
        Ok(match record {
            Record::MemberReference { id_ref } => self.node_for(*id_ref),
            Record::BinaryObjectString { object_id, value } => {
                let node = self.node_for(*object_id);
                let mut n = node.borrow_mut();
                n.node_type = Some("String".to_string());
                n.value = Some(Value::String(value.clone()));
                drop(n);
                Rc::clone(&node)
            }
            Record::MemberPrimitiveTyped { kind: _, value } => {
                let node = Rc::new(RefCell::new(ObjectNode::anonymous()));
                {
                    let mut n = node.borrow_mut();
                    n.node_type = Some(primitive_type_name(value));
                    n.value = Some(Value::from(value.clone()));
                }
                node
            }
            Record::ObjectNull => {
                let node = Rc::new(RefCell::new(ObjectNode::anonymous()));
                {
                    let mut n = node.borrow_mut();
                    n.node_type = Some("Null".to_string());
                    n.value = Some(Value::Null);
                }
                node
            }
            Record::SystemClassWithMembersAndTypes(class) => {
                self.materialize_system_class(class)?
            }
            Record::SystemClassWithMembers(class) => {
                self.materialize_system_class_without_types(class)?
            }
            // A nested class value outside a library context (e.g. an
            // array element) is attached directly without a library
            // parent; only top-level ClassWithMembersAndTypes records
            // require one (spec.md §4.4).
            Record::ClassWithMembersAndTypes(class) => self.materialize_class(class)?,
            Record::ClassWithId(c) => self.materialize_class_with_id(c)?,
            Record::BinaryArray(array) => self.materialize_array(
                array.object_id,
                array_type_name(&array.additional_info, "Array"),
                &array.element_values,
            )?,
            Record::ArraySinglePrimitive(array) => {
                let node = self.node_for(array.object_id);
                let mut bytes = Vec::new();
                let mut all_byte = true;
                for v in &array.element_values {
                    match v {
                        PrimitiveValue::Byte(b) => bytes.push(*b),
                        _ => all_byte = false,
                    }
                }
                let mut n = node.borrow_mut();
                n.node_type = Some(format!("{}[]", array.kind.name()));
                if all_byte {
                    n.raw_bytes = Some(bytes.clone());
                    n.value = Some(Value::Bytes(bytes));
                } else {
                    n.value = None;
                }
                drop(n);
                Rc::clone(&node)
            }
            Record::ArraySingleObject(array) => {
                self.materialize_array(array.object_id, "Object[]".to_string(), &array.element_values)?
            }
            Record::ArraySingleString(array) => {
                self.materialize_array(array.object_id, "String[]".to_string(), &array.element_values)?
            }
            other => {
                return Err(Error::UnsupportedFeature {
                    detail: format!("record {:?} cannot appear as a member/element value", other.tag()),
                    pos: 0,
                })
            }
        })
    }

    fn materialize_array(
        &mut self,
        object_id: i32,
        type_name: String,
        elements: &[MemberValue],
    ) -> Result<NodeHandle> {
        let node = self.node_for(object_id);
        {
            let mut n = node.borrow_mut();
            n.node_type = Some(type_name);
        }
        let members = self.materialize_members(elements, None)?;
        node.borrow_mut().members = members;
        Ok(node)
    }
}

impl Default for ObjectGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn primitive_type_name(value: &PrimitiveValue) -> String {
    match value {
        PrimitiveValue::Null => "Null".to_string(),
        PrimitiveValue::Bool(_) => "Boolean".to_string(),
        PrimitiveValue::Byte(_) => "Byte".to_string(),
        PrimitiveValue::SByte(_) => "SByte".to_string(),
        PrimitiveValue::Char(_) => "Char".to_string(),
        PrimitiveValue::Int16(_) => "Int16".to_string(),
        PrimitiveValue::UInt16(_) => "UInt16".to_string(),
        PrimitiveValue::Int32(_) => "Int32".to_string(),
        PrimitiveValue::UInt32(_) => "UInt32".to_string(),
        PrimitiveValue::Int64(_) => "Int64".to_string(),
        PrimitiveValue::UInt64(_) => "UInt64".to_string(),
        PrimitiveValue::TimeSpan(_) => "TimeSpan".to_string(),
        PrimitiveValue::Single(_) => "Single".to_string(),
        PrimitiveValue::Double(_) => "Double".to_string(),
        PrimitiveValue::Decimal(_) => "Decimal".to_string(),
        PrimitiveValue::DateTime(_) => "DateTime".to_string(),
        PrimitiveValue::String(_) => "String".to_string(),
    }
}

fn array_type_name(info: &AdditionalInfo, fallback: &str) -> String {
    match info {
        AdditionalInfo::Primitive(kind) => format!("{}[]", kind.name()),
        AdditionalInfo::SystemClass(name) => format!("{}[]", name),
        AdditionalInfo::Class(info) => format!("{}[]", info.library_name),
        AdditionalInfo::None => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ByteCursor;
    use crate::dispatch;
    use crate::registry::ClassLayoutRegistry;

    fn run(bytes: &[u8]) -> (ObjectGraphBuilder, Vec<Record>) {
        let mut cursor = ByteCursor::new(bytes);
        let mut registry = ClassLayoutRegistry::new();
        let mut graph = ObjectGraphBuilder::new();
        let mut records = Vec::new();
        loop {
            let pos = cursor.position() as usize;
            let record = dispatch::next(&mut cursor, &mut registry).unwrap();
            let done = matches!(record, Record::MessageEnd);
            graph.apply(&record, pos).unwrap();
            records.push(record);
            if done || cursor.at_eof() {
                break;
            }
        }
        (graph, records)
    }

    #[test]
    fn scenario_header_plus_empty_message() {
        let bytes = [
            0x00, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x0B,
        ];
        let (graph, _) = run(&bytes);
        assert_eq!(graph.root_id(), 1);
        assert!(graph.root().borrow().members.is_empty());
    }

    #[test]
    fn scenario_system_class_two_int_members() {
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
        bytes.push(0x0B);

        let (graph, _) = run(&bytes);
        let root = graph.root();
        let root = root.borrow();
        assert_eq!(root.members.len(), 1);
        let pair = root.members[0].borrow();
        assert_eq!(pair.id, 1);
        assert_eq!(pair.node_type.as_deref(), Some("Pair"));
        assert_eq!(pair.members.len(), 2);
        assert_eq!(pair.members[0].borrow().value, Some(Value::Int(7)));
        assert_eq!(pair.members[1].borrow().value, Some(Value::Int(42)));
    }

    #[test]
    fn scenario_library_class_and_back_reference() {
        let mut bytes = vec![0x00u8];
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());

        bytes.push(0x0C);
        bytes.extend_from_slice(&5i32.to_le_bytes());
        bytes.push(3);
        bytes.extend_from_slice(b"Lib");

        bytes.push(0x05);
        bytes.extend_from_slice(&2i32.to_le_bytes());
        bytes.push(1);
        bytes.extend_from_slice(b"C");
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.push(1);
        bytes.extend_from_slice(b"x");
        bytes.push(1); // BinaryType::String
        bytes.extend_from_slice(&5i32.to_le_bytes()); // library_id

        bytes.push(0x09); // MemberReference
        bytes.extend_from_slice(&3i32.to_le_bytes());

        bytes.push(0x06); // BinaryObjectString
        bytes.extend_from_slice(&3i32.to_le_bytes());
        bytes.push(2);
        bytes.extend_from_slice(b"hi");

        bytes.push(0x0B);

        let (graph, _) = run(&bytes);
        let lib_node = graph
            .libraries
            .get(&5)
            .cloned()
            .expect("library registered");
        let lib = lib_node.borrow();
        assert_eq!(lib.members.len(), 1);
        let class_node = lib.members[0].borrow();
        assert_eq!(class_node.id, 2);
        let x = class_node.members[0].borrow();
        assert_eq!(x.id, 3);
        assert_eq!(x.node_type.as_deref(), Some("String"));
        assert_eq!(x.value, Some(Value::String("hi".to_string())));
    }
}
