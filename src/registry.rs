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

//! Per-parse registry of class layouts, keyed by object id, so a later
//! `ClassWithId` record can reuse a layout registered by an earlier
//! `ClassWithMembersAndTypes`/`SystemClassWithMembersAndTypes`.

use crate::error::{Error, Result};
use crate::records::{ClassInfo, MemberTypeInfo};
use std::collections::HashMap;

/// The reusable part of a class declaration: its member names and, when
/// known, their wire types. `SystemClassWithMembers` carries no type info,
/// so `member_type_info` is `None` for that one.
#[derive(Clone)]
pub struct Layout {
    pub class_info: ClassInfo,
    pub member_type_info: Option<MemberTypeInfo>,
}

#[derive(Default)]
pub struct ClassLayoutRegistry {
    layouts: HashMap<i32, Layout>,
}

impl ClassLayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a layout under `id`. Reinserting an id already present is
    /// a fatal `DuplicateClassMetadata` error (§4.5): producers never emit
    /// the same metadata id twice.
    pub fn register(&mut self, id: i32, layout: Layout, pos: usize) -> Result<()> {
        if self.layouts.contains_key(&id) {
            return Err(Error::DuplicateClassMetadata { id, pos });
        }
        self.layouts.insert(id, layout);
        Ok(())
    }

    pub fn lookup(&self, id: i32, pos: usize) -> Result<&Layout> {
        self.layouts
            .get(&id)
            .ok_or(Error::UnknownClassMetadata { id, pos })
    }
}
