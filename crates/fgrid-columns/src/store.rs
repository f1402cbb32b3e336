//! Arena of leaf columns.
//!
//! A [`ColumnRef`] is the identity of a leaf. When a definitions update
//! matches an existing leaf, the leaf is mutated in place and keeps its
//! handle, so state keyed by the handle (width, position, selection)
//! survives. Slots are recycled with a bumped generation; a stale handle
//! never resolves to a different column.

use crate::config::ColumnSizing;
use crate::def::{ColDef, ColumnGroupShow, PinnedSide};
use crate::tree::{ColumnTree, GroupRef};
use std::fmt;

/// Generational handle to a [`Column`] in a [`ColumnStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    index: u32,
    generation: u32,
}

impl ColumnRef {
    /// Build a handle from raw parts. Mostly useful in tests.
    #[must_use]
    pub const fn from_raw_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}v{}", self.index, self.generation)
    }
}

/// One data column.
#[derive(Debug, Clone)]
pub struct Column {
    id: String,
    def: ColDef,
    user_def: ColDef,
    primary: bool,
    original_parent: Option<GroupRef>,
    visible: bool,
    pinned: PinnedSide,
    width: u32,
}

impl Column {
    pub(crate) fn new(
        id: String,
        def: ColDef,
        user_def: ColDef,
        primary: bool,
        sizing: &ColumnSizing,
    ) -> Self {
        let width = sizing.initial_width(&def);
        Self {
            id,
            visible: !def.hide.unwrap_or(false),
            pinned: def.pinned.unwrap_or_default(),
            width,
            def,
            user_def,
            primary,
            original_parent: None,
        }
    }

    /// Replace the definitions of a reused leaf and re-apply the state
    /// attributes that the new merged definition sets explicitly.
    pub(crate) fn redefine(
        &mut self,
        def: ColDef,
        user_def: ColDef,
        primary: bool,
        sizing: &ColumnSizing,
    ) {
        if let Some(hide) = def.hide {
            self.visible = !hide;
        }
        if let Some(pinned) = def.pinned {
            self.pinned = pinned;
        }
        self.width = match def.width {
            Some(width) => sizing.clamp_for(&def, width),
            None => sizing.clamp_for(&def, self.width),
        };
        self.def = def;
        self.user_def = user_def;
        self.primary = primary;
    }

    /// Allocated, stable id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Effective definition (defaults, then column types, then user definition).
    #[must_use]
    pub fn def(&self) -> &ColDef {
        &self.def
    }

    /// The definition exactly as the caller supplied it.
    #[must_use]
    pub fn user_def(&self) -> &ColDef {
        &self.user_def
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// Group this leaf sits in within the most recently built tree.
    #[must_use]
    pub fn original_parent(&self) -> Option<GroupRef> {
        self.original_parent
    }

    pub(crate) fn set_original_parent(&mut self, parent: Option<GroupRef>) {
        self.original_parent = parent;
    }

    /// Header text: `headerName`, else `field`, else the id.
    #[must_use]
    pub fn header_name(&self) -> &str {
        self.def
            .header_name
            .as_deref()
            .or(self.def.field.as_deref())
            .unwrap_or(&self.id)
    }

    #[must_use]
    pub fn column_group_show(&self) -> Option<ColumnGroupShow> {
        self.def.column_group_show
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    #[must_use]
    pub fn pinned(&self) -> PinnedSide {
        self.pinned
    }

    pub fn set_pinned(&mut self, side: PinnedSide) {
        self.pinned = side;
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Set the width, clamped to this column's bounds.
    pub fn set_width(&mut self, width: u32, sizing: &ColumnSizing) {
        self.width = sizing.clamp_for(&self.def, width);
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    column: Option<Column>,
}

/// Arena of every live leaf.
#[derive(Debug, Clone, Default)]
pub struct ColumnStore {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    len: usize,
}

impl ColumnStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a column, reusing a free slot when one exists.
    pub fn insert(&mut self, column: Column) -> ColumnRef {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.column = Some(column);
            ColumnRef {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                column: Some(column),
            });
            ColumnRef {
                index,
                generation: 0,
            }
        }
    }

    /// Remove a column. Its handle becomes stale.
    pub fn remove(&mut self, handle: ColumnRef) -> Option<Column> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let column = slot.column.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index);
        self.len -= 1;
        Some(column)
    }

    #[must_use]
    pub fn get(&self, handle: ColumnRef) -> Option<&Column> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.column.as_ref())
    }

    pub fn get_mut(&mut self, handle: ColumnRef) -> Option<&mut Column> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.column.as_mut())
    }

    #[must_use]
    pub fn contains(&self, handle: ColumnRef) -> bool {
        self.get(handle).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live columns in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ColumnRef, &Column)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.column.as_ref().map(|column| {
                (
                    ColumnRef {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    column,
                )
            })
        })
    }

    /// Handles of every live column, in slot order.
    #[must_use]
    pub fn handles(&self) -> Vec<ColumnRef> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    /// Find a live column by its allocated id.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<ColumnRef> {
        self.iter()
            .find(|(_, column)| column.id() == id)
            .map(|(handle, _)| handle)
    }

    /// Drop every column that `tree` does not reference and return them.
    pub fn retain_in(&mut self, tree: &ColumnTree) -> Vec<Column> {
        let dead: Vec<ColumnRef> = self
            .handles()
            .into_iter()
            .filter(|handle| !tree.contains_column(*handle))
            .collect();
        dead.into_iter().filter_map(|handle| self.remove(handle)).collect()
    }
}
