//! Hook for the host's entity lifecycle container.
//!
//! Every newly created leaf or original group is registered exactly once so
//! width calculation, event wiring and similar systems can attach to it.
//! Reused leaves are not registered again.

use crate::store::{Column, ColumnRef};
use crate::tree::{GroupRef, ProvidedGroup};

/// A freshly created entity, borrowed for the duration of the call.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Column {
        handle: ColumnRef,
        column: &'a Column,
    },
    Group {
        handle: GroupRef,
        group: &'a ProvidedGroup,
    },
}

impl EntityRef<'_> {
    /// Allocated id of the entity.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Column { column, .. } => column.id(),
            Self::Group { group, .. } => group.id(),
        }
    }
}

/// Lifecycle container contract. Calls are fire-and-forget.
pub trait EntityRegistry {
    fn register(&mut self, entity: EntityRef<'_>);

    /// A leaf was dropped from the arena after a rebuild.
    fn release(&mut self, _column: &Column) {}
}

/// Registry that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRegistry;

impl EntityRegistry for NoopRegistry {
    fn register(&mut self, _entity: EntityRef<'_>) {}
}

/// Registry that remembers ids, in call order.
#[derive(Debug, Clone, Default)]
pub struct RecordingRegistry {
    pub columns: Vec<String>,
    pub groups: Vec<String>,
    pub released: Vec<String>,
}

impl RecordingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityRegistry for RecordingRegistry {
    fn register(&mut self, entity: EntityRef<'_>) {
        match entity {
            EntityRef::Column { column, .. } => self.columns.push(column.id().to_owned()),
            EntityRef::Group { group, .. } => self.groups.push(group.id().to_owned()),
        }
    }

    fn release(&mut self, column: &Column) {
        self.released.push(column.id().to_owned());
    }
}

impl<R: EntityRegistry + ?Sized> EntityRegistry for &mut R {
    fn register(&mut self, entity: EntityRef<'_>) {
        (**self).register(entity);
    }

    fn release(&mut self, column: &Column) {
        (**self).release(column);
    }
}
