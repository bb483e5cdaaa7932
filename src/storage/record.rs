//! Records stored in heap files.

use std::fmt;

use crate::common::PageIdentity;

/// Location of a record: page plus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page: PageIdentity,
    pub slot: u16,
}

impl RecordId {
    pub fn new(page: PageIdentity, slot: u16) -> Self {
        Self { page, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.page, self.slot)
    }
}

/// A fixed-size record and, once stored, where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: Option<RecordId>,
    data: Vec<u8>,
}

impl Record {
    /// A record not yet stored anywhere.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: None,
            data: data.into(),
        }
    }

    pub(crate) fn stored_at(id: RecordId, data: Vec<u8>) -> Self {
        Self { id: Some(id), data }
    }

    #[inline]
    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    #[inline]
    pub fn set_id(&mut self, id: Option<RecordId>) {
        self.id = id;
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
