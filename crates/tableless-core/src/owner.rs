//! Back-references from a tableless record to the host column it came from.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::Result;
use crate::record::TablelessRecord;

/// A host record that stores tableless records in its columns.
///
/// This is the only thing a record knows about its host: after every
/// successful attribute write, the whole record is handed back to
/// [`ColumnOwner::reassign_column`] so that the host notices the change.
pub trait ColumnOwner {
    /// Host type name, for diagnostics.
    fn owner_name(&self) -> &str;

    /// Store `record` as the new value of `column` (`owner[column] = record`).
    fn reassign_column(&self, column: &str, record: &TablelessRecord) -> Result<()>;
}

/// Non-owning link from a record to `owner[column]`.
///
/// The binding never keeps the host alive. Once the host is dropped,
/// propagation is skipped and the record behaves like a standalone one.
#[derive(Clone)]
pub struct OwnerBinding {
    owner: Weak<dyn ColumnOwner>,
    column: String,
}

impl OwnerBinding {
    pub fn new(owner: Weak<dyn ColumnOwner>, column: impl Into<String>) -> Self {
        Self {
            owner,
            column: column.into(),
        }
    }

    /// Bind to a live host.
    pub fn to(owner: &Rc<dyn ColumnOwner>, column: impl Into<String>) -> Self {
        Self::new(Rc::downgrade(owner), column)
    }

    /// The host, if it is still alive.
    pub fn owner(&self) -> Option<Rc<dyn ColumnOwner>> {
        self.owner.upgrade()
    }

    /// Name of the host column this record was materialized from.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// True while the host is alive.
    pub fn is_live(&self) -> bool {
        self.owner.strong_count() > 0
    }

    /// True when this binding points at `owner`.
    pub fn is_owned_by(&self, owner: &Rc<dyn ColumnOwner>) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|live| Rc::ptr_eq(&live, owner))
    }

    /// Hand `record` back to the host column.
    pub(crate) fn propagate(&self, record: &TablelessRecord) -> Result<()> {
        match self.owner.upgrade() {
            Some(owner) => {
                tracing::debug!(
                    owner = owner.owner_name(),
                    column = %self.column,
                    "Propagating tableless change to owner"
                );
                owner.reassign_column(&self.column, record)
            }
            None => {
                tracing::warn!(
                    column = %self.column,
                    "Owner of tableless record dropped, change not propagated"
                );
                Ok(())
            }
        }
    }
}

impl fmt::Debug for OwnerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = self.owner.upgrade();
        f.debug_struct("OwnerBinding")
            .field("owner", &owner.as_ref().map(|o| o.owner_name().to_string()))
            .field("column", &self.column)
            .finish()
    }
}
