use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::entity::Entity;
use crate::result::{DbResult, TinyOrmError};

/// A single record in a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    /// ID of the stored row, `None` while the record is transient or after it was deleted.
    pub id: Option<i64>,
    pub data: T,
}

impl<T> Record<T> {
    pub fn new(data: T) -> Self {
        Self { id: None, data }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

impl<T: Entity> fmt::Display for Record<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} ", T::SCHEMA.entity)?;
        match self.id {
            Some(id) => write!(f, "{}:", id)?,
            None => write!(f, "None:")?,
        }

        let values = self.data.to_values();
        for (i, value) in values.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}", sep, value)?;
        }

        write!(f, ">")
    }
}

/// Shared handle to a [`Record`].
///
/// Handles returned by a [`crate::Mapper`] alias the mapper's cached instance:
/// a later fetch of the same row overwrites the fields every clone of the handle
/// observes. Use [`Handle::snapshot`] to get a copy that is never refreshed.
pub struct Handle<T>(pub(crate) Rc<RefCell<Record<T>>>);

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Handle<T> {
    type Target = Rc<RefCell<Record<T>>>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(record) => f.debug_tuple("Handle").field(&*record).finish(),
            Err(_) => f.write_str("Handle(<borrowed>)"),
        }
    }
}

impl<T> Handle<T> {
    /// Wrap a new transient record.
    pub fn new(data: T) -> Self {
        Self(Rc::new(RefCell::new(Record::new(data))))
    }

    /// Current id of the record, if persisted.
    pub fn id(&self) -> Option<i64> {
        self.0.borrow().id
    }

    /// Whether both handles point at the same in-memory record.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn read(&self) -> DbResult<Ref<'_, Record<T>>> {
        self.0.try_borrow().map_err(|_| TinyOrmError::Borrowed)
    }

    pub(crate) fn write(&self) -> DbResult<RefMut<'_, Record<T>>> {
        self.0.try_borrow_mut().map_err(|_| TinyOrmError::Borrowed)
    }
}

impl<T: Clone> Handle<T> {
    /// Owned copy of the record as it is right now.
    pub fn snapshot(&self) -> Record<T> {
        self.0.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::Department;

    #[test]
    fn record_display() {
        let mut record = Record::new(Department::new("Payroll", "Building A"));
        assert!(!record.is_persisted());
        assert_eq!(record.to_string(), "<Department None: Payroll, Building A>");

        record.id = Some(1);
        assert!(record.is_persisted());
        assert_eq!(record.to_string(), "<Department 1: Payroll, Building A>");
    }

    #[test]
    fn handle_aliasing() {
        let handle = Handle::new(Department::new("Payroll", "Building A"));
        let alias = handle.clone();
        let snapshot = handle.snapshot();

        handle.borrow_mut().data.name = "Finance".to_owned();

        assert!(handle.ptr_eq(&alias));
        assert_eq!(alias.borrow().data.name, "Finance");
        assert_eq!(snapshot.data.name, "Payroll");
        assert_eq!(handle.id(), None);
    }

    #[test]
    fn handle_borrow_conflict() {
        let handle = Handle::new(Department::new("Payroll", "Building A"));
        let _guard = handle.borrow();

        assert!(matches!(handle.write(), Err(TinyOrmError::Borrowed)));
        assert!(handle.read().is_ok());
    }
}
