use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::entity::{Entity, Row};
use crate::gateway::{Gateway, Query, Statement};
use crate::record::{Handle, Record};
use crate::result::{DbResult, TinyOrmError};
use crate::value::Value;

/// Maps records of `T` onto a table and keeps an identity map of fetched rows.
///
/// Every persisted id resolves to a single [`Handle`] for as long as it stays in the
/// identity map, so repeated lookups of the same row return the same in-memory record.
/// Fetches overwrite the cached fields with what storage returned, discarding edits
/// that were not pushed with [`Mapper::update`].
///
/// The identity map is unsynchronized. A mapper is meant to be owned by one thread.
pub struct Mapper<T: Entity, G: Gateway> {
    gateway: G,
    identity_map: HashMap<i64, Handle<T>>,
}

impl<T: Entity, G: Gateway> Mapper<T, G> {
    /// Creates a mapper with an empty identity map.
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            identity_map: HashMap::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Create the entity table through the gateway.
    pub fn create_table(&self) -> DbResult<()> {
        self.gateway.create_table(&T::SCHEMA)
    }

    /// Drop the entity table and forget every cached record.
    pub fn drop_table(&mut self) -> DbResult<()> {
        self.gateway.drop_table(&T::SCHEMA)?;
        self.evict_all();
        Ok(())
    }

    /// Insert a new record.
    ///
    /// # Arguments
    ///
    /// * `data` - Field values of the new record.
    ///
    /// # Returns
    ///
    /// The cached [`Handle`] of the persisted record.
    pub fn create(&mut self, data: T) -> DbResult<Handle<T>> {
        let handle = Handle::new(data);
        self.save(&handle)?;
        Ok(handle)
    }

    /// Insert a transient record and start tracking it.
    ///
    /// Deleted records are transient again and can be saved under a new id.
    /// On failure the record keeps no id and is not tracked.
    pub fn save(&mut self, handle: &Handle<T>) -> DbResult<()> {
        let schema = T::SCHEMA;
        let mut record = handle.write()?;

        if record.id.is_some() {
            return Err(TinyOrmError::InvalidState("record is already persisted"));
        }

        let outcome = self.gateway.execute(&Statement::Insert {
            schema: &schema,
            values: record.data.to_values(),
        })?;

        let id = outcome
            .last_insert_id
            .ok_or(TinyOrmError::InvalidState("insert did not report an id"))?;

        record.id = Some(id);
        drop(record);

        self.identity_map.insert(id, handle.clone());
        debug!(table = schema.table, id, "record created");

        Ok(())
    }

    /// Write the record's current fields to its row.
    ///
    /// Fails with [`TinyOrmError::InvalidState`] for a record without an id and with
    /// [`TinyOrmError::NotFound`] when no row has the record's id.
    pub fn update(&mut self, handle: &Handle<T>) -> DbResult<()> {
        let schema = T::SCHEMA;
        let (id, values) = {
            let record = handle.read()?;
            let id = record
                .id
                .ok_or(TinyOrmError::InvalidState("cannot update a record without an id"))?;
            (id, record.data.to_values())
        };

        let outcome = self.gateway.execute(&Statement::Update {
            schema: &schema,
            id,
            values,
        })?;

        if outcome.rows_affected == 0 {
            return Err(TinyOrmError::NotFound {
                table: schema.table.to_owned(),
                id,
            });
        }

        self.identity_map.insert(id, handle.clone());
        debug!(table = schema.table, id, "record updated");

        Ok(())
    }

    /// Delete the record's row and detach the record.
    ///
    /// Afterwards the record has no id and is not tracked, whether or not a row
    /// existed. Deleting a detached record does nothing.
    pub fn delete(&mut self, handle: &Handle<T>) -> DbResult<()> {
        let schema = T::SCHEMA;
        let mut record = handle.write()?;

        if let Some(id) = record.id {
            let outcome = self.gateway.execute(&Statement::Delete {
                schema: &schema,
                id,
            })?;

            if outcome.rows_affected == 0 {
                warn!(table = schema.table, id, "deleted record had no row");
            }

            self.identity_map.remove(&id);
            debug!(table = schema.table, id, "record deleted");
        }

        record.id = None;

        Ok(())
    }

    /// Every row of the table, in storage scan order.
    pub fn find_all(&mut self) -> DbResult<Vec<Handle<T>>> {
        let schema = T::SCHEMA;
        let rows = self.gateway.query(&Query::All { schema: &schema })?;

        rows.into_iter().map(|row| self.reconcile(row)).collect()
    }

    /// The record with `id`, or `None` if there is no such row.
    pub fn find_by_id(&mut self, id: i64) -> DbResult<Option<Handle<T>>> {
        let schema = T::SCHEMA;
        let rows = self.gateway.query(&Query::ById {
            schema: &schema,
            id,
        })?;

        self.reconcile_first(rows)
    }

    /// The first record whose `column` equals `value`, or `None` if nothing matches.
    ///
    /// When several rows match, whichever the storage returns first wins.
    pub fn find_by(
        &mut self,
        column: &str,
        value: impl Into<Value>,
    ) -> DbResult<Option<Handle<T>>> {
        let schema = T::SCHEMA;
        let rows = self.gateway.query(&Query::ByColumn {
            schema: &schema,
            column,
            value: value.into(),
        })?;

        self.reconcile_first(rows)
    }

    /// The cached handle for `id`, without touching storage.
    pub fn cached(&self, id: i64) -> Option<Handle<T>> {
        self.identity_map.get(&id).cloned()
    }

    /// Whether `handle` is the instance cached for its id.
    pub fn is_tracked(&self, handle: &Handle<T>) -> bool {
        match handle.read().ok().and_then(|record| record.id) {
            Some(id) => self
                .identity_map
                .get(&id)
                .map_or(false, |cached| cached.ptr_eq(handle)),
            None => false,
        }
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.identity_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identity_map.is_empty()
    }

    /// Stop tracking `id`. The record keeps its id and its row.
    pub fn evict(&mut self, id: i64) -> Option<Handle<T>> {
        self.identity_map.remove(&id)
    }

    /// Stop tracking every record.
    pub fn evict_all(&mut self) {
        self.identity_map.clear();
    }

    fn reconcile_first(&mut self, rows: Vec<Row>) -> DbResult<Option<Handle<T>>> {
        rows.into_iter()
            .next()
            .map(|row| self.reconcile(row))
            .transpose()
    }

    /// Merge a fetched row into the identity map.
    fn reconcile(&mut self, row: Row) -> DbResult<Handle<T>> {
        let (id, data) = row.decode::<T>()?;

        if let Some(cached) = self.identity_map.get(&id) {
            let mut record = cached.write()?;
            record.id = Some(id);
            record.data = data;
            drop(record);

            trace!(table = T::SCHEMA.table, id, "refreshed cached record");
            return Ok(cached.clone());
        }

        let handle = Handle(Rc::new(RefCell::new(Record { id: Some(id), data })));
        self.identity_map.insert(id, handle.clone());
        trace!(table = T::SCHEMA.table, id, "cached fetched record");

        Ok(handle)
    }
}
