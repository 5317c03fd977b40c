//! Storage gateways executing statements against an entity table.
//!
//! Every mutating [`Gateway::execute`] call is committed before it returns.

use crate::entity::{Row, Schema};
use crate::result::DbResult;
use crate::value::Value;

pub mod sled;
pub mod sqlite;

pub use self::sled::SledGateway;
pub use self::sqlite::SqliteGateway;

/// A mutating statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    /// Insert a new row, the gateway assigns the id.
    Insert {
        schema: &'a Schema,
        values: Vec<Value>,
    },
    /// Overwrite every field column of the row with `id`.
    Update {
        schema: &'a Schema,
        id: i64,
        values: Vec<Value>,
    },
    Delete {
        schema: &'a Schema,
        id: i64,
    },
}

impl Statement<'_> {
    pub fn schema(&self) -> &Schema {
        match self {
            Statement::Insert { schema, .. }
            | Statement::Update { schema, .. }
            | Statement::Delete { schema, .. } => *schema,
        }
    }
}

/// An exact-match select.
#[derive(Debug, Clone, PartialEq)]
pub enum Query<'a> {
    All {
        schema: &'a Schema,
    },
    ById {
        schema: &'a Schema,
        id: i64,
    },
    ByColumn {
        schema: &'a Schema,
        column: &'a str,
        value: Value,
    },
}

impl Query<'_> {
    pub fn schema(&self) -> &Schema {
        match self {
            Query::All { schema } | Query::ById { schema, .. } | Query::ByColumn { schema, .. } => {
                *schema
            }
        }
    }
}

/// Metadata of an executed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Outcome {
    /// Id assigned by an insert.
    pub last_insert_id: Option<i64>,
    pub rows_affected: usize,
}

/// Executes statements and queries against storage.
pub trait Gateway {
    fn execute(&self, statement: &Statement) -> DbResult<Outcome>;

    /// Rows in `(id, fields...)` order, in the storage's natural scan order.
    fn query(&self, query: &Query) -> DbResult<Vec<Row>>;

    /// Create the table if it does not exist yet.
    fn create_table(&self, schema: &Schema) -> DbResult<()>;

    /// Drop the table if it exists.
    fn drop_table(&self, schema: &Schema) -> DbResult<()>;
}

impl<G: Gateway + ?Sized> Gateway for &G {
    fn execute(&self, statement: &Statement) -> DbResult<Outcome> {
        (**self).execute(statement)
    }

    fn query(&self, query: &Query) -> DbResult<Vec<Row>> {
        (**self).query(query)
    }

    fn create_table(&self, schema: &Schema) -> DbResult<()> {
        (**self).create_table(schema)
    }

    fn drop_table(&self, schema: &Schema) -> DbResult<()> {
        (**self).drop_table(schema)
    }
}
