use std::path::Path;

use rusqlite::{params, params_from_iter, Connection};
use tracing::debug;

use super::{Gateway, Outcome, Query, Statement};
use crate::entity::{Row, Schema, ID_COLUMN};
use crate::result::DbResult;
use crate::value::Value;

/// SQLite backed gateway. Every statement runs in autocommit mode.
pub struct SqliteGateway {
    conn: Connection,
}

impl SqliteGateway {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> DbResult<Self> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Open an in-memory database
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Raw connection, for statements outside the mapper's contract.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn select_list(schema: &Schema) -> String {
        std::iter::once(ID_COLUMN)
            .chain(schema.columns.iter().map(|c| c.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn insert_sql(schema: &Schema) -> String {
        let columns: Vec<&str> = schema.columns.iter().map(|c| c.name).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table,
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    fn update_sql(schema: &Schema) -> String {
        let assignments: Vec<String> = schema
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", c.name, i + 1))
            .collect();

        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            schema.table,
            assignments.join(", "),
            ID_COLUMN,
            schema.columns.len() + 1
        )
    }

    fn select(&self, sql: &str, params: &[&Value]) -> DbResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<Value>>>()
                    .map(Row)
            })?
            .collect::<rusqlite::Result<Vec<Row>>>()?;

        Ok(rows)
    }
}

impl Gateway for SqliteGateway {
    fn execute(&self, statement: &Statement) -> DbResult<Outcome> {
        let outcome = match statement {
            Statement::Insert { schema, values } => {
                let rows_affected = self.conn.execute(
                    &Self::insert_sql(schema),
                    params_from_iter(values.iter()),
                )?;

                Outcome {
                    last_insert_id: Some(self.conn.last_insert_rowid()),
                    rows_affected,
                }
            }
            Statement::Update { schema, id, values } => {
                let id = Value::Integer(*id);
                let rows_affected = self.conn.execute(
                    &Self::update_sql(schema),
                    params_from_iter(values.iter().chain(std::iter::once(&id))),
                )?;

                Outcome {
                    last_insert_id: None,
                    rows_affected,
                }
            }
            Statement::Delete { schema, id } => {
                let rows_affected = self.conn.execute(
                    &format!("DELETE FROM {} WHERE {} = ?1", schema.table, ID_COLUMN),
                    params![id],
                )?;

                Outcome {
                    last_insert_id: None,
                    rows_affected,
                }
            }
        };

        debug!(
            table = statement.schema().table,
            id = outcome.last_insert_id,
            rows_affected = outcome.rows_affected,
            "sqlite statement committed"
        );

        Ok(outcome)
    }

    fn query(&self, query: &Query) -> DbResult<Vec<Row>> {
        let schema = query.schema();
        let base = format!("SELECT {} FROM {}", Self::select_list(schema), schema.table);

        let rows = match query {
            Query::All { .. } => self.select(&base, &[])?,
            Query::ById { id, .. } => {
                let id = Value::Integer(*id);
                self.select(&format!("{} WHERE {} = ?1", base, ID_COLUMN), &[&id])?
            }
            Query::ByColumn { column, value, .. } => {
                // Only names from the schema ever reach the SQL text.
                let column = schema.columns[schema.position(column)?].name;
                self.select(&format!("{} WHERE {} = ?1", base, column), &[value])?
            }
        };

        debug!(table = schema.table, rows = rows.len(), "sqlite query");

        Ok(rows)
    }

    fn create_table(&self, schema: &Schema) -> DbResult<()> {
        let mut columns = vec![format!("{} INTEGER PRIMARY KEY AUTOINCREMENT", ID_COLUMN)];
        columns.extend(
            schema
                .columns
                .iter()
                .map(|c| format!("{} {}", c.name, c.ty.as_str())),
        );

        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                schema.table,
                columns.join(", ")
            ),
            [],
        )?;
        Ok(())
    }

    fn drop_table(&self, schema: &Schema) -> DbResult<()> {
        self.conn.execute(&format!("DROP TABLE IF EXISTS {}", schema.table), [])?;
        Ok(())
    }
}
