use ::sled::{Config, Db, Tree};
use tracing::debug;

use super::{Gateway, Outcome, Query, Statement};
use crate::encoding::{decode, encode};
use crate::entity::{Row, Schema};
use crate::result::{DbResult, TinyOrmError};
use crate::value::Value;

/// Gateway storing each table in its own sled tree.
///
/// Keys are the encoded row ids, values the encoded field columns.
#[derive(Clone)]
pub struct SledGateway {
    engine: Db,
}

impl SledGateway {
    /// Open a sled backed gateway.
    ///
    /// # Arguments
    ///
    /// * `path` - An optional path to the database. If `None`, a temporary database is created.
    /// * `temporary` - If `true`, the database file will be deleted on close.
    pub fn new(path: Option<&str>, temporary: bool) -> DbResult<Self> {
        let config = if let Some(path) = path {
            Config::new().path(path).temporary(temporary)
        } else {
            Config::new().temporary(true)
        };

        Ok(Self::from_db(config.open()?))
    }

    /// Wrap an already opened sled database.
    pub fn from_db(engine: Db) -> Self {
        Self { engine }
    }

    fn tree(&self, schema: &Schema) -> DbResult<Tree> {
        Ok(self.engine.open_tree(schema.table)?)
    }

    fn check_arity(schema: &Schema, values: &[Value]) -> DbResult<()> {
        if values.len() != schema.columns.len() {
            return Err(TinyOrmError::Decode(format!(
                "table `{}` has {} field columns, got {} values",
                schema.table,
                schema.columns.len(),
                values.len()
            )));
        }

        Ok(())
    }

    fn row(key: &[u8], value: &[u8]) -> DbResult<Row> {
        Ok(Row::new(decode(key)?, decode(value)?))
    }

    fn insert(&self, schema: &Schema, values: &[Value]) -> DbResult<Outcome> {
        Self::check_arity(schema, values)?;

        // Rowids start at 1, sled ids at 0.
        let id = self.engine.generate_id()? as i64 + 1;
        self.tree(schema)?.insert(encode(&id)?, encode(values)?)?;

        Ok(Outcome {
            last_insert_id: Some(id),
            rows_affected: 1,
        })
    }

    fn update(&self, schema: &Schema, id: i64, values: &[Value]) -> DbResult<Outcome> {
        Self::check_arity(schema, values)?;

        let serialized_value = encode(values)?;
        let mut rows_affected = 0;

        self.tree(schema)?.update_and_fetch(encode(&id)?, |old_value| {
            rows_affected = usize::from(old_value.is_some());
            old_value.map(|_| serialized_value.clone())
        })?;

        Ok(Outcome {
            last_insert_id: None,
            rows_affected,
        })
    }

    fn delete(&self, schema: &Schema, id: i64) -> DbResult<Outcome> {
        let removed = self.tree(schema)?.remove(encode(&id)?)?;

        Ok(Outcome {
            last_insert_id: None,
            rows_affected: usize::from(removed.is_some()),
        })
    }
}

impl Gateway for SledGateway {
    fn execute(&self, statement: &Statement) -> DbResult<Outcome> {
        let outcome = match statement {
            Statement::Insert { schema, values } => self.insert(schema, values)?,
            Statement::Update { schema, id, values } => self.update(schema, *id, values)?,
            Statement::Delete { schema, id } => self.delete(schema, *id)?,
        };

        self.engine.flush()?;

        debug!(
            table = statement.schema().table,
            id = outcome.last_insert_id,
            rows_affected = outcome.rows_affected,
            "sled statement committed"
        );

        Ok(outcome)
    }

    fn query(&self, query: &Query) -> DbResult<Vec<Row>> {
        let tree = self.tree(query.schema())?;

        let rows = match query {
            Query::All { .. } => tree
                .iter()
                .map(|item| {
                    let (key, value) = item?;
                    Self::row(&key, &value)
                })
                .collect::<DbResult<Vec<Row>>>()?,
            Query::ById { id, .. } => match tree.get(encode(id)?)? {
                Some(value) => vec![Row::new(*id, decode(&value)?)],
                None => Vec::new(),
            },
            Query::ByColumn {
                schema,
                column,
                value,
            } => {
                let index = schema.position(column)?;
                let wanted = value.clone().coerce(schema.columns[index].ty);
                // Offset by one for the id column.
                let position = index + 1;

                let mut rows = vec![];
                for item in tree.iter() {
                    let (key, data) = item?;
                    let row = Self::row(&key, &data)?;
                    if row.0.get(position) == Some(&wanted) {
                        rows.push(row);
                    }
                }

                rows
            }
        };

        debug!(table = query.schema().table, rows = rows.len(), "sled query");

        Ok(rows)
    }

    fn create_table(&self, schema: &Schema) -> DbResult<()> {
        self.tree(schema)?;
        Ok(())
    }

    fn drop_table(&self, schema: &Schema) -> DbResult<()> {
        self.engine.drop_tree(schema.table)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::tests::Department;
    use crate::entity::Entity;

    fn insert(gateway: &SledGateway, name: &str, location: &str) -> i64 {
        gateway
            .execute(&Statement::Insert {
                schema: &Department::SCHEMA,
                values: Department::new(name, location).to_values(),
            })
            .unwrap()
            .last_insert_id
            .expect("insert assigns an id")
    }

    #[test]
    fn sled_insert_and_select() {
        let gateway = SledGateway::new(None, true).unwrap();

        let id = insert(&gateway, "Payroll", "Building A");
        let rows = gateway
            .query(&Query::ById {
                schema: &Department::SCHEMA,
                id,
            })
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].clone().decode::<Department>().unwrap(),
            (id, Department::new("Payroll", "Building A"))
        );
    }

    #[test]
    fn sled_ids_are_positive_and_increasing() {
        let gateway = SledGateway::new(None, true).unwrap();

        let first = insert(&gateway, "Payroll", "Building A");
        let second = insert(&gateway, "HR", "Building C");

        assert!(first >= 1);
        assert!(second > first);
    }

    #[test]
    fn sled_update_missing_row() {
        let gateway = SledGateway::new(None, true).unwrap();

        let outcome = gateway
            .execute(&Statement::Update {
                schema: &Department::SCHEMA,
                id: 42,
                values: Department::new("Payroll", "Building A").to_values(),
            })
            .unwrap();

        assert_eq!(outcome.rows_affected, 0);
        assert!(gateway
            .query(&Query::All {
                schema: &Department::SCHEMA
            })
            .unwrap()
            .is_empty());
    }

    #[test]
    fn sled_delete() {
        let gateway = SledGateway::new(None, true).unwrap();
        let id = insert(&gateway, "Payroll", "Building A");

        let delete = Statement::Delete {
            schema: &Department::SCHEMA,
            id,
        };

        assert_eq!(gateway.execute(&delete).unwrap().rows_affected, 1);
        assert_eq!(gateway.execute(&delete).unwrap().rows_affected, 0);
    }

    #[test]
    fn sled_select_by_column() {
        let gateway = SledGateway::new(None, true).unwrap();
        insert(&gateway, "Payroll", "Building A");
        let hr = insert(&gateway, "HR", "Building C");

        let rows = gateway
            .query(&Query::ByColumn {
                schema: &Department::SCHEMA,
                column: "name",
                value: "HR".into(),
            })
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0[0], Value::Integer(hr));

        assert!(matches!(
            gateway.query(&Query::ByColumn {
                schema: &Department::SCHEMA,
                column: "budget",
                value: Value::Null,
            }),
            Err(TinyOrmError::UnknownColumn(_))
        ));
    }

    #[test]
    fn sled_select_by_column_coerces_value() {
        let gateway = SledGateway::new(None, true).unwrap();
        let id = insert(&gateway, "10", "Building A");

        let rows = gateway
            .query(&Query::ByColumn {
                schema: &Department::SCHEMA,
                column: "name",
                value: Value::Integer(10),
            })
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0[0], Value::Integer(id));
    }

    #[test]
    fn sled_ids_are_not_reused() {
        let gateway = SledGateway::new(None, true).unwrap();
        let first = insert(&gateway, "Payroll", "Building A");

        gateway
            .execute(&Statement::Delete {
                schema: &Department::SCHEMA,
                id: first,
            })
            .unwrap();

        assert!(insert(&gateway, "Payroll", "Building A") > first);
    }

    #[test]
    fn sled_insert_wrong_arity() {
        let gateway = SledGateway::new(None, true).unwrap();

        assert!(matches!(
            gateway.execute(&Statement::Insert {
                schema: &Department::SCHEMA,
                values: vec!["Payroll".into()],
            }),
            Err(TinyOrmError::Decode(_))
        ));
    }
}
