use std::fmt::Debug;

use crate::result::{DbResult, TinyOrmError};
use crate::value::{SqlType, Value};

/// Name of the implicit integer primary key, always the first column.
pub const ID_COLUMN: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: SqlType,
}

/// Column order contract of an entity table.
///
/// `columns` lists the scalar fields in storage order and excludes the id,
/// so a stored row always reads `(id, columns[0], columns[1], ...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Entity name used when displaying records.
    pub entity: &'static str,
    pub table: &'static str,
    pub columns: &'static [Column],
}

impl Schema {
    /// Position of a field column among the non-id columns.
    pub fn position(&self, column: &str) -> DbResult<usize> {
        self.columns
            .iter()
            .position(|c| c.name == column)
            .ok_or_else(|| TinyOrmError::UnknownColumn(column.to_owned()))
    }

    /// Number of columns in a stored row, id included.
    pub fn arity(&self) -> usize {
        self.columns.len() + 1
    }
}

/// A type which maps onto the scalar columns of a single table.
///
/// Usually implemented with `#[derive(Entity)]`.
pub trait Entity: Clone + Debug + 'static {
    const SCHEMA: Schema;

    /// Field values in [`Schema::columns`] order.
    fn to_values(&self) -> Vec<Value>;

    /// Build the entity from exactly `SCHEMA.columns.len()` values.
    fn from_values(values: Vec<Value>) -> DbResult<Self>;
}

/// One stored row, values in `(id, fields...)` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn new(id: i64, values: Vec<Value>) -> Self {
        let mut row = Vec::with_capacity(values.len() + 1);
        row.push(Value::Integer(id));
        row.extend(values);
        Self(row)
    }

    /// Split the row into its id and entity, checking it against the column contract.
    pub fn decode<T: Entity>(self) -> DbResult<(i64, T)> {
        let schema = T::SCHEMA;
        if self.0.len() != schema.arity() {
            return Err(TinyOrmError::Decode(format!(
                "table `{}` expects {} columns, row has {}",
                schema.table,
                schema.arity(),
                self.0.len()
            )));
        }

        let mut values = self.0.into_iter();
        let id = match values.next() {
            Some(Value::Integer(id)) => id,
            other => {
                return Err(TinyOrmError::Decode(format!(
                    "`{}` must be an integer, found {:?}",
                    ID_COLUMN, other
                )))
            }
        };

        Ok((id, T::from_values(values.collect())?))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::value::Field;

    /// Hand written entity used by unit tests across the crate.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Department {
        pub name: String,
        pub location: String,
    }

    impl Department {
        pub(crate) fn new(name: &str, location: &str) -> Self {
            Self {
                name: name.to_owned(),
                location: location.to_owned(),
            }
        }
    }

    impl Entity for Department {
        const SCHEMA: Schema = Schema {
            entity: "Department",
            table: "departments",
            columns: &[
                Column {
                    name: "name",
                    ty: SqlType::Text,
                },
                Column {
                    name: "location",
                    ty: SqlType::Text,
                },
            ],
        };

        fn to_values(&self) -> Vec<Value> {
            vec![self.name.clone().into(), self.location.clone().into()]
        }

        fn from_values(values: Vec<Value>) -> DbResult<Self> {
            let mut values = values.into_iter();
            Ok(Self {
                name: String::from_value(values.next().unwrap_or(Value::Null))?,
                location: String::from_value(values.next().unwrap_or(Value::Null))?,
            })
        }
    }

    #[test]
    fn row_decode() {
        let row = Row::new(4, vec!["Payroll".into(), "Building A".into()]);
        let (id, department) = row.decode::<Department>().unwrap();

        assert_eq!(id, 4);
        assert_eq!(department, Department::new("Payroll", "Building A"));
    }

    #[test]
    fn row_decode_wrong_arity() {
        let row = Row(vec![Value::Integer(1), "Payroll".into()]);
        assert!(matches!(
            row.decode::<Department>(),
            Err(TinyOrmError::Decode(_))
        ));
    }

    #[test]
    fn row_decode_non_integer_id() {
        let row = Row(vec!["1".into(), "Payroll".into(), "Building A".into()]);
        assert!(matches!(
            row.decode::<Department>(),
            Err(TinyOrmError::Decode(_))
        ));
    }

    #[test]
    fn schema_position() {
        assert_eq!(Department::SCHEMA.position("location").unwrap(), 1);
        assert!(matches!(
            Department::SCHEMA.position("budget"),
            Err(TinyOrmError::UnknownColumn(_))
        ));
    }
}
