//! SQLite boundary: raw cell values in, typed parameters out.
//!
//! The driver executes every statement; this module only maps values across
//! the boundary and feeds result sets through [`RowShape`].

use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, Statement};
use serde::Serialize;
use tracing::debug;

use crate::coerce::{parse, FromValue, ToValue};
use crate::error::{Error, Result};
use crate::format;
use crate::record::{Record, RowShape};
use crate::value::Value;

/// Name of the single parameter bound by [`Params::data`].
pub const DATA_PARAM: &str = "@Data";

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Self::DbNull,
            ValueRef::Integer(v) => Self::I64(v),
            ValueRef::Real(v) => Self::F64(v),
            ValueRef::Text(v) => Self::Text(String::from_utf8_lossy(v).into_owned()),
            ValueRef::Blob(v) => Self::Binary(v.to_vec()),
        }
    }
}

fn conversion_failure(err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(err))
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Self::Null | Self::DbNull => SqlValue::Null,
            Self::Bool(v) => SqlValue::Integer(i64::from(*v)),
            Self::I8(v) => SqlValue::Integer(i64::from(*v)),
            Self::I16(v) => SqlValue::Integer(i64::from(*v)),
            Self::I32(v) => SqlValue::Integer(i64::from(*v)),
            Self::I64(v) => SqlValue::Integer(*v),
            Self::U8(v) => SqlValue::Integer(i64::from(*v)),
            Self::U16(v) => SqlValue::Integer(i64::from(*v)),
            Self::U32(v) => SqlValue::Integer(i64::from(*v)),
            Self::U64(v) => SqlValue::Integer(i64::try_from(*v).map_err(conversion_failure)?),
            Self::F32(v) => SqlValue::Real(f64::from(*v)),
            Self::F64(v) => SqlValue::Real(*v),
            Self::Text(v) => return Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
            Self::Binary(v) => return Ok(ToSqlOutput::Borrowed(ValueRef::Blob(v))),
            Self::Json(node) => SqlValue::Text(node.to_string()),
            other => SqlValue::Text(format::serialize(other).map_err(conversion_failure)?),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// Parameter bindings for SQL queries, in insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Params {
    values: Vec<(String, Value)>,
}

impl Params {
    /// Create a new Params object
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value. Bare names get a `:` prefix.
    pub fn with_value(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.push((normalize(name), value.into()));
        self
    }

    /// Add any [`ToValue`], e.g. an enum member or a [`Json`](crate::Json) wrapper.
    pub fn with<T: ToValue + ?Sized>(self, name: &str, value: &T) -> Result<Self> {
        Ok(self.with_value(name, value.to_value()?))
    }

    /// Add a serializable value. Scalars bind as themselves; arrays and
    /// objects bind as JSON document text.
    pub fn with_json<T: Serialize + ?Sized>(self, name: &str, value: &T) -> Result<Self> {
        let node = serde_json::to_value(value)
            .map_err(|e| Error::structural(std::any::type_name::<T>(), e))?;
        Ok(self.with_value(name, json_param(node)))
    }

    /// A single `@Data` parameter holding `value`, see [`Params::with_json`].
    pub fn data<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Self::new().with_json(DATA_PARAM, value)
    }

    /// One parameter per field of a serializable struct.
    ///
    /// Nested arrays and objects are bound as JSON text.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let target = std::any::type_name::<T>();
        let node = serde_json::to_value(value).map_err(|e| Error::structural(target, e))?;
        let serde_json::Value::Object(fields) = node else {
            return Err(Error::structural_msg(target, "expected a struct or map"));
        };
        Ok(fields.into_iter().fold(Self::new(), |params, (name, field)| {
            params.with_value(&name, json_param(field))
        }))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Bound value for `name`, which is normalized like on insertion.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = normalize(name);
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }
}

fn normalize(name: &str) -> String {
    if name.starts_with([':', '@', '$', '?']) {
        name.to_owned()
    } else {
        format!(":{name}")
    }
}

fn json_param(node: serde_json::Value) -> Value {
    match node {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(v) => Value::Bool(v),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(v), _) => Value::I64(v),
            (None, Some(v)) => Value::U64(v),
            _ => n.as_f64().map_or(Value::Null, Value::F64),
        },
        serde_json::Value::String(v) => Value::Text(v),
        other => Value::Json(other),
    }
}

/// SQL Query with typed parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub statement: String,
    pub params: Params,
}

impl SqlQuery {
    pub fn new(statement: &str) -> Self {
        Self {
            statement: statement.to_string(),
            params: Params::new(),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

impl From<&str> for SqlQuery {
    fn from(statement: &str) -> Self {
        Self::new(statement)
    }
}

/// Typed reads and writes on a SQLite connection.
pub trait ConnectionExt {
    /// Execute a statement, returning the number of rows changed.
    fn exec(&self, query: &SqlQuery) -> Result<usize>;

    /// First column of the first row, coerced to `T`; `default` when the
    /// statement returns no columns or no rows, or the cell is NULL.
    fn scalar<T: FromValue>(&self, query: &SqlQuery, default: T) -> Result<T>;

    /// Project every row of the result onto `T`.
    fn read<T: Record>(&self, query: &SqlQuery) -> Result<Vec<T>>;
}

impl ConnectionExt for Connection {
    fn exec(&self, query: &SqlQuery) -> Result<usize> {
        let mut statement = prepare(self, query)?;
        let changed = statement.raw_execute()?;
        debug!(changed, "statement executed");
        Ok(changed)
    }

    fn scalar<T: FromValue>(&self, query: &SqlQuery, default: T) -> Result<T> {
        let mut statement = prepare(self, query)?;
        if statement.column_count() == 0 {
            let changed = statement.raw_execute()?;
            debug!(changed, "statement returned no columns");
            return Ok(default);
        }
        let mut rows = statement.raw_query();
        let value = match rows.next()? {
            Some(row) => Value::from(row.get_ref(0)?),
            None => Value::Null,
        };
        parse(value, default)
    }

    fn read<T: Record>(&self, query: &SqlQuery) -> Result<Vec<T>> {
        let mut statement = prepare(self, query)?;
        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_owned)
            .collect();

        let mut shape: Option<RowShape<T>> = None;
        let mut items = Vec::new();
        let mut rows = statement.raw_query();
        while let Some(row) = rows.next()? {
            let shape = shape.get_or_insert_with(|| RowShape::new(columns.as_slice()));
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(Value::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            items.push(shape.project(values)?);
        }
        debug!(rows = items.len(), "result set read");
        Ok(items)
    }
}

fn prepare<'c>(conn: &'c Connection, query: &SqlQuery) -> Result<Statement<'c>> {
    let mut statement = conn.prepare(&query.statement)?;
    for (name, value) in query.params.iter() {
        match statement.parameter_index(name)? {
            Some(index) => statement.raw_bind_parameter(index, value)?,
            None => debug!(parameter = name, "not used by statement, skipped"),
        }
    }
    Ok(statement)
}
