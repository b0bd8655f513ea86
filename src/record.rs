//! Row projection.
//!
//! A [`RowShape`] maps the columns of one result set onto the writable
//! properties of a [`Record`]. It is built once per result set and reused
//! for every row; [`RowShape::project`] then only walks the cached indexes.

use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, trace};

use crate::coerce::{parse, FromValue};
use crate::error::{Error, Result};
use crate::value::Value;

/// Assigns a coerced column value to one property of `T`.
pub type Setter<T> = fn(&mut T, Value) -> Result<()>;

/// A named property of a record type.
pub struct Property<T> {
    pub name: &'static str,
    setter: Option<Setter<T>>,
}

impl<T> Property<T> {
    pub const fn writable(name: &'static str, setter: Setter<T>) -> Self {
        Self {
            name,
            setter: Some(setter),
        }
    }

    /// A property columns are never written to, even when the names match.
    pub const fn readonly(name: &'static str) -> Self {
        Self { name, setter: None }
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// A type rows can be projected onto.
///
/// Usually implemented with [`record!`](crate::record).
pub trait Record: Default + 'static {
    /// Public properties in declaration order.
    fn properties() -> &'static [Property<Self>];
}

/// Column to property mapping for one result set.
pub struct RowShape<T> {
    columns: Vec<String>,
    indexes: Vec<Option<usize>>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> RowShape<T> {
    /// Resolve each column to the first writable property with the exact
    /// (case-sensitive) same name.
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        let properties = T::properties();
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_owned()).collect();
        let indexes: Vec<Option<usize>> = columns
            .iter()
            .map(|column| {
                properties
                    .iter()
                    .position(|p| p.is_writable() && p.name == column.as_str())
            })
            .collect();

        for (column, index) in columns.iter().zip(&indexes) {
            if index.is_none() {
                trace!(column = %column, "no writable property, column skipped");
            }
        }
        debug!(
            record = std::any::type_name::<T>(),
            columns = columns.len(),
            matched = indexes.iter().flatten().count(),
            "row shape built"
        );

        Self {
            columns,
            indexes,
            _record: PhantomData,
        }
    }

    /// Number of columns the shape was built for.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Property index for the column at `position`, `None` when unmatched.
    pub fn index_of(&self, position: usize) -> Option<usize> {
        self.indexes.get(position).copied().flatten()
    }

    /// Build a fresh `T` from one row of raw values.
    ///
    /// Unmatched columns are skipped. Coercion failures carry the column name.
    pub fn project(&self, row: Vec<Value>) -> Result<T> {
        if row.len() != self.width() {
            return Err(Error::ColumnCount {
                expected: self.width(),
                actual: row.len(),
            });
        }

        let properties = T::properties();
        let mut item = T::default();
        for ((value, index), column) in row.into_iter().zip(&self.indexes).zip(&self.columns) {
            let Some(setter) = index.and_then(|i| properties.get(i)).and_then(|p| p.setter) else {
                continue;
            };
            setter(&mut item, value).map_err(|e| e.in_column(column.as_str()))?;
        }
        Ok(item)
    }
}

impl<T> fmt::Debug for RowShape<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowShape")
            .field("columns", &self.columns)
            .field("indexes", &self.indexes)
            .finish()
    }
}

/// Build the shape of a result set for `T`.
pub fn init_shape<T: Record, S: AsRef<str>>(columns: &[S]) -> RowShape<T> {
    RowShape::new(columns)
}

/// Project one row through a shape built by [`init_shape`].
pub fn project_row<T: Record>(row: Vec<Value>, shape: &RowShape<T>) -> Result<T> {
    shape.project(row)
}

/// Coerce `value` into `slot`, falling back to the type's default on null.
#[doc(hidden)]
pub fn assign<F: FromValue + Default>(slot: &mut F, value: Value) -> Result<()> {
    *slot = parse(value, F::default())?;
    Ok(())
}

/// Implement [`Record`] by binding column names to struct fields.
///
/// ```
/// #[derive(Default)]
/// struct User {
///     id: i64,
///     name: Option<String>,
/// }
///
/// rust_sql::record! {
///     User {
///         "Id" => id,
///         "Name" => name,
///     }
///     readonly ["DisplayName"]
/// }
///
/// let shape = rust_sql::init_shape::<User, _>(&["Id", "Name", "DisplayName"]);
/// let user = shape
///     .project(vec![7i64.into(), "ann".into(), "Ann".into()])
///     .unwrap();
/// assert_eq!(user.id, 7);
/// assert_eq!(user.name.as_deref(), Some("ann"));
/// ```
#[macro_export]
macro_rules! record {
    (
        $ty:ty {
            $($column:literal => $field:ident),* $(,)?
        }
        $(readonly [$($readonly:literal),* $(,)?])?
    ) => {
        impl $crate::record::Record for $ty {
            fn properties() -> &'static [$crate::record::Property<Self>] {
                const PROPERTIES: &[$crate::record::Property<$ty>] = &[
                    $(
                        $crate::record::Property::writable(
                            $column,
                            |item: &mut $ty, value: $crate::Value| {
                                $crate::record::assign(&mut item.$field, value)
                            },
                        ),
                    )*
                    $($($crate::record::Property::readonly($readonly),)*)?
                ];
                PROPERTIES
            }
        }
    };
}
