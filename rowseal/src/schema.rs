//! Column and table schemas, rows and tables.

use std::sync::Arc;

use crate::error::{CodecError, Error};
use crate::types::{DataType, SqlType, Value};

/// Default precision and scale for decimal columns without a declaration.
pub const DEFAULT_DECIMAL_PRECISION: (u8, u8) = (18, 2);

/// Schema of a single column.
///
/// # Example
///
/// ```
/// use rowseal::schema::ColumnSchema;
/// use rowseal::types::{DataType, SqlType};
///
/// let col = ColumnSchema::new("code", DataType::Text)
///     .with_sql_type(SqlType::Char)
///     .with_max_length(10)
///     .not_null();
/// assert_eq!(col.sql_type_name(), "char(10)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    /// Column name, unique within its table.
    pub name: String,
    /// Semantic type.
    pub data_type: DataType,
    /// Declared maximum length; `None` means unbounded or not declared.
    pub max_length: Option<u32>,
    /// Whether the column accepts nulls.
    pub nullable: bool,
    /// Zero-based position, assigned by [`TableSchema::new`].
    pub ordinal: usize,
    /// Decimal precision, when declared.
    pub precision: Option<u8>,
    /// Decimal scale, when declared.
    pub scale: Option<u8>,
    /// Originating dialect type, when known.
    pub sql_type: Option<SqlType>,
}

impl ColumnSchema {
    /// Creates a nullable column with no length, precision or dialect type.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            max_length: None,
            nullable: true,
            ordinal: 0,
            precision: None,
            scale: None,
            sql_type: None,
        }
    }

    /// Sets the declared maximum length.
    #[must_use]
    pub const fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Marks the column as not accepting nulls.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Records the originating dialect type.
    #[must_use]
    pub const fn with_sql_type(mut self, sql_type: SqlType) -> Self {
        self.sql_type = Some(sql_type);
        self
    }

    /// Sets decimal precision and scale.
    #[must_use]
    pub const fn with_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    /// Dialect type to emit: the declared one, else the default for the
    /// semantic type.
    #[must_use]
    pub fn effective_sql_type(&self) -> SqlType {
        self.sql_type.unwrap_or_else(|| self.data_type.default_sql_type())
    }

    /// Maximum length in wire form, `-1` for unbounded.
    #[must_use]
    pub fn wire_max_length(&self) -> i64 {
        self.max_length.map_or(-1, i64::from)
    }

    /// Full dialect type name, e.g. `nvarchar(50)`, `varbinary(max)` or
    /// `decimal(18,2)`.
    #[must_use]
    pub fn sql_type_name(&self) -> String {
        let sql_type = self.effective_sql_type();
        if sql_type.takes_length() {
            match self.max_length {
                Some(len) => format!("{sql_type}({len})"),
                None => format!("{sql_type}(max)"),
            }
        } else if sql_type == SqlType::Decimal {
            let (p, s) = self.precision_and_scale();
            format!("{sql_type}({p},{s})")
        } else {
            sql_type.name().to_string()
        }
    }

    /// Declared precision and scale, or the decimal defaults.
    #[must_use]
    pub fn precision_and_scale(&self) -> (u8, u8) {
        (
            self.precision.unwrap_or(DEFAULT_DECIMAL_PRECISION.0),
            self.scale.unwrap_or(DEFAULT_DECIMAL_PRECISION.1),
        )
    }

    /// Checks that `value` may be stored in this column.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] when the value's kind differs
    /// from the column's semantic type.
    pub fn check_value(&self, value: &Value) -> Result<(), CodecError> {
        match value.data_type() {
            None => Ok(()),
            Some(t) if t == self.data_type => Ok(()),
            Some(_) => Err(CodecError::TypeMismatch {
                column: self.name.clone(),
                expected: self.data_type.tag(),
                actual: value.kind_name(),
            }),
        }
    }
}

/// Ordered column set of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableSchema {
    columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Builds a schema, assigning ordinals in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if a name is empty or repeated, or if
    /// a declared dialect type disagrees with the column's semantic type.
    pub fn new(columns: impl IntoIterator<Item = ColumnSchema>) -> Result<Self, Error> {
        let mut out: Vec<ColumnSchema> = Vec::new();
        for (ordinal, mut column) in columns.into_iter().enumerate() {
            if column.name.trim().is_empty() {
                return Err(Error::InvalidArgument(format!("column {ordinal} has an empty name")));
            }
            if out.iter().any(|c| c.name.eq_ignore_ascii_case(&column.name)) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate column name: {}",
                    column.name
                )));
            }
            if let Some(sql_type) = column.sql_type {
                if sql_type.data_type() != column.data_type {
                    return Err(Error::InvalidArgument(format!(
                        "column '{}': declared type {sql_type} does not hold {} values",
                        column.name, column.data_type
                    )));
                }
            }
            column.ordinal = ordinal;
            out.push(column);
        }
        Ok(Self { columns: out })
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Columns in ordinal order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    /// Looks up a column by name (case-insensitive).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Ordinal of the named column.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.column(name).map(|c| c.ordinal)
    }
}

/// One row of values bound to a shared schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Arc<TableSchema>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row; `values` must hold one entry per column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] on an arity mismatch.
    pub fn new(schema: Arc<TableSchema>, values: Vec<Value>) -> Result<Self, Error> {
        if values.len() != schema.len() {
            return Err(Error::InvalidArgument(format!(
                "row has {} values for {} columns",
                values.len(),
                schema.len()
            )));
        }
        Ok(Self { schema, values })
    }

    /// The row's schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Values in column order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value at `ordinal`.
    #[must_use]
    pub fn value(&self, ordinal: usize) -> Option<&Value> {
        self.values.get(ordinal)
    }

    /// Value of the named column.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Consumes the row, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Pairs each column with its value.
    pub fn iter(&self) -> impl Iterator<Item = (&ColumnSchema, &Value)> {
        self.schema.columns().iter().zip(&self.values)
    }
}

/// A schema plus any number of rows sharing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Arc<TableSchema>,
    rows: Vec<Row>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(schema: impl Into<Arc<TableSchema>>) -> Self {
        Self { schema: schema.into(), rows: Vec::new() }
    }

    /// Gathers decrypted rows back into one table.
    ///
    /// No rows gives an empty table with no columns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the rows do not all share one
    /// schema.
    pub fn from_rows(rows: Vec<Row>) -> Result<Self, Error> {
        let Some(first) = rows.first() else {
            return Ok(Self::new(TableSchema::default()));
        };
        let schema = Arc::clone(first.schema());
        if let Some(index) = rows.iter().position(|r| r.schema() != &schema) {
            return Err(Error::InvalidArgument(format!(
                "row {index} has a different schema from row 0"
            )));
        }
        let rows = rows.into_iter().map(|r| Row { schema: Arc::clone(&schema), values: r.values }).collect();
        Ok(Self { schema, rows })
    }

    /// Appends a row built from `values`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] on an arity mismatch.
    pub fn push(&mut self, values: Vec<Value>) -> Result<&Row, Error> {
        let row = Row::new(Arc::clone(&self.schema), values)?;
        self.rows.push(row);
        Ok(&self.rows[self.rows.len() - 1])
    }

    /// The shared schema.
    #[must_use]
    pub fn schema(&self) -> &Arc<TableSchema> {
        &self.schema
    }

    /// Rows in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consumes the table, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
