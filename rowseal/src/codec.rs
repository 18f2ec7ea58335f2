//! Tabular codec: rows, schemas and tables to and from self-describing text.
//!
//! Three document shapes are handled here:
//!
//! - **Row document**: one `Row` element with a `Column` child per value.
//!   Each column carries `Name`, `Type` (dialect type), `MaxLength` for
//!   sized types, and `IsNull`. Text payloads are written and read back
//!   byte-for-byte; fixed-width padding is never trimmed or added.
//! - **Table document**: `Table > Schema + Rows > Row*`.
//! - **Embedded-schema document**: rows as elements named after their
//!   columns, optionally preceded by an inline XSD describing each column's
//!   dialect type, length and nillability. Wrappers of any depth are
//!   tolerated on input.

use std::sync::Arc;

use crate::error::{CodecError, Error};
use crate::schema::{ColumnSchema, Row, Table, TableSchema};
use crate::types::{DataType, SqlType, Value};
use crate::xml::Element;

/// Element name of a row.
pub const ROW: &str = "Row";
/// Element name of a schema block.
pub const SCHEMA: &str = "Schema";
/// Element name of a column (in both rows and schemas).
pub const COLUMN: &str = "Column";

const TABLE: &str = "Table";
const ROWS: &str = "Rows";

const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const SQLTYPES_NS: &str = "http://schemas.microsoft.com/sqlserver/2004/sqltypes";
const SQLTYPES_LOCATION: &str = "http://schemas.microsoft.com/sqlserver/2004/sqltypes/sqltypes.xsd";
const ROWSET_NS: &str = "urn:schemas-microsoft-com:sql:SqlRowSet1";

/// Serialises a row to its row document.
///
/// A null in a non-nullable column is written as the type's zero value.
///
/// # Errors
///
/// Returns [`CodecError::TypeMismatch`] if a value's kind differs from its
/// column's semantic type.
pub fn row_to_element(row: &Row) -> Result<Element, Error> {
    let mut el = Element::new(ROW);
    for (column, value) in row.iter() {
        column.check_value(value)?;
        let value = non_null_or_zero(column, value);

        let sql_type = column.effective_sql_type();
        let mut col = Element::new(COLUMN)
            .with_attr("Name", column.name.as_str())
            .with_attr("Type", sql_type.name());
        if let (true, Some(len)) = (sql_type.takes_length(), column.max_length) {
            col = col.with_attr("MaxLength", len.to_string());
        }
        match value.to_canonical() {
            Some(text) => col = col.with_attr("IsNull", "false").with_text(text),
            None => col = col.with_attr("IsNull", "true"),
        }
        el.push(col);
    }
    Ok(el)
}

/// Serialises a row to row-document text.
///
/// # Errors
///
/// See [`row_to_element`].
pub fn row_to_xml(row: &Row) -> Result<String, Error> {
    Ok(row_to_element(row)?.to_xml())
}

/// Reads a row document against `schema`.
///
/// `IsNull` is authoritative. With `IsNull="false"` and no text, text and XML
/// columns read as empty strings; without `IsNull`, no text reads as null.
/// Columns absent from the document read as null.
///
/// # Errors
///
/// Returns [`CodecError::Conversion`] naming the column whose text does not
/// parse as its type, [`CodecError::UnknownColumn`] for a column the schema
/// does not have, and [`CodecError::MissingElement`] if a non-nullable
/// column is absent.
pub fn row_from_element(schema: &Arc<TableSchema>, el: &Element) -> Result<Row, Error> {
    if !el.is(ROW) {
        return Err(CodecError::MissingElement(ROW.to_string()).into());
    }
    let mut values: Vec<Option<Value>> = vec![None; schema.len()];

    for col in el.children_named(COLUMN) {
        let name = col.attr("Name").ok_or_else(|| CodecError::MissingElement("Name".into()))?;
        let column =
            schema.column(name).ok_or_else(|| CodecError::UnknownColumn(name.to_string()))?;

        let is_null = match col.attr("IsNull") {
            Some(flag) => crate::types::parse_bool(flag).ok_or_else(|| {
                CodecError::InvalidSchema(format!("column '{name}': bad IsNull {flag:?}"))
            })?,
            None => col.text.is_empty(),
        };
        let value = if is_null {
            Value::Null
        } else {
            Value::parse(column.data_type, &col.text).map_err(|e| e.for_column(&column.name))?
        };
        values[column.ordinal] = Some(value);
    }

    let values = schema
        .columns()
        .iter()
        .zip(values)
        .map(|(column, value)| match value {
            Some(v) => Ok(v),
            None if column.nullable => Ok(Value::Null),
            None => Err(CodecError::MissingElement(column.name.clone())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Row::new(Arc::clone(schema), values)
}

/// Reads row-document text against `schema`.
///
/// # Errors
///
/// See [`row_from_element`]; also fails on malformed XML.
pub fn row_from_xml(schema: &Arc<TableSchema>, text: &str) -> Result<Row, Error> {
    row_from_element(schema, &Element::parse(text)?)
}

/// Serialises a schema to a `Schema` element.
///
/// The declared dialect type is written as `SqlType` only when the column
/// carries one, so re-reading restores exactly what was declared.
#[must_use]
pub fn schema_to_element(schema: &TableSchema) -> Element {
    let mut el = Element::new(SCHEMA);
    for column in schema.columns() {
        let mut col = Element::new(COLUMN)
            .with_attr("Name", column.name.as_str())
            .with_attr("DataType", column.data_type.tag());
        if let Some(sql_type) = column.sql_type {
            col = col.with_attr("SqlType", sql_type.name());
        }
        col = col
            .with_attr("MaxLength", column.wire_max_length().to_string())
            .with_attr("Nullable", column.nullable.to_string())
            .with_attr("Ordinal", column.ordinal.to_string());
        if let Some(p) = column.precision {
            col = col.with_attr("Precision", p.to_string());
        }
        if let Some(s) = column.scale {
            col = col.with_attr("Scale", s.to_string());
        }
        el.push(col);
    }
    el
}

/// Reads a `Schema` element.
///
/// # Errors
///
/// Returns [`CodecError::InvalidSchema`] for unreadable attributes and
/// [`Error::InvalidArgument`] if the resulting schema is inconsistent.
pub fn schema_from_element(el: &Element) -> Result<TableSchema, Error> {
    let mut columns = Vec::new();
    for (position, col) in el.children_named(COLUMN).enumerate() {
        let name = col.attr("Name").ok_or_else(|| CodecError::MissingElement("Name".into()))?;
        let sql_type = col
            .attr("SqlType")
            .map(|raw| {
                SqlType::from_name(raw).ok_or_else(|| {
                    CodecError::InvalidSchema(format!("column '{name}': unknown SqlType {raw:?}"))
                })
            })
            .transpose()?;
        let data_type = match col.attr("DataType") {
            Some(tag) => DataType::from_tag_or_text(tag),
            None => sql_type.map_or(DataType::Text, SqlType::data_type),
        };
        let mut column = ColumnSchema::new(name, data_type);
        column.sql_type = sql_type;
        column.max_length = match col.attr("MaxLength").map(str::trim) {
            None | Some("-1" | "") => None,
            Some(raw) => Some(raw.parse().map_err(|_| {
                CodecError::InvalidSchema(format!("column '{name}': bad MaxLength {raw:?}"))
            })?),
        };
        column.nullable = col.attr("Nullable").and_then(crate::types::parse_bool).unwrap_or(true);
        column.precision = parse_u8_attr(col, "Precision")?;
        column.scale = parse_u8_attr(col, "Scale")?;
        column.ordinal = match col.attr("Ordinal") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                CodecError::InvalidSchema(format!("column '{name}': bad Ordinal {raw:?}"))
            })?,
            None => position,
        };
        columns.push(column);
    }
    columns.sort_by_key(|c| c.ordinal);
    TableSchema::new(columns)
}

fn parse_u8_attr(el: &Element, name: &str) -> Result<Option<u8>, CodecError> {
    el.attr(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| CodecError::InvalidSchema(format!("bad {name} {raw:?}")))
        })
        .transpose()
}

/// Serialises a whole table: `Table > Schema + Rows > Row*`.
///
/// # Errors
///
/// See [`row_to_element`].
pub fn table_to_xml(table: &Table) -> Result<String, Error> {
    let mut rows = Element::new(ROWS);
    for row in table.rows() {
        rows.push(row_to_element(row)?);
    }
    Ok(Element::new(TABLE)
        .with_child(schema_to_element(table.schema()))
        .with_child(rows)
        .to_xml())
}

/// Reads a table document.
///
/// # Errors
///
/// Fails on malformed XML, a missing `Schema`, or any row that does not
/// decode against the schema.
pub fn table_from_xml(text: &str) -> Result<Table, Error> {
    let root = Element::parse(text)?;
    let schema_el = root.child(SCHEMA).ok_or_else(|| CodecError::MissingElement(SCHEMA.into()))?;
    let mut table = Table::new(schema_from_element(schema_el)?);
    let schema = Arc::clone(table.schema());
    if let Some(rows) = root.child(ROWS) {
        for row in rows.children_named(ROW) {
            let row = row_from_element(&schema, row)?;
            table.push(row.into_values())?;
        }
    }
    Ok(table)
}

/// Wrapper layout for embedded-schema output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddedLayout {
    /// A single bare row element, no inline schema.
    Bare,
    /// `root > RowData > (schema, Row*)`.
    RowData,
    /// `root > RowsData > (schema, Rows > Row*)`.
    #[default]
    RowsData,
}

/// Writes a table as an embedded-schema document.
///
/// Length restrictions are attached to character columns only; binary
/// columns are always declared by direct type reference.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when [`EmbeddedLayout::Bare`] is asked
/// for anything but exactly one row, and [`CodecError::TypeMismatch`] for
/// values that do not match their column.
pub fn write_embedded(table: &Table, layout: EmbeddedLayout) -> Result<String, Error> {
    let mut rows = Vec::with_capacity(table.len());
    for row in table.rows() {
        rows.push(embedded_row(row)?);
    }

    let doc = match layout {
        EmbeddedLayout::Bare => {
            let [row] = <[Element; 1]>::try_from(rows).map_err(|rows| {
                Error::InvalidArgument(format!("bare layout needs exactly one row, got {}", rows.len()))
            })?;
            row
        }
        EmbeddedLayout::RowData => {
            let mut holder = Element::new("RowData").with_child(inline_schema(table.schema()));
            holder.children.extend(rows);
            Element::new("root").with_child(holder)
        }
        EmbeddedLayout::RowsData => {
            let mut list = Element::new(ROWS);
            list.children.extend(rows);
            Element::new("root").with_child(
                Element::new("RowsData")
                    .with_child(inline_schema(table.schema()))
                    .with_child(list),
            )
        }
    };
    Ok(doc.to_xml())
}

fn embedded_row(row: &Row) -> Result<Element, Error> {
    let mut el = Element::new(ROW);
    for (column, value) in row.iter() {
        column.check_value(value)?;
        if let Some(text) = value.to_canonical() {
            el.push(Element::leaf(column.name.as_str(), text));
        }
    }
    Ok(el)
}

fn inline_schema(schema: &TableSchema) -> Element {
    let mut sequence = Element::new("xsd:sequence");
    for column in schema.columns() {
        sequence.push(inline_column(column));
    }
    Element::new("xsd:schema")
        .with_attr("xmlns:xsd", XSD_NS)
        .with_attr("xmlns:sqltypes", SQLTYPES_NS)
        .with_attr("targetNamespace", ROWSET_NS)
        .with_attr("elementFormDefault", "qualified")
        .with_child(
            Element::new("xsd:import")
                .with_attr("namespace", SQLTYPES_NS)
                .with_attr("schemaLocation", SQLTYPES_LOCATION),
        )
        .with_child(
            Element::new("xsd:element")
                .with_attr("name", ROW)
                .with_child(Element::new("xsd:complexType").with_child(sequence)),
        )
}

fn inline_column(column: &ColumnSchema) -> Element {
    let sql_type = column.effective_sql_type();
    let base = format!("sqltypes:{}", sql_type.name());
    let mut el = Element::new("xsd:element").with_attr("name", column.name.as_str());

    let restriction = if sql_type.is_text() {
        column.max_length.map(|len| {
            Element::new("xsd:restriction")
                .with_attr("base", base.as_str())
                .with_child(Element::new("xsd:maxLength").with_attr("value", len.to_string()))
        })
    } else if sql_type == SqlType::Decimal {
        let (p, s) = column.precision_and_scale();
        Some(
            Element::new("xsd:restriction")
                .with_attr("base", base.as_str())
                .with_child(Element::new("xsd:totalDigits").with_attr("value", p.to_string()))
                .with_child(Element::new("xsd:fractionDigits").with_attr("value", s.to_string())),
        )
    } else {
        None
    };

    match restriction {
        Some(r) => el.push(Element::new("xsd:simpleType").with_child(r)),
        None => el = el.with_attr("type", base),
    }
    if column.nullable {
        el = el.with_attr("nillable", "1").with_attr("minOccurs", "0");
    }
    el
}

/// Reads an embedded-schema document into a table.
///
/// Accepts a bare row element, or rows at any depth beneath wrapper
/// elements. When an inline schema is present it supplies each column's
/// dialect type, length, precision and nillability; otherwise every element
/// of the first row becomes a nullable text column.
///
/// Values of non-text columns that do not parse are read as null; text
/// columns are kept verbatim.
///
/// # Errors
///
/// Fails on malformed XML, or when there is neither an inline schema nor a
/// row to infer columns from.
pub fn parse_embedded(text: &str) -> Result<Table, Error> {
    let root = Element::parse(text)?;
    let inline = root.descendants().into_iter().find(|e| e.is("schema"));
    let row_name = inline.and_then(declared_row_name).unwrap_or(ROW);

    let mut rows = Vec::new();
    if root.is(row_name) {
        rows.push(&root);
    } else {
        collect_rows(&root, row_name, &mut rows);
        if rows.is_empty() && inline.is_none() && is_flat_record(&root) {
            rows.push(&root);
        }
    }

    let columns = match inline {
        Some(schema) => inline_columns(schema, row_name)?,
        None => {
            let first = rows.first().ok_or_else(|| CodecError::MissingElement(row_name.into()))?;
            first.children.iter().map(|c| ColumnSchema::new(c.local_name(), DataType::Text)).collect()
        }
    };

    let mut table = Table::new(TableSchema::new(columns)?);
    let schema = Arc::clone(table.schema());
    for row in rows {
        let values = schema.columns().iter().map(|c| embedded_value(row, c)).collect();
        table.push(values)?;
    }
    tracing::debug!(rows = table.len(), columns = schema.len(), "parsed embedded-schema document");
    Ok(table)
}

fn declared_row_name(schema: &Element) -> Option<&str> {
    schema.children_named("element").next().and_then(|e| e.attr("name"))
}

fn collect_rows<'a>(el: &'a Element, row_name: &str, out: &mut Vec<&'a Element>) {
    for child in &el.children {
        if child.is("schema") {
            continue;
        }
        if child.is(row_name) {
            out.push(child);
        } else {
            collect_rows(child, row_name, out);
        }
    }
}

fn is_flat_record(el: &Element) -> bool {
    !el.children.is_empty() && el.children.iter().all(|c| c.children.is_empty())
}

fn inline_columns(schema: &Element, row_name: &str) -> Result<Vec<ColumnSchema>, Error> {
    let Some(row_decl) =
        schema.children_named("element").find(|e| e.attr("name").is_some_and(|n| n == row_name))
    else {
        return Ok(Vec::new());
    };

    let mut columns = Vec::new();
    for decl in row_decl.descendants().into_iter().filter(|e| e.is("element")) {
        let name = decl.attr("name").ok_or_else(|| CodecError::MissingElement("name".into()))?;
        let restriction = decl.descendants().into_iter().find(|e| e.is("restriction"));
        let type_name = decl.attr("type").or_else(|| restriction.and_then(|r| r.attr("base")));
        let sql_type = type_name.and_then(SqlType::from_name);

        let mut column = match sql_type {
            Some(t) => ColumnSchema::new(name, t.data_type()).with_sql_type(t),
            None => ColumnSchema::new(name, DataType::Text),
        };
        column.nullable = decl.attr("nillable").and_then(crate::types::parse_bool).unwrap_or(false);

        if let Some(r) = restriction {
            let facet = |name: &str| {
                r.child(name).and_then(|f| f.attr("value")).and_then(|v| v.trim().parse().ok())
            };
            if sql_type.map_or(true, SqlType::is_text) {
                column.max_length = facet("maxLength");
            }
            if column.data_type == DataType::Decimal {
                column.precision = facet("totalDigits").and_then(|v: u32| u8::try_from(v).ok());
                column.scale = facet("fractionDigits").and_then(|v: u32| u8::try_from(v).ok());
            }
        }
        columns.push(column);
    }
    Ok(columns)
}

fn embedded_value(row: &Element, column: &ColumnSchema) -> Value {
    let Some(el) = row.child(&column.name) else {
        return Value::Null;
    };
    if el.attr("xsi:nil").and_then(crate::types::parse_bool) == Some(true) {
        return Value::Null;
    }
    match column.data_type {
        DataType::Text => Value::Text(el.text.clone()),
        DataType::Xml => Value::Xml(inner_xml(el)),
        data_type => Value::parse(data_type, &el.text).unwrap_or_else(|e| {
            tracing::warn!(column = %column.name, error = %e, "unreadable value read as null");
            Value::Null
        }),
    }
}

fn inner_xml(el: &Element) -> String {
    if el.children.is_empty() {
        el.text.clone()
    } else {
        el.children.iter().map(Element::to_xml).collect()
    }
}

fn non_null_or_zero<'a>(column: &ColumnSchema, value: &'a Value) -> std::borrow::Cow<'a, Value> {
    if value.is_null() && !column.nullable {
        tracing::warn!(column = %column.name, "null in non-nullable column written as zero value");
        std::borrow::Cow::Owned(column.data_type.zero_value())
    } else {
        std::borrow::Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlType;

    fn people() -> Arc<TableSchema> {
        Arc::new(
            TableSchema::new([
                ColumnSchema::new("id_no", DataType::Text).with_max_length(13),
                ColumnSchema::new("name", DataType::Text).with_max_length(50),
                ColumnSchema::new("age", DataType::Int32),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn test_row_document_round_trip() {
        let schema = people();
        let row =
            Row::new(Arc::clone(&schema), vec!["1234567890123".into(), "Test User".into(), 30.into()])
                .unwrap();
        let xml = row_to_xml(&row).unwrap();
        assert!(xml.contains(r#"<Column Name="id_no" Type="nvarchar" MaxLength="13" IsNull="false">1234567890123</Column>"#));
        assert_eq!(row_from_xml(&schema, &xml).unwrap(), row);
    }

    #[test]
    fn test_null_and_empty_string_are_distinct() {
        let schema = people();
        let row = Row::new(Arc::clone(&schema), vec![Value::Null, "".into(), Value::Null]).unwrap();
        let decoded = row_from_xml(&schema, &row_to_xml(&row).unwrap()).unwrap();
        assert_eq!(decoded.get("id_no"), Some(&Value::Null));
        assert_eq!(decoded.get("name"), Some(&Value::Text(String::new())));
        assert_eq!(decoded.get("age"), Some(&Value::Null));
    }

    #[test]
    fn test_fixed_width_padding_is_preserved() {
        let schema = Arc::new(
            TableSchema::new([ColumnSchema::new("code", DataType::Text)
                .with_sql_type(SqlType::NChar)
                .with_max_length(10)])
            .unwrap(),
        );
        let padded = "AB        ";
        let row = Row::new(Arc::clone(&schema), vec![padded.into()]).unwrap();
        let xml = row_to_xml(&row).unwrap();
        assert!(xml.contains(r#"Type="nchar""#));
        let decoded = row_from_xml(&schema, &xml).unwrap();
        assert_eq!(decoded.get("code"), Some(&Value::Text(padded.into())));
    }

    #[test]
    fn test_missing_is_null_flag_without_text_is_null() {
        let schema = people();
        let xml = r#"<Row><Column Name="id_no"/><Column Name="name">x</Column></Row>"#;
        let row = row_from_xml(&schema, xml).unwrap();
        assert_eq!(row.get("id_no"), Some(&Value::Null));
        assert_eq!(row.get("name"), Some(&Value::Text("x".into())));
        assert_eq!(row.get("age"), Some(&Value::Null));
    }

    #[test]
    fn test_conversion_error_names_column() {
        let schema = people();
        let xml = r#"<Row><Column Name="age" IsNull="false">thirty</Column></Row>"#;
        let err = row_from_xml(&schema, xml).unwrap_err();
        match err {
            Error::Codec(CodecError::Conversion { column, data_type, value }) => {
                assert_eq!(column, "age");
                assert_eq!(data_type, "int32");
                assert_eq!(value, "thirty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_column_rejected() {
        let schema = people();
        let xml = r#"<Row><Column Name="email" IsNull="false">a@b</Column></Row>"#;
        assert!(matches!(
            row_from_xml(&schema, xml),
            Err(Error::Codec(CodecError::UnknownColumn(_)))
        ));
    }

    #[test]
    fn test_type_mismatch_rejected_on_encode() {
        let schema = people();
        let row = Row::new(schema, vec![Value::Null, Value::Null, "thirty".into()]).unwrap();
        assert!(matches!(row_to_xml(&row), Err(Error::Codec(CodecError::TypeMismatch { .. }))));
    }

    #[test]
    fn test_non_nullable_null_written_as_zero() {
        let schema = Arc::new(
            TableSchema::new([
                ColumnSchema::new("n", DataType::Int32).not_null(),
                ColumnSchema::new("s", DataType::Text).not_null(),
            ])
            .unwrap(),
        );
        let row = Row::new(Arc::clone(&schema), vec![Value::Null, Value::Null]).unwrap();
        let decoded = row_from_xml(&schema, &row_to_xml(&row).unwrap()).unwrap();
        assert_eq!(decoded.values(), &[Value::Int32(0), Value::Text(String::new())]);
    }

    #[test]
    fn test_schema_round_trip_keeps_declared_type() {
        let schema = TableSchema::new([
            ColumnSchema::new("code", DataType::Text).with_sql_type(SqlType::Char).with_max_length(5),
            ColumnSchema::new("note", DataType::Text),
            ColumnSchema::new("price", DataType::Decimal).with_precision(10, 4).not_null(),
        ])
        .unwrap();
        let el = schema_to_element(&schema);
        let parsed = schema_from_element(&Element::parse(&el.to_xml()).unwrap()).unwrap();
        assert_eq!(parsed, schema);
        assert_eq!(parsed.columns()[0].sql_type_name(), "char(5)");
        assert_eq!(parsed.columns()[1].sql_type, None);
        assert_eq!(parsed.columns()[1].sql_type_name(), "nvarchar(max)");
    }

    #[test]
    fn test_table_document_round_trip() {
        let mut table = Table::new(people());
        table.push(vec!["1".into(), "a".into(), 1.into()]).unwrap();
        table.push(vec![Value::Null, "".into(), Value::Null]).unwrap();
        let parsed = table_from_xml(&table_to_xml(&table).unwrap()).unwrap();
        assert_eq!(parsed, table);
    }

    const ROW_XSD: &str = r#"<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:sqltypes="http://schemas.microsoft.com/sqlserver/2004/sqltypes" targetNamespace="urn:schemas-microsoft-com:sql:SqlRowSet1" elementFormDefault="qualified">
  <xsd:import namespace="http://schemas.microsoft.com/sqlserver/2004/sqltypes" schemaLocation="http://schemas.microsoft.com/sqlserver/2004/sqltypes/sqltypes.xsd"/>
  <xsd:element name="Row">
    <xsd:complexType>
      <xsd:sequence>
        <xsd:element name="id_no" nillable="1" minOccurs="0">
          <xsd:simpleType>
            <xsd:restriction base="sqltypes:nvarchar" sqltypes:localeId="1033">
              <xsd:maxLength value="13"/>
            </xsd:restriction>
          </xsd:simpleType>
        </xsd:element>
        <xsd:element name="name" nillable="1" minOccurs="0">
          <xsd:simpleType>
            <xsd:restriction base="sqltypes:nvarchar">
              <xsd:maxLength value="50"/>
            </xsd:restriction>
          </xsd:simpleType>
        </xsd:element>
        <xsd:element name="age" type="sqltypes:int" nillable="1" minOccurs="0"/>
      </xsd:sequence>
    </xsd:complexType>
  </xsd:element>
</xsd:schema>"#;

    const ROW_DATA: &str = r#"<Row xmlns="urn:schemas-microsoft-com:sql:SqlRowSet1"><id_no>1234567890123</id_no><name>Test User</name><age>30</age></Row>"#;

    fn expected_values() -> Vec<Value> {
        vec!["1234567890123".into(), "Test User".into(), 30.into()]
    }

    #[test]
    fn test_embedded_row_data_wrapper() {
        let doc = format!("<root><RowData>{ROW_XSD}{ROW_DATA}</RowData></root>");
        let table = parse_embedded(&doc).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0].values(), expected_values().as_slice());

        let id = &table.schema().columns()[0];
        assert_eq!(id.sql_type, Some(SqlType::NVarChar));
        assert_eq!(id.max_length, Some(13));
        assert!(id.nullable);
        assert_eq!(table.schema().columns()[2].data_type, DataType::Int32);
    }

    #[test]
    fn test_embedded_rows_data_wrapper() {
        let doc = format!("<root><RowsData>{ROW_XSD}<Rows>{ROW_DATA}{ROW_DATA}</Rows></RowsData></root>");
        let table = parse_embedded(&doc).unwrap();
        assert_eq!(table.len(), 2);
        for row in table.rows() {
            assert_eq!(row.values(), expected_values().as_slice());
        }
    }

    #[test]
    fn test_embedded_bare_row_without_schema() {
        let table = parse_embedded(ROW_DATA).unwrap();
        assert_eq!(table.len(), 1);
        let names: Vec<_> = table.schema().columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id_no", "name", "age"]);
        assert!(table.schema().columns().iter().all(|c| c.data_type == DataType::Text && c.nullable));
        assert_eq!(table.rows()[0].get("age"), Some(&Value::Text("30".into())));
    }

    #[test]
    fn test_embedded_lenient_values() {
        let doc = format!(
            "<root><RowData>{ROW_XSD}<Row><id_no></id_no><age>n/a</age></Row></RowData></root>"
        );
        let table = parse_embedded(&doc).unwrap();
        let row = &table.rows()[0];
        assert_eq!(row.get("id_no"), Some(&Value::Text(String::new())));
        assert_eq!(row.get("name"), Some(&Value::Null));
        assert_eq!(row.get("age"), Some(&Value::Null));
    }

    #[test]
    fn test_embedded_bit_prefers_digits_and_nil() {
        let doc = r#"<root><xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema"><xsd:element name="Row"><xsd:complexType><xsd:sequence><xsd:element name="flag" type="sqltypes:bit"/><xsd:element name="other" type="sqltypes:bit" nillable="1"/></xsd:sequence></xsd:complexType></xsd:element></xsd:schema><Row><flag>1</flag><other xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:nil="true"/></Row></root>"#;
        let table = parse_embedded(doc).unwrap();
        let cols = table.schema().columns();
        assert!(!cols[0].nullable);
        assert!(cols[1].nullable);
        assert_eq!(table.rows()[0].values(), &[Value::Boolean(true), Value::Null]);
    }

    #[test]
    fn test_embedded_emission_round_trip() {
        let schema = TableSchema::new([
            ColumnSchema::new("code", DataType::Text).with_sql_type(SqlType::Char).with_max_length(4),
            ColumnSchema::new("blob", DataType::Binary).with_max_length(16),
            ColumnSchema::new("price", DataType::Decimal).with_precision(10, 3).not_null(),
        ])
        .unwrap();
        let mut table = Table::new(schema);
        table.push(vec!["ab  ".into(), vec![1u8, 2, 3].into(), Value::parse(DataType::Decimal, "1.500").unwrap()]).unwrap();
        table.push(vec![Value::Null, Vec::<u8>::new().into(), Value::parse(DataType::Decimal, "2.000").unwrap()]).unwrap();

        for layout in [EmbeddedLayout::RowData, EmbeddedLayout::RowsData] {
            let doc = write_embedded(&table, layout).unwrap();
            let parsed = parse_embedded(&doc).unwrap();
            assert_eq!(parsed.len(), 2);
            assert_eq!(parsed.rows()[0].values(), table.rows()[0].values());
            assert_eq!(parsed.rows()[1].values(), table.rows()[1].values());

            let cols = parsed.schema().columns();
            assert_eq!(cols[0].sql_type, Some(SqlType::Char));
            assert_eq!(cols[0].max_length, Some(4));
            assert_eq!(cols[1].max_length, None);
            assert_eq!((cols[2].precision, cols[2].scale), (Some(10), Some(3)));
            assert!(!cols[2].nullable);
        }
    }

    #[test]
    fn test_embedded_emission_never_restricts_binary_length() {
        let schema =
            TableSchema::new([ColumnSchema::new("blob", DataType::Binary).with_max_length(16)]).unwrap();
        let mut table = Table::new(schema);
        table.push(vec![vec![9u8].into()]).unwrap();
        let doc = write_embedded(&table, EmbeddedLayout::RowData).unwrap();
        assert!(!doc.contains("maxLength"));
        assert!(doc.contains(r#"type="sqltypes:varbinary""#));
    }

    #[test]
    fn test_empty_table_writes_and_reads_back() {
        let table = Table::from_rows(Vec::new()).unwrap();
        let doc = write_embedded(&table, EmbeddedLayout::RowsData).unwrap();
        let parsed = parse_embedded(&doc).unwrap();
        assert!(parsed.is_empty());
        assert!(parsed.schema().is_empty());
    }

    #[test]
    fn test_bare_layout_needs_one_row() {
        let table = Table::new(people());
        assert!(matches!(
            write_embedded(&table, EmbeddedLayout::Bare),
            Err(Error::InvalidArgument(_))
        ));
    }
}
