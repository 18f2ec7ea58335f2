//! Persisted document shapes for encrypted rows, batches and values.
//!
//! ```text
//! EncryptedRow   > Schema, Metadata, EncryptedData
//! EncryptedData  > BatchMetadata, Rows > Row*
//!                  Row > RowMetadata, Schema, SqlServerSchema, EncryptedColumns
//! EncryptedValue > DataType, EncryptedData, Metadata
//! ```
//!
//! Binary fields are standard Base64; timestamps are RFC 3339 in UTC.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::codec;
use crate::error::Error;
use crate::payload::{
    EncryptedBatch, EncryptedBatchRow, EncryptedRow, EncryptedValue, PayloadMetadata, NONCE_COLUMN,
    ROW_DATA_COLUMN,
};
use crate::schema::TableSchema;
use crate::types::{decode_base64, DataType};
use crate::xml::Element;

const ENCRYPTED_ROW: &str = "EncryptedRow";
const ENCRYPTED_DATA: &str = "EncryptedData";
const ENCRYPTED_VALUE: &str = "EncryptedValue";
const METADATA: &str = "Metadata";
const BATCH_METADATA: &str = "BatchMetadata";
const ROW_METADATA: &str = "RowMetadata";
const SQL_SERVER_SCHEMA: &str = "SqlServerSchema";
const ENCRYPTED_COLUMNS: &str = "EncryptedColumns";
const DATA_TYPE: &str = "DataType";
const ROWS: &str = "Rows";

/// Kind of persisted document, by root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// `EncryptedRow`
    SingleRow,
    /// `EncryptedData`
    Batch,
    /// `EncryptedValue`
    SingleValue,
    /// Anything else, including unparseable text.
    Unknown,
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SingleRow => "single-row",
            Self::Batch => "batch",
            Self::SingleValue => "single-value",
            Self::Unknown => "unknown",
        })
    }
}

/// Identifies a document by its root element's local name.
#[must_use]
pub fn detect_format(text: &str) -> PayloadFormat {
    Element::parse(text).map_or(PayloadFormat::Unknown, |root| format_of(&root))
}

fn format_of(root: &Element) -> PayloadFormat {
    if root.is(ENCRYPTED_ROW) {
        PayloadFormat::SingleRow
    } else if root.is(ENCRYPTED_DATA) {
        PayloadFormat::Batch
    } else if root.is(ENCRYPTED_VALUE) {
        PayloadFormat::SingleValue
    } else {
        PayloadFormat::Unknown
    }
}

/// Checks that a single-row document has its required children.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] naming the first problem found.
pub fn validate_row_document(text: &str) -> Result<(), Error> {
    require_shape(&Element::parse(text)?, ENCRYPTED_ROW, &[codec::SCHEMA, METADATA, ENCRYPTED_DATA])
}

/// Checks that a batch document has its required children.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] naming the first problem found.
pub fn validate_batch_document(text: &str) -> Result<(), Error> {
    require_shape(&Element::parse(text)?, ENCRYPTED_DATA, &[BATCH_METADATA, ROWS])
}

/// Checks that a single-value document has its required children.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] naming the first problem found.
pub fn validate_value_document(text: &str) -> Result<(), Error> {
    require_shape(&Element::parse(text)?, ENCRYPTED_VALUE, &[DATA_TYPE, ENCRYPTED_DATA, METADATA])
}

fn require_shape(root: &Element, name: &str, children: &[&str]) -> Result<(), Error> {
    if !root.is(name) {
        return Err(Error::InvalidDocument(format!(
            "expected root {name}, found {}",
            root.local_name()
        )));
    }
    for child in children {
        if root.child(child).is_none() {
            return Err(Error::InvalidDocument(format!("{name} is missing {child}")));
        }
    }
    Ok(())
}

/// Writes an `EncryptedRow` document.
#[must_use]
pub fn write_row(row: &EncryptedRow) -> String {
    Element::new(ENCRYPTED_ROW)
        .with_child(codec::schema_to_element(&row.schema))
        .with_child(metadata_element(&row.metadata))
        .with_child(Element::leaf(ENCRYPTED_DATA, STANDARD.encode(&row.ciphertext)))
        .to_xml()
}

/// Reads an `EncryptedRow` document.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] for missing or malformed parts.
pub fn read_row(text: &str) -> Result<EncryptedRow, Error> {
    let root = Element::parse(text)?;
    require_shape(&root, ENCRYPTED_ROW, &[codec::SCHEMA, METADATA, ENCRYPTED_DATA])?;
    Ok(EncryptedRow {
        schema: read_schema(&root)?,
        metadata: read_metadata(required(&root, METADATA)?)?,
        ciphertext: base64_field(&root, ENCRYPTED_DATA)?,
    })
}

/// Writes an `EncryptedValue` document.
#[must_use]
pub fn write_value(value: &EncryptedValue) -> String {
    Element::new(ENCRYPTED_VALUE)
        .with_child(Element::leaf(DATA_TYPE, value.data_type.tag()))
        .with_child(Element::leaf(ENCRYPTED_DATA, STANDARD.encode(&value.ciphertext)))
        .with_child(metadata_element(&value.metadata))
        .to_xml()
}

/// Reads an `EncryptedValue` document.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] for missing or malformed parts,
/// including an unknown type tag.
pub fn read_value(text: &str) -> Result<EncryptedValue, Error> {
    let root = Element::parse(text)?;
    require_shape(&root, ENCRYPTED_VALUE, &[DATA_TYPE, ENCRYPTED_DATA, METADATA])?;
    let tag = text_field(&root, DATA_TYPE)?;
    let data_type = DataType::from_tag(tag)
        .ok_or_else(|| Error::InvalidDocument(format!("unknown data type: {tag}")))?;
    Ok(EncryptedValue {
        data_type,
        ciphertext: base64_field(&root, ENCRYPTED_DATA)?,
        metadata: read_metadata(required(&root, METADATA)?)?,
    })
}

/// Writes an `EncryptedData` batch document.
#[must_use]
pub fn write_batch(batch: &EncryptedBatch) -> String {
    let header = Element::new(BATCH_METADATA)
        .with_child(Element::leaf("Algorithm", batch.algorithm.as_str()))
        .with_child(Element::leaf("Salt", STANDARD.encode(&batch.salt)))
        .with_child(Element::leaf("Iterations", batch.iterations.to_string()))
        .with_child(Element::leaf("RowCount", batch.rows.len().to_string()));

    let mut rows = Element::new(ROWS);
    for row in &batch.rows {
        rows.push(batch_row_element(row));
    }
    Element::new(ENCRYPTED_DATA).with_child(header).with_child(rows).to_xml()
}

fn batch_row_element(row: &EncryptedBatchRow) -> Element {
    let nonce = STANDARD.encode(&row.nonce);
    let row_metadata = Element::new(ROW_METADATA)
        .with_child(Element::leaf("Nonce", nonce.as_str()))
        .with_child(Element::leaf("EncryptedAt", format_timestamp(&row.encrypted_at)))
        .with_child(Element::leaf("FormatVersion", row.format_version.to_string()));

    let encrypted_columns = Element::new(ENCRYPTED_COLUMNS)
        .with_child(encrypted_column(ROW_DATA_COLUMN, STANDARD.encode(&row.ciphertext)))
        .with_child(encrypted_column(NONCE_COLUMN, nonce));

    Element::new(codec::ROW)
        .with_child(row_metadata)
        .with_child(codec::schema_to_element(&row.schema))
        .with_child(sql_server_schema(&row.schema))
        .with_child(encrypted_columns)
}

fn encrypted_column(name: &str, data: String) -> Element {
    Element::new(codec::COLUMN)
        .with_child(Element::leaf("Name", name))
        .with_child(Element::leaf(ENCRYPTED_DATA, data))
}

fn sql_server_schema(schema: &TableSchema) -> Element {
    let mut el = Element::new(SQL_SERVER_SCHEMA);
    for column in schema.columns() {
        el.push(
            Element::new(codec::COLUMN)
                .with_child(Element::leaf("Name", column.name.as_str()))
                .with_child(Element::leaf("SqlDbType", column.effective_sql_type().name()))
                .with_child(Element::leaf("SqlTypeName", column.sql_type_name()))
                .with_child(Element::leaf("MaxLength", column.wire_max_length().to_string()))
                .with_child(Element::leaf("IsNullable", column.nullable.to_string())),
        );
    }
    el
}

/// Reads an `EncryptedData` batch document.
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] for missing or malformed parts, or if
/// `RowCount` disagrees with the rows present.
pub fn read_batch(text: &str) -> Result<EncryptedBatch, Error> {
    let root = Element::parse(text)?;
    require_shape(&root, ENCRYPTED_DATA, &[BATCH_METADATA, ROWS])?;

    let header = required(&root, BATCH_METADATA)?;
    let declared: usize = number_field(header, "RowCount")?;

    let rows = required(&root, ROWS)?
        .children_named(codec::ROW)
        .enumerate()
        .map(|(index, row)| read_batch_row(row).map_err(|e| e.at_row(index)))
        .collect::<Result<Vec<_>, _>>()?;
    if rows.len() != declared {
        return Err(Error::InvalidDocument(format!(
            "RowCount is {declared} but {} rows are present",
            rows.len()
        )));
    }

    Ok(EncryptedBatch {
        algorithm: text_field(header, "Algorithm")?.to_string(),
        salt: base64_field(header, "Salt")?,
        iterations: number_field(header, "Iterations")?,
        rows,
    })
}

fn read_batch_row(row: &Element) -> Result<EncryptedBatchRow, Error> {
    let row_metadata = required(row, ROW_METADATA)?;
    let columns = required(row, ENCRYPTED_COLUMNS)?;
    let entry = |name: &str| {
        columns
            .children_named(codec::COLUMN)
            .find(|c| c.child_text("Name").is_some_and(|n| n.trim() == name))
    };

    let ciphertext = entry(ROW_DATA_COLUMN)
        .ok_or_else(|| Error::InvalidDocument(format!("row has no {ROW_DATA_COLUMN} entry")))
        .and_then(|c| base64_field(c, ENCRYPTED_DATA))?;
    let nonce = match row_metadata.child(NONCE_COLUMN) {
        Some(_) => base64_field(row_metadata, NONCE_COLUMN)?,
        None => entry(NONCE_COLUMN)
            .ok_or_else(|| Error::InvalidDocument("row has no nonce".into()))
            .and_then(|c| base64_field(c, ENCRYPTED_DATA))?,
    };

    Ok(EncryptedBatchRow {
        schema: read_schema(row)?,
        nonce,
        encrypted_at: timestamp_field(row_metadata, "EncryptedAt")?,
        format_version: number_field(row_metadata, "FormatVersion")?,
        ciphertext,
    })
}

fn metadata_element(m: &PayloadMetadata) -> Element {
    Element::new(METADATA)
        .with_child(Element::leaf("Algorithm", m.algorithm.as_str()))
        .with_child(Element::leaf("Iterations", m.iterations.to_string()))
        .with_child(Element::leaf("Salt", STANDARD.encode(&m.salt)))
        .with_child(Element::leaf("Nonce", STANDARD.encode(&m.nonce)))
        .with_child(Element::leaf("EncryptedAt", format_timestamp(&m.encrypted_at)))
        .with_child(Element::leaf("FormatVersion", m.format_version.to_string()))
}

fn read_metadata(el: &Element) -> Result<PayloadMetadata, Error> {
    Ok(PayloadMetadata {
        algorithm: text_field(el, "Algorithm")?.to_string(),
        iterations: number_field(el, "Iterations")?,
        salt: base64_field(el, "Salt")?,
        nonce: base64_field(el, "Nonce")?,
        encrypted_at: timestamp_field(el, "EncryptedAt")?,
        format_version: number_field(el, "FormatVersion")?,
    })
}

fn read_schema(parent: &Element) -> Result<TableSchema, Error> {
    codec::schema_from_element(required(parent, codec::SCHEMA)?)
}

fn required<'a>(parent: &'a Element, name: &str) -> Result<&'a Element, Error> {
    parent
        .child(name)
        .ok_or_else(|| Error::InvalidDocument(format!("{} is missing {name}", parent.local_name())))
}

fn text_field<'a>(parent: &'a Element, name: &str) -> Result<&'a str, Error> {
    required(parent, name).map(|el| el.text.as_str())
}

fn base64_field(parent: &Element, name: &str) -> Result<Vec<u8>, Error> {
    decode_base64(text_field(parent, name)?)
        .ok_or_else(|| Error::InvalidDocument(format!("{name} is not valid Base64")))
}

fn number_field<T: FromStr>(parent: &Element, name: &str) -> Result<T, Error> {
    let text = text_field(parent, name)?;
    text.trim()
        .parse()
        .map_err(|_| Error::InvalidDocument(format!("{name} is not a number: {text:?}")))
}

fn timestamp_field(parent: &Element, name: &str) -> Result<DateTime<Utc>, Error> {
    let text = text_field(parent, name)?;
    DateTime::parse_from_rfc3339(text.trim())
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::InvalidDocument(format!("{name} is not a timestamp: {e}")))
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::FORMAT_VERSION;
    use crate::schema::ColumnSchema;

    fn schema() -> TableSchema {
        TableSchema::new([
            ColumnSchema::new("id_no", DataType::Text).with_max_length(13),
            ColumnSchema::new("age", DataType::Int32).not_null(),
        ])
        .unwrap()
    }

    fn metadata() -> PayloadMetadata {
        PayloadMetadata {
            algorithm: "AES-GCM".into(),
            iterations: 10_000,
            salt: vec![0u8; 16],
            nonce: vec![1u8; 12],
            encrypted_at: Utc::now(),
            format_version: FORMAT_VERSION,
        }
    }

    fn batch() -> EncryptedBatch {
        let row = |n: u8| EncryptedBatchRow {
            schema: schema(),
            nonce: vec![n; 12],
            encrypted_at: Utc::now(),
            format_version: FORMAT_VERSION,
            ciphertext: vec![n; 40],
        };
        EncryptedBatch {
            algorithm: "AES-GCM".into(),
            salt: vec![2u8; 16],
            iterations: 5_000,
            rows: vec![row(1), row(2)],
        }
    }

    #[test]
    fn test_row_document_round_trip() {
        let row = EncryptedRow { schema: schema(), metadata: metadata(), ciphertext: vec![9u8; 33] };
        let text = write_row(&row);
        assert_eq!(detect_format(&text), PayloadFormat::SingleRow);
        validate_row_document(&text).unwrap();
        assert_eq!(read_row(&text).unwrap(), row);
    }

    #[test]
    fn test_value_document_round_trip() {
        let value = EncryptedValue {
            data_type: DataType::TimestampOffset,
            ciphertext: vec![3u8; 20],
            metadata: metadata(),
        };
        let text = write_value(&value);
        assert!(text.contains("<DataType>timestamp_offset</DataType>"));
        assert_eq!(detect_format(&text), PayloadFormat::SingleValue);
        validate_value_document(&text).unwrap();
        assert_eq!(read_value(&text).unwrap(), value);
    }

    #[test]
    fn test_batch_document_round_trip() {
        let batch = batch();
        let text = write_batch(&batch);
        assert_eq!(detect_format(&text), PayloadFormat::Batch);
        validate_batch_document(&text).unwrap();
        assert!(text.contains("<RowCount>2</RowCount>"));
        assert!(text.contains("<SqlTypeName>nvarchar(13)</SqlTypeName>"));
        assert!(text.contains("<Name>RowData</Name>"));
        assert_eq!(read_batch(&text).unwrap(), batch);
    }

    #[test]
    fn test_batch_nonce_falls_back_to_encrypted_columns() {
        let batch = batch();
        let mut root = Element::parse(&write_batch(&batch)).unwrap();
        for row in &mut root.children[1].children {
            row.children[0].children.retain(|c| !c.is("Nonce"));
        }
        let parsed = read_batch(&root.to_xml()).unwrap();
        assert_eq!(parsed.rows[1].nonce, vec![2u8; 12]);
    }

    #[test]
    fn test_row_count_mismatch_rejected() {
        let text = write_batch(&batch()).replace("<RowCount>2</RowCount>", "<RowCount>3</RowCount>");
        assert!(matches!(read_batch(&text), Err(Error::InvalidDocument(_))));
    }

    #[test]
    fn test_detect_format_unknown() {
        assert_eq!(detect_format("<Something/>"), PayloadFormat::Unknown);
        assert_eq!(detect_format("not xml"), PayloadFormat::Unknown);
        assert_eq!(detect_format("<x:EncryptedRow xmlns:x=\"urn:x\"/>"), PayloadFormat::SingleRow);
    }

    #[test]
    fn test_validation_checks_immediate_children() {
        let err = validate_row_document("<EncryptedRow><Schema/><Metadata/></EncryptedRow>").unwrap_err();
        assert!(err.to_string().contains("EncryptedData"));
        assert!(validate_row_document("<EncryptedRow><Schema/><Metadata/><EncryptedData/></EncryptedRow>").is_ok());
        assert!(validate_batch_document("<EncryptedValue/>").is_err());
        assert!(validate_value_document("<EncryptedValue><DataType/><EncryptedData/></EncryptedValue>").is_err());
    }

    #[test]
    fn test_malformed_fields_rejected() {
        let row = EncryptedRow { schema: schema(), metadata: metadata(), ciphertext: vec![9u8; 33] };
        let text = write_row(&row).replace("<Iterations>10000</Iterations>", "<Iterations>many</Iterations>");
        assert!(matches!(read_row(&text), Err(Error::InvalidDocument(_))));

        let value = EncryptedValue { data_type: DataType::Int32, ciphertext: vec![1], metadata: metadata() };
        let text = write_value(&value).replace("<DataType>int32</DataType>", "<DataType>System.Int32</DataType>");
        assert!(matches!(read_value(&text), Err(Error::InvalidDocument(_))));
    }
}
