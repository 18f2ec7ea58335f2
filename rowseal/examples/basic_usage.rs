//! Basic usage example for `RowSeal`.

use std::sync::Arc;

use rowseal::codec;
use rowseal::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("RowSeal Basic Usage Example");
    println!("===========================\n");

    let schema = Arc::new(TableSchema::new([
        ColumnSchema::new("id_no", DataType::Text).with_max_length(13).not_null(),
        ColumnSchema::new("name", DataType::Text).with_max_length(50),
        ColumnSchema::new("age", DataType::Int32),
    ])?);

    let vault = Vault::default().with_logger(Arc::new(NoopLogger));
    let metadata = EncryptionMetadata::with_password("correct horse battery staple", *b"0123456789abcdef")
        .iterations(10_000);

    let advisories = vault.validate_metadata(&metadata, false)?;
    println!("✓ Metadata valid ({} advisories)\n", advisories.len());

    // Single row
    let row = Row::new(Arc::clone(&schema), vec!["1234567890123".into(), "Ada".into(), 36.into()])?;
    let (sealed, nonce) = vault.encrypt_row(&row, &metadata)?;
    println!("✓ Row encrypted ({} bytes, nonce {} bytes)", sealed.ciphertext.len(), nonce.len());

    let document = wire::write_row(&sealed);
    println!("  Detected format: {}", wire::detect_format(&document));

    let restored = vault.decrypt_row(&wire::read_row(&document)?, &metadata)?;
    assert_eq!(restored, row);
    println!("✓ Row round-trip verified\n");

    // Batch
    let mut table = Table::new(Arc::clone(&schema));
    table.push(vec!["1111111111111".into(), "Grace".into(), 45.into()])?;
    table.push(vec!["2222222222222".into(), Value::Null, Value::Null])?;
    table.push(vec!["3333333333333".into(), "".into(), 29.into()])?;

    let batch = vault.encrypt_rows(table.rows(), &metadata)?;
    let batch_document = wire::write_batch(&batch);
    println!("✓ Batch encrypted ({} rows)", batch.len());

    let rows = vault.decrypt_rows(&wire::read_batch(&batch_document)?, &metadata)?;
    assert_eq!(rows, table.rows());
    println!("✓ Batch round-trip verified\n");

    let mut decrypted = Table::new(schema);
    for row in rows {
        decrypted.push(row.into_values())?;
    }
    println!("Embedded-schema rendering:");
    println!("{}\n", codec::write_embedded(&decrypted, EmbeddedLayout::RowsData)?);

    // Single value
    let (sealed_value, _) = vault.encrypt_value(&Value::from(42_i64), &metadata)?;
    let value_document = wire::write_value(&sealed_value);
    let value = vault.decrypt_value(&wire::read_value(&value_document)?, &metadata)?;
    assert_eq!(value, Value::Int64(42));
    println!("✓ Value round-trip verified: {value:?}\n");

    // Tampering is detected
    let mut tampered = sealed;
    tampered.ciphertext[0] ^= 0x01;
    match vault.decrypt_row(&tampered, &metadata) {
        Err(e) if e.is_cryptographic() => println!("✓ Tampered payload rejected: {e}"),
        other => println!("✗ Unexpected result: {other:?}"),
    }

    println!("\n✓ All operations completed successfully!");
    Ok(())
}
