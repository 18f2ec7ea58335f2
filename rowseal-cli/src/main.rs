//! `RowSeal` CLI tool for encrypting rows, batches and values.

#![warn(clippy::pedantic, clippy::nursery)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rowseal::codec;
use rowseal::metadata::DEFAULT_ITERATIONS;
use rowseal::prelude::*;
use secrecy::{ExposeSecret, SecretString};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rowseal")]
#[command(about = "RowSeal row and value encryption CLI", long_about = None)]
struct Cli {
    /// Enable debug logging (overridden by `RUST_LOG`)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which payload format a document holds and check its structure
    Detect {
        /// Document to inspect
        input: PathBuf,
    },
    /// Check encryption parameters without encrypting anything
    Validate {
        #[command(flatten)]
        key: KeyArgs,
    },
    /// Encrypt the single row of an embedded-schema document
    EncryptRow {
        /// Embedded-schema document holding exactly one row
        input: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Decrypt a row document to an embedded-schema document
    DecryptRow {
        /// Encrypted row document
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = Layout::Bare)]
        layout: Layout,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Encrypt every row of an embedded-schema document as a batch
    EncryptTable {
        /// Embedded-schema document
        input: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Decrypt a batch document to an embedded-schema document
    DecryptBatch {
        /// Encrypted batch document
        input: PathBuf,
        #[arg(long, value_enum, default_value_t = Layout::RowsData)]
        layout: Layout,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Encrypt a single value
    EncryptValue {
        /// Type tag of the value (e.g. `text`, `int32`, `decimal`)
        #[arg(long = "type", default_value = "text")]
        data_type: String,
        /// Canonical text of the value
        value: String,
        #[command(flatten)]
        key: KeyArgs,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Decrypt a value document and print its canonical text
    DecryptValue {
        /// Encrypted value document
        input: PathBuf,
        #[command(flatten)]
        key: KeyArgs,
    },
}

#[derive(Args)]
struct KeyArgs {
    /// Password the key is derived from
    #[arg(long, env = "ROWSEAL_PASSWORD", hide_env_values = true, conflicts_with = "raw_key")]
    password: Option<String>,

    /// Base64 raw 256-bit key, used instead of a password
    #[arg(long = "key", env = "ROWSEAL_KEY", hide_env_values = true)]
    raw_key: Option<String>,

    /// Base64 salt for password derivation
    #[arg(long, env = "ROWSEAL_SALT")]
    salt: Option<String>,

    /// PBKDF2 iteration count
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: u32,
}

impl KeyArgs {
    fn metadata(&self) -> Result<EncryptionMetadata> {
        if let Some(raw_key) = &self.raw_key {
            let key = SecretString::new(raw_key.clone());
            let bytes = STANDARD.decode(key.expose_secret()).context("--key is not valid base64")?;
            return Ok(EncryptionMetadata::with_raw_key(bytes));
        }
        let Some(password) = &self.password else {
            bail!("either --password or --key is required");
        };
        let password = SecretString::new(password.clone());
        let salt = match &self.salt {
            Some(salt) => STANDARD.decode(salt).context("--salt is not valid base64")?,
            None => Vec::new(),
        };
        Ok(EncryptionMetadata::with_password(password.expose_secret().as_str(), salt)
            .iterations(self.iterations))
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Write the result here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl OutputArgs {
    fn emit(&self, document: &str) -> Result<()> {
        match &self.output {
            Some(path) => fs::write(path, document)
                .with_context(|| format!("failed to write {}", path.display())),
            None => {
                println!("{document}");
                Ok(())
            }
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Layout {
    /// One bare row element
    Bare,
    /// `RowData` wrapper
    RowData,
    /// `RowsData` wrapper with a `Rows` container
    RowsData,
}

impl From<Layout> for EmbeddedLayout {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Bare => Self::Bare,
            Layout::RowData => Self::RowData,
            Layout::RowsData => Self::RowsData,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let vault = Vault::new(load_config()?);

    match cli.command {
        Commands::Detect { input } => {
            let document = read_input(&input)?;
            let format = wire::detect_format(&document);
            let checked = match format {
                PayloadFormat::SingleRow => wire::validate_row_document(&document),
                PayloadFormat::Batch => wire::validate_batch_document(&document),
                PayloadFormat::SingleValue => wire::validate_value_document(&document),
                PayloadFormat::Unknown => Ok(()),
            };
            match checked {
                Ok(()) => println!("{format}"),
                Err(e) => bail!("{format} document is incomplete: {e}"),
            }
        }
        Commands::Validate { key } => {
            let advisories = vault.validate_metadata(&key.metadata()?, true)?;
            if advisories.is_empty() {
                println!("parameters are valid");
            }
            for advisory in advisories {
                println!("warning: {advisory}");
            }
        }
        Commands::EncryptRow { input, key, out } => {
            let table = codec::parse_embedded(&read_input(&input)?)
                .with_context(|| format!("failed to parse {}", input.display()))?;
            let [row] = table.rows() else {
                bail!("expected exactly one row, found {}", table.len());
            };
            let (payload, _) = vault.encrypt_row(row, &key.metadata()?)?;
            out.emit(&wire::write_row(&payload))?;
        }
        Commands::DecryptRow { input, layout, key, out } => {
            let payload = wire::read_row(&read_input(&input)?)?;
            let row = vault.decrypt_row(&payload, &key.metadata()?)?;
            let table = Table::from_rows(vec![row])?;
            out.emit(&codec::write_embedded(&table, layout.into())?)?;
        }
        Commands::EncryptTable { input, key, out } => {
            let table = codec::parse_embedded(&read_input(&input)?)
                .with_context(|| format!("failed to parse {}", input.display()))?;
            let batch = vault.encrypt_rows(table.rows(), &key.metadata()?)?;
            tracing::info!(rows = batch.len(), "table encrypted");
            out.emit(&wire::write_batch(&batch))?;
        }
        Commands::DecryptBatch { input, layout, key, out } => {
            let batch = wire::read_batch(&read_input(&input)?)?;
            let rows = vault.decrypt_rows(&batch, &key.metadata()?)?;
            let table = Table::from_rows(rows).context("batch rows cannot form one table")?;
            out.emit(&codec::write_embedded(&table, layout.into())?)?;
        }
        Commands::EncryptValue { data_type, value, key, out } => {
            let Some(data_type) = DataType::from_tag(&data_type) else {
                bail!("unknown type tag `{data_type}`");
            };
            let value = Value::parse(data_type, &value)
                .map_err(|e| anyhow::anyhow!("{e}"))
                .context("value does not match its type")?;
            let (payload, _) = vault.encrypt_value(&value, &key.metadata()?)?;
            out.emit(&wire::write_value(&payload))?;
        }
        Commands::DecryptValue { input, key } => {
            let payload = wire::read_value(&read_input(&input)?)?;
            let value = vault.decrypt_value(&payload, &key.metadata()?)?;
            println!("{}", value.to_canonical().unwrap_or_default());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("rowseal=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Reads `ROWSEAL_*` environment variables into a validated vault
/// configuration.
fn load_config() -> Result<VaultConfig> {
    let cfg = config::Config::builder()
        .add_source(config::Environment::with_prefix("ROWSEAL").try_parsing(true))
        .build()
        .context("failed to build configuration from environment")?;

    let vault_config: VaultConfig =
        cfg.try_deserialize().context("failed to deserialise configuration")?;

    vault_config.validate().context("invalid vault configuration")?;
    Ok(vault_config)
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
