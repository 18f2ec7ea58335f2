//! Semantic data types, SQL dialect types and canonical value text.
//!
//! Every column carries a [`DataType`] (what kind of value it holds) and,
//! optionally, the [`SqlType`] it was declared with. Several dialect types
//! collapse onto one semantic type (`char`, `varchar` and `nvarchar` are all
//! [`DataType::Text`]), so the dialect type travels alongside for faithful
//! re-emission.
//!
//! Values are rendered to a locale-invariant canonical text form:
//!
//! | kind | text form |
//! |---|---|
//! | integers | decimal digits |
//! | floats, decimals | invariant decimal text (`NaN`, `Infinity`) |
//! | booleans | `true` / `false` (reads also accept `1` / `0`) |
//! | timestamps | ISO-8601 round-trip, 7 fractional digits (9 when needed) |
//! | durations | `[-][d.]hh:mm:ss[.fffffffff]` |
//! | unique ids | dashed lowercase hex |
//! | binary | standard Base64 with padding |

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bigdecimal::BigDecimal;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, TimeZone, Timelike};
use uuid::Uuid;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const SECONDS_PER_DAY: i64 = 86_400;
const NANOS_PER_SECOND: u32 = 1_000_000_000;

/// Widest decimal the dialect stores, in significant digits.
pub const MAX_DECIMAL_DIGITS: i64 = 38;

/// Semantic type of a column or scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Character data of any width.
    Text,
    /// Byte sequence.
    Binary,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 16-bit signed integer.
    Int16,
    /// 8-bit unsigned integer.
    UInt8,
    /// Single-precision float.
    Float32,
    /// Double-precision float.
    Float64,
    /// Arbitrary-precision fixed-point decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Date and time without offset.
    Timestamp,
    /// Date and time with a UTC offset.
    TimestampOffset,
    /// Time-of-day or elapsed duration.
    Duration,
    /// 128-bit unique identifier.
    UniqueId,
    /// XML document kept as text.
    Xml,
}

impl DataType {
    /// All semantic types, in tag order.
    pub const ALL: [Self; 15] = [
        Self::Text,
        Self::Binary,
        Self::Int32,
        Self::Int64,
        Self::Int16,
        Self::UInt8,
        Self::Float32,
        Self::Float64,
        Self::Decimal,
        Self::Boolean,
        Self::Timestamp,
        Self::TimestampOffset,
        Self::Duration,
        Self::UniqueId,
        Self::Xml,
    ];

    /// Returns the stable tag used in persisted documents.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Binary => "binary",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Int16 => "int16",
            Self::UInt8 => "uint8",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Timestamp => "timestamp",
            Self::TimestampOffset => "timestamp_offset",
            Self::Duration => "duration",
            Self::UniqueId => "unique_id",
            Self::Xml => "xml",
        }
    }

    /// Looks up a semantic type by its stable tag (case-insensitive).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL.into_iter().find(|t| t.tag().eq_ignore_ascii_case(tag))
    }

    /// Looks up a semantic type by tag, falling back to [`DataType::Text`]
    /// for anything not representable.
    #[must_use]
    pub fn from_tag_or_text(tag: &str) -> Self {
        Self::from_tag(tag).unwrap_or(Self::Text)
    }

    /// Returns `true` for types whose values are kept as raw text.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text | Self::Xml)
    }

    /// Dialect type used when a column carries no declared type.
    #[must_use]
    pub const fn default_sql_type(self) -> SqlType {
        match self {
            Self::Text => SqlType::NVarChar,
            Self::Binary => SqlType::VarBinary,
            Self::Int32 => SqlType::Int,
            Self::Int64 => SqlType::BigInt,
            Self::Int16 => SqlType::SmallInt,
            Self::UInt8 => SqlType::TinyInt,
            Self::Float32 => SqlType::Real,
            Self::Float64 => SqlType::Float,
            Self::Decimal => SqlType::Decimal,
            Self::Boolean => SqlType::Bit,
            Self::Timestamp => SqlType::DateTime2,
            Self::TimestampOffset => SqlType::DateTimeOffset,
            Self::Duration => SqlType::Time,
            Self::UniqueId => SqlType::UniqueIdentifier,
            Self::Xml => SqlType::Xml,
        }
    }

    /// The zero/empty value of this type.
    ///
    /// Used when a non-nullable column transiently carries [`Value::Null`].
    #[must_use]
    pub fn zero_value(self) -> Value {
        match self {
            Self::Text => Value::Text(String::new()),
            Self::Binary => Value::Binary(Vec::new()),
            Self::Int32 => Value::Int32(0),
            Self::Int64 => Value::Int64(0),
            Self::Int16 => Value::Int16(0),
            Self::UInt8 => Value::UInt8(0),
            Self::Float32 => Value::Float32(0.0),
            Self::Float64 => Value::Float64(0.0),
            Self::Decimal => Value::Decimal(BigDecimal::from(0)),
            Self::Boolean => Value::Boolean(false),
            Self::Timestamp => Value::Timestamp(NaiveDateTime::default()),
            Self::TimestampOffset => Value::TimestampOffset(DateTime::default()),
            Self::Duration => Value::Duration(TimeDelta::zero()),
            Self::UniqueId => Value::UniqueId(Uuid::nil()),
            Self::Xml => Value::Xml(String::new()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Column type as declared in the originating SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum SqlType {
    BigInt,
    Int,
    SmallInt,
    TinyInt,
    Bit,
    Decimal,
    Money,
    SmallMoney,
    Float,
    Real,
    Date,
    DateTime,
    DateTime2,
    SmallDateTime,
    Time,
    DateTimeOffset,
    UniqueIdentifier,
    Binary,
    VarBinary,
    Image,
    Char,
    VarChar,
    Text,
    NChar,
    NVarChar,
    NText,
    Xml,
}

impl SqlType {
    const ALL: [Self; 27] = [
        Self::BigInt,
        Self::Int,
        Self::SmallInt,
        Self::TinyInt,
        Self::Bit,
        Self::Decimal,
        Self::Money,
        Self::SmallMoney,
        Self::Float,
        Self::Real,
        Self::Date,
        Self::DateTime,
        Self::DateTime2,
        Self::SmallDateTime,
        Self::Time,
        Self::DateTimeOffset,
        Self::UniqueIdentifier,
        Self::Binary,
        Self::VarBinary,
        Self::Image,
        Self::Char,
        Self::VarChar,
        Self::Text,
        Self::NChar,
        Self::NVarChar,
        Self::NText,
        Self::Xml,
    ];

    /// Lowercase dialect name without length or precision suffix.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BigInt => "bigint",
            Self::Int => "int",
            Self::SmallInt => "smallint",
            Self::TinyInt => "tinyint",
            Self::Bit => "bit",
            Self::Decimal => "decimal",
            Self::Money => "money",
            Self::SmallMoney => "smallmoney",
            Self::Float => "float",
            Self::Real => "real",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::DateTime2 => "datetime2",
            Self::SmallDateTime => "smalldatetime",
            Self::Time => "time",
            Self::DateTimeOffset => "datetimeoffset",
            Self::UniqueIdentifier => "uniqueidentifier",
            Self::Binary => "binary",
            Self::VarBinary => "varbinary",
            Self::Image => "image",
            Self::Char => "char",
            Self::VarChar => "varchar",
            Self::Text => "text",
            Self::NChar => "nchar",
            Self::NVarChar => "nvarchar",
            Self::NText => "ntext",
            Self::Xml => "xml",
        }
    }

    /// Parses a dialect type name.
    ///
    /// Accepts namespace prefixes (`sqltypes:nvarchar`), length or precision
    /// suffixes (`nvarchar(50)`, `decimal(18,2)`) and any letter case.
    /// `numeric` is read as `decimal`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let name = name.rsplit_once(':').map_or(name, |(_, local)| local);
        let name = name.split_once('(').map_or(name, |(base, _)| base).trim();
        if name.eq_ignore_ascii_case("numeric") {
            return Some(Self::Decimal);
        }
        Self::ALL.into_iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Semantic type this dialect type collapses onto.
    #[must_use]
    pub const fn data_type(self) -> DataType {
        match self {
            Self::BigInt => DataType::Int64,
            Self::Int => DataType::Int32,
            Self::SmallInt => DataType::Int16,
            Self::TinyInt => DataType::UInt8,
            Self::Bit => DataType::Boolean,
            Self::Decimal | Self::Money | Self::SmallMoney => DataType::Decimal,
            Self::Float => DataType::Float64,
            Self::Real => DataType::Float32,
            Self::Date | Self::DateTime | Self::DateTime2 | Self::SmallDateTime => {
                DataType::Timestamp
            }
            Self::Time => DataType::Duration,
            Self::DateTimeOffset => DataType::TimestampOffset,
            Self::UniqueIdentifier => DataType::UniqueId,
            Self::Binary | Self::VarBinary | Self::Image => DataType::Binary,
            Self::Char
            | Self::VarChar
            | Self::Text
            | Self::NChar
            | Self::NVarChar
            | Self::NText => DataType::Text,
            Self::Xml => DataType::Xml,
        }
    }

    /// Returns `true` for character types.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(
            self,
            Self::Char | Self::VarChar | Self::Text | Self::NChar | Self::NVarChar | Self::NText
        )
    }

    /// Returns `true` for byte-sequence types.
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::Binary | Self::VarBinary | Self::Image)
    }

    /// Returns `true` for the fixed-width character kinds.
    #[must_use]
    pub const fn is_fixed_width_text(self) -> bool {
        matches!(self, Self::Char | Self::NChar)
    }

    /// Returns `true` when the type name takes a length argument.
    #[must_use]
    pub const fn takes_length(self) -> bool {
        matches!(
            self,
            Self::Char | Self::VarChar | Self::NChar | Self::NVarChar | Self::Binary | Self::VarBinary
        )
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SqlType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown SQL type: {s}"))
    }
}

/// A single typed value, or the explicit null marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit null marker.
    Null,
    /// Character data.
    Text(String),
    /// Byte sequence.
    Binary(Vec<u8>),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// 16-bit integer.
    Int16(i16),
    /// 8-bit unsigned integer.
    UInt8(u8),
    /// Single-precision float.
    Float32(f32),
    /// Double-precision float.
    Float64(f64),
    /// Fixed-point decimal.
    Decimal(BigDecimal),
    /// Boolean.
    Boolean(bool),
    /// Date and time without offset.
    Timestamp(NaiveDateTime),
    /// Date and time with offset.
    TimestampOffset(DateTime<FixedOffset>),
    /// Duration.
    Duration(TimeDelta),
    /// Unique identifier.
    UniqueId(Uuid),
    /// XML text.
    Xml(String),
}

impl Value {
    /// Returns `true` for the null marker.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Semantic type of the value, `None` for null.
    #[must_use]
    pub const fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Self::Null => return None,
            Self::Text(_) => DataType::Text,
            Self::Binary(_) => DataType::Binary,
            Self::Int32(_) => DataType::Int32,
            Self::Int64(_) => DataType::Int64,
            Self::Int16(_) => DataType::Int16,
            Self::UInt8(_) => DataType::UInt8,
            Self::Float32(_) => DataType::Float32,
            Self::Float64(_) => DataType::Float64,
            Self::Decimal(_) => DataType::Decimal,
            Self::Boolean(_) => DataType::Boolean,
            Self::Timestamp(_) => DataType::Timestamp,
            Self::TimestampOffset(_) => DataType::TimestampOffset,
            Self::Duration(_) => DataType::Duration,
            Self::UniqueId(_) => DataType::UniqueId,
            Self::Xml(_) => DataType::Xml,
        })
    }

    /// Short name of the value kind, for diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self.data_type() {
            Some(t) => t.tag(),
            None => "null",
        }
    }

    /// Renders the value to its canonical text, `None` for null.
    #[must_use]
    pub fn to_canonical(&self) -> Option<String> {
        let text = match self {
            Self::Null => return None,
            Self::Text(s) | Self::Xml(s) => s.clone(),
            Self::Binary(b) => STANDARD.encode(b),
            Self::Int32(v) => v.to_string(),
            Self::Int64(v) => v.to_string(),
            Self::Int16(v) => v.to_string(),
            Self::UInt8(v) => v.to_string(),
            Self::Float32(v) => format_float(f64::from(*v), v.to_string()),
            Self::Float64(v) => format_float(*v, v.to_string()),
            Self::Decimal(d) => d.to_plain_string(),
            Self::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Self::Timestamp(ts) => format_timestamp(ts),
            Self::TimestampOffset(ts) => {
                format!("{}{}", format_timestamp(&ts.naive_local()), format_offset(*ts.offset()))
            }
            Self::Duration(d) => format_duration(*d),
            Self::UniqueId(id) => id.hyphenated().to_string(),
        };
        Some(text)
    }

    /// Reads canonical text as a value of `data_type`.
    ///
    /// Text and XML never fail: the input is kept verbatim, including any
    /// padding. Other types fail with [`ConversionError`] on malformed input.
    /// Decimals wider than [`MAX_DECIMAL_DIGITS`] are malformed.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] when `text` is not a valid rendering of
    /// `data_type`.
    pub fn parse(data_type: DataType, text: &str) -> Result<Self, ConversionError> {
        let fail = || ConversionError { data_type, text: text.to_string() };
        let trimmed = text.trim();
        let value = match data_type {
            DataType::Text => Self::Text(text.to_string()),
            DataType::Xml => Self::Xml(text.to_string()),
            DataType::Binary => Self::Binary(decode_base64(text).ok_or_else(fail)?),
            DataType::Int32 => Self::Int32(trimmed.parse().map_err(|_| fail())?),
            DataType::Int64 => Self::Int64(trimmed.parse().map_err(|_| fail())?),
            DataType::Int16 => Self::Int16(trimmed.parse().map_err(|_| fail())?),
            DataType::UInt8 => Self::UInt8(trimmed.parse().map_err(|_| fail())?),
            DataType::Float32 => Self::Float32(trimmed.parse().map_err(|_| fail())?),
            DataType::Float64 => Self::Float64(trimmed.parse().map_err(|_| fail())?),
            DataType::Decimal => {
                let d = BigDecimal::from_str(trimmed).map_err(|_| fail())?;
                if !decimal_fits(&d) {
                    return Err(fail());
                }
                Self::Decimal(d)
            }
            DataType::Boolean => Self::Boolean(parse_bool(trimmed).ok_or_else(fail)?),
            DataType::Timestamp => Self::Timestamp(parse_timestamp(trimmed).ok_or_else(fail)?),
            DataType::TimestampOffset => {
                Self::TimestampOffset(parse_timestamp_offset(trimmed).ok_or_else(fail)?)
            }
            DataType::Duration => Self::Duration(parse_duration(trimmed).ok_or_else(fail)?),
            DataType::UniqueId => Self::UniqueId(Uuid::parse_str(trimmed).map_err(|_| fail())?),
        };
        Ok(value)
    }

    /// Lenient variant of [`Value::parse`]: malformed text for a non-text
    /// type becomes [`Value::Null`].
    #[must_use]
    pub fn parse_or_null(data_type: DataType, text: &str) -> Self {
        Self::parse(data_type, text).unwrap_or(Self::Null)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    String => Text,
    Vec<u8> => Binary,
    i32 => Int32,
    i64 => Int64,
    i16 => Int16,
    u8 => UInt8,
    f32 => Float32,
    f64 => Float64,
    BigDecimal => Decimal,
    bool => Boolean,
    NaiveDateTime => Timestamp,
    DateTime<FixedOffset> => TimestampOffset,
    TimeDelta => Duration,
    Uuid => UniqueId,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Text that could not be read as the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    /// Requested type.
    pub data_type: DataType,
    /// The rejected text.
    pub text: String,
}

impl ConversionError {
    /// Attaches a column name, producing a codec error.
    #[must_use]
    pub fn for_column(self, column: &str) -> crate::error::CodecError {
        crate::error::CodecError::Conversion {
            column: column.to_string(),
            data_type: self.data_type.tag(),
            value: self.text,
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot read {:?} as {}", self.text, self.data_type)
    }
}

impl std::error::Error for ConversionError {}

/// Reads a boolean, preferring the SQL `1`/`0` form over the words.
#[must_use]
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim() {
        "1" => Some(true),
        "0" => Some(false),
        s if s.eq_ignore_ascii_case("true") => Some(true),
        s if s.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

/// Decodes standard Base64, ignoring embedded whitespace.
#[must_use]
pub fn decode_base64(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact).ok()
}

fn format_float(v: f64, shortest: String) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        shortest
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.naive_utc()))
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Significant digits, integer digits and scale all within [`MAX_DECIMAL_DIGITS`].
fn decimal_fits(d: &BigDecimal) -> bool {
    let (_, scale) = d.as_bigint_and_exponent();
    let Ok(significant) = i64::try_from(d.digits()) else {
        return false;
    };
    (-MAX_DECIMAL_DIGITS..=MAX_DECIMAL_DIGITS).contains(&scale)
        && significant <= MAX_DECIMAL_DIGITS
        && significant - scale <= MAX_DECIMAL_DIGITS
}

fn format_timestamp(ts: &NaiveDateTime) -> String {
    let nanos = ts.nanosecond() % NANOS_PER_SECOND;
    let fraction = if nanos % 100 == 0 {
        format!(".{:07}", nanos / 100)
    } else {
        format!(".{nanos:09}")
    };
    format!("{}{fraction}", ts.format(TIMESTAMP_FORMAT))
}

fn format_offset(offset: FixedOffset) -> String {
    let total = offset.local_minus_utc();
    let sign = if total < 0 { '-' } else { '+' };
    let abs = total.unsigned_abs();
    let (hours, minutes, seconds) = (abs / 3600, (abs % 3600) / 60, abs % 60);
    if seconds == 0 {
        format!("{sign}{hours:02}:{minutes:02}")
    } else {
        format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
    }
}

fn parse_offset(text: &str) -> Option<i32> {
    let (sign, body) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let mut fields = [0i32; 3];
    let mut count = 0;
    for part in body.split(':') {
        if count == 3 || part.len() != 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        fields[count] = part.parse().ok()?;
        count += 1;
    }
    let [hours, minutes, seconds] = fields;
    if count < 2 || minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60 + seconds))
}

fn parse_timestamp_offset(text: &str) -> Option<DateTime<FixedOffset>> {
    let (local, offset) = match text.strip_suffix(|c| c == 'Z' || c == 'z') {
        Some(local) => (local, 0),
        None => {
            // The offset sign comes after the date's own hyphens.
            let at = text.rfind(|c| c == '+' || c == '-').filter(|&at| at > 10)?;
            (&text[..at], parse_offset(&text[at..])?)
        }
    };
    let local = local.trim();
    if local.len() <= 10 {
        return None;
    }
    let naive = parse_timestamp(local)?;
    FixedOffset::east_opt(offset)?.from_local_datetime(&naive).single()
}

fn format_duration(d: TimeDelta) -> String {
    let negative = d < TimeDelta::zero();
    let d = if negative { -d } else { d };
    let secs = d.num_seconds();
    let nanos = d.subsec_nanos();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    let days = secs / SECONDS_PER_DAY;
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    let rem = secs % SECONDS_PER_DAY;
    out.push_str(&format!("{:02}:{:02}:{:02}", rem / 3600, (rem % 3600) / 60, rem % 60));
    if nanos > 0 {
        let frac = format!("{nanos:09}");
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out
}

fn parse_duration(text: &str) -> Option<TimeDelta> {
    let (negative, body) = text.strip_prefix('-').map_or((false, text), |rest| (true, rest));

    // A '.' ahead of the first ':' separates the day count.
    let first_colon = body.find(':')?;
    let (days, clock) = match body[..first_colon].split_once('.') {
        Some((days, _)) => (days.parse::<u32>().ok()?, &body[days.len() + 1..]),
        None => (0, body),
    };

    let mut parts = clock.splitn(3, ':');
    let hours: u32 = parts.next()?.parse().ok()?;
    let minutes: u32 = parts.next()?.parse().ok()?;
    let last = parts.next()?;
    let (seconds, frac) = last.split_once('.').unwrap_or((last, ""));
    let seconds: u32 = seconds.parse().ok()?;
    if minutes >= 60 || seconds >= 60 || frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let nanos: u32 = if frac.is_empty() { 0 } else { format!("{frac:0<9}").parse().ok()? };

    let total = i64::from(days) * SECONDS_PER_DAY
        + i64::from(hours) * 3600
        + i64::from(minutes) * 60
        + i64::from(seconds);
    let d = TimeDelta::new(total, nanos)?;
    Some(if negative { -d } else { d })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_type_name_parsing() {
        assert_eq!(SqlType::from_name("nvarchar"), Some(SqlType::NVarChar));
        assert_eq!(SqlType::from_name("sqltypes:NVARCHAR"), Some(SqlType::NVarChar));
        assert_eq!(SqlType::from_name("decimal(18,2)"), Some(SqlType::Decimal));
        assert_eq!(SqlType::from_name("numeric(10, 4)"), Some(SqlType::Decimal));
        assert_eq!(SqlType::from_name("char(10)"), Some(SqlType::Char));
        assert_eq!(SqlType::from_name("geography"), None);
        assert!("sql_variant".parse::<SqlType>().is_err());
    }

    #[test]
    fn test_dialect_types_collapse_onto_text() {
        for t in [SqlType::Char, SqlType::VarChar, SqlType::NChar, SqlType::NVarChar] {
            assert_eq!(t.data_type(), DataType::Text);
        }
        assert!(SqlType::Char.is_fixed_width_text());
        assert!(!SqlType::VarChar.is_fixed_width_text());
    }

    #[test]
    fn test_default_dialect_mapping() {
        assert_eq!(DataType::Text.default_sql_type(), SqlType::NVarChar);
        assert_eq!(DataType::Binary.default_sql_type(), SqlType::VarBinary);
        assert_eq!(DataType::Int32.default_sql_type(), SqlType::Int);
        assert_eq!(DataType::Decimal.default_sql_type(), SqlType::Decimal);
        assert_eq!(DataType::Timestamp.default_sql_type(), SqlType::DateTime2);
        assert_eq!(DataType::UniqueId.default_sql_type(), SqlType::UniqueIdentifier);
    }

    #[test]
    fn test_data_type_tags() {
        for t in DataType::ALL {
            assert_eq!(DataType::from_tag(t.tag()), Some(t));
        }
        assert_eq!(DataType::from_tag_or_text("hierarchyid"), DataType::Text);
    }

    #[test]
    fn test_boolean_emits_words_accepts_digits() {
        assert_eq!(Value::Boolean(true).to_canonical().as_deref(), Some("true"));
        assert_eq!(Value::Boolean(false).to_canonical().as_deref(), Some("false"));
        assert_eq!(Value::parse(DataType::Boolean, "1"), Ok(Value::Boolean(true)));
        assert_eq!(Value::parse(DataType::Boolean, "0"), Ok(Value::Boolean(false)));
        assert_eq!(Value::parse(DataType::Boolean, "TRUE"), Ok(Value::Boolean(true)));
        assert_eq!(Value::parse(DataType::Boolean, "False"), Ok(Value::Boolean(false)));
        assert!(Value::parse(DataType::Boolean, "yes").is_err());
    }

    #[test]
    fn test_text_is_kept_verbatim() {
        let padded = "abc       ";
        assert_eq!(Value::parse(DataType::Text, padded), Ok(Value::Text(padded.into())));
        assert_eq!(Value::parse(DataType::Text, ""), Ok(Value::Text(String::new())));
        assert_eq!(Value::Text(padded.into()).to_canonical().as_deref(), Some(padded));
    }

    #[test]
    fn test_lenient_parse_falls_back_to_null() {
        assert_eq!(Value::parse_or_null(DataType::Int32, "abc"), Value::Null);
        assert_eq!(Value::parse_or_null(DataType::Int32, " 42 "), Value::Int32(42));
        assert_eq!(Value::parse_or_null(DataType::Text, "abc"), Value::Text("abc".into()));
    }

    #[test]
    fn test_conversion_error_is_reported() {
        let err = Value::parse(DataType::Int16, "70000").unwrap_err();
        assert_eq!(err.data_type, DataType::Int16);
        assert_eq!(err.text, "70000");
    }

    #[test]
    fn test_binary_uses_padded_standard_base64() {
        let value = Value::Binary(vec![0xfb, 0xff, 0x01]);
        assert_eq!(value.to_canonical().as_deref(), Some("+/8B"));
        let value = Value::Binary(vec![1, 2]);
        assert_eq!(value.to_canonical().as_deref(), Some("AQI="));
        assert_eq!(Value::parse(DataType::Binary, "AQI=\n"), Ok(Value::Binary(vec![1, 2])));
        assert!(Value::parse(DataType::Binary, "AQI").is_err());
    }

    #[test]
    fn test_timestamp_round_trip_form() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_nano_opt(10, 30, 0, 123_456_700)
            .unwrap();
        let text = Value::Timestamp(ts).to_canonical().unwrap();
        assert_eq!(text, "2024-01-15T10:30:00.1234567");
        assert_eq!(Value::parse(DataType::Timestamp, &text), Ok(Value::Timestamp(ts)));
    }

    #[test]
    fn test_timestamp_keeps_nanoseconds() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_nano_opt(10, 30, 0, 123_456_789)
            .unwrap();
        let text = Value::Timestamp(ts).to_canonical().unwrap();
        assert_eq!(text, "2024-01-15T10:30:00.123456789");
        assert_eq!(Value::parse(DataType::Timestamp, &text), Ok(Value::Timestamp(ts)));

        let whole = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(
            Value::Timestamp(whole).to_canonical().as_deref(),
            Some("2024-01-15T10:30:00.0000000")
        );
    }

    #[test]
    fn test_timestamp_accepts_dialect_forms() {
        let midnight = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(Value::parse(DataType::Timestamp, "2024-01-15"), Ok(Value::Timestamp(midnight)));
        assert_eq!(
            Value::parse(DataType::Timestamp, "2024-01-15T00:00:00"),
            Ok(Value::Timestamp(midnight))
        );
        assert_eq!(
            Value::parse(DataType::Timestamp, "2024-01-15 00:00:00.000"),
            Ok(Value::Timestamp(midnight))
        );
    }

    #[test]
    fn test_timestamp_offset_round_trip_form() {
        let ts = DateTime::parse_from_rfc3339("2024-01-15T10:30:00.5+02:00").unwrap();
        let text = Value::TimestampOffset(ts).to_canonical().unwrap();
        assert_eq!(text, "2024-01-15T10:30:00.5000000+02:00");
        assert_eq!(Value::parse(DataType::TimestampOffset, &text), Ok(Value::TimestampOffset(ts)));
        assert_eq!(
            Value::parse(DataType::TimestampOffset, "2024-01-15 10:30:00.5000000 +02:00"),
            Ok(Value::TimestampOffset(ts))
        );
    }

    #[test]
    fn test_timestamp_offset_keeps_offset_seconds() {
        let offset = FixedOffset::east_opt(5 * 3600 + 30 * 60 + 17).unwrap();
        let local = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_nano_opt(10, 30, 0, 1)
            .unwrap();
        let ts = offset.from_local_datetime(&local).single().unwrap();
        let text = Value::TimestampOffset(ts).to_canonical().unwrap();
        assert_eq!(text, "2024-01-15T10:30:00.000000001+05:30:17");
        assert_eq!(Value::parse(DataType::TimestampOffset, &text), Ok(Value::TimestampOffset(ts)));

        let west = FixedOffset::west_opt(3 * 3600).unwrap().from_local_datetime(&local).single().unwrap();
        let text = Value::TimestampOffset(west).to_canonical().unwrap();
        assert!(text.ends_with("-03:00"));
        assert_eq!(Value::parse(DataType::TimestampOffset, &text), Ok(Value::TimestampOffset(west)));

        let utc = Value::parse(DataType::TimestampOffset, "2024-01-15T10:30:00Z").unwrap();
        assert_eq!(utc.to_canonical().as_deref(), Some("2024-01-15T10:30:00.0000000+00:00"));
        assert!(Value::parse(DataType::TimestampOffset, "2024-01-15").is_err());
        assert!(Value::parse(DataType::TimestampOffset, "2024-01-15T10:30:00+5:30").is_err());
    }

    #[test]
    fn test_duration_forms() {
        let d = TimeDelta::new(13 * 3600 + 5 * 60 + 9, 250_000_000).unwrap();
        assert_eq!(format_duration(d), "13:05:09.25");
        assert_eq!(parse_duration("13:05:09.25"), Some(d));
        assert_eq!(parse_duration("13:05:09.2500000"), Some(d));

        let long = TimeDelta::new(2 * SECONDS_PER_DAY + 3600, 0).unwrap();
        assert_eq!(format_duration(long), "2.01:00:00");
        assert_eq!(parse_duration("2.01:00:00"), Some(long));

        assert_eq!(format_duration(-TimeDelta::new(90, 0).unwrap()), "-00:01:30");
        assert_eq!(parse_duration("-00:01:30"), Some(-TimeDelta::new(90, 0).unwrap()));

        assert_eq!(parse_duration("10:61:00"), None);
        assert_eq!(parse_duration("garbage"), None);
    }

    #[test]
    fn test_unique_id_is_dashed_lowercase() {
        let text = "{6F9619FF-8B86-D011-B42D-00C04FC964FF}";
        let value = Value::parse(DataType::UniqueId, text).unwrap();
        assert_eq!(value.to_canonical().as_deref(), Some("6f9619ff-8b86-d011-b42d-00c04fc964ff"));
    }

    #[test]
    fn test_float_special_values() {
        assert_eq!(Value::Float64(f64::NAN).to_canonical().as_deref(), Some("NaN"));
        assert_eq!(Value::Float64(f64::INFINITY).to_canonical().as_deref(), Some("Infinity"));
        assert_eq!(Value::Float32(f32::NEG_INFINITY).to_canonical().as_deref(), Some("-Infinity"));
        assert_eq!(Value::parse(DataType::Float64, "-Infinity"), Ok(Value::Float64(f64::NEG_INFINITY)));
        assert_eq!(Value::Float64(0.1).to_canonical().as_deref(), Some("0.1"));
        assert_eq!(Value::Float32(1.5).to_canonical().as_deref(), Some("1.5"));
    }

    #[test]
    fn test_decimal_plain_text() {
        let value = Value::parse(DataType::Decimal, "12345.6700").unwrap();
        assert_eq!(value.to_canonical().as_deref(), Some("12345.6700"));
    }

    #[test]
    fn test_decimal_beyond_dialect_width_is_rejected() {
        for text in [
            "1e9223372036854775807",
            "1e2000000000",
            "1e-2000000000",
            "123456789012345678901234567890123456789",
            "0.000000000000000000000000000000000000001",
            "1e38",
        ] {
            assert!(Value::parse(DataType::Decimal, text).is_err(), "{text} accepted");
        }
        let widest = "1234567890123456789012345678.9012345678";
        let value = Value::parse(DataType::Decimal, widest).unwrap();
        assert_eq!(value.to_canonical().as_deref(), Some(widest));
        assert_eq!(Value::parse(DataType::Decimal, "1e37").unwrap().to_canonical().unwrap().len(), 38);
    }

    #[test]
    fn test_zero_values_match_type() {
        for t in DataType::ALL {
            assert_eq!(t.zero_value().data_type(), Some(t));
        }
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".into()));
    }
}
