use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::ToArg;

/// Server-side type filter for key-space scans (`SCAN ... TYPE <type>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Plain string values.
    String,
    /// Lists.
    List,
    /// Sets.
    Set,
    /// Sorted sets.
    ZSet,
    /// Hashes.
    Hash,
    /// Streams.
    Stream,
}

impl DataType {
    /// The name the server uses for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::List => "list",
            DataType::Set => "set",
            DataType::ZSet => "zset",
            DataType::Hash => "hash",
            DataType::Stream => "stream",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(DataType::String),
            "list" => Ok(DataType::List),
            "set" => Ok(DataType::Set),
            "zset" => Ok(DataType::ZSet),
            "hash" => Ok(DataType::Hash),
            "stream" => Ok(DataType::Stream),
            other => Err(Error::InvalidArgument(format!("unknown data type '{}'", other))),
        }
    }
}

/// Options sent with every round-trip of one scan.
///
/// Built once through [`ScanOptions::builder`] and never changed afterwards.
///
/// ```
/// use ferrite_scan::ScanOptions;
///
/// let options = ScanOptions::builder().pattern("user:*").count(100).build()?;
/// assert_eq!(options.count(), Some(100));
/// # Ok::<(), ferrite_scan::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pattern: Option<Bytes>,
    count: Option<u64>,
    data_type: Option<DataType>,
}

impl ScanOptions {
    /// No filter, no batch-size hint.
    pub fn none() -> Self {
        Self::default()
    }

    /// Start building options.
    pub fn builder() -> ScanOptionsBuilder {
        ScanOptionsBuilder::default()
    }

    /// Glob pattern applied by the server (`MATCH`).
    pub fn pattern(&self) -> Option<&Bytes> {
        self.pattern.as_ref()
    }

    /// Batch-size hint (`COUNT`).
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    /// Type filter (`TYPE`).
    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Fill in `count` when the caller did not choose one.
    pub(crate) fn with_default_count(mut self, count: Option<u64>) -> Self {
        if self.count.is_none() {
            self.count = count;
        }
        self
    }

    /// The trailing `MATCH`/`COUNT`/`TYPE` arguments of a scan command.
    pub fn to_args(&self) -> Vec<Bytes> {
        let mut args = Vec::with_capacity(6);
        if let Some(pattern) = &self.pattern {
            args.push(Bytes::from_static(b"MATCH"));
            args.push(pattern.clone());
        }
        if let Some(count) = self.count {
            args.push(Bytes::from_static(b"COUNT"));
            args.push(count.to_arg());
        }
        if let Some(data_type) = self.data_type {
            args.push(Bytes::from_static(b"TYPE"));
            args.push(Bytes::from_static(data_type.as_str().as_bytes()));
        }
        args
    }
}

/// Builder for [`ScanOptions`].
#[derive(Debug, Default)]
pub struct ScanOptionsBuilder {
    pattern: Option<Bytes>,
    count: Option<u64>,
    data_type: Option<DataType>,
}

impl ScanOptionsBuilder {
    /// Only return elements matching this glob pattern.
    pub fn pattern(mut self, pattern: impl ToArg) -> Self {
        self.pattern = Some(pattern.to_arg());
        self
    }

    /// Ask the server for roughly this many elements per round-trip.
    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Only return keys holding this type. Key-space scans only.
    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Validate and freeze the options.
    pub fn build(self) -> Result<ScanOptions> {
        if self.count == Some(0) {
            return Err(Error::InvalidArgument("COUNT must be positive".into()));
        }
        Ok(ScanOptions {
            pattern: self.pattern,
            count: self.count,
            data_type: self.data_type,
        })
    }
}
