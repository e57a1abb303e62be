//! Source inputs submitted to the pipeline.
//!
//! An [`Input`] carries raw bytes plus an optional on-disk path. Anonymous
//! inputs (no path) are always accepted; pathful inputs must carry the Sable
//! source extension or they are silently dropped from the batch.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// File extension recognized as Sable source, without the leading dot.
pub const SOURCE_EXTENSION: &str = "sab";

/// Byte encoding of an input's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
}

/// One source unit handed to [`FrontendPipeline::run`](crate::FrontendPipeline::run).
#[derive(Debug, Clone)]
pub struct Input {
    path: Option<PathBuf>,
    bytes: Vec<u8>,
    encoding: Encoding,
}

impl Input {
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Input {
            path: Some(path.into()),
            bytes: bytes.into(),
            encoding: Encoding::default(),
        }
    }

    /// An in-memory unit with no backing file. Displayed as `<memory>`.
    pub fn anonymous(bytes: impl Into<Vec<u8>>) -> Self {
        Input {
            path: None,
            bytes: bytes.into(),
            encoding: Encoding::default(),
        }
    }

    pub fn from_reader(path: Option<PathBuf>, reader: &mut dyn Read) -> std::io::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Input {
            path,
            bytes,
            encoding: Encoding::default(),
        })
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Whether this unit participates in a batch at all.
    pub fn accepted(&self) -> bool {
        match &self.path {
            None => true,
            Some(p) => p.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION),
        }
    }

    /// Stable display name for diagnostics and duplicate tracking. Pathful
    /// inputs are shown relative to `relative_to` when they live under it.
    pub fn display_path(&self, relative_to: Option<&Path>) -> String {
        match &self.path {
            None => "<memory>".to_owned(),
            Some(p) => {
                let shown = relative_to
                    .and_then(|root| p.strip_prefix(root).ok())
                    .unwrap_or(p);
                shown.display().to_string()
            }
        }
    }

    /// Decode the raw bytes into source text.
    ///
    /// Latin-1 decoding is total; UTF-8 decoding fails on malformed bytes.
    pub fn decode(&self) -> Result<String, DecodeError> {
        match self.encoding {
            Encoding::Utf8 => String::from_utf8(self.bytes.clone()).map_err(|e| DecodeError {
                detail: e.to_string(),
            }),
            Encoding::Latin1 => Ok(self.bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

#[derive(Debug)]
pub struct DecodeError {
    pub detail: String,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot decode source text: {}", self.detail)
    }
}

impl std::error::Error for DecodeError {}
