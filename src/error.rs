use std::fmt;

/// Fatal decode/edit failures. Every variant that names a lump carries the
/// lump's role name (e.g. `"Faces"`) rather than its numeric index, since
/// that's what ends up in a diagnostic a human reads.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad magic: expected \"IBSP\", found {found:?}")]
    BadMagic { found: [u8; 4] },

    #[error("bad version: expected 38, found {found}")]
    BadVersion { found: u32 },

    #[error("{lump}: length {len} is not a multiple of the {record_size}-byte record size")]
    ShortLump {
        lump: &'static str,
        len: usize,
        record_size: usize,
    },

    #[error("{lump}: record {index} is malformed")]
    BadRecord { lump: &'static str, index: usize },

    #[error("{table}: index {index} is out of range (bound {bound})")]
    IndexOutOfRange {
        table: &'static str,
        index: i64,
        bound: usize,
    },

    #[error("entity lump: malformed syntax at line {line}")]
    BadEntitySyntax { line: usize },

    #[error("{lump}: truncated")]
    Truncated { lump: &'static str },

    #[error("strict mode rejected this file: {reason}")]
    UnsupportedStrict { reason: &'static str },

    #[error("refusing edit: {reason}")]
    InvalidEdit { reason: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Non-fatal conditions discovered while decoding. A model is still valid
/// and usable when these occur; the host can enumerate them for its own
/// logging in addition to whatever reached the `log` facade at discovery
/// time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    UnknownMagic { found: [u8; 4] },
    UnknownVersion { found: u32 },
    DuplicateEntityKey { key: String, block: usize },
    TruncatedVisRun { cluster: usize },
    IndexOutOfRange {
        table: &'static str,
        index: i64,
        bound: usize,
    },
    MissingWorldspawn,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownMagic { found } => {
                write!(f, "unexpected magic bytes {found:?} (continuing in lenient mode)")
            }
            Warning::UnknownVersion { found } => {
                write!(f, "unexpected version {found} (continuing in lenient mode)")
            }
            Warning::DuplicateEntityKey { key, block } => {
                write!(f, "duplicate key {key:?} in entity block {block}, keeping first binding")
            }
            Warning::TruncatedVisRun { cluster } => {
                write!(f, "cluster {cluster}: zero run truncated at end of vis stream")
            }
            Warning::IndexOutOfRange { table, index, bound } => {
                write!(f, "{table}: index {index} out of range (bound {bound}), decoding degraded")
            }
            Warning::MissingWorldspawn => {
                write!(f, "no worldspawn entity found, using an empty record")
            }
        }
    }
}

impl Warning {
    pub fn log(&self) {
        log::warn!("{self}");
    }
}
