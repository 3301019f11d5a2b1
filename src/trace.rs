use crate::{
    address,
    memory_system::{self, MemorySystem, ReferenceKind},
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::path::Path;

/// A single trace reference.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Reference {
    pub kind: ReferenceKind,
    pub addr: address,
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.kind {
            ReferenceKind::DataRead => 0,
            ReferenceKind::DataWrite => 1,
            ReferenceKind::InstructionFetch => 2,
        };
        write!(f, "{kind} {:x}", self.addr)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected \"<kind> <address>\", got {0:?}")]
    Malformed(String),
    #[error("unknown reference kind {0:?}")]
    UnknownKind(String),
    #[error("invalid address {value:?}")]
    InvalidAddress {
        value: String,
        source: std::num::ParseIntError,
    },
}

static REFERENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\S+)\s+(?:0[xX])?([0-9a-fA-F]+)\s*$").unwrap());

impl TryFrom<&str> for Reference {
    type Error = ParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let captures = REFERENCE_REGEX
            .captures(value)
            .ok_or_else(|| ParseError::Malformed(value.to_string()))?;
        let (kind, addr) = (&captures[1], &captures[2]);

        let kind = match kind {
            "0" => ReferenceKind::DataRead,
            "1" => ReferenceKind::DataWrite,
            "2" => ReferenceKind::InstructionFetch,
            other => return Err(ParseError::UnknownKind(other.to_string())),
        };
        let addr = address::from_str_radix(addr, 16).map_err(|source| {
            ParseError::InvalidAddress {
                value: addr.to_string(),
                source,
            }
        })?;
        Ok(Self { kind, addr })
    }
}

impl std::str::FromStr for Reference {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::try_from(value)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReadError {
    #[error("line {line}: {source}")]
    Parse { line: usize, source: ParseError },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lazily parses a trace, one reference per non-blank line.
#[derive(Debug)]
pub struct Reader<R> {
    lines: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> Reader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for Reader<R> {
    type Item = Result<Reference, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(line.parse().map_err(|source| ReadError::Parse {
                line: self.line,
                source,
            }));
        }
    }
}

pub fn open(
    path: impl AsRef<Path>,
) -> Result<Reader<std::io::BufReader<std::fs::File>>, utils::fs::Error> {
    Ok(Reader::new(utils::fs::open_readable(path)?))
}

/// Generates `count` uniformly random references.
///
/// Kinds are drawn uniformly from the three reference kinds, addresses
/// from the whole 32 bit range.
pub fn generate<R: rand::Rng>(
    rng: &mut R,
    count: usize,
) -> impl Iterator<Item = Reference> + '_ {
    (0..count).map(move |_| {
        let kind = match rng.gen_range(0..3) {
            0 => ReferenceKind::DataRead,
            1 => ReferenceKind::DataWrite,
            _ => ReferenceKind::InstructionFetch,
        };
        Reference {
            kind,
            addr: rng.gen(),
        }
    })
}

/// Writes references in the trace format, one per line.
///
/// # Returns
/// The number of references written.
pub fn write(
    references: impl IntoIterator<Item = Reference>,
    mut writer: impl Write,
) -> std::io::Result<usize> {
    let mut written = 0;
    for reference in references {
        writeln!(writer, "{reference}")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("failed to read trace")]
    Io(#[source] std::io::Error),
    #[error(transparent)]
    Dispatch(#[from] memory_system::Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// References dispatched to the memory system.
    pub references: usize,
    /// Malformed lines.
    pub skipped: usize,
}

/// Feeds a trace through the memory system.
///
/// Malformed lines are logged and skipped.
pub fn run(
    system: &mut MemorySystem,
    references: impl IntoIterator<Item = Result<Reference, ReadError>>,
) -> Result<Summary, RunError> {
    let mut summary = Summary::default();
    for reference in references {
        match reference {
            Ok(Reference { kind, addr }) => {
                system.dispatch(kind, addr)?;
                summary.references += 1;
            }
            Err(ReadError::Parse { line, source }) => {
                log::warn!("skipping line {line}: {source}");
                summary.skipped += 1;
            }
            Err(ReadError::Io(err)) => return Err(RunError::Io(err)),
        }
    }
    log::info!(
        "processed {} references ({} lines skipped)",
        summary.references,
        summary.skipped
    );
    Ok(summary)
}
