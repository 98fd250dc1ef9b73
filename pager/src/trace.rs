//! Trace input: whitespace-separated decimal integers, one access each.
//!
//! Values are read as signed 64-bit integers and truncated to their low 32
//! bits, so `-1` and `4294967295` name the same entry.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("cannot open trace {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read trace at line {line}: {source}")]
    Io {
        line: usize,
        #[source]
        source: io::Error,
    },
    #[error("malformed trace entry {token:?} at line {line}")]
    Malformed { line: usize, token: String },
}

/// Streaming tokenizer over a trace.
///
/// Yields raw entries in order. In strict mode a malformed token is an
/// error; in lenient mode the trace simply ends there.
pub struct TraceReader<R> {
    input: R,
    line: usize,
    pending: std::vec::IntoIter<Vec<u8>>,
    lenient: bool,
    done: bool,
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TraceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: 0,
            pending: Vec::new().into_iter(),
            lenient: false,
            done: false,
        }
    }

    /// Stop at the first malformed token instead of failing.
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = lenient;
        self
    }

    /// Line number of the most recently returned entry (1-based).
    pub fn line(&self) -> usize {
        self.line
    }

    /// Next whitespace-separated token as raw bytes. Lines are not required
    /// to be valid UTF-8; a bad token surfaces as a malformed entry.
    fn next_token(&mut self) -> Result<Option<Vec<u8>>, TraceError> {
        loop {
            if let Some(token) = self.pending.next() {
                return Ok(Some(token));
            }
            let mut buf = Vec::new();
            let read = self
                .input
                .read_until(b'\n', &mut buf)
                .map_err(|source| TraceError::Io {
                    line: self.line + 1,
                    source,
                })?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;
            self.pending = buf
                .split(|b| b.is_ascii_whitespace())
                .filter(|token| !token.is_empty())
                .map(<[u8]>::to_vec)
                .collect::<Vec<_>>()
                .into_iter();
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<u32, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let token = match self.next_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                self.done = true;
                return None;
            }
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let parsed = std::str::from_utf8(&token)
            .ok()
            .and_then(|text| text.parse::<i64>().ok());
        match parsed {
            Some(value) => Some(Ok(value as u32)),
            None => {
                self.done = true;
                let token = String::from_utf8_lossy(&token).into_owned();
                if self.lenient {
                    log::warn!(
                        "[Trace] stopping at malformed entry {:?} on line {}",
                        token,
                        self.line
                    );
                    None
                } else {
                    Some(Err(TraceError::Malformed {
                        line: self.line,
                        token,
                    }))
                }
            }
        }
    }
}
