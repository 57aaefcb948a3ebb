use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::matcher::extract_phone_numbers;

/// Sequential reader of trimmed text lines. Bytes that are not valid UTF-8
/// are replaced with U+FFFD rather than failing the read.
pub struct LineSource<R> {
    reader: R,
    buf: Vec<u8>,
}

impl LineSource<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// `Ok(None)` on end of input. Only I/O failures are errors.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }

        let mut line = self.buf.as_slice();
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest;
        }
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }
        Ok(Some(String::from_utf8_lossy(line).trim().to_string()))
    }
}

/// Matches each line together with the one before it, so that numbers wrapped
/// over a line break are still found. A blank line clears the lookback.
///
/// Numbers fully contained in one line are found again in the next window;
/// those repeats are kept.
#[derive(Debug, Default)]
pub struct PairBuilder {
    previous: String,
}

impl PairBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: &str) -> Vec<String> {
        if line.is_empty() {
            self.previous.clear();
            return Vec::new();
        }

        let combined = format!("{} {}", self.previous, line);
        let matches = extract_phone_numbers(&combined);

        self.previous.clear();
        self.previous.push_str(line);
        matches
    }
}
