//! Re-readable line source

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::sentence::ParseError;

use super::error::SourceError;

/// Line-by-line reader over a file that can be rewound to its start
#[derive(Debug)]
pub struct LineSource {
    path: PathBuf,
    reader: BufReader<File>,
    line_number: u64,
}

impl LineSource {
    /// Open the file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let reader = open_reader(&path).await?;

        Ok(Self {
            path,
            reader,
            line_number: 0,
        })
    }

    /// Get the next line, or [`SourceError::Exhausted`] at end of input
    ///
    /// A line that is not valid UTF-8 is consumed and reported as
    /// [`SourceError::Parse`], so the caller can decide whether to go on.
    pub async fn next_line(&mut self) -> Result<String, SourceError> {
        let mut buf = Vec::new();
        if self.reader.read_until(b'\n', &mut buf).await? == 0 {
            return Err(SourceError::Exhausted);
        }
        self.line_number += 1;

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }

        String::from_utf8(buf).map_err(|_| SourceError::Parse {
            line: self.line_number,
            source: ParseError::InvalidUtf8,
        })
    }

    /// Reopen the source from the beginning
    pub async fn rewind(&mut self) -> Result<(), SourceError> {
        self.reader = open_reader(&self.path).await?;
        self.line_number = 0;
        Ok(())
    }

    /// 1-based number of the last line returned
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn open_reader(path: &Path) -> Result<BufReader<File>, SourceError> {
    let file = File::open(path).await.map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}
