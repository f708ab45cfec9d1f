//! Access-trace parsing.
//!
//! A trace file is a sequence of whitespace-separated integer lines:
//!
//! ```text
//! <starting_block> <block_count> <flags> <request_number>
//! ```
//!
//! Each line describes one request touching `block_count` consecutive
//! blocks starting at `starting_block`; the replay harness expands it into
//! one cache access per block. Blank lines are skipped; anything else that
//! fails to parse is reported with its line number.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed trace line {line}: {reason}")]
    Malformed { line: u64, reason: String },
}

/// One parsed trace line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// First block touched by the request.
    pub starting_block: u64,
    /// Number of consecutive blocks touched.
    pub block_count: u64,
    /// Trace-format flag field; carried through but not interpreted.
    pub flags: i64,
    /// Request sequence number from the trace.
    pub request_number: u64,
}

impl TraceRecord {
    /// Block ids touched by this request.
    pub fn blocks(&self) -> std::ops::Range<u64> {
        self.starting_block..self.starting_block.saturating_add(self.block_count)
    }
}

/// Streaming reader over a trace file.
#[derive(Debug)]
pub struct TraceReader {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    line_no: u64,
}

impl TraceReader {
    pub fn open(path: &Path) -> Result<Self, TraceError> {
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: path.to_path_buf(),
            line_no: 0,
        })
    }

    /// The trace file this reader was opened on.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(line: &str, line_no: u64) -> Result<TraceRecord, TraceError> {
        let malformed = |reason: &str| TraceError::Malformed {
            line: line_no,
            reason: reason.to_string(),
        };

        let mut fields = line.split_whitespace();
        let mut next_u64 = |name: &str| -> Result<u64, TraceError> {
            fields
                .next()
                .ok_or_else(|| malformed(&format!("missing {name}")))?
                .parse::<u64>()
                .map_err(|e| malformed(&format!("bad {name}: {e}")))
        };

        let starting_block = next_u64("starting_block")?;
        let block_count = next_u64("block_count")?;
        let flags = fields
            .next()
            .ok_or_else(|| malformed("missing flags"))?
            .parse::<i64>()
            .map_err(|e| malformed(&format!("bad flags: {e}")))?;
        let request_number = fields
            .next()
            .ok_or_else(|| malformed("missing request_number"))?
            .parse::<u64>()
            .map_err(|e| malformed(&format!("bad request_number: {e}")))?;

        if fields.next().is_some() {
            return Err(malformed("trailing fields"));
        }
        Ok(TraceRecord {
            starting_block,
            block_count,
            flags,
            request_number,
        })
    }
}

impl Iterator for TraceReader {
    type Item = Result<TraceRecord, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(Self::parse(&line, self.line_no));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_trace(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parses_well_formed_lines() {
        let file = write_trace("100 4 0 1\n200 1 0 2\n");
        let records: Vec<TraceRecord> = TraceReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].starting_block, 100);
        assert_eq!(records[0].block_count, 4);
        assert_eq!(records[1].request_number, 2);
    }

    #[test]
    fn test_blocks_range_expansion() {
        let record = TraceRecord {
            starting_block: 100,
            block_count: 4,
            flags: 0,
            request_number: 1,
        };
        let blocks: Vec<u64> = record.blocks().collect();
        assert_eq!(blocks, vec![100, 101, 102, 103]);
    }

    #[test]
    fn test_skips_blank_lines() {
        let file = write_trace("\n100 4 0 1\n\n\n200 1 0 2\n");
        let records: Vec<TraceRecord> = TraceReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_reports_malformed_line_number() {
        let file = write_trace("100 4 0 1\nnot a trace line\n");
        let mut reader = TraceReader::open(file.path()).unwrap();
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(TraceError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed error, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_short_lines() {
        let file = write_trace("100 4\n");
        let mut reader = TraceReader::open(file.path()).unwrap();
        assert!(matches!(
            reader.next().unwrap(),
            Err(TraceError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TraceReader::open(Path::new("/nonexistent/trace.txt")).unwrap_err();
        assert!(matches!(err, TraceError::Io(_)));
    }
}
