//! BLAST Tabular Parser Module
//!
//! Parses `blastp -outfmt 7` output (tabular with comment lines).
//!
//! # Columns
//! ```text
//! Col  Type    Description
//! 1    string  Query accession
//! 2    string  Subject accession
//! 3    float   Percent identity
//! 4    int     Alignment length
//! 5    int     Mismatches
//! 6    int     Gap opens
//! 7    int     Query start
//! 8    int     Query end
//! 9    int     Subject start
//! 10   int     Subject end
//! 11   float   E-value
//! 12   float   Bit score
//! ```
//!
//! The first [`HEADER_LINES`] lines are the comment header. Any later line
//! starting with `#` (per-query headers, the trailing
//! `# BLAST processed N queries` line) is skipped as well.
//!
//! # Example Usage
//! ```no_run
//! use protscout::blast::BlastTabReader;
//!
//! for hit in BlastTabReader::open("set.blast").unwrap() {
//!     let hit = hit.unwrap();
//!     println!("{} {:.1}", hit.subject_acc, hit.bit_score);
//! }
//! ```

use anyhow::{Context, Result};
use std::io::BufRead;
use std::path::Path;

use crate::seqio::open_text;

/// Comment lines at the top of an `-outfmt 7` table.
pub const HEADER_LINES: usize = 5;

// ============================================================================
// Alignment Hit
// ============================================================================

/// One row of the BLAST table.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentHit {
    pub query_acc: String,
    pub subject_acc: String,
    pub percent_identity: f64,
    pub alignment_length: usize,
    pub mismatches: usize,
    pub gap_opens: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub subject_start: usize,
    pub subject_end: usize,
    pub evalue: f64,
    /// Sole ranking key.
    pub bit_score: f64,
}

impl AlignmentHit {
    /// Parses a tab-separated row.
    ///
    /// # Errors
    /// Returns an error if the row has fewer than 12 fields or a numeric
    /// field cannot be parsed.
    pub fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < 12 {
            anyhow::bail!("Invalid BLAST line: {} fields, expected 12", fields.len());
        }

        Ok(Self {
            query_acc: fields[0].to_string(),
            subject_acc: fields[1].to_string(),
            percent_identity: fields[2].parse().context("Invalid percent identity")?,
            alignment_length: fields[3].parse().context("Invalid alignment length")?,
            mismatches: fields[4].parse().context("Invalid mismatch count")?,
            gap_opens: fields[5].parse().context("Invalid gap open count")?,
            query_start: fields[6].parse().context("Invalid query start")?,
            query_end: fields[7].parse().context("Invalid query end")?,
            subject_start: fields[8].parse().context("Invalid subject start")?,
            subject_end: fields[9].parse().context("Invalid subject end")?,
            evalue: fields[10].parse().context("Invalid e-value")?,
            bit_score: fields[11].parse().context("Invalid bit score")?,
        })
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Sequential reader for BLAST tabular output.
pub struct BlastTabReader<R: BufRead> {
    reader: R,
    line_buf: String,
    line_no: usize,
}

impl BlastTabReader<Box<dyn BufRead + Send>> {
    /// Opens a BLAST table (plain or `.gz`).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_text(path)
            .with_context(|| format!("Failed to open BLAST table: {}", path.display()))?;
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> BlastTabReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buf: String::with_capacity(256),
            line_no: 0,
        }
    }

    /// Reads the next hit.
    ///
    /// # Returns
    /// - `Ok(Some(hit))` - Successfully read a hit
    /// - `Ok(None)` - End of input
    /// - `Err(e)` - I/O or parse error, tagged with the line number
    pub fn read_next(&mut self) -> Result<Option<AlignmentHit>> {
        loop {
            self.line_buf.clear();
            if self.reader.read_line(&mut self.line_buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            if self.line_no <= HEADER_LINES {
                continue;
            }
            let line = self.line_buf.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let hit = AlignmentHit::parse_line(line)
                .with_context(|| format!("BLAST table line {}", self.line_no))?;
            return Ok(Some(hit));
        }
    }
}

impl<R: BufRead> Iterator for BlastTabReader<R> {
    type Item = Result<AlignmentHit>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(hit)) => Some(Ok(hit)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Reads every hit of a table.
pub fn read_hits<R: BufRead>(reader: R) -> Result<Vec<AlignmentHit>> {
    BlastTabReader::new(reader).collect()
}

// ============================================================================
// Tests
// ============================================================================
