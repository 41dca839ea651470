//! Sequence I/O Module
//!
//! Text and FASTA readers shared by every pipeline stage. All inputs the
//! pipeline consumes (docsum dumps, FASTA sets, BLAST tables, motif reports)
//! may be plain or gzip-compressed.
//!
//! # Examples
//! ```no_run
//! use protscout::seqio::{count_sequences, FastaReader};
//!
//! let mut reader = FastaReader::open("kinases.fasta").unwrap();
//! while let Some(record) = reader.read_next().unwrap() {
//!     println!("{}: {} aa", record.name, record.seq.len());
//! }
//!
//! let n = count_sequences("kinases.fasta.keep").unwrap();
//! println!("{} sequences survived the filter", n);
//! ```

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const READ_BUFFER: usize = 1024 * 1024;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// ============================================================================
// Plain / Gzip Text
// ============================================================================

/// Opens a text file for buffered line reading.
///
/// Gzip input is recognized by its magic bytes (or a `.gz` extension) and
/// decompressed on the fly; everything else is read as plain text.
pub fn open_text<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::with_capacity(READ_BUFFER, file);

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let is_gzip = ext == "gz"
        || reader
            .fill_buf()
            .with_context(|| format!("Failed to read {}", path.display()))?
            .starts_with(&GZIP_MAGIC);

    if is_gzip {
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER, MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Reads a whole text file (plain or gzip) into memory.
pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let mut text = String::new();
    open_text(path)?
        .read_to_string(&mut text)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(text)
}

// ============================================================================
// FASTA Format
// ============================================================================

/// A FASTA record containing sequence name and residues.
#[derive(Debug, Clone)]
pub struct FastaRecord {
    /// Sequence identifier extracted from the header line.
    pub name: String,
    /// Residues concatenated from all sequence lines.
    pub seq: String,
}

/// Sequential reader for FASTA format.
///
/// Reads records one at a time. Handles multi-line sequences and strips
/// trailing whitespace.
pub struct FastaReader<R: BufRead> {
    reader: R,
    line_buf: String,
    current_name: Option<String>,
}

impl FastaReader<Box<dyn BufRead + Send>> {
    /// Opens a FASTA file (plain or `.gz`) for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = open_text(path)
            .with_context(|| format!("Failed to open FASTA: {}", path.display()))?;
        Self::new(reader)
    }
}

impl<R: BufRead> FastaReader<R> {
    /// Wraps an existing buffered reader.
    ///
    /// Lines before the first `>` header are ignored.
    pub fn new(reader: R) -> Result<Self> {
        let mut fasta = Self {
            reader,
            line_buf: String::with_capacity(256),
            current_name: None,
        };

        loop {
            fasta.line_buf.clear();
            if fasta.reader.read_line(&mut fasta.line_buf)? == 0 {
                break;
            }
            if let Some(header) = fasta.line_buf.strip_prefix('>') {
                fasta.current_name = Some(header_name(header));
                break;
            }
        }

        Ok(fasta)
    }

    /// Reads the next FASTA record.
    ///
    /// # Returns
    /// - `Ok(Some(record))` - Successfully read a record
    /// - `Ok(None)` - End of input reached
    /// - `Err(e)` - I/O error occurred
    pub fn read_next(&mut self) -> Result<Option<FastaRecord>> {
        let name = match self.current_name.take() {
            Some(n) => n,
            None => return Ok(None),
        };

        let mut seq = String::with_capacity(1024);

        loop {
            self.line_buf.clear();
            if self.reader.read_line(&mut self.line_buf)? == 0 {
                break;
            }

            if let Some(header) = self.line_buf.strip_prefix('>') {
                self.current_name = Some(header_name(header));
                break;
            }
            seq.push_str(self.line_buf.trim_end());
        }

        Ok(Some(FastaRecord { name, seq }))
    }
}

impl<R: BufRead> Iterator for FastaReader<R> {
    type Item = Result<FastaRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

fn header_name(header: &str) -> String {
    header.split_whitespace().next().unwrap_or("").to_string()
}

/// Counts the sequences in a FASTA file (one per `>` header line).
pub fn count_sequences<P: AsRef<Path>>(path: P) -> Result<usize> {
    let mut count = 0;
    for record in FastaReader::open(path)? {
        record?;
        count += 1;
    }
    Ok(count)
}

// ============================================================================
// Tests
// ============================================================================
