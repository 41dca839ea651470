//! Docsum Search Result Module
//!
//! Extracts (species, accession) pairs from NCBI protein document summaries
//! and fetches those summaries from either EDirect or E-utilities.
//!
//! # Docsum Annotations
//! ```text
//! <Title>serine/threonine kinase [Gallus gallus]</Title>
//! <AccessionVersion>XP_015140120.1</AccessionVersion>
//! ```
//! Species and accession annotations are matched independently and paired
//! by position; the i-th species belongs to the i-th accession.

use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::ToolFailure;
use crate::tools::{pipe, ToolRunner, ToolSpec};

static SPECIES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(.*?)\]").expect("species pattern is valid")
});

static ACCESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<AccessionVersion>(.*?)</AccessionVersion>").expect("accession pattern is valid")
});

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

// ============================================================================
// Records
// ============================================================================

/// One entry of the search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResultRecord {
    /// Organism name from the bracketed title suffix (not unique).
    pub species: String,
    /// Versioned accession (expected unique, not guaranteed).
    pub accession: String,
}

/// Counts consumed by the threshold gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CountSummary {
    pub total_results: usize,
    pub distinct_species: usize,
}

impl CountSummary {
    pub fn from_records(records: &[SearchResultRecord]) -> Self {
        let species: FxHashSet<&str> = records.iter().map(|r| r.species.as_str()).collect();
        Self {
            total_results: records.len(),
            distinct_species: species.len(),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Parses raw docsum text into positionally paired records.
///
/// The number of records is the smaller of the two annotation counts. A
/// count mismatch is logged but is not an error.
pub fn parse_docsum(text: &str) -> Vec<SearchResultRecord> {
    let species: Vec<&str> = SPECIES_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();
    let accessions: Vec<&str> = ACCESSION_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();

    if species.len() != accessions.len() {
        tracing::warn!(
            "docsum has {} species annotations but {} accessions; pairing the first {}",
            species.len(),
            accessions.len(),
            species.len().min(accessions.len())
        );
    }

    species
        .into_iter()
        .zip(accessions)
        .map(|(s, a)| SearchResultRecord {
            species: s.to_string(),
            accession: a.trim().to_string(),
        })
        .collect()
}

/// Keeps only the `<Title>` and `<AccessionVersion>` lines of a docsum.
///
/// Other elements also carry brackets (`<Extra>gi|..|[1720383270]</Extra>`)
/// that would otherwise count as species.
pub fn annotation_lines(docsum: &str) -> String {
    docsum
        .lines()
        .filter(|line| line.contains("<Title>") || line.contains("<AccessionVersion>"))
        .fold(String::new(), |mut out, line| {
            out.push_str(line.trim());
            out.push('\n');
            out
        })
}

// ============================================================================
// Sources
// ============================================================================

/// Produces docsum text for a search term.
pub trait DocsumSource {
    /// Returns the raw docsum for `term`, or a failure when the search has
    /// no results or the backend could not be reached.
    fn fetch_docsum(&self, term: &str) -> Result<String, ToolFailure>;

    /// Downloads the protein FASTA for `term` into `output`.
    fn fetch_fasta(&self, term: &str, output: &std::path::Path) -> Result<(), ToolFailure>;
}

/// EDirect command-line tools: `esearch | efetch`.
pub struct EdirectSource<'a> {
    pub runner: &'a dyn ToolRunner,
}

impl EdirectSource<'_> {
    fn search_spec(term: &str) -> ToolSpec {
        ToolSpec::new("esearch").args(["-db", "protein", "-query", term])
    }
}

impl DocsumSource for EdirectSource<'_> {
    fn fetch_docsum(&self, term: &str) -> Result<String, ToolFailure> {
        let out = pipe(
            self.runner,
            &Self::search_spec(term),
            ToolSpec::new("efetch").args(["-format", "docsum"]),
        )?;
        let text = out.text();
        if text.trim().is_empty() {
            return Err(ToolFailure::NoOutput { program: "efetch".into() });
        }
        Ok(annotation_lines(&text))
    }

    fn fetch_fasta(&self, term: &str, output: &std::path::Path) -> Result<(), ToolFailure> {
        pipe(
            self.runner,
            &Self::search_spec(term),
            ToolSpec::new("efetch").args(["-format", "fasta"]).stdout_to(output),
        )?;
        Ok(())
    }
}

/// NCBI E-utilities over HTTPS (single attempt, no retry).
pub struct EutilsSource {
    pub timeout: Duration,
    pub retmax: usize,
}

impl Default for EutilsSource {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            retmax: 10_000,
        }
    }
}

impl EutilsSource {
    fn remote_err(err: impl std::fmt::Display) -> ToolFailure {
        ToolFailure::Remote {
            service: "NCBI E-utilities".into(),
            message: err.to_string(),
        }
    }

    /// Runs esearch with history and returns (WebEnv, QueryKey, Count).
    fn search(&self, term: &str) -> Result<(String, String, usize), ToolFailure> {
        let body = ureq::get(&format!("{}/esearch.fcgi", EUTILS_BASE))
            .query("db", "protein")
            .query("term", term)
            .query("usehistory", "y")
            .timeout(self.timeout)
            .call()
            .map_err(Self::remote_err)?
            .into_string()
            .map_err(Self::remote_err)?;

        let webenv = xml_field(&body, "WebEnv");
        let query_key = xml_field(&body, "QueryKey");
        let count = xml_field(&body, "Count").and_then(|c| c.parse().ok()).unwrap_or(0);

        match (webenv, query_key) {
            (Some(w), Some(q)) if count > 0 => Ok((w, q, count)),
            _ => Err(ToolFailure::NoOutput { program: "esearch.fcgi".into() }),
        }
    }

    /// Version 2.0 document summaries, the only layout that carries
    /// `<AccessionVersion>` elements.
    fn summary(&self, term: &str) -> Result<String, ToolFailure> {
        let (webenv, query_key, count) = self.search(term)?;
        ureq::get(&format!("{}/esummary.fcgi", EUTILS_BASE))
            .query("db", "protein")
            .query("WebEnv", &webenv)
            .query("query_key", &query_key)
            .query("version", "2.0")
            .query("retmax", &count.min(self.retmax).to_string())
            .timeout(self.timeout)
            .call()
            .map_err(Self::remote_err)?
            .into_string()
            .map_err(Self::remote_err)
    }

    fn fetch_sequences(&self, term: &str) -> Result<ureq::Response, ToolFailure> {
        let (webenv, query_key, count) = self.search(term)?;
        ureq::get(&format!("{}/efetch.fcgi", EUTILS_BASE))
            .query("db", "protein")
            .query("WebEnv", &webenv)
            .query("query_key", &query_key)
            .query("rettype", "fasta")
            .query("retmode", "text")
            .query("retmax", &count.min(self.retmax).to_string())
            .timeout(self.timeout)
            .call()
            .map_err(Self::remote_err)
    }
}

impl DocsumSource for EutilsSource {
    fn fetch_docsum(&self, term: &str) -> Result<String, ToolFailure> {
        self.summary(term).map(|body| annotation_lines(&body))
    }

    fn fetch_fasta(&self, term: &str, output: &std::path::Path) -> Result<(), ToolFailure> {
        let response = self.fetch_sequences(term)?;
        let mut file = std::fs::File::create(output).map_err(Self::remote_err)?;
        std::io::copy(&mut response.into_reader(), &mut file).map_err(Self::remote_err)?;
        Ok(())
    }
}

/// Extracts the text of the first `<tag>...</tag>` element.
fn xml_field(body: &str, tag: &str) -> Option<String> {
    body.split(&format!("<{}>", tag))
        .nth(1)
        .and_then(|s| s.split(&format!("</{}>", tag)).next())
        .map(|s| s.trim().to_string())
}

// ============================================================================
// Tests
// ============================================================================
