use anyhow::Result;
use clap::Parser;
use std::io::{StdinLock, Stdout};
use std::path::PathBuf;
use std::time::Instant;

use protscout::config::{PipelineConfig, SearchBackend};
use protscout::docsum::{DocsumSource, EdirectSource, EutilsSource};
use protscout::error::PipelineError;
use protscout::gate::ThresholdPolicy;
use protscout::pipeline::{default_run_name, Pipeline, RunSummary};
use protscout::prompt::{AutoConfirm, Confirm, Decision, PromptError, TerminalPrompter};
use protscout::query::{is_valid_input, SearchQuery};
use protscout::ranking::TruncationPolicy;
use protscout::tools::SystemRunner;

type StdioPrompter = TerminalPrompter<StdinLock<'static>, Stdout>;

fn parse_positive(s: &str) -> Result<usize, String> {
    let val: usize = s.parse().map_err(|_| format!("Invalid number: {}", s))?;
    if val == 0 {
        Err("value must be at least 1".to_string())
    } else {
        Ok(val)
    }
}

fn parse_search_field(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("field must not be blank".to_string())
    } else if !is_valid_input(s) {
        Err(format!("special characters are not allowed: {}", s))
    } else {
        Ok(s.to_string())
    }
}

#[derive(Parser)]
#[command(name = "protscout")]
#[command(version)]
#[command(about = "Protein family survey: NCBI search, conservation and motif analysis")]
#[command(long_about = r#"
protscout - survey a protein family across a taxonomic group

Searches the NCBI protein database, aligns the hits, BLASTs their consensus
back against the set and reports conservation and PROSITE motifs for the
best-scoring sequences.

WORKFLOW:
  esearch/efetch → count gate → skipredundant (optional) → clustalo → cons
    → makeblastdb/blastp → top N by bit score → plotcon → patmatmotifs → tmap

OUTPUT FILES ({name} = run name):
  {name}               FASTA of every search result
  {name}.keep          Redundancy-filtered FASTA (when kept)
  {name}.aligned       Clustal Omega alignment
  {name}.con           Consensus sequence
  {name}.blast         BLAST tabular output (-outfmt 7)
  {name}.plot.ps       Conservation plot of the top hits
  {name}.motifs.tsv    Motif table: Identifier, Motif, Length, Start, End, Status
  {name}.tmap          Predicted transmembrane segments
  {name}.summary.json  Counts, decisions and outputs of the run

INTERACTIVE MODE:
  Without --family and --organism, the search fields and run name are
  prompted for, and another search can be started after each run.

EXAMPLES:
  # Interactive
  protscout

  # Scripted run
  protscout -f "glucose-6-phosphatase" -g Aves -n g6pase_aves -y -o runs/
"#)]
struct Args {
    #[arg(short = 'f', long, value_name = "TEXT", value_parser = parse_search_field, help_heading = "Search")]
    family: Option<String>,

    #[arg(short = 'g', long, value_name = "TEXT", value_parser = parse_search_field, help_heading = "Search")]
    organism: Option<String>,

    #[arg(long, help_heading = "Search")]
    exclude_predicted: bool,

    #[arg(long, help_heading = "Search")]
    exclude_partial: bool,

    #[arg(short = 'b', long, value_enum, default_value_t = SearchBackend::Edirect, help_heading = "Search")]
    backend: SearchBackend,

    #[arg(long, value_name = "NUM", default_value = "1000", value_parser = parse_positive, help_heading = "Thresholds")]
    max_sequences: usize,

    #[arg(long, value_name = "NUM", default_value = "300", value_parser = parse_positive, help_heading = "Thresholds")]
    max_species: usize,

    #[arg(long, value_name = "NUM", default_value = "3", help_heading = "Thresholds")]
    min_sequences: usize,

    #[arg(short = 'N', long, value_name = "NUM", default_value = "250", value_parser = parse_positive, help_heading = "Analysis")]
    top: usize,

    #[arg(long, conflicts_with = "keep_redundant", help_heading = "Analysis")]
    remove_redundant: bool,

    #[arg(long, help_heading = "Analysis")]
    keep_redundant: bool,

    /// Drop the last selected hit when fewer than --top hits exist
    #[arg(long, help_heading = "Analysis")]
    legacy_truncation: bool,

    #[arg(short = 'n', long, value_name = "NAME", value_parser = parse_search_field, help_heading = "Output")]
    name: Option<String>,

    #[arg(short = 'o', long, value_name = "DIR", default_value = ".", help_heading = "Output")]
    outdir: PathBuf,

    #[arg(short = 'u', long, help_heading = "Output")]
    keep_temp: bool,

    #[arg(short = 'v', long, help_heading = "Output")]
    verbose: bool,

    #[arg(short = 't', long, value_name = "NUM", default_value = "16", help_heading = "Runtime")]
    threads: usize,

    #[arg(long, value_name = "PATH", default_value = "pullseq", help_heading = "Runtime")]
    pullseq: String,

    #[arg(short = 'y', long, help_heading = "Runtime")]
    yes: bool,

    /// Give up after this many invalid answers to a prompt
    #[arg(long, value_name = "NUM", value_parser = parse_positive, help_heading = "Runtime")]
    prompt_retries: Option<usize>,
}

impl Args {
    fn is_interactive(&self) -> bool {
        self.family.is_none() || self.organism.is_none()
    }

    fn to_config(&self) -> PipelineConfig {
        let remove_redundant = if self.remove_redundant {
            Some(true)
        } else if self.keep_redundant {
            Some(false)
        } else if self.yes {
            Some(true)
        } else {
            None
        };

        PipelineConfig {
            policy: ThresholdPolicy {
                max_sequences: self.max_sequences,
                max_species: self.max_species,
                min_sequences: self.min_sequences,
            },
            top_n: self.top,
            threads: self.threads,
            pullseq: self.pullseq.clone(),
            backend: self.backend,
            truncation: if self.legacy_truncation {
                TruncationPolicy::DropLastWhenShort
            } else {
                TruncationPolicy::KeepAll
            },
            remove_redundant,
            assume_yes: self.yes,
            prompt_retries: self.prompt_retries,
            keep_temp: self.keep_temp,
            outdir: self.outdir.clone(),
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "protscout=debug" } else { "protscout=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn prompt_cancelled(stage: &str, err: PromptError) -> anyhow::Error {
    match err {
        PromptError::Io(e) => e.into(),
        _ => PipelineError::Cancelled { stage: stage.to_string() }.into(),
    }
}

fn accept_field(answer: &str) -> bool {
    if answer.trim().is_empty() {
        eprintln!("Warning: the field was left blank.");
        return false;
    }
    if !is_valid_input(answer) {
        eprintln!("Special characters are not allowed");
        return false;
    }
    true
}

/// Asks for the search fields until the user confirms them.
fn prompt_query(prompter: &mut StdioPrompter) -> Result<SearchQuery> {
    let cancelled = |e: PromptError| prompt_cancelled("search input", e);

    let mut query = loop {
        let family = prompter
            .ask_text("Enter your desired protein family: ", accept_field)
            .map_err(cancelled)?;
        let taxon = prompter
            .ask_text("Enter taxonomic group: ", accept_field)
            .map_err(cancelled)?;

        println!("Protein family: {}, Taxonomic group: {}", family.trim(), taxon.trim());
        if prompter.confirm("Are these correct? Y/N: ").map_err(cancelled)?.is_yes() {
            break SearchQuery::new(&family, &taxon)?;
        }
        println!("Please re-enter protein family and group.");
    };

    query.exclude_predicted = prompter
        .confirm("Do you wish to exclude predicted sequences? Y/N: ")
        .map_err(cancelled)?
        .is_yes();
    query.exclude_partial = prompter
        .confirm("Do you wish to exclude partial sequences? Y/N: ")
        .map_err(cancelled)?
        .is_yes();
    Ok(query)
}

fn run_once(args: &Args, pipeline: &Pipeline, prompter: &mut StdioPrompter) -> Result<RunSummary> {
    let query = match (&args.family, &args.organism) {
        (Some(family), Some(organism)) => {
            let mut query = SearchQuery::new(family, organism)?;
            query.exclude_predicted = args.exclude_predicted;
            query.exclude_partial = args.exclude_partial;
            query
        }
        _ => prompt_query(prompter)?,
    };

    let run_name = match args.name {
        Some(ref name) => name.clone(),
        None if args.is_interactive() => prompter
            .ask_text("Enter filename: ", accept_field)
            .map_err(|e| prompt_cancelled("filename input", e))?,
        None => default_run_name(&query),
    };
    let run_name = run_name.trim().to_lowercase().replace(' ', "_");

    let mut auto = AutoConfirm(Decision::Yes);
    let confirmer: &mut dyn Confirm = if args.yes { &mut auto } else { prompter };
    pipeline.run(&query, &run_name, confirmer)
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Motifs in top {} sequences:", summary.selected.len());
    if let Err(e) = summary.features.write_table(&mut std::io::stdout().lock()) {
        tracing::warn!("failed to print motif table: {:#}", e);
    }
    let excluded = summary.excluded();
    if !excluded.is_empty() {
        println!("Excluded from table: {}", excluded.join(", "));
    }
    println!();
    println!("Output files:");
    for path in &summary.outputs {
        println!("  {}", path.display());
    }
}

fn main() -> Result<()> {
    let mut args = Args::parse();
    let start_time = Instant::now();

    init_logging(args.verbose);

    if args.threads == 0 {
        args.threads = num_cpus::get();
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .ok();

    let config = args.to_config();
    let runner = SystemRunner;
    let edirect = EdirectSource { runner: &runner };
    let eutils = EutilsSource::default();
    let source: &dyn DocsumSource = match config.backend {
        SearchBackend::Edirect => &edirect,
        SearchBackend::Eutils => &eutils,
    };
    let pipeline = Pipeline::new(&config, &runner, source)?;
    let mut prompter = TerminalPrompter::stdio(config.prompt_retries);

    tracing::debug!("output directory: {}", pipeline.workspace().base().display());

    loop {
        match run_once(&args, &pipeline, &mut prompter) {
            Ok(summary) => {
                print_summary(&summary);
                for warning in &summary.warnings {
                    eprintln!("Warning: {}", warning);
                }
            }
            Err(e) => match e.downcast_ref::<PipelineError>() {
                Some(abort) if abort.is_expected_abort() => {
                    eprintln!("{}", abort);
                    if !args.is_interactive() {
                        std::process::exit(2);
                    }
                }
                _ if args.is_interactive() => eprintln!("Error: {:#}", e),
                _ => return Err(e),
            },
        }

        if !args.is_interactive() {
            break;
        }
        match prompter.confirm("Would you like to do another search? Y/N: ") {
            Ok(Decision::Yes) => continue,
            _ => break,
        }
    }

    tracing::info!("Finished in {:.1}s", start_time.elapsed().as_secs_f64());
    Ok(())
}
