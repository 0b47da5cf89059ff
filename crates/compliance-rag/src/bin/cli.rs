//! Compliance checker command line
//!
//! Run with: cargo run -p compliance-rag -- check uploaded_docs/*.docx

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use compliance_rag::compliance::{Checklist, ChecklistVerifier, Classifier};
use compliance_rag::ingestion::{CorpusBuilder, FileParser, ReferenceLoader};
use compliance_rag::providers::{build_llm, EmbeddingProvider, OllamaEmbedder};
use compliance_rag::retrieval::Retriever;
use compliance_rag::{ComplianceConfig, CompliancePipeline, Error, FileOutcome};

#[derive(Debug, Parser)]
#[command(
    name = "compliance-rag",
    about = "ADGM corporate filing compliance checker",
    version
)]
struct Cli {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert raw reference documents into processed text files
    Load,
    /// Chunk and embed processed texts into the reference index
    Embed,
    /// Run `load` then `embed`
    Build,
    /// Show the reference chunks closest to a query
    Query {
        /// Query text
        text: String,
        /// Number of chunks to show
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Determine the entity type of a document
    Classify {
        /// PDF or DOCX file
        file: PathBuf,
    },
    /// Show present / missing required documents for an entity type
    Checklist {
        /// Entity type label, e.g. SPV_Continuance
        entity: String,
    },
    /// Run the full compliance check and write the JSON report
    Check {
        /// PDF or DOCX files, processed in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Report output path
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
    /// Check the embedding and LLM backends
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "compliance_rag=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ComplianceConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Load => run_load(&config),
        Commands::Embed => run_embed(&config).await,
        Commands::Build => {
            run_load(&config)?;
            run_embed(&config).await
        }
        Commands::Query { text, k } => run_query(&config, &text, k).await,
        Commands::Classify { file } => run_classify(&config, &file).await,
        Commands::Checklist { entity } => run_checklist(&config, &entity),
        Commands::Check { files, report } => run_check(&config, &files, report).await,
        Commands::Health => run_health(&config).await,
    }
}

fn embedder(config: &ComplianceConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder = OllamaEmbedder::new(&config.embeddings).context("Failed to create embedder")?;
    Ok(Arc::new(embedder))
}

fn run_load(config: &ComplianceConfig) -> Result<()> {
    let loader = ReferenceLoader::new(&config.paths.raw_docs_dir, &config.paths.processed_texts_dir);
    let summary = loader.run().context("Reference loading failed")?;

    for path in &summary.written {
        eprintln!("  {} {}", style("✓").green(), path.display());
    }
    for (path, reason) in &summary.skipped {
        eprintln!("  {} {} ({})", style("-").yellow(), path.display(), style(reason).dim());
    }
    eprintln!(
        "{} {} written, {} skipped",
        style("Load complete:").bold(),
        summary.written.len(),
        summary.skipped.len()
    );
    Ok(())
}

async fn run_embed(config: &ComplianceConfig) -> Result<()> {
    let builder = CorpusBuilder::new(embedder(config)?, &config.chunking, config.embeddings.batch_size);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
            .context("Invalid progress template")?
            .progress_chars("=> "),
    );

    let stats = builder
        .build(&config.paths.processed_texts_dir, &config.paths.index_dir, |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        })
        .await
        .context("Building the reference index failed")?;
    bar.finish_and_clear();

    eprintln!(
        "{} {} chunks from {} files -> {}",
        style("Index built:").bold(),
        stats.chunks,
        stats.files,
        config.paths.index_dir.display()
    );
    Ok(())
}

async fn run_query(config: &ComplianceConfig, text: &str, k: Option<usize>) -> Result<()> {
    let retriever = Retriever::open(&config.paths.index_dir, embedder(config)?, config.retrieval.top_k)
        .context("Reference index is not available; run `compliance-rag build` first")?;
    let k = k.unwrap_or(retriever.top_k());

    let results = retriever.search(text, k).await.context("Search failed")?;
    if results.is_empty() {
        eprintln!("{}", style("No reference chunks found").dim());
    }
    for (i, result) in results.iter().enumerate() {
        println!(
            "{} {} [{}] {}",
            style(format!("Result {}", i + 1)).bold(),
            style(&result.chunk.source).cyan(),
            result.chunk.category,
            style(format!("{:.3}", result.similarity)).dim()
        );
        println!("{}\n", result.chunk.text);
    }
    Ok(())
}

async fn run_classify(config: &ComplianceConfig, file: &Path) -> Result<()> {
    let parsed = FileParser::parse_path(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let retriever = match Retriever::open(&config.paths.index_dir, embedder(config)?, config.retrieval.top_k) {
        Ok(retriever) => Some(retriever),
        Err(Error::IndexUnavailable(dir)) => {
            tracing::warn!("No reference index at {}, using keyword rules only", dir.display());
            None
        }
        Err(e) => return Err(e).context("Failed to open the reference index"),
    };

    let classifier = Classifier::new(&config.classifier, retriever);
    match classifier.classify_path(file, &parsed.content).await {
        Some(classification) => {
            println!("{}", serde_json::to_string_pretty(&classification)?);
        }
        None => {
            eprintln!("{} entity type could not be determined", style("?").yellow());
        }
    }
    Ok(())
}

fn run_checklist(config: &ComplianceConfig, entity: &str) -> Result<()> {
    let checklist = Checklist::load(&config.paths.checklist_file).context("Failed to load checklist")?;
    let result = ChecklistVerifier::new(checklist, &config.paths.processed_texts_dir).verify(entity);

    for doc in &result.present {
        println!("  {} {}", style("✓").green(), doc);
    }
    for doc in &result.missing {
        println!("  {} {}", style("✗").red(), doc);
    }
    eprintln!(
        "{} {}/{} present",
        style(entity).bold(),
        result.present.len(),
        result.total()
    );
    Ok(())
}

async fn run_check(config: &ComplianceConfig, files: &[PathBuf], report: Option<PathBuf>) -> Result<()> {
    let llm = build_llm(&config.llm).context("Failed to create LLM provider")?;
    let pipeline = CompliancePipeline::new(config, embedder(config)?, llm)
        .context("Reference index is not available; run `compliance-rag build` first")?;

    let report_path = report.unwrap_or_else(|| config.paths.report_file.clone());
    let summary = pipeline
        .run(files, &report_path)
        .await
        .context("Compliance check failed")?;

    for outcome in &summary.outcomes {
        match outcome {
            FileOutcome::Processed(result) => {
                let failures = result.findings.iter().filter(|f| f.is_failure()).count();
                eprintln!(
                    "  {} {} {} ({} findings, {} failed)",
                    style("✓").green(),
                    result.path.display(),
                    style(&result.classification.entity_type).cyan(),
                    result.findings.len(),
                    failures
                );
            }
            FileOutcome::Skipped { path, reason } => {
                eprintln!("  {} {} {}", style("-").yellow(), path.display(), style(reason).dim());
            }
        }
    }

    let checklist = &summary.report.checklist_verification;
    eprintln!(
        "{} {} present, {} missing, {} findings",
        style("Report:").bold(),
        checklist.present.len(),
        checklist.missing.len(),
        summary.report.red_flag_findings.len()
    );
    println!("{}", report_path.display());
    Ok(())
}

async fn run_health(config: &ComplianceConfig) -> Result<()> {
    let embedder = embedder(config)?;
    report_health(embedder.name(), embedder.model(), embedder.health_check().await);

    match build_llm(&config.llm) {
        Ok(llm) => report_health(llm.name(), llm.model(), llm.health_check().await),
        Err(e) => eprintln!("  {} llm: {}", style("✗").red().bold(), e),
    }
    Ok(())
}

fn report_health(name: &str, model: &str, result: compliance_rag::Result<bool>) {
    match result {
        Ok(true) => eprintln!("  {} {} ({})", style("✓").green(), name, model),
        Ok(false) => eprintln!("  {} {} ({}) not responding", style("✗").red().bold(), name, model),
        Err(e) => eprintln!("  {} {} ({}): {}", style("✗").red().bold(), name, model, style(e).dim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_takes_files_report_and_global_config() {
        let cli = Cli::try_parse_from([
            "compliance-rag",
            "check",
            "a.docx",
            "b.pdf",
            "--report",
            "out.json",
            "--config",
            "configs/compliance.toml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("configs/compliance.toml")));
        let Commands::Check { files, report } = cli.command else {
            panic!("expected the check subcommand");
        };
        assert_eq!(files, vec![PathBuf::from("a.docx"), PathBuf::from("b.pdf")]);
        assert_eq!(report, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_check_requires_at_least_one_file() {
        let err = Cli::try_parse_from(["compliance-rag", "check"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_query_top_k_is_optional() {
        let cli = Cli::try_parse_from(["compliance-rag", "query", "share capital", "-k", "3"]).unwrap();
        assert!(matches!(cli.command, Commands::Query { k: Some(3), .. }));

        let cli = Cli::try_parse_from(["compliance-rag", "query", "share capital"]).unwrap();
        assert!(matches!(cli.command, Commands::Query { k: None, .. }));
    }
}
