use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_sra_explorer::config::ConfigLoader;
use kira_sra_explorer::domain::ProjectAccession;
use kira_sra_explorer::ena::EnaPortalClient;
use kira_sra_explorer::error::ExplorerError;
use kira_sra_explorer::eutils::EutilsClient;
use kira_sra_explorer::explorer::Explorer;
use kira_sra_explorer::output::{ConsoleOutput, JsonOutput, OutputMode};
use kira_sra_explorer::remote::HttpJsonClient;
use kira_sra_explorer::table::{RowFormatter, TsvSink};

#[derive(Parser)]
#[command(name = "kira-sra")]
#[command(about = "Tabulate every run of an SRA/ENA/GEO project with FASTQ FTP and Aspera links")]
#[command(version, author)]
struct Cli {
    /// Project accession, e.g. GSE30567, SRP043510, PRJEB8073 or ERP009109
    project: String,

    /// Tab-separated output file; appended to if it already exists
    output: Utf8PathBuf,

    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ExplorerError>() {
            return ExitCode::from(err.exit_code());
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let project: ProjectAccession = cli.project.parse()?;
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    let http = HttpJsonClient::new(config.timeout)?;
    let eutils = EutilsClient::new(
        http.clone(),
        config.eutils_base_url.clone(),
        config.ncbi_api_key.clone(),
    );
    let ena = EnaPortalClient::new(http, config.ena_portal_base_url.clone());
    let explorer = Explorer::new(eutils, ena)
        .with_formatter(RowFormatter::new(config.aspera_prefix.clone()))
        .with_page_size(config.page_size);

    let mut sink = TsvSink::open_append(&cli.output)?;

    match output_mode {
        OutputMode::Interactive => {
            let result = explorer.explore(&project, &mut sink, &ConsoleOutput)?;
            ConsoleOutput::print_explore(&result).into_diagnostic()?;
        }
        OutputMode::NonInteractive => {
            let result = explorer.explore(&project, &mut sink, &JsonOutput)?;
            JsonOutput::print_explore(&result).into_diagnostic()?;
        }
    }
    Ok(())
}
