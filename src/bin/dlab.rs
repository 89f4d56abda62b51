//! CLI binary for the HAL-to-Zotero pipeline.
//!
//! Usage: dlab import hal-01234567 hal-07654321

#[cfg(feature = "cli")]
mod cli {
    use clap::{Parser, Subcommand};
    use dlab_biblio::error::{Error, Result};
    use dlab_biblio::identifiers::split_identifier_list;
    use dlab_biblio::{flags, updater, Api, Config, ImportReport, Importer, ZoteroClient};
    use std::path::PathBuf;
    use tracing_subscriber::EnvFilter;

    #[derive(Parser)]
    #[command(name = "dlab", about = "HAL to Zotero import and workflow flags", version)]
    struct Cli {
        /// Zotero API key (overrides ZOTERO_API_KEY)
        #[arg(long, global = true)]
        api_key: Option<String>,

        /// Zotero library id (overrides ZOTERO_LIBRARY_ID)
        #[arg(long, global = true)]
        library: Option<String>,

        /// Output format
        #[arg(long, global = true, default_value = "table")]
        output: OutputFormat,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Clone, Copy, clap::ValueEnum)]
    enum OutputFormat {
        Table,
        Json,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Import HAL documents into the Zotero library
        Import {
            /// HAL identifiers
            identifiers: Vec<String>,
            /// Read identifiers from a file (one per line, or comma separated)
            #[arg(short, long)]
            file: Option<PathBuf>,
            /// Concurrent HAL lookups
            #[arg(long)]
            concurrency: Option<usize>,
        },
        /// Read or change workflow flags of an item
        Flags {
            #[command(subcommand)]
            action: FlagAction,
        },
        /// Start the JSON-RPC server (stdio)
        Serve,
    }

    #[derive(Subcommand)]
    enum FlagAction {
        /// Show the flags of an item
        Show { key: String },
        /// Set flags, e.g. `dlab flags set ABCD2345 hal_create=yes comms_publish=no`
        Set {
            key: String,
            #[arg(required = true)]
            assignments: Vec<String>,
        },
    }

    fn init_logging() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("dlab_biblio=info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    fn make_config(api_key: Option<String>, library: Option<String>) -> Result<Config> {
        Config::from_lookup(|name| match name {
            "ZOTERO_API_KEY" => api_key.clone().or_else(|| std::env::var(name).ok()),
            "ZOTERO_LIBRARY_ID" => library.clone().or_else(|| std::env::var(name).ok()),
            _ => std::env::var(name).ok(),
        })
    }

    fn parse_assignment(raw: &str) -> Result<(String, String)> {
        let (key, value) = raw.split_once('=').ok_or_else(|| {
            Error::InvalidInput(format!("expected name=value, got '{}'", raw))
        })?;
        let value = flags::normalize_value(value);
        if value != "yes" && value != "no" {
            return Err(Error::InvalidInput(format!(
                "flag '{}' must be yes or no, got '{}'",
                key.trim(),
                value
            )));
        }
        Ok((key.trim().to_string(), value))
    }

    fn print_report_table(report: &ImportReport) {
        use comfy_table::{ContentArrangement, Table};

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Requested", "Fetched", "Importable", "Imported", "Skipped", "Failures"]);
        table.add_row(vec![
            report.requested.to_string(),
            report.fetched.to_string(),
            report.importable.to_string(),
            report.imported.to_string(),
            report.skipped.to_string(),
            report.failures.to_string(),
        ]);
        println!("{table}");

        if !report.errors.is_empty() {
            let mut errors = Table::new();
            errors.set_content_arrangement(ContentArrangement::Dynamic);
            errors.set_header(vec!["Subject", "Stage", "Message"]);
            for e in &report.errors {
                errors.add_row(vec![e.subject_id.clone(), e.stage.to_string(), e.message.clone()]);
            }
            println!("{errors}");
        }
    }

    pub async fn run() -> Result<()> {
        let cli = Cli::parse();
        init_logging();
        let config = make_config(cli.api_key, cli.library)?;

        match cli.command {
            Commands::Import {
                identifiers,
                file,
                concurrency,
            } => {
                let mut ids = identifiers;
                if let Some(path) = file {
                    let text = std::fs::read_to_string(&path).map_err(|e| {
                        Error::InvalidInput(format!("cannot read {}: {}", path.display(), e))
                    })?;
                    ids.extend(split_identifier_list(&text).into_iter().map(String::from));
                }
                let config = match concurrency {
                    Some(n) => config.with_fetch_concurrency(n),
                    None => config,
                };

                let report = Importer::from_config(&config)?.run(&ids).await?;
                match cli.output {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                    OutputFormat::Table => print_report_table(&report),
                }
            }

            Commands::Flags { action } => {
                let client = ZoteroClient::new(&config)?;
                match action {
                    FlagAction::Show { key } => {
                        let block = updater::read_flags(&client, &key).await?;
                        match cli.output {
                            OutputFormat::Json => {
                                let map: serde_json::Map<String, serde_json::Value> = block
                                    .iter()
                                    .map(|(k, v)| (k.to_string(), v.into()))
                                    .collect();
                                println!("{}", serde_json::to_string_pretty(&map)?);
                            }
                            OutputFormat::Table if block.is_empty() => {
                                println!("No flags on {}", key);
                            }
                            OutputFormat::Table => {
                                for (k, v) in block.iter() {
                                    println!("{}: {}", k, v);
                                }
                            }
                        }
                    }
                    FlagAction::Set { key, assignments } => {
                        let updates = assignments
                            .iter()
                            .map(|a| parse_assignment(a))
                            .collect::<Result<Vec<_>>>()?;
                        let outcome = updater::update_flags(&client, &key, updates).await?;
                        outcome.into_result(&key)?;
                        println!("Updated flags on {}", key);
                    }
                }
            }

            Commands::Serve => {
                dlab_biblio::server::run_server(Api::from_config(&config)?).await?;
            }
        }

        Ok(())
    }
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("This binary requires the 'cli' feature. Build with: cargo build --features cli");
    std::process::exit(1);
}
