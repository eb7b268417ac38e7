use anyhow::Result;
use clap::Parser;
use nvme_lint::{
    config::{expand_path, Config},
    schedule, LintError,
};
use std::{path::Path, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Validate register and field tables extracted from the NVMe specification"
)]
struct Args {
    /// Extraction dump (JSON) of the specification document
    file: String,
    /// Log filter directive, e.g. `debug` or `info,nvme_lint::transform=debug`
    #[arg(short, long, default_value = "info")]
    log: String,
    /// File of figure numbers to skip, one per line
    #[arg(short, long)]
    ignore: Option<String>,
    /// File of figure numbers to check exclusively, one per line
    #[arg(short, long)]
    target: Option<String>,
    /// Write the grouped tables to `output.yaml`
    #[arg(short, long)]
    yaml: bool,
    /// Write the grouped tables to this path
    #[arg(short, long)]
    output: Option<String>,
    /// Worker threads for page parsing
    #[arg(short, long, default_value_t = 10)]
    workers: usize,
}

impl Args {
    fn config(&self) -> Config {
        let output = match (&self.output, self.yaml) {
            (Some(path), _) => Some(expand_path(path)),
            (None, true) => Some(expand_path("output.yaml")),
            (None, false) => None,
        };
        Config {
            log_level: self.log.clone(),
            ignore: self.ignore.as_deref().map(expand_path),
            target: self.target.as_deref().map(expand_path),
            output,
            workers: self.workers,
            ..Config::default()
        }
    }
}

fn init_logging(config: &Config) {
    let env = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
}

fn main() -> ExitCode {
    // ─── 1) args & config ────────────────────────────────────────────
    let args = Args::parse();
    let config = args.config();

    // ─── 2) init logging ─────────────────────────────────────────────
    init_logging(&config);
    info!("startup");

    // ─── 3) lint the document ────────────────────────────────────────
    let dump = expand_path(&args.file);
    match lint(&config, &dump) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let missing = e.chain().any(|cause| {
                matches!(
                    cause.downcast_ref::<LintError>(),
                    Some(LintError::MissingResource { .. })
                )
            });
            if missing {
                error!("File not found: {}", dump.display());
            }
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn lint(config: &Config, dump: &Path) -> Result<()> {
    let groups = schedule::run(config, dump)?;
    let tables: usize = groups.values().map(|g| g.tables.len()).sum();
    info!("{} groups, {} tables", groups.len(), tables);
    Ok(())
}
