use anyhow::{Context, Result};
use async_trait::async_trait;
use cipherdesk_core::{
    suggested_key_file_name, Operation, Orchestrator, OrchestratorError, Outcome, ProcessEngine,
    ProcessOptions, SavePicker, SaveRequest, Settings, SystemOpener,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cipherdesk-cli")]
#[command(about = "Headless front-end for the cipherdesk orchestrator", long_about = None)]
struct Cli {
    /// Settings file (defaults to the per-user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Scratch directory for intermediate files
    #[arg(long, global = true)]
    scratch_dir: Option<PathBuf>,

    /// Cipher engine executable
    #[arg(long, global = true)]
    engine: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    Encrypt(Transform),

    /// Decrypt a file
    Decrypt(Transform),

    /// Generate an RSA key pair
    RsaKeygen {
        #[arg(short, long, default_value_t = 2048)]
        bits: u32,

        /// Write the key pair here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Reduce an RSA key file to the fields one operation needs
    NormalizeKey {
        file: PathBuf,

        #[arg(short = 'p', long, default_value = "encrypt")]
        operation: Operation,

        /// Save the normalized key here instead of printing it
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Generate an ECDH key pair
    EcdhKeygen,

    /// Compute an ECDH shared secret
    EcdhSecret {
        #[arg(long)]
        private_key: String,

        #[arg(long)]
        public_key: String,
    },

    /// Operation log
    Logs {
        #[command(subcommand)]
        action: LogAction,
    },
}

#[derive(clap::Args)]
struct Transform {
    input: PathBuf,

    #[arg(short, long)]
    key: String,

    #[arg(short, long, default_value = "aes-gcm")]
    algorithm: String,

    #[arg(short, long)]
    out: PathBuf,
}

#[derive(Subcommand)]
enum LogAction {
    /// Print the log
    Show,
    /// Empty the log
    Clear,
    /// Write the log to a file
    Export { out: PathBuf },
}

/// "Picker" that always answers with the destination given on the command line.
struct FixedDestination(Option<PathBuf>);

#[async_trait]
impl SavePicker for FixedDestination {
    async fn pick_save_path(&self, _request: SaveRequest) -> Outcome<Option<PathBuf>> {
        Ok(self.0.clone())
    }
}

struct NoOpener;

#[async_trait]
impl SystemOpener for NoOpener {
    async fn open(&self, path: &Path) -> Outcome<()> {
        Err(OrchestratorError::Io(format!(
            "cannot open {} from the command line",
            path.display()
        )))
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => {
            let mut settings = Settings::load_from(path)?;
            settings.apply_env();
            settings
        }
        None => Settings::load()?,
    };
    if let Some(dir) = &cli.scratch_dir {
        settings.scratch_dir = Some(dir.clone());
    }
    if let Some(program) = &cli.engine {
        settings.engine.program = program.clone();
    }
    Ok(settings)
}

fn orchestrator(settings: &Settings, destination: Option<PathBuf>) -> Result<Orchestrator> {
    let engine = Arc::new(ProcessEngine::from_settings(&settings.engine));
    let orch = Orchestrator::new(
        settings,
        engine,
        Arc::new(FixedDestination(destination)),
        Arc::new(NoOpener),
    )?;
    Ok(orch)
}

async fn transform(settings: &Settings, operation: Operation, args: Transform) -> Result<()> {
    let bytes = tokio::fs::read(&args.input)
        .await
        .with_context(|| format!("read {}", args.input.display()))?;
    let name = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let orch = orchestrator(settings, Some(args.out.clone()))?;
    let result = async {
        orch.store(&name, &bytes).await?;
        let options = ProcessOptions::new(args.key, args.algorithm);
        let record = orch.process(operation, &options).await?;
        orch.download(None).await?;
        Ok::<_, OrchestratorError>(record)
    }
    .await;
    orch.end_session().await;

    let record = result?;
    info!(%operation, out = %args.out.display(), size = record.size, "done");
    println!("{}", args.out.display());
    Ok(())
}

async fn run(cli: Cli, settings: Settings) -> Result<()> {
    match cli.command {
        Commands::Encrypt(args) => transform(&settings, Operation::Encrypt, args).await?,
        Commands::Decrypt(args) => transform(&settings, Operation::Decrypt, args).await?,
        Commands::RsaKeygen { bits, out } => {
            let orch = orchestrator(&settings, out.clone())?;
            let pair = orch.keys().generate_rsa_keypair(bits).await?;
            match out {
                Some(_) => {
                    orch.keys()
                        .save_key(&pair, Some(suggested_key_file_name(None)))
                        .await?
                }
                None => println!("{pair}"),
            }
        }
        Commands::NormalizeKey { file, operation, out } => {
            let payload = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("read {}", file.display()))?;
            let orch = orchestrator(&settings, out.clone())?;
            let key = orch.keys().normalize_rsa_key(&payload, operation)?.to_json()?;
            match out {
                Some(_) => {
                    orch.keys()
                        .save_key(&key, Some(suggested_key_file_name(Some(operation))))
                        .await?
                }
                None => println!("{key}"),
            }
        }
        Commands::EcdhKeygen => {
            let orch = orchestrator(&settings, None)?;
            let pair = orch.keys().generate_ecdh_keypair().await?;
            println!("{}", serde_json::to_string_pretty(&pair)?);
        }
        Commands::EcdhSecret {
            private_key,
            public_key,
        } => {
            let orch = orchestrator(&settings, None)?;
            let secret = orch
                .keys()
                .compute_shared_secret(&private_key, &public_key)
                .await?;
            println!("{secret}");
        }
        Commands::Logs { action } => match action {
            LogAction::Show => {
                let orch = orchestrator(&settings, None)?;
                print!("{}", orch.logs().get().await?);
            }
            LogAction::Clear => {
                let orch = orchestrator(&settings, None)?;
                orch.logs().clear().await?;
            }
            LogAction::Export { out } => {
                let orch = orchestrator(&settings, Some(out.clone()))?;
                orch.logs().export_to_file().await?;
                println!("{}", out.display());
            }
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli);
    let default_filter = settings
        .as_ref()
        .map(|s| s.log_filter.clone())
        .unwrap_or_else(|_| Settings::default().log_filter);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    run(cli, settings?).await
}
