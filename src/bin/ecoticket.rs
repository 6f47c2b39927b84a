use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ecoticket::{
    CaptureEngine, CaptureGate, DeliveryOrchestrator, DeliveryOutcome, DeliveryResult,
    FontEnvironment, IssuedTicket, LogoCache, PipelineConfig, Step, TicketCard, VerifyStatus,
    Wizard,
    assets::logo::logo_source_for,
    delivery::TracingNotifier,
    readiness::wait_until_ready_with,
    wizard::SnapshotStore,
};

#[derive(Parser, Debug)]
#[command(name = "ecoticket", version)]
struct Cli {
    /// Pipeline configuration JSON. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Issue a ticket and email its image.
    Issue(IssueArgs),
    /// Email an already issued ticket again.
    Resend(ResendArgs),
    /// Look up a ticket and optionally mark it used.
    Verify(VerifyArgs),
    /// Render a ticket card to a JPEG file without contacting the backend.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct IssueArgs {
    /// Fare amount (minimum 300).
    #[arg(long)]
    amount: String,

    /// Recipient email.
    #[arg(long)]
    email: String,

    /// Optional phone number.
    #[arg(long, default_value = "")]
    phone: String,

    /// Also write the captured JPEG here.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ResendArgs {
    #[arg(long)]
    ticket_id: String,

    #[arg(long)]
    email: String,

    /// Amount shown on the card.
    #[arg(long, default_value = "")]
    amount: String,

    /// Display date shown on the card (e.g. `05 Mar 2026`).
    #[arg(long)]
    date_issued: Option<String>,
}

#[derive(Parser, Debug)]
struct VerifyArgs {
    ticket_id: String,

    /// Mark the ticket used when it is valid.
    #[arg(long)]
    invalidate: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[arg(long)]
    ticket_id: String,

    #[arg(long, default_value = "")]
    amount: String,

    #[arg(long)]
    date_issued: Option<String>,

    /// Logo location, overriding the configured one.
    #[arg(long)]
    logo: Option<String>,

    /// Output JPEG path.
    #[arg(long)]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    match cli.cmd {
        Command::Issue(args) => cmd_issue(&cfg, args).await,
        Command::Resend(args) => cmd_resend(&cfg, args).await,
        Command::Verify(args) => cmd_verify(&cfg, args).await,
        Command::Render(args) => cmd_render(&cfg, args).await,
    }
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("ecoticket/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("build http client")
}

fn orchestrator(cfg: &PipelineConfig) -> anyhow::Result<DeliveryOrchestrator> {
    Ok(DeliveryOrchestrator::from_config(
        cfg,
        http_client()?,
        Arc::new(TracingNotifier),
    ))
}

async fn cmd_issue(cfg: &PipelineConfig, args: IssueArgs) -> anyhow::Result<()> {
    let orch = orchestrator(cfg)?;
    let mut wizard = Wizard::with_store(
        SnapshotStore::open(&cfg.state_path),
        Arc::new(TracingNotifier),
    );
    if wizard.step() != Step::FIRST {
        wizard.reset();
    }

    wizard.set_amount(args.amount);
    anyhow::ensure!(wizard.next(), "invalid amount");
    wizard.set_email(args.email);
    wizard.set_phone(args.phone);
    anyhow::ensure!(wizard.next(), "invalid email");

    let result = wizard.generate(&orch).await?;
    if let Some(ticket) = &result.ticket {
        eprintln!("ticket {}", ticket.ticket_id);
    }
    finish(result, args.out.as_deref())
}

async fn cmd_resend(cfg: &PipelineConfig, args: ResendArgs) -> anyhow::Result<()> {
    let orch = orchestrator(cfg)?;
    orch.mount(IssuedTicket {
        ticket_id: args.ticket_id.clone(),
        amount: args.amount,
        date_issued: args.date_issued,
    })?;
    let result = orch.resend(&args.ticket_id, &args.email).await;
    finish(result, None)
}

async fn cmd_verify(cfg: &PipelineConfig, args: VerifyArgs) -> anyhow::Result<()> {
    let api = ecoticket::HttpTicketApi::new(http_client()?, cfg.api_base());
    let status = ecoticket::verify_ticket(&api, &args.ticket_id).await;
    println!("{}", status.label());

    if args.invalidate {
        let VerifyStatus::Valid(_) = status else {
            anyhow::bail!("only valid tickets can be marked used");
        };
        ecoticket::invalidate_ticket(&api, &TracingNotifier, &args.ticket_id).await?;
    }
    Ok(())
}

async fn cmd_render(cfg: &PipelineConfig, args: RenderArgs) -> anyhow::Result<()> {
    let location = args.logo.as_deref().unwrap_or(&cfg.logo);
    let logos = Arc::new(LogoCache::new(
        logo_source_for(location, http_client()?),
        cfg.logo_timeout(),
    ));
    let ticket = IssuedTicket {
        ticket_id: args.ticket_id,
        amount: args.amount,
        date_issued: args.date_issued,
    };
    let card = TicketCard::mount(ticket.content(), &cfg.page(), logos)?;

    let settings = ecoticket::delivery::DeliverySettings::from(cfg);
    let waited = wait_until_ready_with(&card.readiness(), settings.wait).await;
    let gate = CaptureGate::decide(waited.succeeded, settings.policy)
        .with_context(|| format!("card not ready after {} attempt(s)", waited.attempts))?;

    let engine = CaptureEngine::new(
        FontEnvironment::system(&cfg.font_dirs),
        (&cfg.capture).into(),
    );
    let image = engine.capture(&card, gate).await?;
    write_jpeg(&args.out, &image.jpeg_bytes()?)?;
    Ok(())
}

fn finish(result: DeliveryResult, out: Option<&Path>) -> anyhow::Result<()> {
    match result.outcome {
        DeliveryOutcome::Delivered { image, .. } => {
            if let Some(out) = out {
                write_jpeg(out, &image.jpeg_bytes()?)?;
            }
            Ok(())
        }
        DeliveryOutcome::CreateFailed { message, .. }
        | DeliveryOutcome::CaptureFailed { message }
        | DeliveryOutcome::EmailFailed { message, .. } => anyhow::bail!(message),
        DeliveryOutcome::Busy => anyhow::bail!("another delivery is in progress"),
        DeliveryOutcome::NotMounted => anyhow::bail!("ticket card is not mounted"),
    }
}

fn write_jpeg(out: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(out, bytes).with_context(|| format!("write jpeg '{}'", out.display()))?;
    eprintln!("wrote {}", out.display());
    Ok(())
}
