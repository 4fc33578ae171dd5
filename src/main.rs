use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use signoff_api::{ChecklistSource, HttpBackend, MasterData};
use signoff_config::ClientConfig;
use signoff_orchestrator::Orchestrator;
use signoff_sla::SlaField;
use signoff_workflow::Actor;

/// Signoff - multi-step approval of maintenance and scrap requests
#[derive(Parser)]
#[command(name = "signoff")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the config file (default: ~/.signoff/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Base URL of the approval backend, overriding the config file
  #[arg(long, env = "SIGNOFF_API_URL", global = true)]
  api_url: Option<String>,

  /// Bearer token for the approval backend
  #[arg(long, env = "SIGNOFF_API_TOKEN", hide_env_values = true, global = true)]
  api_token: Option<String>,

  /// Log at debug level
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Show a request with its steps and overall status
  Status { header_id: String },

  /// List the steps you may decide on
  Actionable { header_id: String },

  /// Approve a current step
  Approve {
    header_id: String,
    #[arg(long)]
    step: String,
    #[arg(long)]
    note: String,
  },

  /// Reject a current step, terminating the request
  Reject {
    header_id: String,
    #[arg(long)]
    step: String,
    #[arg(long)]
    reason: String,
  },

  /// Edit an SLA record and save it
  Sla {
    header_id: String,
    #[arg(long = "sla")]
    sla_id: String,
    #[arg(long)]
    value: Option<String>,
    #[arg(long)]
    technician_name: Option<String>,
    #[arg(long)]
    technician_phone: Option<String>,
    /// Shared rating for the request, 1 to 5
    #[arg(long)]
    rating: Option<u8>,
  },

  /// Show the checklist of an asset type
  Checklist { asset_type_id: String },

  /// List active vendors of an asset type
  Vendors { asset_type_id: String },

  /// List technicians of a vendor
  Technicians { vendor_id: String },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose { "debug" } else { "info" };
  tracing_subscriber::registry()
    .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
    .with(
      tracing_subscriber::fmt::layer()
        .without_time()
        .with_writer(std::io::stderr),
    )
    .init();

  let Some(command) = cli.command else {
    println!("signoff - use --help to see available commands");
    return Ok(());
  };

  let config = load_config(cli.config, cli.api_url, cli.api_token)?;
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(run(command, config))
}

fn load_config(
  path: Option<PathBuf>,
  api_url: Option<String>,
  api_token: Option<String>,
) -> Result<ClientConfig> {
  let path = match path {
    Some(path) => path,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".signoff")
      .join("config.json"),
  };

  let mut config = ClientConfig::from_file(&path)
    .with_context(|| format!("failed to load config: {}", path.display()))?;
  if let Some(api_url) = api_url {
    config.api.base_url = api_url;
  }
  if let Some(api_token) = api_token {
    config.api.token = Some(api_token);
  }

  debug!(path = %path.display(), base_url = %config.api.base_url, "config loaded");
  Ok(config)
}

async fn run(command: Commands, config: ClientConfig) -> Result<()> {
  let backend = Arc::new(HttpBackend::new(&config.api).context("failed to create API client")?);
  let actor = Actor::from(config.actor.clone());
  let engine = config.engine.clone();

  match command {
    Commands::Status { header_id } => {
      let orchestrator = Orchestrator::load(backend, engine, &header_id)
        .await
        .with_context(|| format!("failed to load request {}", header_id))?;
      let snapshot = orchestrator.snapshot();
      print_json(&serde_json::json!({
        "status": snapshot.status(),
        "request": snapshot.to_record(),
      }))
    }

    Commands::Actionable { header_id } => {
      let orchestrator = Orchestrator::load(backend, engine, &header_id)
        .await
        .with_context(|| format!("failed to load request {}", header_id))?;
      let steps: Vec<_> = orchestrator
        .actionable_steps(&actor)
        .iter()
        .map(signoff_config::StepDef::from)
        .collect();
      print_json(&steps)
    }

    Commands::Approve {
      header_id,
      step,
      note,
    } => {
      let orchestrator = Orchestrator::load(backend, engine, &header_id)
        .await
        .with_context(|| format!("failed to load request {}", header_id))?;
      let transition = orchestrator
        .approve(&step, &actor, &note)
        .await
        .with_context(|| format!("failed to approve step {}", step))?;
      print_json(&transition)
    }

    Commands::Reject {
      header_id,
      step,
      reason,
    } => {
      let orchestrator = Orchestrator::load(backend, engine, &header_id)
        .await
        .with_context(|| format!("failed to load request {}", header_id))?;
      let transition = orchestrator
        .reject(&step, &actor, &reason)
        .await
        .with_context(|| format!("failed to reject step {}", step))?;
      print_json(&transition)
    }

    Commands::Sla {
      header_id,
      sla_id,
      value,
      technician_name,
      technician_phone,
      rating,
    } => {
      let orchestrator = Orchestrator::load(backend, engine, &header_id)
        .await
        .with_context(|| format!("failed to load request {}", header_id))?;
      if !orchestrator.has_sla() {
        bail!("request {} has no vendor and no SLA records", header_id);
      }

      let edits = [
        (SlaField::Value, value),
        (SlaField::TechnicianName, technician_name),
        (SlaField::TechnicianPhone, technician_phone),
      ];
      for (field, value) in edits {
        if let Some(value) = value {
          orchestrator.set_sla_field(&sla_id, field, &value)?;
        }
      }
      if rating.is_some() {
        orchestrator.set_rating(rating)?;
      }

      let committed = orchestrator
        .flush()
        .await
        .context("failed to save SLA records")?;
      orchestrator.shutdown();

      if !orchestrator.is_sla_complete(&sla_id)? {
        eprintln!("SLA {} is incomplete and was not saved", sla_id);
      }
      print_json(&serde_json::json!({
        "committed": committed,
        "rating": orchestrator.sla_rating()?,
        "records": orchestrator.sla_records()?,
      }))
    }

    Commands::Checklist { asset_type_id } => {
      let items = backend
        .checklist(&asset_type_id)
        .await
        .with_context(|| format!("failed to fetch checklist for {}", asset_type_id))?;
      print_json(&items)
    }

    Commands::Vendors { asset_type_id } => {
      let vendors = backend
        .active_vendors(&asset_type_id)
        .await
        .with_context(|| format!("failed to fetch vendors for {}", asset_type_id))?;
      print_json(&vendors)
    }

    Commands::Technicians { vendor_id } => {
      let technicians = backend
        .technicians(&vendor_id)
        .await
        .with_context(|| format!("failed to fetch technicians for {}", vendor_id))?;
      print_json(&technicians)
    }
  }
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
