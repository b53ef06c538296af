//! Switchboard CLI - Command-line interface for the profile engine
//!
//! Provides `switchboard list`, `switchboard activate`, and the other profile
//! commands. All state handling lives in `switchboard-core`; this binary only
//! parses arguments and formats results, masking credentials on the way out.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use switchboard_core::{ActivationEngine, MergeSelection, ProfileRecord, ToolFamily};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(about = "Switchboard - credential profile switcher for AI coding CLIs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a profile
    Add {
        /// Profile name
        name: String,
        /// Tool family (claude, codex, gemini)
        #[arg(short, long)]
        family: ToolFamily,
        /// Credential pushed to the tool's configuration surface
        #[arg(short, long)]
        secret: String,
        /// Service address override (omit to use the tool default)
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Update a profile's name, secret, or endpoint
    Update {
        /// Profile id
        id: Uuid,
        /// New profile name
        #[arg(short, long)]
        name: Option<String>,
        /// New credential
        #[arg(short, long)]
        secret: Option<String>,
        /// New service address override (pass an empty string to clear it)
        #[arg(short, long)]
        endpoint: Option<String>,
    },
    /// Delete a profile, clearing its surface when it is active
    Delete {
        /// Profile id
        id: Uuid,
    },
    /// Make a profile the live one for its tool family
    Activate {
        /// Profile id
        id: Uuid,
    },
    /// Regenerate the merged router config from explicit profile choices
    Merge {
        /// Claude profile id
        #[arg(long)]
        claude: Option<Uuid>,
        /// Codex profile id
        #[arg(long)]
        codex: Option<Uuid>,
        /// Gemini profile id
        #[arg(long)]
        gemini: Option<Uuid>,
    },
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(command: Commands) -> Result<()> {
    let engine =
        ActivationEngine::with_user_surfaces().context("Failed to open the profile store")?;

    match command {
        Commands::List { json } => {
            let profiles = engine.list_profiles();
            if json {
                print_profiles_json(&profiles)?;
            } else {
                print_profiles(&profiles);
            }
        }
        Commands::Add {
            name,
            family,
            secret,
            endpoint,
        } => {
            let record = engine.add_profile(&name, family, secret, endpoint)?;
            println!("Added profile {} ({})", record.id, record.name);
        }
        Commands::Update {
            id,
            name,
            secret,
            endpoint,
        } => {
            let current = engine
                .list_profiles()
                .into_iter()
                .find(|r| r.id == id)
                .with_context(|| format!("Profile not found: {id}"))?;

            let name = name.unwrap_or(current.name);
            let secret = secret.unwrap_or(current.secret);
            let endpoint = endpoint.or(current.endpoint);

            let record = engine.update_profile(id, &name, secret, endpoint)?;
            println!("Updated profile {} ({})", record.id, record.name);
        }
        Commands::Delete { id } => {
            engine.delete_profile(id)?;
            println!("Deleted profile {id}");
        }
        Commands::Activate { id } => {
            let record = engine.activate_profile(id)?;
            println!("Activated '{}' for {}", record.name, record.family);
        }
        Commands::Merge {
            claude,
            codex,
            gemini,
        } => {
            let mut selection = MergeSelection::new();
            selection.insert(ToolFamily::Claude, claude);
            selection.insert(ToolFamily::Codex, codex);
            selection.insert(ToolFamily::Gemini, gemini);
            engine.apply_merged_config(&selection)?;
            println!("Wrote merged router config");
        }
    }

    Ok(())
}

fn print_profiles(profiles: &[ProfileRecord]) {
    if profiles.is_empty() {
        println!("No profiles found.");
        return;
    }

    println!("Profiles:");
    for p in profiles {
        let marker = if p.active { "*" } else { " " };
        let endpoint = p.endpoint.as_deref().unwrap_or("default endpoint");
        println!(
            "  {} {} {:<6} {} [{}] ({})",
            marker,
            p.id,
            p.family,
            p.name,
            mask_secret(&p.secret),
            endpoint
        );
    }
}

fn print_profiles_json(profiles: &[ProfileRecord]) -> Result<()> {
    let rows: Vec<_> = profiles
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "name": p.name,
                "family": p.family,
                "secret": mask_secret(&p.secret),
                "endpoint": p.endpoint,
                "active": p.active,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

/// Never print a credential in full
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

#[cfg(test)]
mod tests {
    use super::mask_secret;

    #[test]
    fn test_mask_secret_hides_short_values_entirely() {
        assert_eq!(mask_secret("abc"), "****");
        assert_eq!(mask_secret("12345678"), "****");
    }

    #[test]
    fn test_mask_secret_keeps_edges_of_long_values() {
        assert_eq!(mask_secret("sk-ant-0123456789"), "sk-a****6789");
    }

    #[test]
    fn test_mask_secret_never_echoes_middle() {
        let masked = mask_secret("sk-ant-REDACTED");
        assert!(!masked.contains("supersecret"));
    }
}
