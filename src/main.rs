mod config;
mod dialog;
mod prompt;
mod protocol;
mod session;
mod transcript;
mod tui;

use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use config::{ConfigFile, ResolvedConfig};

#[derive(Parser, Debug)]
#[command(
    name = "studicheck",
    about = "Terminal client for a multi-step admissions-advisory decision backend",
    long_about = None,
)]
struct Args {
    /// Profile to use from config file
    #[arg(short, long, env = "STUDICHECK_PROFILE")]
    profile: Option<String>,

    /// Override backend base URL
    #[arg(short, long, env = "STUDICHECK_BACKEND")]
    backend: Option<String>,

    /// Override the application URL shown when the apply action unlocks
    #[arg(long, env = "STUDICHECK_APPLY_URL")]
    apply_url: Option<String>,

    /// Show timestamps on messages
    #[arg(long)]
    timestamps: bool,

    /// Send one start exchange, print the backend's first reply, and exit
    /// (backend reachability check — no TUI)
    #[arg(long)]
    probe: bool,

    /// Write a default config file to ~/.config/studicheck/config.toml and exit
    #[arg(long)]
    init: bool,

    /// List available profiles and exit
    #[arg(long)]
    profiles: bool,

    /// Generate shell completions and print to stdout (bash, zsh, fish, elvish)
    #[arg(long, value_name = "SHELL")]
    completions: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── --init ────────────────────────────────────────────────────────────────
    if args.init {
        let path = ConfigFile::write_default_if_missing()?;
        println!("Config written to: {}", path.display());
        println!("Edit it, then run: studicheck");
        return Ok(());
    }

    // ── --completions ─────────────────────────────────────────────────────────
    if let Some(shell_name) = &args.completions {
        return generate_completions(shell_name);
    }

    let file = ConfigFile::load()?;

    // ── --profiles ────────────────────────────────────────────────────────────
    if args.profiles {
        print_profiles(&file);
        return Ok(());
    }

    let resolved = ResolvedConfig::resolve(
        &file,
        args.profile.as_deref(),
        args.backend.as_deref(),
        args.apply_url.as_deref(),
    )?;

    // ── --probe (non-TUI) ─────────────────────────────────────────────────────
    if args.probe {
        return run_probe(resolved).await;
    }

    // ── Interactive TUI mode ──────────────────────────────────────────────────
    tui::run(resolved, args.timestamps).await
}

// ── Probe mode (plain stdout, no TUI) ─────────────────────────────────────────

/// One start exchange against the configured backend: proves the endpoint is
/// reachable and speaking the protocol before anyone sits down in the TUI.
async fn run_probe(resolved: ResolvedConfig) -> Result<()> {
    use protocol::{BackendClient, BackendReply};

    println!();
    println!(
        "  ▲ studicheck probe  {}  ·  {}",
        resolved.profile_name, resolved.backend_url
    );
    println!();

    let client = BackendClient::new(
        resolved.backend_url.clone(),
        Duration::from_secs(resolved.timeout_secs),
    )?;
    let session = session::Session::new();

    match client.send(&resolved.start_message, &session.id).await {
        Ok(BackendReply::Message {
            text,
            options,
            progress,
        }) => {
            println!("  ✓ backend replied");
            println!("    text      {text}");
            if !options.is_empty() {
                println!("    options   {}", options.join(" | "));
            }
            if let Some(p) = progress {
                println!("    progress  {p}%");
            }
        }
        Ok(BackendReply::Decision {
            decision,
            rationale,
        }) => {
            println!("  ✓ backend replied with an immediate decision");
            println!("    decision  {decision}");
            if let Some(r) = rationale {
                println!("    rationale {r}");
            }
        }
        Ok(BackendReply::Unrecognized) => {
            println!("  ⚠ backend replied, but with no renderable field");
        }
        Err(e) => {
            eprintln!("  ✗ {e}");
            std::process::exit(1);
        }
    }
    Ok(())
}

// ── Profiles listing (non-TUI) ────────────────────────────────────────────────

fn print_profiles(file: &ConfigFile) {
    let mut entries: Vec<(String, String, u64)> = file
        .profiles
        .iter()
        .map(|(name, p)| {
            (
                name.clone(),
                p.backend_url.clone().unwrap_or_else(|| "(unset)".into()),
                p.timeout_secs,
            )
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    println!();
    println!("  Profiles");
    for (name, backend, timeout) in &entries {
        let marker = if *name == file.default_profile { " ←" } else { "" };
        println!("  {name}{marker}");
        println!("    backend  {backend}");
        println!("    timeout  {timeout}s");
        println!();
    }
}

// ── Shell completions ─────────────────────────────────────────────────────────

fn generate_completions(shell_name: &str) -> Result<()> {
    use clap_complete::{Shell, generate};

    let shell: Shell = match shell_name.to_lowercase().as_str() {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "elvish" => Shell::Elvish,
        _ => {
            eprintln!("Unknown shell: {shell_name}");
            eprintln!("Supported: bash, zsh, fish, elvish");
            std::process::exit(1);
        }
    };

    let mut cmd = Args::command();
    generate(shell, &mut cmd, "studicheck", &mut std::io::stdout());
    Ok(())
}
