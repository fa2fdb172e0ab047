//! Private Lending CLI
//!
//! Command-line interface for submitting proofs to a local lending ledger.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};

use private_lending::core::config::LendingConfig;
use private_lending::core::ledger::LoanLedger;
use private_lending::core::loan::{LoanRecord, LoanStatus};
use private_lending::protocol::state_machine::LendingStateMachine;
use private_lending::storage::backend::StorageBackend;
use private_lending::utils::crypto::Address;
use private_lending::zkp::groth16::Groth16Verifier;
use private_lending::zkp::proof::Groth16Proof;
use private_lending::zkp::schema::{self, DecodedFields, ProofKind};

/// Private Lending CLI - loans gated by zero-knowledge proofs
#[derive(Parser)]
#[command(name = "private-lending")]
#[command(author = "Private Lending Team")]
#[command(version = private_lending::VERSION)]
#[command(about = "Command-line interface for the private lending ledger", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to data directory
    #[arg(short, long, env = "PRIVATE_LENDING_DATA_DIR", default_value = "~/.private-lending")]
    data_dir: PathBuf,

    /// Path to a config file (defaults to <data-dir>/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Block height stamped on emitted events
    #[arg(long, default_value_t = 0)]
    block_height: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a data directory and default configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,

        /// Verifying key for collateral proofs
        #[arg(long)]
        collateral_vk: Option<PathBuf>,

        /// Verifying key for interest/liquidation proofs
        #[arg(long)]
        interest_vk: Option<PathBuf>,
    },

    /// Open a loan with a collateral proof
    RequestLoan {
        /// Borrower address (0x-prefixed hex)
        #[arg(short, long)]
        borrower: String,

        /// Proof JSON file
        #[arg(short, long)]
        proof: PathBuf,
    },

    /// Update interest and liquidation state with an interest proof
    CalculateInterest {
        /// Borrower address (0x-prefixed hex)
        #[arg(short, long)]
        borrower: String,

        /// Proof JSON file
        #[arg(short, long)]
        proof: PathBuf,
    },

    /// Show a borrower's loan record
    Loan {
        /// Borrower address (0x-prefixed hex)
        #[arg(short, long)]
        borrower: String,
    },

    /// List every stored loan
    List,

    /// Decode a proof's public inputs without verifying it
    Decode {
        /// Proof kind (collateral | interest)
        #[arg(short, long)]
        kind: ProofKind,

        /// Proof JSON file
        #[arg(short, long)]
        proof: PathBuf,
    },

    /// Show the active configuration
    Config,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let term = Term::stdout();

    if let Err(e) = run_command(&cli, &term) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init {
            force,
            collateral_vk,
            interest_vk,
        } => cmd_init(cli, *force, collateral_vk.as_deref(), interest_vk.as_deref(), term),
        Commands::RequestLoan { borrower, proof } => cmd_request_loan(cli, borrower, proof, term),
        Commands::CalculateInterest { borrower, proof } => {
            cmd_calculate_interest(cli, borrower, proof, term)
        }
        Commands::Loan { borrower } => cmd_loan(cli, borrower, term),
        Commands::List => cmd_list(cli, term),
        Commands::Decode { kind, proof } => cmd_decode(*kind, proof, term),
        Commands::Config => cmd_config(cli, term),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMAND HANDLERS
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_init(
    cli: &Cli,
    force: bool,
    collateral_vk: Option<&Path>,
    interest_vk: Option<&Path>,
    term: &Term,
) -> anyhow::Result<()> {
    let _ = term.write_line(&format!(
        "{} Initializing private lending data directory...",
        style("→").cyan()
    ));

    let data_dir = expand_path(&cli.data_dir)?;
    let mut config = LendingConfig::with_data_dir(&data_dir);
    config.collateral_vk_path = collateral_vk.map(Path::to_path_buf);
    config.interest_vk_path = interest_vk.map(Path::to_path_buf);
    config.validate()?;

    let config_path = config.config_path();
    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::create_dir_all(config.ledger_dir())?;
    config.save(&config_path)?;

    let marker = serde_json::json!({
        "protocol": private_lending::PROTOCOL_NAME,
        "version": private_lending::VERSION,
        "created_at": chrono::Utc::now().to_rfc3339(),
    });
    std::fs::write(
        data_dir.join("meta.json"),
        serde_json::to_string_pretty(&marker)?,
    )?;

    let _ = term.write_line(&format!(
        "{} Configuration created at: {}",
        style("✓").green(),
        config_path.display()
    ));

    if config.collateral_vk_path.is_none() || config.interest_vk_path.is_none() {
        let _ = term.write_line(&format!(
            "{} Set collateral_vk_path and interest_vk_path before submitting proofs",
            style("ℹ").blue()
        ));
    }

    Ok(())
}

fn cmd_request_loan(cli: &Cli, borrower: &str, proof: &Path, term: &Term) -> anyhow::Result<()> {
    let borrower: Address = borrower.parse()?;
    let proof = Groth16Proof::from_file(proof)?;
    let mut machine = open_machine(cli)?;

    let _ = term.write_line(&format!(
        "{} Requesting loan for {}",
        style("→").cyan(),
        borrower.short()
    ));

    let spinner = create_spinner("Verifying collateral proof...");
    let outcome = machine.request_loan(&borrower, &proof);
    spinner.finish_and_clear();
    let result = outcome?;

    let _ = term.write_line(&format!(
        "{} Loan approved{}",
        style("✓").green(),
        if result.replaced_existing { " (previous loan replaced)" } else { "" }
    ));
    if cli.verbose {
        let _ = term.write_line(&format!("  Proof:      {}", result.proof_hash));
    }

    print_loan_info(&borrower, &result.record, term)?;
    finish_block(&mut machine, cli, term)
}

fn cmd_calculate_interest(
    cli: &Cli,
    borrower: &str,
    proof: &Path,
    term: &Term,
) -> anyhow::Result<()> {
    let borrower: Address = borrower.parse()?;
    let proof = Groth16Proof::from_file(proof)?;
    let mut machine = open_machine(cli)?;

    let _ = term.write_line(&format!(
        "{} Updating interest for {}",
        style("→").cyan(),
        borrower.short()
    ));

    let spinner = create_spinner("Verifying interest proof...");
    let outcome = machine.calculate_interest_and_check_liquidation(&borrower, &proof);
    spinner.finish_and_clear();
    let result = outcome?;

    if result.is_liquidatable {
        let _ = term.write_line(&format!(
            "{} Position is liquidatable",
            style("!").red().bold()
        ));
    } else {
        let _ = term.write_line(&format!("{} Interest recorded", style("✓").green()));
    }
    if cli.verbose {
        let _ = term.write_line(&format!("  Proof:      {}", result.proof_hash));
    }

    print_loan_info(&borrower, &result.record, term)?;
    finish_block(&mut machine, cli, term)
}

fn cmd_loan(cli: &Cli, borrower: &str, term: &Term) -> anyhow::Result<()> {
    let borrower: Address = borrower.parse()?;
    let config = load_config(cli)?;
    let ledger = LoanLedger::new(config.open_storage()?);

    if !ledger.contains(&borrower)? {
        let _ = term.write_line(&format!(
            "{} No loan recorded for {}",
            style("ℹ").blue(),
            borrower
        ));
    }

    let record = ledger.get(&borrower)?;
    print_loan_info(&borrower, &record, term)
}

fn cmd_list(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let ledger = LoanLedger::new(config.open_storage()?);
    let records = ledger.records()?;

    if records.is_empty() {
        let _ = term.write_line(&format!("{} No loans recorded", style("ℹ").blue()));
        return Ok(());
    }

    let _ = term.write_line(&format!("\n{}", style("Loans").bold().underlined()));
    for (borrower, record) in &records {
        let _ = term.write_line(&format!(
            "  {}  {}  loan {}  collateral {}  interest {}",
            borrower,
            status_label(record.status()),
            style(record.loan_amount).green(),
            style(record.collateral_amount).yellow(),
            style(record.accrued_interest).cyan()
        ));
    }
    let _ = term.write_line(&format!("\n  Total: {}", records.len()));

    Ok(())
}

fn cmd_decode(kind: ProofKind, proof: &Path, term: &Term) -> anyhow::Result<()> {
    let proof = Groth16Proof::from_file(proof)?;
    let slots = kind.schema().describe(&proof.input)?;

    let _ = term.write_line(&format!(
        "\n{}",
        style(format!("{} public inputs", kind)).bold().underlined()
    ));
    for (slot, value) in slots {
        let marker = if slot.surfaced { style("*").green() } else { style(" ").dim() };
        let _ = term.write_line(&format!(
            "  {} [{}] {:<24} {}",
            marker, slot.position, slot.name, value
        ));
    }

    match schema::decode(kind, &proof.input)? {
        DecodedFields::Collateral(fields) => {
            let _ = term.write_line(&format!(
                "\n  Loan:       {}\n  Collateral: {}",
                style(fields.loan_amount).green(),
                style(fields.collateral_amount).yellow()
            ));
        }
        DecodedFields::InterestLiquidation(fields) => {
            let _ = term.write_line(&format!(
                "\n  Interest:   {}\n  Liquidatable: {}",
                style(fields.accrued_interest).cyan(),
                fields.is_liquidatable
            ));
        }
    }

    Ok(())
}

fn cmd_config(cli: &Cli, term: &Term) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let display = |path: &Option<PathBuf>| {
        path.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not set)".to_string())
    };

    let _ = term.write_line(&format!("\n{}", style("Configuration").bold().underlined()));
    let _ = term.write_line(&format!("  Data dir:       {}", config.data_dir.display()));
    let _ = term.write_line(&format!("  Storage:        {}", config.storage_format));
    let _ = term.write_line(&format!("  Collateral VK:  {}", display(&config.collateral_vk_path)));
    let _ = term.write_line(&format!("  Interest VK:    {}", display(&config.interest_vk_path)));
    let _ = term.write_line(&format!("  Reapproval:     {}", config.reapproval_policy));
    let _ = term.write_line(&format!("  Require loan:   {}", config.require_approved_loan));

    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPER FUNCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn expand_path(path: &Path) -> anyhow::Result<PathBuf> {
    let path_str = path.to_string_lossy();
    if path_str.starts_with('~') {
        let home = std::env::var("HOME")?;
        Ok(PathBuf::from(path_str.replacen('~', &home, 1)))
    } else {
        Ok(path.to_path_buf())
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<LendingConfig> {
    let data_dir = expand_path(&cli.data_dir)?;
    let config_path = match &cli.config {
        Some(path) => expand_path(path)?,
        None => data_dir.join("config.json"),
    };

    let mut config = if config_path.exists() {
        LendingConfig::load(&config_path)?
    } else if cli.config.is_some() {
        anyhow::bail!("Config file not found: {}", config_path.display())
    } else {
        LendingConfig::default()
    };
    config.data_dir = data_dir;

    let config = config.with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn load_verifier(path: Option<&Path>, kind: ProofKind) -> anyhow::Result<Groth16Verifier> {
    let path = path.ok_or_else(|| {
        anyhow::anyhow!("No verifying key configured for {} proofs", kind)
    })?;
    let verifier = Groth16Verifier::from_file(path)?.with_name(format!("groth16-{}", kind));

    let expected = kind.schema().arity;
    if verifier.num_public_inputs() != expected {
        anyhow::bail!(
            "Verifying key {} expects {} public inputs, {} proofs carry {}",
            path.display(),
            verifier.num_public_inputs(),
            kind,
            expected
        );
    }

    Ok(verifier)
}

fn open_machine(cli: &Cli) -> anyhow::Result<LendingStateMachine<Box<dyn StorageBackend>>> {
    let config = load_config(cli)?;
    let collateral = load_verifier(config.collateral_vk_path.as_deref(), ProofKind::Collateral)?;
    let interest = load_verifier(
        config.interest_vk_path.as_deref(),
        ProofKind::InterestLiquidation,
    )?;

    let storage = config.open_storage()?;
    let mut machine = LendingStateMachine::new(storage, collateral, interest, config);

    let timestamp = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
    machine.begin_block(cli.block_height, timestamp);
    Ok(machine)
}

fn finish_block(
    machine: &mut LendingStateMachine<Box<dyn StorageBackend>>,
    cli: &Cli,
    term: &Term,
) -> anyhow::Result<()> {
    let events = machine.end_block()?;
    if cli.verbose {
        for event in events.events() {
            let _ = term.write_line(&format!(
                "{} {} (block {}, hash {})",
                style("ℹ").blue(),
                event,
                event.block_height(),
                event.hash()
            ));
        }
    }
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let spinner_style = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(spinner_style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

fn status_label(status: LoanStatus) -> console::StyledObject<&'static str> {
    match status {
        LoanStatus::Uninitialized => style("Uninitialized").dim(),
        LoanStatus::Approved => style("Approved").green(),
        LoanStatus::Liquidatable => style("Liquidatable").red().bold(),
    }
}

fn print_loan_info(borrower: &Address, record: &LoanRecord, term: &Term) -> anyhow::Result<()> {
    let _ = term.write_line(&format!("\n{}", style("Loan Details").bold().underlined()));
    let _ = term.write_line(&format!("  Borrower:   {}", borrower));
    let _ = term.write_line(&format!("  Status:     {}", status_label(record.status())));
    let _ = term.write_line(&format!("  Loan:       {}", style(record.loan_amount).green()));
    let _ = term.write_line(&format!(
        "  Collateral: {}",
        style(record.collateral_amount).yellow()
    ));
    let _ = term.write_line(&format!("  Interest:   {}", style(record.accrued_interest).cyan()));
    let _ = term.write_line(&format!("  Approved:   {}", record.is_loan_approved));
    let _ = term.write_line(&format!("  Liquidatable: {}", record.is_liquidatable));

    Ok(())
}
