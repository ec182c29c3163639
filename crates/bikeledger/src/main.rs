//! `bikeledger` - CLI for the garage delivery ledger
//!
//! This binary provides the command-line interface for logging in, capturing
//! deliveries, finding them again and printing their invoices.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use bikeledger::auth::{authenticator_from_config, AuthGate, Credentials, Session};
use bikeledger::cli::{
    output, Cli, Command, ConfigCommand, DashboardCommand, DeliverCommand, InvoiceCommand,
    ListCommand, LoginCommand, NotifyCommand, SearchCommand,
};
use bikeledger::config::AuthStrategyKind;
use bikeledger::notify::{notifier_from_config, Notification, Notifier};
use bikeledger::search::{self, DashboardSummary};
use bikeledger::{
    init_logging, invoice, Config, DeliveryForm, InvoiceOptions, RecordStore, Storage,
};

// Platform-specific imports using conditional compilation
#[cfg(target_os = "linux")]
use bikeledger_linux as platform;

#[cfg(target_os = "macos")]
use bikeledger_mac as platform;

/// Everything a command that touches records needs.
struct App {
    config: Config,
    storage: Arc<Storage>,
    store: RecordStore<Arc<Storage>>,
    gate: AuthGate,
    notifier: Arc<dyn Notifier>,
}

impl App {
    fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(
            Storage::open(config.database_path()).context("failed to open the record database")?,
        );
        let notifier = notifier_from_config(&config)?;
        let authenticator = authenticator_from_config(&config, notifier.clone())?;
        Ok(Self {
            store: RecordStore::new(storage.clone()),
            gate: AuthGate::new(authenticator, storage.clone()),
            storage,
            notifier,
            config,
        })
    }

    /// The remembered session, or an error telling the operator to log in.
    fn require_session(&self) -> Result<Session> {
        match self.gate.current_session() {
            Some(session) => Ok(session),
            None => bail!("not logged in; run `bikeledger login` first"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let Cli {
        config: config_path,
        command,
        ..
    } = cli;

    // Config commands must work even when the file on disk is invalid
    let command = match command {
        Command::Config(config_cmd) => return handle_config(config_path, config_cmd),
        command => command,
    };

    let config = Config::load_from(config_path).context("failed to load configuration")?;
    let app = App::open(config)?;

    match command {
        Command::Login(cmd) => handle_login(&app, cmd).await,
        Command::Logout => handle_logout(&app),
        Command::Status(cmd) => handle_status(&app, cmd.json),
        Command::Deliver(cmd) => handle_deliver(&app, *cmd).await,
        Command::List(cmd) => handle_list(&app, &cmd).await,
        Command::Search(cmd) => handle_search(&app, &cmd).await,
        Command::Invoice(cmd) => handle_invoice(&app, cmd).await,
        Command::Dashboard(cmd) => handle_dashboard(&app, &cmd).await,
        Command::Notify(cmd) => handle_notify(&app, cmd).await,
        Command::Config(_) => unreachable!("config commands return before the app is opened"),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn handle_login(app: &App, cmd: LoginCommand) -> Result<()> {
    let credentials = match app.config.auth.strategy {
        AuthStrategyKind::Static => {
            let username = match cmd.username {
                Some(username) => username,
                None => app.config.auth.username.clone(),
            };
            let password = match cmd.password {
                Some(password) => password,
                None => prompt("Password")?,
            };
            Credentials::Password { username, password }
        }
        strategy @ (AuthStrategyKind::LocalOtp | AuthStrategyKind::DelegatedOtp) => {
            if cmd.code.is_some() && !strategy.accepts_earlier_codes() {
                bail!("--code only works with delegated_otp; {strategy} codes are requested and entered in one login");
            }
            let phone = match cmd.phone {
                Some(phone) => phone,
                None => prompt("Phone number")?,
            };
            let code = match cmd.code {
                Some(code) => code,
                None => {
                    app.gate
                        .request_code(&phone)
                        .await
                        .context("could not send a login code")?;
                    println!("A login code has been sent to {phone}.");
                    prompt("Code")?
                }
            };
            Credentials::PhoneCode { phone, code }
        }
    };

    let session = app.gate.authenticate(&credentials).await?;
    println!("Logged in as {} ({}).", session.principal, session.method);
    Ok(())
}

fn handle_logout(app: &App) -> Result<()> {
    if app.gate.current_session().is_none() {
        println!("No active session.");
        return Ok(());
    }
    app.gate.end_session()?;
    println!("Logged out.");
    Ok(())
}

fn handle_status(app: &App, json: bool) -> Result<()> {
    let session = app.gate.current_session();
    let stats = app.storage.stats()?;

    if json {
        let status = serde_json::json!({
            "platform": platform::platform_name(),
            "strategy": app.gate.strategy(),
            "session": session,
            "database_path": app.storage.path(),
            "total_records": stats.total_records,
            "oldest_record": stats.oldest_record,
            "newest_record": stats.newest_record,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("bikeledger status");
        println!("-----------------");
        println!("Platform:      {}", platform::platform_name());
        println!("Login method:  {}", app.gate.strategy());
        match &session {
            Some(s) => println!(
                "Session:       {} since {}",
                s.principal,
                s.started_at.format("%Y-%m-%d %H:%M")
            ),
            None => println!("Session:       not logged in"),
        }
        println!("Database:      {}", app.storage.path().display());
        println!("Records:       {}", stats.total_records);
        if let Some(newest) = stats.newest_record {
            println!("Last record:   {}", newest.format("%Y-%m-%d %H:%M"));
        }
        println!("Size:          {} KiB", stats.db_size_bytes / 1024);
    }
    Ok(())
}

fn build_form(cmd: &DeliverCommand) -> Result<DeliveryForm> {
    let mut form = DeliveryForm::new()
        .bike_number(cmd.bike_number.as_str())
        .chassis_number(cmd.chassis_number.as_str())
        .bike_model(cmd.bike_model.as_str())
        .bike_details(cmd.bike_details.as_str())
        .registration_date(cmd.registration_date)
        .buyer_name(cmd.buyer_name.as_str())
        .buyer_mobile(cmd.buyer_mobile.as_str())
        .buyer_address(cmd.buyer_address.as_str())
        .sell_amount(cmd.amount);

    if let Some(date) = cmd.sale_date {
        form = form.sale_date(date);
    }
    if let Some(photo) = &cmd.photo {
        form = form
            .buyer_photo_from(photo)
            .with_context(|| format!("failed to load buyer photo {}", photo.display()))?;
    }
    if let Some(signature) = &cmd.signature {
        form = form
            .signature_from(signature)
            .with_context(|| format!("failed to load signature {}", signature.display()))?;
    }
    for spec in &cmd.documents {
        form = form.document_spec(spec)?;
    }
    Ok(form)
}

fn open_invoice(path: &Path) -> Result<()> {
    platform::init().map_err(|e| anyhow::anyhow!("platform init failed: {e}"))?;
    platform::open_document(path)
        .with_context(|| format!("failed to open {}", path.display()))
}

async fn handle_deliver(app: &App, cmd: DeliverCommand) -> Result<()> {
    let session = app.require_session()?;
    let form = build_form(&cmd)?;


    let record = form.submit(&app.store, Some(&session)).await?;
    println!(
        "Saved delivery of {} to {} ({}).",
        record.details.bike_number, record.details.buyer_name, record.short_id()
    );

    if cmd.no_invoice {
        return Ok(());
    }
    let document = invoice::render(Some(&record), &InvoiceOptions::from_config(&app.config))?;
    let path = document.write_to(app.config.invoice_dir())?;
    println!("Invoice: {}", path.display());
    if cmd.open {
        open_invoice(&path)?;
    }
    Ok(())
}

async fn handle_list(app: &App, cmd: &ListCommand) -> Result<()> {
    let session = app.gate.current_session();
    if session.is_none() {
        eprintln!("Not logged in; no records to show.");
    }
    let records = app.store.list_for_session(session.as_ref()).await?;

    let mut shown = match &cmd.date {
        Some(prefix) => search::filter_by_date(&records, prefix),
        None => records.iter().collect(),
    };
    if let Some(limit) = cmd.limit {
        shown.truncate(limit);
    }

    if shown.is_empty() && cmd.format != bikeledger::cli::OutputFormat::Json {
        println!("No deliveries found.");
        return Ok(());
    }
    print!("{}", output::format_records(&shown, cmd.format)?);
    Ok(())
}

async fn handle_search(app: &App, cmd: &SearchCommand) -> Result<()> {
    let session = app.require_session()?;
    let records = app.store.list_for_session(Some(&session)).await?;

    match search::find_by_bike_number(&records, &cmd.bike_number) {
        Some(record) => {
            print!(
                "{}",
                output::format_record(record, cmd.format, search::today())?
            );
            Ok(())
        }
        None => bail!("no delivery found for bike {}", cmd.bike_number.trim()),
    }
}

async fn handle_invoice(app: &App, cmd: InvoiceCommand) -> Result<()> {
    let session = app.require_session()?;
    let records = app.store.list_for_session(Some(&session)).await?;
    let record = search::find_by_bike_number(&records, &cmd.bike_number);
    if record.is_none() {
        warn!("No delivery found for bike {}", cmd.bike_number.trim());
    }

    let document = invoice::render(record, &InvoiceOptions::from_config(&app.config))?;
    let dir: PathBuf = cmd.output.unwrap_or_else(|| app.config.invoice_dir());
    let path = document.write_to(dir)?;
    println!("{}", path.display());
    if cmd.open {
        open_invoice(&path)?;
    }
    Ok(())
}

async fn handle_dashboard(app: &App, cmd: &DashboardCommand) -> Result<()> {
    let session = app.require_session()?;
    let records = app.store.list_for_session(Some(&session)).await?;
    let prefix = cmd.date.as_deref().unwrap_or_default();

    let summary = DashboardSummary::compute(&records, prefix, search::today());
    print!("{}", output::format_summary(&summary, prefix, cmd.json)?);
    Ok(())
}

async fn handle_notify(app: &App, cmd: NotifyCommand) -> Result<()> {
    app.require_session()?;
    let notification = Notification::DocumentReady {
        phone: cmd.phone,
        bike_number: cmd.bike_number,
    };
    info!("Notifying {} via {}", notification.phone(), app.notifier.name());

    if app.notifier.send(&notification).await {
        println!("Sent: {}", notification.message());
        Ok(())
    } else {
        bail!("notification to {} could not be delivered", notification.phone())
    }
}

fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.auth.password.is_some() {
        shown.auth.password = Some("********".to_string());
    }
    if shown.auth.provider_api_key.is_some() {
        shown.auth.provider_api_key = Some("********".to_string());
    }
    shown
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("failed to load configuration")?;
            let config = redacted(&config);
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Auth]");
                println!("  Strategy:           {:?}", config.auth.strategy);
                println!("  Username:           {}", config.auth.username);
                println!(
                    "  Password set:       {}",
                    config.auth.password.is_some()
                );
                println!("  Country code:       {}", config.auth.country_code);
                println!("  Code lifetime (s):  {}", config.auth.code_ttl_secs);
                if let Some(url) = &config.auth.provider_url {
                    println!("  Provider URL:       {url}");
                }
                println!();
                println!("[Notify]");
                println!(
                    "  Webhook:            {}",
                    config.notify.webhook_url.as_deref().unwrap_or("(log only)")
                );
                println!();
                println!("[Invoice]");
                println!("  Business name:      {}", config.invoice.business_name);
                println!("  Output directory:   {}", config.invoice_dir().display());
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.or(config_path).unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}
