//! ClassDesk CLI — 作业反馈、统计数据与实时事件的命令行工具
//!
//! Usage:
//!   classdesk-cli login <email>                     Log in (password from CLASSDESK_PASSWORD)
//!   classdesk-cli me                                Show the current profile
//!   classdesk-cli feedback [--page <n>]             List feedback
//!   classdesk-cli submit <text> [--rating <1-5>]    Submit feedback
//!   classdesk-cli analytics [--range <7d|30d|semester>]
//!   classdesk-cli export <path> [--page <n>]        Export a feedback page (.txt/.csv/.json)
//!   classdesk-cli listen [--event <name>]...        Print realtime events until Ctrl-C

use anyhow::{anyhow, bail, Context};
use classdesk_client::export::{export_to, ExportFormat};
use classdesk_client::services::{
    AnalyticsService, Credentials, FeedbackService, NewFeedback, ProfileService, TrendRange,
};
use classdesk_client::{ApiClient, ClientConfig, ConnectionState, CredentialStore, KeyringStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const KEYRING_SERVICE: &str = "classdesk";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let result = match args[1].as_str() {
        "login" => cmd_login(&args[2..]).await,
        "logout" => cmd_logout().await,
        "me" => cmd_me().await,
        "feedback" => cmd_feedback(&args[2..]).await,
        "submit" => cmd_submit(&args[2..]).await,
        "analytics" => cmd_analytics(&args[2..]).await,
        "export" => cmd_export(&args[2..]).await,
        "listen" => cmd_listen(&args[2..]).await,
        "version" | "--version" | "-V" => {
            println!("classdesk-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn print_usage() {
    println!(
        r#"classdesk-cli — ClassDesk 命令行工具

USAGE:
    classdesk-cli <COMMAND> [OPTIONS]

COMMANDS:
    login <email>                       Log in; password is read from CLASSDESK_PASSWORD
    logout                              Forget the stored token
    me                                  Show the current profile
    feedback [--page <n>]               List a page of feedback
    submit <text> [--rating <1-5>] [--assignment <id>]
                                        Submit feedback
    analytics [--range <7d|30d|semester>]
                                        Show the overview and a trend series
    export <path> [--page <n>]          Export a feedback page; format from the extension
    listen [--event <name>]...          Print realtime events until Ctrl-C
    version                             Show version information
    help                                Show this help message

ENVIRONMENT:
    CLASSDESK_API_URL                   REST base URL
    CLASSDESK_WS_URL                    WebSocket URL
    CLASSDESK_CONFIG                    YAML config file (overrides the variables above)
    RUST_LOG                            Log filter, e.g. classdesk_client=debug"#
    );
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn flag_values<'a>(args: &'a [String], flag: &str) -> Vec<&'a str> {
    args.windows(2)
        .filter(|w| w[0] == flag)
        .map(|w| w[1].as_str())
        .collect()
}

/// Positional arguments, skipping flags and their values.
fn positionals(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn page_arg(args: &[String]) -> anyhow::Result<u32> {
    match flag_value(args, "--page") {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("--page expects a number, got '{raw}'")),
        None => Ok(1),
    }
}

fn client() -> anyhow::Result<ApiClient> {
    let config = match std::env::var("CLASSDESK_CONFIG") {
        Ok(path) => ClientConfig::from_yaml_file(&path)?,
        Err(_) => ClientConfig::from_env()?,
    };
    let store: Arc<dyn CredentialStore> = Arc::new(KeyringStore::new(KEYRING_SERVICE));
    Ok(ApiClient::builder()
        .config(config)
        .credential_store(store)
        .build()?)
}

async fn cmd_login(args: &[String]) -> anyhow::Result<()> {
    let email = positionals(args)
        .first()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("usage: classdesk-cli login <email>"))?;
    let password =
        std::env::var("CLASSDESK_PASSWORD").context("CLASSDESK_PASSWORD is not set")?;

    let client = client()?;
    let user = ProfileService::new(&client)
        .login(&Credentials { email, password })
        .await?;
    match user {
        Some(user) => println!("Logged in as {} <{}>", user.name, user.email),
        None => println!("Logged in"),
    }
    Ok(())
}

async fn cmd_logout() -> anyhow::Result<()> {
    ProfileService::new(&client()?).logout().await?;
    println!("Logged out");
    Ok(())
}

async fn cmd_me() -> anyhow::Result<()> {
    let profile = ProfileService::new(&client()?).me().await?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

async fn cmd_feedback(args: &[String]) -> anyhow::Result<()> {
    let page = FeedbackService::new(&client()?)
        .list(page_arg(args)?)
        .await?;
    match page.total {
        Some(total) => println!("Page {} ({} entries in total)", page.page, total),
        None => println!("Page {}", page.page),
    }
    for item in &page.items {
        let rating = item
            .rating
            .map(|r| format!(" [{r}/5]"))
            .unwrap_or_default();
        println!(
            "  #{:<6} {}{}",
            item.id,
            item.content.lines().next().unwrap_or(""),
            rating
        );
    }
    if page.items.is_empty() {
        println!("  (no feedback)");
    }
    Ok(())
}

async fn cmd_submit(args: &[String]) -> anyhow::Result<()> {
    let text = positionals(args).join(" ");
    if text.trim().is_empty() {
        bail!("usage: classdesk-cli submit <text> [--rating <1-5>] [--assignment <id>]");
    }
    let mut feedback = NewFeedback::new(text);
    if let Some(raw) = flag_value(args, "--rating") {
        feedback = feedback.rating(raw.parse().context("--rating expects 1-5")?);
    }
    if let Some(raw) = flag_value(args, "--assignment") {
        feedback = feedback.for_assignment(raw.parse().context("--assignment expects an id")?);
    }
    let created = FeedbackService::new(&client()?).submit(&feedback).await?;
    println!("Created feedback #{}", created.id);
    Ok(())
}

async fn cmd_analytics(args: &[String]) -> anyhow::Result<()> {
    let range: TrendRange = flag_value(args, "--range").unwrap_or("7d").parse()?;
    let service = AnalyticsService::new(&client()?);

    let overview = service.overview().await?;
    println!("Submissions : {}", overview.total_submissions);
    println!("Graded      : {}", overview.graded_submissions);
    println!("Students    : {}", overview.active_students);
    if let Some(avg) = overview.average_score {
        println!("Average     : {avg:.1}");
    }

    println!();
    println!("Trend ({range})");
    for point in service.trends(range).await? {
        println!("  {:<12} {:>8.2}", point.date, point.value);
    }
    Ok(())
}

async fn cmd_export(args: &[String]) -> anyhow::Result<()> {
    let path = positionals(args)
        .first()
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: classdesk-cli export <path> [--page <n>]"))?;
    let format = ExportFormat::from_path(&path)
        .ok_or_else(|| anyhow!("cannot tell the format of {}; use .txt, .csv or .json", path.display()))?;

    let page = FeedbackService::new(&client()?)
        .list(page_arg(args)?)
        .await?;
    let value = serde_json::to_value(&page.items)?;
    export_to(&path, &value, format).await?;
    println!("Wrote {} entries to {}", page.items.len(), path.display());
    Ok(())
}

async fn cmd_listen(args: &[String]) -> anyhow::Result<()> {
    let mut events = flag_values(args, "--event");
    if events.is_empty() {
        events = vec!["feedback.created", "feedback.updated", "analysis.completed"];
    }

    let socket = client()?.socket();
    let _state = socket.on_state_change(|state| match state {
        ConnectionState::Open => eprintln!("-- connected"),
        ConnectionState::Closed => eprintln!("-- disconnected"),
    });
    let _subs: Vec<_> = events
        .iter()
        .map(|event| {
            let name = event.to_string();
            socket.subscribe(*event, move |data| println!("{name}: {data}"))
        })
        .collect();

    socket.connect()?;
    tokio::signal::ctrl_c().await?;
    socket.disconnect().await;
    Ok(())
}
