use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use time::Duration;

const DEFAULT_COOKIE_NAME: &str = "bakeshop_admin";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve {
        addr: SocketAddr,
        config: bakeshop::config::AppConfig,
    },
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }
    if let Some(Command::AuthKey) = cli.command {
        let code = run_auth_key();
        return RunOutcome::Exit(code);
    }

    let data_dir = match cli.data_dir.as_ref() {
        Some(data_dir) => data_dir.clone(),
        None => {
            eprintln!("error: --data-dir is required unless using a subcommand");
            return RunOutcome::Exit(2);
        }
    };
    if let Err(err) = std::fs::create_dir_all(&data_dir) {
        eprintln!("error: failed to create data directory: {err}");
        return RunOutcome::Exit(2);
    }
    let data_dir = match std::fs::canonicalize(&data_dir) {
        Ok(data_dir) => data_dir,
        Err(err) => {
            eprintln!("error: failed to resolve data directory: {err}");
            return RunOutcome::Exit(2);
        }
    };

    let auth = match resolve_auth_config(&cli) {
        Ok(auth) => auth,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve {
        addr: cli.listen,
        config: bakeshop::config::AppConfig {
            data_dir,
            app_name: cli.app_name,
            vapid_private_key: cli.vapid_private_key,
            vapid_public_key: cli.vapid_public_key,
            vapid_subject: cli.vapid_subject,
            auth,
        },
    }
}

#[derive(Parser, Debug)]
#[command(name = "bakeshop", version, about = "Small bakery storefront server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long, default_value = "Bakeshop")]
    app_name: String,
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    #[arg(long, env = "BAKESHOP_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "BAKESHOP_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "BAKESHOP_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, env = "BAKESHOP_AUTH_KEY")]
    auth_key: Option<String>,
    #[arg(long, env = "BAKESHOP_SESSION_TTL")]
    session_ttl: Option<String>,
    #[arg(long, env = "BAKESHOP_AUTH_COOKIE_NAME")]
    auth_cookie_name: Option<String>,
    #[arg(long, env = "BAKESHOP_AUTH_COOKIE_SECURE")]
    auth_cookie_secure: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a VAPID key pair for push notifications.
    Init(InitArgs),
    /// Generate a session-signing key for admin auth.
    AuthKey,
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match bakeshop::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("BAKESHOP_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("BAKESHOP_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("BAKESHOP_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace BAKESHOP_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

fn run_auth_key() -> i32 {
    let secret = match bakeshop::generate_auth_key() {
        Ok(secret) => secret,
        Err(err) => {
            eprintln!("failed to generate auth key: {err}");
            return 1;
        }
    };
    println!("{secret}");
    0
}

fn resolve_auth_config(cli: &Cli) -> Result<Option<bakeshop::config::AuthConfig>, String> {
    let has_any = cli.auth_key.is_some()
        || cli.session_ttl.is_some()
        || cli.auth_cookie_name.is_some()
        || cli.auth_cookie_secure;

    if !has_any {
        return Ok(None);
    }

    let auth_key = cli
        .auth_key
        .as_ref()
        .ok_or("auth is configured but --auth-key is missing")?
        .trim();
    if auth_key.is_empty() {
        return Err("auth key cannot be empty".to_string());
    }

    if let Some(name) = cli.auth_cookie_name.as_deref()
        && name.trim().is_empty()
    {
        return Err("auth cookie name cannot be empty".to_string());
    }

    let session_ttl = match cli.session_ttl.as_deref() {
        Some(raw) => parse_session_ttl(raw)?,
        None => default_session_ttl(),
    };
    let cookie_name = cli
        .auth_cookie_name
        .as_deref()
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());

    Ok(Some(bakeshop::config::AuthConfig {
        key: auth_key.to_string(),
        session_ttl,
        cookie_name,
        cookie_secure: cli.auth_cookie_secure,
    }))
}

fn default_session_ttl() -> Duration {
    Duration::days(14)
}

fn parse_session_ttl(raw: &str) -> Result<Duration, String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err("session ttl cannot be empty".to_string());
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| format!("invalid session ttl '{value}'; expected <number>[s|m|h|d]"))?;

    if amount <= 0 {
        return Err("session ttl must be greater than 0".to_string());
    }

    match unit {
        's' => Ok(Duration::seconds(amount)),
        'm' => Ok(Duration::minutes(amount)),
        'h' => Ok(Duration::hours(amount)),
        'd' => Ok(Duration::days(amount)),
        _ => Err(format!(
            "invalid session ttl '{value}'; expected <number>[s|m|h|d]"
        )),
    }
}
