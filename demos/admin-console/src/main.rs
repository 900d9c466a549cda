use std::io::{self, BufRead, Write as _};
use std::path::PathBuf;

use tradedesk::prelude::*;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

const USAGE: &str = "\
usage: admin-console <command>

commands:
  status              show the recovered session (default)
  login <email>       sign in; password from TRADEDESK_PASSWORD or stdin
  logout              sign out and forget the stored session
  route <path>        show what the guard decides for a protected path
  watch <seconds>     keep the session revalidated for a while

environment:
  TRADEDESK_API_URL, TRADEDESK_TIMEOUT_SECS, TRADEDESK_MAX_RETRIES
  TRADEDESK_SESSION_FILE (default ./tradedesk-session.json)
  RUST_LOG";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Status,
    Login { email: String },
    Logout,
    Route { path: String },
    Watch { seconds: u64 },
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let mut args = args.iter().map(String::as_str);
    let name = args.next().unwrap_or("status");
    let command = match (name, args.next()) {
        ("status", None) => Command::Status,
        ("logout", None) => Command::Logout,
        ("status" | "logout", Some(_)) => return Err("too many arguments".into()),
        ("login", Some(email)) => Command::Login { email: email.into() },
        ("route", Some(path)) => Command::Route { path: path.into() },
        ("watch", Some(secs)) => Command::Watch {
            seconds: secs
                .parse()
                .map_err(|_| format!("watch needs a number of seconds, got {secs:?}"))?,
        },
        ("login" | "route" | "watch", None) => return Err(format!("{name} needs an argument")),
        (other, _) => return Err(format!("unknown command {other:?}")),
    };
    if args.next().is_some() {
        return Err("too many arguments".into());
    }
    Ok(command)
}

fn session_file() -> PathBuf {
    std::env::var_os("TRADEDESK_SESSION_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tradedesk-session.json"))
}

fn read_password() -> io::Result<String> {
    if let Ok(password) = std::env::var("TRADEDESK_PASSWORD") {
        return Ok(password);
    }
    eprint!("password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn describe(state: &AuthState) -> String {
    match (&state.phase, &state.user) {
        (AuthPhase::Authenticated, Some(user)) => format!(
            "signed in as {} ({}){}",
            user.display_name(),
            user.role,
            if user.role.is_admin() { "" } else { " [no admin access]" }
        ),
        (AuthPhase::Authenticated, None) => {
            "signed in (profile unavailable, backend unreachable)".into()
        }
        (phase, _) => format!("{phase}"),
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tradedesk::logging::init("warn")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_command(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let desk = Tradedesk::builder()
        .client_config(ClientConfig::from_env()?)
        .file_storage(session_file())
        .build()?;

    let phase = desk.startup().await;
    tracing::debug!(%phase, "startup recovery finished");

    match command {
        Command::Status => {
            println!("{}", describe(&desk.state()));
            if let Some(left) = desk.store().time_until_expiry() {
                println!("token expires in {}s", left.as_secs());
            }
        }
        Command::Login { email } => {
            let password = read_password()?;
            match desk.controller().login(&Credentials::new(email, password)).await {
                Ok(_) => println!("{}", describe(&desk.state())),
                Err(e) => {
                    eprintln!("sign-in failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Logout => {
            desk.controller().logout();
            println!("signed out");
        }
        Command::Route { path } => {
            println!("{path}: {}", desk.guard().protected_when_settled(&path).await);
        }
        Command::Watch { seconds } => {
            if !desk.state().is_authenticated() {
                eprintln!("not signed in");
                std::process::exit(1);
            }
            let handle = desk.spawn_refresh();
            tokio::time::sleep(std::time::Duration::from_secs(seconds)).await;
            let exit = handle.shutdown().await;
            println!("refresh stopped: {exit}; {}", describe(&desk.state()));
        }
    }

    Ok(())
}
