//! Non-interactive commands.
//!
//! `projectdeck --status`, `--login <email>`, `--logout` and `--projects`
//! run once and exit instead of starting the TUI. `--ephemeral` keeps the
//! session in memory for the duration of the command.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::json;

use projectdeck_core::{ApiClient, Persistence, SessionManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tui,
    Status,
    Login { email: String },
    Logout,
    Projects,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub ephemeral: bool,
}

pub fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut command = Command::Tui;
    let mut ephemeral = false;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let next = match arg.as_str() {
            "--ephemeral" => {
                ephemeral = true;
                continue;
            }
            "--status" => Command::Status,
            "--logout" => Command::Logout,
            "--projects" => Command::Projects,
            "--login" => {
                let email = iter
                    .next()
                    .filter(|e| !e.starts_with("--"))
                    .ok_or_else(|| anyhow!("--login requires an email address"))?;
                Command::Login {
                    email: email.clone(),
                }
            }
            other => bail!("Unknown argument: {}", other),
        };

        if command != Command::Tui {
            bail!("Only one command may be given");
        }
        command = next;
    }

    Ok(Invocation { command, ephemeral })
}

/// Show enough of a token to recognize it without exposing it
pub fn mask_token(token: &str) -> String {
    const VISIBLE: usize = 4;
    if token.chars().count() <= VISIBLE {
        return "*".repeat(VISIBLE);
    }
    let prefix: String = token.chars().take(VISIBLE).collect();
    format!("{}****", prefix)
}

pub async fn run(command: Command, session: &SessionManager, api: &ApiClient) -> Result<()> {
    match command {
        Command::Tui => bail!("The TUI is not a one-shot command"),
        Command::Status => status(session).await,
        Command::Login { email } => login(session, api, &email).await,
        Command::Logout => logout(session).await,
        Command::Projects => projects(api).await,
    }
}

async fn status(session: &SessionManager) -> Result<()> {
    let state = session.ready().await;
    let mut value = serde_json::to_value(&state)?;
    if let Some(token) = state.token() {
        value["token"] = json!(mask_token(token));
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn login(session: &SessionManager, api: &ApiClient, email: &str) -> Result<()> {
    session.ready().await;

    let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
    let token = api
        .authenticate(email, &password)
        .await
        .map_err(|e| anyhow!("Login failed: {}", e.user_message()))?;

    let outcome = session.login(&token)?.await;
    if outcome == Persistence::Failed {
        eprintln!("Warning: session could not be saved and will not survive a restart");
    }
    println!("Logged in as {}", email);
    Ok(())
}

async fn logout(session: &SessionManager) -> Result<()> {
    let was_logged_in = session.ready().await.is_logged_in();

    if session.logout().await == Persistence::Failed {
        bail!("Logged out, but the saved session could not be removed");
    }

    if was_logged_in {
        println!("Logged out");
    } else {
        println!("Not logged in");
    }
    Ok(())
}

async fn projects(api: &ApiClient) -> Result<()> {
    let projects = api
        .fetch_projects()
        .await
        .map_err(|e| anyhow!("{} (URL: {})", e.user_message(), api.projects_url()))?;

    if projects.is_empty() {
        println!("No projects yet");
    }
    for project in projects {
        println!("{}", project.title);
        println!("  {}", project.display_description());
    }
    Ok(())
}
