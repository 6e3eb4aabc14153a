use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tokio::time::{interval, Duration, MissedTickBehavior};

use wardbeds::availability::render::render;
use wardbeds::availability::{AvailabilityController, ControllerSettings, FormField};
use wardbeds::config::Config;
use wardbeds::registry::{BedRegistry, RegistryClient};
use wardbeds::session::SessionEnd;

use super::connect;

const HELP: &str = "\
Commands:
  click <id>      select an available bed, or unbook a booked one
  name <text>     set the patient name
  time <HH:MM>    set the booking time
  submit          book the selected bed
  cancel          drop the selection
  refresh         resync now
  help            show this help
  quit            log out and exit";

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Click(u32),
    Edit(FormField, String),
    Submit,
    Cancel,
    Refresh,
    Help,
    Quit,
}

impl ViewCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "click" | "c" => rest
                .parse::<u32>()
                .map(Self::Click)
                .map_err(|_| format!("Not a bed number: {rest:?}")),
            "name" | "n" => Ok(Self::Edit(FormField::PatientName, rest.to_string())),
            "time" | "t" => Ok(Self::Edit(FormField::Time, rest.to_string())),
            "submit" | "s" => Ok(Self::Submit),
            "cancel" => Ok(Self::Cancel),
            "refresh" | "r" => Ok(Self::Refresh),
            "help" | "h" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            "" => Err("Type 'help' for commands".to_string()),
            other => Err(format!("Unknown command: {other}")),
        }
    }
}

/// Start a command without waiting on the registry.
///
/// Commands that may call the registry run on their own task so the loop
/// keeps reading input, ticking and redrawing while a call is pending. Draft
/// edits are applied inline to keep them ordered with the input.
async fn dispatch<R>(
    view: &AvailabilityController<R>,
    command: ViewCommand,
    pending: &mut JoinSet<()>,
) where
    R: BedRegistry + ?Sized + 'static,
{
    match command {
        ViewCommand::Edit(field, value) => view.edit_field(field, value).await,
        ViewCommand::Cancel => view.cancel_booking().await,
        ViewCommand::Click(id) => {
            let view = view.clone();
            pending.spawn(async move { view.click_bed(id).await });
        }
        ViewCommand::Submit => {
            let view = view.clone();
            pending.spawn(async move { view.submit_booking().await });
        }
        ViewCommand::Refresh => {
            let view = view.clone();
            pending.spawn(async move { view.refresh().await });
        }
        ViewCommand::Help | ViewCommand::Quit => {}
    }
}

async fn redraw(view: &AvailabilityController<RegistryClient>, last_frame: &mut String) {
    let frame = render(&view.snapshot().await);
    if frame != *last_frame {
        print!("\x1b[2J\x1b[H{frame}\n> ");
        *last_frame = frame;
    }
}

/// Run the availability view interactively until quit, EOF, idle timeout or
/// a rejected credential
pub async fn watch(config: &Config) -> Result<()> {
    let mut session = connect(config).await?;
    let view = AvailabilityController::new(session.client(), ControllerSettings::from(config));

    view.mount().await;

    let mut changes = view.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_frame = String::new();
    let mut pending = JoinSet::new();

    redraw(&view, &mut last_frame).await;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    session.logout().await;
                    break;
                };
                session.touch();

                match ViewCommand::parse(&line) {
                    Ok(ViewCommand::Quit) => {
                        session.logout().await;
                        break;
                    }
                    Ok(ViewCommand::Help) => {
                        println!("{HELP}");
                        continue;
                    }
                    Ok(command) => dispatch(&view, command, &mut pending).await,
                    Err(message) => {
                        println!("{message}");
                        continue;
                    }
                }
            }
            Some(finished) = pending.join_next(), if !pending.is_empty() => {
                if let Err(e) = finished {
                    tracing::error!(error = %e, "View action failed");
                }
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                view.expire_messages().await;
                if session.is_expired() {
                    session.end(SessionEnd::IdleTimeout);
                    break;
                }
            }
        }

        if view.snapshot().await.unauthorized {
            session.end(SessionEnd::Unauthorized);
            break;
        }
        redraw(&view, &mut last_frame).await;
    }

    // In-flight results are discarded once unmounted
    view.unmount().await;
    pending.shutdown().await;

    match session.ended() {
        Some(SessionEnd::IdleTimeout) => println!("\nSession timed out after inactivity"),
        Some(SessionEnd::Unauthorized) => println!("\nSession expired, please log in again"),
        _ => println!(),
    }
    Ok(())
}
