//! Interactive chat application for the NOVA API.
//!
//! # Usage
//!
//! ```bash
//! # Talk to a local backend on http://localhost:8000
//! novachat
//!
//! # Point at another backend and check it every 30 seconds
//! novachat --api-url http://nova.internal:8000 --health-interval 30
//!
//! # Disable colors (useful for piping output)
//! novachat --no-color
//! ```
//!
//! Log output is filtered through `NOVACHAT_LOG` (e.g. `NOVACHAT_LOG=novachat=debug`).
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear the conversation
//! - `/check` - Check the connection now
//! - `/history` - Show the server-side history
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing_subscriber::EnvFilter;

use novachat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, ClearOutcome, PlainTextRenderer, Rejection,
    Renderer, SendOutcome, help_text, parse_command,
};
use novachat::{ConnectionMonitor, ConnectionStatus, NovaClient};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "NOVACHAT_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main entry point for the novachat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    let (args, _) = ChatArgs::from_command_line_relaxed("novachat [OPTIONS]");
    let config = ChatConfig::from(args);
    let use_color = config.use_color;
    let health_interval = config.health_interval;

    let connection = ConnectionStatus::new();
    let client = Arc::new(NovaClient::new(config.client.clone(), connection.clone())?);
    let monitor = ConnectionMonitor::new(Arc::clone(&client), connection.clone());
    let mut session = ChatSession::new(Arc::clone(&client), connection.clone(), config);
    let mut renderer = PlainTextRenderer::with_color(use_color);
    let mut rl = DefaultEditor::new()?;

    // Flag for abandoning a pending reply
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!("NOVA Chat ({})", client.base_url());
    println!("Type /help for commands, /quit to exit\n");

    monitor.check_connection().await;
    renderer.print_connection(session.sync_connection());

    let polling = health_interval.map(|period| {
        let mut watcher = connection.subscribe();
        let announce = tokio::spawn(async move {
            let mut renderer = PlainTextRenderer::with_color(use_color);
            // The first value was already shown at startup.
            watcher.next().await;
            while let Some(connected) = watcher.next().await {
                renderer.print_connection(connected);
            }
        });
        (monitor.spawn_polling(period), announce)
    });

    let mut shown = 0;
    loop {
        interrupted.store(false, Ordering::Relaxed);
        session.sync_connection();
        shown = show_new_messages(&session, &mut renderer, shown);

        let readline = rl.readline("You: ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => match session.clear_history().await {
                            Ok(ClearOutcome::Remote) => {
                                shown = 0;
                                renderer.print_success("Conversation cleared.");
                            }
                            Ok(ClearOutcome::Local) => {
                                shown = 0;
                                renderer.print_info("Conversation cleared locally (offline).");
                            }
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Check => {
                            let connected = monitor.check_connection().await;
                            renderer.print_connection(connected);
                        }
                        ChatCommand::History => match session.fetch_history().await {
                            Ok(history) => renderer.print_history(&history),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Models => match session.list_models().await {
                            Ok(models) => renderer.print_models(&models),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Session => match session.session_id() {
                            Some(id) => renderer.print_info(&format!("Session: {id}")),
                            None => renderer.print_info("No active session."),
                        },
                        ChatCommand::Reset => {
                            session.reset_session();
                            renderer.print_info("The next message starts a new session.");
                        }
                        ChatCommand::Stats => renderer.print_stats(&session.stats()),
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Invalid(msg) => renderer.print_error(&msg),
                    }
                    continue;
                }

                let outcome = send(&mut session, &mut renderer, line, &interrupted).await;
                match outcome {
                    SendOutcome::Rejected(Rejection::Empty) => {}
                    SendOutcome::Rejected(rejection) => {
                        renderer.print_error(&format!("Not sent: {rejection}"));
                    }
                    SendOutcome::Replied | SendOutcome::Failed(_) | SendOutcome::Cancelled => {
                        // The user line is already on screen.
                        shown = session.message_count().saturating_sub(1);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                renderer.print_info("^C (type /quit to exit)");
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    if let Some((poller, announcer)) = polling {
        poller.abort();
        announcer.abort();
    }
    Ok(())
}

/// Sends `text`, showing the typing line while the reply is pending.  Ctrl+C
/// abandons the pending reply.
async fn send(
    session: &mut ChatSession<NovaClient>,
    renderer: &mut PlainTextRenderer,
    text: &str,
    interrupted: &AtomicBool,
) -> SendOutcome {
    let pending = match session.begin_send(text) {
        Ok(pending) => pending,
        Err(rejection) => return SendOutcome::Rejected(rejection),
    };
    if let Some(typing) = session.messages().last() {
        renderer.print_message(typing);
    }

    let backend = Arc::clone(session.backend());
    let user_id = session.config().user_id.clone();
    let result = tokio::select! {
        result = backend.send_message(pending.text(), &user_id) => Some(result),
        _ = wait_for_interrupt(interrupted) => None,
    };
    match result {
        Some(result) => session.complete_send(pending, result),
        None => session.cancel_send(pending),
    }
}

async fn wait_for_interrupt(flag: &AtomicBool) {
    while !flag.load(Ordering::Relaxed) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn show_new_messages(
    session: &ChatSession<NovaClient>,
    renderer: &mut PlainTextRenderer,
    shown: usize,
) -> usize {
    let messages = session.messages();
    for message in messages.iter().skip(shown) {
        renderer.print_message(message);
    }
    messages.len()
}
