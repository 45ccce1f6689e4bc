//! Interactive terminal front-end for the CyberInstruct security instructor.
//!
//! # Usage
//!
//! ```bash
//! export CYBERINSTRUCT_API_KEY=...
//!
//! # Start in the General module
//! cyberinstruct
//!
//! # Start in a specific module, printing replies only once complete
//! cyberinstruct --topic privesc --no-live
//!
//! # Disable colors (useful for piping output)
//! cyberinstruct --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/topic <name|number>` - Switch module
//! - `/topics` - List modules
//! - `/reset` - Reload the current module
//! - `/history` - Redraw the transcript
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::env;
use std::io;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::Level;

use cyberinstruct::chat::{
    ChatArgs, ChatCommand, ChatConfig, Renderer, TerminalRenderer, help_text, parse_command,
    topics_text,
};
use cyberinstruct::{API_KEY_ENV, MessagesService, SessionController, Topic};

/// Main entry point for the cyberinstruct application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("cyberinstruct [OPTIONS]");
    let config = ChatConfig::try_from(args)?;

    // Logs go to stderr so they never interleave with the transcript on stdout.
    tracing_subscriber::fmt()
        .with_max_level(if config.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        })
        .with_writer(io::stderr)
        .init();

    let api_key = env::var(API_KEY_ENV).ok().filter(|key| !key.is_empty());
    let service = MessagesService::with_options(api_key, config.base_url.clone(), None)?;
    let mut renderer = TerminalRenderer::with_color(config.use_color).live(config.live);
    if !service.has_credential() {
        renderer.print_error(&format!(
            "{API_KEY_ENV} is not set; the instructor uplink will be unavailable."
        ));
    }

    let mut session = SessionController::new(service).with_parameters(config.parameters());
    let mut rl = DefaultEditor::new()?;

    println!("CyberInstruct terminal (model: {})", config.model);
    println!("Type /help for commands, /topics for modules, /quit to exit\n");

    session.select_topic(config.topic, &mut renderer).await?;

    loop {
        let readline = rl.readline(&prompt(session.topic()));

        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line.as_str());

                if let Some(cmd) = parse_command(&line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Session terminated.");
                            break;
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Topic(topic) => {
                            if let Err(e) = session.select_topic(topic, &mut renderer).await {
                                renderer.print_error(&e.to_string());
                            }
                        }
                        ChatCommand::Topics => {
                            renderer.print_info(&topics_text(session.topic()));
                        }
                        ChatCommand::Reset => {
                            if let Err(e) = session.reset(&mut renderer).await {
                                renderer.print_error(&e.to_string());
                            }
                        }
                        ChatCommand::History => {
                            renderer.render_transcript(session.transcript().list());
                        }
                        ChatCommand::Model(model) => {
                            session.set_model(model.as_str());
                            renderer.print_info(&format!(
                                "Model set to {model}; applies from the next module load (/reset)."
                            ));
                        }
                        ChatCommand::Temperature(value) => {
                            session.set_temperature(Some(value));
                            renderer.print_info(&format!(
                                "temperature set to {value:.2}; applies from the next module load."
                            ));
                        }
                        ChatCommand::ClearTemperature => {
                            session.set_temperature(None);
                            renderer.print_info(
                                "temperature reset to model default; applies from the next module load.",
                            );
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                session.set_input(line);
                if let Err(e) = session.submit(&mut renderer).await {
                    renderer.print_error(&e.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("\nSession terminated.");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

fn prompt(topic: Topic) -> String {
    format!("root@instructor:~/{}$ ", topic.path_segment())
}

fn print_stats(session: &SessionController<MessagesService>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Module: {}", stats.topic);
    println!("      Phase: {}", stats.phase);
    println!(
        "      Uplink: {}",
        if stats.has_handle { "online" } else { "offline" }
    );
    println!("      Messages: {}", stats.message_count);
    println!("      Model: {}", stats.parameters.model);
    println!("      Max tokens: {}", stats.parameters.max_tokens);
    println!(
        "      Temperature: {}",
        stats
            .parameters
            .temperature
            .map(|v| format!("{v:.2}"))
            .unwrap_or_else(|| "default".to_string())
    );
    println!("      Module loads: {}", stats.topic_switches);
    println!(
        "      Sends: {} ({} refused while busy)",
        stats.sends, stats.rejected_sends
    );
    println!("      Reply chunks: {}", stats.chunks);
    println!(
        "      Fallback attempts: {} ({} failed opens)",
        stats.fallback_attempts, stats.handle_open_failures
    );
}
