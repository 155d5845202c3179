use std::borrow::Cow::{self, Borrowed, Owned};

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use super::utils::{print_error, print_message};
use crate::context::AppContext;
use confab_application::{ChatSession, PageOutcome, SendError, SendOutcome};
use confab_core::LocationFix;

const COMMANDS: &[&str] = &["/more", "/location", "/decline", "/tools", "/new", "/quit"];

/// Rustyline helper completing and hinting slash commands.
struct ChatHelper;

impl Helper for ChatHelper {}

impl Completer for ChatHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return Ok((0, Vec::new()));
        }

        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ChatHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ChatHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for ChatHelper {}

enum Input<'a> {
    Text(&'a str),
    More,
    Location(Result<LocationFix, String>),
    Decline,
    Tools(Vec<String>),
    New,
    Quit,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let Some(command) = line.strip_prefix('/') else {
        return Input::Text(line);
    };
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or_default() {
        "more" => Input::More,
        "location" => Input::Location(parse_location(parts.collect())),
        "decline" => Input::Decline,
        "tools" => Input::Tools(
            parts
                .flat_map(|part| part.split(','))
                .filter(|tool| !tool.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        "new" => Input::New,
        "quit" | "exit" => Input::Quit,
        _ => Input::Unknown(line),
    }
}

fn parse_location(args: Vec<&str>) -> Result<LocationFix, String> {
    const USAGE: &str = "Usage: /location LAT LON [ACCURACY_METERS]";
    let numbers: Vec<f64> = args
        .iter()
        .map(|arg| arg.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| USAGE.to_string())?;

    let (latitude, longitude, accuracy) = match numbers.as_slice() {
        [lat, lon] => (*lat, *lon, 0.0),
        [lat, lon, acc] => (*lat, *lon, *acc),
        _ => return Err(USAGE.to_string()),
    };
    LocationFix::new(latitude, longitude, accuracy)
        .ok_or_else(|| "Latitude, longitude or accuracy out of range".to_string())
}

pub async fn run(ctx: &AppContext, conversation: Option<String>) -> Result<()> {
    let session = ctx.chat_session()?;

    if let Some(id) = conversation {
        if let Err(e) = session.list_conversations().await {
            tracing::debug!("[Session] Could not list conversations: {}", e);
        }
        if let Err(e) = session.select_conversation(&id).await {
            print_error(&e);
        }
        for message in session.messages().await {
            print_message(&message);
        }
        if session.has_more_history().await {
            println!("{}", "(older messages available: /more)".bright_black());
        }
    }

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ChatHelper));

    println!("{}", "=== confab chat ===".bright_magenta().bold());
    println!(
        "{}",
        "Commands: /more, /location LAT LON [ACC], /decline, /tools a,b, /new, /quit"
            .bright_black()
    );
    println!();

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(trimmed);

        match parse_input(trimmed) {
            Input::Text(text) => {
                if !session.can_send() {
                    println!("{}", "Still waiting for the previous reply.".yellow());
                    continue;
                }
                let result = session.send(text).await;
                show_send_result(result.map(Some));
            }
            Input::More => load_more(&session).await,
            Input::Location(Ok(fix)) => {
                let result = session.supply_location(fix).await;
                if let Ok(None) = result {
                    println!("{}", "Location saved for this session.".bright_black());
                }
                show_send_result(result);
            }
            Input::Location(Err(usage)) => println!("{}", usage.yellow()),
            Input::Decline => match session.decline_location().await {
                Some(_) => println!("{}", "Location declined; no reply will arrive.".bright_black()),
                None => println!("{}", "No location request is pending.".bright_black()),
            },
            Input::Tools(tools) => {
                let label = if tools.is_empty() {
                    "none".to_string()
                } else {
                    tools.join(", ")
                };
                session.orchestrator().set_tools(tools).await;
                println!("{}", format!("Tools: {}", label).bright_black());
            }
            Input::New => {
                session.start_new().await;
                println!("{}", "Started a new conversation.".bright_black());
            }
            Input::Quit => break,
            Input::Unknown(command) => {
                println!("{}", format!("Unknown command: {}", command).yellow())
            }
        }
    }

    println!("{}", "Goodbye!".bright_green());
    Ok(())
}

fn show_send_result(result: std::result::Result<Option<SendOutcome>, SendError>) {
    match result {
        Ok(Some(SendOutcome::Delivered { reply, .. })) => print_message(&reply),
        Ok(Some(SendOutcome::LocationRequired { reply, .. })) => {
            print_message(&reply);
            println!(
                "{}",
                "Share a location with /location LAT LON [ACC] or skip with /decline".bright_yellow()
            );
        }
        Ok(None) => {}
        Err(err) => {
            if err.rolled_back() {
                println!("{}", "(message not sent)".bright_black());
            }
            print_error(&err.error);
        }
    }
}

async fn load_more(session: &ChatSession) {
    match session.load_more().await {
        Ok(PageOutcome::Applied { inserted, has_more }) => {
            for message in session.messages().await.iter().take(inserted) {
                print_message(message);
            }
            if !has_more {
                println!("{}", "(start of conversation)".bright_black());
            }
        }
        Ok(PageOutcome::Exhausted) => {
            println!("{}", "(start of conversation)".bright_black())
        }
        Ok(PageOutcome::InFlight | PageOutcome::Stale) => {}
        Err(e) => print_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent() {
        assert!(matches!(parse_input("hello /there"), Input::Text("hello /there")));
    }

    #[test]
    fn test_location_with_and_without_accuracy() {
        let Input::Location(Ok(fix)) = parse_input("/location 35.6 139.7 20") else {
            panic!("expected a location");
        };
        assert_eq!(fix.accuracy, 20.0);

        let Input::Location(Ok(fix)) = parse_input("/location -33.9 151.2") else {
            panic!("expected a location");
        };
        assert_eq!(fix.accuracy, 0.0);
    }

    #[test]
    fn test_invalid_location_reports_problem() {
        assert!(matches!(parse_input("/location north"), Input::Location(Err(_))));
        assert!(matches!(parse_input("/location 95 10"), Input::Location(Err(_))));
    }

    #[test]
    fn test_tools_accept_commas_and_spaces() {
        let Input::Tools(tools) = parse_input("/tools weather,calendar maps") else {
            panic!("expected tools");
        };
        assert_eq!(tools, vec!["weather", "calendar", "maps"]);
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(parse_input("/dance"), Input::Unknown("/dance")));
    }
}
