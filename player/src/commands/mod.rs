use anyhow::{Result, anyhow};

use duoplay_core::{PairLayout, Side, SignUpOutcome, remix_url, watch_url};

use crate::app::App;

/// Command handler for the application
pub struct CommandHandler;

impl CommandHandler {
    /// Parse and execute a command
    pub async fn execute(app: &mut App, command_str: &str) -> Result<()> {
        let parts: Vec<&str> = command_str.trim().splitn(2, ' ').collect();
        let cmd = parts[0].to_lowercase();
        let args = parts.get(1).map(|s| s.trim());

        match cmd.as_str() {
            "toggle" | "t" => {
                let session = app.active_session();
                session.pump();
                if session.coordinator.is_playing() {
                    session.coordinator.pause();
                } else {
                    session.coordinator.play();
                }
            }
            "play" => {
                app.active_session().coordinator.play();
            }
            "pause" => {
                app.active_session().coordinator.pause();
            }
            "seek" | "s" => {
                let args = args.ok_or_else(|| anyhow!("Seek command requires seconds"))?;
                let position = args
                    .parse::<f64>()
                    .map_err(|_| anyhow!("Invalid position: {args}"))?;
                app.active_session().coordinator.seek(position);
            }
            "speed" => {
                let args = args.ok_or_else(|| anyhow!("Speed command requires a rate"))?;
                let rate = args
                    .parse::<f64>()
                    .map_err(|_| anyhow!("Invalid speed: {args}"))?;
                let applied = app.active_session().coordinator.set_speed(rate);
                app.set_status(format!("Speed set to {applied:.2}x"));
            }
            "vol" | "volume" | "v" => {
                let args = args.ok_or_else(|| anyhow!("Volume command requires: <side> <0-100>"))?;
                let mut words = args.split_whitespace();
                let side = parse_side(words.next().unwrap_or(""))?;
                let level = words
                    .next()
                    .and_then(|w| w.parse::<u8>().ok())
                    .ok_or_else(|| anyhow!("Invalid volume level"))?;
                let session = app.active_session();
                session.coordinator.set_volume(side, level);
                let applied = session.coordinator.volume(side);
                app.set_status(format!("Volume {side} set to {applied}"));
            }
            "next" | "n" => {
                app.active_session().next();
            }
            "prev" | "previous" => {
                app.active_session().previous();
            }
            "loop" => {
                let enabled = app.active_session().coordinator.toggle_loop();
                app.set_status(format!("Loop {}", if enabled { "on" } else { "off" }));
            }
            "tick" => {
                let seconds = match args {
                    Some(args) => args
                        .parse::<f64>()
                        .map_err(|_| anyhow!("Invalid tick seconds: {args}"))?,
                    None => 1.0,
                };
                app.active_session().tick(seconds);
            }
            "status" | "st" => {
                let mut line = app.active_session().status_line();
                if let Some(session) = app.session() {
                    line.push_str(&format!(
                        "  user {}",
                        session.email.as_deref().unwrap_or("?")
                    ));
                }
                app.set_status(line);
            }
            "pair" => match args.unwrap_or("") {
                "v" | "vertical" => {
                    app.active = PairLayout::Vertical;
                    app.set_status("Addressing the vertical pair");
                }
                "h" | "horizontal" => {
                    if app.horizontal.is_none() {
                        return Err(anyhow!("Horizontal pair requires a signed-in session"));
                    }
                    app.active = PairLayout::Horizontal;
                    app.set_status("Addressing the horizontal pair");
                }
                other => return Err(anyhow!("Unknown pair: {other}")),
            },
            "remix" | "r" => {
                let side = parse_side(args.unwrap_or("left"))?;
                let video_id = app
                    .active_session()
                    .video_id(side)
                    .ok_or_else(|| anyhow!("No video on the {side} side"))?;
                app.set_status(format!("Open externally: {}", remix_url(&video_id)));
            }
            "url" | "u" => {
                let side = parse_side(args.unwrap_or("left"))?;
                let video_id = app
                    .active_session()
                    .video_id(side)
                    .ok_or_else(|| anyhow!("No video on the {side} side"))?;
                app.set_status(format!("Watch externally: {}", watch_url(&video_id)));
            }
            "fs" | "fullscreen" => {
                let side = parse_side(args.unwrap_or("left"))?;
                if !app.active_session().coordinator.request_fullscreen(side) {
                    return Err(anyhow!("Fullscreen request rejected by the {side} embed"));
                }
            }
            "login" => {
                let (email, password) = parse_credentials(args, 2)
                    .map(|mut parts| (parts.remove(0), parts.remove(0)))?;
                let auth = app
                    .auth
                    .as_ref()
                    .ok_or_else(|| anyhow!("Auth backend is not configured"))?;
                let session = auth.sign_in(&email, &password).await?;
                app.set_status(format!(
                    "Signed in as {}",
                    session.email.as_deref().unwrap_or(&email)
                ));
            }
            "register" => {
                let mut parts = parse_credentials(args, 3)?;
                let (email, password, confirm) =
                    (parts.remove(0), parts.remove(0), parts.remove(0));
                if password != confirm {
                    return Err(anyhow!("Passwords do not match"));
                }
                let auth = app
                    .auth
                    .as_ref()
                    .ok_or_else(|| anyhow!("Auth backend is not configured"))?;
                match auth.sign_up(&email, &password).await? {
                    SignUpOutcome::ConfirmationRequired => {
                        app.set_status("Account created; confirm your email, then log in.");
                    }
                    SignUpOutcome::SignedIn(_) => {
                        app.set_status("Account created and signed in.");
                    }
                }
            }
            "google" => {
                let auth = app
                    .auth
                    .as_ref()
                    .ok_or_else(|| anyhow!("Auth backend is not configured"))?;
                let url = auth.oauth_authorize_url("google", None);
                app.set_status(format!("Open in a browser to continue: {url}"));
            }
            "logout" => {
                let auth = app
                    .auth
                    .as_ref()
                    .ok_or_else(|| anyhow!("Auth backend is not configured"))?;
                auth.sign_out().await;
            }
            "help" | "?" => {
                app.set_status(HELP.trim_end().to_string());
            }
            "quit" | "exit" | "q" => {
                app.should_quit = true;
            }
            "" => {
                // Empty command, do nothing
            }
            _ => {
                return Err(anyhow!("Unknown command: {cmd}"));
            }
        }

        Ok(())
    }
}

fn parse_side(word: &str) -> Result<Side> {
    match word {
        "left" | "l" | "1" => Ok(Side::Left),
        "right" | "r" | "2" => Ok(Side::Right),
        other => Err(anyhow!("Unknown side: {other} (use left/right)")),
    }
}

fn parse_credentials(args: Option<&str>, expected: usize) -> Result<Vec<String>> {
    let parts: Vec<String> = args
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if parts.len() != expected || parts.iter().any(String::is_empty) {
        return Err(anyhow!("Expected {expected} arguments"));
    }
    Ok(parts)
}

const HELP: &str = "\
Transport:  toggle/t  play  pause  seek <s>  speed <x>  vol <side> <0-100>
Playlists:  next/n  prev  loop  pair <v|h>
Extras:     remix <side>  url <side>  fs <side>  tick [s]  status/st
Account:    login <email> <pw>  register <email> <pw> <pw>  google  logout
Other:      help  quit
";
