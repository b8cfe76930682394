use std::fs::OpenOptions;
use std::io::Write;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use duoplay_core::RemoteConfig;

mod app;
mod commands;

use app::{App, Overrides};

// Debug logger to file for development
fn debug_log(message: &str) {
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open("duoplay_debug.log")
    {
        let datetime = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let _ = writeln!(file, "[{datetime}] {message}");
    }
}

#[derive(Parser, Debug)]
#[command(name = "duoplay", about = "Synchronized dual-player session driver")]
struct Args {
    /// Override the leader/follower stagger in milliseconds
    #[arg(long, env = "DUOPLAY_STAGGER_MS")]
    stagger_ms: Option<u64>,
    /// Override the timeline poll period in milliseconds
    #[arg(long, env = "DUOPLAY_SAMPLE_MS")]
    sample_ms: Option<u64>,
    /// Start with loop-at-end disabled
    #[arg(long)]
    no_loop: bool,
    /// Run a semicolon-separated command script instead of reading stdin
    #[arg(long, short = 'c')]
    commands: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup logger
    env_logger::init();
    debug_log("Application starting");

    let args = Args::parse();
    let remote = RemoteConfig::from_env();

    // Missing credentials degrade features, never the whole session.
    if !remote.playlists_configured() {
        eprintln!("Notice: YOUTUBE_API_KEY is not set; playlists will be empty.");
    }
    if !remote.auth_configured() {
        eprintln!("Notice: SUPABASE_URL/SUPABASE_ANON_KEY are not set; account commands disabled.");
    }

    let mut app = App::new(
        remote,
        Overrides {
            stagger_ms: args.stagger_ms,
            sample_ms: args.sample_ms,
            no_loop: args.no_loop,
        },
    );
    app.init().await;
    debug_log("App initialized");

    println!("duoplay ready; type 'help' for commands");
    println!("{}", app.vertical.status_line());

    if let Some(script) = args.commands {
        for command in script.split(';') {
            run_command(&mut app, command).await;
            if app.should_quit {
                break;
            }
        }
        debug_log("Script finished");
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if app.should_quit {
            break;
        }
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug_log(&format!("stdin error: {e}"));
                break;
            }
        };
        run_command(&mut app, &line).await;
    }

    debug_log("Application terminated");
    Ok(())
}

async fn run_command(app: &mut App, line: &str) {
    let line = line.trim();
    if !line.is_empty() {
        // never log credential arguments
        let shown = line.split_whitespace().next().unwrap_or("");
        debug_log(&format!("COMMAND: {shown}"));
    }

    if let Err(e) = commands::CommandHandler::execute(app, line).await {
        debug_log(&format!("Command error: {e}"));
        eprintln!("Error: {e}");
    }
    if let Some(status) = app.take_status() {
        println!("{status}");
    }

    // session changes ripple into which pairs are active
    app.sync_session().await;
    if let Some(status) = app.take_status() {
        println!("{status}");
    }
}
