use std::time::{Duration, Instant};

use clap::Subcommand;
use pomoflow_core::{AppConfig, Event, FocusApp, TimerMode, TimerState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;

use crate::session;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

const HELP: &str = "commands: start | pause | reset | skip | mode <focus|short|long> | \
select <task-id|none> | status | quit";

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the timer interactively, reading commands from stdin
    Run {
        /// Mode to begin in (focus, short, long)
        #[arg(long)]
        mode: Option<String>,
        /// Start the countdown immediately
        #[arg(long)]
        start: bool,
    },
    /// Print the idle timer state as JSON
    Status,
}

pub fn run(action: TimerAction, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = session::open(config);

    match action {
        TimerAction::Run { mode, start } => {
            if let Some(name) = mode {
                let mode = TimerMode::parse(&name).ok_or(format!("unknown mode: {name}"))?;
                app.set_mode(mode);
            }
            if start {
                app.start();
            }
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(interactive(&mut app))?;
        }
        TimerAction::Status => {
            session::print_json(&app.display())?;
        }
    }
    Ok(())
}

enum Flow {
    Continue,
    Quit,
}

async fn interactive(app: &mut FocusApp) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut poller = tokio::time::interval(POLL_INTERVAL);

    eprintln!("{HELP}");
    emit(&app.display())?;
    let mut was_running = app.engine().state() == TimerState::Running;
    if was_running {
        ticker.reset();
    }

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                for event in app.tick(Instant::now()) {
                    emit(&event)?;
                }
            }
            _ = poller.tick() => {
                let outcome = app.poll(Instant::now());
                for event in &outcome.events {
                    emit(event)?;
                }
                if let Some(achievement) = outcome.achievement {
                    eprintln!("==> Achievement unlocked: {}", achievement.name);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if let Flow::Quit = dispatch(app, line.trim())? {
                    break;
                }
            }
        }

        // A fresh run gets a full first second.
        let running = app.engine().state() == TimerState::Running;
        if running && !was_running {
            ticker.reset();
        }
        was_running = running;
    }
    Ok(())
}

fn dispatch(app: &mut FocusApp, line: &str) -> Result<Flow, Box<dyn std::error::Error>> {
    let mut parts = line.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(Flow::Continue);
    };
    let arg = parts.next();

    let event = match (command, arg) {
        ("start" | "resume", _) => app.start(),
        ("pause", _) => app.pause(),
        ("reset", _) => app.reset(),
        ("skip", _) => app.skip(),
        ("mode", Some(name)) => match TimerMode::parse(name) {
            Some(mode) => app.set_mode(mode),
            None => {
                eprintln!("unknown mode: {name}");
                None
            }
        },
        ("select", Some("none")) => {
            app.select_task(None)?;
            Some(app.display())
        }
        ("select", Some(id)) => match app.select_task(Some(id)) {
            Ok(()) => Some(app.display()),
            Err(e) => {
                eprintln!("error: {e}");
                None
            }
        },
        ("status", _) => Some(app.display()),
        ("quit" | "exit", _) => return Ok(Flow::Quit),
        _ => {
            eprintln!("{HELP}");
            None
        }
    };

    if let Some(event) = event {
        emit(&event)?;
    }
    Ok(Flow::Continue)
}

fn emit(event: &Event) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
