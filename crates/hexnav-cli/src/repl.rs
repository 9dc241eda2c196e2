//! Operator prompt – reads commands from stdin on a background thread and
//! forwards them to the control loop through a [`ControlHandle`].
//!
//! Supported commands:
//!   pause         – suspend hazard-driven navigation (robot halts)
//!   resume        – continue from ADVANCING with a fresh history
//!   quit | exit   – stop the control loop and leave
//!   help          – show this list

use colored::Colorize;
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

use hexnav_runtime::ControlHandle;

/// A parsed operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Quit,
    Help,
}

/// Parse one input line.  Surrounding whitespace, case and an optional
/// leading `/` are ignored.  `None` for blank or unknown input.
pub fn parse(line: &str) -> Option<Command> {
    let word = line.trim();
    let word = word.strip_prefix('/').unwrap_or(word);
    match word.to_ascii_lowercase().as_str() {
        "pause" | "p" => Some(Command::Pause),
        "resume" | "r" => Some(Command::Resume),
        "quit" | "exit" | "q" => Some(Command::Quit),
        "help" | "?" => Some(Command::Help),
        _ => None,
    }
}

/// Spawn the stdin reader.  The thread ends on `quit`, EOF or a read error;
/// EOF does not stop the loop so the binary can run with stdin closed.
pub fn spawn(handle: ControlHandle) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("hexnav-prompt".to_string())
        .spawn(move || run(io::stdin().lock(), &handle))
}

fn run(input: impl BufRead, handle: &ControlHandle) {
    for line in input.lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse(&line) {
            Some(Command::Pause) => {
                handle.pause();
                println!("{}", "  ⏸  pause requested".yellow());
            }
            Some(Command::Resume) => {
                handle.resume();
                println!("{}", "  ▶  resume requested".green());
            }
            Some(Command::Quit) => {
                handle.stop();
                println!("{}", "  ■  stop requested".red());
                return;
            }
            Some(Command::Help) => print_help(),
            None => println!(
                "{} '{}'. Type {} for available commands.",
                "Unknown command:".red(),
                line.trim().yellow(),
                "help".bold()
            ),
        }
    }
}

fn print_help() {
    println!();
    println!("{}", "Operator Commands".bold().underline());
    println!("  {}        – halt and suspend navigation", "pause".bold().cyan());
    println!("  {}       – continue advancing", "resume".bold().cyan());
    println!("  {}  – stop the robot and exit", "quit  exit".bold().cyan());
    println!();
}
