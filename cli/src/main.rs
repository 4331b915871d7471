//! Terminal driver for the softkey input core.
//!
//! Each input line is typed key by key into the state machine; lines starting
//! with ':' are commands (candidate selection, function keys, long presses,
//! overlays). The simulated field is printed after every line.
//!
//! Run with: cargo run -p softkey-cli -- --table table.toml

mod field;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use softkey_core::{
    keycode, AiClient, Clipboard, Config, EntrySource, InputField, InputMode, InputPurpose,
    InputStateMachine, KeyEvent, KeyResult, KeyboardKind, LongPressAction, MemoryClipboard,
    MemoryEntries, NetworkError, OverlayKind, TableEngine, TextSink,
};
use tracing_subscriber::EnvFilter;

use field::TerminalField;

#[derive(Parser)]
#[command(about = "Drive the soft keyboard input core from the terminal")]
struct Args {
    /// Keyboard preferences (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Decoding table (TOML with [lexicon] and [predictions])
    #[arg(long)]
    table: Option<PathBuf>,

    /// Initial keyboard: t9, qwerty, abc, number, symbol
    #[arg(long, default_value = "qwerty")]
    keyboard: String,

    /// Answer AI queries with a local echo client
    #[arg(long)]
    echo_ai: bool,
}

/// Offline stand-in for an AI service.
struct EchoAi;

impl AiClient for EchoAi {
    fn ask(&self, question: &str) -> Result<String, NetworkError> {
        std::thread::sleep(Duration::from_millis(200));
        Ok(format!("你问的是：{question}"))
    }
}

type Machine = InputStateMachine<TableEngine, TerminalField>;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("softkey=info,softkey_core=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::load_or_default(path),
        None => Config::default(),
    };
    let engine = match &args.table {
        Some(path) => TableEngine::load_toml(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("loading table {}", path.display()))?,
        None => TableEngine::demo(),
    };

    let mut machine = InputStateMachine::new(engine, TerminalField::new(), config)
        .with_phrase_store(Box::new(MemoryEntries::new()))
        .with_clipboard(Box::new(MemoryClipboard::new()));
    if args.echo_ai {
        machine = machine.with_ai_client(Arc::new(EchoAi));
    }
    machine.switch_keyboard(parse_keyboard(&args.keyboard)?);
    machine.on_start_input(InputField::new(InputPurpose::FreeForm), false);

    print_help();

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);

        if let Some(command) = line.strip_prefix(':') {
            match run_command(&mut machine, command) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => println!("  ⚠ {err:#}"),
            }
        } else {
            for ch in line.chars() {
                let event = if ch == ' ' {
                    KeyEvent::soft_code(keycode::SPACE)
                } else {
                    KeyEvent::soft_char(ch)
                };
                if machine.process_key(&event) == KeyResult::NotHandled {
                    println!("  ⓘ {ch:?} not handled");
                }
            }
        }
        if machine.poll_overlay() {
            println!("  ↳ overlay updated");
        }
        show_state(&mut machine);
    }
    println!("Goodbye!");
    Ok(())
}

/// Run one ':' command. Returns false to quit.
fn run_command(machine: &mut Machine, command: &str) -> Result<bool> {
    let (name, arg) = match command.split_once(' ') {
        Some((name, arg)) => (name, arg),
        None => (command, ""),
    };
    match name {
        "q" | "quit" => return Ok(false),
        "h" | "help" => print_help(),
        "sel" => {
            let index: usize = arg.trim().parse().context("usage: :sel <n>")?;
            machine.select_candidate(index.saturating_sub(1))?;
        }
        "del" => key(machine, keycode::DEL),
        "enter" => key(machine, keycode::ENTER),
        "space" => key(machine, keycode::SPACE),
        "left" => key(machine, keycode::DPAD_LEFT),
        "right" => key(machine, keycode::DPAD_RIGHT),
        "clear" => key(machine, keycode::CLEAR),
        "back" => key(machine, keycode::BACK),
        "lp" => {
            machine.handle_long_press(LongPressAction::from_label(arg));
        }
        "kb" => machine.switch_keyboard(parse_keyboard(arg)?),
        "copy" => {
            if let Some(clipboard) = machine.clipboard_mut() {
                clipboard.copy(arg);
            }
            machine.reset_to_idle();
            machine.suggest_clipboard();
        }
        "clips" => machine.show_clipboard(),
        "phrases" => {
            let entries = machine
                .phrase_store()
                .map(|store| store.all_entries())
                .unwrap_or_default();
            let texts: Vec<String> = entries.into_iter().map(|e| e.content).collect();
            machine.show_symbols(&texts);
        }
        "phrase" => machine.open_overlay(OverlayKind::PhraseCapture, arg),
        "ai" => machine.open_overlay(OverlayKind::AiQuery, arg),
        "ask" => machine.submit_query()?,
        "wait" => {
            if !machine.wait_overlay(Duration::from_secs(10)) {
                bail!("no answer yet");
            }
        }
        "accept" => match machine.accept_overlay_answer() {
            Some(answer) => println!("  ↳ copied {answer:?} to the clipboard"),
            None => bail!("no answer to accept"),
        },
        "cancel" => machine.cancel_overlay(),
        "calc" => {
            let before = machine.sink().text_before_cursor(100);
            machine.on_update_selection(&before);
        }
        "hide" => machine.on_window_hidden(),
        "show" => machine.on_window_shown(),
        other => bail!("unknown command :{other} (try :help)"),
    }
    Ok(true)
}

fn key(machine: &mut Machine, code: i32) {
    machine.process_key(&KeyEvent::soft_code(code));
}

fn parse_keyboard(name: &str) -> Result<KeyboardKind> {
    Ok(match name.trim() {
        "t9" => KeyboardKind::T9,
        "qwerty" => KeyboardKind::Qwerty,
        "lx17" => KeyboardKind::Lx17,
        "abc" => KeyboardKind::QwertyAbc,
        "number" => KeyboardKind::Number,
        "symbol" => KeyboardKind::Symbol,
        "hand" => KeyboardKind::Handwriting,
        other => bail!("unknown keyboard {other:?}"),
    })
}

fn show_state(machine: &mut Machine) {
    if machine.sink_mut().take_hide_request() {
        println!("  ↳ keyboard hidden");
    }
    let overlay = machine.overlay();
    if let Some(kind) = overlay.kind() {
        let busy = if overlay.is_busy() { " (waiting)" } else { "" };
        println!("  {kind:?}: {}{busy}", overlay.text());
        if let Some(answer) = overlay.answer() {
            println!("  answer: {answer}");
        }
    } else if let Some(error) = overlay.last_error() {
        println!("  ⚠ AI: {error}");
    }

    let mode = machine.current_mode();
    if mode != InputMode::Idle {
        println!("  {mode:?} {}", machine.composing_text());
    }
    for (i, candidate) in machine.candidates().candidates().iter().enumerate() {
        let marker = if i == machine.candidates().active_index() { "▶" } else { " " };
        let glyph = candidate.glyph().unwrap_or("");
        println!("   {marker} {}. {glyph}{}", i + 1, candidate.text);
    }
    println!("  field: {}", machine.sink().render());
}

fn print_help() {
    println!("Type letters to compose, other characters commit directly.");
    println!("Commands:");
    println!("  :sel N            choose candidate N");
    println!("  :space :enter :del :left :right :clear :back");
    println!("  :lp LABEL         long press (clear, revert, enter, switch_ime, english_cell, or text)");
    println!("  :kb NAME          switch keyboard (t9, qwerty, lx17, abc, number, symbol, hand)");
    println!("  :copy TEXT        copy to clipboard and suggest it");
    println!("  :calc             cursor moved: offer arithmetic results or predictions");
    println!("  :clips :phrases   browse clipboard / saved phrases");
    println!("  :phrase [TEXT]    capture a phrase (Enter saves)");
    println!("  :ai [TEXT] :ask :wait :accept :cancel");
    println!("  :hide :show :help :quit");
}
