use anyhow::{Context, bail};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    terminal,
};
use glyphscramble::{
    Config, ScrambleOptions, TriggerController,
    scramble::{Color, ElementId, Scope, Variable, frame_interval},
    terminal::{HiddenCursor, TerminalLine},
};
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Scramble a line of text in the terminal.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The text to settle on.
    text: String,

    /// The text shown before scrambling, defaults to the target text.
    #[clap(long)]
    from: Option<String>,

    /// Total animation duration in milliseconds.
    #[clap(short, long)]
    duration: Option<u64>,

    /// The charset to draw glyphs from: a literal string or a variable name.
    #[clap(short, long)]
    chars: Option<String>,

    /// Per character charsets, e.g. `a:4@,e:3`.
    #[clap(short, long)]
    mappings: Option<String>,

    /// The color of in flight glyphs.
    #[clap(long)]
    color: Option<String>,

    /// Keep scrambling until a key is pressed.
    #[clap(long)]
    continuous: bool,

    /// Scramble spaces too.
    #[clap(long)]
    scramble_whitespace: bool,

    /// Apply mappings regardless of case.
    #[clap(short = 'i', long)]
    case_insensitive: bool,

    /// Probability a glyph changes on each frame.
    #[clap(long)]
    intensity: Option<f64>,

    /// Seed the random source for a reproducible animation.
    #[clap(long)]
    seed: Option<u64>,

    /// Define a variable charsets can refer to, as `NAME=VALUE`.
    #[clap(long = "var", value_parser = parse_variable)]
    variables: Vec<(String, String)>,

    /// The configuration file to use.
    #[clap(long, env = "GLYPHSCRAMBLE_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    fn options(&self, defaults: ScrambleOptions) -> ScrambleOptions {
        let mut options = defaults;
        if let Some(duration) = self.duration {
            options.duration = duration;
        }
        if let Some(chars) = &self.chars {
            options.chars = Some(chars.clone());
        }
        if let Some(mappings) = &self.mappings {
            options.mappings = Some(mappings.clone());
        }
        if let Some(color) = &self.color {
            match color.parse::<Color>() {
                Ok(color) => options.color = color,
                Err(e) => tracing::warn!("{e}, using {}", options.color),
            }
        }
        if let Some(intensity) = self.intensity.filter(|i| (0.0..=1.0).contains(i)) {
            options.intensity = intensity;
        }
        options.continuous |= self.continuous;
        options.case_insensitive |= self.case_insensitive;
        if self.scramble_whitespace {
            options.preserve_whitespace = false;
        }
        options
    }
}

fn parse_variable(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{input}'")),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("GLYPHSCRAMBLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

/// Raw mode, left when dropped.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("failed to leave raw mode: {e}");
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().context("loading default config")?,
    };
    let options = cli.options(config.defaults);
    let mut registry = config.variables;
    for (name, value) in &cli.variables {
        registry.insert(Scope::Page, name.clone(), Variable::Text(value.clone()));
    }

    let mut controller = TriggerController::new(registry);
    if let Some(seed) = cli.seed {
        controller = controller.with_seed(seed);
    }
    let from = cli.from.as_deref().unwrap_or(&cli.text);
    let cursor = HiddenCursor::hide(io::stdout())?;
    let id = controller.register(TerminalLine::new(io::stdout(), from), &options);
    let completion = controller.start(id, &cli.text).context("element not registered")?;

    let result = if options.continuous {
        let _raw = RawMode::enable()?;
        let result = animate_until_key(&mut controller, id);
        controller.stop(id);
        result
    } else {
        let mut result = Ok(());
        while !completion.is_resolved() {
            controller.advance_frame();
            result = check_surface(&controller, id);
            if result.is_err() {
                break;
            }
            std::thread::sleep(frame_interval());
        }
        result
    };

    drop(cursor);
    writeln!(io::stdout())?;
    result
}

fn animate_until_key(
    controller: &mut TriggerController<TerminalLine<Stdout>>,
    id: ElementId,
) -> anyhow::Result<()> {
    loop {
        controller.advance_frame();
        check_surface(controller, id)?;
        if event::poll(frame_interval())? {
            if let Event::Key(key) = event::read()? {
                if is_quit(&key) {
                    return Ok(());
                }
            }
        }
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn check_surface(controller: &TriggerController<TerminalLine<Stdout>>, id: ElementId) -> anyhow::Result<()> {
    let Some(engine) = controller.engine(id) else {
        bail!("element {id:?} is gone");
    };
    if let Some(e) = engine.surface().error() {
        bail!("failed to draw: {e}");
    }
    Ok(())
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
