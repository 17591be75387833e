// algotrace: step-tracing Python-subset interpreter with data-structure animations

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

use algotrace::animation::AdapterRegistry;
use algotrace::interpreter::{Interpreter, TraceError, TracerConfig, TracingMode};
use algotrace::parser::parse_source;
use algotrace::service::{ExecuteOptions, SpeedPreset, Visualizer};
use algotrace::snapshot::ExecutionStep;
use algotrace::trace;
use algotrace::ui::App;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "algotrace",
    about = "Trace Python-subset programs step by step and animate their data structures",
    version
)]
struct Cli {
    /// Tracer config as JSON; missing fields take their defaults
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Tracing mode (full, minimal, performance, debug)
    #[arg(long, global = true)]
    mode: Option<TracingMode>,

    #[arg(long, global = true)]
    max_steps: Option<usize>,

    /// Wall-clock limit in seconds
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Abort on the first runtime fault instead of recording it and continuing
    #[arg(long, global = true)]
    strict: bool,

    /// Log format on stderr; the level comes from RUST_LOG
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the recorded steps as JSON
    Trace {
        file: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// Trace, validate and animate; prints the full report as JSON
    Animate {
        file: PathBuf,
        /// Adapter name (e.g. `heap`, `linked_list`) or variable name
        #[arg(long)]
        adapter: Option<String>,
        #[arg(long, default_value = "normal")]
        speed: SpeedPreset,
    },
    /// List registered adapters in priority order
    Adapters,
    /// Step through a trace in the terminal UI
    Play {
        file: PathBuf,
        #[arg(long)]
        adapter: Option<String>,
    },
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let layer = match format {
        LogFormat::Text => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(io::stderr)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(io::stderr)
            .boxed(),
    };
    tracing_subscriber::registry().with(layer.with_filter(filter)).init();
}

/// Print a fault as JSON on stderr and exit with status 1
fn fail(err: &TraceError) -> ! {
    eprintln!("{}", err.to_json());
    process::exit(1);
}

fn read_source(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        fail(&TraceError::validation(format!(
            "cannot read '{}': {}",
            path.display(),
            e
        )))
    })
}

impl Cli {
    fn has_overrides(&self) -> bool {
        self.config.is_some()
            || self.mode.is_some()
            || self.max_steps.is_some()
            || self.timeout.is_some()
            || self.strict
    }

    /// Config file (or environment), then command-line flags on top
    fn tracer_config(&self) -> Result<TracerConfig, TraceError> {
        let base = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| {
                    TraceError::validation(format!("cannot read '{}': {}", path.display(), e))
                })?;
                TracerConfig::from_json(&text)?
            }
            None => TracerConfig::from_env(),
        };
        let config = base.with_overrides(|key| match key {
            "ALGOTRACE_MODE" => self.mode.map(|m| m.as_str().to_string()),
            "ALGOTRACE_MAX_STEPS" => self.max_steps.map(|n| n.to_string()),
            "ALGOTRACE_MAX_TIME" => self.timeout.map(|t| t.to_string()),
            "ALGOTRACE_LENIENT" if self.strict => Some("false".to_string()),
            _ => None,
        });
        let errors = config.hard_errors();
        if !errors.is_empty() {
            return Err(TraceError::validation(errors.join("; ")));
        }
        Ok(config)
    }
}

/// Trace for the player. A runtime fault keeps the steps recorded so far.
fn partial_trace(source: &str, config: TracerConfig) -> Result<Vec<ExecutionStep>, TraceError> {
    let module = parse_source(source).map_err(|e| TraceError::from_parse(e, source))?;
    let mut interpreter = Interpreter::new(source, config, None);
    if let Err(err) = interpreter.run(&module) {
        let err = err.with_source(source);
        eprintln!("{}", err);
        eprintln!("Entering the player with the partial trace...");
    }
    Ok(interpreter.into_steps())
}

fn play(source: String, steps: Vec<ExecutionStep>, hint: Option<&str>) -> io::Result<()> {
    let animations = AdapterRegistry::default().detect_and_animate(&steps, hint, 1.0);
    let (adapter, commands) = animations
        .into_iter()
        .next()
        .map_or((None, Vec::new()), |(name, cmds)| (Some(name), cmds));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(steps, commands, adapter, source);
    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match &cli.command {
        Command::Trace { file, pretty } => {
            let source = read_source(file);
            let config = cli.tracer_config().unwrap_or_else(|e| fail(&e));
            let steps = trace(&source, &config).unwrap_or_else(|e| fail(&e));
            let json = if *pretty {
                serde_json::to_string_pretty(&steps)
            } else {
                serde_json::to_string(&steps)
            };
            match json {
                Ok(text) => println!("{}", text),
                Err(e) => fail(&TraceError::validation(format!("cannot serialize trace: {}", e))),
            }
        }
        Command::Animate {
            file,
            adapter,
            speed,
        } => {
            let source = read_source(file);
            let mut visualizer = Visualizer::default();
            if cli.has_overrides() {
                visualizer = visualizer.with_config(cli.tracer_config().unwrap_or_else(|e| fail(&e)));
            }
            let options = ExecuteOptions {
                max_steps: cli.max_steps,
                speed_preset: *speed,
                adapter_hint: adapter.clone(),
            };
            let report = visualizer.execute(&source, &options).unwrap_or_else(|e| fail(&e));
            match serde_json::to_string_pretty(&report) {
                Ok(text) => println!("{}", text),
                Err(e) => fail(&TraceError::validation(format!("cannot serialize report: {}", e))),
            }
        }
        Command::Adapters => {
            let info = AdapterRegistry::default().adapter_info();
            match serde_json::to_string_pretty(&info) {
                Ok(text) => println!("{}", text),
                Err(e) => fail(&TraceError::validation(format!("cannot serialize adapters: {}", e))),
            }
        }
        Command::Play { file, adapter } => {
            let source = read_source(file);
            let config = cli.tracer_config().unwrap_or_else(|e| fail(&e));
            let steps = partial_trace(&source, config).unwrap_or_else(|e| fail(&e));
            if steps.is_empty() {
                fail(&TraceError::validation("the program recorded no steps"));
            }
            if let Err(err) = play(source, steps, adapter.as_deref()) {
                eprintln!("Error: {:?}", err);
                process::exit(1);
            }
        }
    }
}
