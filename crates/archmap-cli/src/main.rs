use archmap_core::geom;
use archmap_core::{ConfigFormat, DiagramConfig, Layer, Viewport};
use archmap_runtime::{ArchitectureMap, DiagramEvent, MarkerSample};
use serde::Serialize;
use std::io::Read;
use std::time::Duration;

/// Upper bound on ticks for one headless simulation run.
const MAX_TICKS: usize = 1_000_000;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Config(archmap_core::Error),
    Json(serde_json::Error),
    UnknownSimulation(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Config(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::UnknownSimulation(id) => write!(f, "Unknown simulation: {id}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<archmap_core::Error> for CliError {
    fn from(value: archmap_core::Error) -> Self {
        Self::Config(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Resolve,
    Simulate,
    Layers,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    format: Option<ConfigFormat>,
    pretty: bool,
    verbose: bool,
    scale: Option<f64>,
    pan: Option<(f64, f64)>,
    simulation: Option<String>,
    tick_ms: u64,
}

fn usage() -> &'static str {
    "archmap-cli\n\
\n\
USAGE:\n\
  archmap-cli [resolve] [--pretty] [--scale <s>] [--pan <x>,<y>] [--format json|yaml|json5] [<path>|-]\n\
  archmap-cli simulate --sim <id> [--tick-ms <n>] [--pretty] [--format json|yaml|json5] [<path>|-]\n\
  archmap-cli layers [--pretty] [--format json|yaml|json5] [<path>|-]\n\
\n\
OPTIONS:\n\
  -v, --verbose   Log debug diagnostics to stderr.\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', input is read from stdin (JSON unless --format is given).\n\
  - For files the format follows the extension (.json, .yaml/.yml, .json5).\n\
  - resolve prints the resolved frame: node/site rects, connector paths, viewport transform.\n\
  - simulate replays a route headlessly and prints its events and marker samples.\n\
"
}

fn parse_pan(raw: &str) -> Option<(f64, f64)> {
    let (x, y) = raw.split_once(',')?;
    let x = x.trim().parse::<f64>().ok()?;
    let y = y.trim().parse::<f64>().ok()?;
    (x.is_finite() && y.is_finite()).then_some((x, y))
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        command: Command::Resolve,
        tick_ms: 16,
        ..Default::default()
    };

    let mut it = argv.iter().skip(1).peekable();
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "resolve" => args.command = Command::Resolve,
            "simulate" => args.command = Command::Simulate,
            "layers" => args.command = Command::Layers,
            "--pretty" => args.pretty = true,
            "--verbose" | "-v" => args.verbose = true,
            "--format" => {
                let Some(fmt) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.format = Some(
                    fmt.parse::<ConfigFormat>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--scale" => {
                let Some(scale) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let scale = scale.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.scale = Some(scale);
            }
            "--pan" => {
                let Some(pan) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.pan = Some(parse_pan(pan).ok_or(CliError::Usage(usage()))?);
            }
            "--sim" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.simulation = Some(id.clone());
            }
            "--tick-ms" => {
                let Some(ms) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.tick_ms = ms.parse::<u64>().map_err(|_| CliError::Usage(usage()))?;
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    if matches!(args.command, Command::Simulate) && args.simulation.is_none() {
        return Err(CliError::Usage(usage()));
    }

    Ok(args)
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_config(args: &Args) -> Result<DiagramConfig, CliError> {
    let format = match (args.format, args.input.as_deref()) {
        (Some(f), _) => f,
        (None, None | Some("-")) => ConfigFormat::Json,
        (None, Some(path)) => ConfigFormat::from_path(std::path::Path::new(path))?,
    };
    let text = read_input(args.input.as_deref())?;
    Ok(DiagramConfig::from_str_with_format(&text, format)?)
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    println!();
    Ok(())
}

#[derive(Serialize)]
struct TimedEvent {
    tick: usize,
    event: DiagramEvent,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateOut<'a> {
    simulation: &'a str,
    tick_ms: u64,
    ticks: usize,
    completed: bool,
    events: Vec<TimedEvent>,
    markers: Vec<MarkerSample>,
}

#[derive(Serialize)]
struct LayerGroupOut<'a> {
    name: &'a str,
    layers: Vec<&'a Layer>,
}

#[derive(Serialize)]
struct LayersOut<'a> {
    core: Vec<&'a Layer>,
    groups: Vec<LayerGroupOut<'a>>,
}

fn run(args: Args) -> Result<(), CliError> {
    let cfg = load_config(&args)?;
    let mut map = ArchitectureMap::from_config(cfg);

    match args.command {
        Command::Resolve => {
            let vp = *map.viewport();
            let pan = args
                .pan
                .map(|(x, y)| geom::vector(x, y))
                .unwrap_or(vp.pan());
            let scale = args.scale.unwrap_or(vp.scale());
            map.set_viewport(Viewport::new(pan, scale));
            write_json(&map.frame(), args.pretty)
        }
        Command::Simulate => {
            let id = args.simulation.as_deref().unwrap_or_default();
            if map.run_simulation(id).is_none() {
                return Err(CliError::UnknownSimulation(id.to_string()));
            }
            let dt = Duration::from_millis(args.tick_ms);
            let mut events: Vec<TimedEvent> = map
                .drain_events()
                .into_iter()
                .map(|event| TimedEvent { tick: 0, event })
                .collect();
            let mut markers = Vec::new();
            let mut ticks = 0;
            let mut completed = false;
            while ticks < MAX_TICKS {
                ticks += 1;
                let status = map.tick(dt);
                events.extend(
                    map.drain_events()
                        .into_iter()
                        .map(|event| TimedEvent { tick: ticks, event }),
                );
                if let Some(m) = map.marker() {
                    if markers.last() != Some(m) {
                        markers.push(*m);
                    }
                }
                if status.run_done {
                    completed = true;
                    break;
                }
            }
            if !completed {
                tracing::warn!(simulation = %id, ticks, "simulation did not finish within the tick limit");
            }
            let out = SimulateOut {
                simulation: id,
                tick_ms: args.tick_ms,
                ticks,
                completed,
                events,
                markers,
            };
            write_json(&out, args.pretty)
        }
        Command::Layers => {
            let d = map.diagram();
            let out = LayersOut {
                core: d.core_layers().collect(),
                groups: d
                    .grouped_layers()
                    .into_iter()
                    .map(|(name, layers)| LayerGroupOut { name, layers })
                    .collect(),
            };
            write_json(&out, args.pretty)
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::UnknownSimulation(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
