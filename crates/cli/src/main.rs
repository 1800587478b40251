use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use timeseries::FramePoint;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "motionlab")]
#[command(about = "Kinematics and overlays for pose-analysis results", long_about = None)]
struct Cli {
    /// Config file; defaults to <config dir>/motionlab/config.json when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pose-analysis tool on a video
    Analyze {
        video: PathBuf,
        /// Slow-motion factor of the recording
        #[arg(long)]
        slowmo: Option<u32>,
        /// Path to the tool, overriding the config
        #[arg(long)]
        tool: Option<PathBuf>,
    },

    /// Print the kinematics of one marker
    Kinematics {
        video: PathBuf,
        #[arg(long)]
        marker: String,
        /// Reference line in frame pixels plus its length in metres: x1,y1,x2,y2,len
        #[arg(long, value_parser = parse_line)]
        calibrate: Option<LineArg>,
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },

    /// Print the marker nearest to a point
    Select {
        video: PathBuf,
        #[arg(long, default_value_t = 0)]
        frame: usize,
        /// Frame-pixel position: x,y
        #[arg(long, value_parser = parse_point)]
        at: FramePoint,
    },

    /// Draw the overlay for one frame to a PNG
    Render {
        video: PathBuf,
        #[arg(long, default_value_t = 0)]
        frame: usize,
        #[arg(long)]
        marker: Option<String>,
        #[arg(long)]
        trail: bool,
        #[arg(long)]
        relative_trail: bool,
        #[arg(long)]
        no_skeleton: bool,
        #[arg(long, value_parser = parse_line)]
        calibrate: Option<LineArg>,
        /// Frame image to draw on; a blank canvas otherwise
        #[arg(long)]
        background: Option<PathBuf>,
        /// Canvas size when no background is given: WxH
        #[arg(long, value_parser = parse_size, default_value = "1280x720")]
        size: (u32, u32),
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LineArg {
    start: FramePoint,
    end: FramePoint,
    length: f64,
}

fn numbers(s: &str, n: usize) -> Result<Vec<f64>, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|_| format!("not a number: {v:?}")))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() != n {
        return Err(format!("expected {n} comma-separated values, got {}", values.len()));
    }
    Ok(values)
}

fn parse_point(s: &str) -> Result<FramePoint, String> {
    let v = numbers(s, 2)?;
    Ok(FramePoint::new(v[0], v[1]))
}

fn parse_line(s: &str) -> Result<LineArg, String> {
    let v = numbers(s, 5)?;
    Ok(LineArg { start: FramePoint::new(v[0], v[1]), end: FramePoint::new(v[2], v[3]), length: v[4] })
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s.split_once(['x', 'X']).ok_or_else(|| format!("expected WxH, got {s:?}"))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("bad width {w:?}"))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("bad height {h:?}"))?;
    if w == 0 || h == 0 {
        return Err("size must be non-zero".into());
    }
    Ok((w, h))
}

fn run(cli: Cli, out: &mut dyn Write) -> Result<()> {
    let cfg = AppConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Analyze { video, slowmo, tool } => commands::analyze(&cfg, &video, slowmo, tool, out),
        Commands::Kinematics { video, marker, calibrate, format } => {
            commands::kinematics(&cfg, &video, &marker, calibrate, format, out)
        }
        Commands::Select { video, frame, at } => commands::select(&cfg, &video, frame, at, out),
        Commands::Render { video, frame, marker, trail, relative_trail, no_skeleton, calibrate, background, size, output } => {
            let toggles = overlay::OverlayToggles { skeleton: !no_skeleton, trail, relative_trail };
            let request = commands::RenderRequest { frame, marker, toggles, calibrate, background, size, output };
            commands::render(&cfg, &video, request, out)
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}
