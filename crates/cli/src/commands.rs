use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use jobs::{AnalysisRequest, AnalysisRunner};
use kinematics::KinematicsSnapshot;
use overlay::{blank_canvas, load_background, save_png, OverlayToggles, Painter};
use session::Session;
use timeseries::{AnalysisResults, FramePoint};

use crate::config::AppConfig;
use crate::{Format, LineArg};

pub fn analyze(cfg: &AppConfig, video: &Path, slowmo: Option<u32>, tool: Option<PathBuf>, out: &mut dyn Write) -> Result<()> {
    let mut settings = cfg.analysis.clone();
    if tool.is_some() {
        settings.tool = tool;
    }
    let request = AnalysisRequest::new(video, slowmo.unwrap_or(settings.slowmo_factor));
    let handle = AnalysisRunner::new(settings).start(request);
    let mut write_err = None;
    let outcome = handle.wait(|line| {
        if let Err(e) = writeln!(out, "{line}") {
            write_err.get_or_insert(e);
        }
    });
    if let Some(e) = write_err {
        return Err(e).context("writing progress");
    }
    if !outcome.is_success() {
        bail!(outcome.message());
    }
    writeln!(out, "{}", outcome.message())?;
    match AnalysisResults::discover(video) {
        Some(results) if !results.is_empty() => {
            let markers = results.markers.as_ref().map_or(0, |m| m.marker_list.len());
            let angles = results.angles.as_ref().map_or(0, |a| a.angle_list.len());
            writeln!(out, "Results loaded: {markers} markers, {angles} angles")?;
        }
        _ => tracing::warn!(video = %video.display(), "analysis finished but produced no readable results"),
    }
    Ok(())
}

/// Loads the analysis next to `video`; playback length comes from the
/// position file.
fn open(cfg: &AppConfig, video: &Path) -> Result<Session> {
    let results = AnalysisResults::discover(video)
        .ok_or_else(|| anyhow!("no analysis folder found for {}", video.display()))?;
    let (fps, frames) = {
        let markers = results.markers.as_ref().context("position file missing or unreadable")?;
        (markers.data_rate, markers.rows())
    };
    let mut session = Session::new(cfg.session()).context("invalid kinematics settings")?;
    session.load_results(results, fps, frames);
    Ok(session)
}

fn select_marker(session: &mut Session, marker: &str) -> Result<()> {
    if session.select(marker).is_none() {
        let known = session.markers().map(|m| m.marker_list.join(", ")).unwrap_or_default();
        bail!("unknown marker {marker:?}; available: {known}");
    }
    Ok(())
}

fn apply_calibration(session: &mut Session, line: Option<LineArg>) -> Result<()> {
    if let Some(line) = line {
        session.calibrate(line.start, line.end, line.length).context("calibration rejected")?;
        tracing::info!("{}", session.calibration().status_text());
    }
    Ok(())
}

pub fn kinematics(
    cfg: &AppConfig,
    video: &Path,
    marker: &str,
    calibrate: Option<LineArg>,
    format: Format,
    out: &mut dyn Write,
) -> Result<()> {
    let mut session = open(cfg, video)?;
    select_marker(&mut session, marker)?;
    apply_calibration(&mut session, calibrate)?;
    let snapshot = session.snapshot().context("no kinematics for the selected marker")?;
    match format {
        Format::Csv => write_csv(&snapshot, out)?,
        Format::Json => {
            serde_json::to_writer_pretty(&mut *out, &*snapshot)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_csv(s: &KinematicsSnapshot, out: &mut dyn Write) -> Result<()> {
    let mut header = String::from("time,x,y,vx,vy,vtotal,ax,ay,atotal");
    if s.angle.is_some() {
        header.push_str(",angle,angvel,angacc");
    }
    writeln!(out, "# units: {}, {}, {}", s.units.position, s.units.velocity, s.units.acceleration)?;
    writeln!(out, "{header}")?;
    for i in 0..s.time.len() {
        let at = |v: &[f64]| v.get(i).copied().unwrap_or(f64::NAN);
        let mut row = s.time[i].to_string();
        for v in [&s.x, &s.y, &s.vx, &s.vy, &s.vtotal, &s.ax, &s.ay, &s.atotal] {
            row.push_str(&format!(",{}", at(v.as_slice())));
        }
        if let Some(a) = &s.angle {
            for v in [&a.angle, &a.angvel, &a.angacc] {
                row.push_str(&format!(",{}", at(v.as_slice())));
            }
        }
        writeln!(out, "{row}")?;
    }
    Ok(())
}

pub fn select(cfg: &AppConfig, video: &Path, frame: usize, at: FramePoint, out: &mut dyn Write) -> Result<()> {
    let mut session = open(cfg, video)?;
    session.seek(frame)?;
    match session.select_at(at) {
        Some(name) => writeln!(out, "{name}")?,
        None => writeln!(out, "none")?,
    }
    Ok(())
}

pub struct RenderRequest {
    pub frame: usize,
    pub marker: Option<String>,
    pub toggles: OverlayToggles,
    pub calibrate: Option<LineArg>,
    pub background: Option<PathBuf>,
    pub size: (u32, u32),
    pub output: PathBuf,
}

pub fn render(cfg: &AppConfig, video: &Path, req: RenderRequest, out: &mut dyn Write) -> Result<()> {
    let mut session = open(cfg, video)?;
    session.seek(req.frame)?;
    if let Some(marker) = &req.marker {
        select_marker(&mut session, marker)?;
    }
    apply_calibration(&mut session, req.calibrate)?;
    session.toggles = req.toggles;

    let list = session.overlay().context("no marker data to draw")?;
    let mut img = match &req.background {
        Some(path) => load_background(path).with_context(|| format!("reading {}", path.display()))?,
        None => blank_canvas(req.size.0, req.size.1),
    };
    let painter = Painter::new(&cfg.overlay).context("loading label font")?;
    painter.paint(&list, &mut img);
    save_png(&img, &req.output).with_context(|| format!("writing {}", req.output.display()))?;
    tracing::info!(frame = req.frame, primitives = list.len(), "rendered overlay");
    writeln!(out, "{}", req.output.display())?;
    Ok(())
}
