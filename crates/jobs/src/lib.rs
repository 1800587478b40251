//! Background runner for the external pose-analysis tool.
//!
//! One run is one worker thread. Progress arrives on a channel as trimmed
//! output lines, followed by exactly one [`AnalysisEvent::Finished`].

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::{sync::Arc, thread, time::Duration};
use thiserror::Error;
use uuid::Uuid;

pub const TOOL_NAME: &str = "sports2d";
pub const SUCCESS_MESSAGE: &str = "Analysis completed successfully!";
const POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AnalysisFailure {
    #[error("sports2d not found. Install with: pip install sports2d")]
    ToolNotFound,
    #[error("sports2d exited with code {}", .0.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    ExitCode(Option<i32>),
    #[error("Error: {0}")]
    Launch(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisOutcome {
    Succeeded(String),
    Failed(AnalysisFailure),
    Cancelled,
}

impl AnalysisOutcome {
    pub fn is_success(&self) -> bool { matches!(self, AnalysisOutcome::Succeeded(_)) }

    /// The line shown to the user when the run ends.
    pub fn message(&self) -> String {
        match self {
            AnalysisOutcome::Succeeded(msg) => msg.clone(),
            AnalysisOutcome::Failed(f) => f.to_string(),
            AnalysisOutcome::Cancelled => "Analysis cancelled".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisEvent {
    Started,
    Progress(String),
    Finished(AnalysisOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub video: PathBuf,
    /// Playback slow-down of the source video; values below 1 are raised to 1.
    pub slowmo_factor: u32,
}

impl AnalysisRequest {
    pub fn new(video: impl Into<PathBuf>, slowmo_factor: u32) -> Self {
        Self { video: video.into(), slowmo_factor: slowmo_factor.max(1) }
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "--video_input".into(),
            self.video.display().to_string(),
            "--slowmo_factor".into(),
            self.slowmo_factor.max(1).to_string(),
            "--fill_large_gaps_with".into(),
            "zeros".into(),
            "--display_angle_values_on".into(),
            "none".into(),
        ]
    }

    /// Directory the tool runs in; its outputs land next to the video.
    pub fn working_dir(&self) -> &Path {
        match self.video.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    fn banner(&self) -> String {
        let name = self.video.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        format!("Running: {TOOL_NAME} --video_input {name}...")
    }
}

/// Where to find the tool. Serialized as the `analysis` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub tool: Option<PathBuf>,
    /// Interpreter whose `Scripts/` directory may hold the tool.
    pub python: Option<PathBuf>,
    pub slowmo_factor: u32,
}

impl Default for AnalysisSettings {
    fn default() -> Self { Self { tool: None, python: None, slowmo_factor: 1 } }
}

impl AnalysisSettings {
    /// Explicit path, then `Scripts/` next to the interpreter, then `PATH`.
    pub fn resolve_tool(&self) -> Option<PathBuf> {
        if let Some(tool) = &self.tool {
            return Some(tool.clone());
        }
        let scripts = self.python.as_deref().and_then(Path::parent).map(|dir| dir.join("Scripts"));
        if let Some(dir) = scripts {
            for name in [format!("{TOOL_NAME}.exe"), TOOL_NAME.to_string()] {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        which::which(TOOL_NAME).ok()
    }
}

pub struct AnalysisHandle {
    pub id: String,
    pub rx_events: Receiver<AnalysisEvent>,
    cancelled: Arc<AtomicBool>,
    child: Arc<Mutex<Option<Child>>>,
}

impl AnalysisHandle {
    /// Kills the tool if it is running. The run still ends with one
    /// `Finished(Cancelled)` event.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(child) = self.child.lock().as_mut() {
            let _ = child.kill();
        }
        tracing::info!(id = %self.id, "analysis cancel requested");
    }

    /// Blocks until the run ends, returning its outcome. Progress lines are
    /// handed to `on_line` in order.
    pub fn wait(&self, mut on_line: impl FnMut(&str)) -> AnalysisOutcome {
        for event in self.rx_events.iter() {
            match event {
                AnalysisEvent::Started => {}
                AnalysisEvent::Progress(line) => on_line(&line),
                AnalysisEvent::Finished(outcome) => return outcome,
            }
        }
        AnalysisOutcome::Failed(AnalysisFailure::Launch("worker stopped".into()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisRunner {
    settings: AnalysisSettings,
}

impl AnalysisRunner {
    pub fn new(settings: AnalysisSettings) -> Self { Self { settings } }

    pub fn start(&self, request: AnalysisRequest) -> AnalysisHandle {
        let (tx_events, rx_events) = unbounded::<AnalysisEvent>();
        let id = Uuid::new_v4().to_string();
        let cancelled = Arc::new(AtomicBool::new(false));
        let child = Arc::new(Mutex::new(None));
        let tool = self.settings.resolve_tool();

        {
            let id = id.clone();
            let cancelled = cancelled.clone();
            let child = child.clone();
            thread::spawn(move || {
                let _ = tx_events.send(AnalysisEvent::Started);
                let outcome = run(tool, &request, &tx_events, &cancelled, &child);
                match &outcome {
                    AnalysisOutcome::Failed(f) => tracing::warn!(%id, error = %f, "analysis failed"),
                    other => tracing::info!(%id, outcome = ?other, "analysis finished"),
                }
                let _ = tx_events.send(AnalysisEvent::Finished(outcome));
            });
        }

        AnalysisHandle { id, rx_events, cancelled, child }
    }
}

fn run(
    tool: Option<PathBuf>,
    request: &AnalysisRequest,
    tx: &Sender<AnalysisEvent>,
    cancelled: &AtomicBool,
    slot: &Mutex<Option<Child>>,
) -> AnalysisOutcome {
    let Some(tool) = tool else { return AnalysisOutcome::Failed(AnalysisFailure::ToolNotFound) };
    if cancelled.load(Ordering::SeqCst) {
        return AnalysisOutcome::Cancelled;
    }
    let _ = tx.send(AnalysisEvent::Progress(request.banner()));
    tracing::info!(tool = %tool.display(), video = %request.video.display(), "starting analysis");

    let mut cmd = Command::new(&tool);
    cmd.args(request.args());
    cmd.current_dir(request.working_dir());
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return AnalysisOutcome::Failed(AnalysisFailure::ToolNotFound)
        }
        Err(e) => return AnalysisOutcome::Failed(AnalysisFailure::Launch(e.to_string())),
    };
    let readers: Vec<_> = [
        child.stdout.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
        child.stderr.take().map(|s| Box::new(s) as Box<dyn Read + Send>),
    ]
    .into_iter()
    .flatten()
    .map(|stream| {
        let tx = tx.clone();
        thread::spawn(move || forward_lines(stream, &tx))
    })
    .collect();

    *slot.lock() = Some(child);
    if cancelled.load(Ordering::SeqCst) {
        if let Some(c) = slot.lock().as_mut() {
            let _ = c.kill();
        }
    }

    for r in readers {
        let _ = r.join();
    }

    let status = loop {
        let polled = match slot.lock().as_mut() {
            Some(c) => c.try_wait(),
            None => return AnalysisOutcome::Failed(AnalysisFailure::Launch("child process lost".into())),
        };
        match polled {
            Ok(Some(st)) => break st,
            Ok(None) => thread::sleep(POLL),
            Err(e) => return AnalysisOutcome::Failed(AnalysisFailure::Launch(e.to_string())),
        }
    };
    slot.lock().take();

    if cancelled.load(Ordering::SeqCst) {
        AnalysisOutcome::Cancelled
    } else if status.success() {
        AnalysisOutcome::Succeeded(SUCCESS_MESSAGE.to_string())
    } else {
        AnalysisOutcome::Failed(AnalysisFailure::ExitCode(status.code()))
    }
}

fn forward_lines(stream: Box<dyn Read + Send>, tx: &Sender<AnalysisEvent>) {
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::warn!(error = %e, "tool output stream closed early");
                break;
            }
        }
        // the tool's console encoding is not always UTF-8
        let line = String::from_utf8_lossy(&buf);
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            let _ = tx.send(AnalysisEvent::Progress(trimmed.to_string()));
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn runner(tool: PathBuf) -> AnalysisRunner {
        AnalysisRunner::new(AnalysisSettings { tool: Some(tool), ..AnalysisSettings::default() })
    }

    fn collect(handle: &AnalysisHandle) -> (Vec<AnalysisEvent>, AnalysisOutcome) {
        let mut events = Vec::new();
        loop {
            let ev = handle.rx_events.recv_timeout(TIMEOUT).unwrap();
            if let AnalysisEvent::Finished(outcome) = ev {
                return (events, outcome);
            }
            events.push(ev);
        }
    }

    #[test]
    fn successful_run_streams_both_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "sports2d", "echo \"$@\"\necho\necho '  warn line  ' >&2\npwd\nexit 0");
        let video = dir.path().join("clip.mp4");
        let handle = runner(tool).start(AnalysisRequest::new(&video, 2));
        let (events, outcome) = collect(&handle);

        assert_eq!(events[0], AnalysisEvent::Started);
        assert_eq!(events[1], AnalysisEvent::Progress("Running: sports2d --video_input clip.mp4...".into()));
        let lines: Vec<String> = events[2..]
            .iter()
            .map(|e| match e {
                AnalysisEvent::Progress(l) => l.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        let expected_args = format!(
            "--video_input {} --slowmo_factor 2 --fill_large_gaps_with zeros --display_angle_values_on none",
            video.display()
        );
        assert!(lines.contains(&expected_args));
        assert!(lines.contains(&"warn line".to_string()));
        assert_eq!(lines.len(), 3);
        let cwd = lines.iter().find(|l| l.starts_with('/') && !l.contains("--")).unwrap();
        assert_eq!(std::fs::canonicalize(cwd).unwrap(), std::fs::canonicalize(dir.path()).unwrap());

        assert_eq!(outcome, AnalysisOutcome::Succeeded(SUCCESS_MESSAGE.into()));
        assert!(handle.rx_events.recv_timeout(Duration::from_millis(200)).is_err());
    }

    #[test]
    fn non_utf8_output_does_not_stop_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        let body = "printf 'caf\\351 frame\\n'\ni=0\nwhile [ $i -lt 3000 ]; do echo \"frame $i\"; i=$((i+1)); done\nexit 0";
        let tool = script(dir.path(), "sports2d", body);
        let handle = runner(tool).start(AnalysisRequest::new(dir.path().join("v.mov"), 1));
        let (events, outcome) = collect(&handle);

        assert_eq!(outcome, AnalysisOutcome::Succeeded(SUCCESS_MESSAGE.into()));
        let lines: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                AnalysisEvent::Progress(l) => Some(l.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(lines.len(), 1 + 1 + 3000);
        assert_eq!(lines[1], "caf\u{FFFD} frame");
        assert_eq!(lines.last(), Some(&"frame 2999"));
    }

    #[test]
    fn non_zero_exit_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "sports2d", "echo failing\nexit 3");
        let handle = runner(tool).start(AnalysisRequest::new(dir.path().join("v.mov"), 1));
        let (_, outcome) = collect(&handle);
        assert_eq!(outcome, AnalysisOutcome::Failed(AnalysisFailure::ExitCode(Some(3))));
        assert_eq!(outcome.message(), "sports2d exited with code 3");
    }

    #[test]
    fn missing_tool_is_a_terminal_event() {
        let dir = tempfile::tempdir().unwrap();
        let handle = runner(dir.path().join("nope")).start(AnalysisRequest::new(dir.path().join("v.mov"), 1));
        let (events, outcome) = collect(&handle);
        assert_eq!(events[0], AnalysisEvent::Started);
        assert_eq!(outcome, AnalysisOutcome::Failed(AnalysisFailure::ToolNotFound));
        assert_eq!(outcome.message(), "sports2d not found. Install with: pip install sports2d");
    }

    #[test]
    fn cancel_kills_the_tool() {
        let dir = tempfile::tempdir().unwrap();
        let tool = script(dir.path(), "sports2d", "echo started\nexec sleep 30");
        let handle = runner(tool).start(AnalysisRequest::new(dir.path().join("v.mov"), 1));
        loop {
            if handle.rx_events.recv_timeout(TIMEOUT).unwrap() == AnalysisEvent::Progress("started".into()) {
                break;
            }
        }
        handle.cancel();
        let outcome = handle.wait(|_| {});
        assert_eq!(outcome, AnalysisOutcome::Cancelled);
    }

    #[test]
    fn tool_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("Scripts");
        std::fs::create_dir(&scripts).unwrap();
        let bundled = script(&scripts, "sports2d", "exit 0");
        let python = dir.path().join("python");

        let settings = AnalysisSettings { python: Some(python.clone()), ..AnalysisSettings::default() };
        assert_eq!(settings.resolve_tool(), Some(bundled));

        let explicit = dir.path().join("custom");
        let settings = AnalysisSettings { tool: Some(explicit.clone()), python: Some(python), ..AnalysisSettings::default() };
        assert_eq!(settings.resolve_tool(), Some(explicit));
    }

    #[test]
    fn request_normalises_inputs() {
        let req = AnalysisRequest::new("clip.mp4", 0);
        assert_eq!(req.slowmo_factor, 1);
        assert_eq!(req.working_dir(), Path::new("."));
        assert_eq!(AnalysisFailure::ExitCode(None).to_string(), "sports2d exited with code unknown");
        assert_eq!(AnalysisFailure::Launch("boom".into()).to_string(), "Error: boom");
    }
}
