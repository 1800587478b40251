use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use kinematics::NO_DATA;
use session::{Session, SessionConfig};
use timeseries::{AnalysisPaths, FramePoint};

const RATE: f64 = 30.0;
const FRAMES: usize = 100;

fn write_trc(path: &Path, markers: &[(&str, fn(usize) -> (f64, f64))]) {
    let mut out = String::new();
    writeln!(out, "PathFileType\t4\t(X/Y/Z)\t{}", path.display()).unwrap();
    writeln!(out, "DataRate\tCameraRate\tNumFrames\tNumMarkers\tUnits").unwrap();
    writeln!(out, "{RATE}\t{RATE}\t{FRAMES}\t{}\tpx", markers.len()).unwrap();
    out.push_str("Frame#\tTime");
    for (name, _) in markers {
        write!(out, "\t{name}\t\t").unwrap();
    }
    out.push_str("\n\n");
    for f in 0..FRAMES {
        write!(out, "{f}\t{}", f as f64 / RATE).unwrap();
        for (_, pos) in markers {
            let (x, y) = pos(f);
            write!(out, "\t{x}\t{y}\t0").unwrap();
        }
        out.push('\n');
    }
    std::fs::write(path, out).unwrap();
}

fn write_mot(path: &Path, columns: &[(&str, fn(usize) -> f64)]) {
    let mut out = String::from("Coordinates\nversion=1\nnRows=100\ninDegrees=yes\nendheader\ntime");
    for (name, _) in columns {
        write!(out, "\t{name}").unwrap();
    }
    out.push('\n');
    for f in 0..FRAMES {
        write!(out, "{}", f as f64 / RATE).unwrap();
        for (_, angle) in columns {
            write!(out, "\t{}", angle(f)).unwrap();
        }
        out.push('\n');
    }
    std::fs::write(path, out).unwrap();
}

/// Lays out analysis output for `clip.mp4` the way the tool does.
fn analysed_clip(dir: &Path) -> PathBuf {
    let video = dir.join("clip.mp4");
    let paths = AnalysisPaths::for_video(&video);
    std::fs::create_dir_all(&paths.dir).unwrap();
    write_trc(
        &paths.trc,
        &[
            ("RKnee", |i: usize| (100.0 + i as f64, 200.0)),
            ("LElbow", |i: usize| (300.0, 150.0 + 0.5 * i as f64)),
            ("Hip", |_: usize| (220.0, 180.0)),
        ],
    );
    write_mot(&paths.mot, &[("right knee", |i: usize| 90.0 + i as f64), ("trunk", |_: usize| 5.0)]);
    video
}

fn loaded() -> (tempfile::TempDir, Session) {
    let dir = tempfile::tempdir().unwrap();
    let video = analysed_clip(dir.path());
    let mut s = Session::new(SessionConfig::default()).unwrap();
    assert_eq!(s.load_video(&video, RATE, FRAMES), "Loaded: clip_Sports2D");
    (dir, s)
}

fn near(v: &[f64], target: f64, tol: f64) -> bool { v.iter().all(|x| (x - target).abs() < tol) }

#[test]
fn scenario_a_uncalibrated_linear_motion() {
    let (_dir, mut s) = loaded();
    s.select("RKnee").unwrap();
    let snap = s.snapshot().unwrap();
    assert_eq!(snap.len(), FRAMES);
    assert_eq!(snap.units.velocity, "px/s");
    assert!(near(&snap.vx, 30.0, 1e-6));
    assert!(near(&snap.vy, 0.0, 1e-9));
    assert!(near(&snap.ax, 0.0, 1e-6));
    assert!(near(&snap.ay, 0.0, 1e-9));
}

#[test]
fn scenario_b_calibration_rescales() {
    let (_dir, mut s) = loaded();
    s.select("RKnee").unwrap();
    let ppu = s.calibrate(FramePoint::new(0.0, 0.0), FramePoint::new(100.0, 0.0), 2.0).unwrap();
    assert_eq!(ppu, 50.0);
    assert_eq!(s.calibration().scale_to_unit(100.0), 2.0);
    let snap = s.snapshot().unwrap();
    assert!(near(&snap.vx, 0.6, 1e-9));
    assert_eq!(s.calibration().status_text(), "Calibrated: 1 m = 50.0 px");
    let list = s.overlay().unwrap();
    assert!(list.labels().any(|l| l == "2.0000 m"));
}

#[test]
fn scenario_c_marker_without_angle_shows_no_data() {
    let (_dir, mut s) = loaded();
    s.seek(10).unwrap();
    s.select("RKnee").unwrap();
    let knee = s.stats().unwrap();
    assert_eq!(knee.angle, Some(100.0));

    s.select("LElbow").unwrap();
    let snap = s.snapshot().unwrap();
    assert!(snap.angle.is_none());
    let stats = s.stats().unwrap();
    assert_eq!(stats.angle, None);
    assert_eq!(stats.angular_velocity, None);
    let rows = stats.rows(&snap);
    for row in &rows[3..] {
        assert_eq!(row.1, NO_DATA);
    }
    assert!(s.overlay().unwrap().labels().all(|l| !l.ends_with("deg")));
}

#[test]
fn selection_by_click_and_playback() {
    let (_dir, mut s) = loaded();
    s.clock_mut().play();
    for _ in 0..20 {
        s.clock_mut().tick();
    }
    assert_eq!(s.current_frame(), 20);
    // RKnee sits at (120, 200) on frame 20
    assert_eq!(s.select_at(FramePoint::new(118.0, 203.0)), Some("RKnee"));
    assert_eq!(s.select_at(FramePoint::new(600.0, 600.0)), None);
    assert_eq!(s.selected(), Some("RKnee"));
    assert_eq!(s.clock().time_label(), "0.67 / 3.33");
}

#[test]
fn unreadable_angle_file_leaves_positions_usable() {
    let dir = tempfile::tempdir().unwrap();
    let video = analysed_clip(dir.path());
    std::fs::write(AnalysisPaths::for_video(&video).mot, "endheader\ntime\tright knee\n0\tbroken\n").unwrap();
    let mut s = Session::new(SessionConfig::default()).unwrap();
    s.load_video(&video, RATE, FRAMES);
    assert!(s.angles().is_none());
    s.select("RKnee").unwrap();
    assert!(s.snapshot().unwrap().angle.is_none());
}
