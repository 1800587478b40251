use kinematics::{KinematicsSnapshot, ReferenceLine};
use timeseries::{Frame, FramePoint, Marker, MarkerTable};

use crate::style::{Color, OverlayStyle, OverlayToggles};
use crate::trail::{absolute_trail, relative_trail};

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Line { from: FramePoint, to: FramePoint, color: Color, width: u32 },
    Dot { center: FramePoint, radius: i32, color: Color },
    /// `anchor` is the left end of the text baseline.
    Label { anchor: FramePoint, text: String, color: Color },
}

/// Primitives in frame-pixel coordinates, in draw order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    pub primitives: Vec<Primitive>,
}

impl DisplayList {
    pub fn lines(&self) -> impl Iterator<Item = (&FramePoint, &FramePoint, &Color)> + '_ {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Line { from, to, color, .. } => Some((from, to, color)),
            _ => None,
        })
    }

    pub fn dots(&self) -> impl Iterator<Item = (&FramePoint, i32)> + '_ {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Dot { center, radius, .. } => Some((center, *radius)),
            _ => None,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.primitives.iter().filter_map(|p| match p {
            Primitive::Label { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize { self.primitives.len() }

    pub fn is_empty(&self) -> bool { self.primitives.is_empty() }
}

/// Everything a frame's overlay depends on.
#[derive(Debug, Clone, Copy)]
pub struct OverlayInput<'a> {
    pub markers: &'a MarkerTable,
    pub selected: Option<&'a str>,
    pub kinematics: Option<&'a KinematicsSnapshot>,
    pub calibration: Option<&'a ReferenceLine>,
}

#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

const LABEL_OFFSET: (f64, f64) = (14.0, -14.0);
const ANGLE_OFFSET: (f64, f64) = (14.0, 18.0);
const CAL_LABEL_OFFSET: (f64, f64) = (10.0, -10.0);
const CAL_DASH: f64 = 12.0;
const CAL_GAP: f64 = 8.0;
const CAL_END_RADIUS: i32 = 5;
const CAL_WIDTH: u32 = 3;

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self { Self { style } }

    pub fn style(&self) -> &OverlayStyle { &self.style }

    pub fn build(&self, input: &OverlayInput<'_>, frame: Frame, toggles: OverlayToggles) -> DisplayList {
        let mut out = Vec::new();
        if toggles.trail || toggles.relative_trail {
            self.trails(input, frame, toggles, &mut out);
        }
        if toggles.skeleton {
            self.skeleton(input.markers, frame, &mut out);
        }
        self.dots(input, frame, &mut out);
        if let Some(line) = input.calibration {
            self.calibration_line(line, &mut out);
        }
        DisplayList { primitives: out }
    }

    fn trails(&self, input: &OverlayInput<'_>, frame: Frame, toggles: OverlayToggles, out: &mut Vec<Primitive>) {
        let Some(series) = input.selected.and_then(|name| input.markers.marker(name)) else { return };
        let width = self.style.line_width;
        if toggles.trail {
            for seg in absolute_trail(series, frame, self.style.trail_len) {
                out.push(Primitive::Line { from: seg.from, to: seg.to, color: self.style.trail_color(seg.intensity), width });
            }
        }
        if toggles.relative_trail {
            if let Some(reference) = input.markers.marker(Marker::REFERENCE.as_str()) {
                for seg in relative_trail(series, reference, frame, self.style.trail_len) {
                    out.push(Primitive::Line { from: seg.from, to: seg.to, color: self.style.relative_trail, width });
                }
            }
        }
    }

    fn skeleton(&self, markers: &MarkerTable, frame: Frame, out: &mut Vec<Primitive>) {
        for (a, b) in &self.style.bones {
            let (Some(sa), Some(sb)) = (markers.marker(a), markers.marker(b)) else { continue };
            if let (Some(from), Some(to)) = (sa.position(frame), sb.position(frame)) {
                out.push(Primitive::Line { from, to, color: self.style.bone, width: self.style.line_width });
            }
        }
    }

    fn dots(&self, input: &OverlayInput<'_>, frame: Frame, out: &mut Vec<Primitive>) {
        let mut labels = Vec::new();
        for series in input.markers.iter() {
            let Some(p) = series.position(frame) else { continue };
            if input.selected != Some(series.name.as_str()) {
                out.push(Primitive::Dot { center: p, radius: self.style.dot_radius, color: self.style.dot });
                continue;
            }
            out.push(Primitive::Dot { center: p, radius: self.style.selected_radius, color: self.style.selected });
            labels.push(Primitive::Label { anchor: offset(p, LABEL_OFFSET), text: series.name.clone(), color: self.style.selected });
            if let Some(angle) = current_angle(input.kinematics, &series.name, frame) {
                labels.push(Primitive::Label {
                    anchor: offset(p, ANGLE_OFFSET),
                    text: format!("{angle:.1} deg"),
                    color: self.style.angle_text,
                });
            }
        }
        out.extend(labels);
    }

    fn calibration_line(&self, line: &ReferenceLine, out: &mut Vec<Primitive>) {
        let color = self.style.calibration;
        for (from, to) in dashes(line.start, line.end) {
            out.push(Primitive::Line { from, to, color, width: CAL_WIDTH });
        }
        for center in [line.start, line.end] {
            out.push(Primitive::Dot { center, radius: CAL_END_RADIUS, color });
        }
        out.push(Primitive::Label {
            anchor: offset(line.start.midpoint(line.end), CAL_LABEL_OFFSET),
            text: format!("{:.4} m", line.real_length),
            color,
        });
    }
}

/// The angle is only shown when the snapshot belongs to the marker being drawn.
fn current_angle(kinematics: Option<&KinematicsSnapshot>, marker: &str, frame: Frame) -> Option<f64> {
    let snapshot = kinematics.filter(|k| k.marker == marker)?;
    let angle = *snapshot.angle.as_ref()?.angle.get(frame)?;
    (!angle.is_nan()).then_some(angle)
}

fn offset(p: FramePoint, (dx, dy): (f64, f64)) -> FramePoint { FramePoint::new(p.x + dx, p.y + dy) }

fn dashes(start: FramePoint, end: FramePoint) -> Vec<(FramePoint, FramePoint)> {
    let length = start.distance(end);
    if length == 0.0 {
        return Vec::new();
    }
    let (ux, uy) = ((end.x - start.x) / length, (end.y - start.y) / length);
    let at = |d: f64| FramePoint::new(start.x + ux * d, start.y + uy * d);
    let mut out = Vec::new();
    let mut d = 0.0;
    while d < length {
        out.push((at(d), at((d + CAL_DASH).min(length))));
        d += CAL_DASH + CAL_GAP;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinematics::{AngleKinematics, Calibration, KinematicsConfig, KinematicsEngine};
    use timeseries::AngleGroup;

    fn table(frames: usize, markers: &[(&str, &dyn Fn(usize) -> (f64, f64))]) -> MarkerTable {
        let mut text = format!("h\nh\n30 30 {frames} {}\nFrame#\tTime", markers.len());
        for (name, _) in markers {
            text.push_str(&format!("\t{name}\t\t"));
        }
        text.push_str("\n\n");
        for f in 0..frames {
            text.push_str(&format!("{f}\t{}", f as f64 / 30.0));
            for (_, gen) in markers {
                let (x, y) = gen(f);
                text.push_str(&format!("\t{x}\t{y}\t0"));
            }
            text.push('\n');
        }
        MarkerTable::parse(&text).unwrap()
    }

    fn body(frames: usize) -> MarkerTable {
        table(frames, &[
            ("Neck", &|_| (300.0, 100.0)),
            ("Hip", &|_| (300.0, 300.0)),
            ("RHip", &|_| (280.0, 300.0)),
            ("RKnee", &|i| if i == 5 { (-1.0, -1.0) } else { (280.0, 400.0) }),
            ("LElbow", &|i| if i == 6 { (f64::NAN, f64::NAN) } else { (350.0, 180.0) }),
        ])
    }

    fn input(markers: &MarkerTable) -> OverlayInput<'_> {
        OverlayInput { markers, selected: None, kinematics: None, calibration: None }
    }

    #[test]
    fn skeleton_draws_bones_with_both_ends_present() {
        let t = body(10);
        let list = OverlayRenderer::default().build(&input(&t), 0, OverlayToggles::default());
        // Neck-Hip, Hip-RHip, RHip-RKnee
        assert_eq!(list.lines().count(), 3);
        assert_eq!(list.dots().count(), 5);
    }

    #[test]
    fn missing_marker_is_left_out_of_bones_and_dots() {
        let t = body(10);
        let r = OverlayRenderer::default();
        let list = r.build(&input(&t), 5, OverlayToggles::default());
        assert_eq!(list.lines().count(), 2);
        assert_eq!(list.dots().count(), 4);
        let list = r.build(&input(&t), 6, OverlayToggles::default());
        assert_eq!(list.dots().count(), 4);
        assert!(list.dots().all(|(c, _)| c.x > 0.0 && c.y > 0.0));
    }

    #[test]
    fn toggles_are_independent() {
        let t = body(10);
        let off = OverlayToggles { skeleton: false, trail: false, relative_trail: false };
        let list = OverlayRenderer::default().build(&input(&t), 0, off);
        assert_eq!(list.lines().count(), 0);
        assert_eq!(list.dots().count(), 5);
    }

    #[test]
    fn selected_marker_is_highlighted_and_labelled() {
        let t = body(10);
        let style = OverlayStyle::default();
        let list = OverlayRenderer::new(style.clone()).build(
            &OverlayInput { selected: Some("RKnee"), ..input(&t) },
            0,
            OverlayToggles::default(),
        );
        let big: Vec<_> = list.dots().filter(|(_, r)| *r == style.selected_radius).collect();
        assert_eq!(big.len(), 1);
        assert_eq!(*big[0].0, FramePoint::new(280.0, 400.0));
        assert_eq!(list.labels().collect::<Vec<_>>(), vec!["RKnee"]);
    }

    #[test]
    fn angle_label_comes_from_the_matching_snapshot() {
        let t = body(20);
        let engine = KinematicsEngine::new(KinematicsConfig::default()).unwrap();
        let mut snap = engine.compute(&t, "RKnee", None, &Calibration::default()).unwrap();
        snap.angle = Some(AngleKinematics {
            group: AngleGroup::RightKnee,
            angle: vec![123.4; 20],
            angvel: vec![0.0; 20],
            angacc: vec![0.0; 20],
        });
        let r = OverlayRenderer::default();
        let with = |selected: &'static str| r.build(&OverlayInput { selected: Some(selected), kinematics: Some(&snap), ..input(&t) }, 2, OverlayToggles::default());
        assert_eq!(with("RKnee").labels().collect::<Vec<_>>(), vec!["RKnee", "123.4 deg"]);
        // a snapshot for another marker is never shown
        assert_eq!(with("Neck").labels().collect::<Vec<_>>(), vec!["Neck"]);
    }

    #[test]
    fn trails_follow_the_selection() {
        let t = table(40, &[("RWrist", &|i| (50.0 + i as f64, 80.0)), ("Hip", &|_| (60.0, 60.0))]);
        let toggles = OverlayToggles { skeleton: false, trail: true, relative_trail: true };
        let r = OverlayRenderer::default();
        let none = r.build(&input(&t), 30, toggles);
        assert_eq!(none.lines().count(), 0);
        let list = r.build(&OverlayInput { selected: Some("RWrist"), ..input(&t) }, 30, toggles);
        assert_eq!(list.lines().count(), 60);
        let style = OverlayStyle::default();
        assert_eq!(list.lines().filter(|(_, _, c)| **c == style.relative_trail).count(), 30);

        let ramp: Vec<&Color> = list.lines().map(|(_, _, c)| c).filter(|c| **c != style.relative_trail).collect();
        assert_eq!(ramp.len(), 30);
        assert!(ramp.iter().all(|c| c[0] == 80 && c[1] == 200));
        assert_eq!(ramp[0][2], 0);
        assert!(ramp.windows(2).all(|w| w[0][2] <= w[1][2]));
        assert!(ramp[29][2] >= 240);
    }

    #[test]
    fn calibration_line_is_dashed_with_label() {
        let t = body(2);
        let line = ReferenceLine { start: FramePoint::new(0.0, 10.0), end: FramePoint::new(100.0, 10.0), real_length: 2.0 };
        let off = OverlayToggles { skeleton: false, ..OverlayToggles::default() };
        let list = OverlayRenderer::default().build(&OverlayInput { calibration: Some(&line), ..input(&t) }, 0, off);
        // dashes start at 0, 20, 40, 60, 80
        assert_eq!(list.lines().count(), 5);
        assert_eq!(list.labels().last(), Some("2.0000 m"));
        assert!(matches!(list.primitives.last(), Some(Primitive::Label { anchor, .. }) if *anchor == FramePoint::new(60.0, 0.0)));
    }
}
