//! Motion trail geometry for the selected marker.

use timeseries::{Frame, FramePoint, MarkerSeries};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailSegment {
    pub from: FramePoint,
    pub to: FramePoint,
    /// Frame index of `from`.
    pub frame: Frame,
    /// 0 for the oldest segment of a full window, rising towards 255.
    pub intensity: u8,
}

/// Frames `[start, frame)` covered by a trail of at most `max_len` frames.
fn window(frame: Frame, max_len: usize) -> (Frame, usize) {
    let len = max_len.min(frame);
    (frame - len, len)
}

fn intensity(i: Frame, start: Frame, len: usize) -> u8 {
    (255 * (i - start) / len.max(1)).min(255) as u8
}

/// Segments `i → i+1` over the trailing window, skipping any with an
/// undetected endpoint.
pub fn absolute_trail(series: &MarkerSeries, frame: Frame, max_len: usize) -> Vec<TrailSegment> {
    let (start, len) = window(frame, max_len);
    (start..frame)
        .filter_map(|i| {
            let from = series.position(i)?;
            let to = series.position(i + 1)?;
            Some(TrailSegment { from, to, frame: i, intensity: intensity(i, start, len) })
        })
        .collect()
}

/// The same window as [`absolute_trail`], with each historical position
/// moved by the reference marker's displacement between that frame and
/// `frame`. Empty unless the reference is detected at `frame`.
pub fn relative_trail(
    series: &MarkerSeries,
    reference: &MarkerSeries,
    frame: Frame,
    max_len: usize,
) -> Vec<TrailSegment> {
    let Some(anchor) = reference.position(frame) else { return Vec::new() };
    if series.is_empty() {
        return Vec::new();
    }
    let recentre = |i: Frame| -> Option<FramePoint> {
        let p = series.position_clamped(i)?;
        let r = reference.position_clamped(i)?;
        Some(FramePoint::new(p.x - r.x + anchor.x, p.y - r.y + anchor.y))
    };
    let (start, len) = window(frame, max_len);
    let last = series.len() - 1;
    (start..frame)
        .filter_map(|i| {
            let from = recentre(i)?;
            let to = recentre((i + 1).min(last))?;
            Some(TrailSegment { from, to, frame: i, intensity: intensity(i, start, len) })
        })
        .collect()
}
