use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::drivers::buffer::Sample;
use crate::drivers::channel::ChannelFrame;
use crate::drivers::error::DashboardError;
/// Consecutive samples further apart than this are drawn as a gap.
pub const GAP_THRESHOLD_MS: i64 = 5000;
/// A line between two consecutive samples.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub from: Sample,
    pub to: Sample,
    /// `to.x - from.x` exceeds the gap threshold.
    pub gap: bool,
}
pub fn gap_segments(samples: &[Sample], threshold_ms: i64) -> Vec<Segment> {
    samples
        .windows(2)
        .map(|pair| Segment {
            from: pair[0],
            to: pair[1],
            gap: pair[1].x - pair[0].x > threshold_ms,
        })
        .collect()
}
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub line: RGBColor,
    pub gap: RGBColor,
    /// Caption and axis labels need a system font.
    pub show_labels: bool,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 300,
            background: RGBColor(10, 10, 10),
            line: RGBColor(59, 130, 246),
            gap: RGBColor(239, 68, 68),
            show_labels: true,
        }
    }
}
fn y_bounds(samples: &[Sample]) -> (f64, f64) {
    let (min, max) = samples
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), s| (lo.min(s.y), hi.max(s.y)));
    if (max - min).abs() < f64::EPSILON {
        (min - 1.0, max + 1.0)
    } else {
        let pad = (max - min) * 0.1;
        (min - pad, max + pad)
    }
}
/// Draws one channel window as a line chart; x is seconds since the oldest sample.
pub fn render_channel_png(
    frame: &ChannelFrame,
    title: &str,
    style: &PlotStyle,
    gap_threshold_ms: i64,
) -> Result<Vec<u8>, DashboardError> {
    let (Some(first), Some(last)) = (frame.samples.first(), frame.samples.last()) else {
        return Err(DashboardError::Plot(format!(
            "channel `{}` has no samples",
            frame.key
        )));
    };
    let origin = first.x;
    let seconds = |s: &Sample| (s.x - origin) as f64 / 1000.0;
    let x_max = seconds(last).max(1.0);
    let (y_min, y_max) = y_bounds(&frame.samples);
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut builder = ChartBuilder::on(&root);
        builder.margin(10);
        if style.show_labels {
            builder
                .caption(title, ("sans-serif", 20).into_font().color(&WHITE))
                .set_label_area_size(LabelAreaPosition::Left, 55)
                .set_label_area_size(LabelAreaPosition::Bottom, 40);
        }
        let mut chart = builder.build_cartesian_2d(0f64..x_max, y_min..y_max)?;
        if style.show_labels {
            chart
                .configure_mesh()
                .light_line_style(&WHITE.mix(0.1))
                .x_desc("seconds")
                .draw()?;
        }
        for segment in gap_segments(&frame.samples, gap_threshold_ms) {
            let color = if segment.gap { style.gap } else { style.line };
            chart.draw_series(LineSeries::new(
                [
                    (seconds(&segment.from), segment.from.y),
                    (seconds(&segment.to), segment.to.y),
                ],
                color.stroke_width(2),
            ))?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Writes `<key>.png` into `dir` for every non-empty frame.
pub fn export_frames<'a>(
    frames: impl IntoIterator<Item = (&'a ChannelFrame, &'a str)>,
    dir: &Path,
    style: &PlotStyle,
    gap_threshold_ms: i64,
) -> Result<Vec<PathBuf>, DashboardError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();
    for (frame, title) in frames {
        if frame.samples.is_empty() {
            continue;
        }
        let png = render_channel_png(frame, title, style, gap_threshold_ms)?;
        let path = dir.join(format!("{}.png", frame.key));
        fs::write(&path, png)?;
        written.push(path);
    }
    log::info!("exported {} chart(s) to {}", written.len(), dir.display());
    Ok(written)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, DashboardError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| DashboardError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
