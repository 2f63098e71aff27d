//! SVG chart rendering for the price series and indicator history.
//!
//! Writes four standalone SVG files per instrument: closing prices, a
//! histogram of closing prices, moving average with Bollinger bands, and CCI.

use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

use crate::domain::error::SignalError;
use crate::domain::indicator::IndicatorHistory;
use crate::domain::ohlcv::PriceSeries;
use crate::ports::chart_port::ChartPort;

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 400.0;
const PADDING: f64 = 50.0;
pub const HISTOGRAM_BINS: usize = 20;

/// One named line on a chart. Non-finite values leave a gap.
pub struct Line<'a> {
    pub label: &'a str,
    pub color: &'a str,
    pub values: Vec<f64>,
}

pub struct SvgChartAdapter {
    output_dir: PathBuf,
}

impl SvgChartAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn file_stem(instrument: &str) -> String {
    instrument
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn finite_range<'a>(values: impl Iterator<Item = &'a f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn frame(title: &str, body: &str) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">
<rect width="100%" height="100%" fill="white"/>
<text x="{cx:.0}" y="{ty:.0}" text-anchor="middle" font-family="sans-serif" font-size="16">{title}</text>
<line x1="{p:.0}" y1="{p:.0}" x2="{p:.0}" y2="{b:.0}" stroke="black"/>
<line x1="{p:.0}" y1="{b:.0}" x2="{r:.0}" y2="{b:.0}" stroke="black"/>
{body}</svg>
"#,
        w = WIDTH,
        h = HEIGHT,
        cx = WIDTH / 2.0,
        ty = PADDING / 2.0,
        p = PADDING,
        b = HEIGHT - PADDING,
        r = WIDTH - PADDING,
        title = escape(title),
        body = body,
    )
}

/// Line chart over a date axis. Returns an empty string when no value is finite.
pub fn line_chart_svg(title: &str, dates: &[NaiveDate], lines: &[Line]) -> String {
    let Some((min, max)) = finite_range(lines.iter().flat_map(|l| l.values.iter())) else {
        return String::new();
    };

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let range = max - min;
    let scale_y = if range > 0.0 { plot_height / range } else { 1.0 };
    let scale_x = if dates.len() > 1 {
        plot_width / (dates.len() - 1) as f64
    } else {
        0.0
    };

    let mut body = String::new();
    for (n, line) in lines.iter().enumerate() {
        let mut segment: Vec<String> = Vec::new();
        let mut segments: Vec<Vec<String>> = Vec::new();
        for (i, v) in line.values.iter().enumerate() {
            if v.is_finite() {
                let x = PADDING + i as f64 * scale_x;
                let y = HEIGHT - PADDING - (v - min) * scale_y;
                segment.push(format!("{:.1},{:.1}", x, y));
            } else if !segment.is_empty() {
                segments.push(std::mem::take(&mut segment));
            }
        }
        if !segment.is_empty() {
            segments.push(segment);
        }
        for points in segments {
            body.push_str(&format!(
                "<polyline fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\" points=\"{}\"/>\n",
                line.color,
                points.join(" ")
            ));
        }
        body.push_str(&format!(
            "<text x=\"{:.0}\" y=\"{:.0}\" font-family=\"sans-serif\" font-size=\"11\" fill=\"{}\">{}</text>\n",
            WIDTH - PADDING - 120.0,
            PADDING + 14.0 * (n + 1) as f64,
            line.color,
            escape(line.label)
        ));
    }

    body.push_str(&format!(
        "<text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"end\" font-family=\"sans-serif\" font-size=\"11\">{:.2}</text>\n",
        PADDING - 4.0,
        PADDING,
        max
    ));
    body.push_str(&format!(
        "<text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"end\" font-family=\"sans-serif\" font-size=\"11\">{:.2}</text>\n",
        PADDING - 4.0,
        HEIGHT - PADDING,
        min
    ));
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        body.push_str(&format!(
            "<text x=\"{:.0}\" y=\"{:.0}\" font-family=\"sans-serif\" font-size=\"11\">{}</text>\n",
            PADDING,
            HEIGHT - PADDING + 16.0,
            first
        ));
        body.push_str(&format!(
            "<text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"end\" font-family=\"sans-serif\" font-size=\"11\">{}</text>\n",
            WIDTH - PADDING,
            HEIGHT - PADDING + 16.0,
            last
        ));
    }

    frame(title, &body)
}

/// Equal-width bin counts over the finite values, with the range they span.
pub fn histogram_counts(values: &[f64], bins: usize) -> Option<(f64, f64, Vec<usize>)> {
    let (min, max) = finite_range(values.iter())?;
    let bins = bins.max(1);
    let mut counts = vec![0usize; bins];
    let width = (max - min) / bins as f64;
    for &v in values.iter().filter(|v| v.is_finite()) {
        let idx = if width > 0.0 {
            (((v - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[idx] += 1;
    }
    Some((min, max, counts))
}

pub fn histogram_svg(title: &str, values: &[f64], bins: usize) -> String {
    let Some((min, max, counts)) = histogram_counts(values, bins) else {
        return String::new();
    };

    let plot_width = WIDTH - 2.0 * PADDING;
    let plot_height = HEIGHT - 2.0 * PADDING;
    let tallest = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let bar_width = plot_width / counts.len() as f64;

    let mut body = String::new();
    for (i, &count) in counts.iter().enumerate() {
        let h = count as f64 / tallest * plot_height;
        body.push_str(&format!(
            "<rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"orange\" stroke=\"white\"/>\n",
            PADDING + i as f64 * bar_width,
            HEIGHT - PADDING - h,
            bar_width,
            h
        ));
    }
    body.push_str(&format!(
        "<text x=\"{:.0}\" y=\"{:.0}\" font-family=\"sans-serif\" font-size=\"11\">{:.2}</text>\n",
        PADDING,
        HEIGHT - PADDING + 16.0,
        min
    ));
    body.push_str(&format!(
        "<text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"end\" font-family=\"sans-serif\" font-size=\"11\">{:.2}</text>\n",
        WIDTH - PADDING,
        HEIGHT - PADDING + 16.0,
        max
    ));
    body.push_str(&format!(
        "<text x=\"{:.0}\" y=\"{:.0}\" text-anchor=\"end\" font-family=\"sans-serif\" font-size=\"11\">{}</text>\n",
        PADDING - 4.0,
        PADDING,
        tallest
    ));

    frame(title, &body)
}

impl ChartPort for SvgChartAdapter {
    fn render(
        &self,
        instrument: &str,
        series: &PriceSeries,
        history: &IndicatorHistory,
    ) -> Result<Vec<PathBuf>, SignalError> {
        fs::create_dir_all(&self.output_dir)?;

        let rows = history.rows();
        let dates: Vec<NaiveDate> = series.bars().iter().map(|b| b.date).collect();
        let closes = series.closes();
        let stem = file_stem(instrument);

        let charts = [
            (
                "close",
                line_chart_svg(
                    &format!("{instrument} Closing Prices"),
                    &dates,
                    &[Line {
                        label: "Close",
                        color: "steelblue",
                        values: closes.clone(),
                    }],
                ),
            ),
            (
                "close_histogram",
                histogram_svg(
                    &format!("Histogram of {instrument} Closing Prices"),
                    &closes,
                    HISTOGRAM_BINS,
                ),
            ),
            (
                "bands",
                line_chart_svg(
                    "Moving Average and Bollinger Bands",
                    &dates,
                    &[
                        Line {
                            label: "Upper Band",
                            color: "seagreen",
                            values: rows.iter().map(|r| r.upper_band).collect(),
                        },
                        Line {
                            label: "Moving Average",
                            color: "darkorange",
                            values: rows.iter().map(|r| r.moving_average).collect(),
                        },
                        Line {
                            label: "Lower Band",
                            color: "firebrick",
                            values: rows.iter().map(|r| r.lower_band).collect(),
                        },
                        Line {
                            label: "Close",
                            color: "steelblue",
                            values: closes,
                        },
                    ],
                ),
            ),
            (
                "cci",
                line_chart_svg(
                    "CCI",
                    &dates,
                    &[Line {
                        label: "CCI",
                        color: "purple",
                        values: rows.iter().map(|r| r.cci).collect(),
                    }],
                ),
            ),
        ];

        let mut written = Vec::new();
        for (suffix, svg) in charts {
            if svg.is_empty() {
                log::warn!("no finite values for {suffix} chart; skipped");
                continue;
            }
            let path = self.output_dir.join(format!("{stem}_{suffix}.svg"));
            fs::write(&path, svg)?;
            log::debug!("wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}
