//
// Copyright © 2023 Arm Limited. All rights reserved.
// SPDX-License-Identifier: Apache-2.0
//

use crate::error::{GrapherError, Result};
use crate::trace::PopulationTrace;
use log::info;
use plotters::prelude::*;
use std::{
    num::NonZeroUsize,
    ops::Range,
    path::{Path, PathBuf},
};

/// Appended to the input filename to get the chart filename.
pub const OUTPUT_SUFFIX: &str = ".png";

pub const CANVAS_WIDTH: u32 = 2000;

/// Canvas size in pixels. The height follows the golden ratio.
pub fn canvas_size() -> (u32, u32) {
    let golden_mean = (5.0_f64.sqrt() - 1.0) / 2.0;
    let height = (golden_mean * CANVAS_WIDTH as f64).round() as u32;
    (CANVAS_WIDTH, height)
}

pub fn output_path(input: &Path) -> PathBuf {
    let mut path = input.as_os_str().to_owned();
    path.push(OUTPUT_SUFFIX);
    PathBuf::from(path)
}

/// One labeled line of the chart.
#[derive(Clone, Debug, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    pub points: Vec<(f64, u64)>,
}

/// Keeps the values at indices 0, stride, 2 * stride, ...
pub fn downsample<T: Copy>(values: &[T], stride: NonZeroUsize) -> Vec<T> {
    values.iter().step_by(stride.get()).copied().collect()
}

/// Picks the series to draw and downsamples them. An empty `selection` picks every
/// complex in the trace. Fails if a selected complex does not exist in the trace.
pub fn select_series(
    trace: &PopulationTrace,
    selection: &[String],
    stride: NonZeroUsize,
) -> Result<Vec<PlotSeries>> {
    let names = if selection.is_empty() {
        trace.complex_names()
    } else {
        selection
    };

    let times = downsample(trace.times(), stride);
    names
        .iter()
        .map(|name| -> Result<PlotSeries> {
            let counts = trace
                .series(name)
                .ok_or_else(|| GrapherError::UnknownComplex(name.clone()))?;
            Ok(PlotSeries {
                label: name.clone(),
                points: times
                    .iter()
                    .copied()
                    .zip(downsample(counts, stride))
                    .collect(),
            })
        })
        .collect()
}

fn plot_error<E: std::fmt::Display>(e: E) -> GrapherError {
    GrapherError::Plot(e.to_string())
}

// Time axis covering every plotted point. Degenerate ranges are widened so that
// plotters has something to scale.
fn time_range(series: &[PlotSeries]) -> Range<f64> {
    let (min, max) = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(t, _)| *t))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
            (lo.min(t), hi.max(t))
        });

    if min > max {
        0.0..1.0
    } else if min == max {
        (min - 0.5)..(max + 0.5)
    } else {
        min..max
    }
}

fn population_range(series: &[PlotSeries]) -> Range<f64> {
    let max = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, c)| *c))
        .max()
        .unwrap_or(0);
    0.0..(max as f64 * 1.05).max(1.0)
}

/// Draws every series as a line on one chart and saves it as a PNG, replacing any
/// existing file at `path`.
pub fn draw(path: &Path, series: &[PlotSeries]) -> Result<()> {
    let root = BitMapBackend::new(path, canvas_size()).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(time_range(series), population_range(series))
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("time")
        .y_desc("population")
        .draw()
        .map_err(plot_error)?;

    for (idx, s) in series.iter().enumerate() {
        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(
                s.points.iter().map(|&(t, count)| (t, count as f64)),
                color.stroke_width(2),
            ))
            .map_err(plot_error)?
            .label(s.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    info!("Drew {} series into {}", series.len(), path.display());
    Ok(())
}
