//! Annotated slice rendering used to cross-check decoder axis conventions.
//!
//! Every figure is written twice: a full resolution PNG raster with a
//! colorbar, dashed gridlines and the two direction arrows, and an SVG
//! companion carrying the same picture (downsampled) together with the
//! title and axis-direction labels.

use image::{Rgb, RgbImage};
use log::warn;
use ndarray::{Array2, ArrayView2, ArrayViewD, Axis, Ix2};
use plotters::{drawing::DrawingAreaErrorKind, prelude::*};
use std::path::{Path, PathBuf};
use thiserror::Error;

const COLORBAR_GAP: u32 = 8;
const COLORBAR_WIDTH: u32 = 16;
const GRID_DIVISIONS: usize = 8;
/// Upper bound on the cells per axis drawn in the SVG companion.
const SVG_MAX_CELLS: usize = 128;
const SVG_SIZE: (u32, u32) = (900, 800);

const ARROW: Rgb<u8> = Rgb([255, 0, 0]);
const GRID: Rgb<u8> = Rgb([0xcc, 0xcc, 0xcc]);
const GRID_ALPHA: f32 = 0.4;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Expected an array with at least 2 dimensions, found {0}")]
    TooFewDimensions(usize),

    #[error("Cannot render an empty slice")]
    Empty,

    #[error("Slice index {index} out of range for an axis of length {len}")]
    SliceOutOfRange { index: usize, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Drawing error: {0}")]
    Drawing(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for RenderError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        RenderError::Drawing(err.to_string())
    }
}

/// Files written for one rendered slice.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceFigure {
    pub png: PathBuf,
    pub svg: PathBuf,
    pub width: usize,
    pub height: usize,
}

/// Plane `index` along `axis`.
pub fn plane_at<'a>(
    array: &ArrayViewD<'a, f64>,
    axis: usize,
    index: usize,
) -> Result<ArrayViewD<'a, f64>, RenderError> {
    if axis >= array.ndim() {
        return Err(RenderError::TooFewDimensions(array.ndim()));
    }
    let len = array.len_of(Axis(axis));
    if index >= len {
        return Err(RenderError::SliceOutOfRange { index, len });
    }
    Ok(array.clone().index_axis_move(Axis(axis), index))
}

/// Reduce an array to its first 2D plane.
///
/// Arrays with more than two dimensions keep index 0 of every trailing axis
/// (`a[:, :, 0]`, `a[:, :, 0, 0]`, ...). This is a fixed choice, not a
/// general reducer.
pub fn first_plane(array: &ArrayViewD<'_, f64>) -> Result<Array2<f64>, RenderError> {
    let ndim = array.ndim();
    if ndim < 2 {
        return Err(RenderError::TooFewDimensions(ndim));
    }
    if ndim > 2 {
        warn!("Input array has {ndim} dimensions. Using first 2D slice.");
    }
    let mut plane = array.clone();
    while plane.ndim() > 2 {
        let last = plane.ndim() - 1;
        plane = plane.index_axis_move(Axis(last), 0);
    }
    plane
        .into_dimensionality::<Ix2>()
        .map(|p| p.to_owned())
        .map_err(|_| RenderError::TooFewDimensions(ndim))
}

/// Scale values to `[0, 1]` with the global minimum and maximum, on a copy.
///
/// A constant plane has `max - min == 0` and every value becomes NaN. That
/// degenerate output is left as is; callers that care must check for
/// constant input first.
pub fn normalize(plane: &ArrayView2<'_, f64>) -> Array2<f64> {
    let (min, max) = plane
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;
    plane.mapv(|v| (v - min) / range)
}

/// Render a plane with its orientation annotations.
///
/// `array` may have two or more dimensions (see [`first_plane`]).
/// `axis_labels` names the direction of increasing column index and of
/// increasing row index, in the decoder's own convention. The PNG lands at
/// `path`, the SVG next to it.
pub fn render_slice(
    array: &ArrayViewD<'_, f64>,
    title: &str,
    axis_labels: Option<(&str, &str)>,
    path: &Path,
) -> Result<SliceFigure, RenderError> {
    let plane = first_plane(array)?;
    if plane.is_empty() {
        return Err(RenderError::Empty);
    }
    let normalized = normalize(&plane.view());
    if normalized.iter().any(|v| !v.is_finite()) {
        warn!("{title}: constant slice, normalization is undefined");
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let (height, width) = normalized.dim();
    raster(&normalized).save(path)?;
    let svg = path.with_extension("svg");
    annotated_svg(&normalized, title, axis_labels, &svg)?;

    Ok(SliceFigure {
        png: path.to_path_buf(),
        svg,
        width,
        height,
    })
}

#[inline]
fn to_gray(value: f64) -> u8 {
    if value.is_finite() {
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    } else {
        0
    }
}

fn raster(normalized: &Array2<f64>) -> RgbImage {
    let (height, width) = normalized.dim();
    let (w, h) = (width as u32, height as u32);
    let mut img = RgbImage::from_pixel(w + COLORBAR_GAP + COLORBAR_WIDTH, h, Rgb([255, 255, 255]));

    for ((row, col), &value) in normalized.indexed_iter() {
        let v = to_gray(value);
        img.put_pixel(col as u32, row as u32, Rgb([v, v, v]));
    }

    // colorbar: 1.0 at the top
    for y in 0..h {
        let level = if h > 1 { 1.0 - y as f64 / (h - 1) as f64 } else { 1.0 };
        let v = to_gray(level);
        for x in 0..COLORBAR_WIDTH {
            img.put_pixel(w + COLORBAR_GAP + x, y, Rgb([v, v, v]));
        }
    }

    draw_grid(&mut img, w, h);
    draw_arrows(&mut img, w, h);
    img
}

fn blend(img: &mut RgbImage, x: u32, y: u32, color: Rgb<u8>, alpha: f32) {
    let pixel = img.get_pixel_mut(x, y);
    for (c, over) in pixel.0.iter_mut().zip(color.0) {
        *c = (*c as f32 * (1.0 - alpha) + over as f32 * alpha).round() as u8;
    }
}

fn draw_grid(img: &mut RgbImage, w: u32, h: u32) {
    let step = (w.max(h) as usize / GRID_DIVISIONS).max(1);
    let dashed = |i: u32| (i / 4) % 2 == 0;
    for x in (step..w as usize).step_by(step) {
        for y in (0..h).filter(|&y| dashed(y)) {
            blend(img, x as u32, y, GRID, GRID_ALPHA);
        }
    }
    for y in (step..h as usize).step_by(step) {
        for x in (0..w).filter(|&x| dashed(x)) {
            blend(img, x, y as u32, GRID, GRID_ALPHA);
        }
    }
}

/// Red arrows spanning the full width (left to right, through the middle
/// row) and height (top to bottom, through the middle column).
fn draw_arrows(img: &mut RgbImage, w: u32, h: u32) {
    let thickness = (w.min(h) / 128).max(1);
    let head = (w.min(h) / 20).max(2);
    let (mid_row, mid_col) = (h / 2, w / 2);
    let mut put = |x: i64, y: i64| {
        if x >= 0 && y >= 0 && (x as u32) < w && (y as u32) < h {
            img.put_pixel(x as u32, y as u32, ARROW);
        }
    };

    for t in 0..thickness as i64 {
        let offset = t - thickness as i64 / 2;
        for x in 0..w as i64 {
            put(x, mid_row as i64 + offset);
        }
        for y in 0..h as i64 {
            put(mid_col as i64 + offset, y);
        }
    }
    for d in 0..head as i64 {
        let tip_x = w as i64 - 1;
        put(tip_x - d, mid_row as i64 - d);
        put(tip_x - d, mid_row as i64 + d);
        let tip_y = h as i64 - 1;
        put(mid_col as i64 - d, tip_y - d);
        put(mid_col as i64 + d, tip_y - d);
    }
}

fn annotated_svg(
    normalized: &Array2<f64>,
    title: &str,
    axis_labels: Option<(&str, &str)>,
    path: &Path,
) -> Result<(), RenderError> {
    let (rows, cols) = normalized.dim();
    let (rows_f, cols_f) = (rows as f64, cols as f64);
    let root = SVGBackend::new(path, SVG_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (main, bar) = root.split_horizontally(SVG_SIZE.0 as i32 - 110);

    let (x_desc, y_desc) = axis_labels.unwrap_or(("", ""));
    let mut chart = ChartBuilder::on(&main)
        .caption(title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..cols_f, 0.0..rows_f)?;
    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 16).into_font().color(&RED))
        .bold_line_style(RGBColor(0xcc, 0xcc, 0xcc).mix(0.4).stroke_width(1))
        .light_line_style(WHITE.mix(0.0).stroke_width(0))
        .draw()?;

    // rows grow downwards in the image
    let flip = |row: f64| rows_f - row;
    let row_step = rows.div_ceil(SVG_MAX_CELLS);
    let col_step = cols.div_ceil(SVG_MAX_CELLS);
    let cells = (0..rows).step_by(row_step).flat_map(|r| {
        (0..cols).step_by(col_step).map(move |c| {
            let v = to_gray(normalized[[r, c]]);
            let r1 = (r + row_step).min(rows) as f64;
            let c1 = (c + col_step).min(cols) as f64;
            Rectangle::new(
                [(c as f64, flip(r as f64)), (c1, flip(r1))],
                RGBColor(v, v, v).filled(),
            )
        })
    });
    chart.draw_series(cells)?;

    let arrow_style = RED.stroke_width(3);
    let head_x = cols_f * 0.03;
    let head_y = rows_f * 0.03;
    let mid_row = flip(rows_f / 2.0);
    let mid_col = cols_f / 2.0;
    let right = cols_f - 1.0;
    let bottom = flip(rows_f - 1.0);
    chart.draw_series([
        PathElement::new(vec![(0.0, mid_row), (right, mid_row)], arrow_style),
        PathElement::new(
            vec![
                (right - head_x, mid_row + head_y),
                (right, mid_row),
                (right - head_x, mid_row - head_y),
            ],
            arrow_style,
        ),
        PathElement::new(vec![(mid_col, flip(0.0)), (mid_col, bottom)], arrow_style),
        PathElement::new(
            vec![
                (mid_col - head_x, bottom + head_y),
                (mid_col, bottom),
                (mid_col + head_x, bottom + head_y),
            ],
            arrow_style,
        ),
    ])?;

    let mut colorbar = ChartBuilder::on(&bar)
        .margin_top(60)
        .margin_bottom(70)
        .margin_right(10)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..1.0, 0.0..1.0)?;
    colorbar
        .configure_mesh()
        .disable_x_mesh()
        .disable_x_axis()
        .y_desc("Normalized Intensity")
        .y_labels(6)
        .draw()?;
    let steps = 64;
    colorbar.draw_series((0..steps).map(|i| {
        let lo = i as f64 / steps as f64;
        let hi = (i + 1) as f64 / steps as f64;
        let v = to_gray(lo);
        Rectangle::new([(0.0, lo), (1.0, hi)], RGBColor(v, v, v).filled())
    }))?;

    root.present()?;
    Ok(())
}
