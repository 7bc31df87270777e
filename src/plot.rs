use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

use crate::grid::EnergyGrid;
use crate::model::PolarizedSpectra;

/// Quick-look figure: per-unit-energy flux, polarisation degree and
/// polarisation angle against energy, stacked vertically.
pub fn quick_look(
    output_path: &Path,
    grid: &EnergyGrid,
    pol: &PolarizedSpectra,
) -> Result<(), Box<dyn std::error::Error>> {
    let width = 1000u32;
    let height = 1200u32;
    let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
    root.fill(&WHITE)?;

    let (flux_area, rest) = root.split_vertically(height / 3);
    let (degree_area, angle_area) = rest.split_vertically(height / 3);

    let mids = grid.midpoints();
    let widths = grid.widths();
    let nbin = grid.nbin();

    let flux: Vec<(f64, f64)> = (0..nbin)
        .map(|ie| (mids[ie], pol.stokes.i[ie] / widths[ie]))
        .collect();
    let degree: Vec<(f64, f64)> = (0..nbin)
        .map(|ie| (mids[ie], pol.derived.degree[ie]))
        .collect();
    let psi: Vec<(f64, f64)> = (0..nbin)
        .map(|ie| (mids[ie], pol.derived.psi[ie]))
        .collect();

    draw_panel(&flux_area, "Flux [photons / keV]", &flux)?;
    draw_panel(&degree_area, "Polarisation degree", &degree)?;
    draw_panel(&angle_area, "Polarisation angle [deg]", &psi)?;

    root.present()?;
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend, Shift>,
    y_desc: &str,
    series: &[(f64, f64)],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut x_min = series.iter().map(|(x, _)| *x).fold(f64::INFINITY, f64::min);
    let mut x_max = series.iter().map(|(x, _)| *x).fold(f64::NEG_INFINITY, f64::max);
    if !(x_max > x_min) {
        x_min -= 0.5;
        x_max += 0.5;
    }
    let mut y_min = series.iter().map(|(_, y)| *y).fold(f64::INFINITY, f64::min);
    let mut y_max = series.iter().map(|(_, y)| *y).fold(f64::NEG_INFINITY, f64::max);
    if !(y_max > y_min) {
        // flat series still needs a non-degenerate axis
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = 0.05 * (y_max - y_min);

    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(55)
        .y_label_area_size(90)
        .build_cartesian_2d(x_min..x_max, (y_min - pad)..(y_max + pad))?;

    chart
        .configure_mesh()
        .x_desc("Energy [keV]")
        .y_desc(y_desc)
        .x_max_light_lines(0)
        .y_max_light_lines(0)
        .axis_style(BLACK.stroke_width(1))
        .y_label_formatter(&|v| format!("{:.2e}", v))
        .label_style(("sans-serif", 22))
        .draw()?;

    chart.draw_series(LineSeries::new(series.iter().cloned(), GREEN))?;
    Ok(())
}
