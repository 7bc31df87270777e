use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use ndarray::prelude::*;

use crate::grid::EnergyGrid;
use crate::params::{ModelParams, OutputKind};
use crate::stokes::{DerivedQuantities, StokesSpectrum, STOKES_EPS};

/// Default name of the per-bin quick-look table.
pub const STOKES_TABLE_FILE: &str = "stokes.dat";
/// Default name of the input-parameter dump.
pub const PARAMETERS_FILE: &str = "parameters.txt";

/// Per-spectrum metadata carrying the data-type indicator (0 counts, 1 Q,
/// 2 U) used when the output kind is deferred. Hosts that have no such
/// metadata report `None`.
pub trait StokesMetadata {
    fn stokes_indicator(&self) -> Option<f64>;
}

/// Resolver for hosts without per-spectrum metadata.
pub struct NoMetadata;

impl StokesMetadata for NoMetadata {
    fn stokes_indicator(&self) -> Option<f64> {
        None
    }
}

/// Resolve a deferred output kind against the per-spectrum metadata. An
/// unrecognised or missing indicator falls back to unpolarised flux with a
/// warning, matching the host-side convention for plain count spectra.
pub fn resolve_output_kind(requested: OutputKind, metadata: &dyn StokesMetadata) -> OutputKind {
    if requested != OutputKind::Deferred {
        return requested;
    }
    match metadata.stokes_indicator() {
        Some(v) if v == 0.0 => OutputKind::FluxPolarized,
        Some(v) if v == 1.0 => OutputKind::StokesQ,
        Some(v) if v == 2.0 => OutputKind::StokesU,
        _ => {
            eprintln!("stokesdisc: no or wrong information on data type (counts, q, u)");
            eprintln!("stokesdisc: unpolarised flux output will be used");
            OutputKind::FluxUnpolarized
        }
    }
}

/// Map the resolved output kind onto the returned photon array.
///
/// Flux-like channels are per-bin integrated quantities straight from the
/// superposition; degree, the two angles and the three ratios carry an extra
/// bin-width factor so that the host-side division by bin width cancels.
pub fn select_output(
    kind: OutputKind,
    spectrum: &StokesSpectrum,
    derived: &DerivedQuantities,
    grid: &EnergyGrid,
) -> Array1<f64> {
    let widths = grid.widths();
    match kind {
        // both are resolved upstream: deferred before the pipeline runs,
        // unpolarised flux without building a Stokes spectrum at all
        OutputKind::Deferred | OutputKind::FluxUnpolarized => spectrum.i.clone(),
        OutputKind::FluxPolarized => spectrum.i.clone(),
        OutputKind::StokesQ => spectrum.q.clone(),
        OutputKind::StokesU => spectrum.u.clone(),
        OutputKind::StokesV => spectrum.v.clone(),
        OutputKind::Degree => &derived.degree * &widths,
        OutputKind::AnglePsi => &derived.psi * &widths,
        OutputKind::AngleBeta => &derived.beta * &widths,
        OutputKind::QOverI => ratio(&spectrum.q, &spectrum.i, &widths),
        OutputKind::UOverI => ratio(&spectrum.u, &spectrum.i, &widths),
        OutputKind::VOverI => ratio(&spectrum.v, &spectrum.i, &widths),
    }
}

fn ratio(num: &Array1<f64>, den: &Array1<f64>, widths: &Array1<f64>) -> Array1<f64> {
    let n = num.len();
    Array1::from_shape_fn(n, |ie| num[ie] / (den[ie] + STOKES_EPS) * widths[ie])
}

/// Per-bin quick-look table: energy midpoint, per-unit-energy I/Q/U/V,
/// polarisation degree and both angles.
pub fn write_stokes_table(
    path: &Path,
    grid: &EnergyGrid,
    spectrum: &StokesSpectrum,
    derived: &DerivedQuantities,
) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    let mids = grid.midpoints();
    let widths = grid.widths();
    for ie in 0..grid.nbin() {
        let w = widths[ie];
        writeln!(
            file,
            "{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}",
            mids[ie],
            spectrum.i[ie] / w,
            spectrum.q[ie] / w,
            spectrum.u[ie] / w,
            spectrum.v[ie] / w,
            derived.degree[ie],
            derived.psi[ie],
            derived.beta[ie],
        )?;
    }
    Ok(())
}

/// Dump of the input parameters plus the derived inclination.
pub fn write_parameter_dump(path: &Path, params: &ModelParams) -> io::Result<()> {
    let text = format!(
        "Size        {:12.6}
PhoIndex    {:12.6}
cos_incl    {:12.6}
pol_deg     {:12.6}
chi         {:12.6}
pos_ang     {:12.6}
zshift      {:12.6}
Stokes      {:12}
inc_degrees {:12.6}
",
        params.size,
        params.pho_index,
        params.cos_incl,
        params.pol_deg,
        params.chi_deg,
        params.pos_ang_deg,
        params.zshift,
        params.output.code(),
        params.inclination_deg(),
    );
    std::fs::write(path, text)
}
