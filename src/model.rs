use ndarray::prelude::*;

use crate::error::StokesError;
use crate::grid::EnergyGrid;
use crate::output::{resolve_output_kind, select_output, StokesMetadata};
use crate::params::{ModelParams, OutputKind};
use crate::stokes::{BasisSet, DerivedQuantities, StokesSpectrum};
use crate::table::{BasisKind, TableSampler};

/// Result of one model evaluation.
#[derive(Debug)]
pub struct ModelOutput {
    /// Photon array for the resolved output kind, one value per grid bin.
    pub photar: Array1<f64>,
    /// Per-bin error estimates; zero, the table providers do not model them.
    pub photer: Array1<f64>,
    /// Observer inclination in degrees, the per-call diagnostic value.
    pub inclination_deg: f64,
    /// Full polarisation state behind `photar`; absent when the
    /// polarisation computations are switched off.
    pub polarized: Option<PolarizedSpectra>,
}

#[derive(Debug)]
pub struct PolarizedSpectra {
    pub stokes: StokesSpectrum,
    pub derived: DerivedQuantities,
}

fn expect_len(response: Array1<f64>, n: usize) -> Result<Array1<f64>, StokesError> {
    if response.len() != n {
        return Err(StokesError::Table(format!(
            "sampler returned {} bins for a {}-bin grid",
            response.len(),
            n
        )));
    }
    Ok(response)
}

fn sample_basis(
    sampler: &dyn TableSampler,
    grid: &EnergyGrid,
    params: &ModelParams,
    basis: BasisKind,
) -> Result<Array2<f64>, StokesError> {
    let n = grid.nbin();
    let mut channels = Array2::zeros((3, n));
    for ch in 0..3 {
        let (response, _errors) = sampler.sample(grid, params, basis, ch)?;
        channels.row_mut(ch).assign(&expect_len(response, n)?);
    }
    Ok(channels)
}

/// Evaluate the model on `grid`.
///
/// Resolves the output kind (one decision point per call), samples the
/// reflection tables, runs the superposition pipeline and maps the requested
/// channel onto the photon array. With the polarisation computations
/// switched off only the unpolarised intensity channel is sampled.
pub fn compute(
    grid: &EnergyGrid,
    params: &ModelParams,
    sampler: &dyn TableSampler,
    metadata: &dyn StokesMetadata,
) -> Result<ModelOutput, StokesError> {
    let kind = resolve_output_kind(params.output, metadata);
    let n = grid.nbin();
    let photer = Array1::zeros(n);
    let inclination_deg = params.inclination_deg();

    if kind == OutputKind::FluxUnpolarized {
        let (response, _errors) = sampler.sample(grid, params, BasisKind::Unpolarized, 0)?;
        return Ok(ModelOutput {
            photar: expect_len(response, n)?,
            photer,
            inclination_deg,
            polarized: None,
        });
    }

    let set = BasisSet {
        unpolarized: sample_basis(sampler, grid, params, BasisKind::Unpolarized)?,
        horizontal: sample_basis(sampler, grid, params, BasisKind::Horizontal)?,
        diagonal: sample_basis(sampler, grid, params, BasisKind::Diagonal)?,
    };

    let mut stokes = set.into_differential().superpose(params.pol_deg, params.chi());
    stokes.rotate(params.pos_ang());
    let derived = stokes.derived();
    let photar = select_output(kind, &stokes, &derived, grid);

    Ok(ModelOutput {
        photar,
        photer,
        inclination_deg,
        polarized: Some(PolarizedSpectra { stokes, derived }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::NoMetadata;

    struct FixedMetadata(Option<f64>);

    impl StokesMetadata for FixedMetadata {
        fn stokes_indicator(&self) -> Option<f64> {
            self.0
        }
    }

    /// Constant-in-energy responses: baseline I = 10, the horizontal basis
    /// adds Q = 5, the diagonal basis adds U = 5.
    struct MockSampler;

    impl TableSampler for MockSampler {
        fn sample(
            &self,
            grid: &EnergyGrid,
            _params: &ModelParams,
            basis: BasisKind,
            channel: usize,
        ) -> Result<(Array1<f64>, Array1<f64>), StokesError> {
            let value = match (basis, channel) {
                (_, 0) => 10.0,
                (BasisKind::Horizontal, 1) => 5.0,
                (BasisKind::Diagonal, 2) => 5.0,
                _ => 0.0,
            };
            let n = grid.nbin();
            Ok((Array1::from_elem(n, value), Array1::zeros(n)))
        }
    }

    fn params_with(output: OutputKind, pol_deg: f64, chi_deg: f64) -> ModelParams {
        ModelParams::new(0.3, 2.0, 0.5, pol_deg, chi_deg, 0.0, 0.0, output).unwrap()
    }

    fn grid2() -> EnergyGrid {
        EnergyGrid::new(vec![1.0, 2.0, 4.0]).unwrap()
    }

    #[test]
    fn test_polarisation_off_uses_baseline_only() {
        let grid = grid2();
        let params = params_with(OutputKind::FluxUnpolarized, 1.0, 45.0);
        let out = compute(&grid, &params, &MockSampler, &NoMetadata).unwrap();
        assert!(out.polarized.is_none());
        for ie in 0..2 {
            assert_eq!(out.photar[ie], 10.0);
            assert_eq!(out.photer[ie], 0.0);
        }
    }

    #[test]
    fn test_full_polarisation_pipeline() {
        let grid = grid2();
        let params = params_with(OutputKind::StokesQ, 1.0, 0.0);
        let out = compute(&grid, &params, &MockSampler, &NoMetadata).unwrap();
        for ie in 0..2 {
            assert!((out.photar[ie] - (-5.0)).abs() < 1e-12);
        }
        let pol = out.polarized.unwrap();
        for ie in 0..2 {
            assert!((pol.derived.degree[ie] - 0.5).abs() < 1e-12);
            assert!((pol.derived.psi[ie] - 90.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_degree_matches_baseline_flux() {
        let grid = grid2();
        let params = params_with(OutputKind::FluxPolarized, 0.0, 77.0);
        let out = compute(&grid, &params, &MockSampler, &NoMetadata).unwrap();
        for ie in 0..2 {
            assert_eq!(out.photar[ie], 10.0);
        }
        let pol = out.polarized.unwrap();
        for ie in 0..2 {
            assert_eq!(pol.stokes.q[ie], 0.0);
            assert_eq!(pol.stokes.u[ie], 0.0);
            assert_eq!(pol.stokes.v[ie], 0.0);
        }
    }

    #[test]
    fn test_deferred_resolves_through_metadata() {
        let grid = grid2();
        let params = params_with(OutputKind::Deferred, 1.0, 0.0);
        let out = compute(&grid, &params, &MockSampler, &FixedMetadata(Some(1.0))).unwrap();
        // indicator 1 selects the Q channel
        for ie in 0..2 {
            assert!((out.photar[ie] - (-5.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_deferred_fallback_disables_polarisation() {
        let grid = grid2();
        let params = params_with(OutputKind::Deferred, 1.0, 0.0);
        let out = compute(&grid, &params, &MockSampler, &FixedMetadata(Some(7.0))).unwrap();
        assert!(out.polarized.is_none());
        for ie in 0..2 {
            assert_eq!(out.photar[ie], 10.0);
        }
    }

    #[test]
    fn test_inclination_diagnostic_published() {
        let grid = grid2();
        let params = params_with(OutputKind::FluxPolarized, 0.0, 0.0);
        let out = compute(&grid, &params, &MockSampler, &NoMetadata).unwrap();
        // acos(0.5) = 60 degrees
        assert!((out.inclination_deg - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_mismatched_sampler_length_is_fatal() {
        struct BadSampler;
        impl TableSampler for BadSampler {
            fn sample(
                &self,
                _grid: &EnergyGrid,
                _params: &ModelParams,
                _basis: BasisKind,
                _channel: usize,
            ) -> Result<(Array1<f64>, Array1<f64>), StokesError> {
                Ok((Array1::zeros(5), Array1::zeros(5)))
            }
        }
        let grid = grid2();
        let params = params_with(OutputKind::FluxPolarized, 0.0, 0.0);
        assert!(compute(&grid, &params, &BadSampler, &NoMetadata).is_err());
    }
}
