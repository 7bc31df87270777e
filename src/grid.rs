use ndarray::prelude::*;

use crate::error::StokesError;

/// Energy bin edges in keV. N+1 strictly increasing edges define N bins.
#[derive(Debug, Clone)]
pub struct EnergyGrid {
    edges: Array1<f64>,
}

impl EnergyGrid {
    pub fn new(edges: Vec<f64>) -> Result<EnergyGrid, StokesError> {
        if edges.len() < 2 {
            return Err(StokesError::Param(
                "energy grid needs at least two bin edges".to_string(),
            ));
        }
        if edges[0] <= 0.0 {
            return Err(StokesError::Param(format!(
                "energy grid must start above 0 keV, got {}",
                edges[0]
            )));
        }
        for pair in edges.windows(2) {
            if pair[1] <= pair[0] {
                return Err(StokesError::Param(format!(
                    "energy grid edges must be strictly increasing ({} -> {})",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(EnergyGrid {
            edges: Array1::from_vec(edges),
        })
    }

    /// Logarithmically spaced grid, the usual binning for wide-band X-ray spectra.
    pub fn log_spaced(e_min: f64, e_max: f64, nbin: usize) -> Result<EnergyGrid, StokesError> {
        if nbin == 0 {
            return Err(StokesError::Param("grid needs at least one bin".to_string()));
        }
        if e_min <= 0.0 || e_max <= e_min {
            return Err(StokesError::Param(format!(
                "invalid energy band {} - {} keV",
                e_min, e_max
            )));
        }
        let ratio = e_max / e_min;
        let edges = Array::linspace(0.0f64, 1.0, nbin + 1).mapv(|t| e_min * ratio.powf(t));
        Ok(EnergyGrid { edges })
    }

    pub fn nbin(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> ArrayView1<f64> {
        self.edges.view()
    }

    pub fn widths(&self) -> Array1<f64> {
        let n = self.nbin();
        Array1::from_shape_fn(n, |ie| self.edges[ie + 1] - self.edges[ie])
    }

    pub fn midpoints(&self) -> Array1<f64> {
        let n = self.nbin();
        Array1::from_shape_fn(n, |ie| 0.5 * (self.edges[ie] + self.edges[ie + 1]))
    }

    /// Same binning with every edge multiplied by `factor` (> 0).
    pub fn scaled(&self, factor: f64) -> EnergyGrid {
        EnergyGrid {
            edges: &self.edges * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_spaced_grid() {
        let grid = EnergyGrid::log_spaced(1.0, 100.0, 200).unwrap();
        assert_eq!(grid.nbin(), 200);
        assert!((grid.edges()[0] - 1.0).abs() < 1e-12);
        assert!((grid.edges()[200] - 100.0).abs() < 1e-9);
        // log spacing: constant edge ratio
        let r0 = grid.edges()[1] / grid.edges()[0];
        let r1 = grid.edges()[100] / grid.edges()[99];
        assert!((r0 - r1).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_unordered_edges() {
        assert!(EnergyGrid::new(vec![1.0, 2.0, 2.0]).is_err());
        assert!(EnergyGrid::new(vec![2.0, 1.0]).is_err());
        assert!(EnergyGrid::new(vec![1.0]).is_err());
        assert!(EnergyGrid::new(vec![0.0, 1.0]).is_err());
    }

    #[test]
    fn test_widths_and_midpoints() {
        let grid = EnergyGrid::new(vec![1.0, 2.0, 4.0]).unwrap();
        let widths = grid.widths();
        let mids = grid.midpoints();
        assert!((widths[0] - 1.0).abs() < 1e-12);
        assert!((widths[1] - 2.0).abs() < 1e-12);
        assert!((mids[0] - 1.5).abs() < 1e-12);
        assert!((mids[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_keeps_binning() {
        let grid = EnergyGrid::new(vec![1.0, 2.0, 4.0]).unwrap();
        let shifted = grid.scaled(1.5);
        assert_eq!(shifted.nbin(), 2);
        assert!((shifted.edges()[0] - 1.5).abs() < 1e-12);
        assert!((shifted.edges()[2] - 6.0).abs() < 1e-12);
    }
}
