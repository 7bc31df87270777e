use ndarray::prelude::*;

use crate::angles::{recenter, unwrap_from_top};

/// Additive guard against division by a vanishing intensity or a degenerate
/// Stokes vector.
pub const STOKES_EPS: f64 = 1e-99;

/// Raw table responses for the three illumination bases. Each array has shape
/// (3, nbin): rows are the table's Stokes selector channels 0/1/2, which map
/// to the I/Q/U response of that basis.
#[derive(Debug, Clone)]
pub struct BasisSet {
    pub unpolarized: Array2<f64>,
    pub horizontal: Array2<f64>,
    pub diagonal: Array2<f64>,
}

/// Responses of the polarised bases expressed as differences against the
/// unpolarised baseline. The baseline keeps its own I/Q/U channels untouched.
#[derive(Debug, Clone)]
pub struct DifferentialSet {
    pub unpolarized: Array2<f64>,
    pub d_horizontal: Array2<f64>,
    pub d_diagonal: Array2<f64>,
}

impl BasisSet {
    pub fn nbin(&self) -> usize {
        self.unpolarized.ncols()
    }

    /// Subtract the unpolarised baseline from both polarised bases,
    /// channel by channel.
    pub fn into_differential(self) -> DifferentialSet {
        let d_horizontal = &self.horizontal - &self.unpolarized;
        let d_diagonal = &self.diagonal - &self.unpolarized;
        DifferentialSet {
            unpolarized: self.unpolarized,
            d_horizontal,
            d_diagonal,
        }
    }
}

/// Per-bin Stokes parameters of the reflected spectrum. V has no source in
/// the reflection tables and stays zero.
#[derive(Debug, Clone)]
pub struct StokesSpectrum {
    pub i: Array1<f64>,
    pub q: Array1<f64>,
    pub u: Array1<f64>,
    pub v: Array1<f64>,
}

impl DifferentialSet {
    /// Combine the baseline with the differential responses for an incident
    /// polarisation degree `pol_deg` and angle `chi` (radians).
    ///
    /// The three bases span the 180-degree-periodic space of linear incident
    /// polarisation; radiative transfer is linear in Stokes space, so the
    /// weights (-pol_deg cos 2chi, pol_deg sin 2chi) recover any incident
    /// state. pol_deg = 0 collapses to the baseline for every chi.
    pub fn superpose(&self, pol_deg: f64, chi: f64) -> StokesSpectrum {
        let w_h = -pol_deg * (2.0 * chi).cos();
        let w_d = pol_deg * (2.0 * chi).sin();

        let i = &self.unpolarized.row(0) + &(&self.d_horizontal.row(0) * w_h)
            + &(&self.d_diagonal.row(0) * w_d);
        let q = &self.unpolarized.row(1) + &(&self.d_horizontal.row(1) * w_h)
            + &(&self.d_diagonal.row(1) * w_d);
        let u = &self.unpolarized.row(2) + &(&self.d_horizontal.row(2) * w_h)
            + &(&self.d_diagonal.row(2) * w_d);
        let v = Array1::zeros(i.len());

        StokesSpectrum { i, q, u, v }
    }
}

impl StokesSpectrum {
    pub fn nbin(&self) -> usize {
        self.i.len()
    }

    /// Rotate Q/U into the sky frame by twice the position angle. A zero
    /// position angle is the exact identity.
    pub fn rotate(&mut self, pos_ang: f64) {
        if pos_ang == 0.0 {
            return;
        }
        let cos2p = (2.0 * pos_ang).cos();
        let sin2p = (2.0 * pos_ang).sin();
        for ie in 0..self.q.len() {
            let q = self.q[ie];
            let u = self.u[ie];
            self.q[ie] = q * cos2p - u * sin2p;
            self.u[ie] = u * cos2p + q * sin2p;
        }
    }

    /// Per-bin polarisation degree, polarisation angle psi and Stokes angle
    /// beta (both in degrees), with branch jumps unwrapped from the top of
    /// the grid down and the final sequences recentred.
    pub fn derived(&self) -> DerivedQuantities {
        let n = self.nbin();
        let mut degree = Array1::zeros(n);
        let mut psi = vec![0.0f64; n];
        let mut beta = vec![0.0f64; n];

        for ie in (0..n).rev() {
            let q = self.q[ie];
            let u = self.u[ie];
            let v = self.v[ie];
            let lin = (q * q + u * u + v * v).sqrt();
            degree[ie] = lin / (self.i[ie] + STOKES_EPS);
            psi[ie] = 0.5 * u.atan2(q).to_degrees();
            beta[ie] = 0.5 * (v / (q * q + u * u + v * v + STOKES_EPS).sqrt()).asin().to_degrees();
        }

        let (psi_min, psi_max) = unwrap_from_top(&mut psi);
        recenter(&mut psi, psi_min, psi_max);
        let (beta_min, beta_max) = unwrap_from_top(&mut beta);
        recenter(&mut beta, beta_min, beta_max);

        DerivedQuantities {
            degree,
            psi: Array1::from_vec(psi),
            beta: Array1::from_vec(beta),
        }
    }
}

/// Derived per-bin polarisation quantities. The angle sequences are
/// continuous across the grid.
#[derive(Debug, Clone)]
pub struct DerivedQuantities {
    pub degree: Array1<f64>,
    pub psi: Array1<f64>,
    pub beta: Array1<f64>,
}
