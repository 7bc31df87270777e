use std::f64::consts::PI;

use crate::error::StokesError;

/// Length of the model parameter vector.
pub const PARAM_COUNT: usize = 8;

/// Which quantity ends up in the returned photon array.
///
/// Codes follow the model's eighth parameter:
/// -1 deferred to the per-spectrum metadata, 0 unpolarised flux (polarisation
/// computations switched off), 1 polarised flux, 2 Q, 3 U, 4 V, 5 polarisation
/// degree, 6 polarisation angle psi, 7 Stokes angle beta, 8 Q/I, 9 U/I, 10 V/I.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Deferred,
    FluxUnpolarized,
    FluxPolarized,
    StokesQ,
    StokesU,
    StokesV,
    Degree,
    AnglePsi,
    AngleBeta,
    QOverI,
    UOverI,
    VOverI,
}

impl OutputKind {
    pub fn from_code(code: i32) -> Option<OutputKind> {
        match code {
            -1 => Some(OutputKind::Deferred),
            0 => Some(OutputKind::FluxUnpolarized),
            1 => Some(OutputKind::FluxPolarized),
            2 => Some(OutputKind::StokesQ),
            3 => Some(OutputKind::StokesU),
            4 => Some(OutputKind::StokesV),
            5 => Some(OutputKind::Degree),
            6 => Some(OutputKind::AnglePsi),
            7 => Some(OutputKind::AngleBeta),
            8 => Some(OutputKind::QOverI),
            9 => Some(OutputKind::UOverI),
            10 => Some(OutputKind::VOverI),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            OutputKind::Deferred => -1,
            OutputKind::FluxUnpolarized => 0,
            OutputKind::FluxPolarized => 1,
            OutputKind::StokesQ => 2,
            OutputKind::StokesU => 3,
            OutputKind::StokesV => 4,
            OutputKind::Degree => 5,
            OutputKind::AnglePsi => 6,
            OutputKind::AngleBeta => 7,
            OutputKind::QOverI => 8,
            OutputKind::UOverI => 9,
            OutputKind::VOverI => 10,
        }
    }
}

/// Model parameters in the fixed external ordering: size, photon index,
/// cosine of inclination, polarisation degree, polarisation angle (deg),
/// position angle (deg), redshift, output selector.
#[derive(Debug, Clone, Copy)]
pub struct ModelParams {
    pub size: f64,
    pub pho_index: f64,
    pub cos_incl: f64,
    pub pol_deg: f64,
    pub chi_deg: f64,
    pub pos_ang_deg: f64,
    pub zshift: f64,
    pub output: OutputKind,
}

impl ModelParams {
    pub fn new(
        size: f64,
        pho_index: f64,
        cos_incl: f64,
        pol_deg: f64,
        chi_deg: f64,
        pos_ang_deg: f64,
        zshift: f64,
        output: OutputKind,
    ) -> Result<ModelParams, StokesError> {
        let params = ModelParams {
            size,
            pho_index,
            cos_incl,
            pol_deg,
            chi_deg,
            pos_ang_deg,
            zshift,
            output,
        };
        params.validate()?;
        Ok(params)
    }

    /// Build from the raw external 8-slot parameter vector.
    pub fn from_slice(par: &[f64]) -> Result<ModelParams, StokesError> {
        if par.len() != PARAM_COUNT {
            return Err(StokesError::Param(format!(
                "expected {} parameters, got {}",
                PARAM_COUNT,
                par.len()
            )));
        }
        let code = par[7] as i32;
        let output = OutputKind::from_code(code).ok_or_else(|| {
            StokesError::Param(format!("unknown output selector code {}", code))
        })?;
        ModelParams::new(par[0], par[1], par[2], par[3], par[4], par[5], par[6], output)
    }

    fn validate(&self) -> Result<(), StokesError> {
        if !(0.0..=1.0).contains(&self.pol_deg) {
            return Err(StokesError::Param(format!(
                "polarisation degree must lie in [0, 1], got {}",
                self.pol_deg
            )));
        }
        if !(0.0..=1.0).contains(&self.cos_incl) {
            return Err(StokesError::Param(format!(
                "cos_incl must lie in [0, 1], got {}",
                self.cos_incl
            )));
        }
        if self.zshift <= -1.0 {
            return Err(StokesError::Param(format!(
                "redshift must be above -1, got {}",
                self.zshift
            )));
        }
        Ok(())
    }

    /// Polarisation angle in radians. Only ever used through cos(2 chi) and
    /// sin(2 chi), so any representative modulo 180 degrees is equivalent.
    pub fn chi(&self) -> f64 {
        self.chi_deg / 180.0 * PI
    }

    /// Position angle in radians, same 180-degree degeneracy as `chi`.
    pub fn pos_ang(&self) -> f64 {
        self.pos_ang_deg / 180.0 * PI
    }

    /// Observer inclination in degrees, the per-call diagnostic value.
    pub fn inclination_deg(&self) -> f64 {
        self.cos_incl.acos() / PI * 180.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_kind_codes_round_trip() {
        for code in -1..=10 {
            let kind = OutputKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert!(OutputKind::from_code(11).is_none());
        assert!(OutputKind::from_code(-2).is_none());
    }

    #[test]
    fn test_from_slice_ordering() {
        let par = [0.3, 2.0, 0.775, 0.1, 30.0, 45.0, 0.0, 1.0];
        let params = ModelParams::from_slice(&par).unwrap();
        assert!((params.size - 0.3).abs() < 1e-12);
        assert!((params.pho_index - 2.0).abs() < 1e-12);
        assert!((params.cos_incl - 0.775).abs() < 1e-12);
        assert!((params.pol_deg - 0.1).abs() < 1e-12);
        assert!((params.chi_deg - 30.0).abs() < 1e-12);
        assert!((params.pos_ang_deg - 45.0).abs() < 1e-12);
        assert_eq!(params.output, OutputKind::FluxPolarized);
    }

    #[test]
    fn test_rejects_out_of_range_degree() {
        let par = [0.3, 2.0, 0.775, 1.5, 0.0, 0.0, 0.0, 1.0];
        assert!(ModelParams::from_slice(&par).is_err());
        let par = [0.3, 2.0, 0.775, -0.1, 0.0, 0.0, 0.0, 1.0];
        assert!(ModelParams::from_slice(&par).is_err());
    }

    #[test]
    fn test_rejects_unknown_selector() {
        let par = [0.3, 2.0, 0.775, 0.0, 0.0, 0.0, 0.0, 11.0];
        assert!(ModelParams::from_slice(&par).is_err());
    }

    #[test]
    fn test_inclination_diagnostic() {
        let par = [0.3, 2.0, 0.5, 0.0, 0.0, 0.0, 0.0, 1.0];
        let params = ModelParams::from_slice(&par).unwrap();
        // acos(0.5) = 60 degrees
        assert!((params.inclination_deg() - 60.0).abs() < 1e-9);
    }
}
