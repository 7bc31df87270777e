use clap::Parser;
pub use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "stokesdisc",
    version = "1.0",
    about = "Polarised X-ray reflection from a neutral disc illuminated by a power law.",
    after_help = "Reflection table files are looked up in --table-dir, then in the
STOKES_TABLE_DIR environment variable, then in the working directory."
)]
pub struct Args {
    /// Upper limit of the cos_incl_incident integration, representing the corona size.
    #[arg(long, aliases = ["si", "siz"], default_value_t = 0.3)]
    pub size: f64,

    /// Photon index of the primary power-law flux.
    #[arg(long, aliases = ["gamma", "pho"], default_value_t = 2.0)]
    pub pho_index: f64,

    /// Cosine of the observer inclination (1 pole-on, 0 disc-plane).
    #[arg(long, aliases = ["mu", "incl"], default_value_t = 0.775)]
    pub cos_incl: f64,

    /// Intrinsic polarisation degree of the primary radiation (0 to 1).
    #[arg(long, aliases = ["pd", "pol"], default_value_t = 0.0)]
    pub pol_deg: f64,

    /// Intrinsic polarisation angle chi in degrees (180-degree degenerate).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub chi: f64,

    /// Position angle of the system rotation axis in degrees (180-degree degenerate).
    #[arg(long, aliases = ["pa"], default_value_t = 0.0, allow_negative_numbers = true)]
    pub pos_ang: f64,

    /// Overall Doppler shift.
    #[arg(long, aliases = ["z", "redshift"], default_value_t = 0.0, allow_negative_numbers = true)]
    pub zshift: f64,

    /// Output selector: -1 metadata-driven, 0 unpolarised flux, 1 polarised flux,
    /// 2 Q, 3 U, 4 V, 5 degree, 6 angle psi, 7 Stokes angle beta, 8 Q/I, 9 U/I, 10 V/I.
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub stokes: i32,

    /// Lower edge of the energy grid in keV.
    #[arg(long, default_value_t = 1.0)]
    pub e_min: f64,

    /// Upper edge of the energy grid in keV.
    #[arg(long, default_value_t = 100.0)]
    pub e_max: f64,

    /// Number of logarithmic energy bins.
    #[arg(long, aliases = ["ne", "bins"], default_value_t = 200)]
    pub nbin: usize,

    /// Directory containing the three reflection table files.
    #[arg(long)]
    pub table_dir: Option<PathBuf>,

    /// Stand-in for the per-spectrum data-type indicator (0 counts, 1 Q, 2 U),
    /// only consulted when --stokes -1 is requested.
    #[arg(long)]
    pub xflt: Option<f64>,

    /// Generate and save a quick-look plot of flux, degree and angle.
    #[arg(long, aliases = ["pl", "plo"])]
    pub plot: bool,

    /// Write the input parameters to a text file.
    #[arg(long, aliases = ["ou", "out", "outp", "outpu"])]
    pub output: bool,
}
