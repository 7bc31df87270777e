use std::env;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::prelude::*;

use crate::error::StokesError;
use crate::grid::EnergyGrid;
use crate::params::ModelParams;

pub const TABLE_MAGIC: [u8; 4] = *b"STBL";
pub const TABLE_VERSION: i32 = 1;

/// Directory holding the reflection table files; falls back to the working
/// directory when unset.
pub const TABLE_DIR_ENV: &str = "STOKES_TABLE_DIR";

/// Incident-polarisation state of a precomputed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisKind {
    Unpolarized,
    Horizontal,
    Diagonal,
}

impl BasisKind {
    pub const ALL: [BasisKind; 3] = [
        BasisKind::Unpolarized,
        BasisKind::Horizontal,
        BasisKind::Diagonal,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            BasisKind::Unpolarized => "stokes-neutral-iso-UNPOL-disc.stbl",
            BasisKind::Horizontal => "stokes-neutral-iso-HRPOL-disc.stbl",
            BasisKind::Diagonal => "stokes-neutral-iso-45DEG-disc.stbl",
        }
    }
}

/// Source of energy-binned basis responses. The engine only ever asks for
/// one (basis, channel) spectrum at a time, rebinned onto the caller's grid;
/// the second array carries the provider's interpolation errors.
pub trait TableSampler {
    fn sample(
        &self,
        grid: &EnergyGrid,
        params: &ModelParams,
        basis: BasisKind,
        channel: usize,
    ) -> Result<(Array1<f64>, Array1<f64>), StokesError>;
}

/// One precomputed reflection table: per-bin spectra tabulated over a
/// (size, photon index, cos_incl) parameter grid, three Stokes channels each.
///
/// On-disk layout (little endian):
/// magic "STBL", version i32, four i32 grid lengths (size, gamma, mu,
/// energy edges), the four f64 grids, channel count i32, then the f32
/// payload ordered size / gamma / mu / channel / energy bin, bin innermost.
#[derive(Debug)]
pub struct ReflectionTable {
    size_grid: Vec<f64>,
    gamma_grid: Vec<f64>,
    mu_grid: Vec<f64>,
    energy_edges: Vec<f64>,
    channels: usize,
    values: Vec<f32>,
}

fn read_grid(cursor: &mut Cursor<&[u8]>, n: usize, what: &str) -> Result<Vec<f64>, StokesError> {
    let mut grid = Vec::with_capacity(n);
    for _ in 0..n {
        grid.push(cursor.read_f64::<LittleEndian>()?);
    }
    for pair in grid.windows(2) {
        if pair[1] <= pair[0] {
            return Err(StokesError::Table(format!(
                "{} grid must be strictly increasing ({} -> {})",
                what, pair[0], pair[1]
            )));
        }
    }
    Ok(grid)
}

fn read_count(cursor: &mut Cursor<&[u8]>, what: &str) -> Result<usize, StokesError> {
    let n = cursor.read_i32::<LittleEndian>()?;
    if n <= 0 {
        return Err(StokesError::Table(format!("non-positive {} count {}", what, n)));
    }
    Ok(n as usize)
}

impl ReflectionTable {
    pub fn parse(bytes: &[u8]) -> Result<ReflectionTable, StokesError> {
        let mut cursor = Cursor::new(bytes);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != TABLE_MAGIC {
            return Err(StokesError::Table(format!("bad magic word {:?}", magic)));
        }
        let version = cursor.read_i32::<LittleEndian>()?;
        if version != TABLE_VERSION {
            return Err(StokesError::Table(format!(
                "unsupported table version {}",
                version
            )));
        }

        let n_size = read_count(&mut cursor, "size")?;
        let n_gamma = read_count(&mut cursor, "photon index")?;
        let n_mu = read_count(&mut cursor, "cos_incl")?;
        let n_energy = read_count(&mut cursor, "energy edge")?;
        if n_energy < 2 {
            return Err(StokesError::Table(
                "table needs at least two energy edges".to_string(),
            ));
        }

        let size_grid = read_grid(&mut cursor, n_size, "size")?;
        let gamma_grid = read_grid(&mut cursor, n_gamma, "photon index")?;
        let mu_grid = read_grid(&mut cursor, n_mu, "cos_incl")?;
        let energy_edges = read_grid(&mut cursor, n_energy, "energy")?;

        let channels = read_count(&mut cursor, "channel")?;

        let nbin = n_energy - 1;
        let count = n_size * n_gamma * n_mu * channels * nbin;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(cursor.read_f32::<LittleEndian>()?);
        }
        if cursor.position() != bytes.len() as u64 {
            return Err(StokesError::Table(format!(
                "{} trailing bytes after table payload",
                bytes.len() as u64 - cursor.position()
            )));
        }

        Ok(ReflectionTable {
            size_grid,
            gamma_grid,
            mu_grid,
            energy_edges,
            channels,
            values,
        })
    }

    pub fn open(path: &Path) -> Result<ReflectionTable, StokesError> {
        let file = File::open(path).map_err(|e| {
            StokesError::Table(format!("cannot open table file {}: {}", path.display(), e))
        })?;
        let mmap = unsafe { Mmap::map(&file)? };
        ReflectionTable::parse(&mmap[..])
    }

    pub fn nbin(&self) -> usize {
        self.energy_edges.len() - 1
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn energy_edges(&self) -> &[f64] {
        &self.energy_edges
    }

    fn spectrum(&self, is: usize, ig: usize, im: usize, channel: usize) -> &[f32] {
        let nbin = self.nbin();
        let idx = ((is * self.gamma_grid.len() + ig) * self.mu_grid.len() + im) * self.channels
            + channel;
        &self.values[idx * nbin..(idx + 1) * nbin]
    }

    /// Per-bin spectrum at arbitrary (size, gamma, mu), trilinearly
    /// interpolated with clamping at the parameter grid edges.
    pub fn interpolated(
        &self,
        size: f64,
        gamma: f64,
        mu: f64,
        channel: usize,
    ) -> Result<Vec<f64>, StokesError> {
        if channel >= self.channels {
            return Err(StokesError::Table(format!(
                "channel {} out of range (table has {})",
                channel, self.channels
            )));
        }

        let (is0, is1, ws) = bracket(&self.size_grid, size);
        let (ig0, ig1, wg) = bracket(&self.gamma_grid, gamma);
        let (im0, im1, wm) = bracket(&self.mu_grid, mu);

        let mut out = vec![0.0f64; self.nbin()];
        for &(is, w_s) in &[(is0, 1.0 - ws), (is1, ws)] {
            for &(ig, w_g) in &[(ig0, 1.0 - wg), (ig1, wg)] {
                for &(im, w_m) in &[(im0, 1.0 - wm), (im1, wm)] {
                    let w = w_s * w_g * w_m;
                    if w == 0.0 {
                        continue;
                    }
                    let spec = self.spectrum(is, ig, im, channel);
                    for (o, &v) in out.iter_mut().zip(spec.iter()) {
                        *o += w * v as f64;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Interpolate and rebin onto the caller's grid. The redshift moves the
    /// evaluation onto the blueshifted grid E (1+z) and scales the counts by
    /// 1/(1+z), conserving the energy-integrated photon number.
    pub fn sample_onto(
        &self,
        grid: &EnergyGrid,
        size: f64,
        gamma: f64,
        mu: f64,
        zshift: f64,
        channel: usize,
    ) -> Result<Array1<f64>, StokesError> {
        let contents = self.interpolated(size, gamma, mu, channel)?;
        let factor = 1.0 + zshift;
        if factor <= 0.0 {
            return Err(StokesError::Table(format!(
                "redshift {} puts the evaluation grid at non-positive energies",
                zshift
            )));
        }
        let rebinned = rebin_onto(&self.energy_edges, &contents, &grid.scaled(factor));
        Ok(rebinned / factor)
    }
}

/// Clamped bracketing of `x` in a sorted grid: the two neighbouring indices
/// and the linear weight of the upper one.
fn bracket(grid: &[f64], x: f64) -> (usize, usize, f64) {
    let n = grid.len();
    if n == 1 || x <= grid[0] {
        return (0, 0, 0.0);
    }
    if x >= grid[n - 1] {
        return (n - 1, n - 1, 0.0);
    }
    let mut i = 0;
    while x >= grid[i + 1] {
        i += 1;
    }
    (i, i + 1, (x - grid[i]) / (grid[i + 1] - grid[i]))
}

/// Redistribute per-bin contents from one binning onto another by fractional
/// overlap. Counts are conserved where the binnings overlap; target bins
/// outside the source range stay zero.
pub fn rebin_onto(src_edges: &[f64], contents: &[f64], target: &EnergyGrid) -> Array1<f64> {
    let t_edges = target.edges();
    let n_target = target.nbin();
    let mut out = Array1::zeros(n_target);

    let mut it = 0usize;
    for (is, &content) in contents.iter().enumerate() {
        let s0 = src_edges[is];
        let s1 = src_edges[is + 1];
        let density = content / (s1 - s0);

        while it < n_target && t_edges[it + 1] <= s0 {
            it += 1;
        }
        let mut jt = it;
        while jt < n_target && t_edges[jt] < s1 {
            let lo = t_edges[jt].max(s0);
            let hi = t_edges[jt + 1].min(s1);
            if hi > lo {
                out[jt] += density * (hi - lo);
            }
            jt += 1;
        }
    }
    out
}

/// The three table files of the model, resolved from one directory.
#[derive(Debug)]
pub struct TableSet {
    unpolarized: ReflectionTable,
    horizontal: ReflectionTable,
    diagonal: ReflectionTable,
}

impl TableSet {
    /// Table directory: `STOKES_TABLE_DIR` when set, else the working
    /// directory.
    pub fn resolve_dir() -> PathBuf {
        match env::var(TABLE_DIR_ENV) {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from("."),
        }
    }

    pub fn load(dir: &Path) -> Result<TableSet, StokesError> {
        Ok(TableSet {
            unpolarized: ReflectionTable::open(&dir.join(BasisKind::Unpolarized.file_name()))?,
            horizontal: ReflectionTable::open(&dir.join(BasisKind::Horizontal.file_name()))?,
            diagonal: ReflectionTable::open(&dir.join(BasisKind::Diagonal.file_name()))?,
        })
    }

    pub fn load_default() -> Result<TableSet, StokesError> {
        TableSet::load(&TableSet::resolve_dir())
    }

    fn table(&self, basis: BasisKind) -> &ReflectionTable {
        match basis {
            BasisKind::Unpolarized => &self.unpolarized,
            BasisKind::Horizontal => &self.horizontal,
            BasisKind::Diagonal => &self.diagonal,
        }
    }
}

impl TableSampler for TableSet {
    fn sample(
        &self,
        grid: &EnergyGrid,
        params: &ModelParams,
        basis: BasisKind,
        channel: usize,
    ) -> Result<(Array1<f64>, Array1<f64>), StokesError> {
        let response = self.table(basis).sample_onto(
            grid,
            params.size,
            params.pho_index,
            params.cos_incl,
            params.zshift,
            channel,
        )?;
        // interpolation errors are not modelled by this format
        let errors = Array1::zeros(response.len());
        Ok((response, errors))
    }
}
