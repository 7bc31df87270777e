use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use stokesdisc::args::Args;
use stokesdisc::grid::EnergyGrid;
use stokesdisc::model::{self, compute};
use stokesdisc::output::{
    write_parameter_dump, write_stokes_table, StokesMetadata, PARAMETERS_FILE, STOKES_TABLE_FILE,
};
use stokesdisc::params::{ModelParams, OutputKind};
use stokesdisc::plot;
use stokesdisc::table::TableSet;

/// Command-line stand-in for the host's per-spectrum metadata.
struct CliMetadata {
    xflt: Option<f64>,
}

impl StokesMetadata for CliMetadata {
    fn stokes_indicator(&self) -> Option<f64> {
        self.xflt
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let output_kind = OutputKind::from_code(args.stokes)
        .with_context(|| format!("unknown output selector code {}", args.stokes))?;
    let params = ModelParams::new(
        args.size,
        args.pho_index,
        args.cos_incl,
        args.pol_deg,
        args.chi,
        args.pos_ang,
        args.zshift,
        output_kind,
    )?;

    let grid = EnergyGrid::log_spaced(args.e_min, args.e_max, args.nbin)?;

    // --- Table Setup ---
    let table_dir = args
        .table_dir
        .clone()
        .unwrap_or_else(TableSet::resolve_dir);
    let tables = TableSet::load(&table_dir)
        .with_context(|| format!("loading reflection tables from {}", table_dir.display()))?;

    // --- Model Evaluation ---
    let metadata = CliMetadata { xflt: args.xflt };
    let result = compute(&grid, &params, &tables, &metadata)?;

    println!("inc_degrees = {:12.6}", result.inclination_deg);

    // --- Output Files ---
    if args.output {
        write_parameter_dump(&PathBuf::from(PARAMETERS_FILE), &params)
            .context("writing parameter dump")?;
    }

    if let Some(ref pol) = result.polarized {
        write_stokes_table(&PathBuf::from(STOKES_TABLE_FILE), &grid, &pol.stokes, &pol.derived)
            .context("writing per-bin Stokes table")?;

        if args.plot {
            let plot_path = PathBuf::from("stokes_quicklook.png");
            plot::quick_look(&plot_path, &grid, pol)
                .map_err(|e| anyhow::anyhow!("plotting failed: {}", e))?;
            println!("quick-look figure written to {}", plot_path.display());
        }
    } else if args.plot {
        eprintln!("stokesdisc: nothing to plot with the polarisation computations switched off");
    }

    // --- Result Summary ---
    let total: f64 = result.photar.sum();
    println!(
        "{} bins, {} output, summed photon array = {:.6e}",
        grid.nbin(),
        describe(&result),
        total
    );

    Ok(())
}

fn describe(result: &model::ModelOutput) -> &'static str {
    if result.polarized.is_some() {
        "polarised"
    } else {
        "unpolarised"
    }
}
