mod report;
mod runner;

pub use runner::{
    build_model, build_space, configure_solver, load_guess, run_calculation, CalculationResult,
};

use self::report::report_summary;
use crate::config::{Args, Config, ParallelParams, SolverParams};
use crate::io::{print_state_energies, save_archive, setup_output, to_record};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;
use tracing::info;

pub struct RasciApplication {
    args: Args,
    config: Config,
}

impl RasciApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = apply_overrides(&args, load_config(Path::new(&args.config_file))?);
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref());
        info!("Reading configuration from: {}", self.args.config_file);
        info!("Configuration loaded:\n{:?}", self.config);

        let result = run_calculation(&self.config)?;
        report_summary(&result, self.config.print_threshold());

        if let Some(path) = &self.config.archive {
            let records: Vec<_> = result.solution.vectors.iter().map(to_record).collect();
            save_archive(Path::new(path), &records)?;
        }

        if self.args.output.is_some() {
            print_state_energies(
                &mut std::io::stdout(),
                &result.solution.energies,
                &result.spins,
                &result.solution.converged,
            )?;
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let config_content = fs::read_to_string(path)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", path.display()))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults();

    Ok(config)
}

/// Command-line values take precedence over the configuration file
fn apply_overrides(args: &Args, mut config: Config) -> Config {
    let mut solver = config.solver.take().unwrap_or_default();
    solver.nstate = args.nstate.or(solver.nstate);
    solver.max_iter = args.max_iter.or(solver.max_iter);
    solver.max_subspace = args.max_subspace.or(solver.max_subspace);
    solver.convergence_threshold = args.threshold.or(solver.convergence_threshold);
    solver.spin_adapt = args.spin_adapt.or(solver.spin_adapt);
    config.solver = Some(SolverParams::with_defaults(solver));

    if let Some(ranks) = args.ranks {
        config.parallel = Some(ParallelParams { ranks: Some(ranks) });
    }
    config.archive = args.archive.clone().or(config.archive);
    config.restart = args.restart.clone().or(config.restart);
    config
}
