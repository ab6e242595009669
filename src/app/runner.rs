use crate::civec_impl::{CiVector, DistCiVector, SpinOperators};
use crate::comm_impl::run_ranks;
use crate::config::Config;
use crate::davidson_impl::{generate_guess, CiSolution, CiSolver};
use crate::hamiltonian_impl::{HubbardModel, SigmaBuilder};
use crate::io::{from_record, load_archive};
use crate::space_impl::{DeterminantSpace, SpaceParams, MAX_ORBITALS};
use color_eyre::eyre::{ensure, eyre, Result, WrapErr};
use nalgebra::DMatrix;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Converged (or last) states of a run, gathered as local vectors
pub struct CalculationResult {
    pub space: SpaceParams,
    pub solution: CiSolution<CiVector<f64>>,
    /// <S^2> of every state
    pub spins: Vec<f64>,
}

pub fn build_space(config: &Config) -> Result<Arc<DeterminantSpace>> {
    let params = config.space.params();
    let norb = params.norb();
    ensure!(
        norb <= MAX_ORBITALS,
        "{} orbitals exceed the limit of {}",
        norb,
        MAX_ORBITALS
    );
    ensure!(
        params.nelea <= norb && params.neleb <= norb,
        "{} alpha / {} beta electrons do not fit into {} orbitals",
        params.nelea,
        params.neleb,
        norb
    );
    let space = DeterminantSpace::new(params);
    ensure!(space.size() > 0, "determinant space {} is empty", space);
    Ok(Arc::new(space))
}

pub fn build_model(config: &Config) -> Result<HubbardModel> {
    let norb = config.space.params().norb();
    let model = &config.model;
    let interaction = model.interaction.unwrap_or(0.0);

    match &model.one_body {
        Some(rows) => {
            ensure!(
                rows.len() == norb && rows.iter().all(|r| r.len() == norb),
                "one_body must be a {} x {} matrix",
                norb,
                norb
            );
            let matrix = DMatrix::from_fn(norb, norb, |i, j| rows[i][j]);
            ensure!(
                (&matrix - matrix.transpose()).amax() < 1e-12,
                "one_body matrix is not symmetric"
            );
            Ok(HubbardModel::new(matrix, interaction))
        }
        None => Ok(HubbardModel::chain(
            norb,
            model.hopping.unwrap_or(1.0),
            model.periodic.unwrap_or(false),
            interaction,
        )),
    }
}

pub fn configure_solver(config: &Config) -> CiSolver {
    CiSolver {
        nstate: config.nstate(),
        max_iter: config.max_iter(),
        max_subspace: config.max_subspace().max(2 * config.nstate()),
        thresh: config.convergence_threshold(),
        spin_thresh: config.spin_threshold(),
        verbose: true,
    }
}

/// Guess vectors stored by an earlier run over the same space
pub fn load_guess(path: &str, space: &DeterminantSpace) -> Result<Vec<CiVector<f64>>> {
    let records = load_archive::<f64>(Path::new(path))?;
    records
        .into_iter()
        .map(|record| {
            ensure!(
                record.space == space.params(),
                "archive {} was written for a different determinant space",
                path
            );
            from_record(record)
        })
        .collect::<Result<Vec<_>>>()
        .wrap_err_with(|| format!("Unable to restart from {}", path))
}

fn solve<V: SpinOperators>(
    solver: &CiSolver,
    model: &HubbardModel,
    template: V,
    guess: Option<Vec<V>>,
    spin_adapt: bool,
) -> Result<CiSolution<V>> {
    let guess = match guess {
        Some(guess) => guess,
        None => {
            let denom = model.denominator(&template);
            generate_guess(&denom, solver.nstate, spin_adapt)?
        }
    };
    if spin_adapt {
        solver.solve_spin_adapted(model, guess)
    } else {
        solver.solve(model, guess)
    }
}

/// Runs the Davidson solver with local vectors (one rank) or distributed
/// vectors over an in-process world of `config.ranks()` ranks
pub fn run_calculation(config: &Config) -> Result<CalculationResult> {
    let space = build_space(config)?;
    let model = build_model(config)?;
    let solver = configure_solver(config);
    let spin_adapt = config.spin_adapt();
    let restart = config
        .restart
        .as_deref()
        .map(|path| load_guess(path, &space))
        .transpose()?;
    let ranks = config.ranks();

    info!("Determinant space: {}", space);
    info!(
        "Model: {} orbitals, on-site interaction {:.4}",
        model.norb(),
        model.interaction()
    );

    if ranks <= 1 {
        info!("Running with local CI vectors");
        let template = CiVector::<f64>::zeros(space.clone());
        let solution = solve(&solver, &model, template, restart, spin_adapt)?;
        let spins = solution
            .vectors
            .iter()
            .map(|v| v.spin_expectation())
            .collect();
        return Ok(CalculationResult {
            space: space.params(),
            solution,
            spins,
        });
    }

    info!("Running with distributed CI vectors on {} ranks", ranks);
    let results = run_ranks(ranks, |comm| -> Result<CalculationResult> {
        let solver = CiSolver {
            verbose: comm.is_root(),
            ..solver.clone()
        };
        let template = DistCiVector::<f64>::new(space.clone(), comm.clone());
        let guess = restart.as_ref().map(|vectors| {
            vectors
                .iter()
                .map(|v| DistCiVector::from_local(v, comm.clone()))
                .collect()
        });
        let CiSolution {
            energies,
            vectors,
            errors,
            converged,
            iterations,
        } = solve(&solver, &model, template, guess, spin_adapt)?;

        let spins = vectors.iter().map(|v| v.spin_expectation()).collect();
        let vectors = vectors.iter().map(|v| v.to_local()).collect();
        Ok(CalculationResult {
            space: space.params(),
            solution: CiSolution {
                energies,
                vectors,
                errors,
                converged,
                iterations,
            },
            spins,
        })
    })?;

    results
        .into_iter()
        .next()
        .ok_or_else(|| eyre!("no rank returned a result"))?
}
