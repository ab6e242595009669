use super::runner::CalculationResult;
use crate::civec_impl::CiVectorOps;
use tracing::info;

pub fn report_summary(result: &CalculationResult, print_threshold: f64) {
    let solution = &result.solution;
    info!("");
    info!("===========================================");
    info!("        RAS CI Results Summary");
    info!("===========================================");
    info!(
        "Davidson finished after {} iterations ({})",
        solution.iterations,
        if solution.all_converged() {
            "converged"
        } else {
            "not converged"
        }
    );

    for (i, vector) in solution.vectors.iter().enumerate() {
        info!("");
        info!(
            "State {}: E = {:.10}  <S^2> = {:.4}  error = {:.2e}",
            i, solution.energies[i], result.spins[i], solution.errors[i]
        );
        info!("  Amplitudes above {:.3}:", print_threshold);
        vector.print(print_threshold);
    }
    info!("===========================================");
}
