//! Command-line argument parsing for RAS CI calculations

use clap::Parser;

/// RAS CI calculation with YAML configuration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    pub config_file: String,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override number of ranks (1 runs with local vectors)
    #[arg(long)]
    pub ranks: Option<usize>,

    /// Override number of states
    #[arg(long)]
    pub nstate: Option<usize>,

    /// Override maximum Davidson iterations
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Override maximum Davidson subspace size
    #[arg(long)]
    pub max_subspace: Option<usize>,

    /// Override convergence threshold on the residual norm
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Override spin adaptation (true / false)
    #[arg(long)]
    pub spin_adapt: Option<bool>,

    /// Write converged vectors to this archive
    #[arg(long)]
    pub archive: Option<String>,

    /// Read guess vectors from this archive
    #[arg(long)]
    pub restart: Option<String>,
}
