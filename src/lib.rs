//! Block-structured RAS CI vectors, local and distributed over in-process
//! ranks, with the operator algebra and Davidson solver built on them.

pub mod app;
pub mod block_impl;
pub mod civec_impl;
pub mod comm_impl;
pub mod config;
pub mod davidson_impl;
pub mod hamiltonian_impl;
pub mod io;
pub mod space_impl;

pub use civec_impl::{
    Amplitude, CiVector, CiVectorOps, Complex64, Determinant, DistCiVector, PendingTranspose,
    RowFetch, SpinOperators,
};
pub use comm_impl::{run_ranks, Communicator};
pub use davidson_impl::{generate_guess, CiSolution, CiSolver, DavidsonDiag};
pub use hamiltonian_impl::{HubbardModel, SigmaBuilder};
pub use space_impl::{Action, BlockInfo, DeterminantSpace, SpaceParams, Spin, StaticDist};
