//! Serialized CI vectors
//!
//! A record stores the parameters of its determinant space together with the
//! flat amplitude buffer, which is enough to rebuild the vector because the
//! block layout is a deterministic function of the parameters.

use color_eyre::eyre::{ensure, Result, WrapErr};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::civec_impl::{Amplitude, CiVector, CiVectorOps};
use crate::space_impl::{DeterminantSpace, SpaceParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiVectorRecord<T> {
    pub space: SpaceParams,
    pub data: Vec<T>,
}

pub fn to_record<T: Amplitude>(cc: &CiVector<T>) -> CiVectorRecord<T> {
    CiVectorRecord {
        space: cc.space().params(),
        data: cc.data().to_vec(),
    }
}

/// Rebuilds a vector; fails if the buffer does not fit the space
pub fn from_record<T: Amplitude>(record: CiVectorRecord<T>) -> Result<CiVector<T>> {
    let space = Arc::new(DeterminantSpace::new(record.space));
    ensure!(
        record.data.len() == space.size(),
        "archived vector has {} amplitudes, its space {} needs {}",
        record.data.len(),
        space,
        space.size()
    );
    Ok(CiVector::from_data(space, record.data))
}

pub fn save_archive<T: Serialize>(path: &Path, records: &[CiVectorRecord<T>]) -> Result<()> {
    let text = serde_yml::to_string(records).wrap_err("Failed to serialize CI vectors")?;
    fs::write(path, text)
        .wrap_err_with(|| format!("Unable to write archive: {}", path.display()))?;
    info!("{} CI vectors written to {}", records.len(), path.display());
    Ok(())
}

pub fn load_archive<T: DeserializeOwned>(path: &Path) -> Result<Vec<CiVectorRecord<T>>> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("Unable to read archive: {}", path.display()))?;
    serde_yml::from_str(&text)
        .wrap_err_with(|| format!("Failed to parse archive: {}", path.display()))
}
