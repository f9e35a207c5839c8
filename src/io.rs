//! JSON snapshots of imported models
//!
//! A snapshot holds the assembled components and variables together with the
//! SBML records they were built from, so a loaded model still answers record
//! lookups and can be written back out as SBML.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

use thiserror::Error;

use crate::model::graph::Model;

/// Loads a model snapshot written by [`save_model`].
///
/// # Errors
///
/// * `IOError::FileNotFound` if the file cannot be opened
/// * `IOError::JsonParseError` if the contents are not a model snapshot
pub fn load_model(path: impl AsRef<Path>) -> Result<Model, IOError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let model: Model = serde_json::from_reader(reader)?;
    log::debug!("Loaded model \"{}\" from {}", model.name(), path.as_ref().display());
    Ok(model)
}

/// Writes a model snapshot as pretty-printed JSON.
pub fn save_model(path: impl AsRef<Path>, model: &Model) -> Result<(), IOError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, model)?;
    writer.flush()?;
    Ok(())
}

/// Errors that can occur while loading or saving model snapshots.
#[derive(Error, Debug)]
pub enum IOError {
    /// The file could not be opened, created or written.
    #[error("File not found: {0}")]
    FileNotFound(#[from] std::io::Error),

    /// The snapshot could not be encoded or decoded.
    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),
}
