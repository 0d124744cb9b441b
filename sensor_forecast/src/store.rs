//! Persistence of the fitted model and scaler
//!
//! A model directory holds exactly one model and its scaler. Both files
//! must be present and readable for the pair to count as a usable model.

use crate::error::Result;
use crate::models::TrainedSequenceModel;
use sensor_math::MinMaxScaler;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the serialized model
pub const MODEL_FILE: &str = "lstm_model.json";

/// File name of the serialized scaler
pub const SCALER_FILE: &str = "scaler.json";

/// Reads and writes the model/scaler pair in one directory
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    /// Open a store, creating the directory if it does not exist
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory backing this store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the serialized model
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    /// Path of the serialized scaler
    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    /// Whether both artifacts are present
    pub fn exists(&self) -> bool {
        self.model_path().is_file() && self.scaler_path().is_file()
    }

    /// Persist the pair, replacing anything stored before
    ///
    /// Both files are written in full before either replaces the stored
    /// pair; a failed write leaves the previous pair in place.
    pub fn save<M: TrainedSequenceModel>(&self, model: &M, scaler: &MinMaxScaler) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let model_tmp = temp_path(&self.model_path());
        let scaler_tmp = temp_path(&self.scaler_path());

        let written = write_json(&model_tmp, model).and_then(|_| write_json(&scaler_tmp, scaler));
        if let Err(e) = written {
            let _ = fs::remove_file(&model_tmp);
            let _ = fs::remove_file(&scaler_tmp);
            return Err(e);
        }

        fs::rename(&model_tmp, self.model_path())?;
        fs::rename(&scaler_tmp, self.scaler_path())?;
        info!(dir = %self.dir.display(), model = model.name(), "Saved model and scaler");
        Ok(())
    }

    /// Restore the pair
    ///
    /// Returns `None` when either artifact is missing or cannot be read;
    /// read failures are logged, never returned.
    pub fn load<M: TrainedSequenceModel>(&self) -> Option<(M, MinMaxScaler)> {
        if !self.exists() {
            debug!(dir = %self.dir.display(), "No persisted model");
            return None;
        }

        let model = match read_json::<M>(&self.model_path()) {
            Ok(model) => model,
            Err(e) => {
                warn!(path = %self.model_path().display(), error = %e, "Error loading model");
                return None;
            }
        };
        let scaler = match read_json::<MinMaxScaler>(&self.scaler_path()) {
            Ok(scaler) => scaler,
            Err(e) => {
                warn!(path = %self.scaler_path().display(), error = %e, "Error loading scaler");
                return None;
            }
        };

        info!(dir = %self.dir.display(), model = model.name(), "Loaded persisted model");
        Some((model, scaler))
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
