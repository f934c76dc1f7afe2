// Durable best-score storage

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Best score storage errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed score file: {0}")]
    Format(#[from] serde_json::Error),
}

/// Key-value hook for the best score
pub trait ScoreStore {
    fn load_best(&mut self) -> Result<u32, PersistenceError>;
    fn save_best(&mut self, best: u32) -> Result<(), PersistenceError>;
}

/// In-process store; forgets everything on exit
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    best: u32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn load_best(&mut self) -> Result<u32, PersistenceError> {
        Ok(self.best)
    }

    fn save_best(&mut self, best: u32) -> Result<(), PersistenceError> {
        self.best = best;
        Ok(())
    }
}

/// On-disk record
#[derive(Debug, Default, Serialize, Deserialize)]
struct BestScoreRecord {
    best_score: u32,
}

/// Best score kept in a small JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScoreStore for JsonFileStore {
    fn load_best(&mut self) -> Result<u32, PersistenceError> {
        if !self.path.exists() {
            log::info!("No best score at {}, starting fresh", self.path.display());
            return Ok(0);
        }

        let json = std::fs::read_to_string(&self.path)?;
        let record: BestScoreRecord = serde_json::from_str(&json)?;
        log::info!("Loaded best score {}", record.best_score);
        Ok(record.best_score)
    }

    fn save_best(&mut self, best: u32) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(&BestScoreRecord { best_score: best })?;
        std::fs::write(&self.path, json)?;
        log::info!("Best score {} saved to {}", best, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rusted-stack-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryStore::new();
        assert_eq!(store.load_best().unwrap(), 0);
        store.save_best(12).unwrap();
        assert_eq!(store.load_best().unwrap(), 12);
    }

    #[test]
    fn test_missing_file_reads_zero() {
        let mut store = JsonFileStore::new(temp_path("missing"));
        assert_eq!(store.load_best().unwrap(), 0);
    }

    #[test]
    fn test_file_survives_reopen() {
        let path = temp_path("reopen");
        JsonFileStore::new(&path).save_best(31).unwrap();

        let mut reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.load_best().unwrap(), 31);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "best score: lots").unwrap();

        let result = JsonFileStore::new(&path).load_best();
        assert!(matches!(result, Err(PersistenceError::Format(_))));

        std::fs::remove_file(&path).unwrap();
    }
}
