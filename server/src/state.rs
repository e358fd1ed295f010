use std::path::PathBuf;
use std::sync::Arc;

use isoline_shared::config::DATA_FILE_NAME;
use isoline_shared::parse_feature_collection;

use crate::config::{data_dir, dist_dir};

#[derive(Clone)]
pub struct AppState {
    pub data_dir: Arc<PathBuf>,
    pub dist_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, dist_dir: PathBuf) -> Self {
        Self {
            data_dir: Arc::new(data_dir),
            dist_dir: Arc::new(dist_dir),
        }
    }

    pub fn from_env() -> Self {
        Self::new(data_dir(), dist_dir())
    }

    pub fn data_file(&self) -> PathBuf {
        self.data_dir.join(DATA_FILE_NAME)
    }

    /// Read and parse the isoline collection, returning its feature count.
    pub async fn feature_count(&self) -> Result<usize, String> {
        let path = self.data_file();
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("read error: {}: {e}", path.display()))?;
        let data = parse_feature_collection(&text)?;
        Ok(data.features.len())
    }
}
