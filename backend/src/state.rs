use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use burn::backend::Autodiff;
use tokio::sync::Semaphore;
use vgg::{MainBackend, Vgg};

pub type DiffBackend = Autodiff<MainBackend>;

#[derive(Clone)]
pub struct AppState {
    /// Frozen extractor, shared read-only by every run.
    pub vgg: Arc<Vgg<DiffBackend>>,
    pub data_dir: PathBuf,
    /// Single permit; concurrent transfer requests queue here.
    pub run_slot: Arc<Semaphore>,
}

impl AppState {
    pub fn new(weights: &Path, data_dir: PathBuf) -> anyhow::Result<Self> {
        let device = Default::default();
        let vgg = Vgg::load(weights, &device)
            .with_context(|| format!("Failed to load VGG weights from {}", weights.display()))?;

        std::fs::create_dir_all(data_dir.join("uploads"))?;
        std::fs::create_dir_all(data_dir.join("results"))?;

        Ok(Self {
            vgg: Arc::new(vgg),
            data_dir,
            run_slot: Arc::new(Semaphore::new(1)),
        })
    }

    pub fn upload_path(&self, id: &str) -> PathBuf {
        self.data_dir.join("uploads").join(format!("{id}.jpg"))
    }

    pub fn result_path(&self, id: &str) -> PathBuf {
        self.data_dir.join("results").join(format!("{id}.jpg"))
    }
}
