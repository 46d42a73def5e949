pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod export;
pub mod progress;
pub mod risk;
pub mod scanner;
pub mod storage;

pub use config::{AppConfig, EngineSettings};
pub use embedding::{Embedder, NoEmbedder};
pub use engine::{FailedPath, RiskEngine, RunResult};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
