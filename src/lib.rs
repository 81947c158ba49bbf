//! # Umbra
//!
//! Solar eclipse catalog ingestion and local visibility prediction.
//!
//! The crate answers one question for a host application: *what are the next `n` solar
//! eclipses that matter here?* "Here" is either an observer location, in which case the local
//! circumstances (coverage, contact times, sun altitude) are computed and only the eclipses
//! actually visible are returned, or a named region matched against the catalog text.
//!
//! * [`catalog`]: fetch, parse and merge the published eclipse tables, with an embedded fallback.
//! * [`visibility`]: local circumstances from Sun and Moon positions.
//! * [`ephemeris`]: the position provider behind the visibility computation.
//! * [`engine`]: the orchestrator, with its caches and bounded computation pool.
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use umbra::{Engine, EngineConfig, PredictionMode, PredictionRequest};
//!
//! # async fn run() -> Result<(), umbra::EngineError> {
//! let engine = Engine::new(EngineConfig::default()).await?;
//! let request = PredictionRequest::new(5, PredictionMode::Region("Europe".into()))?;
//! let predictions = engine.predict_next(&request, &CancellationToken::new()).await?;
//! println!("{} upcoming eclipses", predictions.len());
//! # Ok(())
//! # }
//! ```
pub mod cache;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod earth_orientation;
pub mod engine;
pub mod engine_errors;
pub mod env_state;
pub mod ephemeris;
pub mod observer;
pub mod prediction;
pub mod region;
pub mod time;
pub mod visibility;

pub use catalog::{EclipseKind, EclipseRecord};
pub use config::{EngineConfig, PredictionMode, PredictionRequest};
pub use engine::Engine;
pub use engine_errors::EngineError;
pub use observer::ObserverLocation;
pub use prediction::{EngineStatus, EphemerisStatus, Prediction, Predictions};
pub use visibility::VisibilityResult;
