//! # Sound Feature Extraction
//!
//! This crate extracts numerical features from audio by evaluating named
//! feature recipes over a common input waveform. A recipe is an ordered
//! list of transforms, e.g.
//! `MFCC[Window(length=25),RDFT,SpectralEnergy,FilterBank(number=40),Log,DCT,Selector(length=16),STMSN]`;
//! recipes sharing a prefix of transforms execute that prefix exactly once.
//!
//! ## Crate structure
//!
//! - **`format`**: buffer formats, the value type describing what an edge's
//!   bytes mean, with the `Identity` wildcard sentinel.
//! - **`parameters`**: typed parameter descriptors, raw recipe-parameter
//!   parsing and validation.
//! - **`transform`** / **`registry`**: the transform contract and the
//!   process-wide class registry keyed by (name, input format id).
//! - **`parser`**: recipe text into (feature, transform list) pairs.
//! - **`tree`**: the engine itself, merging recipes into a shared-prefix
//!   DAG with automatic format-converter insertion and instance
//!   deduplication.
//! - **`planner`** / **`arena`**: the allocation planner deriving one
//!   contiguous backing block with in-place aliasing and lifetime-based
//!   reuse.
//! - **`executor`**: the deterministic walk, timing aggregation and result
//!   collection; **`protector`** and **`dump`** hook in for debugging.
//! - **`transforms`**: the shipped transform classes.
//! - **`kernels`**: the DSP collaborators (FFT, DCT, window functions,
//!   psychoacoustic scales, statistical moments).
//!
//! ## Example
//!
//! ```no_run
//! use sfe::TransformTree;
//!
//! # fn main() -> Result<(), sfe::SfeError> {
//! let waveform = vec![0i16; 48000];
//! let mut engine = TransformTree::new(waveform.len(), 16000)?;
//! engine.add_feature_from_text(
//!     "Energy[Window(type=rectangular,length=512,step=205),Energy,Merge,Stats]",
//! )?;
//! engine.prepare_for_execution()?;
//! let features = engine.execute(&waveform)?;
//! println!("stats: {:?}", features["Energy"].values(0));
//! # Ok(())
//! # }
//! ```

pub mod arena;
pub mod config;
pub mod dot;
pub mod dump;
pub mod error;
pub mod executor;
pub mod format;
pub mod kernels;
pub mod parameters;
pub mod parser;
mod planner;
mod protector;
pub mod registry;
pub mod transform;
pub mod transforms;
pub mod tree;

pub use config::EngineConfig;
pub use error::{SfeError, SfeResult};
pub use executor::FeatureBuffers;
pub use format::{BufferFormat, FormatId};
pub use registry::Registry;
pub use transform::Transform;
pub use tree::TransformTree;
