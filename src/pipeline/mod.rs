//! Pipeline module - data preparation stages and their orchestration

pub mod artifacts;
pub mod binning;
pub mod chain;
pub mod columns;
pub mod data;
pub mod encoding;
pub mod loader;
pub mod missing;
pub mod outlier;
pub mod scaling;
pub mod split;

pub use artifacts::{ArtifactLayout, EncoderEntry, Manifest};
pub use binning::{BinSpec, CustomBinning, IntervalClosed, OutOfRangePolicy};
pub use chain::TransformChain;
pub use data::{DataPipeline, PrepareStats, PreparedData};
pub use encoding::{CategoryMapping, EncoderKind, NominalEncoder, OrdinalEncoder};
pub use loader::{load_dataset, save_dataset};
pub use missing::*;
pub use outlier::{IqrBounds, OutlierDetector};
pub use scaling::{FittedScaler, MinMaxScaler, ScalerParams};
pub use split::{train_test_split, TrainTestSplit};
