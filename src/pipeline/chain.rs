//! The ordered feature transformation chain
//!
//! Training and inference share one sequence of stages:
//!
//! 1. binning
//! 2. nominal (one-hot) encoding
//! 3. ordinal encoding
//! 4. min-max scaling
//! 5. identifier pruning
//!
//! [`TransformChain::fit_transform`] fits the stateful stages on the training
//! dataset. [`TransformChain::apply`] replays the fitted stages unchanged and
//! is the only entry point available to a chain loaded from the manifest.

use log::info;
use polars::prelude::*;

use super::artifacts::{ArtifactLayout, EncoderEntry, Manifest};
use super::binning::CustomBinning;
use super::encoding::{EncoderKind, NominalEncoder, OrdinalEncoder};
use super::scaling::{FittedScaler, MinMaxScaler};
use crate::config::PipelineConfig;
use crate::error::Result;

/// Fitted transformation state, applied identically at training and inference
#[derive(Debug, Clone)]
pub struct TransformChain {
    bins: Vec<CustomBinning>,
    nominal: Vec<NominalEncoder>,
    ordinal: Vec<OrdinalEncoder>,
    scaler: FittedScaler,
    id_columns: Vec<String>,
}

impl TransformChain {
    /// Fit every stage on `df` and return the chain with the transformed data
    pub fn fit_transform(df: DataFrame, config: &PipelineConfig) -> Result<(Self, DataFrame)> {
        let bins = config
            .bins
            .iter()
            .cloned()
            .map(CustomBinning::new)
            .collect::<Result<Vec<_>>>()?;
        let mut df = apply_bins(&bins, df)?;

        let mut nominal = Vec::with_capacity(config.encoding.nominal_columns.len());
        for column in &config.encoding.nominal_columns {
            let mut encoder = NominalEncoder::new(column);
            encoder.fit(&df)?;
            df = encoder.transform(df)?;
            nominal.push(encoder);
        }

        let ordinal: Vec<OrdinalEncoder> = config
            .encoding
            .ordinal_mappings
            .iter()
            .map(|(column, mapping)| OrdinalEncoder::new(column, mapping.clone()))
            .collect();
        for encoder in &ordinal {
            df = encoder.transform(df)?;
        }

        let scaler = MinMaxScaler::new(config.scale_columns.clone()).fit(&df)?;
        df = scaler.transform(df)?;

        let chain = Self {
            bins,
            nominal,
            ordinal,
            scaler,
            id_columns: config.id_columns.clone(),
        };
        let df = chain.prune(df)?;

        info!(
            "Transform chain fitted: {} bin spec(s), {} nominal, {} ordinal, {} scaled column(s)",
            chain.bins.len(),
            chain.nominal.len(),
            chain.ordinal.len(),
            chain.scaler.params().len()
        );
        Ok((chain, df))
    }

    /// Replay the fitted stages in order
    pub fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let mut df = apply_bins(&self.bins, df)?;
        for encoder in &self.nominal {
            df = encoder.transform(df)?;
        }
        for encoder in &self.ordinal {
            df = encoder.transform(df)?;
        }
        df = self.scaler.transform(df)?;
        self.prune(df)
    }

    /// Drop identifier columns that are present
    fn prune(&self, mut df: DataFrame) -> Result<DataFrame> {
        for column in &self.id_columns {
            if df.column(column).is_ok() {
                df = df.drop(column)?;
            }
        }
        Ok(df)
    }

    pub fn scaler(&self) -> &FittedScaler {
        &self.scaler
    }

    pub fn nominal_encoders(&self) -> &[NominalEncoder] {
        &self.nominal
    }

    pub fn ordinal_encoders(&self) -> &[OrdinalEncoder] {
        &self.ordinal
    }

    /// Persist encoders and scaler, returning the manifest entries describing them
    pub fn save(&self, layout: &ArtifactLayout) -> Result<(Vec<EncoderEntry>, String)> {
        let mut entries = Vec::with_capacity(self.nominal.len() + self.ordinal.len());

        for encoder in &self.nominal {
            encoder.save(&layout.encode_dir())?;
            entries.push(EncoderEntry {
                column: encoder.column().to_string(),
                kind: EncoderKind::Nominal,
                file: ArtifactLayout::encoder_relative(encoder.column()),
            });
        }
        for encoder in &self.ordinal {
            encoder.save(&layout.encode_dir())?;
            entries.push(EncoderEntry {
                column: encoder.column().to_string(),
                kind: EncoderKind::Ordinal,
                file: ArtifactLayout::encoder_relative(encoder.column()),
            });
        }

        let scaler_file = ArtifactLayout::scaler_relative().to_string();
        self.scaler.save(&layout.resolve(&scaler_file))?;
        Ok((entries, scaler_file))
    }

    /// Rebuild the fitted chain from the files a manifest lists
    pub fn load(manifest: &Manifest, layout: &ArtifactLayout) -> Result<Self> {
        for path in manifest.referenced_files(layout) {
            ArtifactLayout::require(&path)?;
        }

        let bins = manifest
            .bins
            .iter()
            .cloned()
            .map(CustomBinning::new)
            .collect::<Result<Vec<_>>>()?;

        let mut nominal = Vec::new();
        let mut ordinal = Vec::new();
        for entry in &manifest.encoders {
            let path = layout.resolve(&entry.file);
            match entry.kind {
                EncoderKind::Nominal => nominal.push(NominalEncoder::load(&entry.column, &path)?),
                EncoderKind::Ordinal => ordinal.push(OrdinalEncoder::load(&entry.column, &path)?),
            }
        }

        let scaler = FittedScaler::load(&layout.resolve(&manifest.scaler_file))?;

        Ok(Self {
            bins,
            nominal,
            ordinal,
            scaler,
            id_columns: manifest.id_columns.clone(),
        })
    }
}

fn apply_bins(bins: &[CustomBinning], mut df: DataFrame) -> Result<DataFrame> {
    for binning in bins {
        df = binning.apply(df)?;
    }
    Ok(df)
}
