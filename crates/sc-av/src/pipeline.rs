//! The conversion pipeline: resolve input, transcode to PCM, encode to SILK.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;

use sc_core::config::Config;
use sc_core::{Error, Result};

use crate::input::{ConversionInput, InputResolver};
use crate::naming::ArtifactNames;
use crate::scratch::ScratchFile;
use crate::stages::{encode_to_silk, transcode_to_pcm};
use crate::tools::ToolRegistry;

/// A finished conversion.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// File name of the artifact inside the output directory.
    pub filename: String,
    /// Full path of the artifact.
    pub path: PathBuf,
    /// Wall time spent, including download and any wait for a permit.
    pub elapsed: Duration,
}

/// Converts audio inputs into SILK files.
///
/// Cheap to share behind an `Arc`; every call to [`SilkConverter::convert`]
/// is independent and may run concurrently with others.
#[derive(Debug)]
pub struct SilkConverter {
    tools: Arc<ToolRegistry>,
    resolver: InputResolver,
    scratch_dir: PathBuf,
    output_dir: PathBuf,
    encoder_flag: String,
    sample_rate: u32,
    permits: Option<Arc<Semaphore>>,
}

impl SilkConverter {
    /// Build a converter from the storage, tools and conversion sections of
    /// `config`. Intermediates live next to staged inputs in the upload dir.
    pub fn new(tools: Arc<ToolRegistry>, config: &Config) -> Result<Self> {
        let permits = config
            .conversion
            .max_concurrent
            .map(|n| Arc::new(Semaphore::new(n.max(1))));

        Ok(Self {
            tools,
            resolver: InputResolver::new(&config.storage.upload_dir)?,
            scratch_dir: config.storage.upload_dir.clone(),
            output_dir: config.storage.output_dir.clone(),
            encoder_flag: config.tools.encoder_flag.clone(),
            sample_rate: config.tools.sample_rate,
            permits,
        })
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    /// Convert `input` into a new SILK file in the output directory.
    ///
    /// The intermediate PCM file never outlives this call, whatever the
    /// outcome. A staged input the resolver created is removed as well;
    /// caller-supplied local files are left alone.
    ///
    /// # Errors
    ///
    /// - Resolution errors ([`Error::Input`], [`Error::UnsupportedInput`],
    ///   [`Error::Network`], [`Error::Io`]) are returned unchanged.
    /// - [`Error::Transcode`] / [`Error::Encode`] wrap the failing tool's error.
    /// - [`Error::OutputMissing`] if the encoder succeeded without writing
    ///   its output.
    pub async fn convert(&self, input: ConversionInput) -> Result<ConversionOutput> {
        let started = Instant::now();

        let _permit = match &self.permits {
            Some(semaphore) => Some(
                Arc::clone(semaphore)
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Internal(format!("conversion limiter closed: {e}")))?,
            ),
            None => None,
        };

        let kind = input.kind();
        let staged = self.resolver.resolve(input).await.map_err(|e| {
            tracing::error!(input = kind, "Failed to stage input: {e}");
            e
        })?;

        let names = ArtifactNames::generate();
        let output_path = self.output_dir.join(&names.output);
        let pcm = ScratchFile::new(self.scratch_dir.join(&names.intermediate), "intermediate");
        tracing::debug!(
            input = %staged.path().display(),
            pcm = %pcm.path().display(),
            output = %output_path.display(),
            "Starting conversion"
        );

        let stages = async {
            transcode_to_pcm(&self.tools, staged.path(), pcm.path(), self.sample_rate)
                .await
                .map_err(Error::transcode)?;
            tracing::info!("Transcode to PCM complete");

            encode_to_silk(&self.tools, pcm.path(), &output_path, &self.encoder_flag)
                .await
                .map_err(Error::encode)?;
            tracing::info!("Encode to SILK complete");
            Ok::<(), Error>(())
        };
        let outcome = stages.await;

        pcm.cleanup();
        staged.release();

        if let Err(e) = outcome {
            tracing::error!("Conversion failed: {e}");
            return Err(e);
        }

        if !tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            tracing::error!("Encoder reported success but {} is missing", output_path.display());
            return Err(Error::OutputMissing { path: output_path });
        }

        let elapsed = started.elapsed();
        tracing::info!("Audio converted: {} in {:.2}s", names.output, elapsed.as_secs_f64());
        Ok(ConversionOutput {
            filename: names.output,
            path: output_path,
            elapsed,
        })
    }
}
