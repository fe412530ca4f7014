//! Job processor that recompresses each payload to fit a byte budget.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use shrinkfit_core::{
    CompressionOptions, CompressionPipeline, CompressionResult, Image, ImageBackend,
    RenderBackend, DEFAULT_MAX_ITERATIONS,
};
use tracing::info;

use crate::config::BatchConfig;
use crate::job::JobContext;
use crate::queue::JobProcessor;
use crate::sink::OutputSink;
use crate::utils::format_size;

/// Runs one compression pipeline per job and hands the result to a sink.
pub struct CompressionProcessor<S, B = ImageBackend>
where
    B: RenderBackend,
{
    pipeline: Arc<CompressionPipeline<B>>,
    sink: S,
    target_size: u64,
    options: CompressionOptions,
}

impl<S: OutputSink> CompressionProcessor<S> {
    pub fn new(sink: S, target_size: u64, options: CompressionOptions) -> Self {
        Self::with_pipeline(CompressionPipeline::new(), sink, target_size, options)
    }

    pub fn from_config(config: &BatchConfig, sink: S) -> Self {
        Self::new(sink, config.target_size, config.options)
    }
}

impl<S: OutputSink, B: RenderBackend + 'static> CompressionProcessor<S, B> {
    pub fn with_pipeline(
        pipeline: CompressionPipeline<B>,
        sink: S,
        target_size: u64,
        options: CompressionOptions,
    ) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            sink,
            target_size,
            options,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn target_size(&self) -> u64 {
        self.target_size
    }
}

/// Final status line, e.g. `7.6 MB -> 4.7 MB (3200x2400)`.
pub fn summary(result: &CompressionResult) -> String {
    let before = format_size(result.original_size);
    match (result.final_width, result.final_height) {
        (Some(width), Some(height)) if result.was_compressed => format!(
            "{} -> {} ({}x{})",
            before,
            format_size(result.final_size),
            width,
            height
        ),
        _ => format!("{before} already under target"),
    }
}

#[async_trait]
impl<S: OutputSink, B: RenderBackend + 'static> JobProcessor for CompressionProcessor<S, B> {
    async fn process(&self, job: JobContext) -> anyhow::Result<()> {
        let pipeline = Arc::clone(&self.pipeline);
        let reporter = job.reporter.clone();
        let payload = job.payload.clone();
        let target_size = self.target_size;
        let options = self.options;
        let max_iterations = options.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS).max(1);

        let result = tokio::task::spawn_blocking(move || {
            let image = Image::from_bytes(payload)?;
            reporter.report(
                0.0,
                format!("Analyzing {}x{}", image.width(), image.height()),
            );

            pipeline.compress_with_progress(&image, target_size, &options, |progress| {
                let percent = progress.iteration as f32 / max_iterations as f32 * 100.0;
                reporter.report(
                    percent.min(99.0),
                    format!(
                        "Trying {}x{} ({})",
                        progress.width,
                        progress.height,
                        format_size(progress.size)
                    ),
                );
            })
        })
        .await
        .context("compression task did not finish")?
        .with_context(|| format!("failed to compress {}", job.name))?;

        self.sink
            .store(&job.name, &result)
            .await
            .with_context(|| format!("failed to store {}", job.name))?;

        let message = summary(&result);
        info!(
            iterations = result.iterations,
            ratio = result.compression_ratio,
            "{message}"
        );
        job.reporter.report(100.0, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use crate::queue::JobQueue;
    use crate::sink::MemorySink;
    use bytes::Bytes;
    use image::codecs::jpeg::JpegEncoder;
    use image::{ExtendedColorType, ImageDecoder};
    use shrinkfit_core::OutputFormat;
    use std::time::Duration;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// Pseudo-random noise JPEG; noise keeps the encoded size roughly
    /// proportional to pixel count.
    fn noise_jpeg(width: u32, height: u32) -> Vec<u8> {
        let mut state: u32 = 0x9e37_79b9;
        let pixels: Vec<u8> = (0..width * height * 3)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect();

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 95)
            .encode(&pixels, width, height, ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
        image::codecs::jpeg::JpegDecoder::new(std::io::Cursor::new(bytes))
            .unwrap()
            .dimensions()
    }

    #[tokio::test]
    async fn test_compresses_and_stores() {
        init_tracing();
        let source = noise_jpeg(320, 240);
        let target = source.len() as u64 / 2;
        let sink = MemorySink::new();
        let queue = JobQueue::new(
            2,
            CompressionProcessor::new(sink.clone(), target, CompressionOptions::default()),
        )
        .unwrap();
        let mut events = queue.subscribe();

        let id = queue.submit("noise.jpg", source.clone());
        tokio::time::timeout(Duration::from_secs(30), queue.wait_idle())
            .await
            .unwrap();

        let job = queue.job(id).unwrap();
        assert_eq!(job.status, JobStatus::Completed, "error: {:?}", job.error);

        let stored = sink.get("noise.jpg").unwrap();
        assert!(stored.was_compressed);
        assert!(stored.size() < target);
        assert_eq!(stored.original_size, source.len() as u64);
        assert_eq!(stored.format, Some(OutputFormat::Jpeg));
        assert_eq!(decoded_dimensions(&stored.data), (stored.width, stored.height));

        let messages: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
            .filter_map(|event| event.job().cloned())
            .filter(|job| job.status == JobStatus::Running)
            .map(|job| job.message)
            .collect();
        assert!(messages.iter().any(|m| m.starts_with("Trying ")));
        let last = messages.last().unwrap();
        assert!(last.contains(" -> "), "last message: {last}");
        assert!(last.ends_with(&format!("({}x{})", stored.width, stored.height)));
    }

    #[tokio::test]
    async fn test_small_payload_passes_through() {
        let source = noise_jpeg(32, 32);
        let sink = MemorySink::new();
        let queue = JobQueue::new(
            1,
            CompressionProcessor::new(sink.clone(), 10 * 1024 * 1024, CompressionOptions::default()),
        )
        .unwrap();

        queue.submit("tiny.jpg", source.clone());
        queue.wait_idle().await;

        let stored = sink.get("tiny.jpg").unwrap();
        assert!(!stored.was_compressed);
        assert_eq!(stored.data, Bytes::from(source));
        assert_eq!(stored.format, None);
    }

    #[tokio::test]
    async fn test_undecodable_payload_fails_job() {
        let sink = MemorySink::new();
        let queue = JobQueue::new(
            1,
            CompressionProcessor::new(sink.clone(), 100, CompressionOptions::default()),
        )
        .unwrap();

        let bad = queue.submit("notes.txt", Bytes::from_static(b"definitely not an image"));
        let good = queue.submit("ok.jpg", noise_jpeg(16, 16));
        queue.wait_idle().await;

        let job = queue.job(bad).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().starts_with("failed to compress notes.txt"));
        assert!(sink.get("notes.txt").is_none());

        // The failure does not hold up the next job.
        let job = queue.job(good).unwrap();
        assert!(job.status.is_terminal());
    }

    #[tokio::test]
    async fn test_unsatisfiable_target_reported() {
        let sink = MemorySink::new();
        let options = CompressionOptions {
            min_scale: Some(0.9),
            max_iterations: Some(4),
            ..Default::default()
        };
        let queue = JobQueue::new(1, CompressionProcessor::new(sink.clone(), 600, options)).unwrap();

        let id = queue.submit("noise.jpg", noise_jpeg(160, 120));
        queue.wait_idle().await;

        let job = queue.job(id).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.error.unwrap().contains("is unreachable"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_summary_messages() {
        let compressed = CompressionResult {
            image: Image::from_parts(vec![0u8; 10], 3200, 2400),
            original_size: 8_000_000,
            final_size: 4_928_307,
            was_compressed: true,
            final_scale: 0.8,
            final_quality: 0.92,
            final_width: Some(3200),
            final_height: Some(2400),
            compression_ratio: 0.616,
            iterations: 5,
            duration: Duration::from_millis(900),
            size_difference: 314_573,
            output_format: Some(OutputFormat::Jpeg),
        };
        assert_eq!(summary(&compressed), "7.6 MB -> 4.7 MB (3200x2400)");

        let untouched = CompressionResult {
            was_compressed: false,
            final_width: None,
            final_height: None,
            final_size: 8_000_000,
            ..compressed
        };
        assert_eq!(summary(&untouched), "7.6 MB already under target");
    }
}
