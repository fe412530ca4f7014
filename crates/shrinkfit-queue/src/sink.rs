//! Destinations for compressed output.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use shrinkfit_core::{CompressionResult, OutputFormat};
use tokio::io::AsyncWriteExt;

/// Numbered names tried after the plain one is taken (`x-1.jpg`, `x-2.jpg`, ...).
const MAX_NAME_SUFFIX: u32 = 9999;

/// Receives each finished compression result.
#[async_trait]
pub trait OutputSink: Send + Sync + 'static {
    async fn store(&self, name: &str, result: &CompressionResult) -> anyhow::Result<()>;
}

/// One output held by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredOutput {
    pub name: String,
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub original_size: u64,
    pub was_compressed: bool,
    pub format: Option<OutputFormat>,
}

impl StoredOutput {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Collects outputs in memory. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    outputs: Arc<Mutex<Vec<StoredOutput>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything stored so far, in store order.
    pub fn outputs(&self) -> Vec<StoredOutput> {
        self.outputs.lock().clone()
    }

    pub fn get(&self, name: &str) -> Option<StoredOutput> {
        self.outputs.lock().iter().find(|o| o.name == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.outputs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.lock().is_empty()
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn store(&self, name: &str, result: &CompressionResult) -> anyhow::Result<()> {
        let (width, height) = result.image.dimensions();
        self.outputs.lock().push(StoredOutput {
            name: name.to_string(),
            data: result.image.data().clone(),
            width,
            height,
            original_size: result.original_size,
            was_compressed: result.was_compressed,
            format: result.output_format,
        });
        Ok(())
    }
}

/// Writes outputs into a directory.
///
/// Recompressed images take the extension of their output format; untouched
/// images keep their original name. Only the file name of a job is used, so
/// `a/x.png` and `b/x.png` land in the same directory. Existing files are
/// never overwritten: a taken name gets a numeric suffix instead.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination path for a job name.
    pub fn output_path(&self, name: &str, format: Option<OutputFormat>) -> PathBuf {
        let file_name = Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());

        let path = self.root.join(file_name);
        match format {
            Some(format) => path.with_extension(format.extension()),
            None => path,
        }
    }
}

/// `photo.jpg` -> `photo-3.jpg`; suffix 0 leaves the path unchanged.
fn with_suffix(path: &Path, suffix: u32) -> PathBuf {
    if suffix == 0 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{stem}-{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{suffix}"),
    };
    path.with_file_name(file_name)
}

#[async_trait]
impl OutputSink for DirectorySink {
    async fn store(&self, name: &str, result: &CompressionResult) -> anyhow::Result<()> {
        let base = self.output_path(name, result.output_format);
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create {}", self.root.display()))?;

        for suffix in 0..=MAX_NAME_SUFFIX {
            let path = with_suffix(&base, suffix);
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| format!("failed to create {}", path.display()))
                }
            };

            file.write_all(result.image.data())
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            file.flush()
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::debug!(path = %path.display(), size = result.final_size, "stored output");
            return Ok(());
        }

        anyhow::bail!("no free file name for {} in {}", name, self.root.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrinkfit_core::Image;
    use std::time::Duration;
    use tempfile::TempDir;

    fn result(data: &'static [u8], format: Option<OutputFormat>) -> CompressionResult {
        let compressed = format.is_some();
        CompressionResult {
            image: Image::from_parts(Bytes::from_static(data), 40, 30),
            original_size: 100,
            final_size: data.len() as u64,
            was_compressed: compressed,
            final_scale: if compressed { 0.5 } else { 1.0 },
            final_quality: if compressed { 0.92 } else { 1.0 },
            final_width: compressed.then_some(40),
            final_height: compressed.then_some(30),
            compression_ratio: data.len() as f64 / 100.0,
            iterations: if compressed { 4 } else { 0 },
            duration: Duration::from_millis(3),
            size_difference: 50 - data.len() as i64,
            output_format: format,
        }
    }

    #[tokio::test]
    async fn test_memory_sink_collects_in_order() {
        let sink = MemorySink::new();
        let shared = sink.clone();
        assert!(sink.is_empty());

        sink.store("a.png", &result(b"aaaa", Some(OutputFormat::Jpeg)))
            .await
            .unwrap();
        sink.store("b.jpg", &result(b"bb", None)).await.unwrap();

        assert_eq!(shared.len(), 2);
        let names: Vec<_> = shared.outputs().into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["a.png", "b.jpg"]);

        let a = shared.get("a.png").unwrap();
        assert_eq!(a.size(), 4);
        assert_eq!((a.width, a.height), (40, 30));
        assert_eq!(a.format, Some(OutputFormat::Jpeg));
        assert!(a.was_compressed);
        assert!(shared.get("missing").is_none());
    }

    #[test]
    fn test_output_path_uses_format_extension() {
        let sink = DirectorySink::new("/out");

        assert_eq!(
            sink.output_path("photos/cat.png", Some(OutputFormat::Webp)),
            PathBuf::from("/out/cat.webp")
        );
        assert_eq!(
            sink.output_path("dog.jpeg", Some(OutputFormat::Jpeg)),
            PathBuf::from("/out/dog.jpg")
        );
        assert_eq!(
            sink.output_path("raw.tiff", None),
            PathBuf::from("/out/raw.tiff")
        );
    }

    #[tokio::test]
    async fn test_directory_sink_writes_files() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path().join("nested"));

        sink.store("shot.png", &result(b"encoded", Some(OutputFormat::Jpeg)))
            .await
            .unwrap();

        let written = tokio::fs::read(dir.path().join("nested").join("shot.jpg"))
            .await
            .unwrap();
        assert_eq!(written, b"encoded");
    }

    #[test]
    fn test_with_suffix() {
        let path = Path::new("/out/cat.jpg");
        assert_eq!(with_suffix(path, 0), PathBuf::from("/out/cat.jpg"));
        assert_eq!(with_suffix(path, 2), PathBuf::from("/out/cat-2.jpg"));
        assert_eq!(with_suffix(Path::new("/out/notes"), 1), PathBuf::from("/out/notes-1"));
    }

    #[tokio::test]
    async fn test_same_file_name_from_different_dirs_kept_apart() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());

        sink.store("a/x.png", &result(b"first", Some(OutputFormat::Jpeg)))
            .await
            .unwrap();
        sink.store("b/x.png", &result(b"second", Some(OutputFormat::Jpeg)))
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(dir.path().join("x.jpg")).await.unwrap(), b"first");
        assert_eq!(tokio::fs::read(dir.path().join("x-1.jpg")).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_recompressed_output_does_not_replace_untouched_file() {
        let dir = TempDir::new().unwrap();
        let sink = DirectorySink::new(dir.path());

        sink.store("x.jpg", &result(b"original", None)).await.unwrap();
        sink.store("x.png", &result(b"recompressed", Some(OutputFormat::Jpeg)))
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(dir.path().join("x.jpg")).await.unwrap(), b"original");
        assert_eq!(
            tokio::fs::read(dir.path().join("x-1.jpg")).await.unwrap(),
            b"recompressed"
        );
    }
}
