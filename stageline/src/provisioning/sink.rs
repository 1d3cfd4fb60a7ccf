//! Provisioning sinks.

use std::io::Write;
use tracing::{debug, info};

use crate::errors::StagelineError;
use crate::pipeline::CompiledPipeline;

use super::PipelineManifest;

/// Receives compiled pipelines for provisioning.
#[cfg_attr(test, mockall::automock)]
pub trait ProvisioningSink: Send {
    /// Materialises a compiled pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipeline could not be handed over.
    fn accept(&mut self, pipeline: &CompiledPipeline) -> Result<(), StagelineError>;
}

/// Writes the manifest of every accepted pipeline as pretty JSON.
#[derive(Debug)]
pub struct JsonManifestSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonManifestSink<W> {
    /// Creates a sink writing to `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ProvisioningSink for JsonManifestSink<W> {
    fn accept(&mut self, pipeline: &CompiledPipeline) -> Result<(), StagelineError> {
        let manifest = PipelineManifest::from_compiled(pipeline);
        let json = manifest.to_json_pretty()?;

        self.writer.write_all(json.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;

        debug!(bytes = json.len(), "manifest written");
        info!(pipeline = %manifest.pipeline, fingerprint = %manifest.fingerprint()?, "pipeline handed to provisioning");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineCompiler;
    use crate::testing::build_and_scan;

    fn compiled() -> CompiledPipeline {
        PipelineCompiler::new().compile(&build_and_scan()).unwrap()
    }

    #[test]
    fn test_json_sink_writes_manifest() {
        let mut sink = JsonManifestSink::new(Vec::new());
        sink.accept(&compiled()).unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        let manifest: PipelineManifest = serde_json::from_str(&written).unwrap();
        assert_eq!(manifest, compiled().to_manifest());
        assert!(written.ends_with('\n'));
    }

    #[test]
    fn test_json_sink_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        let file = std::fs::File::create(&path).unwrap();
        JsonManifestSink::new(file).accept(&compiled()).unwrap();
        let first = std::fs::read(&path).unwrap();

        let file = std::fs::File::create(&path).unwrap();
        JsonManifestSink::new(file).accept(&compiled()).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_mock_sink_error_propagates() {
        let mut sink = MockProvisioningSink::new();
        sink.expect_accept()
            .withf(|pipeline| pipeline.name == "build-and-scan")
            .times(1)
            .returning(|_| Err(StagelineError::Serialization("rejected".to_string())));

        let err = sink.accept(&compiled()).unwrap_err();
        assert_eq!(err.to_string(), "Serialization error: rejected");
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_json_sink_io_error() {
        let mut sink = JsonManifestSink::new(FailingWriter);
        assert!(matches!(sink.accept(&compiled()), Err(StagelineError::Io(_))));
    }
}
