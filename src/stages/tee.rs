// Tee - durable side-channel log of the main channel current
//
// Writes one line per retained sample while forwarding every buffer onward
// unmodified. Samples before `measure_after_seconds` are left out of the log
// only; the forwarded buffer still contains them.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::pipeline::{Buffer, BufferList, Sample, SequentialTransformer};

/// Logs `main_current` to a text file
///
/// Line format: `"{relative_time:.9}s {main_current:.12}\n"` where
/// `relative_time = sample_time - measure_after_seconds`.
pub struct Tee<S> {
    path: PathBuf,
    measure_after_seconds: f64,
    writer: Option<BufWriter<File>>,
    lines_written: u64,
    _sample: PhantomData<fn() -> S>,
}

impl<S> Tee<S> {
    pub fn new(path: impl AsRef<Path>, measure_after_seconds: f64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            measure_after_seconds,
            writer: None,
            lines_written: 0,
            _sample: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    fn write_error(&self, err: std::io::Error) -> PipelineError {
        PipelineError::io(format!("writing {}", self.path.display()), err)
    }
}

impl<S: Sample> SequentialTransformer for Tee<S> {
    type Input = S;
    type Output = S;

    /// Opens the target file, truncating any existing content
    fn on_begin(&mut self) -> Result<(), PipelineError> {
        let file = File::create(&self.path).map_err(|err| {
            PipelineError::io(format!("opening {}", self.path.display()), err)
        })?;
        self.writer = Some(BufWriter::new(file));
        self.lines_written = 0;
        tracing::info!("[Tee] Logging main current to {}", self.path.display());
        Ok(())
    }

    fn transform_buffer(&mut self, buffer: Buffer<S>) -> Result<BufferList<S>, PipelineError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(PipelineError::NotStarted {
                stage: "Tee".to_string(),
            });
        };

        let mut written = 0u64;
        let mut outcome = Ok(());
        for sample in &buffer {
            let sample_time = sample.sample_time();
            if sample_time < self.measure_after_seconds {
                continue;
            }
            outcome = writeln!(
                writer,
                "{:.9}s {:.12}",
                sample_time - self.measure_after_seconds,
                sample.main_current()
            );
            if outcome.is_err() {
                break;
            }
            written += 1;
        }
        let outcome = outcome.and_then(|_| writer.flush());
        self.lines_written += written;
        outcome.map_err(|err| self.write_error(err))?;

        Ok(vec![buffer])
    }

    /// Flushes and closes the file
    fn on_end(&mut self) -> Result<(), PipelineError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|err| self.write_error(err))?;
            tracing::info!(
                "[Tee] Closed {} after {} lines",
                self.path.display(),
                self.lines_written
            );
        }
        Ok(())
    }
}
