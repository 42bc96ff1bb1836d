// MeasurementSession: everything one measurement run needs, built from config
//
// Owns the calibration hub and the standard stage chain:
//
//   reader -> [Tee] -> SampleAggregator (pooled) -> DownSampler -> sink
//
// The Tee is present only when `tee.path` is configured.

use std::sync::Arc;

use crate::calibration::{CalibrationWindows, SharedCalibration};
use crate::config::MonitorConfig;
use crate::error::{log_pipeline_error, PipelineError};
use crate::pipeline::{
    AssemblyLine, BufferSource, Chain, ParallelPool, Reading, RunSummary, ThreadedRunner,
};
use crate::stages::{DownSampler, SampleAggregator, Tee};

type SessionStages = Chain<
    Chain<Option<Tee<Reading>>, ParallelPool<SampleAggregator<Reading>>>,
    DownSampler<Reading>,
>;

/// Calibration store plus the configured stage chain
pub struct MeasurementSession {
    config: MonitorConfig,
    calibration: SharedCalibration<CalibrationWindows>,
    aggregator: Arc<SampleAggregator<Reading>>,
    line: AssemblyLine<SessionStages>,
}

impl MeasurementSession {
    /// Build a session, rejecting configurations the stages cannot run with
    pub fn new(config: MonitorConfig) -> Result<Self, PipelineError> {
        config.validate().inspect_err(|err| {
            log_pipeline_error(err, "MeasurementSession::new");
        })?;

        let tee = config
            .tee
            .path
            .as_ref()
            .map(|path| Tee::new(path, config.tee.measure_after_seconds));
        let aggregator = Arc::new(SampleAggregator::new(
            config.aggregation.start_after_seconds,
        ));
        let line = AssemblyLine::new(tee)
            .then_pooled(Arc::clone(&aggregator), config.aggregation.workers)
            .then(DownSampler::new(config.downsample.factor));

        tracing::info!(
            "[MeasurementSession] Created: tee={}, workers={}, factor={}, output rate {} Hz",
            config.tee.path.is_some(),
            config.aggregation.workers,
            config.downsample.factor,
            config.output_rate_hz()
        );

        Ok(Self {
            calibration: SharedCalibration::new(CalibrationWindows::new(
                config.calibration.window_size,
            )),
            config,
            aggregator,
            line,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn calibration(&self) -> &SharedCalibration<CalibrationWindows> {
        &self.calibration
    }

    pub fn aggregator(&self) -> &SampleAggregator<Reading> {
        &self.aggregator
    }

    pub fn downsampler(&self) -> &DownSampler<Reading> {
        self.line.stages().second()
    }

    /// Stream `source` through the stage chain on a background reader thread
    ///
    /// `sink` receives the down-sampled main current. Aggregate totals and
    /// down-sampler leftovers carry over if the session is run again.
    pub fn run<S, F>(&mut self, source: S, sink: F) -> Result<RunSummary, PipelineError>
    where
        S: BufferSource<Item = Reading> + Send,
        F: FnMut(Vec<f64>),
    {
        let runner = ThreadedRunner::new(self.config.sampling.queue_capacity);
        runner.run(&mut self.line, source, sink)
    }
}
