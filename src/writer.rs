//! Per-endpoint worker: buffered writes and the timed flush loop

use crate::buffer::LineBuffer;
use crate::config::EndpointConfig;
use crate::errors::{Result, WriterError};
use crate::format::Formatter;
use crate::rewrite::RewriteEngine;
use crate::sample::{DatasetResolver, Sample};
use crate::transport::Warp10Transport;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// One configured push destination.
///
/// Owns the formatter, buffer and transport for a single endpoint and the
/// background task that flushes the buffer. The host agent drives it through
/// [`EndpointWriter::init`], [`EndpointWriter::write`] and
/// [`EndpointWriter::shutdown`]; `write` is synchronous and safe to call from
/// any thread, concurrently with the flush task.
pub struct EndpointWriter {
    name: String,
    flush_interval: Duration,
    flush_retry_interval: Duration,
    formatter: Formatter,
    buffer: LineBuffer,
    transport: Warp10Transport,
    resolver: Arc<dyn DatasetResolver>,
    flush_task: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl EndpointWriter {
    pub fn new(config: EndpointConfig, resolver: Arc<dyn DatasetResolver>) -> Result<Self> {
        config.validate().map_err(WriterError::Config)?;

        let engine = RewriteEngine::new(config.rewrite_rules, config.rewrite_limit);
        let transport = Warp10Transport::new(config.url, config.token, config.http_timeout)?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            name: config.name,
            flush_interval: config.flush_interval,
            flush_retry_interval: config.flush_retry_interval,
            formatter: Formatter::new(config.default_labels, engine),
            buffer: LineBuffer::new(config.buffer_size),
            transport,
            resolver,
            flush_task: Mutex::new(None),
            shutdown,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of lines currently waiting for delivery
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Arm the first flush timer. Must be called from within a tokio runtime.
    pub fn init(self: &Arc<Self>) {
        let mut task = self.flush_task.lock().unwrap();
        if task.is_some() {
            warn!(endpoint = %self.name, "Flush task already started");
            return;
        }

        let writer = Arc::clone(self);
        let shutdown_rx = self.shutdown.subscribe();
        *task = Some(tokio::spawn(async move { writer.run(shutdown_rx).await }));

        debug!(endpoint = %self.name, "Flush timer armed");
    }

    /// Format one sample and enqueue its values. Never blocks; a full buffer
    /// drops the line with a warning.
    pub fn write(&self, sample: &Sample) {
        let dataset = match self.resolver.lookup(&sample.type_name) {
            Some(dataset) => dataset,
            None => {
                warn!(
                    endpoint = %self.name,
                    type_name = %sample.type_name,
                    "No dataset for sample type, dropping sample"
                );
                return;
            }
        };

        for (source, value) in dataset.iter().zip(&sample.values) {
            match self.formatter.format(sample, &source.name, *value) {
                Ok(Some(line)) => {
                    if self.buffer.try_push(line.to_string()).is_err() {
                        warn!(
                            endpoint = %self.name,
                            buffered = self.buffer.len(),
                            url = %self.transport.url(),
                            "Buffer is full, dropping line; consider increasing \
                             BufferSize or reducing FlushInterval"
                        );
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    error!(
                        endpoint = %self.name,
                        error = %err,
                        "Failed to format sample value"
                    );
                }
            }
        }
    }

    /// Cancel the pending timer, wait for an in-flight flush to finish, then
    /// flush whatever is left. A failed final flush is logged; the timer is
    /// not resurrected.
    pub async fn shutdown(&self) {
        info!(endpoint = %self.name, "Shutdown: start");
        let _ = self.shutdown.send(true);

        let task = self.flush_task.lock().unwrap().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                error!(endpoint = %self.name, error = %err, "Flush task failed");
            }
            info!(endpoint = %self.name, "Shutdown: flush task stopped");
        }

        if let Err(err) = self.flush().await {
            error!(
                endpoint = %self.name,
                error = %err,
                "Failed to post data before shutdown"
            );
        }
    }

    /// Self-rescheduling one-shot timer: each pass sleeps, flushes once, and
    /// picks the next delay from the outcome. A slow delivery delays the next
    /// timer instead of overlapping it.
    async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut delay = self.flush_interval;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    delay = match self.flush().await {
                        Ok(()) => self.flush_interval,
                        Err(err) => {
                            error!(
                                endpoint = %self.name,
                                error = %err,
                                "Failed to post data, retrying sooner"
                            );
                            self.flush_retry_interval
                        }
                    };
                }
                _ = shutdown_rx.changed() => break,
            }
        }
    }

    /// Drain the buffer and deliver the batch; on failure put it back for
    /// the next attempt, dropping what no longer fits.
    async fn flush(&self) -> Result<()> {
        let lines = self.buffer.drain_all();
        if lines.is_empty() {
            return Ok(());
        }

        match self.transport.send(&lines).await {
            Ok(()) => Ok(()),
            Err(err) => {
                let dropped = self.buffer.restore(lines);
                if dropped > 0 {
                    warn!(
                        endpoint = %self.name,
                        dropped,
                        buffered = self.buffer.len(),
                        url = %self.transport.url(),
                        "Buffer is full, dropped lines from failed batch"
                    );
                }
                Err(err)
            }
        }
    }
}
