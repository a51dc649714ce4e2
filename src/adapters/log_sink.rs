//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the `log` facade (stderr through `env_logger` on the node boards).
//! A status-display adapter would implement the same trait.

use log::{debug, error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { node } => {
                info!("START | node={node}");
            }
            AppEvent::NodeStatus { node, alive } => {
                if *alive {
                    info!("BOOT  | {node} alive");
                } else {
                    warn!("BOOT  | {node} did not answer ping");
                }
            }
            AppEvent::CommCheck(report) => {
                let verdict = if report.passed() { "PASS" } else { "FAIL" };
                info!(
                    "CHECK | {verdict} | hb_random={:?} cry_random={:?} motor={:?}",
                    report.heartbeat,
                    report.crying,
                    report.motor.map(|c| c.to_string()),
                );
            }
            AppEvent::ReadingStale { node } => {
                warn!("STALE | no reading from {node}, cycle skipped");
            }
            AppEvent::Status(s) => {
                info!(
                    "STATUS | bpm={} cry={} | cell={} ({}% / {:.2}Hz) anchor={} | {:?} | panic={}",
                    s.bpm,
                    s.cry,
                    s.cell,
                    s.cell.amplitude_percent(),
                    s.cell.frequency_hz(),
                    s.anchor,
                    s.regime,
                    if s.panic { "YES" } else { "no" },
                );
            }
            AppEvent::Commanded { cell, action } => {
                info!("MOTOR | -> {cell} ({action:?})");
            }
            AppEvent::PanicEntered(cause) => {
                error!("PANIC | {cause} | holding {}", crate::control::grid::GridCell::SAFEST);
            }
            AppEvent::Served { node, reply } => {
                debug!("SERVE | {node} -> {reply:?}");
            }
            AppEvent::Actuated { cell } => {
                info!(
                    "ROCK  | {cell} = {}% @ {:.2}Hz",
                    cell.amplitude_percent(),
                    cell.frequency_hz()
                );
            }
        }
    }
}
