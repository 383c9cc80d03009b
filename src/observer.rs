//! Trace lifecycle instrumentation.
//!
//! This module defines the lightweight event types that higher-level code can
//! subscribe to in order to monitor field-line traces. Observers receive
//! notifications for trace start, intermediate steps, and termination,
//! enabling features such as live visualisation, offline export, or
//! statistical summaries.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt::Write;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use spin::Mutex;

use crate::math::Vec2;
use crate::params::Orientation;
use crate::sampling::GridSpec;

/// Reason a field-line trace terminated.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TerminationReason {
    /// The line arrived within the arrival distance of a charge.
    HitCharge,
    /// The line left the trace bounds.
    LeftBounds,
    /// The field magnitude vanished (a null point between charges).
    Stalled,
    /// The trace exceeded the configured step budget.
    MaxSteps,
}

/// Snapshot emitted when a trace begins.
#[derive(Copy, Clone, Debug)]
pub struct TraceStart {
    /// Seed position of the line.
    pub position: Vec2,
    /// Traversal direction relative to the field.
    pub orientation: Orientation,
}

/// Snapshot emitted for every accepted integration step.
#[derive(Copy, Clone, Debug)]
pub struct TraceStep {
    /// Position before the step.
    pub position: Vec2,
    /// Net field magnitude at `position`.
    pub magnitude: f32,
    /// Zero-based index of the step.
    pub depth: u32,
}

/// Snapshot emitted when a trace finishes.
#[derive(Copy, Clone, Debug)]
pub struct TraceTerminate {
    /// Final position of the line.
    pub position: Vec2,
    /// Why the trace stopped.
    pub reason: TerminationReason,
    /// Number of steps performed.
    pub depth: u32,
}

/// Final state returned by the trace routines.
#[derive(Copy, Clone, Debug)]
pub struct TraceOutcome {
    /// Final position of the line.
    pub end: Vec2,
    /// Termination reason observed.
    pub reason: TerminationReason,
    /// Number of steps performed.
    pub steps: u32,
}

impl TraceOutcome {
    /// Convenience constructor.
    pub const fn new(end: Vec2, reason: TerminationReason, steps: u32) -> Self {
        Self { end, reason, steps }
    }
}

/// Observer interface for receiving trace events.
pub trait TraceObserver: Send + Sync {
    /// Called before the first step of a trace.
    fn on_start(&self, _event: TraceStart) {}
    /// Called for every accepted step.
    fn on_step(&self, _event: TraceStep) {}
    /// Called once when the trace terminates.
    fn on_terminate(&self, _event: TraceTerminate) {}
}

/// Observer implementation that does nothing; useful when no instrumentation is requested.
pub struct NoopObserver;

impl TraceObserver for NoopObserver {}

/// Helper that fans out notifications to many observers.
pub(crate) struct ObserverList<'a> {
    observers: Vec<&'a dyn TraceObserver>,
}

impl<'a> ObserverList<'a> {
    /// Build a fan-out observer from an iterator of borrowed observers.
    pub fn new<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = &'a dyn TraceObserver>,
    {
        Self {
            observers: iter.into_iter().collect(),
        }
    }
}

impl<'a> TraceObserver for ObserverList<'a> {
    fn on_start(&self, event: TraceStart) {
        for obs in &self.observers {
            obs.on_start(event);
        }
    }

    fn on_step(&self, event: TraceStep) {
        for obs in &self.observers {
            obs.on_step(event);
        }
    }

    fn on_terminate(&self, event: TraceTerminate) {
        for obs in &self.observers {
            obs.on_terminate(event);
        }
    }
}

/// Snapshot of aggregate trace statistics.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TraceStatsSnapshot {
    /// Total number of lines traced.
    pub lines: u32,
    /// Lines that arrived at a charge.
    pub arrivals: u32,
    /// Lines that left the trace bounds.
    pub escapes: u32,
    /// Lines that stalled at a field null.
    pub stalls: u32,
    /// Lines that exhausted the step budget.
    pub capped: u32,
    /// Total number of steps across all lines.
    pub total_steps: u64,
}

struct StatsInner {
    lines: AtomicU32,
    arrivals: AtomicU32,
    escapes: AtomicU32,
    stalls: AtomicU32,
    capped: AtomicU32,
    total_steps: AtomicU64,
}

impl StatsInner {
    const fn new() -> Self {
        Self {
            lines: AtomicU32::new(0),
            arrivals: AtomicU32::new(0),
            escapes: AtomicU32::new(0),
            stalls: AtomicU32::new(0),
            capped: AtomicU32::new(0),
            total_steps: AtomicU64::new(0),
        }
    }

    fn snapshot(&self) -> TraceStatsSnapshot {
        TraceStatsSnapshot {
            lines: self.lines.load(Ordering::Relaxed),
            arrivals: self.arrivals.load(Ordering::Relaxed),
            escapes: self.escapes.load(Ordering::Relaxed),
            stalls: self.stalls.load(Ordering::Relaxed),
            capped: self.capped.load(Ordering::Relaxed),
            total_steps: self.total_steps.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.lines.store(0, Ordering::Relaxed);
        self.arrivals.store(0, Ordering::Relaxed);
        self.escapes.store(0, Ordering::Relaxed);
        self.stalls.store(0, Ordering::Relaxed);
        self.capped.store(0, Ordering::Relaxed);
        self.total_steps.store(0, Ordering::Relaxed);
    }
}

/// Thread-friendly accumulator that tracks aggregate trace statistics using atomics.
#[derive(Clone)]
pub struct TraceStatsObserver {
    inner: Arc<StatsInner>,
}

impl TraceStatsObserver {
    /// Create a fresh statistics accumulator.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StatsInner::new()),
        }
    }

    /// Snapshot the current statistics.
    pub fn snapshot(&self) -> TraceStatsSnapshot {
        self.inner.snapshot()
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.inner.reset();
    }
}

impl Default for TraceStatsObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceObserver for TraceStatsObserver {
    fn on_start(&self, _event: TraceStart) {
        self.inner.lines.fetch_add(1, Ordering::Relaxed);
    }

    fn on_step(&self, _event: TraceStep) {
        self.inner.total_steps.fetch_add(1, Ordering::Relaxed);
    }

    fn on_terminate(&self, event: TraceTerminate) {
        let counter = match event.reason {
            TerminationReason::HitCharge => &self.inner.arrivals,
            TerminationReason::LeftBounds => &self.inner.escapes,
            TerminationReason::Stalled => &self.inner.stalls,
            TerminationReason::MaxSteps => &self.inner.capped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// One recorded field line.
#[derive(Clone, Debug)]
pub struct Polyline {
    /// Vertices in plane coordinates, seed first.
    pub points: Vec<Vec2>,
    /// Traversal direction the line was traced with.
    pub orientation: Orientation,
}

struct RecorderInner {
    // Simple spin mutex keeps the implementation correct; lines are recorded
    // sequentially, so concurrent tracers should use separate recorders.
    lines: Mutex<Vec<Polyline>>,
}

impl RecorderInner {
    fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }

    fn clear(&self) {
        self.lines.lock().clear();
    }

    fn start(&self, position: Vec2, orientation: Orientation) {
        self.lines.lock().push(Polyline {
            points: alloc::vec![position],
            orientation,
        });
    }

    fn push(&self, position: Vec2) {
        if let Some(line) = self.lines.lock().last_mut() {
            line.points.push(position);
        }
    }

    fn snapshot(&self) -> Vec<Polyline> {
        self.lines.lock().clone()
    }
}

/// Observer that records each traced line as a polyline.
///
/// Use [`PolylineRecorder::polylines`] for a renderer-ready snapshot or
/// [`PolylineRecorder::to_svg`] for a standalone SVG document.
#[derive(Clone)]
pub struct PolylineRecorder {
    inner: Arc<RecorderInner>,
}

impl PolylineRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RecorderInner::new()),
        }
    }

    /// Remove all stored lines.
    pub fn clear(&self) {
        self.inner.clear();
    }

    /// Snapshot the recorded lines.
    pub fn polylines(&self) -> Vec<Polyline> {
        self.inner.snapshot()
    }

    /// Render the recorded lines as SVG `<polyline>` elements in the pixel
    /// space of `spec`, without a surrounding document.
    pub fn svg_polylines(&self, spec: &GridSpec) -> String {
        let mut out = String::new();
        for line in self.inner.snapshot() {
            if line.points.len() < 2 {
                continue;
            }
            let color = match line.orientation {
                Orientation::WithField => "#cc2200",
                Orientation::AgainstField => "#2244cc",
            };
            let _ = write!(out, "<polyline fill=\"none\" stroke=\"{color}\" stroke-width=\"1\" points=\"");
            for (i, p) in line.points.iter().enumerate() {
                let px = spec.to_pixel(*p);
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{:.2},{:.2}", px.x, px.y);
            }
            let _ = writeln!(out, "\"/>");
        }
        out
    }

    /// Export the recorded lines as a standalone SVG document sized by `spec`.
    pub fn to_svg(&self, spec: &GridSpec) -> String {
        let mut out = String::new();
        let (w, h) = (spec.width, spec.height);
        let _ = writeln!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">"
        );
        let _ = writeln!(out, "<rect width=\"{w}\" height=\"{h}\" fill=\"#ffffff\"/>");
        out.push_str(&self.svg_polylines(spec));
        out.push_str("</svg>\n");
        out
    }
}

impl Default for PolylineRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TraceObserver for PolylineRecorder {
    fn on_start(&self, event: TraceStart) {
        self.inner.start(event.position, event.orientation);
    }

    fn on_step(&self, event: TraceStep) {
        self.inner.push(event.position);
    }

    fn on_terminate(&self, event: TraceTerminate) {
        self.inner.push(event.position);
    }
}
