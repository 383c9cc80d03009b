//! Background field-evaluation worker.
//!
//! The UI thread pushes configurations (a charge-set snapshot plus render
//! parameters) over a channel; the worker re-traces the field lines, then
//! loops progressive supersampling passes over the magnitude grid, writing
//! into shared accumulation buffers and notifying the UI as frames land.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use coulomb_rs::{
    ChargeSet, FieldError, GridSpec, Polyline, PolylineRecorder, Rect, Rng, SeedParams,
    TraceBudget, TraceStatsObserver, TraceStatsSnapshot, Tracer,
};

/// Runtime parameters that govern how the worker renders the field.
#[derive(Clone, Debug)]
pub struct RenderParams {
    /// Visible region of the simulation plane.
    pub bounds: Rect,
    /// Number of pixels along one axis (image resolution is `grid × grid`).
    pub grid: u32,
    /// New magnitude samples gathered per pixel in each worker pass.
    pub samples_per_pass: u32,
    /// Field lines seeded per polarized charge.
    pub lines_per_charge: u32,
    /// Step cap for each traced line.
    pub max_steps: u32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            bounds: Rect::centered(2.0),
            grid: 256,
            samples_per_pass: 2,
            lines_per_charge: 12,
            max_steps: 4_000,
        }
    }
}

/// A full worker job: the charge-set snapshot plus render parameters.
pub struct JobConfig {
    pub set: ChargeSet,
    pub params: RenderParams,
}

/// Commands issued by the UI to the worker thread.
pub enum WorkerCommand {
    /// Replace the current configuration and clear accumulated samples.
    Configure(Box<JobConfig>),
    /// Terminate the worker loop.
    Exit,
}

/// Notifications emitted by the worker once fresh data is ready.
#[derive(Debug)]
pub enum ProgressEvent {
    /// New data has been written to the shared buffers.
    FrameReady,
}

/// Shared buffers that the worker mutates and the UI reads.
pub struct FieldBuffers {
    /// Current image width in pixels.
    pub width: usize,
    /// Current image height in pixels.
    pub height: usize,
    /// Accumulated magnitude sums per pixel.
    pub accum: Vec<f32>,
    /// Number of samples contributing to each pixel.
    pub samples: Vec<u32>,
    /// Field lines traced for the current configuration.
    pub polylines: Vec<Polyline>,
    /// Trace statistics for the current configuration.
    pub trace_stats: TraceStatsSnapshot,
}

impl FieldBuffers {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            accum: Vec::new(),
            samples: Vec::new(),
            polylines: Vec::new(),
            trace_stats: TraceStatsSnapshot::default(),
        }
    }

    /// Resize the buffers and zero all accumulated data.
    fn resize_and_clear(&mut self, width: usize, height: usize) {
        let len = width * height;
        self.width = width;
        self.height = height;
        self.accum.clear();
        self.accum.resize(len, 0.0);
        self.samples.clear();
        self.samples.resize(len, 0);
        self.polylines.clear();
        self.trace_stats = TraceStatsSnapshot::default();
    }

    /// Total number of magnitude samples accumulated across the image.
    pub fn total_samples(&self) -> u64 {
        self.samples.iter().map(|&c| c as u64).sum()
    }
}

/// Spawn the field-evaluation worker thread and return the communication channels.
pub fn spawn_worker(
    buffers: Arc<Mutex<FieldBuffers>>,
) -> (Sender<WorkerCommand>, Receiver<ProgressEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<WorkerCommand>();
    let (progress_tx, progress_rx) = mpsc::channel::<ProgressEvent>();

    thread::spawn(move || {
        const PIXELS_PER_BATCH: usize = 2048;
        let mut current: Option<JobConfig> = None;
        let mut spec: Option<GridSpec> = None;
        // Batch cursor for progressive evaluation.
        let mut cursor: usize = 0;
        // Counts processed batches (used for deterministic seeding).
        let mut pass_index: u64 = 0;

        info!("field worker started");
        loop {
            // Always drain the command queue first to react instantly to UI edits.
            let mut latest_config = None;
            while let Ok(cmd) = cmd_rx.try_recv() {
                match cmd {
                    WorkerCommand::Configure(config) => latest_config = Some(config),
                    WorkerCommand::Exit => {
                        info!("field worker exiting");
                        return;
                    }
                }
            }
            // If there was a new configuration, apply it now.
            if let Some(config) = latest_config {
                spec = apply_config(&buffers, &config);
                current = Some(*config);
                cursor = 0;
                let _ = progress_tx.send(ProgressEvent::FrameReady);
                continue;
            }

            // Ensure we have a valid configuration to work with; block for
            // one if the last configuration was missing or rejected.
            if current.is_none() || spec.is_none() {
                match cmd_rx.recv() {
                    Ok(WorkerCommand::Configure(config)) => {
                        spec = apply_config(&buffers, &config);
                        current = Some(*config);
                        cursor = 0;
                        let _ = progress_tx.send(ProgressEvent::FrameReady);
                    }
                    Ok(WorkerCommand::Exit) | Err(_) => {
                        info!("field worker exiting");
                        return;
                    }
                }
                continue;
            }
            let (Some(config), Some(grid_spec)) = (current.as_ref(), spec) else {
                continue;
            };

            let total_pixels = grid_spec.len();
            if total_pixels == 0 {
                thread::yield_now();
                continue;
            }

            // Determine the next batch of pixels to process.
            let batch = PIXELS_PER_BATCH.min(total_pixels);
            let start = cursor;
            cursor = (cursor + batch) % total_pixels;

            // Capture the current pass index for deterministic seeding.
            let pass_id = pass_index;
            pass_index = pass_index.wrapping_add(1);

            let set = &config.set;
            let samples_per_pass = config.params.samples_per_pass.max(1);
            let updates: Vec<(usize, f32, u32)> = (0..batch)
                .into_par_iter()
                .map(|n| {
                    let idx = (start + n) % total_pixels;
                    let ix = (idx % grid_spec.width as usize) as u32;
                    let iy = (idx / grid_spec.width as usize) as u32;

                    // Derive a deterministic per-pixel seed.
                    let mut seed =
                        splitmix64((idx as u64) ^ pass_id.wrapping_mul(0x9E37_79B9_7F4A_7C15));
                    if let Some(tid) = rayon::current_thread_index() {
                        seed ^= (tid as u64).rotate_left(17);
                    }
                    let mut local_rng = Rng::seed_from(seed);

                    // Accumulate jittered magnitude samples for this pixel.
                    let mut sum = 0.0f32;
                    for _ in 0..samples_per_pass {
                        let p = grid_spec.jittered_point(ix, iy, 1.0, &mut local_rng);
                        sum += set.field_magnitude(p);
                    }
                    (idx, sum, samples_per_pass)
                })
                .collect();

            if !updates.is_empty() {
                let mut guard = match buffers.lock() {
                    Ok(g) => g,
                    Err(p) => p.into_inner(),
                };
                for (idx, sum, count) in updates {
                    guard.accum[idx] += sum;
                    guard.samples[idx] += count;
                }
            }

            // Notify the UI that new data is available.
            let _ = progress_tx.send(ProgressEvent::FrameReady);
            thread::yield_now();
        }
    });

    (cmd_tx, progress_rx)
}

/// Reset the shared buffers for a new configuration and re-trace the field
/// lines. Returns the grid spec the sampling loop should use, or `None` if
/// the configuration is unusable.
fn apply_config(buffers: &Arc<Mutex<FieldBuffers>>, config: &JobConfig) -> Option<GridSpec> {
    let params = &config.params;
    let spec = match GridSpec::new(params.bounds, params.grid, params.grid) {
        Ok(spec) => spec,
        Err(err) => {
            warn!(%err, "rejecting render configuration");
            return None;
        }
    };

    let (polylines, trace_stats) = trace_lines(&config.set, params);
    debug!(
        charges = config.set.len(),
        lines = trace_stats.lines,
        arrivals = trace_stats.arrivals,
        "configuration applied"
    );

    let mut guard = match buffers.lock() {
        Ok(g) => g,
        Err(p) => p.into_inner(),
    };
    guard.resize_and_clear(spec.width as usize, spec.height as usize);
    guard.polylines = polylines;
    guard.trace_stats = trace_stats;
    Some(spec)
}

/// Trace every charge's field lines for the given configuration.
fn trace_lines(set: &ChargeSet, params: &RenderParams) -> (Vec<Polyline>, TraceStatsSnapshot) {
    if params.lines_per_charge == 0 {
        return (Vec::new(), TraceStatsSnapshot::default());
    }
    let recorder = PolylineRecorder::new();
    let stats = TraceStatsObserver::new();
    let budget = TraceBudget::for_bounds(params.bounds);
    let budget = TraceBudget {
        max_steps: params.max_steps,
        ..budget
    };
    let tracer = match Tracer::builder(set, params.bounds)
        .with_budget(budget)
        .with_observer(recorder.clone())
        .with_observer(stats.clone())
        .build()
    {
        Ok(tracer) => tracer,
        Err(FieldError::EmptyChargeSet) => {
            debug!("no charges; skipping field lines");
            return (Vec::new(), TraceStatsSnapshot::default());
        }
        Err(err) => {
            warn!(%err, "tracer rejected configuration");
            return (Vec::new(), TraceStatsSnapshot::default());
        }
    };

    let seeds = SeedParams::new(params.lines_per_charge, budget.arrival * 3.0);
    // Fixed phase keeps re-traces stable while a charge is dragged.
    let mut rng = Rng::seed_from(0x51_EED);
    let _ = tracer.trace_all(seeds, &mut rng);
    (recorder.polylines(), stats.snapshot())
}

/// SplitMix64 PRNG mixer used to derive deterministic seeds for parallel workers.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
