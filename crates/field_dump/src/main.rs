//! Offline field-line exporter built on top of the `coulomb_rs` kernel.
//!
//! Builds a charge configuration from command-line flags (a demo dipole when
//! none are given), traces every charge's field lines through a recorder and
//! a statistics observer, and writes an SVG rendering with charge markers.
//!
//! ```text
//! cargo run -p field_dump -- --point -0.5,0,1 --point 0.5,0,-1 --out field.svg
//! ```

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;

use coulomb_rs::{
    Charge, ChargeSet, GridSpec, LineCharge, PointCharge, Polarity, PolylineRecorder, Rect, Rng,
    SeedParams, TraceBudget, TraceStatsObserver, Tracer, Vec2,
};

#[derive(Parser, Debug)]
#[command(
    name = "field_dump",
    about = "Trace electric field lines for a charge configuration and write an SVG"
)]
struct Args {
    /// Point charge as `x,y,q` with q in microcoulombs; repeatable.
    #[arg(long = "point", value_parser = parse_point)]
    points: Vec<PointCharge>,

    /// Line charge as `x,y,angle,lambda` with the angle in degrees and
    /// lambda in microcoulombs per metre; repeatable.
    #[arg(long = "line", value_parser = parse_line)]
    lines: Vec<LineCharge>,

    /// Half-extent of the square view region, centred on the origin.
    #[arg(long, default_value_t = 2.0)]
    bounds: f32,

    /// Output image size in pixels (square).
    #[arg(long, default_value_t = 800)]
    size: u32,

    /// Field lines seeded per polarized charge.
    #[arg(long, default_value_t = 16)]
    lines_per_charge: u32,

    /// Integration step length; defaults to a bounds-proportioned step.
    #[arg(long)]
    step: Option<f32>,

    /// Step cap per traced line.
    #[arg(long, default_value_t = 8_000)]
    max_steps: u32,

    /// Seed for the ring-phase jitter.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output path.
    #[arg(long, default_value = "field.svg")]
    out: PathBuf,
}

fn parse_point(s: &str) -> Result<PointCharge, String> {
    let parts = parse_floats(s, 3)?;
    PointCharge::try_new(Vec2::new(parts[0], parts[1]), parts[2] * 1e-6)
        .map_err(|e| e.to_string())
}

fn parse_line(s: &str) -> Result<LineCharge, String> {
    let parts = parse_floats(s, 4)?;
    LineCharge::try_new(
        Vec2::new(parts[0], parts[1]),
        parts[2].to_radians(),
        parts[3] * 1e-6,
    )
    .map_err(|e| e.to_string())
}

fn parse_floats(s: &str, n: usize) -> Result<Vec<f32>, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != n {
        return Err(format!("expected {n} comma-separated values, got {}", parts.len()));
    }
    parts
        .iter()
        .map(|p| p.parse::<f32>().map_err(|_| format!("invalid number `{p}`")))
        .collect()
}

/// Marker drawn for a charge in the output image.
enum Marker {
    Point { position: Vec2, polarity: Polarity },
    Line { line: LineCharge },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Assemble the charge set and remember how to mark each member.
    let mut set = ChargeSet::new();
    let mut markers = Vec::new();
    for &point in &args.points {
        markers.push(Marker::Point {
            position: point.position,
            polarity: point.polarity(),
        });
        set.push(Box::new(point));
    }
    for &line in &args.lines {
        markers.push(Marker::Line { line });
        set.push(Box::new(line));
    }
    if set.is_empty() {
        info!("no charges given; using a demo dipole");
        for charge in [
            PointCharge::new(Vec2::new(-0.8, 0.0), 1e-6),
            PointCharge::new(Vec2::new(0.8, 0.0), -1e-6),
        ] {
            markers.push(Marker::Point {
                position: charge.position,
                polarity: charge.polarity(),
            });
            set.push(Box::new(charge));
        }
    }

    let bounds = Rect::centered(args.bounds);
    let spec = GridSpec::new(bounds, args.size, args.size)?;

    let budget = match args.step {
        Some(step) => TraceBudget::new(step, args.max_steps),
        None => TraceBudget {
            max_steps: args.max_steps,
            ..TraceBudget::for_bounds(bounds)
        },
    };

    // Attach observers to record the polylines and count outcomes.
    let stats = TraceStatsObserver::new();
    let recorder = PolylineRecorder::new();
    let tracer = Tracer::builder(&set, bounds)
        .with_budget(budget)
        .with_observer(stats.clone())
        .with_observer(recorder.clone())
        .build()?;

    let mut rng = Rng::seed_from(args.seed);
    let seeds = SeedParams::new(args.lines_per_charge, budget.arrival * 3.0);
    let outcomes = tracer.trace_all(seeds, &mut rng);
    info!(lines = outcomes.len(), "traced field lines");

    let svg = render_svg(&spec, &recorder, &markers)?;
    fs::write(&args.out, svg)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    let snapshot = stats.snapshot();
    info!(
        arrivals = snapshot.arrivals,
        escapes = snapshot.escapes,
        stalls = snapshot.stalls,
        capped = snapshot.capped,
        total_steps = snapshot.total_steps,
        "trace summary"
    );
    info!("saved field lines to {}", args.out.display());

    Ok(())
}

/// Compose the recorder's polylines with charge markers into one document.
fn render_svg(
    spec: &GridSpec,
    recorder: &PolylineRecorder,
    markers: &[Marker],
) -> anyhow::Result<String> {
    let (w, h) = (spec.width, spec.height);
    let mut svg = String::new();
    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">"
    )?;
    writeln!(svg, "<rect width=\"{w}\" height=\"{h}\" fill=\"#ffffff\"/>")?;
    svg.push_str(&recorder.svg_polylines(spec));

    let reach = spec.bounds.width() + spec.bounds.height();
    for marker in markers {
        match marker {
            Marker::Point { position, polarity } => {
                let p = spec.to_pixel(*position);
                let fill = match polarity {
                    Polarity::Positive => "#cc2200",
                    Polarity::Negative => "#2244cc",
                    Polarity::Neutral => "#666666",
                };
                writeln!(
                    svg,
                    "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"6\" fill=\"{fill}\" stroke=\"#ffffff\"/>",
                    p.x, p.y
                )?;
            }
            Marker::Line { line } => {
                let a = spec.to_pixel(line.point + line.direction() * reach);
                let b = spec.to_pixel(line.point - line.direction() * reach);
                writeln!(
                    svg,
                    "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"#888888\" stroke-width=\"2\"/>",
                    a.x, a.y, b.x, b.y
                )?;
            }
        }
    }
    svg.push_str("</svg>\n");
    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_flag_parses_microcoulombs() {
        let c = parse_point("-0.5, 0, 1.5").unwrap();
        assert_eq!(c.position, Vec2::new(-0.5, 0.0));
        assert!((c.charge - 1.5e-6).abs() < 1e-12);
    }

    #[test]
    fn line_flag_parses_degrees() {
        let c = parse_line("0,1,90,-2").unwrap();
        assert!((c.angle - core::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((c.density + 2e-6).abs() < 1e-12);
    }

    #[test]
    fn malformed_flags_are_rejected() {
        assert!(parse_point("1,2").is_err());
        assert!(parse_point("1,2,abc").is_err());
        assert!(parse_line("nan,0,0,1").is_err());
    }

    #[test]
    fn rendered_svg_contains_markers_and_lines() {
        let spec = GridSpec::new(Rect::centered(2.0), 100, 100).unwrap();
        let recorder = PolylineRecorder::new();
        let markers = vec![
            Marker::Point {
                position: Vec2::ZERO,
                polarity: Polarity::Positive,
            },
            Marker::Line {
                line: LineCharge::new(Vec2::new(0.5, 0.0), 0.0, 1e-6),
            },
        ];
        let svg = render_svg(&spec, &recorder, &markers).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("<circle"));
        assert!(svg.contains("<line"));
        assert!(svg.ends_with("</svg>\n"));
    }
}
