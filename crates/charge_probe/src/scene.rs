//! Scene-side charge representation and its editing UI.
//!
//! The canvas manipulates concrete charge variants (an enum, so each variant
//! can expose its own context-menu controls) and snapshots them into a
//! kernel [`ChargeSet`] whenever the worker needs to be reconfigured.

use coulomb_rs::{Charge, ChargeSet, LineCharge, PointCharge, Polarity, Vec2};
use eframe::egui::{ComboBox, DragValue, Ui};

/// What a context-menu interaction asked for.
///
/// Deletion is deferred: the menu only reports the request and the owner
/// removes the charge after the frame's UI pass.
#[derive(Copy, Clone, Default)]
pub struct MenuOutcome {
    /// A parameter was edited; the worker needs a fresh configuration.
    pub edited: bool,
    /// The charge should be removed from the scene.
    pub delete: bool,
}

/// A charge as manipulated on the canvas.
pub enum SceneCharge {
    Point(PointCharge),
    Line(LineCharge),
}

impl SceneCharge {
    /// A point charge, with `charge` given in microcoulombs.
    pub fn point(position: Vec2, microcoulombs: f32) -> Self {
        Self::Point(PointCharge::new(position, microcoulombs * 1e-6))
    }

    /// A line charge, with `density` given in microcoulombs per metre.
    pub fn line(point: Vec2, angle: f32, density_micro: f32) -> Self {
        Self::Line(LineCharge::new(point, angle, density_micro * 1e-6))
    }

    /// Borrow the kernel-facing charge contract.
    pub fn as_charge(&self) -> &dyn Charge {
        match self {
            Self::Point(c) => c,
            Self::Line(c) => c,
        }
    }

    /// Clone into an owned kernel charge.
    pub fn boxed(&self) -> Box<dyn Charge> {
        self.as_charge().boxed_clone()
    }

    /// The drag handle: the charge position, or the anchor point of a line.
    pub fn anchor(&self) -> Vec2 {
        match self {
            Self::Point(c) => c.position,
            Self::Line(c) => c.point,
        }
    }

    pub fn set_anchor(&mut self, p: Vec2) {
        match self {
            Self::Point(c) => c.position = p,
            Self::Line(c) => c.point = p,
        }
    }

    pub fn polarity(&self) -> Polarity {
        self.as_charge().polarity()
    }

    /// Glyph label drawn at the anchor.
    pub fn glyph(&self) -> &'static str {
        match self.polarity() {
            Polarity::Positive => "+",
            Polarity::Negative => "\u{2212}",
            Polarity::Neutral => "0",
        }
    }

    /// Context-menu body for this charge: per-variant parameter editors and
    /// a delete entry. Returns what the interaction asked for.
    pub fn context_menu(&mut self, ui: &mut Ui) -> MenuOutcome {
        let mut outcome = MenuOutcome::default();
        match self {
            Self::Point(c) => {
                ui.label("Point charge");
                let mut micro = c.charge * 1e6;
                let changed = ui
                    .add(
                        DragValue::new(&mut micro)
                            .speed(0.05)
                            .clamp_range(-100.0..=100.0)
                            .suffix(" \u{00b5}C"),
                    )
                    .changed();
                if changed {
                    c.charge = micro * 1e-6;
                    outcome.edited = true;
                }
            }
            Self::Line(c) => {
                ui.label("Line charge");
                let mut micro = c.density * 1e6;
                if ui
                    .add(
                        DragValue::new(&mut micro)
                            .speed(0.05)
                            .clamp_range(-100.0..=100.0)
                            .suffix(" \u{00b5}C/m"),
                    )
                    .changed()
                {
                    c.density = micro * 1e-6;
                    outcome.edited = true;
                }
                let mut degrees = c.angle.to_degrees();
                if ui
                    .add(
                        DragValue::new(&mut degrees)
                            .speed(1.0)
                            .clamp_range(-180.0..=180.0)
                            .suffix("\u{00b0}"),
                    )
                    .changed()
                {
                    c.angle = degrees.to_radians();
                    outcome.edited = true;
                }
            }
        }
        ui.separator();
        if ui.button("Flip sign").clicked() {
            match self {
                Self::Point(c) => c.charge = -c.charge,
                Self::Line(c) => c.density = -c.density,
            }
            outcome.edited = true;
            ui.close_menu();
        }
        if ui.button("Delete").clicked() {
            outcome.delete = true;
            ui.close_menu();
        }
        outcome
    }
}

/// Snapshot the scene into an owned kernel charge set.
pub fn build_charge_set(scene: &[SceneCharge]) -> ChargeSet {
    scene.iter().map(|c| c.boxed()).collect()
}

/// Variant selector used by the "add charge" controls.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChargeKind {
    Point,
    Line,
}

impl ChargeKind {
    pub fn selector(ui: &mut Ui, current: &mut ChargeKind) {
        ComboBox::from_label("Kind")
            .selected_text(match current {
                ChargeKind::Point => "Point",
                ChargeKind::Line => "Line",
            })
            .show_ui(ui, |ui| {
                ui.selectable_value(current, ChargeKind::Point, "Point");
                ui.selectable_value(current, ChargeKind::Line, "Line");
            });
    }
}
