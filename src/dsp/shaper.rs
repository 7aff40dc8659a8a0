//! Articulators: turns tongue, lip and constriction controls into target
//! diameters for the waveguide.
//!
//! The shaper never owns the tract. Every operation borrows the tract's
//! [`TractGeometry`] for the duration of the call and only touches
//! `rest_diameter`, `target_diameter` and `velum_target`.
//!
//! Touch points live in a 2-D control plane laid out around a fixed origin,
//! the way the tract is usually drawn: an arc from the glottis (left) over
//! the palate to the lips (right).
//!
//! ```text
//!              index grows along the arc
//!           .-~~~~~~~~~~~~~~~~~~~~~~-.
//!         /    tongue body region     \
//!        |      (radius 2.05..3.5)     |
//!   glottis          * origin          lips
//! ```
//!
//! Angle around the origin selects the segment index; distance from the
//! origin selects the diameter.

use std::f64::consts::PI;

use crate::dsp::{
    math::lerp,
    tract::{TractGeometry, TractLayout, TurbulenceSource, VELUM_CLOSED, VELUM_OPEN},
};

pub const DEFAULT_TONGUE_INDEX: f64 = 12.9;
pub const DEFAULT_TONGUE_DIAMETER: f64 = 2.43;

/// Per-block increase of a held constriction's frication.
const FRICATIVE_ATTACK: f64 = 0.25;
/// Per-block decrease once the constriction is let go.
const FRICATIVE_RELEASE: f64 = 0.25;

/// Geometry of the 2-D control plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlLayout {
    pub origin_x: f64,
    pub origin_y: f64,
    /// Control-plane units per diameter unit.
    pub scale: f64,
    /// Distance from the origin that maps to diameter 0.
    pub radius: f64,
    pub angle_scale: f64,
    pub angle_offset: f64,
    /// Touches this far below diameter 0 are in the nose.
    pub nose_offset: f64,
    /// Added to the tongue curve so the body never fully closes the tract.
    pub grid_offset: f64,
    pub inner_tongue_radius: f64,
    pub outer_tongue_radius: f64,
}

impl Default for ControlLayout {
    fn default() -> Self {
        Self {
            origin_x: 340.0,
            origin_y: 449.0,
            scale: 60.0,
            radius: 298.0,
            angle_scale: 0.64,
            angle_offset: -0.24,
            nose_offset: 0.8,
            grid_offset: 1.7,
            inner_tongue_radius: 2.05,
            outer_tongue_radius: 3.5,
        }
    }
}

impl ControlLayout {
    /// Map a point in the control plane to a fractional segment index.
    pub fn index_at(&self, x: f64, y: f64, lip_start: usize) -> f64 {
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let mut angle = dy.atan2(dx);
        while angle > 0.0 {
            angle -= 2.0 * PI;
        }
        let span = lip_start.saturating_sub(1) as f64;
        (PI + angle - self.angle_offset) * span / (self.angle_scale * PI)
    }

    /// Map a point in the control plane to a diameter. Points outside the
    /// arc come out negative (the nose region).
    pub fn diameter_at(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        (self.radius - (dx * dx + dy * dy).sqrt()) / self.scale
    }
}

/// An articulator position expressed directly in tract coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Touch {
    pub index: f64,
    pub diameter: f64,
}

impl Touch {
    pub fn new(index: f64, diameter: f64) -> Self {
        Self { index, diameter }
    }

    pub fn from_point(control: &ControlLayout, layout: &TractLayout, x: f64, y: f64) -> Self {
        Self {
            index: control.index_at(x, y, layout.lip_start),
            diameter: control.diameter_at(x, y),
        }
    }

    fn is_finite(&self) -> bool {
        self.index.is_finite() && self.diameter.is_finite()
    }
}

#[derive(Debug, Clone, Copy)]
struct Constriction {
    touch: Touch,
    held: bool,
    fricative_intensity: f64,
}

/// Window of segments driven by the lip/jaw closure control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Closure {
    pub index: usize,
    pub radius: usize,
    pub closed_diameter: f64,
}

pub struct TractShaper {
    layout: TractLayout,
    control: ControlLayout,

    tongue_index: f64,
    tongue_diameter: f64,
    tongue_lower_index_bound: f64,
    tongue_upper_index_bound: f64,
    tongue_touch: Option<Touch>,

    constriction: Option<Constriction>,
    closure: Closure,
    lip_closure: f64,
    velum_open: bool,
}

impl TractShaper {
    pub fn new(layout: TractLayout) -> Self {
        Self::with_control(layout, ControlLayout::default())
    }

    pub fn with_control(layout: TractLayout, control: ControlLayout) -> Self {
        let closure = Closure {
            index: (layout.lip_start + 2).min(layout.segments - 1),
            radius: 2,
            closed_diameter: 0.0,
        };
        Self {
            layout,
            control,
            tongue_index: DEFAULT_TONGUE_INDEX * (layout.segments as f64 / 44.0),
            tongue_diameter: DEFAULT_TONGUE_DIAMETER,
            tongue_lower_index_bound: layout.blade_start as f64 + 2.0,
            tongue_upper_index_bound: layout.tip_start as f64 - 3.0,
            tongue_touch: None,
            constriction: None,
            closure,
            lip_closure: 0.0,
            velum_open: false,
        }
    }

    pub fn control(&self) -> &ControlLayout {
        &self.control
    }

    pub fn tongue_index(&self) -> f64 {
        self.tongue_index
    }

    pub fn tongue_diameter(&self) -> f64 {
        self.tongue_diameter
    }

    /// Allowed tongue index range as `(lower, upper)`.
    pub fn tongue_index_bounds(&self) -> (f64, f64) {
        (self.tongue_lower_index_bound, self.tongue_upper_index_bound)
    }

    pub fn closure(&self) -> Closure {
        self.closure
    }

    pub fn lip_closure(&self) -> f64 {
        self.lip_closure
    }

    pub fn velum_open(&self) -> bool {
        self.velum_open
    }

    /// Current frication level of the constriction touch, 0 when there is none.
    pub fn fricative_intensity(&self) -> f64 {
        self.constriction.map_or(0.0, |c| c.fricative_intensity)
    }

    /// Clamp an explicit tongue position to the tongue's index and
    /// diameter bounds.
    fn clamp_tongue(&self, index: f64, diameter: f64) -> (f64, f64) {
        (
            index.clamp(self.tongue_lower_index_bound, self.tongue_upper_index_bound),
            diameter.clamp(self.control.inner_tongue_radius, self.control.outer_tongue_radius),
        )
    }

    /// Clamp a touched tongue position into the region a finger can drag
    /// the tongue body to.
    ///
    /// The reachable index range narrows as the touch moves away from the
    /// inner edge: a lowered tongue can only slide a little.
    fn clamp_tongue_touch(&self, index: f64, diameter: f64) -> (f64, f64) {
        let inner = self.control.inner_tongue_radius;
        let outer = self.control.outer_tongue_radius;

        let mut from_point = ((outer - diameter) / (outer - inner)).clamp(0.0, 1.0);
        from_point = from_point.powf(0.58) - 0.2 * (from_point * from_point - from_point);

        let lower = self.tongue_lower_index_bound;
        let upper = self.tongue_upper_index_bound;
        let centre = 0.5 * (lower + upper);
        let reach = from_point * 0.5 * (upper - lower);

        (
            index.clamp(centre - reach, centre + reach),
            diameter.clamp(inner, outer),
        )
    }

    pub fn set_tongue_target(&mut self, index: f64, diameter: f64) {
        if !index.is_finite() || !diameter.is_finite() {
            tracing::warn!(index, diameter, "ignoring non-finite tongue target");
            return;
        }
        let (index, diameter) = self.clamp_tongue(index, diameter);
        self.tongue_index = index;
        self.tongue_diameter = diameter;
    }

    /// Follow a tongue touch from now on; `None` leaves the tongue where it is.
    pub fn set_tongue_touch(&mut self, touch: Option<Touch>) {
        self.tongue_touch = touch.filter(Touch::is_finite);
    }

    /// Hold (or let go of) a secondary constriction. Letting go fades the
    /// frication out over a few blocks.
    pub fn set_constriction_touch(&mut self, touch: Option<Touch>) {
        match touch.filter(Touch::is_finite) {
            Some(touch) => {
                let fricative_intensity = self.fricative_intensity();
                self.constriction = Some(Constriction {
                    touch,
                    held: true,
                    fricative_intensity,
                });
            }
            None => {
                if let Some(c) = self.constriction.as_mut() {
                    c.held = false;
                }
            }
        }
    }

    /// Configure the lip/jaw closure window.
    pub fn set_constriction(&mut self, index: f64, radius: f64, target_diameter: f64) {
        if !index.is_finite() || !radius.is_finite() || !target_diameter.is_finite() {
            tracing::warn!(index, radius, target_diameter, "ignoring non-finite constriction");
            return;
        }
        let last = (self.layout.segments - 1) as f64;
        self.closure = Closure {
            index: index.round().clamp(0.0, last) as usize,
            radius: radius.round().clamp(0.0, last) as usize,
            closed_diameter: target_diameter.max(0.0),
        };
    }

    pub fn set_velum_open(&mut self, open: bool) {
        self.velum_open = open;
    }

    /// Recompute the neutral shape of the tongue span from the tongue state.
    /// A pure function of the tongue position: calling it twice is a no-op.
    pub fn set_rest_diameter(&self, geometry: &mut TractGeometry) {
        let layout = &self.layout;
        let span = (layout.tip_start - layout.blade_start) as f64;
        let fixed_tongue_diameter = 2.0 + (self.tongue_diameter - 2.0) / 1.5;
        let height = 1.5 - fixed_tongue_diameter + self.control.grid_offset;

        for i in layout.blade_start..layout.lip_start {
            let t = 1.1 * PI * (self.tongue_index - i as f64) / span;
            let mut curve = height * t.cos();
            if i == layout.lip_start - 1 {
                curve *= 0.8;
            }
            if i == layout.blade_start || i == layout.lip_start - 2 {
                curve *= 0.94;
            }
            geometry.rest_diameter[i] = 1.5 - curve;
        }
    }

    /// Close the lips by `progress` (0 open, 1 shut).
    pub fn set_lips_closed(&mut self, geometry: &mut TractGeometry, progress: f64) {
        if !progress.is_finite() {
            tracing::warn!(progress, "ignoring non-finite lip closure");
            return;
        }
        self.lip_closure = progress.clamp(0.0, 1.0);

        self.set_rest_diameter(geometry);
        geometry.target_diameter.copy_from_slice(&geometry.rest_diameter);
        self.apply_closure(geometry);
    }

    fn apply_closure(&self, geometry: &mut TractGeometry) {
        if self.lip_closure <= 0.0 {
            return;
        }
        let Closure {
            index,
            radius,
            closed_diameter,
        } = self.closure;
        let start = index.saturating_sub(radius);
        let end = (index + radius).min(self.layout.segments - 1);

        for i in start..=end {
            geometry.target_diameter[i] =
                lerp(geometry.rest_diameter[i], closed_diameter, self.lip_closure);
        }
    }

    /// Block-rate update. Returns where frication should be injected, if
    /// anywhere.
    pub fn finish_block(&mut self, geometry: &mut TractGeometry) -> Option<TurbulenceSource> {
        if let Some(touch) = self.tongue_touch {
            let (index, diameter) = self.clamp_tongue_touch(touch.index, touch.diameter);
            self.tongue_index = index;
            self.tongue_diameter = diameter;
        }

        self.set_rest_diameter(geometry);
        geometry.target_diameter.copy_from_slice(&geometry.rest_diameter);
        self.apply_closure(geometry);

        geometry.velum_target = if self.velum_open {
            VELUM_OPEN
        } else {
            VELUM_CLOSED
        };

        let constriction = self.constriction.as_mut()?;
        if constriction.held {
            constriction.fricative_intensity = (constriction.fricative_intensity + FRICATIVE_ATTACK).min(1.0);
        } else {
            constriction.fricative_intensity -= FRICATIVE_RELEASE;
            if constriction.fricative_intensity <= 0.0 {
                self.constriction = None;
                return None;
            }
        }
        let Constriction {
            touch,
            held,
            fricative_intensity,
        } = *constriction;

        if held {
            self.apply_constriction(geometry, touch);
        }

        Some(TurbulenceSource {
            index: touch.index,
            diameter: touch.diameter,
            intensity: fricative_intensity,
        })
    }

    /// Narrow the target shape around a touch. Touches below the arc open
    /// the velum instead; touches deep in the nose do nothing else.
    fn apply_constriction(&self, geometry: &mut TractGeometry, touch: Touch) {
        let layout = &self.layout;
        let n = layout.segments;
        let nose_offset = self.control.nose_offset;
        let Touch { index, diameter } = touch;

        if index > layout.nose_start as f64 && diameter < -nose_offset {
            geometry.velum_target = VELUM_OPEN;
        }
        if diameter < -0.85 - nose_offset {
            return;
        }

        let diameter = (diameter - 0.3).max(0.0);

        // Wide and soft toward the back of the mouth, tight near the lips
        let back = 25.0 * n as f64 / 44.0;
        let tip = layout.tip_start as f64;
        let width = if index < back {
            10.0
        } else if index >= tip {
            5.0
        } else {
            10.0 - 5.0 * (index - back) / (tip - back)
        };

        if !(index >= 2.0 && index < n as f64 && diameter < 3.0) {
            return;
        }

        let centre = index.round() as i64;
        let reach = width.ceil() as i64 + 1;
        for offset in -reach..(width + 1.0).ceil() as i64 {
            let i = centre + offset;
            if i < 0 || i >= n as i64 {
                continue;
            }
            let i = i as usize;

            let relpos = (i as f64 - index).abs() - 0.5;
            let shrink = if relpos <= 0.0 {
                0.0
            } else if relpos > width {
                1.0
            } else {
                0.5 * (1.0 - (PI * relpos / width).cos())
            };

            let target = &mut geometry.target_diameter[i];
            if diameter < *target {
                *target = diameter + (*target - diameter) * shrink;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::tract::TractWaveguide;

    fn setup() -> (TractWaveguide, TractShaper) {
        let tract = TractWaveguide::new(44, 48_000.0, true).unwrap();
        let shaper = TractShaper::new(*tract.layout());
        (tract, shaper)
    }

    #[test]
    fn test_rest_diameter_is_idempotent() {
        let (mut tract, shaper) = setup();
        shaper.set_rest_diameter(tract.geometry_mut());
        let first = tract.geometry().rest_diameter.clone();
        shaper.set_rest_diameter(tract.geometry_mut());
        assert_eq!(first, tract.geometry().rest_diameter);
    }

    #[test]
    fn test_rest_diameter_only_touches_tongue_span() {
        let (mut tract, mut shaper) = setup();
        let before = tract.geometry().rest_diameter.clone();
        shaper.set_tongue_target(20.0, 2.1);
        shaper.set_rest_diameter(tract.geometry_mut());
        let after = &tract.geometry().rest_diameter;

        let layout = *tract.layout();
        for i in 0..44 {
            if i < layout.blade_start || i >= layout.lip_start {
                assert_eq!(before[i], after[i], "segment {} outside the tongue span moved", i);
            }
        }
        assert!(after[layout.blade_start..layout.lip_start]
            .iter()
            .zip(&before[layout.blade_start..layout.lip_start])
            .any(|(a, b)| (a - b).abs() > 1e-3));
    }

    #[test]
    fn test_tongue_target_is_clamped() {
        let (_, mut shaper) = setup();
        let (lower, upper) = shaper.tongue_index_bounds();
        assert_eq!((lower, upper), (12.0, 29.0));

        shaper.set_tongue_target(100.0, 100.0);
        assert_eq!(shaper.tongue_index(), upper);
        assert_eq!(shaper.tongue_diameter(), 3.5);

        shaper.set_tongue_target(-5.0, 0.0);
        assert_eq!(shaper.tongue_index(), lower);
        assert_eq!(shaper.tongue_diameter(), 2.05);

        shaper.set_tongue_target(f64::NAN, 2.5);
        assert!(shaper.tongue_index().is_finite());
    }

    #[test]
    fn test_tongue_target_inside_bounds_is_kept() {
        let (_, mut shaper) = setup();
        shaper.set_tongue_target(DEFAULT_TONGUE_INDEX, DEFAULT_TONGUE_DIAMETER);
        assert_eq!(shaper.tongue_index(), DEFAULT_TONGUE_INDEX);
        assert_eq!(shaper.tongue_diameter(), DEFAULT_TONGUE_DIAMETER);

        // Back and low
        shaper.set_tongue_target(12.0, 2.9);
        assert_eq!((shaper.tongue_index(), shaper.tongue_diameter()), (12.0, 2.9));
    }

    #[test]
    fn test_tongue_touch_reach_narrows_when_lowered() {
        let (mut tract, mut shaper) = setup();
        shaper.set_tongue_touch(Some(Touch::new(100.0, 100.0)));
        shaper.finish_block(tract.geometry_mut());
        assert_eq!(shaper.tongue_diameter(), 3.5);
        // Fully lowered tongue has no room to slide
        assert!((shaper.tongue_index() - 20.5).abs() < 1e-9);

        shaper.set_tongue_touch(Some(Touch::new(-5.0, 2.05)));
        shaper.finish_block(tract.geometry_mut());
        assert!((shaper.tongue_index() - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_polar_mapping_recovers_index_and_diameter() {
        let control = ControlLayout::default();
        let lip_start = 39usize;
        let (index, diameter) = (20.0, 2.5);

        let angle =
            index * control.angle_scale * PI / (lip_start - 1) as f64 - PI + control.angle_offset;
        let r = control.radius - control.scale * diameter;
        let x = control.origin_x + r * angle.cos();
        let y = control.origin_y + r * angle.sin();

        assert!((control.index_at(x, y, lip_start) - index).abs() < 1e-9);
        assert!((control.diameter_at(x, y) - diameter).abs() < 1e-9);
    }

    #[test]
    fn test_tongue_touch_drives_tongue() {
        let (mut tract, mut shaper) = setup();
        shaper.set_tongue_touch(Some(Touch::new(22.0, 2.05)));
        shaper.finish_block(tract.geometry_mut());
        assert!((shaper.tongue_index() - 22.0).abs() < 1e-9);
        assert_eq!(shaper.tongue_diameter(), 2.05);

        // Releasing the touch keeps the last position
        shaper.set_tongue_touch(None);
        shaper.finish_block(tract.geometry_mut());
        assert!((shaper.tongue_index() - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_lips_closed_interpolates_window() {
        let (mut tract, mut shaper) = setup();
        let closure = shaper.closure();
        assert_eq!(closure.index, 41);

        shaper.set_lips_closed(tract.geometry_mut(), 1.0);
        let g = tract.geometry();
        for i in 39..=43 {
            assert_eq!(g.target_diameter[i], 0.0);
        }
        assert_eq!(g.target_diameter[38], g.rest_diameter[38]);

        shaper.set_lips_closed(tract.geometry_mut(), 0.5);
        let g = tract.geometry();
        assert!((g.target_diameter[41] - 0.5 * g.rest_diameter[41]).abs() < 1e-12);

        shaper.set_lips_closed(tract.geometry_mut(), 0.0);
        let g = tract.geometry();
        assert_eq!(g.target_diameter, g.rest_diameter);
    }

    #[test]
    fn test_lip_closure_survives_finish_block() {
        let (mut tract, mut shaper) = setup();
        shaper.set_lips_closed(tract.geometry_mut(), 1.0);
        shaper.finish_block(tract.geometry_mut());
        assert_eq!(tract.geometry().target_diameter[41], 0.0);
    }

    #[test]
    fn test_set_constriction_moves_closure_window() {
        let (mut tract, mut shaper) = setup();
        shaper.set_constriction(30.0, 1.0, 0.2);
        shaper.set_lips_closed(tract.geometry_mut(), 1.0);
        let g = tract.geometry();
        for i in 29..=31 {
            assert!((g.target_diameter[i] - 0.2).abs() < 1e-12);
        }
        assert_eq!(g.target_diameter[41], g.rest_diameter[41]);

        shaper.set_constriction(500.0, -3.0, -1.0);
        let c = shaper.closure();
        assert_eq!((c.index, c.radius, c.closed_diameter), (43, 0, 0.0));
    }

    #[test]
    fn test_constriction_touch_narrows_around_index() {
        let (mut tract, mut shaper) = setup();
        shaper.set_constriction_touch(Some(Touch::new(36.0, 1.0)));
        shaper.finish_block(tract.geometry_mut());
        let g = tract.geometry();

        assert!((g.target_diameter[36] - 0.7).abs() < 1e-12);
        assert!(g.target_diameter[38] > g.target_diameter[37]);
        assert!(g.target_diameter[37] > g.target_diameter[36]);
        for i in 0..30 {
            assert_eq!(g.target_diameter[i], g.rest_diameter[i], "segment {} far away changed", i);
        }
    }

    #[test]
    fn test_constriction_never_widens() {
        let (mut tract, mut shaper) = setup();
        shaper.set_lips_closed(tract.geometry_mut(), 1.0);
        shaper.set_constriction_touch(Some(Touch::new(41.0, 1.2)));
        shaper.finish_block(tract.geometry_mut());
        let g = tract.geometry();
        for i in 0..44 {
            assert!(g.target_diameter[i] <= g.rest_diameter[i] + 1e-12);
        }
        assert_eq!(g.target_diameter[41], 0.0);
    }

    #[test]
    fn test_constriction_is_wider_at_the_back() {
        let count_changed = |index: f64| {
            let (mut tract, mut shaper) = setup();
            shaper.set_constriction_touch(Some(Touch::new(index, 0.5)));
            shaper.finish_block(tract.geometry_mut());
            let g = tract.geometry();
            (0..44)
                .filter(|&i| (g.target_diameter[i] - g.rest_diameter[i]).abs() > 1e-9)
                .count()
        };
        assert!(count_changed(20.0) > count_changed(38.0));
    }

    #[test]
    fn test_nose_touch_opens_velum() {
        let (mut tract, mut shaper) = setup();
        shaper.set_constriction_touch(Some(Touch::new(30.0, -1.0)));
        shaper.finish_block(tract.geometry_mut());
        let g = tract.geometry();
        assert_eq!(g.velum_target, VELUM_OPEN);
        assert_eq!(g.target_diameter[30], 0.0);

        // Deep in the nose: velum only
        let (mut tract, mut shaper) = setup();
        shaper.set_constriction_touch(Some(Touch::new(30.0, -2.0)));
        shaper.finish_block(tract.geometry_mut());
        let g = tract.geometry();
        assert_eq!(g.velum_target, VELUM_OPEN);
        assert_eq!(g.target_diameter, g.rest_diameter);
    }

    #[test]
    fn test_velum_closes_without_touch() {
        let (mut tract, mut shaper) = setup();
        shaper.finish_block(tract.geometry_mut());
        assert_eq!(tract.geometry().velum_target, VELUM_CLOSED);
        shaper.set_velum_open(true);
        shaper.finish_block(tract.geometry_mut());
        assert_eq!(tract.geometry().velum_target, VELUM_OPEN);
    }

    #[test]
    fn test_fricative_intensity_ramps_and_fades() {
        let (mut tract, mut shaper) = setup();
        assert!(shaper.finish_block(tract.geometry_mut()).is_none());

        shaper.set_constriction_touch(Some(Touch::new(34.0, 0.5)));
        let first = shaper.finish_block(tract.geometry_mut());
        assert_eq!(first.map(|t| t.intensity), Some(0.25));
        for _ in 0..10 {
            shaper.finish_block(tract.geometry_mut());
        }
        let held = shaper.finish_block(tract.geometry_mut());
        assert_eq!(
            held,
            Some(TurbulenceSource {
                index: 34.0,
                diameter: 0.5,
                intensity: 1.0
            })
        );

        shaper.set_constriction_touch(None);
        let mut blocks = 0;
        while shaper.finish_block(tract.geometry_mut()).is_some() {
            blocks += 1;
            assert!(blocks < 10);
        }
        assert_eq!(blocks, 3);
        assert_eq!(shaper.fricative_intensity(), 0.0);
        // Released touch no longer shapes the tract
        assert_eq!(tract.geometry().target_diameter, tract.geometry().rest_diameter);
    }
}
