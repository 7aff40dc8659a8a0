//! Small scalar helpers shared by the articulators.

/// Step `current` toward `target`, using a different step size for each
/// direction. Never overshoots.
#[inline]
pub fn move_towards(current: f64, target: f64, amount_up: f64, amount_down: f64) -> f64 {
    if current < target {
        (current + amount_up).min(target)
    } else {
        (current - amount_down).max(target)
    }
}

#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Clamp to `[0, 1]`.
#[inline]
pub fn saturate(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_towards_uses_direction_specific_step() {
        assert!((move_towards(0.0, 1.0, 0.25, 0.5) - 0.25).abs() < 1e-12);
        assert!((move_towards(1.0, 0.0, 0.25, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_move_towards_never_overshoots() {
        assert_eq!(move_towards(0.9, 1.0, 0.5, 0.5), 1.0);
        assert_eq!(move_towards(0.1, 0.0, 0.5, 0.5), 0.0);
        assert_eq!(move_towards(0.3, 0.3, 0.5, 0.5), 0.3);
    }

    #[test]
    fn test_saturate() {
        assert_eq!(saturate(-0.5), 0.0);
        assert_eq!(saturate(0.4), 0.4);
        assert_eq!(saturate(7.0), 1.0);
    }
}
