//! Prototype/selection constraints.
//!
//! These disambiguate between the mirror-image solutions a numeric
//! sub-solver can return (e.g. `solve_ddd`'s two circle-circle
//! intersections) by filtering out configurations that violate some
//! orientation or angle predicate. The engine itself never evaluates
//! these: they are supplied by the host and applied to the candidate
//! [`crate::config::Configuration`] list a method produces.

use crate::config::Configuration;
use crate::geom::{angle_3p, signed_turn};
use crate::var::Var;

/// A predicate over a [`Configuration`] used to prune ambiguous numeric
/// solutions.
pub trait SelectionConstraint {
    /// Whether `config` satisfies this constraint.
    fn satisfied(&self, config: &Configuration) -> bool;
}

/// Rejects configurations where `a`, `b`, `c` turn counter-clockwise.
///
/// Used by `Merge3C`'s `prototype_constraints` to pick the clockwise-handed
/// solution when two mirror-image triangles both satisfy the three
/// distance constraints.
#[derive(Clone, Copy, Debug)]
pub struct NotCounterClockwise {
    /// The three points tested, in order.
    pub a: Var,
    /// See [`NotCounterClockwise::a`].
    pub b: Var,
    /// See [`NotCounterClockwise::a`].
    pub c: Var,
}

impl SelectionConstraint for NotCounterClockwise {
    fn satisfied(&self, config: &Configuration) -> bool {
        match (config.get(self.a), config.get(self.b), config.get(self.c)) {
            (Some(a), Some(b), Some(c)) => signed_turn(a, b, c) <= 0.0,
            _ => true,
        }
    }
}

/// Rejects configurations where `a`, `b`, `c` turn clockwise. The mirror
/// image of [`NotCounterClockwise`].
#[derive(Clone, Copy, Debug)]
pub struct NotClockwise {
    /// The three points tested, in order.
    pub a: Var,
    /// See [`NotClockwise::a`].
    pub b: Var,
    /// See [`NotClockwise::a`].
    pub c: Var,
}

impl SelectionConstraint for NotClockwise {
    fn satisfied(&self, config: &Configuration) -> bool {
        match (config.get(self.a), config.get(self.b), config.get(self.c)) {
            (Some(a), Some(b), Some(c)) => signed_turn(a, b, c) >= 0.0,
            _ => true,
        }
    }
}

/// Rejects configurations where the interior angle at `b` (between `a` and
/// `c`) is acute (strictly less than a right angle).
///
/// Used by `MergeCCH`'s `prototype_constraints`.
#[derive(Clone, Copy, Debug)]
pub struct NotAcute {
    /// One leg of the angle.
    pub a: Var,
    /// The vertex the angle is measured at.
    pub b: Var,
    /// The other leg of the angle.
    pub c: Var,
}

impl SelectionConstraint for NotAcute {
    fn satisfied(&self, config: &Configuration) -> bool {
        match (config.get(self.a), config.get(self.b), config.get(self.c)) {
            (Some(a), Some(b), Some(c)) => angle_3p(a, b, c) >= std::f64::consts::FRAC_PI_2,
            _ => true,
        }
    }
}

/// Rejects configurations where the interior angle at `b` is obtuse
/// (strictly greater than a right angle). The mirror predicate of
/// [`NotAcute`].
#[derive(Clone, Copy, Debug)]
pub struct NotObtuse {
    /// One leg of the angle.
    pub a: Var,
    /// The vertex the angle is measured at.
    pub b: Var,
    /// The other leg of the angle.
    pub c: Var,
}

impl SelectionConstraint for NotObtuse {
    fn satisfied(&self, config: &Configuration) -> bool {
        match (config.get(self.a), config.get(self.b), config.get(self.c)) {
            (Some(a), Some(b), Some(c)) => angle_3p(a, b, c) <= std::f64::consts::FRAC_PI_2,
            _ => true,
        }
    }
}

/// Filter `configs` down to those satisfying every constraint in
/// `constraints` — the step a merge's executor runs its candidate outputs
/// through, using that method's own `prototype_constraints()`, before
/// returning them to the caller.
pub fn filter_solutions(
    configs: Vec<Configuration>,
    constraints: &[Box<dyn SelectionConstraint>],
) -> Vec<Configuration> {
    configs
        .into_iter()
        .filter(|c| constraints.iter().all(|constraint| constraint.satisfied(c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vec2;

    fn v(i: u32) -> Var {
        Var::from_raw(i)
    }

    fn triangle(ccw: bool) -> Configuration {
        let mut c = Configuration::new();
        c.set(v(0), Vec2::new(0.0, 0.0));
        c.set(v(1), Vec2::new(1.0, 0.0));
        if ccw {
            c.set(v(2), Vec2::new(0.0, 1.0));
        } else {
            c.set(v(2), Vec2::new(0.0, -1.0));
        }
        c
    }

    #[test]
    fn not_counter_clockwise_rejects_ccw_triangle() {
        let constraint = NotCounterClockwise { a: v(0), b: v(1), c: v(2) };
        assert!(!constraint.satisfied(&triangle(true)));
        assert!(constraint.satisfied(&triangle(false)));
    }

    #[test]
    fn not_clockwise_rejects_cw_triangle() {
        let constraint = NotClockwise { a: v(0), b: v(1), c: v(2) };
        assert!(constraint.satisfied(&triangle(true)));
        assert!(!constraint.satisfied(&triangle(false)));
    }

    #[test]
    fn not_acute_rejects_acute_angle() {
        let mut c = Configuration::new();
        c.set(v(0), Vec2::new(1.0, 0.0));
        c.set(v(1), Vec2::new(0.0, 0.0));
        c.set(v(2), Vec2::new(1.0, 1.0));
        let constraint = NotAcute { a: v(0), b: v(1), c: v(2) };
        assert!(!constraint.satisfied(&c));
    }

    #[test]
    fn not_obtuse_rejects_obtuse_angle() {
        let mut c = Configuration::new();
        c.set(v(0), Vec2::new(1.0, 0.0));
        c.set(v(1), Vec2::new(0.0, 0.0));
        c.set(v(2), Vec2::new(-1.0, 1.0));
        let constraint = NotObtuse { a: v(0), b: v(1), c: v(2) };
        assert!(!constraint.satisfied(&c));
    }

    #[test]
    fn filter_solutions_keeps_only_satisfying_configs() {
        let constraints: Vec<Box<dyn SelectionConstraint>> =
            vec![Box::new(NotCounterClockwise { a: v(0), b: v(1), c: v(2) })];
        let configs = vec![triangle(true), triangle(false)];
        let filtered = filter_solutions(configs, &constraints);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].get(v(2)), Some(Vec2::new(0.0, -1.0)));
    }
}
