// SPDX: CC0-1.0

use crate::{Frame, Number, Point, SampleClass};

// central finite difference step
pub const STEP: Number = 1e-4;

// half-length of the drawn segment, in pixels worth of world units
pub const HALF_LEN_PX: Number = 120.0;

#[derive(Clone, Copy, Debug)]
pub struct Tangent {
    pub a: Point<Number>,
    pub b: Point<Number>,
    pub slope: Number,
}

// cosmetic overlay recomputed every frame: every failure mode is a silent None
pub fn tangent_at<F, E>(mut f: F, x0: Number, frame: &Frame) -> Option<Tangent>
where
    F: FnMut(Number) -> Result<Number, E>,
{
    let y0 = finite(f(x0))?;
    let ahead = finite(f(x0 + STEP))?;
    let behind = finite(f(x0 - STEP))?;

    let slope = (ahead - behind) / (2.0 * STEP);
    let dx = HALF_LEN_PX / frame.scale;
    Some(Tangent {
        a: Point {
            x: x0 - dx,
            y: y0 - slope * dx,
        },
        b: Point {
            x: x0 + dx,
            y: y0 + slope * dx,
        },
        slope,
    })
}

fn finite<E>(result: Result<Number, E>) -> Option<Number> {
    match SampleClass::classify(result) {
        SampleClass::Valid(y) => Some(y),
        SampleClass::Anomaly | SampleClass::Failure => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{eval, parse, Extent};
    use approx::assert_relative_eq;
    use core::convert::Infallible;

    fn frame(scale: Number) -> Frame {
        Frame {
            origin: Point { x: 200, y: 150 },
            scale,
            extent: Extent { w: 400, h: 300 },
        }
    }

    #[test]
    fn parabola_slope_matches_derivative() {
        let prog = parse::compile("x^2").unwrap();
        let mut stack = Vec::new();
        let tangent =
            tangent_at(|x| eval::eval(&prog, x, &mut stack), 1.0, &frame(60.0)).unwrap();
        assert!((tangent.slope - 2.0).abs() < 1e-3);
    }

    #[test]
    fn endpoints_sit_on_the_tangent_line() {
        let tangent =
            tangent_at(|x| Ok::<_, Infallible>(x * x), 1.0, &frame(60.0)).unwrap();

        // 120 px at 60 px/unit is 2 world units either side
        assert_relative_eq!(tangent.b.x - tangent.a.x, 4.0);
        assert_relative_eq!(tangent.a.x, -1.0);
        assert_relative_eq!(tangent.b.x, 3.0);
        assert_relative_eq!(
            (tangent.b.y - tangent.a.y) / (tangent.b.x - tangent.a.x),
            tangent.slope,
            epsilon = 1e-12
        );
    }

    #[test]
    fn undefined_points_give_nothing() {
        // 1/x blows up at the probe point
        assert!(tangent_at(|x| Ok::<_, Infallible>(1.0 / x), 0.0, &frame(60.0)).is_none());
        // sqrt is NaN just left of zero
        assert!(tangent_at(|x| Ok::<_, Infallible>(x.sqrt()), 0.0, &frame(60.0)).is_none());
    }

    #[test]
    fn evaluator_failure_gives_nothing() {
        assert!(tangent_at(|_| Err::<Number, ()>(()), 1.0, &frame(60.0)).is_none());
    }
}
