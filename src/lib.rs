// SPDX: CC0-1.0

pub mod eval;
pub mod lex;
pub mod parse;
pub mod render;
pub mod shell;
pub mod stdlib;
pub mod tangent;

use core::fmt;

pub type Number = f64;

pub const DEFAULT_SCALE: Number = 60.0;
pub const MIN_SCALE: Number = 6.0;
pub const ZOOM_STEP: Number = 1.2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent {
    pub w: u32,
    pub h: u32,
}

// origin pixel + pixels-per-unit scale, owned by the host; pan/zoom mutate
// it between frames, sampling always goes through a Frame snapshot
#[derive(Clone, Debug)]
pub struct Viewport {
    scale: Number,
    origin: Option<Point<i32>>, // recentered lazily on the first frame
}

impl Viewport {
    pub const fn new() -> Self {
        Self {
            scale: DEFAULT_SCALE,
            origin: None,
        }
    }

    pub const fn scale(&self) -> Number {
        self.scale
    }

    pub fn zoom_in(&mut self) {
        self.scale *= ZOOM_STEP;
    }

    pub fn zoom_out(&mut self) {
        self.scale /= ZOOM_STEP;
        if self.scale < MIN_SCALE {
            self.scale = MIN_SCALE;
        }
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        if let Some(origin) = &mut self.origin {
            origin.x += dx;
            origin.y += dy;
        }
    }

    pub fn reset(&mut self) {
        self.scale = DEFAULT_SCALE;
        self.origin = None;
    }

    pub fn frame(&mut self, extent: Extent) -> Frame {
        let origin = *self.origin.get_or_insert(Point {
            x: extent.w as i32 / 2,
            y: extent.h as i32 / 2,
        });
        Frame {
            origin,
            scale: self.scale,
            extent,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} px/unit", self.scale)?;
        match self.origin {
            Some(origin) => write!(f, ", origin ({}, {})", origin.x, origin.y),
            None => write!(f, ", origin pending recenter"),
        }
    }
}

// viewport parameters frozen for one sampling/render pass
#[derive(Clone, Copy, Debug)]
pub struct Frame {
    pub origin: Point<i32>,
    pub scale: Number,
    pub extent: Extent,
}

impl Frame {
    pub fn world_to_screen_x(&self, x: Number) -> i32 {
        (Number::from(self.origin.x) + x * self.scale).round() as i32
    }

    // screen y grows downward, world y grows upward
    pub fn world_to_screen_y(&self, y: Number) -> i32 {
        (Number::from(self.origin.y) - y * self.scale).round() as i32
    }

    pub fn screen_to_world_x(&self, sx: i32) -> Number {
        Number::from(sx - self.origin.x) / self.scale
    }

    pub fn screen_to_world_y(&self, sy: i32) -> Number {
        Number::from(self.origin.y - sy) / self.scale
    }
}

// per-column classification of an evaluation result: anomalies are holes in
// the curve, not errors
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleClass {
    Valid(Number),
    Anomaly,
    Failure,
}

impl SampleClass {
    pub fn classify<E>(result: Result<Number, E>) -> Self {
        match result {
            Ok(y) if y.is_finite() => Self::Valid(y),
            Ok(_) => Self::Anomaly,
            Err(_) => Self::Failure,
        }
    }
}

pub fn sample<F, D, FErr, DErr>(mut f: F, mut emit: D, frame: &Frame) -> Result<usize, DErr>
where
    F: FnMut(Number) -> Result<Number, FErr>, // function being plotted
    D: FnMut(Point<i32>, Point<i32>) -> Result<(), DErr>, // receives each drawable segment
{
    let height = i64::from(frame.extent.h);
    let mut prev: Option<Point<i32>> = None;
    let mut segments = 0;

    for sx in 0..frame.extent.w as i32 {
        let x = frame.screen_to_world_x(sx);
        let y = match SampleClass::classify(f(x)) {
            SampleClass::Valid(y) => y,
            SampleClass::Anomaly | SampleClass::Failure => {
                prev = None;
                continue;
            }
        };
        let cur = Point {
            x: sx,
            y: frame.world_to_screen_y(y),
        };
        if let Some(last) = prev {
            // never connect across a jump taller than the viewport itself:
            // that segment would be a near-vertical asymptote connector
            if (i64::from(cur.y) - i64::from(last.y)).abs() < height {
                emit(last, cur)?;
                segments += 1;
            }
        }
        prev = Some(cur);
    }

    Ok(segments)
}

// collect the emitted segments into maximal connected polylines
pub fn runs<F, FErr>(f: F, frame: &Frame) -> Vec<Vec<Point<i32>>>
where
    F: FnMut(Number) -> Result<Number, FErr>,
{
    let mut out: Vec<Vec<Point<i32>>> = Vec::new();
    let _ = sample(
        f,
        |a, b| {
            match out.last_mut() {
                Some(run) if run.last() == Some(&a) => run.push(b),
                _ => out.push(vec![a, b]),
            }
            Ok::<_, core::convert::Infallible>(())
        },
        frame,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::convert::Infallible;

    const EXTENT: Extent = Extent { w: 400, h: 300 };

    fn frame(scale: Number) -> Frame {
        Frame {
            origin: Point { x: 200, y: 150 },
            scale,
            extent: EXTENT,
        }
    }

    fn ok(f: impl Fn(Number) -> Number) -> impl FnMut(Number) -> Result<Number, Infallible> {
        move |x| Ok(f(x))
    }

    #[test]
    fn screen_world_round_trip_within_one_pixel() {
        for scale in [6.0, 13.7, 60.0, 240.0] {
            let frame = Frame {
                origin: Point { x: 211, y: 173 },
                scale,
                extent: EXTENT,
            };
            let mut x = -8.0;
            while x < 8.0 {
                let recovered = frame.screen_to_world_x(frame.world_to_screen_x(x));
                assert!(
                    (recovered - x).abs() <= 1.0 / scale,
                    "x={x} scale={scale} recovered={recovered}"
                );
                x += 0.0837;
            }
        }
    }

    #[test]
    fn screen_y_grows_downward() {
        let frame = frame(60.0);
        assert!(frame.world_to_screen_y(1.0) < frame.world_to_screen_y(0.0));
        assert_relative_eq!(frame.screen_to_world_y(0), 2.5);
        assert_relative_eq!(frame.screen_to_world_y(300), -2.5);
    }

    #[test]
    fn origin_recenters_lazily_and_persists() {
        let mut view = Viewport::new();
        let first = view.frame(EXTENT);
        assert_eq!(first.origin, Point { x: 200, y: 150 });

        view.pan(5, -3);
        assert_eq!(view.frame(EXTENT).origin, Point { x: 205, y: 147 });

        view.zoom_in();
        assert_eq!(view.frame(EXTENT).origin, Point { x: 205, y: 147 });
    }

    #[test]
    fn pan_before_first_frame_is_ignored() {
        let mut view = Viewport::new();
        view.pan(40, 40);
        assert_eq!(view.frame(EXTENT).origin, Point { x: 200, y: 150 });
    }

    #[test]
    fn zoom_steps_and_floor() {
        let mut view = Viewport::new();
        view.zoom_in();
        assert_relative_eq!(view.scale(), DEFAULT_SCALE * ZOOM_STEP);

        for _ in 0..32 {
            view.zoom_out();
        }
        assert_eq!(view.scale(), MIN_SCALE);
    }

    #[test]
    fn reset_restores_scale_and_recenters() {
        let mut view = Viewport::new();
        view.frame(EXTENT);
        view.pan(17, -9);
        view.zoom_in();
        view.reset();
        assert_eq!(view.scale(), DEFAULT_SCALE);
        assert_eq!(view.frame(EXTENT).origin, Point { x: 200, y: 150 });
    }

    #[test]
    fn parabola_samples_into_one_run() {
        let frame = frame(60.0);
        let polylines = runs(ok(|x| x * x), &frame);
        assert_eq!(polylines.len(), 1);
        assert_eq!(polylines[0].len(), EXTENT.w as usize);

        let segments = sample(ok(|x| x * x), |_, _| Ok::<_, Infallible>(()), &frame).unwrap();
        assert_eq!(segments, EXTENT.w as usize - 1);
    }

    #[test]
    fn infinity_yields_no_segments() {
        let frame = frame(60.0);
        assert!(runs(ok(|_| Number::INFINITY), &frame).is_empty());
        assert!(runs(ok(|_| Number::NAN), &frame).is_empty());
    }

    #[test]
    fn evaluation_failure_breaks_the_run_per_column() {
        let frame = frame(60.0);
        let polylines = runs(|x| if x < 0.0 { Err(()) } else { Ok(x) }, &frame);
        assert_eq!(polylines.len(), 1);
        // first valid column is where x crosses zero
        assert_eq!(polylines[0][0].x, 200);
    }

    #[test]
    fn tangent_asymptotes_split_runs() {
        // x spans about +-3.33, so both tan asymptotes at +-pi/2 are inside
        let frame = frame(60.0);
        let polylines = runs(ok(Number::tan), &frame);
        assert!(polylines.len() >= 2, "expected a gap at each asymptote");
        for run in &polylines {
            for pair in run.windows(2) {
                let delta = (i64::from(pair[1].y) - i64::from(pair[0].y)).abs();
                assert!(
                    delta < i64::from(EXTENT.h),
                    "connector across a jump of {delta}"
                );
            }
        }
    }

    #[test]
    fn jump_guard_threshold_is_viewport_height() {
        // step function whose pixel jump lands exactly on either side of
        // the cutoff
        let frame = frame(1.0);
        let step = |height: Number| move |x: Number| if x < 0.0 { 0.0 } else { height };

        assert_eq!(runs(ok(step(299.0)), &frame).len(), 1);
        assert_eq!(runs(ok(step(300.0)), &frame).len(), 2);
    }

    #[test]
    fn division_by_zero_plot_contributes_nothing() {
        let prog = parse::compile("1/0").unwrap();
        let mut stack = Vec::new();
        assert_eq!(
            eval::eval(&prog, 0.0, &mut stack).unwrap(),
            Number::INFINITY
        );

        let frame = frame(60.0);
        let polylines = runs(|x| eval::eval(&prog, x, &mut stack), &frame);
        assert!(polylines.is_empty());
    }

    #[test]
    fn classification_of_results() {
        assert_eq!(
            SampleClass::classify(Ok::<_, ()>(2.0)),
            SampleClass::Valid(2.0)
        );
        assert_eq!(
            SampleClass::classify(Ok::<_, ()>(Number::NEG_INFINITY)),
            SampleClass::Anomaly
        );
        assert_eq!(SampleClass::classify(Err(())), SampleClass::Failure);
    }
}
