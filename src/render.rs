// SPDX: CC0-1.0

use crate::{
    eval::{self, EvalErr, Program},
    parse::{self, ParseErr},
    sample, tangent, Extent, Point, Viewport,
};
use core::fmt;
use rgb::RGB8;
use std::sync::Arc;

// curve colors cycle through this palette in insertion order
pub const PALETTE: [RGB8; 4] = [
    RGB8 { r: 0, g: 70, b: 200 },
    RGB8 { r: 200, g: 30, b: 120 },
    RGB8 { r: 0, g: 140, b: 80 },
    RGB8 { r: 230, g: 120, b: 20 },
];

pub const BACKGROUND: RGB8 = RGB8 {
    r: 255,
    g: 255,
    b: 255,
};
pub const GRID: RGB8 = RGB8 {
    r: 245,
    g: 245,
    b: 245,
};
pub const TICK: RGB8 = RGB8 {
    r: 200,
    g: 200,
    b: 200,
};
pub const AXIS: RGB8 = RGB8 {
    r: 120,
    g: 120,
    b: 120,
};
pub const CURSOR: RGB8 = RGB8 { r: 255, g: 0, b: 0 };
pub const LABEL: RGB8 = RGB8 { r: 0, g: 0, b: 255 };
pub const OVERLAY: RGB8 = RGB8 {
    r: 60,
    g: 60,
    b: 60,
};

#[derive(Debug)]
pub enum AddErr {
    Empty,
    Parse(ParseErr),
    Eval(EvalErr),
}

impl fmt::Display for AddErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty expression"),
            Self::Parse(err) => write!(f, "{}", err.typ),
            Self::Eval(err) => write!(f, "{err}"),
        }
    }
}

impl From<ParseErr> for AddErr {
    fn from(err: ParseErr) -> Self {
        Self::Parse(err)
    }
}

impl From<EvalErr> for AddErr {
    fn from(err: EvalErr) -> Self {
        Self::Eval(err)
    }
}

#[derive(Debug)]
pub struct PlotEntry {
    pub text: String, // display form, as the user typed it (trimmed)
    pub prog: Program,
    pub color: RGB8,
}

// ordered registry of plotted expressions; entries are immutable once added
// and only leave through clear()
#[derive(Debug, Default)]
pub struct Plots {
    entries: Vec<PlotEntry>,
}

impl Plots {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    // reject bad input before it reaches the registry: parse, then a sanity
    // evaluation at x = 0 (anomalies like 1/0 are fine there, errors are not)
    pub fn add(&mut self, raw: &str) -> Result<&PlotEntry, AddErr> {
        let text = raw.trim();
        let src: Arc<str> = parse::normalize(text).into();
        if src.is_empty() {
            return Err(AddErr::Empty);
        }
        let prog = parse::parse(&src)?;
        eval::eval(&prog, 0.0, &mut Vec::new())?;

        let color = PALETTE[self.entries.len() % PALETTE.len()];
        self.entries.push(PlotEntry {
            text: text.to_string(),
            prog,
            color,
        });
        Ok(self.entries.last().unwrap())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> core::slice::Iter<'_, PlotEntry> {
        self.entries.iter()
    }

    // tangent target: the most recently added entry
    pub fn last(&self) -> Option<&PlotEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pen {
    pub color: RGB8,
    pub dashed: bool,
}

// the drawing surface boundary: the host hands in something that can take
// fill, segment, text and marker commands in pixel coordinates
pub trait Surface {
    type Error;

    fn fill(&mut self, color: RGB8) -> Result<(), Self::Error>;
    fn line(&mut self, pen: Pen, a: Point<i32>, b: Point<i32>) -> Result<(), Self::Error>;
    fn text(&mut self, color: RGB8, at: Point<i32>, s: &str) -> Result<(), Self::Error>;
    fn dot(&mut self, color: RGB8, at: Point<i32>, radius: i32) -> Result<(), Self::Error>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub functions: usize,
    pub segments: usize,
}

pub fn render<S: Surface>(
    plots: &Plots,
    view: &mut Viewport,
    pointer: Point<i32>,
    show_tangent: bool,
    extent: Extent,
    surface: &mut S,
) -> Result<FrameStats, S::Error> {
    let frame = view.frame(extent);
    let w = extent.w as i32;
    let h = extent.h as i32;

    surface.fill(BACKGROUND)?;

    // grid lines every max(20, scale) pixels, phase-locked to the origin
    let step = (frame.scale.round() as i32).max(20);
    let start_x = ((frame.origin.x % step) + step) % step;
    let start_y = ((frame.origin.y % step) + step) % step;

    let grid = Pen {
        color: GRID,
        dashed: false,
    };
    let mut sx = start_x;
    while sx < w {
        surface.line(grid, Point { x: sx, y: 0 }, Point { x: sx, y: h })?;
        sx += step;
    }
    let mut sy = start_y;
    while sy < h {
        surface.line(grid, Point { x: 0, y: sy }, Point { x: w, y: sy })?;
        sy += step;
    }

    // tick marks where the grid crosses the axes
    let tick = Pen {
        color: TICK,
        dashed: false,
    };
    let mut sx = start_x;
    while sx < w {
        surface.line(
            tick,
            Point {
                x: sx,
                y: frame.origin.y - 3,
            },
            Point {
                x: sx,
                y: frame.origin.y + 3,
            },
        )?;
        sx += step;
    }
    let mut sy = start_y;
    while sy < h {
        surface.line(
            tick,
            Point {
                x: frame.origin.x - 3,
                y: sy,
            },
            Point {
                x: frame.origin.x + 3,
                y: sy,
            },
        )?;
        sy += step;
    }

    // axes through the origin
    let axis = Pen {
        color: AXIS,
        dashed: false,
    };
    surface.line(
        axis,
        Point {
            x: 0,
            y: frame.origin.y,
        },
        Point {
            x: w,
            y: frame.origin.y,
        },
    )?;
    surface.line(
        axis,
        Point {
            x: frame.origin.x,
            y: 0,
        },
        Point {
            x: frame.origin.x,
            y: h,
        },
    )?;

    // one polyline pass per registered curve; per-column evaluation trouble
    // becomes a gap, never an abort
    let mut stack = Vec::new();
    let mut segments = 0;
    for entry in plots.iter() {
        let pen = Pen {
            color: entry.color,
            dashed: false,
        };
        segments += sample(
            |x| eval::eval(&entry.prog, x, &mut stack),
            |a, b| surface.line(pen, a, b),
            &frame,
        )?;
    }

    // tangent overlay follows the most recently added curve
    if show_tangent {
        if let Some(entry) = plots.last() {
            let x0 = frame.screen_to_world_x(pointer.x);
            let tangent =
                tangent::tangent_at(|x| eval::eval(&entry.prog, x, &mut stack), x0, &frame);
            if let Some(tangent) = tangent {
                let a = Point {
                    x: frame.world_to_screen_x(tangent.a.x),
                    y: frame.world_to_screen_y(tangent.a.y),
                };
                let b = Point {
                    x: frame.world_to_screen_x(tangent.b.x),
                    y: frame.world_to_screen_y(tangent.b.y),
                };
                surface.line(
                    Pen {
                        color: OVERLAY,
                        dashed: true,
                    },
                    a,
                    b,
                )?;
                surface.text(
                    OVERLAY,
                    Point {
                        x: pointer.x + 10,
                        y: pointer.y - 12,
                    },
                    &format!("y' \u{2248} {:.4}", tangent.slope),
                )?;
            }
        }
    }

    // cursor readout
    let wx = frame.screen_to_world_x(pointer.x);
    let wy = frame.screen_to_world_y(pointer.y);
    surface.text(
        OVERLAY,
        Point { x: 10, y: h - 10 },
        &format!(
            "x={wx:.4}  y={wy:.4}    funcs={funcs}  segs={segments}",
            funcs = plots.len()
        ),
    )?;
    surface.dot(CURSOR, pointer, 3)?;
    surface.text(
        LABEL,
        Point {
            x: pointer.x + 10,
            y: pointer.y - 10,
        },
        &format!("({wx:.2}, {wy:.2})"),
    )?;

    Ok(FrameStats {
        functions: plots.len(),
        segments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ParseErrTyp;

    #[test]
    fn add_compiles_and_keeps_display_text() {
        let mut plots = Plots::new();
        let entry = plots.add("  sin (x) ").unwrap();
        assert_eq!(entry.text, "sin (x)");
        assert_eq!(entry.color, PALETTE[0]);
        assert_eq!(plots.len(), 1);
    }

    #[test]
    fn add_rejects_blank_input() {
        let mut plots = Plots::new();
        assert!(matches!(plots.add("   "), Err(AddErr::Empty)));
        assert!(plots.is_empty());
    }

    #[test]
    fn add_rejects_parse_errors_without_registering() {
        let mut plots = Plots::new();
        let err = plots.add("2+2)").unwrap_err();
        assert!(matches!(
            err,
            AddErr::Parse(ParseErr {
                typ: ParseErrTyp::Unexpected { .. },
                ..
            })
        ));
        assert!(plots.is_empty());
    }

    #[test]
    fn anomalies_pass_the_sanity_check() {
        // 1/0 is undefined everywhere but still a valid plot entry
        let mut plots = Plots::new();
        assert!(plots.add("1/0").is_ok());
    }

    #[test]
    fn palette_cycles_in_insertion_order() {
        let mut plots = Plots::new();
        for expr in ["x", "x^2", "sin(x)", "cos(x)", "tan(x)"] {
            plots.add(expr).unwrap();
        }
        let colors: Vec<RGB8> = plots.iter().map(|entry| entry.color).collect();
        assert_eq!(
            colors,
            [PALETTE[0], PALETTE[1], PALETTE[2], PALETTE[3], PALETTE[0]]
        );
        assert_eq!(plots.last().unwrap().text, "tan(x)");
    }

    #[test]
    fn clear_empties_the_registry() {
        let mut plots = Plots::new();
        plots.add("x").unwrap();
        plots.clear();
        assert!(plots.is_empty());
        assert!(plots.last().is_none());
    }
}
