// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use grapher::{
    lex::{LexErrTyp, TokTyp},
    parse::ParseErrTyp,
    render::{self, AddErr, Pen, Plots, Surface},
    shell::{self, Command},
    stdlib, Extent, Point, Viewport,
};
use rgb::RGB8;
#[cfg(not(debug_assertions))]
use std::process::Stdio;
use std::{
    fs::{File, OpenOptions},
    io::{self, stdout, BufWriter, Write},
    process::{self, Child, ExitCode},
};

const SURFACE_RES: Extent = Extent { w: 1920, h: 1080 };

fn output_svg_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "svg"
    )
}

fn output_gnuplot_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "gnuplot"
    )
}

fn output_data_filename(now: DateTime<Local>) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        "data"
    )
}

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    plots: Plots,
    view: Viewport,
    pointer: Point<i32>,
    show_tangent: bool,
    gnuplot: Option<Child>,
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        plots: Plots::new(),
        view: Viewport::new(),
        pointer: Point {
            x: SURFACE_RES.w as i32 / 2,
            y: SURFACE_RES.h as i32 / 2,
        },
        show_tangent: true,
        gnuplot: None,
    };

    let mut stdout = BufWriter::new(stdout());
    loop {
        writeln!(
            stdout,
            "{funcs} plotted, {view}, tangent {tangent}",
            funcs = state.plots.len(),
            view = state.view,
            tangent = if state.show_tangent { "on" } else { "off" },
        )?;

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::Plot => plot_expr(&mut stdout, &mut state)?,

                Command::Clear => {
                    state.plots.clear();
                    writeln!(stdout, "Cleared.")?;
                }

                Command::ZoomIn => state.view.zoom_in(),

                Command::ZoomOut => state.view.zoom_out(),

                Command::Reset => state.view.reset(),

                Command::Pan => pan(&mut stdout, &mut state)?,

                Command::Pointer => move_pointer(&mut stdout, &mut state)?,

                Command::Tangent => state.show_tangent = !state.show_tangent,

                Command::Render => render_frame(&mut stdout, &mut state)?,

                Command::PrintProg => {
                    if let Some(entry) = state.plots.last() {
                        shell::dump_program(
                            &mut stdout,
                            &entry.prog,
                            format_args!("y = {}", entry.text),
                        )?;
                    } else {
                        writeln!(stdout, "error: nothing is plotted")?;
                    }
                }
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

fn plot_expr<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let mut input = shell::input(&mut out, "y = ")?;
    if let Some(rest) = input.strip_prefix("y=").or_else(|| input.strip_prefix("Y=")) {
        input = rest.trim().to_string();
    }

    match state.plots.add(&input) {
        Ok(entry) => {
            writeln!(out, "Plotted: y = {}", entry.text)?;
        }

        Err(AddErr::Empty) => {
            writeln!(out, "Enter an expression.")?;
        }

        Err(AddErr::Parse(err)) => {
            writeln!(out)?;
            shell::underline(&mut out, &err.loc)?;
            writeln!(out, "Parse error: {}", err.typ)?;
            parse_notes(&mut out, &err.typ)?;
        }

        Err(AddErr::Eval(err)) => {
            writeln!(out, "Parse error: {err}")?;
        }
    }

    Ok(())
}

fn parse_notes<W: Write>(mut out: W, typ: &ParseErrTyp) -> io::Result<()> {
    match typ {
        ParseErrTyp::LexErr(lex_err) => match lex_err {
            LexErrTyp::UnexpectedChar(_) => {
                writeln!(
                    out,
                    "note: available tokens are numbers, lowercase identifiers, and symbols +-*/^()"
                )?;
            }
            LexErrTyp::Unsupported(typ) => match typ {
                TokTyp::Ident
                | TokTyp::Number
                | TokTyp::Plus
                | TokTyp::Minus
                | TokTyp::Star
                | TokTyp::Slash
                | TokTyp::Caret
                | TokTyp::OpenParen
                | TokTyp::CloseParen => unreachable!(),

                TokTyp::XLess | TokTyp::XGreater => {
                    writeln!(out, "note: expected an expression but found an inequality")?;
                }
                TokTyp::XEqual => {
                    writeln!(out, "note: expected an expression but found an equation")?;
                }
                TokTyp::XPipe => {
                    writeln!(out, "note: use the 'abs' function to compute absolute value")?;
                }
                TokTyp::XComma => {
                    writeln!(out, "note: every builtin function takes a single argument")?;
                }
                TokTyp::XOpenSquare
                | TokTyp::XCloseSquare
                | TokTyp::XOpenCurly
                | TokTyp::XCloseCurly => {}
            },
        },

        ParseErrTyp::ParseNum(_) => {
            writeln!(out, "note: parsing as floating point number")?;
        }

        ParseErrTyp::UnknownFunction { name } => {
            let text = name.as_str().to_ascii_lowercase();
            let most_similar = stdlib::NAMES
                .iter()
                .map(|known| (strsim::normalized_damerau_levenshtein(&text, known), *known))
                .reduce(|acc, elem| if elem.0 > acc.0 { elem } else { acc });
            if let Some((sim, known)) = most_similar {
                if sim > 0.3 {
                    let typ = match stdlib::resolve(known) {
                        Some(stdlib::Ident::Var) => "variable",
                        Some(stdlib::Ident::Const(_)) => "constant",
                        Some(stdlib::Ident::Fun(_)) => "function",
                        None => unreachable!("every suggestion name resolves"),
                    };
                    writeln!(out, "note: {typ} '{known}' has a similar name")?;
                }
            }
        }

        ParseErrTyp::Unexpected { text } => {
            if text
                .as_str()
                .starts_with(|chr: char| chr.is_ascii_alphanumeric())
            {
                writeln!(
                    out,
                    "note: implicit multiplication is not supported, so for example '2x' would be '2*x'"
                )?;
            }
        }

        ParseErrTyp::MissingParen | ParseErrTyp::UnexpectedEnd => {}
    }

    Ok(())
}

fn pan<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "note: positive dx pans right, positive dy pans down")?;
    let mut delta = Point { x: 0, y: 0 };
    for (name, dst) in [("dx", &mut delta.x), ("dy", &mut delta.y)] {
        match shell::read_fromstr::<_, i32>(&mut out, format_args!("?{name} = "), true)? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }
    state.view.pan(delta.x, delta.y);
    Ok(())
}

fn move_pointer<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    for (name, dst) in [
        ("px", &mut state.pointer.x),
        ("py", &mut state.pointer.y),
    ] {
        match shell::read_fromstr::<_, i32>(
            &mut out,
            format_args!("?{name} (is {cur}) = ", cur = *dst),
            true,
        )? {
            Ok(Some(new)) => *dst = new,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }
    Ok(())
}

fn render_frame<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    if let Some(mut old_child) = state.gnuplot.take() {
        old_child
            .kill()
            .context("failed to kill previous gnuplot child")?;
    }

    let now = Local::now();
    let data_path = output_data_filename(now);
    let gnuplot_path = output_gnuplot_filename(now);
    let svg_path = output_svg_filename(now);

    let mut surface = GnuplotSurface::create(&data_path, &gnuplot_path, &svg_path, SURFACE_RES)
        .context("failed to open output files")?;

    let stats = render::render(
        &state.plots,
        &mut state.view,
        state.pointer,
        state.show_tangent,
        SURFACE_RES,
        &mut surface,
    )
    .context("failed to write frame")?;

    surface.finish().context("failed to finish output files")?;

    // spawn gnuplot and provide the path to the script
    let mut cmd = process::Command::new("gnuplot");
    cmd.arg("--persist").arg(&gnuplot_path);
    #[cfg(not(debug_assertions))]
    {
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());
    }
    let child = cmd
        .spawn()
        .context("failed to spawn gnuplot (is it installed and in ${{PATH}}?)")?;
    state.gnuplot = Some(child);

    writeln!(
        out,
        "rendered {funcs} function{s}, {segs} segments, to '{svg_path}'",
        funcs = stats.functions,
        s = if stats.functions == 1 { "" } else { "s" },
        segs = stats.segments,
    )?;

    Ok(())
}

// realizes the drawing surface as a gnuplot script over pixel coordinates:
// solid segments stream to a data file plotted as vectors with a per-row
// color column, everything else becomes script objects
#[derive(Debug)]
struct GnuplotSurface {
    data: BufWriter<File>,
    script: BufWriter<File>,
    data_path: String,
    vectors: usize,
    objects: usize,
}

impl GnuplotSurface {
    fn create(
        data_path: &str,
        script_path: &str,
        svg_path: &str,
        extent: Extent,
    ) -> io::Result<Self> {
        let data = BufWriter::new(
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(data_path)?,
        );
        let mut script = BufWriter::new(
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(script_path)?,
        );

        writeln!(script, "reset")?;
        writeln!(script, "set term push")?;
        writeln!(
            script,
            "set terminal svg size {w},{h} enhanced",
            w = extent.w,
            h = extent.h
        )?;
        writeln!(script, "set output '{svg_path}'")?;

        // pixel coordinates, screen y growing downward
        writeln!(script, "set xrange [0:{w}]", w = extent.w)?;
        writeln!(script, "set yrange [{h}:0]", h = extent.h)?;
        writeln!(script, "unset border")?;
        writeln!(script, "unset tics")?;
        writeln!(script, "set key off")?;

        Ok(Self {
            data,
            script,
            data_path: data_path.to_string(),
            vectors: 0,
            objects: 0,
        })
    }

    fn next_object(&mut self) -> usize {
        self.objects += 1;
        self.objects
    }

    fn finish(mut self) -> io::Result<()> {
        if self.vectors > 0 {
            writeln!(
                self.script,
                "plot '{path}' using 1:2:3:4:5 with vectors nohead lc rgb variable",
                path = self.data_path,
            )?;
        } else {
            // an empty plot still renders the script's objects and labels
            writeln!(self.script, "plot -1 notitle")?;
        }

        // display window
        writeln!(self.script, "set term pop")?;
        writeln!(self.script, "replot")?;

        self.data.flush()?;
        self.data.get_mut().sync_data()?;
        self.script.flush()?;
        self.script.get_mut().sync_data()?;
        Ok(())
    }
}

fn hex(color: RGB8) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn rgb24(color: RGB8) -> u32 {
    (u32::from(color.r) << 16) | (u32::from(color.g) << 8) | u32::from(color.b)
}

impl Surface for GnuplotSurface {
    type Error = io::Error;

    fn fill(&mut self, color: RGB8) -> io::Result<()> {
        let id = self.next_object();
        writeln!(
            self.script,
            "set object {id} rectangle from screen 0,0 to screen 1,1 fc rgb '{c}' fillstyle solid noborder behind",
            c = hex(color),
        )
    }

    fn line(&mut self, pen: Pen, a: Point<i32>, b: Point<i32>) -> io::Result<()> {
        if pen.dashed {
            writeln!(
                self.script,
                "set arrow from {ax},{ay} to {bx},{by} nohead dashtype 2 lc rgb '{c}'",
                ax = a.x,
                ay = a.y,
                bx = b.x,
                by = b.y,
                c = hex(pen.color),
            )
        } else {
            self.vectors += 1;
            writeln!(
                self.data,
                "{ax} {ay} {dx} {dy} {c}",
                ax = a.x,
                ay = a.y,
                dx = b.x - a.x,
                dy = b.y - a.y,
                c = rgb24(pen.color),
            )
        }
    }

    fn text(&mut self, color: RGB8, at: Point<i32>, s: &str) -> io::Result<()> {
        writeln!(
            self.script,
            "set label \"{s}\" at {x},{y} left textcolor rgb '{c}' noenhanced",
            x = at.x,
            y = at.y,
            c = hex(color),
        )
    }

    fn dot(&mut self, color: RGB8, at: Point<i32>, radius: i32) -> io::Result<()> {
        let id = self.next_object();
        writeln!(
            self.script,
            "set object {id} circle at {x},{y} size {radius} fc rgb '{c}' fillstyle solid noborder front",
            x = at.x,
            y = at.y,
            c = hex(color),
        )
    }
}
