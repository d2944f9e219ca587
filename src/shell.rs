// SPDX: CC0-1.0

use crate::{eval::Program, lex::Span};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Plot,
    Clear,
    ZoomIn,
    ZoomOut,
    Reset,
    Pan,
    Pointer,
    Tangent,
    Render,
    PrintProg,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::Plot,
            Self::Clear,
            Self::ZoomIn,
            Self::ZoomOut,
            Self::Reset,
            Self::Pan,
            Self::Pointer,
            Self::Tangent,
            Self::Render,
            Self::PrintProg,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::Plot => "parse an expression and add it to the plotted set",
            Self::Clear => "remove every plotted expression",
            Self::ZoomIn => "zoom in by one step",
            Self::ZoomOut => "zoom out by one step",
            Self::Reset => "restore the default scale and recenter the origin",
            Self::Pan => "pan the viewport by a pixel delta",
            Self::Pointer => "move the pointer to a pixel position",
            Self::Tangent => "toggle the tangent overlay at the pointer",
            Self::Render => "render the current frame and open it in gnuplot",
            Self::PrintProg => {
                "print the program compiled from the last expression (for debugging)"
            }
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::Plot => "plot",
            Self::Clear => "clear",
            Self::ZoomIn => "in",
            Self::ZoomOut => "out",
            Self::Reset => "reset",
            Self::Pan => "pan",
            Self::Pointer => "pointer",
            Self::Tangent => "tangent",
            Self::Render => "render",
            Self::PrintProg => "prog",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for c in Self::exhaustive() {
            if s == c.name() {
                return Ok(*c);
            }
        }
        Err(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input: Arc<str> = input(&mut out, prompt)?.into();
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &Span::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &Span) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.start()),
        "^".repeat(span.len().max(1))
    )?;
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    prog: &Program,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title}: ")?;
    if prog.ops().len() == 0 {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}
