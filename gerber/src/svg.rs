//! Serializes a [`Processor`] to an SVG document.
//!
//! Gerber is Y-up; SVG is Y-down, so every Y value is negated on emission.
//! When the Gerber Y is exactly zero the negated value is written as
//! `-0` rather than `0`, matching observed reference output (spec open
//! question (a)) — integer negation can't produce a signed zero, so this
//! is handled explicitly rather than relying on arithmetic.

use std::io::Write;

use crate::coord::CoordUnit;
use crate::error::GerberError;
use crate::primitive::{LineCap, PathCommand, Primitive};
use crate::processor::Processor;

/// Write `processor` as a single `<svg>` document to `writer`.
pub fn write<W: Write>(processor: &Processor, writer: &mut W) -> Result<(), GerberError> {
    let width = processor.max_x - processor.min_x;
    let height = processor.max_y - processor.min_y;
    let min_y_svg = negate(processor.max_y);

    write!(
        writer,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{} {} {} {}\"",
        processor.min_x, min_y_svg, width, height
    )?;
    if let Some(w) = processor.width {
        write!(writer, " width=\"{w}\"")?;
    }
    if let Some(h) = processor.height {
        write!(writer, " height=\"{h}\"")?;
    }
    if let Some(scale) = processor.scale {
        write!(writer, " data-scale=\"{scale}\"")?;
    }
    if processor.pan_zoom {
        write!(writer, " data-pan-zoom=\"true\"")?;
    }
    writeln!(writer, ">")?;
    writeln!(
        writer,
        "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\"/>",
        processor.min_x, min_y_svg, width, height, processor.polarity_clear
    )?;

    for primitive in &processor.data {
        write_primitive(writer, primitive)?;
    }

    writeln!(writer, "</svg>")?;
    Ok(())
}

fn write_primitive<W: Write>(writer: &mut W, primitive: &Primitive) -> Result<(), GerberError> {
    match primitive {
        Primitive::Line {
            x1,
            y1,
            x2,
            y2,
            stroke_width,
            cap,
            stroke,
            line,
            approximate,
        } => {
            if *approximate {
                writeln!(
                    writer,
                    "  <!-- approximate: rectangular/obround aperture stroke rendered as a {} line of width {} -->",
                    cap_name(*cap),
                    stroke_width
                )?;
            }
            writeln!(
                writer,
                "  <line x1=\"{x1}\" y1=\"{}\" x2=\"{x2}\" y2=\"{}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\" stroke-linecap=\"{}\" line=\"{line}\"/>",
                negate(*y1),
                negate(*y2),
                cap_name(*cap),
            )?;
        }
        Primitive::Arc {
            xs,
            ys,
            xe,
            ye,
            rx,
            ry,
            large_arc,
            sweep,
            stroke_width,
            stroke,
            line,
            ..
        } => {
            writeln!(
                writer,
                "  <path d=\"M {xs},{} A {rx} {ry} 0 {} {} {xe},{}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\" fill=\"none\" line=\"{line}\"/>",
                negate(*ys),
                *large_arc as u8,
                *sweep as u8,
                negate(*ye),
            )?;
        }
        Primitive::Circle { x, y, radius, fill, line } => {
            writeln!(
                writer,
                "  <circle cx=\"{x}\" cy=\"{}\" r=\"{radius}\" fill=\"{fill}\" line=\"{line}\"/>",
                negate(*y),
            )?;
        }
        Primitive::Rectangle {
            x,
            y,
            w,
            h,
            rx,
            ry,
            fill,
            line,
            ..
        } => {
            writeln!(
                writer,
                "  <rect x=\"{x}\" y=\"{}\" width=\"{w}\" height=\"{h}\" rx=\"{rx}\" ry=\"{ry}\" fill=\"{fill}\" line=\"{line}\"/>",
                negate(*y + *h),
            )?;
        }
        Primitive::Path {
            x,
            y,
            fill,
            commands,
            line,
        } => {
            let mut d = format!("M {x},{}", negate(*y));
            for cmd in commands {
                match cmd {
                    PathCommand::PathLine { x, y } => {
                        d.push_str(&format!(" L {x},{}", negate(*y)));
                    }
                    PathCommand::PathArc {
                        rx,
                        ry,
                        large_arc,
                        sweep,
                        x,
                        y,
                        ..
                    } => {
                        d.push_str(&format!(
                            " A {rx} {ry} 0 {} {} {x},{}",
                            *large_arc as u8,
                            *sweep as u8,
                            negate(*y)
                        ));
                    }
                }
            }
            d.push_str(" Z");
            writeln!(writer, "  <path d=\"{d}\" fill=\"{fill}\" line=\"{line}\"/>")?;
        }
    }
    Ok(())
}

fn cap_name(cap: LineCap) -> &'static str {
    match cap {
        LineCap::Round => "round",
        LineCap::Square => "square",
        LineCap::Butt => "butt",
    }
}

/// Negate a coordinate unit for the Y-up -> Y-down flip, writing `-0`
/// instead of `0` when the original value was exactly zero.
fn negate(value: CoordUnit) -> String {
    if value == 0 {
        "-0".to_string()
    } else {
        (-value).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Processor;

    #[test]
    fn zero_y_is_written_as_signed_zero() {
        assert_eq!(negate(0), "-0");
        assert_eq!(negate(5), "-5");
        assert_eq!(negate(-5), "5");
    }

    #[test]
    fn view_box_matches_bounding_box() {
        let mut p = Processor::new(1_000_000);
        p.push(Primitive::Circle {
            x: 0,
            y: 0,
            radius: 5,
            fill: "white".into(),
            line: 1,
        });
        let mut out = Vec::new();
        write(&p, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("viewBox=\"-5 -5 10 10\""));
    }
}
