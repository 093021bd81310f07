//! The state machine: `(state, block) -> (state', primitives)`.
//!
//! Consumes tokenized blocks in order, mutating the [`GraphicsState`] and
//! the [`ApertureStore`], and appending resolved [`Primitive`]s to the
//! [`Processor`]. Holds no state beyond these three values — a pure
//! transformer from a byte stream to a `Processor`.

use std::f64::consts::PI;
use std::io::Read;

use crate::aperture::{Aperture, ApertureStore, Hole};
use crate::command::{self, ApertureShapeCode, Command, DOp, DataStatement, GCode};
use crate::coord::{CoordUnit, CoordinateFormat};
use crate::error::GerberError;
use crate::primitive::{LineCap, PathCommand, Primitive};
use crate::processor::Processor;
use crate::state::{GraphicsState, InterpolationMode, QuadrantMode, RegionMode, RegionPath};
use crate::tokenizer::{tokenize, Block, BlockKind};

/// Parse a byte stream into a [`Processor`].
pub fn parse<R: Read>(mut reader: R) -> Result<Processor, GerberError> {
    let mut src = String::new();
    reader.read_to_string(&mut src)?;
    parse_str(&src)
}

/// Parse a Gerber source string into a [`Processor`].
pub fn parse_str(input: &str) -> Result<Processor, GerberError> {
    let blocks = tokenize(input)?;

    let mut state = GraphicsState::new();
    let mut apertures = ApertureStore::new();
    let mut processor = Processor::new(1);

    for block in &blocks {
        if let Some(result) = dispatch(block, &mut state, &mut apertures, &mut processor)? {
            if result == Terminate::Yes {
                break;
            }
        }
    }

    if state.format.is_none() {
        log::warn!("file contained no FS/MO declaration");
    }

    Ok(processor)
}

#[derive(PartialEq, Eq)]
enum Terminate {
    Yes,
    No,
}

fn dispatch(
    block: &Block,
    state: &mut GraphicsState,
    apertures: &mut ApertureStore,
    processor: &mut Processor,
) -> Result<Option<Terminate>, GerberError> {
    let line = block.line;
    let command = match block.kind {
        BlockKind::Parameter => command::parse_parameter(&block.text)
            .map_err(|e| command::to_malformed(line, &block.text, e))?,
        BlockKind::Data => command::parse_data(&block.text)
            .map_err(|e| command::to_malformed(line, &block.text, e))?,
    };

    match command {
        Command::Mode(unit) => {
            state.unit = Some(unit);
            Ok(Some(Terminate::No))
        }
        Command::FormatSpecification {
            integer_digits,
            fractional_digits,
            omission,
            notation,
        } => {
            if state.format.is_some() {
                return Err(GerberError::InvalidState {
                    line,
                    message: "format specification (FS) redefined".to_string(),
                });
            }
            let format = CoordinateFormat {
                integer_digits,
                fractional_digits,
                omission,
                notation,
            };
            processor.decimal = format.decimal();
            state.format = Some(format);
            Ok(Some(Terminate::No))
        }
        Command::ApertureDefine { id, shape, params } => {
            if params.iter().any(|p| p.is_nan()) {
                return Err(GerberError::Unsupported {
                    line,
                    message: "aperture macro templates (AM-based apertures) are not supported"
                        .to_string(),
                });
            }
            let format = state.format.ok_or(GerberError::InvalidState {
                line,
                message: "aperture defined before FS/MO".to_string(),
            })?;
            let aperture = build_aperture(shape, &params, &format, line)?;
            apertures.define(id, aperture, line)?;
            Ok(Some(Terminate::No))
        }
        Command::ApertureMacro => Err(GerberError::Unsupported {
            line,
            message: "aperture macros (AM) are not supported".to_string(),
        }),
        Command::StepAndRepeat => Err(GerberError::Unsupported {
            line,
            message: "step-and-repeat (SR) is not supported".to_string(),
        }),
        Command::LoadPolarity(polarity) => {
            state.polarity = polarity;
            Ok(Some(Terminate::No))
        }
        Command::LoadNameIgnored | Command::AttributeIgnored => Ok(Some(Terminate::No)),
        Command::AttributeOnFile(name) => {
            log::debug!("ignoring file attribute {name:?}");
            Ok(Some(Terminate::No))
        }
        Command::Comment(text) => {
            log::trace!("comment: {text}");
            Ok(Some(Terminate::No))
        }
        Command::ProgramStop | Command::OptionalStop => Ok(Some(Terminate::No)),
        Command::EndOfFile => Ok(Some(Terminate::Yes)),
        Command::Data(ds) => {
            process_data_statement(ds, line, state, apertures, processor)?;
            Ok(Some(Terminate::No))
        }
    }
}

fn build_aperture(
    shape: ApertureShapeCode,
    params: &[f64],
    format: &CoordinateFormat,
    line: usize,
) -> Result<Aperture, GerberError> {
    let to_unit = |v: f64| format.to_coord_unit(v);
    let too_few = || GerberError::MalformedInput {
        line,
        message: "aperture definition is missing required parameters".to_string(),
    };

    Ok(match shape {
        ApertureShapeCode::Circle => {
            let diameter = to_unit(*params.first().ok_or_else(too_few)?);
            let hole = params.get(1).map(|d| Hole::Circle { diameter: to_unit(*d) });
            Aperture::Circle { diameter, hole }
        }
        ApertureShapeCode::Rectangle | ApertureShapeCode::Obround => {
            let width = to_unit(*params.first().ok_or_else(too_few)?);
            let height = to_unit(*params.get(1).ok_or_else(too_few)?);
            let hole = match (params.get(2), params.get(3)) {
                (Some(d), None) => Some(Hole::Circle { diameter: to_unit(*d) }),
                (Some(w), Some(h)) => Some(Hole::Rectangle {
                    width: to_unit(*w),
                    height: to_unit(*h),
                }),
                _ => None,
            };
            if shape == ApertureShapeCode::Rectangle {
                Aperture::Rectangle { width, height, hole }
            } else {
                Aperture::Obround { width, height, hole }
            }
        }
        ApertureShapeCode::Polygon => {
            let outer_diameter = to_unit(*params.first().ok_or_else(too_few)?);
            let vertices = *params.get(1).ok_or_else(too_few)? as u8;
            if !(3..=12).contains(&vertices) {
                return Err(GerberError::MalformedInput {
                    line,
                    message: format!("polygon aperture vertex count {vertices} out of range 3..=12"),
                });
            }
            let rotation_deg = params.get(2).copied().unwrap_or(0.0);
            let hole = params.get(3).map(|d| Hole::Circle { diameter: to_unit(*d) });
            Aperture::Polygon {
                outer_diameter,
                vertices,
                rotation_deg,
                hole,
            }
        }
    })
}

fn process_data_statement(
    ds: DataStatement,
    line: usize,
    state: &mut GraphicsState,
    apertures: &ApertureStore,
    processor: &mut Processor,
) -> Result<(), GerberError> {
    if let Some(g) = ds.g {
        apply_gcode(g, state, processor, line)?;
    }

    if let Some(DOp::Select(id)) = ds.d {
        apertures.get(id, line)?;
        state.current_aperture = Some(id);
        return Ok(());
    }

    let needs_format = ds.x.is_some()
        || ds.y.is_some()
        || ds.i.is_some()
        || ds.j.is_some()
        || matches!(ds.d, Some(DOp::Plot) | Some(DOp::Move) | Some(DOp::Flash));
    if !needs_format {
        return Ok(());
    }

    let format = state.format.ok_or(GerberError::InvalidState {
        line,
        message: "coordinate data before FS/MO".to_string(),
    })?;

    let x = match &ds.x {
        Some(s) => format.decode(s, line)?,
        None => state.current_point.0,
    };
    let y = match &ds.y {
        Some(s) => format.decode(s, line)?,
        None => state.current_point.1,
    };
    let i = match &ds.i {
        Some(s) => format.decode(s, line)?,
        None => 0,
    };
    let j = match &ds.j {
        Some(s) => format.decode(s, line)?,
        None => 0,
    };

    match ds.d {
        Some(DOp::Select(_)) => unreachable!("handled above before the format check"),
        Some(DOp::Move) => apply_move(state, processor, x, y, line)?,
        Some(DOp::Plot) => apply_plot(state, apertures, processor, x, y, i, j, line)?,
        Some(DOp::Flash) => apply_flash(state, apertures, processor, x, y, line)?,
        None => {}
    }

    Ok(())
}

fn apply_gcode(
    g: GCode,
    state: &mut GraphicsState,
    processor: &mut Processor,
    line: usize,
) -> Result<(), GerberError> {
    match g {
        GCode::Linear => state.interp_mode = InterpolationMode::Linear,
        GCode::CwCircular => state.interp_mode = InterpolationMode::CwCircular,
        GCode::CcwCircular => state.interp_mode = InterpolationMode::CcwCircular,
        GCode::SingleQuadrant => state.quadrant_mode = QuadrantMode::Single,
        GCode::MultiQuadrant => state.quadrant_mode = QuadrantMode::Multi,
        GCode::SelectAperturePrefix => {}
        GCode::DeprecatedUnit(unit) => {
            if state.unit.is_none() {
                state.unit = Some(unit);
            }
        }
        GCode::DeprecatedNotation(_) => {
            // Honored only when FS has not already declared a notation;
            // since `state.format` always carries notation once set, a
            // deprecated G90/G91 after FS is a no-op.
        }
        GCode::RegionStart => region_start(state, line)?,
        GCode::RegionEnd => region_end(state, processor, line)?,
    }
    Ok(())
}

fn region_start(state: &mut GraphicsState, line: usize) -> Result<(), GerberError> {
    if state.region_mode == RegionMode::On {
        return Err(GerberError::InvalidState {
            line,
            message: "G36 while already inside a region".to_string(),
        });
    }
    state.region_mode = RegionMode::On;
    state.in_region_path = None;
    Ok(())
}

fn region_end(state: &mut GraphicsState, processor: &mut Processor, line: usize) -> Result<(), GerberError> {
    if state.region_mode == RegionMode::Off {
        return Err(GerberError::InvalidState {
            line,
            message: "G37 without a matching G36".to_string(),
        });
    }
    match state.in_region_path.take() {
        Some(region) => close_region_path(region, state, processor, line)?,
        None => {
            return Err(GerberError::InvalidState {
                line,
                message: "region closed without a D02 anchor".to_string(),
            })
        }
    }
    state.region_mode = RegionMode::Off;
    Ok(())
}

/// Pushes `region` as a closed `Primitive::Path`, erroring if it has fewer
/// than the 3 edges a region requires. Shared by `region_end` (`G37`) and
/// `apply_move` (a `D02` re-anchor partway through a region), which both
/// close out whatever edges accumulated since the last anchor.
fn close_region_path(
    region: RegionPath,
    state: &GraphicsState,
    processor: &mut Processor,
    line: usize,
) -> Result<(), GerberError> {
    if region.commands.len() < 3 {
        return Err(GerberError::InvalidState {
            line,
            message: "region must contain at least 3 edges".to_string(),
        });
    }
    let fill = state
        .polarity_color(&processor.polarity_dark, &processor.polarity_clear)
        .to_string();
    processor.push(Primitive::Path {
        x: region.start.0,
        y: region.start.1,
        fill,
        commands: region.commands,
        line,
    });
    Ok(())
}

fn apply_move(
    state: &mut GraphicsState,
    processor: &mut Processor,
    x: CoordUnit,
    y: CoordUnit,
    line: usize,
) -> Result<(), GerberError> {
    if state.region_mode == RegionMode::On {
        if let Some(region) = state.in_region_path.take() {
            if !region.commands.is_empty() {
                close_region_path(region, state, processor, line)?;
            }
        }
        state.in_region_path = Some(RegionPath {
            start: (x, y),
            commands: Vec::new(),
        });
    }
    state.current_point = (x, y);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_plot(
    state: &mut GraphicsState,
    apertures: &ApertureStore,
    processor: &mut Processor,
    x: CoordUnit,
    y: CoordUnit,
    i: CoordUnit,
    j: CoordUnit,
    line: usize,
) -> Result<(), GerberError> {
    match state.region_mode {
        RegionMode::On => {
            let cmd = match state.interp_mode {
                InterpolationMode::Linear => PathCommand::PathLine { x, y },
                InterpolationMode::CwCircular | InterpolationMode::CcwCircular => {
                    let geo = resolve_arc(state.current_point, (x, y), i, j, state.quadrant_mode, state.interp_mode, line)?;
                    PathCommand::PathArc {
                        rx: geo.rx,
                        ry: geo.ry,
                        large_arc: geo.large_arc,
                        sweep: geo.sweep,
                        x,
                        y,
                        cx: geo.cx,
                        cy: geo.cy,
                    }
                }
            };
            let region = state.in_region_path.as_mut().ok_or(GerberError::InvalidState {
                line,
                message: "D01 inside a region before a D02 anchor".to_string(),
            })?;
            region.commands.push(cmd);
        }
        RegionMode::Off => {
            let ap_id = state.current_aperture.ok_or(GerberError::InvalidState {
                line,
                message: "D01 without a selected aperture".to_string(),
            })?;
            let aperture = apertures.get(ap_id, line)?;
            let stroke_width = aperture.stroke_width();
            let stroke = state
                .polarity_color(&processor.polarity_dark, &processor.polarity_clear)
                .to_string();
            match state.interp_mode {
                InterpolationMode::Linear => processor.push(Primitive::Line {
                    x1: state.current_point.0,
                    y1: state.current_point.1,
                    x2: x,
                    y2: y,
                    stroke_width,
                    cap: LineCap::Round,
                    stroke,
                    line,
                    approximate: aperture.is_approximate_stroke(),
                }),
                InterpolationMode::CwCircular | InterpolationMode::CcwCircular => {
                    let geo = resolve_arc(state.current_point, (x, y), i, j, state.quadrant_mode, state.interp_mode, line)?;
                    processor.push(Primitive::Arc {
                        xs: state.current_point.0,
                        ys: state.current_point.1,
                        xe: x,
                        ye: y,
                        rx: geo.rx,
                        ry: geo.ry,
                        large_arc: geo.large_arc,
                        sweep: geo.sweep,
                        cx: geo.cx,
                        cy: geo.cy,
                        stroke_width,
                        stroke,
                        line,
                    });
                }
            }
        }
    }
    state.current_point = (x, y);
    Ok(())
}

fn apply_flash(
    state: &mut GraphicsState,
    apertures: &ApertureStore,
    processor: &mut Processor,
    x: CoordUnit,
    y: CoordUnit,
    line: usize,
) -> Result<(), GerberError> {
    if state.region_mode == RegionMode::On {
        return Err(GerberError::InvalidState {
            line,
            message: "D03 (flash) is not allowed inside a region".to_string(),
        });
    }
    let ap_id = state.current_aperture.ok_or(GerberError::InvalidState {
        line,
        message: "D03 without a selected aperture".to_string(),
    })?;
    let aperture = *apertures.get(ap_id, line)?;
    let fill = state
        .polarity_color(&processor.polarity_dark, &processor.polarity_clear)
        .to_string();

    match aperture {
        Aperture::Circle { diameter, .. } => processor.push(Primitive::Circle {
            x,
            y,
            radius: diameter / 2,
            fill,
            line,
        }),
        Aperture::Rectangle { width, height, .. } => processor.push(Primitive::Rectangle {
            x: x - width / 2,
            y: y - height / 2,
            w: width,
            h: height,
            rx: 0,
            ry: 0,
            fill,
            aperture: ap_id.0,
            line,
        }),
        Aperture::Obround { width, height, .. } => {
            let r = width.min(height) / 2;
            processor.push(Primitive::Rectangle {
                x: x - width / 2,
                y: y - height / 2,
                w: width,
                h: height,
                rx: r,
                ry: r,
                fill,
                aperture: ap_id.0,
                line,
            });
        }
        Aperture::Polygon {
            outer_diameter,
            vertices,
            rotation_deg,
            ..
        } => {
            let radius = outer_diameter as f64 / 2.0;
            let mut commands = Vec::new();
            let mut first = (x, y);
            for k in 0..vertices {
                let angle = rotation_deg.to_radians() + (k as f64) * 2.0 * PI / (vertices as f64);
                let vx = (x as f64 + radius * angle.cos()).round() as CoordUnit;
                let vy = (y as f64 + radius * angle.sin()).round() as CoordUnit;
                if k == 0 {
                    first = (vx, vy);
                } else {
                    commands.push(PathCommand::PathLine { x: vx, y: vy });
                }
            }
            processor.push(Primitive::Path {
                x: first.0,
                y: first.1,
                fill,
                commands,
                line,
            });
        }
    }
    state.current_point = (x, y);
    Ok(())
}

struct ArcGeometry {
    cx: CoordUnit,
    cy: CoordUnit,
    rx: CoordUnit,
    ry: CoordUnit,
    large_arc: bool,
    sweep: bool,
}

/// Reconstruct the arc center and SVG flags from a `D01` circular
/// interpolation. In single-quadrant mode (`G74`) `i`/`j` are unsigned and
/// the signed combination is chosen so the arc sweeps <= 90 degrees; in
/// multi-quadrant mode (`G75`) they are used directly. Either way the
/// reconstructed center must be equidistant (within one coordinate unit)
/// from both endpoints.
fn resolve_arc(
    current: (CoordUnit, CoordUnit),
    end: (CoordUnit, CoordUnit),
    i: CoordUnit,
    j: CoordUnit,
    quadrant_mode: QuadrantMode,
    interp_mode: InterpolationMode,
    line: usize,
) -> Result<ArcGeometry, GerberError> {
    let (xs, ys) = (current.0 as f64, current.1 as f64);
    let (xe, ye) = (end.0 as f64, end.1 as f64);
    let ccw = matches!(interp_mode, InterpolationMode::CcwCircular);
    const TOLERANCE: f64 = 1.0;

    let candidates: Vec<(f64, f64)> = match quadrant_mode {
        QuadrantMode::Multi => vec![(xs + i as f64, ys + j as f64)],
        QuadrantMode::Single => {
            let ai = (i as f64).abs();
            let aj = (j as f64).abs();
            vec![
                (xs + ai, ys + aj),
                (xs + ai, ys - aj),
                (xs - ai, ys + aj),
                (xs - ai, ys - aj),
            ]
        }
    };

    for (cx, cy) in candidates {
        let r1 = ((xs - cx).powi(2) + (ys - cy).powi(2)).sqrt();
        let r2 = ((xe - cx).powi(2) + (ye - cy).powi(2)).sqrt();
        if (r1 - r2).abs() > TOLERANCE {
            continue;
        }

        let a1 = (ys - cy).atan2(xs - cx);
        let a2 = (ye - cy).atan2(xe - cx);
        let mut delta = a2 - a1;
        if ccw {
            while delta < 0.0 {
                delta += 2.0 * PI;
            }
        } else {
            while delta > 0.0 {
                delta -= 2.0 * PI;
            }
            delta = delta.abs();
        }

        if quadrant_mode == QuadrantMode::Single && delta > PI / 2.0 + 1e-6 {
            continue;
        }

        let r = ((r1 + r2) / 2.0).round() as CoordUnit;
        return Ok(ArcGeometry {
            cx: cx.round() as CoordUnit,
            cy: cy.round() as CoordUnit,
            rx: r,
            ry: r,
            large_arc: delta > PI + 1e-9,
            sweep: ccw,
        });
    }

    Err(GerberError::InvalidState {
        line,
        message: "arc endpoint is inconsistent with I/J".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn two_squares() -> &'static str {
        indoc! {"
            %FSLAX26Y26*%
            %MOMM*%
            %ADD10C,0.010*%
            G01*
            %LPD*%
            D10*
            X0Y0D02*
            X0Y5000000D01*
            X5000000Y5000000D01*
            X5000000Y0D01*
            X0Y0D01*
            X6000000Y0D02*
            X6000000Y5000000D01*
            X11000000Y5000000D01*
            X11000000Y0D01*
            X6000000Y0D01*
            M02*
        "}
    }

    #[test]
    fn two_square_boxes_bounding_box_and_lines() {
        let processor = parse_str(two_squares()).unwrap();
        assert_eq!(
            (processor.min_x, processor.min_y, processor.max_x, processor.max_y),
            (0, 0, 11_000_000, 5_000_000)
        );
        assert_eq!(processor.data.len(), 8);
        for p in &processor.data {
            match p {
                Primitive::Line { stroke, stroke_width, .. } => {
                    assert_eq!(stroke, "white");
                    assert_eq!(*stroke_width, 10_000);
                }
                other => panic!("expected only lines, got {other:?}"),
            }
        }
    }

    #[test]
    fn coordinate_before_format_fails() {
        let err = parse_str("X0Y0D02*\n%FSLAX26Y26*%\n").unwrap_err();
        assert!(matches!(err, GerberError::InvalidState { .. }));
    }

    #[test]
    fn undefined_aperture_select_fails() {
        let err = parse_str("%FSLAX26Y26*%\n%MOMM*%\nD11*\nM02*\n").unwrap_err();
        assert!(matches!(err, GerberError::UndefinedAperture { code: 11, .. }));
    }

    #[test]
    fn aperture_then_select_succeeds() {
        let processor = parse_str(indoc! {"
            %FSLAX26Y26*%
            %MOMM*%
            %ADD11C,0.01*%
            D11*
            X0Y0D03*
            M02*
        "})
        .unwrap();
        assert_eq!(processor.data.len(), 1);
    }

    #[test]
    fn region_with_four_edges_emits_one_path() {
        let processor = parse_str(indoc! {"
            %FSLAX26Y26*%
            %MOMM*%
            G01*
            G36*
            X0Y0D02*
            X0Y1000000D01*
            X1000000Y1000000D01*
            X1000000Y0D01*
            X0Y0D01*
            G37*
            M02*
        "})
        .unwrap();
        assert_eq!(processor.data.len(), 1);
        match &processor.data[0] {
            Primitive::Path { commands, fill, .. } => {
                assert_eq!(commands.len(), 4);
                assert_eq!(fill, "white");
            }
            other => panic!("expected a Path, got {other:?}"),
        }
    }

    #[test]
    fn region_with_fewer_than_three_edges_fails() {
        let err = parse_str(indoc! {"
            %FSLAX26Y26*%
            %MOMM*%
            G01*
            G36*
            X0Y0D02*
            X0Y1000000D01*
            G37*
            M02*
        "})
        .unwrap_err();
        assert!(matches!(err, GerberError::InvalidState { .. }));
    }

    #[test]
    fn mid_region_reanchor_with_too_few_edges_fails() {
        let err = parse_str(indoc! {"
            %FSLAX26Y26*%
            %MOMM*%
            G01*
            G36*
            X0Y0D02*
            X0Y1000000D01*
            X1000000Y0D02*
            X1000000Y1000000D01*
            X0Y0D01*
            X1000000Y0D01*
            G37*
            M02*
        "})
        .unwrap_err();
        assert!(matches!(err, GerberError::InvalidState { .. }));
    }

    #[test]
    fn mid_region_reanchor_with_no_prior_edges_reanchors() {
        let processor = parse_str(indoc! {"
            %FSLAX26Y26*%
            %MOMM*%
            G01*
            G36*
            X0Y0D02*
            X1000000Y0D02*
            X1000000Y1000000D01*
            X0Y1000000D01*
            X1000000Y0D01*
            G37*
            M02*
        "})
        .unwrap();
        assert_eq!(processor.data.len(), 1);
        match &processor.data[0] {
            Primitive::Path { x, y, commands, .. } => {
                assert_eq!((*x, *y), (1_000_000, 0));
                assert_eq!(commands.len(), 3);
            }
            other => panic!("expected a Path, got {other:?}"),
        }
    }

    #[test]
    fn single_and_multi_quadrant_quarter_circles_agree() {
        // Quarter circle from (1,0) to (0,1) around origin, CCW.
        let single = resolve_arc((1_000_000, 0), (0, 1_000_000), 1_000_000, 0, QuadrantMode::Single, InterpolationMode::CcwCircular, 1).unwrap();
        let multi = resolve_arc((1_000_000, 0), (0, 1_000_000), -1_000_000, 0, QuadrantMode::Multi, InterpolationMode::CcwCircular, 1).unwrap();
        assert_eq!((single.cx, single.cy), (multi.cx, multi.cy));
        assert_eq!(single.large_arc, multi.large_arc);
        assert_eq!(single.sweep, multi.sweep);
    }

    #[test]
    fn flash_outside_region_and_inside_region_differ() {
        let err = parse_str(indoc! {"
            %FSLAX26Y26*%
            %MOMM*%
            %ADD10C,0.01*%
            D10*
            G36*
            X0Y0D02*
            X0Y0D03*
            M02*
        "})
        .unwrap_err();
        assert!(matches!(err, GerberError::InvalidState { .. }));
    }
}
