//! Maps tokenized block text to an internal [`Command`] variant.
//!
//! Parameter statements (`FS`, `MO`, `AD`, `LP`, `LN`, `AM`, `SR`, `TF`,
//! `TA`, `TO`, `TD`) and data statements (G-codes, `Dnn`, coordinate
//! letters) use separate entry points since the tokenizer already tells
//! the caller which kind of block it produced.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, one_of},
    combinator::{all_consuming, map, opt, recognize, value},
    multi::{many0, separated_list1},
    sequence::{pair, preceded, tuple},
    Finish,
};

use crate::aperture::ApertureId;
use crate::attribute::FileAttributeName;
use crate::coord::{Notation, Unit, ZeroOmission};
use crate::data::{aperture_identifier, decimal, name};
use crate::error::GerberError;
use crate::state::Polarity;

type IResult<'a, T> = nom::IResult<&'a str, T>;

/// The four standard aperture template codes; anything else in an `%AD…*%`
/// is a macro-based aperture and therefore [`crate::error::GerberError::Unsupported`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApertureShapeCode {
    Circle,
    Rectangle,
    Obround,
    Polygon,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GCode {
    Linear,
    CwCircular,
    CcwCircular,
    RegionStart,
    RegionEnd,
    SelectAperturePrefix,
    DeprecatedUnit(Unit),
    SingleQuadrant,
    MultiQuadrant,
    DeprecatedNotation(Notation),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DOp {
    Plot,
    Move,
    Flash,
    Select(ApertureId),
}

/// A data block's parsed content: an optional G-code, any of the X/Y/I/J
/// coordinate letters (as raw, not-yet-decoded digit strings — decoding
/// needs the coordinate format, which the parser does not have), and an
/// optional D-operation. Per spec these may all appear combined in one
/// block, in that order.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DataStatement {
    pub g: Option<GCode>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub i: Option<String>,
    pub j: Option<String>,
    pub d: Option<DOp>,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Command<'a> {
    Mode(Unit),
    FormatSpecification {
        integer_digits: u8,
        fractional_digits: u8,
        omission: ZeroOmission,
        notation: Notation,
    },
    ApertureDefine {
        id: ApertureId,
        shape: ApertureShapeCode,
        params: Vec<f64>,
    },
    ApertureMacro,
    LoadPolarity(Polarity),
    LoadNameIgnored,
    AttributeOnFile(FileAttributeName<'a>),
    AttributeIgnored,
    StepAndRepeat,
    Comment(String),
    Data(DataStatement),
    EndOfFile,
    ProgramStop,
    OptionalStop,
}

/// Parse the text of a `%…%` parameter statement (already stripped of its
/// delimiters and interior whitespace by the tokenizer).
pub fn parse_parameter(text: &str) -> Result<Command<'_>, String> {
    // AM and SR are detected by prefix alone: both are unsupported, and
    // their bodies (macro primitive scripts, step-and-repeat blocks) are
    // not modeled at all, so there is nothing further to parse.
    if text.starts_with("AM") {
        return Ok(Command::ApertureMacro);
    }
    if text.starts_with("SR") {
        return Ok(Command::StepAndRepeat);
    }

    all_consuming(alt((
        mode,
        format_specification,
        aperture_define,
        load_polarity,
        load_name_ignored,
        attribute_on_file,
        attribute_ignored,
    )))(text)
    .finish()
    .map(|(_, cmd)| cmd)
    .map_err(|e| format!("{e:?}"))
}

/// Parse the text of a data block.
pub fn parse_data(text: &str) -> Result<Command<'static>, String> {
    if let Some(rest) = text.strip_prefix("G04") {
        return Ok(Command::Comment(rest.to_string()));
    }
    if text == "M02" {
        return Ok(Command::EndOfFile);
    }
    if text == "M00" {
        return Ok(Command::ProgramStop);
    }
    if text == "M01" {
        return Ok(Command::OptionalStop);
    }

    all_consuming(data_statement)(text)
        .finish()
        .map(|(_, ds)| Command::Data(ds))
        .map_err(|e| format!("{e:?}"))
}

fn mode(input: &str) -> IResult<'_, Command<'_>> {
    map(
        preceded(tag("MO"), alt((tag("MM"), tag("IN")))),
        |unit| match unit {
            "MM" => Command::Mode(Unit::Millimeters),
            _ => Command::Mode(Unit::Inches),
        },
    )(input)
}

fn digit_1_to_6(input: &str) -> IResult<'_, u8> {
    map(one_of("123456"), |c| c.to_digit(10).unwrap() as u8)(input)
}

fn format_specification(input: &str) -> IResult<'_, Command<'_>> {
    map(
        tuple((
            tag("FS"),
            alt((
                value(ZeroOmission::Leading, char('L')),
                value(ZeroOmission::Trailing, char('T')),
            )),
            alt((
                value(Notation::Absolute, char('A')),
                value(Notation::Incremental, char('I')),
            )),
            char('X'),
            digit_1_to_6,
            digit_1_to_6,
            char('Y'),
            digit_1_to_6,
            digit_1_to_6,
        )),
        |(_, omission, notation, _, xi, xf, _, _yi, _yf)| Command::FormatSpecification {
            integer_digits: xi,
            fractional_digits: xf,
            omission,
            notation,
        },
    )(input)
}

fn aperture_params(input: &str) -> IResult<'_, Vec<f64>> {
    separated_list1(char('X'), decimal)(input)
}

fn aperture_define(input: &str) -> IResult<'_, Command<'_>> {
    let (input, _) = tag("AD")(input)?;
    let (input, id) = aperture_identifier(input)?;
    alt((
        map(preceded(pair(char('C'), char(',')), aperture_params), move |params| {
            Command::ApertureDefine {
                id,
                shape: ApertureShapeCode::Circle,
                params,
            }
        }),
        map(preceded(pair(char('R'), char(',')), aperture_params), move |params| {
            Command::ApertureDefine {
                id,
                shape: ApertureShapeCode::Rectangle,
                params,
            }
        }),
        map(preceded(pair(char('O'), char(',')), aperture_params), move |params| {
            Command::ApertureDefine {
                id,
                shape: ApertureShapeCode::Obround,
                params,
            }
        }),
        map(preceded(pair(char('P'), char(',')), aperture_params), move |params| {
            Command::ApertureDefine {
                id,
                shape: ApertureShapeCode::Polygon,
                params,
            }
        }),
        // Anything else naming a macro template: rejected as unsupported
        // by the interpreter, which has the line number to report.
        map(recognize(pair(name, opt(pair(char(','), aperture_params)))), move |_| {
            Command::ApertureDefine {
                id,
                shape: ApertureShapeCode::Circle,
                params: vec![f64::NAN],
            }
        }),
    ))(input)
}

fn load_polarity(input: &str) -> IResult<'_, Command<'_>> {
    map(
        preceded(tag("LP"), alt((char('D'), char('C')))),
        |c| match c {
            'D' => Command::LoadPolarity(Polarity::Dark),
            _ => Command::LoadPolarity(Polarity::Clear),
        },
    )(input)
}

fn load_name_ignored(input: &str) -> IResult<'_, Command<'_>> {
    value(Command::LoadNameIgnored, preceded(tag("LN"), many0(char(' '))))(input)
}

fn attribute_on_file(input: &str) -> IResult<'_, Command<'_>> {
    map(
        preceded(tag("TF"), FileAttributeName::parse),
        Command::AttributeOnFile,
    )(input)
}

fn attribute_ignored(input: &str) -> IResult<'_, Command<'_>> {
    value(
        Command::AttributeIgnored,
        preceded(alt((tag("TA"), tag("TO"), tag("TD"))), many0(char(' '))),
    )(input)
}

#[derive(Clone, PartialEq, Eq, Debug)]
enum CoordField {
    X(String),
    Y(String),
    I(String),
    J(String),
}

fn coordinate_value(input: &str) -> IResult<'_, String> {
    map(recognize(pair(opt(one_of("+-")), nom::character::complete::digit1)), |s: &str| {
        s.to_string()
    })(input)
}

fn coord_field(input: &str) -> IResult<'_, CoordField> {
    alt((
        map(preceded(char('X'), coordinate_value), CoordField::X),
        map(preceded(char('Y'), coordinate_value), CoordField::Y),
        map(preceded(char('I'), coordinate_value), CoordField::I),
        map(preceded(char('J'), coordinate_value), CoordField::J),
    ))(input)
}

fn g_code(input: &str) -> IResult<'_, GCode> {
    alt((
        value(GCode::Linear, tag("G01")),
        value(GCode::CwCircular, tag("G02")),
        value(GCode::CcwCircular, tag("G03")),
        value(GCode::RegionStart, tag("G36")),
        value(GCode::RegionEnd, tag("G37")),
        value(GCode::SelectAperturePrefix, tag("G54")),
        value(GCode::DeprecatedUnit(Unit::Inches), tag("G70")),
        value(GCode::DeprecatedUnit(Unit::Millimeters), tag("G71")),
        value(GCode::SingleQuadrant, tag("G74")),
        value(GCode::MultiQuadrant, tag("G75")),
        value(GCode::DeprecatedNotation(Notation::Absolute), tag("G90")),
        value(GCode::DeprecatedNotation(Notation::Incremental), tag("G91")),
    ))(input)
}

fn d_op(input: &str) -> IResult<'_, DOp> {
    alt((
        value(DOp::Plot, tag("D01")),
        value(DOp::Move, tag("D02")),
        value(DOp::Flash, tag("D03")),
        map(aperture_identifier, DOp::Select),
    ))(input)
}

fn data_statement(input: &str) -> IResult<'_, DataStatement> {
    map(
        tuple((opt(g_code), many0(coord_field), opt(d_op))),
        |(g, fields, d)| {
            let mut ds = DataStatement {
                g,
                d,
                ..Default::default()
            };
            for field in fields {
                match field {
                    CoordField::X(s) => ds.x = Some(s),
                    CoordField::Y(s) => ds.y = Some(s),
                    CoordField::I(s) => ds.i = Some(s),
                    CoordField::J(s) => ds.j = Some(s),
                }
            }
            ds
        },
    )(input)
}

/// Convert a parser failure (with no line context) into a line-tagged
/// [`GerberError`].
pub(crate) fn to_malformed(line: usize, text: &str, err: impl std::fmt::Debug) -> GerberError {
    GerberError::MalformedInput {
        line,
        message: format!("could not parse '{text}': {err:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_mm_and_in() {
        assert_eq!(parse_parameter("MOMM"), Ok(Command::Mode(Unit::Millimeters)));
        assert_eq!(parse_parameter("MOIN"), Ok(Command::Mode(Unit::Inches)));
    }

    #[test]
    fn format_specification_parses_digit_pairs() {
        assert_eq!(
            parse_parameter("FSLAX26Y26"),
            Ok(Command::FormatSpecification {
                integer_digits: 2,
                fractional_digits: 6,
                omission: ZeroOmission::Leading,
                notation: Notation::Absolute,
            })
        );
    }

    #[test]
    fn aperture_define_circle() {
        assert_eq!(
            parse_parameter("ADD10C,0.1"),
            Ok(Command::ApertureDefine {
                id: ApertureId(10),
                shape: ApertureShapeCode::Circle,
                params: vec![0.1],
            })
        );
    }

    #[test]
    fn aperture_define_rectangle_with_hole() {
        assert_eq!(
            parse_parameter("ADD12R,0.6X0.6X0.1"),
            Ok(Command::ApertureDefine {
                id: ApertureId(12),
                shape: ApertureShapeCode::Rectangle,
                params: vec![0.6, 0.6, 0.1],
            })
        );
    }

    #[test]
    fn macro_based_aperture_is_detected() {
        match parse_parameter("ADD11Donut,0.3X0X0").unwrap() {
            Command::ApertureDefine { params, .. } => assert!(params[0].is_nan()),
            other => panic!("expected ApertureDefine, got {other:?}"),
        }
    }

    #[test]
    fn aperture_macro_block_is_detected_by_prefix() {
        assert_eq!(parse_parameter("AMDonut"), Ok(Command::ApertureMacro));
    }

    #[test]
    fn load_polarity_dark_and_clear() {
        assert_eq!(parse_parameter("LPD"), Ok(Command::LoadPolarity(Polarity::Dark)));
        assert_eq!(parse_parameter("LPC"), Ok(Command::LoadPolarity(Polarity::Clear)));
    }

    #[test]
    fn data_statement_combines_gcode_coords_and_dop() {
        assert_eq!(
            parse_data("G01X2000000Y0D01"),
            Ok(Command::Data(DataStatement {
                g: Some(GCode::Linear),
                x: Some("2000000".to_string()),
                y: Some("0".to_string()),
                i: None,
                j: None,
                d: Some(DOp::Plot),
            }))
        );
    }

    #[test]
    fn select_aperture_data_statement() {
        assert_eq!(
            parse_data("D10"),
            Ok(Command::Data(DataStatement {
                d: Some(DOp::Select(ApertureId(10))),
                ..Default::default()
            }))
        );
    }

    #[test]
    fn comment_captures_text() {
        assert_eq!(parse_data("G04hello"), Ok(Command::Comment("hello".to_string())));
    }

    #[test]
    fn end_of_file() {
        assert_eq!(parse_data("M02"), Ok(Command::EndOfFile));
    }
}
