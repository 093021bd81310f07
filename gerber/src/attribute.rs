//! File attribute names (`%TF…*%`). Attributes are parsed but otherwise
//! ignored per spec — they carry metadata (creation date, part name, MD5,
//! …) that does not affect the emitted geometry.

use nom::bytes::complete::tag;
use nom::combinator::value;
use nom::{branch::alt, combinator::map, IResult};

use crate::data::{system_name, user_name};

#[derive(Clone, PartialEq, Debug)]
pub enum FileAttributeName<'a> {
    Part,
    FileFunction,
    FilePolarity,
    SameCoordinates,
    CreationDate,
    GenerationSoftware,
    ProjectId,
    Md5,
    UnknownStandardName(&'a str),
    UserDefinedName(&'a str),
}

impl<'a> FileAttributeName<'a> {
    pub(crate) fn parse(input: &'a str) -> IResult<&'a str, Self> {
        alt((
            value(Self::Part, tag(".Part")),
            value(Self::FileFunction, tag(".FileFunction")),
            value(Self::FilePolarity, tag(".FilePolarity")),
            value(Self::SameCoordinates, tag(".SameCoordinates")),
            value(Self::CreationDate, tag(".CreationDate")),
            value(Self::GenerationSoftware, tag(".GenerationSoftware")),
            value(Self::ProjectId, tag(".ProjectId")),
            value(Self::Md5, tag(".MD5")),
            map(system_name, Self::UnknownStandardName),
            map(user_name, Self::UserDefinedName),
        ))(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_standard_names() {
        assert_eq!(
            FileAttributeName::parse(".Part,Single"),
            Ok((",Single", FileAttributeName::Part))
        );
    }

    #[test]
    fn falls_back_to_user_defined_name() {
        assert_eq!(
            FileAttributeName::parse("MyAttr,x"),
            Ok((",x", FileAttributeName::UserDefinedName("MyAttr")))
        );
    }
}
