//! Splits a Gerber source string into parameter and data blocks.
//!
//! The grammar mixes parameter blocks delimited by `%…%` (which may hold
//! several `*`-terminated statements) with data blocks that are a single
//! `*`-terminated statement. Interior whitespace is insignificant except
//! for tracking the 1-based line number of each block's terminating `*`.

use crate::error::GerberError;

/// Whether a [`Block`] came from inside a `%…%` parameter section or from
/// the surrounding data stream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockKind {
    /// A single statement from inside a `%…%` parameter block.
    Parameter,
    /// A single `*`-terminated data statement.
    Data,
}

/// One `*`-terminated statement, with interior whitespace stripped and the
/// line number of its terminating `*`.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
    pub line: usize,
}

/// Scan `input` into a sequence of [`Block`]s.
pub fn tokenize(input: &str) -> Result<Vec<Block>, GerberError> {
    let mut blocks = Vec::new();
    let mut line = 1usize;
    let mut in_parameter = false;
    let mut parameter_opened_at = 0usize;
    let mut current = String::new();

    for c in input.chars() {
        match c {
            '\n' => {
                line += 1;
            }
            '%' if !in_parameter => {
                if !current.trim().is_empty() {
                    return Err(GerberError::MalformedInput {
                        line,
                        message: "unexpected '%' before previous statement was terminated"
                            .to_string(),
                    });
                }
                in_parameter = true;
                parameter_opened_at = line;
            }
            '%' if in_parameter => {
                // Closes the parameter block. Any trailing text without a
                // terminating '*' is malformed.
                if !current.trim().is_empty() {
                    return Err(GerberError::MalformedInput {
                        line,
                        message: "parameter block closed mid-statement".to_string(),
                    });
                }
                in_parameter = false;
            }
            '*' => {
                blocks.push(Block {
                    kind: if in_parameter {
                        BlockKind::Parameter
                    } else {
                        BlockKind::Data
                    },
                    text: strip_whitespace(&current),
                    line,
                });
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if in_parameter {
        return Err(GerberError::MalformedInput {
            line: parameter_opened_at,
            message: "unterminated parameter block".to_string(),
        });
    }
    if !current.trim().is_empty() {
        return Err(GerberError::MalformedInput {
            line,
            message: "trailing data without terminating '*'".to_string(),
        });
    }

    Ok(blocks)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_data_block() {
        let blocks = tokenize("G04 hi*\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Data);
        assert_eq!(blocks[0].text, "G04hi");
        assert_eq!(blocks[0].line, 1);
    }

    #[test]
    fn parameter_block_single_statement() {
        let blocks = tokenize("%FSLAX26Y26*%\n").unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Parameter);
        assert_eq!(blocks[0].text, "FSLAX26Y26");
    }

    #[test]
    fn parameter_block_multiple_statements() {
        let blocks = tokenize("%AMDonut*\n1,1,$1,$2,$3*\n%\n").unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.kind == BlockKind::Parameter));
        assert_eq!(blocks[0].text, "AMDonut");
        assert_eq!(blocks[1].text, "1,1,$1,$2,$3");
    }

    #[test]
    fn line_numbers_track_terminating_star() {
        let blocks = tokenize("G04 a*\nG04 b*\n").unwrap();
        assert_eq!(blocks[0].line, 1);
        assert_eq!(blocks[1].line, 2);
    }

    #[test]
    fn unterminated_parameter_block_is_malformed() {
        let err = tokenize("%FSLAX26Y26*").unwrap_err();
        assert!(matches!(err, GerberError::MalformedInput { .. }));
    }

    #[test]
    fn interior_whitespace_is_stripped() {
        let blocks = tokenize("X0 Y0 D02*").unwrap();
        assert_eq!(blocks[0].text, "X0Y0D02");
    }
}
