//! The top-level document produced by the interpreter: an ordered,
//! append-only primitive buffer plus the accumulated bounding box and the
//! rendering configuration applied at serialization time.

use serde::{Deserialize, Serialize};

use crate::coord::CoordUnit;
use crate::error::GerberError;
use crate::primitive::Primitive;

/// The decoded result of parsing one Gerber file, ready to be rendered to
/// SVG or (de)serialized in the structured round-trippable form.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Processor {
    pub min_x: CoordUnit,
    pub max_x: CoordUnit,
    pub min_y: CoordUnit,
    pub max_y: CoordUnit,
    /// `10^fractional_digits` of the file's coordinate format.
    pub decimal: i64,
    pub polarity_dark: String,
    pub polarity_clear: String,
    pub scale: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub pan_zoom: bool,
    pub data: Vec<Primitive>,
}

impl Processor {
    pub fn new(decimal: i64) -> Self {
        Self {
            min_x: 0,
            max_x: 0,
            min_y: 0,
            max_y: 0,
            decimal,
            polarity_dark: "white".to_string(),
            polarity_clear: "black".to_string(),
            scale: None,
            width: None,
            height: None,
            pan_zoom: true,
            data: Vec::new(),
        }
    }

    /// Append a primitive and fold its bounding box into the document's.
    pub fn push(&mut self, primitive: Primitive) {
        let (min_x, min_y, max_x, max_y) = primitive.bounding_box();
        if self.data.is_empty() {
            self.min_x = min_x;
            self.max_x = max_x;
            self.min_y = min_y;
            self.max_y = max_y;
        } else {
            self.min_x = self.min_x.min(min_x);
            self.max_x = self.max_x.max(max_x);
            self.min_y = self.min_y.min(min_y);
            self.max_y = self.max_y.max(max_y);
        }
        self.data.push(primitive);
    }

    /// Serialize to the structured, round-trippable JSON form.
    pub fn encode(&self) -> Result<String, GerberError> {
        serde_json::to_string(self).map_err(|e| GerberError::Io(e.to_string()))
    }

    /// Deserialize from the structured JSON form produced by [`Self::encode`].
    pub fn decode(text: &str) -> Result<Self, GerberError> {
        serde_json::from_str(text).map_err(|e| GerberError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::LineCap;

    fn line(x1: CoordUnit, y1: CoordUnit, x2: CoordUnit, y2: CoordUnit, w: CoordUnit) -> Primitive {
        Primitive::Line {
            x1,
            y1,
            x2,
            y2,
            stroke_width: w,
            cap: LineCap::Round,
            stroke: "white".into(),
            line: 1,
            approximate: false,
        }
    }

    #[test]
    fn bounding_box_folds_across_pushes() {
        let mut p = Processor::new(1_000_000);
        p.push(line(0, 0, 10, 0, 4));
        p.push(line(20, 5, 30, 5, 2));
        assert_eq!((p.min_x, p.min_y, p.max_x, p.max_y), (0, 0, 30, 5));
    }

    #[test]
    fn round_trip_encode_decode() {
        let mut p = Processor::new(1_000_000);
        p.push(line(0, 0, 5_000_000, 0, 10_000));
        let encoded = p.encode().unwrap();
        let decoded = Processor::decode(&encoded).unwrap();
        assert_eq!(p, decoded);
    }
}
