use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const DOCUMENT_ROOT_KEY: &str = "structure_requirements";

/// One of the three values a structure needs before a job can run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecField {
    Coordinates,
    CutoffFrequency,
    MaxLoad,
}

impl SpecField {
    pub const ALL: [SpecField; 3] =
        [SpecField::Coordinates, SpecField::CutoffFrequency, SpecField::MaxLoad];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Coordinates => "xyz_coordinates_m",
            Self::CutoffFrequency => "cutoff_frequency_hz",
            Self::MaxLoad => "max_load_g",
        }
    }

    /// Question asked while the field is still unknown.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Coordinates => {
                "What are the X, Y, Z coordinates (in meters) for the structural placement?"
            }
            Self::CutoffFrequency => {
                "What is the required cutoff frequency in Hz for this structure?"
            }
            Self::MaxLoad => "What is the maximum expected load in Gs?",
        }
    }
}

impl fmt::Display for SpecField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureRequirements {
    pub xyz_coordinates_m: Option<[f64; 3]>,
    pub cutoff_frequency_hz: Option<f64>,
    pub max_load_g: Option<f64>,
}

impl StructureRequirements {
    pub fn is_set(&self, field: SpecField) -> bool {
        match field {
            SpecField::Coordinates => self.xyz_coordinates_m.is_some(),
            SpecField::CutoffFrequency => self.cutoff_frequency_hz.is_some(),
            SpecField::MaxLoad => self.max_load_g.is_some(),
        }
    }

    pub fn missing_fields(&self) -> Vec<SpecField> {
        SpecField::ALL.into_iter().filter(|field| !self.is_set(*field)).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("requirements are incomplete, missing: {0:?}")]
    Incomplete(Vec<SpecField>),
    #[error("no JSON object found in text")]
    NotFound,
    #[error("requirements document has an unexpected shape: {0}")]
    Shape(String),
    #[error("requirements document could not be rendered: {0}")]
    Render(String),
}

/// The JSON document emitted once every field is known.
///
/// Serializes exactly as
/// `{"structure_requirements":{"xyz_coordinates_m":[x,y,z],"cutoff_frequency_hz":n,"max_load_g":n}}`.
/// Integral values are written without a fractional part and nothing is
/// unit-converted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementsDocument {
    pub structure_requirements: RequirementsBody,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequirementsBody {
    pub xyz_coordinates_m: [Measure; 3],
    pub cutoff_frequency_hz: Measure,
    pub max_load_g: Measure,
}

/// A stored real number, written as an integer when it has no fractional part.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Measure(pub f64);

const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl Serialize for Measure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = self.0;
        if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
            serializer.serialize_i64(value as i64)
        } else {
            serializer.serialize_f64(value)
        }
    }
}

impl<'de> Deserialize<'de> for Measure {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        f64::deserialize(deserializer).map(Measure)
    }
}

impl RequirementsDocument {
    pub fn from_requirements(requirements: &StructureRequirements) -> Result<Self, DocumentError> {
        match (
            requirements.xyz_coordinates_m,
            requirements.cutoff_frequency_hz,
            requirements.max_load_g,
        ) {
            (Some([x, y, z]), Some(cutoff), Some(load)) => Ok(Self {
                structure_requirements: RequirementsBody {
                    xyz_coordinates_m: [Measure(x), Measure(y), Measure(z)],
                    cutoff_frequency_hz: Measure(cutoff),
                    max_load_g: Measure(load),
                },
            }),
            _ => Err(DocumentError::Incomplete(requirements.missing_fields())),
        }
    }

    pub fn to_requirements(&self) -> StructureRequirements {
        let body = &self.structure_requirements;
        let [x, y, z] = body.xyz_coordinates_m;
        StructureRequirements {
            xyz_coordinates_m: Some([x.0, y.0, z.0]),
            cutoff_frequency_hz: Some(body.cutoff_frequency_hz.0),
            max_load_g: Some(body.max_load_g.0),
        }
    }

    /// Compact JSON text of the document.
    pub fn render(&self) -> Result<String, DocumentError> {
        serde_json::to_string(self).map_err(|error| DocumentError::Render(error.to_string()))
    }

    /// Strictly parses a document embedded anywhere in `text`.
    pub fn find_in(text: &str) -> Result<Self, DocumentError> {
        let candidate = json_object_span(text).ok_or(DocumentError::NotFound)?;
        serde_json::from_str::<Self>(candidate)
            .map_err(|error| DocumentError::Shape(error.to_string()))
    }
}

/// Outermost `{ ... }` span of `text`, if any.
pub fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::{
        json_object_span, DocumentError, RequirementsDocument, SpecField, StructureRequirements,
    };

    fn complete() -> StructureRequirements {
        StructureRequirements {
            xyz_coordinates_m: Some([1.0, 2.0, 3.0]),
            cutoff_frequency_hz: Some(500.0),
            max_load_g: Some(9.0),
        }
    }

    #[test]
    fn empty_requirements_miss_every_field_in_order() {
        let requirements = StructureRequirements::default();
        assert_eq!(requirements.missing_fields(), SpecField::ALL.to_vec());
        assert!(!requirements.is_complete());
    }

    #[test]
    fn renders_integral_values_without_fraction_in_fixed_key_order() {
        let document = RequirementsDocument::from_requirements(&complete()).expect("complete");
        assert_eq!(
            document.render().expect("render"),
            r#"{"structure_requirements":{"xyz_coordinates_m":[1,2,3],"cutoff_frequency_hz":500,"max_load_g":9}}"#
        );
    }

    #[test]
    fn keeps_fractional_values_as_given() {
        let requirements = StructureRequirements {
            xyz_coordinates_m: Some([0.5, -2.25, 10.0]),
            cutoff_frequency_hz: Some(12.5),
            max_load_g: Some(1.5),
        };
        let rendered = RequirementsDocument::from_requirements(&requirements)
            .and_then(|document| document.render())
            .expect("render");
        assert!(rendered.contains("[0.5,-2.25,10]"));
        assert!(rendered.contains("\"cutoff_frequency_hz\":12.5"));
        assert!(rendered.contains("\"max_load_g\":1.5"));
    }

    #[test]
    fn incomplete_requirements_cannot_become_a_document() {
        let requirements =
            StructureRequirements { max_load_g: Some(4.0), ..StructureRequirements::default() };
        let error = RequirementsDocument::from_requirements(&requirements)
            .expect_err("incomplete must fail");
        assert_eq!(
            error,
            DocumentError::Incomplete(vec![SpecField::Coordinates, SpecField::CutoffFrequency])
        );
    }

    #[test]
    fn finds_document_inside_surrounding_prose() {
        let text = "Here you go:\n{\"structure_requirements\":{\"xyz_coordinates_m\":[1,2,3],\"cutoff_frequency_hz\":500,\"max_load_g\":9}}\nAnything else?";
        let document = RequirementsDocument::find_in(text).expect("document");
        assert_eq!(document.to_requirements(), complete());
    }

    #[test]
    fn rejects_extra_keys() {
        let text = r#"{"structure_requirements":{"xyz_coordinates_m":[1,2,3],"cutoff_frequency_hz":500,"max_load_g":9,"max_load_n":88}}"#;
        assert!(matches!(RequirementsDocument::find_in(text), Err(DocumentError::Shape(_))));
    }

    #[test]
    fn text_without_braces_has_no_span() {
        assert_eq!(json_object_span("just words"), None);
        assert_eq!(RequirementsDocument::find_in("}{"), Err(DocumentError::NotFound));
    }
}
