use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use structure_agent_core::domain::requirements::{
    json_object_span, SpecField, StructureRequirements, DOCUMENT_ROOT_KEY,
};
use structure_agent_core::flows::{Extraction, SpecExtractor};

const NUMBER: &str = r"([-+]?(?:\d+(?:\.\d+)?|\.\d+))";
/// Characters allowed between a cue word and its value.
const CUE_GAP: &str = r"[^\d\-+.]{0,30}?";
const COORDINATE_CUES: &str = r"coordinates?|coords|xyz|position|placement";
const FREQUENCY_CUES: &str = r"cutoff|cut-off|frequency|freq";
const LOAD_CUES: &str = r"load|g-force|acceleration";
/// Any unit right after a cue value, so a rival field's unit can be spotted.
const TRAILING_UNIT: &str = r"(khz|hz|g(?:'?s)?)?\b";

/// Recognizes structure requirements from a JSON hint or from free text.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternSpecExtractor;

impl PatternSpecExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SpecExtractor for PatternSpecExtractor {
    fn extract(&self, message: &str, current: &StructureRequirements) -> Extraction {
        let findings = structured_hint(message)
            .unwrap_or_else(|| scan_free_text(&normalize_text(message)));

        let mut extraction = Extraction::unchanged(current);
        findings.apply(&mut extraction);
        extraction
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Finding<T> {
    Absent,
    Valid(T),
    Malformed,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Findings {
    coordinates: Finding<[f64; 3]>,
    cutoff_frequency: Finding<f64>,
    max_load: Finding<f64>,
}

impl Findings {
    fn apply(self, extraction: &mut Extraction) {
        for field in SpecField::ALL {
            let outcome = match field {
                SpecField::Coordinates => self.coordinates.map_valid(|value| {
                    extraction.requirements.xyz_coordinates_m = Some(value);
                }),
                SpecField::CutoffFrequency => self.cutoff_frequency.map_valid(|value| {
                    extraction.requirements.cutoff_frequency_hz = Some(value);
                }),
                SpecField::MaxLoad => self.max_load.map_valid(|value| {
                    extraction.requirements.max_load_g = Some(value);
                }),
            };
            match outcome {
                Finding::Valid(()) => extraction.updated.push(field),
                Finding::Malformed => extraction.malformed.push(field),
                Finding::Absent => {}
            }
        }
    }
}

impl<T> Finding<T> {
    fn map_valid(self, write: impl FnOnce(T)) -> Finding<()> {
        match self {
            Self::Absent => Finding::Absent,
            Self::Malformed => Finding::Malformed,
            Self::Valid(value) => {
                write(value);
                Finding::Valid(())
            }
        }
    }

    fn or_else(self, fallback: impl FnOnce() -> Self) -> Self {
        match self {
            Self::Absent => fallback(),
            found => found,
        }
    }
}

fn validated_frequency(value: f64) -> Finding<f64> {
    if value.is_finite() && value > 0.0 {
        Finding::Valid(value)
    } else {
        Finding::Malformed
    }
}

fn validated_load(value: f64) -> Finding<f64> {
    if value.is_finite() {
        Finding::Valid(value)
    } else {
        Finding::Malformed
    }
}

fn validated_triple(values: [Option<f64>; 3]) -> Finding<[f64; 3]> {
    match values {
        [Some(x), Some(y), Some(z)] if x.is_finite() && y.is_finite() && z.is_finite() => {
            Finding::Valid([x, y, z])
        }
        _ => Finding::Malformed,
    }
}

/// A JSON object in the message wins over free text, even when it names no
/// known field.
fn structured_hint(message: &str) -> Option<Findings> {
    let span = json_object_span(message)?;
    let Ok(Value::Object(root)) = serde_json::from_str::<Value>(span) else {
        return None;
    };
    let body = match root.get(DOCUMENT_ROOT_KEY) {
        Some(Value::Object(nested)) => nested,
        _ => &root,
    };

    Some(Findings {
        coordinates: hint_field(body, SpecField::Coordinates, |value| {
            let Some(items) = value.as_array().filter(|items| items.len() == 3) else {
                return Finding::Malformed;
            };
            validated_triple([items[0].as_f64(), items[1].as_f64(), items[2].as_f64()])
        }),
        cutoff_frequency: hint_field(body, SpecField::CutoffFrequency, |value| {
            value.as_f64().map(validated_frequency).unwrap_or(Finding::Malformed)
        }),
        max_load: hint_field(body, SpecField::MaxLoad, |value| {
            value.as_f64().map(validated_load).unwrap_or(Finding::Malformed)
        }),
    })
}

fn hint_field<T>(
    body: &Map<String, Value>,
    field: SpecField,
    parse: impl FnOnce(&Value) -> Finding<T>,
) -> Finding<T> {
    match body.get(field.key()) {
        None | Some(Value::Null) => Finding::Absent,
        Some(value) => parse(value),
    }
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}

fn scan_free_text(text: &str) -> Findings {
    Findings {
        coordinates: extract_coordinates(text),
        cutoff_frequency: extract_cutoff_frequency(text),
        max_load: extract_max_load(text),
    }
}

fn extract_coordinates(text: &str) -> Finding<[f64; 3]> {
    if let Some(captures) = coordinate_triple_pattern().and_then(|pattern| pattern.captures(text))
    {
        return validated_triple([
            parse_number(captures.get(1).map(|value| value.as_str())),
            parse_number(captures.get(2).map(|value| value.as_str())),
            parse_number(captures.get(3).map(|value| value.as_str())),
        ]);
    }

    let mut labelled = [None; 3];
    for (slot, pattern) in labelled.iter_mut().zip(axis_patterns()) {
        *slot = parse_number(
            pattern
                .as_ref()
                .and_then(|pattern| pattern.captures(text))
                .and_then(|captures| captures.get(1))
                .map(|value| value.as_str()),
        );
    }
    if labelled.iter().any(Option::is_some) {
        return validated_triple(labelled);
    }

    // A coordinates cue followed by fewer than three numbers.
    if coordinate_cue_pattern().is_some_and(|pattern| pattern.is_match(text)) {
        return Finding::Malformed;
    }
    Finding::Absent
}

fn extract_cutoff_frequency(text: &str) -> Finding<f64> {
    extract_quantity(
        text,
        QuantityPatterns {
            unit: frequency_unit_pattern(),
            cue: frequency_cue_pattern(),
            rival_cues: frequency_rival_cue_pattern(),
        },
        is_load_unit,
        frequency_in_hz,
    )
}

fn frequency_in_hz(value: f64, unit: Option<&str>) -> Finding<f64> {
    let scale = if unit == Some("khz") { 1_000.0 } else { 1.0 };
    validated_frequency(value * scale)
}

fn extract_max_load(text: &str) -> Finding<f64> {
    extract_quantity(
        text,
        QuantityPatterns {
            unit: load_unit_pattern(),
            cue: load_cue_pattern(),
            rival_cues: load_rival_cue_pattern(),
        },
        is_frequency_unit,
        load_in_g,
    )
}

fn load_in_g(value: f64, _unit: Option<&str>) -> Finding<f64> {
    validated_load(value)
}

struct QuantityPatterns {
    unit: Option<&'static Regex>,
    cue: Option<&'static Regex>,
    rival_cues: Option<&'static Regex>,
}

/// A number carrying the field's own unit wins over a cue capture. A cue
/// capture only counts when nothing between cue and number names another
/// field and the number does not carry another field's unit.
fn extract_quantity(
    text: &str,
    patterns: QuantityPatterns,
    is_rival_unit: fn(&str) -> bool,
    convert: fn(f64, Option<&str>) -> Finding<f64>,
) -> Finding<f64> {
    if let Some(captures) = patterns.unit.and_then(|pattern| pattern.captures(text)) {
        let unit = captures.get(2).map(|unit| unit.as_str());
        return captures
            .get(1)
            .map(|number| quantity_value(text, number, unit, convert))
            .unwrap_or(Finding::Malformed);
    }

    let Some(cue) = patterns.cue else {
        return Finding::Absent;
    };
    let mut rejected = false;
    for captures in cue.captures_iter(text) {
        let gap = captures.get(1).map_or("", |gap| gap.as_str());
        let unit = captures.get(3).map(|unit| unit.as_str());
        let names_rival = patterns.rival_cues.is_some_and(|rivals| rivals.is_match(gap));
        if names_rival || unit.is_some_and(is_rival_unit) {
            rejected = true;
            continue;
        }
        if let Some(number) = captures.get(2) {
            return quantity_value(text, number, unit, convert);
        }
    }

    if rejected {
        Finding::Malformed
    } else {
        Finding::Absent
    }
}

fn quantity_value(
    text: &str,
    number: regex::Match<'_>,
    unit: Option<&str>,
    convert: fn(f64, Option<&str>) -> Finding<f64>,
) -> Finding<f64> {
    if is_digit_group(text, number) {
        return Finding::Malformed;
    }
    parse_number(Some(number.as_str()))
        .map(|value| convert(value, unit))
        .unwrap_or(Finding::Malformed)
}

/// True when the match is one piece of a thousands-grouped number like `1,000`.
fn is_digit_group(text: &str, number: regex::Match<'_>) -> bool {
    let bytes = text.as_bytes();
    let (start, end) = (number.start(), number.end());

    let group_follows = bytes.get(end) == Some(&b',')
        && bytes.get(end + 1..end + 4).is_some_and(|group| group.iter().all(u8::is_ascii_digit));

    let integral = number.as_str().split('.').next().unwrap_or_default();
    let group_precedes = start >= 2
        && bytes.get(start - 1) == Some(&b',')
        && bytes.get(start - 2).is_some_and(u8::is_ascii_digit)
        && integral.len() == 3
        && integral.bytes().all(|byte| byte.is_ascii_digit());

    group_follows || group_precedes
}

fn is_frequency_unit(unit: &str) -> bool {
    matches!(unit, "hz" | "khz")
}

fn is_load_unit(unit: &str) -> bool {
    unit.starts_with('g')
}

fn parse_number(token: Option<&str>) -> Option<f64> {
    token.and_then(|token| token.parse::<f64>().ok())
}

fn coordinate_triple_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(&format!(
                r"[\(\[]?\s*{NUMBER}\s*[,;]\s*{NUMBER}\s*[,;]\s*{NUMBER}\s*[\)\]]?"
            ))
            .ok()
        })
        .as_ref()
}

fn axis_patterns() -> &'static [Option<Regex>; 3] {
    static PATTERNS: OnceLock<[Option<Regex>; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ["x", "y", "z"].map(|axis| Regex::new(&format!(r"\b{axis}\s*[=:]\s*{NUMBER}")).ok())
    })
}

fn coordinate_cue_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(&format!(r"\b(?:{COORDINATE_CUES})\b{CUE_GAP}{NUMBER}")).ok()
        })
        .as_ref()
}

fn frequency_cue_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(&format!(r"\b(?:{FREQUENCY_CUES})\b({CUE_GAP}){NUMBER}\s*{TRAILING_UNIT}"))
                .ok()
        })
        .as_ref()
}

fn frequency_rival_cue_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(&format!(r"\b(?:{LOAD_CUES}|{COORDINATE_CUES})\b")).ok())
        .as_ref()
}

fn frequency_unit_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(&format!(r"{NUMBER}\s*(khz|hz)\b")).ok()).as_ref()
}

fn load_cue_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(&format!(r"\b(?:{LOAD_CUES})\b({CUE_GAP}){NUMBER}\s*{TRAILING_UNIT}")).ok()
        })
        .as_ref()
}

fn load_rival_cue_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(&format!(r"\b(?:{FREQUENCY_CUES}|{COORDINATE_CUES})\b")).ok())
        .as_ref()
}

fn load_unit_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(&format!(r"{NUMBER}\s*(g(?:'?s)?)\b")).ok()).as_ref()
}
