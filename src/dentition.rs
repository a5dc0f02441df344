use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DentalError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToothKind {
    #[serde(rename = "Wisdom Tooth")]
    WisdomTooth,
    Molar,
    Premolar,
    Canine,
    Incisor,
}

/// A fixed anatomical position in FDI two-digit notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToothPosition {
    pub code: &'static str,
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: ToothKind,
}

impl ToothPosition {
    /// The code as an integer, used as the per-tooth seed offset.
    pub fn seed_offset(&self) -> u32 {
        self.code
            .bytes()
            .fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
    }
}

/// Tooth descriptors indexed by the FDI tooth digit (1 = central incisor).
const BY_DIGIT: [(&str, ToothKind); 8] = [
    ("Central Incisor", ToothKind::Incisor),
    ("Lateral Incisor", ToothKind::Incisor),
    ("Canine", ToothKind::Canine),
    ("First Premolar", ToothKind::Premolar),
    ("Second Premolar", ToothKind::Premolar),
    ("First Molar", ToothKind::Molar),
    ("Second Molar", ToothKind::Molar),
    ("Third Molar", ToothKind::WisdomTooth),
];

#[rustfmt::skip]
const CODES: [[&str; 8]; 4] = [
    ["11", "12", "13", "14", "15", "16", "17", "18"],
    ["21", "22", "23", "24", "25", "26", "27", "28"],
    ["31", "32", "33", "34", "35", "36", "37", "38"],
    ["41", "42", "43", "44", "45", "46", "47", "48"],
];

fn position(quadrant: usize, digit: usize) -> ToothPosition {
    let (name, kind) = BY_DIGIT[digit - 1];
    ToothPosition {
        code: CODES[quadrant - 1][digit - 1],
        name,
        kind,
    }
}

/// Quadrant in chart reading order: the patient's right side runs molar to
/// incisor, the left side incisor to molar.
fn quadrant(q: usize) -> Vec<ToothPosition> {
    match q {
        1 | 4 => (1..=8).rev().map(|d| position(q, d)).collect(),
        _ => (1..=8).map(|d| position(q, d)).collect(),
    }
}

/// Which ordered list of positions a run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionScheme {
    /// Upper right quadrant, 18 down to 11.
    #[default]
    UpperRight,
    /// Both upper quadrants, 16 positions.
    UpperArch,
    /// Permanent dentition, 32 positions.
    Full,
}

impl PositionScheme {
    pub fn positions(self) -> Vec<ToothPosition> {
        match self {
            PositionScheme::UpperRight => quadrant(1),
            PositionScheme::UpperArch => [quadrant(1), quadrant(2)].concat(),
            PositionScheme::Full => [quadrant(1), quadrant(2), quadrant(4), quadrant(3)].concat(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PositionScheme::UpperRight => "upper-right",
            PositionScheme::UpperArch => "upper-arch",
            PositionScheme::Full => "full",
        }
    }
}

impl fmt::Display for PositionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionScheme {
    type Err = DentalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "upper-right" => Ok(PositionScheme::UpperRight),
            "upper-arch" => Ok(PositionScheme::UpperArch),
            "full" => Ok(PositionScheme::Full),
            other => Err(DentalError::UnknownScheme(other.to_string())),
        }
    }
}
