use serde::{Deserialize, Serialize};

/// Closed disposal-category enumeration. The classifier always returns one
/// of these, falling back to `Unknown` for low-confidence guesses rather
/// than failing.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Recyclable,
    Organic,
    Hazardous,
    Residual,
    Plastic,
    Paper,
    Metal,
    Glass,
    Cardboard,
    Unknown,
}

/// Aggregation bucket for statistics. `Neither` still counts toward the
/// total but toward no per-bucket column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Recyclable,
    Organic,
    Hazardous,
    Neither,
}

impl Category {
    pub fn bucket(self) -> Bucket {
        match self {
            Category::Recyclable
            | Category::Paper
            | Category::Cardboard
            | Category::Metal
            | Category::Glass
            | Category::Plastic => Bucket::Recyclable,
            Category::Organic => Bucket::Organic,
            Category::Hazardous => Bucket::Hazardous,
            Category::Residual | Category::Unknown => Bucket::Neither,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Recyclable => "Recyclable",
            Category::Organic => "Organic",
            Category::Hazardous => "Hazardous",
            Category::Residual => "Residual",
            Category::Plastic => "Plastic",
            Category::Paper => "Paper",
            Category::Metal => "Metal",
            Category::Glass => "Glass",
            Category::Cardboard => "Cardboard",
            Category::Unknown => "Unknown",
        }
    }

    /// Lenient parse for persisted rows; unrecognized text degrades to
    /// `Unknown` instead of failing the read.
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "Recyclable" => Category::Recyclable,
            "Organic" => Category::Organic,
            "Hazardous" => Category::Hazardous,
            "Residual" => Category::Residual,
            "Plastic" => Category::Plastic,
            "Paper" => Category::Paper,
            "Metal" => Category::Metal,
            "Glass" => Category::Glass,
            "Cardboard" => Category::Cardboard,
            _ => Category::Unknown,
        }
    }
}

/// Target bin presentation data carried alongside a classification.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BinInfo {
    pub name: String,
    pub advice: String,
    pub color_hex: String,
}

/// Immutable output of a single classification.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    /// Probability in [0, 1].
    pub confidence: f32,
    pub category: Category,
    pub bin: BinInfo,
}

#[derive(Debug, Serialize, Clone)]
pub struct ModelStatus {
    pub loading: bool,
    pub ready: bool,
    pub error: Option<String>,
}
