//! Risk quadrants
//!
//! Combines ownership agreement (same taxpayer id in CAR and SIGEF) with
//! spatial agreement (similarity at or above [`HIGH_SIMILARITY_THRESHOLD`])
//! into one of four quadrants, each with a recommended action.
//!
//! | ownership | spatial | quadrant        | action      |
//! |-----------|---------|-----------------|-------------|
//! | same      | ok      | High Maturity   | Monitor     |
//! | same      | low     | Technical Error | Rectify     |
//! | different | ok      | Legal Risk      | Audit       |
//! | different | low     | Critical        | Restructure |

use serde::{Deserialize, Serialize};

/// Similarity at or above which two polygons are considered in agreement.
///
/// Also the lower edge of the top distribution band and the boundary used by
/// state maturity and summary statistics.
pub const HIGH_SIMILARITY_THRESHOLD: f32 = 0.85;

#[inline]
pub fn is_high_similarity(similarity: f32) -> bool {
    similarity >= HIGH_SIMILARITY_THRESHOLD
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskQuadrant {
    HighMaturity,
    TechnicalError,
    LegalRisk,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Monitor,
    Rectify,
    Audit,
    Restructure,
}

impl RiskQuadrant {
    pub const ALL: [RiskQuadrant; 4] = [
        RiskQuadrant::HighMaturity,
        RiskQuadrant::TechnicalError,
        RiskQuadrant::LegalRisk,
        RiskQuadrant::Critical,
    ];

    pub fn classify(ownership_match: bool, similarity: f32) -> Self {
        match (ownership_match, is_high_similarity(similarity)) {
            (true, true) => RiskQuadrant::HighMaturity,
            (true, false) => RiskQuadrant::TechnicalError,
            (false, true) => RiskQuadrant::LegalRisk,
            (false, false) => RiskQuadrant::Critical,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskQuadrant::HighMaturity => "High Maturity",
            RiskQuadrant::TechnicalError => "Technical Error",
            RiskQuadrant::LegalRisk => "Legal Risk",
            RiskQuadrant::Critical => "Critical",
        }
    }

    pub fn recommended_action(self) -> RecommendedAction {
        match self {
            RiskQuadrant::HighMaturity => RecommendedAction::Monitor,
            RiskQuadrant::TechnicalError => RecommendedAction::Rectify,
            RiskQuadrant::LegalRisk => RecommendedAction::Audit,
            RiskQuadrant::Critical => RecommendedAction::Restructure,
        }
    }

    /// Position in [`RiskQuadrant::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl RecommendedAction {
    pub fn label(self) -> &'static str {
        match self {
            RecommendedAction::Monitor => "Monitor",
            RecommendedAction::Rectify => "Rectify",
            RecommendedAction::Audit => "Audit",
            RecommendedAction::Restructure => "Restructure",
        }
    }
}
