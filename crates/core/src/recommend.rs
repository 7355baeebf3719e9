//! Rule-based improvement suggestion engine.
//!
//! Three rule families contribute actions: a static issue map matched
//! against return reasons, keyword rules matched against the combined
//! review text, and mutually exclusive rating tiers. Selection is
//! deterministic: the rating-tier action is taken first, then issue-map
//! actions in declaration order, then keyword actions in declaration
//! order, deduplicated and capped at `MAX_ACTIONS`.

/// Corrective actions keyed by substrings of return reasons. Both the
/// keyword and the reason are lower-cased before matching.
const ISSUE_MAP: &[(&str, &str)] = &[
    ("late delivery", "Optimize supply chain and partner logistics to improve on-time delivery."),
    (
        "defective product",
        "Perform tighter quality control during manufacturing and pre-shipment inspections.",
    ),
    ("damaged item", "Enhance packaging standards and review warehouse handling procedures."),
    (
        "wrong color",
        "Audit image-to-product color accuracy and improve product detail page descriptions.",
    ),
    ("size mismatch", "Update sizing guides and improve dimensional accuracy in listings."),
    ("delayed shipment", "Work closely with carriers to improve dispatch and reduce delay rates."),
    ("poor quality", "Reassess supplier quality standards and perform regular QA audits."),
];

/// Keyword rules over the lower-cased, space-joined review text. A rule
/// fires when any of its keywords appears as a substring.
const REVIEW_RULES: &[(&[&str], &str)] = &[
    (&["defect", "broken"], "Strengthen pre-shipment inspection and product testing."),
    (&["damage"], "Introduce protective packaging for vulnerable components."),
    (&["late", "delay"], "Work with faster, more reliable couriers to reduce delays."),
    (
        &["wrong", "mismatch"],
        "Validate product details before dispatch to avoid mismatched shipments.",
    ),
    (&["size"], "Provide clearer sizing information to minimize fit-related returns."),
];

const URGENT_REVIEW_ACTION: &str =
    "Immediate review required: identify top customer pain points.";
const MODERATE_IMPROVEMENT_ACTION: &str =
    "Moderate satisfaction: address frequent feedback topics to boost ratings.";
const MAINTAIN_PERFORMANCE_ACTION: &str =
    "High performer: continue promotion and maintain consistency.";

pub const FALLBACK_SUGGESTION: &str =
    "Product is performing well. Continue monitoring feedback and logistics KPIs.";

pub const MAX_ACTIONS: usize = 3;

/// Inputs for a single product's suggestion run.
#[derive(Debug, Default)]
pub struct RecommendationInput<'a> {
    pub review_texts: &'a [String],
    pub return_reasons: &'a [String],
    pub average_rating: f64,
}

/// A generated suggestion: the individual triggered actions (already
/// prioritized and capped) plus the space-joined text to persist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recommendation {
    pub actions: Vec<&'static str>,
    pub text: String,
}

impl Recommendation {
    pub fn is_fallback(&self) -> bool {
        self.actions.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RecommendationEngine;

impl RecommendationEngine {
    pub fn generate(&self, input: &RecommendationInput<'_>) -> Recommendation {
        let combined_reviews = input
            .review_texts
            .iter()
            .map(|text| text.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");

        let mut actions: Vec<&'static str> = Vec::new();

        if let Some(action) = rating_tier_action(input.average_rating) {
            push_unique(&mut actions, action);
        }

        let reasons: Vec<String> =
            input.return_reasons.iter().map(|reason| reason.to_lowercase()).collect();
        for (keyword, action) in ISSUE_MAP {
            if reasons.iter().any(|reason| reason.contains(keyword)) {
                push_unique(&mut actions, action);
            }
        }

        for (keywords, action) in REVIEW_RULES {
            if keywords.iter().any(|keyword| combined_reviews.contains(keyword)) {
                push_unique(&mut actions, action);
            }
        }

        actions.truncate(MAX_ACTIONS);

        let text = if actions.is_empty() {
            FALLBACK_SUGGESTION.to_string()
        } else {
            actions.join(" ")
        };

        Recommendation { actions, text }
    }
}

/// Mutually exclusive rating bands; the [3.5, 4.5) band contributes no
/// action at all.
fn rating_tier_action(average_rating: f64) -> Option<&'static str> {
    if average_rating < 2.5 {
        Some(URGENT_REVIEW_ACTION)
    } else if average_rating < 3.5 {
        Some(MODERATE_IMPROVEMENT_ACTION)
    } else if average_rating >= 4.5 {
        Some(MAINTAIN_PERFORMANCE_ACTION)
    } else {
        None
    }
}

fn push_unique(actions: &mut Vec<&'static str>, action: &'static str) {
    if !actions.contains(&action) {
        actions.push(action);
    }
}
