use serde::Serialize;

use super::Variant;

const CROP_HEALTHY_TREATMENT: &str =
    "No treatment needed - plant is healthy. Continue regular maintenance.";
const CROP_FALLBACK_TREATMENT: &str = "Consult with agricultural expert for specific treatment recommendations. Isolate affected plants and maintain proper sanitation.";

const CATTLE_HEALTHY_TREATMENT: &str =
    "No treatment needed - animal is healthy. Continue regular maintenance.";
const CATTLE_FALLBACK_TREATMENT: &str =
    "Consult with a veterinarian or agricultural expert for specific treatment recommendations.";

/// Keyword → treatment pairs, checked in order; the first keyword contained
/// in the lowercased class name wins, so specific keys precede generic ones.
const CROP_TREATMENTS: &[(&str, &str)] = &[
    (
        "powdery_mildew",
        "Apply sulfur-based fungicide and improve air circulation. Remove severely infected leaves.",
    ),
    (
        "leaf_spot",
        "Remove affected leaves and apply copper-based fungicide. Avoid overhead watering.",
    ),
    (
        "blight",
        "Apply fungicide and avoid overhead watering. Remove and destroy infected plants.",
    ),
    (
        "rust",
        "Apply fungicide and remove infected plant parts. Ensure good air circulation.",
    ),
    (
        "mold",
        "Improve ventilation and reduce humidity. Apply appropriate fungicide.",
    ),
    (
        "rot",
        "Improve drainage and avoid overwatering. Remove affected parts immediately.",
    ),
    (
        "spot",
        "Apply fungicide and ensure proper spacing between plants for air flow.",
    ),
];

const CATTLE_TREATMENTS: &[(&str, &str)] = &[
    (
        "lumpy",
        "Isolate the affected animal. Provide supportive care and pain relief. Consult a veterinarian immediately.",
    ),
    (
        "mastitis",
        "Administer antibiotics (as prescribed by a vet) and strip the udder frequently. Improve sanitation and bedding.",
    ),
    (
        "foot-and-mouth",
        "Quarantine the animal immediately. Provide soft food and clean, cool water. Follow local veterinary guidelines for managing outbreaks.",
    ),
];

/// What to conclude when a label matches neither a healthy marker nor a
/// disease indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unmatched {
    Disease,
    Healthy,
}

/// Formatting, disease decision and treatment table for one variant.
#[derive(Debug, Clone)]
pub struct DiseaseProfile {
    variant: Variant,
    healthy_markers: &'static [&'static str],
    disease_indicators: &'static [&'static str],
    unmatched: Unmatched,
    treatments: &'static [(&'static str, &'static str)],
    fallback_treatment: &'static str,
    healthy_treatment: &'static str,
    /// Characters turned into spaces when building display names.
    separators: &'static [char],
}

/// A class label read the way a farmer would want it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub display: String,
    pub detected: bool,
    pub treatment: String,
    pub message: String,
}

impl DiseaseProfile {
    pub fn crop() -> Self {
        Self {
            variant: Variant::Crop,
            healthy_markers: &["healthy"],
            disease_indicators: &[
                "blight", "spot", "rot", "mold", "mildew", "rust", "powdery", "bacterial",
                "fungal", "virus",
            ],
            unmatched: Unmatched::Disease,
            treatments: CROP_TREATMENTS,
            fallback_treatment: CROP_FALLBACK_TREATMENT,
            healthy_treatment: CROP_HEALTHY_TREATMENT,
            separators: &['_'],
        }
    }

    pub fn cattle() -> Self {
        Self {
            variant: Variant::Cattle,
            healthy_markers: &["healthy", "normal"],
            disease_indicators: &["lumpy", "mastitis", "foot-and-mouth"],
            unmatched: Unmatched::Healthy,
            treatments: CATTLE_TREATMENTS,
            fallback_treatment: CATTLE_FALLBACK_TREATMENT,
            healthy_treatment: CATTLE_HEALTHY_TREATMENT,
            separators: &['_', '-'],
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// `Tomato___Late_blight` → `Tomato Late Blight`.
    pub fn display_name(&self, class_name: &str) -> String {
        let spaced: String = class_name
            .chars()
            .map(|c| if self.separators.contains(&c) { ' ' } else { c })
            .collect();
        spaced
            .split_whitespace()
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn is_disease(&self, class_name: &str) -> bool {
        let lower = class_name.to_lowercase();
        if self.healthy_markers.iter().any(|m| lower.contains(m)) {
            return false;
        }
        if self.disease_indicators.iter().any(|i| lower.contains(i)) {
            return true;
        }
        self.unmatched == Unmatched::Disease
    }

    /// The keyword table is consulted before the disease decision, so a
    /// keyword in the label picks its treatment even when the label also
    /// reads as healthy.
    pub fn treatment(&self, class_name: &str) -> &'static str {
        let lower = class_name.to_lowercase();
        if let Some((_, text)) = self.treatments.iter().find(|(key, _)| lower.contains(key)) {
            return text;
        }
        if self.is_disease(class_name) {
            self.fallback_treatment
        } else {
            self.healthy_treatment
        }
    }

    pub fn interpret(&self, class_name: &str) -> Interpretation {
        let display = self.display_name(class_name);
        let detected = self.is_disease(class_name);
        let message = if detected {
            format!("Disease detected: {display}")
        } else {
            format!("{} is healthy: {display}", self.variant.subject())
        };

        Interpretation {
            treatment: self.treatment(class_name).to_string(),
            display,
            detected,
            message,
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
