//! The actuarial side-channel the coordinator ships alongside the
//! dispatch pipeline: a fixed logistic model that turns coarse
//! demographic inputs into a mortality-risk score and a narrative cause.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MortalityModel {
    #[serde(default)]
    pub intercept: f64,
    #[serde(default)]
    pub age: f64,
    #[serde(default)]
    pub age_sq: f64,
    #[serde(default)]
    pub city: HashMap<String, f64>,
    #[serde(default)]
    pub country: HashMap<String, f64>,
    /// Matched by substring against the free-form lifestyle field.
    #[serde(default)]
    pub ethnicity: HashMap<String, f64>,
    #[serde(default)]
    pub cause_map: HashMap<String, String>,
}

impl Default for MortalityModel {
    fn default() -> Self {
        Self {
            intercept: -6.35,
            age: 0.072,
            age_sq: -0.00028,
            city: [
                ("new york", 0.48),
                ("los angeles", 0.32),
                ("mumbai", 0.55),
                ("delhi", 0.58),
                ("tokyo", -0.42),
                ("osaka", -0.35),
                ("london", 0.12),
                ("lagos", 0.61),
                ("jakarta", 0.44),
                ("sydney", -0.28),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            country: [
                ("united states", 0.32),
                ("india", 0.41),
                ("nigeria", 0.63),
                ("indonesia", 0.47),
                ("japan", -0.48),
                ("australia", -0.36),
                ("united kingdom", 0.18),
                ("canada", -0.22),
                ("germany", -0.19),
                ("brazil", 0.29),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            ethnicity: [
                ("smoker", 0.58),
                ("diabetes", 0.46),
                ("hypertension", 0.37),
                ("athlete", -0.32),
                ("vegan", -0.21),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            cause_map: [
                (
                    "smoker",
                    "Respiratory failure from chronic exposure to toxins.",
                ),
                ("diabetes", "Organ failure due to uncontrolled diabetes."),
                ("hypertension", "Hypertensive crisis leading to stroke."),
                (
                    "mumbai",
                    "Vector-borne disease outbreak in dense urban settlement.",
                ),
                ("delhi", "Air-quality driven respiratory collapse."),
                ("lagos", "Water-borne infection during seasonal floods."),
                ("tokyo", "Peaceful passing in a low-risk environment."),
                ("japan", "Natural causes after an extended life expectancy."),
                (
                    "default",
                    "Systemic infection following prolonged stress.",
                ),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        }
    }
}

impl MortalityModel {
    /// Load from `path`, falling back to the built-in model when the file
    /// is missing or malformed.
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(d) => d,
            Err(e) => {
                tracing::info!(?path, error = %e, "using default seer model");
                return Self::default();
            }
        };
        match serde_json::from_str(&data) {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!(?path, error = %e, "failed to parse seer model, using default");
                Self::default()
            }
        }
    }

    /// Risk in [0, 1] plus the narrative cause keyed by the dominant
    /// positive contribution.
    pub fn predict(&self, age: f64, city: &str, country: &str, ethnicity: &str) -> (f64, String) {
        let mut score = self.intercept + self.age * age + self.age_sq * age * age;
        let mut contributions: Vec<(&str, f64)> = Vec::new();

        let city_key = city.trim().to_lowercase();
        if let Some((key, coef)) = self.city.get_key_value(city_key.as_str()) {
            score += coef;
            contributions.push((key, *coef));
        }

        let country_key = country.trim().to_lowercase();
        if let Some((key, coef)) = self.country.get_key_value(country_key.as_str()) {
            score += coef;
            contributions.push((key, *coef));
        }

        let profile = ethnicity.trim().to_lowercase();
        for (key, coef) in &self.ethnicity {
            if profile.contains(key.as_str()) {
                score += coef;
                contributions.push((key, *coef));
            }
        }

        let risk = sigmoid(score).clamp(0.0, 1.0);

        let dominant = contributions
            .iter()
            .filter(|(_, coef)| *coef > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(key, _)| *key);
        let cause = dominant
            .and_then(|key| self.cause_map.get(key))
            .or_else(|| self.cause_map.get("default"))
            .cloned()
            .unwrap_or_default();

        (risk, cause)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
