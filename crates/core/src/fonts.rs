//! Font-picker values and Google-font request bookkeeping.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::theme::ThemeSettings;

/// Base URL of the Google Fonts CSS2 API.
pub const GOOGLE_FONTS_CSS_URL: &str = "https://fonts.googleapis.com/css2";

/// Weight used when a font value omits one.
pub const DEFAULT_FONT_WEIGHT: u16 = 400;

/// Font family → requested weights. Ordered so URLs and messages built from
/// it are deterministic.
pub type FontRequests = BTreeMap<String, BTreeSet<u16>>;

/// Value stored by a `font_picker` setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontValue {
    /// CSS `font-family` stack, e.g. `"Inter", sans-serif`.
    pub stack: String,
    pub weight: u16,
    /// Primary family name; derived from the stack when absent.
    #[serde(default)]
    pub family: Option<String>,
    /// Whether the family is served by Google Fonts.
    #[serde(default)]
    pub google: bool,
}

impl FontValue {
    /// Interpret a stored setting value. Plain strings are treated as a
    /// local font stack at the default weight.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(stack) if !stack.trim().is_empty() => Some(Self {
                stack: stack.clone(),
                weight: DEFAULT_FONT_WEIGHT,
                family: None,
                google: false,
            }),
            Value::Object(map) => {
                let stack = map.get("stack")?.as_str()?.trim();
                if stack.is_empty() {
                    return None;
                }
                let weight = map
                    .get("weight")
                    .and_then(weight_from_value)
                    .unwrap_or(DEFAULT_FONT_WEIGHT);
                Some(Self {
                    stack: stack.to_string(),
                    weight,
                    family: map
                        .get("family")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    google: map.get("google").and_then(Value::as_bool).unwrap_or(false),
                })
            }
            _ => None,
        }
    }

    /// Primary family: explicit `family`, else the first stack entry with
    /// quotes removed.
    pub fn primary_family(&self) -> String {
        if let Some(family) = &self.family {
            return family.clone();
        }
        self.stack
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string()
    }
}

fn weight_from_value(value: &Value) -> Option<u16> {
    let weight = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    // CSS font weights are 1..=1000.
    (1..=1000).contains(&weight).then_some(weight as u16)
}

/// Collect every Google-font family/weight referenced by `font_picker`
/// settings in the theme.
pub fn collect_google_fonts(theme: &ThemeSettings) -> FontRequests {
    let mut requests = FontRequests::new();
    for (_, setting) in theme.iter().filter(|(_, s)| s.is_font_picker()) {
        let Some(font) = setting.effective_value().and_then(FontValue::from_value) else {
            continue;
        };
        if font.google {
            requests
                .entry(font.primary_family())
                .or_default()
                .insert(font.weight);
        }
    }
    requests
}

/// Family/weight pairs present in `next` but not in `previous`.
pub fn newly_requested(previous: &FontRequests, next: &FontRequests) -> FontRequests {
    let mut added = FontRequests::new();
    for (family, weights) in next {
        let known = previous.get(family);
        let fresh: BTreeSet<u16> = weights
            .iter()
            .copied()
            .filter(|w| !known.is_some_and(|k| k.contains(w)))
            .collect();
        if !fresh.is_empty() {
            added.insert(family.clone(), fresh);
        }
    }
    added
}

/// Build a single Google Fonts stylesheet URL for all requests, or `None`
/// when nothing is requested.
pub fn google_fonts_url(requests: &FontRequests) -> Option<String> {
    if requests.is_empty() {
        return None;
    }
    let families: Vec<String> = requests
        .iter()
        .filter(|(_, weights)| !weights.is_empty())
        .map(|(family, weights)| {
            let weights: Vec<String> = weights.iter().map(u16::to_string).collect();
            format!(
                "family={}:wght@{}",
                encode_family(family),
                weights.join(";")
            )
        })
        .collect();
    if families.is_empty() {
        return None;
    }
    Some(format!(
        "{GOOGLE_FONTS_CSS_URL}?{}&display=swap",
        families.join("&")
    ))
}

/// URL for a single family/weight pair.
pub fn google_font_url(family: &str, weight: u16) -> String {
    format!(
        "{GOOGLE_FONTS_CSS_URL}?family={}:wght@{weight}&display=swap",
        encode_family(family)
    )
}

fn encode_family(family: &str) -> String {
    family
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .map(|c| if c == ' ' { '+' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn theme(fonts: Value) -> ThemeSettings {
        serde_json::from_value(json!({ "typography": fonts })).unwrap()
    }

    #[test]
    fn parses_object_and_string_values() {
        let font = FontValue::from_value(&json!({
            "stack": "\"Open Sans\", sans-serif",
            "weight": 700,
            "google": true
        }))
        .unwrap();
        assert_eq!(font.weight, 700);
        assert_eq!(font.primary_family(), "Open Sans");

        let local = FontValue::from_value(&json!("Georgia, serif")).unwrap();
        assert_eq!(local.weight, DEFAULT_FONT_WEIGHT);
        assert!(!local.google);

        assert!(FontValue::from_value(&json!({ "weight": 400 })).is_none());
        assert!(FontValue::from_value(&json!(12)).is_none());
    }

    #[test]
    fn invalid_weight_falls_back_to_default() {
        let font = FontValue::from_value(&json!({ "stack": "Inter", "weight": 5000 })).unwrap();
        assert_eq!(font.weight, DEFAULT_FONT_WEIGHT);
        let font = FontValue::from_value(&json!({ "stack": "Inter", "weight": "600" })).unwrap();
        assert_eq!(font.weight, 600);
    }

    #[test]
    fn collects_only_google_fonts() {
        let t = theme(json!([
            { "id": "heading", "type": "font_picker", "value": { "stack": "Inter, sans-serif", "weight": 700, "google": true } },
            { "id": "body", "type": "font_picker", "value": { "stack": "Inter, sans-serif", "weight": 400, "google": true } },
            { "id": "mono", "type": "font_picker", "value": { "stack": "Menlo, monospace", "weight": 400 } },
            { "id": "size", "type": "range", "value": 16 }
        ]));
        let requests = collect_google_fonts(&t);
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests["Inter"].iter().copied().collect::<Vec<_>>(),
            vec![400, 700]
        );
    }

    #[test]
    fn newly_requested_only_reports_new_pairs() {
        let mut previous = FontRequests::new();
        previous.entry("Inter".into()).or_default().insert(400);
        let mut next = previous.clone();
        next.entry("Inter".into()).or_default().insert(700);
        next.entry("Lora".into()).or_default().insert(400);

        let added = newly_requested(&previous, &next);
        assert_eq!(added["Inter"].iter().copied().collect::<Vec<_>>(), vec![700]);
        assert!(added.contains_key("Lora"));
        assert!(newly_requested(&next, &next).is_empty());
    }

    #[test]
    fn builds_combined_url() {
        let mut requests = FontRequests::new();
        requests.entry("Open Sans".into()).or_default().extend([700, 400]);
        requests.entry("Lora".into()).or_default().insert(400);
        assert_eq!(
            google_fonts_url(&requests).unwrap(),
            "https://fonts.googleapis.com/css2?family=Lora:wght@400&family=Open+Sans:wght@400;700&display=swap"
        );
        assert!(google_fonts_url(&FontRequests::new()).is_none());
    }

    #[test]
    fn single_font_url() {
        assert_eq!(
            google_font_url("Open Sans", 300),
            "https://fonts.googleapis.com/css2?family=Open+Sans:wght@300&display=swap"
        );
    }
}
