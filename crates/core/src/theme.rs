//! Theme settings: group name → ordered setting descriptors.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One theme setting descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSetting {
    pub id: String,
    #[serde(rename = "type")]
    pub setting_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub output_as_css_var: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ThemeSetting {
    /// Current value, falling back to the default. `null` counts as missing.
    pub fn effective_value(&self) -> Option<&Value> {
        self.value
            .as_ref()
            .filter(|v| !v.is_null())
            .or_else(|| self.default.as_ref().filter(|v| !v.is_null()))
    }

    pub fn is_font_picker(&self) -> bool {
        self.setting_type == "font_picker"
    }
}

/// Grouped theme settings. Group order is the declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeSettings {
    pub groups: IndexMap<String, Vec<ThemeSetting>>,
}

impl ThemeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate every `(group, setting)` pair in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ThemeSetting)> {
        self.groups
            .iter()
            .flat_map(|(group, settings)| settings.iter().map(move |s| (group.as_str(), s)))
    }

    /// Find a setting by group and id.
    pub fn get(&self, group: &str, id: &str) -> Option<&ThemeSetting> {
        self.groups.get(group)?.iter().find(|s| s.id == id)
    }

    /// Set the current value of an existing setting. Returns `false` if the
    /// setting does not exist.
    pub fn set_value(&mut self, group: &str, id: &str, value: Value) -> bool {
        match self
            .groups
            .get_mut(group)
            .and_then(|settings| settings.iter_mut().find(|s| s.id == id))
        {
            Some(setting) => {
                setting.value = Some(value);
                true
            }
            None => false,
        }
    }
}
