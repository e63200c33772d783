//! Theme → CSS custom property projection.
//!
//! The full-page render and the live `UPDATE_CSS_VARIABLES` path both call
//! [`settings_to_css_variables`], so for the same theme they always agree
//! byte for byte.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::fonts::FontValue;
use crate::theme::{ThemeSetting, ThemeSettings};

/// CSS variable name (including the leading `--`) → value.
pub type CssVariables = BTreeMap<String, String>;

/// Build the variable name for a theme setting: `--{group}-{id}`.
pub fn variable_name(group: &str, setting_id: &str) -> String {
    format!("--{group}-{setting_id}")
}

/// Project every eligible theme setting into CSS variables.
///
/// Settings with `outputAsCssVar` and all `font_picker` settings project.
/// Missing values fall back to the default; a setting with neither is
/// skipped.
pub fn settings_to_css_variables(theme: &ThemeSettings) -> CssVariables {
    let mut vars = CssVariables::new();
    for (group, setting) in theme.iter() {
        if !setting.output_as_css_var && !setting.is_font_picker() {
            continue;
        }
        if !is_identifier(group) || !is_identifier(&setting.id) {
            tracing::warn!(group, setting_id = %setting.id, "Skipping theme setting with invalid CSS identifier");
            continue;
        }
        let Some(value) = setting.effective_value() else {
            continue;
        };
        let name = variable_name(group, &setting.id);

        if setting.is_font_picker() {
            if let Some(font) = FontValue::from_value(value) {
                if is_safe_css_value(&font.stack) {
                    vars.insert(name.clone(), font.stack.clone());
                    vars.insert(format!("{name}-family"), font.stack.clone());
                    vars.insert(format!("{name}-weight"), font.weight.to_string());
                }
            }
            continue;
        }

        match css_value(setting, value) {
            Some(v) if is_safe_css_value(&v) => {
                vars.insert(name, v);
            }
            Some(_) => {
                tracing::warn!(variable = %name, "Dropping unsafe CSS variable value");
            }
            None => {}
        }
    }
    vars
}

/// Render a `:root { ... }` rule for the given variables.
pub fn to_root_css(vars: &CssVariables) -> String {
    let mut css = String::from(":root {\n");
    for (name, value) in vars {
        css.push_str("  ");
        css.push_str(name);
        css.push_str(": ");
        css.push_str(value);
        css.push_str(";\n");
    }
    css.push('}');
    css
}

/// Stringify a scalar setting value, appending the declared unit to
/// numeric values.
fn css_value(setting: &ThemeSetting, value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => format_number(n.as_f64()?),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }
    match &setting.unit {
        Some(unit) if text.parse::<f64>().is_ok() => Some(format!("{text}{unit}")),
        _ => Some(text),
    }
}

/// Format a number without a trailing `.0` for whole values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Values must not be able to close the declaration, the rule or the
/// enclosing `<style>` element.
pub fn is_safe_css_value(value: &str) -> bool {
    !value
        .chars()
        .any(|c| matches!(c, ';' | '{' | '}' | '<' | '>' | '\\'))
}
