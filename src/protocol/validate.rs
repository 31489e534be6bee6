//! Structural validation of raw dashboard payloads.
//!
//! Walks the parsed JSON before typed deserialization so a bad payload is
//! reported with the exact location of the first violation
//! (`$.tabs[1].buttons[4].color.paletteColor`) instead of a generic serde
//! message.

use serde_json::{Map, Value};

use crate::core::errors::{DashpadError, Result};
use crate::protocol::model::DashboardState;

/// Largest value a palette index or RGB channel may take (7-bit MIDI data).
pub const MAX_CHANNEL_VALUE: u64 = 127;

const COLOR_TYPES: [&str; 4] = ["solid", "flash", "pulse", "rgb"];

/// Check `value` against the dashboard protocol and convert it.
pub fn validate_dashboard_state(value: Value) -> Result<DashboardState> {
    check_root(&value)?;
    serde_json::from_value(value).map_err(|e| DashpadError::validation("$", e.to_string()))
}

fn check_root(value: &Value) -> Result<()> {
    let root = expect_object(value, "$")?;
    let tabs = root
        .get("tabs")
        .ok_or_else(|| DashpadError::validation("$", "missing required property \"tabs\""))?;
    let tabs = tabs
        .as_array()
        .ok_or_else(|| DashpadError::validation("$.tabs", "expected an array"))?;
    for (i, tab) in tabs.iter().enumerate() {
        check_tab(tab, &format!("$.tabs[{i}]"))?;
    }
    Ok(())
}

fn check_tab(value: &Value, path: &str) -> Result<()> {
    let tab = expect_object(value, path)?;
    check_color(required(tab, "color", path)?, &format!("{path}.color"))?;
    if let Some(selected) = tab.get("selectedColor") {
        check_color(selected, &format!("{path}.selectedColor"))?;
    }
    let tab_type = required(tab, "tabType", path)?
        .as_str()
        .ok_or_else(|| DashpadError::validation(format!("{path}.tabType"), "expected a string"))?;

    if tab_type == "list" {
        let buttons_path = format!("{path}.buttons");
        let buttons = required(tab, "buttons", path)?
            .as_array()
            .ok_or_else(|| DashpadError::validation(&buttons_path, "expected an array"))?;
        for (i, button) in buttons.iter().enumerate() {
            check_button(button, &format!("{buttons_path}[{i}]"))?;
        }
    }
    Ok(())
}

fn check_button(value: &Value, path: &str) -> Result<()> {
    let button = expect_object(value, path)?;
    check_color(required(button, "color", path)?, &format!("{path}.color"))?;
    match button.get("link") {
        None | Some(Value::String(_)) => Ok(()),
        Some(_) => Err(DashpadError::validation(
            format!("{path}.link"),
            "expected a string",
        )),
    }
}

fn check_color(value: &Value, path: &str) -> Result<()> {
    let color = expect_object(value, path)?;
    let kind = required(color, "type", path)?
        .as_str()
        .ok_or_else(|| DashpadError::validation(format!("{path}.type"), "expected a string"))?;
    match kind {
        "solid" | "flash" | "pulse" => check_channel(color, "paletteColor", path),
        "rgb" => {
            for channel in ["r", "g", "b"] {
                check_channel(color, channel, path)?;
            }
            Ok(())
        }
        other => Err(DashpadError::validation(
            format!("{path}.type"),
            format!("unknown color type {other:?}, expected one of {COLOR_TYPES:?}"),
        )),
    }
}

fn check_channel(color: &Map<String, Value>, key: &str, path: &str) -> Result<()> {
    let field_path = format!("{path}.{key}");
    let raw = required(color, key, path)?;
    let Some(n) = raw.as_u64() else {
        return Err(DashpadError::validation(
            field_path,
            format!("expected a non-negative integer, got {raw}"),
        ));
    };
    if n > MAX_CHANNEL_VALUE {
        return Err(DashpadError::validation(
            field_path,
            format!("{n} is out of range 0..={MAX_CHANNEL_VALUE}"),
        ));
    }
    Ok(())
}

fn expect_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| DashpadError::validation(path, "expected an object"))
}

fn required<'a>(object: &'a Map<String, Value>, key: &str, path: &str) -> Result<&'a Value> {
    object.get(key).ok_or_else(|| {
        DashpadError::validation(path, format!("missing required property {key:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::model::{Color, TabBody};
    use serde_json::json;

    fn violation_path(value: Value) -> String {
        match validate_dashboard_state(value) {
            Err(DashpadError::Validation { path, .. }) => path,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn valid_payload_converts() {
        let state = validate_dashboard_state(json!({
            "tabs": [{
                "color": { "type": "solid", "paletteColor": 5 },
                "selectedColor": { "type": "rgb", "r": 127, "g": 0, "b": 64 },
                "tabType": "list",
                "buttons": [{ "color": { "type": "pulse", "paletteColor": 10 }, "link": "http://x" }]
            }]
        }))
        .expect("payload should validate");
        assert_eq!(state.tabs.len(), 1);
        assert_eq!(
            state.tabs[0].selected_color,
            Some(Color::Rgb { r: 127, g: 0, b: 64 })
        );
    }

    #[test]
    fn empty_tab_list_is_valid() {
        let state = validate_dashboard_state(json!({ "tabs": [] })).unwrap();
        assert!(state.tabs.is_empty());
    }

    #[test]
    fn missing_tabs_rejected() {
        assert_eq!(violation_path(json!({})), "$");
        assert_eq!(violation_path(json!([])), "$");
        assert_eq!(violation_path(json!({ "tabs": {} })), "$.tabs");
    }

    #[test]
    fn unknown_color_type_names_location() {
        let path = violation_path(json!({
            "tabs": [
                { "color": { "type": "solid", "paletteColor": 1 }, "tabType": "list", "buttons": [] },
                {
                    "color": { "type": "solid", "paletteColor": 1 },
                    "tabType": "list",
                    "buttons": [
                        { "color": { "type": "solid", "paletteColor": 1 } },
                        { "color": { "type": "blink", "paletteColor": 1 } }
                    ]
                }
            ]
        }));
        assert_eq!(path, "$.tabs[1].buttons[1].color.type");
    }

    #[test]
    fn out_of_range_channel_rejected() {
        let path = violation_path(json!({
            "tabs": [{ "color": { "type": "rgb", "r": 0, "g": 128, "b": 0 }, "tabType": "list", "buttons": [] }]
        }));
        assert_eq!(path, "$.tabs[0].color.g");
    }

    #[test]
    fn fractional_and_negative_channels_rejected() {
        let fractional = violation_path(json!({
            "tabs": [{ "color": { "type": "solid", "paletteColor": 1.5 }, "tabType": "list", "buttons": [] }]
        }));
        assert_eq!(fractional, "$.tabs[0].color.paletteColor");

        let negative = violation_path(json!({
            "tabs": [{ "color": { "type": "flash", "paletteColor": -1 }, "tabType": "list", "buttons": [] }]
        }));
        assert_eq!(negative, "$.tabs[0].color.paletteColor");
    }

    #[test]
    fn non_string_link_rejected() {
        let path = violation_path(json!({
            "tabs": [{
                "color": { "type": "solid", "paletteColor": 1 },
                "tabType": "list",
                "buttons": [{ "color": { "type": "solid", "paletteColor": 1 }, "link": 42 }]
            }]
        }));
        assert_eq!(path, "$.tabs[0].buttons[0].link");
    }

    #[test]
    fn list_without_buttons_rejected() {
        let path = violation_path(json!({
            "tabs": [{ "color": { "type": "solid", "paletteColor": 1 }, "tabType": "list" }]
        }));
        assert_eq!(path, "$.tabs[0]");
    }

    #[test]
    fn unknown_tab_type_passes_as_unsupported() {
        let state = validate_dashboard_state(json!({
            "tabs": [{ "color": { "type": "solid", "paletteColor": 1 }, "tabType": "graph" }]
        }))
        .unwrap();
        assert_eq!(state.tabs[0].body, TabBody::Unsupported);
    }
}
