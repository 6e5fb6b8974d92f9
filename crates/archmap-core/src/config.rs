//! Static diagram configuration as supplied by an external loader.
//!
//! Keys follow the camelCase shape of browser-side diagram configs (`nodeTypes`, `isWan`,
//! `tagClass`, ...). JSON, YAML and JSON5 inputs deserialize into the same types.

use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Json,
    Yaml,
    Json5,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
    }
}

impl FromStr for ConfigFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json5" => Ok(Self::Json5),
            other => Err(Error::UnsupportedFormat {
                extension: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramConfig {
    pub sites: Vec<SiteConfig>,
    pub node_types: IndexMap<String, NodeTypeConfig>,
    pub nodes: Vec<NodeConfig>,
    pub connections: Vec<ConnectionConfig>,
    #[serde(alias = "protocols")]
    pub layers: Vec<LayerConfig>,
    pub simulations: Vec<SimulationConfig>,
    pub documentation: IndexMap<String, DocumentationConfig>,
    pub theme: ThemeConfig,
    pub settings: Settings,
}

impl DiagramConfig {
    pub fn from_str_with_format(text: &str, format: ConfigFormat) -> Result<Self> {
        let cfg: Self = match format {
            ConfigFormat::Json => serde_json::from_str(text)?,
            ConfigFormat::Yaml => serde_yaml::from_str(text)?,
            ConfigFormat::Json5 => json5::from_str(text)?,
        };
        cfg.settings.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_str_with_format(&text, format)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeTypeConfig {
    pub icon: Option<String>,
    pub icon_color: Option<String>,
    pub icon_bg: Option<String>,
    pub header_bg: Option<String>,
    pub header_color: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfig {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: String,
    pub x: f64,
    pub y: f64,
    /// Authoritative width; falls back to `settings.defaultNodeWidth`.
    #[serde(default)]
    pub w: Option<f64>,
    #[serde(default)]
    pub h: Option<f64>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub tag_class: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub icon_color: Option<String>,
    #[serde(default)]
    pub icon_bg: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub layer: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub curve: Option<f64>,
    #[serde(default)]
    pub dash: bool,
    #[serde(default)]
    pub is_wan: bool,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub icon: String,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationConfig {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub blocks: Vec<DocumentationBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentationBlock {
    pub title: String,
    pub content: String,
}

/// Theme colors are passed through untouched to rendering layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub colors: IndexMap<String, String>,
}

/// Engine constants. Every field can be overridden from the config `settings` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Distance between sibling connectors sharing an endpoint pair.
    pub curve_spacing: f64,
    /// Stroke width of the invisible hit-test path.
    pub hit_width: f64,
    pub zoom_sensitivity: f64,
    /// Screen pixels a press may travel and still count as a click.
    pub click_threshold: f64,
    /// Per-tick progress increment of a simulation hop (frame-coupled).
    pub progress_step: f64,
    pub settle_delay_ms: u64,
    /// Segment count of the arc-length lookup table.
    pub arc_samples: usize,
    pub default_node_width: f64,
    pub default_node_height: f64,
    pub initial_scale: f64,
    pub initial_pan: (f64, f64),
    pub marker_radius: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            curve_spacing: 30.0,
            hit_width: 14.0,
            zoom_sensitivity: 0.001,
            click_threshold: 5.0,
            progress_step: 0.02,
            settle_delay_ms: 2000,
            arc_samples: 64,
            default_node_width: 180.0,
            default_node_height: 60.0,
            initial_scale: 0.55,
            initial_pan: (-100.0, -50.0),
            marker_radius: 6.0,
        }
    }
}

impl Settings {
    /// Applies a partial JSON override on top of `self` (objects merge, scalars replace).
    pub fn layered(&self, overrides: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(self)?;
        deep_merge_value(&mut base, overrides);
        let out: Self = serde_json::from_value(base)?;
        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: f64) -> Result<()> {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(Error::InvalidSettings {
                    message: format!("{name} must be a positive finite number (got {v})"),
                })
            }
        }

        positive("progressStep", self.progress_step)?;
        positive("zoomSensitivity", self.zoom_sensitivity)?;
        positive("defaultNodeWidth", self.default_node_width)?;
        positive("defaultNodeHeight", self.default_node_height)?;
        positive("initialScale", self.initial_scale)?;
        positive("hitWidth", self.hit_width)?;
        positive("markerRadius", self.marker_radius)?;
        if !(self.curve_spacing.is_finite() && self.curve_spacing >= 0.0) {
            return Err(Error::InvalidSettings {
                message: format!("curveSpacing must be >= 0 (got {})", self.curve_spacing),
            });
        }
        if !(self.click_threshold.is_finite() && self.click_threshold >= 0.0) {
            return Err(Error::InvalidSettings {
                message: format!("clickThreshold must be >= 0 (got {})", self.click_threshold),
            });
        }
        if self.arc_samples == 0 {
            return Err(Error::InvalidSettings {
                message: "arcSamples must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}

/// Returns an empty JSON object, handy as a no-op override for [`Settings::layered`].
pub fn empty_overrides() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_camel_case_json_config() {
        let text = r##"{
            "nodes": [{ "id": "a", "type": "server", "x": 10, "y": 20, "label": "A", "sub": "s", "tagClass": "warn" }],
            "connections": [{ "from": "a", "to": "b", "type": "http", "isWan": true, "label": "l", "detail": "d" }],
            "protocols": [{ "id": "http", "label": "HTTP", "color": "#0f0", "active": true, "group": "infra" }],
            "simulations": [{ "id": "s1", "label": "Flow", "icon": "fa-play", "nodes": ["a", "b"] }]
        }"##;
        let cfg = DiagramConfig::from_str_with_format(text, ConfigFormat::Json).unwrap();
        assert_eq!(cfg.nodes[0].node_type, "server");
        assert_eq!(cfg.nodes[0].tag_class.as_deref(), Some("warn"));
        assert!(cfg.connections[0].is_wan);
        assert_eq!(cfg.layers[0].group.as_deref(), Some("infra"));
        assert_eq!(cfg.settings, Settings::default());
    }

    #[test]
    fn parses_yaml_and_json5() {
        let yaml = "nodes:\n  - id: a\n    x: 0\n    y: 0\nsettings:\n  curveSpacing: 12\n";
        let cfg = DiagramConfig::from_str_with_format(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(cfg.settings.curve_spacing, 12.0);

        let json5 = "{ nodes: [{ id: 'a', x: 1, y: 2, }], }";
        let cfg = DiagramConfig::from_str_with_format(json5, ConfigFormat::Json5).unwrap();
        assert_eq!(cfg.nodes[0].x, 1.0);
    }

    #[test]
    fn format_is_picked_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("map.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("map.json5")).unwrap(),
            ConfigFormat::Json5
        );
        let err = ConfigFormat::from_path(Path::new("map.toml")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported config format: toml");
    }

    #[test]
    fn layered_settings_merge_partial_overrides() {
        let s = Settings::default()
            .layered(&json!({ "hitWidth": 20.0, "initialPan": [5.0, 6.0] }))
            .unwrap();
        assert_eq!(s.hit_width, 20.0);
        assert_eq!(s.initial_pan, (5.0, 6.0));
        assert_eq!(s.curve_spacing, Settings::default().curve_spacing);

        let same = Settings::default().layered(&empty_overrides()).unwrap();
        assert_eq!(same, Settings::default());
    }

    #[test]
    fn rejects_non_positive_progress_step() {
        let err = Settings::default()
            .layered(&json!({ "progressStep": 0.0 }))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSettings { .. }));
    }

    #[test]
    fn rejects_non_positive_hit_width_and_marker_radius() {
        for overrides in [
            json!({ "hitWidth": -1.0 }),
            json!({ "hitWidth": 0.0 }),
            json!({ "markerRadius": 0.0 }),
            json!({ "markerRadius": -6.0 }),
        ] {
            let err = Settings::default().layered(&overrides).unwrap_err();
            assert!(matches!(err, Error::InvalidSettings { .. }), "{overrides}");
        }
    }
}
