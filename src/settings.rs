use serde::Serialize;
use serde_json::Value;

use crate::geometry::clamp_or;

/// One store write/change batch: settings key to its new raw value.
pub type SettingsPatch = serde_json::Map<String, Value>;

pub const DEFAULT_TEXT: &str = "WATERMARKTEST";
pub const DEFAULT_COLOR: &str = "#ffffff";
pub const DEFAULT_FONT_FAMILY: &str = "Segoe UI, Arial, sans-serif";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    #[default]
    Text,
    Image,
    Both,
}

impl ContentMode {
    fn parse(raw: &str) -> Self {
        match raw {
            "image" => Self::Image,
            "both" => Self::Both,
            // Unrecognized content modes fall back to text-only.
            _ => Self::Text,
        }
    }

    pub fn shows_text(self) -> bool {
        matches!(self, Self::Text | Self::Both)
    }

    pub fn shows_image(self) -> bool {
        matches!(self, Self::Image | Self::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlacementMode {
    #[default]
    Static,
    RandomPop,
    Bounce,
}

impl PlacementMode {
    fn parse(raw: &str) -> Self {
        match raw {
            "random-pop" => Self::RandomPop,
            "bounce" => Self::Bounce,
            _ => Self::Static,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl Anchor {
    fn parse(raw: &str) -> Self {
        match raw {
            "top-right" => Self::TopRight,
            "bottom-left" => Self::BottomLeft,
            "bottom-right" => Self::BottomRight,
            "center" => Self::Center,
            _ => Self::TopLeft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// Immutable configuration snapshot. Controllers receive a full replace on
/// every change; numeric fields are always in range after `normalize`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub text: String,
    pub content_mode: ContentMode,
    pub mode: PlacementMode,
    pub color: String,
    pub opacity: f64,
    pub image_opacity: f64,
    pub image_data: String,
    pub image_scale_x: f64,
    pub image_scale_y: f64,
    pub image_maintain_ratio: bool,
    pub font_size: f64,
    pub font_family: String,
    pub static_position: Anchor,
    pub offset: Offset,
    pub random_interval_ms: f64,
    pub bounce_speed: f64,
    pub shadow: bool,
    pub debug: bool,
    pub hdr_enabled: bool,
    pub hdr_brightness: f64,
    pub hdr_contrast: f64,
    pub hdr_saturation: f64,
    pub hdr_warmth: f64,
    pub hdr_hue_rotate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            text: DEFAULT_TEXT.to_owned(),
            content_mode: ContentMode::Text,
            mode: PlacementMode::Static,
            color: DEFAULT_COLOR.to_owned(),
            opacity: 0.6,
            image_opacity: 0.6,
            image_data: String::new(),
            image_scale_x: 0.2,
            image_scale_y: 0.2,
            image_maintain_ratio: true,
            font_size: 18.0,
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            static_position: Anchor::TopLeft,
            offset: Offset { x: 8.0, y: 8.0 },
            random_interval_ms: 1200.0,
            bounce_speed: 80.0,
            shadow: true,
            debug: false,
            hdr_enabled: false,
            hdr_brightness: 1.12,
            hdr_contrast: 1.15,
            hdr_saturation: 1.3,
            hdr_warmth: 0.05,
            hdr_hue_rotate: 0.0,
        }
    }
}

impl Settings {
    /// Build a snapshot from a raw store object: documented defaults plus
    /// whatever keys the object carries, each coerced individually.
    pub fn from_store_object(object: &SettingsPatch) -> Self {
        let mut settings = Self::default();
        settings.apply_patch(object);
        settings
    }

    /// Merge changed keys into this snapshot, then re-clamp. Unknown keys
    /// are ignored; a malformed value degrades that one field to its
    /// default instead of poisoning the snapshot.
    pub fn apply_patch(&mut self, patch: &SettingsPatch) {
        for (key, value) in patch {
            self.apply_key(key, value);
        }
        self.normalize();
    }

    fn apply_key(&mut self, key: &str, value: &Value) {
        let defaults = Self::default();
        match key {
            "enabled" => self.enabled = as_bool(value, defaults.enabled),
            "text" => self.text = as_string(value, &defaults.text),
            "contentMode" => {
                self.content_mode = ContentMode::parse(value.as_str().unwrap_or("text"));
            }
            "mode" => self.mode = PlacementMode::parse(value.as_str().unwrap_or("static")),
            "color" => self.color = as_string(value, &defaults.color),
            "opacity" => self.opacity = as_f64(value),
            "imageOpacity" => self.image_opacity = as_f64(value),
            "imageData" => self.image_data = value.as_str().unwrap_or_default().to_owned(),
            "imageScaleX" => self.image_scale_x = as_f64(value),
            "imageScaleY" => self.image_scale_y = as_f64(value),
            "imageMaintainRatio" => {
                self.image_maintain_ratio = as_bool(value, defaults.image_maintain_ratio);
            }
            "fontSize" => self.font_size = as_f64(value),
            "fontFamily" => self.font_family = as_string(value, &defaults.font_family),
            "staticPosition" => {
                self.static_position = Anchor::parse(value.as_str().unwrap_or("top-left"));
            }
            "offset" => {
                self.offset.x = as_f64(value.get("x").unwrap_or(&Value::Null));
                self.offset.y = as_f64(value.get("y").unwrap_or(&Value::Null));
            }
            "randomIntervalMs" => self.random_interval_ms = as_f64(value),
            "bounceSpeed" => self.bounce_speed = as_f64(value),
            "shadow" => self.shadow = as_bool(value, defaults.shadow),
            "debug" => self.debug = as_bool(value, defaults.debug),
            "hdrEnabled" => self.hdr_enabled = as_bool(value, defaults.hdr_enabled),
            "hdrBrightness" => self.hdr_brightness = as_f64(value),
            "hdrContrast" => self.hdr_contrast = as_f64(value),
            "hdrSaturation" => self.hdr_saturation = as_f64(value),
            "hdrWarmth" => self.hdr_warmth = as_f64(value),
            "hdrHueRotate" => self.hdr_hue_rotate = as_f64(value),
            _ => {}
        }
    }

    /// Coerce every field into its documented range. Invalid numerics
    /// (NaN from failed coercion, out-of-range values) become the default.
    pub fn normalize(&mut self) {
        let defaults = Self::default();
        if self.text.is_empty() {
            self.text = defaults.text.clone();
        }
        if self.color.is_empty() {
            self.color = defaults.color.clone();
        }
        if self.font_family.is_empty() {
            self.font_family = defaults.font_family.clone();
        }
        self.opacity = clamp_or(self.opacity, 0.0, 1.0, defaults.opacity);
        self.image_opacity = clamp_or(self.image_opacity, 0.0, 1.0, defaults.image_opacity);
        self.font_size = clamp_or(self.font_size, 8.0, 200.0, defaults.font_size);
        self.offset.x = clamp_or(self.offset.x, 0.0, 200.0, defaults.offset.x);
        self.offset.y = clamp_or(self.offset.y, 0.0, 200.0, defaults.offset.y);
        self.image_scale_x = clamp_or(self.image_scale_x, 0.05, 3.0, defaults.image_scale_x);
        self.image_scale_y = clamp_or(self.image_scale_y, 0.05, 3.0, defaults.image_scale_y);
        self.random_interval_ms = clamp_or(
            self.random_interval_ms,
            200.0,
            10_000.0,
            defaults.random_interval_ms,
        );
        self.bounce_speed = clamp_or(self.bounce_speed, 10.0, 500.0, defaults.bounce_speed);
        self.hdr_brightness = clamp_or(self.hdr_brightness, 0.5, 2.0, defaults.hdr_brightness);
        self.hdr_contrast = clamp_or(self.hdr_contrast, 0.5, 2.0, defaults.hdr_contrast);
        self.hdr_saturation = clamp_or(self.hdr_saturation, 0.0, 3.0, defaults.hdr_saturation);
        self.hdr_warmth = clamp_or(self.hdr_warmth, 0.0, 1.0, defaults.hdr_warmth);
        self.hdr_hue_rotate = clamp_or(self.hdr_hue_rotate, -180.0, 180.0, defaults.hdr_hue_rotate);
    }

    /// Serialize into the flat store object shape (camelCase keys, the
    /// image payload inline).
    pub fn to_store_object(&self) -> SettingsPatch {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => SettingsPatch::new(),
        }
    }
}

/// Form inputs arrive as strings; the store may hold either. Anything
/// unparseable becomes NaN, which `normalize` turns into the default.
fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(f64::NAN),
        Value::String(raw) => raw.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn as_bool(value: &Value, fallback: bool) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(raw) => match raw.as_str() {
            "true" => true,
            "false" => false,
            _ => fallback,
        },
        _ => fallback,
    }
}

fn as_string(value: &Value, fallback: &str) -> String {
    match value.as_str() {
        Some(raw) if !raw.is_empty() => raw.to_owned(),
        _ => fallback.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Anchor, ContentMode, PlacementMode, Settings, SettingsPatch};
    use serde_json::json;

    fn patch_of(pairs: &[(&str, serde_json::Value)]) -> SettingsPatch {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), value.clone()))
            .collect()
    }

    #[test]
    fn defaults_are_in_range() {
        let mut settings = Settings::default();
        let untouched = settings.clone();
        settings.normalize();
        assert_eq!(settings, untouched);
    }

    #[test]
    fn patch_coerces_string_numerics() {
        let mut settings = Settings::default();
        settings.apply_patch(&patch_of(&[
            ("fontSize", json!("42")),
            ("opacity", json!("0.3")),
        ]));
        assert_eq!(settings.font_size, 42.0);
        assert_eq!(settings.opacity, 0.3);
    }

    #[test]
    fn patch_degrades_malformed_numerics_to_defaults() {
        let mut settings = Settings::default();
        settings.apply_patch(&patch_of(&[
            ("fontSize", json!("huge")),
            ("bounceSpeed", json!(null)),
            ("offset", json!({ "x": "left", "y": 12 })),
        ]));
        assert_eq!(settings.font_size, 18.0);
        assert_eq!(settings.bounce_speed, 80.0);
        assert_eq!(settings.offset.x, 8.0);
        assert_eq!(settings.offset.y, 12.0);
    }

    #[test]
    fn patch_clamps_out_of_range_numerics() {
        let mut settings = Settings::default();
        settings.apply_patch(&patch_of(&[
            ("fontSize", json!(999)),
            ("imageScaleX", json!(0.0)),
            ("randomIntervalMs", json!(50)),
        ]));
        assert_eq!(settings.font_size, 200.0);
        assert_eq!(settings.image_scale_x, 0.05);
        assert_eq!(settings.random_interval_ms, 200.0);
    }

    #[test]
    fn unrecognized_enum_values_fall_back() {
        let mut settings = Settings::default();
        settings.apply_patch(&patch_of(&[
            ("mode", json!("orbit")),
            ("contentMode", json!("video")),
            ("staticPosition", json!("middle-out")),
        ]));
        assert_eq!(settings.mode, PlacementMode::Static);
        assert_eq!(settings.content_mode, ContentMode::Text);
        assert_eq!(settings.static_position, Anchor::TopLeft);
    }

    #[test]
    fn store_object_round_trips() {
        let mut settings = Settings::default();
        settings.mode = PlacementMode::Bounce;
        settings.static_position = Anchor::BottomRight;
        settings.text = "demo".to_owned();
        settings.hdr_enabled = true;

        let object = settings.to_store_object();
        assert_eq!(object.get("mode").and_then(|v| v.as_str()), Some("bounce"));
        assert_eq!(
            object.get("staticPosition").and_then(|v| v.as_str()),
            Some("bottom-right")
        );
        assert_eq!(Settings::from_store_object(&object), settings);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut settings = Settings::default();
        settings.apply_patch(&patch_of(&[("glitter", json!(true))]));
        assert_eq!(settings, Settings::default());
    }
}
