//! Theme colors and display preferences.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while editing, loading or importing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A color is not of the form `#rrggbb`.
    #[error("invalid color for {slot}: {value} (expected #rrggbb)")]
    InvalidColor {
        /// Palette slot.
        slot: &'static str,
        /// Rejected value.
        value: String,
    },
    /// No palette slot with that name.
    #[error("unknown color slot: {0}")]
    UnknownSlot(String),
    /// No predefined palette with that name.
    #[error("unknown palette: {0}")]
    UnknownPalette(String),
    /// Malformed settings document.
    #[error("malformed settings document: {0}")]
    Parse(#[source] serde_json::Error),
    /// Settings could not be encoded.
    #[error("failed to encode settings: {0}")]
    Encode(#[source] serde_json::Error),
    /// Settings file could not be read or written.
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Slot names in display order.
pub const COLOR_SLOTS: [&str; 9] = [
    "primary",
    "secondary",
    "background",
    "text",
    "navbar",
    "sidebar",
    "card",
    "border",
    "accent",
];

/// Full set of interface colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    /// Primary actions.
    pub primary: String,
    /// Secondary accents.
    pub secondary: String,
    /// Page background.
    pub background: String,
    /// Body text.
    pub text: String,
    /// Top bar.
    pub navbar: String,
    /// Side navigation.
    pub sidebar: String,
    /// Card background.
    pub card: String,
    /// Borders and dividers.
    pub border: String,
    /// Highlighted text.
    pub accent: String,
}

impl Default for ColorPalette {
    fn default() -> Self {
        PALETTES[0].colors()
    }
}

impl ColorPalette {
    fn slot_mut(&mut self, slot: &str) -> Option<(&'static str, &mut String)> {
        let normalized = slot.trim().to_ascii_lowercase();
        let name = COLOR_SLOTS.into_iter().find(|known| *known == normalized)?;
        let field = match name {
            "primary" => &mut self.primary,
            "secondary" => &mut self.secondary,
            "background" => &mut self.background,
            "text" => &mut self.text,
            "navbar" => &mut self.navbar,
            "sidebar" => &mut self.sidebar,
            "card" => &mut self.card,
            "border" => &mut self.border,
            _ => &mut self.accent,
        };
        Some((name, field))
    }

    /// `(slot, color)` pairs in display order.
    #[must_use]
    pub fn entries(&self) -> [(&'static str, &str); 9] {
        [
            ("primary", self.primary.as_str()),
            ("secondary", self.secondary.as_str()),
            ("background", self.background.as_str()),
            ("text", self.text.as_str()),
            ("navbar", self.navbar.as_str()),
            ("sidebar", self.sidebar.as_str()),
            ("card", self.card.as_str()),
            ("border", self.border.as_str()),
            ("accent", self.accent.as_str()),
        ]
    }

    /// Check every slot holds a `#rrggbb` color.
    ///
    /// # Errors
    /// Returns [`SettingsError::InvalidColor`] for the first bad slot.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (slot, value) in self.entries() {
            if !is_hex_color(value) {
                return Err(SettingsError::InvalidColor {
                    slot,
                    value: value.to_owned(),
                });
            }
        }
        Ok(())
    }
}

/// Whether `value` is a `#rrggbb` color.
#[must_use]
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Predefined palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Display name.
    pub name: &'static str,
    swatch: [&'static str; 9],
}

/// Palettes offered by the color customizer, default first.
pub const PALETTES: [Palette; 5] = [
    Palette {
        name: "Ocean",
        swatch: [
            "#1890ff", "#13c2c2", "#f0f5ff", "#000000", "#1890ff", "#13c2c2", "#ffffff", "#d9d9d9", "#40a9ff",
        ],
    },
    Palette {
        name: "Forest",
        swatch: [
            "#52c41a", "#389e0d", "#f6ffed", "#000000", "#52c41a", "#389e0d", "#ffffff", "#d9d9d9", "#73d13d",
        ],
    },
    Palette {
        name: "Sunset",
        swatch: [
            "#fa8c16", "#f5222d", "#fff7e6", "#000000", "#fa8c16", "#f5222d", "#ffffff", "#d9d9d9", "#ffa940",
        ],
    },
    Palette {
        name: "Royal",
        swatch: [
            "#722ed1", "#531dab", "#f9f0ff", "#000000", "#722ed1", "#531dab", "#ffffff", "#d9d9d9", "#9254de",
        ],
    },
    Palette {
        name: "Midnight",
        swatch: [
            "#141414", "#434343", "#000000", "#ffffff", "#141414", "#434343", "#1f1f1f", "#303030", "#595959",
        ],
    },
];

impl Palette {
    /// Look a palette up by name, ignoring case.
    #[must_use]
    pub fn find(name: &str) -> Option<Self> {
        let name = name.trim();
        PALETTES.into_iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Colors of this palette.
    #[must_use]
    pub fn colors(&self) -> ColorPalette {
        let [primary, secondary, background, text, navbar, sidebar, card, border, accent] =
            self.swatch.map(str::to_owned);
        ColorPalette {
            primary,
            secondary,
            background,
            text,
            navbar,
            sidebar,
            card,
            border,
            accent,
        }
    }
}

/// User preferences. Serialized as the settings export document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThemeSettings {
    /// Active colors.
    pub colors: ColorPalette,
    /// Dark mode toggle.
    #[serde(rename = "isDarkMode")]
    pub dark_mode: bool,
    /// Whether `colors` overrides the built-in theme.
    pub use_custom_colors: bool,
    /// Show notifications.
    pub notifications: bool,
    /// Save edits without confirmation.
    pub auto_save: bool,
    /// Dense layout.
    pub compact_mode: bool,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            colors: ColorPalette::default(),
            dark_mode: false,
            use_custom_colors: false,
            notifications: true,
            auto_save: true,
            compact_mode: false,
        }
    }
}

impl ThemeSettings {
    /// Switch to a predefined palette and enable custom colors.
    pub fn apply_palette(&mut self, palette: Palette) {
        self.colors = palette.colors();
        self.use_custom_colors = true;
    }

    /// Switch to a palette by name.
    ///
    /// # Errors
    /// Returns [`SettingsError::UnknownPalette`] when no palette matches.
    pub fn apply_palette_named(&mut self, name: &str) -> Result<(), SettingsError> {
        let palette = Palette::find(name).ok_or_else(|| SettingsError::UnknownPalette(name.to_owned()))?;
        self.apply_palette(palette);
        Ok(())
    }

    /// Override one slot.
    ///
    /// # Errors
    /// Returns [`SettingsError::UnknownSlot`] or [`SettingsError::InvalidColor`].
    pub fn set_color(&mut self, slot: &str, value: &str) -> Result<(), SettingsError> {
        let (name, field) = self
            .colors
            .slot_mut(slot)
            .ok_or_else(|| SettingsError::UnknownSlot(slot.to_owned()))?;
        let value = value.trim();
        if !is_hex_color(value) {
            return Err(SettingsError::InvalidColor {
                slot: name,
                value: value.to_owned(),
            });
        }
        value.to_ascii_lowercase().clone_into(field);
        self.use_custom_colors = true;
        Ok(())
    }

    /// Encode as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns [`SettingsError::Encode`] if serialization fails.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        serde_json::to_string_pretty(self).map_err(SettingsError::Encode)
    }

    /// Decode and validate a settings document.
    ///
    /// # Errors
    /// Returns [`SettingsError::Parse`] or [`SettingsError::InvalidColor`].
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(raw).map_err(SettingsError::Parse)?;
        settings.colors.validate()?;
        Ok(settings)
    }

    /// Replace these settings with an imported document. On error nothing changes.
    ///
    /// # Errors
    /// See [`ThemeSettings::from_json`].
    pub fn import_json(&mut self, raw: &str) -> Result<(), SettingsError> {
        *self = Self::from_json(raw)?;
        Ok(())
    }

    /// Read settings from `path`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    /// Returns an error when the file exists but cannot be read or decoded.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Write settings to `path`.
    ///
    /// # Errors
    /// Returns an error when encoding or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_palettes_are_valid() {
        for palette in PALETTES {
            palette
                .colors()
                .validate()
                .unwrap_or_else(|err| panic!("{} palette: {err}", palette.name));
        }
    }

    #[test]
    fn palettes_are_found_case_insensitively() {
        assert_eq!(Palette::find("sunset").map(|p| p.name), Some("Sunset"));
        assert_eq!(Palette::find(" MIDNIGHT ").map(|p| p.name), Some("Midnight"));
        assert!(Palette::find("neon").is_none());
    }

    #[test]
    fn applying_a_palette_enables_custom_colors() {
        let mut settings = ThemeSettings::default();
        settings
            .apply_palette_named("forest")
            .unwrap_or_else(|err| panic!("apply palette: {err}"));
        assert!(settings.use_custom_colors);
        assert_eq!(settings.colors.primary, "#52c41a");
        assert!(matches!(
            settings.apply_palette_named("neon"),
            Err(SettingsError::UnknownPalette(_))
        ));
    }

    #[test]
    fn set_color_validates_slot_and_value() {
        let mut settings = ThemeSettings::default();
        settings
            .set_color("Accent", "#ABCDEF")
            .unwrap_or_else(|err| panic!("set color: {err}"));
        assert_eq!(settings.colors.accent, "#abcdef");
        assert!(matches!(
            settings.set_color("accent", "blue"),
            Err(SettingsError::InvalidColor { slot: "accent", .. })
        ));
        assert!(matches!(
            settings.set_color("shadow", "#000000"),
            Err(SettingsError::UnknownSlot(_))
        ));
    }

    #[test]
    fn export_uses_camel_case_keys() {
        let json = ThemeSettings::default()
            .to_json()
            .unwrap_or_else(|err| panic!("encode: {err}"));
        let value: serde_json::Value =
            serde_json::from_str(&json).unwrap_or_else(|err| panic!("decode: {err}"));
        assert_eq!(value["isDarkMode"], false);
        assert_eq!(value["autoSave"], true);
        assert_eq!(value["compactMode"], false);
        assert_eq!(value["colors"]["navbar"], "#1890ff");
    }

    #[test]
    fn failed_import_leaves_settings_untouched() {
        let mut settings = ThemeSettings::default();
        settings.compact_mode = true;
        let before = settings.clone();

        assert!(matches!(settings.import_json("{ broken"), Err(SettingsError::Parse(_))));
        let bad_color = r##"{"colors":{"primary":"red","secondary":"#000000","background":"#000000","text":"#000000","navbar":"#000000","sidebar":"#000000","card":"#000000","border":"#000000","accent":"#000000"}}"##;
        assert!(matches!(
            settings.import_json(bad_color),
            Err(SettingsError::InvalidColor { slot: "primary", .. })
        ));
        assert_eq!(settings, before);
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let mut settings = ThemeSettings::default();
        settings
            .import_json(r#"{"isDarkMode": true, "notifications": false}"#)
            .unwrap_or_else(|err| panic!("import: {err}"));
        assert!(settings.dark_mode);
        assert!(!settings.notifications);
        assert!(settings.auto_save);
        assert_eq!(settings.colors, ColorPalette::default());
    }
}
