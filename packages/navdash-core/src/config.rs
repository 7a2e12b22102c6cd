/// Dashboard settings defaults and change detection.
use crate::types::ConfigMap;

pub const KEY_TITLE: &str = "site.title";
pub const KEY_NAME: &str = "site.name";
pub const KEY_CUSTOM_CSS: &str = "site.customCss";
pub const KEY_BACKGROUND_IMAGE: &str = "site.backgroundImage";
pub const KEY_BACKGROUND_OPACITY: &str = "site.backgroundOpacity";
pub const KEY_ICON_API: &str = "site.iconApi";

pub const DEFAULT_ICON_API: &str = "https://www.faviconextractor.com/favicon/{domain}?larger=true";

/// Built-in settings, overlaid by whatever the server stores.
pub const DEFAULT_CONFIGS: &[(&str, &str)] = &[
    (KEY_TITLE, "Navigation"),
    (KEY_NAME, "Navigation"),
    (KEY_CUSTOM_CSS, ""),
    (KEY_BACKGROUND_IMAGE, ""),
    (KEY_BACKGROUND_OPACITY, "0.15"),
    (KEY_ICON_API, DEFAULT_ICON_API),
];

pub fn default_configs() -> ConfigMap {
    DEFAULT_CONFIGS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Defaults overlaid with stored values. Stored keys always win.
pub fn with_defaults(stored: ConfigMap) -> ConfigMap {
    let mut merged = default_configs();
    merged.extend(stored);
    merged
}

/// Key/value pairs in `edited` whose value differs from `current`
/// (including keys `current` does not have). Only these get written on save.
pub fn changed_settings(current: &ConfigMap, edited: &ConfigMap) -> Vec<(String, String)> {
    edited
        .iter()
        .filter(|(key, value)| current.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}
