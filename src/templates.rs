pub const CMAKE_PRESETS_JSON: &str = include_str!("../templates/cmake_presets.json");
pub const VSCODE_SETTINGS_JSON: &str = include_str!("../templates/vscode_settings.json");
