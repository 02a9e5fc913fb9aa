use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub wake_lock: WakeLockConfig,
    #[serde(default)]
    pub progress: ProgressConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    #[serde(default)]
    pub keymap: KeymapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Auto-scroll engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Pixels per second at speed setting 1.0
    #[serde(default = "default_base_rate")]
    pub base_rate_px_per_sec: f64,
    /// Speed setting used when a session opens (0.0 - 5.0)
    #[serde(default = "default_speed")]
    pub default_speed: f64,
    /// Increment applied by the speed up/down keys
    #[serde(default = "default_speed_step")]
    pub speed_step: f64,
    /// Per-frame speed multiplier while decelerating (0.0 - 1.0, exclusive)
    #[serde(default = "default_damping_factor")]
    pub damping_factor: f64,
    /// Speed below which deceleration finishes
    #[serde(default = "default_stop_epsilon")]
    pub stop_epsilon: f64,
    /// Distance from the bottom that still counts as end-of-content
    #[serde(default = "default_end_tolerance")]
    pub end_tolerance_px: f64,
    /// Minimum interval between progress notifications
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
    /// Frame loop rate
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Upper bound on the elapsed time a single frame may consume
    #[serde(default = "default_max_frame_delta")]
    pub max_frame_delta_ms: u64,
    /// Consecutive stable layout passes required after a font size change
    #[serde(default = "default_settle_passes")]
    pub settle_passes: u32,
    /// Minimum interval between "manual scroll paused playback" notices
    #[serde(default = "default_user_notice_debounce")]
    pub user_notice_debounce_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            base_rate_px_per_sec: default_base_rate(),
            default_speed: default_speed(),
            speed_step: default_speed_step(),
            damping_factor: default_damping_factor(),
            stop_epsilon: default_stop_epsilon(),
            end_tolerance_px: default_end_tolerance(),
            progress_interval_ms: default_progress_interval(),
            frame_rate: default_frame_rate(),
            max_frame_delta_ms: default_max_frame_delta(),
            settle_passes: default_settle_passes(),
            user_notice_debounce_ms: default_user_notice_debounce(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Font size in pixels when a session opens
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    /// Increment applied by the font larger/smaller keys
    #[serde(default = "default_font_step")]
    pub font_step: f64,
    #[serde(default = "default_min_font_size")]
    pub min_font_size: f64,
    #[serde(default = "default_max_font_size")]
    pub max_font_size: f64,
    /// Line height as a multiple of the font size
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    /// Idle tick rate in milliseconds (used while not scrolling)
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            font_size: default_font_size(),
            font_step: default_font_step(),
            min_font_size: default_min_font_size(),
            max_font_size: default_max_font_size(),
            line_height: default_line_height(),
            tick_rate_ms: default_tick_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeLockConfig {
    /// Keep the display awake while scrolling
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Heartbeat interval for the fallback keep-awake mechanism
    #[serde(default = "default_fallback_interval")]
    pub fallback_interval_secs: u64,
}

impl Default for WakeLockConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            fallback_interval_secs: default_fallback_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Remember reading position per script
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Debounce interval between progress writes
    #[serde(default = "default_save_interval")]
    pub save_interval_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            save_interval_ms: default_save_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Record frame timing and log periodic reports
    #[serde(default)]
    pub fps_monitor: bool,
    #[serde(default = "default_fps_report_interval")]
    pub fps_report_interval_secs: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            fps_monitor: false,
            fps_report_interval_secs: default_fps_report_interval(),
        }
    }
}

/// Keymap configuration using Vim-style notation
/// Format: "j", "k", "<C-j>" (Ctrl+j), "<S-g>" (Shift+g), "<CR>" (Enter), "<Esc>", "<Space>", "<Up>"
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeymapConfig {
    /// Play / pause
    #[serde(default = "default_key_toggle")]
    pub toggle: String,
    /// Increase scroll speed
    #[serde(default = "default_key_speed_up")]
    pub speed_up: String,
    /// Decrease scroll speed
    #[serde(default = "default_key_speed_down")]
    pub speed_down: String,
    /// Jump back to the top of the script
    #[serde(default = "default_key_reset")]
    pub reset: String,
    /// Increase font size
    #[serde(default = "default_key_font_larger")]
    pub font_larger: String,
    /// Decrease font size
    #[serde(default = "default_key_font_smaller")]
    pub font_smaller: String,
    /// Manual scroll up (pauses playback)
    #[serde(default = "default_key_scroll_up")]
    pub scroll_up: String,
    /// Manual scroll down (pauses playback)
    #[serde(default = "default_key_scroll_down")]
    pub scroll_down: String,
    /// Quit the application
    #[serde(default = "default_key_quit")]
    pub quit: String,
}

impl Default for KeymapConfig {
    fn default() -> Self {
        Self {
            toggle: default_key_toggle(),
            speed_up: default_key_speed_up(),
            speed_down: default_key_speed_down(),
            reset: default_key_reset(),
            font_larger: default_key_font_larger(),
            font_smaller: default_key_font_smaller(),
            scroll_up: default_key_scroll_up(),
            scroll_down: default_key_scroll_down(),
            quit: default_key_quit(),
        }
    }
}

// Default keymap values (Vim-style notation)
fn default_key_toggle() -> String { "<Space>".to_string() }
fn default_key_speed_up() -> String { "<Up>".to_string() }
fn default_key_speed_down() -> String { "<Down>".to_string() }
fn default_key_reset() -> String { "0".to_string() }
fn default_key_font_larger() -> String { "+".to_string() }
fn default_key_font_smaller() -> String { "-".to_string() }
fn default_key_scroll_up() -> String { "k".to_string() }
fn default_key_scroll_down() -> String { "j".to_string() }
fn default_key_quit() -> String { "q".to_string() }

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("prompter")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_base_rate() -> f64 {
    60.0
}

fn default_speed() -> f64 {
    1.0
}

fn default_speed_step() -> f64 {
    0.25
}

fn default_damping_factor() -> f64 {
    0.9
}

fn default_stop_epsilon() -> f64 {
    0.05
}

fn default_end_tolerance() -> f64 {
    1.0
}

fn default_progress_interval() -> u64 {
    100
}

fn default_frame_rate() -> u32 {
    60
}

fn default_max_frame_delta() -> u64 {
    100
}

fn default_settle_passes() -> u32 {
    2
}

fn default_user_notice_debounce() -> u64 {
    1000
}

fn default_font_size() -> f64 {
    28.0
}

fn default_font_step() -> f64 {
    2.0
}

fn default_min_font_size() -> f64 {
    12.0
}

fn default_max_font_size() -> f64 {
    96.0
}

fn default_line_height() -> f64 {
    1.5
}

fn default_tick_rate() -> u64 {
    100
}

fn default_fallback_interval() -> u64 {
    30
}

fn default_save_interval() -> u64 {
    2000
}

fn default_fps_report_interval() -> u64 {
    5
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &std::path::Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from file or return defaults
    ///
    /// Range checks are left to `validate`, so logging can be set up
    /// first and record what it corrected.
    pub fn load_unvalidated() -> crate::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration text
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let mut config = Self::parse(content)?;
        config.validate();
        Ok(config)
    }

    fn parse(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the configuration file path
    /// Always uses ~/.config/prompter/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("prompter")
            .join("config.toml")
    }

    /// Get the reading progress file path
    pub fn progress_path(&self) -> PathBuf {
        self.data_dir().join("progress.json")
    }

    /// Get the log file path
    pub fn log_path(&self) -> PathBuf {
        self.data_dir().join("prompter.log")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }

    /// Pull out-of-range values back into the range the engine can honor
    pub fn validate(&mut self) {
        let scroll = &mut self.scroll;

        if !(scroll.damping_factor > 0.0 && scroll.damping_factor < 1.0) {
            warn!(value = scroll.damping_factor, "damping_factor must be in (0, 1), using default");
            scroll.damping_factor = default_damping_factor();
        }
        if !(scroll.stop_epsilon > 0.0) {
            warn!(value = scroll.stop_epsilon, "stop_epsilon must be positive, using default");
            scroll.stop_epsilon = default_stop_epsilon();
        }
        if !(scroll.base_rate_px_per_sec > 0.0) {
            warn!(value = scroll.base_rate_px_per_sec, "base_rate_px_per_sec must be positive, using default");
            scroll.base_rate_px_per_sec = default_base_rate();
        }
        if !scroll.end_tolerance_px.is_finite() || scroll.end_tolerance_px < 0.0 {
            scroll.end_tolerance_px = default_end_tolerance();
        }
        scroll.default_speed = crate::scroll::clamp_speed(scroll.default_speed);
        if !(scroll.speed_step > 0.0) {
            scroll.speed_step = default_speed_step();
        }
        scroll.frame_rate = scroll.frame_rate.clamp(30, 240);
        scroll.max_frame_delta_ms = scroll.max_frame_delta_ms.max(1);
        scroll.settle_passes = scroll.settle_passes.max(1);
        scroll.user_notice_debounce_ms = scroll.user_notice_debounce_ms.max(1000);

        let display = &mut self.display;
        if !(display.min_font_size > 0.0) {
            display.min_font_size = default_min_font_size();
        }
        if !(display.max_font_size >= display.min_font_size) {
            display.max_font_size = display.min_font_size.max(default_max_font_size());
        }
        if !display.font_size.is_finite() {
            display.font_size = default_font_size();
        }
        display.font_size = display.font_size.clamp(display.min_font_size, display.max_font_size);
        if !(display.line_height > 0.0) {
            display.line_height = default_line_height();
        }

        self.wake_lock.fallback_interval_secs = self.wake_lock.fallback_interval_secs.max(1);
        self.debug.fps_report_interval_secs = self.debug.fps_report_interval_secs.max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scroll.base_rate_px_per_sec, 60.0);
        assert_eq!(config.scroll.damping_factor, 0.9);
        assert_eq!(config.scroll.progress_interval_ms, 100);
        assert_eq!(config.scroll.settle_passes, 2);
        assert_eq!(config.display.font_size, 28.0);
        assert!(config.wake_lock.enabled);
        assert_eq!(config.keymap.toggle, "<Space>");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [scroll]
            base_rate_px_per_sec = 90.0

            [keymap]
            quit = "<Esc>"
            "#,
        )
        .unwrap();

        assert_eq!(config.scroll.base_rate_px_per_sec, 90.0);
        assert_eq!(config.scroll.frame_rate, 60);
        assert_eq!(config.keymap.quit, "<Esc>");
        assert_eq!(config.keymap.toggle, "<Space>");
    }

    #[test]
    fn test_validate_clamps_out_of_range() {
        let config = AppConfig::from_toml(
            r#"
            [scroll]
            damping_factor = 1.5
            default_speed = 9.0
            frame_rate = 10
            user_notice_debounce_ms = 200

            [display]
            font_size = 500.0
            "#,
        )
        .unwrap();

        assert_eq!(config.scroll.damping_factor, 0.9);
        assert_eq!(config.scroll.default_speed, 5.0);
        assert_eq!(config.scroll.frame_rate, 30);
        assert_eq!(config.scroll.user_notice_debounce_ms, 1000);
        assert_eq!(config.display.font_size, 96.0);
    }

    #[test]
    fn test_parse_defers_validation() {
        let mut config = AppConfig::parse("[scroll]\ndamping_factor = 1.5\n").unwrap();
        assert_eq!(config.scroll.damping_factor, 1.5);
        config.validate();
        assert_eq!(config.scroll.damping_factor, 0.9);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("[scroll\nbroken").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde(std::path::Path::new("/var/data"));
        assert_eq!(path, PathBuf::from("/var/data"));
    }
}
