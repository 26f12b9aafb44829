use std::path::{Path, PathBuf};

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

use crate::vis::layout::ScaleMode;
use crate::vis::sorting::SortMethod;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub view: ViewConfig,
    pub layout: LayoutConfig,
    pub labelling: LabellingConfig,
    pub theme: ThemeConfig,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// JSON dataset opened when none is given on the command line
    pub path: Option<String>,
    /// Maildir used by `import_maildir` when none is given
    pub maildir: Option<String>,
}

impl DatasetConfig {
    pub fn path(&self) -> Option<PathBuf> {
        self.path.as_deref().map(expand)
    }

    pub fn maildir(&self) -> Option<PathBuf> {
        self.maildir.as_deref().map(expand)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ViewConfig {
    pub sort_method: SortMethod,
    pub scale_mode: ScaleMode,
    /// Overview only: also place each thread on the absolute time axis
    pub time_grouping: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 25.0,
            right: 10.0,
            bottom: 5.0,
            left: 5.0,
        }
    }
}

/// Pixel geometry of the timeline views.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    /// Height of one participant row
    pub person_height: f64,
    /// Space reserved left of the timeline for participant labels
    pub label_width: f64,
    pub radius: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 600.0,
            margin: Margin::default(),
            person_height: 16.0,
            label_width: 90.0,
            radius: 4.0,
        }
    }
}

impl LayoutConfig {
    pub fn inner_width(&self) -> f64 {
        self.width - self.margin.left - self.margin.right
    }

    pub fn inner_height(&self) -> f64 {
        self.height - self.margin.top - self.margin.bottom
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabellingConfig {
    /// Classification service queried with the current labels
    pub endpoint: String,
    /// Ask the service for threads worth labelling next
    pub recommend_samples: bool,
}

impl Default for LabellingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000/classify".to_string(),
            recommend_samples: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    // Base colors
    pub bg: String,
    pub fg: String,
    pub fg_muted: String,

    // Border colors
    pub border: String,
    pub border_active: String,

    // Accent colors
    pub primary: String,
    pub secondary: String,
    pub selected_bg: String,

    // Timeline
    pub sender: String,
    pub recipient: String,
    pub bcc: String,
    pub group: String,
    pub exclusion: String,
    pub highlight: String,
}

/// Capstan Cloud theme - warm earth tones with gold accents
impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            bg: "#1a1917".to_string(),
            fg: "#f7f7f5".to_string(),
            fg_muted: "#8c8985".to_string(),

            border: "#524f4c".to_string(),
            border_active: "#d4a366".to_string(), // primary

            primary: "#d4a366".to_string(),
            secondary: "#8fa5ae".to_string(), // blue
            selected_bg: "#393634".to_string(),

            sender: "#d4a366".to_string(),    // primary
            recipient: "#8fa5ae".to_string(), // secondary
            bcc: "#b48ead".to_string(),       // magenta
            group: "#88c0d0".to_string(),     // cyan
            exclusion: "#524f4c".to_string(), // border
            highlight: "#faad14".to_string(),
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("threadlet/config.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/threadlet/config.toml"))
    }

    /// Load the user config, falling back to defaults on any error.
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match Self::from_toml_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!(path = %path.display(), "config parse error: {e}"),
                },
                Err(e) => tracing::warn!(path = %path.display(), "config read error: {e}"),
            }
        }

        Self::default()
    }

    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

impl ThemeConfig {
    pub fn bg(&self) -> Color {
        parse_color(&self.bg)
    }
    pub fn fg(&self) -> Color {
        parse_color(&self.fg)
    }
    pub fn fg_muted(&self) -> Color {
        parse_color(&self.fg_muted)
    }
    pub fn border(&self) -> Color {
        parse_color(&self.border)
    }
    pub fn border_active(&self) -> Color {
        parse_color(&self.border_active)
    }
    pub fn primary(&self) -> Color {
        parse_color(&self.primary)
    }
    pub fn secondary(&self) -> Color {
        parse_color(&self.secondary)
    }
    pub fn selected_bg(&self) -> Color {
        parse_color(&self.selected_bg)
    }
    pub fn sender(&self) -> Color {
        parse_color(&self.sender)
    }
    pub fn recipient(&self) -> Color {
        parse_color(&self.recipient)
    }
    pub fn bcc(&self) -> Color {
        parse_color(&self.bcc)
    }
    pub fn group(&self) -> Color {
        parse_color(&self.group)
    }
    pub fn exclusion(&self) -> Color {
        parse_color(&self.exclusion)
    }
    pub fn highlight(&self) -> Color {
        parse_color(&self.highlight)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

/// Parse color string to ratatui Color
pub fn parse_color(s: &str) -> Color {
    // Try hex first (#RRGGBB)
    if s.starts_with('#') && s.len() == 7 {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&s[1..3], 16),
            u8::from_str_radix(&s[3..5], 16),
            u8::from_str_radix(&s[5..7], 16),
        ) {
            return Color::Rgb(r, g, b);
        }
    }

    match s.to_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "white" => Color::White,
        _ => Color::White,
    }
}
