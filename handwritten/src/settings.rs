use handwritten_core::canvas::{CanvasError, FrozenCanvas, DEFAULT_SNAPSHOT_SIZE};
use handwritten_core::color::Color;
use handwritten_core::stroke::{StrokeStyle, StyleError};

const DOCUMENTATION: &str = r#"# Handwritten settings. You may edit this file, but be aware that formatting and comments will not
# be preserved, and all keys are case sensitive.

# [pen]
# color = [r, g, b, a], each in 0.0..=1.0, straight alpha.
# width = base width in display units, must be positive.
# use_force = modulate width by pressure.
# use_shading = draw stylus strokes with the tilted nib.

# [canvas]
# width, height = size in display units.
# scale = device pixels per display unit.
# snapshot = edge of the exported square image, in pixels.

"#;

#[must_use]
pub fn preferences_dir() -> Option<std::path::PathBuf> {
    let mut base_dir = dirs::preference_dir()?;
    base_dir.push(env!("CARGO_PKG_NAME"));
    Some(base_dir)
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(default)]
pub struct PenSettings {
    pub color: [f32; 4],
    pub width: f32,
    pub use_force: bool,
    pub use_shading: bool,
}
impl Default for PenSettings {
    fn default() -> Self {
        let style = StrokeStyle::default();
        Self {
            color: style.color.as_array(),
            width: style.width(),
            use_force: style.use_force,
            use_shading: style.use_shading,
        }
    }
}
impl PenSettings {
    pub fn to_style(&self) -> Result<StrokeStyle, StyleError> {
        let color = Color::from_array(self.color).map_err(StyleError::Color)?;
        StrokeStyle::new(color, self.width, self.use_force, self.use_shading)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Debug)]
#[serde(default)]
pub struct CanvasSettings {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub snapshot: u32,
}
impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 512.0,
            height: 512.0,
            scale: 1.0,
            snapshot: DEFAULT_SNAPSHOT_SIZE,
        }
    }
}
impl CanvasSettings {
    pub fn to_canvas(&self) -> Result<FrozenCanvas, CanvasError> {
        FrozenCanvas::new(self.width, self.height, self.scale)
    }
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Debug, Default)]
#[serde(default)]
pub struct Settings {
    pub pen: PenSettings,
    pub canvas: CanvasSettings,
}
impl Settings {
    const FILENAME: &'static str = "settings.toml";
    /// Settings from user preferences, or defaulted if unavailable for some reason.
    #[must_use]
    pub fn load() -> Self {
        let mut dir = preferences_dir();
        match dir.as_mut() {
            None => Self::no_path(),
            Some(dir) => {
                dir.push(Self::FILENAME);
                Self::load_or_default(dir)
            }
        }
    }
    #[must_use]
    pub fn no_path() -> Self {
        log::warn!("Settings weren't available, defaulting.");
        Self::default()
    }
    #[must_use]
    fn load_or_default(path: &std::path::Path) -> Self {
        let settings: anyhow::Result<Self> = try_block::try_block! {
            let string = std::fs::read_to_string(path)?;
            let settings : Self = toml::from_str(&string)?;
            Ok(settings)
        };
        settings.unwrap_or_else(|_| Self::no_path())
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let mut preferences =
            preferences_dir().ok_or_else(|| anyhow::anyhow!("No preferences dir found"))?;
        // Not recursive. Real errors surface from the write below.
        let _ = std::fs::DirBuilder::new().create(&preferences);

        preferences.push(Self::FILENAME);
        let string = DOCUMENTATION.to_owned() + &toml::ser::to_string_pretty(self)?;
        std::fs::write(preferences, string)?;
        Ok(())
    }
}
