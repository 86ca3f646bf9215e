use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const COUNTIES_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/counties.json";
const EDUCATION_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/for_user_education.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub canvas: CanvasConfig,
    pub style: StyleConfig,
    pub legend: LegendConfig,
    pub tooltip: TooltipConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// URL or local path of the TopoJSON (or GeoJSON) county geometry.
    pub geometry: String,
    /// URL or local path of the education statistics array.
    pub statistics: String,
    /// Name of the object inside the topology holding the counties.
    pub geometry_object: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            geometry: COUNTIES_URL.to_string(),
            statistics: EDUCATION_URL.to_string(),
            geometry_object: "counties".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    /// Geometry is already in canvas coordinates.
    #[default]
    Identity,
    /// Scale the geometry bounds to fill the canvas.
    Fit,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
    pub projection: ProjectionKind,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
            projection: ProjectionKind::Identity,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StyleConfig {
    /// Ordered from lowest to highest bucket.
    pub palette: Vec<String>,
    /// Fill for counties without a statistics record.
    pub missing_color: String,
    pub stroke: Option<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            palette: ["#7dd3fc", "#38bdf8", "#0ea5e9", "#0284c7"]
                .into_iter()
                .map(String::from)
                .collect(),
            missing_color: "#d4d4d8".to_string(),
            stroke: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LegendConfig {
    /// One label per palette entry, same order.
    pub labels: Vec<String>,
    pub start_x: f64,
    pub start_y: f64,
    pub spacing: f64,
    pub swatch_size: f64,
    pub label_offset: f64,
}

impl Default for LegendConfig {
    fn default() -> Self {
        Self {
            labels: ["very low", "low", "normal", "high"]
                .into_iter()
                .map(String::from)
                .collect(),
            start_x: 25.0,
            start_y: 625.0,
            spacing: 20.0,
            swatch_size: 7.0,
            label_offset: 15.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct TooltipConfig {
    pub offset: f64,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self { offset: 7.0 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Html,
    Svg,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub title: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output/index.html"),
            format: OutputFormat::Html,
            title: "United States Educational Attainment".to_string(),
        }
    }
}

impl OutputConfig {
    /// Directory the server exposes as static files.
    pub fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.style.palette.is_empty() {
            return Err(anyhow!("style.palette must contain at least one color"));
        }
        if self.style.palette.len() != self.legend.labels.len() {
            return Err(anyhow!(
                "legend.labels has {} entries but style.palette has {}",
                self.legend.labels.len(),
                self.style.palette.len()
            ));
        }
        if !(self.canvas.width > 0.0 && self.canvas.height > 0.0) {
            return Err(anyhow!(
                "canvas size must be positive, got {}x{}",
                self.canvas.width,
                self.canvas.height
            ));
        }
        Ok(())
    }
}
