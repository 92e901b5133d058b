use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::domain::{camera::FrameSize, model::YoloParams};

/// Top-level `conf.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default = "lane_frame")]
    pub frame: FrameSize,
    #[serde(default)]
    pub mosaic: MosaicConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    /// Lane sets in file order.
    #[serde(rename = "FOLDER_DETAILS", deserialize_with = "ordered_lane_sets")]
    pub lane_sets: Vec<(String, LaneSetConfig)>,
    #[serde(rename = "ARDUINO_CONFIGURATION", default)]
    pub controller: ControllerConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&contents).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(contents)?;
        for (name, lanes) in &config.lane_sets {
            lanes.source().with_context(|| format!("lane set `{name}`"))?;
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Publish rankings to the controller.
    pub controller: bool,
    /// Hand mosaics to the display.
    pub monitor: bool,
    pub skip_unreadable: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            controller: false,
            monitor: true,
            skip_unreadable: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub name: String,
    pub onnx_path: String,
    #[serde(flatten)]
    pub params: YoloParams,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "yolo11m".to_string(),
            onnx_path: "dnn_model/yolo11m.onnx".to_string(),
            params: YoloParams::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    pub width: u32,
    pub height: u32,
    /// TrueType font for status labels; without one only borders and boxes are drawn.
    pub font_path: Option<PathBuf>,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            width: FrameSize::MOSAIC.width,
            height: FrameSize::MOSAIC.height,
            font_path: None,
        }
    }
}

impl MosaicConfig {
    pub fn size(&self) -> FrameSize {
        FrameSize { width: self.width, height: self.height }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub output_dir: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("out") }
    }
}

/// One entry of `FOLDER_DETAILS`: a set of lanes scanned together.
#[derive(Debug, Clone, Deserialize)]
pub struct LaneSetConfig {
    /// Folder of `*.jpg` frames, one per lane.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// V4L2 devices, one per lane. Used instead of `path`.
    #[serde(default)]
    pub cameras: Vec<String>,
    #[serde(default = "enabled")]
    pub run: bool,
    /// Lay out the mosaic in rank order instead of capture order.
    #[serde(default)]
    pub sort: bool,
    #[serde(default = "enabled")]
    pub reverse: bool,
    #[serde(default = "enabled")]
    pub render_boxes: bool,
    #[serde(default)]
    pub conf: OutputFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LaneSource<'a> {
    Folder(&'a Path),
    Cameras(&'a [String]),
}

impl LaneSetConfig {
    pub fn source(&self) -> Result<LaneSource<'_>> {
        match (&self.path, self.cameras.is_empty()) {
            (Some(path), true) => Ok(LaneSource::Folder(path)),
            (None, false) => Ok(LaneSource::Cameras(&self.cameras)),
            (Some(_), false) => bail!("`path` and `cameras` are mutually exclusive"),
            (None, true) => bail!("either `path` or `cameras` is required"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputFlags {
    pub send: bool,
    pub show: bool,
}

impl Default for OutputFlags {
    fn default() -> Self {
        Self { send: true, show: true }
    }
}

/// `ARDUINO_CONFIGURATION`. Accepts the tagged form
/// `{ "kind": "serial" | "http", ... }` as well as the older nested serial form
/// `{ "auto_send", "keep_connection", "conf": { "port", "baudrate", "timeout" } }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "ControllerSection")]
pub struct ControllerConfig {
    /// When false the ranking is logged but not sent.
    pub auto_send: bool,
    pub link: LinkConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            auto_send: true,
            link: LinkConfig::Serial {
                port: PathBuf::from("/dev/ttyUSB0"),
                baudrate: default_baudrate(),
                timeout: link_timeout(),
                keep_connection: false,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ControllerSection {
    Nested {
        #[serde(default = "enabled")]
        auto_send: bool,
        #[serde(default)]
        keep_connection: bool,
        conf: SerialLine,
    },
    Tagged {
        #[serde(default = "enabled")]
        auto_send: bool,
        #[serde(flatten)]
        link: LinkConfig,
    },
}

#[derive(Deserialize)]
struct SerialLine {
    port: PathBuf,
    #[serde(default = "default_baudrate")]
    baudrate: u32,
    #[serde(default = "link_timeout")]
    timeout: u64,
}

impl From<ControllerSection> for ControllerConfig {
    fn from(section: ControllerSection) -> Self {
        match section {
            ControllerSection::Nested { auto_send, keep_connection, conf } => Self {
                auto_send,
                link: LinkConfig::Serial {
                    port: conf.port,
                    baudrate: conf.baudrate,
                    timeout: conf.timeout,
                    keep_connection,
                },
            },
            ControllerSection::Tagged { auto_send, link } => Self { auto_send, link },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LinkConfig {
    /// Device node, driven as 8N1 at `baudrate`.
    Serial {
        port: PathBuf,
        #[serde(default = "default_baudrate")]
        baudrate: u32,
        #[serde(default = "link_timeout")]
        timeout: u64,
        #[serde(default)]
        keep_connection: bool,
    },
    Http {
        url: String,
        #[serde(default = "link_timeout")]
        timeout: u64,
    },
}

fn enabled() -> bool {
    true
}

fn link_timeout() -> u64 {
    3
}

fn default_baudrate() -> u32 {
    9600
}

fn lane_frame() -> FrameSize {
    FrameSize::LANE
}

fn ordered_lane_sets<'de, D>(deserializer: D) -> Result<Vec<(String, LaneSetConfig)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = serde_json::Map::<String, Value>::deserialize(deserializer)?;
    map.into_iter()
        .map(|(name, value)| {
            serde_json::from_value(value)
                .map(|lanes| (name.clone(), lanes))
                .map_err(|e| serde::de::Error::custom(format!("lane set `{name}`: {e}")))
        })
        .collect()
}
