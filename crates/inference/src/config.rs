use common::parse_var;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_MODEL_PATH: &str = "models/best.onnx";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.7;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;
pub const DEFAULT_INTRA_THREADS: usize = 4;
/// Upper bound on either side of the network input
pub const MAX_INPUT_SIDE: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
        }
    }
}

#[derive(Debug, Error)]
#[error("{0:?} is not a supported device. Use either `cpu` or `cuda`.")]
pub struct ParseDeviceError(String);

impl FromStr for Device {
    type Err = ParseDeviceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(ParseDeviceError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    /// One class name per line; overrides names embedded in the model
    pub class_names_path: Option<PathBuf>,
    /// Square network input; `None` defers to the model's `imgsz` metadata
    pub input_size: Option<(u32, u32)>,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub device: Device,
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            class_names_path: None,
            input_size: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
            device: Device::Cpu,
            intra_threads: DEFAULT_INTRA_THREADS,
        }
    }
}

impl DetectorConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let input_size = parse_var::<u32>("INPUT_SIZE")?.map(|size| (size, size));

        let mut device = parse_var::<Device>("DEVICE")?.unwrap_or(defaults.device);
        if device == Device::Cuda && gpu_hidden() {
            tracing::warn!("CUDA_VISIBLE_DEVICES=-1 hides every GPU, falling back to CPU");
            device = Device::Cpu;
        }

        let config = Self {
            model_path: parse_var::<PathBuf>("MODEL_PATH")?.unwrap_or(defaults.model_path),
            class_names_path: parse_var::<PathBuf>("CLASS_NAMES_PATH")?,
            input_size,
            confidence_threshold: parse_var("CONFIDENCE_THRESHOLD")?
                .unwrap_or(defaults.confidence_threshold),
            iou_threshold: parse_var("IOU_THRESHOLD")?.unwrap_or(defaults.iou_threshold),
            max_detections: parse_var("MAX_DETECTIONS")?.unwrap_or(defaults.max_detections),
            device,
            intra_threads: parse_var("INTRA_THREADS")?.unwrap_or(defaults.intra_threads),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            anyhow::bail!(
                "CONFIDENCE_THRESHOLD must be within [0, 1], got {}",
                self.confidence_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            anyhow::bail!(
                "IOU_THRESHOLD must be within [0, 1], got {}",
                self.iou_threshold
            );
        }
        if self.max_detections == 0 {
            anyhow::bail!("MAX_DETECTIONS must be greater than 0");
        }
        if self.intra_threads == 0 {
            anyhow::bail!("INTRA_THREADS must be greater than 0");
        }
        if let Some(size) = self.input_size {
            check_input_size(size).map_err(|e| anyhow::anyhow!("INPUT_SIZE {e}"))?;
        }
        Ok(())
    }
}

/// Network input sides must be positive multiples of 32, at most
/// [`MAX_INPUT_SIDE`].
pub fn check_input_size((width, height): (u32, u32)) -> anyhow::Result<()> {
    let valid = |side: u32| side > 0 && side % 32 == 0 && side <= MAX_INPUT_SIDE;
    if !valid(width) || !valid(height) {
        anyhow::bail!(
            "must be a positive multiple of 32 no larger than {}, got {}x{}",
            MAX_INPUT_SIDE,
            width,
            height
        );
    }
    Ok(())
}

/// `CUDA_VISIBLE_DEVICES=-1` is the conventional way to force CPU execution
fn gpu_hidden() -> bool {
    env::var("CUDA_VISIBLE_DEVICES")
        .map(|v| v.trim() == "-1")
        .unwrap_or(false)
}
