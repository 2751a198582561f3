//! Détection matérielle : GPU par constructeur, encodeurs vidéo matériels.
//!
//! Each query shells out to the vendor tool and parses its text output.
//! A missing tool, a non-zero exit or unreadable output simply means
//! "not detected": nothing here returns an error.

use std::fmt;
use std::process::{Command, Stdio};

/// Constructeur GPU, dans l'ordre de priorité de détection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    /// Found through `nvidia-smi`.
    Nvidia,
    /// AMD/ATI display controller from `lspci`.
    Amd,
    /// Intel display controller from `lspci`.
    Intel,
    /// Apple Silicon, from `system_profiler`.
    Apple,
    /// Pseudo-entry returned when no GPU is found.
    Cpu,
    /// Vendeur non reconnu.
    Unknown,
}

impl GpuVendor {
    /// Display name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Nvidia => "NVIDIA",
            Self::Amd => "AMD",
            Self::Intel => "Intel",
            Self::Apple => "Apple",
            Self::Cpu => "CPU",
            Self::Unknown => "Unknown",
        }
    }
}

/// Compute API a vendor driver exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComputeApi {
    /// NVIDIA CUDA.
    Cuda,
    /// OpenCL, any vendor.
    OpenCl,
    /// Apple Metal.
    Metal,
}

impl ComputeApi {
    /// Tag used in diagnostics, e.g. `CUDA`.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Cuda => "CUDA",
            Self::OpenCl => "OpenCL",
            Self::Metal => "Metal",
        }
    }
}

/// Un GPU détecté.
///
/// # Example
/// ```
/// use tc_accel::detect::{ComputeApi, GpuInfo, GpuVendor};
/// let gpu = GpuInfo {
///     vendor: GpuVendor::Nvidia,
///     name: "RTX 3060".into(),
///     memory_mb: 12288,
///     apis: vec![ComputeApi::Cuda],
///     ..GpuInfo::default()
/// };
/// assert!(gpu.is_available());
/// assert!(gpu.supports(ComputeApi::Cuda));
/// assert_eq!(gpu.to_string(), "NVIDIA RTX 3060 (12288 MB)");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpuInfo {
    /// Vendeur détecté.
    pub vendor: GpuVendor,
    /// Model name as reported by the probing tool.
    pub name: String,
    /// Empty when the tool does not report it.
    pub driver_version: String,
    /// 0 when the tool does not report it.
    pub memory_mb: u64,
    /// 0 when the tool does not report it.
    pub compute_units: u32,
    /// Compute APIs the vendor normally exposes.
    pub apis: Vec<ComputeApi>,
}

impl Default for GpuInfo {
    fn default() -> Self {
        Self {
            vendor: GpuVendor::Unknown,
            name: String::new(),
            driver_version: String::new(),
            memory_mb: 0,
            compute_units: 0,
            apis: Vec::new(),
        }
    }
}

impl GpuInfo {
    /// Entrée factice quand aucun GPU n'est détecté.
    #[must_use]
    pub fn cpu_fallback() -> Self {
        Self {
            vendor: GpuVendor::Cpu,
            name: "CPU Fallback".to_string(),
            ..Self::default()
        }
    }

    /// A real device: neither the CPU pseudo-entry nor unknown.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.vendor, GpuVendor::Unknown | GpuVendor::Cpu)
    }

    /// `true` if `api` is listed for this GPU.
    #[must_use]
    pub fn supports(&self, api: ComputeApi) -> bool {
        self.apis.contains(&api)
    }

    /// Nom d'affichage du vendeur.
    #[must_use]
    pub fn vendor_name(&self) -> &'static str {
        self.vendor.name()
    }
}

impl fmt::Display for GpuInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.vendor_name())?;
        if !self.name.is_empty() {
            write!(f, " {}", self.name)?;
        }
        if self.memory_mb > 0 {
            write!(f, " ({} MB)", self.memory_mb)?;
        }
        Ok(())
    }
}

/// Run a tool and return its trimmed stdout, or `None` on any failure.
fn run_tool(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        log::debug!("{program} a échoué ({})", output.status);
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

/// Parse `nvidia-smi --query-gpu=… --format=csv,noheader` answers.
///
/// Only the first GPU is kept. A missing or empty name means no device.
///
/// # Example
/// ```
/// use tc_accel::detect::{parse_nvidia_smi, ComputeApi};
/// let gpu = parse_nvidia_smi("NVIDIA GeForce RTX 3060\n", "12288\n", "535.129.03\n").unwrap();
/// assert_eq!(gpu.memory_mb, 12288);
/// assert!(gpu.supports(ComputeApi::Cuda) && gpu.supports(ComputeApi::OpenCl));
/// assert!(parse_nvidia_smi("", "", "").is_none());
/// ```
#[must_use]
pub fn parse_nvidia_smi(name: &str, memory: &str, driver: &str) -> Option<GpuInfo> {
    let name = first_line(name)?;
    Some(GpuInfo {
        vendor: GpuVendor::Nvidia,
        name: name.to_string(),
        driver_version: first_line(driver).unwrap_or_default().to_string(),
        memory_mb: first_line(memory).and_then(|m| m.parse().ok()).unwrap_or(0),
        compute_units: 0,
        apis: vec![ComputeApi::Cuda, ComputeApi::OpenCl],
    })
}

/// Device name out of an `lspci` line.
///
/// `[..]` groups win (the last one when there are several, the first being
/// the vendor tag); otherwise the description after the class, minus the
/// revision suffix.
fn lspci_device_name(line: &str) -> Option<String> {
    let mut groups = Vec::new();
    let mut rest = line;
    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']') else {
            break;
        };
        groups.push(&rest[open + 1..open + close]);
        rest = &rest[open + close + 1..];
    }
    if let Some(name) = groups.last() {
        return Some((*name).to_string());
    }
    let (_, desc) = line.split_once(": ")?;
    let desc = desc.split(" (rev").next().unwrap_or(desc).trim();
    (!desc.is_empty()).then(|| desc.to_string())
}

/// Parse `lspci` output for the first display controller of `vendor`.
///
/// Recognised vendors: AMD (`amd` or `radeon`) and Intel (`intel`).
///
/// # Example
/// ```
/// use tc_accel::detect::{parse_lspci, GpuVendor};
/// let out = "00:02.0 VGA compatible controller: Intel Corporation UHD Graphics 620 (rev 07)\n";
/// let gpu = parse_lspci(out, GpuVendor::Intel).unwrap();
/// assert_eq!(gpu.name, "Intel Corporation UHD Graphics 620");
/// assert!(parse_lspci(out, GpuVendor::Amd).is_none());
/// ```
#[must_use]
pub fn parse_lspci(text: &str, vendor: GpuVendor) -> Option<GpuInfo> {
    let keywords: &[&str] = match vendor {
        GpuVendor::Amd => &["amd", "radeon"],
        GpuVendor::Intel => &["intel"],
        _ => return None,
    };
    let line = text.lines().find(|line| {
        let lower = line.to_lowercase();
        let is_display = ["vga", "display", "3d"].iter().any(|k| lower.contains(k));
        is_display && keywords.iter().any(|k| lower.contains(k))
    })?;
    Some(GpuInfo {
        vendor,
        name: lspci_device_name(line)?,
        apis: vec![ComputeApi::OpenCl],
        ..GpuInfo::default()
    })
}

/// Parse `system_profiler SPDisplaysDataType` ("Chipset Model: …").
///
/// # Example
/// ```
/// use tc_accel::detect::{parse_system_profiler, ComputeApi};
/// let out = "Graphics/Displays:\n\n    Apple M2:\n\n      Chipset Model: Apple M2\n      Type: GPU\n";
/// let gpu = parse_system_profiler(out).unwrap();
/// assert_eq!(gpu.name, "Apple M2");
/// assert!(gpu.supports(ComputeApi::Metal));
/// ```
#[must_use]
pub fn parse_system_profiler(text: &str) -> Option<GpuInfo> {
    let name = text.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "Chipset Model").then(|| value.trim())
    })?;
    if name.is_empty() {
        return None;
    }
    Some(GpuInfo {
        vendor: GpuVendor::Apple,
        name: name.to_string(),
        apis: vec![ComputeApi::Metal],
        ..GpuInfo::default()
    })
}

fn detect_nvidia() -> Option<GpuInfo> {
    let query = |field: &str, units: bool| {
        let format = if units {
            "--format=csv,noheader,nounits"
        } else {
            "--format=csv,noheader"
        };
        let field_arg = format!("--query-gpu={field}");
        run_tool("nvidia-smi", &[field_arg.as_str(), format]).unwrap_or_default()
    };
    let name = query("name", false);
    if name.is_empty() {
        return None;
    }
    parse_nvidia_smi(&name, &query("memory.total", true), &query("driver_version", false))
}

fn detect_lspci(vendor: GpuVendor) -> Option<GpuInfo> {
    parse_lspci(&run_tool("lspci", &[])?, vendor)
}

#[cfg(target_os = "macos")]
fn detect_apple() -> Option<GpuInfo> {
    parse_system_profiler(&run_tool("system_profiler", &["SPDisplaysDataType"])?)
}

#[cfg(not(target_os = "macos"))]
fn detect_apple() -> Option<GpuInfo> {
    None
}

/// Tous les GPU détectés, ordre : NVIDIA, AMD, Intel, Apple.
#[must_use]
pub fn detect_gpus() -> Vec<GpuInfo> {
    let gpus: Vec<GpuInfo> = [
        detect_nvidia(),
        detect_lspci(GpuVendor::Amd),
        detect_lspci(GpuVendor::Intel),
        detect_apple(),
    ]
    .into_iter()
    .flatten()
    .collect();
    log::debug!("GPU détectés : {}", gpus.len());
    gpus
}

/// Pick NVIDIA, then AMD, then Intel, then whatever came first.
///
/// # Example
/// ```
/// use tc_accel::detect::{best_gpu, GpuInfo, GpuVendor};
/// assert_eq!(best_gpu(&[]).vendor, GpuVendor::Cpu);
/// let gpus = [
///     GpuInfo { vendor: GpuVendor::Intel, ..GpuInfo::default() },
///     GpuInfo { vendor: GpuVendor::Amd, ..GpuInfo::default() },
/// ];
/// assert_eq!(best_gpu(&gpus).vendor, GpuVendor::Amd);
/// ```
#[must_use]
pub fn best_gpu(gpus: &[GpuInfo]) -> GpuInfo {
    [GpuVendor::Nvidia, GpuVendor::Amd, GpuVendor::Intel]
        .iter()
        .find_map(|v| gpus.iter().find(|g| g.vendor == *v))
        .or_else(|| gpus.first())
        .cloned()
        .unwrap_or_else(GpuInfo::cpu_fallback)
}

/// Famille de codec vidéo.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Codec {
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    Hevc,
}

impl Codec {
    /// ffmpeg software encoder used when no hardware path exists.
    #[must_use]
    pub fn software_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Hevc => "libx265",
        }
    }
}

/// Encodeurs vidéo matériels exposés par ffmpeg.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HwEncoders {
    /// `h264_nvenc` (NVIDIA).
    pub h264_nvenc: bool,
    /// `hevc_nvenc` (NVIDIA).
    pub hevc_nvenc: bool,
    /// `h264_qsv` (Intel Quick Sync).
    pub h264_qsv: bool,
    /// `hevc_qsv` (Intel Quick Sync).
    pub hevc_qsv: bool,
    /// `h264_vaapi` (Linux VA-API).
    pub h264_vaapi: bool,
    /// `hevc_vaapi` (Linux VA-API).
    pub hevc_vaapi: bool,
    /// `h264_videotoolbox` (macOS).
    pub h264_videotoolbox: bool,
    /// `hevc_videotoolbox` (macOS).
    pub hevc_videotoolbox: bool,
}

impl HwEncoders {
    /// Parse `ffmpeg -encoders` output. Flags are set on exact encoder names.
    ///
    /// # Example
    /// ```
    /// use tc_accel::detect::HwEncoders;
    /// let out = " V....D h264_nvenc  NVIDIA NVENC H.264 encoder (codec h264)\n \
    ///            V....D hevc_vaapi  H.265/HEVC (VAAPI) (codec hevc)\n";
    /// let enc = HwEncoders::parse(out);
    /// assert_eq!(enc.best_h264_encoder(), "h264_nvenc");
    /// assert_eq!(enc.best_hevc_encoder(), "hevc_vaapi");
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut enc = Self::default();
        for name in text.lines().filter_map(|l| l.split_whitespace().nth(1)) {
            let flag = match name {
                "h264_nvenc" => &mut enc.h264_nvenc,
                "hevc_nvenc" => &mut enc.hevc_nvenc,
                "h264_qsv" => &mut enc.h264_qsv,
                "hevc_qsv" => &mut enc.hevc_qsv,
                "h264_vaapi" => &mut enc.h264_vaapi,
                "hevc_vaapi" => &mut enc.hevc_vaapi,
                "h264_videotoolbox" => &mut enc.h264_videotoolbox,
                "hevc_videotoolbox" => &mut enc.hevc_videotoolbox,
                _ => continue,
            };
            *flag = true;
        }
        enc
    }

    /// nvenc > qsv > vaapi > videotoolbox > logiciel, par codec.
    #[must_use]
    pub fn best_encoder(&self, codec: Codec) -> &'static str {
        let candidates = match codec {
            Codec::H264 => [
                (self.h264_nvenc, "h264_nvenc"),
                (self.h264_qsv, "h264_qsv"),
                (self.h264_vaapi, "h264_vaapi"),
                (self.h264_videotoolbox, "h264_videotoolbox"),
            ],
            Codec::Hevc => [
                (self.hevc_nvenc, "hevc_nvenc"),
                (self.hevc_qsv, "hevc_qsv"),
                (self.hevc_vaapi, "hevc_vaapi"),
                (self.hevc_videotoolbox, "hevc_videotoolbox"),
            ],
        };
        candidates
            .into_iter()
            .find_map(|(present, name)| present.then_some(name))
            .unwrap_or(codec.software_encoder())
    }

    /// First available H.264 encoder, `libx264` otherwise.
    #[must_use]
    pub fn best_h264_encoder(&self) -> &'static str {
        self.best_encoder(Codec::H264)
    }

    /// First available HEVC encoder, `libx265` otherwise.
    #[must_use]
    pub fn best_hevc_encoder(&self) -> &'static str {
        self.best_encoder(Codec::Hevc)
    }

    /// `true` if any hardware encoder was found.
    #[must_use]
    pub fn has_hw_encoder(&self) -> bool {
        *self != Self::default()
    }
}

/// Sonde `ffmpeg -hide_banner -encoders`. Absent ou en échec : aucun encodeur.
#[must_use]
pub fn detect_hw_encoders() -> HwEncoders {
    let enc = run_tool("ffmpeg", &["-hide_banner", "-encoders"])
        .map(|out| HwEncoders::parse(&out))
        .unwrap_or_default();
    log::debug!("encodeurs matériels : {enc:?}");
    enc
}
