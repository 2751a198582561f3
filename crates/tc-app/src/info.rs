use std::io::{self, Write};

use tc_accel::detect::{GpuInfo, HwEncoders};

/// Liste des GPU détectés, un par ligne.
///
/// # Errors
/// Propagates I/O errors of `out`.
pub fn write_gpu_info<W: Write>(out: &mut W, gpus: &[GpuInfo]) -> io::Result<()> {
    if gpus.is_empty() {
        writeln!(out, "Aucun GPU détecté")?;
        return Ok(());
    }
    for (i, gpu) in gpus.iter().enumerate() {
        writeln!(out, "GPU {i}: {gpu}")?;
        if !gpu.driver_version.is_empty() {
            writeln!(out, "  pilote : {}", gpu.driver_version)?;
        }
        if gpu.compute_units > 0 {
            writeln!(out, "  unités de calcul : {}", gpu.compute_units)?;
        }
        if !gpu.apis.is_empty() {
            let apis: Vec<&str> = gpu.apis.iter().map(|a| a.tag()).collect();
            writeln!(out, "  API : {}", apis.join(", "))?;
        }
    }
    Ok(())
}

/// Résumé des capacités : meilleur GPU, encodeurs ffmpeg, backend actif.
///
/// # Errors
/// Propagates I/O errors of `out`.
pub fn write_capabilities<W: Write>(
    out: &mut W,
    best: &GpuInfo,
    encoders: &HwEncoders,
    backend: &str,
) -> io::Result<()> {
    writeln!(out, "GPU         : {best}")?;
    writeln!(out, "Backend     : {backend}")?;
    writeln!(
        out,
        "Encodeur HW : {}",
        if encoders.has_hw_encoder() { "oui" } else { "non" }
    )?;
    writeln!(out, "H.264       : {}", encoders.best_h264_encoder())?;
    writeln!(out, "HEVC        : {}", encoders.best_hevc_encoder())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_accel::detect::{ComputeApi, GpuVendor};

    fn to_string(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_gpu_list() {
        assert_eq!(to_string(|o| write_gpu_info(o, &[])), "Aucun GPU détecté\n");
    }

    #[test]
    fn gpu_details_are_listed() {
        let gpu = GpuInfo {
            vendor: GpuVendor::Nvidia,
            name: "RTX 3060".into(),
            driver_version: "535.104".into(),
            memory_mb: 12288,
            apis: vec![ComputeApi::Cuda, ComputeApi::OpenCl],
            ..GpuInfo::default()
        };
        let s = to_string(|o| write_gpu_info(o, &[gpu]));
        assert!(s.starts_with("GPU 0: NVIDIA RTX 3060 (12288 MB)\n"), "{s}");
        assert!(s.contains("535.104"));
        assert!(s.contains(ComputeApi::OpenCl.tag()));
        assert!(!s.contains("unités"));
    }

    #[test]
    fn capabilities_fall_back_to_software_encoders() {
        let s = to_string(|o| {
            write_capabilities(o, &GpuInfo::cpu_fallback(), &HwEncoders::default(), "CPU (multi-threaded, 4 threads)")
        });
        assert!(s.contains("libx264"));
        assert!(s.contains("libx265"));
        assert!(s.contains("non"));
        assert!(s.contains("CPU (multi-threaded, 4 threads)"));
    }
}
