//! Encoder acceleration backends and their argument fragments.

use serde::{Deserialize, Serialize};

/// Hardware acceleration backend for the H.264 encode.
///
/// The set is closed on purpose: every variant has a known, tested argument
/// matrix. Picking a backend the host cannot service surfaces as an encoder
/// failure with the tool's own diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// CPU encode via libx264.
    #[default]
    Software,
    /// Linux VA-API hardware encode.
    Vaapi,
    /// NVIDIA NVENC hardware encode.
    Nvenc,
}

impl Backend {
    /// The ffmpeg video encoder name for this backend.
    pub fn encoder(&self) -> &'static str {
        match self {
            Backend::Software => "libx264",
            Backend::Vaapi => "h264_vaapi",
            Backend::Nvenc => "h264_nvenc",
        }
    }

    /// Input-side hardware setup arguments. Empty for software.
    pub fn hwaccel_args(&self) -> &'static [&'static str] {
        match self {
            Backend::Software => &[],
            Backend::Vaapi => &[
                "-hwaccel",
                "vaapi",
                "-hwaccel_device",
                "/dev/dri/renderD128",
                "-hwaccel_output_format",
                "vaapi",
            ],
            Backend::Nvenc => &[
                "-hwaccel",
                "cuda",
                "-hwaccel_output_format",
                "cuda",
                "-extra_hw_frames",
                "8",
            ],
        }
    }

    /// The video filter chain scaling to `height`. Height 0 keeps the source
    /// height (the scale filters treat 0 as "input dimension"); NVENC skips
    /// the filter entirely in that case.
    pub fn filter_chain(&self, height: u32) -> Option<String> {
        match self {
            Backend::Software => Some(format!("scale=-2:{height}")),
            Backend::Vaapi => Some(format!(
                "hwupload,scale_vaapi=format=nv12,scale_vaapi=-2:{height}"
            )),
            Backend::Nvenc => {
                if height > 0 {
                    Some(format!("scale_cuda=-2:{height}"))
                } else {
                    None
                }
            }
        }
    }

    /// Output-side quality arguments. `qp` 0 means "backend default": the
    /// software path falls back to CRF, NVENC switches to constant-QP mode
    /// with its own default. A non-zero `qp` is passed straight through.
    pub fn quality_args(&self, qp: u32) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();

        if qp > 0 {
            args.extend(["-qp".into(), qp.to_string()]);
        }

        match self {
            Backend::Software => {
                args.extend([
                    "-pix_fmt".into(),
                    "yuv420p".into(),
                    "-crf".into(),
                    "23".into(),
                    "-b:v".into(),
                    "0".into(),
                    "-tune".into(),
                    "film".into(),
                ]);
            }
            Backend::Vaapi => {
                // https://trac.ffmpeg.org/wiki/Hardware/VAAPI#AMDMesa
                args.extend(["-compression_level".into(), "0".into()]);
            }
            Backend::Nvenc => {
                if qp == 0 {
                    args.extend([
                        "-rc".into(),
                        "constqp".into(),
                        "-qp".into(),
                        "24".into(),
                        "-b:v".into(),
                        "0".into(),
                    ]);
                }
            }
        }

        args
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Backend::Software => "software",
            Backend::Vaapi => "vaapi",
            Backend::Nvenc => "nvenc",
        };
        write!(f, "{name}")
    }
}
