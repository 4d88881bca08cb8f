use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::OnceLock;

use log::debug;
use regex::Regex;

pub const DEFAULT_PROGRAM: &str = "ffmpeg";

/// Resolved once per process; `LOUDLAB_FFMPEG` points at an alternate binary.
pub fn program() -> &'static str {
    static PROGRAM: OnceLock<String> = OnceLock::new();
    PROGRAM.get_or_init(|| {
        std::env::var("LOUDLAB_FFMPEG")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PROGRAM.to_string())
    })
}

#[derive(thiserror::Error, Debug)]
pub enum FfmpegError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status} for {path}")]
    Exit {
        program: String,
        status: ExitStatus,
        path: PathBuf,
    },
}

/// Loudness statistics scraped from a `volumedetect` run. Every field is
/// optional; whatever does not parse stays absent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolumeReport {
    pub mean_volume_db: Option<f64>,
    pub max_volume_db: Option<f64>,
    pub bitrate_kbps: Option<u32>,
}

fn mean_volume_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"mean_volume:\s(-?\d+\.\d+) dB").expect("mean_volume regex"))
}

fn max_volume_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"max_volume:\s(-?\d+\.\d+) dB").expect("max_volume regex"))
}

fn bitrate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"bitrate: (\d+) kb/s").expect("bitrate regex"))
}

pub fn parse_volumedetect(output: &str) -> VolumeReport {
    fn capture<T: std::str::FromStr>(re: &Regex, text: &str) -> Option<T> {
        re.captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
    VolumeReport {
        mean_volume_db: capture(mean_volume_re(), output),
        max_volume_db: capture(max_volume_re(), output),
        bitrate_kbps: capture(bitrate_re(), output),
    }
}

pub fn volumedetect_args(path: &Path) -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-i".into(),
        path.into(),
        "-af".into(),
        "volumedetect".into(),
        "-f".into(),
        "null".into(),
        "-".into(),
    ]
}

/// Run the volumedetect pass and scrape its stderr. The stream dump carries
/// the bitrate line, so the default loglevel stays on.
pub fn probe(path: &Path) -> Result<VolumeReport, FfmpegError> {
    let output = run_capture(&volumedetect_args(path), path)?;
    Ok(parse_volumedetect(&String::from_utf8_lossy(&output.stderr)))
}

#[derive(Clone, Debug, PartialEq)]
pub enum AudioCodec {
    /// flac sources: stream-copy video, re-encode audio as alac.
    CopyAlac,
    /// Everything else: let ffmpeg pick the codec from the container, with an
    /// optional audio bitrate cap.
    Lossy { bitrate: Option<String> },
}

/// One planned transcode: a single ffmpeg invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertJob {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub gain_db: f64,
    pub codec: AudioCodec,
}

pub fn transcode_args(job: &ConvertJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-nostdin".into(),
        "-i".into(),
        job.source.as_os_str().into(),
        "-af".into(),
        format!("volume={:.2}dB", job.gain_db).into(),
    ];
    match &job.codec {
        AudioCodec::CopyAlac => {
            args.push("-c:v".into());
            args.push("copy".into());
            args.push("-c:a".into());
            args.push("alac".into());
        }
        AudioCodec::Lossy { bitrate } => {
            if let Some(b) = bitrate {
                args.push("-b:a".into());
                args.push(b.as_str().into());
            }
        }
    }
    args.push(job.dest.as_os_str().into());
    args
}

pub fn run_transcode(job: &ConvertJob) -> Result<(), FfmpegError> {
    run_capture(&transcode_args(job), &job.source)?;
    Ok(())
}

fn run_capture(args: &[OsString], path: &Path) -> Result<std::process::Output, FfmpegError> {
    let program = program();
    debug!("{program} {:?}", args);
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| FfmpegError::Launch {
            program: program.to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(FfmpegError::Exit {
            program: program.to_string(),
            status: output.status,
            path: path.to_path_buf(),
        });
    }
    Ok(output)
}
