use crate::ffmpeg::VolumeReport;

pub const SUPPORTED_EXTS: &[&str] = &["flac", "m4a", "mp3", "mp4"];

/// Bitrates offered in the target-bitrate combo regardless of the source.
pub const BITRATE_CHOICES: &[&str] = &["192K", "320K"];

pub const ADJUSTED_SUFFIX: &str = "_adjusted";

/// Containers a source extension may be transcoded into. The source itself is
/// always first so the combo starts on a no-op choice.
pub fn allowed_targets(ext: &str) -> &'static [&'static str] {
    match ext {
        "flac" => &["flac", "m4a"],
        "mp4" => &["mp4", "mp3", "m4a"],
        "mp3" => &["mp3", "m4a"],
        "m4a" => &["m4a", "mp3"],
        _ => &[],
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn db_eq(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => round2(a) == round2(b),
        (None, None) => true,
        _ => false,
    }
}

/// Per-file staging record: the probed originals plus the pending "after"
/// values the user edits. Keyed in the app by `file_name()`.
pub struct AudioEntry {
    pub stem: String,
    pub ext: String,
    pub mean_volume_db: Option<f64>,
    pub max_volume_db: Option<f64>,
    pub bitrate: Option<String>,

    pub stem_after: String,
    pub ext_after: String,
    pub bitrate_after: Option<String>,
    pub mean_volume_after_db: Option<f64>,

    pub reserved: bool,
}

impl AudioEntry {
    pub fn from_report(stem: &str, ext: &str, report: &VolumeReport) -> Self {
        let mean = report.mean_volume_db.map(round2);
        let max = report.max_volume_db.map(round2);
        // .mp4 sources always stage against 320K, whatever the probe said.
        let bitrate = if ext == "mp4" {
            Some("320K".to_string())
        } else {
            report.bitrate_kbps.map(|k| format!("{k}K"))
        };
        Self {
            stem: stem.to_string(),
            ext: ext.to_string(),
            mean_volume_db: mean,
            max_volume_db: max,
            bitrate: bitrate.clone(),
            stem_after: format!("{stem}{ADJUSTED_SUFFIX}"),
            ext_after: ext.to_string(),
            bitrate_after: bitrate,
            mean_volume_after_db: mean,
            reserved: false,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.stem, self.ext)
    }

    pub fn output_name(&self) -> String {
        format!("{}.{}", self.stem_after, self.ext_after)
    }

    /// True iff any "after" field differs from its original.
    pub fn is_changed(&self) -> bool {
        !db_eq(self.mean_volume_db, self.mean_volume_after_db)
            || self.ext != self.ext_after
            || self.bitrate != self.bitrate_after
    }

    /// Reserve button enablement: already reserved, or something to reserve.
    pub fn can_reserve(&self) -> bool {
        self.reserved || self.is_changed()
    }

    /// A batch apply only touches entries that are reserved and still differ
    /// from their originals.
    pub fn eligible(&self) -> bool {
        self.reserved && self.is_changed()
    }

    pub fn volume_gain_db(&self) -> f64 {
        match (self.mean_volume_after_db, self.mean_volume_db) {
            (Some(after), Some(before)) => round2(after - before),
            _ => 0.0,
        }
    }

    pub fn before_summary(&self) -> String {
        format!(
            "filename: {}\nvolume:\n  mean: {}\n  max: {}\nbitrate: {}",
            self.file_name(),
            fmt_db(self.mean_volume_db),
            fmt_db(self.max_volume_db),
            fmt_bitrate(self.bitrate.as_deref()),
        )
    }

    pub fn after_summary(&self) -> String {
        format!(
            "filename: {}\nvolume:\n  mean: {}\n  max: {}\nbitrate: {}",
            self.output_name(),
            fmt_db(self.mean_volume_after_db),
            fmt_db(self.max_volume_db),
            fmt_bitrate(self.bitrate_after.as_deref()),
        )
    }
}

fn fmt_db(v: Option<f64>) -> String {
    match v {
        Some(db) => format!("{db:.2} dB"),
        None => "n/a".to_string(),
    }
}

fn fmt_bitrate(v: Option<&str>) -> String {
    v.unwrap_or("n/a").to_string()
}
