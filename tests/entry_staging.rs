use loudlab::entry::{allowed_targets, AudioEntry, ADJUSTED_SUFFIX, SUPPORTED_EXTS};
use loudlab::ffmpeg::VolumeReport;

fn report(mean: f64, max: f64, kbps: u32) -> VolumeReport {
    VolumeReport {
        mean_volume_db: Some(mean),
        max_volume_db: Some(max),
        bitrate_kbps: Some(kbps),
    }
}

#[test]
fn fresh_entry_is_unchanged_and_not_reservable() {
    let e = AudioEntry::from_report("song", "mp3", &report(-17.5, -2.3, 320));
    assert!(!e.is_changed());
    assert!(!e.can_reserve());
    assert!(!e.eligible());
    assert_eq!(e.file_name(), "song.mp3");
    assert_eq!(e.output_name(), format!("song{ADJUSTED_SUFFIX}.mp3"));
}

#[test]
fn volume_edit_flips_change_detection_and_back() {
    let mut e = AudioEntry::from_report("song", "mp3", &report(-17.5, -2.3, 320));
    e.mean_volume_after_db = Some(-14.0);
    assert!(e.is_changed());
    assert!(e.can_reserve());
    e.mean_volume_after_db = Some(-17.5);
    assert!(!e.is_changed());
}

#[test]
fn extension_edit_flips_change_detection() {
    let mut e = AudioEntry::from_report("song", "mp3", &report(-17.5, -2.3, 320));
    e.ext_after = "m4a".to_string();
    assert!(e.is_changed());
    e.ext_after = "mp3".to_string();
    assert!(!e.is_changed());
}

#[test]
fn bitrate_edit_flips_change_detection() {
    let mut e = AudioEntry::from_report("song", "mp3", &report(-17.5, -2.3, 320));
    e.bitrate_after = Some("192K".to_string());
    assert!(e.is_changed());
    e.bitrate_after = Some("320K".to_string());
    assert!(!e.is_changed());
}

#[test]
fn reserve_flag_alone_does_not_make_an_entry_eligible() {
    let mut e = AudioEntry::from_report("song", "mp3", &report(-17.5, -2.3, 320));
    e.reserved = true;
    assert!(!e.eligible());
    assert!(e.can_reserve());
}

#[test]
fn reserved_entry_edited_back_to_original_drops_out_of_the_batch() {
    let mut e = AudioEntry::from_report("song", "mp3", &report(-17.5, -2.3, 320));
    e.mean_volume_after_db = Some(-12.0);
    e.reserved = true;
    assert!(e.eligible());
    e.mean_volume_after_db = Some(-17.5);
    assert!(!e.eligible());
    assert!(e.can_reserve(), "still reserved, so the button stays live");
}

#[test]
fn volume_gain_is_the_rounded_difference() {
    let mut e = AudioEntry::from_report("song", "mp3", &report(-23.456, -2.3, 320));
    // construction rounds the probed mean to 2 decimals
    assert_eq!(e.mean_volume_db, Some(-23.46));
    e.mean_volume_after_db = Some(-20.0);
    assert_eq!(e.volume_gain_db(), 3.46);
    e.mean_volume_after_db = Some(-30.0);
    assert_eq!(e.volume_gain_db(), -6.54);
}

#[test]
fn float_noise_below_two_decimals_is_not_a_change() {
    let mut e = AudioEntry::from_report("song", "mp3", &report(-17.5, -2.3, 320));
    e.mean_volume_after_db = Some(-17.5000001);
    assert!(!e.is_changed());
}

#[test]
fn mp4_sources_stage_against_320k() {
    let e = AudioEntry::from_report("clip", "mp4", &report(-20.0, -1.0, 1534));
    assert_eq!(e.bitrate.as_deref(), Some("320K"));
    assert_eq!(e.bitrate_after.as_deref(), Some("320K"));
}

#[test]
fn missing_report_fields_stay_absent() {
    let e = AudioEntry::from_report("song", "mp3", &VolumeReport::default());
    assert_eq!(e.mean_volume_db, None);
    assert_eq!(e.bitrate, None);
    assert!(!e.is_changed());
    assert!(e.before_summary().contains("n/a"));
}

#[test]
fn gain_without_a_probed_baseline_is_zero() {
    let e = AudioEntry::from_report("song", "mp3", &VolumeReport::default());
    assert_eq!(e.volume_gain_db(), 0.0);
}

#[test]
fn summaries_carry_filename_volume_and_bitrate() {
    let mut e = AudioEntry::from_report("song", "mp3", &report(-17.5, -2.3, 320));
    e.ext_after = "m4a".to_string();
    let before = e.before_summary();
    assert!(before.contains("filename: song.mp3"));
    assert!(before.contains("mean: -17.50 dB"));
    assert!(before.contains("max: -2.30 dB"));
    assert!(before.contains("bitrate: 320K"));
    let after = e.after_summary();
    assert!(after.contains(&format!("filename: song{ADJUSTED_SUFFIX}.m4a")));
}

#[test]
fn allowed_target_matrix_matches_the_container_rules() {
    assert_eq!(allowed_targets("flac"), ["flac", "m4a"]);
    assert_eq!(allowed_targets("mp4"), ["mp4", "mp3", "m4a"]);
    assert_eq!(allowed_targets("mp3"), ["mp3", "m4a"]);
    assert_eq!(allowed_targets("m4a"), ["m4a", "mp3"]);
    assert!(allowed_targets("wav").is_empty());
}

#[test]
fn every_supported_extension_has_targets_starting_with_itself() {
    for ext in SUPPORTED_EXTS {
        let targets = allowed_targets(ext);
        assert_eq!(targets.first(), Some(ext), "{ext} must be its own first target");
    }
}
