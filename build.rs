fn main() {
    #[cfg(target_os = "windows")]
    {
        windows_exe_info::versioninfo::VersionInfo::from_cargo_env_ex(
            Some("LoudLab Batch Loudness Editor"),
            Some("LoudLab"),
            None,
            None,
        )
        .link()
        .expect("failed to link version info");
    }
}
