#[cfg(feature = "kittest")]
mod gui_kittest_suite {
    use egui_kittest::Harness;
    use loudlab::kittest::{harness_default, harness_with_startup};
    use loudlab::{LoudnessEditor, StartupConfig};

    fn harness_with_dummies(count: usize) -> Harness<'static, LoudnessEditor> {
        let mut cfg = StartupConfig::default();
        cfg.dummy_list_count = Some(count);
        harness_with_startup(cfg)
    }

    #[test]
    fn empty_harness_lists_nothing() {
        let mut harness = harness_default();
        harness.run_steps(2);
        assert!(harness.state().files.is_empty());
        assert!(harness.state().root.is_none());
        assert!(!harness.state().probing());
    }

    #[test]
    fn dummy_list_populates_the_entry_map() {
        let mut harness = harness_with_dummies(5);
        harness.run_steps(2);
        assert_eq!(harness.state().files.len(), 5);
        assert_eq!(harness.state().entries.len(), 5);
        assert_eq!(harness.state().eligible_count(), 0);
        assert!(!harness.state().batch_running());
    }

    #[test]
    fn volume_edit_then_reserve_makes_an_entry_eligible() {
        let mut harness = harness_with_dummies(3);
        harness.run_steps(1);
        harness.state_mut().selected = Some(0);
        {
            let app = harness.state_mut();
            let entry = app.selected_entry_mut().expect("row 0 selected");
            let base = entry.mean_volume_db.expect("dummy entries carry a mean");
            entry.mean_volume_after_db = Some(base + 3.0);
        }
        harness.run_steps(1);
        harness.state_mut().reserve_current();
        harness.run_steps(1);
        assert_eq!(harness.state().eligible_count(), 1);
        let key = harness.state().selected_key().expect("selection kept");
        assert!(harness.state().entries[&key].reserved);
    }

    #[test]
    fn reserving_an_unchanged_entry_clears_the_flag() {
        let mut harness = harness_with_dummies(2);
        harness.run_steps(1);
        harness.state_mut().selected = Some(1);
        {
            let app = harness.state_mut();
            let entry = app.selected_entry_mut().expect("row 1 selected");
            entry.reserved = true;
        }
        harness.state_mut().reserve_current();
        harness.run_steps(1);
        let key = harness.state().selected_key().expect("selection kept");
        assert!(!harness.state().entries[&key].reserved);
        assert_eq!(harness.state().eligible_count(), 0);
    }

    #[test]
    fn apply_without_a_root_directory_is_a_noop() {
        let mut harness = harness_with_dummies(2);
        harness.run_steps(1);
        harness.state_mut().selected = Some(0);
        {
            let app = harness.state_mut();
            let entry = app.selected_entry_mut().expect("row 0 selected");
            entry.mean_volume_after_db = Some(-5.0);
            entry.reserved = true;
        }
        harness.state_mut().start_batch();
        harness.run_steps(1);
        assert!(!harness.state().batch_running());
        assert_eq!(harness.state().files.len(), 2, "dummy list must survive");
    }
}
