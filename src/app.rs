use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::Duration;

use anyhow::Result;
use egui::{Align, Color32, FontId, Key, RichText, Sense, TextStyle, Visuals};
use egui_extras::TableBuilder;
use log::info;
use walkdir::WalkDir;

use crate::entry::{allowed_targets, round2, AudioEntry, BITRATE_CHOICES, SUPPORTED_EXTS};
use crate::ffmpeg::{AudioCodec, ConvertJob, VolumeReport};
use crate::jobs::{self, ConvertOutcome, JobPool, ProbeOutcome, ScanTarget};

#[derive(Clone, Default)]
pub struct StartupConfig {
    pub open_folder: Option<PathBuf>,
    pub threads: Option<usize>,
    pub dummy_list_count: Option<usize>,
}

pub struct LoudnessEditor {
    pub jobs: JobPool,
    pub root: Option<PathBuf>,
    /// Display order; keys into `entries`.
    pub files: Vec<String>,
    pub entries: HashMap<String, AudioEntry>,
    pub selected: Option<usize>,
    pub probe_rx: Option<Receiver<ProbeOutcome>>,
    pub probes_pending: usize,
    pub convert_rx: Option<Receiver<ConvertOutcome>>,
    pub converts_pending: usize,
    pub converts_total: usize,
}

impl LoudnessEditor {
    pub fn new(cc: &eframe::CreationContext<'_>, startup: StartupConfig) -> Result<Self> {
        let mut visuals = Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(20, 20, 23);
        visuals.widgets.inactive.bg_fill = Color32::from_rgb(28, 28, 32);
        visuals.panel_fill = Color32::from_rgb(18, 18, 20);
        cc.egui_ctx.set_visuals(visuals);
        let mut style = (*cc.egui_ctx.style()).clone();
        style
            .text_styles
            .insert(TextStyle::Body, FontId::proportional(15.0));
        style
            .text_styles
            .insert(TextStyle::Monospace, FontId::monospace(13.0));
        cc.egui_ctx.set_style(style);

        let mut app = Self {
            jobs: JobPool::new(startup.threads)?,
            root: None,
            files: Vec::new(),
            entries: HashMap::new(),
            selected: None,
            probe_rx: None,
            probes_pending: 0,
            convert_rx: None,
            converts_pending: 0,
            converts_total: 0,
        };
        if let Some(count) = startup.dummy_list_count {
            app.populate_dummy(count);
        } else if let Some(dir) = startup.open_folder {
            app.set_root(dir);
        }
        Ok(app)
    }

    #[cfg(feature = "kittest")]
    pub fn new_for_test(cc: &eframe::CreationContext<'_>, startup: StartupConfig) -> Result<Self> {
        Self::new(cc, startup)
    }

    pub fn set_root(&mut self, dir: PathBuf) {
        self.root = Some(dir);
        self.rescan();
    }

    /// Throw the whole map away and rebuild it from disk. Entries appear in
    /// the list as their probes complete.
    pub fn rescan(&mut self) {
        self.files.clear();
        self.entries.clear();
        self.selected = None;
        self.probe_rx = None;
        self.probes_pending = 0;
        let Some(root) = self.root.clone() else {
            return;
        };
        info!("scanning {}", root.display());
        let targets = scan_targets(&root);
        self.probes_pending = targets.len();
        if !targets.is_empty() {
            self.probe_rx = Some(jobs::spawn_probe_batch(&self.jobs, &root, targets));
        }
    }

    /// Synthetic entries for harness runs; never touches ffmpeg.
    pub fn populate_dummy(&mut self, count: usize) {
        self.root = None;
        self.files.clear();
        self.entries.clear();
        self.selected = None;
        for i in 0..count {
            let report = VolumeReport {
                mean_volume_db: Some(-20.0 - (i % 7) as f64),
                max_volume_db: Some(-2.5),
                bitrate_kbps: Some(if i % 2 == 0 { 192 } else { 320 }),
            };
            let entry = AudioEntry::from_report(&format!("dummy_{i:03}"), "mp3", &report);
            self.files.push(entry.file_name());
            self.entries.insert(entry.file_name(), entry);
        }
        self.files.sort();
    }

    pub fn probing(&self) -> bool {
        self.probes_pending > 0
    }

    pub fn batch_running(&self) -> bool {
        self.converts_pending > 0
    }

    pub fn eligible_count(&self) -> usize {
        self.entries.values().filter(|e| e.eligible()).count()
    }

    pub fn selected_key(&self) -> Option<String> {
        self.selected.and_then(|i| self.files.get(i).cloned())
    }

    pub fn selected_entry_mut(&mut self) -> Option<&mut AudioEntry> {
        let key = self.selected_key()?;
        self.entries.get_mut(&key)
    }

    /// Reserve button: the flag follows change detection, so clicking with no
    /// pending change clears it again.
    pub fn reserve_current(&mut self) {
        if let Some(entry) = self.selected_entry_mut() {
            entry.reserved = entry.is_changed();
        }
    }

    /// Fan out one transcode per eligible entry.
    pub fn start_batch(&mut self) {
        if self.batch_running() {
            return;
        }
        let Some(root) = self.root.clone() else {
            return;
        };
        let planned = plan_conversions(&root, &self.entries);
        if planned.is_empty() {
            return;
        }
        info!("applying {} conversion(s)", planned.len());
        self.converts_total = planned.len();
        self.converts_pending = planned.len();
        self.convert_rx = Some(jobs::spawn_convert_batch(&self.jobs, planned));
    }

    fn sort_files_preserving_selection(&mut self) {
        let selected_key = self.selected_key();
        self.files.sort();
        self.selected = selected_key.and_then(|k| self.files.iter().position(|x| *x == k));
    }

    fn drain_workers(&mut self, ctx: &egui::Context) {
        let mut repaint = false;
        if let Some(rx) = &self.probe_rx {
            let mut arrived = Vec::new();
            while let Ok(outcome) = rx.try_recv() {
                arrived.push(outcome);
            }
            for outcome in arrived {
                self.probes_pending = self.probes_pending.saturating_sub(1);
                repaint = true;
                // Launch/exit failures were logged by the worker; the entry
                // simply never materializes.
                if let Ok(report) = outcome.result {
                    let entry = AudioEntry::from_report(&outcome.stem, &outcome.ext, &report);
                    let key = entry.file_name();
                    if self.entries.insert(key.clone(), entry).is_none() {
                        self.files.push(key);
                    }
                }
            }
            if repaint {
                self.sort_files_preserving_selection();
            }
            if self.probes_pending == 0 {
                self.probe_rx = None;
            }
        }
        if let Some(rx) = &self.convert_rx {
            let mut done = 0usize;
            while rx.try_recv().is_ok() {
                done += 1;
            }
            if done > 0 {
                self.converts_pending = self.converts_pending.saturating_sub(done);
                repaint = true;
            }
            if self.converts_pending == 0 {
                self.convert_rx = None;
                self.converts_total = 0;
                // Records are rebuilt wholesale from whatever is on disk now.
                self.rescan();
            }
        }
        if repaint {
            ctx.request_repaint();
        }
    }
}

impl eframe::App for LoudnessEditor {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_workers(ctx);

        let batch_running = self.batch_running();

        // Keyboard list navigation
        let len = self.files.len();
        if len > 0 && !batch_running {
            if ctx.input(|i| i.key_pressed(Key::ArrowDown)) {
                let next = match self.selected {
                    Some(i) => (i + 1).min(len - 1),
                    None => 0,
                };
                self.selected = Some(next);
            }
            if ctx.input(|i| i.key_pressed(Key::ArrowUp)) {
                let prev = match self.selected {
                    Some(i) if i > 0 => i - 1,
                    _ => 0,
                };
                self.selected = Some(prev);
            }
        }

        let eligible = self.eligible_count();
        let apply_enabled = eligible > 0 && !self.files.is_empty() && !batch_running;
        let mut open_dir: Option<PathBuf> = None;
        let mut reserve_clicked = false;
        let mut apply_clicked = false;

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal_wrapped(|ui| {
                if ui
                    .add_enabled(!batch_running, egui::Button::new("Open directory..."))
                    .clicked()
                {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        open_dir = Some(dir);
                    }
                }
                if let Some(root) = &self.root {
                    ui.label(RichText::new(format!("workspace: {}", root.display())).monospace());
                }
                ui.separator();
                if !self.files.is_empty() || self.probing() {
                    let label = if self.probing() {
                        format!("Files: {} ⏳", self.files.len())
                    } else {
                        format!("Files: {}", self.files.len())
                    };
                    ui.label(RichText::new(label).monospace());
                }
            });
        });

        egui::SidePanel::left("files")
            .resizable(true)
            .default_width(420.0)
            .show(ctx, |ui| {
                let text_height = egui::TextStyle::Body.resolve(ui.style()).size;
                let header_h = text_height * 1.6;
                let row_h = text_height * 1.4;
                let table = TableBuilder::new(ui)
                    .striped(true)
                    .resizable(true)
                    .sense(egui::Sense::click())
                    .cell_layout(egui::Layout::left_to_right(Align::Center))
                    .column(egui_extras::Column::initial(220.0).resizable(true))
                    .column(egui_extras::Column::initial(80.0).resizable(true))
                    .column(egui_extras::Column::initial(80.0).resizable(true))
                    .column(egui_extras::Column::initial(70.0).resizable(true))
                    .column(egui_extras::Column::remainder());

                table
                    .header(header_h, |mut header| {
                        header.col(|ui| {
                            ui.label(RichText::new("File").strong());
                        });
                        header.col(|ui| {
                            ui.label(RichText::new("Mean (dB)").strong());
                        });
                        header.col(|ui| {
                            ui.label(RichText::new("Max (dB)").strong());
                        });
                        header.col(|ui| {
                            ui.label(RichText::new("Bitrate").strong());
                        });
                        header.col(|_ui| {});
                    })
                    .body(|body| {
                        body.rows(row_h, self.files.len(), |mut row| {
                            let row_idx = row.index();
                            row.set_selected(self.selected == Some(row_idx));
                            let name = self.files[row_idx].clone();
                            let entry = self.entries.get(&name);
                            row.col(|ui| {
                                ui.add(
                                    egui::Label::new(RichText::new(name.as_str()))
                                        .sense(Sense::click())
                                        .truncate(),
                                );
                            });
                            row.col(|ui| {
                                let (rect, _resp) = ui.allocate_exact_size(
                                    egui::vec2(ui.available_width(), row_h * 0.9),
                                    Sense::hover(),
                                );
                                let db = entry.and_then(|e| e.mean_volume_db);
                                if let Some(db) = db {
                                    ui.painter().rect_filled(rect, 4.0, db_to_color(db));
                                }
                                let text =
                                    db.map(|v| format!("{v:.2}")).unwrap_or_else(|| "n/a".into());
                                let fid = TextStyle::Monospace.resolve(ui.style());
                                ui.painter().text(
                                    rect.center(),
                                    egui::Align2::CENTER_CENTER,
                                    text,
                                    fid,
                                    Color32::WHITE,
                                );
                            });
                            row.col(|ui| {
                                let text = entry
                                    .and_then(|e| e.max_volume_db)
                                    .map(|v| format!("{v:.2}"))
                                    .unwrap_or_else(|| "n/a".into());
                                ui.label(RichText::new(text).monospace());
                            });
                            row.col(|ui| {
                                let text = entry
                                    .and_then(|e| e.bitrate.clone())
                                    .unwrap_or_else(|| "n/a".into());
                                ui.label(RichText::new(text).monospace());
                            });
                            row.col(|ui| {
                                let mut marks = String::new();
                                if let Some(e) = entry {
                                    if e.is_changed() {
                                        marks.push('*');
                                    }
                                    if e.reserved {
                                        marks.push('●');
                                    }
                                }
                                ui.label(RichText::new(marks).monospace());
                            });
                            if row.response().clicked() {
                                self.selected = Some(row_idx);
                            }
                        });
                    });
                if self.files.is_empty() && !self.probing() {
                    ui.label("Select a directory to list audio files");
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(key) = self.selected_key() else {
                ui.label("Select a file to stage edits");
                return;
            };
            let Some(entry) = self.entries.get_mut(&key) else {
                return;
            };

            ui.label(RichText::new(entry.before_summary()).monospace());
            ui.vertical_centered(|ui| {
                ui.label(RichText::new("↓").strong());
            });
            ui.label(RichText::new(entry.after_summary()).monospace());
            ui.separator();

            egui::Grid::new("edit_controls")
                .num_columns(2)
                .spacing([12.0, 8.0])
                .show(ui, |ui| {
                    ui.label("mean volume");
                    match entry.mean_volume_after_db {
                        Some(current) => {
                            let mut v = current;
                            let resp = ui.add_enabled(
                                !batch_running,
                                egui::DragValue::new(&mut v)
                                    .range(-100.0..=100.0)
                                    .speed(0.05)
                                    .fixed_decimals(2)
                                    .suffix(" dB"),
                            );
                            if resp.changed() {
                                entry.mean_volume_after_db = Some(round2(v));
                            }
                        }
                        None => {
                            // No probed baseline, nothing to offset against.
                            let mut v = 0.0f64;
                            ui.add_enabled(
                                false,
                                egui::DragValue::new(&mut v).fixed_decimals(2).suffix(" dB"),
                            );
                        }
                    }
                    ui.end_row();

                    ui.label("extension");
                    ui.add_enabled_ui(!batch_running, |ui| {
                        egui::ComboBox::from_id_salt("ext_after")
                            .selected_text(format!(".{}", entry.ext_after))
                            .show_ui(ui, |ui| {
                                for t in allowed_targets(&entry.ext) {
                                    ui.selectable_value(
                                        &mut entry.ext_after,
                                        (*t).to_string(),
                                        format!(".{t}"),
                                    );
                                }
                            });
                    });
                    ui.end_row();

                    ui.label("bitrate");
                    let bitrate_editable = entry.ext != "flac" && !batch_running;
                    ui.add_enabled_ui(bitrate_editable, |ui| {
                        let mut choices: Vec<String> = Vec::new();
                        if let Some(b) = &entry.bitrate_after {
                            choices.push(b.clone());
                        }
                        for c in BITRATE_CHOICES {
                            if !choices.iter().any(|x| x == c) {
                                choices.push((*c).to_string());
                            }
                        }
                        egui::ComboBox::from_id_salt("bitrate_after")
                            .selected_text(
                                entry.bitrate_after.clone().unwrap_or_else(|| "n/a".into()),
                            )
                            .show_ui(ui, |ui| {
                                for c in choices {
                                    ui.selectable_value(
                                        &mut entry.bitrate_after,
                                        Some(c.clone()),
                                        c,
                                    );
                                }
                            });
                    });
                    ui.end_row();
                });

            ui.separator();
            let reserve_enabled = entry.can_reserve() && !batch_running;
            let reserve_text = if entry.reserved { "Reserve ●" } else { "Reserve" };
            if ui
                .add_enabled(reserve_enabled, egui::Button::new(reserve_text))
                .clicked()
            {
                reserve_clicked = true;
            }
            let apply_text = if eligible > 0 {
                format!("Apply (total: {eligible})")
            } else {
                "Apply".to_string()
            };
            if ui
                .add_enabled(apply_enabled, egui::Button::new(apply_text))
                .clicked()
            {
                apply_clicked = true;
            }
        });

        if let Some(dir) = open_dir {
            self.set_root(dir);
        }
        if reserve_clicked {
            self.reserve_current();
        }
        if apply_clicked {
            self.start_batch();
        }

        // Modal overlay while a batch runs
        if self.batch_running() {
            use egui::{Id, LayerId, Order};
            let screen = ctx.screen_rect();
            egui::Area::new("batch_block_input".into())
                .order(Order::Foreground)
                .show(ctx, |ui| {
                    let _ = ui.allocate_rect(screen, Sense::click_and_drag());
                });
            let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("batch_layer")));
            painter.rect_filled(screen, 0.0, Color32::from_rgba_unmultiplied(0, 0, 0, 180));
            egui::Area::new("batch_center".into())
                .order(Order::Foreground)
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    egui::Frame::window(ui.style()).show(ui, |ui| {
                        ui.vertical_centered(|ui| {
                            ui.add(egui::Spinner::new());
                            let done = self.converts_total - self.converts_pending;
                            ui.label(
                                RichText::new(format!(
                                    "Converting... ({done}/{})",
                                    self.converts_total
                                ))
                                .strong(),
                            );
                        });
                    });
                });
        }

        if self.probing() || self.batch_running() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

/// Depth-1 scan of the chosen directory for supported containers.
pub fn scan_targets(root: &Path) -> Vec<ScanTarget> {
    let mut targets = Vec::new();
    for entry in WalkDir::new(root).max_depth(1).follow_links(false) {
        let Ok(e) = entry else { continue };
        if !e.file_type().is_file() {
            continue;
        }
        let path = e.path();
        let (Some(stem), Some(ext)) = (
            path.file_stem().and_then(|s| s.to_str()),
            path.extension().and_then(|s| s.to_str()),
        ) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if SUPPORTED_EXTS.contains(&ext.as_str()) {
            targets.push(ScanTarget {
                stem: stem.to_string(),
                ext,
            });
        }
    }
    targets.sort_by(|a, b| (&a.stem, &a.ext).cmp(&(&b.stem, &b.ext)));
    targets
}

/// One ffmpeg invocation per eligible entry, in a stable order.
pub fn plan_conversions(root: &Path, entries: &HashMap<String, AudioEntry>) -> Vec<ConvertJob> {
    let mut planned: Vec<ConvertJob> = entries
        .values()
        .filter(|e| e.eligible())
        .map(|e| ConvertJob {
            source: root.join(e.file_name()),
            dest: root.join(e.output_name()),
            gain_db: e.volume_gain_db(),
            codec: if e.ext == "flac" {
                AudioCodec::CopyAlac
            } else {
                AudioCodec::Lossy {
                    bitrate: e.bitrate_after.clone(),
                }
            },
        })
        .collect();
    planned.sort_by(|a, b| a.source.cmp(&b.source));
    planned
}

fn db_to_color(db: f64) -> Color32 {
    let pts: &[(f64, Color32)] = &[
        (-60.0, Color32::from_rgb(20, 50, 110)),
        (-35.0, Color32::from_rgb(40, 100, 180)),
        (-18.0, Color32::from_rgb(80, 200, 255)),
        (-8.0, Color32::from_rgb(220, 220, 60)),
        (0.0, Color32::from_rgb(255, 70, 70)),
    ];
    let x = db.clamp(pts[0].0, pts[pts.len() - 1].0);
    for w in pts.windows(2) {
        let (x0, c0) = w[0];
        let (x1, c1) = w[1];
        if x >= x0 && x <= x1 {
            let t = if (x1 - x0).abs() < f64::EPSILON {
                0.0
            } else {
                (x - x0) / (x1 - x0)
            };
            return lerp_color(c0, c1, t as f32);
        }
    }
    pts[pts.len() - 1].1
}

fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let r = (a.r() as f32 + (b.r() as f32 - a.r() as f32) * t) as u8;
    let g = (a.g() as f32 + (b.g() as f32 - a.g() as f32) * t) as u8;
    let bl = (a.b() as f32 + (b.b() as f32 - a.b() as f32) * t) as u8;
    Color32::from_rgb(r, g, bl)
}
