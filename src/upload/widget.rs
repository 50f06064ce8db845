use eframe::egui;
use futures_channel::oneshot;
use web_time::Instant;

use crate::auth::AuthState;
use crate::config::UploadConfig;
use crate::data_uri::DataUri;

use super::file::PickedFile;
use super::session::{Effect, Interaction, Uploader};
use super::UploadError;

type EncodeResult = Result<DataUri, UploadError>;

/// Drop zone + progress display around an [`Uploader`].
///
/// Drives the uploader from egui input, runs encodes and the file dialog off
/// the UI thread, and schedules repaints for the progress timer.
pub struct UploadWidget {
    uploader: Uploader,
    encoding: Option<(u64, oneshot::Receiver<EncodeResult>)>,
    picking: Option<oneshot::Receiver<Option<PickedFile>>>,
}

impl UploadWidget {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            uploader: Uploader::new(config),
            encoding: None,
            picking: None,
        }
    }

    pub fn with_on_complete(mut self, on_complete: impl FnMut(DataUri) + 'static) -> Self {
        self.uploader = self.uploader.with_on_complete(on_complete);
        self
    }

    pub fn uploader(&self) -> &Uploader {
        &self.uploader
    }

    pub fn show(&mut self, ui: &mut egui::Ui, auth: &AuthState) {
        let ctx = ui.ctx().clone();
        let now = Instant::now();

        self.poll_picker(&ctx, auth);
        self.poll_encode(now);
        if self.uploader.file().is_none() {
            self.handle_drag_and_drop(&ctx, auth);
        }
        let effect = self.uploader.tick(now);
        self.apply(&ctx, effect);

        if let Some(at) = self.uploader.next_wakeup() {
            ctx.request_repaint_after(at.saturating_duration_since(now));
        }

        ui.vertical_centered(|ui| match self.uploader.file().cloned() {
            None => self.drop_zone(ui, auth),
            Some(file) => self.status(ui, &file.name),
        });
    }

    fn handle_drag_and_drop(&mut self, ctx: &egui::Context, auth: &AuthState) {
        let (hovering, dropped) =
            ctx.input(|i| (!i.raw.hovered_files.is_empty(), i.raw.dropped_files.clone()));

        let interaction = if !dropped.is_empty() {
            Interaction::Drop(dropped.iter().filter_map(picked_from_dropped).collect())
        } else if hovering && !self.uploader.is_dragging() {
            Interaction::DragOver
        } else if !hovering && self.uploader.is_dragging() {
            Interaction::DragLeave
        } else {
            return;
        };
        let effect = self.uploader.interact(auth, interaction);
        self.apply(ctx, effect);
    }

    fn apply(&mut self, ctx: &egui::Context, effect: Effect) {
        match effect {
            Effect::None => {}
            Effect::Encode { generation, file } => {
                let (tx, rx) = oneshot::channel();
                let ctx = ctx.clone();
                crate::execute(async move {
                    let result = file.encode().await;
                    // The widget may be gone already; nobody to tell then.
                    let _ = tx.send(result);
                    ctx.request_repaint();
                });
                self.uploader.encode_started(generation);
                self.encoding = Some((generation, rx));
            }
            Effect::Completed => ctx.request_repaint(),
        }
    }

    fn poll_encode(&mut self, now: Instant) {
        let Some((generation, rx)) = self.encoding.as_mut() else {
            return;
        };
        let generation = *generation;
        let result = match rx.try_recv() {
            Ok(None) => return,
            Ok(Some(result)) => result,
            Err(oneshot::Canceled) => {
                let name = self.uploader.file().map(|f| f.name.clone()).unwrap_or_default();
                Err(UploadError::Interrupted(name))
            }
        };
        self.encoding = None;
        self.uploader.encoded(generation, result, now);
    }

    fn poll_picker(&mut self, ctx: &egui::Context, auth: &AuthState) {
        let Some(rx) = self.picking.as_mut() else {
            return;
        };
        let picked = match rx.try_recv() {
            Ok(None) => return,
            Ok(Some(picked)) => picked,
            Err(oneshot::Canceled) => None,
        };
        self.picking = None;
        if let Some(file) = picked {
            let effect = self.uploader.interact(auth, Interaction::Select(file));
            self.apply(ctx, effect);
        }
    }

    fn open_picker(&mut self, ctx: &egui::Context) {
        if self.picking.is_some() {
            return;
        }
        let (tx, rx) = oneshot::channel();
        let exts = self.uploader.config().accepted_extensions.clone();
        let ctx = ctx.clone();
        crate::execute(async move {
            let picked = match rfd::AsyncFileDialog::new()
                .add_filter("Floor plan", exts.as_slice())
                .pick_file()
                .await
            {
                Some(handle) => Some(picked_from_handle(handle).await),
                None => None,
            };
            let _ = tx.send(picked);
            ctx.request_repaint();
        });
        self.picking = Some(rx);
    }

    fn drop_zone(&mut self, ui: &mut egui::Ui, auth: &AuthState) {
        let signed_in = auth.gate().is_some();
        let visuals = ui.visuals();
        let stroke = if self.uploader.is_dragging() {
            visuals.selection.stroke
        } else {
            visuals.widgets.noninteractive.bg_stroke
        };
        let error_color = visuals.error_fg_color;

        let frame = egui::Frame::group(ui.style())
            .stroke(stroke)
            .inner_margin(egui::Margin::same(24.0))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    ui.label(egui::RichText::new("⬆").size(28.0));
                    if signed_in {
                        ui.label("Click to upload or just drag and drop");
                    } else {
                        ui.label("Sign in or sign up to upload");
                    }
                    ui.small(format!(
                        "Maximum file size {}",
                        self.uploader.config().max_file_size_label()
                    ));
                });
            });

        let response = ui.interact(
            frame.response.rect,
            ui.id().with("upload_drop_zone"),
            if signed_in { egui::Sense::click() } else { egui::Sense::hover() },
        );
        if response.clicked() {
            self.open_picker(ui.ctx());
        }

        if let Some(notice) = self.uploader.notice() {
            ui.colored_label(error_color, notice.to_string());
        }
    }

    fn status(&self, ui: &mut egui::Ui, file_name: &str) {
        let progress = self.uploader.progress();
        egui::Frame::group(ui.style())
            .inner_margin(egui::Margin::same(24.0))
            .show(ui, |ui| {
                ui.set_min_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    let icon = if progress == 100 { "✔" } else { "🖼" };
                    ui.label(egui::RichText::new(icon).size(28.0));
                    ui.heading(file_name);
                    ui.add(egui::ProgressBar::new(f32::from(progress) / 100.0).show_percentage());
                    ui.label(if progress < 100 { "Analyzing Floor Plan..." } else { "Redirecting..." });
                });
            });
    }
}

// The dialog gives no media type; the extension filter makes inference safe.
#[cfg(not(target_arch = "wasm32"))]
async fn picked_from_handle(handle: rfd::FileHandle) -> PickedFile {
    // Size comes from metadata, so an oversized file is refused unread.
    PickedFile::from_path(handle.path().to_path_buf(), "")
}

#[cfg(target_arch = "wasm32")]
async fn picked_from_handle(handle: rfd::FileHandle) -> PickedFile {
    let name = handle.file_name();
    let bytes = handle.read().await;
    PickedFile::from_bytes(name, "", bytes)
}

fn picked_from_dropped(file: &egui::DroppedFile) -> Option<PickedFile> {
    if let Some(bytes) = &file.bytes {
        Some(PickedFile::from_bytes(file.name.clone(), &file.mime, bytes.clone()))
    } else {
        file.path.clone().map(|path| PickedFile::from_path(path, &file.mime))
    }
}
