//! The `/visualizer/<id>` page: a title and the uploaded source image.

use std::collections::HashMap;

use anyhow::Context as _;
use eframe::egui;
use futures_channel::oneshot;

use crate::data_uri::DataUri;

pub const UNTITLED: &str = "Untitled Project";

/// Transient state attached to a navigation into the visualizer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub initial_image: Option<String>,
    pub name: Option<String>,
}

/// What the page shows, derived purely from the route inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualizerPage {
    pub id: String,
    pub title: String,
    pub source_image: Option<String>,
}

impl VisualizerPage {
    pub fn project(id: &str, state: Option<&NavigationState>) -> Self {
        let non_empty = |s: &Option<String>| s.as_deref().filter(|s| !s.is_empty()).map(str::to_owned);
        let name = state.and_then(|s| non_empty(&s.name));
        let source_image = state.and_then(|s| non_empty(&s.initial_image));
        Self {
            id: id.to_owned(),
            title: name.unwrap_or_else(|| UNTITLED.to_owned()),
            source_image,
        }
    }

    pub fn show(&self, ui: &mut egui::Ui, images: &mut ImageCache) {
        ui.heading(&self.title);
        ui.weak(format!("Project {}", self.id));
        ui.separator();

        let Some(src) = &self.source_image else {
            return;
        };
        ui.group(|ui| {
            ui.label(egui::RichText::new("Source Image").strong());
            match images.texture(ui.ctx(), src) {
                SourceImage::Loading => {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label("Loading image...");
                    });
                }
                SourceImage::Ready(texture) => {
                    ui.add(egui::Image::new(texture).max_size(ui.available_size()).shrink_to_fit());
                }
                SourceImage::Failed(err) => {
                    ui.colored_label(ui.visuals().error_fg_color, format!("Cannot display image: {err}"));
                }
            }
        });
    }
}

type Decoded = Result<egui::ColorImage, String>;

enum Entry {
    Pending(oneshot::Receiver<Decoded>),
    Ready(egui::TextureHandle),
    Failed(String),
}

/// Where a source image is in its decode.
pub enum SourceImage<'a> {
    Loading,
    Ready(&'a egui::TextureHandle),
    Failed(&'a str),
}

/// Decoded textures keyed by their source string.
///
/// Decoding runs off the UI thread; a lookup polls the pending result.
#[derive(Default)]
pub struct ImageCache {
    entries: HashMap<String, Entry>,
    loaded: usize,
}

impl ImageCache {
    pub fn texture(&mut self, ctx: &egui::Context, src: &str) -> SourceImage<'_> {
        let entry = self
            .entries
            .entry(src.to_owned())
            .or_insert_with(|| spawn_decode(ctx, src));

        if let Entry::Pending(rx) = entry {
            match rx.try_recv() {
                Ok(None) => {}
                Ok(Some(Ok(image))) => {
                    self.loaded += 1;
                    let name = format!("source-{}", self.loaded);
                    *entry = Entry::Ready(ctx.load_texture(name, image, Default::default()));
                }
                Ok(Some(Err(err))) => *entry = Entry::Failed(err),
                Err(oneshot::Canceled) => *entry = Entry::Failed("decoding was interrupted".to_owned()),
            }
        }

        match entry {
            Entry::Pending(_) => SourceImage::Loading,
            Entry::Ready(texture) => SourceImage::Ready(texture),
            Entry::Failed(err) => SourceImage::Failed(err),
        }
    }

    /// Drops every texture whose source is not in `keep`.
    pub fn retain(&mut self, keep: &[&str]) {
        self.entries.retain(|src, _| keep.contains(&src.as_str()));
    }
}

fn spawn_decode(ctx: &egui::Context, src: &str) -> Entry {
    let (tx, rx) = oneshot::channel();
    let src = src.to_owned();
    let ctx = ctx.clone();
    crate::execute(async move {
        let decoded = decode_image(&src).map_err(|err| {
            log::error!("Failed to decode source image: {err:#}");
            format!("{err:#}")
        });
        let _ = tx.send(decoded);
        ctx.request_repaint();
    });
    Entry::Pending(rx)
}

fn decode_image(src: &str) -> anyhow::Result<egui::ColorImage> {
    let bytes = DataUri::parse(src)?.decode()?;
    let image = image::load_from_memory(&bytes).context("unsupported image data")?.to_rgba8();
    let size = [image.width() as usize, image.height() as usize];
    Ok(egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}
