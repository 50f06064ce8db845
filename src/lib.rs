pub mod auth;
pub mod config;
pub mod data_uri;
pub mod router;
pub mod upload;
pub mod visualizer;

use eframe::egui;
use std::{cell::RefCell, future::Future, rc::Rc};

use auth::{AuthProvider, LocalAuth};
use config::AppConfig;
use data_uri::DataUri;
use router::{Route, Router};
use upload::UploadWidget;
use visualizer::{ImageCache, NavigationState, VisualizerPage};

pub struct FloorplanApp {
    config: AppConfig,
    auth: Box<dyn AuthProvider>,
    router: Router,
    upload: UploadWidget,
    /// Filled by the upload widget's completion callback, drained once per frame.
    handoff: Rc<RefCell<Option<DataUri>>>,
    images: ImageCache,
}

impl FloorplanApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self::with_parts(AppConfig::load(), Box::new(LocalAuth::new()), Router::from_location())
    }

    pub fn with_parts(config: AppConfig, mut auth: Box<dyn AuthProvider>, router: Router) -> Self {
        match auth.refresh_auth() {
            Ok(signed_in) => log::debug!("Auth refreshed, signed in: {signed_in}"),
            Err(err) => log::warn!("Could not refresh auth: {err:#}"),
        }
        let handoff = Rc::new(RefCell::new(None));
        Self {
            upload: new_upload_widget(&config, &handoff),
            config,
            auth,
            router,
            handoff,
            images: ImageCache::default(),
        }
    }

    /// Moves a finished upload into the visualizer and resets the widget.
    fn take_handoff(&mut self) {
        let Some(data_uri) = self.handoff.borrow_mut().take() else {
            return;
        };
        let name = self
            .upload
            .uploader()
            .file()
            .map(|f| project_name(&f.name).to_owned());
        self.router.navigate(
            Route::new_visualizer(),
            Some(NavigationState {
                initial_image: Some(data_uri.into_string()),
                name,
            }),
        );
        // Dropping the old widget disposes its session.
        self.upload = new_upload_widget(&self.config, &self.handoff);
    }

    fn top_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Floor Plan Visualizer");
            if ui.button("Home").clicked() && self.router.current() != &Route::Home {
                self.router.navigate(Route::Home, None);
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let result = if self.auth.state().is_signed_in {
                    let clicked = ui.button("Sign out").clicked();
                    if let Some(user) = &self.auth.state().user_name {
                        ui.label(format!("Signed in as {user}"));
                    }
                    if clicked { Some(self.auth.sign_out()) } else { None }
                } else if ui.button("Sign in").clicked() {
                    Some(self.auth.sign_in())
                } else {
                    None
                };
                if let Some(Err(err)) = result {
                    log::error!("Authentication failed: {err:#}");
                }
            });
        });
    }
}

impl eframe::App for FloorplanApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.show(ctx);
    }
}

impl FloorplanApp {
    /// One frame of the whole app.
    pub fn show(&mut self, ctx: &egui::Context) {
        self.router.sync_with_location();
        self.take_handoff();

        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| self.top_bar(ui));

        egui::CentralPanel::default().show(ctx, |ui| match self.router.current().clone() {
            Route::Home => {
                self.images.retain(&[]);
                ui.vertical_centered(|ui| {
                    ui.add_space(24.0);
                    ui.heading("Upload your floor plan");
                    ui.label("Supports JPG and PNG");
                    ui.add_space(12.0);
                });
                self.upload.show(ui, self.auth.state());
            }
            Route::Visualizer { id } => {
                let page = VisualizerPage::project(&id, self.router.state());
                self.images.retain(&page.source_image.as_deref().into_iter().collect::<Vec<_>>());
                egui::ScrollArea::vertical().show(ui, |ui| page.show(ui, &mut self.images));
            }
        });
    }
}

fn new_upload_widget(config: &AppConfig, handoff: &Rc<RefCell<Option<DataUri>>>) -> UploadWidget {
    let slot = Rc::clone(handoff);
    UploadWidget::new(config.upload.clone()).with_on_complete(move |data_uri| {
        *slot.borrow_mut() = Some(data_uri);
    })
}

/// "ground-floor.png" -> "ground-floor"
fn project_name(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

// ── Web entry‑point ──
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    // Redirect `log` macros & panic messages to the browser console
    eframe::WebLogger::init(log::LevelFilter::Debug).ok();
    console_error_panic_hook::set_once();

    let canvas = web_sys::window()
        .ok_or("no window")?
        .document()
        .ok_or("no document")?
        .get_element_by_id("floorplan_canvas")
        .ok_or("missing #floorplan_canvas")?
        .dyn_into::<web_sys::HtmlCanvasElement>()?;

    eframe::WebRunner::new()
        .start(
            canvas,
            eframe::WebOptions::default(),
            Box::new(|cc| Ok(Box::new(FloorplanApp::new(cc)))),
        )
        .await?;

    Ok(())
}

// ── Native entry‑point ──
#[cfg(not(target_arch = "wasm32"))]
pub fn run_native() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    eframe::run_native(
        "Floor Plan Visualizer",
        eframe::NativeOptions::default(),
        Box::new(|cc| Ok(Box::new(FloorplanApp::new(cc)))),
    )
}

// Executes an async future without blocking the egui thread
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn execute<F: Future<Output = ()> + Send + 'static>(f: F) {
    std::thread::spawn(move || futures::executor::block_on(f));
}
#[cfg(target_arch = "wasm32")]
pub(crate) fn execute<F: Future<Output = ()> + 'static>(f: F) {
    wasm_bindgen_futures::spawn_local(f);
}
