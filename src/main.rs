#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    floorplan_ui::run_native()
}

// The browser build starts through `floorplan_ui::start`.
#[cfg(target_arch = "wasm32")]
fn main() {}
