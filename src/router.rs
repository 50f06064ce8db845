//! Path-based routes plus the transient state carried by a navigation.

use crate::visualizer::NavigationState;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    Visualizer { id: String },
}

impl Route {
    /// Unknown paths land on `Home`.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        match (segments.next(), segments.next(), segments.next()) {
            (Some("visualizer"), Some(id), None) => Route::Visualizer { id: id.to_owned() },
            _ => Route::Home,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_owned(),
            Route::Visualizer { id } => format!("/visualizer/{id}"),
        }
    }

    /// A visualizer route with a fresh id.
    pub fn new_visualizer() -> Self {
        Route::Visualizer { id: uuid::Uuid::new_v4().to_string() }
    }
}

/// Current route and the state handed over by the navigation that led there.
///
/// The state lives only in memory: reloading the page starts from the URL
/// alone.
#[derive(Debug, Default)]
pub struct Router {
    current: Route,
    state: Option<NavigationState>,
}

impl Router {
    pub fn new(initial: Route) -> Self {
        Self { current: initial, state: None }
    }

    /// Starts from the browser's location on wasm32, `Home` elsewhere.
    pub fn from_location() -> Self {
        Self::new(current_path().map(|p| Route::parse(&p)).unwrap_or_default())
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    pub fn state(&self) -> Option<&NavigationState> {
        self.state.as_ref()
    }

    pub fn navigate(&mut self, route: Route, state: Option<NavigationState>) {
        log::info!("Navigating to {}", route.path());
        push_history(&route.path());
        self.current = route;
        self.state = state;
    }

    /// Follows back/forward navigation done by the browser. The transient
    /// state does not survive that.
    pub fn sync_with_location(&mut self) {
        let Some(path) = current_path() else {
            return;
        };
        let route = Route::parse(&path);
        if route != self.current {
            log::debug!("Location changed to {path}");
            self.current = route;
            self.state = None;
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn current_path() -> Option<String> {
    web_sys::window()?.location().pathname().ok()
}

#[cfg(not(target_arch = "wasm32"))]
fn current_path() -> Option<String> {
    None
}

#[cfg(target_arch = "wasm32")]
fn push_history(path: &str) {
    let pushed = web_sys::window()
        .ok_or_else(|| wasm_bindgen::JsValue::from_str("no window"))
        .and_then(|w| w.history())
        .and_then(|h| h.push_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(path)));
    if let Err(err) = pushed {
        log::warn!("Could not update browser history: {err:?}");
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn push_history(_path: &str) {}
