//! Embeds the Tandem facility viewer in an iframe.
//!
//! The viewer URL comes from the configured facility URN or from the `tandem` deep-link
//! parameter. When the embed looks blocked, the viewer area is replaced with a direct link to
//! the facility.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

mod deep_link;
mod facility;
mod fragment;
mod surface;

pub use deep_link::{DeepLink, build_tandem_url};
pub use facility::{FacilityId, parse_facility_id};
pub use fragment::{Fragment, FragmentSurface, ViewerTemplates};
pub use surface::{FrameProbe, ViewerContent, ViewerSurface};

pub const DEFAULT_FACILITIES_BASE_URL: &str = "https://tandem.autodesk.com/pages/facilities";
/// Time given to the embed before checking whether it rendered anything.
pub const DEFAULT_FALLBACK_DELAY: Duration = Duration::from_millis(5000);

pub const NO_FACILITY_STATUS: &str =
    "No facility configured. Set a default facility URN to load the viewer.";
pub const LOADING_STATUS: &str = "Loading facility...";
pub const FALLBACK_MESSAGE: &str = "The Tandem viewer could not be embedded on this page.";
pub const FALLBACK_LINK_LABEL: &str = "Open the facility in Tandem";

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("registering viewer template: `{0}`")]
    Template(String),
    #[error("rendering viewer: `{0}`")]
    Render(String),
}

/// Settings recognised by the viewer embed.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// Facility loaded on start and on every reload, `urn:adsk.dtt:<facilityId>`.
    pub default_facility_urn: Option<String>,
    /// Prefix of the direct facility pages.
    pub facilities_base_url: String,
    pub fallback_delay: Duration,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_facility_urn: None,
            facilities_base_url: DEFAULT_FACILITIES_BASE_URL.to_string(),
            fallback_delay: DEFAULT_FALLBACK_DELAY,
        }
    }
}

impl ViewerConfig {
    /// Direct link to the facility page, ignoring any deep-link.
    pub fn facility_url(&self, facility_id: &FacilityId) -> String {
        deep_link::facility_url(&self.facilities_base_url, facility_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerState {
    Idle,
    /// The last load had no facility to show.
    Unavailable,
    Loading(FacilityId),
    Loaded(FacilityId),
    Fallback(FacilityId),
}

impl ViewerState {
    pub fn facility_id(&self) -> Option<&FacilityId> {
        match self {
            ViewerState::Loading(id) | ViewerState::Loaded(id) | ViewerState::Fallback(id) => {
                Some(id)
            }
            ViewerState::Idle | ViewerState::Unavailable => None,
        }
    }
}

pub struct ViewerEmbed<S: ViewerSurface> {
    config: ViewerConfig,
    deep_link: DeepLink,
    surface: Arc<S>,
    state: Arc<Mutex<ViewerState>>,
    pending_check: Option<CancellationToken>,
}

impl<S: ViewerSurface> ViewerEmbed<S> {
    pub fn new(config: ViewerConfig, deep_link: DeepLink, surface: Arc<S>) -> Self {
        Self {
            config,
            deep_link,
            surface,
            state: Arc::new(Mutex::new(ViewerState::Idle)),
            pending_check: None,
        }
    }

    pub fn state(&self) -> ViewerState {
        lock_state(&self.state).clone()
    }

    pub fn build_tandem_url(&self, facility_id: &FacilityId) -> String {
        build_tandem_url(
            &self.deep_link,
            &self.config.facilities_base_url,
            facility_id,
        )
    }

    /// Loads the facility referenced by `urn` into the viewer area.
    ///
    /// Without a facility the status line shows a warning and nothing else changes. Otherwise
    /// the iframe is mounted and a fallback check is scheduled after `fallback_delay`.
    pub fn load_facility(&mut self, urn: Option<&str>) -> ViewerState {
        self.cancel_pending_check();

        let Some(facility_id) = parse_facility_id(urn) else {
            debug!("no facility urn to load");
            self.surface.set_status(NO_FACILITY_STATUS);
            set_state(&self.state, ViewerState::Unavailable);
            return ViewerState::Unavailable;
        };

        let url = self.build_tandem_url(&facility_id);
        debug!(%facility_id, url = %url, "loading facility");

        self.surface.clear();
        self.surface.set_status(LOADING_STATUS);
        self.surface.mount_frame(&url);
        set_state(&self.state, ViewerState::Loading(facility_id.clone()));

        self.pending_check = self.schedule_fallback_check(facility_id.clone());
        ViewerState::Loading(facility_id)
    }

    /// Loads the configured default facility again.
    pub fn reload(&mut self) -> ViewerState {
        let urn = self.config.default_facility_urn.clone();
        self.load_facility(urn.as_deref())
    }

    /// The frame reported a successful load.
    pub fn frame_loaded(&self) {
        if mark_loaded(&self.state) {
            self.surface.set_status("");
        }
    }

    /// The frame reported a load error.
    pub fn frame_failed(&self) {
        let facility_id = match self.state() {
            ViewerState::Loading(id) | ViewerState::Loaded(id) => id,
            _ => return,
        };
        self.show_fallback(&facility_id);
    }

    pub fn show_fallback(&self, facility_id: &FacilityId) {
        enter_fallback(
            self.surface.as_ref(),
            &self.state,
            facility_id,
            &self.config.facility_url(facility_id),
        );
    }

    /// Stops any pending check and releases the surface.
    pub fn teardown(&mut self) {
        self.cancel_pending_check();
        self.surface.detach();
        set_state(&self.state, ViewerState::Idle);
    }

    fn cancel_pending_check(&mut self) {
        if let Some(token) = self.pending_check.take() {
            token.cancel();
        }
    }

    fn schedule_fallback_check(&self, facility_id: FacilityId) -> Option<CancellationToken> {
        let Ok(runtime) = Handle::try_current() else {
            warn!("no async runtime available, the embed fallback check is skipped");
            return None;
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let surface = Arc::clone(&self.surface);
        let state = Arc::clone(&self.state);
        let delay = self.config.fallback_delay;
        let direct_url = self.config.facility_url(&facility_id);

        runtime.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            if cancelled.is_cancelled() {
                return;
            }
            run_fallback_check(surface.as_ref(), &state, &facility_id, &direct_url);
        });

        Some(token)
    }
}

impl ViewerEmbed<FragmentSurface> {
    /// Renders the current fragment as an HTML page.
    pub fn render(&self, templates: &ViewerTemplates) -> Result<String, ViewerError> {
        let fragment = self.surface.snapshot();
        let state = self.state();

        let frame_url = match &fragment.content {
            ViewerContent::Frame { url } => Some(url.as_str()),
            _ => None,
        };
        let fallback = match &fragment.content {
            ViewerContent::Fallback { message, link } => {
                Some(json!({ "message": message, "link": link }))
            }
            _ => None,
        };
        let reload_label = match state {
            ViewerState::Idle => "Load facility",
            _ => "Reload",
        };

        templates.render(&json!({
            "status": fragment.status,
            "frame_url": frame_url,
            "fallback": fallback,
            "reload_label": reload_label,
            "direct_url": state.facility_id().map(|id| self.config.facility_url(id)),
            "fallback_delay_ms": u64::try_from(self.config.fallback_delay.as_millis()).unwrap_or(u64::MAX),
            "fallback_message": FALLBACK_MESSAGE,
            "fallback_label": FALLBACK_LINK_LABEL,
        }))
    }
}

impl<S: ViewerSurface> Drop for ViewerEmbed<S> {
    fn drop(&mut self) {
        self.cancel_pending_check();
    }
}

fn run_fallback_check<S: ViewerSurface + ?Sized>(
    surface: &S,
    state: &Mutex<ViewerState>,
    facility_id: &FacilityId,
    direct_url: &str,
) {
    if !surface.is_attached() {
        debug!(%facility_id, "viewer detached before the fallback check");
        return;
    }
    if !is_showing(state, facility_id) {
        debug!(%facility_id, "viewer moved on before the fallback check");
        return;
    }

    match surface.probe_frame() {
        FrameProbe::Blank => {
            debug!(%facility_id, "embedded document is empty, showing fallback");
            enter_fallback(surface, state, facility_id, direct_url);
        }
        FrameProbe::CrossOrigin => {
            // Unreadable document, assume the viewer loaded.
            surface.set_status("");
            mark_loaded(state);
        }
        FrameProbe::Rendered => {
            mark_loaded(state);
        }
        FrameProbe::Missing => {}
    }
}

fn enter_fallback<S: ViewerSurface + ?Sized>(
    surface: &S,
    state: &Mutex<ViewerState>,
    facility_id: &FacilityId,
    direct_url: &str,
) {
    surface.show_fallback(FALLBACK_MESSAGE, direct_url);
    surface.set_status("");
    set_state(state, ViewerState::Fallback(facility_id.clone()));
}

/// Whether the frame for `facility_id` is still loading or loaded.
fn is_showing(state: &Mutex<ViewerState>, facility_id: &FacilityId) -> bool {
    match &*lock_state(state) {
        ViewerState::Loading(id) | ViewerState::Loaded(id) => id == facility_id,
        _ => false,
    }
}

/// Moves a loading viewer to loaded, returning whether it did.
fn mark_loaded(state: &Mutex<ViewerState>) -> bool {
    let mut state = lock_state(state);
    let ViewerState::Loading(id) = &*state else {
        return false;
    };
    *state = ViewerState::Loaded(id.clone());
    true
}

fn set_state(state: &Mutex<ViewerState>, next: ViewerState) {
    *lock_state(state) = next;
}

fn lock_state(state: &Mutex<ViewerState>) -> std::sync::MutexGuard<'_, ViewerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
