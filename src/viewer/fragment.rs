use std::sync::{Mutex, MutexGuard, PoisonError};

use handlebars::Handlebars;
use serde::Serialize;

use super::ViewerError;
use super::surface::{FrameProbe, ViewerContent, ViewerSurface};

const VIEWER_TEMPLATE: &str = "viewer";

/// Handlebars registry holding the viewer page template.
pub struct ViewerTemplates {
    registry: Handlebars<'static>,
}

impl ViewerTemplates {
    pub fn new() -> Result<Self, ViewerError> {
        let mut registry = Handlebars::new();
        registry
            .register_template_string(VIEWER_TEMPLATE, include_str!("../../templates/viewer.hbs"))
            .map_err(|e| ViewerError::Template(e.to_string()))?;

        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, data: &T) -> Result<String, ViewerError> {
        self.registry
            .render(VIEWER_TEMPLATE, data)
            .map_err(|e| ViewerError::Render(e.to_string()))
    }
}

/// State of the viewer fragment at a point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub status: String,
    pub content: ViewerContent,
    pub attached: bool,
}

/// In-memory viewer fragment, rendered to HTML through [`ViewerTemplates`].
#[derive(Debug)]
pub struct FragmentSurface {
    fragment: Mutex<Fragment>,
    probe: FrameProbe,
}

impl Default for FragmentSurface {
    fn default() -> Self {
        // Tandem pages are served from another origin, so their document is never readable.
        Self::with_probe(FrameProbe::CrossOrigin)
    }
}

impl FragmentSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a surface whose mounted frame reports `probe` when inspected.
    pub fn with_probe(probe: FrameProbe) -> Self {
        Self {
            fragment: Mutex::new(Fragment {
                status: String::new(),
                content: ViewerContent::Empty,
                attached: true,
            }),
            probe,
        }
    }

    pub fn snapshot(&self) -> Fragment {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Fragment> {
        self.fragment.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ViewerSurface for FragmentSurface {
    fn set_status(&self, text: &str) {
        self.lock().status = text.to_string();
    }

    fn clear(&self) {
        self.lock().content = ViewerContent::Empty;
    }

    fn mount_frame(&self, url: &str) {
        self.lock().content = ViewerContent::Frame {
            url: url.to_string(),
        };
    }

    fn show_fallback(&self, message: &str, link: &str) {
        self.lock().content = ViewerContent::Fallback {
            message: message.to_string(),
            link: link.to_string(),
        };
    }

    fn probe_frame(&self) -> FrameProbe {
        match self.lock().content {
            ViewerContent::Frame { .. } => self.probe,
            _ => FrameProbe::Missing,
        }
    }

    fn is_attached(&self) -> bool {
        self.lock().attached
    }

    fn detach(&self) {
        self.lock().attached = false;
    }
}
