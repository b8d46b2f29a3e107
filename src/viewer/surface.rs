/// Outcome of reading the mounted frame's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameProbe {
    /// No frame is mounted.
    Missing,
    /// Same-origin document with an empty body: the embed loaded nothing.
    Blank,
    /// Same-origin document with content.
    Rendered,
    /// The document cannot be read. Indistinguishable from a successful cross-origin load.
    CrossOrigin,
}

/// What the viewer area currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ViewerContent {
    #[default]
    Empty,
    Frame {
        url: String,
    },
    Fallback {
        message: String,
        link: String,
    },
}

/// The piece of the host page the viewer draws into: a status line, the load/reload control
/// and the viewer area.
pub trait ViewerSurface: Send + Sync + 'static {
    fn set_status(&self, text: &str);

    /// Removes whatever the viewer area shows.
    fn clear(&self);

    fn mount_frame(&self, url: &str);

    /// Replaces the viewer area with `message` and an external `link`.
    fn show_fallback(&self, message: &str, link: &str);

    fn probe_frame(&self) -> FrameProbe;

    fn is_attached(&self) -> bool;

    fn detach(&self);
}
