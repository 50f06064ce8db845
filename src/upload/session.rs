//! Upload state machine, independent of any UI toolkit.
//!
//! `Idle → Selected → Encoding → Progressing → Completing → Complete`.
//! A read error drops back to `Idle` without a hand-off. Time is always passed
//! in, never read, so every transition is reproducible in tests.

use web_time::Instant;

use crate::auth::{AuthState, SignedIn};
use crate::config::UploadConfig;
use crate::data_uri::DataUri;

use super::file::{FileMeta, PickedFile};
use super::progress::{ProgressSource, SimulatedProgress};
use super::UploadError;

pub type OnComplete = Box<dyn FnMut(DataUri)>;

/// User actions that require a signed-in user.
#[derive(Debug)]
pub enum Interaction {
    DragOver,
    DragLeave,
    /// Only the first file is considered.
    Drop(Vec<PickedFile>),
    Select(PickedFile),
}

/// What the host has to do after an update.
#[derive(Debug)]
#[must_use]
pub enum Effect {
    None,
    /// Run [`PickedFile::encode`] and report back through [`Uploader::encoded`]
    /// with the same generation.
    Encode { generation: u64, file: PickedFile },
    /// The completion callback has just run.
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Selected,
    Encoding,
    Progressing,
    Completing,
    Complete,
}

enum Phase {
    Idle,
    Selected,
    Encoding,
    Progressing { progress: Box<dyn ProgressSource>, data_uri: DataUri },
    Completing { due: Instant, data_uri: DataUri },
    Complete,
}

pub struct Uploader {
    config: UploadConfig,
    on_complete: Option<OnComplete>,
    file: Option<FileMeta>,
    phase: Phase,
    is_dragging: bool,
    notice: Option<UploadError>,
    // Bumped on every accepted file and on dispose; stale encodes are dropped.
    generation: u64,
    disposed: bool,
}

impl Uploader {
    pub fn new(config: UploadConfig) -> Self {
        Self {
            config,
            on_complete: None,
            file: None,
            phase: Phase::Idle,
            is_dragging: false,
            notice: None,
            generation: 0,
            disposed: false,
        }
    }

    pub fn with_on_complete(mut self, on_complete: impl FnMut(DataUri) + 'static) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn status(&self) -> Status {
        match self.phase {
            Phase::Idle => Status::Idle,
            Phase::Selected => Status::Selected,
            Phase::Encoding => Status::Encoding,
            Phase::Progressing { .. } => Status::Progressing,
            Phase::Completing { .. } => Status::Completing,
            Phase::Complete => Status::Complete,
        }
    }

    pub fn progress(&self) -> u8 {
        match &self.phase {
            Phase::Progressing { progress, .. } => progress.value(),
            Phase::Completing { .. } | Phase::Complete => 100,
            Phase::Idle | Phase::Selected | Phase::Encoding => 0,
        }
    }

    pub fn file(&self) -> Option<&FileMeta> {
        self.file.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    /// Last problem worth telling the user about.
    pub fn notice(&self) -> Option<&UploadError> {
        self.notice.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Applies a drag, drop or selection.
    ///
    /// Sign-in is checked exactly once here; everything past the guard may
    /// assume a signed-in user.
    pub fn interact(&mut self, auth: &AuthState, interaction: Interaction) -> Effect {
        if self.disposed {
            return Effect::None;
        }
        if matches!(interaction, Interaction::DragLeave | Interaction::Drop(_)) {
            self.is_dragging = false;
        }
        let Some(signed_in) = auth.gate() else {
            return Effect::None;
        };
        match interaction {
            Interaction::DragOver => {
                self.is_dragging = true;
                Effect::None
            }
            Interaction::DragLeave => Effect::None,
            Interaction::Drop(files) => match files.into_iter().next() {
                Some(file) => self.accept(signed_in, file),
                None => Effect::None,
            },
            Interaction::Select(file) => self.accept(signed_in, file),
        }
    }

    fn accept(&mut self, _: SignedIn, file: PickedFile) -> Effect {
        if !file.is_image() {
            log::debug!("Ignoring {} with media type {:?}", file.name, file.media_type);
            return Effect::None;
        }
        let limit = self.config.max_file_size_bytes;
        if let Some(size) = file.size.filter(|&size| size > limit) {
            log::warn!("Refusing {}: {size} bytes exceeds {limit}", file.name);
            self.notice = Some(UploadError::TooLarge { name: file.name, size, limit });
            return Effect::None;
        }

        self.generation += 1;
        log::info!("Accepted {} ({})", file.name, file.media_type);
        self.file = Some(file.meta());
        self.phase = Phase::Selected;
        self.notice = None;
        Effect::Encode { generation: self.generation, file }
    }

    pub fn encode_started(&mut self, generation: u64) {
        if !self.disposed && generation == self.generation && matches!(self.phase, Phase::Selected) {
            self.phase = Phase::Encoding;
        }
    }

    /// Result of an [`Effect::Encode`]. Starts the progress timer on success.
    pub fn encoded(&mut self, generation: u64, result: Result<DataUri, UploadError>, now: Instant) {
        if self.disposed
            || generation != self.generation
            || !matches!(self.phase, Phase::Selected | Phase::Encoding)
        {
            log::debug!("Dropping stale encode result (generation {generation})");
            return;
        }
        match result {
            Ok(data_uri) => {
                log::debug!("Encoded {} bytes, starting progress", data_uri.as_str().len());
                let progress = SimulatedProgress::start(
                    self.config.progress_increment,
                    self.config.progress_interval(),
                    now,
                );
                self.phase = Phase::Progressing { progress: Box::new(progress), data_uri };
            }
            Err(err) => {
                log::error!("Upload failed: {err}");
                self.file = None;
                self.phase = Phase::Idle;
                self.notice = Some(err);
            }
        }
    }

    /// Advances timers to `now`, running the completion callback when due.
    pub fn tick(&mut self, now: Instant) -> Effect {
        if self.disposed {
            return Effect::None;
        }
        // Reaching 100 drops the progress timer along with the old phase.
        self.phase = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Progressing { mut progress, data_uri } => match progress.advance(now) {
                Some(done_at) => Phase::Completing { due: done_at + self.config.redirect_delay(), data_uri },
                None => Phase::Progressing { progress, data_uri },
            },
            other => other,
        };
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Completing { due, data_uri } if due <= now => {
                self.phase = Phase::Complete;
                match self.on_complete.as_mut() {
                    Some(on_complete) => {
                        on_complete(data_uri);
                        Effect::Completed
                    }
                    None => Effect::None,
                }
            }
            other => {
                self.phase = other;
                Effect::None
            }
        }
    }

    /// When [`tick`](Self::tick) next has something to do.
    pub fn next_wakeup(&self) -> Option<Instant> {
        match &self.phase {
            Phase::Progressing { progress, .. } => progress.next_change(),
            Phase::Completing { due, .. } => Some(*due),
            _ => None,
        }
    }

    /// Cancels pending timers and in-flight encodes. Later calls are no-ops.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.generation += 1;
        self.phase = Phase::Idle;
        self.is_dragging = false;
    }
}

impl Drop for Uploader {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use web_time::Duration;

    fn signed_in() -> AuthState {
        AuthState { is_signed_in: true, ..AuthState::default() }
    }

    fn png(name: &str) -> PickedFile {
        PickedFile::from_bytes(name, "image/png", b"\x89PNG\r\n".to_vec())
    }

    fn config() -> UploadConfig {
        UploadConfig {
            progress_increment: 15,
            progress_interval_ms: 100,
            redirect_delay_ms: 600,
            ..UploadConfig::default()
        }
    }

    fn recording(config: UploadConfig) -> (Uploader, Rc<RefCell<Vec<DataUri>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&calls);
        let uploader = Uploader::new(config).with_on_complete(move |uri| sink.borrow_mut().push(uri));
        (uploader, calls)
    }

    /// Accepts `file` and feeds the encoded result back, as the widget would.
    fn accept_and_encode(uploader: &mut Uploader, file: PickedFile, now: Instant) {
        let Effect::Encode { generation, file } = uploader.interact(&signed_in(), Interaction::Select(file)) else {
            panic!("file was not accepted");
        };
        uploader.encode_started(generation);
        let result = futures::executor::block_on(file.encode());
        uploader.encoded(generation, result, now);
    }

    #[test]
    fn drop_png_runs_to_hand_off() {
        let (mut up, calls) = recording(config());
        let t0 = Instant::now();
        assert_eq!(up.status(), Status::Idle);

        let effect = up.interact(&signed_in(), Interaction::Drop(vec![png("plan.png")]));
        let Effect::Encode { generation, file } = effect else { panic!("expected encode") };
        assert_eq!(up.status(), Status::Selected);
        assert_eq!(up.file().map(|f| f.name.as_str()), Some("plan.png"));
        assert_eq!(up.progress(), 0);

        up.encode_started(generation);
        assert_eq!(up.status(), Status::Encoding);
        up.encoded(generation, futures::executor::block_on(file.encode()), t0);
        assert_eq!(up.status(), Status::Progressing);

        let interval = Duration::from_millis(100);
        let mut seen = vec![up.progress()];
        let mut now = t0;
        while up.status() == Status::Progressing {
            now += interval;
            let _ = up.tick(now);
            seen.push(up.progress());
        }
        assert_eq!(seen, vec![0, 15, 30, 45, 60, 75, 90, 100]);
        assert_eq!(up.status(), Status::Completing);
        assert!(calls.borrow().is_empty());

        let due = now + Duration::from_millis(600);
        assert_eq!(up.next_wakeup(), Some(due));
        assert!(matches!(up.tick(due - Duration::from_millis(1)), Effect::None));
        assert!(calls.borrow().is_empty());

        assert!(matches!(up.tick(due), Effect::Completed));
        assert_eq!(up.status(), Status::Complete);
        assert_eq!(up.progress(), 100);
        assert!(matches!(up.tick(due + Duration::from_secs(5)), Effect::None));

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].as_str().starts_with("data:image/png;base64,"));
    }

    #[test]
    fn non_image_files_leave_state_untouched() {
        let (mut up, _) = recording(config());
        for (name, mime) in [("notes.txt", "text/plain"), ("plan.pdf", "application/pdf"), ("blob", "")] {
            let file = PickedFile::from_bytes(name, mime, vec![0u8; 4]);
            assert!(matches!(up.interact(&signed_in(), Interaction::Select(file.clone())), Effect::None));
            assert!(matches!(up.interact(&signed_in(), Interaction::Drop(vec![file])), Effect::None));
            assert_eq!(up.status(), Status::Idle);
            assert!(up.file().is_none());
            assert_eq!(up.progress(), 0);
            assert!(up.notice().is_none());
        }
    }

    #[test]
    fn signed_out_interactions_are_inert() {
        let (mut up, _) = recording(config());
        let signed_out = AuthState::signed_out();
        assert!(matches!(up.interact(&signed_out, Interaction::DragOver), Effect::None));
        assert!(!up.is_dragging());
        assert!(matches!(up.interact(&signed_out, Interaction::Drop(vec![png("a.png")])), Effect::None));
        assert!(matches!(up.interact(&signed_out, Interaction::Select(png("b.png"))), Effect::None));
        assert_eq!(up.status(), Status::Idle);
        assert!(up.file().is_none());
    }

    #[test]
    fn drag_flag_follows_drag_events() {
        let (mut up, _) = recording(config());
        let _ = up.interact(&signed_in(), Interaction::DragOver);
        assert!(up.is_dragging());
        let _ = up.interact(&signed_in(), Interaction::DragLeave);
        assert!(!up.is_dragging());

        let _ = up.interact(&signed_in(), Interaction::DragOver);
        let _ = up.interact(&signed_in(), Interaction::Drop(Vec::new()));
        assert!(!up.is_dragging());
        assert_eq!(up.status(), Status::Idle);
    }

    #[test]
    fn drop_uses_first_file_only() {
        let (mut up, _) = recording(config());
        let files = vec![png("first.png"), png("second.png")];
        let Effect::Encode { file, .. } = up.interact(&signed_in(), Interaction::Drop(files)) else {
            panic!("expected encode");
        };
        assert_eq!(file.name, "first.png");
    }

    #[test]
    fn read_error_resets_without_hand_off() {
        let (mut up, calls) = recording(config());
        let Effect::Encode { generation, .. } = up.interact(&signed_in(), Interaction::Select(png("plan.png"))) else {
            panic!("expected encode");
        };
        let err = UploadError::Read { name: "plan.png".into(), reason: "gone".into() };
        up.encoded(generation, Err(err.clone()), Instant::now());

        assert_eq!(up.status(), Status::Idle);
        assert!(up.file().is_none());
        assert_eq!(up.progress(), 0);
        assert_eq!(up.notice(), Some(&err));
        assert_eq!(up.next_wakeup(), None);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn oversized_file_is_refused() {
        let (mut up, _) = recording(UploadConfig { max_file_size_bytes: 4, ..config() });
        let big = PickedFile::from_bytes("big.png", "image/png", vec![0u8; 5]);
        assert!(matches!(up.interact(&signed_in(), Interaction::Select(big)), Effect::None));
        assert_eq!(up.status(), Status::Idle);
        assert!(matches!(up.notice(), Some(UploadError::TooLarge { size: 5, limit: 4, .. })));

        // A later accepted file clears the notice.
        let small = PickedFile::from_bytes("small.png", "image/png", vec![0u8; 4]);
        assert!(matches!(up.interact(&signed_in(), Interaction::Select(small)), Effect::Encode { .. }));
        assert!(up.notice().is_none());
    }

    #[test]
    fn dispose_cancels_progress_and_hand_off() {
        let (mut up, calls) = recording(config());
        let t0 = Instant::now();
        accept_and_encode(&mut up, png("plan.png"), t0);
        let _ = up.tick(t0 + Duration::from_millis(200));
        assert_eq!(up.progress(), 30);

        up.dispose();
        assert!(up.is_disposed());
        assert!(matches!(up.tick(t0 + Duration::from_secs(60)), Effect::None));
        assert_eq!(up.progress(), 0);
        assert_eq!(up.next_wakeup(), None);
        assert!(calls.borrow().is_empty());

        // Nothing gets through after disposal.
        assert!(matches!(up.interact(&signed_in(), Interaction::Select(png("again.png"))), Effect::None));
    }

    #[test]
    fn dispose_during_redirect_delay_suppresses_callback() {
        let (mut up, calls) = recording(UploadConfig { progress_increment: 100, ..config() });
        let t0 = Instant::now();
        accept_and_encode(&mut up, png("plan.png"), t0);
        let _ = up.tick(t0 + Duration::from_millis(100));
        assert_eq!(up.status(), Status::Completing);

        up.dispose();
        let _ = up.tick(t0 + Duration::from_secs(10));
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn dropping_uploader_never_fires_callback() {
        let (mut up, calls) = recording(UploadConfig { progress_increment: 100, ..config() });
        accept_and_encode(&mut up, png("plan.png"), Instant::now());
        drop(up);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn stale_encode_after_replacement_is_ignored() {
        let (mut up, _) = recording(config());
        let Effect::Encode { generation: first, file: old } =
            up.interact(&signed_in(), Interaction::Select(png("old.png")))
        else {
            panic!("expected encode");
        };
        let Effect::Encode { generation: second, .. } = up.interact(&signed_in(), Interaction::Select(png("new.png")))
        else {
            panic!("expected encode");
        };
        assert_ne!(first, second);

        up.encoded(first, futures::executor::block_on(old.encode()), Instant::now());
        assert_eq!(up.status(), Status::Selected);
        assert_eq!(up.file().map(|f| f.name.as_str()), Some("new.png"));
    }

    #[test]
    fn replacing_a_running_session_restarts_progress() {
        let (mut up, _) = recording(config());
        let t0 = Instant::now();
        accept_and_encode(&mut up, png("one.png"), t0);
        let _ = up.tick(t0 + Duration::from_millis(300));
        assert_eq!(up.progress(), 45);

        let _ = up.interact(&signed_in(), Interaction::Select(png("two.png")));
        assert_eq!(up.progress(), 0);
        assert_eq!(up.next_wakeup(), None);
    }

    #[test]
    fn without_callback_stays_complete() {
        let mut up = Uploader::new(UploadConfig { progress_increment: 50, ..config() });
        let t0 = Instant::now();
        accept_and_encode(&mut up, png("plan.png"), t0);
        assert!(matches!(up.tick(t0 + Duration::from_secs(5)), Effect::None));
        assert_eq!(up.status(), Status::Complete);
        assert_eq!(up.progress(), 100);
    }

    #[test]
    fn progress_never_decreases() {
        let (mut up, _) = recording(UploadConfig { progress_increment: 7, progress_interval_ms: 30, ..config() });
        let t0 = Instant::now();
        accept_and_encode(&mut up, png("plan.png"), t0);
        let mut last = 0;
        for ms in (0..2_000).step_by(17) {
            let _ = up.tick(t0 + Duration::from_millis(ms));
            assert!(up.progress() >= last);
            last = up.progress();
        }
        assert_eq!(last, 100);
    }
}
