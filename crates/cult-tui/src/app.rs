//! App — the event loop.
//!
//! Architecture:
//! - `App` owns the view component, `AppState` and the `PlaybackController`.
//! - A `tokio::mpsc` channel carries terminal events and artwork results in
//!   from background tasks; status snapshots arrive on the store's watch
//!   receiver.
//! - The poller is spawned when `run()` starts and cancelled when it returns.
//! - Components return `Vec<Action>`; App dispatches each Action.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use cult_proto::client::StatusSource;
use cult_proto::poller::PollScheduler;
use cult_proto::store::{Snapshot, StatusPublisher, StatusStore};

use crate::{
    action::Action,
    app_state::AppState,
    artwork::{load_artwork, Artwork, ArtworkPhase, ImageLoadError},
    component::Component,
    components::now_playing::NowPlaying,
    playback::PlaybackController,
};

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    /// Finished artwork load, tagged with the URL it was started for.
    Artwork(String, Result<Artwork, ImageLoadError>),
}

/// How long the input reader blocks before checking whether the App is gone.
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Blocking input loop.  Returns once the App drops its receiver, so the
/// runtime never waits on a pending terminal read at exit.
fn read_input<P, R>(tx: mpsc::Sender<AppMessage>, mut poll: P, mut read: R)
where
    P: FnMut(Duration) -> io::Result<bool>,
    R: FnMut() -> io::Result<Event>,
{
    while !tx.is_closed() {
        match poll(INPUT_POLL) {
            Ok(true) => match read() {
                Ok(ev) => {
                    if tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {}
            Err(_) => break,
        }
    }
    debug!("input reader exiting");
}

pub struct App<S: StatusSource> {
    state: AppState,
    now_playing: NowPlaying,
    playback: PlaybackController,
    http: reqwest::Client,
    source: Arc<S>,
    store: StatusStore,
    publisher: Option<StatusPublisher>,
    poll_interval: Duration,
    /// Last artwork URL a load was started for.
    artwork_requested: Option<String>,
    should_quit: bool,
}

impl<S: StatusSource> App<S> {
    pub fn new(
        http: reqwest::Client,
        source: Arc<S>,
        (publisher, store): (StatusPublisher, StatusStore),
        poll_interval: Duration,
        playback: PlaybackController,
    ) -> Self {
        Self {
            state: AppState::default(),
            now_playing: NowPlaying::new(),
            playback,
            http,
            source,
            store,
            publisher: Some(publisher),
            poll_interval,
            artwork_requested: None,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || read_input(event_tx, event::poll, event::read));

        // ── Poller: lives exactly as long as this loop ────────────────────────
        let mut status_rx = self.store.subscribe();
        let poller = match self.publisher.take() {
            Some(publisher) => Some(PollScheduler::spawn(
                self.source.clone(),
                publisher,
                self.poll_interval,
            )),
            None => {
                warn!("run(): store publisher already consumed, not polling");
                None
            }
        };

        // Spinner animation: 100ms for smooth braille frames
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let result = loop {
            if let Err(e) = terminal.draw(|f| self.draw(f)) {
                break Err(e.into());
            }
            if self.should_quit {
                break Ok(());
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                }
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        warn!("status store closed");
                        break Ok(());
                    }
                    let snapshot = status_rx.borrow_and_update().clone();
                    self.on_status(snapshot, &tx);
                }
                _ = ui_tick.tick() => {
                    if self.spinner_visible() {
                        self.state.spinner_frame = self.state.spinner_frame.wrapping_add(1);
                    }
                }
            }
        };

        // ── Teardown ──────────────────────────────────────────────────────────
        if let Some(poller) = poller {
            poller.shutdown().await;
        }
        self.playback.shutdown().await;

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
        info!("cultradio exiting");

        result
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        self.now_playing.draw(frame, area, &self.state);
    }

    fn spinner_visible(&self) -> bool {
        self.state.status.is_none() || matches!(self.state.artwork, ArtworkPhase::Empty)
    }

    // ── Message handler ───────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(ev) => {
                let actions = match ev {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        self.now_playing.handle_key(key, &self.state)
                    }
                    Event::Mouse(mouse) => self.now_playing.handle_mouse(mouse, &self.state),
                    _ => vec![],
                };
                for a in actions {
                    self.dispatch(a).await;
                }
            }
            AppMessage::Artwork(url, result) => self.on_artwork(url, result),
        }
    }

    async fn dispatch(&mut self, action: Action) {
        match action {
            Action::TogglePlayback => {
                self.playback.toggle_playback().await;
                self.state.is_playing = self.playback.is_playing();
            }
            Action::Quit => {
                info!("quit requested");
                self.should_quit = true;
            }
        }
    }

    /// New snapshot from the store.  Starts an artwork load when the URL
    /// differs from the last one requested.
    fn on_status(&mut self, snapshot: Snapshot, tx: &mpsc::Sender<AppMessage>) {
        self.state.status = snapshot;

        let Some(url) = self.state.artwork_url().map(str::to_string) else {
            self.artwork_requested = None;
            self.state.artwork = ArtworkPhase::Failure;
            return;
        };
        if self.artwork_requested.as_deref() == Some(url.as_str()) {
            return;
        }

        debug!("[artwork] new url {}", url);
        self.artwork_requested = Some(url.clone());
        self.state.artwork = ArtworkPhase::Empty;

        let http = self.http.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let result = load_artwork(&http, &url).await;
            let _ = tx.send(AppMessage::Artwork(url, result)).await;
        });
    }

    fn on_artwork(&mut self, url: String, result: Result<Artwork, ImageLoadError>) {
        if self.artwork_requested.as_deref() != Some(url.as_str()) {
            debug!("[artwork] discarding stale result for {}", url);
            return;
        }
        self.state.artwork = match result {
            Ok(art) => {
                debug!("[artwork] loaded {}x{} from {}", art.width(), art.height(), url);
                ArtworkPhase::Success(Arc::new(art))
            }
            Err(e) => {
                warn!("[artwork] {}: {}", url, e);
                ArtworkPhase::Failure
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cult_proto::client::decode_status;
    use cult_proto::error::FetchError;
    use cult_proto::status::StationStatus;
    use ratatui::{backend::TestBackend, Terminal};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct NeverSource;

    #[async_trait]
    impl StatusSource for NeverSource {
        async fn fetch_status(&self) -> Result<StationStatus, FetchError> {
            std::future::pending().await
        }
    }

    fn status_with_art(url: &str) -> Snapshot {
        let json = format!(
            r#"{{"status":"online","source":{{"type":"live"}},
                "current_track":{{"title":"Song A","start_time":"","artwork_url_large":"{}"}},
                "history":[]}}"#,
            url
        );
        Some(Arc::new(decode_status(json.as_bytes()).unwrap()))
    }

    fn test_app() -> (App<NeverSource>, mpsc::Sender<AppMessage>, mpsc::Receiver<AppMessage>) {
        let (cmd_tx, _cmd_rx) = mpsc::channel(8);
        let playback = PlaybackController::with_sender(cmd_tx, "https://s/listen".into(), 1.0);
        let app = App::new(
            reqwest::Client::new(),
            Arc::new(NeverSource),
            StatusStore::new(),
            Duration::from_secs(30),
            playback,
        );
        let (tx, rx) = mpsc::channel(8);
        (app, tx, rx)
    }

    fn screen(app: &mut App<NeverSource>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(48, 32)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[tokio::test]
    async fn test_artwork_404_renders_warning() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        let url = format!("{}/a.png", server.uri());

        let (mut app, tx, mut rx) = test_app();
        app.on_status(status_with_art(&url), &tx);
        assert!(matches!(app.state.artwork, ArtworkPhase::Empty));

        let msg = rx.recv().await.unwrap();
        app.handle_message(msg).await;
        assert!(matches!(app.state.artwork, ArtworkPhase::Failure));

        let out = screen(&mut app);
        assert!(out.contains("⚠"));
        assert!(out.contains("Playing: Song A"));
    }

    #[tokio::test]
    async fn test_same_artwork_url_loads_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.png"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        let url = format!("{}/a.png", server.uri());

        let (mut app, tx, mut rx) = test_app();
        app.on_status(status_with_art(&url), &tx);
        let msg = rx.recv().await.unwrap();
        app.handle_message(msg).await;

        app.on_status(status_with_art(&url), &tx);
        assert_eq!(app.artwork_requested.as_deref(), Some(url.as_str()));
        assert!(matches!(app.state.artwork, ArtworkPhase::Failure));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stale_artwork_result_discarded() {
        let (mut app, tx, _rx) = test_app();
        app.artwork_requested = Some("https://x/new.png".to_string());
        app.state.artwork = ArtworkPhase::Empty;

        app.on_artwork(
            "https://x/old.png".to_string(),
            Err(ImageLoadError::Status(500)),
        );
        assert!(matches!(app.state.artwork, ArtworkPhase::Empty));
        drop(tx);
    }

    #[tokio::test]
    async fn test_input_reader_exits_when_app_is_gone() {
        let (tx, rx) = mpsc::channel(8);
        let reader = tokio::task::spawn_blocking(move || {
            read_input(tx, |_| Ok(false), || Ok(Event::FocusGained))
        });
        drop(rx);

        tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("input reader still blocked after the App exited")
            .unwrap();
    }

    #[tokio::test]
    async fn test_input_reader_forwards_events() {
        let (tx, mut rx) = mpsc::channel(8);
        let reader = tokio::task::spawn_blocking(move || {
            let mut ready = true;
            read_input(
                tx,
                move |_| Ok(std::mem::replace(&mut ready, false)),
                || Ok(Event::FocusGained),
            )
        });

        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, AppMessage::Event(Event::FocusGained)));
        drop(rx);
        tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_toggle_action_updates_state() {
        let (mut app, _tx, _rx) = test_app();
        app.dispatch(Action::TogglePlayback).await;
        assert!(app.state.is_playing);
        app.dispatch(Action::TogglePlayback).await;
        assert!(!app.state.is_playing);

        app.dispatch(Action::Quit).await;
        assert!(app.should_quit);
    }
}
