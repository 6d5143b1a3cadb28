use crate::flv::{
    FlvDemuxer, FlvError, FlvEvent, TagKind, VideoPacket, avcc_to_annexb, is_on_metadata,
    parse_avc_decoder_config, parse_video_packet,
};
use futures_util::StreamExt as _;
use openh264::decoder::Decoder;
use openh264::formats::YUVSource;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const SHADES: &[u8] = b" .,:;ox%#@";
const PREVIEW_FRAME_INTERVAL: Duration = Duration::from_millis(100);
const SAMPLES_PER_CELL: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlayerError {
    #[error("media request failed: {0}")]
    Transport(String),
    #[error("media server answered HTTP {0}")]
    Status(u16),
    #[error(transparent)]
    Demux(#[from] FlvError),
    #[error("unsupported video codec id {0}")]
    UnsupportedCodec(u8),
    #[error("H.264 decoder unavailable: {0}")]
    Decoder(String),
    #[error("{0}")]
    Engine(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerFailure {
    pub url: String,
    pub error: PlayerError,
}

impl fmt::Display for PlayerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    LoadingComplete,
    MetadataReady,
    Error(PlayerError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    pub frame_ascii: String,
    pub status: String,
    pub frames_decoded: u64,
    pub decode_errors: u64,
}

impl Default for SurfaceSnapshot {
    fn default() -> Self {
        Self {
            frame_ascii: String::new(),
            status: "no video".to_owned(),
            frames_decoded: 0,
            decode_errors: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSize {
    pub cols: usize,
    pub rows: usize,
}

impl Default for PreviewSize {
    fn default() -> Self {
        Self { cols: 48, rows: 18 }
    }
}

#[derive(Debug, Default)]
pub struct VideoSurface {
    inner: RwLock<SurfaceSnapshot>,
    size: RwLock<PreviewSize>,
}

impl VideoSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, status: impl Into<String>) {
        self.inner.write().status = status.into();
    }

    pub fn set_frame(&self, frame_ascii: String) {
        let mut snapshot = self.inner.write();
        snapshot.frame_ascii = frame_ascii;
        snapshot.frames_decoded = snapshot.frames_decoded.saturating_add(1);
        "playing".clone_into(&mut snapshot.status);
    }

    pub fn inc_decode_error(&self) {
        let mut snapshot = self.inner.write();
        snapshot.decode_errors = snapshot.decode_errors.saturating_add(1);
    }

    pub fn clear(&self) {
        *self.inner.write() = SurfaceSnapshot::default();
    }

    #[must_use]
    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.inner.read().clone()
    }

    pub fn set_size(&self, size: PreviewSize) {
        *self.size.write() = size;
    }

    #[must_use]
    pub fn size(&self) -> PreviewSize {
        *self.size.read()
    }
}

/// A single playback instance. Calls arrive in lifecycle order:
/// `attach`, `load`, `play`/`pause`, `unload`, `detach`, `destroy`.
pub trait PlayerEngine: Send {
    fn attach(&mut self, surface: Arc<VideoSurface>);
    fn load(&mut self, events: mpsc::UnboundedSender<EngineEvent>);
    fn play(&mut self);
    fn pause(&mut self);
    fn unload(&mut self);
    fn detach(&mut self);
    fn destroy(self: Box<Self>);
}

pub trait EngineFactory: Send + Sync {
    fn create(&self, url: &str) -> Result<Box<dyn PlayerEngine>, PlayerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaSource<'a> {
    pub session_id: Option<&'a str>,
    pub url: &'a str,
}

struct ActiveEngine {
    url: String,
    session_id: Option<String>,
    engine: Box<dyn PlayerEngine>,
    forwarder: JoinHandle<()>,
}

/// Binds a window's media URL to a player engine.
pub struct PlayerBinding {
    factory: Arc<dyn EngineFactory>,
    surface: Arc<VideoSurface>,
    autoplay: bool,
    active: Option<ActiveEngine>,
    generation: Arc<AtomicU64>,
    loading: Arc<watch::Sender<bool>>,
    failures: mpsc::UnboundedSender<PlayerFailure>,
}

impl fmt::Debug for PlayerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerBinding")
            .field("url", &self.url())
            .field("autoplay", &self.autoplay)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("loading", &*self.loading.borrow())
            .finish_non_exhaustive()
    }
}

impl PlayerBinding {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        surface: Arc<VideoSurface>,
        autoplay: bool,
    ) -> (Self, mpsc::UnboundedReceiver<PlayerFailure>) {
        let (failures, failures_rx) = mpsc::unbounded_channel();
        let (loading, _) = watch::channel(false);
        (
            Self {
                factory,
                surface,
                autoplay,
                active: None,
                generation: Arc::new(AtomicU64::new(0)),
                loading: Arc::new(loading),
                failures,
            },
            failures_rx,
        )
    }

    #[must_use]
    pub fn url(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.url.as_str())
    }

    #[must_use]
    pub fn source(&self) -> Option<MediaSource<'_>> {
        self.active.as_ref().map(|active| MediaSource {
            session_id: active.session_id.as_deref(),
            url: &active.url,
        })
    }

    #[must_use]
    pub fn surface(&self) -> &Arc<VideoSurface> {
        &self.surface
    }

    #[must_use]
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn set_url(&mut self, url: Option<&str>) {
        self.set_source(url.map(|url| MediaSource {
            session_id: None,
            url,
        }));
    }

    pub fn set_source(&mut self, source: Option<MediaSource<'_>>) {
        if self.source() == source {
            return;
        }
        self.teardown();

        let Some(MediaSource { session_id, url }) = source else {
            return;
        };

        let mut engine = match self.factory.create(url) {
            Ok(engine) => engine,
            Err(error) => {
                warn!(url, "failed to create player: {error}");
                let _ = self.failures.send(PlayerFailure {
                    url: url.to_owned(),
                    error,
                });
                return;
            }
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        engine.attach(self.surface.clone());
        self.loading.send_replace(true);
        engine.load(events_tx);
        if self.autoplay {
            engine.play();
        }

        let forwarder = EventForwarder {
            generation,
            current: self.generation.clone(),
            url: url.to_owned(),
            loading: self.loading.clone(),
            failures: self.failures.clone(),
        };
        debug!(url, generation, "player loaded");
        self.active = Some(ActiveEngine {
            url: url.to_owned(),
            session_id: session_id.map(str::to_owned),
            engine,
            forwarder: tokio::spawn(forwarder.run(events_rx)),
        });
    }

    pub fn shutdown(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let ActiveEngine {
            url,
            mut engine,
            forwarder,
            ..
        } = active;

        // Listeners go first so nothing from this cycle is reported after teardown starts.
        self.generation.fetch_add(1, Ordering::SeqCst);
        forwarder.abort();

        engine.pause();
        engine.unload();
        engine.detach();
        engine.destroy();

        self.loading.send_replace(false);
        debug!(%url, "player destroyed");
    }
}

impl Drop for PlayerBinding {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct EventForwarder {
    generation: u64,
    current: Arc<AtomicU64>,
    url: String,
    loading: Arc<watch::Sender<bool>>,
    failures: mpsc::UnboundedSender<PlayerFailure>,
}

impl EventForwarder {
    fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    async fn run(self, mut events: mpsc::UnboundedReceiver<EngineEvent>) {
        let mut loading_cleared = false;
        let mut failed = false;

        while let Some(event) = events.recv().await {
            if !self.is_current() {
                break;
            }
            match event {
                EngineEvent::LoadingComplete | EngineEvent::MetadataReady => {
                    if !loading_cleared {
                        loading_cleared = true;
                        self.clear_loading();
                    }
                }
                EngineEvent::Error(error) => {
                    if failed {
                        continue;
                    }
                    failed = true;
                    loading_cleared = true;
                    self.clear_loading();
                    warn!(url = %self.url, "player error: {error}");
                    let _ = self.failures.send(PlayerFailure {
                        url: self.url.clone(),
                        error,
                    });
                }
            }
        }
    }

    fn clear_loading(&self) {
        // Checked under the watch lock so a stale cycle cannot clear a newer one.
        self.loading.send_if_modified(|loading| {
            if !self.is_current() || !*loading {
                return false;
            }
            *loading = false;
            true
        });
    }
}

#[derive(Debug, Clone)]
pub struct FlvEngineFactory {
    http: reqwest::Client,
}

impl FlvEngineFactory {
    /// Live bodies never finish, so only the connect phase is bounded.
    pub fn new(connect_timeout: Duration) -> Result<Self, PlayerError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|err| PlayerError::Transport(err.to_string()))?;
        Ok(Self { http })
    }
}

impl EngineFactory for FlvEngineFactory {
    fn create(&self, url: &str) -> Result<Box<dyn PlayerEngine>, PlayerError> {
        url::Url::parse(url).map_err(|err| PlayerError::Engine(format!("invalid media URL: {err}")))?;
        Ok(Box::new(FlvEngine::new(self.http.clone(), url)))
    }
}

pub struct FlvEngine {
    http: reqwest::Client,
    url: String,
    surface: Option<Arc<VideoSurface>>,
    playing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl FlvEngine {
    #[must_use]
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            surface: None,
            playing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

impl PlayerEngine for FlvEngine {
    fn attach(&mut self, surface: Arc<VideoSurface>) {
        surface.clear();
        surface.set_status("connecting");
        self.surface = Some(surface);
    }

    fn load(&mut self, events: mpsc::UnboundedSender<EngineEvent>) {
        let Some(surface) = self.surface.clone() else {
            let _ = events.send(EngineEvent::Error(PlayerError::Engine(
                "engine loaded before attach".to_owned(),
            )));
            return;
        };
        if let Some(task) = self.task.take() {
            task.abort();
        }

        let http = self.http.clone();
        let url = self.url.clone();
        let playing = self.playing.clone();
        self.task = Some(tokio::spawn(async move {
            match stream_preview(&http, &url, &surface, &playing, &events).await {
                Ok(()) => {
                    surface.set_status("stream ended");
                    let _ = events.send(EngineEvent::LoadingComplete);
                }
                Err(error) => {
                    surface.set_status(format!("error: {error}"));
                    let _ = events.send(EngineEvent::Error(error));
                }
            }
        }));
    }

    fn play(&mut self) {
        self.playing.store(true, Ordering::Relaxed);
    }

    fn pause(&mut self) {
        self.playing.store(false, Ordering::Relaxed);
        if let Some(surface) = &self.surface {
            surface.set_status("paused");
        }
    }

    fn unload(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn detach(&mut self) {
        if let Some(surface) = self.surface.take() {
            surface.clear();
        }
    }

    fn destroy(self: Box<Self>) {}
}

impl Drop for FlvEngine {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn stream_preview(
    http: &reqwest::Client,
    url: &str,
    surface: &VideoSurface,
    playing: &AtomicBool,
    events: &mpsc::UnboundedSender<EngineEvent>,
) -> Result<(), PlayerError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|err| PlayerError::Transport(err.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(PlayerError::Status(status.as_u16()));
    }
    surface.set_status("buffering");

    let mut decoder = Decoder::new().map_err(|err| PlayerError::Decoder(err.to_string()))?;
    let mut demuxer = FlvDemuxer::new();
    let mut body = response.bytes_stream();
    let mut metadata_sent = false;
    let mut nal_length_size = 4;
    let mut annexb = Vec::with_capacity(64 * 1024);
    let mut last_frame: Option<Instant> = None;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|err| PlayerError::Transport(err.to_string()))?;
        demuxer.push(&chunk);

        while let Some(event) = demuxer.next_event()? {
            let FlvEvent::Tag(tag) = event else {
                continue;
            };
            match tag.kind {
                TagKind::Script => {
                    if !metadata_sent && is_on_metadata(&tag.data) {
                        metadata_sent = true;
                        let _ = events.send(EngineEvent::MetadataReady);
                    }
                }
                TagKind::Video => match parse_video_packet(&tag.data)? {
                    VideoPacket::AvcSequenceHeader(record) => {
                        let config = parse_avc_decoder_config(record)?;
                        nal_length_size = config.nal_length_size;
                        check_parameter_sets(decoder.decode(&config.parameter_sets))?;
                        if !metadata_sent {
                            metadata_sent = true;
                            let _ = events.send(EngineEvent::MetadataReady);
                        }
                    }
                    VideoPacket::AvcNalus { data, .. } => {
                        if let Err(err) = avcc_to_annexb(data, nal_length_size, &mut annexb) {
                            surface.inc_decode_error();
                            debug!(url, "dropping malformed access unit: {err}");
                            continue;
                        }
                        // Decode even while paused so reference frames stay current.
                        match decoder.decode(&annexb) {
                            Ok(Some(yuv)) => {
                                let render = playing.load(Ordering::Relaxed)
                                    && last_frame
                                        .is_none_or(|at| at.elapsed() >= PREVIEW_FRAME_INTERVAL);
                                if !render {
                                    continue;
                                }
                                let size = surface.size();
                                let (width, height) = yuv.dimensions();
                                let (stride, _, _) = yuv.strides();
                                surface.set_frame(luma_preview(
                                    yuv.y(),
                                    width,
                                    height,
                                    stride,
                                    size.cols,
                                    size.rows,
                                ));
                                last_frame = Some(Instant::now());
                            }
                            Ok(None) => {}
                            Err(err) => {
                                surface.inc_decode_error();
                                debug!(url, "decode error: {err}");
                            }
                        }
                    }
                    VideoPacket::AvcEndOfSequence => return Ok(()),
                    VideoPacket::Unsupported { codec_id } => {
                        return Err(PlayerError::UnsupportedCodec(codec_id));
                    }
                },
                TagKind::Audio | TagKind::Other(_) => {}
            }
        }
    }

    Ok(())
}

fn check_parameter_sets<T, E: fmt::Display>(result: Result<T, E>) -> Result<(), PlayerError> {
    result
        .map(|_| ())
        .map_err(|err| PlayerError::Decoder(format!("SPS/PPS rejected: {err}")))
}

/// Box-averages a luma plane down to `cols` x `rows` shade characters.
#[must_use]
pub fn luma_preview(
    luma: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    cols: usize,
    rows: usize,
) -> String {
    if width == 0 || height == 0 || cols == 0 || rows == 0 {
        return String::new();
    }

    let mut out = String::with_capacity((cols + 1) * rows);
    for row in 0..rows {
        let top = row * height / rows;
        let bottom = ((row + 1) * height / rows).clamp(top + 1, height);
        let y_step = ((bottom - top) / SAMPLES_PER_CELL).max(1);

        for col in 0..cols {
            let left = col * width / cols;
            let right = ((col + 1) * width / cols).clamp(left + 1, width);
            let x_step = ((right - left) / SAMPLES_PER_CELL).max(1);

            let mut sum = 0_u64;
            let mut count = 0_u64;
            for y in (top..bottom).step_by(y_step) {
                for x in (left..right).step_by(x_step) {
                    if let Some(value) = luma.get(y * stride + x) {
                        sum += u64::from(*value);
                        count += 1;
                    }
                }
            }
            let average = if count == 0 { 0 } else { sum / count };
            let shade = usize::try_from(average * (SHADES.len() as u64 - 1) / 255).unwrap_or(0);
            out.push(char::from(SHADES[shade.min(SHADES.len() - 1)]));
        }

        if row + 1 < rows {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{
        EngineEvent, EngineFactory, MediaSource, PlayerBinding, PlayerEngine, PlayerError,
        VideoSurface, check_parameter_sets, luma_preview,
    };
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    type CallLog = Arc<Mutex<Vec<String>>>;

    struct MockEngine {
        url: String,
        log: CallLog,
        senders: Arc<Mutex<Vec<mpsc::UnboundedSender<EngineEvent>>>>,
    }

    impl MockEngine {
        fn record(&self, call: &str) {
            self.log.lock().push(format!("{call} {}", self.url));
        }
    }

    impl PlayerEngine for MockEngine {
        fn attach(&mut self, _surface: Arc<VideoSurface>) {
            self.record("attach");
        }

        fn load(&mut self, events: mpsc::UnboundedSender<EngineEvent>) {
            self.record("load");
            self.senders.lock().push(events);
        }

        fn play(&mut self) {
            self.record("play");
        }

        fn pause(&mut self) {
            self.record("pause");
        }

        fn unload(&mut self) {
            self.record("unload");
        }

        fn detach(&mut self) {
            self.record("detach");
        }

        fn destroy(self: Box<Self>) {
            self.record("destroy");
        }
    }

    #[derive(Default)]
    struct MockFactory {
        log: CallLog,
        senders: Arc<Mutex<Vec<mpsc::UnboundedSender<EngineEvent>>>>,
        refuse: AtomicBool,
    }

    impl MockFactory {
        fn calls(&self) -> Vec<String> {
            self.log.lock().clone()
        }

        fn sender(&self, index: usize) -> mpsc::UnboundedSender<EngineEvent> {
            self.senders.lock()[index].clone()
        }
    }

    impl EngineFactory for MockFactory {
        fn create(&self, url: &str) -> Result<Box<dyn PlayerEngine>, PlayerError> {
            if self.refuse.load(Ordering::SeqCst) {
                return Err(PlayerError::Engine("no engine".to_owned()));
            }
            self.log.lock().push(format!("create {url}"));
            Ok(Box::new(MockEngine {
                url: url.to_owned(),
                log: self.log.clone(),
                senders: self.senders.clone(),
            }))
        }
    }

    fn binding(
        factory: &Arc<MockFactory>,
        autoplay: bool,
    ) -> (PlayerBinding, mpsc::UnboundedReceiver<super::PlayerFailure>) {
        PlayerBinding::new(factory.clone(), Arc::new(VideoSurface::new()), autoplay)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn url_change_tears_down_before_creating_next() {
        let factory = Arc::new(MockFactory::default());
        let (mut player, _failures) = binding(&factory, true);

        player.set_url(Some("http://x/a.flv"));
        player.set_url(Some("http://x/b.flv"));

        let expected = [
            "create http://x/a.flv",
            "attach http://x/a.flv",
            "load http://x/a.flv",
            "play http://x/a.flv",
            "pause http://x/a.flv",
            "unload http://x/a.flv",
            "detach http://x/a.flv",
            "destroy http://x/a.flv",
            "create http://x/b.flv",
            "attach http://x/b.flv",
            "load http://x/b.flv",
            "play http://x/b.flv",
        ];
        assert_eq!(factory.calls(), expected);
        assert_eq!(player.url(), Some("http://x/b.flv"));
    }

    #[tokio::test]
    async fn same_url_is_a_no_op() {
        let factory = Arc::new(MockFactory::default());
        let (mut player, _failures) = binding(&factory, true);

        player.set_url(Some("http://x/a.flv"));
        player.set_url(Some("http://x/a.flv"));
        assert_eq!(factory.calls().len(), 4);
    }

    #[tokio::test]
    async fn new_session_on_same_url_reloads() {
        let factory = Arc::new(MockFactory::default());
        let (mut player, _failures) = binding(&factory, true);
        let source = |session_id| MediaSource {
            session_id: Some(session_id),
            url: "http://x/rtp/D1_C1.live.flv",
        };

        player.set_source(Some(source("S1")));
        player.set_source(Some(source("S1")));
        assert_eq!(factory.calls().len(), 4);

        player.set_source(Some(source("S2")));
        let calls = factory.calls();
        assert_eq!(calls.len(), 12);
        assert_eq!(calls[7], "destroy http://x/rtp/D1_C1.live.flv");
        assert_eq!(calls[8], "create http://x/rtp/D1_C1.live.flv");
        assert_eq!(player.source(), Some(source("S2")));
    }

    #[test]
    fn rejected_parameter_sets_fail_the_cycle() {
        assert_eq!(check_parameter_sets(Ok::<_, String>(None::<()>)), Ok(()));
        assert_eq!(
            check_parameter_sets::<(), _>(Err("invalid SPS")),
            Err(PlayerError::Decoder("SPS/PPS rejected: invalid SPS".to_owned()))
        );
    }

    #[tokio::test]
    async fn autoplay_off_skips_play() {
        let factory = Arc::new(MockFactory::default());
        let (mut player, _failures) = binding(&factory, false);

        player.set_url(Some("http://x/a.flv"));
        assert!(!factory.calls().iter().any(|call| call.starts_with("play")));
    }

    #[tokio::test]
    async fn clearing_url_tears_down_and_stops_loading() {
        let factory = Arc::new(MockFactory::default());
        let (mut player, _failures) = binding(&factory, true);

        player.set_url(Some("http://x/a.flv"));
        assert!(player.is_loading());
        player.set_url(None);

        assert!(!player.is_loading());
        assert_eq!(player.url(), None);
        assert_eq!(
            factory.calls().last().map(String::as_str),
            Some("destroy http://x/a.flv")
        );
    }

    #[tokio::test]
    async fn metadata_clears_loading() {
        let factory = Arc::new(MockFactory::default());
        let (mut player, _failures) = binding(&factory, true);
        let mut loading = player.loading();

        player.set_url(Some("http://x/a.flv"));
        assert!(*loading.borrow_and_update());

        factory
            .sender(0)
            .send(EngineEvent::MetadataReady)
            .expect("forwarder alive");
        tokio::time::timeout(Duration::from_secs(1), loading.changed())
            .await
            .expect("loading changed")
            .expect("sender alive");
        assert!(!*loading.borrow());
    }

    #[tokio::test]
    async fn engine_error_is_forwarded_once_per_cycle() {
        let factory = Arc::new(MockFactory::default());
        let (mut player, mut failures) = binding(&factory, true);

        player.set_url(Some("http://x/a.flv"));
        let events = factory.sender(0);
        events
            .send(EngineEvent::Error(PlayerError::Status(404)))
            .expect("send");
        events
            .send(EngineEvent::Error(PlayerError::Status(502)))
            .expect("send");

        let failure = tokio::time::timeout(Duration::from_secs(1), failures.recv())
            .await
            .expect("failure forwarded")
            .expect("channel open");
        assert_eq!(failure.url, "http://x/a.flv");
        assert_eq!(failure.error, PlayerError::Status(404));
        assert!(!player.is_loading());

        settle().await;
        assert!(failures.try_recv().is_err());
        // No retry: the binding created exactly one engine.
        assert_eq!(
            factory
                .calls()
                .iter()
                .filter(|call| call.starts_with("create"))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn events_from_replaced_engine_are_dropped() {
        let factory = Arc::new(MockFactory::default());
        let (mut player, mut failures) = binding(&factory, true);

        player.set_url(Some("http://x/a.flv"));
        let stale = factory.sender(0);
        player.set_url(Some("http://x/b.flv"));

        let _ = stale.send(EngineEvent::Error(PlayerError::Status(500)));
        let _ = stale.send(EngineEvent::MetadataReady);
        settle().await;

        assert!(failures.try_recv().is_err());
        assert!(player.is_loading());
    }

    #[tokio::test]
    async fn create_failure_is_reported() {
        let factory = Arc::new(MockFactory::default());
        factory.refuse.store(true, Ordering::SeqCst);
        let (mut player, mut failures) = binding(&factory, true);

        player.set_url(Some("http://x/a.flv"));
        let failure = failures.try_recv().expect("failure");
        assert_eq!(failure.error, PlayerError::Engine("no engine".to_owned()));
        assert_eq!(player.url(), None);
    }

    #[tokio::test]
    async fn drop_tears_down_engine() {
        let factory = Arc::new(MockFactory::default());
        let (mut player, _failures) = binding(&factory, true);
        player.set_url(Some("http://x/a.flv"));
        drop(player);

        let calls = factory.calls();
        assert_eq!(&calls[calls.len() - 4..], [
            "pause http://x/a.flv",
            "unload http://x/a.flv",
            "detach http://x/a.flv",
            "destroy http://x/a.flv",
        ]);
    }

    #[test]
    fn preview_maps_brightness_to_shades() {
        let white = vec![255_u8; 8 * 8];
        assert_eq!(luma_preview(&white, 8, 8, 8, 4, 2), "@@@@\n@@@@");

        let black = vec![0_u8; 8 * 8];
        assert_eq!(luma_preview(&black, 8, 8, 8, 4, 2), "    \n    ");
    }

    #[test]
    fn preview_respects_stride_and_halves() {
        // 4x2 visible pixels in rows of stride 6; padding bytes are bright.
        let plane = [
            0, 0, 255, 255, 255, 255, //
            0, 0, 255, 255, 255, 255,
        ];
        assert_eq!(luma_preview(&plane, 4, 2, 6, 2, 1), " @");
    }

    #[test]
    fn preview_of_empty_frame_is_blank() {
        assert!(luma_preview(&[], 0, 0, 0, 10, 10).is_empty());
        assert!(luma_preview(&[128; 4], 2, 2, 2, 0, 3).is_empty());
    }
}
