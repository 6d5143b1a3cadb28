use crate::api::ApiError;
use crate::api::stream::{PlayRequest, PlayResponse};
use crate::notify::{Notification, Notifier};
use crate::player::MediaSource;
use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const DEFAULT_WINDOW_COUNT: usize = 4;

#[async_trait]
pub trait StreamBackend: Send + Sync {
    async fn start_stream(&self, request: &PlayRequest) -> Result<PlayResponse, ApiError>;
    async fn stop_stream(&self, session_id: &str) -> Result<(), ApiError>;
}

/// What to do when replacing a window's session and the stop call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacePolicy {
    #[default]
    Proceed,
    RequireStop,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelSelection {
    pub device_id: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StreamKind {
    #[default]
    Live,
    Playback {
        start_time: String,
        end_time: String,
    },
}

impl StreamKind {
    fn request_for(&self, selection: &ChannelSelection) -> PlayRequest {
        match self {
            Self::Live => PlayRequest::live(&selection.device_id, &selection.channel_id),
            Self::Playback {
                start_time,
                end_time,
            } => PlayRequest::playback(
                &selection.device_id,
                &selection.channel_id,
                start_time,
                end_time,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamBinding {
    pub device_id: String,
    pub channel_id: String,
    pub label: String,
    pub session: PlayResponse,
}

impl StreamBinding {
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    #[must_use]
    pub fn media_url(&self) -> &str {
        &self.session.flv_url
    }

    #[must_use]
    pub fn media_source(&self) -> MediaSource<'_> {
        MediaSource {
            session_id: Some(self.session_id()),
            url: self.media_url(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub id: String,
    pub binding: Option<StreamBinding>,
}

impl Window {
    #[must_use]
    pub fn unbound(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            binding: None,
        }
    }

    fn bound(id: &str, selection: &ChannelSelection, session: PlayResponse) -> Self {
        Self {
            id: id.to_owned(),
            binding: Some(StreamBinding {
                device_id: selection.device_id.clone(),
                channel_id: selection.channel_id.clone(),
                label: format!("{}-{}", selection.device_id, selection.channel_id),
                session,
            }),
        }
    }

    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.binding.as_ref().map(|binding| binding.device_id.as_str())
    }

    #[must_use]
    pub fn channel_id(&self) -> Option<&str> {
        self.binding.as_ref().map(|binding| binding.channel_id.as_str())
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.binding.as_ref().map(StreamBinding::session_id)
    }

    #[must_use]
    pub fn media_url(&self) -> Option<&str> {
        self.binding.as_ref().map(StreamBinding::media_url)
    }

    #[must_use]
    pub fn media_source(&self) -> Option<MediaSource<'_>> {
        self.binding.as_ref().map(StreamBinding::media_source)
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.binding.as_ref().map(|binding| binding.label.as_str())
    }

    #[must_use]
    pub fn title(&self) -> String {
        self.label()
            .map_or_else(|| format!("Window {}", self.id), str::to_owned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no channel selected")]
    NoChannelSelected,
    #[error("unknown window '{0}'")]
    UnknownWindow(String),
    #[error("window count must be a positive integer")]
    InvalidWindowCount,
    #[error(transparent)]
    Backend(#[from] ApiError),
    #[error("previous session could not be stopped: {0}")]
    ReplaceBlocked(ApiError),
    #[error("backend started a stream without a session id or FLV URL")]
    IncompleteSession,
}

const INCOMPLETE_SESSION_TEXT: &str = "Stream could not be played: no session or FLV URL returned";

fn is_playable(response: &PlayResponse) -> bool {
    !response.session_id.trim().is_empty() && !response.flv_url.trim().is_empty()
}

pub struct VideoSessionManager {
    backend: Arc<dyn StreamBackend>,
    notifier: Arc<dyn Notifier>,
    policy: ReplacePolicy,
    windows: RwLock<Vec<Window>>,
    lanes: Vec<Mutex<()>>,
    active: RwLock<usize>,
    selection: RwLock<Option<ChannelSelection>>,
}

impl std::fmt::Debug for VideoSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoSessionManager")
            .field("policy", &self.policy)
            .field("windows", &*self.windows.read())
            .field("active", &*self.active.read())
            .field("selection", &*self.selection.read())
            .finish_non_exhaustive()
    }
}

impl VideoSessionManager {
    pub fn new(
        window_count: usize,
        backend: Arc<dyn StreamBackend>,
        notifier: Arc<dyn Notifier>,
        policy: ReplacePolicy,
    ) -> Result<Self, SessionError> {
        if window_count == 0 {
            return Err(SessionError::InvalidWindowCount);
        }

        let windows = (1..=window_count)
            .map(|id| Window::unbound(id.to_string()))
            .collect();
        let lanes = (0..window_count).map(|_| Mutex::new(())).collect();

        Ok(Self {
            backend,
            notifier,
            policy,
            windows: RwLock::new(windows),
            lanes,
            active: RwLock::new(0),
            selection: RwLock::new(None),
        })
    }

    #[must_use]
    pub fn window_count(&self) -> usize {
        self.lanes.len()
    }

    #[must_use]
    pub fn policy(&self) -> ReplacePolicy {
        self.policy
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Window> {
        self.windows.read().clone()
    }

    #[must_use]
    pub fn window(&self, window_id: &str) -> Option<Window> {
        self.windows
            .read()
            .iter()
            .find(|window| window.id == window_id)
            .cloned()
    }

    #[must_use]
    pub fn active_window(&self) -> Window {
        let index = *self.active.read();
        self.windows.read()[index].clone()
    }

    #[must_use]
    pub fn selected_channel(&self) -> Option<ChannelSelection> {
        self.selection.read().clone()
    }

    pub fn select_channel(&self, device_id: impl Into<String>, channel_id: impl Into<String>) {
        let selection = ChannelSelection {
            device_id: device_id.into(),
            channel_id: channel_id.into(),
        };
        debug!(device_id = %selection.device_id, channel_id = %selection.channel_id, "channel selected");
        *self.selection.write() = Some(selection);
    }

    pub fn select_window(&self, window_id: &str) -> Result<(), SessionError> {
        let index = self.index_of(window_id)?;
        *self.active.write() = index;
        Ok(())
    }

    pub async fn play(&self) -> Result<Window, SessionError> {
        self.play_with(StreamKind::Live).await
    }

    pub async fn play_with(&self, kind: StreamKind) -> Result<Window, SessionError> {
        let window_id = self.active_window().id;
        self.play_window(&window_id, kind).await
    }

    pub async fn play_window(
        &self,
        window_id: &str,
        kind: StreamKind,
    ) -> Result<Window, SessionError> {
        let Some(selection) = self.selected_channel() else {
            self.notifier
                .notify(Notification::warning("Please select a channel"));
            return Err(SessionError::NoChannelSelected);
        };
        let index = self.index_of(window_id)?;

        let _lane = self.lanes[index].lock().await;

        let replacing = self.windows.read()[index].is_bound();
        if replacing {
            if let Err(err) = self.stop_locked(index).await {
                match self.policy {
                    ReplacePolicy::Proceed => {
                        warn!(
                            window_id,
                            "previous session not stopped, starting new stream anyway: {err}"
                        );
                    }
                    ReplacePolicy::RequireStop => {
                        self.notifier.notify(Notification::error(format!(
                            "Window {window_id} still shows the previous stream"
                        )));
                        return Err(SessionError::ReplaceBlocked(err));
                    }
                }
            }
        }

        let request = kind.request_for(&selection);
        match self.backend.start_stream(&request).await {
            Ok(response) if !is_playable(&response) => {
                warn!(
                    window_id,
                    session_id = %response.session_id,
                    "play response lacks a session id or FLV URL"
                );
                if !response.session_id.trim().is_empty() {
                    if let Err(err) = self.backend.stop_stream(&response.session_id).await {
                        debug!(window_id, "failed to release incomplete session: {err}");
                    }
                }
                self.notifier
                    .notify(Notification::error(INCOMPLETE_SESSION_TEXT));
                Err(SessionError::IncompleteSession)
            }
            Ok(response) => {
                let window = Window::bound(window_id, &selection, response);
                info!(
                    window_id,
                    device_id = %selection.device_id,
                    channel_id = %selection.channel_id,
                    session_id = window.session_id().unwrap_or_default(),
                    "stream started"
                );
                self.windows.write()[index] = window.clone();
                self.notifier.notify(Notification::success("Stream started"));
                Ok(window)
            }
            Err(err) => {
                warn!(window_id, "failed to start stream: {err}");
                self.notifier.notify(err.notification());
                Err(SessionError::Backend(err))
            }
        }
    }

    /// Stops the window's session. A window without a session is left alone.
    pub async fn stop(&self, window_id: &str) -> Result<(), SessionError> {
        let index = self.index_of(window_id)?;
        let _lane = self.lanes[index].lock().await;
        self.stop_locked(index).await?;
        Ok(())
    }

    pub async fn stop_all(&self) -> usize {
        let ids = self
            .snapshot()
            .into_iter()
            .filter(Window::is_bound)
            .map(|window| window.id)
            .collect::<Vec<_>>();

        let results = join_all(ids.iter().map(|id| self.stop(id))).await;
        results.iter().filter(|result| result.is_err()).count()
    }

    /// Caller must hold the lane for `index`. Returns whether a session was stopped.
    async fn stop_locked(&self, index: usize) -> Result<bool, ApiError> {
        let (window_id, session_id) = {
            let windows = self.windows.read();
            let window = &windows[index];
            let Some(session_id) = window.session_id() else {
                return Ok(false);
            };
            (window.id.clone(), session_id.to_owned())
        };

        match self.backend.stop_stream(&session_id).await {
            Ok(()) => {
                info!(%window_id, %session_id, "stream stopped");
                self.windows.write()[index] = Window::unbound(window_id);
                self.notifier.notify(Notification::success("Stream stopped"));
                Ok(true)
            }
            Err(err) => {
                warn!(%window_id, %session_id, "failed to stop stream: {err}");
                self.notifier.notify(err.notification());
                Err(err)
            }
        }
    }

    fn index_of(&self, window_id: &str) -> Result<usize, SessionError> {
        self.windows
            .read()
            .iter()
            .position(|window| window.id == window_id)
            .ok_or_else(|| SessionError::UnknownWindow(window_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ReplacePolicy, SessionError, StreamBackend, StreamKind, VideoSessionManager, Window,
    };
    use crate::api::ApiError;
    use crate::api::stream::{PlayRequest, PlayResponse, StreamType};
    use crate::notify::{NotificationLevel, RecordingNotifier};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Start {
            device_id: String,
            channel_id: String,
            stream_type: Option<StreamType>,
        },
        Stop(String),
    }

    #[derive(Default)]
    struct ScriptedBackend {
        calls: Mutex<Vec<Call>>,
        start_failures: Mutex<VecDeque<ApiError>>,
        stop_failures: Mutex<VecDeque<ApiError>>,
        start_responses: Mutex<VecDeque<PlayResponse>>,
        start_gate: Option<Semaphore>,
        stop_gate: Option<Semaphore>,
        sessions: Mutex<u32>,
    }

    impl ScriptedBackend {
        fn gated_starts() -> Self {
            Self {
                start_gate: Some(Semaphore::new(0)),
                ..Self::default()
            }
        }

        fn gated_stops() -> Self {
            Self {
                stop_gate: Some(Semaphore::new(0)),
                ..Self::default()
            }
        }

        fn fail_next_start(&self, err: ApiError) {
            self.start_failures.lock().push_back(err);
        }

        fn respond_next_start(&self, response: PlayResponse) {
            self.start_responses.lock().push_back(response);
        }

        fn fail_next_stop(&self, err: ApiError) {
            self.stop_failures.lock().push_back(err);
        }

        fn release_starts(&self, permits: usize) {
            if let Some(gate) = &self.start_gate {
                gate.add_permits(permits);
            }
        }

        fn release_stops(&self, permits: usize) {
            if let Some(gate) = &self.stop_gate {
                gate.add_permits(permits);
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl StreamBackend for ScriptedBackend {
        async fn start_stream(&self, request: &PlayRequest) -> Result<PlayResponse, ApiError> {
            self.calls.lock().push(Call::Start {
                device_id: request.device_id.clone(),
                channel_id: request.channel_id.clone(),
                stream_type: request.stream_type,
            });
            if let Some(gate) = &self.start_gate {
                gate.acquire().await.expect("gate open").forget();
            }
            if let Some(err) = self.start_failures.lock().pop_front() {
                return Err(err);
            }
            if let Some(response) = self.start_responses.lock().pop_front() {
                return Ok(response);
            }
            let n = {
                let mut sessions = self.sessions.lock();
                *sessions += 1;
                *sessions
            };
            let session_id = format!("S{n}");
            Ok(PlayResponse {
                flv_url: format!("http://x/{session_id}.flv"),
                hls_url: format!("http://x/{session_id}.m3u8"),
                session_id,
                ..PlayResponse::default()
            })
        }

        async fn stop_stream(&self, session_id: &str) -> Result<(), ApiError> {
            self.calls.lock().push(Call::Stop(session_id.to_owned()));
            if let Some(gate) = &self.stop_gate {
                gate.acquire().await.expect("gate open").forget();
            }
            match self.stop_failures.lock().pop_front() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    fn start(device_id: &str, channel_id: &str) -> Call {
        Call::Start {
            device_id: device_id.to_owned(),
            channel_id: channel_id.to_owned(),
            stream_type: Some(StreamType::Live),
        }
    }

    fn manager_with(
        backend: Arc<ScriptedBackend>,
        policy: ReplacePolicy,
    ) -> (Arc<VideoSessionManager>, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let manager = VideoSessionManager::new(4, backend, notifier.clone(), policy)
            .expect("manager");
        (Arc::new(manager), notifier)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[test]
    fn zero_windows_is_rejected() {
        let backend = Arc::new(ScriptedBackend::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let result = VideoSessionManager::new(0, backend, notifier, ReplacePolicy::Proceed);
        assert!(matches!(result, Err(SessionError::InvalidWindowCount)));
    }

    #[test]
    fn window_ids_follow_configured_count() {
        let backend = Arc::new(ScriptedBackend::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let manager =
            VideoSessionManager::new(6, backend, notifier, ReplacePolicy::Proceed).expect("manager");
        let ids = manager
            .snapshot()
            .into_iter()
            .map(|window| window.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6"]);
        assert_eq!(manager.active_window().id, "1");
    }

    #[test]
    fn selecting_unknown_window_keeps_active_selector() {
        let (manager, _) = manager_with(Arc::new(ScriptedBackend::default()), ReplacePolicy::Proceed);
        manager.select_window("3").expect("known window");
        assert_eq!(
            manager.select_window("9"),
            Err(SessionError::UnknownWindow("9".to_owned()))
        );
        assert_eq!(manager.active_window().id, "3");
    }

    #[tokio::test]
    async fn play_binds_active_window_and_leaves_others() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, notifier) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_window("2").expect("window");
        manager.select_channel("D1", "C1");
        let window = manager.play().await.expect("play");

        assert_eq!(window.id, "2");
        assert_eq!(window.device_id(), Some("D1"));
        assert_eq!(window.channel_id(), Some("C1"));
        assert_eq!(window.session_id(), Some("S1"));
        assert_eq!(window.media_url(), Some("http://x/S1.flv"));
        assert_eq!(window.label(), Some("D1-C1"));

        let snapshot = manager.snapshot();
        assert_eq!(snapshot[1], window);
        for id in ["1", "3", "4"] {
            assert_eq!(manager.window(id), Some(Window::unbound(id)));
        }
        assert_eq!(backend.calls(), vec![start("D1", "C1")]);
        assert_eq!(notifier.count(NotificationLevel::Success), 1);
    }

    #[tokio::test]
    async fn play_without_selection_makes_no_call() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, notifier) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        assert_eq!(manager.play().await, Err(SessionError::NoChannelSelected));
        assert!(backend.calls().is_empty());
        assert_eq!(notifier.snapshot()[0].text, "Please select a channel");
    }

    #[tokio::test]
    async fn stop_on_unbound_window_makes_no_call() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, notifier) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.stop("3").await.expect("no-op stop");
        assert!(backend.calls().is_empty());
        assert!(notifier.snapshot().is_empty());
        assert_eq!(
            manager.stop("7").await,
            Err(SessionError::UnknownWindow("7".to_owned()))
        );
    }

    #[tokio::test]
    async fn play_then_stop_restores_unbound_record() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);
        let before = manager.window("1").expect("window");

        manager.select_channel("D1", "C1");
        manager.play().await.expect("play");
        manager.stop("1").await.expect("stop");

        assert_eq!(manager.window("1"), Some(before));
        assert_eq!(
            backend.calls(),
            vec![start("D1", "C1"), Call::Stop("S1".to_owned())]
        );
    }

    #[tokio::test]
    async fn replay_stops_previous_session_first() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_window("2").expect("window");
        manager.select_channel("D1", "C1");
        manager.play().await.expect("first play");
        manager.select_channel("D2", "C2");
        let window = manager.play().await.expect("second play");

        assert_eq!(
            backend.calls(),
            vec![
                start("D1", "C1"),
                Call::Stop("S1".to_owned()),
                start("D2", "C2")
            ]
        );
        assert_eq!(window.session_id(), Some("S2"));
        assert_eq!(window.label(), Some("D2-C2"));
        assert_eq!(manager.window("2"), Some(window));
    }

    #[tokio::test]
    async fn replaying_same_channel_still_cycles_session() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_channel("D1", "C1");
        manager.play().await.expect("first play");
        let window = manager.play().await.expect("replay");

        assert_eq!(window.session_id(), Some("S2"));
        assert_eq!(backend.calls().len(), 3);
    }

    #[tokio::test]
    async fn same_channel_may_play_in_several_windows() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_channel("D1", "C1");
        manager.play().await.expect("window 1");
        manager.select_window("4").expect("window");
        manager.play().await.expect("window 4");

        assert_eq!(manager.window("1").and_then(|w| w.session_id().map(str::to_owned)), Some("S1".to_owned()));
        assert_eq!(manager.window("4").and_then(|w| w.session_id().map(str::to_owned)), Some("S2".to_owned()));
        assert!(!backend.calls().iter().any(|call| matches!(call, Call::Stop(_))));
    }

    #[tokio::test]
    async fn failed_stop_keeps_binding_and_notifies() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, notifier) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_window("2").expect("window");
        manager.select_channel("D1", "C1");
        let bound = manager.play().await.expect("play");
        notifier.take();

        backend.fail_next_stop(ApiError::Network("connection reset".to_owned()));
        let result = manager.stop("2").await;

        assert!(matches!(result, Err(SessionError::Backend(ApiError::Network(_)))));
        assert_eq!(manager.window("2"), Some(bound));
        let notes = notifier.snapshot();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert_eq!(notes[0].text, "Network error, please check your connection");
    }

    #[tokio::test]
    async fn failed_play_leaves_window_untouched() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, notifier) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_channel("D1", "C1");
        backend.fail_next_start(ApiError::Server {
            message: Some("device offline".to_owned()),
        });
        assert!(manager.play().await.is_err());
        assert_eq!(manager.window("1"), Some(Window::unbound("1")));
        assert_eq!(notifier.snapshot()[0].text, "device offline");
    }

    #[tokio::test]
    async fn failed_replace_stop_proceeds_by_default() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, notifier) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_channel("D1", "C1");
        manager.play().await.expect("first play");
        notifier.take();
        backend.fail_next_stop(ApiError::from_status(500, None));
        manager.select_channel("D2", "C2");
        let window = manager.play().await.expect("play proceeds");

        assert_eq!(window.session_id(), Some("S2"));
        assert_eq!(
            backend.calls(),
            vec![
                start("D1", "C1"),
                Call::Stop("S1".to_owned()),
                start("D2", "C2")
            ]
        );
        let notes = notifier.snapshot();
        assert_eq!(notifier.count(NotificationLevel::Error), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert_eq!(notes[0].text, "Server error");
        assert_eq!(notes[1].level, NotificationLevel::Success);
        assert_eq!(notes.len(), 2);
    }

    #[tokio::test]
    async fn response_without_session_or_url_is_rejected() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, notifier) = manager_with(backend.clone(), ReplacePolicy::Proceed);
        manager.select_channel("D1", "C1");

        backend.respond_next_start(PlayResponse::default());
        assert_eq!(manager.play().await, Err(SessionError::IncompleteSession));
        assert_eq!(manager.window("1"), Some(Window::unbound("1")));
        assert_eq!(backend.calls(), vec![start("D1", "C1")]);

        backend.respond_next_start(PlayResponse {
            session_id: "S9".to_owned(),
            ..PlayResponse::default()
        });
        assert_eq!(manager.play().await, Err(SessionError::IncompleteSession));
        assert_eq!(manager.window("1"), Some(Window::unbound("1")));
        assert_eq!(backend.calls()[2], Call::Stop("S9".to_owned()));

        assert_eq!(notifier.count(NotificationLevel::Error), 2);
        assert_eq!(notifier.count(NotificationLevel::Success), 0);
    }

    #[tokio::test]
    async fn failed_replace_stop_blocks_under_require_stop() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, notifier) = manager_with(backend.clone(), ReplacePolicy::RequireStop);

        manager.select_channel("D1", "C1");
        let bound = manager.play().await.expect("first play");
        backend.fail_next_stop(ApiError::from_status(500, None));
        manager.select_channel("D2", "C2");

        assert!(matches!(
            manager.play().await,
            Err(SessionError::ReplaceBlocked(ApiError::Server { .. }))
        ));
        assert_eq!(manager.window("1"), Some(bound));
        assert_eq!(backend.calls().len(), 2);
        assert_eq!(
            notifier.snapshot().last().map(|note| note.text.as_str()),
            Some("Window 1 still shows the previous stream")
        );
    }

    #[tokio::test]
    async fn window_switch_does_not_touch_sessions() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_channel("D1", "C1");
        let bound = manager.play().await.expect("play");
        manager.select_window("3").expect("window");
        manager.select_window("1").expect("window");

        assert_eq!(manager.window("1"), Some(bound));
        assert_eq!(manager.selected_channel().map(|s| s.device_id), Some("D1".to_owned()));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn pending_play_is_never_observed_half_bound() {
        let backend = Arc::new(ScriptedBackend::gated_starts());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);
        manager.select_channel("D1", "C1");

        let task = tokio::spawn({
            let manager = manager.clone();
            async move { manager.play_window("2", StreamKind::Live).await }
        });
        settle().await;

        assert_eq!(backend.calls().len(), 1);
        assert_eq!(manager.window("2"), Some(Window::unbound("2")));

        backend.release_starts(1);
        let window = task.await.expect("join").expect("play");
        let observed = manager.window("2").expect("window");
        assert_eq!(observed, window);
        let binding = observed.binding.expect("bound");
        assert_eq!(binding.session_id(), "S1");
        assert_eq!(binding.media_url(), "http://x/S1.flv");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_queues_behind_pending_play_on_same_window() {
        let backend = Arc::new(ScriptedBackend::gated_starts());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);
        manager.select_channel("D1", "C1");

        let play = tokio::spawn({
            let manager = manager.clone();
            async move { manager.play_window("2", StreamKind::Live).await }
        });
        settle().await;
        let stop = tokio::spawn({
            let manager = manager.clone();
            async move { manager.stop("2").await }
        });
        settle().await;

        // The stop is parked on the window lane and has not reached the backend.
        assert_eq!(backend.calls(), vec![start("D1", "C1")]);

        backend.release_starts(1);
        play.await.expect("join").expect("play");
        stop.await.expect("join").expect("stop");

        assert_eq!(
            backend.calls(),
            vec![start("D1", "C1"), Call::Stop("S1".to_owned())]
        );
        assert_eq!(manager.window("2"), Some(Window::unbound("2")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn different_windows_proceed_independently() {
        let backend = Arc::new(ScriptedBackend::gated_stops());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);
        manager.select_channel("D1", "C1");
        manager.play_window("1", StreamKind::Live).await.expect("play 1");

        let stuck_stop = tokio::spawn({
            let manager = manager.clone();
            async move { manager.stop("1").await }
        });
        settle().await;

        let other = manager
            .play_window("2", StreamKind::Live)
            .await
            .expect("window 2 is not blocked");
        assert_eq!(other.session_id(), Some("S2"));
        assert!(manager.window("1").is_some_and(|window| window.is_bound()));

        backend.release_stops(1);
        stuck_stop.await.expect("join").expect("stop");
        assert_eq!(manager.window("1"), Some(Window::unbound("1")));
    }

    #[tokio::test]
    async fn playback_requests_carry_time_range() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_channel("D1", "C1");
        manager
            .play_with(StreamKind::Playback {
                start_time: "2024-05-01 08:00:00".to_owned(),
                end_time: "2024-05-01 09:00:00".to_owned(),
            })
            .await
            .expect("playback");

        assert!(matches!(
            &backend.calls()[0],
            Call::Start {
                stream_type: Some(StreamType::Playback),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn stop_all_sweeps_bound_windows_and_counts_failures() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);

        manager.select_channel("D1", "C1");
        for id in ["1", "3"] {
            manager.play_window(id, StreamKind::Live).await.expect("play");
        }
        backend.fail_next_stop(ApiError::Network("timeout".to_owned()));

        assert_eq!(manager.stop_all().await, 1);
        let bound = manager
            .snapshot()
            .into_iter()
            .filter(Window::is_bound)
            .count();
        assert_eq!(bound, 1);
    }

    #[tokio::test]
    async fn sequential_operations_track_last_successful_play() {
        let backend = Arc::new(ScriptedBackend::default());
        let (manager, _) = manager_with(backend.clone(), ReplacePolicy::Proceed);
        manager.select_channel("D1", "C1");

        // (operation, inject failure, expected bound afterwards)
        let steps: [(&str, bool, bool); 7] = [
            ("play", false, true),
            ("stop", true, true),
            ("stop", false, false),
            ("play", true, false),
            ("stop", false, false),
            ("play", false, true),
            ("play", true, false),
        ];
        for (op, fail, expect_bound) in steps {
            match (op, fail) {
                ("play", true) => backend.fail_next_start(ApiError::NotFound),
                ("stop", true) => backend.fail_next_stop(ApiError::NotFound),
                _ => {}
            }
            let _ = match op {
                "play" => manager.play().await.map(|_| ()),
                _ => manager.stop("1").await,
            };
            let window = manager.window("1").expect("window");
            assert_eq!(window.is_bound(), expect_bound, "after {op} (fail={fail})");
        }
    }
}
