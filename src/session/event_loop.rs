use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::protocol::{Notice, Request, Response, SessionEvent};
use super::Session;
use crate::watch::{self, ChangeDecision, SaveWatcher, WatchEvent};

/// Front-end side of a running session.
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    pub notices: mpsc::Receiver<Notice>,
    pub task: JoinHandle<()>,
}

impl SessionHandle {
    /// Send a request and wait for its response. `None` once the session ended.
    pub async fn request(&self, request: Request) -> Option<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.events
            .send(SessionEvent::Request(request, reply_tx))
            .await
            .ok()?;
        reply_rx.await.ok()
    }

    /// Raw inbox, for feeding events from elsewhere.
    pub fn sender(&self) -> mpsc::Sender<SessionEvent> {
        self.events.clone()
    }
}

/// Run `session` on its own task. With `watch` set, every opened save is
/// watched for external changes.
pub fn spawn_session(session: Session, watch: bool) -> SessionHandle {
    let (events_tx, events_rx) = mpsc::channel::<SessionEvent>(64);
    let (notice_tx, notice_rx) = mpsc::channel::<Notice>(16);

    let watch_tx = watch.then(|| events_tx.downgrade());
    let task = tokio::spawn(run_session(session, events_rx, watch_tx, notice_tx));

    SessionHandle {
        events: events_tx,
        notices: notice_rx,
        task,
    }
}

async fn run_session(
    mut session: Session,
    mut inbox: mpsc::Receiver<SessionEvent>,
    watch_tx: Option<mpsc::WeakSender<SessionEvent>>,
    notices: mpsc::Sender<Notice>,
) {
    let mut watcher: Option<SaveWatcher> = None;
    if session.save_path().is_some() {
        watcher = rewatch(&mut session, watch_tx.as_ref(), &notices).await;
    }

    while let Some(event) = inbox.recv().await {
        match event {
            SessionEvent::Request(Request::Quit, reply) => {
                let _ = reply.send(Response::Closed);
                break;
            }
            SessionEvent::Request(request, reply) => {
                let opens = matches!(request, Request::Open { .. });
                let response = session.handle(request);
                if opens && !response.is_failure() {
                    drop(watcher.take());
                    watcher = rewatch(&mut session, watch_tx.as_ref(), &notices).await;
                }
                let _ = reply.send(response);
            }
            SessionEvent::Watch(WatchEvent::Changed { path }) => {
                if session.on_file_changed(&path) == ChangeDecision::AskToRescan {
                    let _ = notices.send(Notice::RescanRequested { path }).await;
                }
            }
            SessionEvent::Watch(WatchEvent::Failed { path, reason }) => {
                if let Some(e) = session.on_watch_failed(&path, &reason) {
                    watcher = None;
                    let _ = notices
                        .send(Notice::WatchDisabled {
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        }
    }

    drop(watcher);
    info!("session_closed");
}

/// Register a watch on the current save. A watch that cannot be set up
/// disables the coordinator and is reported like a later watch failure.
async fn rewatch(
    session: &mut Session,
    watch_tx: Option<&mpsc::WeakSender<SessionEvent>>,
    notices: &mpsc::Sender<Notice>,
) -> Option<SaveWatcher> {
    let path = session.save_path()?.to_path_buf();
    let watch_tx = watch_tx?.clone();
    match watch::watch_save(&path, watch_tx) {
        Ok(watcher) => {
            debug!(save = %path.display(), "watch_registered");
            Some(watcher)
        }
        Err(e) => {
            if let Some(e) = session.on_watch_failed(&path, &e.to_string()) {
                let _ = notices
                    .send(Notice::WatchDisabled {
                        reason: e.to_string(),
                    })
                    .await;
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::MemoryAliasStore;
    use crate::document::SAVE_FILE_NAME;
    use crate::error::Error;
    use crate::index::{HomePolicy, IndexOptions};
    use crate::session::tests::sample_save;
    use crate::watch::WatchState;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn session() -> Session {
        let options = IndexOptions {
            policy: HomePolicy::AnyDesignatedHome,
            spawn_offset: 0.0,
        };
        Session::new(options, Box::new(MemoryAliasStore::new()))
    }

    fn write_sample(temp: &TempDir) -> PathBuf {
        let path = temp.path().join(SAVE_FILE_NAME);
        fs::write(&path, serde_json::to_vec(&sample_save()).unwrap()).unwrap();
        path
    }

    async fn next_notice(handle: &mut SessionHandle) -> Notice {
        tokio::time::timeout(Duration::from_secs(5), handle.notices.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_requests_are_answered() {
        let temp = TempDir::new().unwrap();
        let path = write_sample(&temp);
        let handle = spawn_session(session(), false);

        let opened = handle
            .request(Request::Open { path, remember: false })
            .await
            .unwrap();
        assert!(matches!(opened, Response::Candidates(ref c) if c.len() == 2));

        match handle.request(Request::Items(1)).await.unwrap() {
            Response::Items { label, items } => {
                assert_eq!(label, "ISLAND_1");
                assert_eq!(items.get("CRAB HOME"), Some(&1));
            }
            other => panic!("unexpected response {other:?}"),
        }

        assert!(matches!(
            handle.request(Request::Items(9)).await.unwrap(),
            Response::Failed(Error::UnknownCandidate(9))
        ));

        assert!(matches!(
            handle.request(Request::Quit).await.unwrap(),
            Response::Closed
        ));
        handle.task.await.unwrap();
    }

    #[tokio::test]
    async fn test_external_change_raises_notice() {
        let temp = TempDir::new().unwrap();
        let path = write_sample(&temp);
        let mut handle = spawn_session(session(), true);

        handle
            .request(Request::Open { path: path.clone(), remember: false })
            .await
            .unwrap();

        fs::write(&path, b"{\"Persistent\":{}}").unwrap();
        assert_eq!(
            next_notice(&mut handle).await,
            Notice::RescanRequested { path: path.clone() }
        );

        match handle.request(Request::Answer(true)).await.unwrap() {
            Response::Answered(Some(found)) => assert!(found.is_empty()),
            other => panic!("unexpected response {other:?}"),
        }
        match handle.request(Request::Status).await.unwrap() {
            Response::Status { watch, .. } => assert_eq!(watch, WatchState::Armed),
            other => panic!("unexpected response {other:?}"),
        }
        handle.request(Request::Quit).await.unwrap();
    }

    #[tokio::test]
    async fn test_own_write_raises_no_notice() {
        let temp = TempDir::new().unwrap();
        let path = write_sample(&temp);
        let mut handle = spawn_session(session(), true);

        handle
            .request(Request::Open { path: path.clone(), remember: false })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let relocated = handle.request(Request::Relocate(1)).await.unwrap();
        assert!(matches!(relocated, Response::Relocated { .. }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.notices.try_recv().is_err());
        handle.request(Request::Quit).await.unwrap();
    }

    #[tokio::test]
    async fn test_rescan_raises_no_notice() {
        let temp = TempDir::new().unwrap();
        let path = write_sample(&temp);
        let mut handle = spawn_session(session(), true);

        handle
            .request(Request::Open { path: path.clone(), remember: false })
            .await
            .unwrap();
        handle.request(Request::Scan).await.unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.notices.try_recv().is_err());
        handle.request(Request::Quit).await.unwrap();
    }

    #[tokio::test]
    async fn test_watch_failure_disables_watch() {
        let temp = TempDir::new().unwrap();
        let path = write_sample(&temp);
        let mut handle = spawn_session(session(), true);

        handle
            .request(Request::Open { path: path.clone(), remember: false })
            .await
            .unwrap();
        handle
            .sender()
            .send(SessionEvent::Watch(WatchEvent::Failed {
                path: path.clone(),
                reason: "queue overflow".into(),
            }))
            .await
            .unwrap();

        assert!(matches!(
            next_notice(&mut handle).await,
            Notice::WatchDisabled { .. }
        ));
        match handle.request(Request::Status).await.unwrap() {
            Response::Status { watch, .. } => {
                assert!(matches!(watch, WatchState::Disabled { .. }))
            }
            other => panic!("unexpected response {other:?}"),
        }
        handle.request(Request::Quit).await.unwrap();
    }
}
