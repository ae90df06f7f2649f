//! Background pipeline worker.
//!
//! One thread owns the `Session` and runs every task in submission order, so
//! no two inferences ever overlap. Live frames go through a keep-latest
//! mailbox: if a frame is still waiting when a newer one arrives, the waiting
//! frame is dropped and counted. Batch frames are queued as ordinary tasks and
//! answered synchronously.
//!
//! Results and faults leave the worker on an unbounded channel, so a slow
//! consumer never stalls inference.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use anyhow::{anyhow, Context, Result};

use crate::aggregate::ClassificationResult;
use crate::config::PipelineConfig;
use crate::error::{PipelineFault, PoseError};
use crate::frame::FrameInput;
use crate::session::Session;

/// What the worker hands to the presentation side.
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    Result(ClassificationResult),
    Fault(PipelineFault),
}

enum Task {
    /// Take whatever is in the mailbox.
    Frame,
    Process(FrameInput, Sender<Result<ClassificationResult, String>>),
    Rebuild(PipelineConfig),
    Shutdown,
}

#[derive(Default)]
struct Mailbox {
    pending: Mutex<Option<FrameInput>>,
    dropped: AtomicU64,
}

impl Mailbox {
    fn take(&self) -> Option<FrameInput> {
        match self.pending.lock() {
            Ok(mut pending) => pending.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

pub struct PipelineWorker {
    tasks: Sender<Task>,
    mailbox: Arc<Mailbox>,
    join: Option<JoinHandle<()>>,
}

impl PipelineWorker {
    /// Start a worker that opens sessions with `Session::open`.
    pub fn spawn(config: PipelineConfig, events: Sender<PipelineEvent>) -> Result<Self> {
        Self::spawn_with(config, events, Session::open)
    }

    /// Start a worker with a custom session constructor. The constructor runs
    /// on the worker thread, at start and on every rebuild. A rebuilt session
    /// keeps the identity strategy of the one it replaces.
    pub fn spawn_with<F>(
        config: PipelineConfig,
        events: Sender<PipelineEvent>,
        factory: F,
    ) -> Result<Self>
    where
        F: FnMut(PipelineConfig) -> Result<Session, PoseError> + Send + 'static,
    {
        let (tasks, rx) = mpsc::channel();
        let mailbox = Arc::new(Mailbox::default());
        let mailbox_thread = Arc::clone(&mailbox);
        let join = std::thread::Builder::new()
            .name("pose-worker".to_string())
            .spawn(move || run_worker(rx, mailbox_thread, events, config, factory))
            .context("failed to spawn pipeline worker")?;
        Ok(Self {
            tasks,
            mailbox,
            join: Some(join),
        })
    }

    /// Offer a live frame. Replaces (and counts) any frame still waiting.
    pub fn submit_latest(&self, frame: FrameInput) -> Result<()> {
        let superseded = {
            let mut pending = self
                .mailbox
                .pending
                .lock()
                .map_err(|_| anyhow!("pipeline mailbox poisoned"))?;
            pending.replace(frame).is_some()
        };
        if superseded {
            // A wake-up is already queued for the mailbox.
            self.mailbox.dropped.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        self.send(Task::Frame)
    }

    /// Process one frame in order with everything queued before it and wait for the result.
    pub fn process_blocking(&self, frame: FrameInput) -> Result<ClassificationResult> {
        let (reply, response) = mpsc::channel();
        self.send(Task::Process(frame, reply))?;
        response
            .recv()
            .map_err(|_| anyhow!("pipeline worker exited before replying"))?
            .map_err(|msg| anyhow!(msg))
    }

    /// Replace the session. Queued work ahead of the rebuild runs on the old one.
    /// Slot history is reset; the identity strategy carries over.
    pub fn rebuild(&self, config: PipelineConfig) -> Result<()> {
        self.send(Task::Rebuild(config))
    }

    /// Live frames superseded before the worker picked them up.
    pub fn dropped_frames(&self) -> u64 {
        self.mailbox.dropped.load(Ordering::Relaxed)
    }

    /// Finish queued work, release the session and join the thread.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        // The worker may already be gone; joining still reports a panic.
        let _ = self.tasks.send(Task::Shutdown);
        join.join()
            .map_err(|_| anyhow!("pipeline worker thread panicked"))
    }

    fn send(&self, task: Task) -> Result<()> {
        self.tasks
            .send(task)
            .map_err(|_| anyhow!("pipeline worker is not running"))
    }
}

impl Drop for PipelineWorker {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log::error!("pipeline worker shutdown: {}", err);
        }
    }
}

fn run_worker<F>(
    rx: Receiver<Task>,
    mailbox: Arc<Mailbox>,
    events: Sender<PipelineEvent>,
    config: PipelineConfig,
    mut factory: F,
) where
    F: FnMut(PipelineConfig) -> Result<Session, PoseError>,
{
    let mut session = open_session(&mut factory, config, &events);

    while let Ok(task) = rx.recv() {
        match task {
            Task::Frame => {
                let Some(frame) = mailbox.take() else {
                    continue;
                };
                match session.as_mut() {
                    Some(session) => {
                        let result = session.process(&frame);
                        let _ = events.send(PipelineEvent::Result(result));
                    }
                    None => log::debug!("no session; skipping frame {}", frame.timestamp_ms),
                }
            }
            Task::Process(frame, reply) => {
                let outcome = match session.as_mut() {
                    Some(session) => Ok(session.process(&frame)),
                    None => Err("no classification session is open".to_string()),
                };
                let _ = reply.send(outcome);
            }
            Task::Rebuild(config) => {
                // Release the old models before loading new ones.
                let identity = session.take().map(Session::into_identity);
                session = open_session(&mut factory, config, &events);
                if let Some(identity) = identity {
                    session = session.map(|fresh| fresh.with_identity(identity));
                }
            }
            Task::Shutdown => break,
        }
    }

    drop(session);
    log::info!(
        "pipeline worker stopped ({} live frames dropped)",
        mailbox.dropped.load(Ordering::Relaxed)
    );
}

fn open_session<F>(
    factory: &mut F,
    config: PipelineConfig,
    events: &Sender<PipelineEvent>,
) -> Option<Session>
where
    F: FnMut(PipelineConfig) -> Result<Session, PoseError>,
{
    let delegate = config.delegate;
    match factory(config) {
        Ok(mut session) => {
            for fault in session.take_faults() {
                let _ = events.send(PipelineEvent::Fault(fault));
            }
            Some(session)
        }
        Err(err) => {
            log::error!("failed to open classification session: {}", err);
            let _ = events.send(PipelineEvent::Fault(PipelineFault::from_error(&err, delegate)));
            None
        }
    }
}
