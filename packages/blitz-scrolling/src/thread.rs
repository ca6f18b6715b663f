//! The scrolling thread and the messages crossing the thread boundary

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use blitz_traits::events::BlitzWheelEvent;
use blitz_traits::geometry::LayoutPoint;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::ScrollingError;
use crate::state::ScrollingStateTree;
use crate::tree::ScrollingTree;
use crate::ScrollingNodeId;

/// How the main thread should move the scroll layer after a position change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScrollingLayerPositionAction {
    /// Move the layer to the new position now
    Set,
    /// The compositor already shows the position, only bring layer state in line
    Sync,
}

/// Scrolling thread to main thread
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollingTreeMessage {
    ScrollPositionChanged {
        node_id: ScrollingNodeId,
        position: LayoutPoint,
        is_programmatic: bool,
        action: ScrollingLayerPositionAction,
    },
}

/// Main thread to scrolling thread
#[derive(Debug)]
pub enum ScrollingThreadMessage {
    Commit(Box<ScrollingStateTree>),
    HandleWheelEvent(BlitzWheelEvent),
    Invalidate,
    /// Reply once every earlier message has been processed
    Flush(Sender<()>),
    Shutdown,
}

/// Handle to the background thread that owns wheel handling for one page
///
/// Messages are processed strictly in the order they were sent. Dropping the handle
/// stops the thread and waits for it.
pub struct ScrollingThread {
    sender: Sender<ScrollingThreadMessage>,
    tree: Arc<ScrollingTree>,
    handle: Option<JoinHandle<()>>,
}

impl ScrollingThread {
    pub fn spawn(tree: Arc<ScrollingTree>) -> Result<Self, ScrollingError> {
        let interval = tree.config().animation_frame_interval();
        let (sender, receiver) = crossbeam_channel::unbounded();

        let thread_tree = tree.clone();
        let handle = std::thread::Builder::new()
            .name("blitz-scrolling".into())
            .spawn(move || run_scrolling_thread(thread_tree, receiver, interval))?;

        #[cfg(feature = "tracing")]
        tracing::info!("Scrolling thread started");

        Ok(Self {
            sender,
            tree,
            handle: Some(handle),
        })
    }

    pub fn tree(&self) -> &Arc<ScrollingTree> {
        &self.tree
    }

    fn send(&self, message: ScrollingThreadMessage) -> Result<(), ScrollingError> {
        self.sender
            .send(message)
            .map_err(|_| ScrollingError::ThreadDisconnected)
    }

    pub fn commit_tree_state(&self, snapshot: ScrollingStateTree) -> Result<(), ScrollingError> {
        self.send(ScrollingThreadMessage::Commit(Box::new(snapshot)))
    }

    pub fn dispatch_wheel_event(&self, event: BlitzWheelEvent) -> Result<(), ScrollingError> {
        self.send(ScrollingThreadMessage::HandleWheelEvent(event))
    }

    pub fn invalidate(&self) -> Result<(), ScrollingError> {
        self.send(ScrollingThreadMessage::Invalidate)
    }

    /// Block until the thread has processed everything sent before this call
    pub fn synchronize(&self) -> Result<(), ScrollingError> {
        let (reply, done) = crossbeam_channel::bounded(1);
        self.send(ScrollingThreadMessage::Flush(reply))?;
        done.recv().map_err(|_| ScrollingError::ThreadDisconnected)
    }
}

impl Drop for ScrollingThread {
    fn drop(&mut self) {
        let _ = self.sender.send(ScrollingThreadMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!("Scrolling thread panicked");
            }
        }
    }
}

fn run_scrolling_thread(
    tree: Arc<ScrollingTree>,
    receiver: Receiver<ScrollingThreadMessage>,
    interval: Duration,
) {
    let mut next_frame: Option<Instant> = None;

    loop {
        let message = match next_frame {
            Some(deadline) => {
                let timeout = deadline.saturating_duration_since(Instant::now());
                match receiver.recv_timeout(timeout) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match receiver.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };

        match message {
            Some(ScrollingThreadMessage::Commit(snapshot)) => tree.commit_new_tree_state(*snapshot),
            Some(ScrollingThreadMessage::HandleWheelEvent(event)) => {
                tree.handle_wheel_event(&event);
            }
            Some(ScrollingThreadMessage::Invalidate) => tree.invalidate(),
            Some(ScrollingThreadMessage::Flush(reply)) => {
                let _ = reply.send(());
            }
            Some(ScrollingThreadMessage::Shutdown) => break,
            None => {}
        }

        if !tree.is_animating() {
            next_frame = None;
            continue;
        }
        let now = Instant::now();
        let due = next_frame.is_none_or(|deadline| now >= deadline);
        if due {
            next_frame = tree.animate(now).then(|| now + interval);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Scrolling thread stopped");
}
