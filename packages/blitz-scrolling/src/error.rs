//! Error types for the scrolling subsystem
//!
//! Coordinator notifications log these and carry on. The scrolling tree never
//! returns them: it answers `SendToMainThread` instead.

use blitz_traits::page::FrameId;
use thiserror::Error;

use crate::ScrollingNodeId;

#[derive(Error, Debug)]
pub enum ScrollingError {
    #[error("Page has been destroyed")]
    PageDetached,

    #[error("Frame {0:?} has no frame view")]
    UnknownFrame(FrameId),

    #[error("Parent scrolling node {0} is not in the scrolling state tree")]
    UnknownParentNode(ScrollingNodeId),

    #[error("Scrolling node {0} is not in the scrolling state tree")]
    UnknownNode(ScrollingNodeId),

    #[error("Scrolling state tree has no root node")]
    NoRootNode,

    #[error("Failed to spawn the scrolling thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    #[error("Scrolling thread is no longer running")]
    ThreadDisconnected,
}
