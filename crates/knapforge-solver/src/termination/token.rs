//! Shared cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Node {
    cancelled: AtomicBool,
    parent: Option<Arc<Node>>,
}

/// Cancellation flag shared by reference between the search and its workers.
///
/// A token created with [`child`](Self::child) reports cancellation when
/// either itself or any ancestor has been cancelled; cancelling a child
/// leaves the parent untouched.
///
/// # Example
///
/// ```
/// use knapforge_solver::termination::CancellationToken;
///
/// let root = CancellationToken::new();
/// let worker = root.child();
/// assert!(!worker.is_cancelled());
///
/// root.cancel();
/// assert!(worker.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    node: Arc<Node>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that is also cancelled by this one.
    pub fn child(&self) -> Self {
        Self {
            node: Arc::new(Node {
                cancelled: AtomicBool::new(false),
                parent: Some(Arc::clone(&self.node)),
            }),
        }
    }

    /// Creates a token cancelled by this one's ancestors but not by this
    /// one.
    pub fn sibling(&self) -> Self {
        Self {
            node: Arc::new(Node {
                cancelled: AtomicBool::new(false),
                parent: self.node.parent.clone(),
            }),
        }
    }

    pub fn cancel(&self) {
        self.node.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        let mut node = Some(&self.node);
        while let Some(current) = node {
            if current.cancelled.load(Ordering::SeqCst) {
                return true;
            }
            node = current.parent.as_ref();
        }
        false
    }
}
