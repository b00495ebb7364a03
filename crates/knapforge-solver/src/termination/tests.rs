//! Tests for cancellation and time budgets.

use std::thread;
use std::time::Duration;

use super::*;

#[test]
fn test_token_starts_live() {
    let token = CancellationToken::new();
    assert!(!token.is_cancelled());
    token.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn test_clones_share_the_flag() {
    let token = CancellationToken::new();
    let clone = token.clone();
    clone.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn test_child_does_not_cancel_parent() {
    let root = CancellationToken::new();
    let child = root.child();
    let grandchild = child.child();
    child.cancel();
    assert!(!root.is_cancelled());
    assert!(grandchild.is_cancelled());
}

#[test]
fn test_sibling_follows_ancestors_only() {
    let root = CancellationToken::new();
    let worker = root.child();
    let sibling = worker.sibling();
    worker.cancel();
    assert!(!sibling.is_cancelled());
    root.cancel();
    assert!(sibling.is_cancelled());

    let top = CancellationToken::new();
    let detached = top.sibling();
    top.cancel();
    assert!(!detached.is_cancelled());
}

#[test]
fn test_cancel_is_visible_across_threads() {
    let root = CancellationToken::new();
    let worker = root.child();
    let handle = thread::spawn(move || {
        while !worker.is_cancelled() {
            thread::yield_now();
        }
        true
    });
    root.cancel();
    assert!(handle.join().unwrap());
}

#[test]
fn test_unlimited_budget() {
    let budget = TimeBudget::unlimited();
    assert!(budget.check_time());
    assert_eq!(budget.limit(), None);
}

#[test]
fn test_budget_expires() {
    let budget = TimeBudget::new(Some(Duration::from_millis(5)));
    thread::sleep(Duration::from_millis(10));
    assert!(!budget.check_time());
    assert!(budget.elapsed() >= Duration::from_millis(5));
}

#[test]
fn test_zero_budget_is_exhausted() {
    assert!(!TimeBudget::millis(0).check_time());
}
