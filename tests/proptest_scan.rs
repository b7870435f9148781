//! Property-based tests for scan cursors.
//!
//! A scripted executor stands in for the server, so any sequence of rounds
//! (including empty batches) can be generated and replayed.

mod common;

use std::future::Future;
use std::sync::atomic::Ordering;

use common::ScriptedExecutor;
use ferrite_scan::{CursorId, CursorState, Error, ScanCursor, ScanOptions};
use proptest::prelude::*;

// ============================================================================
// Test Strategies
// ============================================================================

/// Batches of a scan, at least one round, empty batches allowed.
fn rounds_strategy() -> impl Strategy<Value = Vec<Vec<u32>>> {
    prop::collection::vec(prop::collection::vec(any::<u32>(), 0..6), 1..8)
}

/// Tokens `1..n-1` for the intermediate rounds and the terminal `0`.
fn scripted(rounds: &[Vec<u32>]) -> ScriptedExecutor<u32> {
    let tokens: Vec<String> = (1..rounds.len())
        .map(|i| i.to_string())
        .chain(std::iter::once("0".to_string()))
        .collect();
    ScriptedExecutor::new(
        tokens
            .iter()
            .map(String::as_str)
            .zip(rounds.iter().cloned())
            .collect(),
    )
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build")
        .block_on(future)
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Property: the items yielded are the concatenation of every batch, in
    /// order, after exactly one round-trip per batch.
    #[test]
    fn prop_yields_concatenation_of_batches(rounds in rounds_strategy()) {
        let executor = scripted(&rounds);
        let requests = executor.requests.clone();

        let (items, trips, state) = block_on(async move {
            let mut cursor = ScanCursor::new(executor, CursorId::initial(), ScanOptions::none());
            cursor.open().await.unwrap();
            let items = cursor.collect_remaining().await.unwrap();
            (items, cursor.round_trips(), cursor.state())
        });

        let expected: Vec<u32> = rounds.iter().flatten().copied().collect();
        prop_assert_eq!(items, expected);
        prop_assert_eq!(trips as usize, rounds.len());
        prop_assert_eq!(state, CursorState::Exhausted);

        let sent: Vec<String> = requests.lock().iter().map(|(_, id)| id.to_string()).collect();
        let mut tokens = vec!["0".to_string()];
        tokens.extend((1..rounds.len()).map(|i| i.to_string()));
        prop_assert_eq!(sent, tokens);
    }

    /// Property: pulling `k` items never fetches past the batch holding the
    /// k-th item.
    #[test]
    fn prop_fetches_lazily(rounds in rounds_strategy(), pick in any::<prop::sample::Index>()) {
        let total: usize = rounds.iter().map(Vec::len).sum();
        let k = if total == 0 { 0 } else { pick.index(total + 1) };
        let executor = scripted(&rounds);
        let requests = executor.requests.clone();

        block_on(async move {
            let mut cursor = ScanCursor::new(executor, CursorId::initial(), ScanOptions::none());
            cursor.open().await.unwrap();
            for _ in 0..k {
                cursor.next().await.unwrap().unwrap();
            }
            cursor.close();
        });

        let mut expected_fetches = 1;
        let mut seen = 0;
        if k > 0 {
            for (i, round) in rounds.iter().enumerate() {
                seen += round.len();
                if seen >= k {
                    expected_fetches = i + 1;
                    break;
                }
            }
        }
        prop_assert_eq!(requests.lock().len(), expected_fetches);
    }

    /// Property: closing at any point releases the executor exactly once and
    /// every later pull fails.
    #[test]
    fn prop_close_is_final(rounds in rounds_strategy(), pulls in 0usize..10) {
        let executor = scripted(&rounds);
        let released = executor.released.clone();

        let after_close = block_on(async move {
            let mut cursor = ScanCursor::new(executor, CursorId::initial(), ScanOptions::none());
            cursor.open().await.unwrap();
            for _ in 0..pulls {
                if cursor.next().await.unwrap().is_none() {
                    break;
                }
            }
            cursor.close();
            cursor.close();
            let result = cursor.has_next().await;
            drop(cursor);
            result
        });

        prop_assert_eq!(released.load(Ordering::SeqCst), 1);
        prop_assert!(matches!(after_close, Err(Error::IllegalState(_))));
    }

    /// Property: a failed round leaves the cursor where it was, and the scan
    /// can still finish afterwards from the same token.
    #[test]
    fn prop_failed_round_is_retryable(items in prop::collection::vec(any::<u32>(), 0..6)) {
        let executor = ScriptedExecutor::new(vec![("7", Vec::new())])
            .then_fail(Error::ConnectionClosed)
            .then_round("0", items.clone());
        let requests = executor.requests.clone();

        let (failed, token, state, rest) = block_on(async move {
            let mut cursor = ScanCursor::new(executor, CursorId::initial(), ScanOptions::none());
            cursor.open().await.unwrap();
            let failed = cursor.has_next().await.is_err();
            let token = cursor.cursor_id().clone();
            let state = cursor.state();
            let rest = cursor.collect_remaining().await.unwrap();
            (failed, token, state, rest)
        });

        prop_assert!(failed);
        prop_assert_eq!(token, CursorId::from("7"));
        prop_assert_eq!(state, CursorState::Open);
        prop_assert_eq!(rest, items);

        let sent: Vec<String> = requests.lock().iter().map(|(_, id)| id.to_string()).collect();
        prop_assert_eq!(sent, vec!["0", "7", "7"]);
    }
}
