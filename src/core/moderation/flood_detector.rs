// Flood Detector - repetition flood and message-rate flood.
//
// Rate flood state is ephemeral: one sliding window of timestamps per
// (guild, user), pruned on every access and wiped wholesale by a periodic
// sweep so idle users never accumulate.

use dashmap::DashMap;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Length of the trailing window for rate flood.
pub const SPAM_WINDOW: Duration = Duration::from_secs(5);
/// More than this many messages inside the window is a flood.
pub const SPAM_THRESHOLD: usize = 5;
/// How often every window is cleared regardless of activity.
pub const SPAM_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

const REPETITION_MIN_LEN: usize = 10;
const REPETITION_MIN_DENSE_LEN: usize = 5;
const REPETITION_RATIO: f64 = 0.6;

/// Detects "aaaaaaaaaaaa" style messages.
///
/// Whitespace is stripped first; the check only applies above 10 characters.
/// Flags when a single character makes up more than 60% of what remains.
pub fn is_repetition_flood(content: &str) -> bool {
    let normalized: Vec<char> = content
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let len = normalized.len();
    if len <= REPETITION_MIN_LEN || len <= REPETITION_MIN_DENSE_LEN {
        return false;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in &normalized {
        *counts.entry(*c).or_insert(0) += 1;
    }

    let limit = len as f64 * REPETITION_RATIO;
    counts.values().any(|&count| count as f64 > limit)
}

type WindowKey = (u64, u64);

/// Per-(guild, user) sliding windows of message timestamps.
pub struct SpamWindows {
    windows: DashMap<WindowKey, VecDeque<Instant>>,
    // Readers are per-message updates, the writer is the sweep.
    sweep_gate: RwLock<()>,
    window: Duration,
    threshold: usize,
}

impl Default for SpamWindows {
    fn default() -> Self {
        Self::new(SPAM_WINDOW, SPAM_THRESHOLD)
    }
}

impl SpamWindows {
    pub fn new(window: Duration, threshold: usize) -> Self {
        Self {
            windows: DashMap::new(),
            sweep_gate: RwLock::new(()),
            window,
            threshold,
        }
    }

    /// Record a message at `now`. Returns `true` when this message tips the
    /// user over the threshold; the user's window is emptied in that case so
    /// the rest of the burst does not trigger again.
    pub fn record(&self, guild_id: u64, user_id: u64, now: Instant) -> bool {
        let _gate = self
            .sweep_gate
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut entry = self.windows.entry((guild_id, user_id)).or_default();
        let window = entry.value_mut();

        window.push_back(now);
        while let Some(oldest) = window.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() > self.threshold {
            window.clear();
            return true;
        }
        false
    }

    /// Timestamps currently held for a user.
    pub fn window_len(&self, guild_id: u64, user_id: u64) -> usize {
        self.windows
            .get(&(guild_id, user_id))
            .map(|w| w.len())
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.windows.len()
    }

    /// Drop every window. Returns how many users were tracked.
    pub fn sweep(&self) -> usize {
        let _gate = self
            .sweep_gate
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let cleared = self.windows.len();
        self.windows.clear();
        cleared
    }
}

/// Run `sweep` every `interval` until `shutdown` flips to `true`.
pub fn spawn_sweeper(
    windows: Arc<SpamWindows>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let cleared = windows.sweep();
                    tracing::debug!(cleared, "Spam window sweep");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Spam window sweeper stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repetition_flood_examples() {
        assert!(is_repetition_flood("aaaaaaaaaaaa"));
        assert!(!is_repetition_flood("hello world!"));
    }

    #[test]
    fn test_repetition_ignores_short_messages() {
        // 10 characters after stripping: not long enough
        assert!(!is_repetition_flood("aaaaaaaaaa"));
        assert!(!is_repetition_flood("a a a a a a a a a a"));
        assert!(is_repetition_flood("aaaaaaaaaaa"));
    }

    #[test]
    fn test_repetition_threshold_is_strictly_above_sixty_percent() {
        // 15 chars, 9 'a' = exactly 60%: not flagged
        assert!(!is_repetition_flood("aaaaaaaaabcdefg"));
        // 15 chars, 10 'a' > 60%: flagged
        assert!(is_repetition_flood("aaaaaaaaaabcdef"));
    }

    #[test]
    fn test_repetition_is_case_insensitive_and_counts_chars() {
        assert!(is_repetition_flood("AaAaAaAaAaAa"));
        assert!(is_repetition_flood("üüüüüüüüüüüü"));
    }

    #[test]
    fn test_sixth_message_in_window_triggers() {
        let windows = SpamWindows::default();
        let start = Instant::now();

        for i in 0..5 {
            let at = start + Duration::from_millis(i * 100);
            assert!(!windows.record(1, 2, at), "message {} should pass", i + 1);
        }

        assert!(windows.record(1, 2, start + Duration::from_millis(500)));
        assert_eq!(windows.window_len(1, 2), 0);

        // 7th inside the same 5 seconds starts from an empty window
        assert!(!windows.record(1, 2, start + Duration::from_millis(600)));
        assert_eq!(windows.window_len(1, 2), 1);
    }

    #[test]
    fn test_old_entries_are_pruned() {
        let windows = SpamWindows::default();
        let start = Instant::now();

        for i in 0..5 {
            windows.record(1, 2, start + Duration::from_millis(i * 10));
        }
        // Well past the window: only the new entry remains
        assert!(!windows.record(1, 2, start + Duration::from_secs(6)));
        assert_eq!(windows.window_len(1, 2), 1);
    }

    #[test]
    fn test_windows_are_per_guild_and_user() {
        let windows = SpamWindows::default();
        let now = Instant::now();

        for _ in 0..5 {
            windows.record(1, 2, now);
        }
        assert!(!windows.record(1, 3, now));
        assert!(!windows.record(9, 2, now));
        assert!(windows.record(1, 2, now));
    }

    #[test]
    fn test_sweep_clears_everything() {
        let windows = SpamWindows::default();
        let now = Instant::now();
        windows.record(1, 2, now);
        windows.record(1, 3, now);

        assert_eq!(windows.sweep(), 2);
        assert_eq!(windows.tracked_users(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_and_stops() {
        let windows = Arc::new(SpamWindows::default());
        windows.record(1, 2, Instant::now());

        let (tx, rx) = watch::channel(false);
        let handle = spawn_sweeper(Arc::clone(&windows), Duration::from_secs(60), rx);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(windows.tracked_users(), 0);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
