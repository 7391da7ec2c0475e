//! Shortest edit script between two token sequences.
//!
//! Implements the Myers O(ND) diagonal search.
//!
//! | Algorithm | Time       | Space      | Best for          |
//! |-----------|------------|------------|-------------------|
//! | DP        | O(n*m)     | O(n*m)     | tiny inputs (≤ 8) |
//! | **Myers** | O((n+m)*d) | O(d*(n+m)) | **small diffs**   |
//!
//! List updates between renders usually touch a handful of items, so `d`
//! stays small and the search is close to linear.
//!
//! # Space Complexity Note
//!
//! The full trace is kept for backtracking (`O(d)` snapshots of size
//! `O(n+m)`). A linear-space divide-and-conquer variant would trade 2x time
//! for `O(n+m)` space.
//!
//! # References
//!
//! - Myers, E.W. "An O(ND) Difference Algorithm and Its Variations" (1986)

// =============================================================================
// Public Types
// =============================================================================

/// One step of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// `old[old]` survives as `new[new]`
    Retain { old: usize, new: usize },
    /// `new[new]` is inserted
    Insert { new: usize },
    /// `old[old]` is deleted
    Delete { old: usize },
}

impl EditOp {
    pub fn is_retain(&self) -> bool {
        matches!(self, EditOp::Retain { .. })
    }
}

/// Edit script in sequence order.
///
/// Walking the ops front to back visits `old` and `new` monotonically, so a
/// cursor over live nodes can apply them directly.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EditScript {
    pub ops: Vec<EditOp>,
    pub stats: EditStats,
}

impl EditScript {
    /// Inserts plus deletes.
    pub fn edit_count(&self) -> usize {
        self.stats.edit_count()
    }
}

/// Counts per op kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EditStats {
    pub retained: usize,
    pub inserted: usize,
    pub deleted: usize,
}

impl EditStats {
    pub fn edit_count(&self) -> usize {
        self.inserted + self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.edit_count() == 0
    }
}

// =============================================================================
// Main API
// =============================================================================

/// Compute a minimal edit script turning `old` into `new`.
pub fn diff_sequences<T: PartialEq>(old: &[T], new: &[T]) -> EditScript {
    let (prefix, suffix) = common_affixes(old, new);
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mid = if old_mid.is_empty() || new_mid.is_empty() {
        Vec::new()
    } else if old_mid.len() <= 8 && new_mid.len() <= 8 {
        small_lcs_dp(old_mid, new_mid)
    } else {
        let mut search = Search::new(old_mid, new_mid);
        while !search.step() {}
        search.backtrack()
    };

    build_script(old.len(), new.len(), prefix, suffix, &mid)
}

/// [`diff_sequences`] that yields to the executor between edit-distance
/// iterations.
///
/// Each iteration runs to completion before yielding, so the result is
/// identical to the synchronous version.
#[cfg(feature = "async")]
pub async fn diff_sequences_async<T: PartialEq>(old: &[T], new: &[T]) -> EditScript {
    let (prefix, suffix) = common_affixes(old, new);
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mid = if old_mid.is_empty() || new_mid.is_empty() {
        Vec::new()
    } else if old_mid.len() <= 8 && new_mid.len() <= 8 {
        small_lcs_dp(old_mid, new_mid)
    } else {
        let mut search = Search::new(old_mid, new_mid);
        while !search.step() {
            yield_now().await;
        }
        search.backtrack()
    };

    build_script(old.len(), new.len(), prefix, suffix, &mid)
}

/// Return `Pending` once, waking immediately.
#[cfg(feature = "async")]
async fn yield_now() {
    let mut yielded = false;
    futures_util::future::poll_fn(move |cx| {
        if yielded {
            std::task::Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            std::task::Poll::Pending
        }
    })
    .await
}

// =============================================================================
// Myers Algorithm Core
// =============================================================================

/// Lengths of the common prefix and suffix (non-overlapping).
fn common_affixes<T: PartialEq>(old: &[T], new: &[T]) -> (usize, usize) {
    let n = old.len();
    let m = new.len();

    let mut prefix = 0;
    while prefix < n && prefix < m && old[prefix] == new[prefix] {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < n - prefix && suffix < m - prefix && old[n - 1 - suffix] == new[m - 1 - suffix] {
        suffix += 1;
    }

    (prefix, suffix)
}

/// Forward diagonal search, advanced one edit distance at a time.
///
/// For each `d` it tracks the furthest-reaching path on every diagonal
/// `k = x - y`. The bound on `d` is `n + m`, where the search always ends.
struct Search<'a, T> {
    old: &'a [T],
    new: &'a [T],
    /// `v[k + offset]` = furthest x on diagonal k
    v: Vec<usize>,
    /// Snapshot of `v` before each iteration, for backtracking
    trace: Vec<Vec<usize>>,
    offset: usize,
    d: usize,
}

impl<'a, T: PartialEq> Search<'a, T> {
    fn new(old: &'a [T], new: &'a [T]) -> Self {
        let max_d = old.len() + new.len();
        Self {
            old,
            new,
            v: vec![0; 2 * max_d + 1],
            trace: Vec::new(),
            offset: max_d,
            d: 0,
        }
    }

    /// Run iteration `d`; returns true once the end point is reached.
    fn step(&mut self) -> bool {
        let (n, m) = (self.old.len(), self.new.len());
        let d = self.d as isize;
        if self.d > n + m {
            return true;
        }

        self.trace.push(self.v.clone());

        for k in (-d..=d).step_by(2) {
            let kk = (k + self.offset as isize) as usize;

            // At k=-d only an insert reaches this diagonal, at k=d only a delete
            let mut x = if k == -d || (k != d && self.v[kk - 1] < self.v[kk + 1]) {
                self.v[kk + 1]
            } else {
                self.v[kk - 1] + 1
            };
            let mut y = (x as isize - k) as usize;

            while x < n && y < m && self.old[x] == self.new[y] {
                x += 1;
                y += 1;
            }

            self.v[kk] = x;

            if x >= n && y >= m {
                return true;
            }
        }

        self.d += 1;
        false
    }

    /// Walk the trace backwards, collecting matched pairs.
    fn backtrack(&self) -> Vec<(usize, usize)> {
        let mut x = self.old.len();
        let mut y = self.new.len();
        let offset = self.offset as isize;
        let mut lcs = Vec::new();

        for (d, v) in self.trace.iter().enumerate().rev() {
            let d = d as isize;
            let k = x as isize - y as isize;
            let kk = (k + offset) as usize;

            let prev_k = if d == 0 {
                0
            } else if k == -d || (k != d && v[kk - 1] < v[kk + 1]) {
                k + 1
            } else {
                k - 1
            };

            let prev_x = if d == 0 { 0 } else { v[(prev_k + offset) as usize] };
            let prev_y = (prev_x as isize - prev_k) as usize;

            while x > prev_x && y > prev_y {
                x -= 1;
                y -= 1;
                lcs.push((x, y));
            }

            if d > 0 {
                if prev_k < k {
                    x = prev_x;
                } else {
                    y = prev_y;
                }
            }

            if x == 0 && y == 0 {
                break;
            }
        }

        lcs.reverse();
        lcs
    }
}

/// O(n*m) DP for inputs of at most 8 tokens per side.
fn small_lcs_dp<T: PartialEq>(old: &[T], new: &[T]) -> Vec<(usize, usize)> {
    let n = old.len();
    let m = new.len();

    let mut dp = [[0u8; 9]; 9];

    for i in 1..=n {
        for j in 1..=m {
            dp[i][j] = if old[i - 1] == new[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }

    let mut lcs = Vec::with_capacity(dp[n][m] as usize);
    let mut i = n;
    let mut j = m;

    while i > 0 && j > 0 {
        if old[i - 1] == new[j - 1] {
            lcs.push((i - 1, j - 1));
            i -= 1;
            j -= 1;
        } else if dp[i - 1][j] > dp[i][j - 1] {
            i -= 1;
        } else {
            j -= 1;
        }
    }

    lcs.reverse();
    lcs
}

/// Interleave matched pairs with the deletes and inserts between them.
///
/// `mid` indexes the middle slices; prefix and suffix pairs are added here.
fn build_script(n: usize, m: usize, prefix: usize, suffix: usize, mid: &[(usize, usize)]) -> EditScript {
    let mut script = EditScript::default();
    let pairs = (0..prefix)
        .map(|i| (i, i))
        .chain(mid.iter().map(|&(o, n)| (o + prefix, n + prefix)))
        .chain((0..suffix).map(|i| (n - suffix + i, m - suffix + i)))
        // Sentinel flushing the tail
        .chain(std::iter::once((n, m)));

    let (mut i, mut j) = (0, 0);
    for (oi, ni) in pairs {
        for old in i..oi {
            script.ops.push(EditOp::Delete { old });
            script.stats.deleted += 1;
        }
        for new in j..ni {
            script.ops.push(EditOp::Insert { new });
            script.stats.inserted += 1;
        }
        if oi < n && ni < m {
            script.ops.push(EditOp::Retain { old: oi, new: ni });
            script.stats.retained += 1;
        }
        (i, j) = (oi + 1, ni + 1);
    }

    script
}

// =============================================================================
// Tests
// =============================================================================
