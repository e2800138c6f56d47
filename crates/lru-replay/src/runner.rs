//! Executes parsed script steps against an LruCache

use lrucache::LruCache;
use serde::Serialize;
use tracing::{debug, warn};

use crate::script::{parse_script, Command, ScriptError, Step};

/// An entry pushed out by an over-capacity insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evicted {
    /// Evicted key
    pub key: i64,
    /// Value it held
    pub value: i64,
}

/// What a single command did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Outcome {
    /// Insert or update, with the victim if one was evicted
    Put {
        /// Key written
        key: i64,
        /// Value stored
        value: i64,
        /// Evicted entry, if any
        evicted: Option<Evicted>,
    },
    /// Lookup; `None` when the key is absent
    Get {
        /// Key read
        key: i64,
        /// Value found
        value: Option<i64>,
    },
    /// Deletion; `None` when the key was absent
    Remove {
        /// Key deleted
        key: i64,
        /// Value it held
        removed: Option<i64>,
    },
    /// Recency order, most recently used first
    Dump {
        /// `(key, value)` pairs
        entries: Vec<(i64, i64)>,
    },
}

/// An outcome tagged with the script line that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Line number in the script
    pub line: usize,
    /// Result of the command
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Result of replaying a whole script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// One record per executed command
    pub records: Vec<Record>,
    /// Final recency order, most recently used first
    pub recency: Vec<(i64, i64)>,
    /// Malformed lines that were skipped
    pub skipped: Vec<ScriptError>,
}

impl Replay {
    /// Values returned by `get` commands, in order
    pub fn gets(&self) -> Vec<Option<i64>> {
        self.records
            .iter()
            .filter_map(|record| match record.outcome {
                Outcome::Get { value, .. } => Some(value),
                _ => None,
            })
            .collect()
    }
}

/// Drives an `LruCache<i64, i64>` one step at a time
pub struct Runner {
    cache: LruCache<i64, i64>,
}

impl Runner {
    /// Create a runner over a fresh cache
    pub fn new(capacity: usize) -> lrucache::Result<Self> {
        Ok(Self {
            cache: LruCache::new(capacity)?,
        })
    }

    /// Execute one step
    pub fn apply(&mut self, step: &Step) -> Record {
        let outcome = match step.command {
            Command::Put { key, value } => {
                let evicted = self.cache.put(key, value).map(|(key, value)| {
                    debug!(line = step.line, key, value, "evicted least recently used");
                    Evicted { key, value }
                });
                debug!(line = step.line, key, value, "put");
                Outcome::Put {
                    key,
                    value,
                    evicted,
                }
            }
            Command::Get { key } => {
                let value = self.cache.get(&key).copied();
                match value {
                    Some(_) => debug!(line = step.line, key, "hit, promoted"),
                    None => debug!(line = step.line, key, "miss"),
                }
                Outcome::Get { key, value }
            }
            Command::Remove { key } => {
                let removed = self.cache.remove(&key);
                debug!(line = step.line, key, found = removed.is_some(), "remove");
                Outcome::Remove { key, removed }
            }
            Command::Dump => Outcome::Dump {
                entries: self.recency(),
            },
        };

        Record {
            line: step.line,
            outcome,
        }
    }

    /// Current recency order, most recently used first
    pub fn recency(&self) -> Vec<(i64, i64)> {
        self.cache.iter().map(|(k, v)| (*k, *v)).collect()
    }
}

/// Parse and replay `source` against a cache of `capacity`
///
/// With `strict`, the first malformed line aborts the replay. Otherwise
/// malformed lines are logged and collected in `Replay::skipped`.
pub fn replay(source: &str, capacity: usize, strict: bool) -> anyhow::Result<Replay> {
    let mut runner = Runner::new(capacity)?;
    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for item in parse_script(source) {
        match item {
            Ok(step) => records.push(runner.apply(&step)),
            Err(err) if strict => return Err(err.into()),
            Err(err) => {
                warn!("Skipping {}", err);
                skipped.push(err);
            }
        }
    }

    Ok(Replay {
        records,
        recency: runner.recency(),
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::CANONICAL;

    #[test]
    fn test_canonical_replay() {
        let replay = replay(CANONICAL, 2, true).unwrap();

        assert_eq!(replay.gets(), vec![Some(1), None, None, Some(3), Some(4)]);
        assert_eq!(replay.recency, vec![(4, 4), (3, 3)]);
        assert!(replay.skipped.is_empty());
    }

    #[test]
    fn test_canonical_evictions() {
        let replay = replay(CANONICAL, 2, true).unwrap();

        let evicted: Vec<Evicted> = replay
            .records
            .iter()
            .filter_map(|r| match r.outcome {
                Outcome::Put { evicted, .. } => evicted,
                _ => None,
            })
            .collect();

        assert_eq!(
            evicted,
            vec![Evicted { key: 2, value: 2 }, Evicted { key: 1, value: 1 }]
        );
    }

    #[test]
    fn test_dump_and_remove() {
        let source = "put 1 10\nput 2 20\nget 1\ndump\nremove 2\nremove 2\n";
        let replay = replay(source, 3, true).unwrap();

        assert_eq!(
            replay.records[3].outcome,
            Outcome::Dump {
                entries: vec![(1, 10), (2, 20)]
            }
        );
        assert_eq!(
            replay.records[4].outcome,
            Outcome::Remove {
                key: 2,
                removed: Some(20)
            }
        );
        assert_eq!(
            replay.records[5].outcome,
            Outcome::Remove {
                key: 2,
                removed: None
            }
        );
        assert_eq!(replay.recency, vec![(1, 10)]);
    }

    #[test]
    fn test_lenient_skips_bad_lines() {
        let source = "put 1 1\nfrobnicate\nget 1\n";
        let replay = replay(source, 2, false).unwrap();

        assert_eq!(replay.records.len(), 2);
        assert_eq!(replay.skipped.len(), 1);
        assert_eq!(replay.skipped[0].line, 2);
    }

    #[test]
    fn test_strict_aborts_on_bad_line() {
        let source = "put 1 1\nfrobnicate\nget 1\n";
        let err = replay(source, 2, true).unwrap_err();

        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_zero_capacity_is_error() {
        let err = replay("put 1 1\n", 0, true).unwrap_err();
        assert!(err.to_string().contains("Invalid capacity"));
    }

    #[test]
    fn test_huge_capacity_replays() {
        let replay = replay(CANONICAL, 1 << 60, true).unwrap();

        // Nothing is ever evicted
        assert_eq!(replay.gets(), vec![Some(1), Some(2), Some(1), Some(3), Some(4)]);
        assert_eq!(replay.recency.len(), 4);
    }

    #[test]
    fn test_record_line_numbers() {
        let source = "\n# skip\nput 5 5\n";
        let replay = replay(source, 1, true).unwrap();

        assert_eq!(replay.records[0].line, 3);
    }

    #[test]
    fn test_runner_apply_step() {
        let mut runner = Runner::new(2).unwrap();
        let record = runner.apply(&Step {
            line: 7,
            command: Command::Put { key: 1, value: 2 },
        });

        assert_eq!(record.line, 7);
        assert_eq!(runner.recency(), vec![(1, 2)]);
        runner.cache.check_invariants().unwrap();
    }
}
