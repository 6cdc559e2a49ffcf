//! Random and round-robin selection over a sorted candidate set.
//!
//! Mutation goes through `&mut self`, so `select` and `update_values`
//! can never interleave. Callers that share a strategy across tasks keep
//! it behind a lock (the orchestrator's selection lock).

use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{SelectError, SelectResult};

/// How a candidate is picked from the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Uniform random pick.
    Random,
    /// Cycle through candidates in ascending order.
    #[default]
    RoundRobin,
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Random => f.write_str("random"),
            Self::RoundRobin => f.write_str("round-robin"),
        }
    }
}

impl FromStr for SelectionPolicy {
    type Err = SelectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "round-robin" | "round_robin" | "roundrobin" => Ok(Self::RoundRobin),
            _ => Err(SelectError::InvalidPolicy(s.to_string())),
        }
    }
}

/// Policy-specific cursor state, owned by one strategy instance.
#[derive(Debug)]
enum Cursor {
    Random { rng: StdRng },
    RoundRobin { index: usize },
}

impl Cursor {
    fn for_policy(policy: SelectionPolicy) -> Self {
        match policy {
            SelectionPolicy::Random => Self::Random {
                rng: StdRng::from_entropy(),
            },
            SelectionPolicy::RoundRobin => Self::RoundRobin { index: 0 },
        }
    }
}

/// A candidate set plus the policy used to pick from it.
#[derive(Debug)]
pub struct SelectionStrategy<T> {
    /// Sorted, no duplicates.
    values: Vec<T>,
    cursor: Cursor,
}

impl<T: Ord + Clone> SelectionStrategy<T> {
    /// Create a strategy for `policy` seeded with `initial` candidates.
    pub fn new(policy: SelectionPolicy, initial: impl IntoIterator<Item = T>) -> Self {
        let mut strategy = Self {
            values: Vec::new(),
            cursor: Cursor::for_policy(policy),
        };
        strategy.update_values(initial);
        strategy
    }

    /// Create a strategy from a policy name such as `"random"` or `"round-robin"`.
    pub fn from_policy_name(name: &str, initial: impl IntoIterator<Item = T>) -> SelectResult<Self> {
        let policy = name.parse::<SelectionPolicy>()?;
        Ok(Self::new(policy, initial))
    }

    /// Random strategy with a fixed seed, for reproducible draws.
    pub fn seeded_random(seed: u64, initial: impl IntoIterator<Item = T>) -> Self {
        let mut strategy = Self {
            values: Vec::new(),
            cursor: Cursor::Random {
                rng: StdRng::seed_from_u64(seed),
            },
        };
        strategy.update_values(initial);
        strategy
    }

    pub fn policy(&self) -> SelectionPolicy {
        match self.cursor {
            Cursor::Random { .. } => SelectionPolicy::Random,
            Cursor::RoundRobin { .. } => SelectionPolicy::RoundRobin,
        }
    }

    /// Replace the candidate set. Sorts, deduplicates, and wraps the
    /// round-robin cursor back into range.
    pub fn update_values(&mut self, values: impl IntoIterator<Item = T>) {
        let mut values: Vec<T> = values.into_iter().collect();
        values.sort();
        values.dedup();
        self.values = values;
        self.adjust_cursor();
    }

    fn adjust_cursor(&mut self) {
        let len = self.values.len();
        if let Cursor::RoundRobin { index } = &mut self.cursor {
            *index = if len == 0 { 0 } else { *index % len };
        }
    }

    /// Pick one candidate.
    pub fn select(&mut self) -> SelectResult<T> {
        let len = self.values.len();
        if len == 0 {
            return Err(SelectError::EmptyCandidates);
        }

        let idx = match &mut self.cursor {
            Cursor::Random { rng } => rng.gen_range(0..len),
            Cursor::RoundRobin { index } => {
                let current = *index;
                *index = (current + 1) % len;
                current
            }
        };
        Ok(self.values[idx].clone())
    }

    /// Current candidate count.
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current candidates in selection order.
    pub fn values(&self) -> &[T] {
        &self.values
    }
}
