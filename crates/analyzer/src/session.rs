use std::collections::HashMap;

/// What the session is currently analyzing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Firm(String),
    Wallet(String),
}

/// Explicit analysis session state, passed by reference rather than stashed
/// in ambient storage. Loaded data carries a version so downstream memoized
/// results can be invalidated on refetch without wall-clock TTLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Loading { target: Target, next_version: u64 },
    Loaded { target: Target, data_version: u64 },
    Failed { message: String },
}

impl SessionState {
    /// Select a target for analysis. Re-selecting the currently loaded
    /// target is a no-op; anything else drops prior analysis state and
    /// starts loading a fresh generation.
    pub fn select(&mut self, target: Target) {
        if let Self::Loaded { target: current, .. } = self {
            if *current == target {
                return;
            }
        }
        *self = Self::Loading {
            target,
            next_version: 1,
        };
    }

    /// Force a reload of the currently loaded target. The next generation
    /// gets a higher version, so memoized results for the old data miss.
    pub fn refresh(&mut self) {
        let prev = std::mem::replace(self, Self::Idle);
        *self = match prev {
            Self::Loaded { target, data_version } => Self::Loading {
                target,
                next_version: data_version + 1,
            },
            other => other,
        };
    }

    /// Fetch completed for the loading target. Ignored in any other state.
    pub fn data_ready(&mut self) {
        let prev = std::mem::replace(self, Self::Idle);
        *self = match prev {
            Self::Loading { target, next_version } => Self::Loaded {
                target,
                data_version: next_version,
            },
            other => other,
        };
    }

    pub fn fetch_failed(&mut self, message: impl Into<String>) {
        *self = Self::Failed {
            message: message.into(),
        };
    }

    pub fn loaded_target(&self) -> Option<&Target> {
        match self {
            Self::Loaded { target, .. } => Some(target),
            _ => None,
        }
    }
}

/// Memoized derived results keyed by `(target, data_version)`. A key is
/// valid for exactly one loaded generation: selecting a new target or
/// refreshing produces a different key, so stale entries are simply never
/// hit again.
#[derive(Debug, Default)]
pub struct MemoCache<V> {
    entries: HashMap<(Target, u64), V>,
}

impl<V> MemoCache<V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, state: &SessionState) -> Option<&V> {
        let SessionState::Loaded { target, data_version } = state else {
            return None;
        };
        self.entries.get(&(target.clone(), *data_version))
    }

    pub fn insert(&mut self, state: &SessionState, value: V) {
        if let SessionState::Loaded { target, data_version } = state {
            self.entries.insert((target.clone(), *data_version), value);
        }
    }
}
