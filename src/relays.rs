use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Deduplicated set of relay exit addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayList(BTreeSet<Ipv4Addr>);

impl RelayList {
    pub fn contains(&self, ip: &Ipv4Addr) -> bool {
        self.0.contains(ip)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Ipv4Addr> for RelayList {
    fn from_iter<T: IntoIterator<Item = Ipv4Addr>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for RelayList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, ip) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ip}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshState {
    #[default]
    Idle,
    Refreshing,
}

/// Where a relay list was loaded from, in the order sources are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelaySource {
    Remote,
    Backup,
}

impl RelaySource {
    pub const ORDERED: [RelaySource; 2] = [RelaySource::Remote, RelaySource::Backup];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Backup => "backup",
        }
    }
}

impl Display for RelaySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelaySnapshot {
    pub relays: Arc<RelayList>,
    pub source: Option<RelaySource>,
    pub updated_at: Option<DateTime<Utc>>,
    pub state: RefreshState,
}

impl RelaySnapshot {
    pub fn is_refreshing(&self) -> bool {
        self.state == RefreshState::Refreshing
    }
}

/// The allowed-ip cache. Every write swaps in a whole new snapshot, so
/// readers only ever see a complete relay list.
#[derive(Debug, Default)]
pub struct RelayCache(pub ArcSwap<RelaySnapshot>);

impl RelayCache {
    pub fn new(relays: RelayList) -> Self {
        Self(ArcSwap::from_pointee(RelaySnapshot {
            relays: Arc::new(relays),
            ..Default::default()
        }))
    }

    pub fn store(&self, snapshot: RelaySnapshot) {
        self.0.store(Arc::new(snapshot));
    }

    pub fn load(&self) -> Arc<RelaySnapshot> {
        self.0.load_full()
    }

    pub fn begin_refresh(&self) {
        self.set_state(RefreshState::Refreshing);
    }

    /// Replaces the relay list, or keeps the current one when `loaded` is
    /// `None`. Either way the cache goes back to `Idle`.
    pub fn finish_refresh(&self, loaded: Option<(RelayList, RelaySource)>) {
        match loaded {
            Some((relays, source)) => self.store(RelaySnapshot {
                relays: Arc::new(relays),
                source: Some(source),
                updated_at: Some(Utc::now()),
                state: RefreshState::Idle,
            }),
            None => self.set_state(RefreshState::Idle),
        }
    }

    fn set_state(&self, state: RefreshState) {
        self.0.rcu(|current| RelaySnapshot {
            state,
            ..RelaySnapshot::clone(current)
        });
    }
}
