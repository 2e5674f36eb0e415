//! A read-through cache of ledger queries that stays consistent with confirmed mutations.
//!
//! Each query is keyed by a [`QueryKey`] fingerprinting the cluster, the program, and (for
//! single entries) the address. Reads go through [`QueryCache::read`]:
//!
//! - a fresh entry is returned as is,
//! - a missing or stale entry is fetched, and
//! - concurrent reads of a key share one in-flight fetch instead of each hitting the network.
//!
//! [`QueryCache::on_confirmed`] invalidates everything a confirmed mutation could have changed.
//! Subscribers get a [`CacheNotification`] for every invalidation, refresh, and discard, so a UI
//! knows when to read again.

use std::{
    cell::{
        Cell,
        RefCell,
    },
    collections::HashMap,
    future::Future,
};

use chrono::{
    DateTime,
    Utc,
};
use colored::Colorize;
use futures::future::{
    FutureExt,
    LocalBoxFuture,
    Shared,
};
use journal_interface::Cluster;
use solana_address::Address;
use tokio::sync::broadcast;

use crate::{
    error::JournalResult,
    ledger::ProgramAccountInfo,
    logs::fmt_tag,
    print_kv,
    transactions::{
        MutationKind,
        MutationReceipt,
    },
    views::{
        AccountListing,
        JournalEntry,
    },
    LogColor,
};

const NOTIFICATION_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Every entry of the program.
    Accounts { cluster: Cluster, program_id: Address },
    /// The entry at one address.
    Account {
        cluster: Cluster,
        program_id: Address,
        address: Address,
    },
    /// The program's own account, for the deployment probe.
    ProgramAccount { cluster: Cluster, program_id: Address },
}

impl core::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            QueryKey::Accounts {
                cluster,
                program_id,
            } => write!(f, "journal/{cluster}/{program_id}/all"),
            QueryKey::Account {
                cluster,
                program_id,
                address,
            } => write!(f, "journal/{cluster}/{program_id}/{address}"),
            QueryKey::ProgramAccount {
                cluster,
                program_id,
            } => write!(f, "program/{cluster}/{program_id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueryData {
    Accounts(AccountListing),
    /// `None` when there is no entry at the address.
    Account(Option<JournalEntry>),
    ProgramAccount(Option<ProgramAccountInfo>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    /// The data reflects the last fetch and nothing has invalidated it since.
    Fresh,
    /// There's no data yet, or it was invalidated; the next read fetches.
    Stale,
    /// A fetch is in flight.
    Fetching,
}

/// A read-only snapshot of one cache entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub data: Option<QueryData>,
    pub status: CacheStatus,
    pub updated_at: Option<DateTime<Utc>>,
}

/// What a confirmed mutation did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalEvent {
    Created {
        address: Address,
        owner: Address,
        title: String,
    },
    Updated {
        address: Address,
        owner: Address,
        title: String,
    },
    Deleted {
        address: Address,
        owner: Address,
        title: String,
    },
}

impl JournalEvent {
    pub fn address(&self) -> &Address {
        match self {
            JournalEvent::Created { address, .. }
            | JournalEvent::Updated { address, .. }
            | JournalEvent::Deleted { address, .. } => address,
        }
    }
}

impl From<&MutationReceipt> for JournalEvent {
    fn from(receipt: &MutationReceipt) -> Self {
        let (address, owner, title) = (receipt.address, receipt.owner, receipt.title.clone());
        match receipt.kind {
            MutationKind::Create => JournalEvent::Created {
                address,
                owner,
                title,
            },
            MutationKind::Update => JournalEvent::Updated {
                address,
                owner,
                title,
            },
            MutationKind::Delete => JournalEvent::Deleted {
                address,
                owner,
                title,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheNotification {
    /// The entry is stale and will be fetched on the next read.
    Invalidated {
        key: QueryKey,
        cause: Option<JournalEvent>,
    },
    /// A fetch completed and the entry holds new data.
    Refreshed { key: QueryKey },
    /// The entry was dropped from the cache.
    Discarded { key: QueryKey },
}

type SharedFetch = Shared<LocalBoxFuture<'static, JournalResult<QueryData>>>;

#[derive(Default)]
struct Slot {
    data: Option<QueryData>,
    stale: bool,
    updated_at: Option<DateTime<Utc>>,
    /// The id and future of the fetch whose result this slot will accept.
    in_flight: Option<(u64, SharedFetch)>,
}

impl Slot {
    fn status(&self) -> CacheStatus {
        match (&self.in_flight, &self.data, self.stale) {
            (Some(_), _, _) => CacheStatus::Fetching,
            (None, Some(_), false) => CacheStatus::Fresh,
            _ => CacheStatus::Stale,
        }
    }
}

/// The query cache for one program on one cluster.
///
/// Single-threaded: state lives in a [`RefCell`] that's never borrowed across an await.
pub struct QueryCache {
    cluster: Cluster,
    program_id: Address,
    slots: RefCell<HashMap<QueryKey, Slot>>,
    next_fetch_id: Cell<u64>,
    /// How many open views observe each key.
    observers: RefCell<HashMap<QueryKey, usize>>,
    notifier: broadcast::Sender<CacheNotification>,
    debug_logs: bool,
}

impl QueryCache {
    pub fn new(cluster: Cluster, program_id: Address, debug_logs: bool) -> Self {
        let (notifier, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            cluster,
            program_id,
            slots: Default::default(),
            next_fetch_id: Cell::new(0),
            observers: Default::default(),
            notifier,
            debug_logs,
        }
    }

    pub fn accounts_key(&self) -> QueryKey {
        QueryKey::Accounts {
            cluster: self.cluster,
            program_id: self.program_id,
        }
    }

    pub fn account_key(&self, address: Address) -> QueryKey {
        QueryKey::Account {
            cluster: self.cluster,
            program_id: self.program_id,
            address,
        }
    }

    pub fn program_account_key(&self) -> QueryKey {
        QueryKey::ProgramAccount {
            cluster: self.cluster,
            program_id: self.program_id,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheNotification> {
        self.notifier.subscribe()
    }

    /// A snapshot of the entry for `key`, if there is one.
    pub fn peek(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.slots.borrow().get(key).map(|slot| CacheEntry {
            key: key.clone(),
            data: slot.data.clone(),
            status: slot.status(),
            updated_at: slot.updated_at,
        })
    }

    /// Returns the cached data for `key` if it's fresh. Otherwise joins the in-flight fetch for
    /// `key`, or starts one with `fetch` if there isn't one.
    ///
    /// A failed fetch keeps the last good data in place and leaves the entry stale.
    pub async fn read<F, Fut>(&self, key: &QueryKey, fetch: F) -> JournalResult<QueryData>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = JournalResult<QueryData>> + 'static,
    {
        let (fetch_id, shared) = {
            let mut slots = self.slots.borrow_mut();
            let slot = slots.entry(key.clone()).or_default();
            if slot.status() == CacheStatus::Fresh {
                if let Some(data) = &slot.data {
                    return Ok(data.clone());
                }
            }

            match &slot.in_flight {
                Some((id, shared)) => (*id, shared.clone()),
                None => {
                    let id = self.next_fetch_id.get();
                    self.next_fetch_id.set(id + 1);
                    let shared = fetch().boxed_local().shared();
                    slot.in_flight = Some((id, shared.clone()));
                    (id, shared)
                }
            }
        };

        let result = shared.await;
        self.settle(key, fetch_id, &result);
        result
    }

    /// Stores the result of fetch `fetch_id` if the slot is still waiting on it. Every caller
    /// sharing the fetch calls this; only the first one has any effect.
    fn settle(&self, key: &QueryKey, fetch_id: u64, result: &JournalResult<QueryData>) {
        {
            let mut slots = self.slots.borrow_mut();
            let Some(slot) = slots.get_mut(key) else {
                return;
            };
            if !matches!(&slot.in_flight, Some((id, _)) if *id == fetch_id) {
                return;
            }

            slot.in_flight = None;
            match result {
                Ok(data) => {
                    slot.data = Some(data.clone());
                    slot.stale = false;
                    slot.updated_at = Some(Utc::now());
                }
                Err(_) => slot.stale = true,
            }
        }

        if result.is_ok() {
            self.notify(CacheNotification::Refreshed { key: key.clone() });
        }
    }

    /// Marks `key` stale so that the next read fetches again. A fetch already in flight for
    /// `key` may still finish for its current callers, but its result isn't stored.
    pub fn invalidate(&self, key: &QueryKey, cause: Option<JournalEvent>) {
        if let Some(slot) = self.slots.borrow_mut().get_mut(key) {
            slot.stale = true;
            slot.in_flight = None;
        }

        if self.debug_logs {
            print_kv!(fmt_tag("cache", LogColor::Warning), format!("invalidated {key}"));
        }
        self.notify(CacheNotification::Invalidated {
            key: key.clone(),
            cause,
        });
    }

    /// Invalidates the program's collection and the entry touched by a confirmed mutation.
    pub fn on_confirmed(&self, receipt: &MutationReceipt) {
        let event = JournalEvent::from(receipt);
        self.invalidate(&self.accounts_key(), Some(event.clone()));
        self.invalidate(&self.account_key(receipt.address), Some(event));
    }

    /// Drops the entry for `key`, e.g. when the view that read it is torn down.
    pub fn discard(&self, key: &QueryKey) {
        if self.slots.borrow_mut().remove(key).is_some() {
            self.notify(CacheNotification::Discarded { key: key.clone() });
        }
    }

    /// Registers one more view observing `key`. Pair with [`QueryCache::release`].
    pub fn retain(&self, key: &QueryKey) {
        *self.observers.borrow_mut().entry(key.clone()).or_default() += 1;
    }

    /// Unregisters a view observing `key`, and discards the entry once no view is left.
    pub fn release(&self, key: &QueryKey) {
        let last = {
            let mut observers = self.observers.borrow_mut();
            match observers.get_mut(key) {
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                _ => {
                    observers.remove(key);
                    true
                }
            }
        };

        if last {
            self.discard(key);
        }
    }

    fn notify(&self, notification: CacheNotification) {
        // No subscribers isn't an error.
        let _ = self.notifier.send(notification);
    }
}
