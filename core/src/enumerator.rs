//! # Subdomain Enumeration
//!
//! Brute-forces `<label>.<domain>` for every candidate with a fixed pool of
//! tokio workers.
//!
//! 1. Workers claim candidates through a shared atomic cursor, so each one is
//!    resolved exactly once.
//! 2. Live hosts (and their optional HTTP probe) land in a [`LiveSet`].
//! 3. Claiming stops once the cap is reached or the scan is cancelled.
//!    Lookups already in flight are allowed to finish.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use subrank_common::cancel::CancelToken;
use subrank_common::config::SubdomainLimit;
use subrank_common::error::ConfigurationError;
use subrank_common::models::{Candidate, LiveSubdomain, Resolution};
use subrank_common::target::Domain;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::probe::HttpProbe;
use crate::resolver::DnsResolver;

/// Candidates checked between two progress reports.
pub const PROGRESS_STEP: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub checked: usize,
    pub total: usize,
    pub live: usize,
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Live hosts keyed by lowercase FQDN. The cap is enforced under the same
/// lock as the insert.
pub struct LiveSet {
    hosts: Mutex<HashMap<String, LiveSubdomain>>,
    limit: SubdomainLimit,
}

impl LiveSet {
    pub fn new(limit: SubdomainLimit) -> Self {
        Self {
            hosts: Mutex::new(HashMap::new()),
            limit,
        }
    }

    /// Stores `subdomain` unless the set is full or already holds the name.
    pub fn insert(&self, subdomain: LiveSubdomain) -> bool {
        let key: String = subdomain.name().to_ascii_lowercase();
        let mut hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        if hosts.contains_key(&key) || self.limit.is_reached(hosts.len()) {
            return false;
        }
        hosts.insert(key, subdomain);
        true
    }

    pub fn len(&self) -> usize {
        self.hosts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.limit.is_reached(self.len())
    }

    /// Copies the set out, ordered by name.
    pub fn sorted(&self) -> Vec<LiveSubdomain> {
        let hosts = self.hosts.lock().unwrap_or_else(PoisonError::into_inner);
        let mut live: Vec<LiveSubdomain> = hosts.values().cloned().collect();
        live.sort_by(|a, b| a.name().cmp(b.name()));
        live
    }
}

pub struct Enumerator {
    resolver: Arc<dyn DnsResolver>,
    probe: Option<Arc<dyn HttpProbe>>,
    threads: usize,
    limit: SubdomainLimit,
    on_progress: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl Enumerator {
    pub fn new(resolver: Arc<dyn DnsResolver>, threads: usize, limit: SubdomainLimit) -> Self {
        Self {
            resolver,
            probe: None,
            threads: threads.max(1),
            limit,
            on_progress: None,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HttpProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn enumerate(
        &self,
        domain: &Domain,
        candidates: &[Candidate],
    ) -> Result<Vec<LiveSubdomain>, ConfigurationError> {
        if candidates.is_empty() {
            return Err(ConfigurationError::NoCandidates);
        }

        let names: Arc<Vec<String>> = Arc::new(candidates.iter().map(|c| c.fqdn(domain)).collect());
        let total: usize = names.len();
        let live = Arc::new(LiveSet::new(self.limit));
        let cursor = Arc::new(AtomicUsize::new(0));
        let checked = Arc::new(AtomicUsize::new(0));

        info!(
            "Enumerating {total} candidates against {domain} with {} workers",
            self.threads
        );

        let mut workers: JoinSet<()> = JoinSet::new();
        for _ in 0..self.threads.min(total) {
            let worker = Worker {
                names: names.clone(),
                cursor: cursor.clone(),
                checked: checked.clone(),
                live: live.clone(),
                resolver: self.resolver.clone(),
                probe: self.probe.clone(),
                on_progress: self.on_progress.clone(),
                cancel: self.cancel.clone(),
            };
            workers.spawn(worker.run());
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Enumeration worker failed: {e}");
            }
        }

        if let Some(callback) = &self.on_progress {
            callback(Progress {
                checked: checked.load(Ordering::SeqCst),
                total,
                live: live.len(),
            });
        }

        if self.cancel.is_cancelled() {
            info!("Enumeration cancelled, keeping {} live hosts", live.len());
        }

        Ok(live.sorted())
    }
}

struct Worker {
    names: Arc<Vec<String>>,
    cursor: Arc<AtomicUsize>,
    checked: Arc<AtomicUsize>,
    live: Arc<LiveSet>,
    resolver: Arc<dyn DnsResolver>,
    probe: Option<Arc<dyn HttpProbe>>,
    on_progress: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl Worker {
    async fn run(self) {
        loop {
            if self.cancel.is_cancelled() || self.live.is_full() {
                break;
            }
            let index: usize = self.cursor.fetch_add(1, Ordering::SeqCst);
            let Some(name) = self.names.get(index) else {
                break;
            };

            self.check(name).await;

            let done: usize = self.checked.fetch_add(1, Ordering::SeqCst) + 1;
            if done % PROGRESS_STEP == 0 {
                if let Some(callback) = &self.on_progress {
                    callback(Progress {
                        checked: done,
                        total: self.names.len(),
                        live: self.live.len(),
                    });
                }
            }
        }
    }

    async fn check(&self, name: &str) {
        let host = self.resolver.resolve(name).await;
        if !host.is_live() {
            match &host.outcome {
                Resolution::NxDomain | Resolution::Success => {}
                Resolution::Timeout => debug!("{name}: lookup timed out"),
                Resolution::Error(failure) => debug!("{name}: {failure}"),
            }
            return;
        }

        let probe = match &self.probe {
            Some(probe) => Some(probe.probe(name).await),
            None => None,
        };

        if self.live.insert(LiveSubdomain::new(host, probe)) {
            debug!("Found live subdomain {name}");
        }
    }
}
