use na_core::config::DEFAULT_REFRESH_COOLDOWN;
use na_core::{Analysis, AnalysisService, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct ViewModelConfig {
    /// Minimum gap between the starts of two refreshes.
    pub refresh_cooldown: Duration,
}

impl Default for ViewModelConfig {
    fn default() -> Self {
        Self {
            refresh_cooldown: DEFAULT_REFRESH_COOLDOWN,
        }
    }
}

impl ViewModelConfig {
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The list was replaced with this many analyses.
    Refreshed(usize),
    /// Skipped: the previous refresh started less than a cooldown ago.
    Throttled,
    /// The reply arrived after a newer refresh had already been applied and was dropped.
    Stale,
}

#[derive(Debug, Default)]
struct State {
    analyses: Vec<Analysis>,
    selected: Option<Analysis>,
    last_fetch_started: Option<Instant>,
    issued: u64,
    applied: u64,
    in_flight: usize,
    /// Analyses merged while a refresh was in flight, tagged with the last
    /// sequence number issued at merge time.
    merged_during_fetch: Vec<(u64, Analysis)>,
}

impl State {
    fn upsert(&mut self, analysis: Analysis) {
        if let Some(existing) = self.analyses.iter_mut().find(|a| a.id == analysis.id) {
            *existing = analysis;
        } else {
            self.analyses.insert(0, analysis);
        }
    }

    /// Installs the reply of refresh `seq`, then re-applies any merge that
    /// happened after that refresh was issued.
    fn apply_refresh(&mut self, seq: u64, analyses: Vec<Analysis>) {
        self.applied = seq;
        self.analyses = analyses;
        self.merged_during_fetch.retain(|(stamp, _)| *stamp >= seq);
        for (_, analysis) in self.merged_during_fetch.clone() {
            self.upsert(analysis);
        }
        if self.in_flight == 0 {
            self.merged_during_fetch.clear();
        }
    }

    /// Points the selection at the copy of the same analysis in the current list, if any.
    fn refresh_selection(&mut self) {
        let Some(selected) = &self.selected else {
            return;
        };
        if let Some(fresh) = self.analyses.iter().find(|a| a.id == selected.id) {
            self.selected = Some(fresh.clone());
        }
    }
}

/// In-memory list of analyses plus the current selection.
///
/// Refreshes are rate limited: the cooldown is armed when a refresh starts,
/// whether or not it later succeeds. Each refresh carries a sequence number
/// and a reply older than the last applied one is discarded, so a slow
/// earlier request can never overwrite a newer list. Analyses merged while a
/// refresh is in flight survive that refresh's reply.
pub struct AnalysisViewModel {
    service: Arc<dyn AnalysisService>,
    config: ViewModelConfig,
    state: Mutex<State>,
}

struct InFlight<'a>(&'a Mutex<State>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = self.0.lock().unwrap_or_else(|e| e.into_inner());
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

impl AnalysisViewModel {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self::with_config(service, ViewModelConfig::default())
    }

    pub fn with_config(service: Arc<dyn AnalysisService>, config: ViewModelConfig) -> Self {
        Self {
            service,
            config,
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn fetch_analyses(&self) -> Result<FetchOutcome> {
        let seq = {
            let mut state = self.lock();
            let now = Instant::now();
            if let Some(last) = state.last_fetch_started {
                if now.duration_since(last) < self.config.refresh_cooldown {
                    tracing::debug!("refresh skipped, cooldown active");
                    return Ok(FetchOutcome::Throttled);
                }
            }
            state.last_fetch_started = Some(now);
            state.issued += 1;
            state.in_flight += 1;
            state.issued
        };

        let result = {
            let _in_flight = InFlight(&self.state);
            self.service.get_analyses().await
        };
        let analyses = result?;

        let mut state = self.lock();
        if seq < state.applied {
            tracing::debug!(seq, applied = state.applied, "dropping stale analyses reply");
            return Ok(FetchOutcome::Stale);
        }
        state.apply_refresh(seq, analyses);
        state.refresh_selection();
        tracing::info!("📰 Loaded {} analyses", state.analyses.len());
        Ok(FetchOutcome::Refreshed(state.analyses.len()))
    }

    /// Replaces the selection. The analysis does not have to be in the list.
    pub fn select_analysis(&self, analysis: Analysis) {
        self.lock().selected = Some(analysis);
    }

    pub fn clear_selection(&self) {
        self.lock().selected = None;
    }

    /// Inserts or replaces one analysis by id; new ones go first.
    pub fn merge_analysis(&self, analysis: Analysis) {
        let mut state = self.lock();
        if state.in_flight > 0 {
            let stamp = state.issued;
            state.merged_during_fetch.push((stamp, analysis.clone()));
        }
        state.upsert(analysis);
        state.refresh_selection();
    }

    /// Seeds the list from a cache without touching the refresh cooldown.
    pub fn restore(&self, analyses: Vec<Analysis>) {
        let mut state = self.lock();
        state.analyses = analyses;
        state.refresh_selection();
    }

    pub fn analyses(&self) -> Vec<Analysis> {
        self.lock().analyses.clone()
    }

    pub fn selected(&self) -> Option<Analysis> {
        self.lock().selected.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().in_flight > 0
    }
}
