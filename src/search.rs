//! Site search overlay: debounced, ranked matching over the search table.

use crate::shared::config::SearchConfig;
use crate::shared::highlight::{Span, highlight};
use crate::shared::host::HostPage;
use crate::shared::matcher::Matcher;
use crate::shared::models::{DISMISS_KEY, ScoredRecord, SearchRecord};
use anyhow::{Result, anyhow};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

/// What choosing a result did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Asked the host to open the vacancies listing.
    Vacancies,
    Revealed { anchor: String },
    MissingAnchor { anchor: String },
}

#[derive(Debug)]
struct PendingCommit {
    due: Instant,
    generation: u64,
}

pub struct SearchPipeline<H> {
    table: Arc<[SearchRecord]>,
    matcher: Matcher,
    config: SearchConfig,
    host: H,
    open: bool,
    raw_query: String,
    committed_query: String,
    results: Vec<ScoredRecord>,
    pending: Option<PendingCommit>,
    /// Bumped on every keystroke; a commit only lands if it is still current.
    generation: u64,
    commits: u64,
}

impl<H: HostPage> SearchPipeline<H> {
    pub fn new(table: Arc<[SearchRecord]>, matcher: Matcher, config: SearchConfig, host: H) -> Self {
        Self {
            table,
            matcher,
            config,
            host,
            open: false,
            raw_query: String::new(),
            committed_query: String::new(),
            results: Vec::new(),
            pending: None,
            generation: 0,
            commits: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn raw_query(&self) -> &str {
        &self.raw_query
    }

    pub fn committed_query(&self) -> &str {
        &self.committed_query
    }

    pub fn results(&self) -> &[ScoredRecord] {
        &self.results
    }

    /// Number of committed queries so far.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    pub fn open(&mut self) {
        if !self.open {
            self.open = true;
            info!("Search opened");
        }
    }

    /// Close the overlay, forget the query and drop any pending commit.
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        self.raw_query.clear();
        self.committed_query.clear();
        self.results.clear();
        self.pending = None;
        self.generation += 1;
        info!("Search closed");
    }

    pub fn key(&mut self, key: &str) {
        if key == DISMISS_KEY {
            self.close();
        }
    }

    /// A keystroke: replace the raw query and restart the quiet period.
    pub fn input(&mut self, raw: &str, now: Instant) {
        if !self.open {
            debug!("Ignoring search input while closed");
            return;
        }
        self.raw_query = raw.to_string();
        self.generation += 1;
        self.pending = Some(PendingCommit {
            due: now + self.config.debounce(),
            generation: self.generation,
        });
    }

    /// Commit the raw query once it has been stable for the quiet period.
    /// Returns true when the committed query and results were refreshed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.pending.as_ref().is_none_or(|p| p.due > now) {
            return false;
        }
        let Some(commit) = self.pending.take() else {
            return false;
        };

        let query = self.raw_query.clone();
        let results = if query.trim().chars().count() < self.config.min_query_chars {
            Vec::new()
        } else {
            self.matcher.rank(&query, &self.table)
        };
        self.apply(commit.generation, query, results)
    }

    fn apply(&mut self, generation: u64, query: String, results: Vec<ScoredRecord>) -> bool {
        if generation != self.generation {
            debug!("Dropping stale results for {:?}", query);
            return false;
        }
        info!("Committed {:?}: {} results", query, results.len());
        self.committed_query = query;
        self.results = results;
        self.commits += 1;
        true
    }

    /// Title and description of a result, split around the committed query.
    pub fn highlighted(&self, result: &ScoredRecord) -> (Vec<Span>, Vec<Span>) {
        (
            highlight(&result.record.title, &self.committed_query),
            highlight(&result.record.description, &self.committed_query),
        )
    }

    /// Choose the result at `index`: the overlay closes, then the host either
    /// opens the vacancies listing or reveals the result's anchor.
    pub fn select(&mut self, index: usize) -> Option<Selection> {
        let target = self.results.get(index)?.record.target_id.clone();
        self.close();

        if target == self.config.vacancies_target {
            self.host.open_vacancies();
            return Some(Selection::Vacancies);
        }

        if self.host.has_anchor(&target) {
            self.host.reveal(&target, self.config.highlight());
            Some(Selection::Revealed { anchor: target })
        } else {
            warn!("No anchor named {:?} on the page", target);
            Some(Selection::MissingAnchor { anchor: target })
        }
    }
}

#[derive(Debug, Clone)]
pub enum SearchCommand {
    Open,
    Close,
    Key(String),
    Input(String),
    Select(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Opened,
    Closed,
    Results {
        query: String,
        results: Vec<ScoredRecord>,
    },
    Selected(Selection),
}

/// A [`SearchPipeline`] running on its own task.
pub struct SearchSession {
    commands: mpsc::UnboundedSender<SearchCommand>,
    task: JoinHandle<()>,
}

impl SearchSession {
    pub fn spawn<H>(pipeline: SearchPipeline<H>) -> (Self, mpsc::UnboundedReceiver<SearchEvent>)
    where
        H: HostPage + Send + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_pipeline(pipeline, command_rx, event_tx));
        (Self { commands, task }, events)
    }

    pub fn send(&self, command: SearchCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Search session has ended"))
    }

    pub async fn shutdown(self) -> Result<()> {
        let Self { commands, task } = self;
        drop(commands);
        task.await?;
        Ok(())
    }
}

async fn run_pipeline<H: HostPage>(
    mut pipeline: SearchPipeline<H>,
    mut commands: mpsc::UnboundedReceiver<SearchCommand>,
    events: mpsc::UnboundedSender<SearchEvent>,
) {
    loop {
        let deadline = pipeline.next_deadline();
        let was_open = pipeline.is_open();

        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                match command {
                    SearchCommand::Open => pipeline.open(),
                    SearchCommand::Close => pipeline.close(),
                    SearchCommand::Key(key) => pipeline.key(&key),
                    SearchCommand::Input(raw) => pipeline.input(&raw, Instant::now()),
                    SearchCommand::Select(index) => {
                        if let Some(selection) = pipeline.select(index) {
                            let _ = events.send(SearchEvent::Selected(selection));
                        }
                    }
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if pipeline.poll(Instant::now()) {
                    let _ = events.send(SearchEvent::Results {
                        query: pipeline.committed_query().to_string(),
                        results: pipeline.results().to_vec(),
                    });
                }
            }
        }

        if pipeline.is_open() != was_open {
            let event = if pipeline.is_open() {
                SearchEvent::Opened
            } else {
                SearchEvent::Closed
            };
            let _ = events.send(event);
        }
    }
    debug!("Search session ended");
}
