//! Traversal of the timetable site.
//!
//! The crawl is a small state machine over [`CrawlRequest`]: the index page
//! seeds one listing request per alphabet character, every listing page
//! yields the grid links on it, and every grid link is decoded by the table
//! handler for its [`TableType`]. Requests run concurrently with no ordering
//! between them; decoded entries are streamed to the caller's channel as
//! they are produced.

use crate::net::{Fetcher, Page};
use crate::timetable::dom::{Document, Fragment};
use crate::timetable::table::table_type_code;
use crate::timetable::{GridConfig, PageSummary, ScheduleEntry, TableDecoder, TableType};
use crate::utils::warn_if_slow;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, trace, warn};
use url::Url;

/// Listing characters used by the site's A-Z index, including Polish letters.
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzęóąśłżźćń0123456789";

const SLOW_DECODE_THRESHOLD: Duration = Duration::from_secs(2);

/// Immutable settings for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub base_url: Url,
    pub alphabet: Vec<char>,
    /// Upper bound on simultaneous fetches.
    pub concurrency: usize,
    pub grid: GridConfig,
}

/// One unit of crawl work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlRequest {
    /// The listing index, `/link/`.
    Index,
    /// The listing filtered by one character, `/link/filtered/<c>/0`.
    Listing(char),
    /// A timetable page discovered on a listing.
    Table { kind: TableType, url: Url },
}

impl CrawlRequest {
    pub fn url(&self, base_url: &Url) -> Result<Url, url::ParseError> {
        let base = base_url.as_str().trim_end_matches('/');
        match self {
            Self::Index => Url::parse(&format!("{base}/link/")),
            Self::Listing(letter) => Url::parse(&format!("{base}/link/filtered/{letter}/0")),
            Self::Table { url, .. } => Ok(url.clone()),
        }
    }
}

impl fmt::Display for CrawlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index => f.write_str("index"),
            Self::Listing(letter) => write!(f, "listing '{letter}'"),
            Self::Table { kind, url } => write!(f, "{kind} table {url}"),
        }
    }
}

/// Counters for a finished (or cancelled) crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    pub fetch_failures: usize,
    pub tables_decoded: usize,
    pub entries: usize,
    pub blocks_skipped: usize,
    pub links_ignored: usize,
    pub unknown_table_codes: usize,
    pub duplicate_requests: usize,
    pub cancelled: bool,
}

/// Result of a single request, folded into [`CrawlStats`] by the run loop.
#[derive(Debug, Default)]
struct TaskOutcome {
    fetched: bool,
    follow_ups: Vec<CrawlRequest>,
    links_ignored: usize,
    unknown_table_codes: usize,
    page: Option<PageSummary>,
}

impl TaskOutcome {
    fn failed() -> Self {
        Self::default()
    }
}

impl CrawlStats {
    fn record(&mut self, outcome: &TaskOutcome) {
        if outcome.fetched {
            self.pages_fetched += 1;
        } else {
            self.fetch_failures += 1;
        }
        self.links_ignored += outcome.links_ignored;
        self.unknown_table_codes += outcome.unknown_table_codes;
        if let Some(page) = outcome.page {
            self.tables_decoded += 1;
            self.entries += page.decoded;
            self.blocks_skipped += page.skipped;
        }
    }
}

/// Everything a request task needs, shared read-only for one run.
struct RunContext {
    fetcher: Arc<dyn Fetcher>,
    settings: Arc<CrawlSettings>,
    decoder: TableDecoder,
    permits: Semaphore,
    tx: mpsc::Sender<ScheduleEntry>,
    cancel: CancellationToken,
}

pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    settings: Arc<CrawlSettings>,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            settings: Arc::new(settings),
        }
    }

    /// Crawl the whole site, sending every decoded entry to `tx`.
    ///
    /// Returns once every request has finished or `cancel` fires. On
    /// cancellation, queued and in-flight requests are dropped; entries
    /// already sent stay sent.
    pub async fn run(&self, tx: mpsc::Sender<ScheduleEntry>, cancel: CancellationToken) -> CrawlStats {
        let ctx = Arc::new(RunContext {
            fetcher: self.fetcher.clone(),
            settings: self.settings.clone(),
            decoder: TableDecoder::new(self.settings.base_url.as_str(), self.settings.grid),
            permits: Semaphore::new(self.settings.concurrency.max(1)),
            tx,
            cancel: cancel.clone(),
        });

        let mut tasks = JoinSet::new();
        let mut seen = HashSet::new();
        let mut stats = CrawlStats::default();

        info!(
            base_url = self.settings.base_url.as_str(),
            letters = self.settings.alphabet.len(),
            concurrency = self.settings.concurrency,
            "Starting crawl"
        );
        Self::schedule(&ctx, &mut tasks, &mut seen, &mut stats, CrawlRequest::Index);

        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(pending = tasks.len(), "Crawl cancelled, discarding pending requests");
                    stats.cancelled = true;
                    break;
                }
                joined = tasks.join_next() => joined,
            };

            match joined {
                None => break,
                Some(Ok(outcome)) => {
                    stats.record(&outcome);
                    for request in outcome.follow_ups {
                        Self::schedule(&ctx, &mut tasks, &mut seen, &mut stats, request);
                    }
                }
                Some(Err(e)) if e.is_cancelled() => {}
                Some(Err(e)) => error!(error = ?e, "Crawl task panicked"),
            }
        }

        tasks.shutdown().await;
        stats
    }

    /// Queue a request unless its URL was already requested during this run.
    fn schedule(
        ctx: &Arc<RunContext>,
        tasks: &mut JoinSet<TaskOutcome>,
        seen: &mut HashSet<Url>,
        stats: &mut CrawlStats,
        request: CrawlRequest,
    ) {
        let url = match request.url(&ctx.settings.base_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(request = %request, error = %e, "Could not build request URL");
                stats.fetch_failures += 1;
                return;
            }
        };
        if !seen.insert(url.clone()) {
            trace!(url = url.as_str(), "Already requested, skipping");
            stats.duplicate_requests += 1;
            return;
        }

        let span = tracing::debug_span!("crawl_request", request = %request);
        let ctx = ctx.clone();
        tasks.spawn(Self::execute(ctx, request, url).instrument(span));
    }

    async fn execute(ctx: Arc<RunContext>, request: CrawlRequest, url: Url) -> TaskOutcome {
        let fetched = {
            let Ok(_permit) = ctx.permits.acquire().await else {
                return TaskOutcome::failed();
            };
            ctx.fetcher.fetch(&url).await
        };
        let page = match fetched {
            Ok(page) => page,
            Err(e) => {
                warn!(url = url.as_str(), error = ?e, "Failed to fetch page");
                return TaskOutcome::failed();
            }
        };

        match request {
            CrawlRequest::Index => {
                debug!("Index fetched, requesting listings");
                TaskOutcome {
                    fetched: true,
                    follow_ups: ctx
                        .settings
                        .alphabet
                        .iter()
                        .map(|&letter| CrawlRequest::Listing(letter))
                        .collect(),
                    ..TaskOutcome::default()
                }
            }
            CrawlRequest::Listing(letter) => {
                let outcome = Self::listing_links(&page, &ctx.settings.base_url);
                debug!(
                    %letter,
                    tables = outcome.follow_ups.len(),
                    ignored = outcome.links_ignored,
                    "Listing parsed"
                );
                outcome
            }
            CrawlRequest::Table { kind, .. } => Self::decode_table(ctx, kind, page).await,
        }
    }

    /// Grid links on a listing page, one table request per recognized link.
    fn listing_links(page: &Page, base_url: &Url) -> TaskOutcome {
        let document = Document::parse(&page.body);
        let mut outcome = TaskOutcome {
            fetched: true,
            ..TaskOutcome::default()
        };

        for anchor in document.root().select("a[href]") {
            let Some(href) = anchor.attr("href") else {
                continue;
            };
            let Some(code) = table_type_code(&href) else {
                outcome.links_ignored += 1;
                continue;
            };
            let kind = match TableType::try_from(code) {
                Ok(kind) => kind,
                Err(e) => {
                    error!(href = href.as_str(), error = %e, "Grid link with a table type no handler exists for");
                    outcome.unknown_table_codes += 1;
                    continue;
                }
            };
            match base_url.join(&href) {
                Ok(url) => {
                    trace!(url = url.as_str(), code = kind.code(), %kind, "Grid link");
                    outcome.follow_ups.push(CrawlRequest::Table { kind, url });
                }
                Err(e) => {
                    warn!(href = href.as_str(), error = %e, "Unresolvable grid link");
                    outcome.links_ignored += 1;
                }
            }
        }

        outcome
    }

    /// Decode a table page on the blocking pool, streaming entries out as they are built.
    async fn decode_table(ctx: Arc<RunContext>, kind: TableType, page: Page) -> TaskOutcome {
        let worker = ctx.clone();
        let decoded = tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let page_url = page.url.as_str();
            let summary = worker.decoder.decode_html(kind, &page.body, page_url, |entry| {
                if worker.cancel.is_cancelled() || worker.tx.blocking_send(entry).is_err() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });
            warn_if_slow(start, SLOW_DECODE_THRESHOLD, page_url);
            summary
        })
        .await;

        match decoded {
            Ok(summary) => TaskOutcome {
                fetched: true,
                page: Some(summary),
                ..TaskOutcome::default()
            },
            Err(e) => {
                error!(error = ?e, "Table decoding panicked");
                TaskOutcome {
                    fetched: true,
                    ..TaskOutcome::default()
                }
            }
        }
    }
}
