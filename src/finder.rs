//! Finder facade: the core API a host serving layer consumes
//!
//! [`Finder`] wires the namespace index, the aligner, and the interval
//! tracker behind the explicit [`GraphiteAdapter`] trait: `find_nodes`,
//! `fetch_one`/`fetch_many`, `get_bounds`. The host adapter glues this to
//! whatever framework serves queries; no wire or on-disk format lives here.
//!
//! Collaborators are injected through [`FinderBuilder`]; the search index and
//! cache are optional, their absence is a valid configuration.

use crate::align;
use crate::bounds::{BoundsOptions, IntervalTracker};
use crate::config::Config;
use crate::error::{Error, Result, StoreError};
use crate::index::{IndexOptions, NamespaceIndex};
use crate::metrics;
use crate::schema::SchemaResolver;
use crate::store::traits::{MetricCache, SeriesSearch, TimeSeriesStore};
use crate::types::{AlignedSeries, Nodes, TimeWindow};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a batched fetch
///
/// One failing series must not abort the whole batch: successes land in
/// `series` (including all-gap backfills for series the store omitted), and
/// per-series failures land in `failures`. The two key sets are disjoint and
/// together cover every requested series.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Aligned series by name
    pub series: HashMap<String, AlignedSeries>,
    /// Per-series query failures
    pub failures: HashMap<String, StoreError>,
}

/// The core API exposed to a host serving layer
#[async_trait]
pub trait GraphiteAdapter: Send + Sync {
    /// Resolve a glob pattern into leaves and branches
    async fn find_nodes(&self, pattern: &str) -> Result<Nodes>;

    /// Fetch one series aligned onto its schema-resolved step
    async fn fetch_one(&self, series: &str, start: i64, end: i64) -> Result<AlignedSeries>;

    /// Fetch a batch of series, each aligned onto its schema-resolved step
    async fn fetch_many(&self, series: &[String], start: i64, end: i64)
        -> Result<FetchOutcome>;

    /// First and last known timestamps for a series
    async fn get_bounds(&self, series: &str) -> Result<(i64, i64)>;
}

/// Storage adapter between a query frontend and a time-series backend
pub struct Finder {
    store: Arc<dyn TimeSeriesStore>,
    index: NamespaceIndex,
    tracker: IntervalTracker,
    schema: Arc<SchemaResolver>,
    query_timeout: Duration,
}

impl Finder {
    /// Start building a finder
    pub fn builder() -> FinderBuilder {
        FinderBuilder::default()
    }

    /// Align-ready raw points for one step group, converted at the boundary
    async fn query_group(
        &self,
        names: &[String],
        window: TimeWindow,
    ) -> std::result::Result<HashMap<String, Vec<crate::types::RawPoint>>, StoreError> {
        let started = Instant::now();
        let result = tokio::time::timeout(
            self.query_timeout,
            self.store.query_range(names, window.start, window.end),
        )
        .await;
        metrics::record_store_query("query_range", started.elapsed().as_secs_f64());

        match result {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout {
                budget_ms: self.query_timeout.as_millis() as u64,
            }),
        }
    }

    fn window(start: i64, end: i64) -> Result<TimeWindow> {
        TimeWindow::new(start, end).map_err(Error::General)
    }
}

#[async_trait]
impl GraphiteAdapter for Finder {
    async fn find_nodes(&self, pattern: &str) -> Result<Nodes> {
        info!(pattern, "searching for nodes");
        let result = self.index.find_nodes(pattern).await;
        metrics::record_find(result.is_ok());
        result
    }

    async fn fetch_one(&self, series: &str, start: i64, end: i64) -> Result<AlignedSeries> {
        let window = Self::window(start, end)?;
        let step = self.schema.resolve(series);
        debug!(series, start, end, step, "fetching series");

        let names = vec![series.to_string()];
        let data = match self.query_group(&names, window).await {
            Ok(data) => data,
            Err(e) => {
                metrics::record_fetch("single", false);
                metrics::record_error("store", "query_range");
                return Err(e.into());
            }
        };

        // A missing key means no data in range, which is a valid all-gap
        // answer, distinct from the error path above.
        let points = data.get(series).map(Vec::as_slice).unwrap_or(&[]);
        let aligned = align::align(points, window.start, window.end, step);
        metrics::record_fetch("single", true);
        Ok(aligned)
    }

    async fn fetch_many(
        &self,
        series: &[String],
        start: i64,
        end: i64,
    ) -> Result<FetchOutcome> {
        let window = Self::window(start, end)?;

        // Series are grouped by resolved step: one range query and one
        // alignment pass per distinct step. BTreeMap keeps group order
        // deterministic.
        let mut groups: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        for name in series {
            groups
                .entry(self.schema.resolve(name))
                .or_default()
                .push(name.clone());
        }

        let mut outcome = FetchOutcome::default();
        for (step, names) in &groups {
            match self.query_group(names, window).await {
                Ok(data) => {
                    let aligned =
                        align::align_multi(&data, names, window.start, window.end, *step);
                    outcome.series.extend(aligned);
                }
                Err(e) => {
                    warn!(step, count = names.len(), error = %e, "range query failed for step group");
                    metrics::record_error("store", "query_range");
                    for name in names {
                        outcome
                            .failures
                            .insert(name.clone(), StoreError::QueryFailed(e.to_string()));
                    }
                }
            }
        }

        metrics::record_fetch("multi", outcome.failures.is_empty());
        Ok(outcome)
    }

    async fn get_bounds(&self, series: &str) -> Result<(i64, i64)> {
        self.tracker.bounds(series).await
    }
}

/// Builder assembling a [`Finder`] from configuration and collaborators
#[derive(Default)]
pub struct FinderBuilder {
    store: Option<Arc<dyn TimeSeriesStore>>,
    search: Option<Arc<dyn SeriesSearch>>,
    cache: Option<Arc<dyn MetricCache>>,
    config: Option<Config>,
}

impl FinderBuilder {
    /// Set the backing time-series store (required)
    pub fn with_store(mut self, store: Arc<dyn TimeSeriesStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the optional secondary search index
    pub fn with_search(mut self, search: Arc<dyn SeriesSearch>) -> Self {
        self.search = Some(search);
        self
    }

    /// Set the optional shared cache store
    pub fn with_cache(mut self, cache: Arc<dyn MetricCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the configuration (defaults apply when omitted)
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the finder
    ///
    /// # Errors
    ///
    /// Fails when no store was provided or the configuration does not
    /// validate (including schema rule compilation).
    pub fn build(self) -> Result<Finder> {
        let store = self
            .store
            .ok_or_else(|| Error::Configuration("A backing store is required".to_string()))?;
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let schema = Arc::new(config.build_resolver()?);
        let query_timeout = Duration::from_millis(config.store.query_timeout_ms);

        let index = NamespaceIndex::new(
            store.clone(),
            self.search,
            self.cache.clone(),
            schema.clone(),
            IndexOptions {
                series_list_ttl: Duration::from_secs(config.cache.series_list_ttl_secs),
                nodes_ttl: Duration::from_secs(config.cache.nodes_ttl_secs),
                query_timeout,
            },
        );
        let tracker = IntervalTracker::new(
            store.clone(),
            self.cache,
            schema.clone(),
            BoundsOptions {
                fast_mode: config.bounds.fast_mode,
                first_ttl_factor: config.bounds.first_ttl_factor,
                query_timeout,
            },
        );

        info!(
            host = config.store.host.as_str(),
            port = config.store.port,
            database = config.store.database.as_str(),
            "finder assembled"
        );

        Ok(Finder {
            store,
            index,
            tracker,
            schema,
            query_timeout,
        })
    }
}
