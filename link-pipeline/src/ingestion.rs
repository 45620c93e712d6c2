use crate::sources::read_links_from_file;
use crate::traits::{DedupStore, Watcher};
use crate::types::{
    IngestionStats, LinkSources, Provenance, Result, SourceScope, StageOutput, WorkItem,
};
use crate::utils::content_key;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Link ingestion stage: merges the static lists and feed expansions into the
/// queue of work items not yet summarized.
pub struct LinkIngestion {
    watchers: Vec<Arc<dyn Watcher>>,
    dedup: Arc<dyn DedupStore>,
}

impl LinkIngestion {
    pub fn new(dedup: Arc<dyn DedupStore>) -> Self {
        Self {
            watchers: Vec::new(),
            dedup,
        }
    }

    /// Register a watcher. Monitoring entries go to the first watcher that
    /// handles them; entries no watcher handles pass through as plain links.
    pub fn with_watcher(mut self, watcher: Arc<dyn Watcher>) -> Self {
        info!("Adding watcher to ingestion: {}", watcher.watcher_name());
        self.watchers.push(watcher);
        self
    }

    pub async fn run(
        &self,
        sources: &LinkSources,
        scope: SourceScope,
    ) -> Result<StageOutput<WorkItem, IngestionStats>> {
        info!("Starting link ingestion (scope: {})", scope);
        let mut stats = IngestionStats::default();

        let manual_links = if scope.includes(Provenance::Manual) {
            let links = read_links_from_file(&sources.manual)?;
            info!("Found {} links in {}", links.len(), sources.manual.display());
            links
        } else {
            Vec::new()
        };

        let monitoring_links = if scope.includes(Provenance::Monitored) {
            let entries = read_links_from_file(&sources.monitoring)?;
            info!("Found {} URLs in {}", entries.len(), sources.monitoring.display());
            self.expand_monitoring(entries, &mut stats).await
        } else {
            Vec::new()
        };

        stats.manual_links = manual_links.len();
        stats.monitoring_links = monitoring_links.len();
        stats.total_links = stats.manual_links + stats.monitoring_links;

        let candidates = manual_links
            .into_iter()
            .map(|url| (url, Provenance::Manual))
            .chain(monitoring_links.into_iter().map(|url| (url, Provenance::Monitored)));

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for (url, provenance) in candidates {
            if !seen.insert(url.clone()) {
                continue;
            }
            let key = content_key(&url);
            if self.dedup.exists(&key)? {
                debug!("Skipping {} - summary already exists", url);
                continue;
            }
            items.push(WorkItem {
                url,
                content_key: key,
                provenance,
            });
        }

        stats.unprocessed_links = items.len();
        info!(
            "Found {} unprocessed links ({} candidates)",
            stats.unprocessed_links, stats.total_links
        );
        Ok(StageOutput { items, stats })
    }

    /// Expand feed entries through their watcher. A failing feed is logged
    /// and counted; it never aborts the stage.
    async fn expand_monitoring(&self, entries: Vec<String>, stats: &mut IngestionStats) -> Vec<String> {
        let mut links = Vec::new();
        for entry in entries {
            let Some(watcher) = self.watchers.iter().find(|w| w.handles(&entry)) else {
                links.push(entry);
                continue;
            };

            info!("Detected feed: {}", entry);
            match watcher.fetch_links(&entry).await {
                Ok(discovered) => {
                    info!(
                        "{} discovered {} links from {}",
                        watcher.watcher_name(),
                        discovered.len(),
                        entry
                    );
                    stats.feeds_expanded += 1;
                    links.extend(discovered);
                }
                Err(e) => {
                    warn!("Failed to fetch feed {}: {}", entry, e);
                    stats.feeds_failed += 1;
                }
            }
        }
        links
    }
}
