//! End-to-end processing of one URL list into one [`Cluster`].
//!
//! 1. **Resolve**: each URL in turn, strictly sequentially, into a [`Resolution`]
//! 2. **Aggregate**: concatenate every resolution's content contribution
//! 3. **Summarize**: one gateway call over the aggregate
//! 4. **Format**: order sources, derive `latestDate`, assign the cluster id
//!
//! Per-URL failures are values, not errors: they show up as
//! [`Resolution::Errored`] and the batch carries on. Only the summary call
//! can fail the run.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use rand::Rng;
use tracing::{info, instrument};

use crate::api::Gateway;
use crate::dates::Clock;
use crate::error::PipelineError;
use crate::formatter::format_cluster;
use crate::models::Cluster;
use crate::resolver::{Resolution, Resolver};
use crate::summarizer::{DEFAULT_CLUSTER_TITLE, summarize};

/// Owns the gateway and clock for a run.
pub struct ClusterPipeline<G> {
    gateway: G,
    clock: Arc<dyn Clock>,
}

impl<G: Gateway> ClusterPipeline<G> {
    pub fn new(gateway: G, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    #[cfg(test)]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Resolve, summarize and format `urls` into one cluster.
    ///
    /// `cluster_id` is reused when non-empty; otherwise one is minted with `rng`.
    #[instrument(level = "info", skip_all, fields(url_count = urls.len(), cluster_id = ?cluster_id))]
    pub async fn process_urls<R: Rng>(
        &self,
        urls: &[String],
        cluster_id: Option<&str>,
        rng: &mut R,
    ) -> Result<Cluster, PipelineError> {
        let resolver = Resolver::new(&self.gateway, self.clock.as_ref());
        let resolver = &resolver;

        let resolutions: Vec<Resolution> = stream::iter(urls)
            .then(move |url| resolver.resolve(url))
            .collect()
            .await;

        let failed = resolutions
            .iter()
            .filter(|r| matches!(r, Resolution::Errored { .. }))
            .count();
        info!(
            resolved = resolutions.len() - failed,
            failed,
            "Finished per-URL resolution"
        );

        let aggregated = aggregate_content(&resolutions);
        let first_title = resolutions
            .iter()
            .find_map(Resolution::title)
            .unwrap_or(DEFAULT_CLUSTER_TITLE)
            .to_string();

        let (title, summary) = summarize(&self.gateway, &aggregated, &first_title)
            .await
            .map_err(PipelineError::Summary)?;

        let sources = resolutions.into_iter().map(Resolution::into_source).collect();
        let cluster = format_cluster(&title, &summary, sources, cluster_id, self.clock.as_ref(), rng);
        info!(
            cluster_id = %cluster.cluster_id,
            article_count = cluster.article_count,
            latest_date = %cluster.latest_date,
            "Cluster assembled"
        );
        Ok(cluster)
    }
}

/// The summary prompt's article section, in input order.
pub fn aggregate_content(resolutions: &[Resolution]) -> String {
    resolutions
        .iter()
        .filter_map(Resolution::contribution)
        .map(|block| format!("\n\n{block}\n"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{ScriptedGateway, failure};
    use crate::dates::FixedClock;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use regex::Regex;

    fn pipeline(gateway: ScriptedGateway) -> ClusterPipeline<ScriptedGateway> {
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        ClusterPipeline::new(gateway, clock)
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    fn article_json(title: &str, pub_date: &str) -> String {
        format!(r#"{{"title":"{title}","source":"Example","pubDate":"{pub_date}","content":"{title} body"}}"#)
    }

    #[tokio::test]
    async fn test_single_structured_url() {
        let gateway = ScriptedGateway::new([
            Ok("described".to_string()),
            Ok(article_json("A", "Mon, 01 Jan 2024 00:00:00 +0000")),
            Ok("A short synthesis.".to_string()),
        ]);
        let pipeline = pipeline(gateway);
        let mut rng = StdRng::seed_from_u64(3);

        let cluster = pipeline
            .process_urls(&urls(&["https://example.com/a"]), None, &mut rng)
            .await
            .unwrap();

        assert_eq!(cluster.article_count, 1);
        assert_eq!(cluster.sources[0].title, "A");
        assert_eq!(cluster.sources[0].source, "Example");
        assert_eq!(cluster.latest_date, "2024-01-01T00:00:00.000Z");
        assert_eq!(cluster.title, "A");
        assert_eq!(cluster.summary, "A short synthesis.");

        let prompts = pipeline.gateway().prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2].contains("Title: A\nSource: Example\nContent: A body"));
    }

    #[tokio::test]
    async fn test_sources_ordered_newest_first() {
        let gateway = ScriptedGateway::new([
            Ok("older".to_string()),
            Ok(article_json("Older", "2024-01-01")),
            Ok("newer".to_string()),
            Ok(article_json("Newer", "2024-01-02")),
            Ok("TITLE: Two Days\nSUMMARY: Things happened.".to_string()),
        ]);
        let pipeline = pipeline(gateway);
        let mut rng = StdRng::seed_from_u64(3);

        let cluster = pipeline
            .process_urls(
                &urls(&["https://example.com/old", "https://example.com/new"]),
                Some("cluster-abc"),
                &mut rng,
            )
            .await
            .unwrap();

        assert_eq!(cluster.cluster_id, "cluster-abc");
        assert_eq!(cluster.title, "Two Days");
        assert_eq!(cluster.summary, "Things happened.");
        assert_eq!(cluster.sources[0].pub_date, "2024-01-02");
        assert_eq!(cluster.sources[1].pub_date, "2024-01-01");
        assert_eq!(cluster.latest_date, "2024-01-02T00:00:00.000Z");
    }

    #[tokio::test]
    async fn test_failed_url_does_not_abort_batch() {
        let gateway = ScriptedGateway::new([
            Ok("first".to_string()),
            Ok(article_json("First", "2024-01-01")),
            failure("gateway down"),
            Ok("Title: Third Story Heading\nbody".to_string()),
            Ok("no json here, sorry".to_string()),
            Ok("Summary of two stories.".to_string()),
        ]);
        let pipeline = pipeline(gateway);
        let mut rng = StdRng::seed_from_u64(3);
        let input = urls(&[
            "https://one.example.com/1",
            "https://www.broken.org/2",
            "https://three.example.net/3",
        ]);

        let cluster = pipeline.process_urls(&input, None, &mut rng).await.unwrap();

        assert_eq!(cluster.sources.len(), input.len());
        assert_eq!(cluster.article_count, input.len());
        let broken = cluster
            .sources
            .iter()
            .find(|s| s.url == "https://www.broken.org/2")
            .unwrap();
        assert_eq!(broken.title, "Error loading article");
        assert_eq!(broken.source, "broken");

        let prompts = pipeline.gateway().prompts();
        let summary_prompt = prompts.last().unwrap();
        assert!(summary_prompt.contains("Content: First body"));
        assert!(summary_prompt.contains("URL: https://three.example.net/3\nContent: no json here, sorry"));
        assert!(!summary_prompt.contains("broken.org"));
        assert_eq!(cluster.title, "First");
    }

    #[tokio::test]
    async fn test_all_failed_uses_default_title() {
        let gateway = ScriptedGateway::new([
            failure("down"),
            Ok("Nothing could be read.".to_string()),
        ]);
        let pipeline = pipeline(gateway);
        let mut rng = StdRng::seed_from_u64(3);

        let cluster = pipeline
            .process_urls(&urls(&["https://example.com/a"]), Some(""), &mut rng)
            .await
            .unwrap();

        assert_eq!(cluster.title, "News Cluster");
        assert_eq!(cluster.article_count, 1);
        let id_pattern = Regex::new(r"^cluster-\d+-[0-9a-z]+$").unwrap();
        assert!(id_pattern.is_match(&cluster.cluster_id));
        assert!(pipeline.gateway().prompts()[1].contains("Articles:\n\n"));
    }

    #[tokio::test]
    async fn test_summary_failure_propagates() {
        let gateway = ScriptedGateway::new([
            Ok("described".to_string()),
            Ok(article_json("A", "2024-01-01")),
            failure("summary model unavailable"),
        ]);
        let pipeline = pipeline(gateway);
        let mut rng = StdRng::seed_from_u64(3);

        let err = pipeline
            .process_urls(&urls(&["https://example.com/a"]), None, &mut rng)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Summary(_)));
        assert!(err.to_string().contains("summary model unavailable"));
    }

    #[test]
    fn test_aggregate_content_skips_errored() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let ok = crate::resolver::interpret("https://a.com/x", "r1", "Title: Long enough title", &clock);
        let errored = Resolution::Errored {
            source: ok.source().clone(),
            error: "boom".to_string(),
        };
        let aggregated = aggregate_content(&[ok, errored]);
        assert_eq!(
            aggregated,
            "\n\nURL: https://a.com/x\nContent: Title: Long enough title\n"
        );
    }
}
