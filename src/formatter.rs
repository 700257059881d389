//! Final cluster assembly.
//!
//! Sources are ordered newest first by their parsed `pubDate` (stable for
//! equal dates, unparsable dates count as "now"), `latestDate` is taken
//! from the first of them, and the cluster gets the caller's id or a
//! freshly minted `cluster-<unix millis>-<7 base-36 chars>`.

use rand::Rng;

use crate::dates::{self, Clock};
use crate::models::{Cluster, Source, UNTITLED};

const ID_SUFFIX_LEN: usize = 7;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Mint a new cluster id from the clock and `rng`.
pub fn generate_cluster_id<R: Rng>(clock: &dyn Clock, rng: &mut R) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("cluster-{}-{}", clock.now().timestamp_millis(), suffix)
}

/// Order `sources` newest first. Equal dates keep their input order.
pub fn sort_sources(sources: Vec<Source>, clock: &dyn Clock) -> Vec<Source> {
    let mut keyed: Vec<_> = sources
        .into_iter()
        .map(|s| (dates::parse_or_now(&s.pub_date, clock), s))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| b.cmp(a));
    keyed.into_iter().map(|(_, s)| s).collect()
}

/// Build the [`Cluster`] returned to the caller.
///
/// An empty or absent `cluster_id` mints a new one; an empty title becomes
/// `"Untitled"`.
pub fn format_cluster<R: Rng>(
    title: &str,
    summary: &str,
    sources: Vec<Source>,
    cluster_id: Option<&str>,
    clock: &dyn Clock,
    rng: &mut R,
) -> Cluster {
    let sources = sort_sources(sources, clock);
    let latest_date = match sources.first() {
        Some(newest) => dates::to_iso(&newest.pub_date, clock),
        None => dates::iso(clock.now()),
    };
    let cluster_id = match cluster_id.filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None => generate_cluster_id(clock, rng),
    };
    let title = if title.is_empty() { UNTITLED } else { title };

    Cluster {
        cluster_id,
        title: title.to_string(),
        summary: summary.to_string(),
        article_count: sources.len(),
        latest_date,
        sources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::FixedClock;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use regex::Regex;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    fn source(title: &str, pub_date: &str) -> Source {
        Source {
            source: "example".to_string(),
            title: title.to_string(),
            url: format!("https://example.com/{title}"),
            pub_date: pub_date.to_string(),
        }
    }

    #[test]
    fn test_generate_cluster_id_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = generate_cluster_id(&clock(), &mut rng);
        let pattern = Regex::new(r"^cluster-\d+-[0-9a-z]{7}$").unwrap();
        assert!(pattern.is_match(&id), "unexpected id {id}");
        assert!(id.starts_with("cluster-1735689600000-"));
    }

    #[test]
    fn test_sort_sources_newest_first_and_stable() {
        let sorted = sort_sources(
            vec![
                source("old", "2024-01-01"),
                source("tie-a", "Tue, 02 Jan 2024 00:00:00 +0000"),
                source("new", "2024-03-01T00:00:00Z"),
                source("tie-b", "2024-01-02"),
            ],
            &clock(),
        );
        let titles: Vec<_> = sorted.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "tie-a", "tie-b", "old"]);
    }

    #[test]
    fn test_wrong_weekday_still_orders_by_date() {
        let mut rng = StdRng::seed_from_u64(1);
        let cluster = format_cluster(
            "Title",
            "Summary",
            vec![
                source("mid", "2024-01-05"),
                source("newest", "Sat, 10 Jan 2024 12:00:00 +0000"),
                source("oldest", "Fri, 01 Jan 2024 00:00:00 +0000"),
            ],
            None,
            &clock(),
            &mut rng,
        );

        let titles: Vec<_> = cluster.sources.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "mid", "oldest"]);
        assert_eq!(cluster.latest_date, "2024-01-10T12:00:00.000Z");
    }

    #[test]
    fn test_unparsable_dates_sort_as_now() {
        let sorted = sort_sources(
            vec![source("dated", "2024-01-01"), source("garbage", "sometime")],
            &clock(),
        );
        assert_eq!(sorted[0].title, "garbage");
    }

    #[test]
    fn test_format_cluster_invariants() {
        let mut rng = StdRng::seed_from_u64(1);
        let cluster = format_cluster(
            "Title",
            "Summary",
            vec![source("b", "2024-01-01"), source("a", "2024-01-02")],
            Some("cluster-given"),
            &clock(),
            &mut rng,
        );

        assert_eq!(cluster.cluster_id, "cluster-given");
        assert_eq!(cluster.article_count, cluster.sources.len());
        assert_eq!(cluster.sources[0].title, "a");
        assert_eq!(cluster.latest_date, "2024-01-02T00:00:00.000Z");
        for pair in cluster.sources.windows(2) {
            let first = dates::parse_date(&pair[0].pub_date).unwrap();
            let second = dates::parse_date(&pair[1].pub_date).unwrap();
            assert!(first >= second);
        }
    }

    #[test]
    fn test_format_cluster_defaults() {
        let mut rng = StdRng::seed_from_u64(1);
        let cluster = format_cluster("", "", vec![], Some(""), &clock(), &mut rng);

        assert_eq!(cluster.title, "Untitled");
        assert_eq!(cluster.summary, "");
        assert_eq!(cluster.article_count, 0);
        assert_eq!(cluster.latest_date, "2025-01-01T00:00:00.000Z");
        assert!(cluster.cluster_id.starts_with("cluster-1735689600000-"));
    }
}
