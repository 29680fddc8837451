//! End-to-end crawls against an in-memory copy of the timetable site.

mod helpers;

use helpers::{BASE, BROKEN, FakeSite, MONDAY_8AM, WEDNESDAY_3PM, at, block, listing_page, table_page};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use umcs_schedule::ScheduleEntry;
use umcs_schedule::crawler::{CrawlSettings, CrawlStats, Crawler};
use umcs_schedule::timetable::{Entity, GridConfig};
use url::Url;

fn settings(letters: &str) -> CrawlSettings {
    CrawlSettings {
        base_url: Url::parse(BASE).unwrap(),
        alphabet: letters.chars().collect(),
        concurrency: 4,
        grid: GridConfig::default(),
    }
}

/// Run a crawl to completion and collect everything it emitted.
async fn crawl(site: Arc<FakeSite>, letters: &str) -> (Vec<ScheduleEntry>, CrawlStats) {
    let crawler = Crawler::new(site, settings(letters));
    let (tx, mut rx) = mpsc::channel(64);
    let stats = crawler.run(tx, CancellationToken::new()).await;

    let mut entries = Vec::new();
    while let Some(entry) = rx.recv().await {
        entries.push(entry);
    }
    (entries, stats)
}

fn sample_site() -> FakeSite {
    FakeSite::new()
        .page("/link/", "<html><body>index</body></html>")
        .page(
            "/link/filtered/a/0",
            listing_page(&[
                "/grid/2/77/teacher-x",
                "/grid/3/12/s105",
                "/about",
                "/grid/7/1/mystery",
            ]),
        )
        .page(
            "/link/filtered/b/0",
            listing_page(&["/grid/1/300/inf-2", "/grid/2/77/teacher-x"]),
        )
        .page(
            "/grid/2/77/teacher-x",
            table_page(
                "dr Jan Kowalski",
                &[block(WEDNESDAY_3PM, "Systemy operacyjne"), block(BROKEN, "Zepsuty")],
            ),
        )
        .page(
            "/grid/3/12/s105",
            table_page("105", &[block(MONDAY_8AM, "Algebra")]),
        )
        .page(
            "/grid/1/300/inf-2",
            table_page("Informatyka II rok", &[block(MONDAY_8AM, "Analiza")]),
        )
}

fn by_subject<'a>(entries: &'a [ScheduleEntry], subject: &str) -> Vec<&'a ScheduleEntry> {
    entries
        .iter()
        .filter(|e| e.subject.as_deref() == Some(subject))
        .collect()
}

#[tokio::test]
async fn test_full_crawl_dispatches_each_table_type() {
    let site = Arc::new(sample_site());
    let (entries, stats) = crawl(site.clone(), "ab").await;

    assert_eq!(entries.len(), 3);

    let teacher = by_subject(&entries, "Systemy operacyjne");
    assert_eq!(teacher.len(), 1);
    assert_eq!(
        teacher[0].teachers,
        vec![Entity::new("dr Jan Kowalski", Some("/grid/2/77/teacher-x".to_owned()))]
    );
    assert_eq!(teacher[0].year_groups[0].name, "Fizyka I");
    assert_eq!(teacher[0].room.name, "310");
    assert_eq!((teacher[0].time.day, teacher[0].time.start, teacher[0].time.end), (2, 900, 960));

    let room = by_subject(&entries, "Algebra");
    assert_eq!(room[0].room, Entity::new("105", Some("/grid/3/12/s105".to_owned())));
    assert_eq!(room[0].teachers[0].name, "dr Block");

    let group = by_subject(&entries, "Analiza");
    assert_eq!(
        group[0].year_groups,
        vec![Entity::new("Informatyka II rok", Some("/grid/1/300/inf-2".to_owned()))]
    );
    assert_eq!(group[0].activity_type, "Ćwiczenia");
    assert_eq!(group[0].activity_type_short, "Ćw");

    assert_eq!(
        stats,
        CrawlStats {
            pages_fetched: 6,
            fetch_failures: 0,
            tables_decoded: 3,
            entries: 3,
            blocks_skipped: 1,
            links_ignored: 1,
            unknown_table_codes: 1,
            duplicate_requests: 1,
            cancelled: false,
        }
    );
}

#[tokio::test]
async fn test_non_grid_links_are_never_requested() {
    let site = Arc::new(sample_site());
    crawl(site.clone(), "ab").await;

    let requested = site.requested();
    assert!(!requested.contains(&at("/about")));
    assert!(!requested.contains(&at("/grid/7/1/mystery")));
    assert!(!requested.iter().any(|u| u.ends_with(".css")));
    // The teacher page is linked from both listings but fetched once.
    let teacher_fetches = requested
        .iter()
        .filter(|u| **u == at("/grid/2/77/teacher-x"))
        .count();
    assert_eq!(teacher_fetches, 1);
}

#[tokio::test]
async fn test_failed_listing_does_not_stop_siblings() {
    let site = FakeSite::new()
        .page("/link/", "index")
        .page("/link/filtered/b/0", listing_page(&["/grid/3/12/s105"]))
        .page("/grid/3/12/s105", table_page("105", &[block(MONDAY_8AM, "Algebra")]));
    let (entries, stats) = crawl(Arc::new(site), "ab").await;

    assert_eq!(entries.len(), 1);
    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.tables_decoded, 1);
}

#[tokio::test]
async fn test_failed_index_ends_crawl() {
    let site = Arc::new(FakeSite::new());
    let (entries, stats) = crawl(site.clone(), "abc").await;

    assert!(entries.is_empty());
    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.pages_fetched, 0);
    assert_eq!(site.requested(), vec![at("/link/")]);
}

#[tokio::test]
async fn test_listing_requests_cover_alphabet() {
    let site = Arc::new(FakeSite::new().page("/link/", "index"));
    crawl(site.clone(), "aż7").await;

    let mut requested = site.requested();
    requested.sort();
    assert_eq!(
        requested,
        vec![
            at("/link/"),
            at("/link/filtered/%C5%BC/0"),
            at("/link/filtered/7/0"),
            at("/link/filtered/a/0"),
        ]
    );
}

#[tokio::test]
async fn test_cancellation_discards_pending_requests() {
    let site = Arc::new(
        FakeSite::new()
            .page("/link/", "index")
            .page("/link/filtered/a/0", listing_page(&["/grid/1/300/inf-2"]))
            .stall("/grid/1/300/inf-2"),
    );
    let crawler = Crawler::new(site.clone(), settings("a"));
    let (tx, mut rx) = mpsc::channel(8);
    let cancel = CancellationToken::new();

    let run = tokio::spawn({
        let cancel = cancel.clone();
        async move { crawler.run(tx, cancel).await }
    });

    for _ in 0..200 {
        if site.requested().contains(&at("/grid/1/300/inf-2")) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cancel.cancel();

    let stats = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("crawl should stop after cancellation")
        .unwrap();
    assert!(stats.cancelled);
    assert_eq!(stats.tables_decoded, 0);
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn test_entries_not_delivered_are_not_counted() {
    let site = FakeSite::new()
        .page("/link/", "index")
        .page("/link/filtered/a/0", listing_page(&["/grid/3/12/s105"]))
        .page(
            "/grid/3/12/s105",
            table_page("105", &[block(MONDAY_8AM, "Algebra"), block(WEDNESDAY_3PM, "Logika")]),
        );
    let crawler = Crawler::new(Arc::new(site), settings("a"));
    let (tx, rx) = mpsc::channel(8);
    drop(rx);

    let stats = crawler.run(tx, CancellationToken::new()).await;
    assert_eq!(stats.tables_decoded, 1);
    assert_eq!(stats.entries, 0);
}
