//! Microbenchmarks for the feed-to-chart transform.
//!
//! Measures series building and full chart assembly over feeds of
//! increasing size, with a share of unparseable values mixed in.
//!
//! Run with: `cargo bench -p thingfeed -- build`

#![allow(missing_docs, clippy::cast_precision_loss)]

use chrono::{DateTime, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use thingfeed::chart::{ChartConfig, build_line_chart};
use thingfeed::model::{Channel, ChannelFeed, Feed, FieldSlot};
use thingfeed::series::build_series;

/// Creates a feed with one entry every 15 seconds; every tenth value is junk.
fn make_feed(entries: u64) -> ChannelFeed {
    let slot = FieldSlot::new(1).unwrap();
    let start = 1_425_168_000_i64;

    let feeds = (0..entries)
        .map(|i| {
            let secs = start + i64::try_from(i).unwrap() * 15;
            let created_at = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
            let value = if i % 10 == 9 {
                "n/a".to_string()
            } else {
                format!("{:.2}", 20.0 + (i as f64 / 40.0).sin() * 5.0)
            };
            Feed::new(i + 1, created_at).with_field(slot, value)
        })
        .collect();

    ChannelFeed {
        channel: Channel {
            id: 9,
            field1: Some("Temperature".to_string()),
            ..Channel::default()
        },
        feeds,
    }
}

fn bench_build_series(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_series/entries");
    let config = ChartConfig::default().with_value_tick_interval(1.0);

    for count in [100, 1_000, 8_000] {
        let feed = make_feed(count);

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| build_series(black_box(&feed.feeds), black_box(1), &config).unwrap());
        });
    }

    group.finish();
}

fn bench_build_line_chart(c: &mut Criterion) {
    let feed = make_feed(8_000);
    let config = ChartConfig::default()
        .with_date_tick_interval_minutes(60)
        .with_chart_start(feed.feeds[1_000].created_at)
        .with_chart_end(feed.feeds[7_000].created_at);

    c.bench_function("build_line_chart/8000_entries", |b| {
        b.iter(|| build_line_chart(9, black_box(1), black_box(&feed), &config).unwrap());
    });
}

criterion_group!(benches, bench_build_series, bench_build_line_chart);
criterion_main!(benches);
