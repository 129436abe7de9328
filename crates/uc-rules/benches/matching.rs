use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use uc_core::glob::Glob;
use uc_core::url::UrlParts;
use uc_rules::{AppSettings, HostCond, RuleEngine, Subdomains, ThenBlock, UrlRule, WhenBlock};

fn bench_glob(c: &mut Criterion) {
    let mut group = c.benchmark_group("glob");

    let simple = Glob::new("utm_*", "bench").unwrap();
    group.bench_function("prefix_hit", |b| b.iter(|| simple.matches(black_box("utm_campaign"))));
    group.bench_function("prefix_miss", |b| b.iter(|| simple.matches(black_box("fbclid"))));

    // Star-heavy patterns against long near-misses
    for len in [64usize, 256, 1024] {
        let pattern = Glob::new(&"*a".repeat(16), "bench").unwrap();
        let candidate = format!("{}b", "a".repeat(len));
        group.bench_with_input(BenchmarkId::new("adversarial", len), &candidate, |b, candidate| {
            b.iter(|| pattern.matches(black_box(candidate)))
        });
    }

    group.finish();
}

fn tracking_settings() -> AppSettings {
    let mut sites = vec![UrlRule::new(
        WhenBlock::host(HostCond::any()),
        ThenBlock::remove(["utm_*", "fbclid", "gclid", "mc_?id", "_hs*"]),
    )];
    for i in 0..200 {
        sites.push(UrlRule::new(
            WhenBlock::host(HostCond::list_of([format!("site{i}.example")], Subdomains::Any)),
            ThenBlock::remove(["ref", "ref_src", "si", "*_source"]),
        ));
    }
    AppSettings::new(sites)
}

fn bench_evaluate(c: &mut Criterion) {
    let engine = RuleEngine::new();
    engine.load(&tracking_settings());

    let mut group = c.benchmark_group("evaluate");

    let urls = [
        ("no_query", "https://www.site7.example/article/42"),
        (
            "tracked",
            "https://www.site150.example/a?id=9&utm_source=x&utm_medium=y&fbclid=z&ref=home",
        ),
        ("unmatched_host", "https://other.org/?q=1&utm_campaign=spring"),
        ("idn_host", "https://Bücher.example/?utm_term=x&q=2"),
    ];
    for (name, raw) in urls {
        let parts = UrlParts::parse(raw).unwrap();
        group.bench_with_input(BenchmarkId::new("apply_removals", name), &parts, |b, parts| {
            b.iter(|| engine.apply_removals(black_box(parts)))
        });
    }

    group.bench_function("load", |b| {
        let settings = tracking_settings();
        b.iter(|| engine.load(black_box(&settings)))
    });

    group.finish();
}

criterion_group!(benches, bench_glob, bench_evaluate);
criterion_main!(benches);
