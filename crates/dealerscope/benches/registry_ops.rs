//! Locator Registry Benchmarks
//!
//! Benchmarks for parsing locator documents and resolving element keys.
//!
//! Run with: `cargo bench --bench registry_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dealerscope::prelude::*;

fn locator_document(pages: usize, elements: usize) -> String {
    let mut yaml = String::new();
    for p in 0..pages {
        yaml.push_str(&format!("page_{p}:\n"));
        for e in 0..elements {
            if e % 2 == 0 {
                yaml.push_str(&format!("  element_{e}: \"//div[@data-test='p{p}e{e}']\"\n"));
            } else {
                yaml.push_str(&format!(
                    "  element_{e}: {{ by: css, value: \"#p{p} .e{e}\" }}\n"
                ));
            }
        }
    }
    yaml.push_str("text_messages:\n  page_1:\n    welcome: Welcome back\n");
    yaml
}

fn bench_registry_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_parse");

    for (pages, elements) in [(5, 10), (20, 25), (50, 50)] {
        let yaml = locator_document(pages, elements);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{pages}x{elements}")),
            &yaml,
            |bench, doc| {
                bench.iter(|| {
                    let registry = LocatorRegistry::from_yaml_str(black_box(doc)).unwrap();
                    black_box(registry);
                });
            },
        );
    }

    group.finish();
}

fn bench_registry_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_resolve");
    let registry = LocatorRegistry::from_yaml_str(&locator_document(50, 50)).unwrap();

    group.bench_function("hit", |bench| {
        bench.iter(|| {
            let selector = registry.resolve(black_box("page_25"), black_box("element_25"));
            black_box(selector)
        });
    });

    group.bench_function("miss", |bench| {
        bench.iter(|| {
            let selector = registry.resolve(black_box("page_25"), black_box("missing"));
            black_box(selector)
        });
    });

    group.bench_function("text_message", |bench| {
        bench.iter(|| black_box(registry.resolve_text(black_box("page_1"), "welcome")));
    });

    group.finish();
}

fn bench_selector_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_queries");

    let selectors = [
        ("xpath", Selector::xpath("//button[normalize-space()='Sign In']")),
        ("css", Selector::css("div.error > span")),
        ("id", Selector::id("company-email")),
        ("class", Selector::class_name("ant-input-password")),
    ];

    for (name, selector) in &selectors {
        group.bench_with_input(BenchmarkId::from_parameter(name), selector, |bench, sel| {
            bench.iter(|| black_box(sel.to_query_all()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_registry_parse,
    bench_registry_resolve,
    bench_selector_queries
);
criterion_main!(benches);
