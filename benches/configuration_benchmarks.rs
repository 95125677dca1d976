use cache_config::config::clustering::CacheMode;
use cache_config::config::memory::parse_byte_quantity;
use cache_config::{
    Builder, CombinePolicy, Configuration, ConfigurationBuilder, ConfigurationElement,
    ConfigurationRegistry, GlobalConfigurationBuilder,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

// Helper functions to create builders and templates
fn make_builder() -> ConfigurationBuilder {
    let mut builder = ConfigurationBuilder::new();
    builder.clustering().cache_mode(CacheMode::DistSync).hash().num_owners(2);
    builder.memory().max_count(10_000);
    builder.expiration().lifespan(Duration::from_secs(300));
    builder.persistence().add_store("file").preload(true);
    builder.indexing().add_indexed_entity("Book");
    builder
}

fn make_template() -> Configuration {
    let mut builder = make_builder();
    builder.template(true);
    builder.build().unwrap()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("Configuration Operations");

    group.bench_function("build default", |b| {
        b.iter(|| black_box(ConfigurationBuilder::new().build().unwrap()));
    });

    group.bench_function("build populated", |b| {
        b.iter(|| black_box(make_builder().build().unwrap()));
    });

    {
        let global = GlobalConfigurationBuilder::clustered().build().unwrap();
        group.bench_function("build with global", |b| {
            b.iter(|| black_box(make_builder().build_with(&global).unwrap()));
        });
    }

    {
        let template = make_template();
        group.bench_function("read override", |b| {
            b.iter(|| {
                let mut builder = ConfigurationBuilder::new();
                builder.read(&template, CombinePolicy::Override).unwrap();
                black_box(builder.build().unwrap())
            });
        });

        group.bench_function("read combine", |b| {
            b.iter(|| {
                let mut builder = ConfigurationBuilder::new();
                builder.persistence().add_store("jdbc");
                builder.read(&template, CombinePolicy::Combine).unwrap();
                black_box(builder.build().unwrap())
            });
        });

        group.bench_function("to_btreemap", |b| {
            b.iter(|| black_box(template.to_btreemap()));
        });
    }

    {
        let global = GlobalConfigurationBuilder::clustered().build().unwrap();
        let registry = ConfigurationRegistry::new(global);
        for i in 0..100 {
            registry.define(&format!("cache-{}", i), make_builder()).unwrap();
        }
        group.bench_function("registry get hit", |b| {
            b.iter(|| {
                for i in 0..100 {
                    black_box(registry.get(&format!("cache-{}", i)));
                }
            });
        });
    }

    group.bench_function("parse byte quantity", |b| {
        b.iter(|| {
            black_box(parse_byte_quantity(black_box("1.5 GiB")).unwrap());
            black_box(parse_byte_quantity(black_box("512")).unwrap());
        });
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
