//! Benchmarks for pipeline execution overhead.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::convert::Infallible;
use std::sync::Arc;

use resilio::middleware::RetryConfig;
use resilio::{ExecutionContext, Operation, Pipeline};

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    c.bench_function("execute_bare", |b| {
        let pipeline: Pipeline<u64> = Pipeline::builder().build();
        b.iter(|| {
            runtime.block_on(async {
                let ctx = Arc::new(ExecutionContext::new("bench"));
                let op = Operation::new(|| async { Ok::<_, Infallible>(42u64) });
                black_box(pipeline.execute(op, &ctx).await)
            })
        });
    });

    c.bench_function("execute_full_chain", |b| {
        let pipeline = Pipeline::builder()
            .with_timeout_ms(1000)
            .with_retry(RetryConfig::new().with_max_retries(2).with_backoff_base_ms(1))
            .with_fallback_value(0u64)
            .build();
        b.iter(|| {
            runtime.block_on(async {
                let ctx = Arc::new(ExecutionContext::new("bench"));
                let op = Operation::new(|| async { Ok::<_, Infallible>(42u64) });
                black_box(pipeline.execute(op, &ctx).await)
            })
        });
    });
}

criterion_group!(benches, pipeline_benchmark);
criterion_main!(benches);
