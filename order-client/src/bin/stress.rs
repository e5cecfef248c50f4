//! Query load generator
//!
//! Hammers `GET /api/order` with bounded concurrency and reports throughput.
//!
//! ```text
//! order-stress --requests 10000 --concurrency 100
//! ```

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use futures::StreamExt;
use order_client::init_logging;

#[derive(Debug, Parser)]
#[command(name = "order-stress", about = "Load test the order query endpoint")]
struct Args {
    /// Target URL
    #[arg(
        short,
        long,
        default_value = "http://localhost:8080/api/order?id=b563feb7b2b84b6test"
    )]
    url: String,

    /// Total number of requests
    #[arg(short = 'n', long, default_value_t = 10000)]
    requests: usize,

    /// Concurrent requests in flight
    #[arg(short, long, default_value_t = 100)]
    concurrency: usize,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let concurrency = args.concurrency.max(1);

    println!("🚀 Starting stress test");
    println!("   Requests:    {}", args.requests);
    println!("   Concurrency: {}", concurrency);
    println!("   URL:         {}\n", args.url);

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(concurrency)
        .build()?;

    let started = Instant::now();

    let results: Vec<bool> = futures::stream::iter(0..args.requests)
        .map(|_| {
            let client = client.clone();
            let url = args.url.clone();
            async move {
                match client.get(&url).send().await {
                    Ok(response) => {
                        let ok = response.status() == reqwest::StatusCode::OK;
                        // drain the body so the connection goes back to the pool
                        let _ = response.bytes().await;
                        ok
                    }
                    Err(e) => {
                        tracing::debug!("Request failed: {}", e);
                        false
                    }
                }
            }
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let elapsed = started.elapsed();
    let succeeded = results.iter().filter(|ok| **ok).count();
    let failed = results.len() - succeeded;

    let rps = if elapsed.as_secs_f64() > 0.0 {
        results.len() as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    let mean = mean_ms(elapsed, results.len());

    println!("\n📊 Results:");
    println!("   ✅ Succeeded: {}", succeeded);
    println!("   ❌ Failed:    {}", failed);
    println!("   ⏱️  Elapsed:   {:?}", elapsed);
    println!("   📈 RPS:       {:.2}", rps);
    println!("   ⚡ Mean time: {:.3}ms", mean);

    Ok(())
}

/// Wall time per request in milliseconds, `0.0` when nothing ran
fn mean_ms(elapsed: Duration, requests: usize) -> f64 {
    if requests == 0 {
        return 0.0;
    }
    elapsed.as_secs_f64() * 1000.0 / requests as f64
}
