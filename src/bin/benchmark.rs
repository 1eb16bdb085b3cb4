use quantized_textgen_service::{BenchmarkConfig, run_benchmark, telemetry::init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = BenchmarkConfig::from_env();
    tracing::info!(
        url = %config.url,
        n_requests = config.n_requests,
        max_new_tokens = config.max_new_tokens,
        "starting sequential benchmark"
    );

    let client = reqwest::Client::new();
    let report = run_benchmark(&client, &config).await?;

    println!("{report}");
    Ok(())
}
