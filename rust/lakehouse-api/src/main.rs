use lakehouse_api::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();
    lakehouse_api::run().await
}
