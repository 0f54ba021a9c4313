use anyhow::Context;

use karatbook_infra::Settings;
use karatbook_observability::LogOutput;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;

    let output = if settings.json_logs() {
        LogOutput::Json
    } else {
        LogOutput::Pretty
    };
    karatbook_observability::init(&settings.log_filter, output);

    let services = karatbook_api::app::services::build_services(&settings).await?;
    let app = karatbook_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
