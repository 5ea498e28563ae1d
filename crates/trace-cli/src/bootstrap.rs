use anyhow::Context;
use trace_config::TraceConfig;

/// Load `.env` (if present) and the layered configuration.
pub fn load_config() -> anyhow::Result<TraceConfig> {
    TraceConfig::load_with_dotenv().context("failed to load ttrace configuration")
}
