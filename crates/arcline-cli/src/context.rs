//! Wires concrete adapters into the port traits once, at the process
//! entry point (spec §4.0: "stage drivers take `Arc<dyn Trait>`
//! constructed once by the CLI binary and passed down, never a lazily-
//! initialized global").

use std::sync::Arc;

use arcline_core::checkpointing::CheckpointStore;
use arcline_core::config::PipelineConfig;
use arcline_core::traits::{
    CentroidStore, ConnectivityStore, CtmStore, EpicStore, EventFamilyStore, GraphIndex,
    LlmClient, NarrativeStore, TitleStore,
};
use arcline_llm::AnthropicClient;
use arcline_neo4j::Neo4jIndex;
use arcline_postgres::PgStore;

use crate::env;

/// Every adapter a stage command might need, constructed once in
/// `main` and passed by reference into each subcommand's `run`.
pub struct CliContext {
    pub config: PipelineConfig,
    pub checkpoints: CheckpointStore,
    pub titles: Arc<dyn TitleStore>,
    pub efs: Arc<dyn EventFamilyStore>,
    pub connectivity: Arc<dyn ConnectivityStore>,
    pub centroids: Arc<dyn CentroidStore>,
    pub ctm: Arc<dyn CtmStore>,
    pub narratives: Arc<dyn NarrativeStore>,
    pub epics: Arc<dyn EpicStore>,
    pub graph: Arc<dyn GraphIndex>,
    pub llm: Arc<dyn LlmClient>,
}

impl CliContext {
    /// Connect to Postgres, Neo4j, and the LLM service, and load the
    /// optional TOML config (spec §6 environment contract).
    pub async fn connect() -> anyhow::Result<Self> {
        let database_url = env::require(env::DATABASE_URL)?;
        let neo4j_uri = env::require(env::NEO4J_URI)?;
        let neo4j_user = env::require(env::NEO4J_USER)?;
        let neo4j_password = env::require(env::NEO4J_PASSWORD)?;
        let llm_api_key = env::require(env::LLM_API_KEY)?;

        let pg = Arc::new(PgStore::connect(&database_url).await?);
        let neo4j = Neo4jIndex::connect(&neo4j_uri, &neo4j_user, &neo4j_password).await?;
        let graph: Arc<dyn GraphIndex> = Arc::new(neo4j);

        let mut llm_client = AnthropicClient::new(llm_api_key, env::llm_model());
        if let Some(url) = env::llm_api_url() {
            llm_client = llm_client.with_api_url(url);
        }
        let llm: Arc<dyn LlmClient> = Arc::new(llm_client);

        let config = match env::config_path() {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("reading config file {path}: {e}"))?;
                PipelineConfig::from_toml(&raw)
                    .map_err(|e| anyhow::anyhow!("parsing config file {path}: {e}"))?
            }
            None => PipelineConfig::default(),
        };

        Ok(Self {
            config,
            checkpoints: CheckpointStore::new(env::checkpoint_dir()),
            titles: pg.clone(),
            efs: pg.clone(),
            connectivity: pg.clone(),
            centroids: pg.clone(),
            ctm: pg.clone(),
            narratives: pg.clone(),
            epics: pg.clone(),
            graph,
            llm,
        })
    }
}
