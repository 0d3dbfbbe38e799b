use thiserror::Error;

/// Stage-level failures of a pipeline run.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Every category fetch failed. Recovered by the agent with mock data.
    #[error("no articles collected: {0}")]
    Collection(String),

    #[error("no articles to analyze")]
    EmptyInput,

    #[error("generating summary: {0:#}")]
    Generation(anyhow::Error),

    #[error("sending chunk {chunk}/{total}: {source:#}")]
    Delivery {
        chunk: usize,
        total: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("connecting to {service}: {source:#}")]
    Connection {
        service: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] common::ConfigError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
