pub mod models;
pub mod prompts;
pub mod providers;

use crate::config::LlmConfig;
use crate::transform::Row;
use async_trait::async_trait;
use models::{ChartConfig, ExplanationList, GeneratedQuery, QueryExplanation};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),
    #[error("LLM response error: {0}")]
    ResponseError(String),
    #[error("LLM output does not match schema '{schema}': {message}")]
    SchemaMismatch { schema: String, message: String },
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// A request to produce an object conforming to `schema`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub schema_name: String,
    pub schema: serde_json::Value,
}

impl GenerationRequest {
    pub fn for_type<T: JsonSchema>(model: &str, system: String, prompt: String) -> Self {
        let schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default();
        Self {
            model: model.to_string(),
            system,
            prompt,
            schema_name: T::schema_name(),
            schema,
        }
    }
}

/// Structured generation: prompt in, JSON value shaped by the request schema out.
#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<serde_json::Value, LlmError>;
}

pub struct LlmManager {
    generator: Arc<dyn StructuredGenerator>,
    model: String,
    chart_model: String,
    table_ddl: String,
}

impl LlmManager {
    pub fn new(config: &LlmConfig, table_ddl: String) -> Result<Self, LlmError> {
        let generator: Arc<dyn StructuredGenerator> = match config.backend.as_str() {
            "openai" => Arc::new(providers::openai::OpenAiProvider::new(config)?),
            "ollama" => Arc::new(providers::ollama::OllamaProvider::new(config)?),
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self::with_generator(generator, config, table_ddl))
    }

    pub fn with_generator(
        generator: Arc<dyn StructuredGenerator>,
        config: &LlmConfig,
        table_ddl: String,
    ) -> Self {
        Self {
            generator,
            model: config.model.clone(),
            chart_model: config.chart_model.clone().unwrap_or_else(|| config.model.clone()),
            table_ddl,
        }
    }

    async fn generate_object<T>(&self, request: GenerationRequest) -> Result<T, LlmError>
    where
        T: DeserializeOwned,
    {
        debug!("Structured generation '{}' with model {}", request.schema_name, request.model);
        let value = self.generator.generate(&request).await?;

        serde_json::from_value(value).map_err(|e| LlmError::SchemaMismatch {
            schema: request.schema_name.clone(),
            message: e.to_string(),
        })
    }

    pub async fn generate_query(&self, question: &str) -> Result<String, LlmError> {
        let request = GenerationRequest::for_type::<GeneratedQuery>(
            &self.model,
            prompts::query_system(&self.table_ddl),
            prompts::query_prompt(question),
        );
        let generated: GeneratedQuery = self.generate_object(request).await?;

        let query = generated.query.trim().to_string();
        if query.is_empty() {
            return Err(LlmError::ResponseError("Model returned an empty query".to_string()));
        }

        info!("Generated SQL: {}", query);
        Ok(query)
    }

    pub async fn explain_query(
        &self,
        question: &str,
        sql: &str,
    ) -> Result<Vec<QueryExplanation>, LlmError> {
        let request = GenerationRequest::for_type::<ExplanationList>(
            &self.model,
            prompts::explain_system(&self.table_ddl),
            prompts::explain_prompt(question, sql),
        );
        let list: ExplanationList = self.generate_object(request).await?;

        info!("Model explained {} query sections", list.explanations.len());
        Ok(list.explanations)
    }

    pub async fn generate_chart_config(
        &self,
        question: &str,
        rows: &[Row],
    ) -> Result<ChartConfig, LlmError> {
        let request = GenerationRequest::for_type::<ChartConfig>(
            &self.chart_model,
            prompts::CHART_SYSTEM.to_string(),
            prompts::chart_prompt(question, rows),
        );
        self.generate_object(request).await
    }
}
