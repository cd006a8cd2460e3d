//! SQL retrieval service.
//!
//! Turns a clinician question into one SQL statement with the SQL model,
//! executes it and keeps a bounded excerpt of the rows.

use crate::config::ReasoningParams;
use crate::ports::context_retriever::{
    ContextRetriever, RetrievalError, SqlExecutor, SqlExecutorError,
};
use crate::ports::model_handler::ModelHandlerFactory;
use async_trait::async_trait;
use medreason_domain::core::string::preview;
use medreason_domain::{
    ConversationTurn, ModelRole, PromptTemplate, SqlRetrievalResult, sanitize_statement,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// [`ContextRetriever`] backed by a SQL-generating model and a database.
pub struct SqlRetrievalService {
    factory: Arc<dyn ModelHandlerFactory>,
    model: String,
    executor: Arc<dyn SqlExecutor>,
    params: ReasoningParams,
}

impl SqlRetrievalService {
    pub fn new(
        factory: Arc<dyn ModelHandlerFactory>,
        model: impl Into<String>,
        executor: Arc<dyn SqlExecutor>,
    ) -> Self {
        Self {
            factory,
            model: model.into(),
            executor,
            params: ReasoningParams::default(),
        }
    }

    pub fn with_params(mut self, params: ReasoningParams) -> Self {
        self.params = params;
        self
    }

    /// Ask the SQL model for a statement and sanitize it.
    pub async fn generate_statement(
        &self,
        patient_id: &str,
        question: &str,
    ) -> Result<String, RetrievalError> {
        let handler = self
            .factory
            .create_handler(&self.model, ModelRole::Sql)
            .await
            .map_err(|e| RetrievalError::Generation(e.to_string()))?;

        let prompt = PromptTemplate::sql_generation(patient_id, question);
        let response = handler
            .generate(&[ConversationTurn::user(prompt)], self.params.sql_options())
            .await
            .map_err(|e| RetrievalError::Generation(e.to_string()))?;

        debug!("SQL model output: {}", preview(&response.text, 200));
        let statement =
            sanitize_statement(&response.text).ok_or(RetrievalError::EmptyStatement)?;
        info!("Generated SQL: {}", statement);
        Ok(statement)
    }
}

#[async_trait]
impl ContextRetriever for SqlRetrievalService {
    async fn retrieve(
        &self,
        patient_id: &str,
        question: &str,
    ) -> Result<SqlRetrievalResult, RetrievalError> {
        let statement = self.generate_statement(patient_id, question).await?;

        let rows = self
            .executor
            .execute(&statement)
            .await
            .map_err(|e| match e {
                SqlExecutorError::Operational(message) => RetrievalError::Execution {
                    query: statement.clone(),
                    message,
                },
                SqlExecutorError::Other(message) => RetrievalError::Database(message),
            })
            .inspect_err(|e| warn!("SQL retrieval failed: {}", e))?;

        let result = SqlRetrievalResult::from_rows(
            statement,
            rows.columns,
            rows.rows,
            self.params.row_cap,
        );
        info!(
            "Query returned {} rows{}",
            result.total_rows,
            if result.truncated { " (truncated)" } else { "" }
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::context_retriever::QueryRows;
    use crate::ports::model_handler::HandlerError;
    use crate::use_cases::test_support::{MockFactory, MockHandler};
    use medreason_domain::SqlValue;
    use std::sync::Mutex;

    struct MockExecutor {
        result: Result<QueryRows, SqlExecutorError>,
        executed: Mutex<Vec<String>>,
    }

    impl MockExecutor {
        fn new(result: Result<QueryRows, SqlExecutorError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                executed: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl SqlExecutor for MockExecutor {
        async fn execute(&self, statement: &str) -> Result<QueryRows, SqlExecutorError> {
            self.executed.lock().unwrap().push(statement.to_string());
            self.result.clone()
        }
    }

    fn drug_rows(n: usize) -> QueryRows {
        QueryRows {
            columns: vec!["drug".into()],
            rows: (0..n)
                .map(|i| vec![SqlValue::Text(format!("drug{i}"))])
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_executes_only_first_statement() {
        let handler = MockHandler::texts(&["SELECT 1; DROP TABLE patients;"]);
        let executor = MockExecutor::new(Ok(drug_rows(1)));
        let service = SqlRetrievalService::new(
            MockFactory::new(handler.clone()),
            "sql-model",
            executor.clone(),
        );

        let result = service.retrieve("10000032", "which drugs?").await.unwrap();

        assert_eq!(*executor.executed.lock().unwrap(), vec!["SELECT 1;".to_string()]);
        assert_eq!(result.query, "SELECT 1;");
        assert_eq!(result.rows.len(), 1);

        let (turns, options) = handler.last_call();
        assert_eq!(turns.len(), 1);
        assert!(turns[0].content.contains("subject_id = 10000032"));
        assert_eq!(options.max_tokens, Some(200));
        assert_eq!(options.temperature, Some(0.2));
    }

    #[tokio::test]
    async fn test_rows_capped() {
        let executor = MockExecutor::new(Ok(drug_rows(25)));
        let service = SqlRetrievalService::new(
            MockFactory::new(MockHandler::texts(&["SELECT drug FROM prescriptions"])),
            "sql-model",
            executor,
        );
        let result = service.retrieve("1", "drugs").await.unwrap();
        assert!(result.truncated);
        assert_eq!(result.rows.len(), 10);
        assert!(result.excerpt().ends_with("(+15 more rows)"));
    }

    #[tokio::test]
    async fn test_operational_error_is_typed() {
        let executor = MockExecutor::new(Err(SqlExecutorError::Operational(
            "no such table: labs".into(),
        )));
        let service = SqlRetrievalService::new(
            MockFactory::new(MockHandler::texts(&["SELECT * FROM labs"])),
            "sql-model",
            executor,
        );
        let err = service.retrieve("1", "labs").await.unwrap_err();
        assert_eq!(
            err,
            RetrievalError::Execution {
                query: "SELECT * FROM labs;".into(),
                message: "no such table: labs".into()
            }
        );
    }

    #[tokio::test]
    async fn test_generation_failure() {
        let executor = MockExecutor::new(Ok(QueryRows::default()));
        let service = SqlRetrievalService::new(
            MockFactory::new(MockHandler::new(vec![Err(HandlerError::Generation(
                "engine crashed".into(),
            ))])),
            "sql-model",
            executor.clone(),
        );
        let err = service.retrieve("1", "drugs").await.unwrap_err();
        assert!(matches!(err, RetrievalError::Generation(_)));
        assert!(executor.executed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_statement() {
        let service = SqlRetrievalService::new(
            MockFactory::new(MockHandler::texts(&[" ; "])),
            "sql-model",
            MockExecutor::new(Ok(QueryRows::default())),
        );
        assert_eq!(
            service.retrieve("1", "drugs").await.unwrap_err(),
            RetrievalError::EmptyStatement
        );
    }
}
