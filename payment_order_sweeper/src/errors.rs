use thiserror::Error;

#[derive(Debug, Error)]
pub enum SweeperError {
    #[error("Could not connect to the database. {0}")]
    DatabaseConnection(String),
    #[error("Could not run database migrations. {0}")]
    Migration(String),
    #[error("Could not listen for the shutdown signal. {0}")]
    Signal(#[from] std::io::Error),
    #[error("Error closing the database. {0}")]
    Shutdown(String),
}
