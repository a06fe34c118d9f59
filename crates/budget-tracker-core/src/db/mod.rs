//! Database layer for the budget tracker
//!
//! A PostgreSQL pool plus repositories for budgets and transactions. Alert
//! persistence lives with the alerting engine.

mod budgets;
mod postgres;
mod transactions;

pub use budgets::BudgetRepository;
pub use postgres::PostgresPool;
pub use transactions::TransactionRepository;

use crate::alerting::AlertRepository;
use crate::config::Config;
use crate::error::Result;

/// Database connections and repositories
#[derive(Clone)]
pub struct Database {
    /// PostgreSQL connection pool
    pub postgres: PostgresPool,
    pub budgets: BudgetRepository,
    pub transactions: TransactionRepository,
    pub alerts: AlertRepository,
}

impl Database {
    /// Connect and build the repositories
    pub async fn new(config: &Config) -> Result<Self> {
        let postgres = PostgresPool::new(&config.database).await?;
        Ok(Self::from_pool(postgres))
    }

    /// Build the repositories over an existing pool
    pub fn from_pool(postgres: PostgresPool) -> Self {
        let pool = postgres.pool().clone();
        Self {
            budgets: BudgetRepository::new(pool.clone()),
            transactions: TransactionRepository::new(pool.clone()),
            alerts: AlertRepository::new(pool),
            postgres,
        }
    }

    /// Run database migrations
    pub async fn migrate(&self) -> Result<()> {
        self.postgres.migrate().await
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        self.postgres.health_check().await
    }
}
