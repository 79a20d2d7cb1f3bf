use crate::domain::model::Table;
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Source: Send + Sync {
    async fn get_data(&self) -> Result<Table>;
}

#[async_trait]
pub trait Destination: Send + Sync {
    async fn write_data(&self, data: &Table) -> Result<()>;
}
