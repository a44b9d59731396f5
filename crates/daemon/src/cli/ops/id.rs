use clap::Args;

use burrow_daemon::http_server::api::client::ApiError;
use burrow_daemon::http_server::rooms::{IdRequest, IdResponse};

#[derive(Args, Debug, Clone)]
pub struct Id;

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Id {
    type Error = IdError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response: IdResponse = client.call(IdRequest).await?;
        Ok(response.public_key)
    }
}
