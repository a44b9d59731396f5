use clap::Args;

use burrow_daemon::http_server::api::client::ApiError;
use burrow_daemon::http_server::rooms::{AddRoomRequest, AddRoomResponse};

#[derive(Args, Debug, Clone)]
pub struct AddRoom {
    /// base64-encoded read capability token
    #[arg(long)]
    pub read: String,

    /// base64-encoded write capability token
    #[arg(long)]
    pub write: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AddRoomError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("daemon did not accept the room tokens")]
    Rejected,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for AddRoom {
    type Error = AddRoomError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();

        let request = AddRoomRequest {
            read: self.read.clone(),
            write: self.write.clone(),
        };
        let response: AddRoomResponse = client.call(request).await?;

        if !response.success {
            return Err(AddRoomError::Rejected);
        }
        Ok("room added".to_string())
    }
}
