use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    deskhand_cli::run().await
}
