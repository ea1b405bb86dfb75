use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    viva::app::run().await
}
