use anyhow::Context;

use minired::server::RedisServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let server = RedisServer::new(std::env::args()).context("failed to parse command line")?;

    server
        .run()
        .await
        .with_context(|| format!("failed to serve on port {}", server.port))?;

    Ok(())
}
