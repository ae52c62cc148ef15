use std::sync::OnceLock;

use story_agent::{StoryConfig, StoryFunction};
use tracing_subscriber::EnvFilter;
use vercel_runtime::{run, Body, Error, Request, Response};

static FUNCTION: OnceLock<StoryFunction> = OnceLock::new();

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("story_agent=info".parse()?))
        .init();

    // Refuse to start without the Gemini key.
    let config = StoryConfig::from_env()?;
    tracing::info!(?config, "starting story function");

    let function = StoryFunction::from_config(&config).await?;
    FUNCTION.set(function).map_err(|_| "story function initialized twice")?;

    run(handler).await
}

pub async fn handler(req: Request) -> Result<Response<Body>, Error> {
    let function = FUNCTION.get().ok_or("story function not initialized")?;
    let origin = req.headers().get("origin").and_then(|h| h.to_str().ok());

    let response = function.handle(req.method().as_str(), origin, req.body()).await;
    Ok(response.into_response()?)
}
