use reasoning_gateway_lib::{modules, proxy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = modules::load_config()?;
    let _guard = modules::logger::init_logger(config.log_dir.as_deref())?;

    proxy::serve(config).await?;
    Ok(())
}
