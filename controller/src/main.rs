mod host;
mod hw;
#[cfg(feature = "rpi")]
mod rpi;
mod sampler;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    host::run().await
}
