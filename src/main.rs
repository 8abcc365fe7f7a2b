use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    sitewatch::app::runtime::run().await
}
