mod cli;
mod log;
mod svc;
#[cfg(test)]
mod test_utils;

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = cli::run_app().await {
        cli::ux::present_error(e);
        std::process::exit(1);
    }
    Ok(())
}
