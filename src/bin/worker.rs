#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = examroom::run_worker().await {
        eprintln!("examroom-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
