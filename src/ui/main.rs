use anyhow::Result;

#[path = "mod.rs"]
mod ui;
#[path = "../shared/mod.rs"]
mod shared;

#[tokio::main]
async fn main() -> Result<()> {
    ui::run_server().await
}
