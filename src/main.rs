mod app;
mod cli;
mod config;
mod loader;
mod render;
mod sheet;
mod state;
mod ui;
mod view;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run()
}
