use anyhow::Context;
use std::fs::File;

use chip8_host::app::{self, App, TerminalSession};
use chip8_host::config::Config;
use chip8_host::display::TermDisplay;
use chip8_host::render::{PixelSurface, Surface};
use chip8_host::viewer::RomViewer;

fn init_logging(config: &Config) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if let Some(path) = &config.log_file {
        let file = File::create(path)
            .with_context(|| format!("can't create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = Config::from_args();
    init_logging(&config)?;

    let catalog = app::open_catalog(&config.catalog, &config.games);
    let session = TerminalSession::start().context("can't set up the terminal")?;
    let display = TermDisplay::new(PixelSurface::for_scale(config.scale).size())?;
    let mut app = App::new(
        &config,
        RomViewer::new(),
        display,
        catalog,
        session.reports_releases(),
    );

    app.load_initial(&config);
    app.run()?;

    // restore the terminal before anything else gets printed
    drop(app);
    drop(session);
    Ok(())
}
