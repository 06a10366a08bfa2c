use simplelog::*;

#[derive(clap::ArgEnum, Debug, Copy, Clone)]
pub enum Color {
    Auto,
    Always,
    Never,
}

/// Sends log output to stderr, where it cannot mix with converted bytes on stdout.
pub fn init_logger(verbosity: u8, color: Color) {
    let mut builder = ConfigBuilder::new();
    builder.set_location_level(LevelFilter::Trace);
    builder.set_target_level(LevelFilter::Off);
    builder.set_thread_level(LevelFilter::Off);
    builder.set_time_level(LevelFilter::Off);
    let config = builder.build();

    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let color = match color {
        Color::Always => ColorChoice::AlwaysAnsi,
        Color::Auto if atty::is(atty::Stream::Stderr) => ColorChoice::Auto,
        Color::Auto | Color::Never => ColorChoice::Never,
    };

    // A second logger can't be installed; whatever is already there keeps working.
    let _ = TermLogger::init(level, config.clone(), TerminalMode::Stderr, color)
        .or_else(|_| SimpleLogger::init(level, config));
}
