use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use presenter::format::named_format;
use presenter::{Rect, ScreenType, Size};

#[derive(Parser, Debug)]
#[command(
    name = "retroview",
    author,
    version,
    about = "Emulator frame presenter with a synthetic test-pattern producer",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration file; defaults to `retroview.toml` in the user config directory.
    #[arg(long, value_name = "FILE", env = "RETROVIEW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Raw producer buffer size (e.g. `292x224`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, default_value = "256x224")]
    pub buffer: Size,

    /// Visible rectangle inside the buffer (`X,Y,WIDTHxHEIGHT`); the whole buffer when omitted.
    #[arg(long, value_name = "X,Y,WxH", value_parser = parse_screen_rect)]
    pub screen_rect: Option<Rect>,

    /// Producer pixel format, see `retroview formats`.
    #[arg(long, value_name = "NAME", value_parser = parse_format, default_value = "bgra8")]
    pub format: (u32, u32),

    /// How the producer hands frames over.
    #[arg(long, value_enum, default_value_t = ProducerMode::Double)]
    pub mode: ProducerMode,

    /// Render frames through the legacy-API bridge instead of CPU pixels.
    #[arg(long)]
    pub legacy: bool,

    /// Display technology the synthetic system reports.
    #[arg(long, value_name = "KIND", value_parser = parse_screen_type, default_value = "other")]
    pub screen: ScreenType,

    /// Producer frame rate.
    #[arg(long, value_name = "FPS", default_value_t = 60.0)]
    pub fps: f32,

    /// CRT filter override (`off`, `crt`, `simple-crt`).
    #[arg(long, value_name = "NAME")]
    pub filter: Option<String>,

    /// Enable the LCD grid filter on LCD screens.
    #[arg(long)]
    pub lcd_filter: bool,

    /// Sample the frame with linear filtering.
    #[arg(long)]
    pub smooth: bool,

    /// Snap scaling to whole multiples of the visible size.
    #[arg(long)]
    pub integer_scale: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProducerMode {
    /// Double-buffered handoff with back-pressure.
    Double,
    /// Single buffer guarded by the content lock.
    Single,
    /// Speed-modified: the display never waits.
    Speed,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the producer pixel formats and how each one is presented.
    Formats,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<Size, String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("dimensions must be greater than zero".into());
    }
    Ok(Size::new(width, height))
}

pub fn parse_screen_rect(value: &str) -> Result<Rect, String> {
    let mut parts = value.trim().splitn(3, ',');
    let (Some(x), Some(y), Some(size)) = (parts.next(), parts.next(), parts.next()) else {
        return Err("expected X,Y,WIDTHxHEIGHT".into());
    };
    let x = x
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid x offset '{}'", x.trim()))?;
    let y = y
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid y offset '{}'", y.trim()))?;
    let size = parse_size(size)?;
    Ok(Rect::new(x, y, size.width, size.height))
}

pub fn parse_format(value: &str) -> Result<(u32, u32), String> {
    named_format(value)
        .ok_or_else(|| format!("unknown pixel format '{}'; run `retroview formats`", value.trim()))
}

pub fn parse_screen_type(value: &str) -> Result<ScreenType, String> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "lcd" => Ok(ScreenType::Lcd),
        "crt" => Ok(ScreenType::Crt),
        "other" | "none" | "" => Ok(ScreenType::Other),
        other => Err(format!(
            "unknown screen type '{other}'; expected lcd, crt, or other"
        )),
    }
}
