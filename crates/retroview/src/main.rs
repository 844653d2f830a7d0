mod cli;
mod legacy;
mod paths;
mod pattern;
mod producer;
mod run;
mod settings;
mod window;

use anyhow::Result;
use cli::Command;
use presenter::format::{resolve, NAMED_FORMATS};
use presenter::upload::TexelEncoding;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Formats) => {
            print_formats();
            Ok(())
        }
        None => run::run(cli.run),
    }
}

fn print_formats() {
    println!("Producer pixel formats:");
    for (name, format, ty) in NAMED_FORMATS {
        let resolved = resolve(*format, *ty);
        let encoding = TexelEncoding::for_format(resolved);
        println!(
            "  {name:<12} format={format:#06x} type={ty:#06x} bpp={} gpu={:<14} texture={:?}",
            resolved.bytes_per_pixel,
            resolved.format.name(),
            encoding.texture_format,
        );
    }
}
