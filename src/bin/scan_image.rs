// src/bin/scan_image.rs
//
// Распознать 1D штрих-коды в файлах изображений (PNG/JPEG/PGM/…).
//
//   cargo run --bin scan_image -- photo.png
//   cargo run --bin scan_image -- --try-harder --format ean13 --format code128 a.png b.jpg
//   RUST_LOG=ultrabar=trace cargo run --bin scan_image -- -vv a.png

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ultrabar::prelude::*;

/// Распознать одномерные штрих-коды в файлах изображений
#[derive(Parser, Debug)]
#[command(name = "scan_image", version, about, long_about = None)]
struct Args {
    /// Файлы изображений
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Ограничить форматы (можно повторять): ean13, upc-a, code128, itf, msi, ...
    #[arg(short, long = "format", value_name = "FORMAT")]
    formats: Vec<BarcodeFormat>,

    /// Больше строк и попытка на повёрнутом изображении
    #[arg(long)]
    try_harder: bool,

    /// Пробовать негатив, если ничего не найдено
    #[arg(long)]
    also_inverted: bool,

    /// Адаптивная бинаризация (неравномерная засветка)
    #[arg(long)]
    adaptive: bool,

    /// Последний символ Code 39: контрольный
    #[arg(long)]
    code39_check: bool,

    /// Code 39 Full ASCII
    #[arg(long)]
    code39_extended: bool,

    /// Последняя цифра MSI: контрольная (Luhn)
    #[arg(long)]
    msi_check: bool,

    /// Не отрезать start/stop символы Codabar
    #[arg(long)]
    codabar_start_end: bool,

    /// Code 128 как GS1-128
    #[arg(long)]
    gs1: bool,

    /// Только текст, без формата и координат
    #[arg(short, long)]
    quiet: bool,

    /// Подробнее в лог (-v debug, -vv trace); RUST_LOG имеет приоритет
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "ultrabar=debug,scan_image=debug",
        _ => "ultrabar=trace,scan_image=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn pipeline(args: &Args) -> Pipeline {
    let mut b = Pipeline::builder()
        .try_harder(args.try_harder)
        .also_inverted(args.also_inverted)
        .assume_code39_check_digit(args.code39_check)
        .code39_extended_mode(args.code39_extended)
        .assume_msi_check_digit(args.msi_check)
        .return_codabar_start_end(args.codabar_start_end)
        .assume_gs1(args.gs1);
    if !args.formats.is_empty() {
        b = b.formats(args.formats.iter().copied());
    }
    if args.adaptive {
        b = b.binarizer(BinarizerKind::AdaptiveMean { bias: 5 });
    }
    b.build()
}

fn scan_file(pipeline: &Pipeline, path: &Path) -> Result<Option<DecodedSymbol>> {
    let img = image::open(path)
        .with_context(|| format!("не удалось открыть {}", path.display()))?
        .to_luma8();
    let (width, height) = img.dimensions();
    let gray = GrayImage {
        data: img.as_raw(),
        width: width as usize,
        height: height as usize,
    };
    info!(file = %path.display(), width, height, "scanning");
    match pipeline.decode(&gray) {
        Ok(sym) => Ok(Some(sym)),
        Err(DecodeError::NotFound) => Ok(None),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "decode failed");
            Ok(None)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    let pipeline = pipeline(&args);

    let mut found = 0usize;
    let mut failed = false;
    for path in &args.files {
        match scan_file(&pipeline, path) {
            Ok(Some(sym)) => {
                found += 1;
                if args.quiet {
                    println!("{}", sym.text);
                } else {
                    let pts: Vec<String> = sym.points.iter().map(|p| format!("({:.0},{:.0})", p.x, p.y)).collect();
                    println!(
                        "{}: {}:{}  orientation={} points={}",
                        path.display(),
                        sym.format,
                        sym.text,
                        sym.orientation(),
                        pts.join(" ")
                    );
                }
            }
            Ok(None) => {
                if !args.quiet {
                    println!("{}: ничего не распознано", path.display());
                }
            }
            Err(e) => {
                eprintln!("{e:#}");
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::from(2)
    } else if found == 0 {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
