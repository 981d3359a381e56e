// src/bin/scan_synthetic.rs
//
// Сгенерировать идеальный символ, распознать его и (по желанию) сохранить картинку.
//
//   cargo run --bin scan_synthetic --
//   cargo run --bin scan_synthetic -- --format code128 --text "HELLO" --unit 3
//   cargo run --bin scan_synthetic -- --format itf --text 12345678 --invert --save out.png

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use ultrabar::one_d::synth;
use ultrabar::prelude::*;

/// Синтетика: текст → полосы → картинка → декодер
#[derive(Parser, Debug)]
#[command(name = "scan_synthetic", version, about, long_about = None)]
struct Args {
    /// Символика
    #[arg(short, long, default_value = "ean13")]
    format: BarcodeFormat,

    /// Содержимое (для UPC/EAN можно без контрольной цифры)
    #[arg(short, long, default_value = "590123412345")]
    text: String,

    /// Ширина модуля в пикселях
    #[arg(long, default_value_t = 2)]
    unit: usize,

    /// Высота картинки
    #[arg(long, default_value_t = 64)]
    height: usize,

    /// Тихая зона в модулях с каждой стороны
    #[arg(long, default_value_t = 10)]
    quiet_zone: usize,

    /// Негатив (светлые полосы на тёмном); декодер пробует негатив сам
    #[arg(long)]
    invert: bool,

    /// Сохранить картинку (PNG/PGM/… по расширению)
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,

    /// Подробнее в лог
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default = if args.verbose > 0 { "ultrabar=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();

    if args.unit == 0 {
        bail!("--unit должен быть >= 1");
    }
    let widths = synth::encode(args.format, &args.text)
        .ok_or_else(|| anyhow!("{} не кодирует {:?}", args.format, args.text))?;
    let mut img = synth::render_image(&widths, args.unit, args.quiet_zone, args.height);
    if args.invert {
        img = img.invert().context("инверсия не поддерживается")?;
    }
    println!("{}x{} px, {} полос/пробелов", img.width, img.height, widths.len());

    let pipeline = Pipeline::builder()
        .formats([args.format])
        .also_inverted(args.invert)
        .build();
    match pipeline.decode(&img) {
        Ok(sym) => println!("{}: {}", sym.format, sym.text),
        Err(e) => println!("не распознано: {e}"),
    }

    if let Some(path) = &args.save {
        let buf = image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data)
            .ok_or_else(|| anyhow!("размер буфера не совпадает с картинкой"))?;
        buf.save(path)
            .with_context(|| format!("не удалось сохранить {}", path.display()))?;
        println!("сохранено: {}", path.display());
    }
    Ok(())
}
