//! Идеальные строки для тестов, бенчмарков и демо.
//!
//! Каждая символика умеет выдать ширины своих полос в модулях (`encode_*`,
//! первая полоса тёмная). Здесь общая часть: тихие зоны, масштаб, пиксели.

use crate::core::{BarcodeFormat, BitRow, LumaImage};
use crate::one_d::{codabar, code128, code39, code93, ean13, ean8, itf, msi, pharmacode, plessey, upca, upce};

/// Ширины указанной символики, если текст кодируем.
pub fn encode(format: BarcodeFormat, text: &str) -> Option<Vec<u32>> {
    match format {
        BarcodeFormat::Ean13 => ean13::encode_ean13(text),
        BarcodeFormat::Ean8 => ean8::encode_ean8(text),
        BarcodeFormat::UpcA => upca::encode_upca(text),
        BarcodeFormat::UpcE => upce::encode_upce(text),
        BarcodeFormat::Code128 => code128::encode_code128(text),
        BarcodeFormat::Code39 => code39::encode_code39(text, false),
        BarcodeFormat::Code93 => code93::encode_code93(text),
        BarcodeFormat::Codabar => codabar::encode_codabar(text),
        BarcodeFormat::Itf => itf::encode_itf(text),
        BarcodeFormat::Msi => msi::encode_msi(text),
        BarcodeFormat::Plessey => plessey::encode_plessey(text),
        BarcodeFormat::PharmaCode => pharmacode::encode_pharmacode(text.parse().ok()?),
        BarcodeFormat::UpcEanExtension => crate::one_d::extension::encode_extension(text),
    }
}

/// Склеить два символа (оба от тёмной полосы до тёмной) через светлый промежуток.
pub fn join_with_gap(first: &[u32], gap: u32, second: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(first.len() + second.len() + 1);
    out.extend_from_slice(first);
    out.push(gap);
    out.extend_from_slice(second);
    out
}

/// Модули → пиксели (0 тёмный, 255 светлый), тихие зоны `quiet` модулей по краям.
pub fn render_pixels(widths: &[u32], unit: usize, quiet: usize) -> Vec<u8> {
    assert!(unit >= 1);
    let total: usize = widths.iter().map(|&w| w as usize).sum::<usize>() + 2 * quiet;
    let mut pix = Vec::with_capacity(total * unit);
    pix.resize(quiet * unit, 255);
    let mut dark = true;
    for &w in widths {
        let v = if dark { 0 } else { 255 };
        pix.extend(std::iter::repeat(v).take(w as usize * unit));
        dark = !dark;
    }
    pix.extend(std::iter::repeat(255).take(quiet * unit));
    pix
}

/// То же, сразу в `BitRow`.
pub fn render_row(widths: &[u32], unit: usize, quiet: usize) -> BitRow {
    render_pixels(widths, unit, quiet).iter().map(|&v| v < 128).collect()
}

/// Изображение из `height` одинаковых строк.
pub fn render_image(widths: &[u32], unit: usize, quiet: usize, height: usize) -> LumaImage {
    LumaImage::from_row_repeated(&render_pixels(widths, unit, quiet), height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_start_and_end_light() {
        let p = render_pixels(&[1, 2, 1], 2, 1);
        assert_eq!(p, vec![255, 255, 0, 0, 255, 255, 255, 255, 0, 0, 255, 255]);
        let r = render_row(&[1, 2, 1], 1, 0);
        assert_eq!(r.to_string(), "X..X");
    }

    #[test]
    fn every_format_encodes_something() {
        let samples = [
            (BarcodeFormat::Ean13, "400638133393"),
            (BarcodeFormat::Ean8, "9638507"),
            (BarcodeFormat::UpcA, "03600029145"),
            (BarcodeFormat::UpcE, "0123456"),
            (BarcodeFormat::Code128, "Hi"),
            (BarcodeFormat::Code39, "AB-1"),
            (BarcodeFormat::Code93, "AB-1"),
            (BarcodeFormat::Codabar, "A123B"),
            (BarcodeFormat::Itf, "123456"),
            (BarcodeFormat::Msi, "1234"),
            (BarcodeFormat::Plessey, "1A2B"),
            (BarcodeFormat::PharmaCode, "1234"),
            (BarcodeFormat::UpcEanExtension, "12"),
        ];
        for (f, t) in samples {
            let w = encode(f, t).unwrap_or_else(|| panic!("{f}: {t}"));
            assert!(w.len() % 2 == 1, "{f}: должно начинаться и кончаться тёмной полосой");
        }
    }
}
