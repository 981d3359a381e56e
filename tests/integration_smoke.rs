// tests/integration_smoke.rs
//
// Интеграционные тесты верхнего уровня: синтетическая картинка → Pipeline → текст.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use ultrabar::one_d::synth::{encode, render_image, render_pixels};
use ultrabar::prelude::*;

fn write_pgm(path: &Path, img: &LumaImage) -> io::Result<()> {
    let mut f = fs::File::create(path)?;
    write!(f, "P5\n{} {}\n255\n", img.width, img.height)?;
    f.write_all(&img.data)
}

// Упрощённое чтение PGM P5 (8 бит, maxval=255, без комментариев).
fn load_pgm_as_luma(path: &Path) -> io::Result<LumaImage> {
    let mut buf = Vec::new();
    fs::File::open(path)?.read_to_end(&mut buf)?;
    let bad = |msg: &str| io::Error::new(io::ErrorKind::InvalidData, msg.to_string());

    let mut fields = Vec::with_capacity(4);
    let mut i = 0usize;
    while fields.len() < 4 {
        while i < buf.len() && buf[i].is_ascii_whitespace() {
            i += 1;
        }
        let start = i;
        while i < buf.len() && !buf[i].is_ascii_whitespace() {
            i += 1;
        }
        if start == i {
            return Err(bad("PGM: header truncated"));
        }
        fields.push(String::from_utf8_lossy(&buf[start..i]).to_string());
    }
    i += 1; // один пробельный символ после maxval
    if fields[0] != "P5" || fields[3] != "255" {
        return Err(bad("PGM: only P5 with maxval=255"));
    }
    let width: usize = fields[1].parse().map_err(|_| bad("PGM: bad width"))?;
    let height: usize = fields[2].parse().map_err(|_| bad("PGM: bad height"))?;
    let data = buf.get(i..).ok_or_else(|| bad("PGM: no data"))?.to_vec();
    if data.len() != width * height {
        return Err(bad("PGM: data size mismatch"));
    }
    Ok(LumaImage { data, width, height })
}

fn image(format: BarcodeFormat, text: &str) -> LumaImage {
    render_image(&encode(format, text).unwrap(), 2, 10, 48)
}

#[test]
fn blank_image_is_not_found() {
    let img = LumaImage {
        data: vec![255; 64 * 64],
        width: 64,
        height: 64,
    };
    assert_eq!(ultrabar::decode(&img), Err(DecodeError::NotFound));

    let black = LumaImage {
        data: vec![0; 64 * 64],
        width: 64,
        height: 64,
    };
    let all = Pipeline::builder().formats(BarcodeFormat::ALL).try_harder(true).build();
    assert_eq!(all.decode(&black), Err(DecodeError::NotFound));
}

#[test]
fn standard_formats_round_trip() {
    let cases = [
        (BarcodeFormat::Ean13, "4006381333931", "4006381333931"),
        (BarcodeFormat::Ean8, "9638507", "96385074"),
        (BarcodeFormat::UpcA, "03600029145", "036000291452"),
        (BarcodeFormat::UpcE, "0123456", "01234565"),
        (BarcodeFormat::Code128, "HELLO", "HELLO"),
        (BarcodeFormat::Code39, "CODE-39", "CODE-39"),
        (BarcodeFormat::Code93, "CODE 93", "CODE 93"),
        (BarcodeFormat::Codabar, "A31117013206375B", "31117013206375"),
        (BarcodeFormat::Itf, "30712345000010", "30712345000010"),
    ];
    for (format, input, expected) in cases {
        let sym = ultrabar::decode(&image(format, input)).unwrap_or_else(|e| panic!("{format}: {e}"));
        assert_eq!(sym.format, format, "{input}");
        assert_eq!(sym.text, expected);
        assert_eq!(sym.points.len(), 2);
    }
}

#[test]
fn opt_in_formats_round_trip() {
    let pipe = Pipeline::builder()
        .formats([BarcodeFormat::Msi, BarcodeFormat::PharmaCode])
        .assume_msi_check_digit(true)
        .build();
    assert_eq!(pipe.decode(&image(BarcodeFormat::Msi, "12344")).unwrap().text, "12344");
    // неверная контрольная цифра Luhn
    assert!(pipe.decode(&image(BarcodeFormat::Msi, "12345")).is_err());
    assert_eq!(pipe.decode(&image(BarcodeFormat::PharmaCode, "1234")).unwrap().text, "1234");

    let plessey = render_image(&encode(BarcodeFormat::Plessey, "0F1E").unwrap(), 1, 60, 16);
    let sym = Pipeline::builder()
        .formats([BarcodeFormat::Plessey])
        .build()
        .decode(&plessey)
        .unwrap();
    assert_eq!(sym.text, "0F1E");
}

#[test]
fn mirrored_image_reports_180() {
    let img = image(BarcodeFormat::Ean13, "4006381333931");
    let straight = ultrabar::decode(&img).unwrap();

    let mirrored = LumaImage {
        data: img
            .data
            .chunks(img.width)
            .flat_map(|row| row.iter().rev().copied())
            .collect(),
        width: img.width,
        height: img.height,
    };
    let sym = ultrabar::decode(&mirrored).unwrap();
    assert_eq!(sym.text, straight.text);
    assert_eq!(sym.orientation(), 180);
    let w = img.width as f32;
    assert_eq!(sym.points[0].x, w - straight.points[0].x - 1.0);
}

#[test]
fn decode_from_pgm_file() {
    let dir = std::env::temp_dir().join(format!("ultrabar-smoke-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join("code128.pgm");
    write_pgm(&path, &image(BarcodeFormat::Code128, "Pgm-128")).unwrap();

    let img = load_pgm_as_luma(&path).unwrap();
    let sym = ultrabar::decode(&img.as_gray()).unwrap();
    assert_eq!(sym.format, BarcodeFormat::Code128);
    assert_eq!(sym.text, "Pgm-128");
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn symbol_off_centre_is_found_with_try_harder() {
    // символ только в верхних 6 строках из 200
    let row = render_pixels(&encode(BarcodeFormat::Code39, "TOP").unwrap(), 2, 10);
    let width = row.len();
    let mut data = Vec::with_capacity(width * 200);
    for y in 0..200 {
        if y < 6 {
            data.extend_from_slice(&row);
        } else {
            data.extend(std::iter::repeat(255).take(width));
        }
    }
    let img = LumaImage { data, width, height: 200 };
    assert!(ultrabar::decode(&img).is_err());
    let sym = Pipeline::builder().try_harder(true).build().decode(&img).unwrap();
    assert_eq!(sym.text, "TOP");
    assert!(sym.points[0].y < 6.0);
}
