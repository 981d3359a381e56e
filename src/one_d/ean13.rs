//! Декодер EAN-13 по одной строке.
//!
//! Алгоритм:
//! 1) стартовый guard `101` (общий для семейства, см. `upc_ean`);
//! 2) шесть левых цифр из наборов L/G; какая цифра из какого набора :
//!    маска, по которой восстанавливается неявная первая цифра;
//! 3) центральный guard `01010`;
//! 4) шесть правых цифр (ширины как у L, цвета инвертированы);
//! 5) финальный guard, тихая зона, контрольная цифра.

use std::ops::Range;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol};
use crate::one_d::extension::UpcEanExtensionReader;
use crate::one_d::upc_ean::{
    decode_digit, decode_row_with_start, digit_widths, find_start_guard_pattern, standard_upc_ean_checksum,
    UpcEanVariant, L_AND_G_PATTERNS, L_PATTERNS, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE, MIDDLE_PATTERN,
    START_END_PATTERN,
};
use crate::one_d::{find_guard_pattern, sum, OneDReader};

/// Маски L/G шести левых цифр (бит 5: первая цифра, 1 = G) по первой цифре кода.
pub const FIRST_DIGIT_ENCODINGS: [u32; 10] = [0x00, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A];

#[derive(Debug, Default)]
pub struct Ean13Reader {
    counters: [u32; 4],
    extension: UpcEanExtensionReader,
}

impl Ean13Reader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Строка со стартовым guard'ом, уже найденным снаружи (см. `MultiFormatUpcEanReader`).
    pub fn decode_row_with_start(
        &mut self,
        row_number: usize,
        row: &BitRow,
        start_range: Range<usize>,
        opts: &DecodeOptions,
    ) -> DecodeResult<DecodedSymbol> {
        decode_row_with_start(self, row_number, row, start_range, opts)
    }
}

impl UpcEanVariant for Ean13Reader {
    fn format(&self) -> BarcodeFormat {
        BarcodeFormat::Ean13
    }

    fn decode_middle(&mut self, row: &BitRow, start_range: &Range<usize>, result: &mut String) -> DecodeResult<usize> {
        let mut row_offset = start_range.end;
        let mut lg_pattern = 0u32;

        // --- 1) левая половина: L/G ---
        for x in 0..6 {
            let best = decode_digit(row, &mut self.counters, row_offset, &L_AND_G_PATTERNS)?;
            result.push(char::from(b'0' + (best % 10) as u8));
            row_offset += sum(&self.counters);
            if best >= 10 {
                lg_pattern |= 1 << (5 - x);
            }
        }
        let first = determine_first_digit(lg_pattern)?;
        result.insert(0, first);

        // --- 2) центральный guard ---
        let middle = find_guard_pattern(
            row,
            row_offset,
            true,
            &MIDDLE_PATTERN,
            &mut [0u32; 5],
            MAX_AVG_VARIANCE,
            MAX_INDIVIDUAL_VARIANCE,
        )?;
        row_offset = middle.end;

        // --- 3) правая половина: только L ---
        for _ in 0..6 {
            let best = decode_digit(row, &mut self.counters, row_offset, &L_PATTERNS)?;
            result.push(char::from(b'0' + best as u8));
            row_offset += sum(&self.counters);
        }
        Ok(row_offset)
    }

    fn extension_reader(&mut self) -> &mut UpcEanExtensionReader {
        &mut self.extension
    }
}

impl OneDReader for Ean13Reader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        let start = find_start_guard_pattern(row)?;
        decode_row_with_start(self, row_number, row, start, opts)
    }
}

fn determine_first_digit(lg_pattern: u32) -> DecodeResult<char> {
    FIRST_DIGIT_ENCODINGS
        .iter()
        .position(|&e| e == lg_pattern)
        .map(|d| char::from(b'0' + d as u8))
        .ok_or(DecodeError::NotFound)
}

// === Синтезатор для тестов/демо ===

/// Ширины EAN-13 (от первой тёмной полосы). Принимает 12 цифр (контрольная
/// дописывается) или 13.
pub fn encode_ean13(digits: &str) -> Option<Vec<u32>> {
    let mut d: Vec<usize> = digits
        .bytes()
        .map(|b| b.is_ascii_digit().then(|| usize::from(b - b'0')))
        .collect::<Option<_>>()?;
    match d.len() {
        12 => d.push(standard_upc_ean_checksum(digits.as_bytes()).ok()? as usize),
        13 => {}
        _ => return None,
    }
    let parity = FIRST_DIGIT_ENCODINGS[d[0]];
    let mut out = START_END_PATTERN.to_vec();
    for (i, &digit) in d[1..7].iter().enumerate() {
        out.extend(digit_widths(digit, parity & (1 << (5 - i)) != 0));
    }
    out.extend(MIDDLE_PATTERN);
    for &digit in &d[7..13] {
        out.extend(L_PATTERNS[digit]);
    }
    out.extend(START_END_PATTERN);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{MetadataKey, Point};
    use crate::one_d::extension::encode_extension;
    use crate::one_d::synth::{join_with_gap, render_row};
    use std::sync::{Arc, Mutex};

    fn row(digits: &str) -> BitRow {
        render_row(&encode_ean13(digits).unwrap(), 2, 10)
    }

    #[test]
    fn ean13_basic() {
        let mut r = Ean13Reader::new();
        let sym = r.decode_row(0, &row("4006381333931"), &DecodeOptions::default()).unwrap();
        assert_eq!(sym.format, BarcodeFormat::Ean13);
        assert_eq!(sym.text, "4006381333931");
        assert_eq!(
            sym.metadata.get(MetadataKey::SymbologyIdentifier).and_then(|v| v.as_text()),
            Some("]E0")
        );
        assert_eq!(
            sym.metadata.get(MetadataKey::PossibleCountry).and_then(|v| v.as_text()),
            Some("DE")
        );
        // границы по серединам guard'ов: 20 + 3 и 20 + 95·2 - 3
        assert_eq!(sym.points, vec![Point::new(23.0, 0.0), Point::new(207.0, 0.0)]);
    }

    #[test]
    fn computes_missing_check_digit() {
        assert_eq!(encode_ean13("400638133393"), encode_ean13("4006381333931"));
        assert_eq!(encode_ean13("40063813339").map(|v| v.len()), None);
    }

    #[test]
    fn bad_check_digit_is_checksum_error() {
        let mut r = Ean13Reader::new();
        assert_eq!(
            r.decode_row(0, &row("4006381333932"), &DecodeOptions::default()),
            Err(DecodeError::ChecksumError)
        );
    }

    #[test]
    fn missing_quiet_zone_is_not_found() {
        let mut r = Ean13Reader::new();
        let widths = encode_ean13("4006381333931").unwrap();
        let bare = render_row(&widths, 2, 0);
        assert_eq!(
            r.decode_row(0, &bare, &DecodeOptions::default()),
            Err(DecodeError::NotFound)
        );
    }

    #[test]
    fn callback_sees_guard_points() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let opts = DecodeOptions {
            result_point_callback: Some(Arc::new(move |p: Point| sink.lock().unwrap().push(p))),
            ..Default::default()
        };
        Ean13Reader::new().decode_row(5, &row("5901234123457"), &opts).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|p| p.y == 5.0));
    }

    #[test]
    fn extension_is_attached_and_filtered() {
        let widths = join_with_gap(&encode_ean13("9781234567897").unwrap(), 9, &encode_extension("12").unwrap());
        let r = render_row(&widths, 2, 10);
        let mut reader = Ean13Reader::new();
        let sym = reader.decode_row(0, &r, &DecodeOptions::default()).unwrap();
        assert_eq!(sym.text, "9781234567897");
        assert_eq!(
            sym.metadata.get(MetadataKey::UpcEanExtension).and_then(|v| v.as_text()),
            Some("12")
        );
        assert_eq!(
            sym.metadata.get(MetadataKey::IssueNumber).and_then(|v| v.as_int()),
            Some(12)
        );
        assert_eq!(sym.points.len(), 4);

        let only_five = DecodeOptions {
            allowed_ean_extensions: Some(vec![5]),
            ..Default::default()
        };
        assert_eq!(reader.decode_row(0, &r, &only_five), Err(DecodeError::NotFound));
    }
}
