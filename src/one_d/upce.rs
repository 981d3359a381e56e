//! UPC-E: сжатый UPC-A. Шесть цифр L/G; маска L/G несёт и систему нумерации (0/1),
//! и контрольную цифру. Финальный guard `010101`. Контрольная сумма считается по
//! развёрнутому UPC-A.

use std::ops::Range;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol};
use crate::one_d::extension::UpcEanExtensionReader;
use crate::one_d::upc_ean::{
    check_standard_upc_ean_checksum, decode_digit, decode_row_with_start, digit_widths, find_start_guard_pattern,
    standard_upc_ean_checksum, UpcEanVariant, L_AND_G_PATTERNS, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE,
    START_END_PATTERN, UPCE_END_PATTERN,
};
use crate::one_d::{find_guard_pattern, sum, OneDReader};

/// `[система нумерации][контрольная цифра]` → маска L/G (бит 5: первая цифра, 1 = G).
pub const NUMSYS_AND_CHECK_DIGIT_PATTERNS: [[u32; 10]; 2] = [
    [0x38, 0x34, 0x32, 0x31, 0x2C, 0x26, 0x23, 0x2A, 0x29, 0x25],
    [0x07, 0x0B, 0x0D, 0x0E, 0x13, 0x19, 0x1C, 0x15, 0x16, 0x1A],
];

#[derive(Debug, Default)]
pub struct UpcEReader {
    counters: [u32; 4],
    extension: UpcEanExtensionReader,
}

impl UpcEReader {
    pub fn new() -> Self {
        Self::default()
    }

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

impl UpcEanVariant for UpcEReader {
    fn format(&self) -> BarcodeFormat {
        BarcodeFormat::UpcE
    }

    fn decode_middle(&mut self, row: &BitRow, start_range: &Range<usize>, result: &mut String) -> DecodeResult<usize> {
        let mut row_offset = start_range.end;
        let mut lg_pattern = 0u32;
        for x in 0..6 {
            let best = decode_digit(row, &mut self.counters, row_offset, &L_AND_G_PATTERNS)?;
            result.push(char::from(b'0' + (best % 10) as u8));
            row_offset += sum(&self.counters);
            if best >= 10 {
                lg_pattern |= 1 << (5 - x);
            }
        }
        let (num_sys, check) = determine_num_sys_and_check_digit(lg_pattern)?;
        result.insert(0, char::from(b'0' + num_sys));
        result.push(char::from(b'0' + check));
        Ok(row_offset)
    }

    fn decode_end(&mut self, row: &BitRow, end_start: usize) -> DecodeResult<Range<usize>> {
        find_guard_pattern(
            row,
            end_start,
            true,
            &UPCE_END_PATTERN,
            &mut [0u32; 6],
            MAX_AVG_VARIANCE,
            MAX_INDIVIDUAL_VARIANCE,
        )
    }

    fn check_checksum(&self, s: &str) -> DecodeResult<bool> {
        check_standard_upc_ean_checksum(&convert_upce_to_upca(s)?)
    }

    fn extension_reader(&mut self) -> &mut UpcEanExtensionReader {
        &mut self.extension
    }
}

impl OneDReader for UpcEReader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        let start = find_start_guard_pattern(row)?;
        decode_row_with_start(self, row_number, row, start, opts)
    }
}

fn determine_num_sys_and_check_digit(lg_pattern: u32) -> DecodeResult<(u8, u8)> {
    for (num_sys, table) in NUMSYS_AND_CHECK_DIGIT_PATTERNS.iter().enumerate() {
        if let Some(d) = table.iter().position(|&e| e == lg_pattern) {
            return Ok((num_sys as u8, d as u8));
        }
    }
    Err(DecodeError::NotFound)
}

/// Развернуть UPC-E (7 или 8 цифр: система, 6 цифр, [контрольная]) в UPC-A.
pub fn convert_upce_to_upca(upce: &str) -> DecodeResult<String> {
    let b = upce.as_bytes();
    if b.len() < 7 || !b.iter().all(u8::is_ascii_digit) {
        return Err(DecodeError::InvalidFormat);
    }
    let c = &upce[1..7];
    let mut out = String::with_capacity(12);
    out.push_str(&upce[..1]);
    match b[6] {
        b'0' | b'1' | b'2' => {
            out.push_str(&c[..2]);
            out.push(char::from(b[6]));
            out.push_str("0000");
            out.push_str(&c[2..5]);
        }
        b'3' => {
            out.push_str(&c[..3]);
            out.push_str("00000");
            out.push_str(&c[3..5]);
        }
        b'4' => {
            out.push_str(&c[..4]);
            out.push_str("00000");
            out.push_str(&c[4..5]);
        }
        _ => {
            out.push_str(&c[..5]);
            out.push_str("0000");
            out.push(char::from(b[6]));
        }
    }
    if b.len() >= 8 {
        out.push(char::from(b[7]));
    }
    Ok(out)
}

/// Ширины UPC-E по 7 цифрам (система 0/1 + 6) или 8 (с контрольной).
pub fn encode_upce(digits: &str) -> Option<Vec<u32>> {
    let upca = convert_upce_to_upca(digits).ok()?;
    let check = standard_upc_ean_checksum(&upca.as_bytes()[..11]).ok()? as usize;
    let d = digits.as_bytes();
    let num_sys = usize::from(d[0] - b'0');
    if num_sys > 1 || d.len() > 8 || (d.len() == 8 && usize::from(d[7] - b'0') != check) {
        return None;
    }
    let parity = NUMSYS_AND_CHECK_DIGIT_PATTERNS[num_sys][check];
    let mut out = START_END_PATTERN.to_vec();
    for (i, &b) in d[1..7].iter().enumerate() {
        out.extend(digit_widths(usize::from(b - b'0'), parity & (1 << (5 - i)) != 0));
    }
    out.extend(UPCE_END_PATTERN);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::one_d::synth::render_row;

    #[test]
    fn expansion_rules() {
        assert_eq!(convert_upce_to_upca("01234565").unwrap(), "012345000065");
        assert_eq!(convert_upce_to_upca("0123450").unwrap(), "01200000345");
        assert_eq!(convert_upce_to_upca("0123453").unwrap(), "01230000045");
        assert_eq!(convert_upce_to_upca("0123454").unwrap(), "01234000005");
        assert_eq!(convert_upce_to_upca("01x3454"), Err(DecodeError::InvalidFormat));
    }

    #[test]
    fn upce_basic() {
        let row = render_row(&encode_upce("0123456").unwrap(), 2, 10);
        let sym = UpcEReader::new().decode_row(0, &row, &DecodeOptions::default()).unwrap();
        assert_eq!(sym.format, BarcodeFormat::UpcE);
        assert_eq!(sym.text, "01234565");
    }

    #[test]
    fn number_system_one() {
        let row = render_row(&encode_upce("1123456").unwrap(), 2, 10);
        let sym = UpcEReader::new().decode_row(0, &row, &DecodeOptions::default()).unwrap();
        assert!(sym.text.starts_with('1'));
        assert_eq!(sym.text.len(), 8);
    }
}
