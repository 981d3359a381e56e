//! EAN-8: 4 + 4 цифры, обе половины только из набора L, контрольная последняя.

use std::ops::Range;

use crate::core::{BarcodeFormat, BitRow, DecodeOptions, DecodeResult, DecodedSymbol};
use crate::one_d::extension::UpcEanExtensionReader;
use crate::one_d::upc_ean::{
    decode_digit, decode_row_with_start, find_start_guard_pattern, standard_upc_ean_checksum, UpcEanVariant,
    L_PATTERNS, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE, MIDDLE_PATTERN, START_END_PATTERN,
};
use crate::one_d::{find_guard_pattern, sum, OneDReader};

#[derive(Debug, Default)]
pub struct Ean8Reader {
    counters: [u32; 4],
    extension: UpcEanExtensionReader,
}

impl Ean8Reader {
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

    fn decode_half(&mut self, row: &BitRow, mut row_offset: usize, result: &mut String) -> DecodeResult<usize> {
        for _ in 0..4 {
            let best = decode_digit(row, &mut self.counters, row_offset, &L_PATTERNS)?;
            result.push(char::from(b'0' + best as u8));
            row_offset += sum(&self.counters);
        }
        Ok(row_offset)
    }
}

impl UpcEanVariant for Ean8Reader {
    fn format(&self) -> BarcodeFormat {
        BarcodeFormat::Ean8
    }

    fn decode_middle(&mut self, row: &BitRow, start_range: &Range<usize>, result: &mut String) -> DecodeResult<usize> {
        let row_offset = self.decode_half(row, start_range.end, result)?;
        let middle = find_guard_pattern(
            row,
            row_offset,
            true,
            &MIDDLE_PATTERN,
            &mut [0u32; 5],
            MAX_AVG_VARIANCE,
            MAX_INDIVIDUAL_VARIANCE,
        )?;
        self.decode_half(row, middle.end, result)
    }

    fn extension_reader(&mut self) -> &mut UpcEanExtensionReader {
        &mut self.extension
    }
}

impl OneDReader for Ean8Reader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        let start = find_start_guard_pattern(row)?;
        decode_row_with_start(self, row_number, row, start, opts)
    }
}

/// Ширины EAN-8 по 7 или 8 цифрам.
pub fn encode_ean8(digits: &str) -> Option<Vec<u32>> {
    let mut d: Vec<usize> = digits
        .bytes()
        .map(|b| b.is_ascii_digit().then(|| usize::from(b - b'0')))
        .collect::<Option<_>>()?;
    match d.len() {
        7 => d.push(standard_upc_ean_checksum(digits.as_bytes()).ok()? as usize),
        8 => {}
        _ => return None,
    }
    let mut out = START_END_PATTERN.to_vec();
    for &digit in &d[..4] {
        out.extend(L_PATTERNS[digit]);
    }
    out.extend(MIDDLE_PATTERN);
    for &digit in &d[4..] {
        out.extend(L_PATTERNS[digit]);
    }
    out.extend(START_END_PATTERN);
    Some(out)
}
