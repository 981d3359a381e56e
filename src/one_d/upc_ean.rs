//! Общая часть семейства UPC/EAN.
//!
//! Схема декодирования строки:
//! 1) стартовый guard `101` с тихой зоной не уже самого guard'а;
//! 2) середина: зависит от варианта (EAN-13/EAN-8/UPC-E);
//! 3) финальный guard и тихая зона за ним;
//! 4) контрольная цифра;
//! 5) необязательное 2/5-значное дополнение справа.

use std::ops::Range;

use tracing::trace;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::ean_manufacturer::lookup_country_identifier;
use crate::one_d::extension::UpcEanExtensionReader;
use crate::one_d::{find_guard_pattern, pattern_match_variance, record_pattern, PATTERN_MATCH_RESULT_SCALE_FACTOR};

pub(crate) const MAX_AVG_VARIANCE: u32 = (PATTERN_MATCH_RESULT_SCALE_FACTOR as f32 * 0.48) as u32;
pub(crate) const MAX_INDIVIDUAL_VARIANCE: u32 = (PATTERN_MATCH_RESULT_SCALE_FACTOR as f32 * 0.7) as u32;

/// Крайние guard'ы: bar-space-bar.
pub const START_END_PATTERN: [u32; 3] = [1, 1, 1];
/// Центральный guard: space-bar-space-bar-space.
pub const MIDDLE_PATTERN: [u32; 5] = [1, 1, 1, 1, 1];
/// Финальный guard UPC-E (начинается с пробела).
pub const UPCE_END_PATTERN: [u32; 6] = [1, 1, 1, 1, 1, 1];

/// Набор L (он же «A»): ширины space-bar-space-bar, по 7 модулей на цифру.
pub const L_PATTERNS: [[u32; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// L (0..=9), затем G (10..=19): зеркальные L.
pub const L_AND_G_PATTERNS: [[u32; 4]; 20] = {
    let mut out = [[0u32; 4]; 20];
    let mut i = 0;
    while i < 10 {
        out[i] = L_PATTERNS[i];
        let p = L_PATTERNS[i];
        out[i + 10] = [p[3], p[2], p[1], p[0]];
        i += 1;
    }
    out
};

/// Вариант UPC/EAN: своя середина, свой финальный guard и своя проверка.
pub trait UpcEanVariant {
    fn format(&self) -> BarcodeFormat;

    /// Декодировать цифры между guard'ами в `result`; вернуть смещение после них.
    fn decode_middle(&mut self, row: &BitRow, start_range: &Range<usize>, result: &mut String) -> DecodeResult<usize>;

    fn decode_end(&mut self, row: &BitRow, end_start: usize) -> DecodeResult<Range<usize>> {
        find_guard_pattern(
            row,
            end_start,
            false,
            &START_END_PATTERN,
            &mut [0u32; 3],
            MAX_AVG_VARIANCE,
            MAX_INDIVIDUAL_VARIANCE,
        )
    }

    fn check_checksum(&self, s: &str) -> DecodeResult<bool> {
        check_standard_upc_ean_checksum(s)
    }

    fn extension_reader(&mut self) -> &mut UpcEanExtensionReader;
}

/// Стартовый guard, перед которым светло хотя бы на его собственную ширину.
pub fn find_start_guard_pattern(row: &BitRow) -> DecodeResult<Range<usize>> {
    let mut counters = [0u32; 3];
    let mut next_start = 0;
    loop {
        let range = find_guard_pattern(
            row,
            next_start,
            false,
            &START_END_PATTERN,
            &mut counters,
            MAX_AVG_VARIANCE,
            MAX_INDIVIDUAL_VARIANCE,
        )?;
        let width = range.end - range.start;
        if let Some(quiet_start) = range.start.checked_sub(width) {
            if row.is_range(quiet_start, range.start, false) {
                return Ok(range);
            }
        }
        next_start = range.end;
    }
}

/// Одна цифра по `patterns`; возвращает индекс лучшего эталона.
pub fn decode_digit(
    row: &BitRow,
    counters: &mut [u32; 4],
    row_offset: usize,
    patterns: &[[u32; 4]],
) -> DecodeResult<usize> {
    record_pattern(row, row_offset, counters)?;
    let mut best_variance = MAX_AVG_VARIANCE;
    let mut best_match = None;
    for (i, pattern) in patterns.iter().enumerate() {
        let variance = pattern_match_variance(counters, pattern, MAX_INDIVIDUAL_VARIANCE);
        if variance < best_variance {
            best_variance = variance;
            best_match = Some(i);
        }
    }
    best_match.ok_or(DecodeError::NotFound)
}

/// Полный разбор строки начиная с найденного стартового guard'а.
pub fn decode_row_with_start<V: UpcEanVariant + ?Sized>(
    variant: &mut V,
    row_number: usize,
    row: &BitRow,
    start_range: Range<usize>,
    opts: &DecodeOptions,
) -> DecodeResult<DecodedSymbol> {
    let y = row_number as f32;
    opts.notify((start_range.start + start_range.end) as f32 / 2.0, y);

    let mut result = String::with_capacity(20);
    let end_start = variant.decode_middle(row, &start_range, &mut result)?;
    opts.notify(end_start as f32, y);

    let end_range = variant.decode_end(row, end_start)?;
    opts.notify((end_range.start + end_range.end) as f32 / 2.0, y);

    // тихая зона за финальным guard'ом: не уже самого guard'а
    let end = end_range.end;
    let quiet_end = end + (end - end_range.start);
    if quiet_end >= row.len() || !row.is_range(end, quiet_end, false) {
        return Err(DecodeError::NotFound);
    }

    if result.len() < 8 {
        return Err(DecodeError::InvalidFormat);
    }
    if !variant.check_checksum(&result)? {
        return Err(DecodeError::ChecksumError);
    }

    let format = variant.format();
    let left = (start_range.start + start_range.end) as f32 / 2.0;
    let right = (end_range.start + end_range.end) as f32 / 2.0;
    let mut decoded = DecodedSymbol::new(format, result)
        .with_points([Point::new(left, y), Point::new(right, y)]);

    let mut extension_length = 0;
    match variant.extension_reader().decode_row(row_number, row, end_range.end) {
        Ok(ext) => {
            decoded.put_metadata(MetadataKey::UpcEanExtension, ext.text.as_str());
            decoded.metadata.extend(&ext.metadata);
            decoded.points.extend_from_slice(&ext.points);
            extension_length = ext.text.len();
        }
        Err(e) => trace!(row = row_number, error = %e, "no extension"),
    }
    if let Some(allowed) = &opts.allowed_ean_extensions {
        if !allowed.contains(&extension_length) {
            return Err(DecodeError::NotFound);
        }
    }

    if matches!(format, BarcodeFormat::Ean13 | BarcodeFormat::UpcA) {
        if let Some(country) = lookup_country_identifier(&decoded.text) {
            decoded.put_metadata(MetadataKey::PossibleCountry, country);
        }
    }
    let id = if format == BarcodeFormat::Ean8 { "]E4" } else { "]E0" };
    decoded.put_metadata(MetadataKey::SymbologyIdentifier, id);
    Ok(decoded)
}

/// Последняя цифра `s`: контрольная сумма остальных.
pub fn check_standard_upc_ean_checksum(s: &str) -> DecodeResult<bool> {
    let Some((&last, body)) = s.as_bytes().split_last() else {
        return Ok(false);
    };
    let check = digit_value(last)?;
    Ok(standard_upc_ean_checksum(body)? == check)
}

/// Контрольная цифра UPC/EAN: веса 3,1,3,1… справа налево.
pub fn standard_upc_ean_checksum(digits: &[u8]) -> DecodeResult<u32> {
    let mut sum = 0u32;
    for (i, &b) in digits.iter().rev().enumerate() {
        let d = digit_value(b)?;
        sum += if i % 2 == 0 { d * 3 } else { d };
    }
    Ok((10 - sum % 10) % 10)
}

#[inline]
pub(crate) fn digit_value(b: u8) -> DecodeResult<u32> {
    if b.is_ascii_digit() {
        Ok(u32::from(b - b'0'))
    } else {
        Err(DecodeError::InvalidFormat)
    }
}

// === Синтез ===

/// Ширины цифры `d` в наборе L (`g == false`) или G.
pub(crate) fn digit_widths(d: usize, g: bool) -> [u32; 4] {
    L_AND_G_PATTERNS[d + if g { 10 } else { 0 }]
}
