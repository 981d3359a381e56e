//! Дополнения UPC/EAN: 2 цифры (номер выпуска) или 5 цифр (рекомендованная цена).
//!
//! Дополнение начинается со своего guard'а `1 1 2` (bar-space-wide bar); цифры
//! разделены парой `01`. Контроль:
//! - 2 цифры: значение mod 4 задаёт маску L/G;
//! - 5 цифр: маска L/G кодирует контрольную цифру (веса 3,9 через одну).

use std::ops::Range;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::upc_ean::{decode_digit, L_AND_G_PATTERNS, MAX_AVG_VARIANCE, MAX_INDIVIDUAL_VARIANCE};
use crate::one_d::{find_guard_pattern, sum};

pub const EXTENSION_START_PATTERN: [u32; 3] = [1, 1, 2];

/// Маски L/G пятизначного дополнения по контрольной цифре (бит 4: первая цифра, 1 = G).
pub const CHECK_DIGIT_ENCODINGS: [u32; 10] = [0x18, 0x14, 0x12, 0x11, 0x0C, 0x06, 0x03, 0x0A, 0x09, 0x05];

/// Ищет дополнение справа от основного символа.
#[derive(Debug, Default)]
pub struct UpcEanExtensionReader {
    counters: [u32; 4],
}

impl UpcEanExtensionReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Сначала пробуем 5 цифр, затем 2.
    pub fn decode_row(&mut self, row_number: usize, row: &BitRow, row_offset: usize) -> DecodeResult<DecodedSymbol> {
        let start = find_guard_pattern(
            row,
            row_offset,
            false,
            &EXTENSION_START_PATTERN,
            &mut [0u32; 3],
            MAX_AVG_VARIANCE,
            MAX_INDIVIDUAL_VARIANCE,
        )?;
        self.decode_five(row_number, row, &start)
            .or_else(|_| self.decode_two(row_number, row, &start))
    }

    fn decode_five(&mut self, row_number: usize, row: &BitRow, start: &Range<usize>) -> DecodeResult<DecodedSymbol> {
        let mut result = String::with_capacity(5);
        let (end, lg_pattern) = self.decode_digits(row, start, 5, &mut result)?;
        let check_digit = CHECK_DIGIT_ENCODINGS
            .iter()
            .position(|&e| e == lg_pattern)
            .ok_or(DecodeError::NotFound)?;
        if extension_checksum(&result) != check_digit as u32 {
            return Err(DecodeError::NotFound);
        }
        let mut symbol = finish(row_number, start, end, result);
        if let Some(price) = parse_suggested_price(&symbol.text) {
            symbol.put_metadata(MetadataKey::SuggestedPrice, price);
        }
        Ok(symbol)
    }

    fn decode_two(&mut self, row_number: usize, row: &BitRow, start: &Range<usize>) -> DecodeResult<DecodedSymbol> {
        let mut result = String::with_capacity(2);
        let (end, lg_pattern) = self.decode_digits(row, start, 2, &mut result)?;
        let value: i32 = result.parse().map_err(|_| DecodeError::InvalidFormat)?;
        if value % 4 != lg_pattern as i32 {
            return Err(DecodeError::NotFound);
        }
        let mut symbol = finish(row_number, start, end, result);
        symbol.put_metadata(MetadataKey::IssueNumber, value);
        Ok(symbol)
    }

    /// `count` цифр через разделители; возвращает конец и маску L/G.
    fn decode_digits(
        &mut self,
        row: &BitRow,
        start: &Range<usize>,
        count: usize,
        result: &mut String,
    ) -> DecodeResult<(usize, u32)> {
        let mut row_offset = start.end;
        let mut lg_pattern = 0u32;
        for x in 0..count {
            if row_offset >= row.len() {
                break;
            }
            let best = decode_digit(row, &mut self.counters, row_offset, &L_AND_G_PATTERNS)?;
            result.push(char::from(b'0' + (best % 10) as u8));
            row_offset += sum(&self.counters);
            if best >= 10 {
                lg_pattern |= 1 << (count - 1 - x);
            }
            if x != count - 1 {
                // разделитель 01
                row_offset = row.next_set(row_offset);
                row_offset = row.next_unset(row_offset);
            }
        }
        if result.len() != count {
            return Err(DecodeError::NotFound);
        }
        Ok((row_offset, lg_pattern))
    }
}

fn finish(row_number: usize, start: &Range<usize>, end: usize, text: String) -> DecodedSymbol {
    let y = row_number as f32;
    DecodedSymbol::new(BarcodeFormat::UpcEanExtension, text).with_points([
        Point::new((start.start + start.end) as f32 / 2.0, y),
        Point::new(end as f32, y),
    ])
}

/// Контрольная цифра пятизначного дополнения: (3·Σнечётных + 9·Σчётных) mod 10.
pub fn extension_checksum(s: &str) -> u32 {
    let digits: Vec<u32> = s.bytes().map(|b| u32::from(b.wrapping_sub(b'0'))).collect();
    let len = digits.len();
    let mut sum = 0u32;
    for i in (0..len.saturating_sub(1)).rev().step_by(2) {
        sum += digits[i];
    }
    sum *= 3;
    for i in (0..len).rev().step_by(2) {
        sum += digits[i];
    }
    sum *= 3;
    sum % 10
}

/// Цена из пятизначного дополнения; первая цифра: валюта.
pub fn parse_suggested_price(raw: &str) -> Option<String> {
    if raw.len() != 5 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let currency = match raw.as_bytes()[0] {
        b'0' => "£",
        b'5' => "$",
        b'9' => match raw {
            "90000" => return None,
            "99991" => return Some("0.00".to_string()),
            "99990" => return Some("Used".to_string()),
            _ => "",
        },
        _ => "",
    };
    let amount: u32 = raw[1..].parse().ok()?;
    Some(format!("{currency}{}.{:02}", amount / 100, amount % 100))
}

/// Ширины дополнения (начиная с тёмной полосы guard'а).
pub fn encode_extension(digits: &str) -> Option<Vec<u32>> {
    use crate::one_d::upc_ean::digit_widths;

    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let d: Vec<usize> = digits.bytes().map(|b| usize::from(b - b'0')).collect();
    let parity: u32 = match d.len() {
        2 => (d[0] * 10 + d[1]) as u32 % 4,
        5 => CHECK_DIGIT_ENCODINGS[extension_checksum(digits) as usize],
        _ => return None,
    };
    let n = d.len();
    let mut out = EXTENSION_START_PATTERN.to_vec();
    for (i, &digit) in d.iter().enumerate() {
        if i > 0 {
            out.extend([1, 1]);
        }
        let g = parity & (1 << (n - 1 - i)) != 0;
        out.extend(digit_widths(digit, g));
    }
    // последняя полоса цифры: тёмная; дальше фон
    Some(out)
}
