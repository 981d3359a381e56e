//! MSI (Modified Plessey): цифра из 4 бит, бит 1 = `110`, бит 0 = `100`
//! (полоса + пробел, широкий элемент вдвое шире узкого).
//!
//! Широкое от узкого отличается порогом: среднее между шириной полосы и
//! пробела стартового символа (в 1/256 пикселя). Полный подбор по
//! вариации здесь не нужен: у MSI всего две ширины.

use tracing::trace;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::{record_pattern, OneDReader, INTEGER_MATH_SHIFT};

const START_ENCODING: u32 = 0x06; // 110
const END_ENCODING: u32 = 0x09; // 1001

pub const CHARACTER_ENCODINGS: [u32; 10] = [
    0x924, 0x926, 0x934, 0x936, 0x9A4, 0x9A6, 0x9B4, 0x9B6, 0xD24, 0xD26, // 0-9
];

/// Короче: слишком легко найти в чужих кодах (PDF417 и т.п.).
const MIN_DIGITS: usize = 3;

const DOUBLE_AND_CROSS_SUM: [u32; 10] = [0, 2, 4, 6, 8, 1, 3, 5, 7, 9];

#[derive(Debug, Default)]
pub struct MsiReader {
    using_check_digit: bool,
    counters: [u32; 8],
    average_counter_width: u32,
    result: String,
}

impl MsiReader {
    pub fn new(using_check_digit: bool) -> Self {
        Self {
            using_check_digit,
            ..Default::default()
        }
    }

    pub fn from_options(opts: &DecodeOptions) -> Self {
        Self::new(opts.assume_msi_check_digit)
    }

    fn find_start_pattern(&mut self, row: &BitRow) -> DecodeResult<(usize, usize)> {
        let width = row.len();
        let row_offset = row.next_set(0);
        let mut counters = [0u32; 2];
        let mut pos = 0usize;
        let mut pattern_start = row_offset;
        let mut counting_dark = true;

        for i in row_offset..width {
            if row.get(i) == counting_dark {
                counters[pos] += 1;
                continue;
            }
            if pos == 1 {
                // широкая полоса к узкому пробелу: примерно 2:1, допускаем 1.5..5
                let factor = counters[0] as f32 / counters[1] as f32;
                if (1.5..=5.0).contains(&factor) {
                    self.calculate_average_counter_width(&counters);
                    if self.to_pattern(&counters) == START_ENCODING {
                        // светлое перед стартом: не меньше всей его ширины, иначе
                        // пробел в 2 модуля внутри данных сходит за поле
                        let quiet_start = pattern_start.saturating_sub(i - pattern_start);
                        if row.is_range(quiet_start, pattern_start, false) {
                            return Ok((pattern_start, i));
                        }
                    }
                }
                pattern_start += (counters[0] + counters[1]) as usize;
                counters = [0, 0];
                pos = 0;
            } else {
                pos += 1;
            }
            counters[pos] = 1;
            counting_dark = !counting_dark;
        }
        Err(DecodeError::NotFound)
    }

    fn find_end_pattern(&self, row: &BitRow, row_offset: usize) -> DecodeResult<(usize, usize)> {
        let width = row.len();
        let mut counters = [0u32; 3];
        let mut pos = 0usize;
        let mut counting_dark = true;

        for i in row_offset..width {
            if row.get(i) == counting_dark {
                counters[pos] += 1;
                continue;
            }
            if pos == 2 {
                if self.to_pattern(&counters) != END_ENCODING {
                    return Err(DecodeError::NotFound);
                }
                // светлое после стопа: не меньше половины его ширины
                let quiet_end = (i + ((i - row_offset) >> 1)).min(width);
                if !row.is_range(i, quiet_end, false) {
                    return Err(DecodeError::NotFound);
                }
                return Ok((row_offset, i));
            }
            pos += 1;
            counters[pos] = 1;
            counting_dark = !counting_dark;
        }
        Err(DecodeError::NotFound)
    }

    /// Порог = середина между самым узким и самым широким элементом.
    fn calculate_average_counter_width(&mut self, counters: &[u32]) {
        let min = counters.iter().copied().min().unwrap_or(0);
        let max = counters.iter().copied().max().unwrap_or(0);
        self.average_counter_width = ((max << INTEGER_MATH_SHIFT) + (min << INTEGER_MATH_SHIFT)) / 2;
    }

    /// Узкий элемент даёт один бит, широкий два; полосы дают единицы, пробелы нули.
    fn to_pattern(&self, counters: &[u32]) -> u32 {
        let mut pattern = 0u32;
        let mut bit = 1u32;
        let mut double_bit = 3u32;
        for &c in counters {
            if (c << INTEGER_MATH_SHIFT) < self.average_counter_width {
                pattern = (pattern << 1) | bit;
            } else {
                pattern = (pattern << 2) | double_bit;
            }
            bit ^= 1;
            double_bit ^= 3;
        }
        pattern
    }
}

impl OneDReader for MsiReader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, _opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        self.counters = [0; 8];
        self.result.clear();
        let start = self.find_start_pattern(row)?;
        let mut next_start = row.next_set(start.1);
        let last_start;

        loop {
            // не распозналась цифра: может быть, это уже стоп
            let digit = record_pattern(row, next_start, &mut self.counters)
                .ok()
                .and_then(|_| {
                    let pattern = self.to_pattern(&self.counters);
                    CHARACTER_ENCODINGS.iter().position(|&e| e == pattern)
                });
            let Some(digit) = digit else {
                let end = self.find_end_pattern(row, next_start)?;
                last_start = next_start;
                next_start = end.1;
                break;
            };
            self.result.push(char::from(b'0' + digit as u8));
            next_start += self.counters.iter().sum::<u32>() as usize;
            next_start = row.next_set(next_start);
        }

        if self.result.len() < MIN_DIGITS {
            return Err(DecodeError::NotFound);
        }

        if self.using_check_digit {
            let (payload, check) = self.result.split_at(self.result.len() - 1);
            let expected = calculate_checksum_luhn(payload).ok_or(DecodeError::InvalidFormat)?;
            if check.as_bytes()[0] != b'0' + expected {
                trace!(row = row_number, text = %self.result, "msi check digit mismatch");
                return Err(DecodeError::ChecksumError);
            }
        }

        let y = row_number as f32;
        let left = (start.0 + start.1) as f32 / 2.0;
        let right = (next_start + last_start) as f32 / 2.0;
        Ok(DecodedSymbol::new(BarcodeFormat::Msi, self.result.clone())
            .with_bytes(self.result.as_bytes().to_vec())
            .with_points([Point::new(left, y), Point::new(right, y)])
            .with_metadata(MetadataKey::SymbologyIdentifier, "]M0"))
    }
}

/// Luhn: с конца каждая вторая цифра удваивается (с суммой цифр), остальные как есть.
pub fn calculate_checksum_luhn(number: &str) -> Option<u8> {
    let digits: Vec<u32> = number.chars().map(|c| c.to_digit(10)).collect::<Option<_>>()?;
    let checksum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| if i % 2 == 0 { DOUBLE_AND_CROSS_SUM[d as usize] } else { d })
        .sum();
    Some(((10 - checksum % 10) % 10) as u8)
}

// === Синтезатор ===

/// Ширины MSI для строки цифр (контрольная цифра не добавляется).
pub fn encode_msi(text: &str) -> Option<Vec<u32>> {
    if text.is_empty() {
        return None;
    }
    let mut out = vec![2, 1];
    for c in text.chars() {
        let d = c.to_digit(10)?;
        for i in (0..4).rev() {
            if d >> i & 1 == 1 {
                out.extend_from_slice(&[2, 1]);
            } else {
                out.extend_from_slice(&[1, 2]);
            }
        }
    }
    out.extend_from_slice(&[1, 2, 1]);
    Some(out)
}
