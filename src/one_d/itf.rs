//! Interleaved 2 of 5: цифры парами, первая цифра пары в пяти полосах,
//! вторая: в пяти пробелах между ними.
//!
//! 1. Старт `N N N N` после тихой зоны (≥ 10 узких, но не дальше края строки).
//! 2. Конец ищется на развёрнутой строке: `N N w` или `N N W`.
//! 3. Середина: блоками по 10 серий, полосы и пробелы сверяются отдельно.
//! 4. Длина результата: из разрешённого списка, либо длиннее самой длинной из него.

use std::ops::Range;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::{find_guard_pattern, pattern_match_variance, record_pattern, OneDReader, PATTERN_MATCH_RESULT_SCALE_FACTOR};

const MAX_AVG_VARIANCE: u32 = (PATTERN_MATCH_RESULT_SCALE_FACTOR as f32 * 0.38) as u32;
const MAX_INDIVIDUAL_VARIANCE: u32 = (PATTERN_MATCH_RESULT_SCALE_FACTOR as f32 * 0.78) as u32;

const W: u32 = 3; // широкий 3:1
const WN: u32 = 2; // широкий 2:1
const N: u32 = 1;

pub const DEFAULT_ALLOWED_LENGTHS: [usize; 5] = [6, 8, 10, 12, 14];

const START_PATTERN: [u32; 4] = [N, N, N, N];
const END_PATTERN_REVERSED: [[u32; 3]; 2] = [[N, N, WN], [N, N, W]];

/// 0..9 с отношением 2:1, затем те же цифры с 3:1.
pub const PATTERNS: [[u32; 5]; 20] = [
    [N, N, WN, WN, N],
    [WN, N, N, N, WN],
    [N, WN, N, N, WN],
    [WN, WN, N, N, N],
    [N, N, WN, N, WN],
    [WN, N, WN, N, N],
    [N, WN, WN, N, N],
    [N, N, N, WN, WN],
    [WN, N, N, WN, N],
    [N, WN, N, WN, N],
    [N, N, W, W, N],
    [W, N, N, N, W],
    [N, W, N, N, W],
    [W, W, N, N, N],
    [N, N, W, N, W],
    [W, N, W, N, N],
    [N, W, W, N, N],
    [N, N, N, W, W],
    [W, N, N, W, N],
    [N, W, N, W, N],
];

#[derive(Debug)]
pub struct ItfReader {
    /// Ширина узкого элемента в пикселях, по стартовому guard'у.
    narrow_line_width: usize,
    counter_digit_pair: [u32; 10],
    guard: [u32; 4],
    reversed: BitRow,
}

impl Default for ItfReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ItfReader {
    pub fn new() -> Self {
        Self {
            narrow_line_width: 0,
            counter_digit_pair: [0; 10],
            guard: [0; 4],
            reversed: BitRow::new(0),
        }
    }

    fn decode_start(&mut self, row: &BitRow) -> DecodeResult<Range<usize>> {
        let end_start = skip_white_space(row)?;
        let start = find_guard_pattern(
            row,
            end_start,
            false,
            &START_PATTERN,
            &mut self.guard,
            MAX_AVG_VARIANCE,
            MAX_INDIVIDUAL_VARIANCE,
        )?;
        self.narrow_line_width = (start.end - start.start) / 4;
        validate_quiet_zone(row, start.start, self.narrow_line_width)?;
        Ok(start)
    }

    fn decode_end(&mut self, row: &BitRow) -> DecodeResult<Range<usize>> {
        self.reversed.clone_from(row);
        self.reversed.reverse();
        let reversed = &self.reversed;

        let end_start = skip_white_space(reversed)?;
        let counters = &mut self.guard[..3];
        let end = find_guard_pattern(
            reversed,
            end_start,
            false,
            &END_PATTERN_REVERSED[0],
            counters,
            MAX_AVG_VARIANCE,
            MAX_INDIVIDUAL_VARIANCE,
        )
        .or_else(|_| {
            find_guard_pattern(
                reversed,
                end_start,
                false,
                &END_PATTERN_REVERSED[1],
                counters,
                MAX_AVG_VARIANCE,
                MAX_INDIVIDUAL_VARIANCE,
            )
        })?;
        validate_quiet_zone(reversed, end.start, self.narrow_line_width)?;

        // обратно в координаты исходной строки
        let size = row.len();
        Ok(size - end.end..size - end.start)
    }

    fn decode_middle(&mut self, row: &BitRow, payload: Range<usize>, result: &mut String) -> DecodeResult<()> {
        let mut black = [0u32; 5];
        let mut white = [0u32; 5];
        let mut payload_start = payload.start;
        while payload_start < payload.end {
            record_pattern(row, payload_start, &mut self.counter_digit_pair)?;
            for k in 0..5 {
                black[k] = self.counter_digit_pair[2 * k];
                white[k] = self.counter_digit_pair[2 * k + 1];
            }
            result.push(char::from(b'0' + decode_digit(&black)?));
            result.push(char::from(b'0' + decode_digit(&white)?));
            payload_start += self.counter_digit_pair.iter().sum::<u32>() as usize;
        }
        Ok(())
    }
}

impl OneDReader for ItfReader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        let start = self.decode_start(row)?;
        let end = self.decode_end(row)?;
        if end.start < start.end {
            return Err(DecodeError::NotFound);
        }

        let mut text = String::with_capacity(20);
        self.decode_middle(row, start.end..end.start, &mut text)?;

        let allowed = opts.allowed_lengths.as_deref().unwrap_or(&DEFAULT_ALLOWED_LENGTHS);
        if !length_allowed(text.len(), allowed) {
            return Err(DecodeError::InvalidFormat);
        }

        let y = row_number as f32;
        Ok(DecodedSymbol::new(BarcodeFormat::Itf, text)
            .with_points([Point::new(start.end as f32, y), Point::new(end.start as f32, y)])
            .with_metadata(MetadataKey::SymbologyIdentifier, "]I0"))
    }
}

/// Короткие длины: только из списка, иначе легко принять шум за ITF.
/// Без списка проходит длина больше max(14, наибольшей разрешённой).
fn length_allowed(length: usize, allowed: &[usize]) -> bool {
    let longest = allowed
        .iter()
        .chain(&DEFAULT_ALLOWED_LENGTHS)
        .copied()
        .max()
        .unwrap_or_default();
    allowed.contains(&length) || length > longest
}

fn skip_white_space(row: &BitRow) -> DecodeResult<usize> {
    let end_start = row.next_set(0);
    if end_start == row.len() {
        return Err(DecodeError::NotFound);
    }
    Ok(end_start)
}

/// Перед `start` нужно 10 узких светлых пикселей; у края строки: сколько есть.
fn validate_quiet_zone(row: &BitRow, start: usize, narrow_line_width: usize) -> DecodeResult<()> {
    let quiet_count = (narrow_line_width * 10).min(start);
    if quiet_count > 0 && !row.is_range(start - quiet_count, start, false) {
        return Err(DecodeError::NotFound);
    }
    Ok(())
}

/// Лучшая цифра; два одинаково хороших кандидата: отказ.
fn decode_digit(counters: &[u32; 5]) -> DecodeResult<u8> {
    let mut best_variance = MAX_AVG_VARIANCE;
    let mut best_match = None;
    for (i, pattern) in PATTERNS.iter().enumerate() {
        let variance = pattern_match_variance(counters, pattern, MAX_INDIVIDUAL_VARIANCE);
        if variance < best_variance {
            best_variance = variance;
            best_match = Some(i);
        } else if variance == best_variance {
            best_match = None;
        }
    }
    best_match.map(|i| (i % 10) as u8).ok_or(DecodeError::NotFound)
}

// === Синтезатор ===

/// Ширины ITF (3:1) для чётного числа цифр.
pub fn encode_itf(text: &str) -> Option<Vec<u32>> {
    let digits: Vec<usize> = text
        .bytes()
        .map(|b| b.is_ascii_digit().then(|| (b - b'0') as usize))
        .collect::<Option<_>>()?;
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }
    let mut out = Vec::with_capacity(4 + digits.len() * 5 + 3);
    out.extend_from_slice(&START_PATTERN);
    for pair in digits.chunks(2) {
        let bars = PATTERNS[pair[0] + 10];
        let spaces = PATTERNS[pair[1] + 10];
        for k in 0..5 {
            out.push(bars[k]);
            out.push(spaces[k]);
        }
    }
    out.extend_from_slice(&[W, N, N]);
    Some(out)
}
