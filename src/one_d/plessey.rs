//! Plessey: каждый бит кодируется парой «полоса + пробел» одной ширины (25 единиц):
//! 0 = `5/20`, 1 = `14/11`. Символ: шестнадцатеричная цифра, 4 бита от младшего.
//!
//! Структура: старт (биты 1101) · данные · 8 бит CRC · полоса-терминатор 25 ·
//! концевой шаблон, начинающийся с пробела.
//!
//! CRC: деление битового потока данных на многочлен `1 1 1 1 0 1 0 0 1`
//! (XOR сдвигаемой сетки), остаток: 8 бит.

use tracing::trace;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::{find_guard_pattern, pattern_match_variance, record_pattern, OneDReader, PATTERN_MATCH_RESULT_SCALE_FACTOR};

const MAX_AVG_VARIANCE: u32 = (PATTERN_MATCH_RESULT_SCALE_FACTOR as f32 * 0.48) as u32;
const MAX_INDIVIDUAL_VARIANCE: u32 = (PATTERN_MATCH_RESULT_SCALE_FACTOR as f32 * 0.7) as u32;

pub const ALPHABET: &[u8; 16] = b"0123456789ABCDEF";

// Ширины писателя: единица = 1/25 бита.
const BIT0_WIDTHS: [u32; 2] = [5, 20];
const BIT1_WIDTHS: [u32; 2] = [14, 11];
const START_WIDTHS: [u32; 8] = [14, 11, 14, 11, 5, 20, 14, 11];
const TERMINATION_WIDTH: u32 = 25;
/// Концевой шаблон после терминатора, начинается с пробела.
const END_WIDTHS: [u32; 8] = [20, 5, 20, 5, 14, 11, 14, 11];

// Те же шаблоны для сопоставления, единица = 1/9 бита
// (сопоставление требует хотя бы пиксель на единицу шаблона).
const BIT_UNITS: u32 = 9;
const BIT0: [u32; 2] = [2, 7];
const BIT1: [u32; 2] = [5, 4];
const START_PATTERN: [u32; 8] = [5, 4, 5, 4, 2, 7, 5, 4];
/// Терминатор + концевой шаблон.
const END_PATTERN: [u32; 9] = [9, 7, 2, 7, 2, 5, 4, 5, 4];

const CRC_GRID: [u8; 9] = [1, 1, 1, 1, 0, 1, 0, 0, 1];
const CRC_BITS: usize = 8;

#[derive(Debug, Default)]
pub struct PlesseyReader {
    start_counters: [u32; 8],
    pair: [u32; 2],
    end_counters: [u32; 9],
    bits: Vec<u8>,
}

impl PlesseyReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Старт с тихой зоной не меньше половины его ширины (или до края строки).
    fn find_start(&mut self, row: &BitRow) -> DecodeResult<std::ops::Range<usize>> {
        let mut offset = 0;
        loop {
            let range = find_guard_pattern(
                row,
                offset,
                false,
                &START_PATTERN,
                &mut self.start_counters,
                MAX_AVG_VARIANCE,
                MAX_INDIVIDUAL_VARIANCE,
            )?;
            let quiet_start = range.start.saturating_sub((range.end - range.start) / 2);
            if row.is_range(quiet_start, range.start, false) {
                return Ok(range);
            }
            offset = row.next_unset(range.start);
        }
    }

    fn classify_pair(&self) -> DecodeResult<u8> {
        let v0 = pattern_match_variance(&self.pair, &BIT0, MAX_INDIVIDUAL_VARIANCE);
        let v1 = pattern_match_variance(&self.pair, &BIT1, MAX_INDIVIDUAL_VARIANCE);
        match v0.min(v1) {
            v if v >= MAX_AVG_VARIANCE => Err(DecodeError::NotFound),
            _ if v1 < v0 => Ok(1),
            _ => Ok(0),
        }
    }
}

impl OneDReader for PlesseyReader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        self.bits.clear();
        let start = self.find_start(row)?;
        let y = row_number as f32;
        opts.notify(start.start as f32, y);

        let bit_width = (start.end - start.start) as f32 / 4.0;
        let mut pos = start.end;
        loop {
            record_pattern(row, pos, &mut self.pair)?;
            let total = (self.pair[0] + self.pair[1]) as f32;
            // пара заметно шире бита: это терминатор с первым пробелом концевого шаблона
            if total > bit_width * 1.5 {
                break;
            }
            if total < bit_width * 0.5 {
                return Err(DecodeError::NotFound);
            }
            let bit = self.classify_pair()?;
            self.bits.push(bit);
            pos += total as usize;
        }

        record_pattern(row, pos, &mut self.end_counters)?;
        if pattern_match_variance(&self.end_counters, &END_PATTERN, MAX_INDIVIDUAL_VARIANCE) >= MAX_AVG_VARIANCE {
            return Err(DecodeError::NotFound);
        }
        let end_width: u32 = self.end_counters.iter().sum();
        let expected = END_PATTERN.iter().sum::<u32>() as f32 / BIT_UNITS as f32 * bit_width;
        if (end_width as f32) < expected * 0.5 || (end_width as f32) > expected * 1.5 {
            return Err(DecodeError::NotFound);
        }
        let end = pos + end_width as usize;
        let quiet_end = (end + end_width as usize / 2).min(row.len());
        if !row.is_range(end, quiet_end, false) {
            return Err(DecodeError::NotFound);
        }
        opts.notify(end as f32, y);

        if self.bits.len() < 4 + CRC_BITS || (self.bits.len() - CRC_BITS) % 4 != 0 {
            return Err(DecodeError::InvalidFormat);
        }
        let (data, crc) = self.bits.split_at(self.bits.len() - CRC_BITS);
        if compute_crc(data) != crc {
            trace!(row = row_number, "plessey crc mismatch");
            return Err(DecodeError::ChecksumError);
        }

        let text: String = data
            .chunks(4)
            .map(|nibble| {
                let v = nibble.iter().rev().fold(0usize, |acc, &b| (acc << 1) | b as usize);
                char::from(ALPHABET[v])
            })
            .collect();

        Ok(DecodedSymbol::new(BarcodeFormat::Plessey, text)
            .with_points([Point::new(start.start as f32, y), Point::new(end as f32, y)])
            .with_metadata(MetadataKey::SymbologyIdentifier, "]P0"))
    }
}

/// Остаток от деления битов данных на `CRC_GRID`.
pub fn compute_crc(data: &[u8]) -> [u8; CRC_BITS] {
    let mut buffer = data.to_vec();
    buffer.resize(data.len() + CRC_BITS, 0);
    for i in 0..data.len() {
        if buffer[i] != 0 {
            for (j, g) in CRC_GRID.iter().enumerate() {
                buffer[i + j] ^= g;
            }
        }
    }
    let mut crc = [0u8; CRC_BITS];
    crc.copy_from_slice(&buffer[data.len()..]);
    crc
}

// === Синтезатор ===

/// Биты шестнадцатеричной строки, младший бит каждой цифры первым.
fn hex_bits(text: &str) -> Option<Vec<u8>> {
    let mut bits = Vec::with_capacity(text.len() * 4);
    for c in text.bytes() {
        let v = ALPHABET.iter().position(|&a| a == c)?;
        bits.extend((0..4).map(|i| (v >> i & 1) as u8));
    }
    Some(bits)
}

/// Ширины Plessey в единицах 1/25 бита (CRC добавляется).
pub fn encode_plessey(text: &str) -> Option<Vec<u32>> {
    let data = hex_bits(text)?;
    if data.is_empty() {
        return None;
    }
    let crc = compute_crc(&data);
    let mut out = Vec::with_capacity(START_WIDTHS.len() + (data.len() + CRC_BITS) * 2 + 1 + END_WIDTHS.len());
    out.extend_from_slice(&START_WIDTHS);
    for &b in data.iter().chain(crc.iter()) {
        out.extend_from_slice(if b == 1 { &BIT1_WIDTHS } else { &BIT0_WIDTHS });
    }
    out.push(TERMINATION_WIDTH);
    out.extend_from_slice(&END_WIDTHS);
    Some(out)
}
