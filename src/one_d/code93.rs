//! Code 93: 9 модулей на символ, 3 полосы и 3 пробела по 1..4 модуля.
//! Две контрольные (C по весам до 20, K: до 15, обе mod 47), после
//! финального `*`: одиночная терминирующая полоса. Full ASCII через
//! служебные символы `a`–`d` включён всегда. Перед стартовой `*` нужно
//! светлое не уже половины символа, как у Code 39.

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::code39::{decode_extended, encode_extended_char};
use crate::one_d::{record_pattern, shift_counters, sum, OneDReader};

/// `a`–`d`: служебные символы Full ASCII ($, %, /, + соответственно).
pub const ALPHABET: &[u8; 48] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%abcd*";

/// 9 бит на символ, 1 = тёмный модуль.
pub const CHARACTER_ENCODINGS: [u32; 48] = [
    0x114, 0x148, 0x144, 0x142, 0x128, 0x124, 0x122, 0x150, 0x112, 0x10A, // 0-9
    0x1A8, 0x1A4, 0x1A2, 0x194, 0x192, 0x18A, 0x168, 0x164, 0x162, 0x134, // A-J
    0x11A, 0x158, 0x14C, 0x146, 0x12C, 0x116, 0x1B4, 0x1B2, 0x1AC, 0x1A6, // K-T
    0x196, 0x19A, 0x16C, 0x166, 0x136, 0x13A, // U-Z
    0x12E, 0x1D4, 0x1D2, 0x1CA, 0x16E, 0x176, 0x1AE, // - . SP $ / + %
    0x126, 0x1DA, 0x1D6, 0x132, 0x15E, // a b c d *
];

pub const ASTERISK_ENCODING: u32 = CHARACTER_ENCODINGS[47];

/// Порядок сдвигов для `decode_extended`: строчные, управляющие, прочие, пунктуация.
const SHIFTS: [char; 4] = ['d', 'a', 'b', 'c'];

#[derive(Debug, Default)]
pub struct Code93Reader {
    counters: [u32; 6],
    result: String,
}

impl Code93Reader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OneDReader for Code93Reader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, _opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        self.result.clear();
        let start = find_asterisk_pattern(row, &mut self.counters)?;
        let mut next_start = row.next_set(start.end);
        let end = row.len();

        let mut last_start;
        loop {
            record_pattern(row, next_start, &mut self.counters)?;
            let pattern = to_pattern(&self.counters).ok_or(DecodeError::NotFound)?;
            let decoded = pattern_to_char(pattern)?;
            self.result.push(decoded);
            last_start = next_start;
            next_start += sum(&self.counters);
            next_start = row.next_set(next_start);
            if decoded == '*' {
                break;
            }
        }
        self.result.pop();

        let last_pattern_size = sum(&self.counters);
        // за `*` должна быть терминирующая полоса
        if next_start == end || !row.get(next_start) {
            return Err(DecodeError::NotFound);
        }
        if self.result.len() < 2 {
            // только контрольные: ложное срабатывание
            return Err(DecodeError::NotFound);
        }

        check_checksums(&self.result)?;
        self.result.truncate(self.result.len() - 2);
        let text = decode_extended(&self.result, SHIFTS)?;

        let y = row_number as f32;
        let left = (start.start + start.end) as f32 / 2.0;
        let right = last_start as f32 + last_pattern_size as f32 / 2.0;
        Ok(DecodedSymbol::new(BarcodeFormat::Code93, text)
            .with_points([Point::new(left, y), Point::new(right, y)])
            .with_metadata(MetadataKey::SymbologyIdentifier, "]G0"))
    }
}

fn find_asterisk_pattern(row: &BitRow, counters: &mut [u32; 6]) -> DecodeResult<std::ops::Range<usize>> {
    let width = row.len();
    let row_offset = row.next_set(0);
    counters.fill(0);
    let mut pos = 0usize;
    let mut pattern_start = row_offset;
    let mut counting_dark = true;

    for i in row_offset..width {
        if row.get(i) == counting_dark {
            counters[pos] += 1;
            continue;
        }
        if pos == 5 {
            if to_pattern(counters) == Some(ASTERISK_ENCODING) {
                let quiet_start = pattern_start.saturating_sub((i - pattern_start) / 2);
                if row.is_range(quiet_start, pattern_start, false) {
                    return Ok(pattern_start..i);
                }
            }
            pattern_start += (counters[0] + counters[1]) as usize;
            shift_counters(counters);
            pos -= 1;
        } else {
            pos += 1;
        }
        counters[pos] = 1;
        counting_dark = !counting_dark;
    }
    Err(DecodeError::NotFound)
}

/// Ширины → 9-битный код: каждая ширина округляется до целых модулей (1..=4).
pub fn to_pattern(counters: &[u32]) -> Option<u32> {
    let total: u32 = counters.iter().sum();
    if total == 0 {
        return None;
    }
    let mut pattern = 0u32;
    for (i, &c) in counters.iter().enumerate() {
        let scaled = ((c as f32 * 9.0) / total as f32).round() as u32;
        if !(1..=4).contains(&scaled) {
            return None;
        }
        if i & 1 == 0 {
            for _ in 0..scaled {
                pattern = (pattern << 1) | 1;
            }
        } else {
            pattern <<= scaled;
        }
    }
    Some(pattern)
}

fn pattern_to_char(pattern: u32) -> DecodeResult<char> {
    CHARACTER_ENCODINGS
        .iter()
        .position(|&e| e == pattern)
        .map(|i| char::from(ALPHABET[i]))
        .ok_or(DecodeError::NotFound)
}

#[inline]
fn alphabet_index(c: char) -> Option<usize> {
    ALPHABET.iter().position(|&a| char::from(a) == c)
}

fn check_checksums(result: &str) -> DecodeResult<()> {
    let chars: Vec<char> = result.chars().collect();
    let n = chars.len();
    check_one_checksum(&chars, n - 2, 20)?;
    check_one_checksum(&chars, n - 1, 15)
}

fn check_one_checksum(chars: &[char], check_position: usize, weight_max: usize) -> DecodeResult<()> {
    if compute_checksum(&chars[..check_position], weight_max)? != chars[check_position] {
        return Err(DecodeError::ChecksumError);
    }
    Ok(())
}

/// Взвешенная сумма справа налево, веса 1..=`weight_max` по кругу, mod 47.
fn compute_checksum(chars: &[char], weight_max: usize) -> DecodeResult<char> {
    let mut weight = 1;
    let mut total = 0usize;
    for &c in chars.iter().rev() {
        total += weight * alphabet_index(c).ok_or(DecodeError::InvalidFormat)?;
        weight += 1;
        if weight > weight_max {
            weight = 1;
        }
    }
    Ok(char::from(ALPHABET[total % 47]))
}

// === Синтезатор ===

fn push_char(out: &mut Vec<u32>, encoding: u32) {
    // 9 модулей → длины серий, начиная с тёмной
    let mut run = 0u32;
    let mut dark = true;
    for i in (0..9).rev() {
        let bit = encoding >> i & 1 == 1;
        if bit == dark {
            run += 1;
        } else {
            out.push(run);
            run = 1;
            dark = bit;
        }
    }
    out.push(run);
}

/// Ширины Code 93 (обе контрольные и терминирующая полоса добавляются).
pub fn encode_code93(text: &str) -> Option<Vec<u32>> {
    let mut body: Vec<char> = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let (a, b) = encode_extended_char(ch, SHIFTS, &ALPHABET[..43])?;
        body.push(a);
        body.extend(b);
    }
    if body.is_empty() {
        return None;
    }
    let c = compute_checksum(&body, 20).ok()?;
    body.push(c);
    let k = compute_checksum(&body, 15).ok()?;
    body.push(k);

    let mut out = Vec::with_capacity((body.len() + 2) * 6 + 1);
    push_char(&mut out, ASTERISK_ENCODING);
    for c in body {
        push_char(&mut out, CHARACTER_ENCODINGS[alphabet_index(c)?]);
    }
    push_char(&mut out, ASTERISK_ENCODING);
    out.push(1);
    Some(out)
}
