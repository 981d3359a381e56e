//! Code 128: декодер по одной строке + синтезатор (для тестов/демо).
//!
//! Поддержка:
//! - наборы A/B/C, переключения CODE A/B/C и SHIFT;
//! - FNC1 (GS1-128: `]C1` в начале, дальше GS = ASCII 29), FNC2, FNC3;
//! - FNC4: верхняя половина ISO-8859-1 (разово или режимом);
//! - контрольная сумма mod 103, тихая зона до и после символа.
//!
//! Ход разбора: ищем один из трёх старт-кодов (с тихой зоной слева), затем
//! читаем символы по 6 полос, пока не встретим STOP. У STOP на самом деле
//! 7 полос: последнюю тёмную просто перешагиваем перед проверкой тихой зоны.

use tracing::trace;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::{pattern_match_variance, record_pattern, shift_counters, sum, OneDReader, PATTERN_MATCH_RESULT_SCALE_FACTOR};

/// Паттерны 0..=106: по 6 чисел (bars/spaces), сумма 11 (у STOP: 13 с учётом 7-й полосы).
const CODE_PATTERNS_STR: [&str; 107] = [
    "212222", "222122", "222221", "121223", "121322", "131222", "122213", "122312", "132212",
    "221213", "221312", "231212", "112232", "122132", "122231", "113222", "123122", "123221",
    "223211", "221132", "221231", "213212", "223112", "312131", "311222", "321122", "321221",
    "312212", "322112", "322211", "212123", "212321", "232121", "111323", "131123", "131321",
    "112313", "132113", "132311", "211313", "231113", "231311", "112133", "112331", "132131",
    "113123", "113321", "133121", "313121", "211331", "231131", "213113", "213311", "213131",
    "311123", "311321", "331121", "312113", "312311", "332111", "314111", "221411", "431111",
    "111224", "111422", "121124", "121421", "141122", "141221", "112214", "112412", "122114",
    "122411", "142112", "142211", "241211", "221114", "413111", "241112", "134111", "111242",
    "121142", "121241", "114212", "124112", "124211", "411212", "421112", "421211", "212141",
    "214121", "412121", "111143", "111341", "131141", "114113", "114311", "411113", "411311",
    "113141", "114131", "311141", "411131", "211412", "211214",
    "211232", // 103..105 = Start A/B/C
    "233111", // 106 = STOP (без финальной полосы)
];

pub const CODE_PATTERNS: [[u32; 6]; 107] = {
    let mut out = [[0u32; 6]; 107];
    let mut i = 0;
    while i < 107 {
        let b = CODE_PATTERNS_STR[i].as_bytes();
        let mut j = 0;
        while j < 6 {
            out[i][j] = (b[j] - b'0') as u32;
            j += 1;
        }
        i += 1;
    }
    out
};

/// Полный STOP вместе с финальной тёмной полосой.
pub const STOP_PATTERN: [u32; 7] = [2, 3, 3, 1, 1, 1, 2];

const MAX_AVG_VARIANCE: u32 = (PATTERN_MATCH_RESULT_SCALE_FACTOR as f32 * 0.25) as u32;
const MAX_INDIVIDUAL_VARIANCE: u32 = (PATTERN_MATCH_RESULT_SCALE_FACTOR as f32 * 0.7) as u32;

pub const CODE_SHIFT: u32 = 98;
pub const CODE_CODE_C: u32 = 99;
pub const CODE_CODE_B: u32 = 100;
pub const CODE_CODE_A: u32 = 101;
pub const CODE_FNC_1: u32 = 102;
pub const CODE_FNC_2: u32 = 97;
pub const CODE_FNC_3: u32 = 96;
pub const CODE_FNC_4_A: u32 = 101;
pub const CODE_FNC_4_B: u32 = 100;
pub const CODE_START_A: u32 = 103;
pub const CODE_START_B: u32 = 104;
pub const CODE_START_C: u32 = 105;
pub const CODE_STOP: u32 = 106;

/// Символ в тексте синтезатора, означающий FNC1.
pub const ESCAPE_FNC_1: char = '\u{f1}';

#[derive(Debug, Default)]
pub struct Code128Reader {
    counters: [u32; 6],
}

impl Code128Reader {
    pub fn new() -> Self {
        Self::default()
    }

    fn decode_code(&mut self, row: &BitRow, row_offset: usize) -> DecodeResult<u32> {
        record_pattern(row, row_offset, &mut self.counters)?;
        let mut best_variance = MAX_AVG_VARIANCE;
        let mut best_match = None;
        for (code, pattern) in CODE_PATTERNS.iter().enumerate() {
            let variance = pattern_match_variance(&self.counters, pattern, MAX_INDIVIDUAL_VARIANCE);
            if variance < best_variance {
                best_variance = variance;
                best_match = Some(code as u32);
            }
        }
        best_match.ok_or(DecodeError::NotFound)
    }
}

/// Старт-код с тихой зоной не уже половины его ширины; возвращает диапазон и код.
fn find_start_pattern(row: &BitRow) -> DecodeResult<(std::ops::Range<usize>, u32)> {
    let width = row.len();
    let row_offset = row.next_set(0);
    let mut counters = [0u32; 6];
    let mut pos = 0usize;
    let mut pattern_start = row_offset;
    let mut counting_dark = true;

    for i in row_offset..width {
        if row.get(i) == counting_dark {
            counters[pos] += 1;
            continue;
        }
        if pos == 5 {
            let mut best_variance = MAX_AVG_VARIANCE;
            let mut best_match = None;
            for code in CODE_START_A..=CODE_START_C {
                let variance =
                    pattern_match_variance(&counters, &CODE_PATTERNS[code as usize], MAX_INDIVIDUAL_VARIANCE);
                if variance < best_variance {
                    best_variance = variance;
                    best_match = Some(code);
                }
            }
            if let Some(code) = best_match {
                let quiet_start = pattern_start.saturating_sub((i - pattern_start) / 2);
                if row.is_range(quiet_start, pattern_start, false) {
                    return Ok((pattern_start..i, code));
                }
            }
            pattern_start += (counters[0] + counters[1]) as usize;
            shift_counters(&mut counters);
            pos -= 1;
        } else {
            pos += 1;
        }
        counters[pos] = 1;
        counting_dark = !counting_dark;
    }
    Err(DecodeError::NotFound)
}

/// FNC1 в первой/второй позиции задаёт модификатор символики; в GS1-режиме
/// первый FNC1 даёт `]C1`, остальные: GS.
fn apply_fnc1(result: &mut String, symbology_modifier: &mut u32, convert_fnc1: bool) {
    match result.chars().count() {
        0 => *symbology_modifier = 1,
        1 => *symbology_modifier = 2,
        _ => {}
    }
    if convert_fnc1 {
        if result.is_empty() {
            result.push_str("]C1");
        } else {
            result.push('\u{1d}');
        }
    }
}

impl OneDReader for Code128Reader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        let convert_fnc1 = opts.assume_gs1;
        let (start_range, start_code) = find_start_pattern(row)?;

        let mut raw_codes: Vec<u8> = Vec::with_capacity(20);
        raw_codes.push(start_code as u8);
        let mut code_set = match start_code {
            CODE_START_A => CODE_CODE_A,
            CODE_START_B => CODE_CODE_B,
            _ => CODE_CODE_C,
        };

        let mut result = String::with_capacity(20);
        let mut symbology_modifier = 0u32;
        let mut done = false;
        let mut is_next_shifted = false;
        let mut last_start = start_range.start;
        let mut next_start = start_range.end;
        let mut last_code = 0u32;
        let mut code = 0u32;
        let mut checksum_total = start_code;
        let mut multiplier = 0u32;
        let mut last_character_was_printable = true;
        let mut upper_mode = false;
        let mut shift_upper_mode = false;

        while !done {
            let unshift = is_next_shifted;
            is_next_shifted = false;

            last_code = code;
            code = self.decode_code(row, next_start)?;
            raw_codes.push(code as u8);

            if code != CODE_STOP {
                last_character_was_printable = true;
                multiplier += 1;
                checksum_total += multiplier * code;
            }
            last_start = next_start;
            next_start += sum(&self.counters);

            if (CODE_START_A..=CODE_START_C).contains(&code) {
                return Err(DecodeError::InvalidFormat);
            }

            match code_set {
                CODE_CODE_A | CODE_CODE_B => {
                    if code < 96 {
                        let base = if code_set == CODE_CODE_A && code >= 64 {
                            code - 64
                        } else {
                            code + 32
                        };
                        let ch = if shift_upper_mode == upper_mode { base } else { base + 128 };
                        result.push(char::from(ch as u8));
                        shift_upper_mode = false;
                    } else {
                        if code != CODE_STOP {
                            last_character_was_printable = false;
                        }
                        match code {
                            CODE_FNC_1 => apply_fnc1(&mut result, &mut symbology_modifier, convert_fnc1),
                            CODE_FNC_2 => symbology_modifier = 4,
                            CODE_FNC_3 => {}
                            CODE_FNC_4_A if code_set == CODE_CODE_A => {
                                toggle_upper(&mut upper_mode, &mut shift_upper_mode)
                            }
                            CODE_FNC_4_B if code_set == CODE_CODE_B => {
                                toggle_upper(&mut upper_mode, &mut shift_upper_mode)
                            }
                            CODE_SHIFT => {
                                is_next_shifted = true;
                                code_set = if code_set == CODE_CODE_A { CODE_CODE_B } else { CODE_CODE_A };
                            }
                            CODE_CODE_A => code_set = CODE_CODE_A,
                            CODE_CODE_B => code_set = CODE_CODE_B,
                            CODE_CODE_C => code_set = CODE_CODE_C,
                            CODE_STOP => done = true,
                            _ => {}
                        }
                    }
                }
                _ => {
                    if code < 100 {
                        if code < 10 {
                            result.push('0');
                        }
                        result.push_str(&code.to_string());
                    } else {
                        if code != CODE_STOP {
                            last_character_was_printable = false;
                        }
                        match code {
                            CODE_FNC_1 => apply_fnc1(&mut result, &mut symbology_modifier, convert_fnc1),
                            CODE_CODE_A => code_set = CODE_CODE_A,
                            CODE_CODE_B => code_set = CODE_CODE_B,
                            CODE_STOP => done = true,
                            _ => {}
                        }
                    }
                }
            }

            if unshift {
                code_set = if code_set == CODE_CODE_A { CODE_CODE_B } else { CODE_CODE_A };
            }
        }

        let last_pattern_size = next_start - last_start;

        // финальная полоса STOP, затем тихая зона не уже половины последнего символа
        let next_start = row.next_unset(next_start);
        let quiet_end = (next_start + (next_start - last_start) / 2).min(row.len());
        if !row.is_range(next_start, quiet_end, false) {
            return Err(DecodeError::NotFound);
        }

        checksum_total -= multiplier * last_code;
        if checksum_total % 103 != last_code {
            trace!(row = row_number, "code128 checksum mismatch");
            return Err(DecodeError::ChecksumError);
        }

        if result.is_empty() {
            return Err(DecodeError::NotFound);
        }
        // контрольный символ попал в текст, если он печатный
        if last_character_was_printable {
            result.pop();
            if code_set == CODE_CODE_C {
                result.pop();
            }
        }

        let y = row_number as f32;
        let left = (start_range.start + start_range.end) as f32 / 2.0;
        let right = last_start as f32 + last_pattern_size as f32 / 2.0;
        Ok(DecodedSymbol::new(BarcodeFormat::Code128, result)
            .with_bytes(raw_codes)
            .with_points([Point::new(left, y), Point::new(right, y)])
            .with_metadata(MetadataKey::SymbologyIdentifier, format!("]C{symbology_modifier}")))
    }
}

#[inline]
fn toggle_upper(upper_mode: &mut bool, shift_upper_mode: &mut bool) {
    if *shift_upper_mode {
        // два FNC4 подряд: включить/выключить режим
        *upper_mode = !*upper_mode;
        *shift_upper_mode = false;
    } else {
        *shift_upper_mode = true;
    }
}

// === Синтезатор для тестов/демо ===

/// Ширины по готовой последовательности кодов (старт + данные): дописывает
/// контрольный символ и STOP.
pub fn encode_code128_codes(codes: &[u32]) -> Vec<u32> {
    let mut checksum = codes.first().copied().unwrap_or(0);
    for (i, &c) in codes.iter().enumerate().skip(1) {
        checksum += c * i as u32;
    }
    let mut out = Vec::with_capacity((codes.len() + 1) * 6 + 7);
    for &c in codes {
        out.extend_from_slice(&CODE_PATTERNS[c as usize]);
    }
    out.extend_from_slice(&CODE_PATTERNS[(checksum % 103) as usize]);
    out.extend_from_slice(&STOP_PATTERN);
    out
}

/// Текст → коды (старт + данные). Набор C для серий цифр от 4, A: для
/// управляющих символов, иначе B. `ESCAPE_FNC_1` кодируется как FNC1.
pub fn code128_codes(text: &str) -> Option<Vec<u32>> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return None;
    }
    let mut codes = Vec::with_capacity(chars.len() + 2);
    let mut set: Option<u32> = None;

    let switch = |codes: &mut Vec<u32>, set: &mut Option<u32>, target: u32| {
        if *set == Some(target) {
            return;
        }
        codes.push(match (*set, target) {
            (None, CODE_CODE_A) => CODE_START_A,
            (None, CODE_CODE_B) => CODE_START_B,
            (None, _) => CODE_START_C,
            (Some(_), t) => t,
        });
        *set = Some(target);
    };

    let mut i = 0;
    while i < chars.len() {
        let digits = chars[i..].iter().take_while(|c| c.is_ascii_digit()).count();
        let stay_c = set == Some(CODE_CODE_C) && digits >= 2;
        let go_c = digits >= 4 && digits % 2 == 0 || (i == 0 && digits == chars.len() && digits % 2 == 0);
        if stay_c || go_c {
            switch(&mut codes, &mut set, CODE_CODE_C);
            let hi = chars[i].to_digit(10)?;
            let lo = chars[i + 1].to_digit(10)?;
            codes.push(hi * 10 + lo);
            i += 2;
            continue;
        }

        let ch = chars[i];
        if ch == ESCAPE_FNC_1 {
            if set.is_none() {
                let next_digits = chars[i + 1..].iter().take_while(|c| c.is_ascii_digit()).count();
                let first = if next_digits >= 2 { CODE_CODE_C } else { CODE_CODE_B };
                switch(&mut codes, &mut set, first);
            }
            codes.push(CODE_FNC_1);
            i += 1;
            continue;
        }

        let v = ch as u32;
        if v > 127 {
            return None;
        }
        let target = if v < 32 {
            CODE_CODE_A
        } else if v >= 96 {
            CODE_CODE_B
        } else {
            match set {
                Some(CODE_CODE_A) => CODE_CODE_A,
                _ => CODE_CODE_B,
            }
        };
        switch(&mut codes, &mut set, target);
        codes.push(if target == CODE_CODE_A && v < 32 { v + 64 } else { v - 32 });
        i += 1;
    }
    Some(codes)
}

/// Ширины Code 128 для текста.
pub fn encode_code128(text: &str) -> Option<Vec<u32>> {
    code128_codes(text).map(|codes| encode_code128_codes(&codes))
}

/// Сгенерировать идеальный ряд (ч/б пиксели) для Code 128.
pub fn synthesize_row_code128(text: &str, unit: usize) -> Option<Vec<u8>> {
    Some(crate::one_d::synth::render_pixels(&encode_code128(text)?, unit, 10))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::one_d::synth::render_row;

    fn decode(widths: &[u32], opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        Code128Reader::new().decode_row(0, &render_row(widths, 2, 10), opts)
    }

    fn decode_text(text: &str) -> DecodeResult<DecodedSymbol> {
        decode(&encode_code128(text).unwrap(), &DecodeOptions::default())
    }

    #[test]
    fn code128_b_simple() {
        let sym = decode_text("HELLO-128").unwrap();
        assert_eq!(sym.text, "HELLO-128");
        assert_eq!(sym.format, BarcodeFormat::Code128);
        assert_eq!(
            sym.metadata.get(MetadataKey::SymbologyIdentifier).and_then(|v| v.as_text()),
            Some("]C0")
        );
        let bytes = sym.bytes.unwrap();
        assert_eq!(bytes[0], CODE_START_B as u8);
        assert_eq!(*bytes.last().unwrap(), CODE_STOP as u8);
    }

    #[test]
    fn code128_c_digits() {
        assert_eq!(decode_text("0123456789").unwrap().text, "0123456789");
        // смешанный: буквы, затем длинная серия цифр
        assert_eq!(decode_text("AB1234567").unwrap().text, "AB1234567");
    }

    #[test]
    fn code128_control_chars_via_set_a() {
        assert_eq!(decode_text("ABc\td").unwrap().text, "ABc\td");
    }

    #[test]
    fn shift_affects_one_character() {
        // Start B, 'A', SHIFT, TAB (в наборе A), 'B'
        let widths = encode_code128_codes(&[CODE_START_B, 33, CODE_SHIFT, 73, 34]);
        assert_eq!(decode(&widths, &DecodeOptions::default()).unwrap().text, "A\tB");
    }

    #[test]
    fn fnc4_maps_to_latin1_high_half() {
        let widths = encode_code128_codes(&[CODE_START_B, CODE_FNC_4_B, 33, 33]);
        assert_eq!(decode(&widths, &DecodeOptions::default()).unwrap().text, "\u{c1}A");
        // двойной FNC4: режим до следующего двойного
        let widths = encode_code128_codes(&[CODE_START_B, CODE_FNC_4_B, CODE_FNC_4_B, 33, 34]);
        assert_eq!(decode(&widths, &DecodeOptions::default()).unwrap().text, "\u{c1}\u{c2}");
    }

    #[test]
    fn gs1_mode() {
        let text = format!("{ESCAPE_FNC_1}0112345678901231{ESCAPE_FNC_1}10AB");
        let widths = encode_code128(&text).unwrap();
        let plain = decode(&widths, &DecodeOptions::default()).unwrap();
        assert_eq!(plain.text, "011234567890123110AB");
        assert_eq!(
            plain.metadata.get(MetadataKey::SymbologyIdentifier).and_then(|v| v.as_text()),
            Some("]C1")
        );
        let gs1 = decode(
            &widths,
            &DecodeOptions {
                assume_gs1: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(gs1.text, "]C10112345678901231\u{1d}10AB");
    }

    #[test]
    fn perturbed_bar_is_rejected() {
        let mut widths = encode_code128("HELLO").unwrap();
        // второй символ данных: первая полоса толще на модуль
        widths[12] += 1;
        assert!(decode(&widths, &DecodeOptions::default()).is_err());
    }

    #[test]
    fn wrong_checksum() {
        let mut widths = encode_code128("HELLO").unwrap();
        let n = widths.len();
        // подменить контрольный символ другим кодом
        widths[n - 13..n - 7].copy_from_slice(&CODE_PATTERNS[0]);
        assert_eq!(
            decode(&widths, &DecodeOptions::default()),
            Err(DecodeError::ChecksumError)
        );
    }

    #[test]
    fn needs_trailing_quiet_zone() {
        let widths = encode_code128("HELLO").unwrap();
        let row = render_row(&widths, 2, 10);
        let mut trimmed: Vec<bool> = (0..row.len()).map(|i| row.get(i)).collect();
        // тёмный «мусор» сразу за STOP
        let end = trimmed.len() - 20;
        trimmed[end + 2] = true;
        let row: BitRow = trimmed.into_iter().collect();
        assert_eq!(
            Code128Reader::new().decode_row(0, &row, &DecodeOptions::default()),
            Err(DecodeError::NotFound)
        );
    }

    #[test]
    fn synthesized_pixels_have_quiet_zones() {
        let pix = synthesize_row_code128("Hi", 2).unwrap();
        assert!(pix[..20].iter().all(|&v| v == 255));
        assert!(pix[pix.len() - 20..].iter().all(|&v| v == 255));
    }
}
