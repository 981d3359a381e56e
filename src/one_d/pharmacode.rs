//! Pharmacode (Laetus): только полосы двух толщин, пробелы одинаковые.
//! Таблицы шаблонов нет: каждая полоса сравнивается с соседними пробелами
//! (узкая уже пробела, широкая шире).
//!
//! Значение: справа налево узкая полоса i даёт 2^i, широкая 2^(i+1),
//! т.е. `2^n + bits − 1`, где `bits`: широкие полосы как единицы.

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};
use crate::one_d::OneDReader;

const MIN_BARS: usize = 2;
const MAX_BARS: usize = 16;
pub const MIN_VALUE: u32 = 3;
pub const MAX_VALUE: u32 = 131_070;

/// Пробел внутри символа: от половины до двух «опорных» пробелов.
const GAP_TOLERANCE: f32 = 2.0;
/// Тихая зона: не меньше трёх средних пробелов.
const QUIET_RATIO: f32 = 3.0;
/// Отношение полоса/пробел: узкая ≤ 0.8, широкая ≥ 1.25, между ними неоднозначно.
const NARROW_MAX: f32 = 0.8;
const WIDE_MIN: f32 = 1.25;

#[derive(Clone, Copy, Debug)]
struct Run {
    dark: bool,
    start: usize,
    len: u32,
}

#[derive(Debug, Default)]
pub struct PharmaCodeReader {
    runs: Vec<Run>,
    wide: Vec<bool>,
}

impl PharmaCodeReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_runs(&mut self, row: &BitRow) {
        self.runs.clear();
        let end = row.len();
        let mut i = 0;
        while i < end {
            let dark = row.get(i);
            let j = if dark { row.next_unset(i) } else { row.next_set(i) };
            self.runs.push(Run {
                dark,
                start: i,
                len: (j - i) as u32,
            });
            i = j;
        }
    }

    /// Символ, начинающийся с полосы `runs[s]`: (индекс последней полосы, значение).
    fn try_symbol_at(&mut self, s: usize) -> Option<(usize, u32)> {
        let runs = &self.runs;
        let reference = runs.get(s + 1).filter(|r| !r.dark)?.len as f32;

        // полосы, пока пробелы между ними похожи на первый
        let mut last = s;
        while let (Some(gap), Some(next)) = (runs.get(last + 1), runs.get(last + 2)) {
            let g = gap.len as f32;
            if !next.dark || g > reference * GAP_TOLERANCE || g * GAP_TOLERANCE < reference {
                break;
            }
            last += 2;
        }
        let bars = (last - s) / 2 + 1;
        if !(MIN_BARS..=MAX_BARS).contains(&bars) {
            return None;
        }

        let gaps = &runs[s + 1..last];
        let mean_gap = gaps.iter().step_by(2).map(|r| r.len as f32).sum::<f32>() / (bars - 1) as f32;
        let quiet = mean_gap * QUIET_RATIO;
        let before = if s == 0 { 0.0 } else { runs[s - 1].len as f32 };
        let after = runs.get(last + 1).map_or(0.0, |r| r.len as f32);
        if before < quiet || after < quiet {
            return None;
        }

        self.wide.clear();
        for k in (s..=last).step_by(2) {
            // средний из соседних внутренних пробелов
            let left = (k > s).then(|| runs[k - 1].len as f32);
            let right = (k < last).then(|| runs[k + 1].len as f32);
            let neighbours = match (left, right) {
                (Some(l), Some(r)) => (l + r) / 2.0,
                (Some(g), None) | (None, Some(g)) => g,
                (None, None) => return None,
            };
            let ratio = runs[k].len as f32 / neighbours;
            if ratio <= NARROW_MAX {
                self.wide.push(false);
            } else if ratio >= WIDE_MIN {
                self.wide.push(true);
            } else {
                return None;
            }
        }

        let value = pharmacode_value(&self.wide);
        (MIN_VALUE..=MAX_VALUE).contains(&value).then_some((last, value))
    }
}

/// `2^n + bits − 1`, крайняя правая полоса: младший разряд.
pub fn pharmacode_value(wide: &[bool]) -> u32 {
    let n = wide.len() as u32;
    let bits = wide.iter().fold(0u32, |acc, &w| (acc << 1) | u32::from(w));
    (1u32 << n) + bits - 1
}

impl OneDReader for PharmaCodeReader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, _opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        self.collect_runs(row);
        for s in 0..self.runs.len() {
            if !self.runs[s].dark {
                continue;
            }
            let Some((last, value)) = self.try_symbol_at(s) else {
                continue;
            };
            let left = self.runs[s].start as f32;
            let right = (self.runs[last].start + self.runs[last].len as usize) as f32;
            let y = row_number as f32;
            return Ok(DecodedSymbol::new(BarcodeFormat::PharmaCode, value.to_string())
                .with_points([Point::new(left, y), Point::new(right, y)])
                .with_metadata(MetadataKey::SymbologyIdentifier, "]L0"));
        }
        Err(DecodeError::NotFound)
    }
}

// === Синтезатор ===

/// Полосы 1 (узкая) и 3 (широкая), пробелы 2.
pub fn encode_pharmacode(value: u32) -> Option<Vec<u32>> {
    if !(MIN_VALUE..=MAX_VALUE).contains(&value) {
        return None;
    }
    let mut bars = Vec::with_capacity(MAX_BARS);
    let mut v = value;
    while v > 0 {
        if v % 2 == 0 {
            bars.push(3);
            v = (v - 2) / 2;
        } else {
            bars.push(1);
            v = (v - 1) / 2;
        }
    }
    let mut out = Vec::with_capacity(bars.len() * 2);
    for (i, &b) in bars.iter().rev().enumerate() {
        if i > 0 {
            out.push(2);
        }
        out.push(b);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::one_d::synth::render_row;

    fn decode(widths: &[u32], unit: usize) -> DecodeResult<DecodedSymbol> {
        PharmaCodeReader::new().decode_row(0, &render_row(widths, unit, 10), &DecodeOptions::default())
    }

    #[test]
    fn bar_sequence_of_1234() {
        let bars: Vec<u32> = encode_pharmacode(1234).unwrap().into_iter().step_by(2).collect();
        assert_eq!(bars, vec![1, 1, 3, 3, 1, 3, 1, 1, 3, 3]);
    }

    #[test]
    fn value_formula() {
        assert_eq!(pharmacode_value(&[false, false]), 3);
        assert_eq!(pharmacode_value(&[false, true]), 4);
        assert_eq!(pharmacode_value(&[true; 16]), MAX_VALUE);
    }

    #[test]
    fn decodes_values_across_range() {
        for value in [3, 4, 91, 1234, 65535, MAX_VALUE] {
            let sym = decode(&encode_pharmacode(value).unwrap(), 2).unwrap();
            assert_eq!(sym.text, value.to_string());
            assert_eq!(sym.format, BarcodeFormat::PharmaCode);
        }
    }

    #[test]
    fn out_of_range_is_not_encodable() {
        assert!(encode_pharmacode(2).is_none());
        assert!(encode_pharmacode(MAX_VALUE + 1).is_none());
    }

    #[test]
    fn single_bar_is_not_a_symbol() {
        assert_eq!(decode(&[3], 2), Err(DecodeError::NotFound));
    }

    #[test]
    fn ambiguous_bar_width_is_rejected() {
        // средняя полоса равна пробелу
        assert_eq!(decode(&[1, 2, 2, 2, 3], 2), Err(DecodeError::NotFound));
    }

    #[test]
    fn blocked_leading_margin_is_not_found() {
        let mut row = render_row(&encode_pharmacode(1234).unwrap(), 2, 10);
        for x in 0..18 {
            row.set(x, true);
        }
        assert_eq!(
            PharmaCodeReader::new().decode_row(0, &row, &DecodeOptions::default()),
            Err(DecodeError::NotFound)
        );
    }
}
