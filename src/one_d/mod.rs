//! Одномерные символики: общее ядро сопоставления шаблонов и построчный сканер.
//!
//! Ядро:
//! 1) `record_pattern`: превращает участок `BitRow` в ширины чередующихся полос;
//! 2) `pattern_match_variance`: насколько эти ширины похожи на эталон символики
//!    (фиксированная точка, 8 дробных бит, 0: идеальное совпадение);
//! 3) `do_decode`: обход строк изображения от середины наружу, каждая строка
//!    пробуется как есть и развёрнутой (код вверх ногами).
//!
//! Декодеры владеют рабочими буферами и принимают `&mut self`: один экземпляр :
//! один поток, один вызов за раз. Для параллельной работы: по экземпляру на поток.

pub mod codabar;
pub mod code128;
pub mod code39;
pub mod code93;
pub mod ean13;
pub mod ean8;
pub mod ean_manufacturer;
pub mod extension;
pub mod itf;
pub mod msi;
pub mod multi;
pub mod multi_upc_ean;
pub mod pharmacode;
pub mod plessey;
pub mod synth;
pub mod upc_ean;
pub mod upca;
pub mod upce;

use std::ops::Range;

use tracing::{debug, trace};

use crate::binarize::BinaryBitmap;
use crate::core::{BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, MetadataKey, Point};

pub use codabar::CodabarReader;
pub use code128::Code128Reader;
pub use code39::Code39Reader;
pub use code93::Code93Reader;
pub use ean13::Ean13Reader;
pub use ean8::Ean8Reader;
pub use itf::ItfReader;
pub use msi::MsiReader;
pub use multi::MultiFormatOneDReader;
pub use multi_upc_ean::MultiFormatUpcEanReader;
pub use pharmacode::PharmaCodeReader;
pub use plessey::PlesseyReader;
pub use upca::UpcAReader;
pub use upce::UpcEReader;

/// Сдвиг фиксированной точки в `pattern_match_variance`.
pub const INTEGER_MATH_SHIFT: u32 = 8;
/// 1.0 в фиксированной точке; пороги символик задаются долями этого значения.
pub const PATTERN_MATCH_RESULT_SCALE_FACTOR: u32 = 1 << INTEGER_MATH_SHIFT;

/// Декодер одной строки.
pub trait OneDReader {
    /// Попытаться распознать символ на строке `row_number`.
    fn decode_row(
        &mut self,
        row_number: usize,
        row: &BitRow,
        opts: &DecodeOptions,
    ) -> DecodeResult<DecodedSymbol>;

    /// Построчный поиск по изображению; при `try_harder`: ещё и на повёрнутом на 90°.
    fn decode(&mut self, image: &BinaryBitmap<'_>, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        let err = match do_decode(self, image, opts) {
            Ok(r) => return Ok(r),
            Err(e) => e,
        };
        if !opts.try_harder || opts.disable_rotation || !image.is_rotate_supported() {
            return Err(err);
        }
        let Some(rotated) = image.rotate_counter_clockwise() else {
            return Err(err);
        };
        debug!("retrying on image rotated 90° counter-clockwise");
        let rotated_bitmap = BinaryBitmap::new(&rotated, image.binarizer());
        let mut result = do_decode(self, &rotated_bitmap, opts)?;

        let orientation = (270 + result.orientation()) % 360;
        result.put_metadata(MetadataKey::Orientation, orientation);
        // обратно в координаты исходного изображения
        let h = rotated.height as f32;
        for p in &mut result.points {
            *p = Point::new(h - p.y - 1.0, p.x);
        }
        Ok(result)
    }
}

/// Обход строк: середина, середина−шаг, середина+шаг, середина−2·шаг, …
///
/// Каждая строка пробуется дважды: как есть и развёрнутой. Во второй попытке
/// наблюдатель точек отключён, чтобы точки одной строки не сообщались дважды.
pub fn do_decode<R: OneDReader + ?Sized>(
    reader: &mut R,
    image: &BinaryBitmap<'_>,
    opts: &DecodeOptions,
) -> DecodeResult<DecodedSymbol> {
    let width = image.width();
    let height = image.height();
    let mut row = BitRow::new(width);

    let row_step = (height >> if opts.try_harder { 8 } else { 5 }).max(1);
    let max_lines = if opts.try_harder { height } else { 15 };
    let middle = height / 2;

    let quiet_opts = opts
        .result_point_callback
        .as_ref()
        .map(|_| opts.without_result_point_callback());
    let reversed_opts = quiet_opts.as_ref().unwrap_or(opts);

    for x in 0..max_lines {
        let offset = row_step * ((x + 1) / 2);
        let row_number = if x & 1 == 0 {
            middle + offset
        } else {
            match middle.checked_sub(offset) {
                Some(y) => y,
                None => break,
            }
        };
        if row_number >= height {
            break;
        }

        if let Err(e) = image.black_row(row_number, &mut row) {
            trace!(row = row_number, error = %e, "row skipped by binarizer");
            continue;
        }

        for attempt in 0..2 {
            let reversed = attempt == 1;
            if reversed {
                row.reverse();
            }
            let o = if reversed { reversed_opts } else { opts };
            match reader.decode_row(row_number, &row, o) {
                Ok(mut result) => {
                    if reversed {
                        result.put_metadata(MetadataKey::Orientation, 180);
                        let w = width as f32;
                        for p in &mut result.points {
                            p.x = w - p.x - 1.0;
                        }
                    }
                    debug!(row = row_number, format = %result.format, reversed, "decoded");
                    return Ok(result);
                }
                Err(e) => trace!(row = row_number, reversed, error = %e, "row rejected"),
            }
        }
    }
    Err(DecodeError::NotFound)
}

/// Записать ширины `counters.len()` чередующихся полос начиная с `start`.
/// Цвет первой полосы: цвет пикселя `start`.
///
/// Если строка кончилась, когда заполнялся последний счётчик,: это успех:
/// коды часто обрезаны краем кадра.
pub fn record_pattern(row: &BitRow, start: usize, counters: &mut [u32]) -> DecodeResult<()> {
    counters.fill(0);
    let end = row.len();
    if start >= end {
        return Err(DecodeError::NotFound);
    }
    let num = counters.len();
    let mut counting_dark = row.get(start);
    let mut pos = 0usize;
    let mut i = start;
    while i < end {
        if row.get(i) == counting_dark {
            counters[pos] += 1;
        } else {
            pos += 1;
            if pos == num {
                break;
            }
            counters[pos] = 1;
            counting_dark = !counting_dark;
        }
        i += 1;
    }
    if pos == num || (pos + 1 == num && i == end) {
        Ok(())
    } else {
        Err(DecodeError::NotFound)
    }
}

/// Мера несхожести `counters` с эталоном `pattern` (в единицах модуля).
///
/// Ширины приводятся к общей «ширине модуля» в фиксированной точке; если хоть
/// одна полоса отклоняется больше `max_individual_variance`: `u32::MAX`.
/// Иначе сумма отклонений, делённая на общую ширину. Меньше значит лучше.
pub fn pattern_match_variance(counters: &[u32], pattern: &[u32], max_individual_variance: u32) -> u32 {
    debug_assert_eq!(counters.len(), pattern.len());
    let total: u64 = counters.iter().map(|&c| u64::from(c)).sum();
    let pattern_length: u64 = pattern.iter().map(|&p| u64::from(p)).sum();
    if pattern_length == 0 || total < pattern_length {
        // меньше пикселя на модуль: надёжно не сравнить
        return u32::MAX;
    }
    let unit_bar_width = (total << INTEGER_MATH_SHIFT) / pattern_length;
    let max_individual = (u64::from(max_individual_variance) * unit_bar_width) >> INTEGER_MATH_SHIFT;

    let mut total_variance = 0u64;
    for (&c, &p) in counters.iter().zip(pattern) {
        let counter = u64::from(c) << INTEGER_MATH_SHIFT;
        let scaled = u64::from(p) * unit_bar_width;
        let variance = counter.abs_diff(scaled);
        if variance > max_individual {
            return u32::MAX;
        }
        total_variance += variance;
    }
    u32::try_from(total_variance / total).unwrap_or(u32::MAX)
}

/// Сдвинуть окно счётчиков на пару полос влево (скользящий поиск охранных шаблонов).
#[inline]
pub(crate) fn shift_counters(counters: &mut [u32]) {
    let n = counters.len();
    counters.copy_within(2.., 0);
    counters[n - 2] = 0;
    counters[n - 1] = 0;
}

/// Найти охранный шаблон `pattern` начиная с `offset`.
/// `white_first`: шаблон начинается со светлой полосы.
pub(crate) fn find_guard_pattern(
    row: &BitRow,
    offset: usize,
    white_first: bool,
    pattern: &[u32],
    counters: &mut [u32],
    max_avg_variance: u32,
    max_individual_variance: u32,
) -> DecodeResult<Range<usize>> {
    let width = row.len();
    let offset = if white_first {
        row.next_unset(offset)
    } else {
        row.next_set(offset)
    };
    let len = pattern.len();
    counters.fill(0);
    let mut pos = 0usize;
    let mut pattern_start = offset;
    let mut counting_dark = !white_first;
    for x in offset..width {
        if row.get(x) == counting_dark {
            counters[pos] += 1;
        } else {
            if pos == len - 1 {
                if pattern_match_variance(counters, pattern, max_individual_variance) < max_avg_variance {
                    return Ok(pattern_start..x);
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
    }
    Err(DecodeError::NotFound)
}

#[inline]
pub(crate) fn sum(counters: &[u32]) -> usize {
    counters.iter().map(|&c| c as usize).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarize::GlobalThresholdBinarizer;
    use crate::core::{BarcodeFormat, LumaImage};

    fn row_from(s: &str) -> BitRow {
        s.chars().map(|c| c == 'X').collect()
    }

    #[test]
    fn record_pattern_counts_runs_from_start_color() {
        let row = row_from("..XXX.XX...X..");
        let mut c = [0u32; 4];
        record_pattern(&row, 2, &mut c).unwrap();
        assert_eq!(c, [3, 1, 2, 3]);
        // светлый старт
        record_pattern(&row, 0, &mut c).unwrap();
        assert_eq!(c, [2, 3, 1, 2]);
    }

    #[test]
    fn record_pattern_accepts_last_counter_clipped_by_edge() {
        let row = row_from("..XX..XXX");
        let mut c = [0u32; 4];
        record_pattern(&row, 0, &mut c).unwrap();
        assert_eq!(c, [2, 2, 2, 3]);
        // но не два недостающих счётчика
        let mut c5 = [0u32; 6];
        assert_eq!(record_pattern(&row, 0, &mut c5), Err(DecodeError::NotFound));
        assert_eq!(record_pattern(&row, 9, &mut c), Err(DecodeError::NotFound));
    }

    #[test]
    fn variance_is_zero_for_scaled_pattern() {
        let pattern = [3u32, 2, 1, 1];
        for k in 1..10 {
            let counters: Vec<u32> = pattern.iter().map(|p| p * k).collect();
            assert_eq!(pattern_match_variance(&counters, &pattern, 200), 0);
        }
    }

    #[test]
    fn variance_rejects_single_outlier_and_too_narrow() {
        let pattern = [1u32, 1, 1];
        assert_eq!(pattern_match_variance(&[2, 2, 9], &pattern, 179), u32::MAX);
        assert_eq!(pattern_match_variance(&[1, 1, 0], &pattern, 179), u32::MAX);
        let v = pattern_match_variance(&[10, 11, 10], &pattern, 179);
        assert!(v > 0 && v < 50, "v={v}");
    }

    #[test]
    fn guard_pattern_found_after_noise() {
        //                 шум         |X.X| = 1,1,1 по 2 пикселя
        let row = row_from("XXXXXXXXX.X......XX..XX..XX....");
        let mut c = [0u32; 3];
        let r = find_guard_pattern(&row, 0, false, &[1, 1, 1], &mut c, 122, 179).unwrap();
        assert_eq!(r, 17..23);
    }

    struct EveryRowFails(Vec<usize>);

    impl OneDReader for EveryRowFails {
        fn decode_row(&mut self, n: usize, _: &BitRow, _: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
            self.0.push(n);
            Err(DecodeError::NotFound)
        }
    }

    fn striped(height: usize) -> LumaImage {
        LumaImage::from_row_repeated(&[255, 0, 255, 0, 255, 0, 255, 0], height)
    }

    #[test]
    fn row_order_is_middle_out() {
        let img = striped(100);
        let bm = BinaryBitmap::new(&img, &GlobalThresholdBinarizer);
        let mut r = EveryRowFails(Vec::new());
        let opts = DecodeOptions::default();
        assert_eq!(r.decode(&bm, &opts), Err(DecodeError::NotFound));
        // шаг = 100 >> 5 = 3, каждая строка дважды (прямо и развёрнуто)
        let rows: Vec<usize> = r.0.iter().step_by(2).copied().collect();
        assert_eq!(&rows[..5], &[50, 47, 53, 44, 56]);
        assert_eq!(rows.len(), 15);
    }

    #[test]
    fn try_harder_scans_every_row() {
        let img = striped(20);
        let bm = BinaryBitmap::new(&img, &GlobalThresholdBinarizer);
        let mut r = EveryRowFails(Vec::new());
        let opts = DecodeOptions {
            try_harder: true,
            disable_rotation: true,
            ..Default::default()
        };
        let _ = r.decode(&bm, &opts);
        let mut rows: Vec<usize> = r.0.iter().step_by(2).copied().collect();
        rows.sort_unstable();
        rows.dedup();
        assert_eq!(rows, (0..20).collect::<Vec<_>>());
    }

    /// Срабатывает только на строке, где первый тёмный пиксель в позиции 1.
    struct ForwardOnly;

    impl OneDReader for ForwardOnly {
        fn decode_row(&mut self, n: usize, row: &BitRow, _: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
            if row.next_set(0) == 1 {
                Ok(DecodedSymbol::new(BarcodeFormat::Code39, "X")
                    .with_points([Point::new(1.0, n as f32), Point::new(5.0, n as f32)]))
            } else {
                Err(DecodeError::NotFound)
            }
        }
    }

    #[test]
    fn reversed_hit_is_tagged_and_mirrored() {
        // ...X.X.X: прямо первый тёмный на 3, развёрнуто X.X.X... на 0; подгоняем
        let img = LumaImage::from_row_repeated(&[255, 255, 255, 0, 255, 0, 255, 0, 255], 4);
        let bm = BinaryBitmap::new(&img, &GlobalThresholdBinarizer);
        let r = ForwardOnly.decode(&bm, &DecodeOptions::default()).unwrap();
        assert_eq!(r.orientation(), 180);
        assert_eq!(r.points[0].x, 9.0 - 1.0 - 1.0);
        assert_eq!(r.points[1].x, 9.0 - 5.0 - 1.0);
    }

    #[test]
    fn rotated_hit_gets_270_and_remapped_points() {
        // Полосы идут по вертикали только в повёрнутом виде: исходные строки однотонны.
        let (w, h) = (6usize, 9usize);
        let mut data = vec![255u8; w * h];
        for y in 0..h {
            if [1, 3, 5].contains(&y) {
                data[y * w..(y + 1) * w].fill(0);
            }
        }
        let img = LumaImage { data, width: w, height: h };
        let bm = BinaryBitmap::new(&img, &GlobalThresholdBinarizer);
        let opts = DecodeOptions {
            try_harder: true,
            ..Default::default()
        };
        let r = ForwardOnly.decode(&bm, &opts).unwrap();
        assert_eq!(r.orientation(), 270);
        // точка (1, y') повёрнутого → (w - y' - 1, 1) исходного
        assert_eq!(r.points[0].y, 1.0);
        assert!(r.points[0].x >= 0.0 && r.points[0].x < w as f32);
    }
}
