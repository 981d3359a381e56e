//! Все одномерные символики за один проход по строке.
//!
//! Набор декодеров строится один раз по `possible_formats`. Сработавший
//! декодер переезжает в начало списка: на одном изображении обычно один
//! формат, и следующие строки пробуются им первым.
//!
//! Порядок можно снять через `order()` и вернуть через `reorder()`:
//! так `Pipeline` переносит его между вызовами.

use std::fmt;

use tracing::{debug, trace};

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol};
use crate::one_d::{
    CodabarReader, Code128Reader, Code39Reader, Code93Reader, ItfReader, MsiReader, MultiFormatUpcEanReader, OneDReader,
    PharmaCodeReader, PlesseyReader,
};

const UPC_EAN_FORMATS: [BarcodeFormat; 4] = [
    BarcodeFormat::Ean13,
    BarcodeFormat::UpcA,
    BarcodeFormat::Ean8,
    BarcodeFormat::UpcE,
];

/// Декодер вместе с форматом, под которым он стоит в очереди.
/// Для семейства UPC/EAN ключ: `Ean13`.
type Entry = (BarcodeFormat, Box<dyn OneDReader + Send>);

pub struct MultiFormatOneDReader {
    readers: Vec<Entry>,
}

impl MultiFormatOneDReader {
    /// Без ограничения форматов: стандартный набор; MSI, Plessey и Pharmacode
    /// дают много ложных срабатываний и включаются только явно.
    pub fn new(opts: &DecodeOptions) -> Self {
        let mut readers: Vec<Entry> = Vec::new();
        if let Some(formats) = &opts.possible_formats {
            let wants = |f: BarcodeFormat| formats.contains(&f);
            if UPC_EAN_FORMATS.iter().any(|&f| wants(f)) {
                readers.push((BarcodeFormat::Ean13, Box::new(MultiFormatUpcEanReader::new(opts))));
            }
            if wants(BarcodeFormat::Code39) {
                readers.push((BarcodeFormat::Code39, Box::new(Code39Reader::from_options(opts))));
            }
            if wants(BarcodeFormat::Code93) {
                readers.push((BarcodeFormat::Code93, Box::new(Code93Reader::new())));
            }
            if wants(BarcodeFormat::Code128) {
                readers.push((BarcodeFormat::Code128, Box::new(Code128Reader::new())));
            }
            if wants(BarcodeFormat::Itf) {
                readers.push((BarcodeFormat::Itf, Box::new(ItfReader::new())));
            }
            if wants(BarcodeFormat::Codabar) {
                readers.push((BarcodeFormat::Codabar, Box::new(CodabarReader::new())));
            }
            if wants(BarcodeFormat::Msi) {
                readers.push((BarcodeFormat::Msi, Box::new(MsiReader::from_options(opts))));
            }
            if wants(BarcodeFormat::Plessey) {
                readers.push((BarcodeFormat::Plessey, Box::new(PlesseyReader::new())));
            }
            if wants(BarcodeFormat::PharmaCode) {
                readers.push((BarcodeFormat::PharmaCode, Box::new(PharmaCodeReader::new())));
            }
        }
        if readers.is_empty() {
            readers.push((BarcodeFormat::Ean13, Box::new(MultiFormatUpcEanReader::new(opts))));
            readers.push((BarcodeFormat::Code39, Box::new(Code39Reader::from_options(opts))));
            readers.push((BarcodeFormat::Codabar, Box::new(CodabarReader::new())));
            readers.push((BarcodeFormat::Code93, Box::new(Code93Reader::new())));
            readers.push((BarcodeFormat::Code128, Box::new(Code128Reader::new())));
            readers.push((BarcodeFormat::Itf, Box::new(ItfReader::new())));
        }
        debug!(readers = readers.len(), "one-d reader set built");
        Self { readers }
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Ключи декодеров в текущем порядке опроса.
    pub fn order(&self) -> Vec<BarcodeFormat> {
        self.readers.iter().map(|(key, _)| *key).collect()
    }

    /// Переставить декодеры по сохранённому порядку. Ключи, которых нет
    /// в `order`, остаются в конце в прежней последовательности.
    pub fn reorder(&mut self, order: &[BarcodeFormat]) {
        self.readers
            .sort_by_key(|(key, _)| order.iter().position(|f| f == key).unwrap_or(order.len()));
    }
}

impl fmt::Debug for MultiFormatOneDReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiFormatOneDReader")
            .field("readers", &self.readers.len())
            .finish()
    }
}

impl OneDReader for MultiFormatOneDReader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        for i in 0..self.readers.len() {
            match self.readers[i].1.decode_row(row_number, row, opts) {
                Ok(result) => {
                    if i > 0 {
                        self.readers[..=i].rotate_right(1);
                        trace!(format = %result.format, from = i, "reader promoted");
                    }
                    return Ok(result);
                }
                Err(DecodeError::NotFound) => {}
                Err(e) => trace!(row = row_number, error = %e, "reader rejected row"),
            }
        }
        Err(DecodeError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::one_d::synth::{encode, render_row};

    fn row(format: BarcodeFormat, text: &str) -> BitRow {
        let unit = if format == BarcodeFormat::Plessey { 1 } else { 2 };
        render_row(&encode(format, text).unwrap(), unit, 12)
    }

    #[test]
    fn default_set_decodes_standard_formats() {
        let opts = DecodeOptions::default();
        let mut r = MultiFormatOneDReader::new(&opts);
        assert_eq!(r.len(), 6);
        let cases = [
            (BarcodeFormat::Ean13, "4006381333931"),
            (BarcodeFormat::Code39, "HELLO-39"),
            (BarcodeFormat::Code93, "CODE93"),
            (BarcodeFormat::Code128, "HELLO"),
            (BarcodeFormat::Itf, "12345678"),
            (BarcodeFormat::Codabar, "A40156B"),
        ];
        for (format, text) in cases {
            let sym = r.decode_row(0, &row(format, text), &opts).unwrap();
            assert_eq!(sym.format, format, "{text}");
        }
    }

    #[test]
    fn opt_in_formats_need_request() {
        let msi = row(BarcodeFormat::Msi, "80523");
        let opts = DecodeOptions::default();
        let mut r = MultiFormatOneDReader::new(&opts);
        assert!(r.decode_row(0, &msi, &opts).is_err());

        let opts = DecodeOptions {
            possible_formats: Some(vec![BarcodeFormat::Msi, BarcodeFormat::Plessey, BarcodeFormat::PharmaCode]),
            ..Default::default()
        };
        let mut r = MultiFormatOneDReader::new(&opts);
        assert_eq!(r.len(), 3);
        assert_eq!(r.decode_row(0, &msi, &opts).unwrap().text, "80523");
        let plessey = r.decode_row(0, &row(BarcodeFormat::Plessey, "BEEF"), &opts).unwrap();
        assert_eq!(plessey.format, BarcodeFormat::Plessey);
    }

    #[test]
    fn restricted_set_ignores_other_formats() {
        let opts = DecodeOptions {
            possible_formats: Some(vec![BarcodeFormat::Code128]),
            ..Default::default()
        };
        let mut r = MultiFormatOneDReader::new(&opts);
        assert_eq!(r.len(), 1);
        assert_eq!(
            r.decode_row(0, &row(BarcodeFormat::Code39, "ABC"), &opts),
            Err(DecodeError::NotFound)
        );
    }

    #[test]
    fn winner_moves_to_front() {
        let opts = DecodeOptions::default();
        let mut r = MultiFormatOneDReader::new(&opts);
        r.decode_row(0, &row(BarcodeFormat::Itf, "123456"), &opts).unwrap();
        // ITF теперь первым: строка без символа проходит весь список и остаётся NotFound
        let blank = BitRow::new(300);
        assert_eq!(r.decode_row(0, &blank, &opts), Err(DecodeError::NotFound));
        let sym = r.decode_row(0, &row(BarcodeFormat::Itf, "123456"), &opts).unwrap();
        assert_eq!(sym.text, "123456");
    }

    #[test]
    fn order_tracks_promotion_and_can_be_restored() {
        let opts = DecodeOptions::default();
        let mut r = MultiFormatOneDReader::new(&opts);
        assert_eq!(r.order()[0], BarcodeFormat::Ean13);
        r.decode_row(0, &row(BarcodeFormat::Code128, "HELLO"), &opts).unwrap();
        let learned = r.order();
        assert_eq!(learned[0], BarcodeFormat::Code128);
        assert_eq!(learned.len(), 6);

        let mut fresh = MultiFormatOneDReader::new(&opts);
        fresh.reorder(&learned);
        assert_eq!(fresh.order(), learned);
        // неизвестные ключи не мешают, отсутствующие уходят в конец
        fresh.reorder(&[BarcodeFormat::Itf, BarcodeFormat::Msi]);
        let order = fresh.order();
        assert_eq!(order[0], BarcodeFormat::Itf);
        assert_eq!(order[1], BarcodeFormat::Code128);
        let sym = fresh.decode_row(0, &row(BarcodeFormat::Itf, "123456"), &opts).unwrap();
        assert_eq!(sym.text, "123456");
    }

    #[test]
    fn empty_row_is_not_found_everywhere() {
        let opts = DecodeOptions {
            possible_formats: Some(BarcodeFormat::ALL.to_vec()),
            ..Default::default()
        };
        let mut r = MultiFormatOneDReader::new(&opts);
        assert_eq!(r.decode_row(0, &BitRow::new(500), &opts), Err(DecodeError::NotFound));
    }
}
