//! Все варианты UPC/EAN за один поиск стартового guard'а.

use std::ops::Range;

use tracing::trace;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol};
use crate::one_d::upc_ean::find_start_guard_pattern;
use crate::one_d::upca::maybe_return_result;
use crate::one_d::{Ean13Reader, Ean8Reader, OneDReader, UpcAReader, UpcEReader};

#[derive(Debug)]
enum Variant {
    Ean13(Ean13Reader),
    UpcA(UpcAReader),
    Ean8(Ean8Reader),
    UpcE(UpcEReader),
}

impl Variant {
    fn decode_row_with_start(
        &mut self,
        row_number: usize,
        row: &BitRow,
        start: Range<usize>,
        opts: &DecodeOptions,
    ) -> DecodeResult<DecodedSymbol> {
        match self {
            Self::Ean13(r) => r.decode_row_with_start(row_number, row, start, opts),
            Self::UpcA(r) => r.decode_row_with_start(row_number, row, start, opts),
            Self::Ean8(r) => r.decode_row_with_start(row_number, row, start, opts),
            Self::UpcE(r) => r.decode_row_with_start(row_number, row, start, opts),
        }
    }
}

#[derive(Debug)]
pub struct MultiFormatUpcEanReader {
    readers: Vec<Variant>,
}

impl MultiFormatUpcEanReader {
    /// Набор по `possible_formats`: EAN-13 покрывает и UPC-A, поэтому отдельный
    /// UPC-A берётся, только если EAN-13 не запрошен.
    pub fn new(opts: &DecodeOptions) -> Self {
        let mut readers = Vec::new();
        if let Some(formats) = &opts.possible_formats {
            if formats.contains(&BarcodeFormat::Ean13) {
                readers.push(Variant::Ean13(Ean13Reader::new()));
            } else if formats.contains(&BarcodeFormat::UpcA) {
                readers.push(Variant::UpcA(UpcAReader::new()));
            }
            if formats.contains(&BarcodeFormat::Ean8) {
                readers.push(Variant::Ean8(Ean8Reader::new()));
            }
            if formats.contains(&BarcodeFormat::UpcE) {
                readers.push(Variant::UpcE(UpcEReader::new()));
            }
        }
        if readers.is_empty() {
            readers.push(Variant::Ean13(Ean13Reader::new()));
            readers.push(Variant::Ean8(Ean8Reader::new()));
            readers.push(Variant::UpcE(UpcEReader::new()));
        }
        Self { readers }
    }
}

impl OneDReader for MultiFormatUpcEanReader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        let start = find_start_guard_pattern(row)?;
        for reader in &mut self.readers {
            let result = match reader.decode_row_with_start(row_number, row, start.clone(), opts) {
                Ok(r) => r,
                Err(e) => {
                    trace!(row = row_number, error = %e, "upc/ean variant rejected");
                    continue;
                }
            };
            // EAN-13 с ведущим нулём: это UPC-A, если UPC-A вообще разрешён
            let may_be_upca = result.format == BarcodeFormat::Ean13 && result.text.starts_with('0');
            if may_be_upca && opts.allows(BarcodeFormat::UpcA) {
                return maybe_return_result(result);
            }
            return Ok(result);
        }
        Err(DecodeError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::one_d::synth::{encode, render_row};

    fn row(format: BarcodeFormat, text: &str) -> BitRow {
        render_row(&encode(format, text).unwrap(), 2, 10)
    }

    #[test]
    fn picks_the_matching_variant() {
        let opts = DecodeOptions::default();
        let mut r = MultiFormatUpcEanReader::new(&opts);
        let sym = r.decode_row(0, &row(BarcodeFormat::Ean8, "9638507"), &opts).unwrap();
        assert_eq!(sym.format, BarcodeFormat::Ean8);
        let sym = r.decode_row(0, &row(BarcodeFormat::UpcE, "0123456"), &opts).unwrap();
        assert_eq!(sym.format, BarcodeFormat::UpcE);
        let sym = r.decode_row(0, &row(BarcodeFormat::Ean13, "4006381333931"), &opts).unwrap();
        assert_eq!(sym.format, BarcodeFormat::Ean13);
    }

    #[test]
    fn leading_zero_ean13_becomes_upca() {
        let opts = DecodeOptions::default();
        let mut r = MultiFormatUpcEanReader::new(&opts);
        let sym = r.decode_row(0, &row(BarcodeFormat::UpcA, "036000291452"), &opts).unwrap();
        assert_eq!(sym.format, BarcodeFormat::UpcA);
        assert_eq!(sym.text, "036000291452");

        // UPC-A не разрешён: остаётся EAN-13
        let only_ean = DecodeOptions {
            possible_formats: Some(vec![BarcodeFormat::Ean13]),
            ..Default::default()
        };
        let mut r = MultiFormatUpcEanReader::new(&only_ean);
        let sym = r.decode_row(0, &row(BarcodeFormat::UpcA, "036000291452"), &only_ean).unwrap();
        assert_eq!(sym.format, BarcodeFormat::Ean13);
        assert_eq!(sym.text, "0036000291452");
    }

    #[test]
    fn upca_only_rejects_other_ean13() {
        let opts = DecodeOptions {
            possible_formats: Some(vec![BarcodeFormat::UpcA]),
            ..Default::default()
        };
        let mut r = MultiFormatUpcEanReader::new(&opts);
        assert!(r.decode_row(0, &row(BarcodeFormat::Ean13, "4006381333931"), &opts).is_err());
    }
}
