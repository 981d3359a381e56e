//! UPC-A: это EAN-13 с неявной первой цифрой 0. Читаем как EAN-13 и отрезаем ноль.

use std::ops::Range;

use crate::core::{BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol};
use crate::one_d::ean13::{encode_ean13, Ean13Reader};
use crate::one_d::OneDReader;

#[derive(Debug, Default)]
pub struct UpcAReader {
    ean13: Ean13Reader,
}

impl UpcAReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode_row_with_start(
        &mut self,
        row_number: usize,
        row: &BitRow,
        start_range: Range<usize>,
        opts: &DecodeOptions,
    ) -> DecodeResult<DecodedSymbol> {
        maybe_return_result(self.ean13.decode_row_with_start(row_number, row, start_range, opts)?)
    }
}

impl OneDReader for UpcAReader {
    fn decode_row(&mut self, row_number: usize, row: &BitRow, opts: &DecodeOptions) -> DecodeResult<DecodedSymbol> {
        maybe_return_result(self.ean13.decode_row(row_number, row, opts)?)
    }
}

/// EAN-13 с ведущим нулём → UPC-A; остальные: не UPC-A.
pub(crate) fn maybe_return_result(mut symbol: DecodedSymbol) -> DecodeResult<DecodedSymbol> {
    if !symbol.text.starts_with('0') {
        return Err(DecodeError::InvalidFormat);
    }
    symbol.text.remove(0);
    symbol.format = BarcodeFormat::UpcA;
    Ok(symbol)
}

/// Ширины UPC-A по 11 или 12 цифрам.
pub fn encode_upca(digits: &str) -> Option<Vec<u32>> {
    encode_ean13(&format!("0{digits}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MetadataKey;
    use crate::one_d::synth::render_row;

    #[test]
    fn upca_strips_leading_zero() {
        let row = render_row(&encode_upca("036000291452").unwrap(), 2, 10);
        let sym = UpcAReader::new().decode_row(0, &row, &DecodeOptions::default()).unwrap();
        assert_eq!(sym.format, BarcodeFormat::UpcA);
        assert_eq!(sym.text, "036000291452");
        assert_eq!(
            sym.metadata.get(MetadataKey::PossibleCountry).and_then(|v| v.as_text()),
            Some("US/CA")
        );
    }

    #[test]
    fn plain_ean13_is_not_upca() {
        let row = render_row(&encode_ean13("4006381333931").unwrap(), 2, 10);
        assert_eq!(
            UpcAReader::new().decode_row(0, &row, &DecodeOptions::default()),
            Err(DecodeError::InvalidFormat)
        );
    }
}
