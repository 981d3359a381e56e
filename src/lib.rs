#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::doc_markdown,
    clippy::many_single_char_names,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::similar_names,
    clippy::too_many_lines
)]

// Публичные модули
pub mod api; // высокий уровень: Pipeline + сборщик
pub mod binarize; // яркость → BitRow
pub mod core; // BitRow, источник яркости, результат, ошибки, опции
pub mod one_d; // 1D декодеры и построчный сканер
pub mod prelude; // удобные re-export'ы

pub use crate::api::{BinarizerKind, Pipeline, PipelineBuilder};
pub use crate::core::{
    BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, GrayImage, LumaImage,
    LuminanceSource, MetadataKey, MetadataValue, Point,
};

/// Один вызов со стандартными настройками: первый найденный 1D символ.
#[inline]
pub fn decode(source: &dyn LuminanceSource) -> DecodeResult<DecodedSymbol> {
    Pipeline::new().decode(source)
}

/// То же с явными опциями.
#[inline]
pub fn decode_with(source: &dyn LuminanceSource, options: DecodeOptions) -> DecodeResult<DecodedSymbol> {
    Pipeline::builder().options(options).build().decode(source)
}
