//! Общие типы: битовая строка, источник яркости, результат, ошибки, опции.

pub mod bit_row;
pub mod error;
pub mod luminance;
pub mod options;
pub mod types;

pub use bit_row::BitRow;
pub use error::{DecodeError, DecodeResult};
pub use luminance::LuminanceSource;
pub use options::{DecodeOptions, ResultPointCallback};
pub use types::{
    BarcodeFormat, DecodedSymbol, GrayImage, LumaImage, MetadataKey, MetadataValue,
    ParseFormatError, Point, ResultMetadata,
};
