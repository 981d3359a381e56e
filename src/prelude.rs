//! `use ultrabar::prelude::*;`: всё, что нужно для типичного сценария.

pub use crate::api::{BinarizerKind, Pipeline, PipelineBuilder};
pub use crate::binarize::{AdaptiveMeanBinarizer, Binarizer, BinaryBitmap, GlobalThresholdBinarizer};
pub use crate::core::{
    BarcodeFormat, BitRow, DecodeError, DecodeOptions, DecodeResult, DecodedSymbol, GrayImage, LumaImage,
    LuminanceSource, MetadataKey, MetadataValue, Point,
};
pub use crate::one_d::{MultiFormatOneDReader, OneDReader};
