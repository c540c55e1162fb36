mod bitreader;
mod decoder;
mod error;
mod filter;
mod grids;
mod product;
mod repr;
mod sections;
mod utils;

pub use crate::{
    bitreader::*, error::*, filter::*, grids::*, product::*, repr::*, sections::*,
};
