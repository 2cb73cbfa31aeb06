//! Address resolution — turns chat input into structured address fragments.

pub mod resolver;

pub use resolver::{
    AddressDetails, FreeformAddress, UNKNOWN_CITY, extract_details, is_valid_pincode,
    parse_freeform,
};
