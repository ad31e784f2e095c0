pub use hookbridge_common::{Error, Result};

hookbridge_common::impl_context!();
