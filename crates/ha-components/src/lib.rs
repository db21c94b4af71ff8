//! Built-in components
//!
//! Only `input_boolean` lives here: the helper entity that spring reactors
//! act on.

mod input_boolean;

pub use input_boolean::{
    load_input_booleans, register_input_boolean_services, InputBooleanConfig, DOMAIN,
};
