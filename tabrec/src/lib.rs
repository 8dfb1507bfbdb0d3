#![doc = include_str!("../../README.md")]

pub use tabrec_layout::*;
pub use {
    tabrec_buffer as buffer, tabrec_dict as dict, tabrec_dtype as dtype, tabrec_error as error,
};
