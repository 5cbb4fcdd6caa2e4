mod commands;
mod layout;

pub(crate) use commands::run;
pub(crate) use layout::{manifest_in_context, options_in_context};
