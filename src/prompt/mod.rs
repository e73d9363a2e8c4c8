//! Prompt handling: style enhancement, validation and the static catalog of
//! styles, presets and dimension presets.
pub mod catalog;
pub mod enhancer;
pub mod validation;
