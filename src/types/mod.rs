pub mod catalog;
pub mod color;
pub mod metrics;
pub mod readout;
pub mod track;
