pub mod cursor;
pub mod geodesy;
pub mod load;
pub mod metrics;
pub mod parse;
pub mod playback;
