mod gpx;

use crate::error::ParseError;
use crate::types::track::ParsedTrack;

pub use gpx::GpxParser;

pub trait Parser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTrack, ParseError>;
}

pub fn parse(bytes: &[u8]) -> Result<ParsedTrack, ParseError> {
    GpxParser.parse(bytes)
}
