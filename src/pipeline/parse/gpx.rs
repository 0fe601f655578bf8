use crate::error::ParseError;
use crate::pipeline::parse::Parser;
use crate::types::track::{ParsedTrack, RawTrackPoint, RawWaypoint};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

pub struct GpxParser;

enum Open {
    None,
    Waypoint(RawWaypoint),
    TrackPoint(RawTrackPoint),
}

impl Parser for GpxParser {
    fn parse(&self, bytes: &[u8]) -> Result<ParsedTrack, ParseError> {
        let mut reader = Reader::from_reader(bytes);
        reader.trim_text(true);

        let mut parsed = ParsedTrack::default();
        let mut saw_root = false;
        let mut skipped = 0usize;
        let mut open = Open::None;
        let mut current_element = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = local_name(&e)?;
                    match name.as_str() {
                        "gpx" => saw_root = true,
                        "wpt" => match read_lat_lon(&e)? {
                            Some((lat, lon)) => {
                                open = Open::Waypoint(RawWaypoint {
                                    lat,
                                    lon,
                                    ..Default::default()
                                })
                            }
                            None => skipped += 1,
                        },
                        "trkpt" => match read_lat_lon(&e)? {
                            Some((lat, lon)) => {
                                open = Open::TrackPoint(RawTrackPoint {
                                    lat,
                                    lon,
                                    elevation: None,
                                })
                            }
                            None => skipped += 1,
                        },
                        _ => current_element = name,
                    }
                }
                Ok(Event::Empty(e)) => {
                    let name = local_name(&e)?;
                    match name.as_str() {
                        "gpx" => saw_root = true,
                        "wpt" => {
                            if let Some((lat, lon)) = read_lat_lon(&e)? {
                                parsed.waypoints.push(RawWaypoint {
                                    lat,
                                    lon,
                                    ..Default::default()
                                });
                            } else {
                                skipped += 1;
                            }
                        }
                        "trkpt" => {
                            if let Some((lat, lon)) = read_lat_lon(&e)? {
                                parsed.track_points.push(RawTrackPoint {
                                    lat,
                                    lon,
                                    elevation: None,
                                });
                            } else {
                                skipped += 1;
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Text(e)) => {
                    if !matches!(open, Open::None) {
                        let text = e
                            .unescape()
                            .map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
                        apply_text(&mut open, &current_element, &text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if !matches!(open, Open::None) {
                        let raw = e.into_inner();
                        let text = std::str::from_utf8(&raw).map_err(|_| ParseError::InvalidUtf8)?;
                        apply_text(&mut open, &current_element, text);
                    }
                }
                Ok(Event::End(e)) => {
                    let name = e.local_name();
                    match name.as_ref() {
                        b"wpt" => {
                            if let Open::Waypoint(wpt) = std::mem::replace(&mut open, Open::None) {
                                parsed.waypoints.push(wpt);
                            }
                        }
                        b"trkpt" => {
                            if let Open::TrackPoint(pt) = std::mem::replace(&mut open, Open::None) {
                                parsed.track_points.push(pt);
                            }
                        }
                        _ => {}
                    }
                    current_element.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::InvalidGpx(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        if !saw_root {
            return Err(ParseError::InvalidGpx("missing <gpx> root element".to_string()));
        }
        if skipped > 0 {
            tracing::warn!("Skipped {} GPX points without usable coordinates", skipped);
        }

        Ok(parsed)
    }
}

fn local_name(e: &BytesStart<'_>) -> Result<String, ParseError> {
    let name = e.local_name();
    std::str::from_utf8(name.as_ref())
        .map(str::to_string)
        .map_err(|_| ParseError::InvalidUtf8)
}

fn read_lat_lon(e: &BytesStart<'_>) -> Result<Option<(f64, f64)>, ParseError> {
    let mut lat = None;
    let mut lon = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::InvalidGpx(e.to_string()))?;
        let value = std::str::from_utf8(&attr.value).map_err(|_| ParseError::InvalidUtf8)?;

        match attr.key.local_name().as_ref() {
            b"lat" => lat = value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            b"lon" => lon = value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => {}
        }
    }

    Ok(lat.zip(lon))
}

fn apply_text(open: &mut Open, element: &str, text: &str) {
    match open {
        Open::Waypoint(wpt) => {
            let slot = match element {
                "name" => &mut wpt.name,
                "desc" => &mut wpt.description,
                "type" => &mut wpt.kind,
                "image" => &mut wpt.image,
                "info" => &mut wpt.note,
                _ => return,
            };
            slot.get_or_insert_with(String::new).push_str(text);
        }
        Open::TrackPoint(pt) => {
            if element == "ele" {
                pt.elevation = text.trim().parse::<f64>().ok().filter(|v| v.is_finite());
            }
        }
        Open::None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<ParsedTrack, ParseError> {
        GpxParser.parse(xml.as_bytes())
    }

    #[test]
    fn reads_track_points_with_and_without_elevation() {
        let parsed = parse(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk><name>Loop</name><trkseg>
    <trkpt lat="41.6488" lon="-0.8891"><ele>199.5</ele></trkpt>
    <trkpt lat="41.6490" lon="-0.8885"></trkpt>
    <trkpt lat="41.6495" lon="-0.8880"/>
  </trkseg></trk>
</gpx>"#,
        )
        .expect("parse");

        assert_eq!(parsed.track_points.len(), 3);
        assert_eq!(parsed.track_points[0].elevation, Some(199.5));
        assert_eq!(parsed.track_points[1].elevation, None);
        assert_eq!(parsed.track_points[2].lon, -0.8880);
    }

    #[test]
    fn reads_waypoints_with_extension_fields() {
        let parsed = parse(
            r#"<gpx xmlns:wp="http://example.com/wp">
  <wpt lat="41.1790" lon="0.1766">
    <name>Fuente</name>
    <desc><![CDATA[Agua <b>potable</b>]]></desc>
    <type>water</type>
    <extensions><wp:image>img/fuente.jpg</wp:image><wp:info>Open all year</wp:info></extensions>
  </wpt>
  <wpt lat="41.2" lon="0.2"><name>Mirador</name></wpt>
</gpx>"#,
        )
        .expect("parse");

        assert_eq!(parsed.waypoints.len(), 2);
        let fuente = &parsed.waypoints[0];
        assert_eq!(fuente.name.as_deref(), Some("Fuente"));
        assert_eq!(fuente.description.as_deref(), Some("Agua <b>potable</b>"));
        assert_eq!(fuente.kind.as_deref(), Some("water"));
        assert_eq!(fuente.image.as_deref(), Some("img/fuente.jpg"));
        assert_eq!(fuente.note.as_deref(), Some("Open all year"));

        let mirador = &parsed.waypoints[1];
        assert_eq!(mirador.description, None);
        assert_eq!(mirador.image, None);
    }

    #[test]
    fn empty_track_is_valid() {
        let parsed = parse(r#"<gpx version="1.1"><trk><trkseg></trkseg></trk></gpx>"#).expect("parse");
        assert!(parsed.track_points.is_empty());
        assert!(parsed.waypoints.is_empty());
    }

    #[test]
    fn points_without_coordinates_are_skipped() {
        let parsed = parse(
            r#"<gpx><trk><trkseg>
    <trkpt lat="abc" lon="1.0"><ele>5</ele></trkpt>
    <trkpt lat="1.0" lon="1.0"><ele>6</ele></trkpt>
</trkseg></trk></gpx>"#,
        )
        .expect("parse");
        assert_eq!(parsed.track_points.len(), 1);
        assert_eq!(parsed.track_points[0].elevation, Some(6.0));
    }

    #[test]
    fn rejects_documents_that_are_not_gpx() {
        assert!(matches!(parse("just some text"), Err(ParseError::InvalidGpx(_))));
        assert!(matches!(parse("<kml></kml>"), Err(ParseError::InvalidGpx(_))));
    }

    #[test]
    fn rejects_mismatched_tags() {
        assert!(parse("<gpx><trk></gpx>").is_err());
    }
}
