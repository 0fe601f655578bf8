//! The boundary to external display surfaces: marker, info panel, chart highlight.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::types::readout::{CursorReading, ReadoutPanel};
use crate::types::track::PlanarPoint;

/// Receives already-computed values. Implementations must not block.
pub trait ReadoutSink: Send + Sync {
    fn place_marker(&self, coordinate: PlanarPoint);

    fn show_readout_panel(
        &self,
        coordinate: PlanarPoint,
        elevation_meters: f64,
        slope_percent: f64,
        traveled_km: f64,
        remaining_km: f64,
    );

    fn highlight_chart_index(&self, index: usize);
}

/// Marker and panel for one reading.
pub fn publish_reading(sink: &dyn ReadoutSink, reading: &CursorReading) {
    sink.place_marker(reading.coordinate);
    sink.show_readout_panel(
        reading.coordinate,
        reading.elevation_meters,
        reading.slope_percent,
        reading.traveled_km,
        reading.remaining_km,
    );
}

/// Remembers the last highlighted chart index so repeated indices don't redraw the chart.
/// Purely a redraw optimization.
#[derive(Debug, Default)]
pub struct ChartHighlight {
    last: Option<usize>,
}

impl ChartHighlight {
    pub fn highlight(&mut self, sink: &dyn ReadoutSink, index: usize) -> bool {
        if self.last == Some(index) {
            return false;
        }
        self.last = Some(index);
        sink.highlight_chart_index(index);
        true
    }

    pub fn last(&self) -> Option<usize> {
        self.last
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReadoutEvent {
    Marker {
        coordinate: PlanarPoint,
    },
    #[serde(rename_all = "camelCase")]
    Panel {
        coordinate: PlanarPoint,
        elevation_meters: f64,
        slope_percent: f64,
        traveled_km: f64,
        remaining_km: f64,
        display: ReadoutPanel,
    },
    ChartHighlight {
        index: usize,
    },
}

impl ReadoutEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ReadoutEvent::Marker { .. } => "marker",
            ReadoutEvent::Panel { .. } => "panel",
            ReadoutEvent::ChartHighlight { .. } => "chart_highlight",
        }
    }
}

/// Fans events out to every subscriber of a broadcast channel.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<ReadoutEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReadoutEvent> {
        self.tx.subscribe()
    }

    fn send(&self, event: ReadoutEvent) {
        // no subscribers is fine
        let _ = self.tx.send(event);
    }
}

impl ReadoutSink for BroadcastSink {
    fn place_marker(&self, coordinate: PlanarPoint) {
        self.send(ReadoutEvent::Marker { coordinate });
    }

    fn show_readout_panel(
        &self,
        coordinate: PlanarPoint,
        elevation_meters: f64,
        slope_percent: f64,
        traveled_km: f64,
        remaining_km: f64,
    ) {
        let reading = CursorReading {
            coordinate,
            elevation_meters,
            slope_percent,
            traveled_km,
            remaining_km,
            segment_index: 0,
        };
        self.send(ReadoutEvent::Panel {
            coordinate,
            elevation_meters,
            slope_percent,
            traveled_km,
            remaining_km,
            display: ReadoutPanel::format(&reading),
        });
    }

    fn highlight_chart_index(&self, index: usize) {
        self.send(ReadoutEvent::ChartHighlight { index });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Recorded {
        Marker(PlanarPoint),
        Panel {
            coordinate: PlanarPoint,
            elevation_meters: f64,
            slope_percent: f64,
            traveled_km: f64,
            remaining_km: f64,
        },
        Highlight(usize),
    }

    /// Test double that records every call in order.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        calls: Mutex<Vec<Recorded>>,
    }

    impl RecordingSink {
        pub fn calls(&self) -> Vec<Recorded> {
            self.calls.lock().expect("lock").clone()
        }

        pub fn markers(&self) -> Vec<PlanarPoint> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Recorded::Marker(p) => Some(p),
                    _ => None,
                })
                .collect()
        }

        pub fn panels(&self) -> Vec<(f64, f64, f64, f64)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Recorded::Panel {
                        elevation_meters,
                        slope_percent,
                        traveled_km,
                        remaining_km,
                        ..
                    } => Some((elevation_meters, slope_percent, traveled_km, remaining_km)),
                    _ => None,
                })
                .collect()
        }

        pub fn highlights(&self) -> Vec<usize> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    Recorded::Highlight(i) => Some(i),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.calls.lock().expect("lock").clear();
        }
    }

    impl ReadoutSink for RecordingSink {
        fn place_marker(&self, coordinate: PlanarPoint) {
            self.calls.lock().expect("lock").push(Recorded::Marker(coordinate));
        }

        fn show_readout_panel(
            &self,
            coordinate: PlanarPoint,
            elevation_meters: f64,
            slope_percent: f64,
            traveled_km: f64,
            remaining_km: f64,
        ) {
            self.calls.lock().expect("lock").push(Recorded::Panel {
                coordinate,
                elevation_meters,
                slope_percent,
                traveled_km,
                remaining_km,
            });
        }

        fn highlight_chart_index(&self, index: usize) {
            self.calls.lock().expect("lock").push(Recorded::Highlight(index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn chart_highlight_skips_repeated_index() {
        let sink = RecordingSink::default();
        let mut chart = ChartHighlight::default();

        assert!(chart.highlight(&sink, 3));
        assert!(!chart.highlight(&sink, 3));
        assert!(chart.highlight(&sink, 4));
        assert!(chart.highlight(&sink, 3));

        assert_eq!(sink.highlights(), vec![3, 4, 3]);
        assert_eq!(chart.last(), Some(3));
    }

    #[test]
    fn publish_reading_places_marker_then_panel() {
        let sink = RecordingSink::default();
        let reading = CursorReading {
            coordinate: PlanarPoint::new(10.0, 20.0),
            elevation_meters: 100.0,
            slope_percent: 2.5,
            traveled_km: 1.0,
            remaining_km: 4.0,
            segment_index: 7,
        };
        publish_reading(&sink, &reading);

        assert_eq!(sink.markers(), vec![PlanarPoint::new(10.0, 20.0)]);
        assert_eq!(sink.panels(), vec![(100.0, 2.5, 1.0, 4.0)]);
        assert!(sink.highlights().is_empty());
    }

    #[tokio::test]
    async fn broadcast_sink_reaches_every_subscriber() {
        let sink = BroadcastSink::new(16);
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();

        sink.highlight_chart_index(5);
        sink.place_marker(PlanarPoint::new(1.0, 2.0));

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.expect("event"), ReadoutEvent::ChartHighlight { index: 5 });
            assert_eq!(
                rx.recv().await.expect("event"),
                ReadoutEvent::Marker {
                    coordinate: PlanarPoint::new(1.0, 2.0)
                }
            );
        }
    }

    #[test]
    fn panel_event_serializes_with_display_strings() {
        let sink = BroadcastSink::new(4);
        let mut rx = sink.subscribe();
        sink.show_readout_panel(PlanarPoint::new(0.0, 0.0), 250.4, 6.04, 0.0, 12.346);

        let event = rx.try_recv().expect("event");
        assert_eq!(event.name(), "panel");
        let json = serde_json::to_value(&event).expect("json");
        assert_eq!(json["type"], "panel");
        assert_eq!(json["display"]["elevation"], "250");
        assert_eq!(json["display"]["remaining"], "12.35");
    }
}
