//! Proximity-clustering threat classifier.
//!
//! The classifier gates on the depth of the [`TemporalHistory`] window and
//! then inspects a single entry: the most recent one holding enough markers.
//! Within that entry the first marker (in extraction order) with enough
//! close neighbours triggers a detection.  The search stops there; it never
//! looks for a larger or tighter cluster.
//!
//! # Example
//!
//! ```rust
//! use sentinel_perception::{Classification, ClusterThreatClassifier, TemporalHistory};
//! use sentinel_types::Marker;
//!
//! let classifier = ClusterThreatClassifier::default();
//! let mut history = TemporalHistory::default();
//! for frame in 0..5 {
//!     history.push(vec![
//!         Marker::new(100, 100, 8, frame),
//!         Marker::new(140, 110, 8, frame),
//!         Marker::new(120, 150, 8, frame),
//!     ]);
//! }
//! let outcome = classifier.evaluate(&history, 640, 480);
//! assert!(outcome.detected());
//! ```

use std::sync::Arc;

use sentinel_types::{ArtifactKind, ArtifactSink, BoundingBox, Frame, Marker, ThreatRegion};
use tracing::{debug, info, warn};

use crate::annotate::annotate_threat;
use crate::history::TemporalHistory;

/// Tuning for [`ClusterThreatClassifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    /// Entries the history must hold before anything is checked.
    pub min_history: usize,
    /// Markers an entry needs to count as a group.
    pub min_group_size: usize,
    /// Groups the window must contain.
    pub min_groups: usize,
    /// Two markers are neighbours when strictly closer than this (px).
    pub neighbor_radius: f64,
    /// Neighbours a marker needs to trigger a detection.
    pub min_neighbors: usize,
    /// Padding around the cluster box (px), before clamping to the frame.
    pub padding: i32,
    pub label: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_history: 5,
            min_group_size: 3,
            min_groups: 5,
            neighbor_radius: 100.0,
            min_neighbors: 2,
            padding: 20,
            label: "THREAT DETECTED".to_string(),
        }
    }
}

/// Why no cluster check was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InsufficientHistory { entries: usize, required: usize },
    InsufficientGroups { groups: usize, required: usize },
}

/// Outcome of one classification call.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Gating failed; the cluster check did not run.
    Skipped(SkipReason),
    /// The check ran and found no cluster.
    Clear,
    Threat(ThreatRegion),
}

impl Classification {
    pub fn detected(&self) -> bool {
        matches!(self, Classification::Threat(_))
    }

    pub fn region(&self) -> Option<&ThreatRegion> {
        match self {
            Classification::Threat(region) => Some(region),
            _ => None,
        }
    }

    /// `(detected, region)` pair.
    pub fn into_parts(self) -> (bool, Option<ThreatRegion>) {
        match self {
            Classification::Threat(region) => (true, Some(region)),
            _ => (false, None),
        }
    }
}

/// Classification plus the annotated frame produced on detection.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub classification: Classification,
    pub annotated: Option<Frame>,
}

/// Flags clusters of nearby markers as threats.
///
/// On detection, [`classify`](Self::classify) annotates the frame and hands
/// it to the injected on-detect sink (if any) under a
/// `threat_detected_{timestamp}.jpg` name.
#[derive(Clone, Default)]
pub struct ClusterThreatClassifier {
    config: ClassifierConfig,
    sink: Option<Arc<dyn ArtifactSink>>,
}

impl ClusterThreatClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config, sink: None }
    }

    /// Attach the on-detect artifact sink.
    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Pure classification of `history` for a `width × height` frame.
    pub fn evaluate(&self, history: &TemporalHistory, width: u32, height: u32) -> Classification {
        let cfg = &self.config;
        if history.len() < cfg.min_history {
            return Classification::Skipped(SkipReason::InsufficientHistory {
                entries: history.len(),
                required: cfg.min_history,
            });
        }

        let groups: Vec<&[Marker]> = history
            .iter()
            .filter(|entry| entry.len() >= cfg.min_group_size)
            .collect();
        let Some(latest) = groups.last().filter(|_| groups.len() >= cfg.min_groups) else {
            return Classification::Skipped(SkipReason::InsufficientGroups {
                groups: groups.len(),
                required: cfg.min_groups,
            });
        };

        for (i, marker) in latest.iter().enumerate() {
            let nearby: Vec<Marker> = latest
                .iter()
                .enumerate()
                .filter(|&(j, other)| j != i && marker.distance_to(other) < cfg.neighbor_radius)
                .map(|(_, other)| *other)
                .collect();
            if nearby.len() < cfg.min_neighbors {
                continue;
            }

            let mut members = Vec::with_capacity(nearby.len() + 1);
            members.push(*marker);
            members.extend(nearby);
            let Some(tight) = BoundingBox::covering(members.iter().map(Marker::position)) else {
                continue;
            };
            return Classification::Threat(ThreatRegion {
                bounds: tight.padded_within(cfg.padding, width, height),
                members,
            });
        }
        Classification::Clear
    }

    /// Classify `history` against the frame it was last updated from.
    ///
    /// On detection the returned [`Assessment`] carries the annotated copy of
    /// `frame`, which has also been offered to the on-detect sink.  Sink
    /// failures are logged and do not change the outcome.
    pub fn classify(&self, history: &TemporalHistory, frame: &Frame) -> Assessment {
        let classification = self.evaluate(history, frame.width(), frame.height());
        let annotated = match classification.region() {
            Some(region) => Some(self.on_detect(frame, region)),
            None => {
                debug!(outcome = ?classification, "no threat");
                None
            }
        };
        Assessment {
            classification,
            annotated,
        }
    }

    fn on_detect(&self, frame: &Frame, region: &ThreatRegion) -> Frame {
        info!(
            camera = %frame.source(),
            markers = region.members.len(),
            min_x = region.bounds.min_x,
            min_y = region.bounds.min_y,
            max_x = region.bounds.max_x,
            max_y = region.bounds.max_y,
            "threat detected"
        );
        let annotated = annotate_threat(frame, &region.bounds, &self.config.label);
        if let Some(sink) = &self.sink {
            let name = ArtifactKind::ThreatDetected.artifact_name(frame.captured_at(), None);
            if let Err(e) = sink.persist(&name, &annotated) {
                warn!(artifact = %name, error = %e, "could not persist threat artifact");
            }
        }
        annotated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use image::RgbImage;
    use sentinel_types::{CameraSource, SentinelError};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        names: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ArtifactSink for RecordingSink {
        fn persist(&self, name: &str, _frame: &Frame) -> Result<(), SentinelError> {
            if self.fail {
                return Err(SentinelError::Persistence {
                    name: name.to_string(),
                    details: "disk full".to_string(),
                });
            }
            self.names.lock().unwrap().push(name.to_string());
            Ok(())
        }
    }

    fn cluster(frame: u64) -> Vec<Marker> {
        vec![
            Marker::new(10, 10, 8, frame),
            Marker::new(50, 20, 8, frame),
            Marker::new(30, 60, 8, frame),
        ]
    }

    fn history_of(entries: Vec<Vec<Marker>>) -> TemporalHistory {
        let mut h = TemporalHistory::default();
        for e in entries {
            h.push(e);
        }
        h
    }

    fn frame() -> Frame {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        Frame::new(RgbImage::new(640, 480), CameraSource::FrontLeftFisheye, ts)
    }

    #[test]
    fn short_history_is_skipped_regardless_of_content() {
        let h = history_of((0..4).map(cluster).collect());
        assert_eq!(
            ClusterThreatClassifier::default().evaluate(&h, 640, 480),
            Classification::Skipped(SkipReason::InsufficientHistory {
                entries: 4,
                required: 5
            })
        );
    }

    #[test]
    fn too_few_groups_is_skipped() {
        let mut entries: Vec<Vec<Marker>> = (0..4).map(cluster).collect();
        entries.push(vec![Marker::new(0, 0, 6, 4)]);
        entries.push(Vec::new());
        let h = history_of(entries);
        assert_eq!(
            ClusterThreatClassifier::default().evaluate(&h, 640, 480),
            Classification::Skipped(SkipReason::InsufficientGroups {
                groups: 4,
                required: 5
            })
        );
    }

    #[test]
    fn tight_cluster_is_a_threat_with_padded_clamped_box() {
        let h = history_of((0..5).map(cluster).collect());
        let outcome = ClusterThreatClassifier::default().evaluate(&h, 640, 480);
        let region = outcome.region().unwrap();
        assert_eq!(
            region.bounds,
            BoundingBox {
                min_x: 0,
                min_y: 0,
                max_x: 70,
                max_y: 80
            }
        );
        assert_eq!(region.members.len(), 3);
        assert_eq!(region.members[0].position(), (10, 10));
    }

    #[test]
    fn box_is_clamped_to_frame_size() {
        let near_corner = |f| {
            vec![
                Marker::new(630, 470, 8, f),
                Marker::new(600, 460, 8, f),
                Marker::new(620, 440, 8, f),
            ]
        };
        let h = history_of((0..5).map(near_corner).collect());
        let region = ClusterThreatClassifier::default()
            .evaluate(&h, 640, 480)
            .into_parts()
            .1
            .unwrap();
        assert_eq!(region.bounds.max_x, 640);
        assert_eq!(region.bounds.max_y, 480);
        assert_eq!(region.bounds.min_x, 580);
        assert_eq!(region.bounds.min_y, 420);
    }

    #[test]
    fn scattered_markers_are_clear() {
        let scattered = |f| {
            vec![
                Marker::new(0, 0, 8, f),
                Marker::new(300, 0, 8, f),
                Marker::new(0, 300, 8, f),
            ]
        };
        let h = history_of((0..5).map(scattered).collect());
        assert_eq!(
            ClusterThreatClassifier::default().evaluate(&h, 640, 480),
            Classification::Clear
        );
    }

    #[test]
    fn neighbour_distance_is_strict() {
        let spaced = |f| {
            vec![
                Marker::new(100, 100, 8, f),
                Marker::new(200, 100, 8, f),
                Marker::new(100, 200, 8, f),
            ]
        };
        let h = history_of((0..5).map(spaced).collect());
        assert!(!ClusterThreatClassifier::default().evaluate(&h, 640, 480).detected());
    }

    #[test]
    fn first_qualifying_marker_wins() {
        // Marker 0 has one neighbour; marker 1 has two and triggers, even
        // though the cluster around marker 3 is larger.
        let entry = |f| {
            vec![
                Marker::new(0, 0, 8, f),
                Marker::new(60, 0, 8, f),
                Marker::new(120, 0, 8, f),
                Marker::new(400, 400, 8, f),
                Marker::new(410, 400, 8, f),
                Marker::new(400, 410, 8, f),
                Marker::new(410, 410, 8, f),
            ]
        };
        let h = history_of((0..5).map(entry).collect());
        let region = ClusterThreatClassifier::default()
            .evaluate(&h, 640, 480)
            .into_parts()
            .1
            .unwrap();
        assert_eq!(region.members[0].position(), (60, 0));
        assert_eq!(region.members.len(), 3);
    }

    #[test]
    fn only_latest_qualifying_entry_is_checked() {
        let mut entries: Vec<Vec<Marker>> = (0..4).map(cluster).collect();
        entries.push(vec![
            Marker::new(0, 0, 8, 4),
            Marker::new(300, 0, 8, 4),
            Marker::new(0, 300, 8, 4),
        ]);
        // Too small to be a group; ignored.
        entries.push(vec![Marker::new(5, 5, 8, 5)]);
        let h = history_of(entries);
        assert_eq!(
            ClusterThreatClassifier::default().evaluate(&h, 640, 480),
            Classification::Clear
        );
    }

    #[test]
    fn detection_persists_annotated_frame_through_sink() {
        let sink = Arc::new(RecordingSink::default());
        let classifier = ClusterThreatClassifier::default().with_sink(sink.clone());
        let h = history_of((0..5).map(cluster).collect());

        let assessment = classifier.classify(&h, &frame());
        assert!(assessment.classification.detected());
        assert!(assessment.annotated.is_some());
        assert_eq!(
            *sink.names.lock().unwrap(),
            vec!["threat_detected_20240309-140507.jpg".to_string()]
        );
    }

    #[test]
    fn no_detection_leaves_sink_untouched() {
        let sink = Arc::new(RecordingSink::default());
        let classifier = ClusterThreatClassifier::default().with_sink(sink.clone());
        let h = history_of((0..3).map(cluster).collect());

        let assessment = classifier.classify(&h, &frame());
        assert!(!assessment.classification.detected());
        assert!(assessment.annotated.is_none());
        assert!(sink.names.lock().unwrap().is_empty());
    }

    #[test]
    fn sink_failure_does_not_mask_detection() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let classifier = ClusterThreatClassifier::default().with_sink(sink);
        let h = history_of((0..5).map(cluster).collect());
        assert!(classifier.classify(&h, &frame()).classification.detected());
    }
}
