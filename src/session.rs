//! # Track Session
//!
//! Explicit store for everything the UI layer has loaded: tracks, courses,
//! which of them are active, and the line style. Every analytics entry point
//! reads the active pair from here and returns freshly derived values; no
//! derived state is kept between calls.
//!
//! Nothing active is not an error: operations that need an active track or
//! course return `None` or an empty list.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geojson::file_stem;
use crate::{
    course_splits, distance_splits, match_controls, style_trace, AnalysisConfig, Bounds, ChartData,
    Course, CourseSummary, CutPoint, FeatureCollection, GeoTrace, LineStyle, Result, Split,
    TrackError, TrackStyling, TrackSummary,
};

/// Summary panel contents for the active track and course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub track: TrackSummary,
    pub course: Option<CourseSummary>,
    pub style: LineStyle,
    /// Map view fit: the track plus the active course's controls
    pub bounds: Bounds,
}

/// Loaded tracks and courses plus the active selection.
#[derive(Debug, Clone, Default)]
pub struct TrackSession {
    // Load order is display order
    tracks: Vec<GeoTrace>,
    courses: Vec<Course>,

    active_track: Option<String>,
    active_course: Option<String>,
    style: LineStyle,

    config: AnalysisConfig,
}

impl TrackSession {
    /// Create an empty session with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    // ========================================================================
    // Tracks
    // ========================================================================

    /// Parse and load a track; it becomes the active track.
    ///
    /// `source_path` names the track when the feature has no name.
    pub fn load_track(
        &mut self,
        collection: &FeatureCollection,
        source_path: &str,
    ) -> Result<&GeoTrace> {
        let trace = GeoTrace::from_feature_collection_with_window(
            collection,
            &file_stem(source_path),
            self.config.speed_window,
        )?;
        self.add_track(trace)
    }

    /// Add an already built trace; it becomes the active track.
    ///
    /// Fails with [`TrackError::DuplicateName`] without touching the session
    /// when a track of the same name is loaded.
    pub fn add_track(&mut self, trace: GeoTrace) -> Result<&GeoTrace> {
        if self.track(trace.name()).is_some() {
            warn!("[Session] Rejected duplicate track '{}'", trace.name());
            return Err(TrackError::DuplicateName {
                kind: "track",
                name: trace.name().to_string(),
            });
        }

        info!(
            "[Session] Loaded track '{}' ({} points)",
            trace.name(),
            trace.len()
        );
        self.active_track = Some(trace.name().to_string());
        self.tracks.push(trace);
        // Just pushed
        Ok(&self.tracks[self.tracks.len() - 1])
    }

    /// Unload a track. The first remaining track becomes active.
    pub fn remove_track(&mut self, name: &str) -> Result<()> {
        let idx = self
            .tracks
            .iter()
            .position(|t| t.name() == name)
            .ok_or_else(|| TrackError::UnknownTrack {
                name: name.to_string(),
            })?;
        self.tracks.remove(idx);
        self.active_track = self.tracks.first().map(|t| t.name().to_string());

        info!(
            "[Session] Removed track '{}', {} remaining",
            name,
            self.tracks.len()
        );
        Ok(())
    }

    pub fn set_active_track(&mut self, name: &str) -> Result<()> {
        if self.track(name).is_none() {
            return Err(TrackError::UnknownTrack {
                name: name.to_string(),
            });
        }
        debug!("[Session] Active track '{}'", name);
        self.active_track = Some(name.to_string());
        Ok(())
    }

    pub fn track(&self, name: &str) -> Option<&GeoTrace> {
        self.tracks.iter().find(|t| t.name() == name)
    }

    pub fn tracks(&self) -> &[GeoTrace] {
        &self.tracks
    }

    pub fn active_track(&self) -> Option<&GeoTrace> {
        self.active_track.as_deref().and_then(|name| self.track(name))
    }

    // ========================================================================
    // Courses
    // ========================================================================

    /// Load every course of a course file; the last one becomes active.
    ///
    /// All-or-nothing: if any course name is already taken, nothing is
    /// loaded. Returns the number of courses added.
    pub fn load_courses(
        &mut self,
        collection: &FeatureCollection,
        source_path: &str,
    ) -> Result<usize> {
        let courses = Course::from_feature_collection(collection, &file_stem(source_path))?;

        for (i, course) in courses.iter().enumerate() {
            let taken_in_file = courses[..i].iter().any(|c| c.name == course.name);
            if taken_in_file || self.course(&course.name).is_some() {
                warn!("[Session] Rejected duplicate course '{}'", course.name);
                return Err(TrackError::DuplicateName {
                    kind: "course",
                    name: course.name.clone(),
                });
            }
        }

        let count = courses.len();
        if let Some(last) = courses.last() {
            self.active_course = Some(last.name.clone());
        }
        self.courses.extend(courses);

        info!("[Session] Loaded {} courses from '{}'", count, source_path);
        Ok(count)
    }

    pub fn set_active_course(&mut self, name: &str) -> Result<()> {
        if self.course(name).is_none() {
            return Err(TrackError::UnknownCourse {
                name: name.to_string(),
            });
        }
        debug!("[Session] Active course '{}'", name);
        self.active_course = Some(name.to_string());
        Ok(())
    }

    /// Deselect the course; splits fall back to distance mode.
    pub fn clear_active_course(&mut self) {
        self.active_course = None;
    }

    pub fn course(&self, name: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.name == name)
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn active_course(&self) -> Option<&Course> {
        self.active_course
            .as_deref()
            .and_then(|name| self.course(name))
    }

    // ========================================================================
    // Styling
    // ========================================================================

    pub fn set_line_style(&mut self, style: LineStyle) {
        debug!("[Session] Line style '{}'", style);
        self.style = style;
    }

    pub fn line_style(&self) -> LineStyle {
        self.style
    }

    /// Every loaded track colored with the active line style.
    pub fn track_styles(&self) -> Vec<TrackStyling> {
        self.tracks
            .iter()
            .map(|t| style_trace(t, self.style, &self.config))
            .collect()
    }

    // ========================================================================
    // Analytics
    // ========================================================================

    pub fn overview(&self) -> Option<Overview> {
        let track = self.active_track()?;
        let course = self.active_course();

        let mut bounds = track.bounds();
        for control in course.iter().flat_map(|c| &c.controls) {
            bounds.include(control);
        }

        Some(Overview {
            track: TrackSummary::from_trace(track),
            course: course.map(CourseSummary::from_course),
            style: self.style,
            bounds,
        })
    }

    pub fn chart_data(&self) -> Result<Option<ChartData>> {
        self.active_track()
            .map(|track| ChartData::from_trace(track, &self.config))
            .transpose()
    }

    /// Active course controls matched onto the active track.
    pub fn closest_points(&self) -> Vec<CutPoint> {
        match (self.active_track(), self.active_course()) {
            (Some(track), Some(course)) => match_controls(track, &course.controls),
            _ => Vec::new(),
        }
    }

    /// Splits of the active track: course-bounded when a course is active,
    /// fixed-distance otherwise.
    pub fn splits(&self) -> Result<Option<Vec<Split>>> {
        let Some(track) = self.active_track() else {
            return Ok(None);
        };

        let splits = match self.active_course() {
            Some(course) => {
                let cuts = match_controls(track, &course.controls);
                course_splits(track, &cuts, &self.config)?
            }
            None => distance_splits(track, self.config.split_distance_km)?,
        };
        Ok(Some(splits))
    }

    /// Summaries of every loaded track, in load order.
    #[cfg(not(feature = "parallel"))]
    pub fn summaries(&self) -> Vec<TrackSummary> {
        self.tracks.iter().map(TrackSummary::from_trace).collect()
    }

    /// Summaries of every loaded track, in load order.
    #[cfg(feature = "parallel")]
    pub fn summaries(&self) -> Vec<TrackSummary> {
        self.tracks.par_iter().map(TrackSummary::from_trace).collect()
    }
}
