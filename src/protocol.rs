//! Request/response interface between a UI layer and a [`TrackSession`].
//!
//! Messages are plain serde enums so any transport (channels, IPC, a
//! webview bridge) can carry them. [`TrackSession::handle_json`] is the
//! string-in/string-out form for transports that only move text.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    ChartData, CutPoint, Feature, FeatureCollection, LineStyle, Overview, Split, TrackError,
    TrackSession, TrackStyling,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Request {
    /// Load a converted track file
    SendTrack { path: String, track: FeatureCollection },
    /// Load a converted course file
    SendCourse { path: String, course: FeatureCollection },
    RemoveTrack { name: String },
    RequestTracks,
    ActiveTrack { name: String },
    RequestCourses,
    /// Select a course, or deselect with `None`
    ActiveCourse { name: Option<String> },
    SendStyle { style: LineStyle },
    RequestClosestPoints,
    RequestOverview,
    RequestChart,
    RequestSplits,
    RequestStyles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Response {
    Tracks {
        tracks: Vec<FeatureCollection>,
        active: Option<String>,
    },
    Courses {
        courses: Vec<Feature>,
        active: Option<String>,
    },
    ClosestPoints { points: Vec<CutPoint> },
    Overview { overview: Option<Overview> },
    Chart { chart: Option<ChartData> },
    Splits { splits: Option<Vec<Split>> },
    Styles { styles: Vec<TrackStyling> },
    Ack,
    Error { message: String },
}

impl From<TrackError> for Response {
    fn from(err: TrackError) -> Self {
        Response::Error {
            message: err.to_string(),
        }
    }
}

impl TrackSession {
    fn tracks_response(&self) -> Response {
        Response::Tracks {
            tracks: self
                .tracks()
                .iter()
                .map(|t| t.to_feature_collection())
                .collect(),
            active: self.active_track().map(|t| t.name().to_string()),
        }
    }

    fn courses_response(&self) -> Response {
        Response::Courses {
            courses: self.courses().iter().map(|c| c.to_feature()).collect(),
            active: self.active_course().map(|c| c.name.clone()),
        }
    }

    fn dispatch(&mut self, request: Request) -> crate::Result<Response> {
        let response = match request {
            Request::SendTrack { path, track } => {
                self.load_track(&track, &path)?;
                self.tracks_response()
            }
            Request::SendCourse { path, course } => {
                self.load_courses(&course, &path)?;
                self.courses_response()
            }
            Request::RemoveTrack { name } => {
                self.remove_track(&name)?;
                self.tracks_response()
            }
            Request::RequestTracks => self.tracks_response(),
            Request::ActiveTrack { name } => {
                self.set_active_track(&name)?;
                Response::Ack
            }
            Request::RequestCourses => self.courses_response(),
            Request::ActiveCourse { name: Some(name) } => {
                self.set_active_course(&name)?;
                Response::Ack
            }
            Request::ActiveCourse { name: None } => {
                self.clear_active_course();
                Response::Ack
            }
            Request::SendStyle { style } => {
                self.set_line_style(style);
                Response::Styles {
                    styles: self.track_styles(),
                }
            }
            Request::RequestClosestPoints => Response::ClosestPoints {
                points: self.closest_points(),
            },
            Request::RequestOverview => Response::Overview {
                overview: self.overview(),
            },
            Request::RequestChart => Response::Chart {
                chart: self.chart_data()?,
            },
            Request::RequestSplits => Response::Splits {
                splits: self.splits()?,
            },
            Request::RequestStyles => Response::Styles {
                styles: self.track_styles(),
            },
        };
        Ok(response)
    }

    /// Apply a request. Failures come back as [`Response::Error`].
    pub fn handle(&mut self, request: Request) -> Response {
        self.dispatch(request).unwrap_or_else(|err| {
            warn!("[Session] Request failed: {}", err);
            err.into()
        })
    }

    /// [`TrackSession::handle`] over JSON text.
    pub fn handle_json(&mut self, json: &str) -> String {
        let response = match serde_json::from_str::<Request>(json) {
            Ok(request) => self.handle(request),
            Err(err) => TrackError::from(err).into(),
        };
        serde_json::to_string(&response).unwrap_or_else(|err| {
            serde_json::json!({"type": "error", "payload": {"message": err.to_string()}})
                .to_string()
        })
    }
}
