//! mien-core — landmark face descriptors and gallery matching.
//!
//! Turns five-point facial landmarks into a fixed 16-value normalized
//! descriptor and matches descriptors against a gallery of enrolled
//! identities via cosine similarity. Pure math: face detection and camera
//! capture belong to the surrounding application, which feeds this crate
//! one [`DetectedFace`] at a time.

pub mod descriptor;
pub mod matcher;
pub mod types;

pub use descriptor::landmark_descriptor;
pub use matcher::{BestSampleMatcher, MatchResult, Matcher, MATCH_THRESHOLD};
pub use types::{Descriptor, DetectedFace, FaceBox, Identity, Landmarks, DESCRIPTOR_DIM};
