//! Landmark descriptor builder.
//!
//! Converts a face bounding box plus five named landmark positions into
//! the fixed 16-value descriptor documented on [`Descriptor`]. Coordinates
//! are normalized relative to the box, which makes the descriptor
//! invariant to face scale and position in the frame but sensitive to
//! aspect distortion of the box itself (an accepted limitation of this
//! coarse geometric feature).

use crate::types::{Descriptor, FaceBox, Landmarks};

/// Build a descriptor for one detected face.
///
/// Returns `None` when the box has non-positive width or height, or when
/// any of the five landmarks is missing. Pure function of its inputs.
pub fn landmark_descriptor(bbox: &FaceBox, landmarks: &Landmarks) -> Option<Descriptor> {
    if bbox.width <= 0.0 || bbox.height <= 0.0 {
        return None;
    }

    let left_eye = landmarks.left_eye?;
    let right_eye = landmarks.right_eye?;
    let nose = landmarks.nose_base?;
    let mouth_left = landmarks.mouth_left?;
    let mouth_right = landmarks.mouth_right?;

    let relative = |(x, y): (f32, f32)| {
        (
            (x - bbox.left) / bbox.width.max(1.0),
            (y - bbox.top) / bbox.height.max(1.0),
        )
    };

    let (lex, ley) = relative(left_eye);
    let (rex, rey) = relative(right_eye);
    let (nx, ny) = relative(nose);
    let (lmx, lmy) = relative(mouth_left);
    let (rmx, rmy) = relative(mouth_right);

    let eye_dist = dist((lex, ley), (rex, rey));
    let eye_nose_l = dist((lex, ley), (nx, ny));
    let eye_nose_r = dist((rex, rey), (nx, ny));
    let mouth_width = dist((lmx, lmy), (rmx, rmy));
    let nose_mouth_l = dist((nx, ny), (lmx, lmy));
    let nose_mouth_r = dist((nx, ny), (rmx, rmy));

    let mut values = [
        lex, ley, rex, rey, nx, ny, lmx, lmy, rmx, rmy,
        eye_dist, eye_nose_l, eye_nose_r, mouth_width, nose_mouth_l, nose_mouth_r,
    ];

    // L2-normalize; an exactly-zero vector is returned unchanged.
    let norm: f32 = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }

    Some(Descriptor { values })
}

fn dist(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}
