use serde::{Deserialize, Serialize};

/// Number of values in a face descriptor: 10 normalized landmark
/// coordinates plus 6 pairwise distances.
pub const DESCRIPTOR_DIM: usize = 16;

/// Axis-aligned bounding rectangle of a detected face, in source-frame
/// pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// Five-point facial landmarks in source-frame pixel coordinates.
///
/// Any point may be missing for a given face (occlusion, poor angle,
/// detector confidence failure). A missing landmark is a normal per-frame
/// outcome, not an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Landmarks {
    pub left_eye: Option<(f32, f32)>,
    pub right_eye: Option<(f32, f32)>,
    pub nose_base: Option<(f32, f32)>,
    pub mouth_left: Option<(f32, f32)>,
    pub mouth_right: Option<(f32, f32)>,
}

/// One detected face as delivered by the external detector per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub bbox: FaceBox,
    pub landmarks: Landmarks,
}

/// Fixed-length face descriptor derived from landmark geometry.
///
/// Layout (positional — similarity comparison is by index, not by name):
/// indices 0..10 are the box-normalized coordinates
/// `[lex, ley, rex, rey, nx, ny, lmx, lmy, rmx, rmy]` for left eye, right
/// eye, nose base, left mouth corner, right mouth corner; indices 10..16
/// are the pairwise distances `[eye-eye, left-eye-nose, right-eye-nose,
/// mouth-mouth, nose-left-mouth, nose-right-mouth]`.
///
/// Always L2-normalized, except for the degenerate all-zero vector which
/// is stored as-is. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub values: [f32; DESCRIPTOR_DIM],
}

impl Descriptor {
    /// Build a descriptor from a slice; `None` unless it has exactly
    /// [`DESCRIPTOR_DIM`] values.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let values: [f32; DESCRIPTOR_DIM] = values.try_into().ok()?;
        Some(Self { values })
    }

    /// Compute cosine similarity between two descriptors.
    ///
    /// Returns a value in [-1, 1]; higher = more similar. Returns 0 when
    /// either vector has zero norm (no meaningful signal rather than an
    /// error).
    pub fn similarity(&self, other: &Descriptor) -> f32 {
        let mut dot = 0.0f32;
        let mut norm_a = 0.0f32;
        let mut norm_b = 0.0f32;

        for (a, b) in self.values.iter().zip(other.values.iter()) {
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }

        let denom = norm_a.sqrt() * norm_b.sqrt();
        if denom > 0.0 {
            dot / denom
        } else {
            0.0
        }
    }

    /// Euclidean norm of the descriptor vector.
    pub fn norm(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum::<f32>().sqrt()
    }
}

/// An enrolled identity: a name and the descriptors collected for it at
/// enrollment time.
///
/// Never mutated after creation. Re-enrolling the same name appends a new
/// `Identity` record rather than merging into the existing one.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub name: String,
    pub descriptors: Vec<Descriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(head: &[f32]) -> Descriptor {
        let mut values = [0.0f32; DESCRIPTOR_DIM];
        values[..head.len()].copy_from_slice(head);
        Descriptor { values }
    }

    #[test]
    fn test_similarity_identical() {
        let a = desc(&[1.0, 0.0, 0.0]);
        assert!((a.similarity(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_orthogonal() {
        let a = desc(&[1.0, 0.0]);
        let b = desc(&[0.0, 1.0]);
        assert!(a.similarity(&b).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_opposite() {
        let a = desc(&[1.0, 0.0]);
        let b = desc(&[-1.0, 0.0]);
        assert!((a.similarity(&b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_zero_vector() {
        let zero = desc(&[]);
        let b = desc(&[1.0, 0.0]);
        assert_eq!(zero.similarity(&b), 0.0);
    }

    #[test]
    fn test_similarity_scale_invariant() {
        let a = desc(&[0.3, 0.4, 0.5]);
        let b = desc(&[0.6, 0.8, 1.0]);
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_from_slice_wrong_length() {
        assert!(Descriptor::from_slice(&[0.0; 10]).is_none());
        assert!(Descriptor::from_slice(&[0.0; 17]).is_none());
        assert!(Descriptor::from_slice(&[0.0; 16]).is_some());
    }
}
