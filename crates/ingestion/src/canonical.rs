//! Canonical 2-D layout for decoded band buffers.

use ndarray::{Array2, ArrayD, Axis, Ix2};

use crate::error::{IngestionError, Result};

/// Drop a leading singleton band axis, leaving a `(rows, cols)` array.
///
/// 2-D input passes through unchanged, so the function is idempotent.
/// Anything else is a [`IngestionError::Shape`].
pub fn to_2d<A>(buffer: ArrayD<A>) -> Result<Array2<A>> {
    let shape = buffer.shape().to_vec();
    let buffer = match shape.as_slice() {
        [1, _, _] => buffer.index_axis_move(Axis(0), 0),
        [_, _] => buffer,
        _ => return Err(IngestionError::Shape(shape)),
    };
    buffer
        .into_dimensionality::<Ix2>()
        .map_err(|_| IngestionError::Shape(shape))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, IxDyn};

    #[test]
    fn test_singleton_band_dropped() {
        let buffer = Array3::from_shape_fn((1, 3, 4), |(_, r, c)| (r * 4 + c) as f32).into_dyn();
        let out = to_2d(buffer).unwrap();
        assert_eq!(out.dim(), (3, 4));
        assert_eq!(out[[2, 3]], 11.0);
    }

    #[test]
    fn test_idempotent() {
        let once = to_2d(ArrayD::<f32>::zeros(IxDyn(&[1, 2, 5]))).unwrap();
        let twice = to_2d(once.clone().into_dyn()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rejects_other_shapes() {
        for shape in [&[2, 3, 4][..], &[5][..], &[1, 1, 2, 2][..]] {
            let err = to_2d(ArrayD::<f32>::zeros(IxDyn(shape))).unwrap_err();
            assert!(matches!(err, IngestionError::Shape(ref s) if s == shape));
        }
    }
}
