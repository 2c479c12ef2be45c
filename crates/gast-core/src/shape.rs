use smallvec::SmallVec;
use std::fmt;

/// Tensor shape with stack-allocated storage for ≤4 dimensions.
///
/// Multivector activations are `[tokens, channels, blades]` and attention
/// scores are `[batch, heads, tokens, tokens]`, so four inline dims cover
/// every hot path without touching the heap.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

impl Shape {
    pub fn new(dims: &[usize]) -> Self {
        Self {
            dims: SmallVec::from_slice(dims),
        }
    }

    /// Scalar shape (0 dimensions).
    pub fn scalar() -> Self {
        Self {
            dims: SmallVec::new(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (1 for a scalar).
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.dims.get(axis).copied()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Row-major strides in elements.
    pub fn contiguous_strides(&self) -> SmallVec<[usize; 4]> {
        let ndim = self.dims.len();
        let mut strides: SmallVec<[usize; 4]> = SmallVec::from_elem(1usize, ndim);
        for i in (0..ndim.saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Numpy-style broadcast of two shapes, aligned on the trailing axis.
    pub fn broadcast_with(&self, other: &Shape) -> Option<Shape> {
        let ndim = self.ndim().max(other.ndim());
        let pad = |s: &Shape, i: usize| -> usize {
            let offset = ndim - s.ndim();
            if i < offset { 1 } else { s.dims[i - offset] }
        };

        let mut dims = SmallVec::with_capacity(ndim);
        for i in 0..ndim {
            let (a, b) = (pad(self, i), pad(other, i));
            match (a, b) {
                _ if a == b => dims.push(a),
                (1, _) => dims.push(b),
                (_, 1) => dims.push(a),
                _ => return None,
            }
        }
        Some(Shape { dims })
    }

    /// Resolve a reshape target; at most one entry may be `-1` (inferred).
    pub fn resolve_reshape(&self, target: &[isize]) -> Option<Shape> {
        let numel = self.numel();
        let mut inferred = None;
        let mut known: usize = 1;

        for (i, &d) in target.iter().enumerate() {
            match d {
                -1 if inferred.is_none() => inferred = Some(i),
                d if d > 0 => known = known.checked_mul(d as usize)?,
                _ => return None,
            }
        }

        let mut dims: SmallVec<[usize; 4]> = target.iter().map(|&d| d.max(0) as usize).collect();
        if let Some(idx) = inferred {
            if known == 0 || numel % known != 0 {
                return None;
            }
            dims[idx] = numel / known;
        }

        let shape = Shape { dims };
        (shape.numel() == numel).then_some(shape)
    }

    /// Shape after reordering axes; `axes` must be a permutation of `0..ndim`.
    pub fn permute(&self, axes: &[usize]) -> Option<Shape> {
        if axes.len() != self.ndim() {
            return None;
        }
        let mut seen: SmallVec<[bool; 4]> = SmallVec::from_elem(false, axes.len());
        let mut dims = SmallVec::with_capacity(axes.len());
        for &a in axes {
            if a >= axes.len() || seen[a] {
                return None;
            }
            seen[a] = true;
            dims.push(self.dims[a]);
        }
        Some(Shape { dims })
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.dims.as_slice())
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims)
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape {
            dims: SmallVec::from_vec(dims),
        }
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(&dims)
    }
}
