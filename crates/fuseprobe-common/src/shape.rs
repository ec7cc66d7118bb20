//! Tensor shapes.
//!
//! Shapes never include the batch dimension; image tensors are laid out HWC.

/// Ordered tensor dimensions.
pub type Shape = Vec<usize>;

/// Number of elements in a tensor of the given shape, `None` on overflow.
pub fn num_elements(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Compact textual form used on command lines: `28x28x16,28x28x16`.
pub fn format_shapes(shapes: &[Shape]) -> String {
    shapes
        .iter()
        .map(|s| s.iter().map(usize::to_string).collect::<Vec<_>>().join("x"))
        .collect::<Vec<_>>()
        .join(",")
}
