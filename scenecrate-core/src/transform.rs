//! Matrix text serialization, used for saving and restoring views

use nalgebra::Matrix4;

use crate::error::{Error, Result};

/// Write a matrix as 16 space-separated values, row by row.
///
/// Uses `Display` for `f32`, which never depends on the locale and round-trips exactly.
pub fn format_matrix(matrix: &Matrix4<f32>) -> String {
    let mut values = Vec::with_capacity(16);
    for row in 0..4 {
        for col in 0..4 {
            values.push(matrix[(row, col)].to_string());
        }
    }
    values.join(" ")
}

/// Parse the output of [`format_matrix`]. Any whitespace separates values.
pub fn parse_matrix(s: &str) -> Result<Matrix4<f32>> {
    let values = s
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| Error::InvalidMatrix(format!("not a finite number: '{token}'")))
        })
        .collect::<Result<Vec<f32>>>()?;
    if values.len() != 16 {
        return Err(Error::InvalidMatrix(format!(
            "expected 16 values, found {}",
            values.len()
        )));
    }
    Ok(Matrix4::from_row_slice(&values))
}
