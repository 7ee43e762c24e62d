/// Dense single-precision matrices and their named variant.
use super::error::{Error, Result};

/// Row-major `rows x cols` matrix of `f32`.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl FloatMatrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if rows * cols != data.len() {
            return Err(Error::DimensionMismatch {
                what: "matrix elements",
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(FloatMatrix { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        FloatMatrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Builds a matrix from equally long rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(Error::DimensionMismatch {
                    what: "matrix row length",
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(FloatMatrix {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row < self.rows {
            Some(&self.data[row * self.cols..(row + 1) * self.cols])
        } else {
            None
        }
    }
}

/// Matrix with optional row and column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedMatrix {
    pub row_names: Vec<String>,
    pub col_names: Vec<String>,
    pub data: FloatMatrix,
}

impl NamedMatrix {
    /// Label lists may be empty; a non-empty list must match its dimension.
    pub fn new(row_names: Vec<String>, col_names: Vec<String>, data: FloatMatrix) -> Result<Self> {
        let named = NamedMatrix {
            row_names,
            col_names,
            data,
        };
        named.validate()?;
        Ok(named)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.row_names.is_empty() && self.row_names.len() != self.data.rows() {
            return Err(Error::DimensionMismatch {
                what: "named matrix row names",
                expected: self.data.rows(),
                actual: self.row_names.len(),
            });
        }
        if !self.col_names.is_empty() && self.col_names.len() != self.data.cols() {
            return Err(Error::DimensionMismatch {
                what: "named matrix column names",
                expected: self.data.cols(),
                actual: self.col_names.len(),
            });
        }
        self.row_names
            .iter()
            .chain(&self.col_names)
            .try_for_each(|name| check_list_name(name))
    }

    pub fn nrow(&self) -> usize {
        self.data.rows()
    }

    pub fn ncol(&self) -> usize {
        self.data.cols()
    }
}

/// Names in a list must be non-empty and free of the `:` separator.
pub fn check_list_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(':') {
        return Err(Error::InvalidName { name: name.to_string() });
    }
    Ok(())
}

/// Splits a colon separated name list, dropping empty items.
pub fn split_name_list(list: &str) -> Vec<String> {
    list.split(':')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
